//! Small shared helpers.

/// Returns the unqualified name of a type, without generic arguments.
///
/// Used as the default display name of participants that do not name
/// themselves.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
