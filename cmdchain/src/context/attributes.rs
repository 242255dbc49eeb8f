//! Attribute name sets used by command, source and sink contracts.

use super::AttributeContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An ordered set of attribute names.
///
/// Contracts are nominal: a name in a set says nothing about the value's
/// type, only that the attribute is present in the context. Ordering keeps
/// diagnostics stable.
///
/// Most constructors accept whatever is convenient at the call site:
///
/// ```
/// use cmdchain::context::AttributeSet;
///
/// let one = AttributeSet::from("name");
/// let many = AttributeSet::from(["name", "total"]);
/// let none = AttributeSet::from(None::<&str>);
///
/// assert_eq!(one.len(), 1);
/// assert_eq!(many.len(), 2);
/// assert!(none.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeSet<String>);

impl AttributeSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds a name, returning true if it was not present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.0.insert(name.into())
    }

    /// Returns true if the name is in the set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Returns the number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Merges another set into this one.
    pub fn merge(&mut self, other: &Self) {
        self.0.extend(other.0.iter().cloned());
    }

    /// Returns true if every name in this set is in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Names in this set that `available` does not contain.
    #[must_use]
    pub fn missing_from(&self, available: &Self) -> Vec<String> {
        self.0.difference(&available.0).cloned().collect()
    }

    /// Names in this set that are not present in the context.
    #[must_use]
    pub fn missing_in<C>(&self, context: &C) -> Vec<String>
    where
        C: AttributeContext + ?Sized,
    {
        self.0
            .iter()
            .filter(|name| !context.has_attribute(name))
            .cloned()
            .collect()
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "}}")
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for AttributeSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl From<&str> for AttributeSet {
    fn from(name: &str) -> Self {
        std::iter::once(name).collect()
    }
}

impl From<String> for AttributeSet {
    fn from(name: String) -> Self {
        std::iter::once(name).collect()
    }
}

impl<S: Into<String>> From<Vec<S>> for AttributeSet {
    fn from(names: Vec<S>) -> Self {
        names.into_iter().collect()
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for AttributeSet {
    fn from(names: [S; N]) -> Self {
        names.into_iter().collect()
    }
}

impl<S: Into<String> + Clone> From<&[S]> for AttributeSet {
    fn from(names: &[S]) -> Self {
        names.iter().cloned().collect()
    }
}

impl<S: Into<String>> From<BTreeSet<S>> for AttributeSet {
    fn from(names: BTreeSet<S>) -> Self {
        names.into_iter().collect()
    }
}

impl<S: Into<String>> From<std::collections::HashSet<S>> for AttributeSet {
    fn from(names: std::collections::HashSet<S>) -> Self {
        names.into_iter().collect()
    }
}

impl<T: Into<Self>> From<Option<T>> for AttributeSet {
    fn from(names: Option<T>) -> Self {
        names.map_or_else(Self::new, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalizes_single_names() {
        assert_eq!(AttributeSet::from("a").len(), 1);
        assert_eq!(AttributeSet::from(String::from("a")).len(), 1);
        assert!(AttributeSet::from(None::<&str>).is_empty());
        assert_eq!(AttributeSet::from(Some("a")), AttributeSet::from("a"));
    }

    #[test]
    fn test_normalizes_collections() {
        let expected: AttributeSet = ["a", "b"].into_iter().collect();

        assert_eq!(AttributeSet::from(vec!["b", "a", "b"]), expected);
        assert_eq!(AttributeSet::from(["a", "b"]), expected);
        assert_eq!(AttributeSet::from(&["a", "b"][..]), expected);
        assert_eq!(AttributeSet::from(Some(vec!["a", "b"])), expected);
    }

    #[test]
    fn test_missing_from_is_sorted_difference() {
        let required = AttributeSet::from(["z", "a", "m"]);
        let available = AttributeSet::from("m");

        assert_eq!(required.missing_from(&available), vec!["a", "z"]);
        assert!(!required.is_subset(&available));
        assert!(AttributeSet::from("m").is_subset(&available));
    }

    #[test]
    fn test_missing_in_context_uses_presence() {
        let mut ctx = Context::new();
        ctx.set("present", serde_json::Value::Null);

        let required = AttributeSet::from(["present", "absent"]);
        assert_eq!(required.missing_in(&ctx), vec!["absent"]);
    }

    #[test]
    fn test_merge_and_display() {
        let mut set = AttributeSet::from("b");
        set.merge(&AttributeSet::from(["a", "c"]));
        set.insert("a");

        assert_eq!(set.to_string(), "{a, b, c}");
        assert_eq!(AttributeSet::new().to_string(), "{}");
    }
}
