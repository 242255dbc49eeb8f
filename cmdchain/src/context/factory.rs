//! Context factories.

use std::fmt;
use std::marker::PhantomData;

/// Produces a new context for every pipeline run.
pub trait ContextFactory<C> {
    /// Creates a new context.
    fn create_context(&self) -> C;
}

impl<C, F> ContextFactory<C> for F
where
    F: Fn() -> C,
{
    fn create_context(&self) -> C {
        self()
    }
}

/// Factory that builds `C::default()`.
pub struct DefaultContextFactory<C>(PhantomData<fn() -> C>);

impl<C> DefaultContextFactory<C> {
    /// Creates a new default factory.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<C> Default for DefaultContextFactory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for DefaultContextFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultContextFactory").finish()
    }
}

impl<C: Default> ContextFactory<C> for DefaultContextFactory<C> {
    fn create_context(&self) -> C {
        C::default()
    }
}
