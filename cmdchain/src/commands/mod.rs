//! Command trait and implementations.
//!
//! Commands are the processing steps of a pipeline. Each one declares the
//! attributes it needs (`requires`) and the attributes it guarantees after a
//! successful call (`provides`).

mod contract;

pub use contract::{invoke, Interrupt};
pub(crate) use contract::ensure_present;

use crate::context::{AttributeSet, Context};
use crate::errors::HandleError;
use crate::lifecycle::Lifecycle;
use crate::utils::short_type_name;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Debug};
use std::marker::PhantomData;

static NO_ATTRIBUTES: AttributeSet = AttributeSet::new();

/// Continuation signal returned by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    /// Run the next command of the cycle.
    #[default]
    Continue,
    /// Skip the remaining commands and the sink for this cycle only.
    Stop,
}

impl Flow {
    /// Returns true for [`Flow::Continue`].
    #[must_use]
    pub const fn is_continue(self) -> bool {
        matches!(self, Self::Continue)
    }
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed {
            Self::Continue
        } else {
            Self::Stop
        }
    }
}

/// `None` is "no opinion", which continues.
impl From<Option<bool>> for Flow {
    fn from(signal: Option<bool>) -> Self {
        signal.map_or(Self::Continue, Self::from)
    }
}

impl From<()> for Flow {
    fn from((): ()) -> Self {
        Self::Continue
    }
}

/// Reads a dynamically produced signal: `true`, `false` or `null`.
impl TryFrom<&Value> for Flow {
    type Error = HandleError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(proceed) => Ok(Self::from(*proceed)),
            Value::Null => Ok(Self::Continue),
            other => Err(HandleError::illegal_state(format!(
                "expected a boolean or null continuation signal, got {other}"
            ))),
        }
    }
}

/// A processing step of a pipeline.
///
/// The pipeline never calls [`Command::handle`] directly; it goes through
/// [`invoke`], which enforces the contract around the call.
pub trait Command<C = Context>: Lifecycle {
    /// Returns the display name used in diagnostics.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    /// Attributes that must be present before the command runs.
    fn requires(&self) -> &AttributeSet {
        &NO_ATTRIBUTES
    }

    /// Attributes guaranteed present after the command continues.
    fn provides(&self) -> &AttributeSet {
        &NO_ATTRIBUTES
    }

    /// Performs the command's work.
    ///
    /// # Errors
    ///
    /// Return [`HandleError::Abort`] to end the run gracefully. Any other
    /// error is fatal to the run.
    fn handle(&mut self, context: &mut C) -> Result<Flow, HandleError>;
}

/// A command backed by a closure.
pub struct FnCommand<C, F>
where
    F: FnMut(&mut C) -> Result<Flow, HandleError>,
{
    name: String,
    requires: AttributeSet,
    provides: AttributeSet,
    func: F,
    _context: PhantomData<fn(&mut C)>,
}

impl<C, F> FnCommand<C, F>
where
    F: FnMut(&mut C) -> Result<Flow, HandleError>,
{
    /// Creates a new closure-backed command with an empty contract.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            requires: AttributeSet::new(),
            provides: AttributeSet::new(),
            func,
            _context: PhantomData,
        }
    }

    /// Sets the required attributes.
    #[must_use]
    pub fn with_requires(mut self, requires: impl Into<AttributeSet>) -> Self {
        self.requires = requires.into();
        self
    }

    /// Sets the provided attributes.
    #[must_use]
    pub fn with_provides(mut self, provides: impl Into<AttributeSet>) -> Self {
        self.provides = provides.into();
        self
    }
}

impl<C, F> Debug for FnCommand<C, F>
where
    F: FnMut(&mut C) -> Result<Flow, HandleError>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCommand")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("provides", &self.provides)
            .finish()
    }
}

impl<C, F> Lifecycle for FnCommand<C, F> where F: FnMut(&mut C) -> Result<Flow, HandleError> {}

impl<C, F> Command<C> for FnCommand<C, F>
where
    F: FnMut(&mut C) -> Result<Flow, HandleError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> &AttributeSet {
        &self.requires
    }

    fn provides(&self) -> &AttributeSet {
        &self.provides
    }

    fn handle(&mut self, context: &mut C) -> Result<Flow, HandleError> {
        (self.func)(context)
    }
}

/// A command that does nothing and always continues.
#[derive(Debug, Clone)]
pub struct NoOpCommand {
    name: String,
}

impl NoOpCommand {
    /// Creates a new no-op command.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Lifecycle for NoOpCommand {}

impl<C> Command<C> for NoOpCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&mut self, _context: &mut C) -> Result<Flow, HandleError> {
        Ok(Flow::Continue)
    }
}
