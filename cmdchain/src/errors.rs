//! Error types for the cmdchain engine.
//!
//! Registration and contract failures share one structured error,
//! [`MissingRequirementsError`], tagged with the check that produced it.
//! Handler code reports its own failures through [`HandleError`], which the
//! run loop either consumes (graceful abort) or converts into a fatal
//! [`PipelineError`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// The main error type for pipeline assembly and execution.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A requirement was not satisfied at registration or run time.
    #[error("{0}")]
    MissingRequirements(#[from] MissingRequirementsError),

    /// A participant produced a value of the wrong shape.
    #[error("Illegal state in '{participant}': {message}")]
    IllegalState {
        /// The participant that produced the value.
        participant: String,
        /// Description of the problem.
        message: String,
    },

    /// A participant's handler failed with an unrecognised error.
    #[error("'{participant}' failed: {source}")]
    Command {
        /// The failing participant.
        participant: String,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// A lifecycle callback failed.
    #[error("{phase} failed for '{participant}': {source}")]
    Lifecycle {
        /// The failing participant.
        participant: String,
        /// The lifecycle phase.
        phase: LifecyclePhase,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// The configured cycle limit was reached while the source still had data.
    #[error("Pipeline '{pipeline}' exceeded the limit of {limit} cycles")]
    CycleLimitExceeded {
        /// The pipeline name.
        pipeline: String,
        /// The configured limit.
        limit: u64,
    },

    /// An invalid argument was passed to a constructor.
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl PipelineError {
    /// Returns the missing-requirements details, if this is a contract error.
    #[must_use]
    pub fn as_missing_requirements(&self) -> Option<&MissingRequirementsError> {
        match self {
            Self::MissingRequirements(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the error was raised while assembling the pipeline.
    #[must_use]
    pub fn is_registration(&self) -> bool {
        self.as_missing_requirements()
            .is_some_and(|err| err.check.is_registration())
    }
}

/// The check that detected missing attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementCheck {
    /// `add_command` found requirements no earlier participant provides.
    Registration,
    /// The sink requires attributes no registered participant provides.
    SinkRegistration,
    /// A command's requirements were absent before it ran.
    Precondition,
    /// A command did not set everything it provides.
    Postcondition,
    /// The sink's requirements were absent when it was called.
    SinkPrecondition,
}

impl RequirementCheck {
    /// Returns true for checks performed while assembling the pipeline.
    #[must_use]
    pub const fn is_registration(self) -> bool {
        matches!(self, Self::Registration | Self::SinkRegistration)
    }
}

impl fmt::Display for RequirementCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration => write!(f, "registration"),
            Self::SinkRegistration => write!(f, "sink_registration"),
            Self::Precondition => write!(f, "precondition"),
            Self::Postcondition => write!(f, "postcondition"),
            Self::SinkPrecondition => write!(f, "sink_precondition"),
        }
    }
}

/// Error raised when attributes required by a contract are missing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_missing(.check, .participant, .missing))]
pub struct MissingRequirementsError {
    /// The command or sink whose contract failed.
    pub participant: String,
    /// The missing attribute names, sorted.
    pub missing: Vec<String>,
    /// Which check detected the problem.
    pub check: RequirementCheck,
}

fn render_missing(check: &RequirementCheck, participant: &str, missing: &[String]) -> String {
    let names = missing.join(", ");
    match check {
        RequirementCheck::Registration => {
            format!("Command '{participant}' has unfulfilled requirement(s): {names}")
        }
        RequirementCheck::SinkRegistration => {
            format!("Sink '{participant}' has unfulfilled requirement(s): {names}")
        }
        RequirementCheck::Precondition => {
            format!("Missing the following requirements for command '{participant}': {names}")
        }
        RequirementCheck::Postcondition => {
            format!("Command '{participant}' did not set the following attributes: {names}")
        }
        RequirementCheck::SinkPrecondition => {
            format!("Missing the following requirements for sink '{participant}': {names}")
        }
    }
}

impl MissingRequirementsError {
    /// Creates a new missing requirements error.
    #[must_use]
    pub fn new(
        participant: impl Into<String>,
        missing: Vec<String>,
        check: RequirementCheck,
    ) -> Self {
        Self {
            participant: participant.into(),
            missing,
            check,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("participant".to_string(), serde_json::json!(self.participant));
        map.insert("missing".to_string(), serde_json::json!(self.missing));
        map.insert("check".to_string(), serde_json::json!(self.check));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Lifecycle phases a participant is notified about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Called before the first cycle.
    Setup,
    /// Called after the last cycle, on every exit path.
    Cleanup,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "setup"),
            Self::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Error returned from a source, command or sink handler.
#[derive(Debug, Error)]
pub enum HandleError {
    /// Terminate the run gracefully. `run()` returns no result and no error.
    #[error("Pipeline aborted{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Abort {
        /// Optional reason, logged by the run loop.
        reason: Option<String>,
    },

    /// The handler observed a value of the wrong shape.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Any other failure. Fatal to the run.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandleError {
    /// Creates a graceful abort without a reason.
    #[must_use]
    pub const fn abort() -> Self {
        Self::Abort { reason: None }
    }

    /// Creates a graceful abort with a reason.
    #[must_use]
    pub fn abort_with(reason: impl Into<String>) -> Self {
        Self::Abort {
            reason: Some(reason.into()),
        }
    }

    /// Creates an illegal state error.
    #[must_use]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// Wraps any error as a fatal failure.
    #[must_use]
    pub fn failed<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failed(anyhow::Error::new(err))
    }

    /// Returns true if this is a graceful abort.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Abort { .. })
    }
}

impl From<AttributeTypeError> for HandleError {
    fn from(err: AttributeTypeError) -> Self {
        Self::IllegalState(err.to_string())
    }
}

/// Error raised when a context attribute cannot be read as the requested type.
#[derive(Debug, Error)]
#[error("Attribute '{attribute}' has an unexpected shape: {source}")]
pub struct AttributeTypeError {
    /// The attribute name.
    pub attribute: String,
    /// The deserialization error.
    #[source]
    pub source: serde_json::Error,
}
