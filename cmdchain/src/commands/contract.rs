//! Contract enforcement around command calls.

use super::{Command, Flow};
use crate::context::{AttributeContext, AttributeSet};
use crate::errors::{HandleError, MissingRequirementsError, PipelineError, RequirementCheck};
use tracing::trace;

/// Why a participant call did not produce a value.
#[derive(Debug)]
pub enum Interrupt {
    /// The participant requested a graceful abort of the run.
    Abort {
        /// The participant that aborted.
        participant: String,
        /// Optional reason.
        reason: Option<String>,
    },
    /// The run cannot continue.
    Fatal(PipelineError),
}

impl Interrupt {
    /// Maps a handler error raised by `participant`.
    #[must_use]
    pub fn from_handle(participant: &str, err: HandleError) -> Self {
        match err {
            HandleError::Abort { reason } => Self::Abort {
                participant: participant.to_string(),
                reason,
            },
            HandleError::IllegalState(message) => Self::Fatal(PipelineError::IllegalState {
                participant: participant.to_string(),
                message,
            }),
            HandleError::Failed(source) => Self::Fatal(PipelineError::Command {
                participant: participant.to_string(),
                source,
            }),
        }
    }

    /// Returns the fatal error, if any.
    #[must_use]
    pub fn into_error(self) -> Option<PipelineError> {
        match self {
            Self::Abort { .. } => None,
            Self::Fatal(err) => Some(err),
        }
    }
}

impl From<PipelineError> for Interrupt {
    fn from(err: PipelineError) -> Self {
        Self::Fatal(err)
    }
}

impl From<MissingRequirementsError> for Interrupt {
    fn from(err: MissingRequirementsError) -> Self {
        Self::Fatal(err.into())
    }
}

/// Checks that every name in `required` is present in `context`.
pub(crate) fn ensure_present<C>(
    participant: &str,
    required: &AttributeSet,
    context: &C,
    check: RequirementCheck,
) -> Result<(), MissingRequirementsError>
where
    C: AttributeContext + ?Sized,
{
    let missing = required.missing_in(context);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MissingRequirementsError::new(participant, missing, check))
    }
}

/// Calls a command with its contract enforced.
///
/// 1. Every `requires` attribute must be present.
/// 2. `handle` runs.
/// 3. If the command continued and declares `provides`, every provided
///    attribute must now be present. A stopped call is a skip and is not
///    held to its `provides`.
///
/// # Errors
///
/// Returns [`Interrupt::Abort`] when the command aborts gracefully and
/// [`Interrupt::Fatal`] for contract violations and handler failures.
pub fn invoke<C, K>(command: &mut K, context: &mut C) -> Result<Flow, Interrupt>
where
    C: AttributeContext,
    K: Command<C> + ?Sized,
{
    ensure_present(
        command.name(),
        command.requires(),
        &*context,
        RequirementCheck::Precondition,
    )?;

    let flow = command
        .handle(context)
        .map_err(|err| Interrupt::from_handle(command.name(), err))?;

    if flow.is_continue() && !command.provides().is_empty() {
        ensure_present(
            command.name(),
            command.provides(),
            &*context,
            RequirementCheck::Postcondition,
        )?;
    }

    trace!(command = command.name(), ?flow, "Command invoked");
    Ok(flow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::FnCommand;
    use crate::context::Context;
    use pretty_assertions::assert_eq;

    fn expect_missing(result: Result<Flow, Interrupt>) -> MissingRequirementsError {
        match result {
            Err(Interrupt::Fatal(PipelineError::MissingRequirements(err))) => err,
            other => panic!("expected missing requirements, got {other:?}"),
        }
    }

    #[test]
    fn test_precondition_failure_skips_handle() {
        let mut called = false;
        let mut cmd = FnCommand::new("reader", |_ctx: &mut Context| {
            called = true;
            Ok(Flow::Continue)
        })
        .with_requires(["a", "b"]);

        let mut ctx = Context::from_attributes([("a", 1)]);
        let err = expect_missing(invoke(&mut cmd, &mut ctx));
        drop(cmd);

        assert_eq!(err.participant, "reader");
        assert_eq!(err.missing, vec!["b".to_string()]);
        assert_eq!(err.check, RequirementCheck::Precondition);
        assert!(!called);
    }

    #[test]
    fn test_postcondition_failure() {
        let mut cmd = FnCommand::new("lazy", |_ctx: &mut Context| Ok(Flow::Continue))
            .with_provides("result");

        let err = expect_missing(invoke(&mut cmd, &mut Context::new()));
        assert_eq!(err.check, RequirementCheck::Postcondition);
        assert_eq!(err.missing, vec!["result".to_string()]);
    }

    #[test]
    fn test_null_value_satisfies_provides() {
        let mut cmd = FnCommand::new("nuller", |ctx: &mut Context| {
            ctx.set("result", serde_json::Value::Null);
            Ok(Flow::Continue)
        })
        .with_provides("result");

        assert_eq!(invoke(&mut cmd, &mut Context::new()).unwrap(), Flow::Continue);
    }

    #[test]
    fn test_stop_skips_postcondition() {
        let mut cmd = FnCommand::new("skipper", |_ctx: &mut Context| Ok(Flow::Stop))
            .with_provides("result");

        assert_eq!(invoke(&mut cmd, &mut Context::new()).unwrap(), Flow::Stop);
    }

    #[test]
    fn test_abort_is_not_fatal() {
        let mut cmd = FnCommand::new("quitter", |_ctx: &mut Context| {
            Err(HandleError::abort_with("enough"))
        });

        match invoke(&mut cmd, &mut Context::new()) {
            Err(Interrupt::Abort { participant, reason }) => {
                assert_eq!(participant, "quitter");
                assert_eq!(reason.as_deref(), Some("enough"));
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[test]
    fn test_failures_are_fatal() {
        let mut failing = FnCommand::new("failing", |_ctx: &mut Context| {
            Err(anyhow::anyhow!("boom").into())
        });
        let err = invoke(&mut failing, &mut Context::new())
            .unwrap_err()
            .into_error()
            .unwrap();
        assert!(matches!(err, PipelineError::Command { ref participant, .. } if participant == "failing"));

        let mut confused = FnCommand::new("confused", |ctx: &mut Context| {
            let signal = serde_json::json!(42);
            ctx.set("signal", signal.clone());
            Flow::try_from(&signal)
        });
        let err = invoke(&mut confused, &mut Context::new())
            .unwrap_err()
            .into_error()
            .unwrap();
        assert!(matches!(err, PipelineError::IllegalState { .. }));
    }
}
