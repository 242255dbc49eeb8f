//! The pipeline run loop.
//!
//! `SettingUp → Running(cycle) → Completed | Aborted | Failed → CleaningUp → Done`
//!
//! Cleanup reaches every participant exactly once on every exit path,
//! including panics raised by a participant during setup or a cycle.

use super::{Pipeline, RunPhase, RunReport, RunStatus};
use crate::commands::{ensure_present, invoke, Flow, Interrupt};
use crate::context::AttributeContext;
use crate::errors::{LifecyclePhase, PipelineError, RequirementCheck};
use chrono::Utc;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct CycleStats {
    cycles: u64,
    skipped_cycles: u64,
}

impl<C: AttributeContext + 'static> Pipeline<C> {
    /// Runs the pipeline and returns the sink's result.
    ///
    /// Returns `Ok(None)` when no sink is configured or when a participant
    /// aborted the run gracefully.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of the run, after every participant
    /// has been cleaned up. Sink requirement errors are returned before any
    /// participant is set up.
    pub fn run(&mut self) -> Result<Option<Value>, PipelineError> {
        Ok(self.run_with_report()?.result)
    }

    /// Runs the pipeline and returns a report of the run.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run`].
    pub fn run_with_report(&mut self) -> Result<RunReport, PipelineError> {
        self.phase = RunPhase::Idle;
        self.check_sink_requirements()?;

        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline.run", pipeline = %self.config.name, %run_id);
        let _entered = span.enter();

        let started_at = Utc::now();
        info!(commands = self.commands.len(), "Pipeline run started");

        let mut stats = CycleStats::default();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.setup_all()?;
            self.execute(&mut stats)
        }));

        self.phase = match &outcome {
            Ok(Ok(RunStatus::Completed)) => RunPhase::Completed,
            Ok(Ok(RunStatus::Aborted)) => RunPhase::Aborted,
            Ok(Err(_)) | Err(_) => RunPhase::Failed,
        };
        self.cleanup_all();
        self.phase = RunPhase::Done;

        let status = match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                error!(error = %err, cycles = stats.cycles, "Pipeline run failed");
                return Err(err);
            }
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "Pipeline run panicked");
                panic::resume_unwind(payload);
            }
        };

        let result = match status {
            RunStatus::Completed => self.sink.as_ref().and_then(|sink| sink.result()),
            RunStatus::Aborted => None,
        };
        let report = RunReport {
            run_id,
            pipeline: self.config.name.clone(),
            status,
            cycles: stats.cycles,
            skipped_cycles: stats.skipped_cycles,
            started_at,
            finished_at: Utc::now(),
            result,
        };
        info!(
            %status,
            cycles = report.cycles,
            skipped_cycles = report.skipped_cycles,
            duration_ms = report.duration_ms(),
            "Pipeline run finished"
        );
        Ok(report)
    }

    /// Calls `setup` on the source, the sink and each command, in that order.
    ///
    /// Every participant is set up even after a failure, so that each one
    /// sees exactly one `setup` and one `cleanup`. The first error wins.
    fn setup_all(&mut self) -> Result<(), PipelineError> {
        self.phase = RunPhase::SettingUp;
        let mut first_error = None;

        let result = self.source.setup();
        record_setup(&mut first_error, self.source.name(), result);

        if let Some(sink) = self.sink.as_mut() {
            let result = sink.setup();
            record_setup(&mut first_error, sink.name(), result);
        }

        for command in &mut self.commands {
            let result = command.setup();
            record_setup(&mut first_error, command.name(), result);
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Calls `cleanup` on every participant in setup order, discarding failures.
    fn cleanup_all(&mut self) {
        self.phase = RunPhase::CleaningUp;

        let name = self.source.name().to_string();
        notify_cleanup(&name, || self.source.cleanup());

        if let Some(sink) = self.sink.as_mut() {
            let name = sink.name().to_string();
            notify_cleanup(&name, || sink.cleanup());
        }

        for command in &mut self.commands {
            let name = command.name().to_string();
            notify_cleanup(&name, || command.cleanup());
        }
    }

    fn execute(&mut self, stats: &mut CycleStats) -> Result<RunStatus, PipelineError> {
        match self.drive(stats) {
            Ok(()) => Ok(RunStatus::Completed),
            Err(Interrupt::Abort {
                participant,
                reason,
            }) => {
                info!(%participant, reason = reason.as_deref().unwrap_or(""), "Pipeline aborted");
                Ok(RunStatus::Aborted)
            }
            Err(Interrupt::Fatal(err)) => Err(err),
        }
    }

    fn drive(&mut self, stats: &mut CycleStats) -> Result<(), Interrupt> {
        let mut context = self.context_factory.create_context();

        while self.pull(&mut context)? {
            stats.cycles += 1;
            if let Some(limit) = self.config.max_cycles {
                if stats.cycles > limit {
                    return Err(PipelineError::CycleLimitExceeded {
                        pipeline: self.config.name.clone(),
                        limit,
                    }
                    .into());
                }
            }

            self.phase = RunPhase::Running {
                cycle: stats.cycles,
            };
            debug!(cycle = stats.cycles, "Cycle started");

            if self.run_cycle(&mut context)? == Flow::Stop {
                stats.skipped_cycles += 1;
            }
        }

        debug!(cycles = stats.cycles, "Source exhausted");
        Ok(())
    }

    fn pull(&mut self, context: &mut C) -> Result<bool, Interrupt> {
        self.source
            .next(context)
            .map_err(|err| Interrupt::from_handle(self.source.name(), err))
    }

    /// Runs every command, then the sink if no command stopped the cycle.
    fn run_cycle(&mut self, context: &mut C) -> Result<Flow, Interrupt> {
        for command in &mut self.commands {
            if invoke(&mut **command, context)? == Flow::Stop {
                debug!(command = command.name(), "Command stopped the cycle");
                return Ok(Flow::Stop);
            }
        }

        if let Some(sink) = self.sink.as_mut() {
            ensure_present(
                sink.name(),
                sink.requires(),
                &*context,
                RequirementCheck::SinkPrecondition,
            )?;
            sink.handle(context)
                .map_err(|err| Interrupt::from_handle(sink.name(), err))?;
        }
        Ok(Flow::Continue)
    }
}

fn setup_outcome(participant: &str, result: anyhow::Result<()>) -> Result<(), PipelineError> {
    result.map_err(|source| PipelineError::Lifecycle {
        participant: participant.to_string(),
        phase: LifecyclePhase::Setup,
        source,
    })
}

fn record_setup(
    first_error: &mut Option<PipelineError>,
    participant: &str,
    result: anyhow::Result<()>,
) {
    let Err(err) = setup_outcome(participant, result) else {
        return;
    };
    if first_error.is_some() {
        warn!(participant, error = %err, "Setup failed after an earlier setup failure");
    } else {
        *first_error = Some(err);
    }
}

fn notify_cleanup(participant: &str, cleanup: impl FnOnce() -> anyhow::Result<()>) {
    match panic::catch_unwind(AssertUnwindSafe(cleanup)) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            warn!(participant, error = %err, "Cleanup failed; continuing with remaining participants");
        }
        Err(payload) => {
            warn!(
                participant,
                panic = %panic_message(payload.as_ref()),
                "Cleanup panicked; continuing with remaining participants"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn test_notify_cleanup_swallows_errors_and_panics() {
        notify_cleanup("ok", || Ok(()));
        notify_cleanup("err", || Err(anyhow::anyhow!("nope")));
        notify_cleanup("panic", || panic!("cleanup exploded"));
    }

    #[test]
    fn test_setup_outcome_wraps_error() {
        let err = setup_outcome("Source", Err(anyhow::anyhow!("no file"))).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Lifecycle { phase: LifecyclePhase::Setup, ref participant, .. } if participant == "Source"
        ));
        assert!(setup_outcome("Source", Ok(())).is_ok());
    }

    #[test]
    fn test_record_setup_keeps_first_error() {
        let mut first_error = None;
        record_setup(&mut first_error, "ok", Ok(()));
        assert!(first_error.is_none());

        record_setup(&mut first_error, "first", Err(anyhow::anyhow!("one")));
        record_setup(&mut first_error, "second", Err(anyhow::anyhow!("two")));

        assert!(matches!(
            first_error,
            Some(PipelineError::Lifecycle { ref participant, .. }) if participant == "first"
        ));
    }
}
