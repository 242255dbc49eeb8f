//! Pipeline assembly and execution.
//!
//! This module provides:
//! - The pipeline registry with registration-time contract checks
//! - A builder wiring the source, sink and context factory
//! - The run loop with lifecycle guarantees
//! - Configuration and run reports

mod builder;
mod config;
mod report;
mod run;

pub use builder::PipelineBuilder;
pub use config::PipelineConfig;
pub use report::{RunPhase, RunReport, RunStatus};

use crate::commands::Command;
use crate::context::{AttributeContext, AttributeSet, Context, ContextFactory};
use crate::errors::{MissingRequirementsError, PipelineError, RequirementCheck};
use crate::sinks::Sink;
use crate::sources::Source;
use std::fmt;
use tracing::debug;

/// An ordered chain of commands fed by a source and drained by a sink.
///
/// Commands are checked when they are registered: every attribute a command
/// requires must be provided by the source or by a command registered
/// before it.
pub struct Pipeline<C = Context> {
    config: PipelineConfig,
    source: Box<dyn Source<C>>,
    sink: Option<Box<dyn Sink<C>>>,
    context_factory: Box<dyn ContextFactory<C>>,
    commands: Vec<Box<dyn Command<C>>>,
    available: AttributeSet,
    phase: RunPhase,
}

impl<C: AttributeContext + Default + 'static> Pipeline<C> {
    /// Creates a pipeline with a one-shot source, no sink and the default
    /// context factory.
    #[must_use]
    pub fn new() -> Self {
        PipelineBuilder::new().build()
    }
}

impl<C: AttributeContext + Default + 'static> Default for Pipeline<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: AttributeContext + 'static> Pipeline<C> {
    /// Returns a builder for configuring the source, sink and context factory.
    #[must_use]
    pub fn builder() -> PipelineBuilder<C> {
        PipelineBuilder::new()
    }

    pub(crate) fn assemble(
        config: PipelineConfig,
        source: Box<dyn Source<C>>,
        sink: Option<Box<dyn Sink<C>>>,
        context_factory: Box<dyn ContextFactory<C>>,
    ) -> Self {
        let available = source.provides().clone();
        Self {
            config,
            source,
            sink,
            context_factory,
            commands: Vec::new(),
            available,
            phase: RunPhase::Idle,
        }
    }

    /// Registers a command at the end of the chain.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::MissingRequirements` if the command requires
    /// attributes that neither the source nor an earlier command provides.
    /// The pipeline is left unchanged in that case.
    pub fn add_command(&mut self, command: impl Command<C> + 'static) -> Result<(), PipelineError> {
        self.add_boxed_command(Box::new(command))
    }

    /// Registers an already boxed command.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::add_command`].
    pub fn add_boxed_command(&mut self, command: Box<dyn Command<C>>) -> Result<(), PipelineError> {
        let unmet = command.requires().missing_from(&self.available);
        if !unmet.is_empty() {
            return Err(MissingRequirementsError::new(
                command.name(),
                unmet,
                RequirementCheck::Registration,
            )
            .into());
        }

        self.available.merge(command.provides());
        debug!(
            pipeline = %self.config.name,
            command = command.name(),
            requires = %command.requires(),
            provides = %command.provides(),
            "Command registered"
        );
        self.commands.push(command);
        Ok(())
    }

    /// Registers a command and returns the pipeline, for chaining.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::add_command`].
    pub fn with_command(mut self, command: impl Command<C> + 'static) -> Result<Self, PipelineError> {
        self.add_command(command)?;
        Ok(self)
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the number of registered commands.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Returns the registered command names in execution order.
    #[must_use]
    pub fn command_names(&self) -> Vec<String> {
        self.commands.iter().map(|c| c.name().to_string()).collect()
    }

    /// Returns every attribute guaranteed by the source and the registered
    /// commands.
    #[must_use]
    pub fn available_attributes(&self) -> &AttributeSet {
        &self.available
    }

    /// Returns the phase of the current or most recent run.
    ///
    /// A run rejected by the sink requirement check leaves the pipeline
    /// `Idle`, since no participant was touched.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Checks the sink's requirements against everything registered.
    fn check_sink_requirements(&self) -> Result<(), PipelineError> {
        if !self.config.check_sink_requirements {
            return Ok(());
        }
        let Some(sink) = &self.sink else {
            return Ok(());
        };

        let missing = sink.requires().missing_from(&self.available);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingRequirementsError::new(
                sink.name(),
                missing,
                RequirementCheck::SinkRegistration,
            )
            .into())
        }
    }
}

impl<C> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.config.name)
            .field("source", &self.source.name())
            .field("sink", &self.sink.as_ref().map(|s| s.name()))
            .field(
                "commands",
                &self.commands.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("available", &self.available)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
