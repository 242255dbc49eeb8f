//! # Cmdchain
//!
//! An in-process execution engine for chains of commands that share a
//! mutable attribute context.
//!
//! A pipeline is made of:
//!
//! - **A source**: pulled once per cycle until it is exhausted
//! - **Commands**: run in registration order, each declaring the attributes it
//!   `requires` and `provides`
//! - **An optional sink**: observes the context after each full cycle and
//!   produces the run's result
//!
//! Contracts are checked twice. When a command is registered, every attribute
//! it requires must be provided by the source or an earlier command. While
//! running, presence is re-checked around each call.
//!
//! ## Quick Start
//!
//! ```rust
//! use cmdchain::prelude::*;
//!
//! let summer = FnCommand::new("Summer", |ctx: &mut Context| {
//!     let value = ctx.get_as::<i64>("value")?.unwrap_or(0);
//!     let total = ctx.get_as::<i64>("total")?.unwrap_or(0);
//!     ctx.set("total", total + value);
//!     Ok(Flow::Continue)
//! })
//! .with_requires("value")
//! .with_provides("total");
//!
//! let mut pipeline: Pipeline = Pipeline::builder()
//!     .source(ListSource::new("value", [1, 3, 8, 9])?)
//!     .sink(AttributeSink::new("total"))
//!     .build()
//!     .with_command(summer)?;
//!
//! assert_eq!(pipeline.run()?, Some(serde_json::json!(21)));
//! # Ok::<(), cmdchain::errors::PipelineError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod commands;
pub mod context;
pub mod errors;
pub mod lifecycle;
pub mod observability;
pub mod pipeline;
pub mod sinks;
pub mod sources;
pub mod testing;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::commands::{invoke, Command, FnCommand, Flow, Interrupt, NoOpCommand};
    pub use crate::context::{
        AttributeContext, AttributeSet, Context, ContextFactory, DefaultContextFactory,
    };
    pub use crate::errors::{
        HandleError, LifecyclePhase, MissingRequirementsError, PipelineError, RequirementCheck,
    };
    pub use crate::lifecycle::Lifecycle;
    pub use crate::pipeline::{
        Pipeline, PipelineBuilder, PipelineConfig, RunPhase, RunReport, RunStatus,
    };
    pub use crate::sinks::{AttributeSink, CollectingSink, Sink};
    pub use crate::sources::{ListSource, OneShotSource, Source};
}
