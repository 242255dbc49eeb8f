//! Context management for pipeline execution.
//!
//! This module provides:
//! - The attribute bag shared by every participant of a run
//! - Context factories producing a fresh bag per run
//! - Attribute name sets used in contracts

mod attributes;
mod bag;
mod factory;

pub use attributes::AttributeSet;
pub use bag::{AttributeContext, Context};
pub use factory::{ContextFactory, DefaultContextFactory};
