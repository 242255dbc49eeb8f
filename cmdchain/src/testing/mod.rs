//! Testing utilities for cmdchain pipelines.
//!
//! This module provides:
//! - A shared event log for asserting call order across participants
//! - Recording, failing and aborting commands
//! - Recording source and sink

mod mocks;

pub use mocks::{
    AbortingCommand, EventLog, FailingCommand, RecordingCommand, RecordingSink, RecordingSource,
};
