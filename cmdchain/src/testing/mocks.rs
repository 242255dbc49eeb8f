//! Mock participants for testing.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

use crate::commands::{Command, Flow};
use crate::context::{AttributeContext, AttributeSet};
use crate::errors::HandleError;
use crate::lifecycle::Lifecycle;
use crate::sinks::Sink;
use crate::sources::Source;

/// A shared, ordered log of participant calls.
///
/// Entries have the form `"<participant>:<event>"`, for example
/// `"reader:setup"`. Clones share the same log, so one instance can be handed
/// to every participant of a pipeline and inspected after the run.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, participant: &str, event: &str) {
        self.entries.lock().push(format!("{participant}:{event}"));
    }

    /// Returns a copy of all entries in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns how many times `entry` was recorded.
    #[must_use]
    pub fn count(&self, entry: &str) -> usize {
        self.entries.lock().iter().filter(|e| *e == entry).count()
    }

    /// Returns how many entries end with `:<event>`, across all participants.
    #[must_use]
    pub fn count_event(&self, event: &str) -> usize {
        let suffix = format!(":{event}");
        self.entries
            .lock()
            .iter()
            .filter(|e| e.ends_with(&suffix))
            .count()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// How a recording participant's `cleanup` misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum CleanupFault {
    #[default]
    None,
    Error,
    Panic,
}

/// A command that records its lifecycle and handler calls.
///
/// On every call it writes its configured outputs into the context and
/// returns its configured [`Flow`].
#[derive(Debug)]
pub struct RecordingCommand {
    name: String,
    log: EventLog,
    requires: AttributeSet,
    provides: AttributeSet,
    outputs: Vec<(String, Value)>,
    flow: Flow,
    fail_setup: bool,
    cleanup_fault: CleanupFault,
}

impl RecordingCommand {
    /// Creates a recording command with an empty contract that continues.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &EventLog) -> Self {
        Self {
            name: name.into(),
            log: log.clone(),
            requires: AttributeSet::new(),
            provides: AttributeSet::new(),
            outputs: Vec::new(),
            flow: Flow::Continue,
            fail_setup: false,
            cleanup_fault: CleanupFault::None,
        }
    }

    /// Sets the required attributes.
    #[must_use]
    pub fn with_requires(mut self, requires: impl Into<AttributeSet>) -> Self {
        self.requires = requires.into();
        self
    }

    /// Declares `attribute` as provided and writes `value` to it on every call.
    #[must_use]
    pub fn with_output(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        let attribute = attribute.into();
        self.provides.insert(attribute.clone());
        self.outputs.push((attribute, value.into()));
        self
    }

    /// Declares provided attributes without writing them.
    #[must_use]
    pub fn with_declared_provides(mut self, provides: impl Into<AttributeSet>) -> Self {
        self.provides.merge(&provides.into());
        self
    }

    /// Sets the flow returned by every call.
    #[must_use]
    pub const fn with_flow(mut self, flow: Flow) -> Self {
        self.flow = flow;
        self
    }

    /// Makes `setup` fail.
    #[must_use]
    pub const fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    /// Makes `cleanup` return an error after recording the call.
    #[must_use]
    pub const fn failing_cleanup(mut self) -> Self {
        self.cleanup_fault = CleanupFault::Error;
        self
    }

    /// Makes `cleanup` panic after recording the call.
    #[must_use]
    pub const fn panicking_cleanup(mut self) -> Self {
        self.cleanup_fault = CleanupFault::Panic;
        self
    }
}

impl Lifecycle for RecordingCommand {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.log.record(&self.name, "setup");
        if self.fail_setup {
            anyhow::bail!("{} failed to set up", self.name);
        }
        Ok(())
    }

    fn cleanup(&mut self) -> anyhow::Result<()> {
        self.log.record(&self.name, "cleanup");
        match self.cleanup_fault {
            CleanupFault::None => Ok(()),
            CleanupFault::Error => Err(anyhow::anyhow!("{} failed to clean up", self.name)),
            CleanupFault::Panic => panic!("{} panicked during cleanup", self.name),
        }
    }
}

impl<C: AttributeContext> Command<C> for RecordingCommand {
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
        self.log.record(&self.name, "handle");
        for (attribute, value) in &self.outputs {
            context.set(attribute.clone(), value.clone());
        }
        Ok(self.flow)
    }
}

/// A source that records its calls and yields a fixed list of items.
#[derive(Debug)]
pub struct RecordingSource {
    name: String,
    log: EventLog,
    attribute: String,
    items: Vec<Value>,
    index: usize,
    provides: AttributeSet,
}

impl RecordingSource {
    /// Creates a source writing each of `items` to `attribute`, one per cycle.
    pub fn new<T: Into<Value>>(
        name: impl Into<String>,
        log: &EventLog,
        attribute: impl Into<String>,
        items: impl IntoIterator<Item = T>,
    ) -> Self {
        let attribute = attribute.into();
        Self {
            name: name.into(),
            log: log.clone(),
            provides: AttributeSet::from(attribute.clone()),
            attribute,
            items: items.into_iter().map(Into::into).collect(),
            index: 0,
        }
    }
}

impl Lifecycle for RecordingSource {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.log.record(&self.name, "setup");
        self.index = 0;
        Ok(())
    }

    fn cleanup(&mut self) -> anyhow::Result<()> {
        self.log.record(&self.name, "cleanup");
        Ok(())
    }
}

impl<C: AttributeContext> Source<C> for RecordingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn provides(&self) -> &AttributeSet {
        &self.provides
    }

    fn next(&mut self, context: &mut C) -> Result<bool, HandleError> {
        self.log.record(&self.name, "next");
        let Some(item) = self.items.get(self.index) else {
            return Ok(false);
        };
        context.set(self.attribute.clone(), item.clone());
        self.index += 1;
        Ok(true)
    }
}

/// A sink that records its calls and collects one attribute per cycle.
///
/// Its result is a JSON array of the collected values, or `None` when no
/// cycle reached it.
#[derive(Debug)]
pub struct RecordingSink {
    name: String,
    log: EventLog,
    attribute: String,
    requires: AttributeSet,
    values: Vec<Value>,
}

impl RecordingSink {
    /// Creates a sink collecting `attribute`, which becomes its requirement.
    #[must_use]
    pub fn new(name: impl Into<String>, log: &EventLog, attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            name: name.into(),
            log: log.clone(),
            requires: AttributeSet::from(attribute.as_str()),
            attribute,
            values: Vec::new(),
        }
    }
}

impl Lifecycle for RecordingSink {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.log.record(&self.name, "setup");
        self.values.clear();
        Ok(())
    }

    fn cleanup(&mut self) -> anyhow::Result<()> {
        self.log.record(&self.name, "cleanup");
        Ok(())
    }
}

impl<C: AttributeContext> Sink<C> for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires(&self) -> &AttributeSet {
        &self.requires
    }

    fn handle(&mut self, context: &C) -> Result<(), HandleError> {
        self.log.record(&self.name, "handle");
        if let Some(value) = context.get(&self.attribute) {
            self.values.push(value.clone());
        }
        Ok(())
    }

    fn result(&self) -> Option<Value> {
        if self.values.is_empty() {
            None
        } else {
            Some(Value::Array(self.values.clone()))
        }
    }
}

/// A command whose handler always fails.
#[derive(Debug, Clone)]
pub struct FailingCommand {
    name: String,
    message: String,
    illegal_state: bool,
}

impl FailingCommand {
    /// Creates a command failing with a fatal error.
    #[must_use]
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            illegal_state: false,
        }
    }

    /// Creates a command failing with [`HandleError::IllegalState`].
    #[must_use]
    pub fn illegal_state(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            illegal_state: true,
            ..Self::new(name, message)
        }
    }
}

impl Lifecycle for FailingCommand {}

impl<C> Command<C> for FailingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&mut self, _context: &mut C) -> Result<Flow, HandleError> {
        if self.illegal_state {
            Err(HandleError::illegal_state(self.message.clone()))
        } else {
            Err(anyhow::anyhow!("{}", self.message).into())
        }
    }
}

/// A command that continues a fixed number of times, then aborts the run.
#[derive(Debug, Clone)]
pub struct AbortingCommand {
    name: String,
    reason: Option<String>,
    continue_for: usize,
    calls: usize,
}

impl AbortingCommand {
    /// Creates a command aborting on its first call.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: None,
            continue_for: 0,
            calls: 0,
        }
    }

    /// Continues for `cycles` calls before aborting.
    #[must_use]
    pub const fn after(mut self, cycles: usize) -> Self {
        self.continue_for = cycles;
        self
    }

    /// Sets the abort reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl Lifecycle for AbortingCommand {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.calls = 0;
        Ok(())
    }
}

impl<C> Command<C> for AbortingCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&mut self, _context: &mut C) -> Result<Flow, HandleError> {
        self.calls += 1;
        if self.calls <= self.continue_for {
            return Ok(Flow::Continue);
        }
        Err(HandleError::Abort {
            reason: self.reason.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_log_is_shared_between_clones() {
        let log = EventLog::new();
        let other = log.clone();
        log.record("a", "setup");
        other.record("b", "setup");
        other.record("a", "cleanup");

        assert_eq!(log.entries(), vec!["a:setup", "b:setup", "a:cleanup"]);
        assert_eq!(log.count("a:setup"), 1);
        assert_eq!(log.count_event("setup"), 2);
        assert_eq!(log.len(), 3);

        log.clear();
        assert!(other.is_empty());
    }

    #[test]
    fn test_recording_command_writes_outputs() {
        let log = EventLog::new();
        let mut cmd = RecordingCommand::new("writer", &log)
            .with_output("x", 1)
            .with_flow(Flow::Stop);
        let mut ctx = Context::new();

        let flow = Command::<Context>::handle(&mut cmd, &mut ctx).unwrap();

        assert_eq!(flow, Flow::Stop);
        assert_eq!(ctx.get("x"), Some(&serde_json::json!(1)));
        assert!(Command::<Context>::provides(&cmd).contains("x"));
        assert_eq!(log.entries(), vec!["writer:handle"]);
    }

    #[test]
    fn test_recording_command_faults() {
        let log = EventLog::new();
        let mut cmd = RecordingCommand::new("broken", &log)
            .failing_setup()
            .failing_cleanup();

        assert!(cmd.setup().is_err());
        assert!(cmd.cleanup().is_err());
        assert_eq!(log.entries(), vec!["broken:setup", "broken:cleanup"]);
    }

    #[test]
    fn test_recording_source_resets_on_setup() {
        let log = EventLog::new();
        let mut source = RecordingSource::new("src", &log, "item", ["a"]);
        let mut ctx = Context::new();

        source.setup().unwrap();
        assert!(source.next(&mut ctx).unwrap());
        assert!(!source.next(&mut ctx).unwrap());
        source.setup().unwrap();
        assert!(source.next(&mut ctx).unwrap());
        assert_eq!(ctx.get("item"), Some(&serde_json::json!("a")));
    }

    #[test]
    fn test_recording_sink_collects_and_resets() {
        let log = EventLog::new();
        let mut sink = RecordingSink::new("sink", &log, "item");

        sink.setup().unwrap();
        sink.handle(&Context::from_attributes([("item", 1)])).unwrap();
        sink.handle(&Context::new()).unwrap();
        assert_eq!(Sink::<Context>::result(&sink), Some(serde_json::json!([1])));
        assert!(Sink::<Context>::requires(&sink).contains("item"));

        sink.setup().unwrap();
        assert_eq!(Sink::<Context>::result(&sink), None);
        assert_eq!(
            log.entries(),
            vec!["sink:setup", "sink:handle", "sink:handle", "sink:setup"]
        );
    }

    #[test]
    fn test_aborting_command_counts_calls() {
        let mut cmd = AbortingCommand::new("quitter").after(1).with_reason("done");
        let mut ctx = Context::new();

        assert_eq!(cmd.handle(&mut ctx).unwrap(), Flow::Continue);
        assert!(cmd.handle(&mut ctx).unwrap_err().is_abort());

        cmd.setup().unwrap();
        assert_eq!(cmd.handle(&mut ctx).unwrap(), Flow::Continue);
    }

    #[test]
    fn test_failing_command_kinds() {
        let mut ctx = Context::new();

        let err = FailingCommand::new("f", "boom").handle(&mut ctx).unwrap_err();
        assert!(matches!(err, HandleError::Failed(_)));

        let err = FailingCommand::illegal_state("f", "bad").handle(&mut ctx).unwrap_err();
        assert!(matches!(err, HandleError::IllegalState(ref m) if m == "bad"));
    }
}
