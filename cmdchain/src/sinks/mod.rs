//! Result sinks.
//!
//! A sink runs once at the end of every cycle in which all commands
//! continued, and exposes the pipeline's result after the run.

use crate::context::{AttributeContext, AttributeSet, Context};
use crate::errors::HandleError;
use crate::lifecycle::Lifecycle;
use crate::utils::short_type_name;
use serde_json::Value;

static NO_ATTRIBUTES: AttributeSet = AttributeSet::new();

/// Trait for pipeline sinks.
pub trait Sink<C = Context>: Lifecycle {
    /// Returns the display name used in diagnostics.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    /// Attributes that must be present when the sink is called.
    fn requires(&self) -> &AttributeSet {
        &NO_ATTRIBUTES
    }

    /// Collects data from the context at the end of a cycle.
    ///
    /// # Errors
    ///
    /// [`HandleError::Abort`] ends the run gracefully; anything else is fatal.
    fn handle(&mut self, context: &C) -> Result<(), HandleError>;

    /// Returns the collected result, or `None` if nothing was collected.
    fn result(&self) -> Option<Value>;
}

/// A sink that captures one attribute, keeping the last cycle's value.
#[derive(Debug, Clone, Default)]
pub struct AttributeSink {
    attribute: Option<String>,
    requires: AttributeSet,
    result: Option<Value>,
}

impl AttributeSink {
    /// Creates a sink capturing `attribute`, which becomes its requirement.
    #[must_use]
    pub fn new(attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            requires: AttributeSet::from(attribute.as_str()),
            attribute: Some(attribute),
            result: None,
        }
    }

    /// Creates a sink without a result attribute. Its result is always `None`.
    #[must_use]
    pub fn discard() -> Self {
        Self::default()
    }

    /// Returns the captured attribute name.
    #[must_use]
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }
}

impl Lifecycle for AttributeSink {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.result = None;
        Ok(())
    }
}

impl<C: AttributeContext> Sink<C> for AttributeSink {
    fn requires(&self) -> &AttributeSet {
        &self.requires
    }

    fn handle(&mut self, context: &C) -> Result<(), HandleError> {
        if let Some(attribute) = &self.attribute {
            self.result = context.get(attribute).cloned();
        }
        Ok(())
    }

    fn result(&self) -> Option<Value> {
        self.result.clone()
    }
}

/// A sink that accumulates one attribute across cycles.
///
/// Its result is a JSON array with one entry per completed cycle, or `None`
/// if no cycle reached the sink.
#[derive(Debug, Clone)]
pub struct CollectingSink {
    attribute: String,
    requires: AttributeSet,
    values: Vec<Value>,
}

impl CollectingSink {
    /// Creates a collecting sink for `attribute`.
    #[must_use]
    pub fn new(attribute: impl Into<String>) -> Self {
        let attribute = attribute.into();
        Self {
            requires: AttributeSet::from(attribute.as_str()),
            attribute,
            values: Vec::new(),
        }
    }

    /// Returns the values collected so far.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl Lifecycle for CollectingSink {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.values.clear();
        Ok(())
    }
}

impl<C: AttributeContext> Sink<C> for CollectingSink {
    fn requires(&self) -> &AttributeSet {
        &self.requires
    }

    fn handle(&mut self, context: &C) -> Result<(), HandleError> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_sink_captures_last_value() {
        let mut sink = AttributeSink::new("name");
        let mut ctx = Context::new();

        assert_eq!(Sink::<Context>::result(&sink), None);

        ctx.set("name", "first");
        sink.handle(&ctx).unwrap();
        ctx.set("name", "second");
        sink.handle(&ctx).unwrap();

        assert_eq!(Sink::<Context>::result(&sink), Some(json!("second")));
        assert!(Sink::<Context>::requires(&sink).contains("name"));
        assert_eq!(sink.attribute(), Some("name"));
    }

    #[test]
    fn test_attribute_sink_requires_whole_name() {
        let sink = AttributeSink::new("total");
        let requires = Sink::<Context>::requires(&sink);

        assert_eq!(requires.len(), 1);
        assert!(requires.contains("total"));
    }

    #[test]
    fn test_attribute_sink_setup_clears_result() {
        let mut sink = AttributeSink::new("x");
        sink.handle(&Context::from_attributes([("x", 1)])).unwrap();
        sink.setup().unwrap();

        assert_eq!(Sink::<Context>::result(&sink), None);
    }

    #[test]
    fn test_discard_sink() {
        let mut sink = AttributeSink::discard();
        sink.handle(&Context::from_attributes([("x", 1)])).unwrap();

        assert_eq!(Sink::<Context>::result(&sink), None);
        assert!(Sink::<Context>::requires(&sink).is_empty());
    }

    #[test]
    fn test_collecting_sink() {
        let mut sink = CollectingSink::new("v");
        assert_eq!(Sink::<Context>::result(&sink), None);

        sink.handle(&Context::from_attributes([("v", 1)])).unwrap();
        sink.handle(&Context::from_attributes([("v", 2)])).unwrap();

        assert_eq!(Sink::<Context>::result(&sink), Some(json!([1, 2])));
        assert_eq!(sink.values().len(), 2);

        sink.setup().unwrap();
        assert!(sink.values().is_empty());
    }
}
