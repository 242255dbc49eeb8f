//! Data sources feeding a pipeline.
//!
//! A source is pulled once per cycle. It either writes the next unit of data
//! into the context and returns `true`, or returns `false` when exhausted.

use crate::context::{AttributeContext, AttributeSet, Context};
use crate::errors::{HandleError, PipelineError};
use crate::lifecycle::Lifecycle;
use crate::utils::short_type_name;
use serde_json::Value;

static NO_ATTRIBUTES: AttributeSet = AttributeSet::new();

/// Trait for pipeline sources.
pub trait Source<C = Context>: Lifecycle {
    /// Returns the display name used in diagnostics.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    /// Attributes this source populates.
    ///
    /// Only consulted when commands are registered; not re-checked per call.
    fn provides(&self) -> &AttributeSet {
        &NO_ATTRIBUTES
    }

    /// Loads the next unit of data into the context.
    ///
    /// Returns `false` when no more data is available.
    ///
    /// # Errors
    ///
    /// [`HandleError::Abort`] ends the run gracefully; anything else is fatal.
    fn next(&mut self, context: &mut C) -> Result<bool, HandleError>;
}

/// A source that yields exactly one cycle per run.
///
/// Used when a pipeline is built without a source.
#[derive(Debug, Clone, Default)]
pub struct OneShotSource {
    count: usize,
}

impl OneShotSource {
    /// Creates a new one-shot source.
    #[must_use]
    pub const fn new() -> Self {
        Self { count: 0 }
    }
}

impl Lifecycle for OneShotSource {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.count = 0;
        Ok(())
    }
}

impl<C> Source<C> for OneShotSource {
    fn next(&mut self, _context: &mut C) -> Result<bool, HandleError> {
        self.count += 1;
        Ok(self.count == 1)
    }
}

/// A source that writes the items of a list into one attribute, one per cycle.
#[derive(Debug, Clone)]
pub struct ListSource {
    attribute: String,
    provides: AttributeSet,
    data: Vec<Value>,
    index: usize,
}

impl ListSource {
    /// Creates a list source.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::IllegalArgument` if `data` is empty.
    pub fn new<T: Into<Value>>(
        attribute: impl Into<String>,
        data: impl IntoIterator<Item = T>,
    ) -> Result<Self, PipelineError> {
        let attribute = attribute.into();
        let data: Vec<Value> = data.into_iter().map(Into::into).collect();

        if data.is_empty() {
            return Err(PipelineError::IllegalArgument(format!(
                "ListSource for '{attribute}' needs at least one item"
            )));
        }

        Ok(Self {
            provides: AttributeSet::from(attribute.as_str()),
            attribute,
            data,
            index: 0,
        })
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; empty lists are rejected at construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of items not yet delivered in the current run.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.index)
    }
}

impl Lifecycle for ListSource {
    fn setup(&mut self) -> anyhow::Result<()> {
        self.index = 0;
        Ok(())
    }
}

impl<C: AttributeContext> Source<C> for ListSource {
    fn provides(&self) -> &AttributeSet {
        &self.provides
    }

    fn next(&mut self, context: &mut C) -> Result<bool, HandleError> {
        let Some(item) = self.data.get(self.index) else {
            return Ok(false);
        };
        context.set(self.attribute.as_str(), item.clone());
        self.index += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_one_shot_source() {
        let mut source = OneShotSource::new();
        let mut ctx = Context::new();

        assert!(Source::<Context>::next(&mut source, &mut ctx).unwrap());
        assert!(!Source::<Context>::next(&mut source, &mut ctx).unwrap());
        assert!(!Source::<Context>::next(&mut source, &mut ctx).unwrap());

        source.setup().unwrap();
        assert!(Source::<Context>::next(&mut source, &mut ctx).unwrap());
        assert_eq!(Source::<Context>::name(&source), "OneShotSource");
    }

    #[test]
    fn test_list_source_iterates_in_order() {
        let mut source = ListSource::new("value", [1, 3, 8]).unwrap();
        let mut ctx = Context::new();
        let mut seen = Vec::new();

        while source.next(&mut ctx).unwrap() {
            seen.push(ctx.get("value").cloned().unwrap());
        }

        assert_eq!(seen, vec![json!(1), json!(3), json!(8)]);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_list_source_setup_resets_cursor() {
        let mut source = ListSource::new("value", ["a", "b"]).unwrap();
        let mut ctx = Context::new();

        while source.next(&mut ctx).unwrap() {}
        source.setup().unwrap();

        assert_eq!(source.remaining(), 2);
        assert!(source.next(&mut ctx).unwrap());
        assert_eq!(ctx.get("value"), Some(&json!("a")));
    }

    #[test]
    fn test_list_source_provides_attribute() {
        let source = ListSource::new("value", [1]).unwrap();
        assert!(Source::<Context>::provides(&source).contains("value"));
        assert_eq!(source.len(), 1);
    }

    #[test]
    fn test_list_source_rejects_empty_data() {
        let result = ListSource::new("value", Vec::<Value>::new());
        assert!(matches!(result, Err(PipelineError::IllegalArgument(_))));
    }
}
