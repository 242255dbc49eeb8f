//! The attribute context shared by all participants of a run.

use crate::errors::AttributeTypeError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;

/// A mutable attribute bag read and written by sources, commands and sinks.
///
/// Presence is what contracts check. An attribute set to [`Value::Null`] is
/// present; an attribute that was never set is not.
pub trait AttributeContext {
    /// Gets an attribute value, or `None` if it was never set.
    fn get(&self, name: &str) -> Option<&Value>;

    /// Sets an attribute, replacing any previous value.
    fn set(&mut self, name: impl Into<String>, value: impl Into<Value>);

    /// Checks if an attribute is present.
    fn has_attribute(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// The default context: a plain map from attribute name to JSON value.
///
/// A fresh instance is created for every pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    attributes: HashMap<String, Value>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context pre-populated with attributes.
    #[must_use]
    pub fn from_attributes<K, V>(attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Gets an attribute, defining it with `fallback` first if it is absent.
    pub fn get_or_insert(&mut self, name: impl Into<String>, fallback: impl Into<Value>) -> &Value {
        self.attributes
            .entry(name.into())
            .or_insert_with(|| fallback.into())
    }

    /// Reads an attribute as a concrete type.
    ///
    /// Returns `Ok(None)` when the attribute is absent.
    ///
    /// # Errors
    ///
    /// Returns `AttributeTypeError` if the value cannot be deserialized as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, AttributeTypeError> {
        self.attributes
            .get(name)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| AttributeTypeError {
                    attribute: name.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Removes an attribute, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Returns all attribute names.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns true if no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns a copy of all attributes.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, Value> {
        self.attributes.clone()
    }
}

impl AttributeContext for Context {
    fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut ctx = Context::new();
        ctx.set("key", "value");

        assert_eq!(ctx.get("key"), Some(&json!("value")));
        assert!(ctx.has_attribute("key"));
        assert!(!ctx.has_attribute("other"));
        assert_eq!(ctx.get("other"), None);
    }

    #[test]
    fn test_null_is_present() {
        let mut ctx = Context::new();
        ctx.set("empty", Value::Null);

        assert!(ctx.has_attribute("empty"));
        assert_eq!(ctx.get("empty"), Some(&Value::Null));
    }

    #[test]
    fn test_set_overwrites() {
        let mut ctx = Context::new();
        ctx.set("n", 1);
        ctx.set("n", 2);

        assert_eq!(ctx.get("n"), Some(&json!(2)));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_get_or_insert_defines_absent_attribute() {
        let mut ctx = Context::new();

        assert_eq!(ctx.get_or_insert("total", 0), &json!(0));
        assert!(ctx.has_attribute("total"));

        ctx.set("total", 5);
        assert_eq!(ctx.get_or_insert("total", 0), &json!(5));
    }

    #[test]
    fn test_get_as() {
        let ctx = Context::from_attributes([("count", json!(3)), ("name", json!("x"))]);

        assert_eq!(ctx.get_as::<i64>("count").unwrap(), Some(3));
        assert_eq!(ctx.get_as::<i64>("missing").unwrap(), None);

        let err = ctx.get_as::<i64>("name").unwrap_err();
        assert_eq!(err.attribute, "name");
    }

    #[test]
    fn test_remove_and_keys() {
        let mut ctx = Context::from_attributes([("a", 1), ("b", 2)]);

        assert_eq!(ctx.remove("a"), Some(json!(1)));
        assert_eq!(ctx.keys(), vec!["b".to_string()]);
        assert!(!ctx.is_empty());
        assert_eq!(ctx.to_dict().len(), 1);
    }
}
