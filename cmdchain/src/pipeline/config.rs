//! Pipeline configuration.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};

/// Configuration for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name used in logs, errors and run reports.
    #[serde(default = "default_name")]
    pub name: String,
    /// Upper bound on cycles per run. `None` means unbounded.
    #[serde(default)]
    pub max_cycles: Option<u64>,
    /// Whether `run` checks the sink's requirements against the registered
    /// participants before starting.
    #[serde(default = "default_check_sink_requirements")]
    pub check_sink_requirements: bool,
}

fn default_name() -> String {
    "pipeline".to_string()
}

const fn default_check_sink_requirements() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_cycles: None,
            check_sink_requirements: default_check_sink_requirements(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the pipeline name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the cycle limit.
    #[must_use]
    pub const fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// Enables or disables the sink requirement check.
    #[must_use]
    pub const fn with_sink_requirement_check(mut self, enabled: bool) -> Self {
        self.check_sink_requirements = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new();

        assert_eq!(config.name, "pipeline");
        assert_eq!(config.max_cycles, None);
        assert!(config.check_sink_requirements);
    }

    #[test]
    fn test_builder_methods() {
        let config = PipelineConfig::new()
            .with_name("ingest")
            .with_max_cycles(10)
            .with_sink_requirement_check(false);

        assert_eq!(config.name, "ingest");
        assert_eq!(config.max_cycles, Some(10));
        assert!(!config.check_sink_requirements);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = PipelineConfig::from_json(r#"{"max_cycles": 5}"#).unwrap();

        assert_eq!(
            config,
            PipelineConfig {
                name: "pipeline".to_string(),
                max_cycles: Some(5),
                check_sink_requirements: true,
            }
        );
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        let result = PipelineConfig::from_json("{not json");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
