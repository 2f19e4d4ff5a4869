use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const TRACE_TIMING_ENV: &str = "ABLE_TRACE_TIMING";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Log per-pass elapsed time.
    pub trace_timing: bool,
    /// Undefined identifiers become `Unknown` instead of an error (REPL-style embedders).
    pub allow_dynamic_lookups: bool,
    /// Warn about `rescue` expressions without handler clauses.
    pub warn_unused_rescue: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            trace_timing: false,
            allow_dynamic_lookups: false,
            warn_unused_rescue: true,
        }
    }
}

fn trace_timing_from_env() -> bool {
    std::env::var(TRACE_TIMING_ENV).is_ok_and(|v| v == "1")
}

impl CheckerConfig {
    /// Defaults plus `ABLE_TRACE_TIMING=1`.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Self {
        if trace_timing_from_env() {
            self.trace_timing = true;
        }
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = CheckerConfig::from_toml_str("allow_dynamic_lookups = true\n")
            .expect("valid config");
        assert!(config.allow_dynamic_lookups);
        assert!(config.warn_unused_rescue);
        assert!(!config.trace_timing);
    }

    #[test]
    fn malformed_toml_is_reported() {
        let err = CheckerConfig::from_toml_str("trace_timing = \"yes\"").expect_err("invalid config");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CheckerConfig::load(Path::new("/nonexistent/able-check.toml")).expect_err("invalid config");
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
