//! Configuration module for scripthook.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::{HookError, Result};

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/scripthook.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Argument masking configuration.
///
/// Maps instrumented function names to the zero-based argument positions
/// that are replaced with the redaction marker before hooks see them.
#[derive(Debug, Clone, Deserialize)]
pub struct MaskingConfig {
    /// Replacement string for masked arguments.
    #[serde(default = "default_redaction")]
    pub redaction: String,
    /// Function name to masked argument positions.
    #[serde(default = "default_masked_functions")]
    pub functions: HashMap<String, Vec<usize>>,
}

fn default_redaction() -> String {
    crate::hook::masking::DEFAULT_MARKER.to_string()
}

fn default_masked_functions() -> HashMap<String, Vec<usize>> {
    crate::hook::masking::builtin_rules()
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            redaction: default_redaction(),
            functions: default_masked_functions(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Argument masking configuration.
    #[serde(default)]
    pub masking: MaskingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(HookError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| HookError::Config(format!("config parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/scripthook.log");

        assert_eq!(config.masking.redaction, "***");
        assert_eq!(config.masking.functions["logIn"], vec![2]);
        assert_eq!(config.masking.functions["dbConnect"], vec![1, 2, 3]);
        assert_eq!(config.masking.functions.len(), 5);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.masking.functions.len(), 5);
    }

    #[test]
    fn test_parse_logging_override() {
        let config = Config::parse(
            r#"
            [logging]
            level = "debug"
            file = "logs/test.log"
        "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "logs/test.log");
    }

    #[test]
    fn test_parse_masking_override() {
        let config = Config::parse(
            r#"
            [masking]
            redaction = "<hidden>"

            [masking.functions]
            secretCall = [0, 1]
        "#,
        )
        .unwrap();

        assert_eq!(config.masking.redaction, "<hidden>");
        assert_eq!(config.masking.functions["secretCall"], vec![0, 1]);
        // An explicit table replaces the built-in one.
        assert!(!config.masking.functions.contains_key("logIn"));
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(Config::parse("logging = nonsense").is_err());
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[logging]\nlevel = \"trace\"").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("no/such/config.toml");
        assert!(matches!(result, Err(HookError::Io(_))));
    }
}
