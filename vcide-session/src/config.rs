//! Session configuration, read from a TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Report;
use serde::{Deserialize, Serialize};

use crate::catalog::ExampleName;

pub type ConfigError = Report;

fn config_msg(message: impl Into<String>) -> ConfigError {
    Report::msg(message.into())
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Pause between loading an example and verifying it.
    #[serde(default = "default_verify_delay_ms")]
    pub verify_delay_ms: u64,

    /// Example loaded at startup; the catalog's first entry when unset.
    #[serde(default)]
    pub initial_example: Option<ExampleName>,

    #[serde(default = "default_show_source_annotations")]
    pub show_source_annotations: bool,

    /// Directory of `*.js` examples replacing the built-in catalog.
    #[serde(default)]
    pub examples_dir: Option<PathBuf>,

    /// Engine script; without one every obligation is reported unknown.
    #[serde(default)]
    pub script: Option<PathBuf>,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_verify_delay_ms() -> u64 {
    300
}

fn default_show_source_annotations() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            verify_delay_ms: default_verify_delay_ms(),
            initial_example: None,
            show_source_annotations: default_show_source_annotations(),
            examples_dir: None,
            script: None,
            log_filter: default_log_filter(),
        }
    }
}

impl SessionConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| config_msg(format!("Failed to read config {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| config_msg(format!("Invalid config format: {}", e)))
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.verify_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = SessionConfig::from_toml_str("").unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.verify_delay(), Duration::from_millis(300));
        assert!(config.show_source_annotations);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn reads_fields_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vcide.toml");
        std::fs::write(
            &path,
            r#"
verify_delay_ms = 0
initial_example = "sumTo"
show_source_annotations = false
script = "session.toml"
log_filter = "vcide_session=debug"
"#,
        )
        .unwrap();

        let config = SessionConfig::from_file(&path).unwrap();
        assert_eq!(config.verify_delay(), Duration::ZERO);
        assert_eq!(config.initial_example, Some(ExampleName::new("sumTo")));
        assert!(!config.show_source_annotations);
        assert_eq!(config.script, Some(PathBuf::from("session.toml")));
        assert_eq!(config.log_filter, "vcide_session=debug");
    }

    #[test]
    fn malformed_config_is_reported() {
        let err = SessionConfig::from_toml_str("verify_delay_ms = \"soon\"").unwrap_err();
        assert!(err.to_string().contains("Invalid config format"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = SessionConfig::from_file(Path::new("/nonexistent/vcide.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
