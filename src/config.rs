//! Options that tune how a `Flow` treats links.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid options: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlowOptions {
    /// Reject links whose source type is not assignable to the target type
    /// when they are added. Off by default: a flow under construction may be
    /// temporarily invalid.
    pub validate_links: bool,
    /// Maximum number of values each link remembers in its contents history.
    /// `None` keeps everything.
    pub link_history_limit: Option<usize>,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self { validate_links: false, link_history_limit: Some(16) }
    }
}

impl FlowOptions {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_fields_use_defaults() {
        let options = FlowOptions::from_json_str(r#"{ "validate_links": true }"#).unwrap();
        assert!(options.validate_links);
        assert_eq!(options.link_history_limit, Some(16));
    }

    #[test]
    fn test_null_history_limit_is_unbounded() {
        let options = FlowOptions::from_json_str(r#"{ "link_history_limit": null }"#).unwrap();
        assert_eq!(options.link_history_limit, None);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = FlowOptions::from_json_str(r#"{ "validate": true }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "validate_links": true, "link_history_limit": 2 }}"#).unwrap();
        let options = FlowOptions::from_path(file.path()).unwrap();
        assert_eq!(options, FlowOptions { validate_links: true, link_history_limit: Some(2) });

        let missing = FlowOptions::from_path(file.path().with_extension("absent"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
