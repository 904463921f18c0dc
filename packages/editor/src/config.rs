use crate::errors::EditorError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "tenniarb.config.json";

/// Editor settings, read from `tenniarb.config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo levels (0 = unlimited)
    #[serde(default = "default_max_undo_levels")]
    pub max_undo_levels: usize,

    /// Run evaluators on the dispatcher thread instead of during `execute`
    #[serde(default = "default_background_evaluation")]
    pub background_evaluation: bool,
}

fn default_max_undo_levels() -> usize {
    100
}

fn default_background_evaluation() -> bool {
    true
}

impl EditorConfig {
    /// Load the config from `dir`, falling back to defaults when there is no
    /// config file
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, EditorError> {
        let path = dir.as_ref().join(DEFAULT_CONFIG_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Defaults with inline evaluation, for tools that want deterministic
    /// single-threaded behaviour
    pub fn inline() -> Self {
        Self {
            background_evaluation: false,
            ..Self::default()
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_undo_levels: default_max_undo_levels(),
            background_evaluation: default_background_evaluation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{ "maxUndoLevels": 5, "backgroundEvaluation": false }"#;
        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_undo_levels, 5);
        assert!(!config.background_evaluation);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{ "maxUndoLevels": 0 }"#).unwrap();
        assert_eq!(config.max_undo_levels, 0);
        assert!(config.background_evaluation);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap(), EditorConfig::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ nope").unwrap();
        assert!(matches!(
            EditorConfig::load(dir.path()),
            Err(EditorError::Config(_))
        ));
    }
}
