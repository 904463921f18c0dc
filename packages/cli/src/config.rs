use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tenniarb_editor::{EditorConfig, DEFAULT_CONFIG_NAME};

/// Tenniarb configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory searched for .tn files when no path is given
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    #[serde(flatten)]
    pub editor: EditorConfig,
}

fn default_src_dir() -> String {
    ".".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to source directory
    pub fn get_src_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.src_dir)
    }

    /// Editor settings for one-shot tools: history is not needed and
    /// notifications are delivered inline
    pub fn tool_editor_config(&self) -> EditorConfig {
        EditorConfig {
            max_undo_levels: self.editor.max_undo_levels,
            ..EditorConfig::inline()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            editor: EditorConfig::default(),
        }
    }
}
