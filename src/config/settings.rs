use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};
use crate::vault::Encoding;

/// Project-level configuration, loaded from `.shardvault.toml`.
///
/// Every field has a sensible default so shardvault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the vault tree.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// Encoding used by `set` when `--encoding` is not given.
    #[serde(default = "default_encoding")]
    pub default_encoding: Encoding,

    /// Take `<vault_dir>/.lock` while a command runs.
    #[serde(default = "default_lock")]
    pub lock: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    ".shardvault".to_string()
}

fn default_encoding() -> Encoding {
    Encoding::String
}

fn default_lock() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            default_encoding: default_encoding(),
            lock: default_lock(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".shardvault.toml";

    /// Load settings from `<project_dir>/.shardvault.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Full path to the vault root.
    ///
    /// Example: `project_dir/.shardvault`
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
