//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::Settings;
use crate::crypto::{load_keyfile, SymmetricKey};
use crate::errors::{Result, VaultError};
use crate::vault::{Encoding, LockFile, Value, Vault};

/// Environment variable holding the vault key as 64 hex characters.
pub const KEY_ENV: &str = "SHARDVAULT_KEY";

/// shardvault CLI: encrypted filesystem key-value vault.
#[derive(Parser)]
#[command(
    name = "shardvault",
    about = "Encrypted filesystem key-value vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory (default: from .shardvault.toml, else .shardvault)
    #[arg(long, global = true)]
    pub vault_dir: Option<String>,

    /// Path to a 32-byte keyfile (otherwise SHARDVAULT_KEY is used)
    #[arg(long, global = true, env = "SHARDVAULT_KEY_FILE")]
    pub key_file: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a new vault key (prints hex, or writes a keyfile)
    Keygen {
        /// Write the key to this keyfile instead of printing it
        path: Option<String>,
    },

    /// Initialize the vault directory (or validate an existing one)
    Init,

    /// Print the value stored under a key
    Get {
        /// Logical key
        key: String,
    },

    /// Store a value (add or replace)
    Set {
        /// Logical key
        key: String,
        /// Value (omit for stdin or an interactive prompt); raw values are hex
        value: Option<String>,
        /// Encoding: raw, string or json (default: from settings)
        #[arg(short, long)]
        encoding: Option<String>,
    },

    /// Delete a key
    Delete {
        /// Logical key
        key: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// List logical keys, optionally only those under a namespace prefix
    Keys {
        /// Namespace prefix, e.g. `posts` for `posts.*`
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Show keys with their encodings in a table
    List,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Load settings from the current directory.
pub fn load_settings() -> Result<(PathBuf, Settings)> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    Ok((cwd, settings))
}

/// Resolve the vault root: `--vault-dir` wins over settings.
pub fn vault_path(cli: &Cli, cwd: &Path, settings: &Settings) -> PathBuf {
    match &cli.vault_dir {
        Some(dir) => cwd.join(dir),
        None => settings.vault_path(cwd),
    }
}

/// Get the vault key, trying in order:
/// 1. `--key-file` / `SHARDVAULT_KEY_FILE`
/// 2. `SHARDVAULT_KEY` (hex)
pub fn load_key(cli: &Cli) -> Result<SymmetricKey> {
    if let Some(path) = &cli.key_file {
        return load_keyfile(Path::new(path));
    }

    match std::env::var(KEY_ENV) {
        Ok(hex) if !hex.is_empty() => SymmetricKey::from_hex(&hex),
        _ => Err(VaultError::KeyfileError(format!(
            "no vault key; pass --key-file <path> or set {KEY_ENV}"
        ))),
    }
}

/// Open the vault named by the CLI arguments and wait until it is ready.
pub async fn open_vault(cli: &Cli) -> Result<(Vault, Settings)> {
    let (cwd, settings) = load_settings()?;
    let path = vault_path(cli, &cwd, &settings);
    let key = load_key(cli)?;

    let builder = Vault::builder(path, key);
    let vault = if settings.lock {
        builder.lock(LockFile::new()).open().await?
    } else {
        builder.open().await?
    };
    Ok((vault, settings))
}

/// Turn command-line text into a value for `encoding`.
pub fn parse_value(input: &str, encoding: Encoding) -> Result<Value> {
    match encoding {
        Encoding::Raw => hex::decode(input.trim())
            .map(Value::Bytes)
            .map_err(|e| VaultError::CommandFailed(format!("raw values must be hex: {e}"))),
        Encoding::String => Ok(Value::Text(input.to_string())),
        Encoding::Json => serde_json::from_str(input)
            .map(Value::Json)
            .map_err(|e| VaultError::SerializationError(format!("value is not valid JSON: {e}"))),
    }
}

/// Render a stored value for the terminal.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Bytes(bytes) => hex::encode(bytes),
        Value::Text(text) => text.clone(),
        Value::Json(json) => serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string()),
    }
}
