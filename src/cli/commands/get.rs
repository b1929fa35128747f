//! `shardvault get`: print the value stored under a key.

use crate::cli::{open_vault, render_value, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `get` command.
pub async fn execute(cli: &Cli, key: &str) -> Result<()> {
    let (vault, _settings) = open_vault(cli).await?;

    let value = vault
        .get(key)
        .await?
        .ok_or_else(|| VaultError::CommandFailed(format!("key '{key}' not found")))?;
    println!("{}", render_value(&value));

    Ok(())
}
