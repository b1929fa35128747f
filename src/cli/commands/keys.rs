//! `shardvault keys`: print logical keys, one per line.

use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `keys` command.
pub async fn execute(cli: &Cli, prefix: Option<&str>) -> Result<()> {
    let (vault, _settings) = open_vault(cli).await?;

    for key in vault.keys(prefix.map(str::as_bytes)).await? {
        println!("{key}");
    }

    Ok(())
}
