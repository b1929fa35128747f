//! `shardvault init`: create the vault directory or validate an existing one.

use crate::cli::{open_vault, output, Cli};
use crate::errors::Result;

/// Execute the `init` command.
pub async fn execute(cli: &Cli) -> Result<()> {
    let (vault, _settings) = open_vault(cli).await?;
    let count = vault.keys(None).await?.len();

    output::success(&format!(
        "Vault ready at {} ({count} keys)",
        vault.path().display()
    ));
    output::tip("Run `shardvault set <KEY> <VALUE>` to store a value.");

    Ok(())
}
