//! `shardvault delete`: remove a key from the vault.

use dialoguer::Confirm;

use crate::cli::{open_vault, output, Cli};
use crate::errors::{Result, VaultError};

/// Execute the `delete` command.
pub async fn execute(cli: &Cli, key: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete key '{key}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Err(VaultError::UserCancelled);
        }
    }

    let (vault, _settings) = open_vault(cli).await?;

    if vault.delete(key).await? {
        output::success(&format!("Deleted key '{key}'"));
    } else {
        output::info(&format!("Key '{key}' was not set"));
    }

    Ok(())
}
