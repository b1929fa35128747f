//! `shardvault set`: add or replace a value.

use std::io::{self, IsTerminal, Read};

use crate::cli::{open_vault, output, parse_value, Cli};
use crate::errors::{Result, VaultError};
use crate::vault::Encoding;

/// Execute the `set` command.
pub async fn execute(
    cli: &Cli,
    key: &str,
    value: Option<&str>,
    encoding: Option<&str>,
) -> Result<()> {
    // Parse the encoding before prompting so typos fail fast.
    let encoding = encoding.map(str::parse::<Encoding>).transpose()?;

    let input = if let Some(v) = value {
        v.to_string()
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        dialoguer::Password::new()
            .with_prompt(format!("Enter value for {key}"))
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("input prompt: {e}")))?
    };

    let (vault, settings) = open_vault(cli).await?;
    let encoding = encoding.unwrap_or(settings.default_encoding);
    let parsed = parse_value(&input, encoding)?;

    let existed = vault.has(key).await?;
    vault.set(key, Some(parsed), encoding).await?;

    let verb = if existed { "updated" } else { "added" };
    output::success(&format!("Key '{key}' {verb} ({encoding})"));

    Ok(())
}
