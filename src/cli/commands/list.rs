//! `shardvault list`: display keys and their encodings in a table.

use crate::cli::{open_vault, output, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub async fn execute(cli: &Cli) -> Result<()> {
    let (vault, _settings) = open_vault(cli).await?;

    let mut rows = Vec::new();
    for key in vault.raw_keys(None).await? {
        let encoding = vault.encoding_of(key.as_slice()).await?;
        rows.push((String::from_utf8_lossy(&key).into_owned(), encoding));
    }

    output::info(&format!(
        "{}: {} key(s)",
        vault.path().display(),
        rows.len()
    ));
    output::print_keys_table(&rows);

    Ok(())
}
