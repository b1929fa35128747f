//! `shardvault keygen`: create a new vault key.

use std::path::Path;

use crate::cli::{output, KEY_ENV};
use crate::crypto::{generate_key, generate_keyfile};
use crate::errors::Result;

/// Execute the `keygen` command.
pub fn execute(path: Option<&str>) -> Result<()> {
    match path {
        Some(path) => {
            generate_keyfile(Path::new(path))?;
            output::success(&format!("Wrote new vault key to {path}"));
            output::tip(&format!("Pass it with: shardvault --key-file {path} <command>"));
        }
        None => {
            // Key on stdout so it can be captured; hints go to stderr.
            println!("{}", generate_key().to_hex());
            output::warning(&format!(
                "Store this key safely; export it as {KEY_ENV} to use the vault."
            ));
        }
    }
    Ok(())
}
