//! Keyfiles: a vault key persisted as 32 raw bytes on disk.
//!
//! The library itself never reads key material from disk; callers pass a
//! [`SymmetricKey`].  Keyfiles are how the CLI keeps that key between runs.

use std::fs;
use std::path::Path;

use zeroize::Zeroize;

use super::keys::{generate_key, SymmetricKey, KEY_LEN};
use crate::errors::{Result, VaultError};

/// Generate a new random vault key and write it to `path`.
///
/// The file is written with restrictive permissions (owner-only read).
/// Returns the key so the caller can use it immediately.
pub fn generate_keyfile(path: &Path) -> Result<SymmetricKey> {
    if path.exists() {
        return Err(VaultError::KeyfileError(format!(
            "keyfile already exists at {}",
            path.display()
        )));
    }

    let key = generate_key();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                VaultError::KeyfileError(format!("cannot create keyfile directory: {e}"))
            })?;
        }
    }

    fs::write(path, key.as_bytes())
        .map_err(|e| VaultError::KeyfileError(format!("failed to write keyfile: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            VaultError::KeyfileError(format!("failed to set keyfile permissions: {e}"))
        })?;
    }

    Ok(key)
}

/// Load a keyfile from disk and validate its length.
pub fn load_keyfile(path: &Path) -> Result<SymmetricKey> {
    if !path.exists() {
        return Err(VaultError::KeyfileError(format!(
            "keyfile not found at {}",
            path.display()
        )));
    }

    let mut data = fs::read(path)
        .map_err(|e| VaultError::KeyfileError(format!("failed to read keyfile: {e}")))?;

    if data.len() != KEY_LEN {
        let actual = data.len();
        data.zeroize();
        return Err(VaultError::KeyfileError(format!(
            "keyfile must be exactly {KEY_LEN} bytes, got {actual}"
        )));
    }

    let key = SymmetricKey::from_slice(&data);
    data.zeroize();
    key
}
