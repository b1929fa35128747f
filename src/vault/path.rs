//! Mapping between logical keys and sharded, encrypted filesystem paths.
//!
//! ```text
//! hex  = hex(encrypt(logical_key))
//! path = <root>/<hex[0..2]>/<hex[2..4]>/<hex>
//! ```
//!
//! Because encryption is deterministic, a key always lands on the same
//! path.  The mapping is invertible: hex-decoding and decrypting a leaf
//! name yields the logical key again, which is how `keys()` works without
//! a separate index.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, trace};

use super::key::VaultKey;
use crate::crypto::Cipher;
use crate::errors::Result;

/// Length of one shard directory name in hex characters.
const SHARD_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct PathMapper {
    root: PathBuf,
    cipher: Cipher,
}

impl PathMapper {
    pub fn new(root: PathBuf, cipher: Cipher) -> Self {
        Self { root, cipher }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the on-disk location of `key`.
    pub fn key_to_path(&self, key: &VaultKey) -> Result<PathBuf> {
        key.validate()?;
        let leaf = hex::encode(self.cipher.encrypt(key.as_bytes())?);
        Ok(self
            .root
            .join(&leaf[..SHARD_LEN])
            .join(&leaf[SHARD_LEN..2 * SHARD_LEN])
            .join(leaf))
    }

    /// Recover the logical key stored under `<outer>/<inner>/<leaf>`.
    ///
    /// Returns `Ok(None)` for names that are not vault entries at all
    /// (temp files, stray files, mismatched shards).  A well-formed leaf
    /// that fails to decrypt is an integrity error.
    pub fn leaf_to_key(&self, outer: &str, inner: &str, leaf: &str) -> Result<Option<Vec<u8>>> {
        if leaf.starts_with('.') || !leaf.is_ascii() || leaf.len() < 2 * SHARD_LEN {
            return Ok(None);
        }
        if &leaf[..SHARD_LEN] != outer || &leaf[SHARD_LEN..2 * SHARD_LEN] != inner {
            trace!(leaf, "leaf does not belong to its shard, skipping");
            return Ok(None);
        }
        let Ok(ciphertext) = hex::decode(leaf) else {
            trace!(leaf, "leaf is not hex, skipping");
            return Ok(None);
        };
        self.cipher.decrypt(&ciphertext).map(Some)
    }

    /// Walk the whole tree and decrypt every leaf name.
    pub async fn walk(&self) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();

        for (outer, outer_path) in shard_dirs(&self.root).await? {
            for (inner, inner_path) in shard_dirs(&outer_path).await? {
                let mut entries = fs::read_dir(&inner_path).await?;
                while let Some(entry) = entries.next_entry().await? {
                    if !entry.file_type().await?.is_file() {
                        continue;
                    }
                    let name = entry.file_name();
                    let Some(leaf) = name.to_str() else {
                        continue;
                    };
                    if let Some(key) = self.leaf_to_key(&outer, &inner, leaf)? {
                        keys.push(key);
                    }
                }
            }
        }

        debug!(count = keys.len(), root = %self.root.display(), "walked vault tree");
        Ok(keys)
    }

    /// `true` if the root holds at least one shard directory.
    ///
    /// Used to tell an empty directory apart from a vault written under a
    /// different key (whose sentinel lives at a path we cannot derive).
    pub async fn has_shards(&self) -> Result<bool> {
        Ok(!shard_dirs(&self.root).await?.is_empty())
    }
}

/// `true` for names like `3f`: exactly two lowercase hex digits.
pub fn is_shard_name(name: &str) -> bool {
    name.len() == SHARD_LEN && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// List the shard subdirectories of `dir`. A missing `dir` has none.
async fn shard_dirs(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut shards = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_shard_name(&name) && entry.file_type().await?.is_dir() {
            shards.push((name, entry.path()));
        }
    }
    Ok(shards)
}
