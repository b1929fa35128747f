//! Advisory locking of the vault directory.
//!
//! The vault core never coordinates writers on its own; concurrent writers
//! race and the last one wins.  A [`DirectoryLock`] plugged in at the
//! [`Vault`](super::Vault) boundary lets deployments enforce a single owner.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::errors::{Result, VaultError};

/// Name of the lock file inside the vault root.
///
/// Dot-prefixed so the key walk never mistakes it for an entry.
pub const LOCK_FILE_NAME: &str = ".lock";

/// Exclusive ownership of a vault directory.
#[async_trait]
pub trait DirectoryLock: Send + Sync + fmt::Debug {
    /// Take the lock.  Called once the vault starts opening; calling it
    /// again while the lock is held must succeed.
    async fn acquire(&self, root: &Path) -> Result<()>;

    /// Give the lock back.  Called from the vault's `Drop`, so it is
    /// synchronous and may block briefly.
    fn release(&self, root: &Path);
}

/// No locking at all.  The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLock;

#[async_trait]
impl DirectoryLock for NoLock {
    async fn acquire(&self, _root: &Path) -> Result<()> {
        Ok(())
    }

    fn release(&self, _root: &Path) {}
}

/// Lock by exclusively creating `<root>/.lock`.
///
/// A crashed process leaves the file behind; removing it by hand unlocks
/// the vault.
#[derive(Debug, Default)]
pub struct LockFile {
    held: AtomicBool,
}

impl LockFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(LOCK_FILE_NAME)
    }
}

#[async_trait]
impl DirectoryLock for LockFile {
    async fn acquire(&self, root: &Path) -> Result<()> {
        if self.held.load(Ordering::Acquire) {
            return Ok(());
        }

        fs::create_dir_all(root).await?;
        let path = Self::path(root);
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(VaultError::VaultLocked(root.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(format!("{}\n", std::process::id()).as_bytes())
            .await?;

        self.held.store(true, Ordering::Release);
        debug!(path = %path.display(), "acquired vault lock");
        Ok(())
    }

    fn release(&self, root: &Path) {
        if !self.held.swap(false, Ordering::AcqRel) {
            return;
        }
        let path = Self::path(root);
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "released vault lock"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove vault lock"),
        }
    }
}
