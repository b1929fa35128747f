//! The vault itself: encrypted get/set/has/delete/keys over a directory.
//!
//! `Vault` ties the crypto layer, the path mapper and the encodings
//! together so the rest of the crate can work with calls like
//! `vault.set("name", Some("Jared".into()), Encoding::String)`.
//!
//! Every call goes to disk; there is no in-memory cache, so two `Vault`
//! instances over one directory always read each other's writes (but do
//! not serialize against them).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use subtle::ConstantTimeEq;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use super::encoding::{decode_entry, encode_entry, entry_encoding, Encoding, Value};
use super::key::{VaultKey, DELIMITER};
use super::lock::{DirectoryLock, NoLock};
use super::namespace::Namespace;
use super::path::PathMapper;
use super::records::RecordStore;
use crate::crypto::{Cipher, SymmetricKey};
use crate::errors::{Result, VaultError};

/// Format version written to the `VERSION` entry.
pub const FORMAT_VERSION: &str = "1";

/// Reserved key holding the format version.
pub const VERSION_KEY: &str = "VERSION";

/// Reserved key holding the key-check sentinel.
pub const KEY_CHECK_KEY: &str = "KEY_CHECK";

/// Plaintext of the key-check sentinel.
const KEY_CHECK_VALUE: &str = "KEY_CHECKS_OUT";

/// Where a vault instance is in its open lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VaultState {
    /// Constructed; `ready()` has not finished yet.
    Uninitialized = 0,
    /// `ready()` is reading or writing the sentinel.
    Validating = 1,
    /// The key matches the directory.
    Ready = 2,
    /// The key does not match the directory.  Terminal.
    Invalid = 3,
}

impl VaultState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Validating,
            2 => Self::Ready,
            3 => Self::Invalid,
            _ => Self::Uninitialized,
        }
    }
}

/// Configure a [`Vault`] before constructing it.
#[derive(Debug)]
pub struct VaultBuilder {
    path: PathBuf,
    key: SymmetricKey,
    lock: Box<dyn DirectoryLock>,
}

impl VaultBuilder {
    /// Plug in a directory lock.  Defaults to [`NoLock`].
    pub fn lock(mut self, lock: impl DirectoryLock + 'static) -> Self {
        self.lock = Box::new(lock);
        self
    }

    pub fn build(self) -> Result<Vault> {
        let cipher = Cipher::new(&self.key)?;
        Ok(Vault {
            mapper: PathMapper::new(self.path, cipher.clone()),
            cipher,
            lock: self.lock,
            state: AtomicU8::new(VaultState::Uninitialized as u8),
            open_gate: Mutex::new(()),
            tmp_counter: AtomicU64::new(0),
        })
    }

    /// Build, then wait for [`Vault::ready`].
    pub async fn open(self) -> Result<Vault> {
        let vault = self.build()?;
        vault.ready().await?;
        Ok(vault)
    }
}

/// An encrypted key-value vault rooted at one directory.
#[derive(Debug)]
pub struct Vault {
    mapper: PathMapper,
    cipher: Cipher,
    lock: Box<dyn DirectoryLock>,
    state: AtomicU8,
    /// Serializes `ready()` so the sentinel is written at most once.
    open_gate: Mutex<()>,
    tmp_counter: AtomicU64,
}

impl Vault {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Bind a vault to `path` under `key`.
    ///
    /// Fails if `key` is not exactly 32 bytes.  Nothing is read or written
    /// until [`Vault::ready`].
    pub fn new(path: impl Into<PathBuf>, key: impl AsRef<[u8]>) -> Result<Self> {
        Self::builder(path, SymmetricKey::from_slice(key.as_ref())?).build()
    }

    /// Construct and open in one step.
    pub async fn open(path: impl Into<PathBuf>, key: impl AsRef<[u8]>) -> Result<Self> {
        let vault = Self::new(path, key)?;
        vault.ready().await?;
        Ok(vault)
    }

    pub fn builder(path: impl Into<PathBuf>, key: SymmetricKey) -> VaultBuilder {
        VaultBuilder {
            path: path.into(),
            key,
            lock: Box::new(NoLock),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Resolve once the vault is initialized (first use) or validated.
    ///
    /// The outcome is memoized: after a success every call returns `Ok`,
    /// after a key mismatch every call fails with
    /// [`VaultError::InvalidVaultKey`].  Other errors (I/O, locking) leave
    /// the vault uninitialized so the call can be retried.
    #[instrument(level = "info", skip(self), fields(root = %self.mapper.root().display()))]
    pub async fn ready(&self) -> Result<()> {
        if let Some(done) = self.settled() {
            return done;
        }

        let _gate = self.open_gate.lock().await;
        if let Some(done) = self.settled() {
            return done;
        }

        self.set_state(VaultState::Validating);
        match self.validate_or_init().await {
            Ok(()) => {
                self.set_state(VaultState::Ready);
                info!("vault ready");
                Ok(())
            }
            Err(VaultError::InvalidVaultKey) => {
                self.set_state(VaultState::Invalid);
                warn!("vault key does not match this directory");
                Err(VaultError::InvalidVaultKey)
            }
            Err(e) => {
                self.set_state(VaultState::Uninitialized);
                Err(e)
            }
        }
    }

    /// Initialize a fresh directory, or validate an existing one.
    ///
    /// The one-time write of `KEY_CHECK` and `VERSION` happens inside
    /// [`Vault::ready`], so this is the same call under its lifecycle name.
    pub async fn init(&self) -> Result<()> {
        self.ready().await
    }

    /// `true` if the root directory exists.
    pub async fn exists(&self) -> Result<bool> {
        match fs::metadata(self.mapper.root()).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// `true` if the sentinel decrypts to the expected value under this key.
    ///
    /// Reads the sentinel directly and never initializes the directory.
    pub async fn valid(&self) -> Result<bool> {
        match self.load(&VaultKey::from(KEY_CHECK_KEY)).await {
            Ok(Some(value)) => Ok(is_key_check(&value)),
            Ok(None) => Ok(false),
            Err(e) if e.is_integrity() => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn state(&self) -> VaultState {
        VaultState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn path(&self) -> &Path {
        self.mapper.root()
    }

    async fn validate_or_init(&self) -> Result<()> {
        self.lock.acquire(self.mapper.root()).await?;

        match self.load_reserved(KEY_CHECK_KEY).await? {
            Some(value) if is_key_check(&value) => return self.check_version().await,
            Some(_) => return Err(VaultError::InvalidVaultKey),
            None => {}
        }

        match self.load_reserved(VERSION_KEY).await? {
            // `VERSION` decrypts under this key, so an earlier init was cut
            // short before the sentinel landed.  Finish it.
            Some(_) => {
                self.check_version().await?;
                self.store(&VaultKey::from(KEY_CHECK_KEY), &KEY_CHECK_VALUE.into(), Encoding::String)
                    .await?;
                warn!("completed an interrupted vault initialization");
                Ok(())
            }
            // Entries exist but neither reserved path does: they were
            // written under another key.
            None if self.mapper.has_shards().await? => Err(VaultError::InvalidVaultKey),
            None => self.write_sentinels().await,
        }
    }

    /// Write `KEY_CHECK`, then `VERSION`, into a fresh directory.
    ///
    /// The sentinel goes first: a directory holding only `KEY_CHECK` opens
    /// normally, since a missing `VERSION` is accepted.
    #[instrument(level = "debug", skip(self), fields(root = %self.mapper.root().display()))]
    async fn write_sentinels(&self) -> Result<()> {
        fs::create_dir_all(self.mapper.root()).await?;
        self.store(&VaultKey::from(KEY_CHECK_KEY), &KEY_CHECK_VALUE.into(), Encoding::String)
            .await?;
        self.store(&VaultKey::from(VERSION_KEY), &FORMAT_VERSION.into(), Encoding::String)
            .await?;
        debug!("initialized new vault");
        Ok(())
    }

    /// Read a reserved entry while opening.  Failing to decrypt one means
    /// the key is wrong.
    async fn load_reserved(&self, key: &str) -> Result<Option<Value>> {
        match self.load(&VaultKey::from(key)).await {
            Err(e) if e.is_integrity() => Err(VaultError::InvalidVaultKey),
            other => other,
        }
    }

    async fn check_version(&self) -> Result<()> {
        match self.load(&VaultKey::from(VERSION_KEY)).await? {
            None => Ok(()),
            Some(value) => match value.as_str() {
                Some(FORMAT_VERSION) => Ok(()),
                Some(other) => Err(VaultError::UnsupportedVersion(other.to_string())),
                None => Err(VaultError::UnsupportedVersion(format!("{value:?}"))),
            },
        }
    }

    fn settled(&self) -> Option<Result<()>> {
        match self.state() {
            VaultState::Ready => Some(Ok(())),
            VaultState::Invalid => Some(Err(VaultError::InvalidVaultKey)),
            VaultState::Uninitialized | VaultState::Validating => None,
        }
    }

    fn set_state(&self, state: VaultState) {
        self.state.store(state as u8, Ordering::Release);
    }

    // ------------------------------------------------------------------
    // Entry operations
    //
    // Every public operation waits for `ready()` first, so nothing is read
    // or written before the key has been checked against the directory.
    // ------------------------------------------------------------------

    /// Store `value` under `key`, replacing any existing entry.
    ///
    /// `None` deletes the key instead; a stored JSON `null` is a real
    /// value and is distinct from absence.  Returns `true` on a write,
    /// or the result of [`Vault::delete`] for `None`.
    pub async fn set(
        &self,
        key: impl Into<VaultKey>,
        value: Option<Value>,
        encoding: Encoding,
    ) -> Result<bool> {
        let key = key.into();
        let Some(value) = value else {
            return self.delete(key).await;
        };
        self.ready().await?;
        self.store(&key, &value, encoding).await?;
        Ok(true)
    }

    /// Fetch the value under `key`, or `None` if it was never set.
    ///
    /// A missing file is absence; an entry that fails to decrypt or carries
    /// an unknown tag is an error.
    pub async fn get(&self, key: impl Into<VaultKey>) -> Result<Option<Value>> {
        self.ready().await?;
        self.load(&key.into()).await
    }

    pub async fn has(&self, key: impl Into<VaultKey>) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Report which encoding `key` was stored with.
    pub async fn encoding_of(&self, key: impl Into<VaultKey>) -> Result<Option<Encoding>> {
        self.ready().await?;
        match self.read_entry(&key.into()).await? {
            Some(entry) => Ok(Some(entry_encoding(&entry)?)),
            None => Ok(None),
        }
    }

    /// Remove `key`.  Returns `false` if there was nothing to remove.
    pub async fn delete(&self, key: impl Into<VaultKey>) -> Result<bool> {
        self.ready().await?;
        let path = self.mapper.key_to_path(&key.into())?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                trace!(path = %path.display(), "deleted entry");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All logical keys, sorted, decoded as (lossy) UTF-8.
    ///
    /// With `filter`, only keys under `filter + "."` are returned, with
    /// that prefix stripped.
    pub async fn keys(&self, filter: Option<&[u8]>) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .raw_keys(filter)
            .await?
            .into_iter()
            .map(|k| String::from_utf8_lossy(&k).into_owned())
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Like [`Vault::keys`] but keeps the exact key bytes.
    pub async fn raw_keys(&self, filter: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
        self.ready().await?;
        let mut keys = self.mapper.walk().await?;

        if let Some(filter) = filter {
            let mut prefix = filter.to_vec();
            prefix.push(DELIMITER);
            keys = keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(prefix.as_slice()).map(<[u8]>::to_vec))
                .collect();
        }

        keys.sort();
        Ok(keys)
    }

    async fn load(&self, key: &VaultKey) -> Result<Option<Value>> {
        match self.read_entry(key).await? {
            Some(entry) => Ok(Some(decode_entry(&entry)?.1)),
            None => Ok(None),
        }
    }

    async fn store(&self, key: &VaultKey, value: &Value, encoding: Encoding) -> Result<()> {
        let path = self.mapper.key_to_path(key)?;
        let entry = encode_entry(value, encoding)?;
        let ciphertext = self.cipher.encrypt(&entry)?;

        self.write_atomic(&path, &ciphertext).await?;
        trace!(path = %path.display(), encoding = %encoding, bytes = ciphertext.len(), "wrote entry");
        Ok(())
    }

    /// Write `bytes` to `path` via a uniquely named temp file in the same
    /// directory, then rename, so readers never see a half-written entry.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| VaultError::InvalidKey("entry path has no parent".into()))?;
        fs::create_dir_all(parent).await?;

        let tmp_path = self.tmp_path(path);
        let written = async {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&tmp_path)
                .await?;
            file.write_all(bytes).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// `.<leaf>.<pid>.<n>.tmp`.  The leading dot keeps it out of `keys()`.
    fn tmp_path(&self, target: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let leaf = target
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!(".{leaf}.{}.{n}.tmp", std::process::id()))
    }

    async fn read_entry(&self, key: &VaultKey) -> Result<Option<Vec<u8>>> {
        let path = self.mapper.key_to_path(key)?;

        let ciphertext = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        trace!(path = %path.display(), bytes = ciphertext.len(), "read entry");

        self.cipher.decrypt(&ciphertext).map(Some)
    }

    // ------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------

    /// A view that scopes every key under `prefix + "."`.
    ///
    /// `None` picks [`Encoding::default`] (JSON) for writes that do not
    /// name an encoding.
    pub fn namespace(
        &self,
        prefix: impl Into<VaultKey>,
        default_encoding: Option<Encoding>,
    ) -> Namespace<'_> {
        Namespace::new(
            self,
            prefix.into(),
            default_encoding.unwrap_or_default(),
        )
    }

    /// An id-indexed JSON record collection under `prefix`.
    pub fn records(&self, prefix: impl Into<VaultKey>) -> RecordStore<'_> {
        self.records_with(prefix, Encoding::Json)
    }

    /// Like [`Vault::records`] with a different body encoding.
    pub fn records_with(&self, prefix: impl Into<VaultKey>, encoding: Encoding) -> RecordStore<'_> {
        self.namespace(prefix, Some(encoding)).into_record_store()
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        self.lock.release(self.mapper.root());
    }
}

fn is_key_check(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| bool::from(s.as_bytes().ct_eq(KEY_CHECK_VALUE.as_bytes())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key;
    use tempfile::TempDir;

    #[tokio::test]
    async fn new_rejects_bad_key_sizes() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Vault::new(dir.path(), b""),
            Err(VaultError::InvalidKeyLength { actual: 0, .. })
        ));
        assert!(Vault::new(dir.path(), [0u8; 31]).is_err());
        assert!(Vault::new(dir.path(), generate_key()).is_ok());
    }

    #[tokio::test]
    async fn construction_touches_nothing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("vault");
        let vault = Vault::new(&root, generate_key()).unwrap();

        assert_eq!(vault.state(), VaultState::Uninitialized);
        assert!(!vault.exists().await.unwrap());

        vault.ready().await.unwrap();
        assert_eq!(vault.state(), VaultState::Ready);
        assert!(vault.exists().await.unwrap());
        assert!(vault.valid().await.unwrap());
    }

    #[tokio::test]
    async fn set_none_deletes() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();

        vault.set("k", Some("v".into()), Encoding::String).await.unwrap();
        assert!(vault.set("k", None, Encoding::String).await.unwrap());
        assert_eq!(vault.get("k").await.unwrap(), None);
        assert!(!vault.set("k", None, Encoding::String).await.unwrap());
    }

    #[tokio::test]
    async fn no_temp_files_survive_a_write() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();
        vault.set("k", Some("v".into()), Encoding::String).await.unwrap();

        let path = vault.mapper.key_to_path(&VaultKey::from("k")).unwrap();
        let siblings: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(siblings.iter().all(|name| !name.ends_with(".tmp")));
    }

    #[tokio::test]
    async fn encoding_of_reports_the_tag() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();
        vault.set("seed", Some(vec![1u8, 2, 3].into()), Encoding::Raw).await.unwrap();

        assert_eq!(vault.encoding_of("seed").await.unwrap(), Some(Encoding::Raw));
        assert_eq!(vault.encoding_of(KEY_CHECK_KEY).await.unwrap(), Some(Encoding::String));
        assert_eq!(vault.encoding_of("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unsupported_version_is_rejected() {
        let dir = TempDir::new().unwrap();
        let key = generate_key();
        {
            let vault = Vault::open(dir.path(), key.clone()).await.unwrap();
            vault.set(VERSION_KEY, Some("99".into()), Encoding::String).await.unwrap();
        }

        let reopened = Vault::new(dir.path(), key).unwrap();
        assert!(matches!(
            reopened.ready().await,
            Err(VaultError::UnsupportedVersion(v)) if v == "99"
        ));
        assert_eq!(reopened.state(), VaultState::Uninitialized);
    }

    #[tokio::test]
    async fn concurrent_ready_initializes_once() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::new(dir.path(), generate_key()).unwrap();

        let (a, b) = tokio::join!(vault.ready(), vault.ready());
        a.unwrap();
        b.unwrap();
        assert_eq!(vault.keys(None).await.unwrap(), vec!["KEY_CHECK", "VERSION"]);
    }

    #[tokio::test]
    async fn concurrent_writes_to_one_key_both_land() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();

        let (a, b) = tokio::join!(
            vault.set("k", Some("a".into()), Encoding::String),
            vault.set("k", Some("b".into()), Encoding::String),
        );
        a.unwrap();
        b.unwrap();

        let value = vault.get("k").await.unwrap().unwrap();
        assert!(matches!(value.as_str(), Some("a" | "b")));
    }

    fn entry_count(root: &Path) -> usize {
        let mut count = 0;
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    count += 1;
                }
            }
        }
        count
    }

    #[tokio::test]
    async fn sentinel_without_version_opens() {
        let dir = TempDir::new().unwrap();
        let key = generate_key();
        {
            let vault = Vault::open(dir.path(), key.clone()).await.unwrap();
            vault.delete(VERSION_KEY).await.unwrap();
        }

        let reopened = Vault::open(dir.path(), key).await.unwrap();
        assert_eq!(reopened.state(), VaultState::Ready);
        assert_eq!(reopened.keys(None).await.unwrap(), vec!["KEY_CHECK"]);
    }

    #[tokio::test]
    async fn interrupted_init_with_only_version_is_completed() {
        let dir = TempDir::new().unwrap();
        let key = generate_key();
        {
            let vault = Vault::open(dir.path(), key.clone()).await.unwrap();
            vault.delete(KEY_CHECK_KEY).await.unwrap();
        }

        // A different key still cannot claim the directory.
        let imposter = Vault::new(dir.path(), generate_key()).unwrap();
        assert!(matches!(imposter.ready().await, Err(VaultError::InvalidVaultKey)));

        let reopened = Vault::open(dir.path(), key).await.unwrap();
        assert_eq!(reopened.state(), VaultState::Ready);
        assert!(reopened.valid().await.unwrap());
        assert_eq!(
            reopened.keys(None).await.unwrap(),
            vec!["KEY_CHECK", "VERSION"]
        );
    }

    #[tokio::test]
    async fn first_write_opens_the_vault() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::new(dir.path(), generate_key()).unwrap();

        vault.set("k", Some("v".into()), Encoding::String).await.unwrap();
        assert_eq!(vault.state(), VaultState::Ready);
        assert_eq!(
            vault.keys(None).await.unwrap(),
            vec!["KEY_CHECK", "VERSION", "k"]
        );
    }

    #[tokio::test]
    async fn wrong_key_cannot_write_before_ready() {
        let dir = TempDir::new().unwrap();
        Vault::open(dir.path(), generate_key()).await.unwrap();
        let before = entry_count(dir.path());

        let imposter = Vault::new(dir.path(), generate_key()).unwrap();
        assert!(matches!(
            imposter.set("x", Some("y".into()), Encoding::String).await,
            Err(VaultError::InvalidVaultKey)
        ));
        assert!(matches!(
            imposter.delete("x").await,
            Err(VaultError::InvalidVaultKey)
        ));
        assert_eq!(imposter.state(), VaultState::Invalid);
        assert_eq!(entry_count(dir.path()), before);
    }

    #[tokio::test]
    async fn valid_never_initializes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("fresh");
        let vault = Vault::new(&root, generate_key()).unwrap();

        assert!(!vault.valid().await.unwrap());
        assert!(!vault.exists().await.unwrap());
        assert_eq!(vault.state(), VaultState::Uninitialized);
    }
}
