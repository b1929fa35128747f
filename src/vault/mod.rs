//! Vault module: encrypted key-value storage on the filesystem.
//!
//! This module provides:
//! - Logical keys and the namespace delimiter (`key`)
//! - Tagged value encodings (`encoding`)
//! - Key-to-path mapping and the key walk (`path`)
//! - The `Vault` itself with its open lifecycle (`store`)
//! - Prefix-scoped views (`namespace`)
//! - Persisted sets and id-indexed record stores (`set`, `records`)
//! - Pluggable directory locking (`lock`)

pub mod encoding;
pub mod key;
pub mod lock;
pub mod namespace;
pub mod path;
pub mod records;
pub mod set;
pub mod store;

pub use encoding::{Encoding, Value};
pub use key::{VaultKey, DELIMITER, MAX_KEY_LEN};
pub use lock::{DirectoryLock, LockFile, NoLock};
pub use namespace::Namespace;
pub use records::RecordStore;
pub use set::VaultSet;
pub use store::{Vault, VaultBuilder, VaultState, FORMAT_VERSION, KEY_CHECK_KEY, VERSION_KEY};
