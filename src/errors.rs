use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in shardvault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Configuration errors ---
    #[error("vault key must be exactly {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("unknown encoding \"{0}\" (expected raw, string or json)")]
    UnknownEncoding(String),

    #[error("cannot store value with {encoding} encoding: {reason}")]
    ValueEncoding {
        encoding: &'static str,
        reason: String,
    },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("Keyfile error: {0}")]
    KeyfileError(String),

    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Integrity errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: wrong key or corrupted entry")]
    DecryptionFailed,

    #[error("corrupt vault entry: {0}")]
    CorruptEntry(String),

    // --- Vault lifecycle errors ---
    #[error("invalid vault key")]
    InvalidVaultKey,

    #[error("unsupported vault format version \"{0}\"")]
    UnsupportedVersion(String),

    #[error("Vault at {0} is locked by another process")]
    VaultLocked(PathBuf),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl VaultError {
    /// Bad or missing key material, unknown encodings, unencodable values.
    ///
    /// These are caller mistakes and retrying will not help.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeyLength { .. }
                | Self::UnknownEncoding(_)
                | Self::ValueEncoding { .. }
                | Self::InvalidKey(_)
                | Self::KeyfileError(_)
                | Self::ConfigError(_)
        )
    }

    /// Authenticated decryption failed or a stored entry is malformed.
    ///
    /// Signals the wrong key or on-disk corruption. Never treated as absence.
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::DecryptionFailed | Self::CorruptEntry(_))
    }
}

/// Convenience type alias for shardvault results.
pub type Result<T> = std::result::Result<T, VaultError>;
