//! Vault key material and cipher key derivation.
//!
//! A vault is unlocked by a single 32-byte [`SymmetricKey`].  From it we
//! derive, once per vault instance, the 64-byte AES-SIV key used for every
//! entry:
//!
//! ```text
//! siv_key = HKDF-SHA256(ikm = key, salt = none, info = "shardvault siv key")[..64]
//! ```
//!
//! AES-SIV is deterministic without reusing a keystream, which is what
//! lets a logical key always map to the same on-disk path.

use std::fmt;

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::errors::{Result, VaultError};

/// Length of a vault key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Length of the AES-SIV key in bytes (MAC half then encryption half).
pub const SIV_KEY_LEN: usize = 64;

/// Domain-separation string fed to HKDF when deriving the SIV key.
const SIV_KEY_INFO: &[u8] = b"shardvault siv key";

/// A 32-byte vault key that zeroes its memory when dropped.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a key from a slice, rejecting anything that is not exactly
    /// [`KEY_LEN`] bytes.  Keys are never truncated or padded.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] =
            bytes
                .try_into()
                .map_err(|_| VaultError::InvalidKeyLength {
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self { bytes })
    }

    /// Parse a key from its hex representation (64 hex characters).
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let mut decoded = hex::decode(encoded.trim())
            .map_err(|e| VaultError::KeyfileError(format!("key is not valid hex: {e}")))?;
        let key = Self::from_slice(&decoded);
        decoded.zeroize();
        key
    }

    /// Hex representation, e.g. for exporting into `SHARDVAULT_KEY`.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl AsRef<[u8]> for SymmetricKey {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Generate a fresh random vault key.
pub fn generate_key() -> SymmetricKey {
    let mut bytes = [0u8; KEY_LEN];
    rand::rng().fill_bytes(&mut bytes);
    let key = SymmetricKey::new(bytes);
    bytes.zeroize();
    key
}

/// Derive the AES-SIV key from the vault key.
pub fn derive_siv_key(key: &SymmetricKey) -> Result<Zeroizing<[u8; SIV_KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, key.as_bytes());

    let mut siv_key = Zeroizing::new([0u8; SIV_KEY_LEN]);
    hk.expand(SIV_KEY_INFO, &mut *siv_key)
        .map_err(|e| VaultError::EncryptionFailed(format!("HKDF expand failed: {e}")))?;

    Ok(siv_key)
}
