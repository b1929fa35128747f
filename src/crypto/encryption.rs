//! AES-SIV envelope applied to every stored key name and value.
//!
//! AES-SIV (RFC 5297) is deterministic by construction: the synthetic IV is
//! a MAC of the plaintext, so encrypting the same plaintext twice yields
//! identical ciphertext while distinct plaintexts never share a keystream.
//! Only equality of plaintexts leaks.
//!
//! Layout of the returned byte buffer:
//!   [ 16-byte synthetic IV | ciphertext ]

use std::fmt;

use aes_siv::{siv::Aes256Siv, KeyInit};
use zeroize::Zeroizing;

use super::keys::{derive_siv_key, SymmetricKey, SIV_KEY_LEN};
use crate::errors::{Result, VaultError};

/// Size of the synthetic IV (which doubles as the auth tag) in bytes.
pub const TAG_LEN: usize = 16;

/// No associated data is bound to entries.
const NO_HEADERS: &[&[u8]] = &[];

/// Deterministic authenticated cipher bound to one vault key.
#[derive(Clone)]
pub struct Cipher {
    siv_key: Zeroizing<[u8; SIV_KEY_LEN]>,
}

impl Cipher {
    /// Derive the SIV key from `key`.
    pub fn new(key: &SymmetricKey) -> Result<Self> {
        Ok(Self {
            siv_key: derive_siv_key(key)?,
        })
    }

    /// Encrypt and authenticate `plaintext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.siv()
            .encrypt(NO_HEADERS, plaintext)
            .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))
    }

    /// Decrypt data produced by [`Cipher::encrypt`] under the same key.
    ///
    /// Truncated, tampered or foreign ciphertext fails with
    /// [`VaultError::DecryptionFailed`].
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < TAG_LEN {
            return Err(VaultError::DecryptionFailed);
        }

        self.siv()
            .decrypt(NO_HEADERS, ciphertext)
            .map_err(|_| VaultError::DecryptionFailed)
    }

    // Aes256Siv needs `&mut self`, so each call gets its own instance.
    fn siv(&self) -> Aes256Siv {
        Aes256Siv::new(&(*self.siv_key).into())
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}
