//! Cryptographic primitives for shardvault.
//!
//! This module provides:
//! - Deterministic AES-SIV encryption and decryption (`encryption`)
//! - Vault key handling and HKDF derivation of the SIV key (`keys`)
//! - Keyfile persistence for the CLI (`keyfile`)

pub mod encryption;
pub mod keyfile;
pub mod keys;

pub use encryption::Cipher;
pub use keyfile::{generate_keyfile, load_keyfile};
pub use keys::{derive_siv_key, generate_key, SymmetricKey, KEY_LEN};
