//! Integration tests for the shardvault crypto module and path mapping.

use proptest::prelude::*;
use shardvault::crypto::{generate_key, generate_keyfile, load_keyfile, Cipher, SymmetricKey};
use shardvault::vault::path::PathMapper;
use shardvault::VaultKey;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

#[test]
fn encrypt_decrypt_roundtrip() {
    let cipher = Cipher::new(&SymmetricKey::new([0xAB; 32])).unwrap();
    let plaintext = b"1postgres://localhost/mydb";

    let ciphertext = cipher.encrypt(plaintext).expect("encrypt should succeed");

    // The 16-byte synthetic IV is the only overhead.
    assert_eq!(ciphertext.len(), plaintext.len() + 16);
    assert_eq!(cipher.decrypt(&ciphertext).unwrap(), plaintext);
}

#[test]
fn encryption_is_deterministic_per_key() {
    let key = generate_key();
    let a = Cipher::new(&key).unwrap();
    let b = Cipher::new(&key.clone()).unwrap();

    assert_eq!(a.encrypt(b"name").unwrap(), a.encrypt(b"name").unwrap());
    assert_eq!(a.encrypt(b"name").unwrap(), b.encrypt(b"name").unwrap());
    assert_ne!(a.encrypt(b"name").unwrap(), a.encrypt(b"namf").unwrap());
}

#[test]
fn different_keys_give_different_ciphertext() {
    let a = Cipher::new(&generate_key()).unwrap();
    let b = Cipher::new(&generate_key()).unwrap();
    assert_ne!(a.encrypt(b"VERSION").unwrap(), b.encrypt(b"VERSION").unwrap());
}

#[test]
fn decrypt_with_wrong_key_fails() {
    let right = Cipher::new(&SymmetricKey::new([0x11; 32])).unwrap();
    let wrong = Cipher::new(&SymmetricKey::new([0x22; 32])).unwrap();

    let ciphertext = right.encrypt(b"TOP_SECRET=42").unwrap();
    let err = wrong.decrypt(&ciphertext).unwrap_err();
    assert!(err.is_integrity());
}

#[test]
fn tampered_or_truncated_ciphertext_fails() {
    let cipher = Cipher::new(&generate_key()).unwrap();
    let mut ciphertext = cipher.encrypt(b"hello").unwrap();

    ciphertext[0] ^= 0xFF;
    assert!(cipher.decrypt(&ciphertext).is_err());
    assert!(cipher.decrypt(&ciphertext[..10]).is_err());
    assert!(cipher.decrypt(&[]).is_err());
}

// ---------------------------------------------------------------------------
// Keys and keyfiles
// ---------------------------------------------------------------------------

#[test]
fn hex_key_roundtrip() {
    let key = generate_key();
    let hex = key.to_hex();
    assert_eq!(hex.len(), 64);
    assert_eq!(SymmetricKey::from_hex(&hex).unwrap().as_bytes(), key.as_bytes());
    assert!(SymmetricKey::from_hex("abcd").is_err());
    assert!(SymmetricKey::from_hex(&"zz".repeat(32)).is_err());
}

#[test]
fn key_debug_is_redacted() {
    let key = SymmetricKey::new([0x42; 32]);
    let shown = format!("{key:?}");
    assert!(!shown.contains("42, 42"));
    assert!(!shown.contains(&key.to_hex()));
}

#[test]
fn keyfile_generate_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys").join("vault.key");

    let written = generate_keyfile(&path).unwrap();
    let loaded = load_keyfile(&path).unwrap();
    assert_eq!(written.as_bytes(), loaded.as_bytes());

    // Refuses to clobber an existing keyfile.
    assert!(generate_keyfile(&path).is_err());
}

#[test]
fn keyfile_with_wrong_size_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("short.key");
    std::fs::write(&path, [7u8; 12]).unwrap();

    let err = load_keyfile(&path).unwrap_err();
    assert!(err.is_configuration());
}

// ---------------------------------------------------------------------------
// Path mapping
// ---------------------------------------------------------------------------

fn mapper(root: &std::path::Path) -> PathMapper {
    PathMapper::new(root.to_path_buf(), Cipher::new(&SymmetricKey::new([0x5A; 32])).unwrap())
}

proptest! {
    #[test]
    fn leaf_names_map_back_to_their_key(key in proptest::collection::vec(any::<u8>(), 1..=111)) {
        let root = std::path::Path::new("/vault");
        let mapper = mapper(root);

        let path = mapper.key_to_path(&VaultKey::from(key.clone())).unwrap();
        let rel: Vec<String> = path
            .strip_prefix(root)
            .unwrap()
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        prop_assert_eq!(rel.len(), 3);

        let recovered = mapper.leaf_to_key(&rel[0], &rel[1], &rel[2]).unwrap();
        prop_assert_eq!(recovered, Some(key));
    }
}

#[test]
fn same_key_same_path() {
    let mapper = mapper(std::path::Path::new("/vault"));
    let a = mapper.key_to_path(&VaultKey::from("posts.ids")).unwrap();
    let b = mapper.key_to_path(&VaultKey::from("posts.ids")).unwrap();
    let c = mapper.key_to_path(&VaultKey::from("posts.idt")).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}
