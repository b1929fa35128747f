//! Logical keys as handed to the vault by callers.

use std::fmt;

use crate::errors::{Result, VaultError};

/// Separator between namespace prefixes and the keys they scope.
pub const DELIMITER: u8 = b'.';

/// Longest logical key we accept.
///
/// Leaf filenames are `hex(key || 16-byte tag)`, so a 111-byte key yields a
/// 254-character name, just under the usual 255-byte filename limit.
pub const MAX_KEY_LEN: usize = 111;

/// An opaque logical key: arbitrary bytes or a short name.
///
/// Integers convert to their decimal string so `records.put(3, ..)` and
/// `records.put("3", ..)` address the same entry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VaultKey(Vec<u8>);

impl VaultKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// `prefix + "." + local`.
    pub fn join(prefix: &[u8], local: &[u8]) -> Self {
        let mut joined = Vec::with_capacity(prefix.len() + 1 + local.len());
        joined.extend_from_slice(prefix);
        joined.push(DELIMITER);
        joined.extend_from_slice(local);
        Self(joined)
    }

    /// Reject keys that cannot be mapped to a leaf filename.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(VaultError::InvalidKey("key cannot be empty".into()));
        }
        if self.0.len() > MAX_KEY_LEN {
            return Err(VaultError::InvalidKey(format!(
                "key is {} bytes, the maximum is {MAX_KEY_LEN}",
                self.0.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultKey({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for VaultKey {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for VaultKey {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&String> for VaultKey {
    fn from(s: &String) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for VaultKey {
    fn from(b: &[u8]) -> Self {
        Self(b.to_vec())
    }
}

impl From<Vec<u8>> for VaultKey {
    fn from(b: Vec<u8>) -> Self {
        Self(b)
    }
}

impl From<&Vec<u8>> for VaultKey {
    fn from(b: &Vec<u8>) -> Self {
        Self(b.clone())
    }
}

impl<const N: usize> From<[u8; N]> for VaultKey {
    fn from(b: [u8; N]) -> Self {
        Self(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for VaultKey {
    fn from(b: &[u8; N]) -> Self {
        Self(b.to_vec())
    }
}

impl From<&VaultKey> for VaultKey {
    fn from(k: &VaultKey) -> Self {
        k.clone()
    }
}

macro_rules! numeric_keys {
    ($($t:ty),*) => {
        $(
            impl From<$t> for VaultKey {
                fn from(n: $t) -> Self {
                    Self(n.to_string().into_bytes())
                }
            }
        )*
    };
}

numeric_keys!(u8, u16, u32, u64, usize, i32, i64);
