//! Hierarchical key scoping.
//!
//! A [`Namespace`] rewrites every key as `prefix + "." + key` and forwards
//! to the vault.  Nesting just extends the prefix, so
//! `vault.namespace("a", ..).namespace("b", ..)` and
//! `vault.namespace("a.b", ..)` address the same entries.  No data is
//! duplicated; a namespace is a borrowed view.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::encoding::{Encoding, Value};
use super::key::VaultKey;
use super::records::RecordStore;
use super::set::VaultSet;
use super::store::Vault;
use crate::errors::{Result, VaultError};

#[derive(Debug, Clone)]
pub struct Namespace<'v> {
    vault: &'v Vault,
    prefix: VaultKey,
    default_encoding: Encoding,
}

impl<'v> Namespace<'v> {
    pub(crate) fn new(vault: &'v Vault, prefix: VaultKey, default_encoding: Encoding) -> Self {
        Self {
            vault,
            prefix,
            default_encoding,
        }
    }

    pub fn prefix(&self) -> &VaultKey {
        &self.prefix
    }

    pub fn default_encoding(&self) -> Encoding {
        self.default_encoding
    }

    pub fn vault(&self) -> &'v Vault {
        self.vault
    }

    pub async fn ready(&self) -> Result<()> {
        self.vault.ready().await
    }

    /// A child namespace.  `None` inherits this namespace's default encoding.
    pub fn namespace(
        &self,
        prefix: impl Into<VaultKey>,
        default_encoding: Option<Encoding>,
    ) -> Namespace<'v> {
        Namespace {
            vault: self.vault,
            prefix: self.scoped(prefix),
            default_encoding: default_encoding.unwrap_or(self.default_encoding),
        }
    }

    /// A JSON record collection nested under this namespace.
    pub fn records(&self, prefix: impl Into<VaultKey>) -> RecordStore<'v> {
        self.namespace(prefix, Some(Encoding::Json)).into_record_store()
    }

    /// Treat this namespace as a record collection.
    pub fn into_record_store(self) -> RecordStore<'v> {
        RecordStore::new(self)
    }

    /// A persisted set stored at `key` within this namespace.
    pub fn set_of(&self, key: impl Into<VaultKey>) -> VaultSet<'v> {
        VaultSet::new(self.clone(), key.into())
    }

    // ------------------------------------------------------------------
    // Forwarded operations
    // ------------------------------------------------------------------

    pub async fn get(&self, key: impl Into<VaultKey>) -> Result<Option<Value>> {
        self.vault.get(self.scoped(key)).await
    }

    /// Store with the namespace's default encoding.  `None` deletes.
    pub async fn set(&self, key: impl Into<VaultKey>, value: Option<Value>) -> Result<bool> {
        self.set_with(key, value, self.default_encoding).await
    }

    pub async fn set_with(
        &self,
        key: impl Into<VaultKey>,
        value: Option<Value>,
        encoding: Encoding,
    ) -> Result<bool> {
        self.vault.set(self.scoped(key), value, encoding).await
    }

    pub async fn has(&self, key: impl Into<VaultKey>) -> Result<bool> {
        self.vault.has(self.scoped(key)).await
    }

    pub async fn delete(&self, key: impl Into<VaultKey>) -> Result<bool> {
        self.vault.delete(self.scoped(key)).await
    }

    pub async fn encoding_of(&self, key: impl Into<VaultKey>) -> Result<Option<Encoding>> {
        self.vault.encoding_of(self.scoped(key)).await
    }

    /// Keys inside this namespace, relative to it.
    pub async fn keys(&self, filter: Option<&[u8]>) -> Result<Vec<String>> {
        self.vault.keys(Some(self.filter(filter).as_bytes())).await
    }

    pub async fn raw_keys(&self, filter: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
        self.vault.raw_keys(Some(self.filter(filter).as_bytes())).await
    }

    // ------------------------------------------------------------------
    // Typed helpers
    // ------------------------------------------------------------------

    /// Fetch a JSON entry and deserialize it into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: impl Into<VaultKey>) -> Result<Option<T>> {
        let json = match self.get(key).await? {
            None => return Ok(None),
            Some(Value::Json(json)) => json,
            Some(Value::Text(text)) => serde_json::Value::String(text),
            Some(Value::Bytes(_)) => {
                return Err(VaultError::SerializationError(
                    "raw entry cannot be read as JSON".into(),
                ))
            }
        };
        serde_json::from_value(json)
            .map(Some)
            .map_err(|e| VaultError::SerializationError(e.to_string()))
    }

    /// Serialize `value` and store it with the JSON encoding.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: impl Into<VaultKey>,
        value: &T,
    ) -> Result<bool> {
        let json =
            serde_json::to_value(value).map_err(|e| VaultError::SerializationError(e.to_string()))?;
        self.set_with(key, Some(Value::Json(json)), Encoding::Json)
            .await
    }

    fn scoped(&self, key: impl Into<VaultKey>) -> VaultKey {
        VaultKey::join(self.prefix.as_bytes(), key.into().as_bytes())
    }

    fn filter(&self, filter: Option<&[u8]>) -> VaultKey {
        match filter {
            Some(filter) => VaultKey::join(self.prefix.as_bytes(), filter),
            None => self.prefix.clone(),
        }
    }
}
