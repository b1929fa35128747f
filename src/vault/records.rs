//! An id-indexed record collection.
//!
//! Layout inside the owning namespace:
//!
//! ```text
//! <ns>.ids          JSON array of known ids      (a VaultSet)
//! <ns>.record:<id>  record body
//! ```
//!
//! Writes touch the index before the body and deletes remove the id before
//! the body.  A crash in between can leave an indexed id without a body,
//! which reads back as `None`; it can never leave a body that `ids()` and
//! `all()` cannot find.

use std::collections::BTreeMap;

use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::debug;

use super::encoding::{Encoding, Value};
use super::key::VaultKey;
use super::namespace::Namespace;
use super::set::VaultSet;
use crate::errors::{Result, VaultError};

/// Key of the id index inside the record namespace.
pub const IDS_KEY: &str = "ids";

/// Record bodies fetched concurrently by `all()`.
const FETCH_CONCURRENCY: usize = 32;

#[derive(Debug, Clone)]
pub struct RecordStore<'v> {
    namespace: Namespace<'v>,
    ids: VaultSet<'v>,
}

impl<'v> RecordStore<'v> {
    pub fn new(namespace: Namespace<'v>) -> Self {
        let ids = namespace.set_of(IDS_KEY);
        Self { namespace, ids }
    }

    pub fn namespace(&self) -> &Namespace<'v> {
        &self.namespace
    }

    pub async fn get(&self, id: impl Into<VaultKey>) -> Result<Option<Value>> {
        self.namespace.get(record_key(&id_string(id)?)).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, id: impl Into<VaultKey>) -> Result<Option<T>> {
        self.namespace.get_json(record_key(&id_string(id)?)).await
    }

    /// Store a record with the store's default encoding.  `None` deletes it.
    pub async fn put(&self, id: impl Into<VaultKey>, value: Option<Value>) -> Result<()> {
        self.set_with(id, value, self.namespace.default_encoding())
            .await
    }

    pub async fn set_with(
        &self,
        id: impl Into<VaultKey>,
        value: Option<Value>,
        encoding: Encoding,
    ) -> Result<()> {
        let id = id_string(id)?;
        let Some(value) = value else {
            self.delete(id).await?;
            return Ok(());
        };

        self.ids.add(id.as_str()).await?;
        self.namespace
            .set_with(record_key(&id), Some(value), encoding)
            .await?;
        Ok(())
    }

    pub async fn put_json<T: Serialize + ?Sized>(&self, id: impl Into<VaultKey>, value: &T) -> Result<()> {
        let id = id_string(id)?;
        self.ids.add(id.as_str()).await?;
        self.namespace.set_json(record_key(&id), value).await?;
        Ok(())
    }

    /// Remove a record.  Returns `true` if a body was removed.
    pub async fn delete(&self, id: impl Into<VaultKey>) -> Result<bool> {
        let id = id_string(id)?;
        self.ids.delete(id.as_str()).await?;
        self.namespace.delete(record_key(&id)).await
    }

    /// `true` if `id` is in the index (its body may still be missing).
    pub async fn has(&self, id: impl Into<VaultKey>) -> Result<bool> {
        self.ids.has(id_string(id)?).await
    }

    /// Known ids in insertion order.
    pub async fn ids(&self) -> Result<Vec<String>> {
        Ok(self
            .ids
            .all()
            .await?
            .into_iter()
            .map(|id| match id {
                Json::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    pub async fn size(&self) -> Result<usize> {
        self.ids.size().await
    }

    /// Every record, in id order, fetched concurrently.
    ///
    /// An indexed id whose body is missing yields `None`.
    pub async fn all(&self) -> Result<Vec<Option<Value>>> {
        let ids = self.ids().await?;
        self.fetch(&ids).await
    }

    /// Every record keyed by id.  Ids without a body are skipped.
    pub async fn all_by_id(&self) -> Result<BTreeMap<String, Value>> {
        let ids = self.ids().await?;
        let records = self.fetch(&ids).await?;
        Ok(ids
            .into_iter()
            .zip(records)
            .filter_map(|(id, record)| record.map(|r| (id, r)))
            .collect())
    }

    async fn fetch(&self, ids: &[String]) -> Result<Vec<Option<Value>>> {
        debug!(count = ids.len(), "fetching records");
        // `buffered` keeps results in id order.
        stream::iter(ids)
            .map(|id| self.namespace.get(record_key(id)))
            .buffered(FETCH_CONCURRENCY)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect()
    }
}

/// Ids live in a JSON index, so they must be UTF-8.  Lossy decoding would
/// let distinct byte ids collide on one record.
fn id_string(id: impl Into<VaultKey>) -> Result<String> {
    String::from_utf8(id.into().into_bytes())
        .map_err(|_| VaultError::InvalidKey("record id is not valid UTF-8".into()))
}

fn record_key(id: &str) -> String {
    format!("record:{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_key;
    use crate::vault::Vault;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_indexes_before_writing_body() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();
        let posts = vault.records("posts");

        posts.put(1, Some(json!({ "id": 1 }).into())).await.unwrap();
        assert_eq!(
            vault.keys(Some(b"posts")).await.unwrap(),
            vec!["ids", "record:1"]
        );
        assert!(posts.has("1").await.unwrap());
    }

    #[tokio::test]
    async fn missing_body_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();
        let posts = vault.records("posts");

        posts.put("a", Some(json!("A").into())).await.unwrap();
        posts.put("b", Some(json!("B").into())).await.unwrap();
        // Simulate a crash between the index write and the body write.
        posts.namespace().delete("record:a").await.unwrap();

        assert_eq!(
            posts.all().await.unwrap(),
            vec![None, Some(Value::Json(json!("B")))]
        );
        let by_id = posts.all_by_id().await.unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id["b"], Value::Json(json!("B")));
    }

    #[tokio::test]
    async fn put_none_deletes() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();
        let posts = vault.records("posts");

        posts.put(7, Some(json!({ "id": 7 }).into())).await.unwrap();
        posts.put(7, None).await.unwrap();
        assert!(posts.ids().await.unwrap().is_empty());
        assert_eq!(posts.get(7).await.unwrap(), None);
        assert!(!posts.delete(7).await.unwrap());
    }

    #[tokio::test]
    async fn typed_records() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();
        let users = vault.records("users");

        users.put_json("u1", &json!({ "name": "Ada" })).await.unwrap();
        let got: Option<serde_json::Value> = users.get_json("u1").await.unwrap();
        assert_eq!(got, Some(json!({ "name": "Ada" })));
        assert_eq!(users.size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn string_encoded_records() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();
        let notes = vault.records_with("notes", Encoding::String);

        notes.put("n", Some("hello".into())).await.unwrap();
        assert_eq!(notes.get("n").await.unwrap(), Some(Value::Text("hello".into())));
        assert_eq!(notes.all().await.unwrap(), vec![Some(Value::Text("hello".into()))]);
    }

    #[tokio::test]
    async fn non_utf8_ids_are_rejected() {
        let dir = TempDir::new().unwrap();
        let vault = Vault::open(dir.path(), generate_key()).await.unwrap();
        let blobs = vault.records("blobs");

        for id in [vec![0xff_u8, 0x01], vec![0xfe_u8, 0x01]] {
            let err = blobs.put(id.clone(), Some(json!(1).into())).await.unwrap_err();
            assert!(matches!(err, VaultError::InvalidKey(_)));
            assert!(blobs.get(id.clone()).await.is_err());
            assert!(blobs.delete(id).await.is_err());
        }
        assert!(blobs.ids().await.unwrap().is_empty());
        assert!(vault.keys(Some(b"blobs")).await.unwrap().is_empty());
    }
}
