//! A persisted set: one JSON-array entry of unique members.
//!
//! Every mutation is a full read-modify-write of that entry.  There is no
//! isolation between concurrent writers, so two overlapping `add` calls
//! on the same set can lose one of the members (last writer wins).
//! Callers needing atomic multi-member updates must serialize externally.

use serde_json::Value as Json;
use tracing::trace;

use super::encoding::{Encoding, Value};
use super::key::VaultKey;
use super::namespace::Namespace;
use crate::errors::{Result, VaultError};

#[derive(Debug, Clone)]
pub struct VaultSet<'v> {
    namespace: Namespace<'v>,
    key: VaultKey,
}

impl<'v> VaultSet<'v> {
    pub fn new(namespace: Namespace<'v>, key: VaultKey) -> Self {
        Self { namespace, key }
    }

    /// Members in insertion order.  A set that was never written is empty.
    pub async fn all(&self) -> Result<Vec<Json>> {
        match self.namespace.get(&self.key).await? {
            None => Ok(Vec::new()),
            Some(Value::Json(Json::Array(members))) => Ok(members),
            Some(_) => Err(VaultError::CorruptEntry(
                "set entry is not a JSON array".into(),
            )),
        }
    }

    pub async fn size(&self) -> Result<usize> {
        Ok(self.all().await?.len())
    }

    pub async fn has(&self, member: impl Into<Json>) -> Result<bool> {
        let member = member.into();
        Ok(self.all().await?.contains(&member))
    }

    /// Add `member`.  Returns `false` if it was already present.
    pub async fn add(&self, member: impl Into<Json>) -> Result<bool> {
        let member = member.into();
        let mut members = self.all().await?;
        if members.contains(&member) {
            return Ok(false);
        }
        members.push(member);
        self.write(members).await?;
        Ok(true)
    }

    /// Remove `member`.  Returns `false` if it was not present.
    pub async fn delete(&self, member: impl Into<Json>) -> Result<bool> {
        let member = member.into();
        let mut members = self.all().await?;
        let before = members.len();
        members.retain(|m| m != &member);
        if members.len() == before {
            return Ok(false);
        }
        self.write(members).await?;
        Ok(true)
    }

    /// Empty the set (the entry stays, holding `[]`).
    pub async fn clear(&self) -> Result<()> {
        self.write(Vec::new()).await
    }

    async fn write(&self, members: Vec<Json>) -> Result<()> {
        trace!(size = members.len(), "writing set");
        self.namespace
            .set_with(&self.key, Some(Value::Json(Json::Array(members))), Encoding::Json)
            .await?;
        Ok(())
    }
}
