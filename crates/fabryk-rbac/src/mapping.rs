//! Name ↔ id identity mapping.
//!
//! Each entity family keeps two hashes: name → id and id → name. Reads go
//! straight to the engine; writes are only ever recorded into a [`Batch`] so
//! both directions change together.

use fabryk_redis::{Batch, KvStore};

use crate::error::Result;
use crate::types::EntityKind;

#[derive(Debug, Clone)]
pub(crate) struct Mapping {
    kind: EntityKind,
    by_name: String,
    by_id: String,
}

pub(crate) fn decode_string(raw: Vec<u8>) -> Option<String> {
    match String::from_utf8(raw) {
        Ok(s) => Some(s),
        Err(e) => {
            log::warn!("Discarding non UTF-8 value: {e}");
            None
        }
    }
}

impl Mapping {
    pub(crate) fn new(kind: EntityKind, by_name: &str, by_id: &str) -> Self {
        Self {
            kind,
            by_name: by_name.to_string(),
            by_id: by_id.to_string(),
        }
    }

    pub(crate) async fn resolve_id(&self, kv: &dyn KvStore, name: &str) -> Result<Option<String>> {
        Ok(kv.hget(&self.by_name, name).await?.and_then(decode_string))
    }

    pub(crate) async fn resolve_name(&self, kv: &dyn KvStore, id: &str) -> Result<Option<String>> {
        Ok(kv.hget(&self.by_id, id).await?.and_then(decode_string))
    }

    /// Ids for several names, positionally aligned.
    pub(crate) async fn resolve_ids(
        &self,
        kv: &dyn KvStore,
        names: &[String],
    ) -> Result<Vec<Option<String>>> {
        let raw = kv.hmget(&self.by_name, names).await?;
        Ok(raw.into_iter().map(|v| v.and_then(decode_string)).collect())
    }

    /// Names for several ids; ids with no mapping are dropped.
    pub(crate) async fn resolve_names(
        &self,
        kv: &dyn KvStore,
        ids: &[String],
    ) -> Result<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw = kv.hmget(&self.by_id, ids).await?;
        let mut names = Vec::with_capacity(ids.len());
        for (id, name) in ids.iter().zip(raw) {
            match name.and_then(decode_string) {
                Some(name) => names.push(name),
                None => log::warn!("Dangling {} id '{id}' has no name mapping", self.kind),
            }
        }
        Ok(names)
    }

    pub(crate) async fn is_bound(&self, kv: &dyn KvStore, name: &str) -> Result<bool> {
        Ok(kv.hexists(&self.by_name, name).await?)
    }

    pub(crate) async fn names(&self, kv: &dyn KvStore) -> Result<Vec<String>> {
        let mut names = kv.hkeys(&self.by_name).await?;
        names.sort();
        Ok(names)
    }

    pub(crate) fn bind(&self, batch: &mut Batch, name: &str, id: &str) {
        batch
            .hset(self.by_name.as_str(), name, id)
            .hset(self.by_id.as_str(), id, name);
    }

    pub(crate) fn unbind(&self, batch: &mut Batch, name: &str, id: &str) {
        batch
            .hdel(self.by_name.as_str(), vec![name.to_string()])
            .hdel(self.by_id.as_str(), vec![id.to_string()]);
    }

    /// Move `id` from `old_name` to `new_name`; the reverse entry is overwritten.
    pub(crate) fn rebind(&self, batch: &mut Batch, old_name: &str, new_name: &str, id: &str) {
        batch
            .hdel(self.by_name.as_str(), vec![old_name.to_string()])
            .hset(self.by_name.as_str(), new_name, id)
            .hset(self.by_id.as_str(), id, new_name);
    }
}
