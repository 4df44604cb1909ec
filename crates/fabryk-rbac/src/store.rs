//! The RBAC store handle.
//!
//! [`RbacStore`] owns one shared engine handle and the key layout. Its
//! operations are split by concern across `rules`, `items`, `hierarchy`,
//! `assignments` and `admin`.
//!
//! # Consistency
//!
//! Reads that decide a mutation (existence checks, current field values)
//! run before the batch is submitted and are not covered by it. Two writers
//! racing on the same name can therefore both pass a duplicate check.

use fabryk_redis::{Batch, KvStore, MemoryStore, RedisStore};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RbacConfig;
use crate::error::Result;
use crate::keys::KeySpace;
use crate::mapping::Mapping;
use crate::types::EntityKind;

/// RBAC storage engine over a key-value store.
///
/// Cheap to clone; clones share the engine handle.
#[derive(Clone)]
pub struct RbacStore {
    kv: Arc<dyn KvStore>,
    pub(crate) keys: KeySpace,
    pub(crate) rules: Mapping,
    pub(crate) items: Mapping,
    pub(crate) scan_count: usize,
    pub(crate) delete_batch_size: usize,
}

impl RbacStore {
    /// Create a store with the default key layout.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self::build(kv, &RbacConfig::default())
    }

    /// Create a store with a custom layout; the configuration is validated.
    pub fn with_config(kv: Arc<dyn KvStore>, config: &RbacConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(kv, config))
    }

    /// Connect to the Redis server named by `config.redis_url`.
    pub async fn connect(config: &RbacConfig) -> Result<Self> {
        config.validate()?;
        let kv = RedisStore::connect(&config.redis_url).await?;
        Ok(Self::build(Arc::new(kv), config))
    }

    /// Create a store over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn build(kv: Arc<dyn KvStore>, config: &RbacConfig) -> Self {
        let keys = KeySpace::from_config(config);
        let rules = Mapping::new(EntityKind::Rule, keys.rule_mapping(), keys.rule_mapping_by_id());
        let items = Mapping::new(EntityKind::Item, keys.item_mapping(), keys.item_mapping_by_id());
        Self {
            kv,
            keys,
            rules,
            items,
            scan_count: config.scan_count,
            delete_batch_size: config.delete_batch_size,
        }
    }

    /// The key layout in use.
    pub fn keys(&self) -> &KeySpace {
        &self.keys
    }

    /// The underlying engine.
    pub fn backend(&self) -> &dyn KvStore {
        self.kv.as_ref()
    }

    pub(crate) fn kv(&self) -> &dyn KvStore {
        self.kv.as_ref()
    }

    pub(crate) fn mapping(&self, kind: EntityKind) -> &Mapping {
        match kind {
            EntityKind::Rule => &self.rules,
            EntityKind::Item => &self.items,
        }
    }

    /// Internal id bound to `name`, if any.
    pub async fn resolve_id(&self, kind: EntityKind, name: &str) -> Result<Option<String>> {
        self.mapping(kind).resolve_id(self.kv(), name).await
    }

    /// Name bound to internal `id`, if any.
    pub async fn resolve_name(&self, kind: EntityKind, id: &str) -> Result<Option<String>> {
        self.mapping(kind).resolve_name(self.kv(), id).await
    }

    /// Submit a batch as one atomic unit.
    pub(crate) async fn commit(&self, operation: &str, subject: &str, batch: Batch) -> Result<()> {
        let ops = batch.len();
        self.kv.exec(batch).await?;
        log::debug!("{operation} '{subject}': committed {ops} ops");
        Ok(())
    }

    /// Delete keys in bounded `DEL` calls.
    pub(crate) async fn delete_keys(&self, keys: &[String]) -> Result<usize> {
        let mut removed = 0;
        for chunk in keys.chunks(self.delete_batch_size) {
            removed += self.kv.del(chunk).await?;
        }
        Ok(removed)
    }
}

impl std::fmt::Debug for RbacStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RbacStore")
            .field("backend", &self.kv.name())
            .field("namespace", &self.keys.namespace())
            .finish()
    }
}

/// Fresh opaque identifier for a rule or item.
pub(crate) fn new_guid() -> String {
    Uuid::new_v4().to_string()
}
