//! Bulk and reset operations.
//!
//! Key enumeration always goes through the incremental `SCAN` cursor, never
//! a single blocking listing.

use fabryk_redis::scan_all;

use crate::error::Result;
use crate::store::RbacStore;
use crate::types::ItemKind;

impl RbacStore {
    /// Every key currently stored under the namespace, sorted.
    pub async fn keys_under_namespace(&self) -> Result<Vec<String>> {
        Ok(scan_all(self.kv(), &self.keys.namespace_pattern(), self.scan_count).await?)
    }

    /// Delete every key under the namespace. Returns how many were removed.
    ///
    /// Meant for tests and teardown.
    pub async fn remove_all(&self) -> Result<usize> {
        let keys = self.keys_under_namespace().await?;
        let removed = self.delete_keys(&keys).await?;
        log::info!("Reset namespace '{}': removed {removed} keys", self.keys.namespace());
        Ok(removed)
    }

    /// Remove every item of one kind through the full `remove_item` cascade.
    pub async fn remove_all_items(&self, kind: ItemKind) -> Result<usize> {
        let ids = self.kv().smembers(&self.keys.type_items(kind)).await?;
        let names = self.items.resolve_names(self.kv(), &ids).await?;
        for name in &names {
            self.remove_item(name).await?;
        }
        log::info!("Removed {} {kind} items", names.len());
        Ok(names.len())
    }

    /// Remove every permission.
    pub async fn remove_all_permissions(&self) -> Result<usize> {
        self.remove_all_items(ItemKind::Permission).await
    }

    /// Remove every role.
    pub async fn remove_all_roles(&self) -> Result<usize> {
        self.remove_all_items(ItemKind::Role).await
    }

    /// Remove every rule, detaching it from its items.
    pub async fn remove_all_rules(&self) -> Result<usize> {
        let names = self.rules.names(self.kv()).await?;
        for name in &names {
            self.remove_rule(name).await?;
        }
        log::info!("Removed {} rules", names.len());
        Ok(names.len())
    }

    /// Delete every user-side and role-side assignment index.
    pub async fn remove_all_assignments(&self) -> Result<usize> {
        let mut keys =
            scan_all(self.kv(), &self.keys.user_assignments_pattern(), self.scan_count).await?;
        keys.extend(
            scan_all(self.kv(), &self.keys.role_assignments_pattern(), self.scan_count).await?,
        );
        let removed = self.delete_keys(&keys).await?;
        log::info!("Removed {removed} assignment indices");
        Ok(removed)
    }
}
