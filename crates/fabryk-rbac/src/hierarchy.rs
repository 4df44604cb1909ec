//! Parent/child edges between items.
//!
//! Every edge is written twice, into `item_children(parent)` and
//! `item_parents(child)`, inside one batch. The graph must stay acyclic.

use fabryk_redis::Batch;
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::store::RbacStore;
use crate::types::{EntityKind, Item};

impl RbacStore {
    async fn require_item_id(&self, name: &str) -> Result<String> {
        self.items
            .resolve_id(self.kv(), name)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Item, name))
    }

    /// True if `target` is reachable from `start` through child edges.
    ///
    /// Walks the stored graph depth-first with an explicit stack; each
    /// node is expanded at most once per call.
    async fn reaches(&self, start: &str, target: &str) -> Result<bool> {
        let mut stack = vec![start.to_string()];
        let mut visited = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == target {
                return Ok(true);
            }
            if !visited.insert(node.clone()) {
                continue;
            }
            for child in self.kv().smembers(&self.keys.item_children(&node)).await? {
                if !visited.contains(&child) {
                    stack.push(child);
                }
            }
        }
        Ok(false)
    }

    /// Would the edge `parent → child` close a cycle?
    async fn detect_loop(&self, parent_id: &str, child_id: &str) -> Result<bool> {
        if parent_id == child_id {
            return Ok(true);
        }
        self.reaches(child_id, parent_id).await
    }

    fn check_self_edge(parent: &Item, child: &Item) -> Result<()> {
        if parent.name == child.name {
            return Err(Error::invalid_parameter(format!(
                "Cannot add '{}' as a child of itself.",
                parent.name
            )));
        }
        Ok(())
    }

    /// Enforce the kind constraint on the stored `type` of both endpoints.
    async fn check_kinds(&self, parent_id: &str, child_id: &str) -> Result<()> {
        let parent_kind = self.stored_kind(parent_id).await?;
        let child_kind = self.stored_kind(child_id).await?;
        if !parent_kind.accepts_child(child_kind) {
            return Err(Error::invalid_parameter(
                "Cannot add a role as a child of a permission.",
            ));
        }
        Ok(())
    }

    /// Whether `add_child(parent, child)` would currently succeed.
    ///
    /// Never fails on a domain violation; storage errors still propagate.
    pub async fn can_add_child(&self, parent: &Item, child: &Item) -> Result<bool> {
        if Self::check_self_edge(parent, child).is_err() {
            return Ok(false);
        }
        let ids = self
            .items
            .resolve_ids(self.kv(), &[parent.name.clone(), child.name.clone()])
            .await?;
        let (Some(parent_id), Some(child_id)) = (&ids[0], &ids[1]) else {
            return Ok(false);
        };
        if self.check_kinds(parent_id, child_id).await.is_err() {
            return Ok(false);
        }
        Ok(!self.detect_loop(parent_id, child_id).await?)
    }

    /// Make `child` a child of `parent`.
    ///
    /// Only the names of `parent` and `child` are used; their kinds are read
    /// from the stored records.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` for a self edge or a role under a permission
    /// - `NotFound` if either item is not stored
    /// - `LoopDetected` if the edge would close a cycle
    pub async fn add_child(&self, parent: &Item, child: &Item) -> Result<()> {
        Self::check_self_edge(parent, child)?;
        let parent_id = self.require_item_id(&parent.name).await?;
        let child_id = self.require_item_id(&child.name).await?;
        self.check_kinds(&parent_id, &child_id).await?;
        if self.detect_loop(&parent_id, &child_id).await? {
            return Err(Error::LoopDetected {
                parent: parent.name.clone(),
                child: child.name.clone(),
            });
        }

        let mut batch = Batch::new();
        batch
            .sadd(self.keys.item_children(&parent_id), child_id.as_str())
            .sadd(self.keys.item_parents(&child_id), parent_id.as_str());
        self.commit("add_child", &format!("{} -> {}", parent.name, child.name), batch)
            .await
    }

    /// Remove the edge `parent → child`. Returns whether it existed.
    pub async fn remove_child(&self, parent_name: &str, child_name: &str) -> Result<bool> {
        let parent_id = self.require_item_id(parent_name).await?;
        let child_id = self.require_item_id(child_name).await?;
        let existed = self
            .kv()
            .sismember(&self.keys.item_children(&parent_id), &child_id)
            .await?;

        let mut batch = Batch::new();
        batch
            .srem(self.keys.item_children(&parent_id), child_id.as_str())
            .srem(self.keys.item_parents(&child_id), parent_id.as_str());
        self.commit("remove_child", &format!("{parent_name} -> {child_name}"), batch)
            .await?;
        Ok(existed)
    }

    /// Detach every child of `parent_name`. Returns whether it had any.
    pub async fn remove_children(&self, parent_name: &str) -> Result<bool> {
        let parent_id = self.require_item_id(parent_name).await?;
        let children_key = self.keys.item_children(&parent_id);
        let children = self.kv().smembers(&children_key).await?;
        if children.is_empty() {
            return Ok(false);
        }

        let mut batch = Batch::new();
        for child_id in &children {
            batch.srem(self.keys.item_parents(child_id), parent_id.as_str());
        }
        batch.del(children_key);
        self.commit("remove_children", parent_name, batch).await?;
        Ok(true)
    }

    /// Whether `child_name` is a direct child of `parent_name`.
    pub async fn has_child(&self, parent_name: &str, child_name: &str) -> Result<bool> {
        let ids = self
            .items
            .resolve_ids(self.kv(), &[parent_name.to_string(), child_name.to_string()])
            .await?;
        match (&ids[0], &ids[1]) {
            (Some(parent_id), Some(child_id)) => Ok(self
                .kv()
                .sismember(&self.keys.item_children(parent_id), child_id)
                .await?),
            _ => Ok(false),
        }
    }

    /// Direct children of an item, ordered by name. Unknown items have none.
    pub async fn get_children(&self, name: &str) -> Result<Vec<Item>> {
        self.neighbours(name, true).await
    }

    /// Direct parents of an item, ordered by name. Unknown items have none.
    pub async fn get_parents(&self, name: &str) -> Result<Vec<Item>> {
        self.neighbours(name, false).await
    }

    async fn neighbours(&self, name: &str, children: bool) -> Result<Vec<Item>> {
        let Some(id) = self.items.resolve_id(self.kv(), name).await? else {
            return Ok(Vec::new());
        };
        let key = if children {
            self.keys.item_children(&id)
        } else {
            self.keys.item_parents(&id)
        };
        let ids = self.kv().smembers(&key).await?;
        let mut items = self.items_by_ids(&ids).await?;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}
