//! User ↔ role assignments.
//!
//! An assignment lives in two sorted sets scored by the assignment time:
//! `user_assignments(user)` holds role ids, `role_assignments(role id)`
//! holds user ids. Both sides are written and removed in one batch.

use fabryk_redis::{Batch, ScoreBound};

use crate::error::{Error, Result};
use crate::store::RbacStore;
use crate::types::{
    Assignment, EntityKind, Item, now, score_from_timestamp, timestamp_from_score,
};

impl RbacStore {
    async fn require_role_id(&self, role_name: &str) -> Result<String> {
        self.items
            .resolve_id(self.kv(), role_name)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Item, role_name))
    }

    async fn full_range(&self, key: &str) -> Result<Vec<(String, f64)>> {
        Ok(self
            .kv()
            .zrange_by_score(key, ScoreBound::NegInf, ScoreBound::PosInf)
            .await?)
    }

    /// Grant `role_name` to `user_id`, stamped with the current time.
    ///
    /// Assigning an already held role refreshes its timestamp.
    pub async fn assign(&self, role_name: &str, user_id: &str) -> Result<Assignment> {
        if user_id.is_empty() {
            return Err(Error::invalid_parameter("User id must be defined"));
        }
        let role_id = self.require_role_id(role_name).await?;
        let assignment = Assignment {
            user_id: user_id.to_string(),
            role_name: role_name.to_string(),
            created_at: now(),
        };
        let score = score_from_timestamp(assignment.created_at);

        let mut batch = Batch::new();
        batch
            .zadd(self.keys.user_assignments(user_id), score, role_id.as_str())
            .zadd(self.keys.role_assignments(&role_id), score, user_id);
        self.commit("assign", &format!("{role_name} -> {user_id}"), batch)
            .await?;
        Ok(assignment)
    }

    /// Withdraw `role_name` from `user_id`.
    ///
    /// Returns `false` for an empty user id or when the role was not held.
    pub async fn revoke(&self, role_name: &str, user_id: &str) -> Result<bool> {
        if user_id.is_empty() {
            return Ok(false);
        }
        let role_id = self.require_role_id(role_name).await?;
        let user_key = self.keys.user_assignments(user_id);
        let held = self.kv().zscore(&user_key, &role_id).await?.is_some();

        let mut batch = Batch::new();
        batch
            .zrem(user_key, role_id.as_str())
            .zrem(self.keys.role_assignments(&role_id), user_id);
        self.commit("revoke", &format!("{role_name} -> {user_id}"), batch)
            .await?;
        Ok(held)
    }

    /// Withdraw every role from `user_id`.
    ///
    /// Returns `false` for an empty user id or a user holding no roles.
    pub async fn revoke_all(&self, user_id: &str) -> Result<bool> {
        if user_id.is_empty() {
            return Ok(false);
        }
        let user_key = self.keys.user_assignments(user_id);
        let held = self.full_range(&user_key).await?;
        if held.is_empty() {
            return Ok(false);
        }

        let mut batch = Batch::new();
        for (role_id, _) in &held {
            batch.zrem(self.keys.role_assignments(role_id), user_id);
        }
        batch.del(user_key);
        self.commit("revoke_all", user_id, batch).await?;
        Ok(true)
    }

    /// Roles held by a user, in assignment order.
    pub async fn get_roles_by_user(&self, user_id: &str) -> Result<Vec<Item>> {
        if user_id.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = self
            .full_range(&self.keys.user_assignments(user_id))
            .await?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        self.items_by_ids(&ids).await
    }

    /// Raw user ids holding a role, in assignment order.
    pub async fn get_user_ids_by_role(&self, role_name: &str) -> Result<Vec<String>> {
        let Some(role_id) = self.items.resolve_id(self.kv(), role_name).await? else {
            return Ok(Vec::new());
        };
        Ok(self
            .full_range(&self.keys.role_assignments(&role_id))
            .await?
            .into_iter()
            .map(|(user, _)| user)
            .collect())
    }

    /// Timestamped assignments of a user, in assignment order.
    pub async fn get_assignments(&self, user_id: &str) -> Result<Vec<Assignment>> {
        if user_id.is_empty() {
            return Ok(Vec::new());
        }
        let entries = self.full_range(&self.keys.user_assignments(user_id)).await?;
        let mut assignments = Vec::with_capacity(entries.len());
        for (role_id, score) in entries {
            let Some(role_name) = self.items.resolve_name(self.kv(), &role_id).await? else {
                log::warn!("User '{user_id}' holds dangling role id '{role_id}'");
                continue;
            };
            if let Some(created_at) = timestamp_from_score(score) {
                assignments.push(Assignment {
                    user_id: user_id.to_string(),
                    role_name,
                    created_at,
                });
            }
        }
        Ok(assignments)
    }

    /// The assignment of `role_name` to `user_id`, if held.
    pub async fn get_assignment(
        &self,
        role_name: &str,
        user_id: &str,
    ) -> Result<Option<Assignment>> {
        if user_id.is_empty() {
            return Ok(None);
        }
        let Some(role_id) = self.items.resolve_id(self.kv(), role_name).await? else {
            return Ok(None);
        };
        let score = self
            .kv()
            .zscore(&self.keys.user_assignments(user_id), &role_id)
            .await?;
        Ok(score.and_then(timestamp_from_score).map(|created_at| Assignment {
            user_id: user_id.to_string(),
            role_name: role_name.to_string(),
            created_at,
        }))
    }

    /// Timestamped assignments of a role, read from the role-side index.
    pub async fn get_role_assignments(&self, role_name: &str) -> Result<Vec<Assignment>> {
        let Some(role_id) = self.items.resolve_id(self.kv(), role_name).await? else {
            return Ok(Vec::new());
        };
        let entries = self.full_range(&self.keys.role_assignments(&role_id)).await?;
        Ok(entries
            .into_iter()
            .filter_map(|(user_id, score)| {
                timestamp_from_score(score).map(|created_at| Assignment {
                    user_id,
                    role_name: role_name.to_string(),
                    created_at,
                })
            })
            .collect())
    }
}
