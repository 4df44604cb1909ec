//! Role and permission records.
//!
//! An item is a hash at `item(id)`:
//!
//! | field | content |
//! |---|---|
//! | `data` | opaque payload (omitted when absent) |
//! | `type` | `1` role, `2` permission |
//! | `createdAt`, `updatedAt` | Unix seconds |
//! | `description` | omitted when absent |
//! | `ruleGuid` | id of the attached rule, omitted when none |
//!
//! The id is also a member of `type_items(kind)` and, when a rule is
//! attached, of `rule_items(rule id)`.

use fabryk_redis::Batch;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::mapping::decode_string;
use crate::rules::{FIELD_CREATED_AT, FIELD_DATA, FIELD_UPDATED_AT};
use crate::store::{RbacStore, new_guid};
use crate::types::{
    EntityKind, Item, ItemKind, decode_timestamp, encode_timestamp, now, whole_seconds,
};

pub(crate) const FIELD_TYPE: &str = "type";
pub(crate) const FIELD_DESCRIPTION: &str = "description";
pub(crate) const FIELD_RULE: &str = "ruleGuid";

/// Stored `type` and `ruleGuid` of an item, read before mutating it.
struct CurrentLinks {
    kind: Option<ItemKind>,
    rule_guid: Option<String>,
}

fn item_fields(item: &Item, rule_guid: Option<&str>) -> Vec<(String, Vec<u8>)> {
    let mut fields = vec![(FIELD_TYPE.to_string(), item.kind.code().to_string().into_bytes())];
    if let Some(data) = &item.data {
        fields.push((FIELD_DATA.to_string(), data.clone()));
    }
    if let Some(created_at) = item.created_at {
        fields.push((FIELD_CREATED_AT.to_string(), encode_timestamp(created_at)));
    }
    if let Some(updated_at) = item.updated_at {
        fields.push((FIELD_UPDATED_AT.to_string(), encode_timestamp(updated_at)));
    }
    if let Some(description) = &item.description {
        fields.push((FIELD_DESCRIPTION.to_string(), description.clone().into_bytes()));
    }
    if let Some(rule_guid) = rule_guid {
        fields.push((FIELD_RULE.to_string(), rule_guid.as_bytes().to_vec()));
    }
    fields
}

fn field_string(record: &mut HashMap<String, Vec<u8>>, field: &str) -> Option<String> {
    record.remove(field).and_then(decode_string)
}

impl RbacStore {
    async fn resolve_rule_guid(&self, rule_name: Option<&str>) -> Result<Option<String>> {
        match rule_name {
            Some(name) if !name.is_empty() => self.rules.resolve_id(self.kv(), name).await,
            _ => Ok(None),
        }
    }

    async fn current_links(&self, guid: &str) -> Result<CurrentLinks> {
        let values = self
            .kv()
            .hmget(
                &self.keys.item(guid),
                &[FIELD_RULE.to_string(), FIELD_TYPE.to_string()],
            )
            .await?;
        let mut values = values.into_iter().map(|v| v.and_then(decode_string));
        let rule_guid = values.next().flatten();
        let kind = values
            .next()
            .flatten()
            .and_then(|code| ItemKind::from_code(&code));
        Ok(CurrentLinks { kind, rule_guid })
    }

    /// Stored kind of an item; an unreadable `type` reads as a role.
    pub(crate) async fn stored_kind(&self, guid: &str) -> Result<ItemKind> {
        let code = self
            .kv()
            .hget(&self.keys.item(guid), FIELD_TYPE)
            .await?
            .and_then(decode_string);
        Ok(code
            .as_deref()
            .and_then(ItemKind::from_code)
            .unwrap_or(ItemKind::Role))
    }

    /// Refuse a kind change that would break the constraint on an existing edge.
    async fn check_reclassification(
        &self,
        guid: &str,
        name: &str,
        kind: ItemKind,
    ) -> Result<()> {
        match kind {
            ItemKind::Role => {
                for parent in self.kv().smembers(&self.keys.item_parents(guid)).await? {
                    if self.stored_kind(&parent).await? == ItemKind::Permission {
                        return Err(Error::invalid_parameter(format!(
                            "Cannot make '{name}' a role while a permission is its parent."
                        )));
                    }
                }
            }
            ItemKind::Permission => {
                for child in self.kv().smembers(&self.keys.item_children(guid)).await? {
                    if self.stored_kind(&child).await? == ItemKind::Role {
                        return Err(Error::invalid_parameter(format!(
                            "Cannot make '{name}' a permission while it has role children."
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn populate_item(
        &self,
        name: &str,
        mut record: HashMap<String, Vec<u8>>,
        rule_name: Option<String>,
    ) -> Item {
        let kind = match field_string(&mut record, FIELD_TYPE)
            .as_deref()
            .and_then(ItemKind::from_code)
        {
            Some(kind) => kind,
            None => {
                log::warn!("Item '{name}' has no readable type; treating it as a role");
                ItemKind::Role
            }
        };
        Item {
            name: name.to_string(),
            kind,
            description: field_string(&mut record, FIELD_DESCRIPTION),
            rule_name,
            data: record.remove(FIELD_DATA),
            created_at: decode_timestamp(record.get(FIELD_CREATED_AT)),
            updated_at: decode_timestamp(record.get(FIELD_UPDATED_AT)),
        }
    }

    /// Store a new role or permission.
    ///
    /// A `rule_name` that does not resolve to a stored rule is dropped rather
    /// than rejected. Returns the item as stored.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an empty name, `DuplicateKey` if the name is taken.
    pub async fn add_item(&self, item: &Item) -> Result<Item> {
        if item.name.is_empty() {
            return Err(Error::invalid_parameter("Item name must be defined"));
        }
        if self.items.is_bound(self.kv(), &item.name).await? {
            return Err(Error::duplicate(EntityKind::Item, &item.name));
        }

        let guid = new_guid();
        let time = now();
        let rule_guid = self.resolve_rule_guid(item.rule_name.as_deref()).await?;

        let mut stored = item.clone();
        stored.created_at = Some(item.created_at.map_or(time, whole_seconds));
        stored.updated_at = Some(item.updated_at.map_or(time, whole_seconds));
        if rule_guid.is_none() {
            if let Some(rule_name) = stored.rule_name.take() {
                log::debug!("Item '{}': rule '{rule_name}' not found, not linked", item.name);
            }
        }

        let mut batch = Batch::new();
        self.items.bind(&mut batch, &stored.name, &guid);
        batch.hset_multiple(self.keys.item(&guid), item_fields(&stored, rule_guid.as_deref()));
        batch.sadd(self.keys.type_items(stored.kind), guid.as_str());
        if let Some(rule_guid) = &rule_guid {
            batch.sadd(self.keys.rule_items(rule_guid), guid.as_str());
        }
        self.commit("add_item", &stored.name, batch).await?;
        Ok(stored)
    }

    /// Look up a role or permission by name.
    ///
    /// An unreadable record field degrades to `None` for that field.
    pub async fn get_item(&self, name: &str) -> Result<Option<Item>> {
        let Some(guid) = self.items.resolve_id(self.kv(), name).await? else {
            return Ok(None);
        };
        let mut record = self.kv().hgetall(&self.keys.item(&guid)).await?;
        if record.is_empty() {
            log::warn!("Item '{name}' is mapped to '{guid}' but has no record");
            return Ok(None);
        }
        let rule_name = match field_string(&mut record, FIELD_RULE) {
            Some(rule_guid) => self.rules.resolve_name(self.kv(), &rule_guid).await?,
            None => None,
        };
        Ok(Some(self.populate_item(name, record, rule_name)))
    }

    /// Materialize items by id, skipping ids that no longer resolve.
    pub(crate) async fn items_by_ids(&self, ids: &[String]) -> Result<Vec<Item>> {
        let mut items = Vec::with_capacity(ids.len());
        for name in self.items.resolve_names(self.kv(), ids).await? {
            if let Some(item) = self.get_item(&name).await? {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Every item of one kind, ordered by name.
    pub async fn get_items(&self, kind: ItemKind) -> Result<Vec<Item>> {
        let ids = self.kv().smembers(&self.keys.type_items(kind)).await?;
        let mut items = self.items_by_ids(&ids).await?;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    /// Rewrite the item currently named `name`.
    ///
    /// The id, hierarchy edges and assignments are kept. The Type Index and
    /// Rule–Item Index follow the new `kind` and `rule_name`; a description
    /// or payload that became `None` is deleted from the record.
    ///
    /// A kind change fails with `InvalidParameter` if it would leave a role
    /// under a permission on an existing edge.
    pub async fn update_item(&self, name: &str, item: &Item) -> Result<Item> {
        if item.name.is_empty() {
            return Err(Error::invalid_parameter("Item name must be defined"));
        }
        let guid = self
            .items
            .resolve_id(self.kv(), name)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Item, name))?;
        let renamed = item.name != name;
        if renamed && self.items.is_bound(self.kv(), &item.name).await? {
            return Err(Error::duplicate(EntityKind::Item, &item.name));
        }

        let rule_guid = self.resolve_rule_guid(item.rule_name.as_deref()).await?;
        let current = self.current_links(&guid).await?;
        if current.kind != Some(item.kind) {
            self.check_reclassification(&guid, name, item.kind).await?;
        }

        let mut stored = item.clone();
        stored.created_at = item.created_at.map(whole_seconds);
        stored.updated_at = Some(now());
        if rule_guid.is_none() {
            stored.rule_name = None;
        }

        let key = self.keys.item(&guid);
        let mut batch = Batch::new();
        if renamed {
            self.items.rebind(&mut batch, name, &stored.name, &guid);
        }

        let mut cleared = Vec::new();
        if stored.description.is_none() {
            cleared.push(FIELD_DESCRIPTION.to_string());
        }
        if stored.data.is_none() {
            cleared.push(FIELD_DATA.to_string());
        }

        if rule_guid != current.rule_guid {
            if let Some(old) = &current.rule_guid {
                batch.srem(self.keys.rule_items(old), guid.as_str());
            }
            match &rule_guid {
                Some(new) => {
                    batch.sadd(self.keys.rule_items(new), guid.as_str());
                }
                None => cleared.push(FIELD_RULE.to_string()),
            }
        }

        if current.kind != Some(stored.kind) {
            match current.kind {
                Some(old) => {
                    batch.srem(self.keys.type_items(old), guid.as_str());
                }
                None => {
                    for kind in [ItemKind::Role, ItemKind::Permission] {
                        batch.srem(self.keys.type_items(kind), guid.as_str());
                    }
                }
            }
            batch.sadd(self.keys.type_items(stored.kind), guid.as_str());
        }

        batch.hset_multiple(key.as_str(), item_fields(&stored, rule_guid.as_deref()));
        batch.hdel(key.as_str(), cleared);
        self.commit("update_item", &stored.name, batch).await?;

        if stored.created_at.is_none() {
            stored.created_at =
                decode_timestamp(self.kv().hget(&key, FIELD_CREATED_AT).await?.as_ref());
        }
        Ok(stored)
    }

    /// Delete an item and every index entry referencing it.
    ///
    /// Parents lose it as a child and children lose it as a parent; the
    /// children themselves are kept. Assignment indices are left alone
    /// (see `remove_all_assignments`).
    pub async fn remove_item(&self, name: &str) -> Result<()> {
        let guid = self
            .items
            .resolve_id(self.kv(), name)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Item, name))?;
        let current = self.current_links(&guid).await?;
        let parents_key = self.keys.item_parents(&guid);
        let children_key = self.keys.item_children(&guid);
        let parents = self.kv().smembers(&parents_key).await?;
        let children = self.kv().smembers(&children_key).await?;

        let mut batch = Batch::new();
        self.items.unbind(&mut batch, name, &guid);
        if let Some(rule_guid) = &current.rule_guid {
            batch.srem(self.keys.rule_items(rule_guid), guid.as_str());
        }
        match current.kind {
            Some(kind) => {
                batch.srem(self.keys.type_items(kind), guid.as_str());
            }
            None => {
                for kind in [ItemKind::Role, ItemKind::Permission] {
                    batch.srem(self.keys.type_items(kind), guid.as_str());
                }
            }
        }
        for parent in &parents {
            batch.srem(self.keys.item_children(parent), guid.as_str());
        }
        for child in &children {
            batch.srem(self.keys.item_parents(child), guid.as_str());
        }
        batch.del(parents_key).del(children_key).del(self.keys.item(&guid));
        self.commit("remove_item", name, batch).await
    }
}
