//! Rule records.
//!
//! A rule is a hash at `rule(id)` holding `data`, `createdAt` and
//! `updatedAt`, plus its name ↔ id mapping. Items that reference a rule are
//! tracked in `rule_items(id)` so removal can detach them.

use fabryk_redis::Batch;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::store::{RbacStore, new_guid};
use crate::types::{EntityKind, Rule, decode_timestamp, encode_timestamp, now, whole_seconds};

pub(crate) const FIELD_DATA: &str = "data";
pub(crate) const FIELD_CREATED_AT: &str = "createdAt";
pub(crate) const FIELD_UPDATED_AT: &str = "updatedAt";

fn rule_fields(rule: &Rule) -> Vec<(String, Vec<u8>)> {
    let mut fields = Vec::with_capacity(3);
    if let Some(data) = &rule.data {
        fields.push((FIELD_DATA.to_string(), data.clone()));
    }
    if let Some(created_at) = rule.created_at {
        fields.push((FIELD_CREATED_AT.to_string(), encode_timestamp(created_at)));
    }
    if let Some(updated_at) = rule.updated_at {
        fields.push((FIELD_UPDATED_AT.to_string(), encode_timestamp(updated_at)));
    }
    fields
}

fn populate_rule(name: &str, mut record: HashMap<String, Vec<u8>>) -> Rule {
    Rule {
        name: name.to_string(),
        data: record.remove(FIELD_DATA),
        created_at: decode_timestamp(record.get(FIELD_CREATED_AT)),
        updated_at: decode_timestamp(record.get(FIELD_UPDATED_AT)),
    }
}

impl RbacStore {
    /// Store a new rule.
    ///
    /// Unset timestamps default to now. Returns the rule as stored.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an empty name, `DuplicateKey` if the name is taken.
    pub async fn add_rule(&self, rule: &Rule) -> Result<Rule> {
        if rule.name.is_empty() {
            return Err(Error::invalid_parameter("Rule name must be defined"));
        }
        if self.rules.is_bound(self.kv(), &rule.name).await? {
            return Err(Error::duplicate(EntityKind::Rule, &rule.name));
        }

        let guid = new_guid();
        let time = now();
        let mut stored = rule.clone();
        stored.created_at = Some(rule.created_at.map_or(time, whole_seconds));
        stored.updated_at = Some(rule.updated_at.map_or(time, whole_seconds));

        let mut batch = Batch::new();
        self.rules.bind(&mut batch, &stored.name, &guid);
        batch.hset_multiple(self.keys.rule(&guid), rule_fields(&stored));
        self.commit("add_rule", &stored.name, batch).await?;
        Ok(stored)
    }

    /// Rewrite the rule currently named `name`, renaming it to `rule.name`.
    ///
    /// The internal id is preserved; `updatedAt` is set to now.
    pub async fn update_rule(&self, name: &str, rule: &Rule) -> Result<Rule> {
        if rule.name.is_empty() {
            return Err(Error::invalid_parameter("Rule name must be defined"));
        }
        let guid = self
            .rules
            .resolve_id(self.kv(), name)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Rule, name))?;
        let renamed = rule.name != name;
        if renamed && self.rules.is_bound(self.kv(), &rule.name).await? {
            return Err(Error::duplicate(EntityKind::Rule, &rule.name));
        }

        let mut stored = rule.clone();
        stored.created_at = rule.created_at.map(whole_seconds);
        stored.updated_at = Some(now());

        let mut batch = Batch::new();
        if renamed {
            self.rules.rebind(&mut batch, name, &stored.name, &guid);
        }
        let key = self.keys.rule(&guid);
        batch.hset_multiple(key.as_str(), rule_fields(&stored));
        if stored.data.is_none() {
            batch.hdel(key, vec![FIELD_DATA.to_string()]);
        }
        self.commit("update_rule", &stored.name, batch).await?;

        if stored.created_at.is_none() {
            stored.created_at = decode_timestamp(
                self.kv()
                    .hget(&self.keys.rule(&guid), FIELD_CREATED_AT)
                    .await?
                    .as_ref(),
            );
        }
        Ok(stored)
    }

    /// Look up a rule by name.
    pub async fn get_rule(&self, name: &str) -> Result<Option<Rule>> {
        let Some(guid) = self.rules.resolve_id(self.kv(), name).await? else {
            return Ok(None);
        };
        let record = self.kv().hgetall(&self.keys.rule(&guid)).await?;
        if record.is_empty() {
            log::warn!("Rule '{name}' is mapped to '{guid}' but has no record");
            return Ok(None);
        }
        Ok(Some(populate_rule(name, record)))
    }

    /// Every rule, ordered by name.
    pub async fn get_rules(&self) -> Result<Vec<Rule>> {
        let mut rules = Vec::new();
        for name in self.rules.names(self.kv()).await? {
            if let Some(rule) = self.get_rule(&name).await? {
                rules.push(rule);
            }
        }
        Ok(rules)
    }

    /// Delete a rule and detach it from every item referencing it.
    pub async fn remove_rule(&self, name: &str) -> Result<()> {
        let guid = self
            .rules
            .resolve_id(self.kv(), name)
            .await?
            .ok_or_else(|| Error::not_found(EntityKind::Rule, name))?;
        let rule_items_key = self.keys.rule_items(&guid);
        let attached = self.kv().smembers(&rule_items_key).await?;

        let mut batch = Batch::new();
        self.rules.unbind(&mut batch, name, &guid);
        for item_guid in &attached {
            batch.hdel(self.keys.item(item_guid), vec![crate::items::FIELD_RULE.to_string()]);
        }
        batch.del(rule_items_key);
        batch.del(self.keys.rule(&guid));
        self.commit("remove_rule", name, batch).await?;
        log::debug!("Detached rule '{name}' from {} items", attached.len());
        Ok(())
    }
}
