//! Key naming scheme.
//!
//! Every key is derived from a template by substituting `{id}`; the mapping
//! keys take no parameter. Derivation is a pure function of template and id.

use crate::config::{ID_PLACEHOLDER, KeyTemplates, RbacConfig};
use crate::types::ItemKind;

/// Resolved key layout for one store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySpace {
    namespace: String,
    templates: KeyTemplates,
}

impl Default for KeySpace {
    fn default() -> Self {
        Self::from_config(&RbacConfig::default())
    }
}

impl KeySpace {
    /// Build from a (validated) configuration.
    pub fn from_config(config: &RbacConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            templates: config.keys.clone(),
        }
    }

    fn fill(template: &str, id: &str) -> String {
        template.replace(ID_PLACEHOLDER, id)
    }

    /// Shared key prefix.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Glob matching every key of the store.
    pub fn namespace_pattern(&self) -> String {
        format!("{}*", self.namespace)
    }

    /// Sorted set of role ids assigned to `user_id`.
    pub fn user_assignments(&self, user_id: &str) -> String {
        Self::fill(&self.templates.user_assignments, user_id)
    }

    /// Sorted set of user ids holding role `role_id`.
    pub fn role_assignments(&self, role_id: &str) -> String {
        Self::fill(&self.templates.role_assignments, role_id)
    }

    /// Rule record.
    pub fn rule(&self, rule_id: &str) -> String {
        Self::fill(&self.templates.rule, rule_id)
    }

    /// Set of item ids of one kind.
    pub fn type_items(&self, kind: ItemKind) -> String {
        Self::fill(&self.templates.type_items, &kind.code().to_string())
    }

    /// Item record.
    pub fn item(&self, item_id: &str) -> String {
        Self::fill(&self.templates.item, item_id)
    }

    /// Set of item ids attached to a rule.
    pub fn rule_items(&self, rule_id: &str) -> String {
        Self::fill(&self.templates.rule_items, rule_id)
    }

    /// Set of child ids of an item.
    pub fn item_children(&self, item_id: &str) -> String {
        Self::fill(&self.templates.item_children, item_id)
    }

    /// Set of parent ids of an item.
    pub fn item_parents(&self, item_id: &str) -> String {
        Self::fill(&self.templates.item_parents, item_id)
    }

    /// Item name → id.
    pub fn item_mapping(&self) -> &str {
        &self.templates.item_mapping
    }

    /// Item id → name.
    pub fn item_mapping_by_id(&self) -> &str {
        &self.templates.item_mapping_by_id
    }

    /// Rule name → id.
    pub fn rule_mapping(&self) -> &str {
        &self.templates.rule_mapping
    }

    /// Rule id → name.
    pub fn rule_mapping_by_id(&self) -> &str {
        &self.templates.rule_mapping_by_id
    }

    /// Glob matching every per-user assignment index.
    pub fn user_assignments_pattern(&self) -> String {
        Self::fill(&self.templates.user_assignments, "*")
    }

    /// Glob matching every per-role assignment index.
    pub fn role_assignments_pattern(&self) -> String {
        Self::fill(&self.templates.role_assignments, "*")
    }
}
