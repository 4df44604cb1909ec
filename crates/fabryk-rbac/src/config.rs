//! Store configuration.
//!
//! [`RbacConfig`] is plain serde data, usually read from a TOML file:
//!
//! ```toml
//! redis_url = "redis://127.0.0.1:6379/0"
//! namespace = "auth:"
//! scan_count = 100
//!
//! [keys]
//! user_assignments = "auth:users:{id}:assignments"
//! ```
//!
//! Omitted fields take their defaults; the default key templates are the
//! canonical `auth:` layout.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Placeholder substituted by an identifier in parameterized templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Key templates for every index family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyTemplates {
    /// Sorted set of role ids per user.
    pub user_assignments: String,
    /// Sorted set of user ids per role.
    pub role_assignments: String,
    /// Rule record hash.
    pub rule: String,
    /// Set of item ids per type code.
    pub type_items: String,
    /// Item record hash.
    pub item: String,
    /// Set of item ids attached to a rule.
    pub rule_items: String,
    /// Set of child ids per item.
    pub item_children: String,
    /// Set of parent ids per item.
    pub item_parents: String,
    /// Item name → id hash.
    pub item_mapping: String,
    /// Item id → name hash.
    pub item_mapping_by_id: String,
    /// Rule name → id hash.
    pub rule_mapping: String,
    /// Rule id → name hash.
    pub rule_mapping_by_id: String,
}

impl Default for KeyTemplates {
    fn default() -> Self {
        Self {
            user_assignments: "auth:users:{id}:assignments".to_string(),
            role_assignments: "auth:roles:{id}:assignments".to_string(),
            rule: "auth:rules:{id}".to_string(),
            type_items: "auth:types:{id}:items".to_string(),
            item: "auth:items:{id}".to_string(),
            rule_items: "auth:rules:{id}:items".to_string(),
            item_children: "auth:items:{id}:children".to_string(),
            item_parents: "auth:items:{id}:parents".to_string(),
            item_mapping: "auth:mappings:items".to_string(),
            item_mapping_by_id: "auth:mappings:itemsguid".to_string(),
            rule_mapping: "auth:mappings:rules".to_string(),
            rule_mapping_by_id: "auth:mappings:rulesguid".to_string(),
        }
    }
}

impl KeyTemplates {
    /// The default layout moved under another namespace prefix.
    pub fn with_namespace(namespace: &str) -> Self {
        let defaults = Self::default();
        let rebase = |template: String| match template.strip_prefix("auth:") {
            Some(rest) => format!("{namespace}{rest}"),
            None => template,
        };
        Self {
            user_assignments: rebase(defaults.user_assignments),
            role_assignments: rebase(defaults.role_assignments),
            rule: rebase(defaults.rule),
            type_items: rebase(defaults.type_items),
            item: rebase(defaults.item),
            rule_items: rebase(defaults.rule_items),
            item_children: rebase(defaults.item_children),
            item_parents: rebase(defaults.item_parents),
            item_mapping: rebase(defaults.item_mapping),
            item_mapping_by_id: rebase(defaults.item_mapping_by_id),
            rule_mapping: rebase(defaults.rule_mapping),
            rule_mapping_by_id: rebase(defaults.rule_mapping_by_id),
        }
    }

    /// Parameterized templates with their field names.
    pub fn parameterized(&self) -> [(&'static str, &str); 8] {
        [
            ("user_assignments", self.user_assignments.as_str()),
            ("role_assignments", self.role_assignments.as_str()),
            ("rule", self.rule.as_str()),
            ("type_items", self.type_items.as_str()),
            ("item", self.item.as_str()),
            ("rule_items", self.rule_items.as_str()),
            ("item_children", self.item_children.as_str()),
            ("item_parents", self.item_parents.as_str()),
        ]
    }

    /// Fixed mapping keys with their field names.
    pub fn mappings(&self) -> [(&'static str, &str); 4] {
        [
            ("item_mapping", self.item_mapping.as_str()),
            ("item_mapping_by_id", self.item_mapping_by_id.as_str()),
            ("rule_mapping", self.rule_mapping.as_str()),
            ("rule_mapping_by_id", self.rule_mapping_by_id.as_str()),
        ]
    }
}

/// Configuration for an [`RbacStore`](crate::RbacStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix shared by every key; `remove_all` deletes everything under it.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Key templates.
    #[serde(default)]
    pub keys: KeyTemplates,

    /// `COUNT` hint for each incremental scan step.
    #[serde(default = "default_scan_count")]
    pub scan_count: usize,

    /// Maximum number of keys per bulk `DEL`.
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_namespace() -> String {
    "auth:".to_string()
}

fn default_scan_count() -> usize {
    100
}

fn default_delete_batch_size() -> usize {
    500
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
            namespace: default_namespace(),
            keys: KeyTemplates::default(),
            scan_count: default_scan_count(),
            delete_batch_size: default_delete_batch_size(),
        }
    }
}

impl RbacConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        log::debug!("Loaded RBAC configuration from {}", path.display());
        Ok(config)
    }

    /// Check the key layout.
    ///
    /// - parameterized templates contain `{id}` exactly once
    /// - mapping keys contain no placeholder
    /// - every key lies under `namespace`
    /// - no two templates are equal
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::config("namespace must not be empty"));
        }
        if self.scan_count == 0 {
            return Err(Error::config("scan_count must be greater than zero"));
        }
        if self.delete_batch_size == 0 {
            return Err(Error::config("delete_batch_size must be greater than zero"));
        }

        for (field, template) in self.keys.parameterized() {
            if template.matches(ID_PLACEHOLDER).count() != 1 {
                return Err(Error::config(format!(
                    "keys.{field} must contain '{ID_PLACEHOLDER}' exactly once: '{template}'"
                )));
            }
        }
        for (field, key) in self.keys.mappings() {
            if key.contains(ID_PLACEHOLDER) {
                return Err(Error::config(format!(
                    "keys.{field} must not contain '{ID_PLACEHOLDER}': '{key}'"
                )));
            }
        }

        let all: Vec<(&str, &str)> = self
            .keys
            .parameterized()
            .into_iter()
            .chain(self.keys.mappings())
            .collect();
        for (i, (field, template)) in all.iter().enumerate() {
            if !template.starts_with(&self.namespace) {
                return Err(Error::config(format!(
                    "keys.{field} '{template}' is outside namespace '{}'",
                    self.namespace
                )));
            }
            if let Some((other, _)) = all[i + 1..].iter().find(|(_, t)| t == template) {
                return Err(Error::config(format!(
                    "keys.{field} and keys.{other} share the template '{template}'"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = RbacConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.namespace, "auth:");
        assert_eq!(config.keys.item_mapping_by_id, "auth:mappings:itemsguid");
    }

    #[test]
    fn test_with_namespace_rebases_every_key() {
        let config = RbacConfig {
            namespace: "tenant-a:".to_string(),
            keys: KeyTemplates::with_namespace("tenant-a:"),
            ..RbacConfig::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.keys.item, "tenant-a:items:{id}");
        assert_eq!(config.keys.rule_mapping, "tenant-a:mappings:rules");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RbacConfig::from_toml_str(
            r#"
redis_url = "redis://cache:6379/2"

[keys]
item = "auth:nodes:{id}"
"#,
        )
        .unwrap();
        assert_eq!(config.redis_url, "redis://cache:6379/2");
        assert_eq!(config.keys.item, "auth:nodes:{id}");
        assert_eq!(config.keys.rule, "auth:rules:{id}");
        assert_eq!(config.scan_count, 100);
    }

    #[test]
    fn test_missing_placeholder_rejected() {
        let mut config = RbacConfig::default();
        config.keys.item_children = "auth:items:children".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("keys.item_children"));
    }

    #[test]
    fn test_placeholder_in_mapping_rejected() {
        let mut config = RbacConfig::default();
        config.keys.rule_mapping = "auth:mappings:{id}".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_outside_namespace_rejected() {
        let mut config = RbacConfig::default();
        config.keys.rule = "acl:rules:{id}".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("outside namespace"));
    }

    #[test]
    fn test_colliding_templates_rejected() {
        let mut config = RbacConfig::default();
        config.keys.item_parents = config.keys.item_children.clone();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("share the template"));
    }

    #[test]
    fn test_zero_scan_count_rejected() {
        let config = RbacConfig {
            scan_count: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "namespace = \"auth:\"\ndelete_batch_size = 50").unwrap();
        let config = RbacConfig::load(file.path()).unwrap();
        assert_eq!(config.delete_batch_size, 50);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RbacConfig::load("/nonexistent/rbac.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_invalid_toml() {
        let err = RbacConfig::from_toml_str("scan_count = \"many\"").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
