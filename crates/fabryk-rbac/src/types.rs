//! Value types stored by the RBAC engine.
//!
//! [`Item`] covers both roles and permissions; the [`ItemKind`] tag decides
//! which hierarchy edges are allowed. Payloads (`data`) are opaque bytes the
//! engine never inspects.

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Kinds
// ============================================================================

/// The two kinds of hierarchy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A role: may be assigned to users, may have role or permission children.
    Role,
    /// A permission: may only have permission children.
    Permission,
}

impl ItemKind {
    /// Stored type code (`1` role, `2` permission); also the Type Index key id.
    pub fn code(self) -> u8 {
        match self {
            ItemKind::Role => 1,
            ItemKind::Permission => 2,
        }
    }

    /// Parse a stored type code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "1" => Some(ItemKind::Role),
            "2" => Some(ItemKind::Permission),
            _ => None,
        }
    }

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Role => "role",
            ItemKind::Permission => "permission",
        }
    }

    /// Whether an item of this kind may have a child of kind `child`.
    ///
    /// A permission never has a role beneath it.
    pub fn accepts_child(self, child: ItemKind) -> bool {
        !(self == ItemKind::Permission && child == ItemKind::Role)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "role" | "1" => Ok(ItemKind::Role),
            "permission" | "2" => Ok(ItemKind::Permission),
            other => Err(format!("unknown item kind '{other}'")),
        }
    }
}

/// Entity families that own a name ↔ id mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Rules
    Rule,
    /// Roles and permissions
    Item,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Rule => f.write_str("rule"),
            EntityKind::Item => f.write_str("item"),
        }
    }
}

// ============================================================================
// Rule
// ============================================================================

/// A named, independently stored condition payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Unique, non-empty name.
    pub name: String,
    /// Opaque payload.
    pub data: Option<Vec<u8>>,
    /// Creation time; defaulted on add when unset.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time; set by the store on add and update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Rule {
    /// Create a rule without payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Attach an opaque payload.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach a JSON-encoded payload.
    pub fn with_json_data<T: Serialize>(mut self, value: &T) -> serde_json::Result<Self> {
        self.data = Some(serde_json::to_vec(value)?);
        Ok(self)
    }

    /// Decode the payload as JSON; `None` when absent or unreadable.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Option<T> {
        decode_json(self.data.as_deref())
    }
}

// ============================================================================
// Item
// ============================================================================

/// A role or a permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Unique, non-empty name.
    pub name: String,
    /// Role or permission.
    pub kind: ItemKind,
    /// Free-form description.
    pub description: Option<String>,
    /// Name of the attached rule, if any.
    pub rule_name: Option<String>,
    /// Opaque payload.
    pub data: Option<Vec<u8>>,
    /// Creation time; defaulted on add when unset.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time; set by the store on add and update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Create an item of the given kind.
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            rule_name: None,
            data: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Create a role.
    pub fn role(name: impl Into<String>) -> Self {
        Self::new(name, ItemKind::Role)
    }

    /// Create a permission.
    pub fn permission(name: impl Into<String>) -> Self {
        Self::new(name, ItemKind::Permission)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attach a rule by name.
    pub fn with_rule(mut self, rule_name: impl Into<String>) -> Self {
        self.rule_name = Some(rule_name.into());
        self
    }

    /// Attach an opaque payload.
    pub fn with_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Attach a JSON-encoded payload.
    pub fn with_json_data<T: Serialize>(mut self, value: &T) -> serde_json::Result<Self> {
        self.data = Some(serde_json::to_vec(value)?);
        Ok(self)
    }

    /// Decode the payload as JSON; `None` when absent or unreadable.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Option<T> {
        decode_json(self.data.as_deref())
    }

    /// Whether this item is a role.
    pub fn is_role(&self) -> bool {
        self.kind == ItemKind::Role
    }

    /// Whether this item is a permission.
    pub fn is_permission(&self) -> bool {
        self.kind == ItemKind::Permission
    }
}

// ============================================================================
// Assignment
// ============================================================================

/// A timestamped grant of a role to a user.
///
/// Not stored as a record: it is the pair of matching entries in the user's
/// and the role's assignment indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Caller-owned user identifier.
    pub user_id: String,
    /// Name of the assigned role.
    pub role_name: String,
    /// When the assignment was made.
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Time helpers
// ============================================================================

/// Current time at the whole-second precision the store persists.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Truncate a caller-supplied timestamp to stored precision.
pub(crate) fn whole_seconds(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(0)
}

pub(crate) fn encode_timestamp(ts: DateTime<Utc>) -> Vec<u8> {
    ts.timestamp().to_string().into_bytes()
}

pub(crate) fn decode_timestamp(raw: Option<&Vec<u8>>) -> Option<DateTime<Utc>> {
    let text = std::str::from_utf8(raw?).ok()?;
    let secs = text.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp(secs, 0)
}

pub(crate) fn timestamp_from_score(score: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(score as i64, 0)
}

pub(crate) fn score_from_timestamp(ts: DateTime<Utc>) -> f64 {
    ts.timestamp() as f64
}

fn decode_json<T: DeserializeOwned>(raw: Option<&[u8]>) -> Option<T> {
    serde_json::from_slice(raw?).ok()
}
