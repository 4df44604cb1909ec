//! # fabryk-rbac
//!
//! Role-based access control persistence for Fabryk.
//!
//! Roles, permissions, rules, the role/permission hierarchy and user
//! assignments live in a key-value engine ([`fabryk_redis::KvStore`]) as a set
//! of denormalized indices:
//!
//! - name ↔ id mappings for rules and items
//! - per-item and per-rule records (hashes)
//! - items by type, items by rule
//! - parent and child adjacency sets for every item
//! - per-user and per-role assignment sorted sets, scored by assignment time
//!
//! Every mutation reads what it needs first, then commits one atomic
//! [`Batch`](fabryk_redis::Batch) touching every affected index.
//!
//! ```no_run
//! use fabryk_rbac::{Item, RbacStore};
//!
//! # async fn demo() -> fabryk_rbac::Result<()> {
//! let store = RbacStore::in_memory();
//! store.add_item(&Item::role("admin")).await?;
//! store.add_item(&Item::permission("posts.delete")).await?;
//! store
//!     .add_child(&Item::role("admin"), &Item::permission("posts.delete"))
//!     .await?;
//! store.assign("admin", "user-42").await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod keys;
pub mod types;

mod admin;
mod assignments;
mod hierarchy;
mod items;
mod mapping;
mod rules;
mod store;

pub use config::{KeyTemplates, RbacConfig};
pub use error::{Error, Result};
pub use keys::KeySpace;
pub use store::RbacStore;
pub use types::{Assignment, EntityKind, Item, ItemKind, Rule};
