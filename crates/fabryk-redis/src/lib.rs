//! Redis client abstraction for Fabryk.
//!
//! Provides:
//! - [`KvStore`]: the key-value primitives Fabryk storage layers depend on
//! - [`Batch`] / [`Op`]: an ordered group of writes applied all-or-nothing
//! - [`RedisStore`]: production engine backed by a Redis `ConnectionManager`
//! - [`MemoryStore`]: in-process engine with the same semantics (tests, embedding)
//! - [`Error`]: engine-level error types

#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use batch::{Batch, Op};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{KvStore, ScanPage, ScoreBound, scan_all};
