//! The key-value engine trait.
//!
//! [`KvStore`] is the complete set of primitives storage layers may use:
//! hash, set and sorted-set reads, cursor-based key enumeration, bulk delete,
//! and atomic batch submission. Reads are never part of a batch.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::batch::Batch;
use crate::error::Result;

/// One bound of a sorted-set score range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScoreBound {
    /// `-inf`
    NegInf,
    /// `+inf`
    PosInf,
    /// An inclusive finite score.
    Inclusive(f64),
}

impl ScoreBound {
    /// Redis argument form of the bound.
    pub fn to_arg(self) -> String {
        match self {
            ScoreBound::NegInf => "-inf".to_string(),
            ScoreBound::PosInf => "+inf".to_string(),
            ScoreBound::Inclusive(score) => score.to_string(),
        }
    }

    /// Whether `score` lies on the permitted side of this bound when used as a minimum.
    pub fn admits_from_below(self, score: f64) -> bool {
        match self {
            ScoreBound::NegInf => true,
            ScoreBound::PosInf => false,
            ScoreBound::Inclusive(min) => score >= min,
        }
    }

    /// Whether `score` lies on the permitted side of this bound when used as a maximum.
    pub fn admits_from_above(self, score: f64) -> bool {
        match self {
            ScoreBound::NegInf => false,
            ScoreBound::PosInf => true,
            ScoreBound::Inclusive(max) => score <= max,
        }
    }
}

/// One page of an incremental key scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to pass to the next call; `0` means the scan is complete.
    pub cursor: u64,
    /// Keys returned by this page (may be empty even when not complete).
    pub keys: Vec<String>,
}

/// Abstract key-value engine.
///
/// Implementations:
/// - `RedisStore`: a Redis server through a multiplexed `ConnectionManager`
/// - `MemoryStore`: in-process maps with Redis semantics
///
/// Keys that become empty (no hash fields, no set members) cease to exist.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read one hash field.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;

    /// Read several hash fields; the result is positionally aligned with `fields`.
    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<Vec<u8>>>>;

    /// Read every field of a hash. A missing key yields an empty map.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>>;

    /// Whether a hash field exists.
    async fn hexists(&self, key: &str, field: &str) -> Result<bool>;

    /// All field names of a hash.
    async fn hkeys(&self, key: &str) -> Result<Vec<String>>;

    /// All members of a set.
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    /// Whether `member` belongs to a set.
    async fn sismember(&self, key: &str, member: &str) -> Result<bool>;

    /// Sorted-set members with scores in `[min, max]`, ascending by score.
    async fn zrange_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(String, f64)>>;

    /// Score of one sorted-set member.
    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>>;

    /// One step of an incremental scan for keys matching a glob `pattern`.
    ///
    /// Start with cursor `0` and continue until the returned cursor is `0`.
    /// `count` is a hint for the amount of work per call.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage>;

    /// Unconditionally delete keys; returns how many existed.
    async fn del(&self, keys: &[String]) -> Result<usize>;

    /// Apply every write in `batch` atomically.
    async fn exec(&self, batch: Batch) -> Result<()>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Collect every key matching `pattern` by driving [`KvStore::scan`] to completion.
pub async fn scan_all(store: &dyn KvStore, pattern: &str, count: usize) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut cursor = 0;
    loop {
        let page = store.scan(cursor, pattern, count).await?;
        keys.extend(page.keys);
        if page.cursor == 0 {
            break;
        }
        cursor = page.cursor;
    }
    // SCAN may report a key more than once.
    keys.sort();
    keys.dedup();
    Ok(keys)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bound_args() {
        assert_eq!(ScoreBound::NegInf.to_arg(), "-inf");
        assert_eq!(ScoreBound::PosInf.to_arg(), "+inf");
        assert_eq!(ScoreBound::Inclusive(12.0).to_arg(), "12");
    }

    #[test]
    fn test_score_bound_admits() {
        assert!(ScoreBound::NegInf.admits_from_below(-1e300));
        assert!(ScoreBound::PosInf.admits_from_above(1e300));
        assert!(ScoreBound::Inclusive(5.0).admits_from_below(5.0));
        assert!(!ScoreBound::Inclusive(5.0).admits_from_below(4.9));
        assert!(ScoreBound::Inclusive(5.0).admits_from_above(5.0));
        assert!(!ScoreBound::Inclusive(5.0).admits_from_above(5.1));
    }

    #[test]
    fn test_scan_all_drains_every_page() {
        let store = crate::MemoryStore::new();
        let mut batch = Batch::new();
        for i in 0..25 {
            batch.sadd(format!("auth:items:{i:02}:children"), "x");
        }
        batch.sadd("other:key", "x");

        let keys = tokio_test::block_on(async {
            store.exec(batch).await.unwrap();
            scan_all(&store, "auth:*", 4).await.unwrap()
        });
        assert_eq!(keys.len(), 25);
        assert_eq!(keys[0], "auth:items:00:children");
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_trait_object_safety() {
        fn _assert_object_safe(_: &dyn KvStore) {}
    }
}
