//! In-process [`KvStore`] with Redis semantics.
//!
//! Used by tests and by callers that embed the storage layer without a
//! server. Batches are applied to a staged copy of the keys they touch and
//! swapped in only when every operation succeeded, so a failing batch leaves
//! the store untouched.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};

use crate::batch::{Batch, Op};
use crate::error::{Error, Result};
use crate::store::{KvStore, ScanPage, ScoreBound};

#[derive(Clone, Debug, PartialEq)]
enum Entry {
    Hash(HashMap<String, Vec<u8>>),
    Set(BTreeSet<String>),
    SortedSet(HashMap<String, f64>),
}

impl Entry {
    fn is_empty(&self) -> bool {
        match self {
            Entry::Hash(h) => h.is_empty(),
            Entry::Set(s) => s.is_empty(),
            Entry::SortedSet(z) => z.is_empty(),
        }
    }
}

/// In-memory key-value engine.
///
/// SCAN cursors are opaque tokens remembering the last key returned, so keys
/// present for the whole scan are reported even if others are deleted
/// between pages.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<String, Entry>>,
    cursors: Mutex<HashMap<u64, String>>,
    last_cursor: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the store holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    /// Whether `key` exists.
    pub async fn contains_key(&self, key: &str) -> bool {
        self.data.read().await.contains_key(key)
    }

    /// Every live key, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.data.read().await.keys().cloned().collect()
    }
}

fn as_hash<'a>(
    key: &str,
    entry: Option<&'a Entry>,
) -> Result<Option<&'a HashMap<String, Vec<u8>>>> {
    match entry {
        None => Ok(None),
        Some(Entry::Hash(h)) => Ok(Some(h)),
        Some(_) => Err(Error::wrong_type(key, "hash")),
    }
}

fn as_set<'a>(key: &str, entry: Option<&'a Entry>) -> Result<Option<&'a BTreeSet<String>>> {
    match entry {
        None => Ok(None),
        Some(Entry::Set(s)) => Ok(Some(s)),
        Some(_) => Err(Error::wrong_type(key, "set")),
    }
}

fn as_sorted_set<'a>(
    key: &str,
    entry: Option<&'a Entry>,
) -> Result<Option<&'a HashMap<String, f64>>> {
    match entry {
        None => Ok(None),
        Some(Entry::SortedSet(z)) => Ok(Some(z)),
        Some(_) => Err(Error::wrong_type(key, "sorted set")),
    }
}

/// Apply one op to the staged view of the keys it touches.
fn apply(staged: &mut HashMap<String, Option<Entry>>, op: Op) -> Result<()> {
    match op {
        Op::HSet { key, fields } => {
            let slot = staged.entry(key.clone()).or_insert(None);
            let entry = slot.get_or_insert_with(|| Entry::Hash(HashMap::new()));
            let Entry::Hash(hash) = entry else {
                return Err(Error::wrong_type(key, "hash"));
            };
            hash.extend(fields);
        }
        Op::HDel { key, fields } => {
            if let Some(Some(entry)) = staged.get_mut(&key) {
                let Entry::Hash(hash) = entry else {
                    return Err(Error::wrong_type(key, "hash"));
                };
                for field in &fields {
                    hash.remove(field);
                }
            }
        }
        Op::SAdd { key, member } => {
            let slot = staged.entry(key.clone()).or_insert(None);
            let entry = slot.get_or_insert_with(|| Entry::Set(BTreeSet::new()));
            let Entry::Set(set) = entry else {
                return Err(Error::wrong_type(key, "set"));
            };
            set.insert(member);
        }
        Op::SRem { key, member } => {
            if let Some(Some(entry)) = staged.get_mut(&key) {
                let Entry::Set(set) = entry else {
                    return Err(Error::wrong_type(key, "set"));
                };
                set.remove(&member);
            }
        }
        Op::ZAdd { key, score, member } => {
            let slot = staged.entry(key.clone()).or_insert(None);
            let entry = slot.get_or_insert_with(|| Entry::SortedSet(HashMap::new()));
            let Entry::SortedSet(zset) = entry else {
                return Err(Error::wrong_type(key, "sorted set"));
            };
            zset.insert(member, score);
        }
        Op::ZRem { key, member } => {
            if let Some(Some(entry)) = staged.get_mut(&key) {
                let Entry::SortedSet(zset) = entry else {
                    return Err(Error::wrong_type(key, "sorted set"));
                };
                zset.remove(&member);
            }
        }
        Op::Del { keys } => {
            for key in keys {
                staged.insert(key, None);
            }
        }
    }
    Ok(())
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let data = self.data.read().await;
        Ok(as_hash(key, data.get(key))?.and_then(|h| h.get(field).cloned()))
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let data = self.data.read().await;
        let hash = as_hash(key, data.get(key))?;
        Ok(fields
            .iter()
            .map(|f| hash.and_then(|h| h.get(f).cloned()))
            .collect())
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        let data = self.data.read().await;
        Ok(as_hash(key, data.get(key))?.cloned().unwrap_or_default())
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        let data = self.data.read().await;
        Ok(as_hash(key, data.get(key))?.is_some_and(|h| h.contains_key(field)))
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        let data = self.data.read().await;
        Ok(as_hash(key, data.get(key))?
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let data = self.data.read().await;
        Ok(as_set(key, data.get(key))?
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let data = self.data.read().await;
        Ok(as_set(key, data.get(key))?.is_some_and(|s| s.contains(member)))
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(String, f64)>> {
        let data = self.data.read().await;
        let Some(zset) = as_sorted_set(key, data.get(key))? else {
            return Ok(Vec::new());
        };
        let mut members: Vec<(String, f64)> = zset
            .iter()
            .filter(|(_, score)| min.admits_from_below(**score) && max.admits_from_above(**score))
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        // Redis orders ties lexicographically by member.
        members.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        Ok(members)
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>> {
        let data = self.data.read().await;
        Ok(as_sorted_set(key, data.get(key))?.and_then(|z| z.get(member).copied()))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let matcher = glob::Pattern::new(pattern).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        let after = if cursor == 0 {
            None
        } else {
            let last = self.cursors.lock().await.remove(&cursor);
            Some(last.ok_or(Error::InvalidCursor { cursor })?)
        };

        let data = self.data.read().await;
        let lower = match &after {
            Some(last) => Bound::Excluded(last.as_str()),
            None => Bound::Unbounded,
        };
        let walked: Vec<&String> = data
            .range::<str, _>((lower, Bound::Unbounded))
            .map(|(k, _)| k)
            .take(count.max(1))
            .collect();

        let more = match walked.last() {
            Some(last) => data
                .range::<str, _>((Bound::Excluded(last.as_str()), Bound::Unbounded))
                .next()
                .is_some(),
            None => false,
        };
        let cursor = match walked.last() {
            Some(last) if more => {
                let token = self.last_cursor.fetch_add(1, Ordering::Relaxed) + 1;
                self.cursors.lock().await.insert(token, (*last).clone());
                token
            }
            _ => 0,
        };
        let keys = walked
            .into_iter()
            .filter(|k| matcher.matches(k))
            .cloned()
            .collect();
        Ok(ScanPage { cursor, keys })
    }

    async fn del(&self, keys: &[String]) -> Result<usize> {
        let mut data = self.data.write().await;
        Ok(keys.iter().filter(|k| data.remove(k.as_str()).is_some()).count())
    }

    async fn exec(&self, batch: Batch) -> Result<()> {
        let mut data = self.data.write().await;

        let mut staged: HashMap<String, Option<Entry>> = HashMap::new();
        for op in batch.ops() {
            for key in op.keys() {
                if !staged.contains_key(key) {
                    staged.insert(key.to_string(), data.get(key).cloned());
                }
            }
        }

        for op in batch.into_ops() {
            apply(&mut staged, op)?;
        }

        for (key, entry) in staged {
            match entry {
                Some(entry) if !entry.is_empty() => {
                    data.insert(key, entry);
                }
                _ => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
