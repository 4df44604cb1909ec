//! Redis-backed [`KvStore`].
//!
//! Every call clones the shared [`ConnectionManager`] (a cheap handle onto
//! one multiplexed connection) and issues a single request. Batches become a
//! `MULTI`/`EXEC` pipeline; the connection manager's own timeouts and
//! reconnect logic are the only retry policy.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;

use crate::batch::{Batch, Op};
use crate::error::{Error, Result};
use crate::store::{KvStore, ScanPage, ScoreBound};

/// Key-value engine backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    url: String,
}

impl RedisStore {
    /// Open a managed connection to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::connection(format!("invalid Redis URL '{url}': {e}")))?;
        let manager = ConnectionManager::new(client).await?;
        log::info!("Connected to Redis at {url}");
        Ok(Self {
            manager,
            url: url.to_string(),
        })
    }

    /// Wrap an already established connection manager.
    pub fn from_manager(manager: ConnectionManager, url: impl Into<String>) -> Self {
        Self {
            manager,
            url: url.into(),
        }
    }

    /// URL this store was opened with.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").field("url", &self.url).finish()
    }
}

/// Compile a batch into an atomic pipeline whose replies are all ignored.
pub(crate) fn build_pipeline(batch: &Batch) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic();
    for op in batch.ops() {
        match op {
            Op::HSet { key, fields } => {
                let cmd = pipe.cmd("HSET").arg(key);
                for (field, value) in fields {
                    cmd.arg(field).arg(value.as_slice());
                }
                cmd.ignore();
            }
            Op::HDel { key, fields } => {
                pipe.cmd("HDEL").arg(key).arg(fields).ignore();
            }
            Op::SAdd { key, member } => {
                pipe.cmd("SADD").arg(key).arg(member).ignore();
            }
            Op::SRem { key, member } => {
                pipe.cmd("SREM").arg(key).arg(member).ignore();
            }
            Op::ZAdd { key, score, member } => {
                pipe.cmd("ZADD").arg(key).arg(*score).arg(member).ignore();
            }
            Op::ZRem { key, member } => {
                pipe.cmd("ZREM").arg(key).arg(member).ignore();
            }
            Op::Del { keys } => {
                if !keys.is_empty() {
                    pipe.cmd("DEL").arg(keys).ignore();
                }
            }
        }
    }
    pipe
}

#[async_trait]
impl KvStore for RedisStore {
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let mut con = self.connection();
        let value = redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut con)
            .await?;
        Ok(value)
    }

    async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut con = self.connection();
        let values = redis::cmd("HMGET")
            .arg(key)
            .arg(fields)
            .query_async(&mut con)
            .await?;
        Ok(values)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, Vec<u8>>> {
        let mut con = self.connection();
        let values = redis::cmd("HGETALL").arg(key).query_async(&mut con).await?;
        Ok(values)
    }

    async fn hexists(&self, key: &str, field: &str) -> Result<bool> {
        let mut con = self.connection();
        let exists = redis::cmd("HEXISTS")
            .arg(key)
            .arg(field)
            .query_async(&mut con)
            .await?;
        Ok(exists)
    }

    async fn hkeys(&self, key: &str) -> Result<Vec<String>> {
        let mut con = self.connection();
        let fields = redis::cmd("HKEYS").arg(key).query_async(&mut con).await?;
        Ok(fields)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut con = self.connection();
        let members = redis::cmd("SMEMBERS").arg(key).query_async(&mut con).await?;
        Ok(members)
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let mut con = self.connection();
        let is_member = redis::cmd("SISMEMBER")
            .arg(key)
            .arg(member)
            .query_async(&mut con)
            .await?;
        Ok(is_member)
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<(String, f64)>> {
        let mut con = self.connection();
        let members = redis::cmd("ZRANGEBYSCORE")
            .arg(key)
            .arg(min.to_arg())
            .arg(max.to_arg())
            .arg("WITHSCORES")
            .query_async(&mut con)
            .await?;
        Ok(members)
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>> {
        let mut con = self.connection();
        let score = redis::cmd("ZSCORE")
            .arg(key)
            .arg(member)
            .query_async(&mut con)
            .await?;
        Ok(score)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<ScanPage> {
        let mut con = self.connection();
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut con)
            .await?;
        Ok(ScanPage { cursor, keys })
    }

    async fn del(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut con = self.connection();
        let removed = redis::cmd("DEL").arg(keys).query_async(&mut con).await?;
        Ok(removed)
    }

    async fn exec(&self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let pipe = build_pipeline(&batch);
        let mut con = self.connection();
        pipe.query_async::<()>(&mut con).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "redis"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn packed(batch: &Batch) -> String {
        String::from_utf8_lossy(&build_pipeline(batch).get_packed_pipeline()).into_owned()
    }

    #[test]
    fn test_pipeline_is_wrapped_in_transaction() {
        let mut batch = Batch::new();
        batch.sadd("auth:types:1:items", "abc");
        let wire = packed(&batch);
        let multi = wire.find("MULTI").unwrap();
        let sadd = wire.find("SADD").unwrap();
        let exec = wire.find("EXEC").unwrap();
        assert!(multi < sadd && sadd < exec);
    }

    #[test]
    fn test_pipeline_carries_every_op() {
        let mut batch = Batch::new();
        batch
            .hset("auth:mappings:items", "admin", "g1")
            .hdel("auth:items:g1", vec!["description".to_string()])
            .srem("auth:types:2:items", "g1")
            .zadd("auth:users:u1:assignments", 1_700_000_000.0, "g1")
            .zrem("auth:roles:g1:assignments", "u1")
            .del("auth:items:g1:children");
        let wire = packed(&batch);
        for name in ["HSET", "HDEL", "SREM", "ZADD", "ZREM", "DEL"] {
            assert!(wire.contains(name), "missing {name}");
        }
        assert!(wire.contains("auth:users:u1:assignments"));
        assert!(wire.contains("description"));
    }

    #[test]
    fn test_pipeline_keeps_binary_values() {
        let mut batch = Batch::new();
        batch.hset("auth:rules:r1", "data", vec![0u8, 255, 10, 13]);
        let bytes = build_pipeline(&batch).get_packed_pipeline();
        assert!(bytes.windows(4).any(|w| w == [0u8, 255, 10, 13]));
    }
}
