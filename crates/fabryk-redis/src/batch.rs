//! Atomic write batches.
//!
//! A [`Batch`] records writes in order without touching the engine. Handing
//! it to [`KvStore::exec`](crate::KvStore::exec) applies every operation or
//! none of them; no other client observes a partial application.

/// A single write inside a [`Batch`].
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// Set one or more hash fields.
    HSet {
        /// Hash key
        key: String,
        /// Field/value pairs, applied in order
        fields: Vec<(String, Vec<u8>)>,
    },
    /// Delete hash fields.
    HDel {
        /// Hash key
        key: String,
        /// Fields to delete
        fields: Vec<String>,
    },
    /// Add a member to a set.
    SAdd {
        /// Set key
        key: String,
        /// Member to add
        member: String,
    },
    /// Remove a member from a set.
    SRem {
        /// Set key
        key: String,
        /// Member to remove
        member: String,
    },
    /// Add (or re-score) a sorted-set member.
    ZAdd {
        /// Sorted-set key
        key: String,
        /// Score
        score: f64,
        /// Member
        member: String,
    },
    /// Remove a sorted-set member.
    ZRem {
        /// Sorted-set key
        key: String,
        /// Member to remove
        member: String,
    },
    /// Delete whole keys regardless of their structure.
    Del {
        /// Keys to delete
        keys: Vec<String>,
    },
}

impl Op {
    /// The keys this operation writes.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Op::HSet { key, .. }
            | Op::HDel { key, .. }
            | Op::SAdd { key, .. }
            | Op::SRem { key, .. }
            | Op::ZAdd { key, .. }
            | Op::ZRem { key, .. } => vec![key.as_str()],
            Op::Del { keys } => keys.iter().map(String::as_str).collect(),
        }
    }
}

/// An ordered group of writes submitted as one unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    ops: Vec<Op>,
}

impl Batch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single hash field.
    pub fn hset(
        &mut self,
        key: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.ops.push(Op::HSet {
            key: key.into(),
            fields: vec![(field.into(), value.into())],
        });
        self
    }

    /// Set several hash fields at once. An empty field list is skipped.
    pub fn hset_multiple(
        &mut self,
        key: impl Into<String>,
        fields: Vec<(String, Vec<u8>)>,
    ) -> &mut Self {
        if !fields.is_empty() {
            self.ops.push(Op::HSet {
                key: key.into(),
                fields,
            });
        }
        self
    }

    /// Delete hash fields. An empty field list is skipped.
    pub fn hdel(&mut self, key: impl Into<String>, fields: Vec<String>) -> &mut Self {
        if !fields.is_empty() {
            self.ops.push(Op::HDel {
                key: key.into(),
                fields,
            });
        }
        self
    }

    /// Add a set member.
    pub fn sadd(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.ops.push(Op::SAdd {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    /// Remove a set member.
    pub fn srem(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.ops.push(Op::SRem {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    /// Add a scored sorted-set member.
    pub fn zadd(
        &mut self,
        key: impl Into<String>,
        score: f64,
        member: impl Into<String>,
    ) -> &mut Self {
        self.ops.push(Op::ZAdd {
            key: key.into(),
            score,
            member: member.into(),
        });
        self
    }

    /// Remove a sorted-set member.
    pub fn zrem(&mut self, key: impl Into<String>, member: impl Into<String>) -> &mut Self {
        self.ops.push(Op::ZRem {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    /// Delete one key.
    pub fn del(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(Op::Del {
            keys: vec![key.into()],
        });
        self
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch records nothing.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The recorded operations, in submission order.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Consume the batch, yielding its operations.
    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }
}
