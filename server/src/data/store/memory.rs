//! In-process key-value store using dashmap
//!
//! Expiry is lazy: an expired key is dropped when it is next touched, and a
//! full sweep runs every few hundred writes so untouched keys do not pile up.
//! Time comes from `tokio::time` so tests can pause and advance the clock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use tokio::time::Instant;

use super::backend::KvStore;
use super::error::StoreError;

/// Writes between full sweeps of expired keys
const SWEEP_INTERVAL_OPS: u64 = 256;

enum Value {
    Bytes(Vec<u8>),
    Set(HashSet<String>),
    SortedSet(HashMap<String, i64>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "string",
            Value::Set(_) => "set",
            Value::SortedSet(_) => "zset",
        }
    }
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Zero-second TTLs are raised to one second, as the Redis backend does
fn ttl(ttl_secs: u64) -> Duration {
    Duration::from_secs(ttl_secs.max(1))
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> StoreError {
    StoreError::Operation(format!(
        "key '{key}' holds a {} value, expected {expected}",
        found.type_name()
    ))
}

/// In-memory store for local development and tests
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
    write_ops: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            write_ops: AtomicU64::new(0),
        }
    }

    /// Drop `key` if it has expired
    fn purge_if_expired(&self, key: &str, now: Instant) {
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    fn note_write(&self) {
        let ops = self.write_ops.fetch_add(1, Ordering::Relaxed);
        if ops % SWEEP_INTERVAL_OPS == 0 {
            let now = Instant::now();
            self.entries.retain(|_, entry| !entry.is_expired(now));
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.purge_if_expired(key, Instant::now());
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Bytes(bytes) => Ok(Some(bytes.clone())),
                other => Err(wrong_type(key, "string", other)),
            },
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl_secs: u64) -> Result<(), StoreError> {
        let expires_at = Instant::now() + ttl(ttl_secs);
        self.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Bytes(value),
                expires_at: Some(expires_at),
            },
        );
        self.note_write();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.purge_if_expired(key, Instant::now());
        Ok(self.entries.remove(key).is_some())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.purge_if_expired(key, Instant::now());
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::Set(members) => {
                    members.insert(member.to_string());
                }
                other => return Err(wrong_type(key, "set", other)),
            },
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::Set(HashSet::from([member.to_string()])),
                    expires_at: None,
                });
            }
        }
        self.note_write();
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let now = Instant::now();
        self.purge_if_expired(key, now);
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.expires_at = Some(now + ttl(ttl_secs));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn extend_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool, StoreError> {
        let now = Instant::now();
        self.purge_if_expired(key, now);
        let candidate = now + ttl(ttl_secs);
        match self.entries.get_mut(key) {
            Some(mut entry) => match entry.expires_at {
                Some(current) if current >= candidate => Ok(false),
                _ => {
                    entry.expires_at = Some(candidate);
                    Ok(true)
                }
            },
            None => Ok(false),
        }
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        self.purge_if_expired(key, Instant::now());
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Set(members) => Ok(members.iter().cloned().collect()),
                other => Err(wrong_type(key, "set", other)),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn srem(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        self.purge_if_expired(key, Instant::now());
        let (removed, now_empty) = match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::Set(members) => {
                    let removed = members.remove(member);
                    (removed, members.is_empty())
                }
                other => return Err(wrong_type(key, "set", other)),
            },
            None => return Ok(false),
        };
        if now_empty {
            self.entries
                .remove_if(key, |_, entry| matches!(&entry.value, Value::Set(m) if m.is_empty()));
        }
        Ok(removed)
    }

    async fn scard(&self, key: &str) -> Result<u64, StoreError> {
        self.purge_if_expired(key, Instant::now());
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::Set(members) => Ok(members.len() as u64),
                other => Err(wrong_type(key, "set", other)),
            },
            None => Ok(0),
        }
    }

    async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<(), StoreError> {
        self.purge_if_expired(key, Instant::now());
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => match &mut occupied.get_mut().value {
                Value::SortedSet(members) => {
                    members.insert(member.to_string(), score);
                }
                other => return Err(wrong_type(key, "zset", other)),
            },
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value: Value::SortedSet(HashMap::from([(member.to_string(), score)])),
                    expires_at: None,
                });
            }
        }
        self.note_write();
        Ok(())
    }

    async fn zrem_range_by_score(&self, key: &str, min: i64, max: i64) -> Result<u64, StoreError> {
        self.purge_if_expired(key, Instant::now());
        let (removed, now_empty) = match self.entries.get_mut(key) {
            Some(mut entry) => match &mut entry.value {
                Value::SortedSet(members) => {
                    let before = members.len();
                    members.retain(|_, score| *score < min || *score > max);
                    ((before - members.len()) as u64, members.is_empty())
                }
                other => return Err(wrong_type(key, "zset", other)),
            },
            None => return Ok(0),
        };
        if now_empty {
            self.entries.remove_if(key, |_, entry| {
                matches!(&entry.value, Value::SortedSet(m) if m.is_empty())
            });
        }
        Ok(removed)
    }

    async fn zcard(&self, key: &str) -> Result<u64, StoreError> {
        self.purge_if_expired(key, Instant::now());
        match self.entries.get(key) {
            Some(entry) => match &entry.value {
                Value::SortedSet(members) => Ok(members.len() as u64),
                other => Err(wrong_type(key, "zset", other)),
            },
            None => Ok(0),
        }
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
