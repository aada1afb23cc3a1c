//! Idle client pools
//!
//! Clients are bucketed by [`PoolKey`]; any two targets that share a key can
//! use each other's clients.

use super::lock;
use std::fmt;
use std::sync::Mutex;

/// Region, destination type and optional endpoint, rendered
/// `region|type[|endpoint]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey(String);

impl PoolKey {
    pub fn new(region: &str, destination_type: &str, endpoint: Option<&str>) -> Self {
        match endpoint {
            Some(endpoint) => Self(format!("{}|{}|{}", region, destination_type, endpoint)),
            None => Self(format!("{}|{}", region, destination_type)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Idle clients for one key. LIFO, so the most recently used client is
/// handed out first.
#[derive(Debug)]
pub struct ClientPool<C> {
    key: PoolKey,
    idle: Mutex<Vec<C>>,
}

impl<C> ClientPool<C> {
    pub fn new(key: PoolKey) -> Self {
        Self {
            key,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    /// Take an idle client, if any
    pub fn checkout(&self) -> Option<C> {
        lock(&self.idle).pop()
    }

    /// Put a client back
    pub fn release(&self, client: C) {
        lock(&self.idle).push(client);
    }

    pub fn idle_count(&self) -> usize {
        lock(&self.idle).len()
    }

    pub fn is_empty(&self) -> bool {
        self.idle_count() == 0
    }
}
