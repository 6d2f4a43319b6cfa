//! Shared cache of query results.
//!
//! Every fetch goes through a [`QueryKey`]. A result younger than the stale
//! time is served from memory; otherwise the fetcher runs, with retries for
//! transient failures, and a success replaces the entry. Mutations write or
//! invalidate entries directly.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::AppError;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Identifies one cached query: the entity plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    CurrentUser,
    Users,
    Tasks,
    Task(String),
    Notifications(String),
}

/// Groups of keys that are invalidated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryScope {
    CurrentUser,
    Users,
    /// The task list and every single-task entry.
    Tasks,
    Notifications,
}

impl QueryKey {
    pub fn scope(&self) -> QueryScope {
        match self {
            QueryKey::CurrentUser => QueryScope::CurrentUser,
            QueryKey::Users => QueryScope::Users,
            QueryKey::Tasks | QueryKey::Task(_) => QueryScope::Tasks,
            QueryKey::Notifications(_) => QueryScope::Notifications,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueryKey::CurrentUser => f.write_str("user"),
            QueryKey::Users => f.write_str("users"),
            QueryKey::Tasks => f.write_str("tasks"),
            QueryKey::Task(id) => write!(f, "task/{}", id),
            QueryKey::Notifications(email) => write!(f, "notifications/{}", email),
        }
    }
}

/// Per-query fetch behaviour.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Extra attempts after the first failure. Zero disables retrying.
    pub retry: u32,
    pub stale_time: Duration,
}

impl QueryOptions {
    pub fn new(retry: u32, stale_time: Duration) -> Self {
        Self { retry, stale_time }
    }

    pub fn without_retry(self) -> Self {
        Self { retry: 0, ..self }
    }
}

/// Backoff before retry number `attempt` (0-based): 1s, 2s, 4s, ... capped at 30s.
pub fn retry_delay(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    Duration::from_secs(1)
        .saturating_mul(factor)
        .min(MAX_RETRY_DELAY)
}

struct CacheEntry {
    value: serde_json::Value,
    updated_at: Instant,
}

#[derive(Default)]
pub struct QueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value if it is younger than `stale_time`, otherwise
    /// runs `fetcher` and stores its result.
    ///
    /// Retryable errors (see [`AppError::is_retryable`]) are retried up to
    /// `options.retry` times with exponential backoff. The last error is returned
    /// and the existing entry, if any, is left in place.
    pub async fn fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if let Some(value) = self.fresh(&key, options.stale_time) {
            debug!("Cache hit for {}", key);
            return Ok(value);
        }
        debug!("Cache miss for {}, fetching", key);

        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => {
                    self.set(key, &value)?;
                    return Ok(value);
                }
                Err(e) if attempt < options.retry && e.is_retryable() => {
                    let delay = retry_delay(attempt);
                    warn!(
                        "Fetching {} failed ({}), retry {}/{} in {:?}",
                        key,
                        e,
                        attempt + 1,
                        options.retry,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// The cached value regardless of age.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.read();
        let entry = entries.get(key)?;
        decode(key, &entry.value)
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn set<T: Serialize>(&self, key: QueryKey, value: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(value)?;
        self.write().insert(
            key,
            CacheEntry {
                value,
                updated_at: Instant::now(),
            },
        );
        Ok(())
    }

    pub fn invalidate(&self, key: &QueryKey) {
        if self.write().remove(key).is_some() {
            debug!("Invalidated {}", key);
        }
    }

    pub fn invalidate_scope(&self, scope: QueryScope) {
        self.write().retain(|key, _| key.scope() != scope);
        debug!("Invalidated all {:?} queries", scope);
    }

    pub fn clear(&self) {
        self.write().clear();
        debug!("Query cache cleared");
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn fresh<T: DeserializeOwned>(&self, key: &QueryKey, stale_time: Duration) -> Option<T> {
        let entries = self.read();
        let entry = entries.get(key)?;
        if entry.updated_at.elapsed() >= stale_time {
            return None;
        }
        decode(key, &entry.value)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<QueryKey, CacheEntry>> {
        match self.entries.read() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, CacheEntry>> {
        match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn decode<T: DeserializeOwned>(key: &QueryKey, value: &serde_json::Value) -> Option<T> {
    match serde_json::from_value(value.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Cached value for {} has an unexpected shape: {}", key, e);
            None
        }
    }
}
