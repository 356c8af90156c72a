//! Named advisory locks shared across replicas.
//!
//! Operations that span multiple documents (moves, hierarchy shares, upload
//! completion, reaping) serialize on a named lock keyed per resource, e.g.
//! `move:{rootId}` or `complete:{fileId}`. Lock state lives in a
//! cluster-visible key-value store behind the [`KeyValueStore`] seam; the
//! in-process [`MemoryKeyValueStore`] backs single-node deployments and
//! tests.
//!
//! A lock is held under a lease. A holder that crashes releases on lease
//! expiry; holders that outlive the lease must [`LockGuard::extend`] or fail
//! fast. Each acquisition carries a unique holder token so an expired holder
//! cannot release a successor's lock.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// Cluster-visible compare-and-set key-value store backing the lock service.
///
/// Implementations must make each operation atomic with respect to the key.
#[async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Set `key` to `token` with the given TTL iff the key is absent or its
    /// previous lease has expired. Returns `true` if the key was set.
    async fn put_if_absent(&self, key: &str, token: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// Refresh the TTL of `key` iff its current value is `token`.
    /// Returns `true` if refreshed.
    async fn refresh_if_equals(&self, key: &str, token: &str, ttl: Duration)
    -> anyhow::Result<bool>;

    /// Delete `key` iff its current value is `token`. Returns `true` if the
    /// key was deleted.
    async fn delete_if_equals(&self, key: &str, token: &str) -> anyhow::Result<bool>;
}

/// In-process [`KeyValueStore`] for single-node deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    /// Lock entries: key -> (holder token, lease expiry).
    entries: DashMap<String, (String, DateTime<Utc>)>,
}

impl MemoryKeyValueStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn put_if_absent(&self, key: &str, token: &str, ttl: Duration) -> anyhow::Result<bool> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        let mut acquired = false;
        self.entries
            .entry(key.to_owned())
            .and_modify(|entry| {
                if entry.1 <= now {
                    // Previous lease expired; take over.
                    *entry = (token.to_owned(), expires_at);
                    acquired = true;
                }
            })
            .or_insert_with(|| {
                acquired = true;
                (token.to_owned(), expires_at)
            });

        Ok(acquired)
    }

    async fn refresh_if_equals(
        &self,
        key: &str,
        token: &str,
        ttl: Duration,
    ) -> anyhow::Result<bool> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        let mut refreshed = false;
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.0 == token && entry.1 > now {
                entry.1 = expires_at;
                refreshed = true;
            }
        }
        Ok(refreshed)
    }

    async fn delete_if_equals(&self, key: &str, token: &str) -> anyhow::Result<bool> {
        Ok(self
            .entries
            .remove_if(key, |_, (held, _)| held == token)
            .is_some())
    }
}

// ---------------------------------------------------------------------------
// LockService
// ---------------------------------------------------------------------------

/// Named advisory lock service with leases and bounded retry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use sealdrive_core::{LockService, MemoryKeyValueStore};
///
/// # tokio_test::block_on(async {
/// let locks = LockService::new(
///     Arc::new(MemoryKeyValueStore::new()),
///     Duration::from_secs(60),
///     Duration::from_millis(10),
///     3,
/// );
/// let guard = locks.acquire("move:abc").await.unwrap();
/// guard.release().await;
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct LockService {
    kv: Arc<dyn KeyValueStore>,
    lease: Duration,
    retry_backoff: Duration,
    retry_max: u32,
}

impl LockService {
    /// Create a lock service over the given key-value store.
    #[must_use]
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        lease: Duration,
        retry_backoff: Duration,
        retry_max: u32,
    ) -> Self {
        Self {
            kv,
            lease,
            retry_backoff,
            retry_max,
        }
    }

    /// Create a lock service configured from the service configuration.
    #[must_use]
    pub fn from_config(kv: Arc<dyn KeyValueStore>, config: &ServiceConfig) -> Self {
        Self::new(
            kv,
            config.lock_lease(),
            config.lock_retry_backoff(),
            config.lock_retry_max,
        )
    }

    /// Acquire the named lock, retrying with linear backoff.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::LockUnavailable`] when the key stays contended for
    ///   the full retry budget.
    /// - [`ServiceError::StoreUnavailable`] when the key-value store fails.
    pub async fn acquire(&self, key: &str) -> ServiceResult<LockGuard> {
        let token = uuid::Uuid::new_v4().to_string();

        for attempt in 1..=self.retry_max {
            let acquired = self
                .kv
                .put_if_absent(key, &token, self.lease)
                .await
                .map_err(|e| ServiceError::StoreUnavailable {
                    message: format!("lock store: {e}"),
                })?;

            if acquired {
                debug!(key, attempt, "acquired lock");
                return Ok(LockGuard {
                    kv: Arc::clone(&self.kv),
                    lease: self.lease,
                    key: key.to_owned(),
                    token,
                    released: AtomicBool::new(false),
                });
            }

            if attempt < self.retry_max {
                tokio::time::sleep(self.retry_backoff).await;
            }
        }

        warn!(key, attempts = self.retry_max, "lock stayed contended");
        Err(ServiceError::LockUnavailable {
            key: key.to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// LockGuard
// ---------------------------------------------------------------------------

/// A held named lock.
///
/// Prefer explicit [`release`](Self::release). Dropping the guard without
/// releasing schedules a best-effort release when a tokio runtime is
/// available; the lease expiry bounds the hold time either way.
#[derive(Debug)]
pub struct LockGuard {
    kv: Arc<dyn KeyValueStore>,
    lease: Duration,
    key: String,
    token: String,
    released: AtomicBool,
}

impl LockGuard {
    /// The lock key this guard holds.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Extend the lease by its original duration.
    ///
    /// Returns `false` if the lease already expired and another holder took
    /// the key; the caller must then fail fast.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::StoreUnavailable`] when the key-value store
    /// fails.
    pub async fn extend(&self) -> ServiceResult<bool> {
        self.kv
            .refresh_if_equals(&self.key, &self.token, self.lease)
            .await
            .map_err(|e| ServiceError::StoreUnavailable {
                message: format!("lock store: {e}"),
            })
    }

    /// Release the lock.
    ///
    /// Releasing after lease expiry is a no-op: the key either vanished or is
    /// held by a successor whose token no longer matches.
    pub async fn release(self) {
        self.released.store(true, Ordering::SeqCst);
        if let Err(e) = self.kv.delete_if_equals(&self.key, &self.token).await {
            warn!(key = %self.key, error = %e, "failed to release lock");
        } else {
            debug!(key = %self.key, "released lock");
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        // Best-effort async release; if no runtime is available the lease
        // expiry reclaims the key.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let kv = Arc::clone(&self.kv);
            let key = std::mem::take(&mut self.key);
            let token = std::mem::take(&mut self.token);
            handle.spawn(async move {
                if let Err(e) = kv.delete_if_equals(&key, &token).await {
                    warn!(key = %key, error = %e, "failed to release dropped lock");
                }
            });
        }
    }
}
