//! Service configuration.
//!
//! All configuration is driven by environment variables with defaults that
//! work for local development. Durations are stored as plain integers (secs
//! or millis) and exposed as typed durations through accessor methods.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Configuration for the SealDrive service.
///
/// # Examples
///
/// ```
/// use sealdrive_core::ServiceConfig;
///
/// let config = ServiceConfig::default();
/// assert_eq!(config.listen, "0.0.0.0:8080");
/// assert_eq!(config.sync_page_limit_default, 1000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Bind address for the HTTP server.
    #[builder(default = String::from("0.0.0.0:8080"))]
    pub listen: String,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// HMAC secret for bearer-token verification.
    #[builder(default = String::from("dev-secret"))]
    pub auth_secret: String,

    /// HMAC secret for presigned upload/download URLs.
    #[builder(default = String::from("dev-presign-secret"))]
    pub presign_secret: String,

    /// Base URL presigned object URLs are issued against.
    #[builder(default = String::from("http://localhost:8080/objects"))]
    pub object_store_base_url: String,

    /// Object-store bucket holding the ciphertext objects.
    #[builder(default = String::from("sealdrive"))]
    pub bucket: String,

    /// Metadata-store URI (`memory://` selects the in-process store).
    #[builder(default = String::from("memory://"))]
    pub meta_store_uri: String,

    /// Lock-service URI (`memory://` selects the in-process store).
    #[builder(default = String::from("memory://"))]
    pub lock_service_uri: String,

    /// How long a pending file may wait for its upload before the reaper
    /// considers it abandoned.
    #[builder(default = 86_400)]
    pub pending_ttl_secs: u64,

    /// Validity window for presigned upload URLs.
    #[builder(default = 900)]
    pub presigned_upload_ttl_secs: u64,

    /// Validity window for presigned download URLs.
    #[builder(default = 900)]
    pub presigned_download_ttl_secs: u64,

    /// Sync page size when the caller does not specify a limit.
    #[builder(default = 1000)]
    pub sync_page_limit_default: usize,

    /// Hard cap on the sync page size.
    #[builder(default = 5000)]
    pub sync_page_limit_max: usize,

    /// Lease duration for named locks.
    #[builder(default = 60)]
    pub lock_lease_secs: u64,

    /// Backoff between lock acquisition attempts.
    #[builder(default = 250)]
    pub lock_retry_backoff_ms: u64,

    /// Maximum number of lock acquisition attempts.
    #[builder(default = 20)]
    pub lock_retry_max: u32,

    /// Interval between orphan-reaper sweeps.
    #[builder(default = 3600)]
    pub reap_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `SEALDRIVE_LISTEN` | `0.0.0.0:8080` |
    /// | `LOG_LEVEL` | `info` |
    /// | `SEALDRIVE_AUTH_SECRET` | `dev-secret` |
    /// | `SEALDRIVE_PRESIGN_SECRET` | `dev-presign-secret` |
    /// | `SEALDRIVE_OBJECT_BASE_URL` | `http://localhost:8080/objects` |
    /// | `SEALDRIVE_BUCKET` | `sealdrive` |
    /// | `SEALDRIVE_META_URI` | `memory://` |
    /// | `SEALDRIVE_LOCK_URI` | `memory://` |
    /// | `SEALDRIVE_PENDING_TTL_SECS` | `86400` |
    /// | `SEALDRIVE_UPLOAD_TTL_SECS` | `900` |
    /// | `SEALDRIVE_DOWNLOAD_TTL_SECS` | `900` |
    /// | `SEALDRIVE_SYNC_LIMIT_DEFAULT` | `1000` |
    /// | `SEALDRIVE_SYNC_LIMIT_MAX` | `5000` |
    /// | `SEALDRIVE_LOCK_LEASE_SECS` | `60` |
    /// | `SEALDRIVE_LOCK_BACKOFF_MS` | `250` |
    /// | `SEALDRIVE_LOCK_RETRY_MAX` | `20` |
    /// | `SEALDRIVE_REAP_INTERVAL_SECS` | `3600` |
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("SEALDRIVE_LISTEN") {
            config.listen = v;
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("SEALDRIVE_AUTH_SECRET") {
            config.auth_secret = v;
        }
        if let Ok(v) = std::env::var("SEALDRIVE_PRESIGN_SECRET") {
            config.presign_secret = v;
        }
        if let Ok(v) = std::env::var("SEALDRIVE_OBJECT_BASE_URL") {
            config.object_store_base_url = v;
        }
        if let Ok(v) = std::env::var("SEALDRIVE_BUCKET") {
            config.bucket = v;
        }
        if let Ok(v) = std::env::var("SEALDRIVE_META_URI") {
            config.meta_store_uri = v;
        }
        if let Ok(v) = std::env::var("SEALDRIVE_LOCK_URI") {
            config.lock_service_uri = v;
        }
        parse_env_u64("SEALDRIVE_PENDING_TTL_SECS", &mut config.pending_ttl_secs);
        parse_env_u64(
            "SEALDRIVE_UPLOAD_TTL_SECS",
            &mut config.presigned_upload_ttl_secs,
        );
        parse_env_u64(
            "SEALDRIVE_DOWNLOAD_TTL_SECS",
            &mut config.presigned_download_ttl_secs,
        );
        parse_env_usize(
            "SEALDRIVE_SYNC_LIMIT_DEFAULT",
            &mut config.sync_page_limit_default,
        );
        parse_env_usize("SEALDRIVE_SYNC_LIMIT_MAX", &mut config.sync_page_limit_max);
        parse_env_u64("SEALDRIVE_LOCK_LEASE_SECS", &mut config.lock_lease_secs);
        parse_env_u64(
            "SEALDRIVE_LOCK_BACKOFF_MS",
            &mut config.lock_retry_backoff_ms,
        );
        if let Ok(v) = std::env::var("SEALDRIVE_LOCK_RETRY_MAX") {
            if let Ok(n) = v.parse::<u32>() {
                config.lock_retry_max = n;
            }
        }
        parse_env_u64("SEALDRIVE_REAP_INTERVAL_SECS", &mut config.reap_interval_secs);

        config
    }

    /// Pending-upload TTL as a [`chrono::Duration`].
    #[must_use]
    pub fn pending_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.pending_ttl_secs).unwrap_or(i64::MAX))
    }

    /// Presigned upload URL validity window.
    #[must_use]
    pub fn presigned_upload_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.presigned_upload_ttl_secs).unwrap_or(i64::MAX))
    }

    /// Presigned download URL validity window.
    #[must_use]
    pub fn presigned_download_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(
            i64::try_from(self.presigned_download_ttl_secs).unwrap_or(i64::MAX),
        )
    }

    /// Lock lease duration.
    #[must_use]
    pub fn lock_lease(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.lock_lease_secs)
    }

    /// Backoff between lock acquisition attempts.
    #[must_use]
    pub fn lock_retry_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_retry_backoff_ms)
    }

    /// Interval between reaper sweeps.
    #[must_use]
    pub fn reap_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reap_interval_secs)
    }
}

/// Overwrite `target` with the parsed value of `var` when set and valid.
fn parse_env_u64(var: &str, target: &mut u64) {
    if let Ok(v) = std::env::var(var) {
        if let Ok(n) = v.parse::<u64>() {
            *target = n;
        }
    }
}

/// Overwrite `target` with the parsed value of `var` when set and valid.
fn parse_env_usize(var: &str, target: &mut usize) {
    if let Ok(v) = std::env::var(var) {
        if let Ok(n) = v.parse::<usize>() {
            *target = n;
        }
    }
}
