//! Orphan reaper for abandoned pending uploads.
//!
//! Pending files older than the pending TTL either completed late (the
//! object materialized after the client gave up on calling complete) or were
//! abandoned. The sweep verifies each against the object store and completes
//! or hard-deletes accordingly. Sweeps serialize cluster-wide on the
//! `reap:pending` lock so only one replica reaps at a time.

use chrono::Utc;
use tracing::{debug, info, warn};

use sealdrive_core::{ServiceError, ServiceResult};
use sealdrive_store::ObjectStore;

use crate::provider::SealDrive;

/// Outcome of one reaper sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapStats {
    /// Pending files whose objects materialized late and were activated.
    pub completed: usize,
    /// Abandoned pending files that were hard-deleted.
    pub deleted: usize,
}

impl SealDrive {
    /// Run one reaper sweep.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::LockUnavailable`] when another replica holds
    /// the reap lock; the caller should simply retry next interval.
    pub async fn reap_pending_once(&self) -> ServiceResult<ReapStats> {
        let guard = self.locks.acquire("reap:pending").await?;

        let cutoff = Utc::now() - self.config.pending_ttl();
        let candidates = self.files.find_pending_before(cutoff);
        let mut stats = ReapStats::default();

        for file in candidates {
            match self.verify_and_activate(&file.id).await {
                Ok(_) => {
                    debug!(file = %file.id, "pending upload materialized late; activated");
                    stats.completed += 1;
                }
                Err(
                    ServiceError::ObjectMissing { .. } | ServiceError::ObjectSizeMismatch { .. },
                ) => {
                    if let Err(e) = self.reap_one(&file).await {
                        warn!(file = %file.id, error = %e, "failed to reap pending file");
                    } else {
                        stats.deleted += 1;
                    }
                }
                Err(ServiceError::Conflict { .. } | ServiceError::InvalidStateTransition { .. }) => {
                    // A client completed or deleted it while we scanned.
                }
                Err(e) => {
                    warn!(file = %file.id, error = %e, "reaper verification failed");
                }
            }
        }

        guard.release().await;
        if stats != ReapStats::default() {
            info!(
                completed = stats.completed,
                deleted = stats.deleted,
                "reaped pending uploads"
            );
        }
        Ok(stats)
    }

    /// Hard-delete one abandoned pending file: objects first, then the
    /// document.
    async fn reap_one(&self, file: &sealdrive_model::File) -> ServiceResult<()> {
        self.objects.delete(&file.encrypted_file_object_key).await?;
        if let Some(thumb_key) = &file.encrypted_thumbnail_object_key {
            self.objects.delete(thumb_key).await?;
        }
        let _ = self.files.remove(&file.id);
        Ok(())
    }
}
