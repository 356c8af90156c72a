//! Cursor-based incremental sync.
//!
//! Candidate sets: every collection where the user is owner or member (any
//! state, tombstones included), and every file whose collection is in that
//! set. Pages are ordered by `(modified_at asc, id asc)`; an item mutated
//! mid-scan may be observed twice, and clients deduplicate on
//! `(id, version)`.

use tracing::debug;

use sealdrive_core::{ServiceResult, UserId};
use sealdrive_model::{CollectionSyncItem, FileSyncItem, SyncCursor, SyncPage};

use crate::provider::SealDrive;

impl SealDrive {
    /// One page of collection deltas for `user`.
    ///
    /// # Errors
    ///
    /// Returns [`sealdrive_core::ServiceError::BadRequest`] on a malformed
    /// cursor.
    pub fn sync_collections(
        &self,
        user: UserId,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> ServiceResult<SyncPage<CollectionSyncItem>> {
        let limit = self.clamp_limit(limit);
        let cursor = cursor.map(SyncCursor::decode).transpose()?;

        let (docs, has_more) = self.collections.sync_scan(&user, cursor.as_ref(), limit);
        let next_cursor = next_cursor(has_more, docs.last().map(|d| (d.modified_at, d.id)));
        let items = docs
            .into_iter()
            .map(|c| CollectionSyncItem {
                id: c.id,
                version: c.version,
                modified_at: c.modified_at,
                state: c.state,
                parent_id: c.parent_id,
            })
            .collect::<Vec<_>>();

        debug!(user = %user, items = items.len(), has_more, "collection sync page");
        Ok(SyncPage {
            items,
            has_more,
            next_cursor,
        })
    }

    /// One page of file deltas for `user`.
    ///
    /// A client that loses access to a collection keeps seeing its files
    /// until it drops the collection locally; clients intersect file
    /// visibility with current collection visibility.
    ///
    /// # Errors
    ///
    /// Returns [`sealdrive_core::ServiceError::BadRequest`] on a malformed
    /// cursor.
    pub fn sync_files(
        &self,
        user: UserId,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> ServiceResult<SyncPage<FileSyncItem>> {
        let limit = self.clamp_limit(limit);
        let cursor = cursor.map(SyncCursor::decode).transpose()?;

        let accessible = self.collections.accessible_ids(&user).into_iter().collect();
        let (docs, has_more) = self.files.sync_scan(&accessible, cursor.as_ref(), limit);
        let next_cursor = next_cursor(has_more, docs.last().map(|d| (d.modified_at, d.id)));
        let items = docs
            .into_iter()
            .map(|f| FileSyncItem {
                id: f.id,
                collection_id: f.collection_id,
                version: f.version,
                modified_at: f.modified_at,
                state: f.state,
            })
            .collect::<Vec<_>>();

        debug!(user = %user, items = items.len(), has_more, "file sync page");
        Ok(SyncPage {
            items,
            has_more,
            next_cursor,
        })
    }

    /// Resolve the page size: caller's limit, defaulted and capped by
    /// configuration, never zero.
    fn clamp_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(self.config.sync_page_limit_default)
            .min(self.config.sync_page_limit_max)
            .max(1)
    }
}

/// Cursor at the last returned item, present iff more items remain.
fn next_cursor(
    has_more: bool,
    last: Option<(chrono::DateTime<chrono::Utc>, sealdrive_core::EntityId)>,
) -> Option<String> {
    if !has_more {
        return None;
    }
    last.map(|(modified_at, id)| SyncCursor { modified_at, id }.encode())
}
