//! In-memory document store for files.
//!
//! Same shape as the collection store: [`DashMap`] keyed by id, per-document
//! atomic updates through a closure under the entry, one-pass bulk updates,
//! and query methods mirroring the secondary indexes (`{collection_id,
//! created_at}`, `{owner_id, created_at}`, `{state, modified_at, id}`).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::trace;

use sealdrive_core::{EntityId, ServiceError, ServiceResult, UserId};
use sealdrive_model::{File, FileState, SyncCursor};

/// In-memory file document store.
#[derive(Debug, Default)]
pub struct FileStore {
    docs: DashMap<EntityId, File>,
}

impl FileStore {
    /// Default visibility for listings: neither `deleted` nor `pending`.
    pub const VISIBLE: &[FileState] = &[FileState::Active, FileState::Archived];

    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new document.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] if the id is already present.
    pub fn insert(&self, file: File) -> ServiceResult<()> {
        let id = file.id;
        if self.docs.contains_key(&id) {
            return Err(ServiceError::Conflict {
                message: format!("file {id} already exists"),
            });
        }
        trace!(file = %id, "inserted file document");
        self.docs.insert(id, file);
        Ok(())
    }

    /// Fetch a document by id, filtered by allowed states.
    #[must_use]
    pub fn get(&self, id: &EntityId, allow: &[FileState]) -> Option<File> {
        self.docs
            .get(id)
            .filter(|doc| allow.contains(&doc.state))
            .map(|doc| doc.clone())
    }

    /// Fetch a document by id regardless of state.
    #[must_use]
    pub fn get_any_state(&self, id: &EntityId) -> Option<File> {
        self.docs.get(id).map(|doc| doc.clone())
    }

    /// Apply `mutate` to the document under the map entry and return the
    /// mutated copy. Atomic per document.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if the id is absent.
    pub fn update(
        &self,
        id: &EntityId,
        mutate: impl FnOnce(&mut File),
    ) -> ServiceResult<File> {
        let mut entry = self.docs.get_mut(id).ok_or_else(|| ServiceError::NotFound {
            entity: "file".to_owned(),
            id: id.to_string(),
        })?;
        mutate(entry.value_mut());
        Ok(entry.clone())
    }

    /// Apply `mutate` to every document matching `filter` in one pass.
    /// Returns the number of documents touched.
    pub fn update_many(
        &self,
        filter: impl Fn(&File) -> bool,
        mutate: impl Fn(&mut File),
    ) -> usize {
        let mut touched = 0;
        for mut entry in self.docs.iter_mut() {
            if filter(entry.value()) {
                mutate(entry.value_mut());
                touched += 1;
            }
        }
        touched
    }

    /// Physically remove a document.
    #[must_use]
    pub fn remove(&self, id: &EntityId) -> Option<File> {
        self.docs.remove(id).map(|(_, doc)| doc)
    }

    /// Files in `collection`, newest first.
    #[must_use]
    pub fn find_by_collection(
        &self,
        collection: &EntityId,
        allow: &[FileState],
    ) -> Vec<File> {
        self.filtered(|doc| doc.collection_id == *collection, allow)
    }

    /// Files owned by `owner`, newest first.
    #[must_use]
    pub fn find_by_owner(&self, owner: &UserId, allow: &[FileState]) -> Vec<File> {
        self.filtered(|doc| doc.owner_id == *owner, allow)
    }

    /// Pending files created before `cutoff`, the reaper's candidate set.
    #[must_use]
    pub fn find_pending_before(&self, cutoff: DateTime<Utc>) -> Vec<File> {
        self.docs
            .iter()
            .filter(|doc| doc.state == FileState::Pending && doc.created_at < cutoff)
            .map(|doc| doc.clone())
            .collect()
    }

    /// Whether any file document, in any state, points into one of
    /// `collections`.
    #[must_use]
    pub fn any_in_collections(&self, collections: &HashSet<EntityId>) -> bool {
        self.docs
            .iter()
            .any(|doc| collections.contains(&doc.collection_id))
    }

    /// Scan the sync candidate set (files in any of `collections`, any
    /// state), returning up to `limit` documents strictly after `cursor` in
    /// `(modified_at, id)` order, plus whether more remain.
    #[must_use]
    pub fn sync_scan(
        &self,
        collections: &HashSet<EntityId>,
        cursor: Option<&SyncCursor>,
        limit: usize,
    ) -> (Vec<File>, bool) {
        let mut candidates: Vec<File> = self
            .docs
            .iter()
            .filter(|doc| collections.contains(&doc.collection_id))
            .filter(|doc| match cursor {
                Some(c) => c.precedes(doc.modified_at, doc.id),
                None => true,
            })
            .map(|doc| doc.clone())
            .collect();

        candidates.sort_by(|a, b| (a.modified_at, a.id).cmp(&(b.modified_at, b.id)));

        let has_more = candidates.len() > limit;
        candidates.truncate(limit);
        (candidates, has_more)
    }

    /// Number of stored documents, all states included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Whether the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Drop every document.
    pub fn reset(&self) {
        self.docs.clear();
    }

    /// Collect matching documents, newest first with id tie-break.
    fn filtered(&self, predicate: impl Fn(&File) -> bool, allow: &[FileState]) -> Vec<File> {
        let mut result: Vec<File> = self
            .docs
            .iter()
            .filter(|doc| allow.contains(&doc.state) && predicate(doc.value()))
            .map(|doc| doc.clone())
            .collect();
        result.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        result
    }
}
