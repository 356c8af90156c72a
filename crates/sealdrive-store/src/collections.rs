//! In-memory document store for collections.
//!
//! Documents are keyed by id in a [`DashMap`]; mutations to a single document
//! go through [`CollectionStore::update`], which runs the caller's closure
//! under the map entry and so is atomic per document. Bulk cascades go
//! through [`CollectionStore::update_many`] in a single pass.
//!
//! Query methods mirror the secondary indexes a document database would
//! carry: `{owner_id, created_at}`, `{parent_id}`, `{ancestor_ids}` multikey,
//! `{members.recipient_id}`, and `{state, modified_at, id}` for sync scans.
//! All read paths are state-aware; [`CollectionStore::VISIBLE`] is the
//! default visibility.

use std::cmp::Ordering;

use dashmap::DashMap;
use tracing::trace;

use sealdrive_core::{EntityId, ServiceError, ServiceResult, UserId};
use sealdrive_model::{Collection, CollectionState, SyncCursor};

/// Rank used for the default listing order: active before archived before
/// deleted.
fn state_rank(state: CollectionState) -> u8 {
    match state {
        CollectionState::Active => 0,
        CollectionState::Archived => 1,
        CollectionState::Deleted => 2,
    }
}

/// Default listing order: `(state asc, created_at desc, id asc)`.
fn listing_order(a: &Collection, b: &Collection) -> Ordering {
    state_rank(a.state)
        .cmp(&state_rank(b.state))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// In-memory collection document store.
#[derive(Debug, Default)]
pub struct CollectionStore {
    docs: DashMap<EntityId, Collection>,
}

impl CollectionStore {
    /// Default visibility for read paths: everything but `deleted`.
    pub const VISIBLE: &[CollectionState] = &[CollectionState::Active, CollectionState::Archived];

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
    pub fn insert(&self, collection: Collection) -> ServiceResult<()> {
        let id = collection.id;
        if self.docs.contains_key(&id) {
            return Err(ServiceError::Conflict {
                message: format!("collection {id} already exists"),
            });
        }
        trace!(collection = %id, "inserted collection document");
        self.docs.insert(id, collection);
        Ok(())
    }

    /// Fetch a document by id, filtered by allowed states.
    #[must_use]
    pub fn get(&self, id: &EntityId, allow: &[CollectionState]) -> Option<Collection> {
        self.docs
            .get(id)
            .filter(|doc| allow.contains(&doc.state))
            .map(|doc| doc.clone())
    }

    /// Fetch a document by id regardless of state.
    #[must_use]
    pub fn get_any_state(&self, id: &EntityId) -> Option<Collection> {
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
        mutate: impl FnOnce(&mut Collection),
    ) -> ServiceResult<Collection> {
        let mut entry = self.docs.get_mut(id).ok_or_else(|| ServiceError::NotFound {
            entity: "collection".to_owned(),
            id: id.to_string(),
        })?;
        mutate(entry.value_mut());
        Ok(entry.clone())
    }

    /// Apply `mutate` to every document matching `filter` in one pass.
    /// Returns the number of documents touched.
    pub fn update_many(
        &self,
        filter: impl Fn(&Collection) -> bool,
        mutate: impl Fn(&mut Collection),
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
    pub fn remove(&self, id: &EntityId) -> Option<Collection> {
        self.docs.remove(id).map(|(_, doc)| doc)
    }

    /// Root collections owned by `owner`, in listing order.
    #[must_use]
    pub fn find_roots(&self, owner: &UserId, allow: &[CollectionState]) -> Vec<Collection> {
        self.filtered(|doc| doc.owner_id == *owner && doc.is_root(), allow)
    }

    /// Direct children of `parent`, in listing order.
    #[must_use]
    pub fn find_by_parent(
        &self,
        parent: &EntityId,
        allow: &[CollectionState],
    ) -> Vec<Collection> {
        self.filtered(|doc| doc.parent_id == Some(*parent), allow)
    }

    /// Every collection whose ancestor chain contains `ancestor` (the whole
    /// subtree below it), in listing order.
    #[must_use]
    pub fn find_descendants(
        &self,
        ancestor: &EntityId,
        allow: &[CollectionState],
    ) -> Vec<Collection> {
        self.filtered(|doc| doc.ancestor_ids.contains(ancestor), allow)
    }

    /// Collections where `recipient` appears in `members`, in listing order.
    #[must_use]
    pub fn find_shared_with(
        &self,
        recipient: &UserId,
        allow: &[CollectionState],
    ) -> Vec<Collection> {
        self.filtered(|doc| doc.membership_for(recipient).is_some(), allow)
    }

    /// Scan the sync candidate set for `user` (owner or member, any state),
    /// returning up to `limit` documents strictly after `cursor` in
    /// `(modified_at, id)` order, plus whether more remain.
    #[must_use]
    pub fn sync_scan(
        &self,
        user: &UserId,
        cursor: Option<&SyncCursor>,
        limit: usize,
    ) -> (Vec<Collection>, bool) {
        let mut candidates: Vec<Collection> = self
            .docs
            .iter()
            .filter(|doc| doc.owner_id == *user || doc.membership_for(user).is_some())
            .filter(|doc| match cursor {
                Some(c) => c.precedes(doc.modified_at, doc.id),
                None => true,
            })
            .map(|doc| doc.clone())
            .collect();

        candidates.sort_by(|a, b| {
            (a.modified_at, a.id).cmp(&(b.modified_at, b.id))
        });

        let has_more = candidates.len() > limit;
        candidates.truncate(limit);
        (candidates, has_more)
    }

    /// Ids of every collection `user` can see (owner or member, any state).
    /// Backs the file sync candidate set.
    #[must_use]
    pub fn accessible_ids(&self, user: &UserId) -> Vec<EntityId> {
        self.docs
            .iter()
            .filter(|doc| doc.owner_id == *user || doc.membership_for(user).is_some())
            .map(|doc| doc.id)
            .collect()
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

    /// Collect matching documents in listing order.
    fn filtered(
        &self,
        predicate: impl Fn(&Collection) -> bool,
        allow: &[CollectionState],
    ) -> Vec<Collection> {
        let mut result: Vec<Collection> = self
            .docs
            .iter()
            .filter(|doc| allow.contains(&doc.state) && predicate(doc.value()))
            .map(|doc| doc.clone())
            .collect();
        result.sort_by(listing_order);
        result
    }
}
