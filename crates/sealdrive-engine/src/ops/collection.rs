//! Collection graph operations: create, fetch, update, move, state
//! transitions, and tree queries.
//!
//! Moves and subtree cascades serialize on the `move:{root}` lock and are
//! written as idempotent sequences: a retried move detects already-rewritten
//! descendants and completes the remainder.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, warn};

use sealdrive_core::{EntityId, ServiceError, ServiceResult, UserId};
use sealdrive_model::{
    Collection, CollectionNode, CollectionState, CreateCollectionInput, MoveCollectionInput,
    PermissionLevel, UpdateCollectionInput,
};
use sealdrive_store::CollectionStore;

use crate::provider::SealDrive;

/// Every state, for subtree rewrites that must not skip tombstones.
const ALL_STATES: &[CollectionState] = &[
    CollectionState::Active,
    CollectionState::Archived,
    CollectionState::Deleted,
];

impl SealDrive {
    /// Create a collection, as a root or under a writable parent.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::BadRequest`] on missing encrypted fields or a path
    ///   segment count that does not match the ancestor chain.
    /// - [`ServiceError::NotFound`] / [`ServiceError::Forbidden`] when the
    ///   parent is not writable by the caller.
    pub fn create_collection(
        &self,
        user: UserId,
        input: CreateCollectionInput,
    ) -> ServiceResult<Collection> {
        require_field(&input.encrypted_name, "encryptedName")?;
        require_field(&input.encrypted_collection_key, "encryptedCollectionKey")?;

        let ancestor_ids = match input.parent_id {
            Some(parent_id) => {
                let parent = self.load_visible(&parent_id, &user, PermissionLevel::ReadWrite)?;
                let mut ancestors = parent.ancestor_ids;
                ancestors.push(parent.id);
                ancestors
            }
            None => vec![],
        };

        if input.encrypted_path_segments.len() != ancestor_ids.len() + 1 {
            return Err(ServiceError::BadRequest {
                field: "encryptedPathSegments".to_owned(),
                message: format!(
                    "expected {} segments, got {}",
                    ancestor_ids.len() + 1,
                    input.encrypted_path_segments.len()
                ),
            });
        }

        let now = Utc::now();
        let collection = Collection {
            id: EntityId::generate(),
            owner_id: user,
            collection_type: input.collection_type,
            encrypted_name: input.encrypted_name,
            encrypted_collection_key: input.encrypted_collection_key,
            parent_id: input.parent_id,
            ancestor_ids,
            encrypted_path_segments: input.encrypted_path_segments,
            state: CollectionState::Active,
            version: 1,
            created_at: now,
            modified_at: now,
            members: vec![],
        };

        self.collections.insert(collection.clone())?;
        debug!(collection = %collection.id, owner = %user, "created collection");
        Ok(collection)
    }

    /// Fetch a collection the caller can read. Deleted collections are
    /// indistinguishable from absent ones.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when absent, deleted, or not
    /// readable by the caller.
    pub fn get_collection(&self, user: UserId, id: &EntityId) -> ServiceResult<Collection> {
        self.load_visible(id, &user, PermissionLevel::ReadOnly)
    }

    /// Fetch a collection regardless of state. Owner-only recovery path.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when absent or the caller is not
    /// the owner.
    pub fn get_collection_with_any_state(
        &self,
        user: UserId,
        id: &EntityId,
    ) -> ServiceResult<Collection> {
        let collection = self
            .collections
            .get_any_state(id)
            .filter(|c| c.owner_id == user)
            .ok_or_else(|| ServiceError::NotFound {
                entity: "collection".to_owned(),
                id: id.to_string(),
            })?;
        Ok(collection)
    }

    /// Replace a collection's encrypted fields.
    ///
    /// Ownership and placement are not patchable; placement changes go
    /// through [`move_collection`](Self::move_collection).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::BadRequest`] when the patch carries no fields,
    /// [`ServiceError::Gone`] on deleted collections.
    pub fn update_collection(
        &self,
        user: UserId,
        id: &EntityId,
        input: UpdateCollectionInput,
    ) -> ServiceResult<Collection> {
        if input.encrypted_name.is_none() && input.encrypted_collection_key.is_none() {
            return Err(ServiceError::BadRequest {
                field: "body".to_owned(),
                message: "no fields to update".to_owned(),
            });
        }

        self.load_mutable(id, &user, PermissionLevel::ReadWrite)?;
        let updated = self.collections.update(id, |collection| {
            if let Some(name) = input.encrypted_name {
                collection.encrypted_name = name;
            }
            if let Some(key) = input.encrypted_collection_key {
                collection.encrypted_collection_key = key;
            }
            collection.version += 1;
            collection.modified_at = Utc::now();
        })?;

        debug!(collection = %id, version = updated.version, "updated collection");
        Ok(updated)
    }

    /// Move a collection (and its whole subtree) under a new parent, or to
    /// root.
    ///
    /// The caller needs `admin` on the subject and on the new parent (or must
    /// be the owner when moving to root). Every descendant's ancestor chain
    /// and display path prefix are rewritten under the `move:{root}` lock,
    /// shallowest first.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::MoveUnderDescendant`] when the destination is the
    ///   subject or inside its subtree; no document is mutated.
    /// - [`ServiceError::Conflict`] when the destination belongs to another
    ///   owner.
    /// - [`ServiceError::BadRequest`] when the re-encrypted path prefix does
    ///   not match the new ancestor chain.
    /// - [`ServiceError::LockUnavailable`] when the subtree lock stays
    ///   contended.
    pub async fn move_collection(
        &self,
        user: UserId,
        id: &EntityId,
        input: MoveCollectionInput,
    ) -> ServiceResult<Collection> {
        let subject = self.load_mutable(id, &user, PermissionLevel::Admin)?;

        if subject.parent_id == input.new_parent_id {
            return Ok(subject);
        }

        let new_ancestors = match input.new_parent_id {
            Some(parent_id) => {
                if parent_id == *id {
                    return Err(ServiceError::MoveUnderDescendant { id: id.to_string() });
                }
                let parent = self.load_visible(&parent_id, &user, PermissionLevel::Admin)?;
                if parent.ancestor_ids.contains(id) {
                    return Err(ServiceError::MoveUnderDescendant { id: id.to_string() });
                }
                if parent.owner_id != subject.owner_id {
                    return Err(ServiceError::Conflict {
                        message: "cannot move a collection under another owner's collection"
                            .to_owned(),
                    });
                }
                let mut ancestors = parent.ancestor_ids;
                ancestors.push(parent.id);
                ancestors
            }
            None => {
                if subject.owner_id != user {
                    return Err(ServiceError::Forbidden {
                        required: "owner".to_owned(),
                    });
                }
                vec![]
            }
        };

        if input.encrypted_path_prefix.len() != new_ancestors.len() {
            return Err(ServiceError::BadRequest {
                field: "encryptedPathPrefix".to_owned(),
                message: format!(
                    "expected {} segments, got {}",
                    new_ancestors.len(),
                    input.encrypted_path_prefix.len()
                ),
            });
        }

        let root = subtree_root(&subject);
        let guard = self.locks.acquire(&format!("move:{root}")).await?;

        let old_ancestors = subject.ancestor_ids.clone();
        let old_len = old_ancestors.len();
        let prefix = input.encrypted_path_prefix;

        let moved = self.collections.update(id, |collection| {
            collection.parent_id = input.new_parent_id;
            collection.ancestor_ids = new_ancestors.clone();
            let own_segment = collection
                .encrypted_path_segments
                .last()
                .cloned()
                .unwrap_or_default();
            let mut segments = prefix.clone();
            segments.push(own_segment);
            collection.encrypted_path_segments = segments;
            collection.version += 1;
            collection.modified_at = Utc::now();
        })?;

        // Shallowest first, so intermediate states observed mid-rewrite still
        // form valid chains.
        let mut descendants = self.collections.find_descendants(id, ALL_STATES);
        descendants.sort_by_key(|d| d.ancestor_ids.len());

        for descendant in descendants {
            let rewritten = self.collections.update(&descendant.id, |d| {
                if chain_matches(&d.ancestor_ids, &new_ancestors, id) {
                    // Already rewritten by an earlier, interrupted attempt.
                    return;
                }
                if !chain_matches(&d.ancestor_ids, &old_ancestors, id) {
                    warn!(
                        collection = %d.id,
                        moved = %id,
                        "descendant ancestor chain does not match either prefix; skipping"
                    );
                    return;
                }
                let tail_ids = d.ancestor_ids.split_off(old_len);
                d.ancestor_ids = new_ancestors.clone();
                d.ancestor_ids.extend(tail_ids);

                let tail_segments = d.encrypted_path_segments.split_off(old_len);
                d.encrypted_path_segments = prefix.clone();
                d.encrypted_path_segments.extend(tail_segments);

                d.version += 1;
                d.modified_at = Utc::now();
            });
            if let Err(e) = rewritten {
                warn!(collection = %descendant.id, error = %e, "descendant vanished mid-move");
            }
        }

        guard.release().await;
        debug!(collection = %id, new_parent = ?input.new_parent_id, "moved collection");
        Ok(moved)
    }

    /// Archive a collection. Does not cascade.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidStateTransition`] when the collection
    /// is not `active`.
    pub fn archive_collection(&self, user: UserId, id: &EntityId) -> ServiceResult<Collection> {
        self.transition_collection(user, id, CollectionState::Archived)
    }

    /// Restore an archived collection to `active`. Does not cascade.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidStateTransition`] when the collection
    /// is not `archived`.
    pub fn restore_collection(&self, user: UserId, id: &EntityId) -> ServiceResult<Collection> {
        self.transition_collection(user, id, CollectionState::Active)
    }

    /// Soft-delete a collection and every descendant in one bulk update.
    ///
    /// Files under the subtree are not deleted here; file soft-delete is a
    /// separate step.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::LockUnavailable`] when the subtree lock stays
    /// contended.
    pub async fn soft_delete_collection(&self, user: UserId, id: &EntityId) -> ServiceResult<()> {
        let subject = self.load_mutable(id, &user, PermissionLevel::Admin)?;

        let root = subtree_root(&subject);
        let guard = self.locks.acquire(&format!("move:{root}")).await?;

        let now = Utc::now();
        let touched = self.collections.update_many(
            |c| {
                c.state != CollectionState::Deleted
                    && (c.id == *id || c.ancestor_ids.contains(id))
            },
            |c| {
                c.state = CollectionState::Deleted;
                c.version += 1;
                c.modified_at = now;
            },
        );

        guard.release().await;
        debug!(collection = %id, touched, "soft-deleted subtree");
        Ok(())
    }

    /// Physically remove a deleted collection and its descendants.
    ///
    /// Owner-only. Refuses while any file document, in any state, still
    /// points into the subtree.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Conflict`] when the collection is not `deleted`
    ///   yet, or files still reference the subtree.
    pub async fn hard_delete_collection(&self, user: UserId, id: &EntityId) -> ServiceResult<()> {
        let subject = self
            .collections
            .get_any_state(id)
            .filter(|c| c.owner_id == user)
            .ok_or_else(|| ServiceError::NotFound {
                entity: "collection".to_owned(),
                id: id.to_string(),
            })?;

        if subject.state != CollectionState::Deleted {
            return Err(ServiceError::Conflict {
                message: format!("collection {id} must be soft-deleted before hard delete"),
            });
        }

        let root = subtree_root(&subject);
        let guard = self.locks.acquire(&format!("move:{root}")).await?;

        let mut subtree: std::collections::HashSet<EntityId> = self
            .collections
            .find_descendants(id, ALL_STATES)
            .into_iter()
            .map(|c| c.id)
            .collect();
        subtree.insert(*id);

        if self.files.any_in_collections(&subtree) {
            guard.release().await;
            return Err(ServiceError::Conflict {
                message: format!("collection {id} still contains files"),
            });
        }

        for collection_id in &subtree {
            let _ = self.collections.remove(collection_id);
        }

        guard.release().await;
        debug!(collection = %id, removed = subtree.len(), "hard-deleted subtree");
        Ok(())
    }

    /// Direct children of a readable collection, in listing order.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the parent is not readable.
    pub fn find_by_parent(
        &self,
        user: UserId,
        parent: &EntityId,
    ) -> ServiceResult<Vec<Collection>> {
        self.load_visible(parent, &user, PermissionLevel::ReadOnly)?;
        Ok(self.collections.find_by_parent(parent, CollectionStore::VISIBLE))
    }

    /// The caller's root collections, in listing order.
    #[must_use]
    pub fn find_root_collections(&self, user: UserId) -> Vec<Collection> {
        self.collections.find_roots(&user, CollectionStore::VISIBLE)
    }

    /// Collections shared with the caller, in listing order.
    #[must_use]
    pub fn find_shared_with(&self, user: UserId) -> Vec<Collection> {
        self.collections
            .find_shared_with(&user, CollectionStore::VISIBLE)
    }

    /// The whole subtree below a readable collection, in listing order.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the collection is not
    /// readable.
    pub fn find_descendants(
        &self,
        user: UserId,
        id: &EntityId,
    ) -> ServiceResult<Vec<Collection>> {
        self.load_visible(id, &user, PermissionLevel::ReadOnly)?;
        Ok(self.collections.find_descendants(id, CollectionStore::VISIBLE))
    }

    /// The subtree below `root_id` reassembled as a nested structure.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the root is not readable.
    pub fn get_full_hierarchy(
        &self,
        user: UserId,
        root_id: &EntityId,
    ) -> ServiceResult<CollectionNode> {
        let root = self.load_visible(root_id, &user, PermissionLevel::ReadOnly)?;
        let descendants = self
            .collections
            .find_descendants(root_id, CollectionStore::VISIBLE);

        let mut children_of: HashMap<EntityId, Vec<Collection>> = HashMap::new();
        for descendant in descendants {
            if let Some(parent_id) = descendant.parent_id {
                children_of.entry(parent_id).or_default().push(descendant);
            }
        }

        Ok(assemble(root, &mut children_of))
    }

    /// Shared state-transition path for archive and restore.
    fn transition_collection(
        &self,
        user: UserId,
        id: &EntityId,
        target: CollectionState,
    ) -> ServiceResult<Collection> {
        let collection = self.load_mutable(id, &user, PermissionLevel::Admin)?;

        if collection.state == target {
            return Ok(collection);
        }
        if !collection.state.can_transition_to(target) {
            return Err(ServiceError::InvalidStateTransition {
                from: collection.state.to_string(),
                to: target.to_string(),
            });
        }

        let updated = self.collections.update(id, |c| {
            c.state = target;
            c.version += 1;
            c.modified_at = Utc::now();
        })?;
        debug!(collection = %id, state = %target, "collection state transition");
        Ok(updated)
    }
}

/// The root of the subtree containing `collection`.
fn subtree_root(collection: &Collection) -> EntityId {
    collection
        .ancestor_ids
        .first()
        .copied()
        .unwrap_or(collection.id)
}

/// Whether `chain` starts with `prefix` immediately followed by `pivot`.
fn chain_matches(chain: &[EntityId], prefix: &[EntityId], pivot: &EntityId) -> bool {
    chain.len() > prefix.len()
        && chain[..prefix.len()] == *prefix
        && chain[prefix.len()] == *pivot
}

/// Attach children to their parents, recursively, consuming `children_of`.
fn assemble(
    collection: Collection,
    children_of: &mut HashMap<EntityId, Vec<Collection>>,
) -> CollectionNode {
    let children = children_of
        .remove(&collection.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| assemble(child, children_of))
        .collect();
    CollectionNode {
        collection,
        children,
    }
}

fn require_field(value: &str, field: &str) -> ServiceResult<()> {
    if value.is_empty() {
        return Err(ServiceError::BadRequest {
            field: field.to_owned(),
            message: "required".to_owned(),
        });
    }
    Ok(())
}
