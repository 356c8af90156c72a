//! Access evaluation against the permission lattice.
//!
//! Resolution is always local to the collection being read: inherited grants
//! are materialized into `members` at share time, so no ancestor walk happens
//! here. Callers without any grant get `NotFound`, never `Forbidden`, so the
//! entity's existence is not revealed.

use anyhow::anyhow;
use tracing::error;

use sealdrive_core::{EntityId, ServiceError, ServiceResult, UserId};
use sealdrive_model::{Collection, CollectionState, File, PermissionLevel};
use sealdrive_store::CollectionStore;

use crate::provider::SealDrive;

impl SealDrive {
    /// Evaluate whether `user` holds `required` on `collection_id`.
    ///
    /// 1. Owner: allow.
    /// 2. Member with `permission_level >= required`: allow.
    /// 3. Otherwise deny.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] when the collection is absent, deleted,
    ///   or the caller holds no grant at all.
    /// - [`ServiceError::Forbidden`] when the caller holds a grant below
    ///   `required`.
    pub fn check_collection_access(
        &self,
        collection_id: &EntityId,
        user: &UserId,
        required: PermissionLevel,
    ) -> ServiceResult<()> {
        self.load_visible(collection_id, user, required)?;
        Ok(())
    }

    /// Check `required` against the grants on an already-loaded collection.
    pub(crate) fn require_access(
        collection: &Collection,
        user: &UserId,
        required: PermissionLevel,
    ) -> ServiceResult<PermissionLevel> {
        match collection.effective_permission(user) {
            Some(level) if level >= required => Ok(level),
            Some(_) => Err(ServiceError::Forbidden {
                required: required.to_string(),
            }),
            None => Err(not_found(&collection.id)),
        }
    }

    /// Load a collection for a read path. Deleted or unknown collections are
    /// indistinguishable from access denials.
    pub(crate) fn load_visible(
        &self,
        id: &EntityId,
        user: &UserId,
        required: PermissionLevel,
    ) -> ServiceResult<Collection> {
        let collection = self
            .collections
            .get(id, CollectionStore::VISIBLE)
            .ok_or_else(|| not_found(id))?;
        Self::require_access(&collection, user, required)?;
        Ok(collection)
    }

    /// Load a collection for a mutating path. Callers with a grant on a
    /// deleted collection get `Gone`; everyone else gets `NotFound`.
    pub(crate) fn load_mutable(
        &self,
        id: &EntityId,
        user: &UserId,
        required: PermissionLevel,
    ) -> ServiceResult<Collection> {
        let collection = self.collections.get_any_state(id).ok_or_else(|| not_found(id))?;
        Self::require_access(&collection, user, required)?;
        if collection.state == CollectionState::Deleted {
            return Err(ServiceError::Gone {
                entity: "collection".to_owned(),
                id: id.to_string(),
            });
        }
        Ok(collection)
    }

    /// Check `required` for `user` on the collection containing `file`.
    ///
    /// Permission evaluation uses the collection document regardless of its
    /// state, so grants keep working while a collection is archived. A file
    /// whose collection no longer resolves is an invariant violation.
    pub(crate) fn require_file_access(
        &self,
        file: &File,
        user: &UserId,
        required: PermissionLevel,
    ) -> ServiceResult<PermissionLevel> {
        let Some(collection) = self.collections.get_any_state(&file.collection_id) else {
            error!(
                file = %file.id,
                collection = %file.collection_id,
                "file's collection does not resolve"
            );
            return Err(ServiceError::Internal(anyhow!(
                "collection {} missing for file {}",
                file.collection_id,
                file.id
            )));
        };
        Self::require_access(&collection, user, required).map_err(|err| match err {
            // Hide the file, not just the collection.
            ServiceError::NotFound { .. } => ServiceError::NotFound {
                entity: "file".to_owned(),
                id: file.id.to_string(),
            },
            other => other,
        })
    }
}

fn not_found(id: &EntityId) -> ServiceError {
    ServiceError::NotFound {
        entity: "collection".to_owned(),
        id: id.to_string(),
    }
}
