//! Collection documents and memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sealdrive_core::{EntityId, UserId};

use crate::types::{CollectionState, CollectionType, PermissionLevel};

/// A node in the rooted collection forest.
///
/// `ancestor_ids` is the ordered chain from root to immediate parent,
/// denormalized so any subtree is reachable with the single predicate
/// "`ancestor_ids` contains X". `encrypted_path_segments` carries one opaque
/// display segment per ancestor plus one for the node itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Globally unique identifier.
    pub id: EntityId,
    /// Owning user; immutable after creation.
    pub owner_id: UserId,
    /// Folder or album.
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    /// Opaque encrypted display name.
    pub encrypted_name: String,
    /// This collection's symmetric key wrapped under the owner's master key.
    pub encrypted_collection_key: String,
    /// Parent collection, absent for roots.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,
    /// Ancestors from root to immediate parent; empty for roots.
    pub ancestor_ids: Vec<EntityId>,
    /// Opaque display segments, one per ancestor plus self.
    pub encrypted_path_segments: Vec<String>,
    /// Lifecycle state.
    pub state: CollectionState,
    /// Monotonic counter, bumped on every mutation.
    pub version: u64,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last mutation instant.
    pub modified_at: DateTime<Utc>,
    /// Memberships, unique per recipient.
    pub members: Vec<CollectionMembership>,
}

impl Collection {
    /// Whether this collection is a forest root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The membership for `recipient`, if any.
    #[must_use]
    pub fn membership_for(&self, recipient: &UserId) -> Option<&CollectionMembership> {
        self.members.iter().find(|m| m.recipient_id == *recipient)
    }

    /// The permission level `user` holds on this collection.
    ///
    /// The owner is implicitly `admin` and is never stored as a membership.
    #[must_use]
    pub fn effective_permission(&self, user: &UserId) -> Option<PermissionLevel> {
        if self.owner_id == *user {
            return Some(PermissionLevel::Admin);
        }
        self.membership_for(user).map(|m| m.permission_level)
    }
}

/// A membership granting a recipient access to a collection.
///
/// Inherited memberships are materialized copies of a direct grant made on an
/// ancestor; `inherited_from_id` points at that ancestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMembership {
    /// The user this membership grants access to.
    pub recipient_id: UserId,
    /// The recipient's email at grant time.
    pub recipient_email: String,
    /// The user who made the grant.
    pub granted_by_id: UserId,
    /// The collection key sealed to the recipient's public key.
    pub encrypted_collection_key: String,
    /// Granted permission level.
    pub permission_level: PermissionLevel,
    /// Whether this record was materialized from an ancestor's direct grant.
    pub is_inherited: bool,
    /// The ancestor carrying the direct grant; present iff `is_inherited`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherited_from_id: Option<EntityId>,
    /// Grant instant.
    pub created_at: DateTime<Utc>,
}

/// A collection with its (transitively) nested children, as returned by the
/// full-hierarchy query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionNode {
    /// The collection at this level.
    pub collection: Collection,
    /// Direct children, recursively nested.
    pub children: Vec<CollectionNode>,
}
