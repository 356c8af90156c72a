//! Membership operations: hierarchical share/unshare and permission changes.
//!
//! A share inserts one direct membership on the target collection and
//! materializes inherited copies on every descendant, each sealed with a
//! caller-supplied key. Direct grants on descendants always win: inherited
//! copies are never written over them, and unsharing never removes them.
//! All three operations serialize on the `share:{root}` lock.

use chrono::Utc;
use tracing::debug;

use sealdrive_core::{EntityId, ServiceError, ServiceResult, UserId};
use sealdrive_model::{
    Collection, CollectionMembership, PermissionLevel, ShareInput, UpdateMemberPermissionInput,
};
use sealdrive_store::CollectionStore;

use crate::provider::SealDrive;

impl SealDrive {
    /// Grant `input.recipient_id` access to a collection and, transitively,
    /// to every visible descendant.
    ///
    /// Each descendant without its own direct grant receives an inherited
    /// copy carrying the sealed key from `input.sealed_keys`; descendants
    /// with a direct grant are preserved unchanged.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::DuplicateMembership`] when the recipient already
    ///   holds a direct grant on this collection at a different level.
    ///   Re-sharing at the same level is treated as a retry and resumes the
    ///   cascade.
    /// - [`ServiceError::BadRequest`] when a needed sealed key is missing,
    ///   or the recipient is the owner.
    /// - [`ServiceError::LockUnavailable`] when the share lock stays
    ///   contended.
    pub async fn add_member_to_hierarchy(
        &self,
        user: UserId,
        collection_id: &EntityId,
        input: ShareInput,
    ) -> ServiceResult<Collection> {
        let subject = self.load_mutable(collection_id, &user, PermissionLevel::Admin)?;

        if input.recipient_id == subject.owner_id {
            return Err(ServiceError::BadRequest {
                field: "recipientId".to_owned(),
                message: "the owner already has implicit admin access".to_owned(),
            });
        }
        if let Some(existing) = subject.membership_for(&input.recipient_id) {
            if !existing.is_inherited && existing.permission_level != input.permission_level {
                return Err(ServiceError::DuplicateMembership {
                    recipient_id: input.recipient_id.to_string(),
                });
            }
            // A matching direct grant is a retry of an interrupted share and
            // resumes the cascade; an inherited copy is upgraded to a direct
            // grant below.
        }
        if !input.sealed_keys.contains_key(collection_id) {
            return Err(ServiceError::BadRequest {
                field: "sealedKeys".to_owned(),
                message: format!("missing sealed key for collection {collection_id}"),
            });
        }

        let descendants = self
            .collections
            .find_descendants(collection_id, CollectionStore::VISIBLE);

        // Validate the whole key map before touching any document, so a bad
        // request mutates nothing.
        for descendant in &descendants {
            let has_direct = descendant
                .membership_for(&input.recipient_id)
                .is_some_and(|m| !m.is_inherited);
            if !has_direct && !input.sealed_keys.contains_key(&descendant.id) {
                return Err(ServiceError::BadRequest {
                    field: "sealedKeys".to_owned(),
                    message: format!("missing sealed key for collection {}", descendant.id),
                });
            }
        }

        let root = subject.ancestor_ids.first().copied().unwrap_or(subject.id);
        let guard = self.locks.acquire(&format!("share:{root}")).await?;

        let now = Utc::now();
        let direct = CollectionMembership {
            recipient_id: input.recipient_id,
            recipient_email: input.recipient_email.clone(),
            granted_by_id: user,
            encrypted_collection_key: input.sealed_keys[collection_id].clone(),
            permission_level: input.permission_level,
            is_inherited: false,
            inherited_from_id: None,
            created_at: now,
        };

        let updated = self.collections.update(collection_id, |c| {
            c.members.retain(|m| m.recipient_id != input.recipient_id);
            c.members.push(direct.clone());
            c.version += 1;
            c.modified_at = now;
        })?;

        for descendant in &descendants {
            let inherited = CollectionMembership {
                recipient_id: input.recipient_id,
                recipient_email: input.recipient_email.clone(),
                granted_by_id: user,
                encrypted_collection_key: input
                    .sealed_keys
                    .get(&descendant.id)
                    .cloned()
                    .unwrap_or_default(),
                permission_level: input.permission_level,
                is_inherited: true,
                inherited_from_id: Some(*collection_id),
                created_at: now,
            };
            let _ = self.collections.update(&descendant.id, |d| {
                let has_direct = d
                    .membership_for(&input.recipient_id)
                    .is_some_and(|m| !m.is_inherited);
                if has_direct {
                    return;
                }
                d.members.retain(|m| m.recipient_id != input.recipient_id);
                d.members.push(inherited.clone());
                d.version += 1;
                d.modified_at = now;
            });
        }

        guard.release().await;
        debug!(
            collection = %collection_id,
            recipient = %input.recipient_id,
            level = %input.permission_level,
            descendants = descendants.len(),
            "shared hierarchy"
        );
        Ok(updated)
    }

    /// Revoke a direct grant and every inherited copy that originated from
    /// it. Direct grants made independently on descendants stay intact.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] when the recipient holds no direct grant
    ///   on this collection.
    /// - [`ServiceError::LockUnavailable`] when the share lock stays
    ///   contended.
    pub async fn remove_member_from_hierarchy(
        &self,
        user: UserId,
        collection_id: &EntityId,
        recipient: &UserId,
    ) -> ServiceResult<()> {
        let subject = self.load_mutable(collection_id, &user, PermissionLevel::Admin)?;

        let is_direct = subject
            .membership_for(recipient)
            .is_some_and(|m| !m.is_inherited);
        if !is_direct {
            return Err(ServiceError::NotFound {
                entity: "membership".to_owned(),
                id: recipient.to_string(),
            });
        }

        let root = subject.ancestor_ids.first().copied().unwrap_or(subject.id);
        let guard = self.locks.acquire(&format!("share:{root}")).await?;

        let now = Utc::now();
        self.collections.update(collection_id, |c| {
            c.members.retain(|m| m.recipient_id != *recipient);
            c.version += 1;
            c.modified_at = now;
        })?;

        let removed = self.collections.update_many(
            |c| {
                c.ancestor_ids.contains(collection_id)
                    && c.members.iter().any(|m| {
                        m.recipient_id == *recipient
                            && m.inherited_from_id == Some(*collection_id)
                    })
            },
            |c| {
                c.members.retain(|m| {
                    m.recipient_id != *recipient
                        || m.inherited_from_id != Some(*collection_id)
                });
                c.version += 1;
                c.modified_at = now;
            },
        );

        guard.release().await;
        debug!(
            collection = %collection_id,
            recipient = %recipient,
            cascaded = removed,
            "unshared hierarchy"
        );
        Ok(())
    }

    /// Change a direct grant's permission level and propagate the new level
    /// to every inherited copy originating from it.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] when the recipient holds no direct grant
    ///   on this collection.
    /// - [`ServiceError::LockUnavailable`] when the share lock stays
    ///   contended.
    pub async fn update_member_permission(
        &self,
        user: UserId,
        collection_id: &EntityId,
        recipient: &UserId,
        input: UpdateMemberPermissionInput,
    ) -> ServiceResult<Collection> {
        let subject = self.load_mutable(collection_id, &user, PermissionLevel::Admin)?;

        let is_direct = subject
            .membership_for(recipient)
            .is_some_and(|m| !m.is_inherited);
        if !is_direct {
            return Err(ServiceError::NotFound {
                entity: "membership".to_owned(),
                id: recipient.to_string(),
            });
        }

        let root = subject.ancestor_ids.first().copied().unwrap_or(subject.id);
        let guard = self.locks.acquire(&format!("share:{root}")).await?;

        let now = Utc::now();
        let level = input.permission_level;
        let updated = self.collections.update(collection_id, |c| {
            for member in &mut c.members {
                if member.recipient_id == *recipient {
                    member.permission_level = level;
                }
            }
            c.version += 1;
            c.modified_at = now;
        })?;

        let propagated = self.collections.update_many(
            |c| {
                c.ancestor_ids.contains(collection_id)
                    && c.members.iter().any(|m| {
                        m.recipient_id == *recipient
                            && m.inherited_from_id == Some(*collection_id)
                            && m.permission_level != level
                    })
            },
            |c| {
                for member in &mut c.members {
                    if member.recipient_id == *recipient
                        && member.inherited_from_id == Some(*collection_id)
                    {
                        member.permission_level = level;
                    }
                }
                c.version += 1;
                c.modified_at = now;
            },
        );

        guard.release().await;
        debug!(
            collection = %collection_id,
            recipient = %recipient,
            level = %level,
            propagated,
            "changed member permission"
        );
        Ok(updated)
    }
}
