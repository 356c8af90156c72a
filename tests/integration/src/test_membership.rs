//! Membership and access-control integration tests.

#[cfg(test)]
mod tests {
    use sealdrive_core::{ServiceError, UserId};
    use sealdrive_model::{PermissionLevel, UpdateMemberPermissionInput};

    use crate::{create_child, create_root, share_input, test_drive};

    #[tokio::test]
    async fn test_should_share_hierarchy_with_inherited_copies() {
        let drive = test_drive();
        let owner = UserId::generate();
        let recipient = UserId::generate();

        // R -> C1 -> C2.
        let r = create_root(&drive, owner, "r");
        let c1 = create_child(&drive, owner, &r, "c1");
        let c2 = create_child(&drive, owner, &c1, "c2");

        drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(recipient, PermissionLevel::ReadWrite, &[&r, &c1, &c2]),
            )
            .await
            .unwrap_or_else(|e| panic!("share failed: {e}"));

        // R carries the direct grant.
        let r_after = drive.get_collection(owner, &r.id).unwrap();
        let direct = r_after.membership_for(&recipient).expect("direct grant");
        assert!(!direct.is_inherited);
        assert_eq!(direct.permission_level, PermissionLevel::ReadWrite);
        assert!(direct.inherited_from_id.is_none());

        // C1 and C2 carry inherited copies pointing at R.
        for c in [&c1, &c2] {
            let after = drive.get_collection(owner, &c.id).unwrap();
            let inherited = after.membership_for(&recipient).expect("inherited copy");
            assert!(inherited.is_inherited);
            assert_eq!(inherited.inherited_from_id, Some(r.id));
            assert_eq!(inherited.permission_level, PermissionLevel::ReadWrite);
            assert_eq!(
                inherited.encrypted_collection_key,
                format!("sealed:{}", c.id)
            );
        }

        // The grant is enforceable at the deepest node.
        assert!(
            drive
                .check_collection_access(&c2.id, &recipient, PermissionLevel::ReadWrite)
                .is_ok()
        );
        assert!(matches!(
            drive.check_collection_access(&c2.id, &recipient, PermissionLevel::Admin),
            Err(ServiceError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_unshare_hierarchy_completely() {
        let drive = test_drive();
        let owner = UserId::generate();
        let recipient = UserId::generate();

        let r = create_root(&drive, owner, "r");
        let c1 = create_child(&drive, owner, &r, "c1");
        let c2 = create_child(&drive, owner, &c1, "c2");

        drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(recipient, PermissionLevel::ReadWrite, &[&r, &c1, &c2]),
            )
            .await
            .unwrap();

        drive
            .remove_member_from_hierarchy(owner, &r.id, &recipient)
            .await
            .unwrap_or_else(|e| panic!("unshare failed: {e}"));

        for id in [r.id, c1.id, c2.id] {
            let after = drive.get_collection(owner, &id).unwrap();
            assert!(
                after.membership_for(&recipient).is_none(),
                "membership should be gone on {id}"
            );
        }
        assert!(matches!(
            drive.check_collection_access(&c2.id, &recipient, PermissionLevel::ReadOnly),
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_preserve_direct_grants_on_descendants() {
        let drive = test_drive();
        let owner = UserId::generate();
        let recipient = UserId::generate();

        let r = create_root(&drive, owner, "r");
        let c1 = create_child(&drive, owner, &r, "c1");

        // A direct grant made on the child first.
        drive
            .add_member_to_hierarchy(
                owner,
                &c1.id,
                share_input(recipient, PermissionLevel::Admin, &[&c1]),
            )
            .await
            .unwrap();

        // Sharing the root must not overwrite it; no sealed key for C1 is
        // needed because the direct grant wins.
        drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(recipient, PermissionLevel::ReadOnly, &[&r]),
            )
            .await
            .unwrap_or_else(|e| panic!("share failed: {e}"));

        let c1_after = drive.get_collection(owner, &c1.id).unwrap();
        let grant = c1_after.membership_for(&recipient).expect("direct grant");
        assert!(!grant.is_inherited);
        assert_eq!(grant.permission_level, PermissionLevel::Admin);

        // Unsharing the root leaves the direct grant intact.
        drive
            .remove_member_from_hierarchy(owner, &r.id, &recipient)
            .await
            .unwrap();
        let c1_final = drive.get_collection(owner, &c1.id).unwrap();
        assert!(c1_final.membership_for(&recipient).is_some());
    }

    #[tokio::test]
    async fn test_should_reject_duplicate_direct_share() {
        let drive = test_drive();
        let owner = UserId::generate();
        let recipient = UserId::generate();
        let r = create_root(&drive, owner, "r");

        drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(recipient, PermissionLevel::ReadOnly, &[&r]),
            )
            .await
            .unwrap();

        let result = drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(recipient, PermissionLevel::ReadWrite, &[&r]),
            )
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::DuplicateMembership { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_reject_share_without_sealed_keys() {
        let drive = test_drive();
        let owner = UserId::generate();
        let recipient = UserId::generate();

        let r = create_root(&drive, owner, "r");
        let c1 = create_child(&drive, owner, &r, "c1");

        // Key for R but not for the descendant C1.
        let result = drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(recipient, PermissionLevel::ReadOnly, &[&r]),
            )
            .await;
        assert!(matches!(result, Err(ServiceError::BadRequest { .. })));

        // Nothing was written.
        let r_after = drive.get_collection(owner, &r.id).unwrap();
        assert!(r_after.membership_for(&recipient).is_none());
        let c1_after = drive.get_collection(owner, &c1.id).unwrap();
        assert!(c1_after.membership_for(&recipient).is_none());
    }

    #[tokio::test]
    async fn test_should_propagate_permission_change_to_inherited_copies() {
        let drive = test_drive();
        let owner = UserId::generate();
        let recipient = UserId::generate();

        let r = create_root(&drive, owner, "r");
        let c1 = create_child(&drive, owner, &r, "c1");

        drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(recipient, PermissionLevel::ReadOnly, &[&r, &c1]),
            )
            .await
            .unwrap();

        drive
            .update_member_permission(
                owner,
                &r.id,
                &recipient,
                UpdateMemberPermissionInput {
                    permission_level: PermissionLevel::Admin,
                },
            )
            .await
            .unwrap_or_else(|e| panic!("permission change failed: {e}"));

        for id in [r.id, c1.id] {
            let after = drive.get_collection(owner, &id).unwrap();
            assert_eq!(
                after.membership_for(&recipient).map(|m| m.permission_level),
                Some(PermissionLevel::Admin),
                "level should propagate to {id}"
            );
        }
    }

    #[tokio::test]
    async fn test_should_hide_collections_from_strangers() {
        let drive = test_drive();
        let owner = UserId::generate();
        let stranger = UserId::generate();
        let r = create_root(&drive, owner, "r");

        // Read and write paths both report not-found, never forbidden.
        assert!(matches!(
            drive.get_collection(stranger, &r.id),
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            drive
                .remove_member_from_hierarchy(stranger, &r.id, &owner)
                .await,
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_reject_sharing_with_the_owner() {
        let drive = test_drive();
        let owner = UserId::generate();
        let r = create_root(&drive, owner, "r");

        let result = drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(owner, PermissionLevel::Admin, &[&r]),
            )
            .await;
        assert!(matches!(result, Err(ServiceError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn test_should_let_member_admin_share_further() {
        let drive = test_drive();
        let owner = UserId::generate();
        let admin_member = UserId::generate();
        let third = UserId::generate();

        let r = create_root(&drive, owner, "r");
        drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(admin_member, PermissionLevel::Admin, &[&r]),
            )
            .await
            .unwrap();

        // The admin member can grant access to a third user.
        drive
            .add_member_to_hierarchy(
                admin_member,
                &r.id,
                share_input(third, PermissionLevel::ReadOnly, &[&r]),
            )
            .await
            .unwrap_or_else(|e| panic!("member share failed: {e}"));

        assert!(
            drive
                .check_collection_access(&r.id, &third, PermissionLevel::ReadOnly)
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_should_list_shared_collections() {
        let drive = test_drive();
        let owner = UserId::generate();
        let recipient = UserId::generate();

        let r = create_root(&drive, owner, "r");
        let c1 = create_child(&drive, owner, &r, "c1");
        drive
            .add_member_to_hierarchy(
                owner,
                &r.id,
                share_input(recipient, PermissionLevel::ReadOnly, &[&r, &c1]),
            )
            .await
            .unwrap();

        let shared = drive.find_shared_with(recipient);
        let ids: Vec<_> = shared.iter().map(|c| c.id).collect();
        assert!(ids.contains(&r.id));
        assert!(ids.contains(&c1.id));

        // The owner's own listing is unaffected.
        assert!(drive.find_shared_with(owner).is_empty());
    }
}
