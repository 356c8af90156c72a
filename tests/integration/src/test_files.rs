//! File lifecycle integration tests: three-step upload, state machine,
//! reaping.

#[cfg(test)]
mod tests {
    use sealdrive_core::{ServiceConfig, ServiceError, UserId};
    use sealdrive_model::{DeleteManyInput, FileState, PermissionLevel, UpdateFileInput};
    use sealdrive_store::ObjectStore;

    use crate::{
        create_root, key_from_url, pending_input, share_input, test_drive, test_drive_with,
        upload_body, upload_thumbnail,
    };

    #[tokio::test]
    async fn test_should_complete_upload_happy_path() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 1_048_576, None))
            .unwrap_or_else(|e| panic!("create pending failed: {e}"));
        assert!(pending.upload_url.contains("method=PUT"));
        assert!(pending.thumbnail_upload_url.is_none());

        // Before the upload lands, the file is pending.
        let stored = drive.files().get_any_state(&pending.file_id).unwrap();
        assert_eq!(stored.state, FileState::Pending);
        assert_eq!(stored.version, 1);

        upload_body(&drive, &pending, &vec![0u8; 1_048_576]).await;

        let completed = drive
            .complete_upload(owner, &pending.file_id)
            .await
            .unwrap_or_else(|e| panic!("complete failed: {e}"));
        assert_eq!(completed.state, FileState::Active);
        assert_eq!(completed.version, 2);

        let key = key_from_url(&pending.upload_url);
        assert!(drive.objects().exists(&key).await.unwrap());
        assert_eq!(drive.objects().size(&key).await.unwrap(), 1_048_576);
    }

    #[tokio::test]
    async fn test_should_verify_thumbnail_too() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 64, Some(16)))
            .unwrap_or_else(|e| panic!("create pending failed: {e}"));
        let thumb_url = pending
            .thumbnail_upload_url
            .clone()
            .expect("thumbnail URL issued");
        assert!(key_from_url(&thumb_url).ends_with(".thumb"));

        upload_body(&drive, &pending, &[0u8; 64]).await;

        // Body present, thumbnail missing: complete must fail and the file
        // stays pending.
        let result = drive.complete_upload(owner, &pending.file_id).await;
        assert!(matches!(result, Err(ServiceError::ObjectMissing { .. })));
        let stored = drive.files().get_any_state(&pending.file_id).unwrap();
        assert_eq!(stored.state, FileState::Pending);

        upload_thumbnail(&drive, &pending, &[0u8; 16]).await;
        let completed = drive
            .complete_upload(owner, &pending.file_id)
            .await
            .unwrap_or_else(|e| panic!("complete failed: {e}"));
        assert_eq!(completed.state, FileState::Active);
    }

    #[tokio::test]
    async fn test_should_fail_complete_on_missing_object() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 128, None))
            .unwrap();

        // The client never uploads.
        let result = drive.complete_upload(owner, &pending.file_id).await;
        assert!(matches!(result, Err(ServiceError::ObjectMissing { .. })));

        let stored = drive.files().get_any_state(&pending.file_id).unwrap();
        assert_eq!(stored.state, FileState::Pending);
    }

    #[tokio::test]
    async fn test_should_fail_complete_on_size_mismatch() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 128, None))
            .unwrap();
        upload_body(&drive, &pending, &[0u8; 100]).await;

        let result = drive.complete_upload(owner, &pending.file_id).await;
        assert!(matches!(
            result,
            Err(ServiceError::ObjectSizeMismatch {
                expected: 128,
                actual: 100,
                ..
            })
        ));
        let stored = drive.files().get_any_state(&pending.file_id).unwrap();
        assert_eq!(stored.state, FileState::Pending);
    }

    #[tokio::test]
    async fn test_should_reject_second_complete_with_conflict() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 32, None))
            .unwrap();
        upload_body(&drive, &pending, &[0u8; 32]).await;

        let first = drive
            .complete_upload(owner, &pending.file_id)
            .await
            .unwrap_or_else(|e| panic!("first complete failed: {e}"));
        assert_eq!(first.version, 2);

        let second = drive.complete_upload(owner, &pending.file_id).await;
        assert!(matches!(second, Err(ServiceError::Conflict { .. })));

        // The version did not move again.
        let stored = drive.files().get_any_state(&pending.file_id).unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_should_reap_abandoned_and_materialized_pendings() {
        // pending_ttl 0 makes everything immediately reapable.
        let drive = test_drive_with(ServiceConfig::builder().pending_ttl_secs(0).build());
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let abandoned = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        let late = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        upload_body(&drive, &late, &[9u8; 8]).await;

        let stats = drive
            .reap_pending_once()
            .await
            .unwrap_or_else(|e| panic!("reap failed: {e}"));
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.deleted, 1);

        // The abandoned document is gone; the late one is active.
        assert!(drive.files().get_any_state(&abandoned.file_id).is_none());
        let late_after = drive.files().get_any_state(&late.file_id).unwrap();
        assert_eq!(late_after.state, FileState::Active);
    }

    #[tokio::test]
    async fn test_should_issue_download_urls_without_exposing_keys() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 16, Some(4)))
            .unwrap();
        upload_body(&drive, &pending, &[1u8; 16]).await;
        upload_thumbnail(&drive, &pending, &[2u8; 4]).await;
        drive.complete_upload(owner, &pending.file_id).await.unwrap();

        let download = drive
            .presigned_download(owner, &pending.file_id)
            .unwrap_or_else(|e| panic!("download failed: {e}"));
        assert!(download.url.contains("method=GET"));
        assert!(
            download
                .thumbnail_url
                .as_deref()
                .is_some_and(|u| u.contains(".thumb"))
        );

        // Pending files have nothing to download.
        let other = drive
            .create_pending_file(owner, pending_input(&collection, 16, None))
            .unwrap();
        assert!(matches!(
            drive.presigned_download(owner, &other.file_id),
            Err(ServiceError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_enforce_file_state_machine() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        let id = pending.file_id;

        // Pending cannot be archived.
        assert!(matches!(
            drive.archive_file(owner, &id),
            Err(ServiceError::InvalidStateTransition { .. })
        ));

        upload_body(&drive, &pending, &[0u8; 8]).await;
        drive.complete_upload(owner, &id).await.unwrap();

        let archived = drive.archive_file(owner, &id).unwrap();
        assert_eq!(archived.state, FileState::Archived);

        // Archived cannot be soft-deleted; it must be restored first.
        assert!(matches!(
            drive.soft_delete_file(owner, &id),
            Err(ServiceError::InvalidStateTransition { .. })
        ));

        let restored = drive.restore_file(owner, &id).unwrap();
        assert_eq!(restored.state, FileState::Active);

        let deleted = drive.soft_delete_file(owner, &id).unwrap();
        assert_eq!(deleted.state, FileState::Deleted);

        // Deleted is terminal for reads.
        assert!(matches!(
            drive.get_file(owner, &id),
            Err(ServiceError::Gone { .. })
        ));
    }

    #[tokio::test]
    async fn test_should_hard_delete_file_and_objects() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        upload_body(&drive, &pending, &[0u8; 8]).await;
        drive.complete_upload(owner, &pending.file_id).await.unwrap();
        let key = key_from_url(&pending.upload_url);

        // Active files refuse hard delete.
        assert!(matches!(
            drive.hard_delete_file(owner, &pending.file_id).await,
            Err(ServiceError::Conflict { .. })
        ));

        drive.soft_delete_file(owner, &pending.file_id).unwrap();
        drive
            .hard_delete_file(owner, &pending.file_id)
            .await
            .unwrap_or_else(|e| panic!("hard delete failed: {e}"));

        assert!(drive.files().get_any_state(&pending.file_id).is_none());
        assert!(!drive.objects().exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_should_report_bulk_delete_outcomes_per_id() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let deletable = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        upload_body(&drive, &deletable, &[0u8; 8]).await;
        drive.complete_upload(owner, &deletable.file_id).await.unwrap();

        let archived = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        upload_body(&drive, &archived, &[0u8; 8]).await;
        drive.complete_upload(owner, &archived.file_id).await.unwrap();
        drive.archive_file(owner, &archived.file_id).unwrap();

        let ghost = sealdrive_core::EntityId::generate();

        let output = drive.delete_many_files(
            owner,
            DeleteManyInput {
                ids: vec![deletable.file_id, archived.file_id, ghost],
            },
        );
        assert_eq!(output.results.len(), 3);

        let by_id = |id| {
            output
                .results
                .iter()
                .find(|r| r.id == id)
                .unwrap_or_else(|| panic!("missing result"))
        };
        assert!(by_id(deletable.file_id).deleted);
        assert!(!by_id(archived.file_id).deleted);
        assert!(!by_id(ghost).deleted);

        let stored = drive.files().get_any_state(&deletable.file_id).unwrap();
        assert_eq!(stored.state, FileState::Deleted);
        let untouched = drive.files().get_any_state(&archived.file_id).unwrap();
        assert_eq!(untouched.state, FileState::Archived);
    }

    #[tokio::test]
    async fn test_should_set_file_owner_to_collection_owner() {
        let drive = test_drive();
        let owner = UserId::generate();
        let writer = UserId::generate();

        let collection = create_root(&drive, owner, "c");
        drive
            .add_member_to_hierarchy(
                owner,
                &collection.id,
                share_input(writer, PermissionLevel::ReadWrite, &[&collection]),
            )
            .await
            .unwrap();

        let pending = drive
            .create_pending_file(writer, pending_input(&collection, 8, None))
            .unwrap_or_else(|e| panic!("member create failed: {e}"));

        let stored = drive.files().get_any_state(&pending.file_id).unwrap();
        assert_eq!(stored.owner_id, owner);
        assert!(
            stored
                .encrypted_file_object_key
                .starts_with(&format!("files/{}/", owner.to_hex()))
        );
    }

    #[tokio::test]
    async fn test_should_enforce_permissions_on_file_paths() {
        let drive = test_drive();
        let owner = UserId::generate();
        let reader = UserId::generate();
        let stranger = UserId::generate();

        let collection = create_root(&drive, owner, "c");
        drive
            .add_member_to_hierarchy(
                owner,
                &collection.id,
                share_input(reader, PermissionLevel::ReadOnly, &[&collection]),
            )
            .await
            .unwrap();

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        upload_body(&drive, &pending, &[0u8; 8]).await;
        drive.complete_upload(owner, &pending.file_id).await.unwrap();

        // A reader can fetch and download but not update.
        assert!(drive.get_file(reader, &pending.file_id).is_ok());
        assert!(drive.presigned_download(reader, &pending.file_id).is_ok());
        assert!(matches!(
            drive.update_file(
                reader,
                &pending.file_id,
                UpdateFileInput {
                    encrypted_metadata: Some("enc:new".to_owned()),
                    ..UpdateFileInput::default()
                }
            ),
            Err(ServiceError::Forbidden { .. })
        ));

        // A reader cannot create files.
        assert!(matches!(
            drive.create_pending_file(reader, pending_input(&collection, 8, None)),
            Err(ServiceError::Forbidden { .. })
        ));

        // A stranger sees nothing at all.
        assert!(matches!(
            drive.get_file(stranger, &pending.file_id),
            Err(ServiceError::NotFound { .. })
        ));
    }
}
