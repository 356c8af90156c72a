//! Sync engine integration tests: cursor paging, ordering, tombstones.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use sealdrive_core::{EntityId, UserId};
    use sealdrive_model::{CollectionState, FileState, PermissionLevel};

    use crate::{create_root, pending_input, share_input, test_drive, upload_body};

    #[test]
    fn test_should_page_through_large_candidate_set_exactly_once() {
        let drive = test_drive();
        let owner = UserId::generate();

        let total = 2500;
        for i in 0..total {
            create_root(&drive, owner, &format!("c{i}"));
        }

        let mut seen: HashSet<EntityId> = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        let mut previous: Option<(chrono::DateTime<chrono::Utc>, EntityId)> = None;

        loop {
            let page = drive
                .sync_collections(owner, cursor.as_deref(), Some(1000))
                .unwrap_or_else(|e| panic!("sync failed: {e}"));
            pages += 1;

            for item in &page.items {
                // Non-decreasing (modified_at, id) across the whole scan.
                if let Some(prev) = previous {
                    assert!(
                        (item.modified_at, item.id) > prev,
                        "items must be strictly ascending"
                    );
                }
                previous = Some((item.modified_at, item.id));
                assert!(seen.insert(item.id), "item {0} appeared twice", item.id);
            }

            if page.has_more {
                assert_eq!(page.items.len(), 1000);
                cursor = page.next_cursor.clone();
                assert!(cursor.is_some(), "has_more implies a next cursor");
            } else {
                assert!(page.next_cursor.is_none());
                break;
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen.len(), total);
    }

    #[tokio::test]
    async fn test_should_surface_tombstones_to_sync() {
        let drive = test_drive();
        let owner = UserId::generate();

        let kept = create_root(&drive, owner, "kept");
        let dropped = create_root(&drive, owner, "dropped");
        drive
            .soft_delete_collection(owner, &dropped.id)
            .await
            .unwrap_or_else(|e| panic!("soft delete failed: {e}"));

        let page = drive
            .sync_collections(owner, None, None)
            .unwrap_or_else(|e| panic!("sync failed: {e}"));
        assert_eq!(page.items.len(), 2);

        let tombstone = page
            .items
            .iter()
            .find(|i| i.id == dropped.id)
            .expect("tombstone present");
        assert_eq!(tombstone.state, CollectionState::Deleted);
        assert!(tombstone.version > dropped.version);

        let live = page.items.iter().find(|i| i.id == kept.id).expect("live item");
        assert_eq!(live.state, CollectionState::Active);
    }

    #[tokio::test]
    async fn test_should_include_member_collections_in_sync() {
        let drive = test_drive();
        let owner = UserId::generate();
        let member = UserId::generate();

        let shared = create_root(&drive, owner, "shared");
        let _private = create_root(&drive, owner, "private");
        drive
            .add_member_to_hierarchy(
                owner,
                &shared.id,
                share_input(member, PermissionLevel::ReadOnly, &[&shared]),
            )
            .await
            .unwrap();

        let page = drive
            .sync_collections(member, None, None)
            .unwrap_or_else(|e| panic!("sync failed: {e}"));
        let ids: Vec<EntityId> = page.items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![shared.id]);
    }

    #[tokio::test]
    async fn test_should_sync_files_including_pending() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        let pending = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        let completed = drive
            .create_pending_file(owner, pending_input(&collection, 8, None))
            .unwrap();
        upload_body(&drive, &completed, &[0u8; 8]).await;
        drive
            .complete_upload(owner, &completed.file_id)
            .await
            .unwrap();

        let page = drive
            .sync_files(owner, None, None)
            .unwrap_or_else(|e| panic!("file sync failed: {e}"));
        assert_eq!(page.items.len(), 2);

        let pending_item = page
            .items
            .iter()
            .find(|i| i.id == pending.file_id)
            .expect("pending visible to sync");
        assert_eq!(pending_item.state, FileState::Pending);

        let completed_item = page
            .items
            .iter()
            .find(|i| i.id == completed.file_id)
            .expect("completed visible to sync");
        assert_eq!(completed_item.state, FileState::Active);
        assert_eq!(completed_item.version, 2);
        assert_eq!(completed_item.collection_id, collection.id);
    }

    #[tokio::test]
    async fn test_should_resume_file_sync_from_cursor() {
        let drive = test_drive();
        let owner = UserId::generate();
        let collection = create_root(&drive, owner, "c");

        for _ in 0..5 {
            let _ = drive
                .create_pending_file(owner, pending_input(&collection, 8, None))
                .unwrap();
        }

        let first = drive
            .sync_files(owner, None, Some(3))
            .unwrap_or_else(|e| panic!("file sync failed: {e}"));
        assert_eq!(first.items.len(), 3);
        assert!(first.has_more);

        let rest = drive
            .sync_files(owner, first.next_cursor.as_deref(), Some(3))
            .unwrap_or_else(|e| panic!("file sync failed: {e}"));
        assert_eq!(rest.items.len(), 2);
        assert!(!rest.has_more);

        let mut all: Vec<EntityId> = first
            .items
            .iter()
            .chain(rest.items.iter())
            .map(|i| i.id)
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn test_should_reject_malformed_cursor() {
        let drive = test_drive();
        let user = UserId::generate();
        let result = drive.sync_collections(user, Some("garbage!!"), None);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_cap_limit_at_configured_max() {
        let drive = test_drive();
        let owner = UserId::generate();
        for i in 0..10 {
            create_root(&drive, owner, &format!("c{i}"));
        }

        // A limit beyond the max is clamped, not rejected.
        let page = drive
            .sync_collections(owner, None, Some(1_000_000))
            .unwrap_or_else(|e| panic!("sync failed: {e}"));
        assert_eq!(page.items.len(), 10);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_should_observe_mutation_as_new_position() {
        let drive = test_drive();
        let owner = UserId::generate();

        let a = create_root(&drive, owner, "a");
        let _b = create_root(&drive, owner, "b");

        // Drain the scan.
        let page = drive.sync_collections(owner, None, Some(10)).unwrap();
        assert_eq!(page.items.len(), 2);
        let last = &page.items[1];
        let cursor = sealdrive_model::SyncCursor {
            modified_at: last.modified_at,
            id: last.id,
        }
        .encode();

        // Nothing new yet.
        let empty = drive
            .sync_collections(owner, Some(&cursor), Some(10))
            .unwrap();
        assert!(empty.items.is_empty());

        // Mutating A re-surfaces it past the cursor with a higher version.
        drive
            .update_collection(
                owner,
                &a.id,
                sealdrive_model::UpdateCollectionInput {
                    encrypted_name: Some("enc:renamed".to_owned()),
                    encrypted_collection_key: None,
                },
            )
            .unwrap();

        let after = drive
            .sync_collections(owner, Some(&cursor), Some(10))
            .unwrap();
        assert_eq!(after.items.len(), 1);
        assert_eq!(after.items[0].id, a.id);
        assert_eq!(after.items[0].version, a.version + 1);
    }
}
