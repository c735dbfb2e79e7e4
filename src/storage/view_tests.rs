#[cfg(test)]
mod tests {
    use crate::models::{NewUser, ProfileUpdate, RecordOutcome, ViewKey};
    use crate::storage::{SqliteStorage, Storage, StorageError};
    use std::sync::Arc;

    async fn setup_sqlite() -> Arc<dyn Storage> {
        let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
        storage.init().await.unwrap();
        Arc::new(storage)
    }

    fn new_user(handle: &str) -> NewUser {
        NewUser {
            handle: handle.to_string(),
            name: handle.to_uppercase(),
            email: format!("{handle}@example.com"),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_record_view_inserts_then_reports_present() {
        let storage = setup_sqlite().await;
        let user = storage.create_user(&new_user("alice")).await.unwrap();
        let key = ViewKey::new(user.id, "fp-1", "2024-05-01");

        assert_eq!(
            storage.record_view_if_absent(&key).await.unwrap(),
            RecordOutcome::Inserted
        );
        assert_eq!(
            storage.record_view_if_absent(&key).await.unwrap(),
            RecordOutcome::AlreadyPresent
        );
        assert_eq!(storage.count_views(user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_each_key_component_distinguishes_records() {
        let storage = setup_sqlite().await;
        let alice = storage.create_user(&new_user("alice")).await.unwrap();
        let bob = storage.create_user(&new_user("bob")).await.unwrap();

        let keys = [
            ViewKey::new(alice.id, "fp-1", "2024-05-01"),
            ViewKey::new(alice.id, "fp-2", "2024-05-01"),
            ViewKey::new(alice.id, "fp-1", "2024-05-02"),
            ViewKey::new(bob.id, "fp-1", "2024-05-01"),
        ];
        for key in &keys {
            assert_eq!(
                storage.record_view_if_absent(key).await.unwrap(),
                RecordOutcome::Inserted
            );
        }

        assert_eq!(storage.count_views(alice.id).await.unwrap(), 3);
        assert_eq!(storage.count_views(bob.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_key_fields_are_rejected() {
        let storage = setup_sqlite().await;
        let user = storage.create_user(&new_user("alice")).await.unwrap();

        let err = storage
            .record_view_if_absent(&ViewKey::new(user.id, "", "2024-05-01"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey("fingerprint")));

        let err = storage
            .record_view_if_absent(&ViewKey::new(user.id, "fp", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey("day")));

        assert_eq!(storage.count_views(user.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_count_for_profile_without_views_is_zero() {
        let storage = setup_sqlite().await;
        let user = storage.create_user(&new_user("alice")).await.unwrap();
        assert_eq!(storage.count_views(user.id).await.unwrap(), 0);
        assert!(storage.list_views(user.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_views_newest_first() {
        let storage = setup_sqlite().await;
        let user = storage.create_user(&new_user("alice")).await.unwrap();
        for day in ["2024-05-01", "2024-05-02", "2024-05-03"] {
            storage
                .record_view_if_absent(&ViewKey::new(user.id, "fp", day))
                .await
                .unwrap();
        }

        let views = storage.list_views(user.id, 2).await.unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].day, "2024-05-03");
        assert_eq!(views[1].day, "2024-05-02");
    }

    #[tokio::test]
    async fn test_create_user_conflicts_on_email_or_handle() {
        let storage = setup_sqlite().await;
        storage.create_user(&new_user("alice")).await.unwrap();

        let mut same_email = new_user("other");
        same_email.email = "alice@example.com".to_string();
        assert!(matches!(
            storage.create_user(&same_email).await,
            Err(StorageError::Conflict)
        ));

        let mut same_handle = new_user("alice");
        same_handle.email = "different@example.com".to_string();
        assert!(matches!(
            storage.create_user(&same_handle).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn test_update_profile_to_taken_handle_conflicts() {
        let storage = setup_sqlite().await;
        let alice = storage.create_user(&new_user("alice")).await.unwrap();
        storage.create_user(&new_user("bob")).await.unwrap();

        let update = ProfileUpdate {
            handle: "bob".to_string(),
            description: String::new(),
            links: "[]".to_string(),
        };
        assert!(matches!(
            storage.update_profile(alice.id, &update).await,
            Err(StorageError::Conflict)
        ));

        let update = ProfileUpdate {
            handle: "alice2".to_string(),
            description: "hello".to_string(),
            links: r#"[{"name":"x"}]"#.to_string(),
        };
        assert!(storage.update_profile(alice.id, &update).await.unwrap());
        let reloaded = storage.get_user(alice.id).await.unwrap().unwrap();
        assert_eq!(reloaded.handle, "alice2");
        assert_eq!(reloaded.description, "hello");
    }

    #[tokio::test]
    async fn test_list_profiles_pages_by_id() {
        let storage = setup_sqlite().await;
        for handle in ["a", "b", "c", "d", "e"] {
            storage.create_user(&new_user(handle)).await.unwrap();
        }

        let first = storage.list_profiles(2, None).await.unwrap();
        assert_eq!(
            first.iter().map(|p| p.handle.as_str()).collect::<Vec<_>>(),
            vec!["e", "d"]
        );

        let second = storage
            .list_profiles(2, Some(first[1].id))
            .await
            .unwrap();
        assert_eq!(
            second.iter().map(|p| p.handle.as_str()).collect::<Vec<_>>(),
            vec!["c", "b"]
        );
    }
}
