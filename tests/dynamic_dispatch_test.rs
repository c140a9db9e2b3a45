use clubpay::domain::ports::{CredentialStore, CredentialStoreArc};
use clubpay::infrastructure::file_store::FileCredentialStore;
use clubpay::infrastructure::in_memory::InMemoryCredentialStore;
use std::sync::Arc;

#[tokio::test]
async fn test_credential_stores_as_trait_objects() {
    let dir = tempfile::tempdir().unwrap();
    let stores: Vec<CredentialStoreArc> = vec![
        Arc::new(InMemoryCredentialStore::new()),
        Arc::new(FileCredentialStore::open(dir.path().join("auth.json")).unwrap()),
    ];

    for store in stores {
        let mut feed = store.subscribe();

        // Verify Send + Sync by writing from another task
        let writer = store.clone();
        tokio::spawn(async move { writer.set("tok-1", "Anna").await.unwrap() })
            .await
            .unwrap();

        feed.changed().await.unwrap();
        assert_eq!(
            feed.borrow().as_ref().map(|c| c.token().to_string()),
            Some("tok-1".to_string())
        );
        assert_eq!(store.current_user_name().await.unwrap().as_deref(), Some("Anna"));
    }
}
