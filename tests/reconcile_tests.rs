//! Admin reconciliation against the SQL-backed user store.

use std::sync::Arc;

use kitchen_hub::config::SecurityConfig;
use kitchen_hub::db::Store;
use kitchen_hub::services::{
    Argon2Hasher, CredentialHasher, DesiredAdmin, NewUser, ReconcileResult, StoreError,
    UserStore, UserTransaction, reconcile, reconcile_with_retry,
};

fn hasher() -> Arc<dyn CredentialHasher> {
    Arc::new(
        Argon2Hasher::new(&SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        })
        .unwrap(),
    )
}

async fn store() -> Store {
    Store::new("sqlite::memory:").await.unwrap()
}

fn desired() -> DesiredAdmin {
    DesiredAdmin::new("admin", "admin@x.com", "admin123")
}

#[tokio::test]
async fn test_creates_then_updates_in_place() {
    let store = store().await;
    let hasher = hasher();
    let users = store.user_store();

    let first = reconcile(&users, hasher.clone(), &desired()).await.unwrap();
    assert!(matches!(first, ReconcileResult::Created { .. }));

    let second = reconcile(&users, hasher.clone(), &desired()).await.unwrap();
    assert_eq!(
        second,
        ReconcileResult::Updated {
            user_id: first.user_id()
        }
    );

    assert_eq!(store.user_count().await.unwrap(), 1);
    let (user, hash) = store
        .get_user_by_username_with_password("admin")
        .await
        .unwrap()
        .unwrap();
    assert!(user.is_admin);
    assert_eq!(user.id, first.user_id());
    assert!(hasher.verify("admin123", &hash).unwrap());
}

#[tokio::test]
async fn test_resets_forgotten_password_and_promotes() {
    let store = store().await;
    let hasher = hasher();

    let old_hash = hasher.hash("oldpass").unwrap();
    let existing = store
        .create_user("admin", "kitchen@old.example", old_hash, false)
        .await
        .unwrap();

    let result = reconcile(&store.user_store(), hasher.clone(), &desired())
        .await
        .unwrap();
    assert_eq!(
        result,
        ReconcileResult::Updated {
            user_id: existing.id
        }
    );

    let (user, hash) = store
        .get_user_by_username_with_password("admin")
        .await
        .unwrap()
        .unwrap();
    assert!(user.is_admin);
    assert_eq!(user.email, "kitchen@old.example");
    assert!(!hasher.verify("oldpass", &hash).unwrap());
    assert!(hasher.verify("admin123", &hash).unwrap());
}

#[tokio::test]
async fn test_reset_email_overwrites_stored_email() {
    let store = store().await;
    let hasher = hasher();
    store
        .create_user("admin", "kitchen@old.example", hasher.hash("x").unwrap(), true)
        .await
        .unwrap();

    reconcile(
        &store.user_store(),
        hasher,
        &desired().with_reset_email(true),
    )
    .await
    .unwrap();

    let user = store.get_user_by_username("admin").await.unwrap().unwrap();
    assert_eq!(user.email, "admin@x.com");
}

#[tokio::test]
async fn test_customers_are_untouched() {
    let store = store().await;
    let hasher = hasher();
    let customer_hash = hasher.hash("password123").unwrap();
    store
        .create_user("john_doe", "john@example.com", customer_hash.clone(), false)
        .await
        .unwrap();

    reconcile(&store.user_store(), hasher, &desired())
        .await
        .unwrap();

    let (john, hash) = store
        .get_user_by_username_with_password("john_doe")
        .await
        .unwrap()
        .unwrap();
    assert!(!john.is_admin);
    assert_eq!(hash, customer_hash);
    assert_eq!(store.user_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_sql_store_enforces_unique_username() {
    let store = store().await;
    let users = store.user_store();

    let new_user = |email: &str| NewUser {
        username: "admin".to_string(),
        email: email.to_string(),
        password_hash: "hash".to_string(),
        is_admin: true,
    };

    let mut txn = users.begin().await.unwrap();
    txn.insert(new_user("a@x.com")).await.unwrap();
    let err = txn.insert(new_user("b@x.com")).await.unwrap_err();
    assert!(matches!(err, StoreError::UniqueViolation(_)));
    drop(txn);

    // The dropped transaction rolled back its first insert too
    assert_eq!(store.user_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_reconciles_create_once() {
    let store = store().await;
    let hasher = hasher();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let users = store.user_store();
            let hasher = hasher.clone();
            tokio::spawn(async move { reconcile_with_retry(&users, hasher, &desired()).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if matches!(
            handle.await.unwrap().unwrap(),
            ReconcileResult::Created { .. }
        ) {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(store.user_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_reconciles_on_file_database() {
    let dir = std::env::temp_dir().join(format!("kitchen-hub-{}", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}/app.db?mode=rwc", dir.display());
    let store = Store::with_pool_options(&url, 5, 1).await.unwrap();
    let hasher = hasher();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let users = store.user_store();
            let hasher = hasher.clone();
            tokio::spawn(async move { reconcile_with_retry(&users, hasher, &desired()).await })
        })
        .collect();

    let mut created = 0;
    let mut updated = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(ReconcileResult::Created { .. }) => created += 1,
            Ok(ReconcileResult::Updated { .. }) => updated += 1,
            other => panic!("unexpected reconcile outcome: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(updated, 7);
    assert_eq!(store.user_count().await.unwrap(), 1);

    store.conn.close().await.unwrap();
    let _ = std::fs::remove_dir_all(&dir);
}
