//! Integration tests for the SQL role store.

mod common;

use common::{new_id, test_role, TestContext};
use idstore_core::Claim;
use idstore_db::stores::{RoleClaimStore, RoleStore};
use idstore_db::StoreError;

#[tokio::test]
async fn test_create_find_update_delete() {
    let ctx = TestContext::new().await;
    let store = ctx.role_store::<String>();

    let role = test_role(new_id(), "Auditor");
    assert!(store.create(&role).await.unwrap().succeeded());

    let mut found = store.find_by_name("AUDITOR").await.unwrap().unwrap();
    assert_eq!(found, role);
    assert_eq!(store.find_by_id(&role.id).await.unwrap().as_ref(), Some(&role));

    store.set_role_name(&mut found, Some("Auditors")).unwrap();
    store
        .set_normalized_role_name(&mut found, Some("AUDITORS"))
        .unwrap();
    assert!(store.update(&mut found).await.unwrap().succeeded());
    assert_ne!(found.concurrency_stamp, role.concurrency_stamp);
    assert_eq!(store.get_role_name(&found).unwrap().as_deref(), Some("Auditors"));
    assert_eq!(
        store.get_normalized_role_name(&found).unwrap().as_deref(),
        Some("AUDITORS")
    );
    assert_eq!(store.get_role_id(&found).unwrap(), role.id);

    assert!(store.delete(&found).await.unwrap().succeeded());
    assert!(store.find_by_id(&role.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_role_update_fails() {
    let ctx = TestContext::new().await;
    let store = ctx.role_store::<String>();

    let role = test_role(new_id(), "Racer");
    store.create(&role).await.unwrap();

    let mut first = store.find_by_id(&role.id).await.unwrap().unwrap();
    let mut second = first.clone();
    first.name = Some("First".to_string());
    second.name = Some("Second".to_string());

    assert!(store.update(&mut first).await.unwrap().succeeded());
    let result = store.update(&mut second).await.unwrap();
    assert!(result.has_error("ConcurrencyFailure"));

    // Deleting with the stale stamp fails too.
    assert!(store
        .delete(&second)
        .await
        .unwrap()
        .has_error("ConcurrencyFailure"));

    let stored = store.find_by_id(&role.id).await.unwrap().unwrap();
    assert_eq!(stored.name.as_deref(), Some("First"));
}

#[tokio::test]
async fn test_duplicate_role_name() {
    let ctx = TestContext::new().await;
    let store = ctx.role_store::<String>();

    store.create(&test_role(new_id(), "Twin")).await.unwrap();
    let result = store.create(&test_role(new_id(), "twin")).await.unwrap();
    assert!(!result.succeeded());
    assert!(result.has_error("DuplicateRoleName"));
    assert_eq!(ctx.count("roles").await, 1);
}

#[tokio::test]
async fn test_role_claims() {
    let ctx = TestContext::new().await;
    let store = ctx.role_store::<String>();

    let role = test_role(new_id(), "Claimed");
    let other = test_role(new_id(), "Other");
    store.create(&role).await.unwrap();
    store.create(&other).await.unwrap();

    let read = Claim::new("perm", "read");
    let write = Claim::new("perm", "write");
    store.add_claim(&role, &read).await.unwrap();
    store.add_claim(&role, &write).await.unwrap();
    store.add_claim(&other, &read).await.unwrap();

    assert_eq!(store.get_claims(&role).await.unwrap().len(), 2);

    store.remove_claim(&role, &read).await.unwrap();
    assert_eq!(store.get_claims(&role).await.unwrap(), vec![write]);
    assert_eq!(store.get_claims(&other).await.unwrap(), vec![read]);

    // Deleting the role removes its claims.
    let role = store.find_by_id(&role.id).await.unwrap().unwrap();
    store.delete(&role).await.unwrap();
    assert_eq!(ctx.count("role_claims").await, 1);
}

#[tokio::test]
async fn test_disposed_role_store() {
    let ctx = TestContext::new().await;
    let store = ctx.role_store::<String>();
    let mut role = test_role(new_id(), "Gone");
    store.create(&role).await.unwrap();

    store.dispose();
    assert!(store.is_disposed());
    store.dispose();
    assert!(store.is_disposed());

    let disposed = |err: StoreError| assert!(err.is_disposed(), "unexpected error: {err}");
    disposed(store.create(&role).await.unwrap_err());
    disposed(store.update(&mut role).await.unwrap_err());
    disposed(store.delete(&role).await.unwrap_err());
    disposed(store.find_by_id(&role.id).await.unwrap_err());
    disposed(store.find_by_name("").await.unwrap_err());
    disposed(store.get_role_id(&role).unwrap_err());
    disposed(store.get_role_name(&role).unwrap_err());
    disposed(store.set_role_name(&mut role, None).unwrap_err());
    disposed(store.get_normalized_role_name(&role).unwrap_err());
    disposed(store.set_normalized_role_name(&mut role, None).unwrap_err());
    disposed(store.get_claims(&role).await.unwrap_err());
    disposed(store.add_claim(&role, &Claim::new("", "")).await.unwrap_err());
    disposed(store.remove_claim(&role, &Claim::new("", "")).await.unwrap_err());
}

#[tokio::test]
async fn test_role_argument_validation() {
    let ctx = TestContext::new().await;
    let store = ctx.role_store::<String>();
    let role = test_role(new_id(), "Strict");
    store.create(&role).await.unwrap();

    let err = store.find_by_name("").await.unwrap_err();
    assert_eq!(err.argument_name(), Some("normalized_role_name"));

    let err = store
        .add_claim(&role, &Claim::new("", "v"))
        .await
        .unwrap_err();
    assert_eq!(err.argument_name(), Some("claim"));
}
