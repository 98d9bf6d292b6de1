//! The stores behave the same whatever the key type.

mod common;

use std::sync::atomic::{AtomicI64, Ordering};

use common::{test_role, test_user, TestContext};
use idstore_core::{Claim, UserLoginInfo};
use idstore_db::stores::{
    RoleClaimStore, RoleStore, UserClaimStore, UserLoginStore, UserRoleStore, UserStore,
};
use idstore_db::IdentityKey;

async fn exercise_stores<K: IdentityKey>(mut next_id: impl FnMut() -> K) {
    let ctx = TestContext::with_key::<K>().await;
    let users = ctx.user_store::<K>();
    let roles = ctx.role_store::<K>();

    let user = test_user(next_id(), "keyed");
    assert!(users.create(&user).await.unwrap().succeeded());
    assert_eq!(users.find_by_id(&user.id).await.unwrap().as_ref(), Some(&user));
    assert_eq!(users.get_user_id(&user).unwrap(), user.id);

    let role = test_role(next_id(), "Keyed");
    assert!(roles.create(&role).await.unwrap().succeeded());
    roles
        .add_claim(&role, &Claim::new("perm", "read"))
        .await
        .unwrap();
    assert_eq!(roles.get_claims(&role).await.unwrap().len(), 1);

    users.add_to_role(&user, "KEYED").await.unwrap();
    assert!(users.is_in_role(&user, "KEYED").await.unwrap());

    users
        .add_claims(&user, &[Claim::new("c", "v")])
        .await
        .unwrap();
    assert_eq!(users.get_claims(&user).await.unwrap(), vec![Claim::new("c", "v")]);

    users
        .add_login(&user, &UserLoginInfo::new("provider", "key", None))
        .await
        .unwrap();
    let found = users
        .find_by_login("provider", "key")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, user.id);

    let mut copy = found.clone();
    copy.phone_number = Some("1".to_string());
    assert!(users.update(&mut copy).await.unwrap().succeeded());
    let mut stale = found;
    assert!(users
        .update(&mut stale)
        .await
        .unwrap()
        .has_error("ConcurrencyFailure"));

    assert!(users.delete(&copy).await.unwrap().succeeded());
    assert!(users.find_by_id(&user.id).await.unwrap().is_none());
    assert_eq!(ctx.count("user_roles").await, 0);
}

#[tokio::test]
async fn test_integer_keys() {
    let next = AtomicI64::new(1);
    exercise_stores::<i64>(|| next.fetch_add(1, Ordering::SeqCst)).await;
}

#[tokio::test]
async fn test_small_integer_keys() {
    let mut next = 0_i32;
    exercise_stores::<i32>(|| {
        next += 1;
        next
    })
    .await;
}

#[tokio::test]
async fn test_uuid_keys() {
    exercise_stores::<uuid::Uuid>(uuid::Uuid::new_v4).await;
}

#[tokio::test]
async fn test_string_keys() {
    exercise_stores::<String>(common::new_id).await;
}
