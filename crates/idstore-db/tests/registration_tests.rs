//! Registering the SQL stores in the service container.

mod common;

use std::sync::Arc;

use common::{new_id, test_role, test_user, DefaultUserStore, TestContext};
use idstore_core::{ErrorDescriber, IdentityError};
use idstore_db::models::{IdentityRole, IdentityUser};
use idstore_db::registration::IdentityBuilder;
use idstore_db::services::{ServiceCollection, ServiceLifetime};
use idstore_db::stores::{IdentityRoleStore, IdentityUserStore, UserStore};
use idstore_db::{ConnectionFactory, DefaultConnectionFactory, StoreConfig};

type User = IdentityUser<String>;
type Role = IdentityRole<String>;

fn thin(ptr: &Arc<dyn IdentityUserStore<User>>) -> *const () {
    Arc::as_ptr(ptr).cast::<()>()
}

#[tokio::test]
async fn test_add_sql_stores_registers_scoped_stores() {
    let ctx = TestContext::new().await;

    let mut services = ServiceCollection::new();
    IdentityBuilder::<User, Role>::new(&mut services).add_sql_stores(ctx.connections());

    assert!(services.contains::<dyn ConnectionFactory>());
    assert!(services.contains::<dyn ErrorDescriber>());
    assert_eq!(
        services.lifetime_of::<dyn IdentityUserStore<User>>(),
        Some(ServiceLifetime::Scoped)
    );
    assert_eq!(
        services.lifetime_of::<dyn IdentityRoleStore<Role>>(),
        Some(ServiceLifetime::Scoped)
    );

    let provider = services.build();
    let scope = provider.create_scope();
    let users = scope.required::<dyn IdentityUserStore<User>>().unwrap();
    let roles = scope.required::<dyn IdentityRoleStore<Role>>().unwrap();

    roles.create(&test_role(new_id(), "Wired")).await.unwrap();
    let user = test_user(new_id(), "wired");
    assert!(users.create(&user).await.unwrap().succeeded());
    users.add_to_role(&user, "WIRED").await.unwrap();
    assert!(users.is_in_role(&user, "WIRED").await.unwrap());

    let again = scope.required::<dyn IdentityUserStore<User>>().unwrap();
    assert_eq!(thin(&users), thin(&again));

    let other_scope = provider.create_scope();
    let other = other_scope.required::<dyn IdentityUserStore<User>>().unwrap();
    assert_ne!(thin(&users), thin(&other));
    assert!(other.find_by_id(&user.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_pre_registered_store_is_kept() {
    let ctx = TestContext::new().await;

    let mut services = ServiceCollection::new();
    services.add_scoped::<dyn IdentityUserStore<User>, _>(|_| {
        let store: DefaultUserStore<String> = DefaultUserStore::new(Arc::new(
            DefaultConnectionFactory::new(StoreConfig::in_memory()),
        ));
        store.dispose();
        Arc::new(store) as Arc<dyn IdentityUserStore<User>>
    });
    IdentityBuilder::<User, Role>::new(&mut services).add_sql_stores(ctx.connections());

    let provider = services.build();
    let scope = provider.create_scope();
    let users = scope.required::<dyn IdentityUserStore<User>>().unwrap();

    // The application's store wins; it was disposed on construction.
    let err = users.find_by_id(&new_id()).await.unwrap_err();
    assert!(err.is_disposed());

    // The role store was still registered.
    let roles = scope.required::<dyn IdentityRoleStore<Role>>().unwrap();
    assert!(roles.find_by_name("ANY").await.unwrap().is_none());
}

struct Polite;

impl ErrorDescriber for Polite {
    fn duplicate_user_name(&self, user_name: &str) -> IdentityError {
        IdentityError::new("DuplicateUserName", format!("Sorry, {user_name} is taken"))
    }
}

#[tokio::test]
async fn test_registered_describer_is_used() {
    let ctx = TestContext::new().await;

    let mut services = ServiceCollection::new();
    services.add_singleton::<dyn ErrorDescriber>(Arc::new(Polite));
    IdentityBuilder::<User, Role>::new(&mut services)
        .add_sql_stores_with_key::<String>(ctx.connections());

    let provider = services.build();
    let users = provider
        .create_scope()
        .required::<dyn IdentityUserStore<User>>()
        .unwrap();

    users.create(&test_user(new_id(), "taken")).await.unwrap();
    let result = users.create(&test_user(new_id(), "taken")).await.unwrap();
    assert_eq!(result.errors()[0].description, "Sorry, taken is taken");
}

#[tokio::test]
async fn test_integer_keyed_registration() {
    let ctx = TestContext::with_key::<i64>().await;

    let mut services = ServiceCollection::new();
    IdentityBuilder::<IdentityUser<i64>, IdentityRole<i64>>::new(&mut services)
        .add_sql_stores_with_key::<i64>(ctx.connections());

    let provider = services.build();
    let users = provider
        .required::<dyn IdentityUserStore<IdentityUser<i64>>>()
        .unwrap();
    let user = test_user(7_i64, "seven");
    assert!(users.create(&user).await.unwrap().succeeded());
    assert_eq!(users.find_by_id(&7).await.unwrap().map(|u| u.id), Some(7));
}

#[tokio::test]
async fn test_passed_factory_replaces_registered_one() {
    let ctx = TestContext::new().await;
    let stale: Arc<dyn ConnectionFactory> =
        Arc::new(DefaultConnectionFactory::new(StoreConfig::in_memory()));

    let mut services = ServiceCollection::new();
    services.add_singleton::<dyn ConnectionFactory>(Arc::clone(&stale));
    IdentityBuilder::<User, Role>::new(&mut services).add_sql_stores(ctx.connections());

    let provider = services.build();
    let resolved = provider.required::<dyn ConnectionFactory>().unwrap();
    assert_eq!(
        Arc::as_ptr(&resolved).cast::<()>(),
        Arc::as_ptr(&ctx.connections()).cast::<()>()
    );

    let users = provider
        .create_scope()
        .required::<dyn IdentityUserStore<User>>()
        .unwrap();
    assert!(users
        .create(&test_user(new_id(), "routed"))
        .await
        .unwrap()
        .succeeded());
    assert_eq!(ctx.count("users").await, 1);
}
