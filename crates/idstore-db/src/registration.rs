//! Wiring the SQL stores into a [`ServiceCollection`].
//!
//! The store types are closed over the key, user, role and association types
//! at compile time and registered behind `dyn IdentityUserStore<U>` and
//! `dyn IdentityRoleStore<R>` as scoped services. Store registrations use
//! "add if not already present" semantics, so a store registered by the
//! application beforehand is kept. The connection factory passed in always
//! replaces an earlier one.
//!
//! When built, each store picks up the `dyn ConnectionFactory` and
//! `dyn ErrorDescriber` registered in the container, plus a
//! `dyn UserEntityFactory<..>` / `dyn RoleEntityFactory<..>` if one was
//! registered for the exact association types.

use std::marker::PhantomData;
use std::sync::Arc;

use idstore_core::{DefaultErrorDescriber, ErrorDescriber};

use crate::connection::ConnectionFactory;
use crate::key::IdentityKey;
use crate::models::{
    IdentityRoleClaim, IdentityUserClaim, IdentityUserLogin, IdentityUserRole, IdentityUserToken,
    RoleClaimEntity, RoleEntity, UserClaimEntity, UserEntity, UserLoginEntity, UserRoleEntity,
    UserTokenEntity,
};
use crate::services::{ServiceCollection, ServiceScope};
use crate::stores::{
    DefaultEntityFactory, IdentityRoleStore, IdentityUserStore, RoleEntityFactory, SqlRoleStore,
    SqlUserStore, UserEntityFactory,
};

/// Registers identity services for the user type `U` and role type `R`.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use idstore_db::models::{IdentityRole, IdentityUser};
/// use idstore_db::registration::IdentityBuilder;
/// use idstore_db::services::ServiceCollection;
/// use idstore_db::stores::IdentityUserStore;
///
/// let mut services = ServiceCollection::new();
/// IdentityBuilder::<IdentityUser<String>, IdentityRole<String>>::new(&mut services)
///     .add_sql_stores(Arc::new(factory));
///
/// let provider = services.build();
/// let scope = provider.create_scope();
/// let users = scope.get::<dyn IdentityUserStore<IdentityUser<String>>>();
/// ```
pub struct IdentityBuilder<'a, U, R> {
    services: &'a mut ServiceCollection,
    _marker: PhantomData<fn() -> (U, R)>,
}

impl<'a, U, R> IdentityBuilder<'a, U, R>
where
    U: UserEntity,
    R: RoleEntity<Key = U::Key>,
{
    pub fn new(services: &'a mut ServiceCollection) -> Self {
        Self {
            services,
            _marker: PhantomData,
        }
    }

    pub fn services(&mut self) -> &mut ServiceCollection {
        &mut *self.services
    }

    /// Registers stores using the standard association types keyed by `K`.
    pub fn add_sql_stores_with_key<K>(self, connections: Arc<dyn ConnectionFactory>) -> Self
    where
        K: IdentityKey,
        U: UserEntity<Key = K>,
        R: RoleEntity<Key = K>,
    {
        self.add_sql_stores_with::<
            K,
            IdentityUserClaim<K>,
            IdentityUserRole<K>,
            IdentityUserLogin<K>,
            IdentityUserToken<K>,
            IdentityRoleClaim<K>,
        >(connections)
    }

    /// Registers stores for an explicit set of association types.
    pub fn add_sql_stores_with<K, UC, UR, UL, UT, RC>(
        self,
        connections: Arc<dyn ConnectionFactory>,
    ) -> Self
    where
        K: IdentityKey,
        U: UserEntity<Key = K>,
        R: RoleEntity<Key = K>,
        UC: UserClaimEntity<Key = K>,
        UR: UserRoleEntity<Key = K>,
        UL: UserLoginEntity<Key = K>,
        UT: UserTokenEntity<Key = K>,
        RC: RoleClaimEntity<Key = K>,
    {
        self.services
            .add_singleton::<dyn ConnectionFactory>(Arc::clone(&connections));
        self.services
            .try_add_singleton::<dyn ErrorDescriber>(Arc::new(DefaultErrorDescriber));

        let fallback = Arc::clone(&connections);
        let build_users = move |scope: &ServiceScope| {
            let entities = scope
                .get::<dyn UserEntityFactory<K, UC, UR, UL, UT>>()
                .unwrap_or_else(|| Arc::new(DefaultEntityFactory));
            let connections = resolve_connections(scope, &fallback);
            let store = SqlUserStore::<K, U, R, UC, UR, UL, UT>::new(connections)
                .with_describer(resolve_describer(scope))
                .with_entity_factory(entities);
            Arc::new(store) as Arc<dyn IdentityUserStore<U>>
        };
        let user_store = self
            .services
            .try_add_scoped::<dyn IdentityUserStore<U>, _>(build_users);

        let fallback = connections;
        let build_roles = move |scope: &ServiceScope| {
            let entities = scope
                .get::<dyn RoleEntityFactory<K, RC>>()
                .unwrap_or_else(|| Arc::new(DefaultEntityFactory));
            let connections = resolve_connections(scope, &fallback);
            let store = SqlRoleStore::<K, R, RC>::new(connections)
                .with_describer(resolve_describer(scope))
                .with_entity_factory(entities);
            Arc::new(store) as Arc<dyn IdentityRoleStore<R>>
        };
        let role_store = self
            .services
            .try_add_scoped::<dyn IdentityRoleStore<R>, _>(build_roles);

        tracing::debug!(
            user = std::any::type_name::<U>(),
            role = std::any::type_name::<R>(),
            user_store,
            role_store,
            "Registered SQL identity stores"
        );
        self
    }
}

impl<'a, U, R> IdentityBuilder<'a, U, R>
where
    U: UserEntity<Key = String>,
    R: RoleEntity<Key = String>,
{
    /// Registers stores with string keys and the standard association types.
    pub fn add_sql_stores(self, connections: Arc<dyn ConnectionFactory>) -> Self {
        self.add_sql_stores_with_key::<String>(connections)
    }
}

fn resolve_connections(
    scope: &ServiceScope,
    fallback: &Arc<dyn ConnectionFactory>,
) -> Arc<dyn ConnectionFactory> {
    scope
        .get::<dyn ConnectionFactory>()
        .unwrap_or_else(|| Arc::clone(fallback))
}

fn resolve_describer(scope: &ServiceScope) -> Arc<dyn ErrorDescriber> {
    scope
        .get::<dyn ErrorDescriber>()
        .unwrap_or_else(|| Arc::new(DefaultErrorDescriber))
}
