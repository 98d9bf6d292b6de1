//! idstore Database Layer
//!
//! User and role stores for the idstore identity model, persisted through
//! `sqlx`.
//!
//! # Modules
//!
//! - [`config`] - Store configuration from the environment
//! - [`connection`] - Data providers and the connection factory
//! - [`mapping`] - Table definitions and the `Entity` trait
//! - [`models`] - Users, roles and their associations
//! - [`migrations`] - Table lifecycle for the identity schema
//! - [`stores`] - Store capabilities and their SQL implementations
//! - [`services`] - Service container
//! - [`registration`] - Registering the stores in the container
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use idstore_db::models::{IdentityRole, IdentityUser};
//! use idstore_db::registration::IdentityBuilder;
//! use idstore_db::services::ServiceCollection;
//! use idstore_db::stores::{IdentityUserStore, UserStore};
//! use idstore_db::{DefaultConnectionFactory, StoreConfig};
//!
//! let factory = Arc::new(DefaultConnectionFactory::new(StoreConfig::from_env()?));
//!
//! let mut services = ServiceCollection::new();
//! IdentityBuilder::<IdentityUser<String>, IdentityRole<String>>::new(&mut services)
//!     .add_sql_stores(factory);
//!
//! let provider = services.build();
//! let scope = provider.create_scope();
//! let users = scope.required::<dyn IdentityUserStore<IdentityUser<String>>>()?;
//! let alice = users.find_by_name("ALICE").await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod key;
pub mod mapping;
pub mod migrations;
pub mod models;
pub mod registration;
pub mod services;
pub mod stores;

pub use config::{ConfigError, StoreConfig};
pub use connection::{ConnectionFactory, DataConnection, DataProvider, DefaultConnectionFactory};
pub use error::{DbError, StoreError, StoreResult};
pub use key::{new_stamp, IdentityKey};
pub use mapping::{Entity, Table};
pub use migrations::{
    create_default_tables, create_identity_tables, drop_default_tables, drop_identity_tables,
};
pub use registration::IdentityBuilder;
pub use services::{ServiceCollection, ServiceError, ServiceLifetime, ServiceProvider, ServiceScope};

// Re-export the value types stores exchange with callers.
pub use idstore_core::{
    Claim, DefaultErrorDescriber, ErrorDescriber, IdentityError, IdentityResult, UserLoginInfo,
};
