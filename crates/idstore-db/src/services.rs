//! A minimal service container.
//!
//! Services are registered by type (usually a trait object such as
//! `dyn IdentityUserStore<U>`) with a lifetime, then resolved from a
//! [`ServiceProvider`] or one of its [`ServiceScope`]s:
//!
//! - singletons are created once per provider and shared by every scope;
//! - scoped services are created once per scope.
//!
//! `add_*` appends a registration and the last one for a type wins.
//! `try_add_*` registers only when the type has no registration yet, so
//! applications can override library defaults regardless of call order.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use idstore_db::services::ServiceCollection;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         "hello".to_string()
//!     }
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton::<dyn Greeter>(Arc::new(English));
//!
//! let provider = services.build();
//! let greeter = provider.get::<dyn Greeter>().unwrap();
//! assert_eq!(greeter.greet(), "hello");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

type Instance = Box<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&ServiceScope) -> Instance + Send + Sync>;

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// One instance per provider.
    Singleton,
    /// One instance per scope.
    Scoped,
}

/// Resolution errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No service registered for type {type_name}")]
    NotRegistered { type_name: &'static str },
}

#[derive(Clone)]
struct Descriptor {
    type_id: TypeId,
    type_name: &'static str,
    lifetime: ServiceLifetime,
    factory: Factory,
}

impl Descriptor {
    fn new<T, F>(lifetime: ServiceLifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            lifetime,
            factory: Arc::new(move |scope: &ServiceScope| Box::new(factory(scope)) as Instance),
        }
    }
}

/// Service registrations, in registration order.
#[derive(Clone, Default)]
pub struct ServiceCollection {
    descriptors: Vec<Descriptor>,
}

impl ServiceCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Check if any registration exists for `T`.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let id = TypeId::of::<T>();
        self.descriptors.iter().any(|d| d.type_id == id)
    }

    /// Lifetime of the effective (last) registration for `T`.
    #[must_use]
    pub fn lifetime_of<T: ?Sized + 'static>(&self) -> Option<ServiceLifetime> {
        let id = TypeId::of::<T>();
        self.descriptors
            .iter()
            .rev()
            .find(|d| d.type_id == id)
            .map(|d| d.lifetime)
    }

    /// Register an existing instance as a singleton.
    pub fn add_singleton<T>(&mut self, instance: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add_singleton_with(move |_| Arc::clone(&instance))
    }

    /// Register a singleton built on first resolution.
    pub fn add_singleton_with<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Arc<T> + Send + Sync + 'static,
    {
        self.push(Descriptor::new(ServiceLifetime::Singleton, factory))
    }

    /// Register a service built once per scope.
    pub fn add_scoped<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Arc<T> + Send + Sync + 'static,
    {
        self.push(Descriptor::new(ServiceLifetime::Scoped, factory))
    }

    /// [`add_singleton`](Self::add_singleton) unless `T` is registered.
    ///
    /// Returns whether the registration was added.
    pub fn try_add_singleton<T>(&mut self, instance: Arc<T>) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.try_push(Descriptor::new(ServiceLifetime::Singleton, move |_| {
            Arc::clone(&instance)
        }))
    }

    /// [`add_scoped`](Self::add_scoped) unless `T` is registered.
    pub fn try_add_scoped<T, F>(&mut self, factory: F) -> bool
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ServiceScope) -> Arc<T> + Send + Sync + 'static,
    {
        self.try_push(Descriptor::new(ServiceLifetime::Scoped, factory))
    }

    /// Freeze the registrations into a provider.
    #[must_use]
    pub fn build(self) -> ServiceProvider {
        let mut descriptors = HashMap::with_capacity(self.descriptors.len());
        for descriptor in self.descriptors {
            descriptors.insert(descriptor.type_id, descriptor);
        }
        let registry = Arc::new(Registry {
            descriptors,
            singletons: Mutex::new(HashMap::new()),
        });
        ServiceProvider {
            root: ServiceScope::new(registry),
        }
    }

    fn push(&mut self, descriptor: Descriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    fn try_push(&mut self, descriptor: Descriptor) -> bool {
        if self
            .descriptors
            .iter()
            .any(|d| d.type_id == descriptor.type_id)
        {
            tracing::debug!(
                service = descriptor.type_name,
                "Service already registered, keeping existing registration"
            );
            return false;
        }
        self.descriptors.push(descriptor);
        true
    }
}

struct Registry {
    descriptors: HashMap<TypeId, Descriptor>,
    singletons: Mutex<HashMap<TypeId, Instance>>,
}

/// Resolves services; owns the singletons and a root scope.
pub struct ServiceProvider {
    root: ServiceScope,
}

impl ServiceProvider {
    /// Resolve `T` from the root scope.
    #[must_use]
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.root.get::<T>()
    }

    /// Resolve `T` from the root scope, failing when it is not registered.
    pub fn required<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ServiceError> {
        self.root.required::<T>()
    }

    /// Start a scope with its own scoped instances.
    #[must_use]
    pub fn create_scope(&self) -> ServiceScope {
        ServiceScope::new(Arc::clone(&self.root.registry))
    }
}

/// A unit of work. Scoped services resolved here are shared within the
/// scope and dropped with it.
pub struct ServiceScope {
    registry: Arc<Registry>,
    instances: Mutex<HashMap<TypeId, Instance>>,
}

impl ServiceScope {
    fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            instances: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let id = TypeId::of::<T>();
        let descriptor = self.registry.descriptors.get(&id)?;
        let cache = match descriptor.lifetime {
            ServiceLifetime::Singleton => &self.registry.singletons,
            ServiceLifetime::Scoped => &self.instances,
        };

        if let Some(existing) = cache.lock().get(&id) {
            return existing.downcast_ref::<Arc<T>>().cloned();
        }

        // Built outside the lock: factories resolve their own dependencies.
        let created = (descriptor.factory)(self);
        let mut cache = cache.lock();
        let instance = cache.entry(id).or_insert(created);
        instance.downcast_ref::<Arc<T>>().cloned()
    }

    pub fn required<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, ServiceError> {
        self.get::<T>().ok_or(ServiceError::NotRegistered {
            type_name: std::any::type_name::<T>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Counter: Send + Sync {
        fn id(&self) -> usize;
    }

    struct Numbered(usize);

    impl Counter for Numbered {
        fn id(&self) -> usize {
            self.0
        }
    }

    fn numbered_factory(
        next: &Arc<AtomicUsize>,
    ) -> impl Fn(&ServiceScope) -> Arc<dyn Counter> + Send + Sync + 'static {
        let next = Arc::clone(next);
        move |_: &ServiceScope| {
            Arc::new(Numbered(next.fetch_add(1, Ordering::SeqCst))) as Arc<dyn Counter>
        }
    }

    #[test]
    fn test_last_registration_wins() {
        let mut services = ServiceCollection::new();
        services
            .add_singleton::<dyn Counter>(Arc::new(Numbered(1)))
            .add_singleton::<dyn Counter>(Arc::new(Numbered(2)));
        assert_eq!(services.len(), 2);

        let provider = services.build();
        assert_eq!(provider.get::<dyn Counter>().unwrap().id(), 2);
    }

    #[test]
    fn test_try_add_keeps_existing() {
        let mut services = ServiceCollection::new();
        assert!(services.try_add_singleton::<dyn Counter>(Arc::new(Numbered(1))));
        assert!(!services.try_add_singleton::<dyn Counter>(Arc::new(Numbered(2))));
        assert_eq!(services.len(), 1);
        assert_eq!(services.lifetime_of::<dyn Counter>(), Some(ServiceLifetime::Singleton));

        let provider = services.build();
        assert_eq!(provider.required::<dyn Counter>().unwrap().id(), 1);
    }

    #[test]
    fn test_scoped_instances_per_scope() {
        let next = Arc::new(AtomicUsize::new(0));
        let mut services = ServiceCollection::new();
        services.add_scoped::<dyn Counter, _>(numbered_factory(&next));
        let provider = services.build();

        let first = provider.create_scope();
        let a = first.get::<dyn Counter>().unwrap();
        let b = first.get::<dyn Counter>().unwrap();
        assert_eq!(a.id(), b.id());

        let second = provider.create_scope();
        assert_ne!(second.get::<dyn Counter>().unwrap().id(), a.id());
        assert_eq!(next.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_singleton_shared_across_scopes() {
        let next = Arc::new(AtomicUsize::new(10));
        let mut services = ServiceCollection::new();
        services.add_singleton_with::<dyn Counter, _>(numbered_factory(&next));
        let provider = services.build();

        let a = provider.create_scope().get::<dyn Counter>().unwrap();
        let b = provider.create_scope().get::<dyn Counter>().unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(next.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_factory_resolves_dependencies() {
        let mut services = ServiceCollection::new();
        services.add_singleton::<String>(Arc::new("base".to_string()));
        services.add_scoped::<dyn Counter, _>(|scope| {
            let base = scope.get::<String>().map_or(0, |s| s.len());
            Arc::new(Numbered(base)) as Arc<dyn Counter>
        });
        let provider = services.build();
        assert_eq!(provider.create_scope().get::<dyn Counter>().unwrap().id(), 4);
    }

    #[test]
    fn test_missing_service() {
        let provider = ServiceCollection::new().build();
        assert!(provider.get::<dyn Counter>().is_none());
        let Err(err) = provider.required::<dyn Counter>() else {
            panic!("expected NotRegistered");
        };
        assert!(err.to_string().contains("Counter"));
        assert!(!ServiceCollection::new().contains::<dyn Counter>());
    }
}
