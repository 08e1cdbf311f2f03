/// Container registration contract
///
/// The core only needs three ways to bind a service: to an implementation
/// type, to a shared instance, or to a factory. Everything else (lifetimes,
/// resolution strategy, scoping) belongs to the container implementation.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

/// A type-erased service value. Always holds an `Arc<S>` for the service `S`
/// it was registered under.
pub type Service = Box<dyn Any + Send + Sync>;

/// A type-erased factory closure.
pub type Factory = Box<dyn Fn(&dyn Container) -> Service + Send + Sync>;

/// Identifies a service type, which may be unsized (`dyn Trait`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    id: TypeId,
    name: &'static str,
}

impl ServiceKey {
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name for display purposes only
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// How a service is provided
pub enum Registration {
    /// Instantiated on demand from the implementation's `Default`
    Type {
        implementation: &'static str,
        construct: fn() -> Service,
    },
    /// A single shared instance
    Instance(Service),
    /// Built by calling the factory with the container
    Factory(Factory),
}

impl Registration {
    pub fn kind(&self) -> &'static str {
        match self {
            Registration::Type { .. } => "type",
            Registration::Instance(_) => "instance",
            Registration::Factory(_) => "factory",
        }
    }

    /// Produce the service this registration describes.
    ///
    /// Returns `None` when `S` is not the service type the registration was
    /// created for.
    pub fn instantiate<S>(&self, container: &dyn Container) -> Option<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        match self {
            Registration::Type { construct, .. } => unwrap_service(construct()),
            Registration::Instance(instance) => instance.downcast_ref::<Arc<S>>().cloned(),
            Registration::Factory(factory) => unwrap_service(factory(container)),
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Registration::Type { implementation, .. } => f
                .debug_struct("Type")
                .field("implementation", implementation)
                .finish_non_exhaustive(),
            Registration::Instance(_) => f.write_str("Instance(..)"),
            Registration::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

fn unwrap_service<S: ?Sized + Send + Sync + 'static>(service: Service) -> Option<Arc<S>> {
    service.downcast::<Arc<S>>().ok().map(|boxed| *boxed)
}

fn construct<S, I>() -> Service
where
    S: ?Sized + Send + Sync + 'static,
    I: Default + Into<Arc<S>>,
{
    Box::new(I::default().into())
}

/// The registration primitive every container implements.
///
/// Kept object safe so installers can receive `&mut dyn Container`; the
/// typed operations live on [`ContainerExt`].
pub trait Container {
    fn register(&mut self, service: ServiceKey, registration: Registration);
}

/// Typed registration operations, available on every [`Container`].
///
/// Services are shared as `Arc<S>`. Binding a trait object needs a
/// conversion from the implementation, e.g.
/// `impl From<EnglishGreeter> for Arc<dyn Greeter>`; binding a concrete
/// type to itself works out of the box.
pub trait ContainerExt: Container {
    /// Bind `S` to the implementation type `I`, built on demand.
    fn bind<S, I>(&mut self)
    where
        S: ?Sized + Send + Sync + 'static,
        I: Default + Into<Arc<S>> + 'static,
    {
        self.register(
            ServiceKey::of::<S>(),
            Registration::Type {
                implementation: type_name::<I>(),
                construct: construct::<S, I>,
            },
        );
    }

    /// Bind `S` to a shared instance.
    fn bind_instance<S>(&mut self, instance: Arc<S>)
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register(ServiceKey::of::<S>(), Registration::Instance(Box::new(instance)));
    }

    /// Bind `S` to a factory taking the container.
    fn bind_factory<S, F>(&mut self, factory: F)
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&dyn Container) -> Arc<S> + Send + Sync + 'static,
    {
        let factory: Factory = Box::new(move |container: &dyn Container| -> Service {
            Box::new(factory(container))
        });
        self.register(ServiceKey::of::<S>(), Registration::Factory(factory));
    }
}

impl<C: Container + ?Sized> ContainerExt for C {}
