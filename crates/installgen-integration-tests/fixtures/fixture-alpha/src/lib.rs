/// Fixture package with a stateful installer and an inherited capability.

use std::sync::Arc;
use installgen_abstractions::{BoxError, Container, ContainerExt, Installer};

pub trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

pub struct English {
    greeting: String,
}

impl Greeter for English {
    fn greet(&self) -> String {
        self.greeting.clone()
    }
}

/// Constructed through `Default`, so the generated loader calls
/// `AlphaInstaller::default()`.
#[derive(Debug)]
pub struct AlphaInstaller {
    greeting: String,
}

impl Default for AlphaInstaller {
    fn default() -> Self {
        Self {
            greeting: "hello".to_string(),
        }
    }
}

impl Installer for AlphaInstaller {
    fn install(&self, container: &mut dyn Container) -> Result<(), BoxError> {
        let greeting = self.greeting.clone();
        container.bind_factory::<dyn Greeter, _>(move |_| {
            Arc::new(English {
                greeting: greeting.clone(),
            }) as Arc<dyn Greeter>
        });
        Ok(())
    }
}

/// Never generated: traits are not instantiable.
pub trait FeatureInstaller: Installer {}

/// Implements the installer trait directly and through
/// [`FeatureInstaller`]; recorded once.
pub struct FeatureFlags;

impl FeatureInstaller for FeatureFlags {}

impl Installer for FeatureFlags {
    fn install(&self, container: &mut dyn Container) -> Result<(), BoxError> {
        container.bind_instance(Arc::new(FeatureFlags));
        Ok(())
    }
}
