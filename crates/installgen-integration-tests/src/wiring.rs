use std::sync::Arc;
use installgen_abstractions::{BoxError, Container, ContainerExt, InstallOrder, Installer, InstallerLoader};

pub struct Loader;

impl InstallerLoader for Loader {}

impl InstallOrder for Loader {
    const MODULES: &'static [&'static str] = &["fixture-beta", "installgen-integration-tests"];
}

include!(concat!(env!("OUT_DIR"), "/wiring_loader_installers.rs"));

#[derive(Debug, PartialEq, Eq)]
pub struct CoreConfig {
    pub name: String,
}

/// Marker registered by [`BrokenInstaller`] before it fails
#[derive(Debug, Default)]
pub struct Attempted;

pub struct CoreInstaller;

impl Installer for CoreInstaller {
    fn install(&self, container: &mut dyn Container) -> Result<(), BoxError> {
        container.bind_instance(Arc::new(CoreConfig {
            name: "core".to_string(),
        }));
        Ok(())
    }
}

pub struct BrokenInstaller;

impl Installer for BrokenInstaller {
    fn install(&self, container: &mut dyn Container) -> Result<(), BoxError> {
        container.bind::<Attempted, Attempted>();
        Err("database unreachable".into())
    }
}

// Not picked up by the generator.

#[allow(dead_code)]
pub(crate) struct HiddenInstaller;

impl Installer for HiddenInstaller {
    fn install(&self, _container: &mut dyn Container) -> Result<(), BoxError> {
        Err("hidden installers are not public".into())
    }
}

pub struct NeedsArgsInstaller {
    pub name: String,
}

impl Installer for NeedsArgsInstaller {
    fn install(&self, _container: &mut dyn Container) -> Result<(), BoxError> {
        Err(format!("{} needs arguments", self.name).into())
    }
}

pub struct GenericInstaller<T>(pub T);

impl<T> Installer for GenericInstaller<T> {
    fn install(&self, _container: &mut dyn Container) -> Result<(), BoxError> {
        Err("generic installers have no single type".into())
    }
}
