/// Installer and loader-target contracts

use crate::container::Container;
use crate::error::BoxError;

/// A unit of registrations contributed by one crate.
///
/// To be picked up by the generator an installer must be a public,
/// non-generic type that is either a unit struct or implements `Default`.
pub trait Installer {
    fn install(&self, container: &mut dyn Container) -> Result<(), BoxError>;
}

/// Marks the type a loader is generated for.
///
/// ```ignore
/// pub struct Loader;
/// impl InstallerLoader for Loader {}
/// include!(concat!(env!("OUT_DIR"), "/loader_installers.rs"));
/// ```
pub trait InstallerLoader {}

/// Explicit module priority for a loader target.
///
/// Installers from crates listed in `MODULES` run first, in list order.
/// `MODULES` must be written as an array of string literals so it can be
/// read at build time.
pub trait InstallOrder: InstallerLoader {
    const MODULES: &'static [&'static str];
}
