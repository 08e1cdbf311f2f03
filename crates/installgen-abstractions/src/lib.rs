/// Contracts shared by installer crates and generated loaders.
///
/// An installer is any public type implementing [`Installer`] that can be
/// constructed without arguments. The `installgen` build step finds every
/// such type in the dependency graph of a host crate and writes a
/// `load_all` function for each type marked with [`InstallerLoader`].
/// The generated function calls the installers directly, in a fixed order,
/// and reports failures through [`AggregateInstallError`].

mod container;
mod error;
mod installer;

pub use container::{Container, ContainerExt, Factory, Registration, Service, ServiceKey};
pub use error::{AggregateInstallError, BoxError, InstallerError};
pub use installer::{InstallOrder, Installer, InstallerLoader};
