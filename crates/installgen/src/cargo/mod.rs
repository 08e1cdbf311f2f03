/// Cargo packages as modules
///
/// A module is a package; its references are the dependencies that resolve
/// to a local path. Types come from parsing the package's library target
/// with `syn`.

mod build_script;
pub mod manifest;
pub mod scan;

use std::path::PathBuf;
use crate::config::Settings;
use crate::error::{GenerateError, Result};
use crate::model::{ModuleContents, ModuleNode, ModuleRef};
use crate::source::ModuleSource;
use self::manifest::Manifest;

pub use build_script::generate_loaders;
pub use scan::{CrateScan, TraitNames, scan_crate};

impl From<&Settings> for TraitNames {
    fn from(settings: &Settings) -> Self {
        Self {
            installer: settings.installer_trait.clone(),
            loader: settings.loader_trait.clone(),
            order: settings.order_trait.clone(),
        }
    }
}

/// [`ModuleSource`] over Cargo packages on disk
#[derive(Debug, Clone)]
pub struct CargoSource {
    root_dir: PathBuf,
    traits: TraitNames,
}

impl CargoSource {
    /// Source rooted at the package whose `Cargo.toml` is in `root_dir`
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            traits: TraitNames::default(),
        }
    }

    pub fn with_traits(mut self, traits: TraitNames) -> Self {
        self.traits = traits;
        self
    }

    pub fn root_dir(&self) -> &std::path::Path {
        &self.root_dir
    }

    fn node(manifest: &Manifest) -> Result<ModuleNode> {
        Ok(ModuleNode {
            name: manifest.package_name()?.to_string(),
            references: manifest.path_references(),
            location: Some(manifest.dir().to_path_buf()),
        })
    }

    fn manifest_of(module: &ModuleNode) -> Result<Manifest> {
        let dir = module.location.as_ref().ok_or_else(|| GenerateError::ModuleNotFound {
            module: module.name.clone(),
            from: "a module without a location".to_string(),
        })?;
        Manifest::read(dir)
    }

    fn scan_package(&self, module: &ModuleNode) -> Result<(Manifest, CrateScan)> {
        let manifest = Self::manifest_of(module)?;
        let entry = manifest.entry_point()?;
        let crate_ident = manifest.crate_ident()?;
        let scan = scan_crate(&entry, &crate_ident, &self.traits)?;
        Ok((manifest, scan))
    }
}

impl ModuleSource for CargoSource {
    fn load_root(&self) -> Result<ModuleNode> {
        Self::node(&Manifest::read(&self.root_dir)?)
    }

    fn load(&self, reference: &ModuleRef) -> Result<ModuleNode> {
        let dir = reference.location.as_ref().ok_or_else(|| GenerateError::ModuleNotFound {
            module: reference.name.clone(),
            from: self.root_dir.display().to_string(),
        })?;
        Self::node(&Manifest::read(dir)?)
    }

    fn scan(&self, module: &ModuleNode) -> Result<ModuleContents> {
        let (manifest, scan) = self.scan_package(module)?;
        let mut inputs = scan.files;
        inputs.push(manifest.path);
        Ok(ModuleContents {
            namespace: scan.namespace,
            inputs,
            loaders: scan.loaders,
        })
    }
}
