/// Generator settings
///
/// Read from `[package.metadata.installgen]` in the root crate's manifest:
///
/// ```toml
/// [package.metadata.installgen]
/// max-depth = 2
/// installer-trait = "Installer"
/// contracts-crate = "installgen_abstractions"
/// ```
///
/// Every key is optional. Command-line flags override the manifest.

use std::path::Path;
use serde::Deserialize;
use crate::cargo::manifest::Manifest;
use crate::discovery::DEFAULT_MAX_DEPTH;
use crate::emit::DEFAULT_CONTRACTS_CRATE;
use crate::error::{GenerateError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Settings {
    /// How many levels of references to follow from the root crate
    pub max_depth: usize,
    /// Name of the installer trait
    pub installer_trait: String,
    /// Name of the loader-target marker trait
    pub loader_trait: String,
    /// Name of the ordering directive trait
    pub order_trait: String,
    /// Crate generated code uses for the installer contracts
    pub contracts_crate: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            installer_trait: "Installer".to_string(),
            loader_trait: "InstallerLoader".to_string(),
            order_trait: "InstallOrder".to_string(),
            contracts_crate: DEFAULT_CONTRACTS_CRATE.to_string(),
        }
    }
}

impl Settings {
    /// Settings declared by the crate at `manifest_dir`, or the defaults.
    pub fn from_manifest_dir(manifest_dir: &Path) -> Result<Self> {
        let manifest = Manifest::read(manifest_dir)?;
        let settings = manifest
            .package
            .and_then(|package| package.metadata)
            .and_then(|metadata| metadata.installgen)
            .unwrap_or_default();
        settings.validate(&manifest_dir.join("Cargo.toml"))?;
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let names = [
            ("installer-trait", &self.installer_trait),
            ("loader-trait", &self.loader_trait),
            ("order-trait", &self.order_trait),
            ("contracts-crate", &self.contracts_crate),
        ];
        for (key, value) in names {
            if value.trim().is_empty() {
                return Err(GenerateError::manifest(
                    path,
                    format!("[package.metadata.installgen] {key} must not be empty"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let settings = Settings::from_toml("max-depth = 1").unwrap();
        assert_eq!(settings.max_depth, 1);
        assert_eq!(settings.installer_trait, "Installer");
        assert_eq!(settings.contracts_crate, "installgen_abstractions");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Settings::from_toml("max_depth = 1").is_err());
    }

    #[test]
    fn test_empty_table_is_default() {
        assert_eq!(Settings::from_toml("").unwrap(), Settings::default());
    }
}
