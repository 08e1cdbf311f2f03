/// The parts of `Cargo.toml` the generator reads

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use serde::Deserialize;
use crate::config::Settings;
use crate::error::{GenerateError, Result};
use crate::model::ModuleRef;

#[derive(Debug, Default, Deserialize)]
pub struct Manifest {
    pub package: Option<Package>,
    pub lib: Option<LibTarget>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, Dependency>,
    pub workspace: Option<WorkspaceSection>,
    /// Where the manifest was read from
    #[serde(skip)]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Package {
    pub name: String,
    pub metadata: Option<PackageMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageMetadata {
    pub installgen: Option<Settings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LibTarget {
    pub name: Option<String>,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Dependency {
    Version(String),
    Detailed(DetailedDependency),
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailedDependency {
    pub path: Option<PathBuf>,
    pub package: Option<String>,
    #[serde(default)]
    pub workspace: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceSection {
    #[serde(default)]
    pub dependencies: BTreeMap<String, Dependency>,
}

impl Manifest {
    /// Read `Cargo.toml` from `dir`
    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join("Cargo.toml");
        let text = fs::read_to_string(&path).map_err(|e| GenerateError::io(&path, e))?;
        let mut manifest: Manifest =
            toml::from_str(&text).map_err(|e| GenerateError::manifest(&path, e.to_string()))?;
        manifest.path = path;
        Ok(manifest)
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    pub fn package_name(&self) -> Result<&str> {
        self.package
            .as_ref()
            .map(|p| p.name.as_str())
            .ok_or_else(|| GenerateError::manifest(&self.path, "no [package] section"))
    }

    /// Identifier the crate is referred to by in Rust code
    pub fn crate_ident(&self) -> Result<String> {
        let name = match self.lib.as_ref().and_then(|lib| lib.name.as_deref()) {
            Some(name) => name,
            None => self.package_name()?,
        };
        Ok(name.replace('-', "_"))
    }

    /// The file type enumeration starts from: the library target, else the
    /// default binary target
    pub fn entry_point(&self) -> Result<PathBuf> {
        let dir = self.dir();
        if let Some(path) = self.lib.as_ref().and_then(|lib| lib.path.as_ref()) {
            return Ok(dir.join(path));
        }
        ["src/lib.rs", "src/main.rs"]
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| GenerateError::manifest(&self.path, "no library or binary target found"))
    }

    /// Dependencies that resolve to a local path. Registry and git
    /// dependencies are outside the module graph.
    ///
    /// A dependency renamed with `package = ...` keeps its key as the
    /// reference's alias, since that is the name code uses for it.
    pub fn path_references(&self) -> Vec<ModuleRef> {
        let mut workspace: Option<Option<Manifest>> = None;
        let mut references = Vec::new();

        for (key, dependency) in &self.dependencies {
            let Dependency::Detailed(detail) = dependency else {
                continue;
            };

            let (package, path) = if let Some(path) = &detail.path {
                (detail.package.clone(), join_normalized(self.dir(), path))
            } else if detail.workspace {
                let root = workspace.get_or_insert_with(|| self.find_workspace());
                match root.as_ref().and_then(|ws| ws.workspace_path(key)) {
                    Some((package, path)) => (detail.package.clone().or(package), path),
                    None => {
                        tracing::trace!(dependency = %key, "workspace dependency is not a path dependency");
                        continue;
                    }
                }
            } else {
                continue;
            };

            let reference = match package {
                Some(package) if package != *key => ModuleRef::at(package, path).renamed(key.clone()),
                Some(package) => ModuleRef::at(package, path),
                None => ModuleRef::at(key.clone(), path),
            };
            references.push(reference);
        }

        references
    }

    /// Path of a `[workspace.dependencies]` entry, with its package rename
    fn workspace_path(&self, key: &str) -> Option<(Option<String>, PathBuf)> {
        let section = self.workspace.as_ref()?;
        match section.dependencies.get(key)? {
            Dependency::Detailed(DetailedDependency {
                path: Some(path),
                package,
                ..
            }) => Some((package.clone(), join_normalized(self.dir(), path))),
            _ => None,
        }
    }

    /// The closest enclosing manifest with a `[workspace]` table
    fn find_workspace(&self) -> Option<Manifest> {
        self.dir()
            .ancestors()
            .skip(1)
            .filter(|dir| dir.join("Cargo.toml").is_file())
            .filter_map(|dir| Manifest::read(dir).ok())
            .find(|manifest| manifest.workspace.is_some())
    }
}

/// Join `rel` onto `base`, folding `.` and `..` components
fn join_normalized(base: &Path, rel: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(rel).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir if matches!(out.components().next_back(), Some(Component::Normal(_))) => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Manifest {
        let mut manifest: Manifest = toml::from_str(text).unwrap();
        manifest.path = PathBuf::from("/ws/host/Cargo.toml");
        manifest
    }

    #[test]
    fn test_crate_ident_prefers_lib_name() {
        let manifest = parse(
            r#"
[package]
name = "host-app"

[lib]
name = "host"
"#,
        );
        assert_eq!(manifest.crate_ident().unwrap(), "host");
    }

    #[test]
    fn test_crate_ident_from_package() {
        let manifest = parse("[package]\nname = \"host-app\"\n");
        assert_eq!(manifest.crate_ident().unwrap(), "host_app");
    }

    #[test]
    fn test_only_path_dependencies_are_references() {
        let manifest = parse(
            r#"
[package]
name = "host"
version = { workspace = true }

[dependencies]
serde = "1.0"
tokio = { version = "1", features = ["full"] }
alpha = { path = "../alpha" }
renamed = { path = "../beta", package = "fixture-beta" }

[dev-dependencies]
gamma = { path = "../gamma" }
"#,
        );
        let references = manifest.path_references();
        assert_eq!(
            references,
            vec![
                ModuleRef::at("alpha", "/ws/alpha"),
                ModuleRef::at("fixture-beta", "/ws/beta").renamed("renamed"),
            ]
        );
    }

    #[test]
    fn test_join_normalized() {
        assert_eq!(join_normalized(Path::new("/ws/host"), Path::new("./../alpha")), PathBuf::from("/ws/alpha"));
        assert_eq!(join_normalized(Path::new("host"), Path::new("../../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_virtual_manifest_has_no_package() {
        let manifest = parse("[workspace]\nmembers = [\"crates/*\"]\n");
        assert!(manifest.package_name().is_err());
    }
}
