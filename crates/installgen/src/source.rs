/// Host metadata access
///
/// The engine never reads files or compiler state itself. A [`ModuleSource`]
/// answers three questions: what is the root module, what does a reference
/// resolve to, and what does a module declare. Scanning the root also
/// yields its loader targets.

use std::collections::BTreeMap;
use crate::diagnostic::Location;
use crate::error::{GenerateError, Result};
use crate::model::{LoaderTarget, ModuleContents, ModuleNode, ModuleRef, Namespace, module_key};

/// An ordering directive found on a type that is not a loader target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrayDirective {
    pub type_name: String,
    pub location: Option<Location>,
}

/// Loader targets declared in the root module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoaderScan {
    pub targets: Vec<LoaderTarget>,
    pub stray_directives: Vec<StrayDirective>,
}

pub trait ModuleSource {
    fn load_root(&self) -> Result<ModuleNode>;

    /// Resolve a reference declared by another module
    fn load(&self, reference: &ModuleRef) -> Result<ModuleNode>;

    /// Enumerate the types declared by a module, and its loader targets
    fn scan(&self, module: &ModuleNode) -> Result<ModuleContents>;

    fn loader_targets(&self, root: &ModuleNode) -> Result<LoaderScan> {
        Ok(self.scan(root)?.loaders)
    }
}

impl<S: ModuleSource + ?Sized> ModuleSource for &S {
    fn load_root(&self) -> Result<ModuleNode> {
        (**self).load_root()
    }

    fn load(&self, reference: &ModuleRef) -> Result<ModuleNode> {
        (**self).load(reference)
    }

    fn scan(&self, module: &ModuleNode) -> Result<ModuleContents> {
        (**self).scan(module)
    }

    fn loader_targets(&self, root: &ModuleNode) -> Result<LoaderScan> {
        (**self).loader_targets(root)
    }
}

#[derive(Debug, Clone)]
struct GraphModule {
    name: String,
    references: Vec<String>,
    contents: std::result::Result<Namespace, String>,
}

/// An in-memory module graph, for hosts that already hold their metadata.
///
/// ```
/// use installgen::{ModuleGraph, Namespace, TypeDecl, LoaderTarget};
///
/// let graph = ModuleGraph::new("host")
///     .module("host", Namespace::new("host"), &["alpha"])
///     .module("alpha", Namespace::new("alpha").with_type(TypeDecl::installer("AlphaInstaller")), &[])
///     .target(LoaderTarget::new("Loader", "host"));
/// ```
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    root: String,
    modules: BTreeMap<String, GraphModule>,
    scan: LoaderScan,
}

impl ModuleGraph {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            modules: BTreeMap::new(),
            scan: LoaderScan::default(),
        }
    }

    pub fn module(mut self, name: impl Into<String>, namespace: Namespace, references: &[&str]) -> Self {
        let name = name.into();
        self.modules.insert(
            module_key(&name),
            GraphModule {
                name,
                references: references.iter().map(|r| r.to_string()).collect(),
                contents: Ok(namespace),
            },
        );
        self
    }

    /// A module whose type enumeration fails with `reason`
    pub fn broken_module(mut self, name: impl Into<String>, references: &[&str], reason: impl Into<String>) -> Self {
        let name = name.into();
        self.modules.insert(
            module_key(&name),
            GraphModule {
                name,
                references: references.iter().map(|r| r.to_string()).collect(),
                contents: Err(reason.into()),
            },
        );
        self
    }

    pub fn target(mut self, target: LoaderTarget) -> Self {
        self.scan.targets.push(target);
        self
    }

    pub fn stray_directive(mut self, type_name: impl Into<String>) -> Self {
        self.scan.stray_directives.push(StrayDirective {
            type_name: type_name.into(),
            location: None,
        });
        self
    }

    fn node(&self, name: &str, from: &str) -> Result<ModuleNode> {
        let module = self
            .modules
            .get(&module_key(name))
            .ok_or_else(|| GenerateError::ModuleNotFound {
                module: name.to_string(),
                from: from.to_string(),
            })?;
        Ok(ModuleNode {
            name: module.name.clone(),
            references: module.references.iter().map(ModuleRef::named).collect(),
            location: None,
        })
    }
}

impl ModuleSource for ModuleGraph {
    fn load_root(&self) -> Result<ModuleNode> {
        self.node(&self.root, "<root>")
    }

    fn load(&self, reference: &ModuleRef) -> Result<ModuleNode> {
        self.node(&reference.name, "module graph")
    }

    fn scan(&self, module: &ModuleNode) -> Result<ModuleContents> {
        let entry = self
            .modules
            .get(&module.key())
            .ok_or_else(|| GenerateError::ModuleNotFound {
                module: module.name.clone(),
                from: "module graph".to_string(),
            })?;
        let loaders = if module.key() == module_key(&self.root) {
            self.scan.clone()
        } else {
            LoaderScan::default()
        };
        match &entry.contents {
            Ok(namespace) => Ok(ModuleContents {
                namespace: namespace.clone(),
                inputs: Vec::new(),
                loaders,
            }),
            Err(reason) => Err(GenerateError::ModuleAnalysis {
                module: module.name.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TypeDecl;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let graph = ModuleGraph::new("Host").module("host", Namespace::new("host"), &["Alpha"]);
        let root = graph.load_root().unwrap();
        assert_eq!(root.name, "host");
        assert_eq!(root.references, vec![ModuleRef::named("Alpha")]);
    }

    #[test]
    fn test_missing_module_is_an_error() {
        let graph = ModuleGraph::new("host").module("host", Namespace::new("host"), &[]);
        let err = graph.load(&ModuleRef::named("ghost")).unwrap_err();
        assert!(matches!(err, GenerateError::ModuleNotFound { .. }));
    }

    #[test]
    fn test_broken_module_fails_scan_only() {
        let graph = ModuleGraph::new("host").broken_module("host", &[], "metadata unreadable");
        let root = graph.load_root().unwrap();
        assert!(graph.scan(&root).is_err());
    }

    #[test]
    fn test_loader_targets_come_from_root_scan() {
        let graph = ModuleGraph::new("host")
            .module("host", Namespace::new("host"), &["alpha"])
            .module("alpha", Namespace::new("alpha"), &[])
            .target(LoaderTarget::new("Loader", "host"));
        let root = graph.load_root().unwrap();
        assert_eq!(graph.loader_targets(&root).unwrap().targets.len(), 1);

        let alpha = graph.load(&ModuleRef::named("alpha")).unwrap();
        assert!(graph.scan(&alpha).unwrap().loaders.targets.is_empty());
    }

    #[test]
    fn test_scan_returns_namespace() {
        let ns = Namespace::new("host").with_type(TypeDecl::installer("A"));
        let graph = ModuleGraph::new("host").module("host", ns.clone(), &[]);
        let root = graph.load_root().unwrap();
        assert_eq!(graph.scan(&root).unwrap().namespace, ns);
    }
}
