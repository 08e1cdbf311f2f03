/// Data model for one generation pass
///
/// Modules, the type declarations they contain, the installer records kept
/// after filtering, and the loader targets that asked for generated code.

use std::path::PathBuf;
use crate::diagnostic::Location;
use crate::source::LoaderScan;

/// Normalized module identity.
///
/// Module names compare case-insensitively and treat `-` and `_` as the
/// same character, so a Cargo package name matches its crate identifier.
pub fn module_key(name: &str) -> String {
    name.trim().to_lowercase().replace('-', "_")
}

/// A reference from one module to another, as declared by the referencing
/// module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRef {
    pub name: String,
    /// Where the host can find the referenced module, if it knows
    pub location: Option<PathBuf>,
    /// Name the referencing module uses for it in code, when renamed
    pub alias: Option<String>,
}

impl ModuleRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            alias: None,
        }
    }

    pub fn at(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: Some(location.into()),
            alias: None,
        }
    }

    pub fn renamed(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// A module found during traversal. Depth is tracked by the traversal, not
/// stored here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleNode {
    pub name: String,
    pub references: Vec<ModuleRef>,
    pub location: Option<PathBuf>,
}

impl ModuleNode {
    pub fn key(&self) -> String {
        module_key(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessibility {
    Public,
    /// `pub(crate)`
    Crate,
    /// `pub(super)`, `pub(in path)`, or public inside a private module
    Restricted,
    Private,
}

/// Whether a type can be constructed without any constructor at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    /// Constructed by naming it (unit structs)
    Value,
    /// Needs an explicit zero-argument constructor
    Reference,
}

/// A type declaration as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: String,
    pub accessibility: Accessibility,
    pub shape: TypeShape,
    pub is_abstract: bool,
    pub is_static: bool,
    /// Has an accessible zero-argument construction path (`Default`)
    pub has_default_constructor: bool,
    /// Implements the installer capability, directly or through a subtrait
    pub implements_installer: bool,
    pub location: Option<Location>,
}

impl TypeDecl {
    /// A public installer with a default constructor.
    pub fn installer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accessibility: Accessibility::Public,
            shape: TypeShape::Reference,
            is_abstract: false,
            is_static: false,
            has_default_constructor: true,
            implements_installer: true,
            location: None,
        }
    }

    /// A public type that is not an installer.
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            implements_installer: false,
            ..Self::installer(name)
        }
    }

    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    pub fn value(mut self) -> Self {
        self.shape = TypeShape::Value;
        self.has_default_constructor = false;
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn static_type(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn without_default_constructor(mut self) -> Self {
        self.has_default_constructor = false;
        self
    }
}

/// A namespace (Rust module) and everything declared in it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespace {
    pub name: String,
    pub types: Vec<TypeDecl>,
    pub children: Vec<Namespace>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_type(mut self, decl: TypeDecl) -> Self {
        self.types.push(decl);
        self
    }

    pub fn with_child(mut self, child: Namespace) -> Self {
        self.children.push(child);
        self
    }

    /// Get or create the nested namespace at `path`
    pub fn child_mut(&mut self, path: &[String]) -> &mut Namespace {
        let Some((first, rest)) = path.split_first() else {
            return self;
        };
        let index = match self.children.iter().position(|c| &c.name == first) {
            Some(index) => index,
            None => {
                self.children.push(Namespace::new(first.clone()));
                self.children.len() - 1
            }
        };
        self.children[index].child_mut(rest)
    }

    /// Total number of type declarations, nested namespaces included
    pub fn type_count(&self) -> usize {
        self.types.len() + self.children.iter().map(Namespace::type_count).sum::<usize>()
    }
}

/// What a module scan produced.
#[derive(Debug, Clone, Default)]
pub struct ModuleContents {
    pub namespace: Namespace,
    /// Files read to produce this scan
    pub inputs: Vec<PathBuf>,
    /// Loader targets found in the module. Only read for the root.
    pub loaders: LoaderScan,
}

/// A type under consideration by the validity filter.
#[derive(Debug, Clone, Copy)]
pub struct CandidateType<'a> {
    pub fqn: &'a str,
    pub module: &'a str,
    pub decl: &'a TypeDecl,
}

/// How generated code constructs an installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construction {
    /// Name the value directly (`path::Installer`)
    Literal,
    /// `<path::Installer as Default>::default()`
    Default,
}

/// A discovered installer. Unique by fully-qualified name within one pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstallerRecord {
    pub fqn: String,
    pub module: String,
    pub construction: Construction,
    /// Crate name the root module uses for the owning crate, when its
    /// dependency is renamed
    pub extern_name: Option<String>,
}

impl InstallerRecord {
    pub fn new(fqn: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            fqn: fqn.into(),
            module: module.into(),
            construction: Construction::Default,
            extern_name: None,
        }
    }

    pub fn literal(mut self) -> Self {
        self.construction = Construction::Literal;
        self
    }

    pub fn extern_name(mut self, name: impl Into<String>) -> Self {
        self.extern_name = Some(name.into());
        self
    }
}

/// The ordering directive as declared on a loader target, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrderDirective {
    #[default]
    Absent,
    Declared(Vec<String>),
    /// Present but not readable as a list of module names
    Malformed(String),
}

/// A type that requested a generated loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderTarget {
    pub name: String,
    /// Path of the module declaring the target, starting with the crate
    pub module_path: String,
    pub order: OrderDirective,
    pub location: Option<Location>,
}

impl LoaderTarget {
    pub fn new(name: impl Into<String>, module_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module_path: module_path.into(),
            order: OrderDirective::Absent,
            location: None,
        }
    }

    pub fn ordered<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = OrderDirective::Declared(modules.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_order(mut self, order: OrderDirective) -> Self {
        self.order = order;
        self
    }

    /// First segment of the module path: the crate the target lives in
    pub fn crate_name(&self) -> &str {
        self.module_path.split("::").next().unwrap_or_default()
    }

    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}::{}", self.module_path, self.name)
        }
    }
}
