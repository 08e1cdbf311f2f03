/// Installer discovery over the module-reference graph
///
/// Breadth-first from the root module, down to `max_depth` levels of
/// references. Each module is scanned at most once; each installer is
/// recorded at most once, under the module it was first found in.
///
/// All traversal state lives in a [`PassContext`] owned by a single call,
/// so independent passes never share anything mutable.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use crate::diagnostic::Diagnostic;
use crate::error::Result;
use crate::model::{
    Accessibility, CandidateType, Construction, InstallerRecord, ModuleContents, ModuleNode, Namespace, TypeShape,
    module_key,
};
use crate::source::ModuleSource;

pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Result of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Records in discovery order (not yet resolved)
    pub records: Vec<InstallerRecord>,
    /// Modules scanned, in traversal order, with their depth
    pub modules: Vec<(String, usize)>,
    /// Files the host read while scanning
    pub inputs: BTreeSet<PathBuf>,
}

/// Why the validity filter rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Abstract,
    Static,
    NotPublic,
    NotInstaller,
    NoDefaultConstructor,
}

/// Decide whether a candidate is a usable installer, and how to build it.
pub fn validate(candidate: &CandidateType<'_>) -> std::result::Result<Construction, Rejection> {
    let decl = candidate.decl;
    if decl.is_abstract {
        return Err(Rejection::Abstract);
    }
    if decl.is_static {
        return Err(Rejection::Static);
    }
    if decl.accessibility != Accessibility::Public {
        return Err(Rejection::NotPublic);
    }
    if !decl.implements_installer {
        return Err(Rejection::NotInstaller);
    }
    match decl.shape {
        TypeShape::Value => Ok(Construction::Literal),
        TypeShape::Reference if decl.has_default_constructor => Ok(Construction::Default),
        TypeShape::Reference => Err(Rejection::NoDefaultConstructor),
    }
}

/// Traversal state for one pass.
struct PassContext {
    processed: HashSet<String>,
    discovered: HashSet<String>,
    /// Renamed dependencies of the root, by module key
    extern_names: HashMap<String, String>,
    discovery: Discovery,
    diagnostics: Vec<Diagnostic>,
}

impl PassContext {
    fn new(root: &ModuleNode) -> Self {
        // generated code lives in the root, so only its renames apply
        let extern_names = root
            .references
            .iter()
            .filter_map(|r| Some((module_key(&r.name), r.alias.as_ref()?.replace('-', "_"))))
            .collect();
        Self {
            processed: HashSet::new(),
            discovered: HashSet::new(),
            extern_names,
            discovery: Discovery::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Mark a module as processed. Returns false if it already was.
    fn claim(&mut self, name: &str) -> bool {
        self.processed.insert(module_key(name))
    }

    fn is_processed(&self, name: &str) -> bool {
        self.processed.contains(&module_key(name))
    }

    fn scan_module(&mut self, module: &ModuleNode, depth: usize, contents: Result<ModuleContents>) {
        self.discovery.modules.push((module.name.clone(), depth));
        match contents {
            Ok(contents) => {
                self.discovery.inputs.extend(contents.inputs);
                let before = self.discovery.records.len();
                let mut path = Vec::new();
                self.collect(&module.name, &contents.namespace, &mut path);
                tracing::debug!(
                    module = %module.name,
                    depth,
                    types = contents.namespace.type_count(),
                    installers = self.discovery.records.len() - before,
                    "scanned module"
                );
            }
            Err(err) => {
                tracing::debug!(module = %module.name, "module scan failed: {}", err);
                self.diagnostics.push(Diagnostic::module_scan(&module.name, &err));
            }
        }
    }

    /// Recursive descent over nested namespaces.
    fn collect<'n>(&mut self, module: &str, namespace: &'n Namespace, path: &mut Vec<&'n str>) {
        if !namespace.name.is_empty() {
            path.push(&namespace.name);
        }

        for decl in &namespace.types {
            let mut segments = path.clone();
            segments.push(&decl.name);
            let fqn = segments.join("::");
            let candidate = CandidateType {
                fqn: &fqn,
                module,
                decl,
            };
            match validate(&candidate) {
                Ok(construction) => {
                    if self.discovered.insert(fqn.clone()) {
                        self.discovery.records.push(InstallerRecord {
                            fqn,
                            module: module.to_string(),
                            construction,
                            extern_name: self.extern_names.get(&module_key(module)).cloned(),
                        });
                    } else {
                        tracing::trace!(%fqn, "installer already discovered");
                    }
                }
                Err(reason) => {
                    if decl.implements_installer {
                        tracing::trace!(
                            fqn = candidate.fqn,
                            module = candidate.module,
                            ?reason,
                            location = ?decl.location,
                            "installer candidate rejected"
                        );
                    }
                }
            }
        }

        for child in &namespace.children {
            self.collect(module, child, path);
        }

        if !namespace.name.is_empty() {
            path.pop();
        }
    }
}

/// Discover every installer reachable from `root` within `max_depth`
/// reference levels.
///
/// The root is depth 0. A module at depth `d < max_depth` enqueues its
/// unprocessed references at `d + 1`; a module at `max_depth` is scanned but
/// its references are not followed.
pub fn discover<S: ModuleSource + ?Sized>(
    source: &S,
    root: &ModuleNode,
    max_depth: usize,
) -> (Discovery, Vec<Diagnostic>) {
    traverse(source, root, source.scan(root), max_depth)
}

/// [`discover`] for a root module the caller has already scanned.
pub fn discover_scanned<S: ModuleSource + ?Sized>(
    source: &S,
    root: &ModuleNode,
    contents: ModuleContents,
    max_depth: usize,
) -> (Discovery, Vec<Diagnostic>) {
    traverse(source, root, Ok(contents), max_depth)
}

fn traverse<S: ModuleSource + ?Sized>(
    source: &S,
    root: &ModuleNode,
    root_contents: Result<ModuleContents>,
    max_depth: usize,
) -> (Discovery, Vec<Diagnostic>) {
    let mut cx = PassContext::new(root);
    let mut queue = VecDeque::new();
    let mut root_contents = Some(root_contents);

    cx.claim(&root.name);
    queue.push_back((root.clone(), 0usize));

    while let Some((module, depth)) = queue.pop_front() {
        let contents = match root_contents.take() {
            Some(contents) => contents,
            None => source.scan(&module),
        };
        cx.scan_module(&module, depth, contents);

        if depth >= max_depth {
            continue;
        }

        for reference in &module.references {
            if cx.is_processed(&reference.name) {
                continue;
            }
            cx.claim(&reference.name);

            match source.load(reference) {
                Ok(node) => {
                    // the loaded name can differ from the declared one
                    if node.key() != module_key(&reference.name) && !cx.claim(&node.name) {
                        continue;
                    }
                    queue.push_back((node, depth + 1));
                }
                Err(err) => {
                    tracing::debug!(reference = %reference.name, "reference not analyzable: {}", err);
                    cx.diagnostics.push(Diagnostic::reference_analysis(&reference.name, &err));
                }
            }
        }
    }

    tracing::debug!(
        modules = cx.discovery.modules.len(),
        installers = cx.discovery.records.len(),
        "discovery finished"
    );

    (cx.discovery, cx.diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::model::TypeDecl;
    use crate::source::ModuleGraph;

    fn candidate(decl: &TypeDecl) -> CandidateType<'_> {
        CandidateType {
            fqn: "m::T",
            module: "m",
            decl,
        }
    }

    #[test]
    fn test_filter_accepts_default_constructible_installer() {
        let decl = TypeDecl::installer("T");
        assert_eq!(validate(&candidate(&decl)), Ok(Construction::Default));
    }

    #[test]
    fn test_filter_accepts_value_types_without_constructor() {
        let decl = TypeDecl::installer("T").value();
        assert_eq!(validate(&candidate(&decl)), Ok(Construction::Literal));
    }

    #[test]
    fn test_filter_rejections() {
        let cases = [
            (TypeDecl::installer("T").abstract_type(), Rejection::Abstract),
            (TypeDecl::installer("T").static_type(), Rejection::Static),
            (
                TypeDecl::installer("T").with_accessibility(Accessibility::Crate),
                Rejection::NotPublic,
            ),
            (
                TypeDecl::installer("T").with_accessibility(Accessibility::Private),
                Rejection::NotPublic,
            ),
            (TypeDecl::plain("T"), Rejection::NotInstaller),
            (
                TypeDecl::installer("T").without_default_constructor(),
                Rejection::NoDefaultConstructor,
            ),
        ];
        for (decl, expected) in cases {
            assert_eq!(validate(&candidate(&decl)), Err(expected), "{decl:?}");
        }
    }

    #[test]
    fn test_nested_namespaces_build_fqn() {
        let graph = ModuleGraph::new("app").module(
            "app",
            Namespace::new("app").with_child(
                Namespace::new("wiring").with_child(Namespace::new("db").with_type(TypeDecl::installer("DbInstaller"))),
            ),
            &[],
        );
        let root = graph.load_root().unwrap();
        let (discovery, diagnostics) = discover(&graph, &root, DEFAULT_MAX_DEPTH);
        assert!(diagnostics.is_empty());
        assert_eq!(discovery.records, vec![InstallerRecord::new("app::wiring::db::DbInstaller", "app")]);
    }

    #[test]
    fn test_cycles_are_visited_once() {
        let graph = ModuleGraph::new("a")
            .module("a", Namespace::new("a").with_type(TypeDecl::installer("A")), &["b"])
            .module("b", Namespace::new("b").with_type(TypeDecl::installer("B")), &["a"]);
        let root = graph.load_root().unwrap();
        let (discovery, _) = discover(&graph, &root, 10);
        assert_eq!(discovery.modules, vec![("a".to_string(), 0), ("b".to_string(), 1)]);
        assert_eq!(discovery.records.len(), 2);
    }

    #[test]
    fn test_unloadable_reference_is_a_warning() {
        let graph = ModuleGraph::new("a")
            .module("a", Namespace::new("a"), &["ghost", "b"])
            .module("b", Namespace::new("b").with_type(TypeDecl::installer("B")), &[]);
        let root = graph.load_root().unwrap();
        let (discovery, diagnostics) = discover(&graph, &root, DEFAULT_MAX_DEPTH);

        assert_eq!(discovery.records.len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::ReferenceAnalysis);
        assert!(diagnostics[0].message.contains("ghost"));
    }

    #[test]
    fn test_zero_depth_scans_root_only() {
        let graph = ModuleGraph::new("a")
            .module("a", Namespace::new("a").with_type(TypeDecl::installer("A")), &["b"])
            .module("b", Namespace::new("b").with_type(TypeDecl::installer("B")), &[]);
        let root = graph.load_root().unwrap();
        let (discovery, _) = discover(&graph, &root, 0);
        assert_eq!(discovery.records, vec![InstallerRecord::new("a::A", "a")]);
    }

    /// Refers to every dependency of the root under the name `renamed`
    struct RenamingRoot(ModuleGraph);

    impl ModuleSource for RenamingRoot {
        fn load_root(&self) -> Result<ModuleNode> {
            let mut root = self.0.load_root()?;
            for reference in &mut root.references {
                reference.alias = Some("renamed-lib".to_string());
            }
            Ok(root)
        }

        fn load(&self, reference: &crate::model::ModuleRef) -> Result<ModuleNode> {
            self.0.load(reference)
        }

        fn scan(&self, module: &ModuleNode) -> Result<ModuleContents> {
            self.0.scan(module)
        }
    }

    #[test]
    fn test_root_renames_reach_records() {
        let source = RenamingRoot(
            ModuleGraph::new("app")
                .module("app", Namespace::new("app").with_type(TypeDecl::installer("A")), &["lib-core"])
                .module("lib-core", Namespace::new("lib_core").with_type(TypeDecl::installer("L")), &["deep"])
                .module("deep", Namespace::new("deep").with_type(TypeDecl::installer("D")), &[]),
        );
        let root = source.load_root().unwrap();
        let (discovery, _) = discover(&source, &root, DEFAULT_MAX_DEPTH);

        assert_eq!(
            discovery.records,
            vec![
                InstallerRecord::new("app::A", "app"),
                InstallerRecord::new("lib_core::L", "lib-core").extern_name("renamed_lib"),
                InstallerRecord::new("deep::D", "deep"),
            ]
        );
    }

    #[test]
    fn test_scanned_root_is_not_scanned_again() {
        let graph = ModuleGraph::new("a")
            .module("a", Namespace::new("a").with_type(TypeDecl::installer("A")), &["b"])
            .module("b", Namespace::new("b").with_type(TypeDecl::installer("B")), &[]);
        let root = graph.load_root().unwrap();
        // contents handed in win over what the source would report
        let contents = ModuleContents {
            namespace: Namespace::new("a").with_type(TypeDecl::installer("Prescanned")),
            ..ModuleContents::default()
        };
        let (discovery, _) = discover_scanned(&graph, &root, contents, DEFAULT_MAX_DEPTH);
        let fqns: Vec<_> = discovery.records.iter().map(|r| r.fqn.as_str()).collect();
        assert_eq!(fqns, ["a::Prescanned", "b::B"]);
    }
}
