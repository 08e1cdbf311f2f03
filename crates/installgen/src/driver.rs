/// Generation driver that runs one pass over a module source

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use crate::config::Settings;
use crate::diagnostic::{Diagnostic, Reporter};
use crate::discovery::{DEFAULT_MAX_DEPTH, discover_scanned};
use crate::emit::{DEFAULT_CONTRACTS_CRATE, LoaderEmitter, file_name};
use crate::error::{GenerateError, Result};
use crate::model::{InstallerRecord, LoaderTarget};
use crate::order::{OrderSpec, resolve};
use crate::source::ModuleSource;

/// Where a pass, or one loader target within it, has got to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    NotStarted,
    Traversing,
    Resolving,
    Emitting,
    Done,
    Failed,
}

/// Options for generation
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Reference levels followed from the root module
    pub max_depth: usize,
    /// Crate generated code names the installer contracts through
    pub contracts_crate: String,
    /// Log every resolved installer
    pub verbose: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            contracts_crate: DEFAULT_CONTRACTS_CRATE.to_string(),
            verbose: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .max_depth(settings.max_depth)
            .contracts_crate(settings.contracts_crate.clone())
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn contracts_crate(mut self, name: impl Into<String>) -> Self {
        self.contracts_crate = name.into();
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Generated source for one loader target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedLoader {
    pub target: LoaderTarget,
    /// File name the source should be written under
    pub file_name: String,
    /// Installers in invocation order
    pub installers: Vec<InstallerRecord>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    /// Qualified name of the loader target
    pub target: String,
    pub state: PassState,
}

/// Everything one pass produced
#[derive(Debug, Clone)]
pub struct GenerateOutput {
    pub state: PassState,
    pub loaders: Vec<GeneratedLoader>,
    pub reports: Vec<TargetReport>,
    /// Installers discovered, in discovery order
    pub discovered: Vec<InstallerRecord>,
    /// Files read during the pass
    pub inputs: BTreeSet<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for GenerateOutput {
    fn default() -> Self {
        Self {
            state: PassState::NotStarted,
            loaders: Vec::new(),
            reports: Vec::new(),
            discovered: Vec::new(),
            inputs: BTreeSet::new(),
            diagnostics: Vec::new(),
        }
    }
}

impl GenerateOutput {
    /// True if any Error diagnostic was produced.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn report(&self, reporter: &mut dyn Reporter) {
        for diagnostic in &self.diagnostics {
            reporter.report(diagnostic);
        }
    }

    /// Generated loader for the target with the given simple name
    pub fn loader(&self, name: &str) -> Option<&GeneratedLoader> {
        self.loaders.iter().find(|loader| loader.target.name == name)
    }

    /// Write every loader into `dir`. Files whose contents are already
    /// identical are left untouched. Returns the paths written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| GenerateError::io(dir, e))?;

        let mut written = Vec::new();
        for loader in &self.loaders {
            let path = dir.join(&loader.file_name);
            if fs::read_to_string(&path).is_ok_and(|existing| existing == loader.source) {
                tracing::debug!(path = %path.display(), "loader unchanged");
                continue;
            }
            fs::write(&path, &loader.source).map_err(|e| GenerateError::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// The installer loader generator
pub struct Generator<S> {
    source: S,
    options: GenerateOptions,
}

impl<S: ModuleSource> Generator<S> {
    pub fn new(source: S, options: GenerateOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Run one generation pass.
    ///
    /// Never fails as a whole: every problem ends up as a diagnostic in the
    /// output. A pass with no loader targets produces nothing.
    pub fn run(&self) -> GenerateOutput {
        let mut output = GenerateOutput::default();
        self.enter(&mut output.state, PassState::Traversing, "<pass>");

        let root = match self.source.load_root() {
            Ok(root) => root,
            Err(err) => {
                output.diagnostics.push(Diagnostic::engine_fault("<root>", &err));
                self.enter(&mut output.state, PassState::Failed, "<pass>");
                return output;
            }
        };

        let mut contents = match self.source.scan(&root) {
            Ok(contents) => contents,
            Err(err) => {
                output.diagnostics.push(Diagnostic::engine_fault(&root.name, &err));
                self.enter(&mut output.state, PassState::Failed, "<pass>");
                return output;
            }
        };
        let scan = std::mem::take(&mut contents.loaders);

        for stray in &scan.stray_directives {
            output
                .diagnostics
                .push(Diagnostic::ignored_install_order(&stray.type_name).at(stray.location.clone()));
        }

        if scan.targets.is_empty() {
            tracing::info!(root = %root.name, "no loader targets, nothing to generate");
            self.enter(&mut output.state, PassState::Done, "<pass>");
            return output;
        }

        let (discovery, diagnostics) = discover_scanned(&self.source, &root, contents, self.options.max_depth);
        let modules = discovery.modules.len();
        output.diagnostics.extend(diagnostics);
        output.inputs = discovery.inputs;
        output.discovered = discovery.records;

        let mut file_names = HashSet::new();
        for target in &scan.targets {
            let name = target.qualified_name();
            let generated = if file_names.insert(file_name(target)) {
                self.generate_target(target, &output.discovered)
            } else {
                let err = GenerateError::codegen(format!(
                    "output file `{}` is already generated for another loader target",
                    file_name(target)
                ));
                Err(Diagnostic::engine_fault(&name, &err).at(target.location.clone()))
            };
            match generated {
                Ok(loader) => {
                    output.reports.push(TargetReport {
                        target: name,
                        state: PassState::Done,
                    });
                    output.loaders.push(loader);
                }
                Err(diagnostic) => {
                    tracing::debug!(loader = %name, "loader target failed");
                    output.diagnostics.push(diagnostic);
                    output.reports.push(TargetReport {
                        target: name,
                        state: PassState::Failed,
                    });
                }
            }
        }

        let state = if output.loaders.is_empty() {
            PassState::Failed
        } else {
            PassState::Done
        };
        self.enter(&mut output.state, state, "<pass>");

        tracing::info!(
            root = %root.name,
            modules,
            installers = output.discovered.len(),
            loaders = output.loaders.len(),
            failed = output.reports.len() - output.loaders.len(),
            "generation pass finished"
        );
        output
    }

    /// Resolve and emit one target against the shared discovery result
    fn generate_target(
        &self,
        target: &LoaderTarget,
        discovered: &[InstallerRecord],
    ) -> std::result::Result<GeneratedLoader, Diagnostic> {
        let name = target.qualified_name();
        let mut state = PassState::Traversing;

        self.enter(&mut state, PassState::Resolving, &name);
        let spec = OrderSpec::from_directive(&target.order)
            .map_err(|err| Diagnostic::invalid_install_order(&name, &err).at(target.location.clone()))?;
        let installers = resolve(discovered.iter().cloned(), spec.as_ref());

        if self.options.verbose {
            for (index, record) in installers.iter().enumerate() {
                tracing::info!(loader = %name, "{}. {} ({})", index + 1, record.fqn, record.module);
            }
        }

        self.enter(&mut state, PassState::Emitting, &name);
        let source = LoaderEmitter::with_contracts_crate(&self.options.contracts_crate)
            .emit(target, &installers)
            .map_err(|err| Diagnostic::engine_fault(&name, &err).at(target.location.clone()))?;

        self.enter(&mut state, PassState::Done, &name);
        Ok(GeneratedLoader {
            target: target.clone(),
            file_name: file_name(target),
            installers,
            source,
        })
    }

    fn enter(&self, state: &mut PassState, next: PassState, subject: &str) {
        tracing::trace!(subject, from = ?*state, to = ?next, "state transition");
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticCode;
    use crate::model::{Namespace, TypeDecl};
    use crate::source::ModuleGraph;

    fn graph() -> ModuleGraph {
        ModuleGraph::new("app")
            .module("app", Namespace::new("app").with_type(TypeDecl::installer("AppInstaller")), &["lib"])
            .module("lib", Namespace::new("lib").with_type(TypeDecl::installer("LibInstaller")), &[])
    }

    #[test]
    fn test_no_targets_generates_nothing() {
        let output = Generator::new(graph(), GenerateOptions::new()).run();
        assert_eq!(output.state, PassState::Done);
        assert!(output.loaders.is_empty());
        assert!(output.discovered.is_empty());
    }

    #[test]
    fn test_target_gets_loader() {
        let graph = graph().target(LoaderTarget::new("Loader", "app").ordered(["lib"]));
        let output = Generator::new(graph, GenerateOptions::new()).run();
        assert_eq!(output.state, PassState::Done);
        let loader = output.loader("Loader").unwrap();
        assert_eq!(loader.file_name, "loader_installers.rs");
        let order: Vec<&str> = loader.installers.iter().map(|r| r.fqn.as_str()).collect();
        assert_eq!(order, ["lib::LibInstaller", "app::AppInstaller"]);
    }

    #[test]
    fn test_missing_root_is_engine_fault() {
        let graph = ModuleGraph::new("ghost").target(LoaderTarget::new("Loader", "ghost"));
        let output = Generator::new(graph, GenerateOptions::new()).run();
        assert_eq!(output.state, PassState::Failed);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::EngineFault);
        assert!(output.has_errors());
    }

    /// Counts how often each module is scanned
    struct CountingSource {
        graph: ModuleGraph,
        scans: std::sync::Mutex<Vec<String>>,
    }

    impl ModuleSource for CountingSource {
        fn load_root(&self) -> Result<crate::model::ModuleNode> {
            self.graph.load_root()
        }

        fn load(&self, reference: &crate::model::ModuleRef) -> Result<crate::model::ModuleNode> {
            self.graph.load(reference)
        }

        fn scan(&self, module: &crate::model::ModuleNode) -> Result<crate::model::ModuleContents> {
            self.scans.lock().unwrap().push(module.name.clone());
            self.graph.scan(module)
        }
    }

    #[test]
    fn test_each_module_is_scanned_once_per_pass() {
        let source = CountingSource {
            graph: graph().target(LoaderTarget::new("Loader", "app")),
            scans: std::sync::Mutex::new(Vec::new()),
        };
        let output = Generator::new(&source, GenerateOptions::new()).run();
        assert_eq!(output.discovered.len(), 2);
        assert_eq!(*source.scans.lock().unwrap(), ["app", "lib"]);
    }

    #[test]
    fn test_clashing_file_names_fail_later_target() {
        // `a_b::Loader` and `a::b::Loader` both map to a_b_loader_installers.rs
        let graph = graph()
            .target(LoaderTarget::new("Loader", "app::a_b"))
            .target(LoaderTarget::new("Loader", "app::a::b"));
        let output = Generator::new(graph, GenerateOptions::new()).run();

        assert_eq!(output.state, PassState::Done);
        assert_eq!(output.loaders.len(), 1);
        assert_eq!(output.loaders[0].target.module_path, "app::a_b");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].code, DiagnosticCode::EngineFault);
        assert!(output.diagnostics[0].message.contains("a_b_loader_installers.rs"));
        assert_eq!(output.reports[1].state, PassState::Failed);
    }

    #[test]
    fn test_options_from_settings() {
        let settings = Settings {
            max_depth: 1,
            contracts_crate: "contracts".to_string(),
            ..Settings::default()
        };
        let options = GenerateOptions::from_settings(&settings);
        assert_eq!(options.max_depth, 1);
        assert_eq!(options.contracts_crate, "contracts");
        assert!(!options.verbose);
    }

    #[test]
    fn test_write_to_skips_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let graph = graph().target(LoaderTarget::new("Loader", "app"));
        let output = Generator::new(graph, GenerateOptions::new()).run();

        let first = output.write_to(dir.path()).unwrap();
        assert_eq!(first, vec![dir.path().join("loader_installers.rs")]);
        let second = output.write_to(dir.path()).unwrap();
        assert!(second.is_empty());
    }
}
