/// installgen
///
/// Finds every installer reachable from a root module and generates a
/// loader function that invokes them directly, so nothing is discovered
/// at runtime.

pub mod cargo;
pub mod config;
pub mod diagnostic;
pub mod discovery;
pub mod driver;
pub mod emit;
pub mod error;
pub mod model;
pub mod order;
pub mod source;

pub use cargo::{CargoSource, generate_loaders};
pub use config::Settings;
pub use diagnostic::{CargoReporter, Diagnostic, DiagnosticCode, Location, Reporter, Severity, TracingReporter};
pub use discovery::{DEFAULT_MAX_DEPTH, Discovery, discover, discover_scanned};
pub use driver::{GenerateOptions, GenerateOutput, GeneratedLoader, Generator, PassState, TargetReport};
pub use emit::{LoaderEmitter, emit, file_name};
pub use error::{GenerateError, Result};
pub use model::{
    Accessibility, CandidateType, Construction, InstallerRecord, LoaderTarget, ModuleContents, ModuleNode,
    ModuleRef, Namespace, OrderDirective, TypeDecl, TypeShape,
};
pub use order::{InvalidOrderSpec, OrderSpec, resolve};
pub use source::{LoaderScan, ModuleGraph, ModuleSource, StrayDirective};
