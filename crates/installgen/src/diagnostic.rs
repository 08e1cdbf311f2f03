/// Generation-time diagnostics
///
/// Problems found while generating are collected as [`Diagnostic`] values
/// instead of aborting the pass. Warnings mean something was skipped; errors
/// mean a loader target got no generated code. A [`Reporter`] surfaces them
/// through whatever channel the host uses.

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// A loader target could not be generated
    EngineFault,
    /// A referenced module could not be loaded
    ReferenceAnalysis,
    /// A module's types could not be enumerated
    ModuleScan,
    /// The ordering directive on a target is invalid
    InvalidInstallOrder,
    /// An ordering directive sits on a type that is not a loader target
    IgnoredInstallOrder,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::EngineFault => "IGEN001",
            DiagnosticCode::ReferenceAnalysis => "IGEN002",
            DiagnosticCode::ModuleScan => "IGEN003",
            DiagnosticCode::InvalidInstallOrder => "IGEN004",
            DiagnosticCode::IgnoredInstallOrder => "IGEN005",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            DiagnosticCode::EngineFault | DiagnosticCode::InvalidInstallOrder => Severity::Error,
            DiagnosticCode::ReferenceAnalysis
            | DiagnosticCode::ModuleScan
            | DiagnosticCode::IgnoredInstallOrder => Severity::Warning,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DiagnosticCode::EngineFault => "Installer generator error",
            DiagnosticCode::ReferenceAnalysis => "Reference analysis warning",
            DiagnosticCode::ModuleScan => "Module analysis warning",
            DiagnosticCode::InvalidInstallOrder => "Invalid install order",
            DiagnosticCode::IgnoredInstallOrder => "Install order ignored",
        }
    }

    /// Message template; `{0}`, `{1}` are replaced by the arguments.
    pub fn template(&self) -> &'static str {
        match self {
            DiagnosticCode::EngineFault => "error in installer generator for `{0}`: {1}",
            DiagnosticCode::ReferenceAnalysis => "could not analyze reference `{0}`: {1}",
            DiagnosticCode::ModuleScan => "error analyzing module `{0}`: {1}",
            DiagnosticCode::InvalidInstallOrder => "invalid install order on `{0}`: {1}",
            DiagnosticCode::IgnoredInstallOrder => {
                "install order on `{0}` ignored: it is not a loader target"
            }
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position in a source file. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
}

impl Diagnostic {
    /// Render `code`'s template with `args`.
    pub fn new(code: DiagnosticCode, args: &[&dyn fmt::Display]) -> Self {
        let mut message = code.template().to_string();
        for (index, arg) in args.iter().enumerate() {
            message = message.replace(&format!("{{{index}}}"), &arg.to_string());
        }
        Self {
            code,
            severity: code.severity(),
            message,
            location: None,
        }
    }

    pub fn engine_fault(target: &str, error: &dyn fmt::Display) -> Self {
        Self::new(DiagnosticCode::EngineFault, &[&target, error])
    }

    pub fn reference_analysis(reference: &str, error: &dyn fmt::Display) -> Self {
        Self::new(DiagnosticCode::ReferenceAnalysis, &[&reference, error])
    }

    pub fn module_scan(module: &str, error: &dyn fmt::Display) -> Self {
        Self::new(DiagnosticCode::ModuleScan, &[&module, error])
    }

    pub fn invalid_install_order(target: &str, reason: &dyn fmt::Display) -> Self {
        Self::new(DiagnosticCode::InvalidInstallOrder, &[&target, reason])
    }

    pub fn ignored_install_order(type_name: &str) -> Self {
        Self::new(DiagnosticCode::IgnoredInstallOrder, &[&type_name])
    }

    pub fn at(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " (at {location})")?;
        }
        Ok(())
    }
}

/// Surfaces diagnostics through the host's reporting channel.
pub trait Reporter {
    fn report(&mut self, diagnostic: &Diagnostic);
}

impl Reporter for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.push(diagnostic.clone());
    }
}

/// Reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, diagnostic: &Diagnostic) {
        let location = diagnostic.location.as_ref().map(ToString::to_string);
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(
                code = diagnostic.code.as_str(),
                location = location.as_deref(),
                "{}",
                diagnostic.message
            ),
            Severity::Error => tracing::error!(
                code = diagnostic.code.as_str(),
                location = location.as_deref(),
                "{}",
                diagnostic.message
            ),
        }
    }
}

/// Reports as `cargo:warning=` lines, for use from build scripts.
///
/// Cargo has no way for a build script to emit an error line; errors are
/// reported as warnings and the build script fails afterwards.
pub struct CargoReporter<W: Write> {
    out: W,
}

impl CargoReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> CargoReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Reporter for CargoReporter<W> {
    fn report(&mut self, diagnostic: &Diagnostic) {
        // cargo reads one directive per line
        let line = diagnostic.to_string().replace(['\r', '\n'], " ");
        let _ = writeln!(self.out, "cargo:warning={line}");
    }
}
