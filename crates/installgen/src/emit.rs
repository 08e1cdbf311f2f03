/// Loader code emission
///
/// Renders an ordered installer list into Rust source for a `load_all`
/// function attached to the loader target. The output names every
/// installer directly; nothing is looked up at runtime.

use std::fmt::Write as _;
use crate::error::{GenerateError, Result};
use crate::model::{Construction, InstallerRecord, LoaderTarget, module_key};

/// Crate that provides the installer contracts, as seen from generated code
pub const DEFAULT_CONTRACTS_CRATE: &str = "installgen_abstractions";

/// Stable file name for a target's generated loader.
///
/// Built from the target's module path below the crate root and its name,
/// so `app::wiring::Loader` writes `wiring_loader_installers.rs` and a
/// target at the crate root writes `loader_installers.rs`.
pub fn file_name(target: &LoaderTarget) -> String {
    let mut stem: Vec<String> = target
        .module_path
        .split("::")
        .skip(1)
        .filter(|segment| !segment.is_empty())
        .map(snake_case)
        .collect();
    stem.push(snake_case(&target.name));
    format!("{}_installers.rs", stem.join("_"))
}

/// Emit the loader for `target` with the default contracts crate.
pub fn emit(target: &LoaderTarget, ordered: &[InstallerRecord]) -> Result<String> {
    LoaderEmitter::new().emit(target, ordered)
}

/// Rust code generator for loader functions
pub struct LoaderEmitter {
    /// Indentation level for pretty-printing
    indent: usize,
    /// Output buffer
    output: String,
    /// Absolute path of the contracts crate, e.g. `::installgen_abstractions`
    contracts: String,
}

impl Default for LoaderEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl LoaderEmitter {
    pub fn new() -> Self {
        Self::with_contracts_crate(DEFAULT_CONTRACTS_CRATE)
    }

    pub fn with_contracts_crate(name: &str) -> Self {
        Self {
            indent: 0,
            output: String::new(),
            contracts: format!("::{}", name.trim_start_matches("::").replace('-', "_")),
        }
    }

    pub fn emit(mut self, target: &LoaderTarget, ordered: &[InstallerRecord]) -> Result<String> {
        if !is_identifier(&target.name) {
            return Err(GenerateError::codegen(format!(
                "loader target name `{}` is not a Rust identifier",
                target.name
            )));
        }

        self.emit_header(target)?;
        writeln!(self.output, "impl {} {{", target.name)?;
        self.indent += 1;

        if ordered.is_empty() {
            self.emit_noop()?;
        } else {
            self.emit_load_all(target, ordered)?;
        }

        self.indent -= 1;
        writeln!(self.output, "}}")?;
        Ok(self.output)
    }

    fn emit_header(&mut self, target: &LoaderTarget) -> Result<()> {
        writeln!(self.output, "// @generated by installgen for `{}`. Do not edit.", target.qualified_name())?;
        writeln!(self.output, "// Include from the module declaring `{}`:", target.name)?;
        writeln!(
            self.output,
            "//     include!(concat!(env!(\"OUT_DIR\"), \"/{}\"));",
            file_name(target)
        )?;
        writeln!(self.output)?;
        Ok(())
    }

    fn emit_noop(&mut self) -> Result<()> {
        self.line("/// No installers were discovered, so this does nothing.")?;
        self.line("pub fn load_all(")?;
        self.indented(|e| e.line(&format!("_container: &mut dyn {}::Container,", e.contracts)))?;
        let signature_end = format!(
            ") -> ::core::result::Result<(), {}::AggregateInstallError> {{",
            self.contracts
        );
        self.line(&signature_end)?;
        self.indented(|e| e.line("::core::result::Result::Ok(())"))?;
        self.line("}")
    }

    fn emit_load_all(&mut self, target: &LoaderTarget, ordered: &[InstallerRecord]) -> Result<()> {
        self.line("/// Runs every discovered installer against `container`, in order.")?;
        self.line("///")?;
        self.line("/// A failing installer does not stop the ones after it; all failures")?;
        self.line("/// are returned together once every installer has run.")?;
        self.line("pub fn load_all(")?;
        self.indented(|e| e.line(&format!("container: &mut dyn {}::Container,", e.contracts)))?;
        let signature_end = format!(
            ") -> ::core::result::Result<(), {}::AggregateInstallError> {{",
            self.contracts
        );
        self.line(&signature_end)?;
        self.indent += 1;
        self.line("let mut failures = ::std::vec::Vec::new();")?;

        let home = module_key(target.crate_name());
        for (index, record) in ordered.iter().enumerate() {
            writeln!(self.output)?;
            self.emit_invocation(index, record, &home)?;
        }

        writeln!(self.output)?;
        let tail = format!("{}::AggregateInstallError::check(failures)", self.contracts);
        self.line(&tail)?;
        self.indent -= 1;
        self.line("}")
    }

    fn emit_invocation(&mut self, index: usize, record: &InstallerRecord, home: &str) -> Result<()> {
        let path = self.type_path(record, home)?;
        let construct = match record.construction {
            Construction::Literal => format!("&{path}"),
            Construction::Default => format!("&<{path} as ::core::default::Default>::default()"),
        };
        let contracts = self.contracts.clone();

        self.line(&format!("// {}. {} ({})", index + 1, record.fqn, record.module))?;
        self.line(&format!(
            "if let ::core::result::Result::Err(source) = {contracts}::Installer::install("
        ))?;
        self.indented(|e| {
            e.line(&format!("{construct},"))?;
            e.line("&mut *container,")
        })?;
        self.line(") {")?;
        self.indented(|e| {
            e.line(&format!("failures.push({contracts}::InstallerError::wrap("))?;
            e.indented(|e| {
                e.line(&format!("{:?},", record.fqn))?;
                e.line("source,")
            })?;
            e.line("));")
        })?;
        self.line("}")
    }

    /// Path to an installer as written in the target's crate
    fn type_path(&self, record: &InstallerRecord, home: &str) -> Result<String> {
        let mut segments = record.fqn.split("::");
        let first = segments.next().unwrap_or_default();
        let rest: Vec<&str> = segments.collect();
        if rest.is_empty() || !record.fqn.split("::").all(is_identifier) {
            return Err(GenerateError::codegen(format!(
                "installer `{}` does not have a crate-qualified path",
                record.fqn
            )));
        }
        let root = match &record.extern_name {
            _ if module_key(first) == home => "crate".to_string(),
            Some(name) if is_identifier(name) => format!("::{name}"),
            Some(name) => {
                return Err(GenerateError::codegen(format!(
                    "crate name `{name}` for installer `{}` is not a Rust identifier",
                    record.fqn
                )));
            }
            None => format!("::{first}"),
        };
        Ok(format!("{}::{}", root, rest.join("::")))
    }

    fn line(&mut self, text: &str) -> Result<()> {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        writeln!(self.output, "{text}")?;
        Ok(())
    }

    fn indented<F>(&mut self, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.indent += 1;
        let result = body(self);
        self.indent -= 1;
        result
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => chars.all(|c| c == '_' || c.is_alphanumeric()),
        _ => false,
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(&LoaderTarget::new("Loader", "app")), "loader_installers.rs");
        assert_eq!(file_name(&LoaderTarget::new("AppLoader", "app")), "app_loader_installers.rs");
        assert_eq!(file_name(&LoaderTarget::new("Loader2", "app")), "loader2_installers.rs");
        assert_eq!(
            file_name(&LoaderTarget::new("Loader", "app::wiring")),
            "wiring_loader_installers.rs"
        );
        assert_eq!(
            file_name(&LoaderTarget::new("TestLoader", "app::a::b")),
            "a_b_test_loader_installers.rs"
        );
    }

    #[test]
    fn test_empty_loader_is_noop() {
        let source = emit(&LoaderTarget::new("Loader", "app"), &[]).unwrap();
        assert_eq!(
            source,
            r#"// @generated by installgen for `app::Loader`. Do not edit.
// Include from the module declaring `Loader`:
//     include!(concat!(env!("OUT_DIR"), "/loader_installers.rs"));

impl Loader {
    /// No installers were discovered, so this does nothing.
    pub fn load_all(
        _container: &mut dyn ::installgen_abstractions::Container,
    ) -> ::core::result::Result<(), ::installgen_abstractions::AggregateInstallError> {
        ::core::result::Result::Ok(())
    }
}
"#
        );
    }

    #[test]
    fn test_single_installer_layout() {
        let records = [InstallerRecord::new("alpha::AlphaInstaller", "alpha")];
        let source = emit(&LoaderTarget::new("Loader", "app"), &records).unwrap();
        assert_eq!(
            source,
            r#"// @generated by installgen for `app::Loader`. Do not edit.
// Include from the module declaring `Loader`:
//     include!(concat!(env!("OUT_DIR"), "/loader_installers.rs"));

impl Loader {
    /// Runs every discovered installer against `container`, in order.
    ///
    /// A failing installer does not stop the ones after it; all failures
    /// are returned together once every installer has run.
    pub fn load_all(
        container: &mut dyn ::installgen_abstractions::Container,
    ) -> ::core::result::Result<(), ::installgen_abstractions::AggregateInstallError> {
        let mut failures = ::std::vec::Vec::new();

        // 1. alpha::AlphaInstaller (alpha)
        if let ::core::result::Result::Err(source) = ::installgen_abstractions::Installer::install(
            &<::alpha::AlphaInstaller as ::core::default::Default>::default(),
            &mut *container,
        ) {
            failures.push(::installgen_abstractions::InstallerError::wrap(
                "alpha::AlphaInstaller",
                source,
            ));
        }

        ::installgen_abstractions::AggregateInstallError::check(failures)
    }
}
"#
        );
    }

    #[test]
    fn test_home_crate_uses_crate_paths() {
        let records = [
            InstallerRecord::new("app::wiring::CoreInstaller", "app").literal(),
            InstallerRecord::new("fixture_beta::BetaInstaller", "fixture-beta").literal(),
        ];
        let source = emit(&LoaderTarget::new("Loader", "app::wiring"), &records).unwrap();
        assert!(source.contains("&crate::wiring::CoreInstaller,"));
        assert!(source.contains("&::fixture_beta::BetaInstaller,"));
        assert!(source.contains("// 2. fixture_beta::BetaInstaller (fixture-beta)"));
    }

    #[test]
    fn test_renamed_dependency_uses_extern_name() {
        let records = [InstallerRecord::new("real_foo::RealInstaller", "real-foo")
            .literal()
            .extern_name("foo")];
        let source = emit(&LoaderTarget::new("Loader", "app"), &records).unwrap();
        assert!(source.contains("&::foo::RealInstaller,"));
        assert!(source.contains("\"real_foo::RealInstaller\","));
        assert!(!source.contains("::real_foo::"));
    }

    #[test]
    fn test_custom_contracts_crate() {
        let records = [InstallerRecord::new("alpha::A", "alpha")];
        let source = LoaderEmitter::with_contracts_crate("my-contracts")
            .emit(&LoaderTarget::new("Loader", "app"), &records)
            .unwrap();
        assert!(source.contains("container: &mut dyn ::my_contracts::Container,"));
        assert!(!source.contains("installgen_abstractions"));
    }

    #[test]
    fn test_invalid_paths_are_rejected() {
        let target = LoaderTarget::new("Loader", "app");
        assert!(emit(&target, &[InstallerRecord::new("Unqualified", "app")]).is_err());
        assert!(emit(&target, &[InstallerRecord::new("Demo.Modules.A", "demo")]).is_err());
        assert!(emit(&LoaderTarget::new("not a name", "app"), &[]).is_err());
    }

    #[test]
    fn test_invocations_follow_given_order() {
        let records = [
            InstallerRecord::new("b::Second", "b"),
            InstallerRecord::new("a::First", "a"),
        ];
        let source = emit(&LoaderTarget::new("Loader", "app"), &records).unwrap();
        let second = source.find("\"b::Second\"").unwrap();
        let first = source.find("\"a::First\"").unwrap();
        assert!(second < first);
    }
}
