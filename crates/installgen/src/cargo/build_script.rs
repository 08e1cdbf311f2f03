/// Build-script entry point

use std::env;
use std::path::PathBuf;
use crate::cargo::CargoSource;
use crate::config::Settings;
use crate::diagnostic::CargoReporter;
use crate::driver::{GenerateOptions, Generator};
use crate::error::{GenerateError, Result};

fn env_path(name: &'static str) -> Result<PathBuf> {
    env::var_os(name).map(PathBuf::from).ok_or(GenerateError::MissingEnv(name))
}

/// Generate loaders for the crate being built, from its `build.rs`:
///
/// ```no_run
/// fn main() {
///     if let Err(err) = installgen::cargo::generate_loaders() {
///         panic!("{err}");
///     }
/// }
/// ```
///
/// Diagnostics become `cargo:warning=` lines and every file read is
/// registered with `cargo:rerun-if-changed`. Fails if any diagnostic is an
/// error, after the loaders that did generate have been written.
pub fn generate_loaders() -> Result<()> {
    let manifest_dir = env_path("CARGO_MANIFEST_DIR")?;
    let out_dir = env_path("OUT_DIR")?;

    let settings = Settings::from_manifest_dir(&manifest_dir)?;
    let source = CargoSource::new(&manifest_dir).with_traits((&settings).into());
    let output = Generator::new(source, GenerateOptions::from_settings(&settings)).run();

    let mut reporter = CargoReporter::stdout();
    output.report(&mut reporter);

    println!("cargo:rerun-if-changed={}", manifest_dir.join("Cargo.toml").display());
    for input in &output.inputs {
        println!("cargo:rerun-if-changed={}", input.display());
    }
    if output.inputs.is_empty() {
        println!("cargo:rerun-if-changed={}", manifest_dir.join("src").display());
    }

    output.write_to(&out_dir)?;

    let failed = output.diagnostics.iter().filter(|d| d.is_error()).count();
    if failed > 0 {
        return Err(GenerateError::Failed(failed));
    }
    Ok(())
}
