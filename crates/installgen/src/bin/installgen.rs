/// installgen CLI

use std::path::PathBuf;
use std::process;
use anyhow::Context;
use clap::Parser;
use installgen::cargo::CargoSource;
use installgen::{GenerateOptions, Generator, Settings, TracingReporter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "installgen")]
#[command(about = "installgen - generates static installer loaders for a Cargo package")]
#[command(version)]
struct Args {
    /// Directory containing the root package's Cargo.toml
    #[arg(value_name = "MANIFEST_DIR", default_value = ".")]
    manifest_dir: PathBuf,

    /// Write generated loaders into this directory instead of stdout
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Reference levels to follow from the root package
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Generation failed: {:#}", e);
            process::exit(1);
        }
    }
}

/// Returns false if any error diagnostic was produced.
fn run(args: Args) -> anyhow::Result<bool> {
    let settings = Settings::from_manifest_dir(&args.manifest_dir)
        .with_context(|| format!("reading settings from {}", args.manifest_dir.display()))?;

    let mut options = GenerateOptions::from_settings(&settings).verbose(args.verbose);
    if let Some(depth) = args.max_depth {
        options = options.max_depth(depth);
    }

    let source = CargoSource::new(&args.manifest_dir).with_traits((&settings).into());
    let output = Generator::new(source, options).run();
    output.report(&mut TracingReporter);

    match &args.output {
        Some(dir) => {
            let written = output.write_to(dir)?;
            for path in &written {
                tracing::info!(path = %path.display(), "wrote loader");
            }
        }
        None => {
            for loader in &output.loaders {
                println!("// ===== {} =====", loader.file_name);
                println!("{}", loader.source);
            }
        }
    }

    Ok(!output.has_errors())
}
