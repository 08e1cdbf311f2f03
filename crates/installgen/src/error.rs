/// Error types for installer generation

use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GenerateError>;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("Parse error in {}: {message}", .file.display())]
    Parse { file: PathBuf, message: String },

    #[error("Module not found: '{module}' referenced from {from}")]
    ModuleNotFound { module: String, from: String },

    #[error("Module analysis failed for {module}: {reason}")]
    ModuleAnalysis { module: String, reason: String },

    #[error("Code generation error: {0}")]
    Codegen(String),

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Generation failed for {0} loader target(s)")]
    Failed(usize),
}

impl GenerateError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        GenerateError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GenerateError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GenerateError::Manifest {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn codegen(message: impl Into<String>) -> Self {
        GenerateError::Codegen(message.into())
    }
}
