//! Driver failures
//!
//! Position-aware diagnostics are rendered by the reporter as soon as they are
//! found. The variants here only mark that a phase failed, or carry failures
//! that have no position.

use miette::Diagnostic;
use mirah_compiler::CodegenError;
use mirah_interpreter::{LoadError, RuntimeError};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DriverError {
    #[error("{message}")]
    #[diagnostic(code(mirah::usage), help("Run `mirah --help` for usage"))]
    Usage { message: String },

    #[error("Failed to {action} {path}: {message}")]
    #[diagnostic(code(mirah::io))]
    Io {
        action: &'static str,
        path: String,
        message: String,
    },

    /// Already reported; the run stops at this unit
    #[error("Parsing {unit} failed")]
    #[diagnostic(code(mirah::parse_failed))]
    ParseFailed { unit: String },

    /// Already reported
    #[error("Type inference failed with {count} error(s)")]
    #[diagnostic(code(mirah::inference_failed))]
    InferenceFailed { count: usize },

    #[error("Class {name} was generated more than once")]
    #[diagnostic(
        code(mirah::duplicate_unit),
        help("Each class may be defined by only one unit per run")
    )]
    DuplicateUnit { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codegen(#[from] CodegenError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Load(#[from] LoadError),

    /// A failure raised by executed code, with its envelope removed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Execution(#[from] RuntimeError),
}

impl DriverError {
    pub fn io(action: &'static str, path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        DriverError::Io {
            action,
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }

    /// Whether the failure was already written out by the reporter
    pub fn is_reported(&self) -> bool {
        match self {
            DriverError::ParseFailed { .. } | DriverError::InferenceFailed { .. } => true,
            DriverError::Codegen(err) => err.is_internal(),
            _ => false,
        }
    }
}
