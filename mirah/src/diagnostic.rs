//! Diagnostics collected from every phase, in one shape for the reporter

use std::fmt;

use mirah_compiler::CodegenError;
use mirah_parser::{DiagnosticError, Span};
use mirah_typechecker::TypeDiagnostic;

/// Source range, 1-based as authored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl Position {
    pub fn from_span(file: &str, span: &Span) -> Self {
        Self {
            file: file.to_string(),
            start_line: span.start_line_col.0,
            start_col: span.start_line_col.1,
            end_line: span.end_line_col.0,
            end_col: span.end_line_col.1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.start_line)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    Syntax {
        message: String,
        position: Position,
    },
    Inference {
        message: String,
        position: Option<Position>,
        /// Where the inference was happening, innermost first
        trace: Option<String>,
    },
    Internal {
        message: String,
        position: Option<Position>,
        node: Option<String>,
    },
}

impl Diagnostic {
    pub fn syntax(unit: &str, error: &DiagnosticError) -> Self {
        Diagnostic::Syntax {
            message: error.to_string(),
            position: Position::from_span(unit, error.location()),
        }
    }

    pub fn inference(diagnostic: &TypeDiagnostic) -> Self {
        Diagnostic::Inference {
            message: diagnostic.message(),
            position: diagnostic
                .span
                .as_ref()
                .map(|span| Position::from_span(&diagnostic.file, span)),
            trace: diagnostic.trace.clone(),
        }
    }

    /// `None` for codegen failures that are not internal errors
    pub fn internal(error: &CodegenError) -> Option<Self> {
        match error {
            CodegenError::Internal {
                file, span, node, ..
            } => Some(Diagnostic::Internal {
                message: error.to_string(),
                position: span.as_ref().map(|span| Position::from_span(file, span)),
                node: node.clone(),
            }),
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Diagnostic::Syntax { message, .. }
            | Diagnostic::Inference { message, .. }
            | Diagnostic::Internal { message, .. } => message,
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            Diagnostic::Syntax { position, .. } => Some(position),
            Diagnostic::Inference { position, .. } | Diagnostic::Internal { position, .. } => {
                position.as_ref()
            }
        }
    }

    /// Extra context shown in verbose mode
    pub fn detail(&self) -> Option<String> {
        match self {
            Diagnostic::Syntax { .. } => None,
            Diagnostic::Inference { trace, .. } => trace.clone(),
            Diagnostic::Internal { node, .. } => node.as_ref().map(|node| format!("at {node}")),
        }
    }
}
