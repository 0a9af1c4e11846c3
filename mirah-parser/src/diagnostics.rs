// Mirah Parser Diagnostics
// Diagnostic error types and the per-unit collector handed back by the parser

use crate::ast::Span;
use crate::error::{source_span, ParseError};
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Diagnostic produced while parsing or transforming a single unit
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum DiagnosticError {
    #[error("{message}")]
    #[diagnostic(code(mirah::diagnostic::syntax_error), severity(Error))]
    SyntaxError {
        message: String,
        #[label("syntax error here")]
        span: SourceSpan,
        location: Span,
    },

    #[error("{message}")]
    #[diagnostic(
        code(mirah::diagnostic::invalid_literal),
        severity(Error),
        help("{suggestion}")
    )]
    InvalidLiteral {
        message: String,
        suggestion: String,
        #[label("invalid literal")]
        span: SourceSpan,
        location: Span,
    },

    #[error("Missing package declaration in {unit}")]
    #[diagnostic(
        code(mirah::diagnostic::missing_package),
        severity(Error),
        help("Explicit packages are required; start the file with `package name`")
    )]
    MissingPackage {
        unit: String,
        #[label("expected a package declaration")]
        span: SourceSpan,
        location: Span,
    },
}

impl DiagnosticError {
    /// Get the source location of this diagnostic
    pub fn location(&self) -> &Span {
        match self {
            DiagnosticError::SyntaxError { location, .. }
            | DiagnosticError::InvalidLiteral { location, .. }
            | DiagnosticError::MissingPackage { location, .. } => location,
        }
    }

    /// Create a missing package diagnostic pointing at the first line
    pub fn missing_package(unit: String, location: Span) -> Self {
        DiagnosticError::MissingPackage {
            unit,
            span: source_span(&location),
            location,
        }
    }
}

impl From<ParseError> for DiagnosticError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::PestError {
                span,
                message,
                location,
                ..
            } => DiagnosticError::SyntaxError {
                message,
                span,
                location,
            },
            ParseError::InvalidInteger {
                span,
                found,
                location,
                ..
            } => DiagnosticError::InvalidLiteral {
                message: format!("Invalid integer literal: {found}"),
                suggestion: "Integer literals must fit in a signed 64-bit value".to_string(),
                span,
                location,
            },
            ParseError::InvalidStringEscape {
                span,
                found,
                location,
                ..
            } => DiagnosticError::InvalidLiteral {
                message: format!("Invalid string escape sequence: {found}"),
                suggestion: "Valid escape sequences: \\n, \\t, \\\\, \\\"".to_string(),
                span,
                location,
            },
        }
    }
}

/// Diagnostic collector that accumulates errors for one unit
#[derive(Debug, Clone)]
pub struct DiagnosticCollector {
    /// Source code being parsed
    source: String,
    diagnostics: Vec<DiagnosticError>,
}

impl DiagnosticCollector {
    pub fn new(source: String) -> Self {
        Self {
            source,
            diagnostics: Vec::new(),
        }
    }

    pub fn add_diagnostic(&mut self, diagnostic: DiagnosticError) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[DiagnosticError] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Create miette reports with a specific filename
    pub fn create_reports_with_filename(&self, filename: &str) -> Vec<miette::Report> {
        use miette::NamedSource;

        let named_source = NamedSource::new(filename, self.source.clone());

        self.diagnostics
            .iter()
            .map(|diagnostic| {
                miette::Report::new(diagnostic.clone()).with_source_code(named_source.clone())
            })
            .collect()
    }
}
