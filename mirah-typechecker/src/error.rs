//! Error types for the Mirah typechecker
//!
//! Following the parser's miette patterns for consistent error reporting.

use crate::types::Type;
use miette::Diagnostic;
use mirah_parser::Span;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("Cannot find type {name}")]
    #[diagnostic(
        code(mirah::typecheck::unknown_type),
        help("Known types are int, boolean, String, void and arrays of them")
    )]
    UnknownType { name: String },

    #[error("Cannot find class {name}")]
    #[diagnostic(
        code(mirah::typecheck::unknown_class),
        help("Check the spelling, the package, or that the defining file is part of this compilation")
    )]
    UnknownClass { name: String },

    #[error("Class name {name} is ambiguous: {candidates}")]
    #[diagnostic(
        code(mirah::typecheck::ambiguous_class),
        help("Move the caller into the same package as the class it means")
    )]
    AmbiguousClass { name: String, candidates: String },

    #[error("Cannot find method {method} on {class}")]
    #[diagnostic(code(mirah::typecheck::unknown_method))]
    UnknownMethod { class: String, method: String },

    #[error("Undefined local variable {name}")]
    #[diagnostic(
        code(mirah::typecheck::unknown_local),
        help("Assign a value to {name} before reading it")
    )]
    UnknownLocal { name: String },

    #[error("{class}.{method} expects {expected} argument(s), found {found}")]
    #[diagnostic(code(mirah::typecheck::arity_mismatch))]
    ArityMismatch {
        class: String,
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("Type mismatch in {context}: expected {expected}, found {found}")]
    #[diagnostic(code(mirah::typecheck::type_mismatch))]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
    },

    #[error("Operator {operator} cannot be applied to {operands}")]
    #[diagnostic(code(mirah::typecheck::invalid_operands))]
    InvalidOperands { operator: String, operands: String },

    #[error("Cannot index into {found}")]
    #[diagnostic(
        code(mirah::typecheck::not_indexable),
        help("Only arrays can be indexed")
    )]
    NotIndexable { found: Type },

    #[error("{found} has no length")]
    #[diagnostic(code(mirah::typecheck::no_length))]
    NoLength { found: Type },

    #[error("Method {method} is already defined in {class}")]
    #[diagnostic(code(mirah::typecheck::duplicate_method))]
    DuplicateMethod { class: String, method: String },

    #[error("void value used as an expression")]
    #[diagnostic(
        code(mirah::typecheck::void_value),
        help("Methods without a return value cannot be used where a value is expected")
    )]
    VoidValue,

    #[error("{class}.{method} can finish without returning a value of type {expected}")]
    #[diagnostic(
        code(mirah::typecheck::missing_return),
        help("End every path with a return, or finish the method with a value")
    )]
    MissingReturn {
        class: String,
        method: String,
        expected: Type,
    },

    #[error("Could not infer the return type of {class}.{method}")]
    #[diagnostic(
        code(mirah::typecheck::incomplete_inference),
        help("Add a return type annotation to break the cycle")
    )]
    IncompleteInference { class: String, method: String },
}

/// A type error tied to the unit (and, usually, the node) it was found in
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDiagnostic {
    pub error: TypeError,
    pub file: String,
    pub span: Option<Span>,
    /// Inference context, innermost first
    pub trace: Option<String>,
}

impl TypeDiagnostic {
    pub fn new(error: TypeError, file: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            error,
            file: file.into(),
            span,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = Some(trace.into());
        self
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}
