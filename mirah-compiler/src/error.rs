// Mirah Compiler Error Handling

use miette::Diagnostic;
use mirah_parser::Span;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum CodegenError {
    /// A node reached codegen in a state earlier phases should have ruled out
    #[error("Internal compiler error: {message}")]
    #[diagnostic(
        code(mirah::compile::internal),
        help("This is a bug in the compiler; please report it with the input that triggered it")
    )]
    Internal {
        message: String,
        file: String,
        span: Option<Span>,
        /// Short description of the offending node
        node: Option<String>,
    },

    #[error("Failed to encode class {class}: {message}")]
    #[diagnostic(code(mirah::compile::encode))]
    Encode { class: String, message: String },

    #[error("Malformed class payload: {message}")]
    #[diagnostic(code(mirah::compile::decode))]
    Decode { message: String },
}

impl CodegenError {
    pub fn internal(
        message: impl Into<String>,
        file: &str,
        span: Option<&Span>,
        node: Option<String>,
    ) -> Self {
        CodegenError::Internal {
            message: message.into(),
            file: file.to_string(),
            span: span.cloned(),
            node,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, CodegenError::Internal { .. })
    }
}

pub type CodegenResult<T> = Result<T, CodegenError>;
