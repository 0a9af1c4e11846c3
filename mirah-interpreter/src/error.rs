//! Runtime, invocation and loading errors.

use miette::Diagnostic;
use thiserror::Error;

/// Failures raised while executing compiled code
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// `raise` in user code
    #[error("{message}")]
    #[diagnostic(code(mirah::runtime::raised))]
    Raised { message: String },

    #[error("Type error: expected {expected}, found {found}")]
    #[diagnostic(
        code(mirah::runtime::type_error),
        help("The payload may have been compiled against different signatures")
    )]
    TypeError { expected: String, found: String },

    #[error("Division by zero")]
    #[diagnostic(
        code(mirah::runtime::division_by_zero),
        help("Ensure the divisor is not zero before division")
    )]
    DivisionByZero,

    #[error("Index out of bounds: index {index} is not valid for array of length {length}")]
    #[diagnostic(code(mirah::runtime::index_out_of_bounds))]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("Invalid integer: {text:?}")]
    #[diagnostic(code(mirah::runtime::invalid_integer))]
    InvalidInteger { text: String },

    #[error("Undefined method {class}.{method}")]
    #[diagnostic(code(mirah::runtime::undefined_method))]
    UndefinedMethod { class: String, method: String },

    #[error("Wrong arity: {class}.{method} expects {expected} arguments, got {found}")]
    #[diagnostic(code(mirah::runtime::wrong_arity))]
    WrongArity {
        class: String,
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("Class {class} is not linked")]
    #[diagnostic(
        code(mirah::runtime::unlinked),
        help("Units must be resolved through a loader before they run")
    )]
    Unlinked { class: String },

    #[error("Stack overflow in {class}.{method}")]
    #[diagnostic(code(mirah::runtime::stack_overflow))]
    StackOverflow { class: String, method: String },

    /// Corrupt code: stack underflow, bad slot or bad jump
    #[error("Invalid code in {class}.{method}: {message}")]
    #[diagnostic(code(mirah::runtime::invalid_code))]
    InvalidCode {
        class: String,
        method: String,
        message: String,
    },

    #[error("Failed to write output: {message}")]
    #[diagnostic(code(mirah::runtime::output))]
    Output { message: String },
}

impl RuntimeError {
    pub fn type_error(expected: &str, found: &str) -> Self {
        Self::TypeError {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised {
            message: message.into(),
        }
    }
}

/// Envelope around a failure raised by invoked code
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum InvokeError {
    #[error("Invocation of {class}.{method} failed")]
    #[diagnostic(code(mirah::runtime::invoke))]
    Target {
        class: String,
        method: String,
        #[source]
        source: RuntimeError,
    },
}

impl InvokeError {
    /// The failure raised by the invoked code
    pub fn into_target(self) -> RuntimeError {
        match self {
            InvokeError::Target { source, .. } => source,
        }
    }
}

/// Failures while turning a name into a loaded unit
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Unit not found: {name}")]
    #[diagnostic(
        code(mirah::load::not_found),
        help("Check the classpath, load path and enabled extensions")
    )]
    UnitNotFound { name: String },

    #[error("Malformed unit {name}: {message}")]
    #[diagnostic(code(mirah::load::malformed))]
    Malformed { name: String, message: String },

    #[error("Unit {name} names {found}")]
    #[diagnostic(code(mirah::load::name_mismatch))]
    NameMismatch { name: String, found: String },

    #[error("Unknown extension: {name}")]
    #[diagnostic(code(mirah::load::unknown_extension), help("Known extensions: {known}"))]
    UnknownExtension { name: String, known: String },

    #[error("Failed to read {path}: {message}")]
    #[diagnostic(code(mirah::load::io))]
    Io { path: String, message: String },
}

/// Type alias for runtime results
pub type Result<T> = std::result::Result<T, RuntimeError>;
