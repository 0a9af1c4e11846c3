//! Mirah Interpreter
//!
//! Executes compiled class payloads in-process.
//!
//! - [`value`]: runtime values
//! - [`host`]: the `Integer` host class and the extension registry
//! - [`unit`]: loaded units, their link tables and the [`UnitResolver`] seam
//! - [`environment`]: host classes, extensions and payload directories, seen
//!   by both the typechecker and the loader
//! - [`vm`]: the stack machine

pub mod environment;
pub mod error;
pub mod host;
pub mod unit;
pub mod value;
pub mod vm;

#[cfg(test)]
#[path = "tests/mod.rs"]
pub mod tests;

pub use environment::HostEnvironment;
pub use error::{InvokeError, LoadError, RuntimeError};
pub use host::{ExtensionRegistry, NativeClass, integer_class};
pub use unit::{LoadedUnit, UnitBody, UnitResolver};
pub use value::Value;
pub use vm::{MAX_CALL_DEPTH, Vm};
