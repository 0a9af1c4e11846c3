//! Mirah Compiler
//!
//! Turns annotated, transformed programs into class payloads.
//!
//! - [`bytecode`]: the loadable payload format
//! - [`codegen`]: one [`GeneratedUnit`] per class, streamed to a caller-supplied sink
//! - [`listing`]: text rendering used by the listing backend

pub mod bytecode;
pub mod codegen;
pub mod error;
pub mod listing;

pub use bytecode::{ClassFile, Instr, MethodCode, TargetVersion, MAGIC};
pub use codegen::{relative_path, Backend, CodegenOptions, Compiler, GeneratedUnit};
pub use error::{CodegenError, CodegenResult};
