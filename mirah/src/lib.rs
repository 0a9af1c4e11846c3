// Mirah driver
// Batch compilation and in-memory run of Mirah source units

pub mod cli;
pub mod diagnostic;
pub mod error;
pub mod expander;
pub mod launcher;
pub mod loader;
pub mod pipeline;
pub mod reporter;
pub mod sexpr;
pub mod sink;
pub mod state;

pub use cli::{Cli, Commands, CompilerFlags};
pub use error::DriverError;
pub use expander::{SourceOrigin, SourceUnit, expand};
pub use launcher::{Launch, launch};
pub use loader::BatchLoader;
pub use pipeline::Pipeline;
pub use sink::{FilesystemSink, MemorySink, UnitBatch, UnitSink};
pub use state::{CompilationState, version_banner};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
