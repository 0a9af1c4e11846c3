//! Mirah Typechecker
//!
//! Whole-batch type inference for Mirah units.
//!
//! ## Architecture
//!
//! - **Class Registry**: every class of the batch, keyed by qualified name, plus
//!   classes pulled in from a [`SignatureSource`] (host classes, extensions,
//!   previously compiled units)
//! - **Typer**: declares all signatures first, infers undeclared return types to
//!   a fixed point, then annotates the AST
//!
//! ## Integration
//!
//! The typer fills the parser AST's optional `type_info` and `resolved_class`
//! slots in place; code generation reads them back.

pub mod error;
pub mod inference;
pub mod registry;
pub mod types;

pub use error::{TypeDiagnostic, TypeError};
pub use inference::Typer;
pub use registry::{
    qualify, simple_name, ClassEntry, ClassRegistry, MethodEntry, NoExternalSignatures,
    ReturnType, SignatureSource,
};
pub use types::{ClassSignature, MethodSignature, Type};

/// Type check a batch with no external classes visible, returning every diagnostic
pub fn typecheck_batch(batch: &mut [mirah_parser::Program]) -> Result<(), Vec<TypeDiagnostic>> {
    let mut typer = Typer::new();
    typer.infer(batch);

    let diagnostics = typer.resolve(false);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Convenience function for single-unit type checking (mainly for testing)
pub fn typecheck_program(program: &mut mirah_parser::Program) -> Result<(), Vec<TypeDiagnostic>> {
    typecheck_batch(std::slice::from_mut(program))
}

#[cfg(test)]
mod tests;
