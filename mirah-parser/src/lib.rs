// Mirah Parser Library
// Pest-based parser and script transform for Mirah source units

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod parser;
pub mod transform;

pub use ast::*;
pub use diagnostics::*;
pub use error::*;
pub use parser::*;
pub use transform::{script_class_name, transform_program, INLINE_SCRIPT_NAME};

// Re-export parser rule for manual testing
pub use parser::Rule;

/// Options that change how a unit is accepted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Every unit must start with a `package` declaration
    pub explicit_packages: bool,
}

// Main parsing functions
pub fn parse_program(input: &str) -> Result<Program, ParseError> {
    parser::MirahParser::parse_program(input)
}

pub fn parse_program_with_source(
    input: &str,
    source_file: Option<String>,
) -> Result<Program, ParseError> {
    parser::MirahParser::parse_program_with_source(input, source_file)
}

pub fn parse_expression(input: &str) -> Result<Expression, ParseError> {
    parser::MirahParser::parse_expression(input)
}

/// Parse and transform one unit, collecting diagnostics instead of failing.
///
/// Returns the transformed program only when no diagnostic was produced.
pub fn parse_program_with_diagnostics_and_source(
    input: &str,
    source_name: &str,
    options: &ParseOptions,
) -> (Option<Program>, DiagnosticCollector) {
    let mut collector = DiagnosticCollector::new(input.to_string());

    let program = match parse_program_with_source(input, Some(source_name.to_string())) {
        Ok(program) => program,
        Err(error) => {
            collector.add_diagnostic(error.into());
            return (None, collector);
        }
    };

    if options.explicit_packages && program.package.is_none() {
        let first_line_end = input.find('\n').unwrap_or(input.len());
        let location = Span::new(0, first_line_end, (1, 1), (1, first_line_end + 1));
        collector.add_diagnostic(DiagnosticError::missing_package(
            source_name.to_string(),
            location,
        ));
        return (None, collector);
    }

    (Some(transform_program(program)), collector)
}

// Version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
