//! Typechecker tests
//!
//! Units are parsed and transformed the same way the driver does before they
//! reach the typer.

use mirah_parser::{parse_program_with_diagnostics_and_source, ParseOptions, Program};

mod test_return_inference;

pub(crate) fn unit(name: &str, source: &str) -> Program {
    let (program, collector) =
        parse_program_with_diagnostics_and_source(source, name, &ParseOptions::default());
    assert!(
        !collector.has_diagnostics(),
        "unexpected parse diagnostics in {name}: {:?}",
        collector.diagnostics()
    );
    program.unwrap()
}

pub(crate) fn messages(diagnostics: &[crate::TypeDiagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.message()).collect()
}
