// Diagnostic collection tests
// Syntax errors, literal errors and explicit package enforcement

use mirah_parser::*;

#[test]
fn test_syntax_error_position() {
    let source = "puts 1\nputs (2\n";
    let (program, collector) =
        parse_program_with_diagnostics_and_source(source, "DashE", &ParseOptions::default());

    assert!(program.is_none());
    assert_eq!(collector.error_count(), 1);
    let diagnostic = &collector.diagnostics()[0];
    assert!(matches!(diagnostic, DiagnosticError::SyntaxError { .. }));
    assert_eq!(diagnostic.location().start_line(), 2);
    assert!(diagnostic.to_string().starts_with("Syntax error: unexpected"));
}

#[test]
fn test_missing_end_is_reported() {
    let source = "class Foo\n  def bar\n  end\n";
    let (program, collector) =
        parse_program_with_diagnostics_and_source(source, "foo.mirah", &ParseOptions::default());

    assert!(program.is_none());
    assert!(collector.has_diagnostics());
}

#[test]
fn test_integer_overflow_is_invalid_literal() {
    let source = "x = 99999999999999999999";
    let (_, collector) =
        parse_program_with_diagnostics_and_source(source, "big.mirah", &ParseOptions::default());

    match &collector.diagnostics()[0] {
        DiagnosticError::InvalidLiteral { message, location, .. } => {
            assert!(message.contains("99999999999999999999"));
            assert_eq!(location.start_line_col, (1, 5));
        }
        other => panic!("Expected invalid literal, got: {other:?}"),
    }
}

#[test]
fn test_unknown_escape_is_invalid_literal() {
    let source = "puts \"bad \\q escape\"";
    let error = parse_program(source).unwrap_err();

    match &error {
        ParseError::InvalidStringEscape { found, location, src, .. } => {
            assert_eq!(found, "\\q");
            assert_eq!(location.start_line_col, (1, 11));
            assert_eq!(src, source);
        }
        other => panic!("Expected invalid escape, got: {other:?}"),
    }
}

#[test]
fn test_explicit_packages_requires_package() {
    let options = ParseOptions {
        explicit_packages: true,
    };

    let (program, collector) =
        parse_program_with_diagnostics_and_source("puts 1\n", "script.mirah", &options);
    assert!(program.is_none());
    match &collector.diagnostics()[0] {
        DiagnosticError::MissingPackage { unit, location, .. } => {
            assert_eq!(unit, "script.mirah");
            assert_eq!(location.start_line(), 1);
        }
        other => panic!("Expected missing package, got: {other:?}"),
    }

    let (program, collector) =
        parse_program_with_diagnostics_and_source("package app\nputs 1\n", "script.mirah", &options);
    assert!(program.is_some());
    assert!(!collector.has_diagnostics());
}

#[test]
fn test_successful_parse_is_transformed() {
    let (program, collector) = parse_program_with_diagnostics_and_source(
        "puts \"hi\"\n",
        "hello_world.mirah",
        &ParseOptions::default(),
    );

    assert!(!collector.has_diagnostics());
    let program = program.unwrap();
    let class = program.classes().next().unwrap();
    assert_eq!(class.name.name, "HelloWorld");
    assert!(class.synthetic);
}

#[test]
fn test_reports_carry_filename() {
    let (_, collector) =
        parse_program_with_diagnostics_and_source("if\n", "broken.mirah", &ParseOptions::default());
    let reports = collector.create_reports_with_filename("broken.mirah");
    assert_eq!(reports.len(), 1);
}
