//! Phase sequencing: parse, joint inference, codegen, sink
//!
//! Every unit is parsed before inference starts, and inference covers the whole
//! batch before any code is generated, so units may refer to each other in any
//! order.

use std::collections::HashSet;
use std::io::Write;

use mirah_compiler::Compiler;
use mirah_interpreter::HostEnvironment;
use mirah_parser::{Program, parse_program_with_diagnostics_and_source};
use mirah_typechecker::Typer;

use crate::diagnostic::Diagnostic;
use crate::error::DriverError;
use crate::expander::SourceUnit;
use crate::reporter::Reporter;
use crate::sexpr::format_program_as_sexpr;
use crate::sink::UnitSink;
use crate::state::CompilationState;

pub struct Pipeline<'a, W: Write> {
    state: &'a CompilationState,
    environment: &'a HostEnvironment,
    reporter: Reporter<W>,
}

impl<'a, W: Write> Pipeline<'a, W> {
    pub fn new(state: &'a CompilationState, environment: &'a HostEnvironment, diagnostics: W) -> Self {
        Self {
            state,
            environment,
            reporter: Reporter::new(diagnostics, state.verbose),
        }
    }

    pub fn into_reporter(self) -> Reporter<W> {
        self.reporter
    }

    /// Run every phase, handing generated units to `sink`
    pub fn generate(&mut self, units: &[SourceUnit], sink: &mut dyn UnitSink) -> Result<(), DriverError> {
        let mut batch = self.parse_all(units)?;
        self.infer(&mut batch)?;
        self.compile_all(&batch, sink)
    }

    /// Parse and transform each unit in order, stopping at the first failure
    pub fn parse_all(&mut self, units: &[SourceUnit]) -> Result<Vec<Program>, DriverError> {
        let options = self.state.parse_options();
        let mut batch = Vec::with_capacity(units.len());

        for unit in units {
            let text = unit.read_text()?;
            let (program, collector) =
                parse_program_with_diagnostics_and_source(&text, &unit.name, &options);

            match program {
                Some(program) if !collector.has_diagnostics() => batch.push(program),
                _ => {
                    for error in collector.diagnostics() {
                        self.emit(&Diagnostic::syntax(&unit.name, error))?;
                    }
                    return Err(DriverError::ParseFailed {
                        unit: unit.name.clone(),
                    });
                }
            }
        }

        tracing::debug!(units = batch.len(), "parsed batch");
        Ok(batch)
    }

    /// Infer types across the whole batch at once
    pub fn infer(&mut self, batch: &mut [Program]) -> Result<(), DriverError> {
        let mut typer = Typer::with_externals(Box::new(self.environment.clone()));
        typer.infer(batch);
        let diagnostics = typer.resolve(false);

        if self.state.verbose {
            for program in batch.iter() {
                self.note(&format_program_as_sexpr(program))?;
            }
        }

        if diagnostics.is_empty() {
            tracing::debug!("inference complete");
            return Ok(());
        }
        for diagnostic in &diagnostics {
            self.emit(&Diagnostic::inference(diagnostic))?;
        }
        Err(DriverError::InferenceFailed {
            count: diagnostics.len(),
        })
    }

    /// Generate every unit in batch order
    pub fn compile_all(&mut self, batch: &[Program], sink: &mut dyn UnitSink) -> Result<(), DriverError> {
        let compiler = Compiler::new(self.state.codegen_options());
        let mut seen = HashSet::new();

        for program in batch {
            let result = compiler.compile(program, |unit| {
                if !seen.insert(unit.qualified_name.clone()) {
                    return Err(DriverError::DuplicateUnit {
                        name: unit.qualified_name,
                    });
                }
                sink.accept(unit)
            });

            if let Err(DriverError::Codegen(err)) = &result {
                if let Some(diagnostic) = Diagnostic::internal(err) {
                    self.emit(&diagnostic)?;
                }
            }
            result?;
        }

        tracing::debug!(units = seen.len(), "generated batch");
        Ok(())
    }

    fn emit(&mut self, diagnostic: &Diagnostic) -> Result<(), DriverError> {
        self.reporter
            .report_diagnostic(diagnostic)
            .map_err(|err| DriverError::io("write", "diagnostics", err))
    }

    fn note(&mut self, text: &str) -> Result<(), DriverError> {
        self.reporter
            .note(text)
            .map_err(|err| DriverError::io("write", "diagnostics", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use mirah_compiler::Backend;
    use pretty_assertions::assert_eq;

    fn run(
        state: &CompilationState,
        units: &[SourceUnit],
    ) -> (Result<Vec<String>, DriverError>, String) {
        let environment = HostEnvironment::bare();
        let mut pipeline = Pipeline::new(state, &environment, Vec::new());
        let mut sink = MemorySink::new();
        let result = pipeline.generate(units, &mut sink);
        let output = String::from_utf8(pipeline.into_reporter().into_inner()).unwrap();
        let names = result.map(|()| sink.into_batch().names().map(str::to_string).collect());
        (names, output)
    }

    fn file_unit(name: &str, text: &str) -> SourceUnit {
        SourceUnit {
            name: name.to_string(),
            origin: crate::expander::SourceOrigin::Inline(text.to_string()),
        }
    }

    #[test]
    fn test_forward_reference_across_units() {
        let units = [
            file_unit("main.mirah", "puts Util.twice(21)\n"),
            file_unit("util.mirah", "class Util\n  def self.twice(n: int)\n    n * 2\n  end\nend\n"),
        ];
        let (names, output) = run(&CompilationState::default(), &units);
        assert_eq!(names.unwrap(), vec!["Main", "Util"]);
        assert_eq!(output, "");

        // alone, the first unit cannot see Util
        let (result, output) = run(&CompilationState::default(), &units[..1]);
        assert!(matches!(result, Err(DriverError::InferenceFailed { count: 1 })));
        assert_eq!(output, "main.mirah:1: Cannot find class Util\n");
    }

    #[test]
    fn test_parse_stops_at_first_failing_unit() {
        let units = [
            file_unit("a.mirah", "puts )\n"),
            file_unit("b.mirah", "puts (\n"),
        ];
        let (result, output) = run(&CompilationState::default(), &units);

        assert!(matches!(result, Err(DriverError::ParseFailed { unit }) if unit == "a.mirah"));
        assert!(output.starts_with("a.mirah:1: "));
        assert!(!output.contains("b.mirah"));
    }

    #[test]
    fn test_missing_file_is_an_io_failure() {
        let units = [SourceUnit::file("/nonexistent/dir/x.mirah")];
        let (result, _) = run(&CompilationState::default(), &units);
        assert!(matches!(result, Err(DriverError::Io { action: "read", .. })));
    }

    #[test]
    fn test_all_inference_diagnostics_are_reported() {
        let units = [file_unit("DashE", "puts x\nputs 1 + true\n")];
        let (result, output) = run(&CompilationState::default(), &units);

        assert!(matches!(result, Err(DriverError::InferenceFailed { count: 2 })));
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "DashE:1: Undefined local variable x");
        assert!(lines[1].starts_with("DashE:2: Operator + cannot be applied"));
    }

    #[test]
    fn test_verbose_dumps_asts_and_traces() {
        let state = CompilationState {
            verbose: true,
            ..CompilationState::default()
        };
        let units = [file_unit("DashE", "puts y\n")];
        let (_, output) = run(&state, &units);

        assert!(output.starts_with("(unit \"DashE\""));
        assert!(output.contains("DashE:1: Undefined local variable y\n    in DashE.main\n    in unit DashE\n"));
    }

    #[test]
    fn test_duplicate_classes_are_fatal() {
        let class = "class Twice\n  def self.a: int\n    1\n  end\nend\n";
        let other = "class Twice\n  def self.b: int\n    2\n  end\nend\n";
        let units = [file_unit("one.mirah", class), file_unit("two.mirah", other)];
        let (result, _) = run(&CompilationState::default(), &units);

        assert!(matches!(result, Err(DriverError::DuplicateUnit { name }) if name == "Twice"));
    }

    /// Refuses every unit, remembering which ones were offered
    #[derive(Default)]
    struct FullSink {
        offered: Vec<String>,
    }

    impl UnitSink for FullSink {
        fn accept(&mut self, unit: mirah_compiler::GeneratedUnit) -> Result<(), DriverError> {
            self.offered.push(unit.qualified_name);
            Err(DriverError::Io {
                action: "write",
                path: unit.relative_path.display().to_string(),
                message: "disk full".to_string(),
            })
        }
    }

    #[test]
    fn test_internal_errors_are_reported_then_raised() {
        let state = CompilationState::default();
        let environment = HostEnvironment::bare();
        let (program, _) = mirah_parser::parse_program_with_diagnostics_and_source(
            "puts 1\n",
            "DashE",
            &state.parse_options(),
        );
        let mut pipeline = Pipeline::new(&state, &environment, Vec::new());
        let mut sink = MemorySink::new();

        let result = pipeline.compile_all(&[program.unwrap()], &mut sink);
        let output = String::from_utf8(pipeline.into_reporter().into_inner()).unwrap();

        assert!(output.starts_with("DashE:1: Internal compiler error"), "{output}");
        match result {
            Err(DriverError::Codegen(err)) => assert!(err.is_internal()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(sink.into_batch().is_empty());
    }

    #[test]
    fn test_sink_failure_aborts_codegen() {
        let state = CompilationState::default();
        let environment = HostEnvironment::bare();
        let units = [
            file_unit("a.mirah", "class A\n  def self.a: int\n    1\n  end\nend\n"),
            file_unit("b.mirah", "class B\n  def self.b: int\n    2\n  end\nend\n"),
            file_unit("c.mirah", "class C\n  def self.c: int\n    3\n  end\nend\n"),
        ];
        let mut pipeline = Pipeline::new(&state, &environment, Vec::new());
        let mut sink = FullSink::default();

        let result = pipeline.generate(&units, &mut sink);
        let output = String::from_utf8(pipeline.into_reporter().into_inner()).unwrap();

        assert!(matches!(result, Err(DriverError::Io { action: "write", .. })));
        assert_eq!(sink.offered, vec!["A"]);
        assert_eq!(output, "");
    }

    #[test]
    fn test_explicit_packages_are_enforced() {
        let state = CompilationState {
            explicit_packages: true,
            ..CompilationState::default()
        };
        let (result, output) = run(&state, &[file_unit("DashE", "puts 1\n")]);

        assert!(matches!(result, Err(DriverError::ParseFailed { .. })));
        assert_eq!(output, "DashE:1: Missing package declaration in DashE\n");
    }

    #[test]
    fn test_listing_backend_feeds_sink() {
        let state = CompilationState {
            backend: Backend::Listing,
            ..CompilationState::default()
        };
        let (names, _) = run(&state, &[file_unit("DashE", "puts 1\n")]);
        assert_eq!(names.unwrap(), vec!["DashE"]);
    }
}
