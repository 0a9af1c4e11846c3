//! Runtime tests
//!
//! Sources go through the real parser, typechecker and code generator, then
//! get linked by hand the way a loader would.

use std::rc::Rc;

use mirah_compiler::{CodegenOptions, Compiler};
use mirah_parser::{parse_program_with_diagnostics_and_source, ParseOptions, Program};
use mirah_typechecker::Typer;

use crate::{HostEnvironment, InvokeError, LoadedUnit, UnitResolver, Value, Vm};

mod test_host_classes;

/// Compiled units plus the ambient units they link to
pub(crate) struct Linked {
    pub units: Vec<Rc<LoadedUnit>>,
    pub ambient: Vec<Rc<LoadedUnit>>,
}

impl Linked {
    pub fn unit(&self, name: &str) -> &Rc<LoadedUnit> {
        self.units
            .iter()
            .find(|unit| unit.name() == name)
            .unwrap_or_else(|| panic!("no unit {name}"))
    }
}

pub(crate) fn parse(name: &str, source: &str) -> Program {
    let (program, collector) =
        parse_program_with_diagnostics_and_source(source, name, &ParseOptions::default());
    assert!(!collector.has_diagnostics(), "{:?}", collector.diagnostics());
    program.unwrap()
}

pub(crate) fn compile_with(
    env: &HostEnvironment,
    options: CodegenOptions,
    sources: &[(&str, &str)],
) -> Vec<mirah_compiler::ClassFile> {
    let mut batch: Vec<Program> = sources.iter().map(|(n, s)| parse(n, s)).collect();
    let mut typer = Typer::with_externals(Box::new(env.clone()));
    typer.infer(&mut batch);
    let diagnostics = typer.resolve(false);
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let compiler = Compiler::new(options);
    batch
        .iter()
        .flat_map(|program| compiler.class_files(program).unwrap())
        .collect()
}

pub(crate) fn link(env: &HostEnvironment, sources: &[(&str, &str)]) -> Linked {
    let classes = compile_with(env, CodegenOptions::default(), sources);
    let units: Vec<Rc<LoadedUnit>> = classes.into_iter().map(LoadedUnit::compiled).collect();
    let mut ambient = Vec::new();

    for unit in &units {
        for reference in unit.references() {
            match units.iter().find(|u| u.name() == reference) {
                Some(target) => unit.link(reference, target),
                None => {
                    let target = env.resolve(reference).unwrap();
                    unit.link(reference, &target);
                    ambient.push(target);
                }
            }
        }
    }
    Linked { units, ambient }
}

/// Run `main` with `args`, returning the result and everything printed
pub(crate) fn run_main(
    unit: &Rc<LoadedUnit>,
    args: &[&str],
) -> (Result<Value, InvokeError>, String) {
    let mut vm = Vm::new(Vec::new());
    let result = vm.invoke(unit, "main", vec![Value::string_array(args.iter().copied())]);
    let output = String::from_utf8(vm.into_output()).unwrap();
    (result, output)
}

pub(crate) fn run_script(source: &str, args: &[&str]) -> (Result<Value, InvokeError>, String) {
    let env = HostEnvironment::bare();
    let linked = link(&env, &[("DashE", source)]);
    run_main(linked.unit("DashE"), args)
}
