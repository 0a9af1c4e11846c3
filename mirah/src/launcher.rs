//! Finds and runs the entry point of a loaded batch

use std::io::Write;

use mirah_interpreter::{UnitResolver, Value, Vm};

use crate::error::DriverError;
use crate::loader::BatchLoader;
use crate::state::CompilationState;

pub const NO_ENTRY_POINT: &str = "No main(String[]) method found in the compiled units";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Ran { class: String },
    NoEntryPoint,
}

/// Resolve every batch unit, then invoke the first `main(String[]): void` in
/// resolution order. `out` receives program output, `info` the notice printed
/// when nothing can run.
pub fn launch<O: Write, I: Write>(
    loader: &BatchLoader,
    state: &CompilationState,
    args: &[String],
    out: O,
    mut info: I,
) -> Result<Launch, DriverError> {
    let names: Vec<String> = loader.batch().names().map(str::to_string).collect();
    for name in &names {
        loader.resolve(name)?;
    }

    let entry = loader
        .resolution_order()
        .into_iter()
        .filter(|name| loader.batch().contains(name))
        .map(|name| loader.resolve(&name))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .find(|unit| unit.has_entry_point());

    let Some(unit) = entry else {
        if !state.banner_printed {
            writeln!(info, "{NO_ENTRY_POINT}")
                .map_err(|err| DriverError::io("write", "stderr", err))?;
        }
        return Ok(Launch::NoEntryPoint);
    };

    tracing::debug!(class = unit.name(), "launching entry point");
    let mut vm = Vm::new(out);
    vm.invoke(&unit, "main", vec![Value::string_array(args.iter().cloned())])
        .map_err(|err| DriverError::Execution(err.into_target()))?;

    Ok(Launch::Ran {
        class: unit.name().to_string(),
    })
}
