//! Command-line surface of the `mirah` binary

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use mirah_compiler::Backend;
use mirah_interpreter::{ExtensionRegistry, HostEnvironment};
use mirah_parser::{ParseOptions, parse_program_with_diagnostics_and_source};
use tracing_subscriber::EnvFilter;

use crate::error::DriverError;
use crate::expander::{INLINE_SENTINEL, SourceUnit, expand};
use crate::launcher::launch;
use crate::loader::BatchLoader;
use crate::pipeline::Pipeline;
use crate::sexpr::format_program_as_sexpr;
use crate::sink::{FilesystemSink, MemorySink};
use crate::state::CompilationState;

#[derive(Parser, Debug)]
#[command(
    name = "mirah",
    about = "The Mirah batch compiler",
    long_about = "Compiles Mirah sources to class payloads, or compiles them in memory and runs the entry point.",
    disable_version_flag = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile sources and write one payload per class under the destination
    Compile {
        #[command(flatten)]
        flags: CompilerFlags,

        /// Source files or directories
        #[arg(value_name = "PATH")]
        paths: Vec<String>,
    },

    /// Compile sources in memory and run the first main(String[]) found
    Run {
        #[command(flatten)]
        flags: CompilerFlags,

        /// Source files or directories
        #[arg(value_name = "PATH")]
        paths: Vec<String>,

        /// Arguments handed to main
        #[arg(last = true, value_name = "ARGS")]
        args: Vec<String>,
    },

    /// Parse source files and print their AST (debug only)
    Parse {
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },
}

/// Flags shared by `compile` and `run`
#[derive(Args, Debug, Clone, Default)]
pub struct CompilerFlags {
    /// Extra class search path (platform path list, repeatable)
    #[arg(short = 'c', long = "classpath", value_name = "PATHS")]
    pub classpath: Vec<String>,

    /// Change working directory before reading sources
    #[arg(long = "cd", value_name = "DIR")]
    pub cd: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'd', long = "dest", value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Inline script, compiled as `DashE`
    #[arg(short = 'e', value_name = "SCRIPT", allow_hyphen_values = true)]
    pub scripts: Vec<String>,

    /// Require a package declaration in every unit
    #[arg(long)]
    pub explicit_packages: bool,

    #[arg(short = 'b', long, value_name = "BACKEND", value_parser = ["bytecode", "listing"])]
    pub backend: Option<String>,

    /// v1, v2, v3 or v4
    #[arg(long, value_name = "VERSION")]
    pub target: Option<String>,

    /// Directory searched after the classpath (repeatable)
    #[arg(short = 'I', long = "load-path", value_name = "DIR")]
    pub load_path: Vec<PathBuf>,

    /// Enable a compiler extension (repeatable)
    #[arg(short = 'p', long = "plugin", value_name = "NAME")]
    pub plugins: Vec<String>,

    /// Print ASTs, traces and debug logging
    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// Print the version banner
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Record enabled extensions in generated units
    #[arg(long)]
    pub retain_extensions: bool,
}

/// Parse `args` (program name first) and run the chosen command
pub fn run<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut command = Cli::command();
    let matches = match command.try_get_matches_from_mut(args) {
        Ok(matches) => matches,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    let sub_matches = matches.subcommand().map(|(_, sub)| sub);
    let result = match (cli.command, sub_matches) {
        (Some(Commands::Compile { flags, paths }), Some(sub)) => {
            let entries = ordered_entries(sub, &flags, &paths);
            compile_command(&flags, &entries)
        }
        (Some(Commands::Run { flags, paths, args }), Some(sub)) => {
            let entries = ordered_entries(sub, &flags, &paths);
            run_command(&flags, &entries, &args)
        }
        (Some(Commands::Parse { files }), _) => parse_command(&files),
        _ => {
            let _ = command.print_help();
            return ExitCode::SUCCESS;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if !err.is_reported() {
                eprintln!("{:?}", miette::Report::new(err));
            }
            ExitCode::FAILURE
        }
    }
}

/// Interleave `-e` scripts and paths in command-line order
fn ordered_entries(matches: &ArgMatches, flags: &CompilerFlags, paths: &[String]) -> Vec<String> {
    let mut indexed: Vec<(usize, Vec<String>)> = Vec::new();
    if let Some(indices) = matches.indices_of("scripts") {
        for (index, script) in indices.zip(&flags.scripts) {
            indexed.push((index, vec![INLINE_SENTINEL.to_string(), script.clone()]));
        }
    }
    if let Some(indices) = matches.indices_of("paths") {
        for (index, path) in indices.zip(paths) {
            indexed.push((index, vec![path.clone()]));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().flat_map(|(_, entry)| entry).collect()
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

struct Prepared {
    state: CompilationState,
    environment: HostEnvironment,
    units: Vec<SourceUnit>,
}

/// Apply flags, build the host environment and expand sources.
///
/// `None` means there is nothing to do: the banner was the only request.
fn prepare(flags: &CompilerFlags, entries: &[String]) -> Result<Option<Prepared>, DriverError> {
    init_tracing(flags.verbose);

    let mut state = CompilationState::default();
    state.apply_flags(flags)?;
    if flags.version {
        state
            .print_banner(&mut io::stdout())
            .map_err(|err| DriverError::io("write", "stdout", err))?;
    }
    if let Some(dir) = &flags.cd {
        std::env::set_current_dir(dir).map_err(|err| DriverError::io("change directory to", dir, err))?;
    }

    let environment = HostEnvironment::new(
        ExtensionRegistry::new(),
        state.classpath.clone(),
        state.load_path.clone(),
    );
    for name in &state.extensions {
        environment.enable(name)?;
    }

    let units = expand(entries)?;
    if units.is_empty() {
        if state.banner_printed {
            return Ok(None);
        }
        return Err(DriverError::Usage {
            message: "No source files given".to_string(),
        });
    }
    tracing::debug!(units = units.len(), "expanded sources");

    Ok(Some(Prepared {
        state,
        environment,
        units,
    }))
}

fn compile_command(flags: &CompilerFlags, entries: &[String]) -> Result<(), DriverError> {
    let Some(Prepared {
        state,
        environment,
        units,
    }) = prepare(flags, entries)?
    else {
        return Ok(());
    };

    let mut sink = FilesystemSink::new(&state.destination);
    Pipeline::new(&state, &environment, io::stderr()).generate(&units, &mut sink)?;
    tracing::debug!(written = sink.written().len(), "compile finished");
    Ok(())
}

fn run_command(flags: &CompilerFlags, entries: &[String], args: &[String]) -> Result<(), DriverError> {
    let Some(Prepared {
        state,
        environment,
        units,
    }) = prepare(flags, entries)?
    else {
        return Ok(());
    };
    if state.backend != Backend::Bytecode {
        return Err(DriverError::Usage {
            message: format!("The {:?} backend cannot be run", state.backend).to_lowercase(),
        });
    }

    let mut sink = MemorySink::new();
    Pipeline::new(&state, &environment, io::stderr()).generate(&units, &mut sink)?;

    let loader = BatchLoader::new(sink.into_batch(), Box::new(environment.clone()));
    let stdout = io::stdout();
    let mut out = stdout.lock();
    launch(&loader, &state, args, &mut out, io::stderr())?;
    out.flush().map_err(|err| DriverError::io("write", "stdout", err))
}

fn parse_command(files: &[PathBuf]) -> Result<(), DriverError> {
    let mut failed = 0;

    for path in files {
        let name = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|err| DriverError::io("read", path, err))?;
        let (program, collector) =
            parse_program_with_diagnostics_and_source(&text, &name, &ParseOptions::default());

        match program {
            Some(program) if !collector.has_diagnostics() => {
                println!("{}", format_program_as_sexpr(&program));
            }
            _ => {
                for report in collector.create_reports_with_filename(&name) {
                    eprintln!("{report:?}");
                }
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(DriverError::Usage {
            message: format!("{failed} file(s) failed to parse"),
        });
    }
    Ok(())
}
