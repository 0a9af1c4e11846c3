//! Per-run configuration
//!
//! Exactly one [`CompilationState`] exists per run. Flag application is the
//! only place it changes; every phase borrows it.

use std::path::PathBuf;

use mirah_compiler::{Backend, CodegenOptions, TargetVersion};
use mirah_parser::ParseOptions;

use crate::cli::CompilerFlags;
use crate::error::DriverError;

/// Banner printed by `-v`
pub fn version_banner() -> String {
    format!("Mirah v{} (target {})", env!("CARGO_PKG_VERSION"), TargetVersion::default())
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationState {
    pub destination: PathBuf,
    pub verbose: bool,
    pub target: TargetVersion,
    pub banner_printed: bool,
    pub retain_extensions: bool,
    pub backend: Backend,
    pub explicit_packages: bool,
    pub classpath: Vec<PathBuf>,
    pub load_path: Vec<PathBuf>,
    /// Extensions enabled with `--plugin`
    pub extensions: Vec<String>,
}

impl Default for CompilationState {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("."),
            verbose: false,
            target: TargetVersion::default(),
            banner_printed: false,
            retain_extensions: false,
            backend: Backend::default(),
            explicit_packages: false,
            classpath: Vec::new(),
            load_path: Vec::new(),
            extensions: Vec::new(),
        }
    }
}

impl CompilationState {
    /// Fold parsed flags into the state.
    ///
    /// `--cd` is not a state field; the caller changes directory before
    /// expansion. `-v` is handled by [`CompilationState::print_banner`].
    pub fn apply_flags(&mut self, flags: &CompilerFlags) -> Result<(), DriverError> {
        for entry in &flags.classpath {
            self.classpath.extend(std::env::split_paths(entry));
        }
        if let Some(dest) = &flags.dest {
            self.destination = dest.clone();
        }
        if flags.explicit_packages {
            self.explicit_packages = true;
        }
        if let Some(name) = &flags.backend {
            self.backend = Backend::parse(name).ok_or_else(|| DriverError::Usage {
                message: format!("unknown backend {name}"),
            })?;
        }
        if let Some(token) = &flags.target {
            self.set_target(token);
        }
        self.load_path.extend(flags.load_path.iter().cloned());
        self.extensions.extend(flags.plugins.iter().cloned());
        if flags.verbose {
            self.verbose = true;
        }
        if flags.retain_extensions {
            self.retain_extensions = true;
        }
        Ok(())
    }

    /// Unknown tokens keep the previous target
    pub fn set_target(&mut self, token: &str) {
        match TargetVersion::parse(token) {
            Some(target) => self.target = target,
            None => tracing::warn!(
                target_version = token,
                kept = %self.target,
                "unrecognised target version, ignoring"
            ),
        }
    }

    pub fn print_banner(&mut self, out: &mut impl std::io::Write) -> std::io::Result<()> {
        writeln!(out, "{}", version_banner())?;
        self.banner_printed = true;
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            explicit_packages: self.explicit_packages,
        }
    }

    pub fn codegen_options(&self) -> CodegenOptions {
        CodegenOptions {
            backend: self.backend,
            target: self.target,
            extensions: if self.retain_extensions {
                self.extensions.clone()
            } else {
                Vec::new()
            },
        }
    }
}
