//! Turns command-line entries into source units
//!
//! Directories are walked (regular files kept by extension, subdirectories
//! re-queued); anything else is kept verbatim. `-e` binds the next entry as an
//! inline script named `DashE`. No existence checks happen here.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use mirah_parser::INLINE_SCRIPT_NAME;

use crate::error::DriverError;

/// Extensions picked up when walking a directory
pub const SOURCE_EXTENSIONS: &[&str] = &["mirah", "duby"];

pub const INLINE_SENTINEL: &str = "-e";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    Inline(String),
    /// Read lazily by the pipeline
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub name: String,
    pub origin: SourceOrigin,
}

impl SourceUnit {
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            name: INLINE_SCRIPT_NAME.to_string(),
            origin: SourceOrigin::Inline(text.into()),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            origin: SourceOrigin::File(path),
        }
    }

    pub fn read_text(&self) -> Result<String, DriverError> {
        match &self.origin {
            SourceOrigin::Inline(text) => Ok(text.clone()),
            SourceOrigin::File(path) => {
                fs::read_to_string(path).map_err(|err| DriverError::io("read", path, err))
            }
        }
    }
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Expand `entries` in order
pub fn expand<S: AsRef<str>>(entries: &[S]) -> Result<Vec<SourceUnit>, DriverError> {
    let mut queue = VecDeque::new();
    let mut entries = entries.iter().map(AsRef::as_ref);
    while let Some(entry) = entries.next() {
        if entry == INLINE_SENTINEL {
            let text = entries.next().ok_or_else(|| DriverError::Usage {
                message: "-e requires a script".to_string(),
            })?;
            queue.push_back(SourceUnit::inline(text));
        } else {
            queue.push_back(SourceUnit::file(entry));
        }
    }

    let mut units = Vec::new();
    while let Some(unit) = queue.pop_front() {
        let dir = match &unit.origin {
            SourceOrigin::File(path) if path.is_dir() => path.clone(),
            _ => {
                units.push(unit);
                continue;
            }
        };

        tracing::trace!(dir = %dir.display(), "expanding directory");
        let mut children: Vec<PathBuf> = fs::read_dir(&dir)
            .map_err(|err| DriverError::io("read directory", &dir, err))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .collect();
        children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for child in children {
            if child.is_dir() {
                queue.push_back(SourceUnit::file(child));
            } else if child.is_file() && is_source_file(&child) {
                units.push(SourceUnit::file(child));
            }
        }
    }
    Ok(units)
}
