//! Destinations for generated units

use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use mirah_compiler::GeneratedUnit;

use crate::error::DriverError;

pub trait UnitSink {
    fn accept(&mut self, unit: GeneratedUnit) -> Result<(), DriverError>;
}

/// Writes `destination/relative_path`, creating parent directories
#[derive(Debug, Clone)]
pub struct FilesystemSink {
    destination: PathBuf,
    written: Vec<PathBuf>,
}

impl FilesystemSink {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl UnitSink for FilesystemSink {
    fn accept(&mut self, unit: GeneratedUnit) -> Result<(), DriverError> {
        let path = self.destination.join(&unit.relative_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| DriverError::io("create", parent, err))?;
        }
        fs::write(&path, &unit.payload).map_err(|err| DriverError::io("write", &path, err))?;

        tracing::debug!(class = %unit.qualified_name, path = %path.display(), "wrote unit");
        self.written.push(path);
        Ok(())
    }
}

/// Read-only mapping from qualified name to generated unit, in generation order
#[derive(Debug, Clone, Default)]
pub struct UnitBatch {
    units: IndexMap<String, GeneratedUnit>,
}

impl UnitBatch {
    pub fn get(&self, name: &str) -> Option<&GeneratedUnit> {
        self.units.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Accumulates units for the loader. Names arrive unique; the pipeline
/// rejects duplicates before dispatch.
#[derive(Debug, Default)]
pub struct MemorySink {
    units: IndexMap<String, GeneratedUnit>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_batch(self) -> UnitBatch {
        UnitBatch { units: self.units }
    }
}

impl UnitSink for MemorySink {
    fn accept(&mut self, unit: GeneratedUnit) -> Result<(), DriverError> {
        self.units.insert(unit.qualified_name.clone(), unit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn unit(name: &str, path: &str) -> GeneratedUnit {
        GeneratedUnit {
            qualified_name: name.to_string(),
            relative_path: PathBuf::from(path),
            payload: name.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_filesystem_sink_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FilesystemSink::new(dir.path().join("out"));
        sink.accept(unit("a.b.C", "a/b/C.mbc")).unwrap();

        let path = dir.path().join("out").join(Path::new("a/b/C.mbc"));
        assert_eq!(fs::read(&path).unwrap(), b"a.b.C");
        assert_eq!(sink.written(), &[path]);
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let mut sink = FilesystemSink::new(&blocker);
        assert!(matches!(
            sink.accept(unit("C", "C.mbc")),
            Err(DriverError::Io { .. })
        ));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.accept(unit("B", "B.mbc")).unwrap();
        sink.accept(unit("A", "A.mbc")).unwrap();

        let batch = sink.into_batch();
        assert_eq!(batch.names().collect::<Vec<_>>(), vec!["B", "A"]);
        assert_eq!(batch.get("A").unwrap().payload, b"A");
        assert!(!batch.contains("C"));
    }
}
