//! Cycle-tolerant loading of a generated batch
//!
//! A unit is cached before its references are linked, so a cycle finds the
//! cached instance instead of recursing. Names outside the batch go to the
//! ambient resolver and are cached the same way.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use mirah_compiler::ClassFile;
use mirah_interpreter::{LoadError, LoadedUnit, UnitResolver};

use crate::sink::UnitBatch;

pub struct BatchLoader {
    batch: UnitBatch,
    ambient: Box<dyn UnitResolver>,
    cache: RefCell<IndexMap<String, Rc<LoadedUnit>>>,
}

impl BatchLoader {
    pub fn new(batch: UnitBatch, ambient: Box<dyn UnitResolver>) -> Self {
        Self {
            batch,
            ambient,
            cache: RefCell::new(IndexMap::new()),
        }
    }

    pub fn batch(&self) -> &UnitBatch {
        &self.batch
    }

    /// Names in the order they were first resolved
    pub fn resolution_order(&self) -> Vec<String> {
        self.cache.borrow().keys().cloned().collect()
    }

    fn cached(&self, name: &str) -> Option<Rc<LoadedUnit>> {
        self.cache.borrow().get(name).cloned()
    }

    fn materialise(&self, name: &str) -> Result<Rc<LoadedUnit>, LoadError> {
        match self.batch.get(name) {
            Some(unit) => {
                let class = ClassFile::decode(&unit.payload).map_err(|err| LoadError::Malformed {
                    name: name.to_string(),
                    message: err.to_string(),
                })?;
                tracing::trace!(class = name, "materialised batch unit");
                Ok(LoadedUnit::compiled(class))
            }
            None => {
                let unit = self.ambient.resolve(name)?;
                tracing::trace!(class = name, "resolved ambient unit");
                Ok(unit)
            }
        }
    }

    fn link(&self, unit: &Rc<LoadedUnit>) -> Result<(), LoadError> {
        for reference in unit.references() {
            let target = self.resolve(reference)?;
            unit.link(reference, &target);
        }
        Ok(())
    }
}

impl UnitResolver for BatchLoader {
    fn resolve(&self, name: &str) -> Result<Rc<LoadedUnit>, LoadError> {
        if let Some(unit) = self.cached(name) {
            return Ok(unit);
        }

        let unit = self.materialise(name)?;
        self.cache
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&unit));
        self.link(&unit)?;

        tracing::debug!(class = name, "loaded unit");
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::SourceUnit;
    use crate::pipeline::Pipeline;
    use crate::sink::MemorySink;
    use crate::state::CompilationState;
    use mirah_compiler::{GeneratedUnit, relative_path};
    use mirah_interpreter::HostEnvironment;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::path::PathBuf;

    fn batch(sources: &[&str]) -> UnitBatch {
        let state = CompilationState::default();
        let environment = HostEnvironment::bare();
        let units: Vec<SourceUnit> = sources.iter().map(|s| SourceUnit::inline(*s)).collect();
        let mut sink = MemorySink::new();
        Pipeline::new(&state, &environment, Vec::new())
            .generate(&units, &mut sink)
            .unwrap();
        sink.into_batch()
    }

    /// Ambient resolver that counts lookups
    struct Counting {
        inner: HostEnvironment,
        lookups: Rc<Cell<usize>>,
    }

    impl UnitResolver for Counting {
        fn resolve(&self, name: &str) -> Result<Rc<LoadedUnit>, LoadError> {
            self.lookups.set(self.lookups.get() + 1);
            self.inner.resolve(name)
        }
    }

    const CYCLE: &str = "\
class Ping
  def self.go(n: int): int
    if n == 0
      return 0
    end
    Pong.go(n - 1)
  end
end
class Pong
  def self.go(n: int): int
    Ping.go(n)
  end
end
";

    #[test]
    fn test_resolve_returns_identical_instance() {
        let loader = BatchLoader::new(batch(&[CYCLE]), Box::new(HostEnvironment::bare()));
        let first = loader.resolve("Ping").unwrap();
        let second = loader.resolve("Ping").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cycles_link_both_ways() {
        let loader = BatchLoader::new(batch(&[CYCLE]), Box::new(HostEnvironment::bare()));
        let ping = loader.resolve("Ping").unwrap();
        let pong = loader.resolve("Pong").unwrap();

        assert!(Rc::ptr_eq(&ping.linked("Pong").unwrap(), &pong));
        assert!(Rc::ptr_eq(&pong.linked("Ping").unwrap(), &ping));
        assert_eq!(loader.resolution_order(), vec!["Ping", "Pong"]);
    }

    #[test]
    fn test_ambient_units_are_cached() {
        let lookups = Rc::new(Cell::new(0));
        let ambient = Counting {
            inner: HostEnvironment::bare(),
            lookups: Rc::clone(&lookups),
        };
        let loader = BatchLoader::new(
            batch(&["puts Integer.to_s(Integer.parse(\"4\"))\n"]),
            Box::new(ambient),
        );

        let script = loader.resolve("DashE").unwrap();
        assert!(script.is_linked());
        let integer = loader.resolve("Integer").unwrap();
        assert!(Rc::ptr_eq(&script.linked("Integer").unwrap(), &integer));
        assert_eq!(lookups.get(), 1);
    }

    #[test]
    fn test_unknown_name() {
        let loader = BatchLoader::new(UnitBatch::default(), Box::new(HostEnvironment::bare()));
        assert_eq!(
            loader.resolve("Missing").unwrap_err(),
            LoadError::UnitNotFound {
                name: "Missing".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_payload() {
        let mut sink = MemorySink::new();
        crate::sink::UnitSink::accept(
            &mut sink,
            GeneratedUnit {
                qualified_name: "Bad".to_string(),
                relative_path: relative_path("Bad", "mbc"),
                payload: b"junk".to_vec(),
            },
        )
        .unwrap();

        let loader = BatchLoader::new(sink.into_batch(), Box::new(HostEnvironment::bare()));
        assert!(matches!(
            loader.resolve("Bad"),
            Err(LoadError::Malformed { .. })
        ));
        assert_eq!(relative_path("Bad", "mbc"), PathBuf::from("Bad.mbc"));
    }
}
