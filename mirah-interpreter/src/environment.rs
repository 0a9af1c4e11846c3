//! The ambient environment: host classes, enabled extensions and payloads on
//! the classpath or load path.
//!
//! One environment serves both the typechecker (as a [`SignatureSource`]) and
//! the loader (as a [`UnitResolver`]). Clones share state, so extensions
//! enabled by a classpath unit on load become visible everywhere.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexSet;
use mirah_compiler::{relative_path, Backend, ClassFile};
use mirah_typechecker::{ClassSignature, SignatureSource};

use crate::error::LoadError;
use crate::host::{integer_class, ExtensionRegistry, NativeClass};
use crate::unit::{LoadedUnit, UnitResolver};

#[derive(Debug, Clone)]
pub struct HostEnvironment {
    inner: Rc<Inner>,
}

#[derive(Debug)]
struct Inner {
    registry: ExtensionRegistry,
    enabled: RefCell<IndexSet<String>>,
    classpath: Vec<PathBuf>,
    load_path: Vec<PathBuf>,
}

impl HostEnvironment {
    pub fn new(registry: ExtensionRegistry, classpath: Vec<PathBuf>, load_path: Vec<PathBuf>) -> Self {
        Self {
            inner: Rc::new(Inner {
                registry,
                enabled: RefCell::new(IndexSet::new()),
                classpath,
                load_path,
            }),
        }
    }

    /// Environment with only the host classes
    pub fn bare() -> Self {
        Self::new(ExtensionRegistry::new(), Vec::new(), Vec::new())
    }

    pub fn enable(&self, name: &str) -> Result<(), LoadError> {
        if !self.inner.registry.contains(name) {
            return Err(LoadError::UnknownExtension {
                name: name.to_string(),
                known: self.inner.registry.names().join(", "),
            });
        }
        if self.inner.enabled.borrow_mut().insert(name.to_string()) {
            tracing::debug!(extension = name, "enabled extension");
        }
        Ok(())
    }

    pub fn enabled_extensions(&self) -> Vec<String> {
        self.inner.enabled.borrow().iter().cloned().collect()
    }

    pub fn native_class(&self, name: &str) -> Option<NativeClass> {
        if name == "Integer" {
            return Some(integer_class());
        }
        self.inner
            .enabled
            .borrow()
            .iter()
            .filter_map(|extension| self.inner.registry.init(extension))
            .find(|class| class.name == name)
    }

    /// Payload path for `name`, classpath entries first
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let relative = relative_path(name, Backend::Bytecode.extension());
        self.inner
            .classpath
            .iter()
            .chain(self.inner.load_path.iter())
            .map(|dir| dir.join(&relative))
            .find(|path| path.is_file())
    }

    pub fn read_class_file(&self, name: &str) -> Result<Option<ClassFile>, LoadError> {
        let Some(path) = self.locate(name) else {
            return Ok(None);
        };

        let bytes = fs::read(&path).map_err(|err| LoadError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        let class = ClassFile::decode(&bytes).map_err(|err| LoadError::Malformed {
            name: name.to_string(),
            message: err.to_string(),
        })?;
        if class.name != name {
            return Err(LoadError::NameMismatch {
                name: name.to_string(),
                found: class.name,
            });
        }

        tracing::trace!(class = name, path = %path.display(), "read payload");
        Ok(Some(class))
    }
}

impl SignatureSource for HostEnvironment {
    fn class_signature(&self, qualified_name: &str) -> Option<ClassSignature> {
        if let Some(class) = self.native_class(qualified_name) {
            return Some(class.signature());
        }
        match self.read_class_file(qualified_name) {
            Ok(class) => class.map(|class| class.signature()),
            Err(err) => {
                tracing::warn!(class = qualified_name, error = %err, "ignoring unreadable payload");
                None
            }
        }
    }
}

impl UnitResolver for HostEnvironment {
    fn resolve(&self, name: &str) -> Result<Rc<LoadedUnit>, LoadError> {
        if let Some(class) = self.native_class(name) {
            return Ok(LoadedUnit::native(class));
        }

        match self.read_class_file(name)? {
            Some(class) => {
                for extension in &class.extensions {
                    self.enable(extension)?;
                }
                Ok(LoadedUnit::compiled(class))
            }
            None => Err(LoadError::UnitNotFound {
                name: name.to_string(),
            }),
        }
    }
}
