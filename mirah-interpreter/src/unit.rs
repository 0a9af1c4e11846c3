//! Loaded units and the resolver seam
//!
//! A [`LoadedUnit`] keeps a link table from referenced class names to the
//! units they resolved to. Links are weak: the resolver's cache owns every
//! unit, so reference cycles between units do not leak.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use mirah_compiler::ClassFile;
use mirah_typechecker::ClassSignature;

use crate::error::LoadError;
use crate::host::NativeClass;

#[derive(Debug)]
pub enum UnitBody {
    Compiled(ClassFile),
    Native(NativeClass),
}

#[derive(Debug)]
pub struct LoadedUnit {
    name: String,
    body: UnitBody,
    links: RefCell<HashMap<String, Weak<LoadedUnit>>>,
}

impl LoadedUnit {
    pub fn compiled(class: ClassFile) -> Rc<Self> {
        Rc::new(Self {
            name: class.name.clone(),
            body: UnitBody::Compiled(class),
            links: RefCell::new(HashMap::new()),
        })
    }

    pub fn native(class: NativeClass) -> Rc<Self> {
        Rc::new(Self {
            name: class.name.clone(),
            body: UnitBody::Native(class),
            links: RefCell::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &UnitBody {
        &self.body
    }

    /// Class names this unit calls into
    pub fn references(&self) -> &[String] {
        match &self.body {
            UnitBody::Compiled(class) => &class.references,
            UnitBody::Native(_) => &[],
        }
    }

    /// Extensions the unit was compiled with
    pub fn extensions(&self) -> &[String] {
        match &self.body {
            UnitBody::Compiled(class) => &class.extensions,
            UnitBody::Native(_) => &[],
        }
    }

    pub fn signature(&self) -> ClassSignature {
        match &self.body {
            UnitBody::Compiled(class) => class.signature(),
            UnitBody::Native(class) => class.signature(),
        }
    }

    /// Whether the unit exposes `main(String[]): void`
    pub fn has_entry_point(&self) -> bool {
        match &self.body {
            UnitBody::Compiled(class) => class.entry_point().is_some(),
            UnitBody::Native(_) => false,
        }
    }

    pub fn link(&self, name: &str, target: &Rc<LoadedUnit>) {
        self.links
            .borrow_mut()
            .insert(name.to_string(), Rc::downgrade(target));
    }

    pub fn linked(&self, name: &str) -> Option<Rc<LoadedUnit>> {
        self.links.borrow().get(name).and_then(Weak::upgrade)
    }

    /// True once every referenced class has a live link
    pub fn is_linked(&self) -> bool {
        self.references()
            .iter()
            .all(|name| self.linked(name).is_some())
    }
}

/// Turns a qualified class name into a loaded unit
pub trait UnitResolver {
    fn resolve(&self, name: &str) -> Result<Rc<LoadedUnit>, LoadError>;
}
