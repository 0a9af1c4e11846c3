//! Class registry shared by every unit of a batch
//!
//! Classes are keyed by qualified name (`pkg.Outer$Inner`). Batch classes are
//! declared up front; classes from outside the batch are pulled in lazily from
//! a [`SignatureSource`] and cached.

use crate::error::TypeError;
use crate::types::{ClassSignature, Type};
use indexmap::IndexMap;
use mirah_parser::Span;

/// Provider of class signatures that are not part of the batch
/// (host classes, enabled extensions, previously compiled units)
pub trait SignatureSource {
    fn class_signature(&self, qualified_name: &str) -> Option<ClassSignature>;
}

/// Source used when nothing outside the batch is visible
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExternalSignatures;

impl SignatureSource for NoExternalSignatures {
    fn class_signature(&self, _qualified_name: &str) -> Option<ClassSignature> {
        None
    }
}

/// Join a package, an enclosing class and a simple name
pub fn qualify(package: Option<&str>, enclosing: Option<&str>, name: &str) -> String {
    match (enclosing, package) {
        (Some(outer), _) => format!("{outer}${name}"),
        (None, Some(package)) => format!("{package}.{name}"),
        (None, None) => name.to_string(),
    }
}

/// Name after the last `.` or `$`
pub fn simple_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit(['.', '$'])
        .next()
        .unwrap_or(qualified_name)
}

/// State of a method's return type during inference
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnType {
    Declared(Type),
    Inferred(Type),
    /// Not yet inferred
    Pending,
    /// Annotation could not be resolved (already reported)
    Invalid,
}

impl ReturnType {
    pub fn known(&self) -> Option<&Type> {
        match self {
            ReturnType::Declared(ty) | ReturnType::Inferred(ty) => Some(ty),
            ReturnType::Pending | ReturnType::Invalid => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodEntry {
    pub name: String,
    /// `None` for a parameter whose annotation could not be resolved
    pub params: Vec<Option<Type>>,
    pub ret: ReturnType,
    /// Declaring file and span, for batch methods
    pub origin: Option<(String, Span)>,
}

impl MethodEntry {
    fn is_declared_at(&self, file: &str, span: &Span) -> bool {
        matches!(&self.origin, Some((origin_file, origin_span)) if origin_file == file && origin_span == span)
    }
}

#[derive(Debug, Clone)]
pub struct ClassEntry {
    pub qualified_name: String,
    pub package: Option<String>,
    pub enclosing: Option<String>,
    pub methods: IndexMap<String, MethodEntry>,
    /// Loaded from a [`SignatureSource`] rather than declared in the batch
    pub external: bool,
}

impl ClassEntry {
    fn from_signature(signature: ClassSignature) -> Self {
        let methods = signature
            .methods
            .into_iter()
            .map(|method| {
                let entry = MethodEntry {
                    name: method.name.clone(),
                    params: method.params.into_iter().map(Some).collect(),
                    ret: ReturnType::Declared(method.ret),
                    origin: None,
                };
                (method.name, entry)
            })
            .collect();

        Self {
            qualified_name: signature.qualified_name,
            package: None,
            enclosing: None,
            methods,
            external: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: IndexMap<String, ClassEntry>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a batch class; declaring the same name again reopens it
    pub fn declare_class(
        &mut self,
        qualified_name: &str,
        package: Option<&str>,
        enclosing: Option<&str>,
    ) {
        self.classes
            .entry(qualified_name.to_string())
            .or_insert_with(|| ClassEntry {
                qualified_name: qualified_name.to_string(),
                package: package.map(str::to_string),
                enclosing: enclosing.map(str::to_string),
                methods: IndexMap::new(),
                external: false,
            });
    }

    /// Add a method to a declared class
    pub fn declare_method(&mut self, class: &str, method: MethodEntry) -> Result<(), TypeError> {
        let entry = self
            .classes
            .get_mut(class)
            .ok_or_else(|| TypeError::UnknownClass {
                name: class.to_string(),
            })?;

        if entry.methods.contains_key(&method.name) {
            return Err(TypeError::DuplicateMethod {
                class: class.to_string(),
                method: method.name,
            });
        }
        entry.methods.insert(method.name.clone(), method);
        Ok(())
    }

    pub fn class(&self, qualified_name: &str) -> Option<&ClassEntry> {
        self.classes.get(qualified_name)
    }

    pub fn method(&self, class: &str, method: &str) -> Option<&MethodEntry> {
        self.classes.get(class)?.methods.get(method)
    }

    /// The registered method of `class` declared at exactly `file`/`span`.
    ///
    /// A duplicate definition is never registered, so it has no entry.
    pub fn declared_method(&self, class: &str, name: &str, file: &str, span: &Span) -> Option<&MethodEntry> {
        self.method(class, name)
            .filter(|method| method.is_declared_at(file, span))
    }

    pub fn set_return_type(&mut self, class: &str, method: &str, ret: ReturnType) {
        if let Some(entry) = self
            .classes
            .get_mut(class)
            .and_then(|class| class.methods.get_mut(method))
        {
            entry.ret = ret;
        }
    }

    pub fn batch_classes(&self) -> impl Iterator<Item = &ClassEntry> {
        self.classes.values().filter(|class| !class.external)
    }

    /// Resolve a class name as written inside `from` (a batch class).
    ///
    /// Looks at classes nested in `from` and its enclosing classes, then the
    /// package of `from`, then any batch class with that simple name, and
    /// finally the external source.
    pub fn resolve_class(
        &mut self,
        name: &str,
        from: &str,
        externals: &dyn SignatureSource,
    ) -> Result<String, TypeError> {
        let mut scope = Some(from.to_string());
        while let Some(current) = scope {
            let candidate = format!("{current}${name}");
            if self.classes.contains_key(&candidate) {
                return Ok(candidate);
            }
            scope = self
                .classes
                .get(&current)
                .and_then(|class| class.enclosing.clone());
        }

        let package = self
            .classes
            .get(from)
            .and_then(|class| class.package.clone());
        let same_package = qualify(package.as_deref(), None, name);
        if self.classes.contains_key(&same_package) {
            return Ok(same_package);
        }

        let matches: Vec<&str> = self
            .batch_classes()
            .filter(|class| simple_name(&class.qualified_name) == name)
            .map(|class| class.qualified_name.as_str())
            .collect();
        match matches.as_slice() {
            [only] => return Ok((*only).to_string()),
            [] => {}
            candidates => {
                return Err(TypeError::AmbiguousClass {
                    name: name.to_string(),
                    candidates: candidates.join(", "),
                })
            }
        }

        for candidate in [same_package.as_str(), name] {
            if let Some(signature) = externals.class_signature(candidate) {
                let qualified_name = signature.qualified_name.clone();
                tracing::trace!(class = %qualified_name, "loaded external signature");
                self.classes
                    .entry(qualified_name.clone())
                    .or_insert_with(|| ClassEntry::from_signature(signature));
                return Ok(qualified_name);
            }
        }

        Err(TypeError::UnknownClass {
            name: name.to_string(),
        })
    }

    /// Find `method` on `class` or, failing that, on its enclosing classes
    pub fn resolve_local_method(&self, class: &str, method: &str) -> Option<(String, &MethodEntry)> {
        let mut scope = Some(class);
        while let Some(current) = scope {
            let entry = self.classes.get(current)?;
            if let Some(found) = entry.methods.get(method) {
                return Some((current.to_string(), found));
            }
            scope = entry.enclosing.as_deref();
        }
        None
    }
}
