//! Core type representation
//!
//! Mirah values are primitive (`int`, `boolean`), `String`, or arrays of those.
//! Classes only carry static methods, so a class never appears as a value type.

use std::fmt;

use mirah_parser::TypeAnnotation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Int,
    Boolean,
    String,
    Void,
    Array(Box<Type>),
}

impl Type {
    pub fn array_of(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    /// Parse a written type such as `int`, `String` or `String[][]`
    pub fn parse(text: &str) -> Option<Self> {
        let base = text.trim_end_matches("[]");
        let dimensions = (text.len() - base.len()) / 2;
        Self::from_parts(base, dimensions)
    }

    pub fn from_annotation(annotation: &TypeAnnotation) -> Option<Self> {
        Self::from_parts(&annotation.name, annotation.dimensions)
    }

    fn from_parts(base: &str, dimensions: usize) -> Option<Self> {
        let mut ty = match base {
            "int" => Type::Int,
            "boolean" => Type::Boolean,
            "String" => Type::String,
            "void" if dimensions == 0 => Type::Void,
            _ => return None,
        };
        for _ in 0..dimensions {
            ty = Type::array_of(ty);
        }
        Some(ty)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Boolean => write!(f, "boolean"),
            Type::String => write!(f, "String"),
            Type::Void => write!(f, "void"),
            Type::Array(element) => write!(f, "{element}[]"),
        }
    }
}

/// Signature of a callable class method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>, params: Vec<Type>, ret: Type) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
        }
    }

    /// `main(String[]): void`
    pub fn is_entry_point(&self) -> bool {
        self.name == "main"
            && self.params == [Type::array_of(Type::String)]
            && self.ret == Type::Void
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self.params.iter().map(Type::to_string).collect();
        write!(f, "{}({}): {}", self.name, params.join(", "), self.ret)
    }
}

/// Method table of a class that lives outside the batch being compiled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSignature {
    pub qualified_name: String,
    pub methods: Vec<MethodSignature>,
}

impl ClassSignature {
    pub fn new(qualified_name: impl Into<String>, methods: Vec<MethodSignature>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            methods,
        }
    }
}
