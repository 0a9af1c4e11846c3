//! Native classes available to compiled code
//!
//! `Integer` is always present. Other classes come from named extensions that
//! must be enabled for a run (`--plugin math`).

use indexmap::IndexMap;
use mirah_typechecker::{ClassSignature, MethodSignature, Type};

use crate::error::{Result, RuntimeError};
use crate::value::Value;

/// Type alias for native method implementations
pub type NativeFunction = fn(&[Value]) -> Result<Value>;

#[derive(Debug, Clone)]
pub struct NativeMethod {
    pub signature: MethodSignature,
    pub function: NativeFunction,
}

/// A class implemented in Rust
#[derive(Debug, Clone)]
pub struct NativeClass {
    pub name: String,
    methods: IndexMap<String, NativeMethod>,
}

impl NativeClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: IndexMap::new(),
        }
    }

    fn register(&mut self, name: &str, params: Vec<Type>, ret: Type, function: NativeFunction) {
        self.methods.insert(
            name.to_string(),
            NativeMethod {
                signature: MethodSignature::new(name, params, ret),
                function,
            },
        );
    }

    pub fn method(&self, name: &str) -> Option<&NativeMethod> {
        self.methods.get(name)
    }

    pub fn signature(&self) -> ClassSignature {
        ClassSignature::new(
            self.name.clone(),
            self.methods.values().map(|m| m.signature.clone()).collect(),
        )
    }

    pub fn call(&self, method: &str, arguments: &[Value]) -> Result<Value> {
        let native = self
            .method(method)
            .ok_or_else(|| RuntimeError::UndefinedMethod {
                class: self.name.clone(),
                method: method.to_string(),
            })?;

        let expected = native.signature.params.len();
        if arguments.len() != expected {
            return Err(RuntimeError::WrongArity {
                class: self.name.clone(),
                method: method.to_string(),
                expected,
                found: arguments.len(),
            });
        }
        (native.function)(arguments)
    }
}

/// The `Integer` host class
pub fn integer_class() -> NativeClass {
    let mut class = NativeClass::new("Integer");
    class.register("parse", vec![Type::String], Type::Int, integer_parse);
    class.register("to_s", vec![Type::Int], Type::String, integer_to_s);
    class
}

fn integer_parse(args: &[Value]) -> Result<Value> {
    let text = args[0].as_str()?;
    text.trim()
        .parse::<i64>()
        .map(Value::Int)
        .map_err(|_| RuntimeError::InvalidInteger {
            text: text.to_string(),
        })
}

fn integer_to_s(args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].as_int()?.to_string()))
}

/// Initialiser producing an extension's class
pub type ExtensionInit = fn() -> NativeClass;

/// Named extensions known to this build
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    extensions: IndexMap<&'static str, ExtensionInit>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionRegistry {
    /// Registry with every built-in extension
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("math", math_extension);
        registry.register("text", text_extension);
        registry
    }

    pub fn empty() -> Self {
        Self {
            extensions: IndexMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, init: ExtensionInit) {
        self.extensions.insert(name, init);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.extensions.keys().copied().collect()
    }

    /// Run the initialiser registered under `name`
    pub fn init(&self, name: &str) -> Option<NativeClass> {
        self.extensions.get(name).map(|init| init())
    }
}

fn math_extension() -> NativeClass {
    let mut class = NativeClass::new("Math");
    class.register("max", vec![Type::Int, Type::Int], Type::Int, math_max);
    class.register("min", vec![Type::Int, Type::Int], Type::Int, math_min);
    class.register("abs", vec![Type::Int], Type::Int, math_abs);
    class.register("pow", vec![Type::Int, Type::Int], Type::Int, math_pow);
    class
}

fn math_max(args: &[Value]) -> Result<Value> {
    Ok(Value::Int(args[0].as_int()?.max(args[1].as_int()?)))
}

fn math_min(args: &[Value]) -> Result<Value> {
    Ok(Value::Int(args[0].as_int()?.min(args[1].as_int()?)))
}

fn math_abs(args: &[Value]) -> Result<Value> {
    Ok(Value::Int(args[0].as_int()?.wrapping_abs()))
}

fn math_pow(args: &[Value]) -> Result<Value> {
    let base = args[0].as_int()?;
    let exponent = args[1].as_int()?;
    let exponent = u32::try_from(exponent)
        .map_err(|_| RuntimeError::raised(format!("negative exponent {exponent}")))?;
    Ok(Value::Int(base.wrapping_pow(exponent)))
}

fn text_extension() -> NativeClass {
    let mut class = NativeClass::new("Text");
    class.register("upcase", vec![Type::String], Type::String, text_upcase);
    class.register("downcase", vec![Type::String], Type::String, text_downcase);
    class.register("reverse", vec![Type::String], Type::String, text_reverse);
    class.register("length", vec![Type::String], Type::Int, text_length);
    class
}

fn text_upcase(args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].as_str()?.to_uppercase()))
}

fn text_downcase(args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].as_str()?.to_lowercase()))
}

fn text_reverse(args: &[Value]) -> Result<Value> {
    Ok(Value::String(args[0].as_str()?.chars().rev().collect()))
}

fn text_length(args: &[Value]) -> Result<Value> {
    Ok(Value::Int(args[0].as_str()?.chars().count() as i64))
}
