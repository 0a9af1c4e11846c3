//! Stack machine executing compiled methods
//!
//! Frames live on a heap stack rather than the Rust call stack. Calls to other
//! classes go through the caller's link table, so every unit a method touches
//! must have been resolved and linked beforehand.

use std::io::Write;
use std::rc::Rc;

use mirah_compiler::{ClassFile, Instr, MethodCode};

use crate::error::{InvokeError, Result, RuntimeError};
use crate::unit::{LoadedUnit, UnitBody};
use crate::value::Value;

/// Maximum nesting of calls before a [`RuntimeError::StackOverflow`]
pub const MAX_CALL_DEPTH: usize = 10_000;

pub struct Vm<W: Write> {
    out: W,
}

/// What a frame asks the VM to do next
enum Step {
    Continue,
    Call {
        unit: Rc<LoadedUnit>,
        method: String,
        arguments: Vec<Value>,
    },
    Return(Value),
}

/// Outcome of entering a method
enum Entered {
    /// Native methods complete immediately
    Value(Value),
    Frame(Frame),
}

impl<W: Write> Vm<W> {
    /// Create a VM writing `puts` output to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Invoke `method` on `unit`, wrapping any failure in an [`InvokeError`]
    pub fn invoke(
        &mut self,
        unit: &Rc<LoadedUnit>,
        method: &str,
        arguments: Vec<Value>,
    ) -> std::result::Result<Value, InvokeError> {
        tracing::debug!(class = unit.name(), method, "invoking");
        self.run(unit, method, arguments)
            .map_err(|source| InvokeError::Target {
                class: unit.name().to_string(),
                method: method.to_string(),
                source,
            })
    }

    fn run(&mut self, unit: &Rc<LoadedUnit>, method: &str, arguments: Vec<Value>) -> Result<Value> {
        let mut frames = match enter(unit, method, arguments)? {
            Entered::Value(value) => return Ok(value),
            Entered::Frame(frame) => vec![frame],
        };

        while let Some(frame) = frames.last_mut() {
            let step = match frame.step(&mut self.out) {
                Ok(step) => step,
                Err(err) => {
                    frame.log_failure(&err);
                    return Err(err);
                }
            };

            match step {
                Step::Continue => {}
                Step::Call {
                    unit,
                    method,
                    arguments,
                } => {
                    if frames.len() >= MAX_CALL_DEPTH {
                        return Err(RuntimeError::StackOverflow {
                            class: unit.name().to_string(),
                            method,
                        });
                    }
                    match enter(&unit, &method, arguments)? {
                        Entered::Value(value) => {
                            if let Some(caller) = frames.last_mut() {
                                caller.push_result(value);
                            }
                        }
                        Entered::Frame(frame) => frames.push(frame),
                    }
                }
                Step::Return(value) => {
                    frames.pop();
                    match frames.last_mut() {
                        Some(caller) => caller.push_result(value),
                        None => return Ok(value),
                    }
                }
            }
        }
        Ok(Value::Void)
    }
}

fn enter(unit: &Rc<LoadedUnit>, method: &str, arguments: Vec<Value>) -> Result<Entered> {
    match unit.body() {
        UnitBody::Native(class) => class.call(method, &arguments).map(Entered::Value),
        UnitBody::Compiled(class) => {
            let index = class
                .methods
                .iter()
                .position(|code| code.name == method)
                .ok_or_else(|| RuntimeError::UndefinedMethod {
                    class: class.name.clone(),
                    method: method.to_string(),
                })?;
            let code = &class.methods[index];
            if code.params.len() != arguments.len() {
                return Err(RuntimeError::WrongArity {
                    class: class.name.clone(),
                    method: method.to_string(),
                    expected: code.params.len(),
                    found: arguments.len(),
                });
            }

            let mut locals = arguments;
            locals.resize((code.locals as usize).max(code.params.len()), Value::Void);
            Ok(Entered::Frame(Frame {
                unit: Rc::clone(unit),
                method: index,
                locals,
                stack: Vec::new(),
                pc: 0,
            }))
        }
    }
}

/// One activation of a compiled method
struct Frame {
    unit: Rc<LoadedUnit>,
    /// Index into the unit's methods
    method: usize,
    locals: Vec<Value>,
    stack: Vec<Value>,
    pc: usize,
}

impl Frame {
    fn class(unit: &LoadedUnit) -> Result<&ClassFile> {
        match unit.body() {
            UnitBody::Compiled(class) => Ok(class),
            UnitBody::Native(class) => Err(RuntimeError::InvalidCode {
                class: class.name.clone(),
                method: String::new(),
                message: "native class has no code".to_string(),
            }),
        }
    }

    fn code(unit: &LoadedUnit, method: usize) -> Result<&MethodCode> {
        let class = Self::class(unit)?;
        class.methods.get(method).ok_or_else(|| RuntimeError::InvalidCode {
            class: class.name.clone(),
            method: method.to_string(),
            message: "missing method".to_string(),
        })
    }

    fn log_failure(&self, err: &RuntimeError) {
        if let Ok(code) = Self::code(&self.unit, self.method) {
            tracing::debug!(
                class = self.unit.name(),
                method = %code.name,
                line = code.line_for(self.pc.saturating_sub(1)),
                error = %err,
                "runtime failure"
            );
        }
    }

    /// Void results are not pushed; the caller never reads them
    fn push_result(&mut self, value: Value) {
        if value != Value::Void {
            self.stack.push(value);
        }
    }

    fn invalid(&self, message: impl Into<String>) -> RuntimeError {
        let method = Self::code(&self.unit, self.method)
            .map(|code| code.name.clone())
            .unwrap_or_default();
        RuntimeError::InvalidCode {
            class: self.unit.name().to_string(),
            method,
            message: message.into(),
        }
    }

    fn pop(&mut self) -> Result<Value> {
        match self.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.invalid("stack underflow")),
        }
    }

    fn pop_int(&mut self) -> Result<i64> {
        self.pop()?.as_int()
    }

    fn jump(&mut self, target: u32, len: usize) -> Result<()> {
        let target = target as usize;
        if target > len {
            return Err(self.invalid(format!("jump to {target} out of range")));
        }
        self.pc = target;
        Ok(())
    }

    fn step<W: Write>(&mut self, out: &mut W) -> Result<Step> {
        let unit = Rc::clone(&self.unit);
        let code = Self::code(&unit, self.method)?;
        let Some(instr) = code.code.get(self.pc) else {
            if code.ret.is_void() {
                return Ok(Step::Return(Value::Void));
            }
            return Err(self.invalid("finished without returning a value"));
        };
        self.pc += 1;

        match instr {
            Instr::PushInt(n) => self.stack.push(Value::Int(*n)),
            Instr::PushBool(b) => self.stack.push(Value::Boolean(*b)),
            Instr::PushStr(s) => self.stack.push(Value::String(s.clone())),
            Instr::Load(slot) => match self.locals.get(*slot as usize) {
                Some(value) => self.stack.push(value.clone()),
                None => return Err(self.invalid(format!("bad local slot {slot}"))),
            },
            Instr::Store(slot) => {
                let value = self.pop()?;
                let slot = *slot as usize;
                if slot >= self.locals.len() {
                    return Err(self.invalid(format!("bad local slot {slot}")));
                }
                self.locals[slot] = value;
            }
            Instr::Pop => {
                self.pop()?;
            }
            Instr::Neg => {
                let n = self.pop_int()?;
                self.stack.push(Value::Int(n.wrapping_neg()));
            }
            Instr::Not => {
                let b = self.pop()?.as_bool()?;
                self.stack.push(Value::Boolean(!b));
            }
            Instr::Add | Instr::Sub | Instr::Mul | Instr::Div | Instr::Mod => {
                let right = self.pop_int()?;
                let left = self.pop_int()?;
                self.stack.push(Value::Int(arithmetic(instr, left, right)?));
            }
            Instr::Concat => {
                let right = self.pop()?;
                let left = self.pop()?;
                self.stack
                    .push(Value::String(left.to_string_repr() + &right.to_string_repr()));
            }
            Instr::Eq | Instr::Ne => {
                let right = self.pop()?;
                let left = self.pop()?;
                let equal = left == right;
                let result = if matches!(instr, Instr::Eq) { equal } else { !equal };
                self.stack.push(Value::Boolean(result));
            }
            Instr::Lt | Instr::Le | Instr::Gt | Instr::Ge => {
                let right = self.pop_int()?;
                let left = self.pop_int()?;
                let result = match instr {
                    Instr::Lt => left < right,
                    Instr::Le => left <= right,
                    Instr::Gt => left > right,
                    _ => left >= right,
                };
                self.stack.push(Value::Boolean(result));
            }
            Instr::Index => {
                let index = self.pop_int()?;
                let value = match self.pop()? {
                    Value::Array(items) => usize::try_from(index)
                        .ok()
                        .and_then(|i| items.get(i).cloned())
                        .ok_or(RuntimeError::IndexOutOfBounds {
                            index,
                            length: items.len(),
                        })?,
                    other => return Err(RuntimeError::type_error("array", other.type_name())),
                };
                self.stack.push(value);
            }
            Instr::Length => {
                let length = match self.pop()? {
                    Value::Array(items) => items.len(),
                    Value::String(s) => s.chars().count(),
                    other => {
                        return Err(RuntimeError::type_error("array or String", other.type_name()));
                    }
                };
                self.stack.push(Value::Int(length as i64));
            }
            Instr::Jump(target) => self.jump(*target, code.code.len())?,
            Instr::JumpIfFalse(target) => {
                if !self.pop()?.as_bool()? {
                    self.jump(*target, code.code.len())?;
                }
            }
            Instr::Call {
                class,
                method,
                argc,
            } => {
                let argc = *argc as usize;
                if self.stack.len() < argc {
                    return Err(self.invalid("stack underflow"));
                }
                let arguments = self.stack.split_off(self.stack.len() - argc);
                let target = if class == unit.name() {
                    Rc::clone(&unit)
                } else {
                    unit.linked(class).ok_or_else(|| RuntimeError::Unlinked {
                        class: class.clone(),
                    })?
                };
                return Ok(Step::Call {
                    unit: target,
                    method: method.clone(),
                    arguments,
                });
            }
            Instr::Puts => {
                let value = self.pop()?;
                writeln!(out, "{}", value.to_string_repr()).map_err(|err| RuntimeError::Output {
                    message: err.to_string(),
                })?;
            }
            Instr::Raise => {
                let value = self.pop()?;
                return Err(RuntimeError::raised(value.to_string_repr()));
            }
            Instr::Return => return self.pop().map(Step::Return),
            Instr::ReturnVoid => return Ok(Step::Return(Value::Void)),
        }
        Ok(Step::Continue)
    }
}

fn arithmetic(instr: &Instr, left: i64, right: i64) -> Result<i64> {
    match instr {
        Instr::Add => Ok(left.wrapping_add(right)),
        Instr::Sub => Ok(left.wrapping_sub(right)),
        Instr::Mul => Ok(left.wrapping_mul(right)),
        Instr::Div if right == 0 => Err(RuntimeError::DivisionByZero),
        Instr::Div => Ok(left.wrapping_div(right)),
        Instr::Mod if right == 0 => Err(RuntimeError::DivisionByZero),
        _ => Ok(left.wrapping_rem(right)),
    }
}
