//! Class payload format
//!
//! One [`ClassFile`] per generated class, serialized with bincode. Calls name
//! their target class by qualified name and are bound when the unit is linked.

use std::fmt;

use mirah_typechecker::{ClassSignature, MethodSignature, Type};
use serde::{Deserialize, Serialize};

use crate::error::CodegenError;

/// `MIRA`
pub const MAGIC: u32 = 0x4D49_5241;

/// Target version recorded in every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TargetVersion {
    V1,
    V2,
    V3,
    #[default]
    V4,
}

impl TargetVersion {
    /// Parse a `--target` token (`v1` to `v4`)
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "v1" | "1" => Some(TargetVersion::V1),
            "v2" | "2" => Some(TargetVersion::V2),
            "v3" | "3" => Some(TargetVersion::V3),
            "v4" | "4" => Some(TargetVersion::V4),
            _ => None,
        }
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            TargetVersion::V1 => "v1",
            TargetVersion::V2 => "v2",
            TargetVersion::V3 => "v3",
            TargetVersion::V4 => "v4",
        };
        write!(f, "{token}")
    }
}

/// Stack machine instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instr {
    PushInt(i64),
    PushBool(bool),
    PushStr(String),
    Load(u16),
    Store(u16),
    Pop,
    Neg,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// Stringify both operands and join them
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Index,
    Length,
    Jump(u32),
    JumpIfFalse(u32),
    Call {
        class: String,
        method: String,
        argc: u16,
    },
    Puts,
    Raise,
    Return,
    ReturnVoid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCode {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    /// Local slots, parameters included
    pub locals: u16,
    pub code: Vec<Instr>,
    /// `(pc, source line)` for the first instruction of each statement
    pub lines: Vec<(u32, u32)>,
}

impl MethodCode {
    pub fn signature(&self) -> MethodSignature {
        MethodSignature::new(self.name.clone(), self.params.clone(), self.ret.clone())
    }

    /// Source line of the statement containing `pc`
    pub fn line_for(&self, pc: usize) -> Option<u32> {
        self.lines
            .iter()
            .take_while(|(start, _)| *start as usize <= pc)
            .last()
            .map(|(_, line)| *line)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassFile {
    pub magic: u32,
    pub target: TargetVersion,
    /// Qualified name (`pkg.Outer$Inner`)
    pub name: String,
    pub source_file: String,
    /// Other classes this one calls, in first-use order
    pub references: Vec<String>,
    pub methods: Vec<MethodCode>,
    /// Extensions retained from the compiling run
    pub extensions: Vec<String>,
}

impl ClassFile {
    pub fn method(&self, name: &str) -> Option<&MethodCode> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// The `main(String[]): void` method, when present
    pub fn entry_point(&self) -> Option<&MethodCode> {
        self.methods
            .iter()
            .find(|method| method.signature().is_entry_point())
    }

    pub fn signature(&self) -> ClassSignature {
        ClassSignature::new(
            self.name.clone(),
            self.methods.iter().map(MethodCode::signature).collect(),
        )
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodegenError> {
        bincode::serialize(self).map_err(|err| CodegenError::Encode {
            class: self.name.clone(),
            message: err.to_string(),
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodegenError> {
        let class: ClassFile =
            bincode::deserialize(bytes).map_err(|err| CodegenError::Decode {
                message: err.to_string(),
            })?;
        if class.magic != MAGIC {
            return Err(CodegenError::Decode {
                message: format!("bad magic number {:#010x}", class.magic),
            });
        }
        Ok(class)
    }
}
