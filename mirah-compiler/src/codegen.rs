//! Code generation from annotated ASTs
//!
//! Every class (nested classes included) becomes one [`GeneratedUnit`]. The
//! typechecker must have run first: expressions without a type, calls without
//! a resolved class and top-level items outside a class are internal errors.

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexSet;
use mirah_parser::{
    BinaryOperator, Block, ClassDefinition, ClassMember, Expression, ExpressionKind, ItemKind,
    MethodDefinition, Program, Statement, StatementKind, UnaryOperator,
};
use mirah_typechecker::{qualify, Type};

use crate::bytecode::{ClassFile, Instr, MethodCode, TargetVersion, MAGIC};
use crate::error::{CodegenError, CodegenResult};
use crate::listing;

/// Output format selected with `--backend`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Loadable class payloads (`.mbc`)
    #[default]
    Bytecode,
    /// Human-readable listings (`.masm`), not loadable
    Listing,
}

impl Backend {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "bytecode" => Some(Backend::Bytecode),
            "listing" => Some(Backend::Listing),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Backend::Bytecode => "mbc",
            Backend::Listing => "masm",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodegenOptions {
    pub backend: Backend,
    pub target: TargetVersion,
    /// Extension names written into every payload
    pub extensions: Vec<String>,
}

/// One generated class, ready for a sink
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedUnit {
    pub qualified_name: String,
    /// `a/b/Name.ext` for `a.b.Name`
    pub relative_path: PathBuf,
    pub payload: Vec<u8>,
}

/// Path of a class relative to the output directory
pub fn relative_path(qualified_name: &str, extension: &str) -> PathBuf {
    let (package, class) = match qualified_name.rsplit_once('.') {
        Some((package, class)) => (Some(package), class),
        None => (None, qualified_name),
    };

    let mut path = PathBuf::new();
    if let Some(package) = package {
        path.extend(package.split('.'));
    }
    path.push(format!("{class}.{extension}"));
    path
}

pub struct Compiler {
    options: CodegenOptions,
}

impl Compiler {
    pub fn new(options: CodegenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodegenOptions {
        &self.options
    }

    /// Compile one annotated program, handing each unit to `emit` as soon as
    /// it is generated
    pub fn compile<E>(
        &self,
        program: &Program,
        mut emit: impl FnMut(GeneratedUnit) -> Result<(), E>,
    ) -> Result<(), E>
    where
        E: From<CodegenError>,
    {
        let file = program.source_name.as_str();
        let package = program.package_name();

        for item in &program.items {
            match &item.kind {
                ItemKind::Class(class) => {
                    self.compile_class(file, package, None, class, &mut emit)?;
                }
                ItemKind::Method(method) => {
                    return Err(CodegenError::internal(
                        "top-level method was not moved into a class",
                        file,
                        Some(&item.span),
                        Some(format!("def {}", method.name.name)),
                    )
                    .into());
                }
                ItemKind::Statement(_) => {
                    return Err(CodegenError::internal(
                        "top-level statement was not moved into a class",
                        file,
                        Some(&item.span),
                        None,
                    )
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Compile a program to class files without encoding them
    pub fn class_files(&self, program: &Program) -> CodegenResult<Vec<ClassFile>> {
        let file = program.source_name.as_str();
        let mut classes = Vec::new();
        for class in program.classes() {
            self.collect_class_files(file, program.package_name(), None, class, &mut classes)?;
        }
        Ok(classes)
    }

    fn collect_class_files(
        &self,
        file: &str,
        package: Option<&str>,
        enclosing: Option<&str>,
        class: &ClassDefinition,
        out: &mut Vec<ClassFile>,
    ) -> CodegenResult<()> {
        let class_file = self.class_file(file, package, enclosing, class)?;
        let name = class_file.name.clone();
        out.push(class_file);
        for nested in class.nested_classes() {
            self.collect_class_files(file, package, Some(&name), nested, out)?;
        }
        Ok(())
    }

    fn compile_class<E>(
        &self,
        file: &str,
        package: Option<&str>,
        enclosing: Option<&str>,
        class: &ClassDefinition,
        emit: &mut dyn FnMut(GeneratedUnit) -> Result<(), E>,
    ) -> Result<(), E>
    where
        E: From<CodegenError>,
    {
        let class_file = self.class_file(file, package, enclosing, class)?;
        let name = class_file.name.clone();

        let payload = match self.options.backend {
            Backend::Bytecode => class_file.encode()?,
            Backend::Listing => listing::render(&class_file).into_bytes(),
        };
        tracing::debug!(class = %name, bytes = payload.len(), "generated unit");

        emit(GeneratedUnit {
            relative_path: relative_path(&name, self.options.backend.extension()),
            qualified_name: name.clone(),
            payload,
        })?;

        for nested in class.nested_classes() {
            self.compile_class(file, package, Some(&name), nested, emit)?;
        }
        Ok(())
    }

    fn class_file(
        &self,
        file: &str,
        package: Option<&str>,
        enclosing: Option<&str>,
        class: &ClassDefinition,
    ) -> CodegenResult<ClassFile> {
        let name = qualify(package, enclosing, &class.name.name);
        let mut references = IndexSet::new();
        let mut methods = Vec::new();

        for member in &class.members {
            if let ClassMember::Method(method) = member {
                let emitter = MethodEmitter::new(file, &name, &mut references);
                methods.push(emitter.emit(method)?);
            }
        }

        Ok(ClassFile {
            magic: MAGIC,
            target: self.options.target,
            source_file: file.to_string(),
            references: references.into_iter().collect(),
            methods,
            extensions: self.options.extensions.clone(),
            name,
        })
    }
}

/// Emits the code of one method
struct MethodEmitter<'a> {
    file: &'a str,
    class: &'a str,
    references: &'a mut IndexSet<String>,
    locals: HashMap<String, u16>,
    code: Vec<Instr>,
    lines: Vec<(u32, u32)>,
}

impl<'a> MethodEmitter<'a> {
    fn new(file: &'a str, class: &'a str, references: &'a mut IndexSet<String>) -> Self {
        Self {
            file,
            class,
            references,
            locals: HashMap::new(),
            code: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn emit(mut self, method: &MethodDefinition) -> CodegenResult<MethodCode> {
        let mut params = Vec::new();
        for parameter in &method.parameters {
            let ty = Type::from_annotation(&parameter.type_annotation).ok_or_else(|| {
                self.internal(
                    "parameter type was not resolved",
                    Some(&parameter.span),
                    Some(format!("parameter {}", parameter.name.name)),
                )
            })?;
            self.slot(&parameter.name.name);
            params.push(ty);
        }

        let ret = method
            .return_type_info
            .as_ref()
            .and_then(|info| Type::parse(&info.resolved_type))
            .ok_or_else(|| {
                self.internal(
                    "method has no inferred return type",
                    Some(&method.span),
                    Some(format!("def {}", method.name.name)),
                )
            })?;

        if let Some((last, init)) = method.body.statements.split_last() {
            for statement in init {
                self.statement(statement)?;
            }
            match &last.kind {
                StatementKind::Expression(expression) if !ret.is_void() => {
                    self.mark_line(last);
                    self.expression(expression)?;
                    self.code.push(Instr::Return);
                }
                _ => self.statement(last)?,
            }
        }

        if ret.is_void() {
            self.code.push(Instr::ReturnVoid);
        } else if !method.body.ends_with_expression() && !method.body.always_exits() {
            return Err(self.internal(
                "method can finish without returning a value",
                Some(&method.span),
                Some(format!("def {}", method.name.name)),
            ));
        }

        Ok(MethodCode {
            name: method.name.name.clone(),
            params,
            ret,
            locals: self.locals.len() as u16,
            code: self.code,
            lines: self.lines,
        })
    }

    fn internal(&self, message: &str, span: Option<&mirah_parser::Span>, node: Option<String>) -> CodegenError {
        CodegenError::internal(message, self.file, span, node)
    }

    fn slot(&mut self, name: &str) -> u16 {
        let next = self.locals.len() as u16;
        *self.locals.entry(name.to_string()).or_insert(next)
    }

    fn mark_line(&mut self, statement: &Statement) {
        self.lines
            .push((self.code.len() as u32, statement.span.start_line() as u32));
    }

    fn placeholder(&mut self, instr: Instr) -> usize {
        self.code.push(instr);
        self.code.len() - 1
    }

    /// Point the jump at `at` to the next instruction
    fn patch(&mut self, at: usize) {
        let target = self.code.len() as u32;
        if let Instr::Jump(to) | Instr::JumpIfFalse(to) = &mut self.code[at] {
            *to = target;
        }
    }

    fn block(&mut self, block: &Block) -> CodegenResult<()> {
        for statement in &block.statements {
            self.statement(statement)?;
        }
        Ok(())
    }

    fn statement(&mut self, statement: &Statement) -> CodegenResult<()> {
        self.mark_line(statement);

        match &statement.kind {
            StatementKind::Expression(expression) => {
                let ty = self.type_of(expression)?;
                self.expression(expression)?;
                if !ty.is_void() {
                    self.code.push(Instr::Pop);
                }
            }
            StatementKind::Assignment(assignment) => {
                self.expression(&assignment.value)?;
                let slot = self.slot(&assignment.target.name);
                self.code.push(Instr::Store(slot));
            }
            StatementKind::If(if_statement) => {
                let mut exits = Vec::new();
                for branch in &if_statement.branches {
                    self.expression(&branch.condition)?;
                    let skip = self.placeholder(Instr::JumpIfFalse(0));
                    self.block(&branch.body)?;
                    exits.push(self.placeholder(Instr::Jump(0)));
                    self.patch(skip);
                }
                if let Some(else_block) = &if_statement.else_block {
                    self.block(else_block)?;
                }
                for exit in exits {
                    self.patch(exit);
                }
            }
            StatementKind::While(while_loop) => {
                let start = self.code.len() as u32;
                self.expression(&while_loop.condition)?;
                let exit = self.placeholder(Instr::JumpIfFalse(0));
                self.block(&while_loop.body)?;
                self.code.push(Instr::Jump(start));
                self.patch(exit);
            }
            StatementKind::Return(Some(value)) => {
                self.expression(value)?;
                self.code.push(Instr::Return);
            }
            StatementKind::Return(None) => self.code.push(Instr::ReturnVoid),
            StatementKind::Puts(value) => {
                self.expression(value)?;
                self.code.push(Instr::Puts);
            }
            StatementKind::Raise(value) => {
                self.expression(value)?;
                self.code.push(Instr::Raise);
            }
        }
        Ok(())
    }

    fn type_of(&self, expression: &Expression) -> CodegenResult<Type> {
        expression
            .type_info
            .as_ref()
            .and_then(|info| Type::parse(&info.resolved_type))
            .ok_or_else(|| {
                self.internal(
                    "expression reached codegen without a type",
                    Some(&expression.span),
                    Some(node_label(&expression.kind)),
                )
            })
    }

    fn expression(&mut self, expression: &Expression) -> CodegenResult<()> {
        let ty = self.type_of(expression)?;

        match &expression.kind {
            ExpressionKind::Integer(value) => self.code.push(Instr::PushInt(*value)),
            ExpressionKind::Boolean(value) => self.code.push(Instr::PushBool(*value)),
            ExpressionKind::String(value) => self.code.push(Instr::PushStr(value.clone())),
            ExpressionKind::Local(identifier) => {
                let slot = *self.locals.get(&identifier.name).ok_or_else(|| {
                    self.internal(
                        "local has no slot",
                        Some(&identifier.span),
                        Some(node_label(&expression.kind)),
                    )
                })?;
                self.code.push(Instr::Load(slot));
            }
            ExpressionKind::Call(call) => {
                let class = call.resolved_class.clone().ok_or_else(|| {
                    self.internal(
                        "call target was not resolved",
                        Some(&expression.span),
                        Some(node_label(&expression.kind)),
                    )
                })?;
                for argument in &call.arguments {
                    self.expression(argument)?;
                }
                if class != self.class {
                    self.references.insert(class.clone());
                }
                self.code.push(Instr::Call {
                    class,
                    method: call.method.name.clone(),
                    argc: call.arguments.len() as u16,
                });
            }
            ExpressionKind::Index { target, index } => {
                self.expression(target)?;
                self.expression(index)?;
                self.code.push(Instr::Index);
            }
            ExpressionKind::Length(target) => {
                self.expression(target)?;
                self.code.push(Instr::Length);
            }
            ExpressionKind::Unary { operator, operand } => {
                self.expression(operand)?;
                self.code.push(match operator {
                    UnaryOperator::Negate => Instr::Neg,
                    UnaryOperator::Not => Instr::Not,
                });
            }
            ExpressionKind::Binary {
                left,
                operator: BinaryOperator::And,
                right,
            } => {
                self.expression(left)?;
                let short = self.placeholder(Instr::JumpIfFalse(0));
                self.expression(right)?;
                let done = self.placeholder(Instr::Jump(0));
                self.patch(short);
                self.code.push(Instr::PushBool(false));
                self.patch(done);
            }
            ExpressionKind::Binary {
                left,
                operator: BinaryOperator::Or,
                right,
            } => {
                self.expression(left)?;
                let rhs = self.placeholder(Instr::JumpIfFalse(0));
                self.code.push(Instr::PushBool(true));
                let done = self.placeholder(Instr::Jump(0));
                self.patch(rhs);
                self.expression(right)?;
                self.patch(done);
            }
            ExpressionKind::Binary {
                left,
                operator,
                right,
            } => {
                self.expression(left)?;
                self.expression(right)?;
                self.code.push(match operator {
                    BinaryOperator::Add if ty == Type::String => Instr::Concat,
                    BinaryOperator::Add => Instr::Add,
                    BinaryOperator::Subtract => Instr::Sub,
                    BinaryOperator::Multiply => Instr::Mul,
                    BinaryOperator::Divide => Instr::Div,
                    BinaryOperator::Modulo => Instr::Mod,
                    BinaryOperator::Equal => Instr::Eq,
                    BinaryOperator::NotEqual => Instr::Ne,
                    BinaryOperator::Less => Instr::Lt,
                    BinaryOperator::LessEqual => Instr::Le,
                    BinaryOperator::Greater => Instr::Gt,
                    BinaryOperator::GreaterEqual => Instr::Ge,
                    BinaryOperator::And | BinaryOperator::Or => unreachable!("handled above"),
                });
            }
        }
        Ok(())
    }
}

/// Short description of a node for internal error reports
fn node_label(kind: &ExpressionKind) -> String {
    match kind {
        ExpressionKind::Integer(value) => format!("integer {value}"),
        ExpressionKind::Boolean(value) => format!("boolean {value}"),
        ExpressionKind::String(value) => format!("string {value:?}"),
        ExpressionKind::Local(identifier) => format!("local {}", identifier.name),
        ExpressionKind::Call(call) => match &call.receiver {
            Some(receiver) => format!("call {}.{}", receiver.name, call.method.name),
            None => format!("call {}", call.method.name),
        },
        ExpressionKind::Index { .. } => "index".to_string(),
        ExpressionKind::Length(_) => "length".to_string(),
        ExpressionKind::Unary { .. } => "unary operation".to_string(),
        ExpressionKind::Binary { operator, .. } => format!("operator {}", operator.symbol()),
    }
}
