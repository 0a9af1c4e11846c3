//! Joint type inference over a batch of units
//!
//! Inference runs in three phases over the whole batch so that units may
//! refer to each other in any order:
//!
//! 1. every class and method signature is declared in the [`ClassRegistry`];
//! 2. undeclared return types are inferred to a fixed point;
//! 3. a final pass writes each expression's type and each call's target class
//!    into the AST and collects diagnostics.

use std::collections::HashMap;

use mirah_parser::{
    BinaryOperator, Block, ClassDefinition, ClassMember, Expression, ExpressionKind, ItemKind,
    MethodCall, MethodDefinition, ParsedTypeInfo, Program, Span, Statement, StatementKind,
    TypeAnnotation, UnaryOperator,
};

use crate::error::{TypeDiagnostic, TypeError};
use crate::registry::{
    qualify, ClassRegistry, MethodEntry, NoExternalSignatures, ReturnType, SignatureSource,
};
use crate::types::Type;

/// Whole-batch type inference engine
pub struct Typer {
    registry: ClassRegistry,
    externals: Box<dyn SignatureSource>,
    diagnostics: Vec<TypeDiagnostic>,
}

impl Default for Typer {
    fn default() -> Self {
        Self::new()
    }
}

impl Typer {
    pub fn new() -> Self {
        Self::with_externals(Box::new(NoExternalSignatures))
    }

    /// Create a typer that can see classes outside the batch
    pub fn with_externals(externals: Box<dyn SignatureSource>) -> Self {
        Self {
            registry: ClassRegistry::new(),
            externals,
            diagnostics: Vec::new(),
        }
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Infer and annotate every unit of the batch together
    pub fn infer(&mut self, batch: &mut [Program]) {
        self.declare(batch);
        self.infer_return_types(batch);
        self.annotate(batch);
    }

    /// Diagnostics collected by [`Typer::infer`].
    ///
    /// Non-strict resolution returns every diagnostic; strict resolution stops
    /// at the first one.
    pub fn resolve(&self, strict: bool) -> Vec<TypeDiagnostic> {
        if strict {
            self.diagnostics.iter().take(1).cloned().collect()
        } else {
            self.diagnostics.clone()
        }
    }

    fn declare(&mut self, batch: &[Program]) {
        for program in batch {
            for class in program.classes() {
                self.declare_class(&program.source_name, program.package_name(), None, class);
            }
        }
    }

    fn declare_class(
        &mut self,
        file: &str,
        package: Option<&str>,
        enclosing: Option<&str>,
        class: &ClassDefinition,
    ) {
        let qualified_name = qualify(package, enclosing, &class.name.name);
        self.registry
            .declare_class(&qualified_name, package, enclosing);

        for member in &class.members {
            match member {
                ClassMember::Method(method) => self.declare_method(file, &qualified_name, method),
                ClassMember::Class(nested) => {
                    self.declare_class(file, package, Some(&qualified_name), nested)
                }
            }
        }
    }

    fn declare_method(&mut self, file: &str, class: &str, method: &MethodDefinition) {
        let params = method
            .parameters
            .iter()
            .map(|parameter| self.resolve_annotation(file, &parameter.type_annotation))
            .collect();

        let ret = match &method.return_type {
            Some(annotation) => match self.resolve_annotation(file, annotation) {
                Some(ty) => ReturnType::Declared(ty),
                None => ReturnType::Invalid,
            },
            None => ReturnType::Pending,
        };

        let entry = MethodEntry {
            name: method.name.name.clone(),
            params,
            ret,
            origin: Some((file.to_string(), method.span.clone())),
        };

        if let Err(error) = self.registry.declare_method(class, entry) {
            self.diagnostics.push(TypeDiagnostic::new(
                error,
                file,
                Some(method.name.span.clone()),
            ));
        }
    }

    fn resolve_annotation(&mut self, file: &str, annotation: &TypeAnnotation) -> Option<Type> {
        let ty = Type::from_annotation(annotation);
        if ty.is_none() {
            let name = format!("{}{}", annotation.name, "[]".repeat(annotation.dimensions));
            self.diagnostics.push(TypeDiagnostic::new(
                TypeError::UnknownType { name },
                file,
                Some(annotation.span.clone()),
            ));
        }
        ty
    }

    fn infer_return_types(&mut self, batch: &mut [Program]) {
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut progressed = false;

            visit_methods(batch, &mut |site, method| {
                let pending = self
                    .registry
                    .declared_method(site.class, &method.name.name, site.file, &method.span)
                    .is_some_and(|entry| entry.ret == ReturnType::Pending);
                if !pending {
                    return;
                }

                let params = self.params_of(site, method);
                let mut checker = BodyChecker::new(
                    &mut self.registry,
                    self.externals.as_ref(),
                    site,
                    method.name.name.clone(),
                    None,
                    false,
                );
                checker.check_method(method, &params);

                if let Some(ty) = checker.settled_return_type() {
                    tracing::trace!(class = site.class, method = %method.name.name, ty = %ty, "inferred return type");
                    self.registry.set_return_type(
                        site.class,
                        &method.name.name,
                        ReturnType::Inferred(ty),
                    );
                    progressed = true;
                }
            });

            if !progressed {
                break;
            }
        }
        tracing::debug!(rounds, "return type inference settled");
    }

    fn annotate(&mut self, batch: &mut [Program]) {
        visit_methods(batch, &mut |site, method| {
            let Some(entry) = self.registry.declared_method(
                site.class,
                &method.name.name,
                site.file,
                &method.span,
            ) else {
                return;
            };
            let ret = entry.ret.clone();
            let params = entry.params.clone();
            method.return_type_info = ret.known().map(|ty| ParsedTypeInfo {
                resolved_type: ty.to_string(),
            });

            if ret == ReturnType::Pending {
                self.diagnostics.push(
                    TypeDiagnostic::new(
                        TypeError::IncompleteInference {
                            class: site.class.to_string(),
                            method: method.name.name.clone(),
                        },
                        site.file,
                        Some(method.name.span.clone()),
                    )
                    .with_trace(format!("in unit {}", site.file)),
                );
            }

            let mut checker = BodyChecker::new(
                &mut self.registry,
                self.externals.as_ref(),
                site,
                method.name.name.clone(),
                ret.known().cloned(),
                true,
            );
            checker.check_method(method, &params);
            let found = checker.into_diagnostics();
            self.diagnostics.extend(found);
        });

        for program in batch.iter() {
            for item in &program.items {
                if !matches!(item.kind, ItemKind::Class(_)) {
                    tracing::warn!(unit = %program.source_name, "untransformed top-level item left for codegen");
                }
            }
        }
    }

    fn params_of(&self, site: &MethodSite, method: &MethodDefinition) -> Vec<Option<Type>> {
        self.registry
            .method(site.class, &method.name.name)
            .map(|entry| entry.params.clone())
            .unwrap_or_default()
    }
}

/// Where a method lives
struct MethodSite<'s> {
    file: &'s str,
    class: &'s str,
}

fn visit_methods(
    batch: &mut [Program],
    visit: &mut dyn FnMut(&MethodSite, &mut MethodDefinition),
) {
    for program in batch.iter_mut() {
        let file = program.source_name.clone();
        let package = program.package.as_ref().map(|package| package.name.clone());
        for item in program.items.iter_mut() {
            if let ItemKind::Class(class) = &mut item.kind {
                visit_class(&file, package.as_deref(), None, class, visit);
            }
        }
    }
}

fn visit_class(
    file: &str,
    package: Option<&str>,
    enclosing: Option<&str>,
    class: &mut ClassDefinition,
    visit: &mut dyn FnMut(&MethodSite, &mut MethodDefinition),
) {
    let qualified_name = qualify(package, enclosing, &class.name.name);
    for member in class.members.iter_mut() {
        match member {
            ClassMember::Method(method) => {
                let site = MethodSite {
                    file,
                    class: &qualified_name,
                };
                visit(&site, method);
            }
            ClassMember::Class(nested) => {
                visit_class(file, package, Some(&qualified_name), nested, visit)
            }
        }
    }
}

/// Why an expression has no type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    /// Depends on a return type that is not inferred yet
    Pending,
    /// An error was found (and reported, when reporting)
    Failed,
}

type Inferred = Result<Type, Halt>;

/// Types the body of one method
struct BodyChecker<'a> {
    registry: &'a mut ClassRegistry,
    externals: &'a dyn SignatureSource,
    file: &'a str,
    class: &'a str,
    method: String,
    locals: HashMap<String, Option<Type>>,
    expected_return: Option<Type>,
    reporting: bool,
    return_values: Vec<Type>,
    saw_pending: bool,
    diagnostics: Vec<TypeDiagnostic>,
}

impl<'a> BodyChecker<'a> {
    fn new(
        registry: &'a mut ClassRegistry,
        externals: &'a dyn SignatureSource,
        site: &'a MethodSite<'a>,
        method: String,
        expected_return: Option<Type>,
        reporting: bool,
    ) -> Self {
        Self {
            registry,
            externals,
            file: site.file,
            class: site.class,
            method,
            locals: HashMap::new(),
            expected_return,
            reporting,
            return_values: Vec::new(),
            saw_pending: false,
            diagnostics: Vec::new(),
        }
    }

    fn check_method(&mut self, method: &mut MethodDefinition, params: &[Option<Type>]) {
        for (parameter, ty) in method.parameters.iter().zip(params) {
            self.locals.insert(parameter.name.name.clone(), ty.clone());
        }

        if let Some(expected) = self.expected_return.clone() {
            let body = &method.body;
            if !expected.is_void() && !body.ends_with_expression() && !body.always_exits() {
                let error = TypeError::MissingReturn {
                    class: self.class.to_string(),
                    method: self.method.clone(),
                    expected,
                };
                self.fail(error, &method.name.span);
            }
        }

        let Some((last, init)) = method.body.statements.split_last_mut() else {
            return;
        };
        for statement in init {
            self.check_statement(statement);
        }

        match &mut last.kind {
            StatementKind::Expression(expression) => self.check_implicit_return(expression),
            _ => self.check_statement(last),
        }
    }

    /// The final expression of a method body is its value
    fn check_implicit_return(&mut self, expression: &mut Expression) {
        let found = self.infer(expression);
        match (self.expected_return.clone(), found) {
            (Some(Type::Void), _) => {}
            (Some(expected), Ok(found)) => {
                if expected != found {
                    let error = TypeError::TypeMismatch {
                        context: format!("return value of {}.{}", self.class, self.method),
                        expected,
                        found,
                    };
                    self.fail(error, &expression.span);
                }
            }
            (None, Ok(found)) => self.return_values.push(found),
            (_, Err(_)) => {}
        }
    }

    /// Return type agreed by the body, or `None` while it still depends on a
    /// pending method
    fn settled_return_type(&self) -> Option<Type> {
        match self.return_values.first() {
            Some(ty) => Some(ty.clone()),
            None if self.saw_pending => None,
            None => Some(Type::Void),
        }
    }

    fn into_diagnostics(self) -> Vec<TypeDiagnostic> {
        self.diagnostics
    }

    fn fail(&mut self, error: TypeError, span: &Span) -> Halt {
        if self.reporting {
            let trace = format!("in {}.{}\nin unit {}", self.class, self.method, self.file);
            self.diagnostics.push(
                TypeDiagnostic::new(error, self.file, Some(span.clone())).with_trace(trace),
            );
        }
        Halt::Failed
    }

    fn check_block(&mut self, block: &mut Block) {
        for statement in block.statements.iter_mut() {
            self.check_statement(statement);
        }
    }

    fn check_statement(&mut self, statement: &mut Statement) {
        match &mut statement.kind {
            StatementKind::Expression(expression) => {
                let _ = self.infer(expression);
            }
            StatementKind::Assignment(assignment) => {
                let name = assignment.target.name.clone();
                match self.value(&mut assignment.value) {
                    Ok(ty) => match self.locals.get(&name) {
                        Some(Some(existing)) if *existing != ty => {
                            let error = TypeError::TypeMismatch {
                                context: format!("assignment to {name}"),
                                expected: existing.clone(),
                                found: ty,
                            };
                            self.fail(error, &assignment.value.span);
                        }
                        Some(Some(_)) => {}
                        _ => {
                            self.locals.insert(name, Some(ty));
                        }
                    },
                    Err(_) => {
                        self.locals.entry(name).or_insert(None);
                    }
                }
            }
            StatementKind::If(if_statement) => {
                for branch in if_statement.branches.iter_mut() {
                    self.condition(&mut branch.condition);
                    self.check_block(&mut branch.body);
                }
                if let Some(else_block) = &mut if_statement.else_block {
                    self.check_block(else_block);
                }
            }
            StatementKind::While(while_loop) => {
                self.condition(&mut while_loop.condition);
                self.check_block(&mut while_loop.body);
            }
            StatementKind::Return(value) => {
                let found = match value {
                    Some(expression) => self.value(expression).ok(),
                    None => Some(Type::Void),
                };
                if let Some(found) = found {
                    if let Some(expected) = self.expected_return.clone() {
                        if expected != found {
                            let error = TypeError::TypeMismatch {
                                context: format!("return from {}.{}", self.class, self.method),
                                expected,
                                found: found.clone(),
                            };
                            self.fail(error, &statement.span);
                        }
                    }
                    self.return_values.push(found);
                }
            }
            StatementKind::Puts(expression) | StatementKind::Raise(expression) => {
                let _ = self.value(expression);
            }
        }
    }

    fn condition(&mut self, expression: &mut Expression) {
        if let Ok(found) = self.value(expression) {
            if found != Type::Boolean {
                let error = TypeError::TypeMismatch {
                    context: "condition".to_string(),
                    expected: Type::Boolean,
                    found,
                };
                self.fail(error, &expression.span);
            }
        }
    }

    /// Infer an expression that must produce a value
    fn value(&mut self, expression: &mut Expression) -> Inferred {
        let ty = self.infer(expression)?;
        if ty.is_void() {
            return Err(self.fail(TypeError::VoidValue, &expression.span));
        }
        Ok(ty)
    }

    fn infer(&mut self, expression: &mut Expression) -> Inferred {
        let result = self.infer_kind(&mut expression.kind, &expression.span);
        expression.type_info = result.as_ref().ok().map(|ty| ParsedTypeInfo {
            resolved_type: ty.to_string(),
        });
        result
    }

    fn infer_kind(&mut self, kind: &mut ExpressionKind, span: &Span) -> Inferred {
        match kind {
            ExpressionKind::Integer(_) => Ok(Type::Int),
            ExpressionKind::Boolean(_) => Ok(Type::Boolean),
            ExpressionKind::String(_) => Ok(Type::String),
            ExpressionKind::Local(identifier) => match self.locals.get(&identifier.name) {
                Some(Some(ty)) => Ok(ty.clone()),
                Some(None) => Err(Halt::Failed),
                None => {
                    let error = TypeError::UnknownLocal {
                        name: identifier.name.clone(),
                    };
                    Err(self.fail(error, span))
                }
            },
            ExpressionKind::Call(call) => self.infer_call(call, span),
            ExpressionKind::Index { target, index } => {
                let target_type = self.value(target);
                if let Ok(found) = self.value(index) {
                    if found != Type::Int {
                        let error = TypeError::TypeMismatch {
                            context: "array index".to_string(),
                            expected: Type::Int,
                            found,
                        };
                        self.fail(error, &index.span);
                    }
                }
                match target_type? {
                    Type::Array(element) => Ok(*element),
                    found => Err(self.fail(TypeError::NotIndexable { found }, &target.span)),
                }
            }
            ExpressionKind::Length(target) => match self.value(target)? {
                Type::String | Type::Array(_) => Ok(Type::Int),
                found => Err(self.fail(TypeError::NoLength { found }, span)),
            },
            ExpressionKind::Unary { operator, operand } => {
                let found = self.value(operand)?;
                match (*operator, &found) {
                    (UnaryOperator::Negate, Type::Int) => Ok(Type::Int),
                    (UnaryOperator::Not, Type::Boolean) => Ok(Type::Boolean),
                    (operator, _) => {
                        let symbol = match operator {
                            UnaryOperator::Negate => "-",
                            UnaryOperator::Not => "!",
                        };
                        let error = TypeError::InvalidOperands {
                            operator: symbol.to_string(),
                            operands: found.to_string(),
                        };
                        Err(self.fail(error, span))
                    }
                }
            }
            ExpressionKind::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.value(left);
                let right = self.value(right);
                let (left, right) = (left?, right?);
                self.binary_result(*operator, left, right, span)
            }
        }
    }

    fn binary_result(
        &mut self,
        operator: BinaryOperator,
        left: Type,
        right: Type,
        span: &Span,
    ) -> Inferred {
        use BinaryOperator::*;

        let result = match (operator, &left, &right) {
            (Add, Type::Int, Type::Int) => Some(Type::Int),
            (Add, Type::String, _) | (Add, _, Type::String) => Some(Type::String),
            (Subtract | Multiply | Divide | Modulo, Type::Int, Type::Int) => Some(Type::Int),
            (Less | LessEqual | Greater | GreaterEqual, Type::Int, Type::Int) => {
                Some(Type::Boolean)
            }
            (Equal | NotEqual, _, _) if left == right => Some(Type::Boolean),
            (And | Or, Type::Boolean, Type::Boolean) => Some(Type::Boolean),
            _ => None,
        };

        match result {
            Some(ty) => Ok(ty),
            None => {
                let error = TypeError::InvalidOperands {
                    operator: operator.symbol().to_string(),
                    operands: format!("{left} and {right}"),
                };
                Err(self.fail(error, span))
            }
        }
    }

    fn infer_call(&mut self, call: &mut MethodCall, span: &Span) -> Inferred {
        let target = match &call.receiver {
            Some(receiver) => {
                match self
                    .registry
                    .resolve_class(&receiver.name, self.class, self.externals)
                {
                    Ok(class) => Some(class),
                    Err(error) => {
                        self.fail(error, &receiver.span);
                        None
                    }
                }
            }
            None => match self
                .registry
                .resolve_local_method(self.class, &call.method.name)
            {
                Some((owner, _)) => Some(owner),
                None => {
                    let error = TypeError::UnknownMethod {
                        class: self.class.to_string(),
                        method: call.method.name.clone(),
                    };
                    self.fail(error, &call.method.span);
                    None
                }
            },
        };

        let arguments: Vec<Inferred> = call
            .arguments
            .iter_mut()
            .map(|argument| self.value(argument))
            .collect();

        let Some(class) = target else {
            return Err(Halt::Failed);
        };
        let Some(method) = self.registry.method(&class, &call.method.name).cloned() else {
            let error = TypeError::UnknownMethod {
                class,
                method: call.method.name.clone(),
            };
            return Err(self.fail(error, &call.method.span));
        };

        if method.params.len() != arguments.len() {
            let error = TypeError::ArityMismatch {
                class: class.clone(),
                method: method.name.clone(),
                expected: method.params.len(),
                found: arguments.len(),
            };
            self.fail(error, span);
        } else {
            for (index, (param, argument)) in method.params.iter().zip(&arguments).enumerate() {
                if let (Some(expected), Ok(found)) = (param, argument) {
                    if expected != found {
                        let error = TypeError::TypeMismatch {
                            context: format!("argument {} of {}.{}", index + 1, class, method.name),
                            expected: expected.clone(),
                            found: found.clone(),
                        };
                        self.fail(error, &call.arguments[index].span);
                    }
                }
            }
        }

        call.resolved_class = Some(class);

        match method.ret {
            ReturnType::Declared(ty) | ReturnType::Inferred(ty) => Ok(ty),
            ReturnType::Pending => {
                self.saw_pending = true;
                Err(Halt::Pending)
            }
            ReturnType::Invalid => Err(Halt::Failed),
        }
    }
}
