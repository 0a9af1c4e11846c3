// Mirah AST Definitions
// Abstract Syntax Tree nodes with source positions and slots for inferred types

/// Source position information for AST nodes
///
/// Offsets are byte offsets into the unit's text; line/column pairs are 1-based
/// as authored (the end column points just past the last character).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_line_col: (usize, usize),
    pub end_line_col: (usize, usize),
}

impl Span {
    pub fn new(
        start: usize,
        end: usize,
        start_line_col: (usize, usize),
        end_line_col: (usize, usize),
    ) -> Self {
        Self {
            start,
            end,
            start_line_col,
            end_line_col,
        }
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(&self, other: &Span) -> Span {
        let (start, start_line_col) = if self.start <= other.start {
            (self.start, self.start_line_col)
        } else {
            (other.start, other.start_line_col)
        };
        let (end, end_line_col) = if self.end >= other.end {
            (self.end, self.end_line_col)
        } else {
            (other.end, other.end_line_col)
        };
        Span::new(start, end, start_line_col, end_line_col)
    }

    pub fn start_line(&self) -> usize {
        self.start_line_col.0
    }

    pub fn end_line(&self) -> usize {
        self.end_line_col.0
    }
}

/// One parsed (and transformed) source unit
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Name of the unit this program came from (a path, or `DashE`)
    pub source_name: String,
    pub package: Option<PackageDeclaration>,
    pub items: Vec<Item>,
    pub span: Span,
}

impl Program {
    /// Iterate over the top-level class definitions
    pub fn classes(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.items.iter().filter_map(|item| match &item.kind {
            ItemKind::Class(class) => Some(class),
            _ => None,
        })
    }

    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().map(|package| package.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageDeclaration {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Class(ClassDefinition),
    Method(MethodDefinition),
    Statement(Statement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    pub name: Identifier,
    pub members: Vec<ClassMember>,
    /// Set for the class synthesised from a unit's top-level code
    pub synthetic: bool,
    pub span: Span,
}

impl ClassDefinition {
    pub fn methods(&self) -> impl Iterator<Item = &MethodDefinition> {
        self.members.iter().filter_map(|member| match member {
            ClassMember::Method(method) => Some(method),
            ClassMember::Class(_) => None,
        })
    }

    pub fn nested_classes(&self) -> impl Iterator<Item = &ClassDefinition> {
        self.members.iter().filter_map(|member| match member {
            ClassMember::Class(class) => Some(class),
            ClassMember::Method(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMember {
    Class(ClassDefinition),
    Method(MethodDefinition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    pub name: Identifier,
    /// Written as `def self.name`
    pub is_static: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Block,
    pub span: Span,
    /// Declared or inferred return type, filled in by the typechecker
    pub return_type_info: Option<ParsedTypeInfo>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: Identifier,
    pub type_annotation: TypeAnnotation,
    pub span: Span,
}

/// A written type such as `int` or `String[]`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAnnotation {
    pub name: String,
    pub dimensions: usize,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

impl Block {
    /// Whether every path through the block ends in `return` or `raise`
    pub fn always_exits(&self) -> bool {
        self.statements.iter().any(Statement::always_exits)
    }

    /// A trailing bare expression is the implicit value of a method body
    pub fn ends_with_expression(&self) -> bool {
        matches!(
            self.statements.last().map(|statement| &statement.kind),
            Some(StatementKind::Expression(_))
        )
    }
}

impl Statement {
    pub fn always_exits(&self) -> bool {
        match &self.kind {
            StatementKind::Return(_) | StatementKind::Raise(_) => true,
            StatementKind::If(if_statement) => {
                if_statement.branches.iter().all(|branch| branch.body.always_exits())
                    && if_statement
                        .else_block
                        .as_ref()
                        .is_some_and(Block::always_exits)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Expression(Expression),
    Assignment(Assignment),
    If(IfStatement),
    While(WhileLoop),
    Return(Option<Expression>),
    Puts(Expression),
    Raise(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub target: Identifier,
    pub value: Expression,
}

/// `if`, with `elsif` clauses kept in source order
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub branches: Vec<ConditionalBranch>,
    pub else_block: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    pub condition: Expression,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub condition: Expression,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
    /// Filled in by the typechecker
    pub type_info: Option<ParsedTypeInfo>,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self {
            kind,
            span,
            type_info: None,
        }
    }
}

/// Type attached to an expression after inference
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTypeInfo {
    pub resolved_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Integer(i64),
    Boolean(bool),
    String(String),
    Local(Identifier),
    Call(MethodCall),
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    Length(Box<Expression>),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
    },
}

/// `Receiver.method(args)` or `method(args)`
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Class name as written; `None` for a call on the enclosing class
    pub receiver: Option<Identifier>,
    pub method: Identifier,
    pub arguments: Vec<Expression>,
    /// Qualified name of the target class, filled in by the typechecker
    pub resolved_class: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "||",
            BinaryOperator::And => "&&",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}
