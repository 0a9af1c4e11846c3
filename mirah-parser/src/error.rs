// Mirah Parser Error Handling
// Parse errors with miette integration and 1-based source locations

use crate::ast::Span;
use crate::parser::Rule;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Main parse error type with miette integration
#[derive(Error, Diagnostic, Debug, Clone)]
pub enum ParseError {
    #[error("{message}")]
    #[diagnostic(
        code(mirah::parse::syntax),
        help("Check the syntax near the highlighted location")
    )]
    PestError {
        #[source_code]
        src: String,
        #[label("error occurred here")]
        span: SourceSpan,
        message: String,
        location: Span,
    },

    #[error("Invalid integer literal: {found}")]
    #[diagnostic(
        code(mirah::parse::invalid_integer),
        help("Integer literals must fit in a signed 64-bit value")
    )]
    InvalidInteger {
        #[source_code]
        src: String,
        #[label("invalid integer")]
        span: SourceSpan,
        found: String,
        location: Span,
    },

    #[error("Invalid string escape sequence: {found}")]
    #[diagnostic(
        code(mirah::parse::invalid_string_escape),
        help("Valid escape sequences: \\n, \\t, \\\\, \\\"")
    )]
    InvalidStringEscape {
        #[source_code]
        src: String,
        #[label("invalid escape sequence")]
        span: SourceSpan,
        found: String,
        location: Span,
    },
}

impl ParseError {
    /// Create a parse error from a Pest parsing error
    pub fn from_pest_error(error: pest::error::Error<Rule>, src: &str) -> Self {
        let (start, end) = match error.location {
            pest::error::InputLocation::Pos(pos) => (pos, pos),
            pest::error::InputLocation::Span((start, end)) => (start, end),
        };
        let (start_line_col, end_line_col) = match error.line_col {
            pest::error::LineColLocation::Pos((line, col)) => ((line, col), (line, col + 1)),
            pest::error::LineColLocation::Span(start, end) => (start, end),
        };

        let message = match &error.variant {
            pest::error::ErrorVariant::ParsingError { positives, .. } => {
                let found = describe_found(src, start);
                if positives.is_empty() {
                    format!("Syntax error: unexpected {found}")
                } else {
                    format!(
                        "Syntax error: unexpected {found}, expected {}",
                        describe_expected(positives)
                    )
                }
            }
            pest::error::ErrorVariant::CustomError { message } => {
                format!("Syntax error: {message}")
            }
        };

        ParseError::PestError {
            src: src.to_string(),
            span: SourceSpan::new(start.into(), end.saturating_sub(start).max(1)),
            message,
            location: Span::new(start, end.max(start + 1), start_line_col, end_line_col),
        }
    }

    /// Create an invalid integer error (source attached by `with_source`)
    pub fn invalid_integer(location: Span, found: String) -> Self {
        ParseError::InvalidInteger {
            src: String::new(),
            span: source_span(&location),
            found,
            location,
        }
    }

    /// Create an invalid string escape error (source attached by `with_source`)
    pub fn invalid_string_escape(location: Span, found: String) -> Self {
        ParseError::InvalidStringEscape {
            src: String::new(),
            span: source_span(&location),
            found,
            location,
        }
    }

    /// Attach the unit's source text so miette can render the label
    pub fn with_source(mut self, source: &str) -> Self {
        match &mut self {
            ParseError::PestError { src, .. }
            | ParseError::InvalidInteger { src, .. }
            | ParseError::InvalidStringEscape { src, .. } => *src = source.to_string(),
        }
        self
    }

    /// Where in the unit the error was found
    pub fn location(&self) -> &Span {
        match self {
            ParseError::PestError { location, .. }
            | ParseError::InvalidInteger { location, .. }
            | ParseError::InvalidStringEscape { location, .. } => location,
        }
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

pub(crate) fn source_span(span: &Span) -> SourceSpan {
    SourceSpan::new(span.start.into(), span.end.saturating_sub(span.start))
}

fn describe_found(src: &str, position: usize) -> String {
    let rest = src.get(position..).unwrap_or_default();
    match rest.chars().next() {
        None => "end of input".to_string(),
        Some('\n') | Some('\r') => "end of line".to_string(),
        Some(_) => {
            let token: String = rest
                .chars()
                .take_while(|c| !c.is_whitespace())
                .take(16)
                .collect();
            format!("'{token}'")
        }
    }
}

fn describe_expected(rules: &[Rule]) -> String {
    let mut descriptions: Vec<&'static str> = Vec::new();
    for rule in rules {
        let description = rule_to_user_friendly_description(rule);
        if !descriptions.contains(&description) {
            descriptions.push(description);
        }
    }

    match descriptions.as_slice() {
        [] => "more input".to_string(),
        [only] => (*only).to_string(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

/// Convert a parser rule to a user-friendly description
fn rule_to_user_friendly_description(rule: &Rule) -> &'static str {
    match rule {
        Rule::integer => "an integer",
        Rule::string => "a string",
        Rule::boolean => "true or false",
        Rule::identifier | Rule::local => "an identifier",
        Rule::constant => "a class name",
        Rule::qualified_name => "a package name",
        Rule::type_ref => "a type (like int or String[])",
        Rule::expression | Rule::term | Rule::expression_stmt => "an expression",
        Rule::static_call | Rule::local_call => "a method call",
        Rule::arg_list => "an argument list",
        Rule::param_list => "a parameter list",
        Rule::parameter => "a parameter (name: Type)",
        Rule::return_type => "a return type",
        Rule::index_op => "an index",
        Rule::length_op => "'.length'",
        Rule::class_def => "a class definition",
        Rule::method_def => "a method definition",
        Rule::self_prefix => "'self.'",
        Rule::block => "a statement",
        Rule::if_stmt
        | Rule::while_stmt
        | Rule::return_stmt
        | Rule::puts_stmt
        | Rule::raise_stmt
        | Rule::assignment => "a statement",
        Rule::elsif_clause => "'elsif'",
        Rule::else_clause => "'else'",
        Rule::package_decl => "a package declaration",
        Rule::keyword => "a keyword",
        Rule::op_or
        | Rule::op_and
        | Rule::op_eq
        | Rule::op_ne
        | Rule::op_le
        | Rule::op_ge
        | Rule::op_lt
        | Rule::op_gt
        | Rule::op_add
        | Rule::op_sub
        | Rule::op_mul
        | Rule::op_div
        | Rule::op_mod => "an operator",
        Rule::op_negate | Rule::op_not => "a unary operator",
        Rule::EOI => "end of input",
        _ => "a token",
    }
}
