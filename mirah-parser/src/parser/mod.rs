// Mirah Parser
// Pest-driven parser turning unit text into the AST

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::*;

mod definitions;
mod expressions;
mod statements;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct MirahParser;

impl MirahParser {
    /// Parse a complete unit; the program is named `input` when no source name is given
    pub fn parse_program(input: &str) -> ParseResult<Program> {
        Self::parse_program_with_source(input, None)
    }

    pub fn parse_program_with_source(
        input: &str,
        source_file: Option<String>,
    ) -> ParseResult<Program> {
        Self::parse_program_inner(input, source_file).map_err(|error| error.with_source(input))
    }

    fn parse_program_inner(input: &str, source_file: Option<String>) -> ParseResult<Program> {
        let mut pairs = <Self as Parser<Rule>>::parse(Rule::program, input)
            .map_err(|error| ParseError::from_pest_error(error, input))?;
        let program_pair = pairs.next().unwrap();
        let span = Self::extract_span(&program_pair);

        let mut package = None;
        let mut items = Vec::new();

        for pair in program_pair.into_inner() {
            match pair.as_rule() {
                Rule::package_decl => {
                    let decl_span = Self::extract_span(&pair);
                    let name = pair.into_inner().next().unwrap().as_str().to_string();
                    package = Some(PackageDeclaration {
                        name,
                        span: decl_span,
                    });
                }
                Rule::class_def => {
                    let class = Self::parse_class_definition(pair)?;
                    items.push(Item {
                        span: class.span.clone(),
                        kind: ItemKind::Class(class),
                    });
                }
                Rule::method_def => {
                    let method = Self::parse_method_definition(pair)?;
                    items.push(Item {
                        span: method.span.clone(),
                        kind: ItemKind::Method(method),
                    });
                }
                Rule::EOI => {}
                _ => {
                    let statement = Self::parse_statement(pair)?;
                    items.push(Item {
                        span: statement.span.clone(),
                        kind: ItemKind::Statement(statement),
                    });
                }
            }
        }

        Ok(Program {
            source_name: source_file.unwrap_or_else(|| "input".to_string()),
            package,
            items,
            span,
        })
    }

    /// Parse a standalone expression (used by tests and tooling)
    pub fn parse_expression(input: &str) -> ParseResult<Expression> {
        let mut pairs = <Self as Parser<Rule>>::parse(Rule::expression, input)
            .map_err(|error| ParseError::from_pest_error(error, input))?;
        let pair = pairs.next().unwrap();
        if pair.as_span().end() != input.trim_end().len() {
            let trailing = &input[pair.as_span().end()..];
            let location = Self::offset_span(input, pair.as_span().end(), input.len());
            return Err(ParseError::PestError {
                src: input.to_string(),
                span: source_span(&location),
                message: format!("Syntax error: unexpected '{}'", trailing.trim()),
                location,
            });
        }
        Self::parse_expression_from_pair(pair).map_err(|error| error.with_source(input))
    }

    /// Extract a span (with 1-based line/column pairs) from a Pest pair
    pub(crate) fn extract_span(pair: &Pair<Rule>) -> Span {
        let span = pair.as_span();
        Span::new(
            span.start(),
            span.end(),
            span.start_pos().line_col(),
            span.end_pos().line_col(),
        )
    }

    fn offset_span(input: &str, start: usize, end: usize) -> Span {
        let line_col = |offset: usize| {
            let before = &input[..offset];
            let line = before.matches('\n').count() + 1;
            let col = before
                .rsplit('\n')
                .next()
                .map(|text| text.chars().count())
                .unwrap_or(0)
                + 1;
            (line, col)
        };
        Span::new(start, end, line_col(start), line_col(end))
    }
}
