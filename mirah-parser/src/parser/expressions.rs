// Expression parsing module
// Operator precedence, postfix indexing and the literal/call primaries

use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};

use crate::ast::*;
use crate::error::*;
use crate::parser::{MirahParser, Rule};

impl MirahParser {
    /// Precedence levels from lowest to highest; prefix operators bind tightest
    pub(crate) fn pratt_parser() -> PrattParser<Rule> {
        PrattParser::new()
            .op(Op::infix(Rule::op_or, Assoc::Left))
            .op(Op::infix(Rule::op_and, Assoc::Left))
            .op(Op::infix(Rule::op_eq, Assoc::Left) | Op::infix(Rule::op_ne, Assoc::Left))
            .op(Op::infix(Rule::op_lt, Assoc::Left)
                | Op::infix(Rule::op_le, Assoc::Left)
                | Op::infix(Rule::op_gt, Assoc::Left)
                | Op::infix(Rule::op_ge, Assoc::Left))
            .op(Op::infix(Rule::op_add, Assoc::Left) | Op::infix(Rule::op_sub, Assoc::Left))
            .op(Op::infix(Rule::op_mul, Assoc::Left)
                | Op::infix(Rule::op_div, Assoc::Left)
                | Op::infix(Rule::op_mod, Assoc::Left))
            .op(Op::prefix(Rule::op_negate) | Op::prefix(Rule::op_not))
    }

    fn parse_expression_with_precedence(pairs: Pairs<Rule>) -> ParseResult<Expression> {
        Self::pratt_parser()
            .map_primary(Self::parse_term)
            .map_prefix(|op: Pair<Rule>, operand: ParseResult<Expression>| {
                let operand = operand?;
                let operator = match op.as_rule() {
                    Rule::op_negate => UnaryOperator::Negate,
                    Rule::op_not => UnaryOperator::Not,
                    _ => unreachable!("Unexpected prefix operator: {:?}", op.as_rule()),
                };
                let span = Self::extract_span(&op).merge(&operand.span);

                Ok(Expression::new(
                    ExpressionKind::Unary {
                        operator,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            })
            .map_infix(
                |left: ParseResult<Expression>, op: Pair<Rule>, right: ParseResult<Expression>| {
                    let left = left?;
                    let right = right?;

                    let operator = match op.as_rule() {
                        Rule::op_or => BinaryOperator::Or,
                        Rule::op_and => BinaryOperator::And,
                        Rule::op_eq => BinaryOperator::Equal,
                        Rule::op_ne => BinaryOperator::NotEqual,
                        Rule::op_lt => BinaryOperator::Less,
                        Rule::op_le => BinaryOperator::LessEqual,
                        Rule::op_gt => BinaryOperator::Greater,
                        Rule::op_ge => BinaryOperator::GreaterEqual,
                        Rule::op_add => BinaryOperator::Add,
                        Rule::op_sub => BinaryOperator::Subtract,
                        Rule::op_mul => BinaryOperator::Multiply,
                        Rule::op_div => BinaryOperator::Divide,
                        Rule::op_mod => BinaryOperator::Modulo,
                        _ => unreachable!("Unexpected binary operator: {:?}", op.as_rule()),
                    };
                    let span = left.span.merge(&right.span);

                    Ok(Expression::new(
                        ExpressionKind::Binary {
                            left: Box::new(left),
                            operator,
                            right: Box::new(right),
                        },
                        span,
                    ))
                },
            )
            .parse(pairs)
    }

    /// Parse an `expression` pair (or a bare primary) into an expression tree
    pub(crate) fn parse_expression_from_pair(pair: Pair<Rule>) -> ParseResult<Expression> {
        match pair.as_rule() {
            Rule::expression => Self::parse_expression_with_precedence(pair.into_inner()),
            Rule::term => Self::parse_term(pair),
            _ => Self::parse_primary(pair),
        }
    }

    /// A primary followed by any number of `[index]` / `.length` suffixes
    fn parse_term(pair: Pair<Rule>) -> ParseResult<Expression> {
        let mut inner_pairs = pair.into_inner();
        let mut expression = Self::parse_primary(inner_pairs.next().unwrap())?;

        for postfix in inner_pairs {
            let span = expression.span.merge(&Self::extract_span(&postfix));
            let kind = match postfix.as_rule() {
                Rule::index_op => {
                    let index = postfix.into_inner().next().unwrap();
                    ExpressionKind::Index {
                        target: Box::new(expression),
                        index: Box::new(Self::parse_expression_from_pair(index)?),
                    }
                }
                Rule::length_op => ExpressionKind::Length(Box::new(expression)),
                _ => unreachable!("Unexpected postfix operator: {:?}", postfix.as_rule()),
            };
            expression = Expression::new(kind, span);
        }

        Ok(expression)
    }

    fn parse_primary(pair: Pair<Rule>) -> ParseResult<Expression> {
        let span = Self::extract_span(&pair);

        let kind = match pair.as_rule() {
            Rule::expression => return Self::parse_expression_from_pair(pair),
            Rule::boolean => ExpressionKind::Boolean(pair.as_str() == "true"),
            Rule::integer => {
                let text = pair.as_str();
                let value = text
                    .parse::<i64>()
                    .map_err(|_| ParseError::invalid_integer(span.clone(), text.to_string()))?;
                ExpressionKind::Integer(value)
            }
            Rule::string => {
                let content = pair.into_inner().next().unwrap();
                ExpressionKind::String(Self::process_escape_sequences(&content)?)
            }
            Rule::static_call => {
                let mut inner_pairs = pair.into_inner();
                let receiver = Self::parse_identifier(inner_pairs.next().unwrap());
                let method = Self::parse_identifier(inner_pairs.next().unwrap());
                let arguments = match inner_pairs.next() {
                    Some(arg_list) => Self::parse_arguments(arg_list)?,
                    None => Vec::new(),
                };
                ExpressionKind::Call(MethodCall {
                    receiver: Some(receiver),
                    method,
                    arguments,
                    resolved_class: None,
                })
            }
            Rule::local_call => {
                let mut inner_pairs = pair.into_inner();
                let method = Self::parse_identifier(inner_pairs.next().unwrap());
                let arguments = Self::parse_arguments(inner_pairs.next().unwrap())?;
                ExpressionKind::Call(MethodCall {
                    receiver: None,
                    method,
                    arguments,
                    resolved_class: None,
                })
            }
            Rule::local => {
                ExpressionKind::Local(Self::parse_identifier(pair.into_inner().next().unwrap()))
            }
            _ => unreachable!("Unexpected primary: {:?}", pair.as_rule()),
        };

        Ok(Expression::new(kind, span))
    }

    fn parse_arguments(pair: Pair<Rule>) -> ParseResult<Vec<Expression>> {
        pair.into_inner()
            .map(Self::parse_expression_from_pair)
            .collect()
    }

    /// Process escape sequences in string contents
    fn process_escape_sequences(pair: &Pair<Rule>) -> ParseResult<String> {
        let input = pair.as_str();
        let mut result = String::with_capacity(input.len());
        let mut chars = input.char_indices();

        while let Some((offset, ch)) = chars.next() {
            if ch != '\\' {
                result.push(ch);
                continue;
            }
            match chars.next() {
                Some((_, 'n')) => result.push('\n'),
                Some((_, 't')) => result.push('\t'),
                Some((_, '"')) => result.push('"'),
                Some((_, '\\')) => result.push('\\'),
                Some((_, other)) => {
                    return Err(Self::invalid_escape(pair, offset, format!("\\{other}")))
                }
                None => return Err(Self::invalid_escape(pair, offset, "\\".to_string())),
            }
        }

        Ok(result)
    }

    fn invalid_escape(pair: &Pair<Rule>, offset: usize, found: String) -> ParseError {
        let content = Self::extract_span(pair);
        let start = content.start + offset;
        let (line, col) = content.start_line_col;
        let location = Span::new(
            start,
            start + found.len(),
            (line, col + offset),
            (line, col + offset + found.chars().count()),
        );
        ParseError::invalid_string_escape(location, found)
    }
}
