// Statement parsing module
// Handles blocks, assignments, control flow and the puts/raise/return forms

use pest::iterators::Pair;

use crate::ast::*;
use crate::error::*;
use crate::parser::{MirahParser, Rule};

impl MirahParser {
    pub(crate) fn parse_block(pair: Pair<Rule>) -> ParseResult<Block> {
        let span = Self::extract_span(&pair);
        let statements = pair
            .into_inner()
            .map(Self::parse_statement)
            .collect::<ParseResult<Vec<_>>>()?;

        Ok(Block { statements, span })
    }

    pub(crate) fn parse_statement(pair: Pair<Rule>) -> ParseResult<Statement> {
        let span = Self::extract_span(&pair);

        let kind = match pair.as_rule() {
            Rule::expression_stmt => {
                let expression = pair.into_inner().next().unwrap();
                StatementKind::Expression(Self::parse_expression_from_pair(expression)?)
            }
            Rule::assignment => {
                let mut inner_pairs = pair.into_inner();
                let target = Self::parse_identifier(inner_pairs.next().unwrap());
                let value = Self::parse_expression_from_pair(inner_pairs.next().unwrap())?;
                StatementKind::Assignment(Assignment { target, value })
            }
            Rule::puts_stmt => {
                let expression = pair.into_inner().next().unwrap();
                StatementKind::Puts(Self::parse_expression_from_pair(expression)?)
            }
            Rule::raise_stmt => {
                let expression = pair.into_inner().next().unwrap();
                StatementKind::Raise(Self::parse_expression_from_pair(expression)?)
            }
            Rule::return_stmt => {
                let value = match pair.into_inner().next() {
                    Some(expression) => Some(Self::parse_expression_from_pair(expression)?),
                    None => None,
                };
                StatementKind::Return(value)
            }
            Rule::if_stmt => StatementKind::If(Self::parse_if_statement(pair)?),
            Rule::while_stmt => {
                let mut inner_pairs = pair.into_inner();
                let condition = Self::parse_expression_from_pair(inner_pairs.next().unwrap())?;
                let body = Self::parse_block(inner_pairs.next().unwrap())?;
                StatementKind::While(WhileLoop { condition, body })
            }
            _ => unreachable!("Unexpected statement rule: {:?}", pair.as_rule()),
        };

        Ok(Statement { kind, span })
    }

    /// Parse `if`/`elsif`/`else` into ordered branches plus an optional else block
    fn parse_if_statement(pair: Pair<Rule>) -> ParseResult<IfStatement> {
        let mut inner_pairs = pair.into_inner();
        let condition = Self::parse_expression_from_pair(inner_pairs.next().unwrap())?;
        let body = Self::parse_block(inner_pairs.next().unwrap())?;

        let mut branches = vec![ConditionalBranch { condition, body }];
        let mut else_block = None;

        for clause in inner_pairs {
            match clause.as_rule() {
                Rule::elsif_clause => {
                    let mut clause_pairs = clause.into_inner();
                    let condition =
                        Self::parse_expression_from_pair(clause_pairs.next().unwrap())?;
                    let body = Self::parse_block(clause_pairs.next().unwrap())?;
                    branches.push(ConditionalBranch { condition, body });
                }
                Rule::else_clause => {
                    let block = clause.into_inner().next().unwrap();
                    else_block = Some(Self::parse_block(block)?);
                }
                _ => unreachable!("Unexpected if clause: {:?}", clause.as_rule()),
            }
        }

        Ok(IfStatement {
            branches,
            else_block,
        })
    }
}
