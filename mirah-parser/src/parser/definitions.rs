// Definition parsing module
// Handles classes, methods, parameters and type annotations

use pest::iterators::Pair;

use crate::ast::*;
use crate::error::*;
use crate::parser::{MirahParser, Rule};

impl MirahParser {
    /// Parse a class definition (members may be nested classes)
    pub(crate) fn parse_class_definition(pair: Pair<Rule>) -> ParseResult<ClassDefinition> {
        let span = Self::extract_span(&pair);
        let mut inner_pairs = pair.into_inner();

        let name = Self::parse_identifier(inner_pairs.next().unwrap());

        let mut members = Vec::new();
        for member in inner_pairs {
            match member.as_rule() {
                Rule::class_def => {
                    members.push(ClassMember::Class(Self::parse_class_definition(member)?))
                }
                Rule::method_def => {
                    members.push(ClassMember::Method(Self::parse_method_definition(member)?))
                }
                _ => unreachable!("Unexpected class member: {:?}", member.as_rule()),
            }
        }

        Ok(ClassDefinition {
            name,
            members,
            synthetic: false,
            span,
        })
    }

    /// Parse a method definition: `def [self.]name(params)[: Type] ... end`
    pub(crate) fn parse_method_definition(pair: Pair<Rule>) -> ParseResult<MethodDefinition> {
        let span = Self::extract_span(&pair);

        let mut is_static = false;
        let mut name = None;
        let mut parameters = Vec::new();
        let mut return_type = None;
        let mut body = None;

        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::self_prefix => is_static = true,
                Rule::identifier => name = Some(Self::parse_identifier(inner)),
                Rule::param_list => {
                    for parameter in inner.into_inner() {
                        parameters.push(Self::parse_parameter(parameter));
                    }
                }
                Rule::return_type => {
                    let type_pair = inner.into_inner().next().unwrap();
                    return_type = Some(Self::parse_type_annotation(type_pair));
                }
                Rule::block => body = Some(Self::parse_block(inner)?),
                _ => unreachable!("Unexpected method component: {:?}", inner.as_rule()),
            }
        }

        Ok(MethodDefinition {
            name: name.unwrap(),
            is_static,
            parameters,
            return_type,
            body: body.unwrap(),
            span,
            return_type_info: None,
        })
    }

    fn parse_parameter(pair: Pair<Rule>) -> Parameter {
        let span = Self::extract_span(&pair);
        let mut inner_pairs = pair.into_inner();
        let name = Self::parse_identifier(inner_pairs.next().unwrap());
        let type_annotation = Self::parse_type_annotation(inner_pairs.next().unwrap());

        Parameter {
            name,
            type_annotation,
            span,
        }
    }

    /// Parse `Name` or `Name[]...`, counting array dimensions
    pub(crate) fn parse_type_annotation(pair: Pair<Rule>) -> TypeAnnotation {
        let span = Self::extract_span(&pair);
        let text = pair.as_str();
        let name = text.trim_end_matches("[]");
        let dimensions = (text.len() - name.len()) / 2;

        TypeAnnotation {
            name: name.to_string(),
            dimensions,
            span,
        }
    }

    pub(crate) fn parse_identifier(pair: Pair<Rule>) -> Identifier {
        Identifier {
            name: pair.as_str().to_string(),
            span: Self::extract_span(&pair),
        }
    }
}
