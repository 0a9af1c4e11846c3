// Script transform
// Gathers a unit's top-level defs and statements into its script class

use std::path::Path;

use crate::ast::*;

/// Name of the unit produced by an inline `-e` script
pub const INLINE_SCRIPT_NAME: &str = "DashE";

/// Class name for a unit: `DashE`, or the CamelCased file stem
/// (`hello_world.mirah` becomes `HelloWorld`)
pub fn script_class_name(unit_name: &str) -> String {
    if unit_name == INLINE_SCRIPT_NAME {
        return INLINE_SCRIPT_NAME.to_string();
    }

    let stem = Path::new(unit_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(unit_name);

    let name: String = stem
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();

    if name.is_empty() {
        "Script".to_string()
    } else {
        name
    }
}

/// Rewrite a parsed unit so that every item is a class.
///
/// Top-level methods become static methods of the script class, and top-level
/// statements become the body of `def self.main(args: String[]): void`. When
/// the unit already defines a class with the script class's name, the script
/// members are merged into it.
pub fn transform_program(mut program: Program) -> Program {
    let class_name = script_class_name(&program.source_name);

    let mut script_members = Vec::new();
    let mut statements = Vec::new();
    let mut script_span: Option<Span> = None;
    let mut kept_items = Vec::new();

    for item in program.items.drain(..) {
        match item.kind {
            ItemKind::Class(_) => kept_items.push(item),
            ItemKind::Method(mut method) => {
                script_span = Some(extend(script_span, &item.span));
                method.is_static = true;
                script_members.push(ClassMember::Method(method));
            }
            ItemKind::Statement(statement) => {
                script_span = Some(extend(script_span, &item.span));
                statements.push(statement);
            }
        }
    }

    let Some(span) = script_span else {
        program.items = kept_items;
        return program;
    };

    if !statements.is_empty() {
        script_members.push(ClassMember::Method(main_method(statements, &span)));
    }

    let existing = kept_items.iter_mut().find_map(|item| match &mut item.kind {
        ItemKind::Class(class) if class.name.name == class_name => Some(class),
        _ => None,
    });

    match existing {
        Some(class) => class.members.extend(script_members),
        None => {
            let class = ClassDefinition {
                name: Identifier {
                    name: class_name,
                    span: span.clone(),
                },
                members: script_members,
                synthetic: true,
                span: span.clone(),
            };
            kept_items.insert(
                0,
                Item {
                    kind: ItemKind::Class(class),
                    span,
                },
            );
        }
    }

    program.items = kept_items;
    program
}

fn extend(current: Option<Span>, span: &Span) -> Span {
    match current {
        Some(current) => current.merge(span),
        None => span.clone(),
    }
}

fn main_method(statements: Vec<Statement>, span: &Span) -> MethodDefinition {
    let block_span = statements
        .iter()
        .fold(None, |acc, statement| Some(extend(acc, &statement.span)))
        .unwrap_or_else(|| span.clone());

    MethodDefinition {
        name: Identifier {
            name: "main".to_string(),
            span: span.clone(),
        },
        is_static: true,
        parameters: vec![Parameter {
            name: Identifier {
                name: "args".to_string(),
                span: span.clone(),
            },
            type_annotation: TypeAnnotation {
                name: "String".to_string(),
                dimensions: 1,
                span: span.clone(),
            },
            span: span.clone(),
        }],
        return_type: Some(TypeAnnotation {
            name: "void".to_string(),
            dimensions: 0,
            span: span.clone(),
        }),
        body: Block {
            statements,
            span: block_span,
        },
        span: span.clone(),
        return_type_info: None,
    }
}
