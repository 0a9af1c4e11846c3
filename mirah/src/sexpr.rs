// S-expression formatter for Mirah ASTs
// Used by `mirah parse` and the verbose dump after inference

use mirah_parser::*;

pub fn format_program_as_sexpr(program: &Program) -> String {
    let mut header = format!("(unit {:?}", program.source_name);
    if let Some(package) = &program.package {
        header.push_str(&format!(" (package {})", package.name));
    }

    let items: Vec<String> = program
        .items
        .iter()
        .map(|item| format_item_with_indent(item, 2))
        .collect();

    if items.is_empty() {
        format!("{header})")
    } else {
        format!("{header}\n  {})", items.join("\n  "))
    }
}

fn pad(indent: usize) -> String {
    " ".repeat(indent)
}

fn format_item_with_indent(item: &Item, indent: usize) -> String {
    match &item.kind {
        ItemKind::Class(class) => format_class_with_indent(class, indent),
        ItemKind::Method(method) => format_method_with_indent(method, indent),
        ItemKind::Statement(statement) => format_statement_with_indent(statement, indent),
    }
}

fn format_class_with_indent(class: &ClassDefinition, indent: usize) -> String {
    let keyword = if class.synthetic { "script-class" } else { "class" };
    let members: Vec<String> = class
        .members
        .iter()
        .map(|member| match member {
            ClassMember::Class(nested) => format_class_with_indent(nested, indent + 2),
            ClassMember::Method(method) => format_method_with_indent(method, indent + 2),
        })
        .collect();

    if members.is_empty() {
        format!("({keyword} {})", class.name.name)
    } else {
        format!(
            "({keyword} {}\n{}{})",
            class.name.name,
            pad(indent + 2),
            members.join(&format!("\n{}", pad(indent + 2)))
        )
    }
}

fn format_type(annotation: &TypeAnnotation) -> String {
    format!("{}{}", annotation.name, "[]".repeat(annotation.dimensions))
}

fn format_method_with_indent(method: &MethodDefinition, indent: usize) -> String {
    let params: Vec<String> = method
        .parameters
        .iter()
        .map(|param| format!("({} {})", param.name.name, format_type(&param.type_annotation)))
        .collect();

    let returns = match (&method.return_type, &method.return_type_info) {
        (_, Some(info)) => format!(" : {}", info.resolved_type),
        (Some(annotation), None) => format!(" : {}", format_type(annotation)),
        (None, None) => String::new(),
    };
    let prefix = if method.is_static { "self." } else { "" };

    format!(
        "(def {prefix}{} ({}){}{})",
        method.name.name,
        params.join(" "),
        returns,
        format_block_with_indent(&method.body, indent + 2)
    )
}

fn format_block_with_indent(block: &Block, indent: usize) -> String {
    block
        .statements
        .iter()
        .map(|statement| format!("\n{}{}", pad(indent), format_statement_with_indent(statement, indent)))
        .collect()
}

fn format_statement_with_indent(statement: &Statement, indent: usize) -> String {
    match &statement.kind {
        StatementKind::Expression(expression) => format_expression(expression),
        StatementKind::Assignment(assignment) => {
            format!("(= {} {})", assignment.target.name, format_expression(&assignment.value))
        }
        StatementKind::Puts(value) => format!("(puts {})", format_expression(value)),
        StatementKind::Raise(value) => format!("(raise {})", format_expression(value)),
        StatementKind::Return(Some(value)) => format!("(return {})", format_expression(value)),
        StatementKind::Return(None) => "(return)".to_string(),
        StatementKind::While(while_loop) => format!(
            "(while {}{})",
            format_expression(&while_loop.condition),
            format_block_with_indent(&while_loop.body, indent + 2)
        ),
        StatementKind::If(if_statement) => {
            let mut parts: Vec<String> = if_statement
                .branches
                .iter()
                .map(|branch| {
                    format!(
                        "(when {}{})",
                        format_expression(&branch.condition),
                        format_block_with_indent(&branch.body, indent + 4)
                    )
                })
                .collect();
            if let Some(else_block) = &if_statement.else_block {
                parts.push(format!("(else{})", format_block_with_indent(else_block, indent + 4)));
            }
            format!("(if\n{}{})", pad(indent + 2), parts.join(&format!("\n{}", pad(indent + 2))))
        }
    }
}

fn format_expression(expr: &Expression) -> String {
    let text = match &expr.kind {
        ExpressionKind::Boolean(value) => format!("(boolean {value})"),
        ExpressionKind::Integer(value) => format!("(integer {value})"),
        ExpressionKind::String(value) => format!("(string {value:?})"),
        ExpressionKind::Local(id) => id.name.clone(),
        ExpressionKind::Call(call) => {
            let target = match (&call.resolved_class, &call.receiver) {
                (Some(class), _) => format!("{class}.{}", call.method.name),
                (None, Some(receiver)) => format!("{}.{}", receiver.name, call.method.name),
                (None, None) => call.method.name.clone(),
            };
            let arguments: Vec<String> = call.arguments.iter().map(format_expression).collect();
            if arguments.is_empty() {
                format!("(call {target})")
            } else {
                format!("(call {target} {})", arguments.join(" "))
            }
        }
        ExpressionKind::Index { target, index } => {
            format!("(index {} {})", format_expression(target), format_expression(index))
        }
        ExpressionKind::Length(target) => format!("(length {})", format_expression(target)),
        ExpressionKind::Unary { operator, operand } => {
            let op = match operator {
                UnaryOperator::Negate => "-",
                UnaryOperator::Not => "!",
            };
            format!("({op} {})", format_expression(operand))
        }
        ExpressionKind::Binary {
            left,
            operator,
            right,
        } => format!(
            "({} {} {})",
            operator.symbol(),
            format_expression(left),
            format_expression(right)
        ),
    };

    match &expr.type_info {
        Some(info) => format!("{text}:{}", info.resolved_type),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_script_unit() {
        let (program, _) = parse_program_with_diagnostics_and_source(
            "x = 1 + 2\nputs x\n",
            "DashE",
            &ParseOptions::default(),
        );
        let text = format_program_as_sexpr(&program.unwrap());
        assert_eq!(
            text,
            "(unit \"DashE\"\n  (script-class DashE\n    (def self.main ((args String[])) : void\n      (= x (+ (integer 1) (integer 2)))\n      (puts x))))"
        );
    }

    #[test]
    fn test_control_flow_and_calls() {
        let source = "package demo\nif a.length > 0\n  puts Foo.bar(a[0])\nelse\n  return\nend\n";
        let program = parse_program_with_source(source, Some("x.mirah".to_string())).unwrap();
        let text = format_program_as_sexpr(&program);

        assert!(text.starts_with("(unit \"x.mirah\" (package demo)\n  (if\n    (when (> (length a) (integer 0))"));
        assert!(text.contains("(puts (call Foo.bar (index a (integer 0))))"));
        assert!(text.contains("(else\n      (return))"));
    }

    #[test]
    fn test_types_are_shown_once_inferred() {
        let (program, _) =
            parse_program_with_diagnostics_and_source("puts 1\n", "DashE", &ParseOptions::default());
        let mut program = program.unwrap();
        mirah_typechecker::typecheck_program(&mut program).unwrap();

        let text = format_program_as_sexpr(&program);
        assert!(text.contains("(puts (integer 1):int)"));
    }
}
