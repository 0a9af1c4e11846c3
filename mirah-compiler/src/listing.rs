// Listing backend
// Renders a class file as text for inspection

use crate::bytecode::{ClassFile, Instr, MethodCode};

pub fn render(class: &ClassFile) -> String {
    let mut out = format!("class {} (target {})\n", class.name, class.target);
    out.push_str(&format!("  source {}\n", class.source_file));
    if !class.references.is_empty() {
        out.push_str(&format!("  references {}\n", class.references.join(", ")));
    }
    if !class.extensions.is_empty() {
        out.push_str(&format!("  extensions {}\n", class.extensions.join(", ")));
    }

    for method in &class.methods {
        out.push('\n');
        out.push_str(&render_method(method));
    }
    out
}

fn render_method(method: &MethodCode) -> String {
    let mut out = format!("  def {} (locals {})\n", method.signature(), method.locals);

    let mut lines = method.lines.iter().peekable();
    for (pc, instr) in method.code.iter().enumerate() {
        while let Some((_, line)) = lines.next_if(|(start, _)| *start as usize == pc) {
            out.push_str(&format!("    ; line {line}\n"));
        }
        out.push_str(&format!("    {pc:>4}  {}\n", instruction(instr)));
    }
    out
}

fn instruction(instr: &Instr) -> String {
    match instr {
        Instr::PushInt(value) => format!("push.int {value}"),
        Instr::PushBool(value) => format!("push.bool {value}"),
        Instr::PushStr(value) => format!("push.str {value:?}"),
        Instr::Load(slot) => format!("load {slot}"),
        Instr::Store(slot) => format!("store {slot}"),
        Instr::Jump(target) => format!("jump {target}"),
        Instr::JumpIfFalse(target) => format!("jump.false {target}"),
        Instr::Call {
            class,
            method,
            argc,
        } => format!("call {class}.{method}/{argc}"),
        Instr::Pop => "pop".to_string(),
        Instr::Neg => "neg".to_string(),
        Instr::Not => "not".to_string(),
        Instr::Add => "add".to_string(),
        Instr::Sub => "sub".to_string(),
        Instr::Mul => "mul".to_string(),
        Instr::Div => "div".to_string(),
        Instr::Mod => "mod".to_string(),
        Instr::Concat => "concat".to_string(),
        Instr::Eq => "eq".to_string(),
        Instr::Ne => "ne".to_string(),
        Instr::Lt => "lt".to_string(),
        Instr::Le => "le".to_string(),
        Instr::Gt => "gt".to_string(),
        Instr::Ge => "ge".to_string(),
        Instr::Index => "index".to_string(),
        Instr::Length => "length".to_string(),
        Instr::Puts => "puts".to_string(),
        Instr::Raise => "raise".to_string(),
        Instr::Return => "return".to_string(),
        Instr::ReturnVoid => "return.void".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{TargetVersion, MAGIC};
    use mirah_typechecker::Type;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_marks_lines_and_calls() {
        let class = ClassFile {
            magic: MAGIC,
            target: TargetVersion::V1,
            name: "Fib".to_string(),
            source_file: "fib.mirah".to_string(),
            references: vec!["Integer".to_string()],
            methods: vec![MethodCode {
                name: "show".to_string(),
                params: vec![Type::Int],
                ret: Type::String,
                locals: 1,
                code: vec![
                    Instr::Load(0),
                    Instr::Call {
                        class: "Integer".to_string(),
                        method: "to_s".to_string(),
                        argc: 1,
                    },
                    Instr::Return,
                ],
                lines: vec![(0, 2)],
            }],
            extensions: vec!["text".to_string()],
        };

        let text = render(&class);
        assert!(text.starts_with("class Fib (target v1)\n"));
        assert!(text.contains("  references Integer\n"));
        assert!(text.contains("  extensions text\n"));
        assert!(text.contains("  def show(int): String (locals 1)\n"));
        assert!(text.contains("    ; line 2\n       0  load 0\n"));
        assert!(text.contains("call Integer.to_s/1"));
    }

    #[test]
    fn test_render_full_layout() {
        let class = ClassFile {
            magic: MAGIC,
            target: TargetVersion::V4,
            name: "Two".to_string(),
            source_file: "two.mirah".to_string(),
            references: Vec::new(),
            methods: vec![
                MethodCode {
                    name: "a".to_string(),
                    params: Vec::new(),
                    ret: Type::Void,
                    locals: 0,
                    code: vec![Instr::ReturnVoid],
                    lines: vec![(0, 1), (0, 2)],
                },
                MethodCode {
                    name: "b".to_string(),
                    params: Vec::new(),
                    ret: Type::Int,
                    locals: 0,
                    code: vec![Instr::PushInt(7), Instr::Return],
                    lines: vec![(1, 4)],
                },
            ],
            extensions: Vec::new(),
        };

        assert_eq!(
            render(&class),
            "class Two (target v4)\n  source two.mirah\n\n  def a(): void (locals 0)\n    ; line 1\n    ; line 2\n       0  return.void\n\n  def b(): int (locals 0)\n       0  push.int 7\n    ; line 4\n       1  return\n"
        );
    }
}
