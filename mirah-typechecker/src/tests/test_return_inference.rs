//! Fixed-point inference of undeclared return types

use crate::tests::unit;
use crate::{typecheck_batch, ReturnType, Type, TypeError, Typer};

fn inferred(typer: &Typer, class: &str, method: &str) -> ReturnType {
    typer.registry().method(class, method).unwrap().ret.clone()
}

#[test]
fn test_recursive_method_infers_from_base_case() {
    let source = "\
def fib(n: int)
  if n < 2
    return n
  end
  fib(n - 1) + fib(n - 2)
end
puts fib(10)
";
    let mut batch = vec![unit("fib.mirah", source)];
    let mut typer = Typer::new();
    typer.infer(&mut batch);

    assert!(typer.resolve(false).is_empty());
    assert_eq!(inferred(&typer, "Fib", "fib"), ReturnType::Inferred(Type::Int));
    assert_eq!(
        inferred(&typer, "Fib", "main"),
        ReturnType::Declared(Type::Void)
    );
}

#[test]
fn test_chain_declared_out_of_order() {
    let source = "\
class Chain
  def self.first
    second()
  end

  def self.second
    third() + \"!\"
  end

  def self.third
    \"hi\"
  end
end
";
    let mut batch = vec![unit("chain.mirah", source)];
    let mut typer = Typer::new();
    typer.infer(&mut batch);

    assert!(typer.resolve(false).is_empty());
    for method in ["first", "second", "third"] {
        assert_eq!(
            inferred(&typer, "Chain", method),
            ReturnType::Inferred(Type::String)
        );
    }
}

#[test]
fn test_method_without_value_is_void() {
    let source = "\
def greet(name: String)
  puts \"hello \" + name
end
x = greet(\"bob\")
";
    let mut batch = vec![unit("greet.mirah", source)];
    let diagnostics = typecheck_batch(&mut batch).unwrap_err();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].error, TypeError::VoidValue);
    assert_eq!(diagnostics[0].span.as_ref().unwrap().start_line(), 4);
}

#[test]
fn test_unbroken_cycle_cannot_be_inferred() {
    let source = "\
def ping(n: int)
  pong(n)
end
def pong(n: int)
  ping(n)
end
";
    let mut batch = vec![unit("cycle.mirah", source)];
    let diagnostics = typecheck_batch(&mut batch).unwrap_err();

    let incomplete: Vec<_> = diagnostics
        .iter()
        .filter_map(|d| match &d.error {
            TypeError::IncompleteInference { method, .. } => Some(method.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(incomplete, vec!["ping", "pong"]);
}

#[test]
fn test_declared_return_type_is_enforced() {
    let source = "\
def label: int
  \"seven\"
end
def check(n: int): boolean
  return n
end
";
    let mut batch = vec![unit("bad.mirah", source)];
    let diagnostics = typecheck_batch(&mut batch).unwrap_err();

    assert_eq!(diagnostics.len(), 2);
    assert_eq!(
        diagnostics[0].error,
        TypeError::TypeMismatch {
            context: "return value of Bad.label".to_string(),
            expected: Type::Int,
            found: Type::String,
        }
    );
    assert_eq!(
        diagnostics[1].error,
        TypeError::TypeMismatch {
            context: "return from Bad.check".to_string(),
            expected: Type::Boolean,
            found: Type::Int,
        }
    );
}

#[test]
fn test_unknown_annotation_is_reported_once() {
    let source = "def make(size: Widget): int\n  size\nend\n";
    let mut batch = vec![unit("widget.mirah", source)];
    let diagnostics = typecheck_batch(&mut batch).unwrap_err();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].error,
        TypeError::UnknownType {
            name: "Widget".to_string()
        }
    );
}

#[test]
fn test_open_if_is_a_missing_return() {
    let source = "\
class K
  def self.f(x: int): int
    if x > 0
      return 1
    end
  end

  def self.g(x: int): int
    if x > 0
      return 1
    else
      raise \"negative\"
    end
  end
end
";
    let mut batch = vec![unit("k.mirah", source)];
    let diagnostics = typecheck_batch(&mut batch).unwrap_err();

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].error,
        TypeError::MissingReturn {
            class: "K".to_string(),
            method: "f".to_string(),
            expected: Type::Int,
        }
    );
    assert_eq!(diagnostics[0].span.as_ref().unwrap().start_line(), 2);
    assert_eq!(
        diagnostics[0].message(),
        "K.f can finish without returning a value of type int"
    );
}

#[test]
fn test_inferred_return_type_also_needs_every_path() {
    let source = "\
def pick(x: int)
  while x > 0
    return x
  end
end
";
    let mut batch = vec![unit("pick.mirah", source)];
    let diagnostics = typecheck_batch(&mut batch).unwrap_err();

    assert!(matches!(
        &diagnostics[0].error,
        TypeError::MissingReturn { method, expected: Type::Int, .. } if method == "pick"
    ));
}
