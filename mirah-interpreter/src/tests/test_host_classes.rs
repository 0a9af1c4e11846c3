//! Host classes and extensions

use crate::tests::{link, parse, run_main, run_script};
use crate::{ExtensionRegistry, HostEnvironment, LoadError, RuntimeError, Value, integer_class};
use mirah_typechecker::{SignatureSource, Typer};
use pretty_assertions::assert_eq;

#[test]
fn test_integer_is_always_available() {
    let source = "\
n = Integer.parse(args[0])
puts Integer.to_s(n * 2) + \"!\"
";
    let (result, output) = run_script(source, &["21"]);
    assert!(result.is_ok());
    assert_eq!(output, "42!\n");

    let (result, _) = run_script(source, &["forty"]);
    assert_eq!(
        result.unwrap_err().into_target(),
        RuntimeError::InvalidInteger {
            text: "forty".to_string()
        }
    );
}

#[test]
fn test_native_calls_check_arity() {
    let class = integer_class();
    assert_eq!(class.call("to_s", &[Value::Int(5)]), Ok(Value::from("5")));
    assert!(matches!(
        class.call("to_s", &[]),
        Err(RuntimeError::WrongArity { expected: 1, found: 0, .. })
    ));
    assert!(matches!(
        class.call("nope", &[]),
        Err(RuntimeError::UndefinedMethod { .. })
    ));
}

#[test]
fn test_extensions_must_be_enabled() {
    let env = HostEnvironment::bare();
    assert!(env.class_signature("Math").is_none());

    let mut batch = vec![parse("DashE", "puts Math.max(1, 2)\n")];
    let mut typer = Typer::with_externals(Box::new(env.clone()));
    typer.infer(&mut batch);
    let diagnostics = typer.resolve(false);
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].message(), "Cannot find class Math");
}

#[test]
fn test_math_and_text_extensions() {
    let env = HostEnvironment::bare();
    env.enable("math").unwrap();
    env.enable("text").unwrap();
    assert_eq!(env.enabled_extensions(), vec!["math", "text"]);

    let source = "\
puts Math.max(3, 9) + Math.min(3, 9)
puts Math.abs(-4) * Math.pow(2, 10)
puts Text.upcase(\"abc\") + Text.reverse(\"xyz\")
puts Text.length(\"héllo\")
";
    let linked = link(&env, &[("DashE", source)]);
    assert_eq!(linked.ambient.len(), 2);

    let (result, output) = run_main(linked.unit("DashE"), &[]);
    assert!(result.is_ok());
    assert_eq!(output, "12\n4096\nABCzyx\n5\n");
}

#[test]
fn test_negative_exponent_raises() {
    let env = HostEnvironment::bare();
    env.enable("math").unwrap();
    let linked = link(&env, &[("DashE", "puts Math.pow(2, -1)\n")]);

    let (result, _) = run_main(linked.unit("DashE"), &[]);
    assert_eq!(
        result.unwrap_err().into_target(),
        RuntimeError::raised("negative exponent -1")
    );
}

#[test]
fn test_unknown_extension() {
    let env = HostEnvironment::bare();
    let error = env.enable("graphics").unwrap_err();
    assert_eq!(
        error,
        LoadError::UnknownExtension {
            name: "graphics".to_string(),
            known: "math, text".to_string(),
        }
    );
}

#[test]
fn test_custom_registry() {
    fn shout() -> crate::NativeClass {
        crate::NativeClass::new("Shout")
    }

    let mut registry = ExtensionRegistry::empty();
    registry.register("shout", shout);
    assert_eq!(registry.names(), vec!["shout"]);
    assert!(!registry.contains("math"));
    assert_eq!(registry.init("shout").unwrap().name, "Shout");
}
