// Definition parsing tests
// Packages, classes (including nested classes), methods and type annotations

use mirah_parser::*;

#[test]
fn test_package_declaration() {
    let program = parse_program("package com.example.app\nputs 1\n").unwrap();
    assert_eq!(program.package_name(), Some("com.example.app"));
    assert_eq!(program.items.len(), 1);
}

#[test]
fn test_package_only_unit() {
    let program = parse_program("package tools").unwrap();
    assert_eq!(program.package_name(), Some("tools"));
    assert!(program.items.is_empty());
}

#[test]
fn test_class_with_methods() {
    let source = "\
class Calculator
  def self.add(a: int, b: int): int
    a + b
  end

  def describe: String
    \"calculator\"
  end
end
";
    let program = parse_program(source).unwrap();
    let class = program.classes().next().unwrap();

    assert_eq!(class.name.name, "Calculator");
    let methods: Vec<_> = class.methods().collect();
    assert_eq!(methods.len(), 2);

    let add = methods[0];
    assert!(add.is_static);
    assert_eq!(add.parameters.len(), 2);
    assert_eq!(add.parameters[1].name.name, "b");
    assert_eq!(add.parameters[1].type_annotation.name, "int");
    assert_eq!(add.return_type.as_ref().unwrap().name, "int");

    let describe = methods[1];
    assert!(!describe.is_static);
    assert!(describe.parameters.is_empty());
}

#[test]
fn test_nested_classes() {
    let source = "\
class Outer
  class Inner
    def self.value: int
      1
    end
  end
end
";
    let program = parse_program(source).unwrap();
    let outer = program.classes().next().unwrap();
    let inner = outer.nested_classes().next().unwrap();
    assert_eq!(inner.name.name, "Inner");
    assert_eq!(inner.methods().count(), 1);
}

#[test]
fn test_array_type_annotations() {
    let source = "def self.main(args: String[]): void\nend\n";
    let program = parse_program(source).unwrap();
    let ItemKind::Method(method) = &program.items[0].kind else {
        panic!("Expected method");
    };

    let annotation = &method.parameters[0].type_annotation;
    assert_eq!(annotation.name, "String");
    assert_eq!(annotation.dimensions, 1);
    assert_eq!(method.return_type.as_ref().unwrap().name, "void");

    let program = parse_program("def grid(cells: int[][])\nend\n").unwrap();
    let ItemKind::Method(method) = &program.items[0].kind else {
        panic!("Expected method");
    };
    assert_eq!(method.parameters[0].type_annotation.dimensions, 2);
    assert!(method.return_type.is_none());
}

#[test]
fn test_method_without_parameter_list() {
    let program = parse_program("def answer\n  42\nend\n").unwrap();
    let ItemKind::Method(method) = &program.items[0].kind else {
        panic!("Expected method");
    };
    assert_eq!(method.name.name, "answer");
    assert!(method.parameters.is_empty());
    assert_eq!(method.body.statements.len(), 1);
}

#[test]
fn test_mixed_unit_keeps_source_order() {
    let source = "class A\nend\ndef helper: int\n  1\nend\nputs helper()\n";
    let program = parse_program_with_source(source, Some("mixed.mirah".to_string())).unwrap();

    assert_eq!(program.source_name, "mixed.mirah");
    assert!(matches!(program.items[0].kind, ItemKind::Class(_)));
    assert!(matches!(program.items[1].kind, ItemKind::Method(_)));
    assert!(matches!(program.items[2].kind, ItemKind::Statement(_)));
}

#[test]
fn test_default_source_name() {
    let program = parse_program("puts 1").unwrap();
    assert_eq!(program.source_name, "input");
}
