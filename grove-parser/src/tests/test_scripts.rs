use crate::*;

#[test]
fn test_class_only_module_is_not_a_script() {
    let mut module = parse_module("class A { }", "A.grove").unwrap().module;
    assert!(!module.is_script());
    assert!(module.create_script_class(names::SCRIPT).is_none());
    assert_eq!(module.classes.len(), 1);
}

#[test]
fn test_script_class_creation() {
    let source = "def greet(name) { \"Hi $name\" }\nprintln(greet('Bob'))\nclass Helper { }";
    let mut module = parse_module(source, "scripts/hello-world.grove").unwrap().module;
    assert!(module.is_script());
    assert_eq!(module.methods.len(), 1);
    assert_eq!(module.statements.len(), 1);

    let script = module.create_script_class(names::SCRIPT).unwrap().clone();
    assert_eq!(script.name, "hello_world");
    assert_eq!(script.kind, ClassKind::Script);
    assert_eq!(script.super_class.as_ref().unwrap().name, names::SCRIPT);

    let method_names: Vec<&str> = script.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(method_names, vec!["run", "main", "greet"]);
    let main = script.methods_named("main").next().unwrap();
    assert!(main.is_static());
    assert_eq!(main.parameters.len(), 1);

    assert!(module.statements.is_empty());
    assert!(module.methods.is_empty());
    assert_eq!(module.classes.len(), 2);
    assert_eq!(module.classes[1].name, "Helper");
}

#[test]
fn test_script_class_uses_package_and_base() {
    let mut module = parse_module("package tools\nprintln('x')", "Run.grove").unwrap().module;
    let script = module.create_script_class("tools.BaseScript").unwrap();
    assert_eq!(script.name, "tools.Run");
    assert_eq!(script.super_class.as_ref().unwrap().name, "tools.BaseScript");
}
