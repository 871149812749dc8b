use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_fields_and_methods() {
    let source = "class Counter {\n  int count = 0\n  def increment() {\n    count += 1\n    this\n  }\n}\ndef c = new Counter()\nc.increment().increment()\nprintln(c.count)";
    assert_eq!(run(source), "2\n");
}

#[test]
fn test_static_methods_and_fields() {
    let source = "class Util {\n  static int base = 40\n  static twice(x) { x * 2 }\n}\nprintln(Util.twice(21))\nprintln(Util.base + 2)";
    assert_eq!(run(source), "42\n42\n");
}

#[test]
fn test_inheritance() {
    let source = "class Animal {\n  def sound() { '...' }\n  def speak() { sound() + '!' }\n}\nclass Dog extends Animal {\n  def sound() { 'woof' }\n}\nprintln(new Dog().speak())";
    assert_eq!(run(source), "woof!\n");
}

#[test]
fn test_enums() {
    let source = "enum Color {\n  RED, GREEN\n}\nprintln(Color.GREEN)\nprintln(Color.GREEN.ordinal())";
    assert_eq!(run(source), "GREEN\n1\n");
}

#[test]
fn test_embedding_api() {
    let (rt, _, _) = load("class Point {\n  int x = 0\n  def moved(int by) { x + by }\n}");
    let point = rt.new_instance("Point", Vec::new()).unwrap();
    rt.set_property(&point, "x", Value::Int(3)).unwrap();
    assert_eq!(rt.get_property(&point, "x").unwrap(), Value::Int(3));
    assert_eq!(
        rt.invoke_method(&point, "moved", vec![Value::Int(4)]).unwrap(),
        Value::Int(7)
    );
}

#[test]
fn test_unknown_class() {
    let (rt, _, _) = load("class A {}");
    assert!(matches!(
        rt.load_class("Nope"),
        Err(RuntimeError::ClassNotFound { .. })
    ));
}

#[test]
fn test_classes_cannot_be_defined_twice() {
    let (rt, _, _) = load("class A {}");
    let generated = compile_sources(CompilerConfiguration::default(), [("A.grove", "class A {}")]).unwrap();
    assert!(matches!(
        rt.define_classes(&generated),
        Err(RuntimeError::Load { .. })
    ));
}
