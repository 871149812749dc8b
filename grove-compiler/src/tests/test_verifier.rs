use crate::verifier::{guarantees_return, verify_class, META_CLASS_FIELD, STATIC_CLASS_INFO_FIELD};
use crate::*;
use grove_parser::{ClassNode, StatementKind};
use pretty_assertions::assert_eq;

fn verified(source: &str) -> CompilationUnit {
    let mut unit = CompilationUnit::new(CompilerConfiguration::default());
    unit.add_string("Main.grove", source);
    unit.compile(Phase::ClassGeneration).unwrap();
    unit
}

fn errors(source: &str) -> Vec<String> {
    let mut unit = CompilationUnit::new(CompilerConfiguration::default());
    unit.add_string("Main.grove", source);
    let error = unit.compile(Phase::ClassGeneration).unwrap_err();
    error.messages().iter().map(CompileMessage::message).collect()
}

fn arities(class: &ClassNode, name: &str) -> Vec<usize> {
    let mut arities: Vec<usize> = class.methods_named(name).map(|m| m.parameters.len()).collect();
    arities.sort();
    arities
}

#[test]
fn test_property_accessors() {
    let unit = verified("class Person {\n  String name\n  boolean active\n  final int age = 3\n}");
    let person = unit.class_node("Person").unwrap();
    assert_eq!(arities(person, "getName"), vec![0]);
    assert_eq!(arities(person, "setName"), vec![1]);
    assert_eq!(arities(person, "getActive"), vec![0]);
    assert_eq!(arities(person, "isActive"), vec![0]);
    assert_eq!(arities(person, "setActive"), vec![1]);
    assert_eq!(arities(person, "getAge"), vec![0]);
    assert!(arities(person, "setAge").is_empty());
}

#[test]
fn test_hand_written_accessor_wins() {
    let unit = verified("class Person {\n  String name\n  String getName() { 'fixed' }\n}");
    let person = unit.class_node("Person").unwrap();
    let getters: Vec<_> = person.methods_named("getName").collect();
    assert_eq!(getters.len(), 1);
    assert!(!getters[0].synthetic);
}

#[test]
fn test_default_constructor() {
    let unit = verified("class A {}");
    let a = unit.class_node("A").unwrap();
    assert_eq!(a.constructors.len(), 1);
    assert!(a.constructors[0].parameters.is_empty());
    assert!(a.constructors[0].synthetic);
}

#[test]
fn test_grove_object_plumbing() {
    let unit = verified("class A {}");
    let a = unit.class_node("A").unwrap();
    assert!(a.interfaces.iter().any(|i| i.name == "grove.lang.GroveObject"));
    assert!(a.field(META_CLASS_FIELD).is_some());
    assert!(a.field(STATIC_CLASS_INFO_FIELD).unwrap().is_static());
    for (name, arity) in [
        ("getMetaClass", 0),
        ("setMetaClass", 1),
        ("invokeMethod", 2),
        ("getProperty", 1),
        ("setProperty", 2),
    ] {
        assert_eq!(arities(a, name), vec![arity], "{name}");
    }
}

#[test]
fn test_subclass_inherits_plumbing() {
    let unit = verified("class Base {}\nclass Derived extends Base {}");
    let derived = unit.class_node("Derived").unwrap();
    assert!(derived.interfaces.is_empty());
    assert!(arities(derived, "getMetaClass").is_empty());
}

#[test]
fn test_default_arguments() {
    let unit = verified(
        "class Greeter {\n  def greet(String name, String greeting = 'Hello', String mark = '!') { greeting + name + mark }\n}",
    );
    let greeter = unit.class_node("Greeter").unwrap();
    assert_eq!(arities(greeter, "greet"), vec![1, 2, 3]);
    assert!(greeter
        .methods_named("greet")
        .flat_map(|m| m.parameters.iter())
        .all(|p| p.initial_expression.is_none()));
}

#[test]
fn test_default_argument_clash() {
    assert_eq!(
        errors("class G {\n  def f(int a, int b = 1) { a }\n  def f(int a) { a }\n}"),
        vec![
            "The method with default parameters \"f(int, int)\" defines a method \"f(int)\" that is already defined."
                .to_string()
        ]
    );
}

#[test]
fn test_bridge_for_generic_override() {
    let unit = verified(
        "class Money implements Comparable<Money> {\n  int compareTo(Money other) { 0 }\n}",
    );
    let money = unit.class_node("Money").unwrap();
    let bridge = money
        .declared_method("compareTo", &["grove.lang.Object"])
        .unwrap();
    assert!(bridge.bridge);
    assert!(bridge.synthetic);
    assert!(!money.declared_method("compareTo", &["Money"]).unwrap().bridge);
}

#[test]
fn test_no_bridge_when_erasures_agree() {
    let unit = verified("class A {\n  String toString() { 'a' }\n}");
    let a = unit.class_node("A").unwrap();
    assert_eq!(arities(a, "toString"), vec![0]);
}

#[test]
fn test_narrower_return_type_needs_no_bridge() {
    let unit = verified(
        "class Base {\n  Object make() { null }\n}\nclass Narrow extends Base {\n  String make() { 'x' }\n}",
    );
    let narrow = unit.class_node("Narrow").unwrap();
    assert_eq!(arities(narrow, "make"), vec![0]);
    assert!(narrow.methods_named("make").all(|m| !m.bridge));
}

#[test]
fn test_interface_method_with_incompatible_return_type() {
    assert_eq!(
        errors("interface Named {\n  String name()\n}\nclass Thing implements Named {\n  Integer name() { 1 }\n}"),
        vec![
            "The return type of grove.lang.Integer name() in Thing is incompatible with grove.lang.String in Named"
                .to_string()
        ]
    );
}

#[test]
fn test_static_method_cannot_override_instance_method() {
    assert_eq!(
        errors("class Base {\n  def name() { 'b' }\n}\nclass Derived extends Base {\n  static name() { 'd' }\n}"),
        vec!["The method 'name()' is static and cannot override the instance method of 'Base'.".to_string()]
    );
}

#[test]
fn test_final_method_cannot_be_overridden() {
    assert_eq!(
        errors("class A {\n  final def f() { 1 }\n}\nclass B extends A {\n  def f() { 2 }\n}"),
        vec!["You are not allowed to override the final method f() from class 'A'.".to_string()]
    );
}

#[test]
fn test_static_initializer() {
    let unit = verified("class Counter {\n  static int count = 5\n}");
    let counter = unit.class_node("Counter").unwrap();
    let clinit = counter.methods_named("<clinit>").next().unwrap();
    assert!(clinit.is_static());
    assert!(counter.static_init.is_empty());
}

#[test]
fn test_field_initializers_follow_super_call() {
    let unit = verified("class A {\n  private int x = 1\n  A(int y) { println(y) }\n}");
    let a = unit.class_node("A").unwrap();
    let body = a.constructors[0].body.as_ref().unwrap().statements();
    assert_eq!(body.len(), 3);
    let StatementKind::Expression(first) = &body[0].kind else {
        panic!("expected the super call, got {:?}", body[0].kind);
    };
    assert!(matches!(
        first.kind,
        grove_parser::ExpressionKind::ConstructorCall(_)
    ));
}

#[test]
fn test_returns_are_explicit() {
    let unit = verified("class A {\n  def f(x) {\n    if (x) { 1 } else { 2 }\n  }\n  void g() { println('g') }\n}");
    let a = unit.class_node("A").unwrap();
    for name in ["f", "g"] {
        let method = a.methods_named(name).next().unwrap();
        assert!(guarantees_return(method.body.as_ref().unwrap()), "{name}");
    }
}

#[test]
fn test_verifying_twice_changes_nothing() {
    let unit = verified(
        "class Shape {\n  String name\n  static int count = 0\n  def area(int scale = 1) { 0 }\n}",
    );
    let table = &unit.compile_unit().classes;
    let id = table.lookup("Shape").unwrap();
    let original = unit.class_node("Shape").unwrap().clone();
    let mut again = original.clone();
    let problems = verify_class(&mut again, id, table);
    assert!(problems.is_empty());
    assert_eq!(again, original);
}
