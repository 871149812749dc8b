use crate::*;
use pretty_assertions::assert_eq;

fn errors(source: &str) -> Vec<String> {
    let mut unit = CompilationUnit::new(CompilerConfiguration::default());
    unit.add_string("Main.grove", source);
    match unit.compile(Phase::ClassGeneration) {
        Ok(()) => Vec::new(),
        Err(error) => error.messages().iter().map(CompileMessage::message).collect(),
    }
}

#[test]
fn test_extending_an_interface() {
    assert_eq!(
        errors("interface Shape {}\nclass Square extends Shape {}"),
        vec!["You are not allowed to extend the interface 'Shape', use implements instead.".to_string()]
    );
}

#[test]
fn test_implementing_a_class() {
    assert_eq!(
        errors("class Shape {}\nclass Square implements Shape {}"),
        vec!["You are not allowed to implement the class 'Shape', use extends instead.".to_string()]
    );
}

#[test]
fn test_extending_a_final_class() {
    assert_eq!(
        errors("final class Shape {}\nclass Square extends Shape {}"),
        vec!["You are not allowed to overwrite the final class 'Shape'.".to_string()]
    );
}

#[test]
fn test_repeated_signature() {
    assert_eq!(
        errors("class A {\n  def f(int a) { a }\n  def f(int b) { b }\n}"),
        vec!["Repetitive method name/signature for method 'f(int)' in class 'A'.".to_string()]
    );
}

#[test]
fn test_unimplemented_abstract_method() {
    assert_eq!(
        errors("interface Shape {\n  def area()\n}\nclass Square implements Shape {}"),
        vec![
            "Can't have an abstract method in a non-abstract class. The class 'Square' must be declared abstract or the method 'area()' must be implemented."
                .to_string()
        ]
    );
}

#[test]
fn test_abstract_class_may_leave_methods_open() {
    assert!(errors("interface Shape {\n  def area()\n}\nabstract class Base implements Shape {}").is_empty());
}

#[test]
fn test_implemented_interface() {
    assert!(errors("interface Shape {\n  def area()\n}\nclass Square implements Shape {\n  def area() { 4 }\n}").is_empty());
}
