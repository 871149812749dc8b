use crate::*;

fn errors_for(source: &str) -> Vec<String> {
    parse_module(source, "Errors.grove")
        .unwrap()
        .errors
        .iter()
        .map(|e| e.to_string())
        .collect()
}

#[test]
fn test_syntax_error_has_position() {
    let error = parse_module("class A {\n  def x( {\n}", "Broken.grove").unwrap_err();
    assert!(!error.is_fatal());
    let ParseError::Syntax { line, .. } = error else {
        panic!("Expected syntax error, got {error:?}");
    };
    assert_eq!(line, 2);
}

#[test]
fn test_duplicate_modifier() {
    let errors = errors_for("class A { static static def x() { } }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("appears more than once"));
}

#[test]
fn test_conflicting_visibility() {
    let errors = errors_for("public private class A { }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("more than one visibility modifier"));
}

#[test]
fn test_abstract_final() {
    let errors = errors_for("abstract final class A { }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("both abstract and final"));
}

#[test]
fn test_method_without_return_type() {
    let errors = errors_for("class A { helper() { } }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Invalid method declaration: return type required"));
}

#[test]
fn test_method_without_body_in_concrete_class() {
    let errors = errors_for("class A { def x() }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("without a body"));
}

#[test]
fn test_abstract_method_in_concrete_class() {
    let errors = errors_for("class A { abstract def x() }");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("must be declared abstract"));
}

#[test]
fn test_errors_are_collected_not_fatal() {
    let errors = errors_for("class A { static static def x() { } }\nclass B { helper() { } }");
    assert_eq!(errors.len(), 2);
}

#[test]
fn test_integer_overflow() {
    let output = parse_module("def x = 99999999999999999999", "Big.grove").unwrap();
    assert!(matches!(output.errors[0], ParseError::InvalidLiteral { .. }));
}
