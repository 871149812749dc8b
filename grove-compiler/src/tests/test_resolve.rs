use crate::*;
use grove_parser::ClassNode;
use pretty_assertions::assert_eq;

fn analyzed(sources: &[(&str, &str)]) -> CompileResult<CompilationUnit> {
    let mut unit = CompilationUnit::new(CompilerConfiguration::default());
    for (name, text) in sources {
        unit.add_string(*name, *text);
    }
    unit.compile(Phase::SemanticAnalysis)?;
    Ok(unit)
}

fn messages(error: CompilerError) -> Vec<String> {
    error.messages().iter().map(CompileMessage::message).collect()
}

fn field_type<'a>(class: &'a ClassNode, name: &str) -> &'a str {
    &class.field(name).unwrap().field_type.name
}

#[test]
fn test_default_imports() {
    let unit = analyzed(&[("A.grove", "class A {\n  private String name\n  private List items\n}")]).unwrap();
    let a = unit.class_node("A").unwrap();
    assert_eq!(field_type(a, "name"), "grove.lang.String");
    assert_eq!(field_type(a, "items"), "grove.util.List");
    assert!(a.field("name").unwrap().field_type.resolved.is_some());
}

#[test]
fn test_same_package_and_star_imports() {
    let unit = analyzed(&[
        ("geo/Point.grove", "package geo\nclass Point {}"),
        ("geo/Line.grove", "package geo\nclass Line {\n  private Point start\n}"),
        ("Main.grove", "import geo.*\nclass Main {\n  private Line line\n}"),
    ])
    .unwrap();
    assert_eq!(field_type(unit.class_node("geo.Line").unwrap(), "start"), "geo.Point");
    assert_eq!(field_type(unit.class_node("Main").unwrap(), "line"), "geo.Line");
}

#[test]
fn test_alias_import() {
    let unit = analyzed(&[(
        "A.grove",
        "import grove.util.ArrayList as Items\nclass A {\n  private Items items\n}",
    )])
    .unwrap();
    let a = unit.class_node("A").unwrap();
    assert_eq!(field_type(a, "items"), "grove.util.ArrayList");
    let id = a.field("items").unwrap().field_type.resolved.unwrap();
    let table = &unit.compile_unit().classes;
    assert_eq!(table.name_of(table.redirect(id)), "grove.util.ArrayList");
}

#[test]
fn test_unresolved_class() {
    let error = analyzed(&[("A.grove", "class A extends Missing {}")]).unwrap_err();
    assert_eq!(messages(error), vec!["unable to resolve class Missing".to_string()]);
}

#[test]
fn test_unresolved_interface_is_reported_once() {
    let error = analyzed(&[("A.grove", "class A implements Nowhere {}")]).unwrap_err();
    assert_eq!(messages(error), vec!["unable to resolve class Nowhere".to_string()]);
}

#[test]
fn test_abstract_instantiation() {
    let error = analyzed(&[(
        "A.grove",
        "abstract class Shape {}\nclass A {\n  def make() { new Shape() }\n}",
    )])
    .unwrap_err();
    assert_eq!(
        messages(error),
        vec!["You cannot create an instance from the abstract class 'Shape'.".to_string()]
    );
}

#[test]
fn test_variable_in_static_scope() {
    let error = analyzed(&[("A.grove", "class A {\n  static def f() { counter }\n}")]).unwrap_err();
    let messages = messages(error);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with(
        "Apparent variable 'counter' was found in a static scope but doesn't refer to a local variable, static field or class."
    ));
}

#[test]
fn test_scripts_may_use_binding_variables() {
    analyzed(&[("Main.grove", "println(counter)")]).unwrap();
}
