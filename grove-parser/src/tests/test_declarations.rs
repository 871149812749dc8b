use crate::*;
use pretty_assertions::assert_eq;

fn parse_ok(source: &str) -> ModuleNode {
    let output = parse_module(source, "demo/Test.grove").unwrap();
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
    output.module
}

#[test]
fn test_package_and_imports() {
    let module = parse_ok(
        "package demo.app\nimport grove.util.List\nimport demo.model.*\nimport demo.model.Person as P\nimport static demo.Util.helper\nclass A {}",
    );
    assert_eq!(module.package.as_deref(), Some("demo.app"));
    let kinds: Vec<&ImportKind> = module.imports.iter().map(|i| &i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            &ImportKind::Single,
            &ImportKind::Star,
            &ImportKind::Alias("P".to_string()),
            &ImportKind::Static,
        ]
    );
    assert_eq!(module.imports[1].name, "demo.model");
    assert_eq!(module.imports[2].visible_name(), Some("P"));
    assert_eq!(module.classes[0].name, "demo.app.A");
}

#[test]
fn test_class_with_properties_fields_and_members() {
    let module = parse_ok(
        r#"
class Person {
    String name
    int age = 3
    private boolean active
    public static final String KIND = 'person'

    Person(String name) { this.name = name }

    String greet(String greeting = 'Hello') {
        return "${greeting}, ${name}"
    }
}
"#,
    );
    let class = &module.classes[0];
    assert_eq!(class.name, "Person");
    assert_eq!(class.kind, ClassKind::Class);
    assert_eq!(class.super_class.as_ref().unwrap().name, names::OBJECT);

    let property_names: Vec<&str> = class.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(property_names, vec!["name", "age"]);
    let field_names: Vec<&str> = class.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(field_names, vec!["name", "age", "active", "KIND"]);
    assert!(class.field("name").unwrap().modifiers.is_private());
    assert!(class.field("age").unwrap().initial_value.is_some());
    let kind = class.field("KIND").unwrap();
    assert!(kind.is_static() && kind.modifiers.is_final());
    assert!(class.property("KIND").is_none());

    assert_eq!(class.constructors.len(), 1);
    assert!(class.constructors[0].is_constructor());
    assert_eq!(class.constructors[0].parameters[0].name, "name");

    let greet = class.methods_named("greet").next().unwrap();
    assert_eq!(greet.return_type.name, "String");
    assert!(greet.parameters[0].initial_expression.is_some());
    assert!(greet.modifiers.contains(Modifier::Public));
}

#[test]
fn test_generics_extends_and_implements() {
    let module = parse_ok(
        "abstract class Box<T extends Comparable> extends Base implements Comparable<Box>, Serializable {\n  abstract T get()\n}",
    );
    let class = &module.classes[0];
    assert!(class.modifiers.is_abstract());
    assert_eq!(class.generics.len(), 1);
    assert_eq!(class.generics[0].name, "T");
    assert_eq!(class.generics[0].upper_bound.as_ref().unwrap().name, "Comparable");
    assert_eq!(class.super_class.as_ref().unwrap().name, "Base");
    assert_eq!(class.interfaces.len(), 2);
    assert_eq!(class.interfaces[0].generics[0].name, "Box");
    let get = &class.methods[0];
    assert!(get.is_abstract());
    assert_eq!(get.return_type.name, "T");
}

#[test]
fn test_interface_methods_are_abstract() {
    let module = parse_ok("interface Shape extends Named {\n  double area()\n  String describe(String prefix)\n}");
    let shape = &module.classes[0];
    assert!(shape.is_interface());
    assert!(shape.modifiers.is_abstract());
    assert_eq!(shape.interfaces[0].name, "Named");
    assert!(shape.super_class.is_none());
    assert!(shape.methods.iter().all(|m| m.modifiers.is_abstract() && m.body.is_none()));
}

#[test]
fn test_enum_declaration() {
    let module = parse_ok(
        "enum Color {\n  RED, GREEN('g'), BLUE,\n  ;\n  static int count = 0\n  String code() { return name() }\n}",
    );
    let color = &module.classes[0];
    assert!(color.is_enum());
    assert!(color.modifiers.is_final());
    assert_eq!(color.super_class.as_ref().unwrap().name, names::ENUM);
    let constants: Vec<&str> = color.enum_constants.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(constants, vec!["RED", "GREEN", "BLUE"]);
    assert_eq!(color.enum_constants[1].arguments.len(), 1);
    assert_eq!(color.methods.len(), 1);
    assert!(color.field("count").is_some());
}

#[test]
fn test_array_types() {
    let module = parse_ok("class Main { static void main(String[] args) { } }");
    let main = &module.classes[0].methods[0];
    assert!(main.is_static());
    assert!(main.is_void());
    assert_eq!(main.parameters[0].param_type.array_dimensions, 1);
    assert_eq!(main.parameters[0].param_type.erasure_name(), names::LIST);
}

#[test]
fn test_modifier_only_method_has_dynamic_return_type() {
    let module = parse_ok("class Util { static twice(x) { x * 2 } }");
    let twice = &module.classes[0].methods[0];
    assert_eq!(twice.name, "twice");
    assert!(twice.return_type.is_dynamic());
    assert!(twice.is_static());
}

#[test]
fn test_method_descriptors() {
    let module = parse_ok("class A { def run(String a, b, int c) { } }");
    let run = &module.classes[0].methods[0];
    assert_eq!(run.type_descriptor(), "run(String, grove.lang.Object, int)");
}
