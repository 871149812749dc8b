use crate::enums::{NAME_FIELD, ORDINAL_FIELD, VALUES_FIELD};
use crate::*;
use grove_parser::{Modifier, StatementKind};
use pretty_assertions::assert_eq;

fn canonical(source: &str) -> CompilationUnit {
    let mut unit = CompilationUnit::new(CompilerConfiguration::default());
    unit.add_string("Color.grove", source);
    unit.compile(Phase::Canonicalization).unwrap();
    unit
}

#[test]
fn test_constants_become_static_fields() {
    let unit = canonical("enum Color {\n  RED, GREEN\n}");
    let color = unit.class_node("Color").unwrap();
    for name in ["RED", "GREEN"] {
        let field = color.field(name).unwrap();
        assert!(field.modifiers.is_static());
        assert!(field.modifiers.is_final());
        assert_eq!(field.field_type.name, "Color");
    }
    assert!(color.field(NAME_FIELD).unwrap().synthetic);
    assert!(color.field(ORDINAL_FIELD).is_some());
    assert!(color.field(VALUES_FIELD).unwrap().is_static());
}

#[test]
fn test_enum_methods() {
    let unit = canonical("enum Color {\n  RED, GREEN\n}");
    let color = unit.class_node("Color").unwrap();
    for (name, arity) in [("values", 0), ("valueOf", 1), ("name", 0), ("ordinal", 0), ("toString", 0)] {
        assert!(color.has_declared_method(name, arity), "{name}");
    }
    assert!(color.methods_named("values").next().unwrap().is_static());
}

#[test]
fn test_declared_methods_are_kept() {
    let unit = canonical("enum Color {\n  RED;\n  String toString() { 'colour' }\n}");
    let color = unit.class_node("Color").unwrap();
    let to_string: Vec<_> = color.methods_named("toString").collect();
    assert_eq!(to_string.len(), 1);
    assert!(!to_string[0].synthetic);
}

#[test]
fn test_constructors_take_name_and_ordinal() {
    let unit = canonical("enum Planet {\n  EARTH(1), MARS(2);\n  private int size\n  Planet(int size) { this.size = size }\n}");
    let planet = unit.class_node("Planet").unwrap();
    assert_eq!(planet.constructors.len(), 1);
    let constructor = &planet.constructors[0];
    assert!(constructor.modifiers.contains(Modifier::Private));
    let names: Vec<&str> = constructor.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec![NAME_FIELD, ORDINAL_FIELD, "size"]);
}

#[test]
fn test_constants_initialise_before_other_statics() {
    let unit = canonical("enum Color {\n  RED, GREEN;\n  static int count = 0\n}");
    let color = unit.class_node("Color").unwrap();
    // RED, GREEN and $VALUES
    assert_eq!(color.static_init.len(), 3);
    assert!(color
        .static_init
        .iter()
        .all(|statement| matches!(statement.kind, StatementKind::Expression(_))));
}

#[test]
fn test_completion_runs_once() {
    let unit = canonical("enum Color {\n  RED\n}");
    let mut color = unit.class_node("Color").unwrap().clone();
    let before = color.clone();
    let table = &unit.compile_unit().classes;
    let id = table.lookup("Color").unwrap();
    enums::complete_enum(&mut color, id, table);
    assert_eq!(color, before);
}
