use crate::hierarchy::{cycle_message, sort_classes, InheritanceGraph};
use crate::*;
use pretty_assertions::assert_eq;

fn analyzed(source: &str) -> CompilationUnit {
    let mut unit = CompilationUnit::new(CompilerConfiguration::default());
    unit.add_string("Main.grove", source);
    unit.compile(Phase::SemanticAnalysis).unwrap();
    unit
}

fn primary_names(unit: &CompilationUnit, ids: &[grove_parser::ClassId]) -> Vec<String> {
    let table = &unit.compile_unit().classes;
    ids.iter().map(|&id| table.name_of(id).to_string()).collect()
}

#[test]
fn test_supertypes_sort_first() {
    let unit = analyzed(
        "class C extends B implements Named {}\nclass B extends A {}\nclass A {}\ninterface Named extends Base {}\ninterface Base {}",
    );
    let table = &unit.compile_unit().classes;
    let sorted = sort_classes(table, &table.primary_ids());
    assert_eq!(primary_names(&unit, &sorted), vec!["Base", "Named", "A", "B", "C"]);
}

#[test]
fn test_equal_depths_keep_declaration_order() {
    let unit = analyzed("class Second {}\nclass First {}");
    let table = &unit.compile_unit().classes;
    let sorted = sort_classes(table, &table.primary_ids());
    assert_eq!(primary_names(&unit, &sorted), vec!["Second", "First"]);
}

#[test]
fn test_cycles_are_found_once() {
    let unit = analyzed("class A extends B {}\nclass B extends A {}\nclass C extends A {}");
    let table = &unit.compile_unit().classes;
    let graph = InheritanceGraph::build(table, &table.primary_ids());
    let cycles = graph.cycles();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycle_message(table, &cycles[0]), "Cyclic inheritance involving A, B");
}

#[test]
fn test_no_cycles() {
    let unit = analyzed("class A {}\nclass B extends A {}");
    let table = &unit.compile_unit().classes;
    assert!(InheritanceGraph::build(table, &table.primary_ids()).cycles().is_empty());
}
