use crate::*;
use pretty_assertions::assert_eq;

fn closure_classes(source: &str) -> Vec<ClassFile> {
    compile_sources(CompilerConfiguration::default(), [("Main.grove", source)])
        .unwrap()
        .iter()
        .map(|class| decode(&class.bytes).unwrap())
        .filter(|class| class.name.contains("closure"))
        .collect()
}

#[test]
fn test_closure_captures_outer_locals_once() {
    let closures = closure_classes("def a = 1\ndef b = 2\ndef c = { a + b + a }\nc()");
    assert_eq!(closures.len(), 1);
    assert_eq!(closures[0].captured, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_own_parameters_are_not_captured() {
    let closures = closure_classes("def f = { x, y -> x + y }\nf(1, 2)");
    assert!(closures[0].captured.is_empty());
    assert!(closures[0].method("doCall", 2).is_some());
}

#[test]
fn test_nested_closures_capture_through_the_outer_one() {
    let closures = closure_classes("def total = 0\n[[1]].each { row -> row.each { total += it } }");
    let mut names: Vec<&str> = closures.iter().map(|c| c.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Main$_run_closure1", "Main$_run_closure2"]);
    for closure in &closures {
        assert_eq!(closure.captured, vec!["total".to_string()]);
    }
}

#[test]
fn test_argument_closure_captures_the_local_it_updates() {
    let closures = closure_classes("def total = 0\n[1].each { total += it }\ntotal");
    assert_eq!(closures.len(), 1);
    assert_eq!(closures[0].captured, vec!["total".to_string()]);
}

#[test]
fn test_calling_a_local_calls_its_closure() {
    let classes: Vec<ClassFile> =
        compile_sources(CompilerConfiguration::default(), [("Main.grove", "def twice = { it * 2 }\ntwice(4)")])
            .unwrap()
            .iter()
            .map(|class| decode(&class.bytes).unwrap())
            .collect();
    let script = classes.iter().find(|c| c.name == "Main").unwrap();
    let methods: Vec<&str> = script
        .call_sites
        .iter()
        .filter(|site| site.kind == CallSiteKind::Method)
        .map(|site| site.name.as_str())
        .collect();
    assert!(methods.contains(&"call"));
    assert!(!methods.contains(&"twice"));
}

#[test]
fn test_undeclared_names_are_dynamic_properties() {
    let classes: Vec<ClassFile> =
        compile_sources(CompilerConfiguration::default(), [("Main.grove", "println(answer)")])
            .unwrap()
            .iter()
            .map(|class| decode(&class.bytes).unwrap())
            .collect();
    let script = &classes[0];
    assert!(script
        .call_sites
        .iter()
        .any(|site| site.kind == CallSiteKind::GetProperty && site.name == "answer"));
}
