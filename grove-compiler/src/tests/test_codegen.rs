use crate::*;
use pretty_assertions::assert_eq;

fn generate(source: &str) -> Vec<ClassFile> {
    compile_sources(CompilerConfiguration::default(), [("Main.grove", source)])
        .unwrap()
        .iter()
        .map(|class| decode(&class.bytes).unwrap())
        .collect()
}

fn class<'a>(classes: &'a [ClassFile], name: &str) -> &'a ClassFile {
    classes
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("no class {name}"))
}

fn site_names(class: &ClassFile, kind: CallSiteKind) -> Vec<&str> {
    class
        .call_sites
        .iter()
        .filter(|site| site.kind == kind)
        .map(|site| site.name.as_str())
        .collect()
}

#[test]
fn test_closure_becomes_its_own_class() {
    let classes = generate("def total = 0\n[1, 2].each { total += it }\nprintln(total)");
    let closure = class(&classes, "Main$_run_closure1");
    assert_eq!(closure.super_name.as_deref(), Some("grove.lang.Closure"));
    assert_eq!(closure.captured, vec!["total".to_string()]);
    let do_call = closure.method("doCall", 1).unwrap();
    assert_eq!(do_call.parameter_types, vec!["grove.lang.Object".to_string()]);
    assert!(do_call.is_synthetic());
    // owner, the captured cell and `it`
    assert!(do_call.max_locals >= 3);
    assert!(do_call.instructions.contains(&Instruction::LoadRef(1)));

    let script = class(&classes, "Main");
    let run = script.method("run", 0).unwrap();
    assert!(run.instructions.contains(&Instruction::NewRef));
    assert!(run
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::MakeClosure { captured: 1, .. })));
}

#[test]
fn test_calls_and_operators_use_call_sites() {
    let classes = generate("class A {\n  def f(x) { x.foo(1) + 2 }\n}");
    let a = class(&classes, "A");
    let methods = site_names(a, CallSiteKind::Method);
    assert!(methods.contains(&"foo"));
    assert!(methods.contains(&"plus"));
    let f = a.method("f", 1).unwrap();
    assert_eq!(f.instructions.last(), Some(&Instruction::Return));
}

#[test]
fn test_comparison_goes_through_compare_to() {
    let classes = generate("class A {\n  def less(a, b) { a < b }\n  def same(a, b) { a == b }\n}");
    let a = class(&classes, "A");
    let less = a.method("less", 2).unwrap();
    assert!(less.instructions.contains(&Instruction::CmpZero(Comparison::Less)));
    assert!(site_names(a, CallSiteKind::Method).contains(&"compareTo"));
    let same = a.method("same", 2).unwrap();
    assert!(same.instructions.contains(&Instruction::Eq));
}

#[test]
fn test_finally_runs_on_every_exit() {
    let classes = generate(
        "class A {\n  def f() {\n    try {\n      g()\n    } finally {\n      h()\n    }\n  }\n}",
    );
    let a = class(&classes, "A");
    let f = a.method("f", 0).unwrap();
    assert!(f.exception_table.iter().any(|e| e.catch_type.is_none()));
    let finally_calls = site_names(a, CallSiteKind::Method)
        .into_iter()
        .filter(|name| *name == "h")
        .count();
    assert!(finally_calls >= 2, "finally inlined {finally_calls} times");
}

#[test]
fn test_untyped_catch_catches_exceptions() {
    let classes = generate(
        "class A {\n  def f() {\n    try {\n      g()\n    } catch (e) {\n      h(e)\n    }\n  }\n}",
    );
    let a = class(&classes, "A");
    let f = a.method("f", 0).unwrap();
    let entry = f.exception_table.first().unwrap();
    let caught = entry.catch_type.and_then(|index| a.constant_at(index));
    assert_eq!(caught, Some("grove.lang.Exception"));
}

#[test]
fn test_break_outside_loop() {
    let error = compile_sources(
        CompilerConfiguration::default(),
        [("Main.grove", "class A {\n  def f() {\n    break\n  }\n}")],
    )
    .unwrap_err();
    let messages: Vec<String> = error.messages().iter().map(CompileMessage::message).collect();
    assert_eq!(
        messages,
        vec!["the break statement is only allowed inside loops".to_string()]
    );
}

#[test]
fn test_static_method_and_script_entry_point() {
    let classes = generate("println('hi')");
    let script = class(&classes, "Main");
    assert_eq!(script.super_name.as_deref(), Some("grove.lang.Script"));
    let main = script.method("main", 1).unwrap();
    assert!(main.is_static());
    assert_eq!(main.parameter_types, vec!["grove.util.List".to_string()]);
    assert!(site_names(script, CallSiteKind::Constructor).contains(&"Main"));
}

#[test]
fn test_constructors_call_super() {
    let classes = generate("class Base {}\nclass Derived extends Base {}");
    let derived = class(&classes, "Derived");
    assert_eq!(site_names(derived, CallSiteKind::SuperInit), vec!["Base"]);
    let init = derived.method("<init>", 0).unwrap();
    assert_eq!(init.instructions.first(), Some(&Instruction::Load(0)));
}

#[test]
fn test_gstring_and_collections() {
    let classes = generate("def name = 'x'\ndef items = [1, 2]\ndef map = [a: 1]\nprintln(\"$name ${items}\")");
    let run = class(&classes, "Main").method("run", 0).unwrap();
    assert!(run.instructions.contains(&Instruction::NewList(2)));
    assert!(run.instructions.contains(&Instruction::NewMap(1)));
    assert!(run
        .instructions
        .iter()
        .any(|i| matches!(i, Instruction::NewGString { values: 2, .. })));
}
