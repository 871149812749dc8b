use super::*;
use grove_compiler::classpath;
use pretty_assertions::assert_eq;

const GREETER: &str = "class Greeter {\n  def greet() { 'hi' }\n}\n";

#[test]
fn test_expando_method_invalidates_call_sites() {
    let source = format!(
        "{GREETER}def say(g) {{ g.greet() }}\ndef g = new Greeter()\nprintln(say(g))\nGreeter.metaClass.greet = {{ -> 'hello' }}\nprintln(say(g))"
    );
    let (rt, output, entry) = load_script(&source);
    run_on(&rt, &entry).unwrap();
    assert_eq!(output.lock().unwrap().as_str(), "hi\nhello\n");
    assert_eq!(site(&entry, CallSiteKind::Method, "greet").resolutions(), 2);
}

#[test]
fn test_new_expando_method() {
    let source = format!(
        "{GREETER}Greeter.metaClass.wave = {{ String who -> 'bye ' + who }}\nprintln(new Greeter().wave('Ann'))"
    );
    assert_eq!(run(&source), "bye Ann\n");
}

#[test]
fn test_per_instance_expando() {
    let source = format!(
        "{GREETER}def a = new Greeter()\ndef b = new Greeter()\na.metaClass.greet = {{ -> 'hey' }}\nprintln(a.greet())\nprintln(b.greet())"
    );
    assert_eq!(run(&source), "hey\nhi\n");
}

#[test]
fn test_expando_needs_a_closure() {
    let error = run_error(&format!("{GREETER}Greeter.metaClass.greet = 42"));
    assert_eq!(thrown_class(&error), classpath::ILLEGAL_ARGUMENT);
}

#[test]
fn test_class_mixin() {
    let source = "class Flying {\n  def fly() { 'flying' }\n}\nclass Duck {}\nDuck.mixin(Flying)\nprintln(new Duck().fly())";
    assert_eq!(run(source), "flying\n");
}

#[test]
fn test_instance_mixin() {
    let source = "class Flying {\n  def fly() { 'flying' }\n}\nclass Duck {}\ndef d = new Duck()\nd.mixin(Flying)\nprintln(d.fly())\nnew Duck().fly()";
    let (rt, output, entry) = load_script(source);
    let error = run_on(&rt, &entry).unwrap_err();
    assert_eq!(output.lock().unwrap().as_str(), "flying\n");
    assert_eq!(thrown_class(&error), classpath::MISSING_METHOD);
}

#[test]
fn test_mixin_entries_are_pruned() {
    let (rt, _, _) = load("class Flying {\n  def fly() { 'flying' }\n}\nclass Duck {}");
    let flying = rt.load_class("Flying").unwrap();
    let duck = rt.new_instance("Duck", Vec::new()).unwrap();
    rt.invoke_method(&duck, "mixin", vec![Value::Class(flying)]).unwrap();
    assert_eq!(rt.invoke_method(&duck, "fly", Vec::new()).unwrap(), Value::string("flying"));
    assert_eq!(rt.mixins().len(), 1);

    assert_eq!(rt.mixins().prune(), 0);
    drop(duck);
    assert_eq!(rt.mixins().prune(), 1);
    assert!(rt.mixins().is_empty());
}

#[test]
fn test_method_missing() {
    let source = "class Ghost {\n  def methodMissing(String name, args) { 'missing ' + name }\n}\nprintln(new Ghost().boo(1))";
    assert_eq!(run(source), "missing boo\n");
}

#[test]
fn test_property_missing() {
    let source = "class Ghost {\n  def propertyMissing(String name) { name.toUpperCase() }\n}\nprintln(new Ghost().boo)";
    assert_eq!(run(source), "BOO\n");
}

#[test]
fn test_missing_property() {
    let error = run_error("class A {}\nprintln(new A().nope)");
    assert_eq!(thrown_class(&error), classpath::MISSING_PROPERTY);
}

#[test]
fn test_responds_to() {
    let source = format!(
        "{GREETER}def g = new Greeter()\nprintln(g.metaClass.respondsTo(g, 'greet'))\nprintln(g.metaClass.respondsTo(g, 'wave'))"
    );
    assert_eq!(run(&source), "true\nfalse\n");
}

#[test]
fn test_concurrent_mixins_are_all_published() {
    let mut source = String::from("class Duck {}\n");
    for n in 0..8 {
        source.push_str(&format!("class Trick{n} {{\n  def trick{n}() {{ {n} }}\n}}\n"));
    }
    let (rt, _, _) = load(&source);
    let duck = rt.load_class("Duck").unwrap();
    let tricks: Vec<ClassRef> = (0..8)
        .map(|n| rt.load_class(&format!("Trick{n}")).unwrap())
        .collect();
    assert!(rt.meta_class(&duck).mixins().is_empty());

    std::thread::scope(|scope| {
        for trick in &tricks {
            let (rt, duck) = (&rt, &duck);
            scope.spawn(move || rt.registry().add_mixin(duck, trick));
        }
    });

    let meta = rt.meta_class(&duck);
    assert_eq!(meta.mixins().len(), 8);
    for n in 0..8 {
        assert!(meta.has_method(&format!("trick{n}")), "trick{n} missing");
    }
}
