use super::*;
use pretty_assertions::assert_eq;

const GREETER: &str = "class Greeter {\n  def greet(String name) { 'Hi ' + name }\n}\ndef g = new Greeter()\n";

const SHOUT: &str = "class Shout {\n  static shout(String text) { text.toUpperCase() }\n}\n";

#[test]
fn test_monomorphic_site_resolves_once() {
    let source = format!("{GREETER}for (i in [1, 2, 3]) {{\n  print(g.greet('Bob'))\n}}\nprintln()");
    let (rt, output, entry) = load_script(&source);
    run_on(&rt, &entry).unwrap();
    assert_eq!(output.lock().unwrap().as_str(), "Hi BobHi BobHi Bob\n");
    let greet = site(&entry, CallSiteKind::Method, "greet");
    assert_eq!(greet.state_name(), "cached-exact");
    assert_eq!(greet.resolutions(), 1);
}

#[test]
fn test_gstring_argument_is_coerced() {
    let source = format!("{GREETER}def n = 'Bob'\nprintln(g.greet(\"$n\"))");
    let (rt, output, entry) = load_script(&source);
    run_on(&rt, &entry).unwrap();
    assert_eq!(output.lock().unwrap().as_str(), "Hi Bob\n");
    assert_eq!(site(&entry, CallSiteKind::Method, "greet").state_name(), "cached-coercing");
}

#[test]
fn test_constructor_site() {
    let (rt, _, entry) = load_script(GREETER);
    run_on(&rt, &entry).unwrap();
    assert_eq!(
        site(&entry, CallSiteKind::Constructor, "Greeter").state_name(),
        "constructor-no-unwrap-no-coerce"
    );
}

#[test]
fn test_megamorphic_site_goes_generic() {
    let (rt, _, entry) = load_script_with(
        RuntimeConfig::default().with_megamorphic_threshold(2),
        "for (x in [1, 'a', 2.5, [1]]) {\n  x.toString()\n}",
    );
    run_on(&rt, &entry).unwrap();
    let to_string = site(&entry, CallSiteKind::Method, "toString");
    assert_eq!(to_string.state_name(), "generic");
    assert_eq!(to_string.resolutions(), 4);
}

#[test]
fn test_sites_are_not_cached_under_a_category() {
    let source = format!("{SHOUT}use(Shout) {{\n  println('hi'.shout())\n}}");
    let (rt, output, entry) = load_script(&source);
    run_on(&rt, &entry).unwrap();
    assert_eq!(output.lock().unwrap().as_str(), "HI\n");

    let closure = rt.load_class("Main$_run_closure1").unwrap();
    let shout = site(&closure, CallSiteKind::Method, "shout");
    assert_eq!(shout.state_name(), "uninitialized");
    assert_eq!(shout.resolutions(), 1);
    assert!(rt.active_categories().is_empty());
}

#[test]
fn test_category_ends_with_its_block() {
    let source = format!("{SHOUT}use(Shout) {{\n  println('in')\n}}\n'hi'.shout()");
    let error = run_error(&source);
    assert_eq!(thrown_class(&error), grove_compiler::classpath::MISSING_METHOD);
}

#[test]
fn test_category_ends_when_its_block_throws() {
    let source = format!(
        "{SHOUT}try {{\n  use(Shout) {{\n    throw new IllegalStateException('x')\n  }}\n}} catch (IllegalStateException e) {{\n  println('caught')\n}}\n'hi'.shout()"
    );
    let (rt, output, entry) = load_script(&source);
    let error = run_on(&rt, &entry).unwrap_err();
    assert_eq!(output.lock().unwrap().as_str(), "caught\n");
    assert_eq!(thrown_class(&error), grove_compiler::classpath::MISSING_METHOD);
    assert!(rt.active_categories().is_empty());
}
