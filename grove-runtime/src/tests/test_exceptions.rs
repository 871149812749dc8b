use super::*;
use grove_compiler::classpath;
use pretty_assertions::assert_eq;

#[test]
fn test_catch_and_finally() {
    let source = "try {\n  throw new IllegalStateException('boom')\n} catch (IllegalStateException e) {\n  println(e.message)\n} finally {\n  println('done')\n}";
    assert_eq!(run(source), "boom\ndone\n");
}

#[test]
fn test_runtime_failures_are_catchable() {
    let source = "try {\n  println(1 / 0)\n} catch (ArithmeticException e) {\n  println('caught')\n}";
    assert_eq!(run(source), "caught\n");
}

#[test]
fn test_uncaught_exception() {
    let error = run_error("throw new IllegalArgumentException('bad')");
    assert_eq!(thrown_class(&error), classpath::ILLEGAL_ARGUMENT);
    assert_eq!(error.to_string(), "grove.lang.IllegalArgumentException: bad");
}

#[test]
fn test_missing_method() {
    let error = run_error("class A {}\nnew A().nope()");
    assert_eq!(thrown_class(&error), classpath::MISSING_METHOD);
    assert!(error.to_string().contains("A.nope()"), "{error}");
}

#[test]
fn test_null_receiver() {
    let error = run_error("def x = null\nx.foo()");
    assert_eq!(thrown_class(&error), classpath::NULL_POINTER);
}

#[test]
fn test_safe_navigation_on_null() {
    assert_eq!(run("def x = null\nprintln(x?.foo())"), "null\n");
}

#[test]
fn test_ambiguous_overloads() {
    let source = "class Picker {\n  def pick(String a, Object b) { 'first' }\n  def pick(Object a, String b) { 'second' }\n}\nnew Picker().pick('x', 'y')";
    let error = run_error(source);
    assert!(error.to_string().contains("Ambiguous method overloading"), "{error}");
}

#[test]
fn test_most_specific_overload_wins() {
    let source = "class Picker {\n  def pick(Object a) { 'object' }\n  def pick(String a) { 'string' }\n}\nprintln(new Picker().pick('x'))\nprintln(new Picker().pick(1))";
    assert_eq!(run(source), "string\nobject\n");
}

#[test]
fn test_stack_overflow() {
    let (rt, _, entry) = load_script_with(
        RuntimeConfig::default().with_max_call_depth(40),
        "def down(n) { down(n + 1) }\ndown(0)",
    );
    let error = run_on(&rt, &entry).unwrap_err();
    assert!(matches!(error, RuntimeError::StackOverflow { max_depth: 40 }), "{error:?}");
}
