use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_println() {
    assert_eq!(run("println('hello')\nprint('a')\nprint('b')\nprintln()"), "hello\nab\n");
}

#[test]
fn test_closures_capture_locals() {
    assert_eq!(run("def total = 0\n[1, 2, 3].each { total += it }\nprintln(total)"), "6\n");
}

#[test]
fn test_collect() {
    assert_eq!(run("println([1, 2, 3].collect { it * 2 })"), "[2, 4, 6]\n");
}

#[test]
fn test_map_iteration() {
    assert_eq!(
        run("def ages = [ann: 30, bob: 41]\nages.each { k, v -> println(k + '=' + v) }"),
        "ann=30\nbob=41\n"
    );
}

#[test]
fn test_integer_division() {
    assert_eq!(run("println(6 / 2)\nprintln(7 / 2)\nprintln(7 % 2)"), "3\n3.5\n1\n");
}

#[test]
fn test_gstring() {
    assert_eq!(run("def name = 'Bob'\nprintln(\"Hi $name\")"), "Hi Bob\n");
}

#[test]
fn test_loops() {
    assert_eq!(
        run("def n = 3\nwhile (n > 0) {\n  print(n)\n  n -= 1\n}\nfor (x in ['a', 'b']) {\n  print(x)\n}\nprintln()"),
        "321ab\n"
    );
}

#[test]
fn test_times() {
    assert_eq!(run("def n = 3\nn.times { print(it) }\nprintln()"), "012\n");
}

#[test]
fn test_undeclared_variables_live_in_the_binding() {
    let (rt, output, entry) = load_script("count = 5\nprintln(count)");
    let script = rt.new_instance(&entry.name, Vec::new()).unwrap();
    rt.invoke_method(&script, "run", Vec::new()).unwrap();
    assert_eq!(rt.binding_value(&script, "count"), Some(Value::Int(5)));
    assert_eq!(output.lock().unwrap().as_str(), "5\n");
}

#[test]
fn test_script_methods() {
    assert_eq!(run("def greet(name) { \"Hi $name\" }\nprintln(greet('Bob'))"), "Hi Bob\n");
}
