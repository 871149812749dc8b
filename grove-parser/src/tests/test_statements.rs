use crate::*;

fn script_statements(source: &str) -> Vec<Statement> {
    let output = parse_module(source, "test.grove").unwrap();
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
    output.module.statements
}

#[test]
fn test_local_declarations() {
    let statements = script_statements("def x = 1\nString name\nfinal y = 2");
    assert_eq!(statements.len(), 3);
    let StatementKind::Declaration(x) = &statements[0].kind else {
        panic!("Expected declaration");
    };
    assert!(x.declared_type.is_dynamic());
    assert!(x.initial.is_some());
    let StatementKind::Declaration(name) = &statements[1].kind else {
        panic!("Expected declaration");
    };
    assert_eq!(name.declared_type.name, "String");
    assert!(name.initial.is_none());
    let StatementKind::Declaration(y) = &statements[2].kind else {
        panic!("Expected declaration");
    };
    assert!(y.is_final);
}

#[test]
fn test_if_else_chain() {
    let statements = script_statements("if (a) { b() } else if (c) d() else { e() }");
    let StatementKind::If(outer) = &statements[0].kind else {
        panic!("Expected if");
    };
    let else_branch = outer.else_branch.as_ref().unwrap();
    let StatementKind::If(inner) = &else_branch.kind else {
        panic!("Expected nested if");
    };
    assert!(matches!(inner.then_branch.kind, StatementKind::Expression(_)));
    assert!(inner.else_branch.is_some());
}

#[test]
fn test_loops() {
    let statements = script_statements(
        "for (item in items) { if (item) break }\nwhile (n > 0) { n -= 1; continue }",
    );
    let StatementKind::ForIn(for_in) = &statements[0].kind else {
        panic!("Expected for-in");
    };
    assert_eq!(for_in.variable.name, "item");
    assert!(for_in.variable.param_type.is_dynamic());
    let StatementKind::While(while_loop) = &statements[1].kind else {
        panic!("Expected while");
    };
    assert_eq!(while_loop.body.statements().len(), 2);
}

#[test]
fn test_typed_for_variable() {
    let statements = script_statements("for (String s in names) println(s)");
    let StatementKind::ForIn(for_in) = &statements[0].kind else {
        panic!("Expected for-in");
    };
    assert_eq!(for_in.variable.param_type.name, "String");
}

#[test]
fn test_try_catch_finally() {
    let statements = script_statements(
        "try { risky() } catch (IllegalStateException e) { a() } catch (e) { b() } finally { c() }",
    );
    let StatementKind::Try(try_statement) = &statements[0].kind else {
        panic!("Expected try");
    };
    assert_eq!(try_statement.catches.len(), 2);
    assert_eq!(
        try_statement.catches[0].parameter.param_type.name,
        "IllegalStateException"
    );
    assert_eq!(try_statement.catches[1].parameter.param_type.name, names::EXCEPTION);
    assert!(try_statement.finally.is_some());
}

#[test]
fn test_try_without_handlers_is_reported() {
    let output = parse_module("try { a() }", "test.grove").unwrap();
    assert_eq!(output.errors.len(), 1);
    assert!(output.errors[0]
        .to_string()
        .contains("without catch or finally"));
}

#[test]
fn test_synchronized_throw_and_return() {
    let statements = script_statements(
        "synchronized (lock) { count += 1 }\nthrow new IllegalStateException('boom')\nreturn",
    );
    assert!(matches!(statements[0].kind, StatementKind::Synchronized(_)));
    assert!(matches!(statements[1].kind, StatementKind::Throw(_)));
    assert_eq!(statements[2].kind, StatementKind::Return(None));
}

#[test]
fn test_statement_positions() {
    let statements = script_statements("a()\n\n  b()");
    assert_eq!(statements[1].span.line(), 3);
    assert_eq!(statements[1].span.column(), 3);
}

#[test]
fn test_list_on_a_new_line_starts_a_statement() {
    let statements = script_statements("def total = 0\n[1, 2].each { total += it }");
    assert_eq!(statements.len(), 2);
    let StatementKind::Declaration(total) = &statements[0].kind else {
        panic!("Expected declaration");
    };
    assert!(matches!(
        total.initial.as_ref().map(|e| &e.kind),
        Some(ExpressionKind::Constant(ConstantValue::Integer(0)))
    ));
    let StatementKind::Expression(call) = &statements[1].kind else {
        panic!("Expected expression statement");
    };
    assert!(matches!(&call.kind, ExpressionKind::MethodCall(m) if m.method == "each"));
}

#[test]
fn test_member_access_continues_on_the_next_line() {
    let statements = script_statements("def n = [3, 1]\n    .sort()\n    .size()");
    assert_eq!(statements.len(), 1);
    let StatementKind::Declaration(n) = &statements[0].kind else {
        panic!("Expected declaration");
    };
    assert!(matches!(
        n.initial.as_ref().map(|e| &e.kind),
        Some(ExpressionKind::MethodCall(m)) if m.method == "size"
    ));
}
