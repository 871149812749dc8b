use crate::*;

fn binary_parts(expression: &Expression) -> (&Expression, BinaryOperator, &Expression) {
    match &expression.kind {
        ExpressionKind::Binary(binary) => (&binary.left, binary.operator, &binary.right),
        other => panic!("Expected binary expression, got {other:?}"),
    }
}

fn integer(expression: &Expression) -> i64 {
    match &expression.kind {
        ExpressionKind::Constant(ConstantValue::Integer(i)) => *i,
        other => panic!("Expected integer constant, got {other:?}"),
    }
}

fn variable_name(expression: &Expression) -> &str {
    match &expression.kind {
        ExpressionKind::Variable(v) => &v.name,
        other => panic!("Expected variable, got {other:?}"),
    }
}

#[test]
fn test_multiplication_binds_tighter_than_addition() {
    let expr = parse_expression("1 + 2 * 3").unwrap();
    let (left, op, right) = binary_parts(&expr);
    assert_eq!(op, BinaryOperator::Add);
    assert_eq!(integer(left), 1);
    let (l, op, r) = binary_parts(right);
    assert_eq!(op, BinaryOperator::Multiply);
    assert_eq!((integer(l), integer(r)), (2, 3));
}

#[test]
fn test_left_associative_subtraction() {
    let expr = parse_expression("10 - 4 - 3").unwrap();
    let (left, op, right) = binary_parts(&expr);
    assert_eq!(op, BinaryOperator::Subtract);
    assert_eq!(integer(right), 3);
    let (l, _, r) = binary_parts(left);
    assert_eq!((integer(l), integer(r)), (10, 4));
}

#[test]
fn test_logical_precedence() {
    let expr = parse_expression("a || b && c").unwrap();
    let (left, op, right) = binary_parts(&expr);
    assert_eq!(op, BinaryOperator::LogicalOr);
    assert_eq!(variable_name(left), "a");
    let (_, inner, _) = binary_parts(right);
    assert_eq!(inner, BinaryOperator::LogicalAnd);
}

#[test]
fn test_comparison_below_arithmetic() {
    let expr = parse_expression("x + 1 < y * 2").unwrap();
    let (left, op, right) = binary_parts(&expr);
    assert_eq!(op, BinaryOperator::Less);
    assert_eq!(binary_parts(left).1, BinaryOperator::Add);
    assert_eq!(binary_parts(right).1, BinaryOperator::Multiply);
}

#[test]
fn test_elvis_is_right_associative_and_lowest() {
    let expr = parse_expression("a ?: b ?: c || d").unwrap();
    let ExpressionKind::Elvis(outer) = &expr.kind else {
        panic!("Expected elvis, got {:?}", expr.kind);
    };
    assert_eq!(variable_name(&outer.value), "a");
    let ExpressionKind::Elvis(inner) = &outer.fallback.kind else {
        panic!("Expected nested elvis");
    };
    assert_eq!(variable_name(&inner.value), "b");
    assert_eq!(binary_parts(&inner.fallback).1, BinaryOperator::LogicalOr);
}

#[test]
fn test_ternary() {
    let expr = parse_expression("x > 1 ? 'big' : 'small'").unwrap();
    let ExpressionKind::Ternary(ternary) = &expr.kind else {
        panic!("Expected ternary");
    };
    assert_eq!(binary_parts(&ternary.condition).1, BinaryOperator::Greater);
    assert_eq!(
        ternary.else_branch.kind,
        ExpressionKind::Constant(ConstantValue::String("small".to_string()))
    );
}

#[test]
fn test_negative_literal_is_folded() {
    let expr = parse_expression("-42").unwrap();
    assert_eq!(integer(&expr), -42);

    let expr = parse_expression("-x").unwrap();
    let ExpressionKind::Unary(unary) = &expr.kind else {
        panic!("Expected unary");
    };
    assert_eq!(unary.operator, UnaryOperator::Negate);
}

#[test]
fn test_not_applies_after_instanceof() {
    let expr = parse_expression("!x instanceof String").unwrap();
    let ExpressionKind::Unary(unary) = &expr.kind else {
        panic!("Expected unary");
    };
    assert_eq!(unary.operator, UnaryOperator::Not);
    assert!(matches!(unary.operand.kind, ExpressionKind::InstanceOf(_)));
}

#[test]
fn test_cast() {
    let expr = parse_expression("value as Integer").unwrap();
    let ExpressionKind::Cast(cast) = &expr.kind else {
        panic!("Expected cast");
    };
    assert_eq!(cast.class_type.name, "Integer");
}

#[test]
fn test_method_call_chain_with_safe_navigation() {
    let expr = parse_expression("person?.address.city.toUpperCase()").unwrap();
    let ExpressionKind::MethodCall(call) = &expr.kind else {
        panic!("Expected method call");
    };
    assert_eq!(call.method, "toUpperCase");
    assert!(!call.safe);
    let ExpressionKind::Property(city) = &call.object.kind else {
        panic!("Expected property");
    };
    assert_eq!(city.property, "city");
    let ExpressionKind::Property(address) = &city.object.kind else {
        panic!("Expected property");
    };
    assert!(address.safe);
}

#[test]
fn test_direct_field_access() {
    let expr = parse_expression("this.@count").unwrap();
    let ExpressionKind::Field(field) = &expr.kind else {
        panic!("Expected field access");
    };
    assert_eq!(field.name, "count");
    assert_eq!(field.object.kind, ExpressionKind::This);
}

#[test]
fn test_implicit_this_call() {
    let expr = parse_expression("greet('Bob', 2)").unwrap();
    let ExpressionKind::MethodCall(call) = &expr.kind else {
        panic!("Expected method call");
    };
    assert!(call.implicit_this);
    assert_eq!(call.method, "greet");
    assert_eq!(call.arguments.len(), 2);
    assert_eq!(call.object.kind, ExpressionKind::This);
}

#[test]
fn test_trailing_closure_becomes_last_argument() {
    let expr = parse_expression("items.each { item -> println(item) }").unwrap();
    let ExpressionKind::MethodCall(call) = &expr.kind else {
        panic!("Expected method call");
    };
    assert_eq!(call.method, "each");
    assert_eq!(call.arguments.len(), 1);
    let ExpressionKind::Closure(closure) = &call.arguments[0].kind else {
        panic!("Expected closure argument");
    };
    let params = closure.parameters.as_ref().unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0].name, "item");
}

#[test]
fn test_closure_without_parameters_uses_implicit_it() {
    let expr = parse_expression("{ it * 2 }").unwrap();
    let ExpressionKind::Closure(closure) = &expr.kind else {
        panic!("Expected closure");
    };
    assert!(closure.parameters.is_none());
    assert_eq!(closure.body.statements().len(), 1);
}

#[test]
fn test_closure_with_empty_parameter_list() {
    let expr = parse_expression("{ -> 1 }").unwrap();
    let ExpressionKind::Closure(closure) = &expr.kind else {
        panic!("Expected closure");
    };
    assert_eq!(closure.parameters.as_deref(), Some(&[][..]));
}

#[test]
fn test_new_expression() {
    let expr = parse_expression("new Person('Ann', 30)").unwrap();
    let ExpressionKind::ConstructorCall(call) = &expr.kind else {
        panic!("Expected constructor call");
    };
    assert_eq!(call.kind, ConstructorCallKind::New);
    assert_eq!(call.class_type.name, "Person");
    assert_eq!(call.arguments.len(), 2);
}

#[test]
fn test_collections() {
    let expr = parse_expression("[1, 2, 3]").unwrap();
    assert!(matches!(&expr.kind, ExpressionKind::List(items) if items.len() == 3));

    let expr = parse_expression("[:]").unwrap();
    assert!(matches!(&expr.kind, ExpressionKind::Map(entries) if entries.is_empty()));

    let expr = parse_expression("[name: 'x', (key): 2]").unwrap();
    let ExpressionKind::Map(entries) = &expr.kind else {
        panic!("Expected map");
    };
    assert_eq!(
        entries[0].key.kind,
        ExpressionKind::Constant(ConstantValue::String("name".to_string()))
    );
    assert_eq!(variable_name(&entries[1].key), "key");
}

#[test]
fn test_index_and_compound_assignment() {
    let expr = parse_expression("totals[key] += 5").unwrap();
    let ExpressionKind::Assignment(assignment) = &expr.kind else {
        panic!("Expected assignment");
    };
    assert_eq!(assignment.operator, AssignmentOperator::AddAssign);
    assert!(matches!(assignment.target.kind, ExpressionKind::Index(_)));
}

#[test]
fn test_assignment_is_right_associative() {
    let expr = parse_expression("a = b = 3").unwrap();
    let ExpressionKind::Assignment(outer) = &expr.kind else {
        panic!("Expected assignment");
    };
    assert_eq!(variable_name(&outer.target), "a");
    assert!(matches!(outer.value.kind, ExpressionKind::Assignment(_)));
}

#[test]
fn test_invalid_assignment_target() {
    let result = parse_expression("1 = 2");
    assert!(matches!(result, Err(ParseError::Semantic { .. })));
}

#[test]
fn test_float_literal() {
    let expr = parse_expression("2.5e2").unwrap();
    assert_eq!(expr.kind, ExpressionKind::Constant(ConstantValue::Float(250.0)));
}
