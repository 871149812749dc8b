use crate::*;

#[test]
fn test_single_quoted_string_escapes() {
    let expr = parse_expression(r"'it\'s\nA'").unwrap();
    assert_eq!(
        expr.kind,
        ExpressionKind::Constant(ConstantValue::String("it's\nA".to_string()))
    );
}

#[test]
fn test_gstring_without_interpolation_is_a_constant() {
    let expr = parse_expression(r#""plain \$ text""#).unwrap();
    assert_eq!(
        expr.kind,
        ExpressionKind::Constant(ConstantValue::String("plain $ text".to_string()))
    );
}

#[test]
fn test_gstring_interpolation() {
    let expr = parse_expression(r#""Hello ${first + last}, you are $age!""#).unwrap();
    let ExpressionKind::GString(gstring) = &expr.kind else {
        panic!("Expected GString, got {:?}", expr.kind);
    };
    assert_eq!(gstring.strings, vec!["Hello ", ", you are ", "!"]);
    assert_eq!(gstring.values.len(), 2);
    assert!(matches!(gstring.values[0].kind, ExpressionKind::Binary(_)));
    assert!(matches!(&gstring.values[1].kind, ExpressionKind::Variable(v) if v.name == "age"));
}

#[test]
fn test_gstring_lone_dollar() {
    let expr = parse_expression(r#""costs 5$""#).unwrap();
    assert_eq!(
        expr.kind,
        ExpressionKind::Constant(ConstantValue::String("costs 5$".to_string()))
    );
}
