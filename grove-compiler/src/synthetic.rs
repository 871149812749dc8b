//! Shorthands for building the AST of generated members
//!
//! Generated code is built after scope analysis, so variables are bound as
//! locals up front.

use grove_parser::{
    ClassId, ClassType, ConstantValue, ConstructorCallExpression, ConstructorCallKind,
    Expression, ExpressionKind, Span, Statement, StatementKind, VariableBinding,
    VariableExpression,
};

pub fn local(name: &str) -> Expression {
    Expression::new(
        ExpressionKind::Variable(VariableExpression {
            name: name.to_string(),
            binding: VariableBinding::Local,
        }),
        Span::default(),
    )
}

pub fn string(value: &str) -> Expression {
    Expression::constant(ConstantValue::String(value.to_string()), Span::default())
}

pub fn int(value: i64) -> Expression {
    Expression::constant(ConstantValue::Integer(value), Span::default())
}

pub fn class_ref(name: &str, id: Option<ClassId>) -> Expression {
    Expression::new(ExpressionKind::Class(resolved_type(name, id)), Span::default())
}

pub fn resolved_type(name: &str, id: Option<ClassId>) -> ClassType {
    let mut class_type = ClassType::new(name, Span::default());
    class_type.resolved = id;
    class_type
}

/// `this.@name`
pub fn this_field(name: &str) -> Expression {
    Expression::field(Expression::this(Span::default()), name)
}

/// `Owner.@name`, a static field
pub fn static_field(owner: &str, id: Option<ClassId>, name: &str) -> Expression {
    Expression::field(class_ref(owner, id), name)
}

/// `this.name(args)`
pub fn call_this(name: &str, arguments: Vec<Expression>) -> Expression {
    Expression::call(Expression::this(Span::default()), name, arguments)
}

pub fn new_instance(class_type: ClassType, arguments: Vec<Expression>) -> Expression {
    Expression::new(
        ExpressionKind::ConstructorCall(ConstructorCallExpression {
            class_type,
            arguments,
            kind: ConstructorCallKind::New,
        }),
        Span::default(),
    )
}

/// `this(...)` or `super(...)` inside a constructor
pub fn delegate_constructor(
    kind: ConstructorCallKind,
    class_type: ClassType,
    arguments: Vec<Expression>,
) -> Statement {
    Statement::expression(Expression::new(
        ExpressionKind::ConstructorCall(ConstructorCallExpression {
            class_type,
            arguments,
            kind,
        }),
        Span::default(),
    ))
}

pub fn assign(target: Expression, value: Expression) -> Statement {
    Statement::expression(Expression::assign(target, value))
}

pub fn ret(value: Expression) -> Statement {
    Statement::ret(Some(value))
}

pub fn block(statements: Vec<Statement>) -> Statement {
    Statement::block(statements, Span::default())
}

/// A resolved mention of a class the table already knows by name
pub fn known_type(table: &grove_parser::ClassTable, name: &str) -> ClassType {
    resolved_type(name, table.lookup(name))
}

/// Kind of the `this(...)`/`super(...)` call opening a constructor body, if any
pub fn leading_constructor_call(statements: &[Statement]) -> Option<ConstructorCallKind> {
    match statements.first().map(|s| &s.kind) {
        Some(StatementKind::Expression(Expression {
            kind: ExpressionKind::ConstructorCall(call),
            ..
        })) if call.kind != ConstructorCallKind::New => Some(call.kind),
        _ => None,
    }
}

pub fn leading_constructor_call_mut(
    statements: &mut [Statement],
) -> Option<&mut ConstructorCallExpression> {
    match statements.first_mut().map(|s| &mut s.kind) {
        Some(StatementKind::Expression(Expression {
            kind: ExpressionKind::ConstructorCall(call),
            ..
        })) if call.kind != ConstructorCallKind::New => Some(call),
        _ => None,
    }
}
