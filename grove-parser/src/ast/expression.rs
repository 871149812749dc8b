use super::{ClassType, Parameter, Span, Statement};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub span: Span,
}

impl Expression {
    pub fn new(kind: ExpressionKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn null() -> Self {
        Self::new(ExpressionKind::Constant(ConstantValue::Null), Span::default())
    }

    pub fn constant(value: ConstantValue, span: Span) -> Self {
        Self::new(ExpressionKind::Constant(value), span)
    }

    pub fn variable(name: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExpressionKind::Variable(VariableExpression {
                name: name.into(),
                binding: VariableBinding::Unresolved,
            }),
            span,
        )
    }

    pub fn this(span: Span) -> Self {
        Self::new(ExpressionKind::This, span)
    }

    /// Call on `object`, not an implicit-this call
    pub fn call(object: Expression, method: impl Into<String>, arguments: Vec<Expression>) -> Self {
        let span = object.span.clone();
        Self::new(
            ExpressionKind::MethodCall(MethodCallExpression {
                object: Box::new(object),
                method: method.into(),
                arguments,
                safe: false,
                implicit_this: false,
            }),
            span,
        )
    }

    pub fn field(object: Expression, name: impl Into<String>) -> Self {
        let span = object.span.clone();
        Self::new(
            ExpressionKind::Field(FieldExpression {
                object: Box::new(object),
                name: name.into(),
            }),
            span,
        )
    }

    pub fn assign(target: Expression, value: Expression) -> Self {
        let span = target.span.merge(&value.span);
        Self::new(
            ExpressionKind::Assignment(AssignmentExpression {
                target: Box::new(target),
                operator: AssignmentOperator::Assign,
                value: Box::new(value),
            }),
            span,
        )
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ExpressionKind::Constant(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Constant(ConstantValue),
    GString(GStringExpression),
    List(Vec<Expression>),
    Map(Vec<MapEntry>),
    Variable(VariableExpression),
    /// A class literal, produced by resolution from variables naming a class
    Class(ClassType),
    This,
    Super,
    Property(PropertyExpression),
    /// Direct field access, `obj.@name`
    Field(FieldExpression),
    MethodCall(MethodCallExpression),
    ConstructorCall(ConstructorCallExpression),
    Closure(ClosureExpression),
    Binary(BinaryExpression),
    Unary(UnaryExpression),
    Ternary(TernaryExpression),
    Elvis(ElvisExpression),
    Assignment(AssignmentExpression),
    Index(IndexExpression),
    InstanceOf(InstanceOfExpression),
    Cast(CastExpression),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Null => write!(f, "null"),
            ConstantValue::Boolean(b) => write!(f, "{b}"),
            ConstantValue::Integer(i) => write!(f, "{i}"),
            ConstantValue::Float(x) => write!(f, "{x}"),
            ConstantValue::String(s) => write!(f, "'{s}'"),
        }
    }
}

/// `"text ${expr} more $name"`: literal strings interleaved with values
#[derive(Debug, Clone, PartialEq)]
pub struct GStringExpression {
    pub strings: Vec<String>,
    pub values: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableBinding {
    Unresolved,
    /// Local variable or parameter of the enclosing method or closure
    Local,
    /// Not declared anywhere; dispatched as a property of `this`
    DynamicProperty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableExpression {
    pub name: String,
    pub binding: VariableBinding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyExpression {
    pub object: Box<Expression>,
    pub property: String,
    pub safe: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpression {
    pub object: Box<Expression>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallExpression {
    pub object: Box<Expression>,
    pub method: String,
    pub arguments: Vec<Expression>,
    pub safe: bool,
    /// Written without a receiver, `foo(1)` rather than `this.foo(1)`
    pub implicit_this: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorCallKind {
    New,
    /// `super(...)` inside a constructor
    Super,
    /// `this(...)` inside a constructor
    This,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorCallExpression {
    pub class_type: ClassType,
    pub arguments: Vec<Expression>,
    pub kind: ConstructorCallKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureExpression {
    /// `None` when no parameter list was written: the closure takes an implicit `it`
    pub parameters: Option<Vec<Parameter>>,
    pub body: Box<Statement>,
    /// Outer variables referenced by the body, filled in by scope analysis
    pub captured: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::LogicalAnd => "&&",
            BinaryOperator::LogicalOr => "||",
        }
    }

    /// Name of the method an arithmetic operator dispatches to
    pub fn method_name(self) -> Option<&'static str> {
        match self {
            BinaryOperator::Add => Some("plus"),
            BinaryOperator::Subtract => Some("minus"),
            BinaryOperator::Multiply => Some("multiply"),
            BinaryOperator::Divide => Some("div"),
            BinaryOperator::Modulo => Some("mod"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub left: Box<Expression>,
    pub operator: BinaryOperator,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub operator: UnaryOperator,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernaryExpression {
    pub condition: Box<Expression>,
    pub then_branch: Box<Expression>,
    pub else_branch: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElvisExpression {
    pub value: Box<Expression>,
    pub fallback: Box<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
}

impl AssignmentOperator {
    /// Binary operator applied before storing, `None` for plain assignment
    pub fn binary(self) -> Option<BinaryOperator> {
        match self {
            AssignmentOperator::Assign => None,
            AssignmentOperator::AddAssign => Some(BinaryOperator::Add),
            AssignmentOperator::SubtractAssign => Some(BinaryOperator::Subtract),
            AssignmentOperator::MultiplyAssign => Some(BinaryOperator::Multiply),
            AssignmentOperator::DivideAssign => Some(BinaryOperator::Divide),
            AssignmentOperator::ModuloAssign => Some(BinaryOperator::Modulo),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    pub target: Box<Expression>,
    pub operator: AssignmentOperator,
    pub value: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexExpression {
    pub object: Box<Expression>,
    pub index: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstanceOfExpression {
    pub expression: Box<Expression>,
    pub class_type: ClassType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CastExpression {
    pub expression: Box<Expression>,
    pub class_type: ClassType,
}
