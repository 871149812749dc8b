use super::{ClassType, Expression, Parameter, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub span: Span,
}

impl Statement {
    pub fn new(kind: StatementKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn block(statements: Vec<Statement>, span: Span) -> Self {
        Self::new(StatementKind::Block(statements), span)
    }

    pub fn empty_block() -> Self {
        Self::block(Vec::new(), Span::default())
    }

    pub fn expression(expression: Expression) -> Self {
        let span = expression.span.clone();
        Self::new(StatementKind::Expression(expression), span)
    }

    pub fn ret(value: Option<Expression>) -> Self {
        let span = value.as_ref().map(|v| v.span.clone()).unwrap_or_default();
        Self::new(StatementKind::Return(value), span)
    }

    /// Statements of a block, or the statement itself as a one-element slice
    pub fn statements(&self) -> &[Statement] {
        match &self.kind {
            StatementKind::Block(statements) => statements,
            _ => std::slice::from_ref(self),
        }
    }

    /// Mutable block contents, wrapping a non-block statement in a block first
    pub fn statements_mut(&mut self) -> &mut Vec<Statement> {
        if !matches!(self.kind, StatementKind::Block(_)) {
            let inner = std::mem::replace(self, Statement::empty_block());
            self.span = inner.span.clone();
            self.kind = StatementKind::Block(vec![inner]);
        }
        match &mut self.kind {
            StatementKind::Block(statements) => statements,
            _ => unreachable!("statement was just wrapped in a block"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Block(Vec<Statement>),
    Expression(Expression),
    Declaration(DeclarationStatement),
    If(IfStatement),
    While(WhileStatement),
    ForIn(ForInStatement),
    Return(Option<Expression>),
    Throw(Expression),
    Break,
    Continue,
    Try(TryStatement),
    Synchronized(SynchronizedStatement),
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclarationStatement {
    pub name: String,
    pub declared_type: ClassType,
    pub initial: Option<Expression>,
    pub is_final: bool,
    /// Captured by a closure, so stored in a shared reference cell
    pub closure_shared: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForInStatement {
    pub variable: Parameter,
    pub collection: Expression,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStatement {
    pub body: Box<Statement>,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Box<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub parameter: Parameter,
    pub body: Box<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynchronizedStatement {
    pub monitor: Expression,
    pub body: Box<Statement>,
}
