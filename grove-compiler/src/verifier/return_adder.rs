//! Explicit returns at every exit of a method body

use crate::synthetic::local;
use grove_parser::{Expression, MethodNode, Statement, StatementKind};

/// True when every path through `statement` ends in `return` or `throw`
pub fn guarantees_return(statement: &Statement) -> bool {
    match &statement.kind {
        StatementKind::Return(_) | StatementKind::Throw(_) => true,
        StatementKind::Block(statements) => statements.iter().any(guarantees_return),
        StatementKind::If(if_statement) => match &if_statement.else_branch {
            Some(else_branch) => {
                guarantees_return(&if_statement.then_branch) && guarantees_return(else_branch)
            }
            None => false,
        },
        StatementKind::Try(try_statement) => {
            let covered = guarantees_return(&try_statement.body)
                && try_statement
                    .catches
                    .iter()
                    .all(|catch| guarantees_return(&catch.body));
            covered
                || try_statement
                    .finally
                    .as_deref()
                    .is_some_and(guarantees_return)
        }
        StatementKind::Synchronized(synchronized) => guarantees_return(&synchronized.body),
        _ => false,
    }
}

/// Makes the method's implicit result explicit
///
/// A void method gets a trailing `return`. Otherwise the value of the last
/// expression statement is returned, descending into `if`, `try` and
/// `synchronized`, and paths without a value return `null`.
pub fn add_returns(method: &mut MethodNode) {
    if method.is_constructor() {
        return;
    }
    let is_void = method.is_void();
    let Some(body) = method.body.as_mut() else {
        return;
    };
    if guarantees_return(body) {
        return;
    }
    let statements = body.statements_mut();
    if is_void {
        statements.push(Statement::ret(None));
    } else {
        complete(statements);
    }
}

/// Returns the value of the last statement of a closure body
pub fn add_value_return(body: &mut Statement) {
    if !guarantees_return(body) {
        complete(body.statements_mut());
    }
}

fn complete(statements: &mut Vec<Statement>) {
    let Some(last) = statements.last_mut() else {
        statements.push(Statement::ret(Some(Expression::null())));
        return;
    };
    if guarantees_return(last) {
        return;
    }
    match &mut last.kind {
        StatementKind::Expression(expression) => {
            let value = std::mem::replace(expression, Expression::null());
            *last = Statement::ret(Some(value));
        }
        StatementKind::Declaration(declaration) => {
            let name = declaration.name.clone();
            statements.push(Statement::ret(Some(local(&name))));
        }
        StatementKind::Block(inner) => complete(inner),
        StatementKind::If(if_statement) => {
            complete(if_statement.then_branch.statements_mut());
            match if_statement.else_branch.as_mut() {
                Some(else_branch) => complete(else_branch.statements_mut()),
                None => statements.push(Statement::ret(Some(Expression::null()))),
            }
        }
        StatementKind::Try(try_statement) => {
            complete(try_statement.body.statements_mut());
            for catch in &mut try_statement.catches {
                complete(catch.body.statements_mut());
            }
        }
        StatementKind::Synchronized(synchronized) => {
            complete(synchronized.body.statements_mut());
        }
        _ => statements.push(Statement::ret(Some(Expression::null()))),
    }
}
