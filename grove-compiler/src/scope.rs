//! Variable scoping
//!
//! Binds every variable expression to a local or a dynamic property, records
//! which outer variables each closure captures and marks those declarations
//! closure-shared. A call `name(...)` where `name` is a local variable is a
//! call of the closure it holds.

use crate::error::CompileResult;
use crate::operation::{ClassContext, PrimaryClassNodeOperation};
use crate::visitor::{
    walk_closure, walk_expression, walk_method, walk_parameter, walk_statement, Visitor,
    VisitorResult,
};
use grove_parser::{
    ClassNode, ClosureExpression, Expression, ExpressionKind, MethodCallExpression, MethodNode,
    Parameter, Span, Statement, StatementKind, VariableBinding, VariableExpression,
};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

pub struct ScopeOperation;

impl PrimaryClassNodeOperation for ScopeOperation {
    fn name(&self) -> &str {
        "variable scoping"
    }

    fn call(&mut self, ctx: &mut ClassContext<'_>) -> CompileResult<()> {
        analyze_class(ctx.class)
    }
}

/// Runs both scoping passes over a class
pub fn analyze_class(class: &mut ClassNode) -> CompileResult<()> {
    let mut scoping = VariableScopeVisitor::default();
    scoping.visit_class(class)?;
    if scoping.shared.is_empty() {
        return Ok(());
    }
    let mut marker = SharedMarker {
        next: 0,
        shared: scoping.shared,
    };
    marker.visit_class(class)
}

#[derive(Default)]
struct Scope {
    /// Declared name -> declaration ordinal
    variables: IndexMap<String, usize>,
    closure: bool,
    captured: IndexSet<String>,
}

/// Ordinal given to the implicit `it` parameter, which has no declaration node
const IMPLICIT: usize = usize::MAX;

#[derive(Default)]
struct VariableScopeVisitor {
    scopes: Vec<Scope>,
    next: usize,
    shared: HashSet<usize>,
}

impl VariableScopeVisitor {
    fn push(&mut self, closure: bool) {
        self.scopes.push(Scope {
            closure,
            ..Scope::default()
        });
    }

    fn pop(&mut self) -> Scope {
        self.scopes.pop().unwrap_or_default()
    }

    fn declare(&mut self, name: &str) {
        let ordinal = self.next;
        self.next += 1;
        if let Some(scope) = self.scopes.last_mut() {
            scope.variables.insert(name.to_string(), ordinal);
        }
    }

    /// Finds a visible local, recording captures by every closure crossed
    fn lookup(&mut self, name: &str) -> bool {
        let Some(found) = self
            .scopes
            .iter()
            .rposition(|scope| scope.variables.contains_key(name))
        else {
            return false;
        };
        let mut crossed = false;
        for scope in &mut self.scopes[found + 1..] {
            if scope.closure {
                scope.captured.insert(name.to_string());
                crossed = true;
            }
        }
        if crossed {
            if let Some(&ordinal) = self.scopes[found].variables.get(name) {
                if ordinal != IMPLICIT {
                    self.shared.insert(ordinal);
                }
            }
        }
        true
    }

    fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.variables.contains_key(name))
    }
}

impl Visitor for VariableScopeVisitor {
    fn visit_method(&mut self, method: &mut MethodNode) -> VisitorResult {
        self.push(false);
        let result = walk_method(self, method);
        self.pop();
        result
    }

    fn visit_parameter(&mut self, parameter: &mut Parameter) -> VisitorResult {
        walk_parameter(self, parameter)?;
        self.declare(&parameter.name);
        Ok(())
    }

    fn visit_statement(&mut self, statement: &mut Statement) -> VisitorResult {
        match &mut statement.kind {
            StatementKind::Block(_) => {
                self.push(false);
                let result = walk_statement(self, statement);
                self.pop();
                result
            }
            StatementKind::Declaration(declaration) => {
                if let Some(initial) = declaration.initial.as_mut() {
                    self.visit_expression(initial)?;
                }
                self.declare(&declaration.name);
                Ok(())
            }
            StatementKind::ForIn(for_statement) => {
                self.visit_expression(&mut for_statement.collection)?;
                self.push(false);
                self.visit_parameter(&mut for_statement.variable)?;
                let result = self.visit_statement(&mut for_statement.body);
                self.pop();
                result
            }
            StatementKind::Try(try_statement) => {
                self.visit_statement(&mut try_statement.body)?;
                for catch in &mut try_statement.catches {
                    self.push(false);
                    self.visit_parameter(&mut catch.parameter)?;
                    let result = self.visit_statement(&mut catch.body);
                    self.pop();
                    result?;
                }
                if let Some(finally) = try_statement.finally.as_mut() {
                    self.visit_statement(finally)?;
                }
                Ok(())
            }
            _ => walk_statement(self, statement),
        }
    }

    fn visit_expression(&mut self, expression: &mut Expression) -> VisitorResult {
        match &mut expression.kind {
            ExpressionKind::Variable(variable) => {
                variable.binding = if self.lookup(&variable.name) {
                    VariableBinding::Local
                } else {
                    VariableBinding::DynamicProperty
                };
                Ok(())
            }
            ExpressionKind::MethodCall(call)
                if call.implicit_this && self.is_declared(&call.method) =>
            {
                let callee = Expression::new(
                    ExpressionKind::Variable(VariableExpression {
                        name: call.method.clone(),
                        binding: VariableBinding::Unresolved,
                    }),
                    expression.span.clone(),
                );
                *call = MethodCallExpression {
                    object: Box::new(callee),
                    method: "call".to_string(),
                    arguments: std::mem::take(&mut call.arguments),
                    safe: false,
                    implicit_this: false,
                };
                walk_expression(self, expression)
            }
            _ => walk_expression(self, expression),
        }
    }

    fn visit_closure(&mut self, closure: &mut ClosureExpression, _span: &Span) -> VisitorResult {
        self.push(true);
        if closure.parameters.is_none() {
            if let Some(scope) = self.scopes.last_mut() {
                scope.variables.insert("it".to_string(), IMPLICIT);
            }
        }
        let result = walk_closure(self, closure);
        let scope = self.pop();
        closure.captured = scope.captured.into_iter().collect();
        result
    }
}

/// Second pass: flags declarations found shared, by declaration ordinal
///
/// Declarations are met in the same order as in the scoping pass.
struct SharedMarker {
    next: usize,
    shared: HashSet<usize>,
}

impl SharedMarker {
    fn take(&mut self) -> bool {
        let ordinal = self.next;
        self.next += 1;
        self.shared.contains(&ordinal)
    }
}

impl Visitor for SharedMarker {
    fn visit_parameter(&mut self, parameter: &mut Parameter) -> VisitorResult {
        walk_parameter(self, parameter)?;
        if self.take() {
            parameter.closure_shared = true;
        }
        Ok(())
    }

    fn visit_statement(&mut self, statement: &mut Statement) -> VisitorResult {
        if let StatementKind::Declaration(declaration) = &mut statement.kind {
            if let Some(initial) = declaration.initial.as_mut() {
                self.visit_expression(initial)?;
            }
            if self.take() {
                declaration.closure_shared = true;
            }
            return Ok(());
        }
        walk_statement(self, statement)
    }
}
