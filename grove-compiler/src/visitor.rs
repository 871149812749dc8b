//! Mutable traversal of class nodes
//!
//! Passes implement [`Visitor`] and override the nodes they care about; the
//! `walk_*` functions perform the default depth-first traversal so an
//! override can still descend by calling them.

use crate::error::CompileResult;
use grove_parser::{
    ClassNode, ClassType, ClosureExpression, Expression, ExpressionKind, FieldNode, MethodNode,
    Parameter, PropertyNode, Span, Statement, StatementKind,
};

pub type VisitorResult<T = ()> = CompileResult<T>;

pub trait Visitor: Sized {
    fn visit_class(&mut self, class: &mut ClassNode) -> VisitorResult {
        walk_class(self, class)
    }

    fn visit_field(&mut self, field: &mut FieldNode) -> VisitorResult {
        walk_field(self, field)
    }

    fn visit_property(&mut self, property: &mut PropertyNode) -> VisitorResult {
        self.visit_class_type(&mut property.property_type)
    }

    fn visit_method(&mut self, method: &mut MethodNode) -> VisitorResult {
        walk_method(self, method)
    }

    fn visit_parameter(&mut self, parameter: &mut Parameter) -> VisitorResult {
        walk_parameter(self, parameter)
    }

    fn visit_statement(&mut self, statement: &mut Statement) -> VisitorResult {
        walk_statement(self, statement)
    }

    fn visit_expression(&mut self, expression: &mut Expression) -> VisitorResult {
        walk_expression(self, expression)
    }

    fn visit_closure(&mut self, closure: &mut ClosureExpression, _span: &Span) -> VisitorResult {
        walk_closure(self, closure)
    }

    /// Leaf: a type mention anywhere in the class
    fn visit_class_type(&mut self, _class_type: &mut ClassType) -> VisitorResult {
        Ok(())
    }
}

pub fn walk_class<V: Visitor>(visitor: &mut V, class: &mut ClassNode) -> VisitorResult {
    if let Some(super_class) = class.super_class.as_mut() {
        visitor.visit_class_type(super_class)?;
    }
    for interface in &mut class.interfaces {
        visitor.visit_class_type(interface)?;
    }
    walk_class_body(visitor, class)
}

/// Everything in a class except its super class and interfaces
pub fn walk_class_body<V: Visitor>(visitor: &mut V, class: &mut ClassNode) -> VisitorResult {
    for generic in &mut class.generics {
        if let Some(bound) = generic.upper_bound.as_mut() {
            visitor.visit_class_type(bound)?;
        }
    }
    for field in &mut class.fields {
        visitor.visit_field(field)?;
    }
    for property in &mut class.properties {
        visitor.visit_property(property)?;
    }
    for constant in &mut class.enum_constants {
        for argument in &mut constant.arguments {
            visitor.visit_expression(argument)?;
        }
    }
    for statement in &mut class.static_init {
        visitor.visit_statement(statement)?;
    }
    for constructor in &mut class.constructors {
        visitor.visit_method(constructor)?;
    }
    for method in &mut class.methods {
        visitor.visit_method(method)?;
    }
    Ok(())
}

pub fn walk_field<V: Visitor>(visitor: &mut V, field: &mut FieldNode) -> VisitorResult {
    visitor.visit_class_type(&mut field.field_type)?;
    if let Some(initial) = field.initial_value.as_mut() {
        visitor.visit_expression(initial)?;
    }
    Ok(())
}

pub fn walk_method<V: Visitor>(visitor: &mut V, method: &mut MethodNode) -> VisitorResult {
    visitor.visit_class_type(&mut method.return_type)?;
    for parameter in &mut method.parameters {
        visitor.visit_parameter(parameter)?;
    }
    if let Some(body) = method.body.as_mut() {
        visitor.visit_statement(body)?;
    }
    Ok(())
}

pub fn walk_parameter<V: Visitor>(visitor: &mut V, parameter: &mut Parameter) -> VisitorResult {
    visitor.visit_class_type(&mut parameter.param_type)?;
    if let Some(initial) = parameter.initial_expression.as_mut() {
        visitor.visit_expression(initial)?;
    }
    Ok(())
}

pub fn walk_statement<V: Visitor>(visitor: &mut V, statement: &mut Statement) -> VisitorResult {
    match &mut statement.kind {
        StatementKind::Block(statements) => {
            for statement in statements {
                visitor.visit_statement(statement)?;
            }
        }
        StatementKind::Expression(expression) | StatementKind::Throw(expression) => {
            visitor.visit_expression(expression)?;
        }
        StatementKind::Declaration(declaration) => {
            visitor.visit_class_type(&mut declaration.declared_type)?;
            if let Some(initial) = declaration.initial.as_mut() {
                visitor.visit_expression(initial)?;
            }
        }
        StatementKind::If(if_statement) => {
            visitor.visit_expression(&mut if_statement.condition)?;
            visitor.visit_statement(&mut if_statement.then_branch)?;
            if let Some(else_branch) = if_statement.else_branch.as_mut() {
                visitor.visit_statement(else_branch)?;
            }
        }
        StatementKind::While(while_statement) => {
            visitor.visit_expression(&mut while_statement.condition)?;
            visitor.visit_statement(&mut while_statement.body)?;
        }
        StatementKind::ForIn(for_statement) => {
            visitor.visit_expression(&mut for_statement.collection)?;
            visitor.visit_parameter(&mut for_statement.variable)?;
            visitor.visit_statement(&mut for_statement.body)?;
        }
        StatementKind::Return(value) => {
            if let Some(value) = value.as_mut() {
                visitor.visit_expression(value)?;
            }
        }
        StatementKind::Try(try_statement) => {
            visitor.visit_statement(&mut try_statement.body)?;
            for catch in &mut try_statement.catches {
                visitor.visit_parameter(&mut catch.parameter)?;
                visitor.visit_statement(&mut catch.body)?;
            }
            if let Some(finally) = try_statement.finally.as_mut() {
                visitor.visit_statement(finally)?;
            }
        }
        StatementKind::Synchronized(synchronized) => {
            visitor.visit_expression(&mut synchronized.monitor)?;
            visitor.visit_statement(&mut synchronized.body)?;
        }
        StatementKind::Break | StatementKind::Continue | StatementKind::Empty => {}
    }
    Ok(())
}

pub fn walk_expression<V: Visitor>(visitor: &mut V, expression: &mut Expression) -> VisitorResult {
    match &mut expression.kind {
        ExpressionKind::Constant(_)
        | ExpressionKind::Variable(_)
        | ExpressionKind::This
        | ExpressionKind::Super => {}
        ExpressionKind::Class(class_type) => visitor.visit_class_type(class_type)?,
        ExpressionKind::GString(gstring) => {
            for value in &mut gstring.values {
                visitor.visit_expression(value)?;
            }
        }
        ExpressionKind::List(items) => {
            for item in items {
                visitor.visit_expression(item)?;
            }
        }
        ExpressionKind::Map(entries) => {
            for entry in entries {
                visitor.visit_expression(&mut entry.key)?;
                visitor.visit_expression(&mut entry.value)?;
            }
        }
        ExpressionKind::Property(property) => visitor.visit_expression(&mut property.object)?,
        ExpressionKind::Field(field) => visitor.visit_expression(&mut field.object)?,
        ExpressionKind::MethodCall(call) => {
            visitor.visit_expression(&mut call.object)?;
            for argument in &mut call.arguments {
                visitor.visit_expression(argument)?;
            }
        }
        ExpressionKind::ConstructorCall(call) => {
            visitor.visit_class_type(&mut call.class_type)?;
            for argument in &mut call.arguments {
                visitor.visit_expression(argument)?;
            }
        }
        ExpressionKind::Closure(closure) => {
            let span = expression.span.clone();
            visitor.visit_closure(closure, &span)?;
        }
        ExpressionKind::Binary(binary) => {
            visitor.visit_expression(&mut binary.left)?;
            visitor.visit_expression(&mut binary.right)?;
        }
        ExpressionKind::Unary(unary) => visitor.visit_expression(&mut unary.operand)?,
        ExpressionKind::Ternary(ternary) => {
            visitor.visit_expression(&mut ternary.condition)?;
            visitor.visit_expression(&mut ternary.then_branch)?;
            visitor.visit_expression(&mut ternary.else_branch)?;
        }
        ExpressionKind::Elvis(elvis) => {
            visitor.visit_expression(&mut elvis.value)?;
            visitor.visit_expression(&mut elvis.fallback)?;
        }
        ExpressionKind::Assignment(assignment) => {
            visitor.visit_expression(&mut assignment.target)?;
            visitor.visit_expression(&mut assignment.value)?;
        }
        ExpressionKind::Index(index) => {
            visitor.visit_expression(&mut index.object)?;
            visitor.visit_expression(&mut index.index)?;
        }
        ExpressionKind::InstanceOf(instance_of) => {
            visitor.visit_expression(&mut instance_of.expression)?;
            visitor.visit_class_type(&mut instance_of.class_type)?;
        }
        ExpressionKind::Cast(cast) => {
            visitor.visit_expression(&mut cast.expression)?;
            visitor.visit_class_type(&mut cast.class_type)?;
        }
    }
    Ok(())
}

pub fn walk_closure<V: Visitor>(visitor: &mut V, closure: &mut ClosureExpression) -> VisitorResult {
    if let Some(parameters) = closure.parameters.as_mut() {
        for parameter in parameters {
            visitor.visit_parameter(parameter)?;
        }
    }
    visitor.visit_statement(&mut closure.body)
}
