//! Overloads for parameters with default values
//!
//! A method with N defaulted parameters gets N extra overloads. The k-th
//! overload drops the k rightmost defaulted parameters and calls the full
//! method with their default expressions in place.

use super::Verifier;
use crate::synthetic::*;
use grove_parser::{ClassNode, ConstructorCallKind, Expression, MethodNode, Statement};

impl Verifier<'_> {
    pub(super) fn add_default_parameter_methods(&mut self, class: &mut ClassNode) {
        let self_type = self.self_type(class);
        let class_name = class.name.clone();

        let mut methods = std::mem::take(&mut class.methods);
        let mut generated = Vec::new();
        for method in &mut methods {
            if method.has_default_arguments() {
                for overload in overloads(method, |arguments| {
                    let call = if method.is_static() {
                        Expression::call(class_ref(&class_name, Some(self.id)), &method.name, arguments)
                    } else {
                        call_this(&method.name, arguments)
                    };
                    if method.is_void() {
                        vec![Statement::expression(call), Statement::ret(None)]
                    } else {
                        vec![ret(call)]
                    }
                }) {
                    generated.push((method.type_descriptor(), overload));
                }
                clear_defaults(method);
            }
        }
        class.methods = methods;
        for (original, overload) in generated {
            self.add_overload(class, original, overload, false);
        }

        let mut constructors = std::mem::take(&mut class.constructors);
        let mut generated = Vec::new();
        for constructor in &mut constructors {
            if constructor.has_default_arguments() {
                for overload in overloads(constructor, |arguments| {
                    vec![delegate_constructor(
                        ConstructorCallKind::This,
                        self_type.clone(),
                        arguments,
                    )]
                }) {
                    generated.push((constructor.type_descriptor(), overload));
                }
                clear_defaults(constructor);
            }
        }
        class.constructors = constructors;
        for (original, overload) in generated {
            self.add_overload(class, original, overload, true);
        }
    }

    fn add_overload(
        &mut self,
        class: &mut ClassNode,
        original: String,
        overload: MethodNode,
        constructor: bool,
    ) {
        let types = overload.erased_parameter_types();
        let existing = if constructor {
            &class.constructors
        } else {
            &class.methods
        };
        let clash = existing
            .iter()
            .any(|m| m.name == overload.name && m.erased_parameter_types() == types);
        if clash {
            let message = format!(
                "The method with default parameters \"{original}\" defines a method \"{}\" that is already defined.",
                overload.type_descriptor()
            );
            self.problem(&overload.span, message);
            return;
        }
        if constructor {
            class.add_constructor(overload);
        } else {
            class.add_method(overload);
        }
    }
}

/// Every overload of `method`, fewest dropped parameters first
fn overloads(
    method: &MethodNode,
    body: impl Fn(Vec<Expression>) -> Vec<Statement>,
) -> Vec<MethodNode> {
    let defaulted: Vec<usize> = method
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| p.initial_expression.is_some())
        .map(|(index, _)| index)
        .collect();

    (1..=defaulted.len())
        .map(|dropped| {
            let removed = &defaulted[defaulted.len() - dropped..];
            let mut parameters = Vec::new();
            let mut arguments = Vec::new();
            for (index, parameter) in method.parameters.iter().enumerate() {
                match parameter.initial_expression.as_ref() {
                    Some(default) if removed.contains(&index) => arguments.push(default.clone()),
                    _ => {
                        let mut kept = parameter.clone();
                        kept.initial_expression = None;
                        arguments.push(local(&kept.name));
                        parameters.push(kept);
                    }
                }
            }
            let statements = if method.is_abstract() {
                None
            } else {
                Some(block(body(arguments)))
            };
            let mut overload = MethodNode::new(
                method.name.clone(),
                method.modifiers,
                method.return_type.clone(),
                parameters,
                statements,
            );
            overload.span = method.span.clone();
            overload
        })
        .collect()
}

fn clear_defaults(method: &mut MethodNode) {
    for parameter in &mut method.parameters {
        parameter.initial_expression = None;
    }
}
