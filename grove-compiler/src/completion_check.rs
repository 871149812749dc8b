//! Structural checks on verified classes
//!
//! A concrete class must implement every abstract method it inherits, may
//! not extend a final class or an interface, may not implement a class and
//! may not declare the same signature twice.

use crate::error::CompileResult;
use crate::operation::{ClassContext, PrimaryClassNodeOperation};
use crate::verifier::{declared_methods, supertypes, Problem};
use grove_parser::{ClassNode, ClassTable, MethodNode};
use std::collections::HashSet;

pub struct ClassCompletionOperation;

impl PrimaryClassNodeOperation for ClassCompletionOperation {
    fn name(&self) -> &str {
        "class completion check"
    }

    fn call(&mut self, ctx: &mut ClassContext<'_>) -> CompileResult<()> {
        for problem in check_class(ctx.class, &ctx.compile_unit.classes) {
            ctx.error(&problem.span, problem.message)?;
        }
        Ok(())
    }
}

pub fn check_class(class: &ClassNode, table: &ClassTable) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut report = |span: &grove_parser::Span, message: String| {
        problems.push(Problem {
            span: span.clone(),
            message,
        })
    };

    if let Some(super_class) = class.super_class.as_ref() {
        if let Some(id) = super_class.resolved {
            if table.is_interface(id) && !class.is_interface() {
                report(
                    &super_class.span,
                    format!(
                        "You are not allowed to extend the interface '{}', use implements instead.",
                        table.name_of(id)
                    ),
                );
            } else if table.modifiers(id).is_final() {
                report(
                    &super_class.span,
                    format!(
                        "You are not allowed to overwrite the final class '{}'.",
                        table.name_of(id)
                    ),
                );
            }
        }
    }
    for interface in &class.interfaces {
        let Some(id) = interface.resolved else {
            continue;
        };
        if table.kind(id).is_some() && !table.is_interface(id) {
            report(
                &interface.span,
                format!(
                    "You are not allowed to implement the class '{}', use extends instead.",
                    table.name_of(id)
                ),
            );
        }
    }

    let mut seen = HashSet::new();
    for method in class.constructors.iter().chain(class.methods.iter()) {
        let descriptor = method.type_descriptor();
        if !seen.insert(descriptor.clone()) {
            report(
                &method.span,
                format!(
                    "Repetitive method name/signature for method '{descriptor}' in class '{}'.",
                    class.name
                ),
            );
        }
    }

    if !class.is_abstract() {
        for (method, span) in unimplemented_methods(class, table) {
            report(
                &span,
                format!(
                    "Can't have an abstract method in a non-abstract class. The class '{}' must be declared abstract or the method '{method}' must be implemented.",
                    class.name
                ),
            );
        }
    }
    problems
}

/// Abstract methods inherited by `class` that nothing concrete implements
fn unimplemented_methods(class: &ClassNode, table: &ClassTable) -> Vec<(String, grove_parser::Span)> {
    let supertypes = supertypes(table, class);

    let concrete: Vec<(String, Vec<String>)> = class
        .methods
        .iter()
        .filter(|m| !m.is_abstract())
        .map(signature)
        .chain(supertypes.iter().flat_map(|supertype| {
            declared_methods(table, supertype.id)
                .into_iter()
                .filter(|m| !m.is_abstract)
                .map(|m| {
                    let parameters = m
                        .parameters
                        .iter()
                        .map(|p| p.substituted(&supertype.bindings).to_string())
                        .collect();
                    (m.name, parameters)
                })
                .collect::<Vec<_>>()
        }))
        .collect();

    let mut missing = Vec::new();
    let mut reported = HashSet::new();
    for supertype in &supertypes {
        for method in declared_methods(table, supertype.id) {
            if !method.is_abstract {
                continue;
            }
            let bound: Vec<String> = method
                .parameters
                .iter()
                .map(|p| p.substituted(&supertype.bindings).to_string())
                .collect();
            let erased: Vec<String> = method.parameters.iter().map(|p| p.erased().to_string()).collect();
            let implemented = concrete
                .iter()
                .any(|(name, parameters)| *name == method.name && (*parameters == bound || *parameters == erased));
            let descriptor = format!("{}({})", method.name, bound.join(", "));
            if !implemented && reported.insert(descriptor.clone()) {
                missing.push((descriptor, class.span.clone()));
            }
        }
    }
    missing
}

fn signature(method: &MethodNode) -> (String, Vec<String>) {
    (
        method.name.clone(),
        method
            .erased_parameter_types()
            .into_iter()
            .map(str::to_string)
            .collect(),
    )
}
