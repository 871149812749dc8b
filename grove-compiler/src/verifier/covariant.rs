//! Override checks and bridge methods
//!
//! Supertypes are walked with the generics arguments each one is given, so
//! `compareTo(T)` of `Comparable<Money>` is overridden by
//! `compareTo(Money)`. When the override's erased parameters differ from the
//! erased parameters of the overridden method a synthetic bridge with the
//! old signature forwards to it. A narrower return type alone gets no bridge,
//! since methods are looked up by name and arguments only.

use super::Verifier;
use crate::synthetic::*;
use grove_parser::names;
use grove_parser::{
    CastExpression, ClassId, ClassNode, ClassTable, ClassType, Expression, ExpressionKind,
    MethodNode, Modifier, Modifiers, Parameter, Span, Statement,
};
use std::collections::{HashMap, HashSet};

/// A method declared by some supertype, in that supertype's terms
#[derive(Debug, Clone)]
pub(crate) struct InheritedMethod {
    pub name: String,
    pub owner: String,
    pub parameters: Vec<TypeRef>,
    pub return_type: TypeRef,
    pub modifiers: Modifiers,
    pub is_abstract: bool,
}

/// A type as a supertype declares it, possibly one of its generics parameters
#[derive(Debug, Clone)]
pub(crate) struct TypeRef {
    pub name: String,
    pub type_variable: bool,
}

impl TypeRef {
    fn from_class_type(class_type: &ClassType) -> Self {
        Self {
            name: if class_type.type_variable {
                class_type.name.clone()
            } else {
                class_type.erasure_name().to_string()
            },
            type_variable: class_type.type_variable,
        }
    }

    /// Erasure as the declaring supertype sees it
    pub fn erased(&self) -> &str {
        if self.type_variable {
            names::OBJECT
        } else {
            &self.name
        }
    }

    /// Erasure once the supertype's generics parameters are bound
    pub fn substituted<'a>(&'a self, bindings: &'a HashMap<String, String>) -> &'a str {
        if self.type_variable {
            bindings.get(&self.name).map(String::as_str).unwrap_or(names::OBJECT)
        } else {
            &self.name
        }
    }
}

/// One supertype reached from the class, with its generics bindings
#[derive(Debug, Clone)]
pub(crate) struct Supertype {
    pub id: ClassId,
    pub bindings: HashMap<String, String>,
}

/// Every transitive supertype of a class, nearest first
pub(crate) fn supertypes(table: &ClassTable, class: &ClassNode) -> Vec<Supertype> {
    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut pending: Vec<(ClassType, HashMap<String, String>)> = class
        .super_class
        .iter()
        .chain(class.interfaces.iter())
        .map(|t| (t.clone(), HashMap::new()))
        .collect();
    pending.reverse();

    while let Some((mention, outer)) = pending.pop() {
        let Some(id) = mention
            .resolved
            .map(|id| table.redirect(id))
            .or_else(|| table.lookup_terminal(&mention.name))
        else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let parameters = generics_parameters(table, id);
        let bindings: HashMap<String, String> = parameters
            .iter()
            .zip(mention.generics.iter())
            .map(|(parameter, argument)| {
                let bound = if argument.type_variable {
                    outer
                        .get(&argument.name)
                        .cloned()
                        .unwrap_or_else(|| names::OBJECT.to_string())
                } else {
                    argument.erasure_name().to_string()
                };
                (parameter.clone(), bound)
            })
            .collect();

        let mut next = direct_supertype_mentions(table, id);
        next.reverse();
        for super_mention in next {
            pending.push((super_mention, bindings.clone()));
        }
        found.push(Supertype { id, bindings });
    }
    found
}

fn generics_parameters(table: &ClassTable, id: ClassId) -> Vec<String> {
    if let Some(node) = table.primary(id) {
        node.generics.iter().map(|g| g.name.clone()).collect()
    } else if let Some(external) = table.external(id) {
        external.generics.clone()
    } else {
        Vec::new()
    }
}

fn direct_supertype_mentions(table: &ClassTable, id: ClassId) -> Vec<ClassType> {
    if let Some(node) = table.primary(id) {
        node.super_class
            .iter()
            .chain(node.interfaces.iter())
            .cloned()
            .collect()
    } else if let Some(external) = table.external(id) {
        external
            .super_class
            .iter()
            .chain(external.interfaces.iter())
            .map(|name| resolved_type(name, table.lookup(name)))
            .collect()
    } else {
        Vec::new()
    }
}

/// Methods declared by one supertype
pub(crate) fn declared_methods(table: &ClassTable, id: ClassId) -> Vec<InheritedMethod> {
    if let Some(node) = table.primary(id) {
        node.methods
            .iter()
            .map(|m| InheritedMethod {
                name: m.name.clone(),
                owner: node.name.clone(),
                parameters: m
                    .parameters
                    .iter()
                    .map(|p| TypeRef::from_class_type(&p.param_type))
                    .collect(),
                return_type: TypeRef::from_class_type(&m.return_type),
                modifiers: m.modifiers,
                is_abstract: m.is_abstract(),
            })
            .collect()
    } else if let Some(external) = table.external(id) {
        let type_ref = |name: &String| TypeRef {
            name: name.clone(),
            type_variable: external.generics.contains(name),
        };
        external
            .methods
            .iter()
            .map(|m| InheritedMethod {
                name: m.name.clone(),
                owner: external.name.clone(),
                parameters: m.parameter_types.iter().map(type_ref).collect(),
                return_type: type_ref(&m.return_type),
                modifiers: m.modifiers,
                is_abstract: m.modifiers.is_abstract(),
            })
            .collect()
    } else {
        Vec::new()
    }
}

impl Verifier<'_> {
    pub(super) fn add_covariant_methods(&mut self, class: &mut ClassNode) {
        let supertypes = supertypes(self.table, class);
        let mut bridges: Vec<MethodNode> = Vec::new();
        let mut reported = HashSet::new();

        for method in &class.methods {
            if method.is_constructor()
                || method.bridge
                || method.modifiers.is_private()
                || method.name == names::STATIC_INIT
            {
                continue;
            }
            let own: Vec<&str> = method.erased_parameter_types();
            for supertype in &supertypes {
                for inherited in declared_methods(self.table, supertype.id) {
                    if inherited.name != method.name
                        || inherited.parameters.len() != method.parameters.len()
                        || inherited.modifiers.is_private()
                    {
                        continue;
                    }
                    let bound: Vec<&str> = inherited
                        .parameters
                        .iter()
                        .map(|p| p.substituted(&supertype.bindings))
                        .collect();
                    if bound != own {
                        continue;
                    }
                    let key = (inherited.owner.clone(), method.type_descriptor());
                    if !reported.insert(key) {
                        continue;
                    }
                    if let Some(message) = self.override_problem(class, method, &inherited, supertype) {
                        self.problem(&method.span, message);
                        continue;
                    }

                    let erased: Vec<&str> = inherited.parameters.iter().map(TypeRef::erased).collect();
                    let exists = class.declared_method(&method.name, &erased).is_some()
                        || bridges.iter().any(|b| {
                            b.name == method.name && b.erased_parameter_types() == erased
                        });
                    if erased != own && !exists && !method.is_static() {
                        bridges.push(self.bridge(method, &inherited));
                    }
                }
            }
        }
        for bridge in bridges {
            class.add_method(bridge);
        }
    }

    fn override_problem(
        &self,
        class: &ClassNode,
        method: &MethodNode,
        inherited: &InheritedMethod,
        supertype: &Supertype,
    ) -> Option<String> {
        let parameters = method.erased_parameter_types().join(", ");
        if inherited.modifiers.is_final() {
            return Some(format!(
                "You are not allowed to override the final method {}({parameters}) from class '{}'.",
                method.name, inherited.owner
            ));
        }
        match (method.is_static(), inherited.modifiers.is_static()) {
            (true, false) => {
                return Some(format!(
                    "The method '{}' is static and cannot override the instance method of '{}'.",
                    method.type_descriptor(),
                    inherited.owner
                ))
            }
            (false, true) => {
                return Some(format!(
                    "The method '{}' is an instance method and cannot override the static method of '{}'.",
                    method.type_descriptor(),
                    inherited.owner
                ))
            }
            _ => {}
        }
        let expected = inherited.return_type.substituted(&supertype.bindings);
        if !self.return_compatible(&method.return_type, expected) {
            return Some(format!(
                "The return type of {} {} in {} is incompatible with {expected} in {}",
                method.return_type.erasure_name(),
                method.type_descriptor(),
                class.name,
                inherited.owner
            ));
        }
        None
    }

    /// True when `actual` may stand in for a method declared to return `expected`
    fn return_compatible(&self, actual: &ClassType, expected: &str) -> bool {
        let actual_name = actual.erasure_name();
        if actual_name == expected {
            return true;
        }
        if actual.is_void() || expected == names::VOID {
            return false;
        }
        if expected == names::OBJECT || expected == names::DYNAMIC {
            return true;
        }
        let (Some(from), Some(to)) = (
            self.table.lookup_terminal(boxed(actual_name)),
            self.table.lookup_terminal(boxed(expected)),
        ) else {
            // nothing known about one side, leave it to the runtime
            return true;
        };
        self.table.is_assignable(from, to)
    }

    /// `name(Object p0)` forwarding to `name((Money) p0)`
    fn bridge(&self, target: &MethodNode, inherited: &InheritedMethod) -> MethodNode {
        let mut parameters = Vec::new();
        let mut arguments = Vec::new();
        for (index, (declared, overriding)) in inherited
            .parameters
            .iter()
            .zip(target.parameters.iter())
            .enumerate()
        {
            let name = format!("p{index}");
            let erased = declared.erased();
            parameters.push(Parameter::new(
                name.clone(),
                resolved_type(erased, self.table.lookup(erased)),
            ));
            let argument = if erased == overriding.param_type.erasure_name() {
                local(&name)
            } else {
                Expression::new(
                    ExpressionKind::Cast(CastExpression {
                        expression: Box::new(local(&name)),
                        class_type: overriding.param_type.clone(),
                    }),
                    Span::default(),
                )
            };
            arguments.push(argument);
        }
        let call = call_this(&target.name, arguments);
        let return_name = inherited.return_type.erased();
        let return_type = resolved_type(return_name, self.table.lookup(return_name));
        let body = if return_type.is_void() {
            vec![Statement::expression(call), Statement::ret(None)]
        } else {
            vec![ret(call)]
        };
        let mut bridge = MethodNode::new(
            target.name.clone(),
            Modifiers::of(&[Modifier::Public]),
            return_type,
            parameters,
            Some(block(body)),
        )
        .synthetic();
        bridge.bridge = true;
        bridge.span = target.span.clone();
        bridge
    }
}

/// Wrapper class used when comparing a primitive against a class type
fn boxed(name: &str) -> &str {
    match name {
        names::INT => names::INTEGER,
        names::PRIMITIVE_BOOLEAN => names::BOOLEAN,
        names::DOUBLE => names::FLOAT,
        other => other,
    }
}
