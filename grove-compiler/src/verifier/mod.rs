//! Verifier: completes a class with everything the source leaves implicit
//!
//! Runs once per primary class at the start of class generation, supertypes
//! before subtypes. Every step checks what is already there, so verifying a
//! class twice changes nothing the second time.

mod covariant;
mod default_args;
mod initializers;
mod properties;
mod return_adder;

pub use return_adder::{add_value_return, guarantees_return};
pub(crate) use covariant::{declared_methods, supertypes};

use crate::classpath;
use crate::error::CompileResult;
use crate::operation::{ClassContext, PrimaryClassNodeOperation};
use crate::synthetic::*;
use grove_parser::names;
use grove_parser::{
    BinaryExpression, BinaryOperator, ClassId, ClassNode, ClassTable, ClassType, Expression,
    ExpressionKind, FieldNode, IfStatement, MethodNode, Modifier, Modifiers, Parameter, Span,
    Statement, StatementKind,
};

pub const STATIC_CLASS_INFO_FIELD: &str = "$staticClassInfo";
pub const STATIC_META_CLASS_METHOD: &str = "$getStaticMetaClass";
pub const META_CLASS_FIELD: &str = "metaClass";

/// A problem found while verifying, reported by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    pub span: Span,
    pub message: String,
}

pub struct VerifierOperation;

impl PrimaryClassNodeOperation for VerifierOperation {
    fn name(&self) -> &str {
        "verifier"
    }

    fn call(&mut self, ctx: &mut ClassContext<'_>) -> CompileResult<()> {
        let problems = verify_class(ctx.class, ctx.id, &ctx.compile_unit.classes);
        tracing::trace!(class = %ctx.class.name, problems = problems.len(), "verified");
        for problem in problems {
            ctx.error(&problem.span, problem.message)?;
        }
        Ok(())
    }
}

/// Completes `class`, which is detached from `table` under slot `id`
pub fn verify_class(class: &mut ClassNode, id: ClassId, table: &ClassTable) -> Vec<Problem> {
    let mut verifier = Verifier {
        table,
        id,
        problems: Vec::new(),
    };
    verifier.verify(class);
    verifier.problems
}

pub(crate) struct Verifier<'a> {
    table: &'a ClassTable,
    id: ClassId,
    problems: Vec<Problem>,
}

impl Verifier<'_> {
    fn verify(&mut self, class: &mut ClassNode) {
        self.add_default_parameter_methods(class);
        if !class.is_interface() {
            self.add_grove_object_plumbing(class);
            add_default_constructor(class);
        }
        self.add_property_accessors(class);
        self.add_initialization(class);
        for method in &mut class.methods {
            return_adder::add_returns(method);
        }
        self.add_covariant_methods(class);
    }

    fn problem(&mut self, span: &Span, message: impl Into<String>) {
        self.problems.push(Problem {
            span: span.clone(),
            message: message.into(),
        });
    }

    fn self_type(&self, class: &ClassNode) -> ClassType {
        resolved_type(&class.name, Some(self.id))
    }

    fn known(&self, name: &str) -> ClassType {
        known_type(self.table, name)
    }

    /// `InvokerHelper.name(args)`
    fn invoker_call(&self, name: &str, arguments: Vec<Expression>) -> Expression {
        let helper = class_ref(classpath::INVOKER_HELPER, self.table.lookup(classpath::INVOKER_HELPER));
        Expression::call(helper, name, arguments)
    }

    /// Concrete method `name` with `arity` parameters in the class or a supertype
    fn has_concrete_method(&self, class: &ClassNode, name: &str, arity: usize) -> bool {
        if class
            .methods_named(name)
            .any(|m| m.parameters.len() == arity && !m.is_abstract())
        {
            return true;
        }
        let mut pending = self.direct_supertypes(class);
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = pending.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.table.primary(id) {
                if node
                    .methods_named(name)
                    .any(|m| m.parameters.len() == arity && !m.is_abstract())
                {
                    return true;
                }
            } else if let Some(external) = self.table.external(id) {
                if external.methods.iter().any(|m| {
                    m.name == name
                        && m.parameter_types.len() == arity
                        && !m.modifiers.is_abstract()
                }) {
                    return true;
                }
            }
            pending.extend(self.table.direct_supertypes(id));
        }
        false
    }

    /// Supertypes from the class's own (detached) header
    fn direct_supertypes(&self, class: &ClassNode) -> Vec<ClassId> {
        class
            .super_class
            .iter()
            .chain(class.interfaces.iter())
            .filter_map(|t| {
                t.resolved
                    .map(|id| self.table.redirect(id))
                    .or_else(|| self.table.lookup_terminal(&t.name))
            })
            .collect()
    }

    fn derives_from_grove_object(&self, class: &ClassNode) -> bool {
        let Some(grove_object) = self.table.lookup_terminal(names::GROVE_OBJECT) else {
            return false;
        };
        self.direct_supertypes(class)
            .into_iter()
            .any(|id| self.table.is_assignable(id, grove_object))
    }

    /// GroveObject interface, the static meta class cache, the `metaClass`
    /// field and the trampolines into `InvokerHelper`
    fn add_grove_object_plumbing(&mut self, class: &mut ClassNode) {
        if !self.derives_from_grove_object(class) {
            class.add_interface(self.known(names::GROVE_OBJECT));
        }

        if class.field(STATIC_CLASS_INFO_FIELD).is_none() {
            let mut field = FieldNode::new(
                STATIC_CLASS_INFO_FIELD,
                Modifiers::of(&[Modifier::Private, Modifier::Static]),
                ClassType::object(),
            );
            field.synthetic = true;
            class.add_field(field);
        }

        if !class.has_declared_method(STATIC_META_CLASS_METHOD, 0) {
            // if (E.@$staticClassInfo == null) E.@$staticClassInfo = InvokerHelper.getClassInfo(E)
            // return InvokerHelper.getStaticMetaClass(E.@$staticClassInfo)
            let info = static_field(&class.name, Some(self.id), STATIC_CLASS_INFO_FIELD);
            let missing = Expression::new(
                ExpressionKind::Binary(BinaryExpression {
                    left: Box::new(info.clone()),
                    operator: BinaryOperator::Equal,
                    right: Box::new(Expression::null()),
                }),
                Span::default(),
            );
            let lookup = self.invoker_call("getClassInfo", vec![class_ref(&class.name, Some(self.id))]);
            let fill = Statement::new(
                StatementKind::If(IfStatement {
                    condition: missing,
                    then_branch: Box::new(assign(info.clone(), lookup)),
                    else_branch: None,
                }),
                Span::default(),
            );
            let body = block(vec![fill, ret(self.invoker_call("getStaticMetaClass", vec![info]))]);
            let method = MethodNode::new(
                STATIC_META_CLASS_METHOD,
                Modifiers::of(&[Modifier::Protected]),
                self.known(names::META_CLASS),
                Vec::new(),
                Some(body),
            );
            class.add_method(method.synthetic());
        }

        if class.field(META_CLASS_FIELD).is_none() {
            let mut field = FieldNode::new(
                META_CLASS_FIELD,
                Modifiers::of(&[Modifier::Private, Modifier::Transient]),
                self.known(names::META_CLASS),
            );
            field.synthetic = true;
            class.add_field(field);
        }

        let string = self.known(names::STRING);
        let meta_class = self.known(names::META_CLASS);
        let this = || Expression::this(Span::default());
        let trampolines = [
            ("getMetaClass", Vec::new(), meta_class.clone()),
            (
                "setMetaClass",
                vec![Parameter::new("metaClass", meta_class)],
                ClassType::void(),
            ),
            (
                "invokeMethod",
                vec![
                    Parameter::new("name", string.clone()),
                    Parameter::new("args", ClassType::object()),
                ],
                ClassType::object(),
            ),
            (
                "getProperty",
                vec![Parameter::new("name", string.clone())],
                ClassType::object(),
            ),
            (
                "setProperty",
                vec![
                    Parameter::new("name", string),
                    Parameter::new("value", ClassType::object()),
                ],
                ClassType::void(),
            ),
        ];
        for (name, parameters, return_type) in trampolines {
            if self.has_concrete_method(class, name, parameters.len()) {
                continue;
            }
            let mut arguments = vec![this()];
            arguments.extend(parameters.iter().map(|p| local(&p.name)));
            let call = self.invoker_call(name, arguments);
            let body = if return_type.is_void() {
                block(vec![Statement::expression(call), Statement::ret(None)])
            } else {
                block(vec![ret(call)])
            };
            let method = MethodNode::new(
                name,
                Modifiers::of(&[Modifier::Public]),
                return_type,
                parameters,
                Some(body),
            );
            class.add_method(method.synthetic());
        }
    }
}

/// Public no-argument constructor for a class that declares none
fn add_default_constructor(class: &mut ClassNode) {
    if class.constructors.is_empty() {
        let constructor = MethodNode::constructor(
            Modifiers::of(&[Modifier::Public]),
            Vec::new(),
            block(Vec::new()),
        );
        class.add_constructor(constructor.synthetic());
    }
}
