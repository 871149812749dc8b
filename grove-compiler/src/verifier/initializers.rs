//! Field initializers and the static initializer
//!
//! Instance initializers run in every constructor that does not delegate to
//! `this(...)`, right after the `super(...)` call. Static initializers are
//! appended to the class's static statements, which for enums already start
//! with the constants, and the whole list becomes `<clinit>`.

use super::Verifier;
use crate::synthetic::*;
use grove_parser::names;
use grove_parser::{
    ClassNode, ClassType, ConstructorCallKind, MethodNode, Modifier, Modifiers, Statement,
};

impl Verifier<'_> {
    pub(super) fn add_initialization(&mut self, class: &mut ClassNode) {
        let mut instance_init = Vec::new();
        let mut static_init = Vec::new();
        for field in &mut class.fields {
            let Some(value) = field.initial_value.take() else {
                continue;
            };
            if field.is_static() {
                static_init.push(assign(
                    static_field(&class.name, Some(self.id), &field.name),
                    value,
                ));
            } else {
                instance_init.push(assign(this_field(&field.name), value));
            }
        }

        let super_type = class.super_class.clone().unwrap_or_else(ClassType::object);
        for constructor in &mut class.constructors {
            let body = constructor.body.get_or_insert_with(|| block(Vec::new()));
            let statements = body.statements_mut();
            match leading_constructor_call(statements) {
                Some(ConstructorCallKind::This) => continue,
                Some(_) => {}
                None => statements.insert(
                    0,
                    delegate_constructor(ConstructorCallKind::Super, super_type.clone(), Vec::new()),
                ),
            }
            let tail = statements.split_off(1);
            statements.extend(instance_init.iter().cloned());
            statements.extend(tail);
        }

        class.static_init.append(&mut static_init);
        if class.static_init.is_empty() {
            return;
        }
        let statements = std::mem::take(&mut class.static_init);
        match class
            .methods
            .iter_mut()
            .find(|m| m.name == names::STATIC_INIT)
            .and_then(|m| m.body.as_mut())
        {
            Some(body) => {
                let existing = body.statements_mut();
                let mut combined = statements;
                combined.append(existing);
                *existing = combined;
            }
            None => {
                let mut body = statements;
                body.push(Statement::ret(None));
                let clinit = MethodNode::new(
                    names::STATIC_INIT,
                    Modifiers::of(&[Modifier::Static]),
                    ClassType::void(),
                    Vec::new(),
                    Some(block(body)),
                );
                class.add_method(clinit.synthetic());
            }
        }
    }
}
