//! Accessor methods for properties

use super::Verifier;
use crate::synthetic::*;
use grove_parser::{ClassNode, ClassType, MethodNode, Modifier, Modifiers, Parameter, Statement};

impl Verifier<'_> {
    /// `getX()`, `isX()` for booleans and `setX(value)` unless the property is final
    ///
    /// Hand-written accessors win over generated ones.
    pub(super) fn add_property_accessors(&mut self, class: &mut ClassNode) {
        let properties = class.properties.clone();
        for property in &properties {
            let is_static = property.modifiers.is_static();
            let storage = if is_static {
                static_field(&class.name, Some(self.id), &property.name)
            } else {
                this_field(&property.name)
            };
            let mut modifiers = Modifiers::of(&[Modifier::Public]);
            if is_static {
                modifiers.insert(Modifier::Static);
            }

            let mut getters = vec![property.getter_name()];
            if property.property_type.is_boolean() {
                getters.push(property.boolean_getter_name());
            }
            for getter in getters {
                if class.has_declared_method(&getter, 0) {
                    continue;
                }
                let mut method = MethodNode::new(
                    getter,
                    modifiers,
                    property.property_type.clone(),
                    Vec::new(),
                    Some(block(vec![ret(storage.clone())])),
                );
                method.span = property.span.clone();
                class.add_method(method.synthetic());
            }

            if property.modifiers.is_final() {
                continue;
            }
            let setter = property.setter_name();
            if class.has_declared_method(&setter, 1) {
                continue;
            }
            let mut method = MethodNode::new(
                setter,
                modifiers,
                ClassType::void(),
                vec![Parameter::new("value", property.property_type.clone())],
                Some(block(vec![
                    assign(storage, local("value")),
                    Statement::ret(None),
                ])),
            );
            method.span = property.span.clone();
            class.add_method(method.synthetic());
        }
    }
}
