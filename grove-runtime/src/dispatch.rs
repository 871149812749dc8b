//! Dynamic dispatch
//!
//! Resolution turns a call (site kind, name, receiver, arguments) into a
//! [`Resolution`] a call site can cache. Calls that only the dynamic
//! fallbacks can answer (map keys, script bindings, closures held in
//! properties, `methodMissing`, `propertyMissing`, expando assignment)
//! resolve to `None` and run through [`Runtime::fallback`] every time.

use crate::category;
use crate::class::ClassRef;
use crate::error::{RuntimeError, RuntimeResult};
use crate::interpreter;
use crate::meta::{Extensions, MetaClassHandle, MetaMethod, MetaMethodKind, MetaProperty};
use crate::object::Instance;
use crate::runtime::Runtime;
use crate::selection::{argument_classes, coerce_arguments, parameter_fit, select, Selected};
use crate::value::{read, write, Closure, MapKey, MapRef, Value};
use grove_compiler::bytecode::CallSiteKind;
use grove_parser::names;
use std::sync::Arc;

/// What a cached resolution was made for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    receiver: usize,
    static_call: bool,
    meta_version: u64,
    arguments: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Get,
    Set,
    /// Write from the declaring class's own code, final fields included
    SetOwn,
}

#[derive(Debug, Clone)]
pub enum Target {
    Method(MetaMethod),
    /// Allocates an instance and runs the constructor on it
    Constructor { class: ClassRef, method: MetaMethod },
    /// `super(...)` or `this(...)` on an instance under construction
    Initializer(MetaMethod),
    Property { property: MetaProperty, access: Access },
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub target: Target,
    pub coerce: bool,
}

impl Resolution {
    fn method(selected: Selected) -> Self {
        Self {
            target: Target::Method(selected.method),
            coerce: selected.coerce,
        }
    }

    fn property(property: &MetaProperty, access: Access) -> Self {
        Self {
            target: Target::Property {
                property: property.clone(),
                access,
            },
            coerce: false,
        }
    }
}

impl Runtime {
    /// Resolves and invokes without any caching
    pub(crate) fn dispatch(
        &self,
        kind: CallSiteKind,
        owner: &str,
        name: &str,
        receiver: Value,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        if kind.is_safe() && receiver.is_null() {
            return Ok(Value::Null);
        }
        match self.resolve(kind, owner, name, &receiver, &arguments)? {
            Some(resolution) => self.invoke(&resolution, receiver, arguments),
            None => self.fallback(kind, name, receiver, arguments),
        }
    }

    pub(crate) fn shape(
        &self,
        kind: CallSiteKind,
        name: &str,
        receiver: &Value,
        arguments: &[Value],
    ) -> RuntimeResult<Shape> {
        let (receiver, static_call, meta_version) = match (kind, receiver) {
            (CallSiteKind::Constructor | CallSiteKind::SuperInit | CallSiteKind::ThisInit, _) => {
                let class = self.load_class(name)?;
                (class_identity(&class), false, self.meta_class(&class).version())
            }
            (_, Value::Class(class)) => (class_identity(class), true, self.meta_class(class).version()),
            (_, other) => (
                self.class_identity_of(other),
                false,
                self.meta_class_of(other).version(),
            ),
        };
        Ok(Shape {
            receiver,
            static_call,
            meta_version,
            arguments: arguments.iter().map(|a| self.class_identity_of(a)).collect(),
        })
    }

    fn class_identity_of(&self, value: &Value) -> usize {
        match value {
            Value::Null => 0,
            other => class_identity(&self.class_of(other)),
        }
    }

    pub(crate) fn resolve(
        &self,
        kind: CallSiteKind,
        owner: &str,
        name: &str,
        receiver: &Value,
        arguments: &[Value],
    ) -> RuntimeResult<Option<Resolution>> {
        match kind {
            CallSiteKind::Method | CallSiteKind::SafeMethod => {
                self.resolve_method(receiver, name, arguments)
            }
            CallSiteKind::SuperMethod => self.resolve_super_method(owner, name, arguments),
            CallSiteKind::Constructor => {
                let class = self.load_class(name)?;
                self.resolve_constructor(&class, arguments, true).map(Some)
            }
            CallSiteKind::SuperInit | CallSiteKind::ThisInit => {
                let class = self.load_class(name)?;
                self.resolve_constructor(&class, arguments, false).map(Some)
            }
            CallSiteKind::GetProperty | CallSiteKind::SafeGetProperty => {
                Ok(self.resolve_property(receiver, name, Access::Get, owner))
            }
            CallSiteKind::SetProperty => Ok(self.resolve_property(receiver, name, Access::Set, owner)),
        }
    }

    fn resolve_method(
        &self,
        receiver: &Value,
        name: &str,
        arguments: &[Value],
    ) -> RuntimeResult<Option<Resolution>> {
        // doCall needs the closure's own frame layout
        if receiver.is_null() || (matches!(receiver, Value::Closure(_)) && name == interpreter::DO_CALL) {
            return Ok(None);
        }
        if category::is_active() {
            if let Some(resolution) = self.resolve_category_method(receiver, name, arguments)? {
                return Ok(Some(resolution));
            }
        }
        if let Value::Class(class) = receiver {
            let meta = self.meta_class(class);
            let statics: Vec<MetaMethod> = meta
                .methods(name)
                .iter()
                .filter(|m| m.is_static)
                .cloned()
                .collect();
            if let Some(selected) = select(self, &class.name, name, &statics, arguments)? {
                return Ok(Some(Resolution::method(selected)));
            }
        }
        let meta = self.meta_class_of(receiver);
        let selected = select(self, &meta.class().name, name, meta.methods(name), arguments)?;
        Ok(selected.map(Resolution::method))
    }

    /// Innermost active category with a matching method wins
    fn resolve_category_method(
        &self,
        receiver: &Value,
        name: &str,
        arguments: &[Value],
    ) -> RuntimeResult<Option<Resolution>> {
        for methods in category::methods_named(name) {
            let applicable: Vec<MetaMethod> = methods
                .into_iter()
                .filter(|method| match &method.kind {
                    MetaMethodKind::Category { self_type, .. } => {
                        parameter_fit(self, self_type, receiver).is_some()
                    }
                    _ => false,
                })
                .collect();
            let class = receiver.class_name();
            if let Some(selected) = select(self, &class, name, &applicable, arguments)? {
                return Ok(Some(Resolution::method(selected)));
            }
        }
        Ok(None)
    }

    fn resolve_super_method(
        &self,
        owner: &str,
        name: &str,
        arguments: &[Value],
    ) -> RuntimeResult<Option<Resolution>> {
        let owner = self.load_class(owner)?;
        let Some(parent) = owner.super_class.clone() else {
            return Ok(None);
        };
        let meta = self.meta_class(&parent);
        let selected = select(self, &parent.name, name, meta.methods(name), arguments)?;
        Ok(selected.map(Resolution::method))
    }

    fn resolve_constructor(
        &self,
        class: &ClassRef,
        arguments: &[Value],
        instantiate: bool,
    ) -> RuntimeResult<Resolution> {
        if instantiate && class.is_abstract() {
            return Err(RuntimeError::illegal_state(format!(
                "Cannot instantiate abstract class {}",
                class.name
            )));
        }
        let meta = self.meta_class(class);
        let selected = select(self, &class.name, names::CONSTRUCTOR, meta.constructors(), arguments)?
            .ok_or_else(|| RuntimeError::MissingConstructor {
                class: class.name.clone(),
                arguments: argument_classes(arguments),
            })?;
        let target = if instantiate {
            Target::Constructor {
                class: Arc::clone(class),
                method: selected.method,
            }
        } else {
            Target::Initializer(selected.method)
        };
        Ok(Resolution {
            target,
            coerce: selected.coerce,
        })
    }

    fn resolve_property(
        &self,
        receiver: &Value,
        name: &str,
        access: Access,
        owner: &str,
    ) -> Option<Resolution> {
        let meta = match receiver {
            Value::Null | Value::Map(_) => return None,
            Value::Class(class) => {
                let meta = self.meta_class(class);
                if let Some(property) = meta
                    .property(name)
                    .filter(|p| p.is_static() && usable(p, access))
                {
                    return Some(Resolution::property(property, own_access(property, access, owner)));
                }
                self.meta_class_of(receiver)
            }
            other => self.meta_class_of(other),
        };
        let property = meta.property(name).filter(|p| usable(p, access))?;
        Some(Resolution::property(property, own_access(property, access, owner)))
    }

    pub(crate) fn invoke(
        &self,
        resolution: &Resolution,
        receiver: Value,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let prepare = |method: &MetaMethod, arguments: Vec<Value>| {
            if resolution.coerce {
                coerce_arguments(method, arguments)
            } else {
                arguments
            }
        };
        match &resolution.target {
            Target::Method(method) => {
                self.invoke_meta_method(method, receiver, prepare(method, arguments))
            }
            Target::Constructor { class, method } => {
                self.construct(class, method, prepare(method, arguments))
            }
            Target::Initializer(method) => {
                self.invoke_meta_method(method, receiver, prepare(method, arguments))?;
                Ok(Value::Null)
            }
            Target::Property {
                property,
                access: Access::Get,
            } => self.read_property(property, &receiver),
            Target::Property { property, access } => {
                let value = arguments.into_iter().next().unwrap_or_default();
                self.write_property(property, &receiver, value.clone(), *access)?;
                Ok(value)
            }
        }
    }

    pub(crate) fn invoke_meta_method(
        &self,
        method: &MetaMethod,
        receiver: Value,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let receiver = if method.is_static {
            self.ensure_initialized(&method.declaring_class)?;
            Value::Class(Arc::clone(&method.declaring_class))
        } else {
            receiver
        };
        match &method.kind {
            MetaMethodKind::Compiled(index) => {
                interpreter::execute(self, &method.declaring_class, *index, receiver, arguments)
            }
            MetaMethodKind::Native(function) => function(self, &receiver, &arguments),
            MetaMethodKind::Closure(closure) => self.call_closure_as(closure, receiver, arguments),
            MetaMethodKind::Mixin { mixin, target } => {
                let Value::Object(owner) = &receiver else {
                    return Err(RuntimeError::illegal_state(format!(
                        "Mixin method {} needs an object receiver, got {}",
                        method.name,
                        receiver.class_name()
                    )));
                };
                let instance = self.mixins().instance_for(owner, mixin, || {
                    let created = self.instantiate(mixin, Vec::new())?;
                    created.as_object().cloned().ok_or_else(|| {
                        RuntimeError::illegal_state(format!("{} is not an object class", mixin.name))
                    })
                })?;
                self.invoke_meta_method(target, Value::Object(instance), arguments)
            }
            MetaMethodKind::Category { target, .. } => {
                let mut full = Vec::with_capacity(arguments.len() + 1);
                full.push(receiver);
                full.extend(arguments);
                self.invoke_meta_method(target, Value::Null, full)
            }
        }
    }

    /// `new Class(arguments)` without a call site
    pub(crate) fn instantiate(&self, class: &ClassRef, arguments: Vec<Value>) -> RuntimeResult<Value> {
        let resolution = self.resolve_constructor(class, &arguments, true)?;
        self.invoke(&resolution, Value::Null, arguments)
    }

    fn construct(&self, class: &ClassRef, method: &MetaMethod, arguments: Vec<Value>) -> RuntimeResult<Value> {
        self.ensure_initialized(class)?;
        if class.is_value_backed() {
            return self.invoke_meta_method(method, Value::Null, arguments);
        }
        let instance = Value::Object(Instance::new(Arc::clone(class), class.field_defaults()));
        self.invoke_meta_method(method, instance.clone(), arguments)?;
        Ok(instance)
    }

    pub(crate) fn read_property(&self, property: &MetaProperty, receiver: &Value) -> RuntimeResult<Value> {
        if let Some(getter) = &property.getter {
            return self.invoke_meta_method(getter, receiver.clone(), Vec::new());
        }
        match (&property.field, receiver) {
            (Some(slot), _) if slot.is_static => {
                self.ensure_initialized(&slot.owner)?;
                Ok(slot.owner.static_value(&property.name).unwrap_or_default())
            }
            (Some(_), Value::Object(object)) => Ok(object.field(&property.name)),
            _ => Err(RuntimeError::missing_property(
                &self.receiver_class_name(receiver),
                &property.name,
            )),
        }
    }

    fn write_property(
        &self,
        property: &MetaProperty,
        receiver: &Value,
        value: Value,
        access: Access,
    ) -> RuntimeResult<()> {
        if let Some(setter) = &property.setter {
            let arguments = coerce_arguments(setter, vec![value]);
            self.invoke_meta_method(setter, receiver.clone(), arguments)?;
            return Ok(());
        }
        let read_only = || RuntimeError::ReadOnlyProperty {
            class: self.receiver_class_name(receiver),
            property: property.name.clone(),
        };
        match (&property.field, receiver) {
            (Some(slot), _) if slot.is_final && access != Access::SetOwn => Err(read_only()),
            (Some(slot), _) if slot.is_static => {
                self.ensure_initialized(&slot.owner)?;
                slot.owner.set_static(&property.name, value);
                Ok(())
            }
            (Some(_), Value::Object(object)) => {
                object.set_field(&property.name, value);
                Ok(())
            }
            _ => Err(read_only()),
        }
    }

    /// What happens when no method or property matched
    pub(crate) fn fallback(
        &self,
        kind: CallSiteKind,
        name: &str,
        receiver: Value,
        arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        match kind {
            CallSiteKind::GetProperty | CallSiteKind::SafeGetProperty => {
                self.missing_property_get(name, receiver)
            }
            CallSiteKind::SetProperty => {
                let value = arguments.into_iter().next().unwrap_or_default();
                self.missing_property_set(name, receiver, value.clone())?;
                Ok(value)
            }
            _ => self.missing_method(name, receiver, arguments),
        }
    }

    fn missing_method(&self, name: &str, receiver: Value, arguments: Vec<Value>) -> RuntimeResult<Value> {
        if receiver.is_null() {
            return null_method(name, &arguments);
        }
        if let (Value::Closure(closure), interpreter::DO_CALL) = (&receiver, name) {
            return self.call_closure(closure, arguments);
        }

        if let Some(Value::Closure(closure)) = self.property_value(&receiver, name)? {
            return self.call_closure(&closure, arguments);
        }

        let meta = self.meta_class_of(&receiver);
        if let Some(hook) = meta.methods("methodMissing").iter().find(|m| m.arity() == 2) {
            let hook = hook.clone();
            return self.invoke_meta_method(
                &hook,
                receiver,
                vec![Value::string(name), Value::list(arguments)],
            );
        }
        Err(RuntimeError::missing_method(
            &self.receiver_class_name(&receiver),
            name,
            argument_classes(&arguments),
        ))
    }

    /// Value a property read would produce, short of the missing hooks
    fn property_value(&self, receiver: &Value, name: &str) -> RuntimeResult<Option<Value>> {
        if let Value::Map(map) = receiver {
            return Ok(read(map).get(&MapKey::string(name)).cloned());
        }
        if let Some(resolution) = self.resolve_property(receiver, name, Access::Get, "") {
            return self.invoke(&resolution, receiver.clone(), Vec::new()).map(Some);
        }
        Ok(self
            .binding_of(receiver)
            .and_then(|binding| read(&binding).get(&MapKey::string(name)).cloned()))
    }

    fn missing_property_get(&self, name: &str, receiver: Value) -> RuntimeResult<Value> {
        match &receiver {
            Value::Null => {
                return Err(RuntimeError::null_pointer(format!(
                    "Cannot get property '{name}' on null object"
                )));
            }
            Value::Map(map) => return Ok(read(map).get(&MapKey::string(name)).cloned().unwrap_or_default()),
            _ => {}
        }
        if let Some(binding) = self.binding_of(&receiver) {
            if let Some(value) = read(&binding).get(&MapKey::string(name)).cloned() {
                return Ok(value);
            }
        }
        let meta = self.meta_class_of(&receiver);
        if let Some(hook) = meta.methods("propertyMissing").iter().find(|m| m.arity() == 1) {
            let hook = hook.clone();
            return self.invoke_meta_method(&hook, receiver, vec![Value::string(name)]);
        }
        Err(RuntimeError::missing_property(&self.receiver_class_name(&receiver), name))
    }

    fn missing_property_set(&self, name: &str, receiver: Value, value: Value) -> RuntimeResult<()> {
        match &receiver {
            Value::Null => {
                return Err(RuntimeError::null_pointer(format!(
                    "Cannot set property '{name}' on null object"
                )));
            }
            Value::Map(map) => {
                write(map).insert(MapKey::string(name), value);
                return Ok(());
            }
            Value::MetaClass(handle) => return self.add_expando(handle, name, value),
            _ => {}
        }
        if let Some(binding) = self.binding_of(&receiver) {
            write(&binding).insert(MapKey::string(name), value);
            return Ok(());
        }
        let meta = self.meta_class_of(&receiver);
        if let Some(hook) = meta.methods("propertyMissing").iter().find(|m| m.arity() == 2) {
            let hook = hook.clone();
            self.invoke_meta_method(&hook, receiver, vec![Value::string(name), value])?;
            return Ok(());
        }
        Err(RuntimeError::missing_property(&self.receiver_class_name(&receiver), name))
    }

    /// `X.metaClass.name = { ... }` or `x.metaClass.name = { ... }`
    fn add_expando(&self, handle: &MetaClassHandle, name: &str, value: Value) -> RuntimeResult<()> {
        let Value::Closure(closure) = value else {
            return Err(RuntimeError::illegal_argument(format!(
                "Cannot add method {name} to {}: expected a closure, got {}",
                handle.class.name,
                value.class_name()
            )));
        };
        match &handle.instance {
            Some(object) => {
                let current = self.meta_class_of(&Value::Object(Arc::clone(object)));
                let extensions = Extensions {
                    mixins: Vec::new(),
                    methods: vec![(name.to_string(), closure)],
                };
                object.set_meta_class(Some(Arc::new(current.extended(&extensions))));
                tracing::debug!(class = %handle.class.name, method = name, "added per-instance expando method");
            }
            None => self.registry().add_method(&handle.class, name, closure),
        }
        Ok(())
    }

    /// The binding map of a script object
    pub(crate) fn binding_of(&self, receiver: &Value) -> Option<MapRef> {
        let object = receiver.as_object()?;
        if object.class.distance_to(names::SCRIPT).is_none() {
            return None;
        }
        match object.field("binding") {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Class named in dispatch errors; a class receiver names itself
    fn receiver_class_name(&self, receiver: &Value) -> String {
        match receiver {
            Value::Class(class) => class.name.clone(),
            other => other.class_name(),
        }
    }

    pub fn call_closure(&self, closure: &Arc<Closure>, arguments: Vec<Value>) -> RuntimeResult<Value> {
        self.call_closure_as(closure, closure.owner.clone(), arguments)
    }

    /// Runs the closure's `doCall` with `owner` in the receiver slot
    ///
    /// A one-parameter closure called without arguments gets null.
    pub(crate) fn call_closure_as(
        &self,
        closure: &Arc<Closure>,
        owner: Value,
        mut arguments: Vec<Value>,
    ) -> RuntimeResult<Value> {
        let class = &closure.class;
        let file = class
            .file()
            .ok_or_else(|| RuntimeError::load(&class.name, "closure class carries no code"))?;
        let do_calls = || {
            file.methods
                .iter()
                .enumerate()
                .filter(|(_, m)| m.name == interpreter::DO_CALL)
        };
        let found = do_calls()
            .find(|(_, m)| m.parameter_types.len() == arguments.len())
            .or_else(|| {
                do_calls().find(|(_, m)| arguments.is_empty() && m.parameter_types.len() == 1)
            });
        let Some((index, method)) = found else {
            return Err(RuntimeError::missing_method(
                &class.name,
                interpreter::DO_CALL,
                argument_classes(&arguments),
            ));
        };
        arguments.resize(method.parameter_types.len(), Value::Null);
        let mut locals = closure.captured.clone();
        locals.extend(arguments);
        interpreter::execute(self, class, index, owner, locals)
    }
}

/// The few methods null answers
fn null_method(name: &str, arguments: &[Value]) -> RuntimeResult<Value> {
    match (name, arguments) {
        ("toString", []) => Ok(Value::string("null")),
        ("equals", [other]) => Ok(Value::Bool(other.is_null())),
        ("hashCode", []) => Ok(Value::Int(0)),
        _ => Err(RuntimeError::null_pointer(format!(
            "Cannot invoke method {name}() on null object"
        ))),
    }
}

fn class_identity(class: &ClassRef) -> usize {
    Arc::as_ptr(class) as *const () as usize
}

fn usable(property: &MetaProperty, access: Access) -> bool {
    match access {
        Access::Get => property.getter.is_some() || property.field.is_some(),
        Access::Set | Access::SetOwn => property.setter.is_some() || property.field.is_some(),
    }
}

/// Code of a class (or of its closures) may write the class's final fields
fn own_access(property: &MetaProperty, access: Access, owner: &str) -> Access {
    let Some(field) = &property.field else {
        return access;
    };
    let own = owner == field.owner.name
        || owner
            .strip_prefix(field.owner.name.as_str())
            .is_some_and(|rest| rest.starts_with('$'));
    if access == Access::Set && field.is_final && own {
        Access::SetOwn
    } else {
        access
    }
}
