//! The runtime facade
//!
//! A [`Runtime`] owns the loaded classes, the meta-class registry and the
//! per-object mixin state. It is `Send + Sync`; Grove threads share one
//! runtime and call into it concurrently.

use crate::category;
use crate::class::ClassRef;
use crate::config::RuntimeConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::interpreter;
use crate::loader::ClassLoader;
use crate::meta::{MetaClass, MetaClassHandle};
use crate::mixin::InstanceMixins;
use crate::natives;
use crate::object::{Instance, Monitor, ObjectRef};
use crate::registry::MetaClassRegistry;
use crate::value::{lock, read, MapKey, Value, ValueIterator};
use grove_compiler::bytecode::{decode, CallSiteKind};
use grove_compiler::classpath;
use grove_compiler::GeneratedClass;
use grove_parser::{names, ClassKind};
use std::sync::{Arc, Mutex};

/// Classes every value maps onto
struct CoreClasses {
    object: ClassRef,
    boolean: ClassRef,
    integer: ClassRef,
    float: ClassRef,
    string: ClassRef,
    gstring: ClassRef,
    list: ClassRef,
    map: ClassRef,
    class: ClassRef,
    meta_class: ClassRef,
    iterator: ClassRef,
}

impl CoreClasses {
    fn load(loader: &ClassLoader) -> RuntimeResult<Self> {
        let find = |name: &str| {
            loader.find(name).ok_or_else(|| RuntimeError::ClassNotFound {
                name: name.to_string(),
            })
        };
        Ok(Self {
            object: find(names::OBJECT)?,
            boolean: find(names::BOOLEAN)?,
            integer: find(names::INTEGER)?,
            float: find(names::FLOAT)?,
            string: find(names::STRING)?,
            gstring: find(names::GSTRING)?,
            list: find(classpath::ARRAY_LIST)?,
            map: find(classpath::LINKED_HASH_MAP)?,
            class: find(classpath::CLASS)?,
            meta_class: find(names::META_CLASS)?,
            iterator: find(classpath::ITERATOR)?,
        })
    }
}

pub struct Runtime {
    config: RuntimeConfig,
    loader: ClassLoader,
    registry: MetaClassRegistry,
    mixins: InstanceMixins,
    core: CoreClasses,
    /// Monitor for values that carry none of their own
    shared_monitor: Monitor,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> RuntimeResult<Self> {
        let loader = ClassLoader::new();
        natives::install(&loader)?;
        let core = CoreClasses::load(&loader)?;
        tracing::debug!(classes = loader.names().len(), "runtime ready");
        Ok(Self {
            config,
            loader,
            registry: MetaClassRegistry::new(),
            mixins: InstanceMixins::new(),
            core,
            shared_monitor: Monitor::default(),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn loader(&self) -> &ClassLoader {
        &self.loader
    }

    pub fn registry(&self) -> &MetaClassRegistry {
        &self.registry
    }

    pub fn mixins(&self) -> &InstanceMixins {
        &self.mixins
    }

    /// Decodes and links the output of a compilation
    pub fn define_classes(&self, generated: &[GeneratedClass]) -> RuntimeResult<Vec<ClassRef>> {
        let files = generated
            .iter()
            .map(|class| decode(&class.bytes).map_err(|e| RuntimeError::load(&class.name, e.to_string())))
            .collect::<RuntimeResult<Vec<_>>>()?;
        self.loader.define(files)
    }

    pub fn load_class(&self, name: &str) -> RuntimeResult<ClassRef> {
        self.loader.find(name).ok_or_else(|| RuntimeError::ClassNotFound {
            name: name.to_string(),
        })
    }

    /// Runs the static initializers of `class` and its superclasses once
    pub fn ensure_initialized(&self, class: &ClassRef) -> RuntimeResult<()> {
        if let Some(parent) = &class.super_class {
            self.ensure_initialized(parent)?;
        }
        if !class.init.claim(&class.name)? {
            return Ok(());
        }
        let initializer = class
            .file()
            .and_then(|file| file.methods.iter().position(|m| m.name == names::STATIC_INIT));
        let outcome = match initializer {
            Some(index) => {
                interpreter::execute(self, class, index, Value::Class(Arc::clone(class)), Vec::new())
                    .map(|_| ())
            }
            None => Ok(()),
        };
        match outcome {
            Ok(()) => {
                class.init.finish(Ok(()));
                tracing::debug!(class = %class.name, "initialized class");
                Ok(())
            }
            Err(error) => {
                let reason = error.to_string();
                class.init.finish(Err(reason.clone()));
                tracing::debug!(class = %class.name, %reason, "class initialization failed");
                Err(RuntimeError::Initialization {
                    class: class.name.clone(),
                    reason,
                })
            }
        }
    }

    /// Runtime class of a value; null and class-info records count as objects
    pub fn class_of(&self, value: &Value) -> ClassRef {
        let class = match value {
            Value::Null | Value::ClassInfo(_) => &self.core.object,
            Value::Bool(_) => &self.core.boolean,
            Value::Int(_) => &self.core.integer,
            Value::Float(_) => &self.core.float,
            Value::Str(_) => &self.core.string,
            Value::GString(_) => &self.core.gstring,
            Value::List(_) => &self.core.list,
            Value::Map(_) => &self.core.map,
            Value::Object(object) => &object.class,
            Value::Class(_) => &self.core.class,
            Value::Closure(closure) => &closure.class,
            Value::MetaClass(_) => &self.core.meta_class,
            Value::Iterator(_) => &self.core.iterator,
            Value::Ref(cell) => {
                let inner = read(cell).clone();
                return self.class_of(&inner);
            }
        };
        Arc::clone(class)
    }

    pub fn meta_class(&self, class: &ClassRef) -> Arc<MetaClass> {
        self.registry.meta_class(class)
    }

    /// Meta class dispatch uses for `value`; an object's own meta class wins
    pub fn meta_class_of(&self, value: &Value) -> Arc<MetaClass> {
        if let Some(own) = value.as_object().and_then(|object| object.meta_class()) {
            return own;
        }
        self.meta_class(&self.class_of(value))
    }

    /// `value.metaClass`: a class stands for its own meta class
    pub fn meta_class_handle(&self, value: &Value) -> MetaClassHandle {
        match value {
            Value::Class(class) => MetaClassHandle {
                class: Arc::clone(class),
                instance: None,
                meta: self.meta_class(class),
            },
            Value::Object(object) => MetaClassHandle {
                class: Arc::clone(&object.class),
                instance: Some(Arc::clone(object)),
                meta: self.meta_class_of(value),
            },
            other => {
                let class = self.class_of(other);
                MetaClassHandle {
                    meta: self.meta_class(&class),
                    class,
                    instance: None,
                }
            }
        }
    }

    /// Gives one object a meta class of its own, or takes it away
    pub fn set_meta_class(&self, value: &Value, meta: Option<Arc<MetaClass>>) -> RuntimeResult<()> {
        match value {
            Value::Object(object) => {
                object.set_meta_class(meta);
                Ok(())
            }
            other => Err(RuntimeError::illegal_argument(format!(
                "Cannot set the meta class of a {}",
                other.class_name()
            ))),
        }
    }

    pub fn invoke_method(&self, receiver: &Value, name: &str, arguments: Vec<Value>) -> RuntimeResult<Value> {
        self.dispatch(CallSiteKind::Method, "", name, receiver.clone(), arguments)
            .map_err(|error| self.unwrap(error))
    }

    pub fn invoke_static(&self, class: &str, name: &str, arguments: Vec<Value>) -> RuntimeResult<Value> {
        let class = self.load_class(class)?;
        self.invoke_method(&Value::Class(class), name, arguments)
    }

    pub fn get_property(&self, receiver: &Value, name: &str) -> RuntimeResult<Value> {
        self.dispatch(CallSiteKind::GetProperty, "", name, receiver.clone(), Vec::new())
            .map_err(|error| self.unwrap(error))
    }

    pub fn set_property(&self, receiver: &Value, name: &str, value: Value) -> RuntimeResult<()> {
        self.dispatch(CallSiteKind::SetProperty, "", name, receiver.clone(), vec![value])
            .map(|_| ())
            .map_err(|error| self.unwrap(error))
    }

    pub fn new_instance(&self, class: &str, arguments: Vec<Value>) -> RuntimeResult<Value> {
        self.dispatch(CallSiteKind::Constructor, "", class, Value::Null, arguments)
            .map_err(|error| self.unwrap(error))
    }

    /// Static field of `class` or of the superclass declaring it
    pub(crate) fn static_field(&self, class: &ClassRef, name: &str) -> RuntimeResult<Value> {
        self.ensure_initialized(class)?;
        class
            .lineage()
            .iter()
            .rev()
            .find_map(|c| c.static_value(name))
            .ok_or_else(|| RuntimeError::missing_property(&class.name, name))
    }

    pub(crate) fn set_static_field(&self, class: &ClassRef, name: &str, value: Value) -> RuntimeResult<()> {
        self.ensure_initialized(class)?;
        let owner = class
            .lineage()
            .into_iter()
            .rev()
            .find(|c| c.has_static(name))
            .ok_or_else(|| RuntimeError::missing_property(&class.name, name))?;
        owner.set_static(name, value);
        Ok(())
    }

    /// Text of a value as `println` and GStrings show it
    pub fn to_display_string(&self, value: &Value) -> RuntimeResult<String> {
        match value {
            Value::Object(_) | Value::Closure(_) => {
                let text = self.dispatch(CallSiteKind::Method, "", "toString", value.clone(), Vec::new())?;
                Ok(match text.as_str() {
                    Some(text) => text.to_string(),
                    None => text.to_plain_string(),
                })
            }
            Value::List(items) => {
                let items = read(items).clone();
                let rendered = items
                    .iter()
                    .map(|item| self.to_display_string(item))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(format!("[{}]", rendered.join(", ")))
            }
            Value::Map(map) => {
                let entries = read(map).clone();
                if entries.is_empty() {
                    return Ok("[:]".to_string());
                }
                let rendered = entries
                    .iter()
                    .map(|(key, value)| {
                        Ok(format!(
                            "{}:{}",
                            self.to_display_string(&key.0)?,
                            self.to_display_string(value)?
                        ))
                    })
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(format!("[{}]", rendered.join(", ")))
            }
            Value::Ref(cell) => {
                let inner = read(cell).clone();
                self.to_display_string(&inner)
            }
            other => Ok(other.to_plain_string()),
        }
    }

    /// `==`: objects answer through `equals`, collections compare element-wise
    pub fn values_equal(&self, left: &Value, right: &Value) -> RuntimeResult<bool> {
        match (left, right) {
            (Value::Ref(cell), _) => {
                let inner = read(cell).clone();
                self.values_equal(&inner, right)
            }
            (_, Value::Ref(cell)) => {
                let inner = read(cell).clone();
                self.values_equal(left, &inner)
            }
            (Value::Object(a), Value::Object(b)) if Arc::ptr_eq(a, b) => Ok(true),
            (Value::Object(_), Value::Null) | (Value::Null, Value::Object(_)) => Ok(false),
            (Value::Object(_), _) => {
                let equal =
                    self.dispatch(CallSiteKind::Method, "", "equals", left.clone(), vec![right.clone()])?;
                Ok(equal.is_truthy())
            }
            (Value::List(a), Value::List(b)) => {
                if Arc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (a, b) = (read(a).clone(), read(b).clone());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(&b) {
                    if !self.values_equal(x, y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Ok(left == right),
        }
    }

    /// Explicit or implicit conversion to `type_name`
    pub fn cast(&self, value: Value, type_name: &str) -> RuntimeResult<Value> {
        use names::*;
        let value = match value {
            Value::Ref(cell) => read(&cell).clone(),
            other => other,
        };
        let cast_error = |value: &Value| RuntimeError::ClassCast {
            value: value.to_plain_string(),
            from: value.class_name(),
            to: type_name.to_string(),
        };
        match (type_name, &value) {
            (OBJECT | DYNAMIC, _) => Ok(value),
            (PRIMITIVE_BOOLEAN | BOOLEAN, _) => Ok(Value::Bool(value.is_truthy())),
            (_, Value::Null) => Ok(Value::Null),
            (STRING, _) => Ok(Value::string(self.to_display_string(&value)?)),
            (INT | INTEGER, Value::Int(_)) => Ok(value),
            (INT | INTEGER, Value::Float(x)) => Ok(Value::Int(x.trunc() as i64)),
            (INT | INTEGER, Value::Str(_) | Value::GString(_)) => value
                .as_str()
                .and_then(|text| text.trim().parse::<i64>().ok())
                .map(Value::Int)
                .ok_or_else(|| cast_error(&value)),
            (DOUBLE | FLOAT, Value::Int(_) | Value::Float(_)) => {
                Ok(value.as_float().map(Value::Float).unwrap_or_default())
            }
            (DOUBLE | FLOAT, Value::Str(_) | Value::GString(_)) => value
                .as_str()
                .and_then(|text| text.trim().parse::<f64>().ok())
                .map(Value::Float)
                .ok_or_else(|| cast_error(&value)),
            _ if self.is_instance(&value, type_name) => Ok(value),
            // erased type variables
            _ if !is_primitive(type_name) && self.loader.find(type_name).is_none() => Ok(value),
            _ => Err(cast_error(&value)),
        }
    }

    pub fn is_instance(&self, value: &Value, type_name: &str) -> bool {
        let type_name = match type_name {
            names::INT => names::INTEGER,
            names::DOUBLE => names::FLOAT,
            names::PRIMITIVE_BOOLEAN => names::BOOLEAN,
            other => other,
        };
        !value.is_null() && self.class_of(value).is_assignable_to(type_name)
    }

    /// What a `for` loop walks over
    pub fn iterator_of(&self, value: &Value) -> RuntimeResult<Arc<Mutex<ValueIterator>>> {
        let items = match value {
            Value::Null => Vec::new(),
            Value::List(items) => read(items).clone(),
            Value::Map(map) => read(map)
                .iter()
                .map(|(key, value)| {
                    Value::map([
                        (Value::string("key"), key.0.clone()),
                        (Value::string("value"), value.clone()),
                    ])
                })
                .collect(),
            Value::Str(_) | Value::GString(_) => value
                .as_str()
                .unwrap_or_default()
                .chars()
                .map(|c| Value::string(c.to_string()))
                .collect(),
            Value::Iterator(iterator) => return Ok(Arc::clone(iterator)),
            Value::Ref(cell) => {
                let inner = read(cell).clone();
                return self.iterator_of(&inner);
            }
            Value::Object(object) => {
                let meta = self.meta_class_of(value);
                if meta.has_method("iterator") {
                    let iterator = self.dispatch(CallSiteKind::Method, "", "iterator", value.clone(), Vec::new())?;
                    return match iterator {
                        Value::Object(_) | Value::Iterator(_) | Value::List(_) => self.iterator_of(&iterator),
                        other => Ok(Arc::new(Mutex::new(ValueIterator::items(vec![other])))),
                    };
                }
                if meta.has_method("hasNext") && meta.has_method("next") {
                    return Ok(Arc::new(Mutex::new(ValueIterator::Object(Arc::clone(object)))));
                }
                vec![value.clone()]
            }
            other => vec![other.clone()],
        };
        Ok(Arc::new(Mutex::new(ValueIterator::items(items))))
    }

    /// Advances an iterator; `None` once it is exhausted
    pub fn next_item(&self, iterator: &Mutex<ValueIterator>) -> RuntimeResult<Option<Value>> {
        let object = {
            let mut state = lock(iterator);
            match &mut *state {
                ValueIterator::Items { items, next } => {
                    let item = items.get(*next).cloned();
                    if item.is_some() {
                        *next += 1;
                    }
                    return Ok(item);
                }
                ValueIterator::Object(object) => Arc::clone(object),
            }
        };
        let target = Value::Object(object);
        let has_next = self.dispatch(CallSiteKind::Method, "", "hasNext", target.clone(), Vec::new())?;
        if !has_next.is_truthy() {
            return Ok(None);
        }
        self.dispatch(CallSiteKind::Method, "", "next", target, Vec::new())
            .map(Some)
    }

    /// A fresh exception object carrying `message`
    pub fn exception(&self, class: &str, message: &str) -> RuntimeResult<ObjectRef> {
        let class = self.load_class(class)?;
        let exception = Instance::new(Arc::clone(&class), class.field_defaults());
        exception.set_field("message", Value::string(message));
        Ok(exception)
    }

    /// Turns dispatch failures into the Grove exceptions Grove code can catch
    pub fn unwrap(&self, error: RuntimeError) -> RuntimeError {
        let Some(class) = error.exception_class() else {
            return error;
        };
        match self.exception(class, &error.to_string()) {
            Ok(exception) => RuntimeError::Thrown(exception),
            Err(_) => error,
        }
    }

    /// Monitor `synchronized (value)` locks
    pub fn monitor_of<'a>(&'a self, value: &'a Value) -> RuntimeResult<&'a Monitor> {
        match value {
            Value::Object(object) => Ok(&object.monitor),
            Value::Class(class) => Ok(&class.monitor),
            Value::Null => Err(RuntimeError::null_pointer("Cannot synchronize on null")),
            _ => Ok(&self.shared_monitor),
        }
    }

    pub fn write_output(&self, text: &str) {
        self.config.output.write(text);
    }

    /// `Class.main(args)`
    pub fn run_main(&self, class: &str, arguments: &[String]) -> RuntimeResult<Value> {
        let arguments = Value::list(arguments.iter().map(Value::string).collect());
        tracing::debug!(class, "running main");
        self.invoke_static(class, "main", vec![arguments])
    }

    /// The class to run out of a batch: a script, else any class with a static `main`
    pub fn entry_point(&self, classes: &[ClassRef]) -> Option<ClassRef> {
        classes
            .iter()
            .find(|class| class.kind == ClassKind::Script)
            .or_else(|| {
                classes.iter().find(|class| {
                    class.kind != ClassKind::Closure
                        && self.meta_class(class).methods("main").iter().any(|m| m.is_static)
                })
            })
            .cloned()
    }

    /// Categories active on the calling thread, innermost last
    pub fn active_categories(&self) -> Vec<String> {
        category::active_categories()
    }

    /// Binding entry of a script object
    pub fn binding_value(&self, script: &Value, name: &str) -> Option<Value> {
        self.binding_of(script)
            .and_then(|binding| read(&binding).get(&MapKey::string(name)).cloned())
    }
}
