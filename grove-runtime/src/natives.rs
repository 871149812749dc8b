//! Native classes
//!
//! Every class of the built-in catalogue is defined here with a table of
//! Rust methods. Value classes (strings, numbers, lists, maps, closures,
//! meta classes) describe plain [`Value`]s and cannot be extended by
//! compiled code; the others (Object, the throwables, Script, Enum) are
//! ordinary object classes.

use crate::class::{ClassBody, ClassRef, NativeMethod, RuntimeClass};
use crate::default_methods;
use crate::error::{RuntimeError, RuntimeResult};
use crate::loader::ClassLoader;
use crate::meta::MetaClassHandle;
use crate::object::ObjectRef;
use crate::runtime::Runtime;
use crate::value::{lock, read, write, Closure, MapKey, Value, ValueIterator};
use grove_compiler::classpath;
use grove_parser::names;
use std::cmp::Ordering;
use std::sync::Arc;

/// Classes whose instances are plain values
const VALUE_CLASSES: &[&str] = &[
    names::INT,
    names::PRIMITIVE_BOOLEAN,
    names::DOUBLE,
    names::VOID,
    names::STRING,
    names::GSTRING,
    classpath::NUMBER,
    names::INTEGER,
    names::FLOAT,
    names::BOOLEAN,
    classpath::CLASS,
    names::CLOSURE,
    names::META_CLASS,
    classpath::ITERATOR,
    names::LIST,
    names::MAP,
    classpath::ARRAY_LIST,
    classpath::LINKED_HASH_MAP,
    classpath::INVOKER_HELPER,
];

/// Interfaces that are the runtime class of a value and so need Object's methods
const VALUE_INTERFACES: &[&str] = &[names::META_CLASS, classpath::ITERATOR];

/// Defines the whole catalogue, supertypes first
pub fn install(loader: &ClassLoader) -> RuntimeResult<()> {
    for external in classpath::catalogue() {
        let name = external.name.as_str();
        let find = |supertype: &str| {
            loader
                .find(supertype)
                .ok_or_else(|| RuntimeError::load(name, format!("supertype {supertype} is not defined")))
        };
        let super_class = match &external.super_class {
            Some(parent) => Some(find(parent.as_str())?),
            None if VALUE_INTERFACES.contains(&name) => Some(find(names::OBJECT)?),
            None => None,
        };
        let interfaces = external
            .interfaces
            .iter()
            .map(|interface| find(interface.as_str()))
            .collect::<RuntimeResult<Vec<_>>>()?;
        let body = ClassBody::Native {
            methods: methods_for(name),
            fields: fields_for(name),
            value_backed: VALUE_CLASSES.contains(&name),
        };
        loader.register(RuntimeClass::native(
            name,
            external.kind,
            external.modifiers,
            super_class,
            interfaces,
            body,
        ))?;
    }
    tracing::debug!(classes = classpath::catalogue().len(), "installed native classes");
    Ok(())
}

fn fields_for(name: &str) -> &'static [&'static str] {
    match name {
        names::THROWABLE => &["message", "cause"],
        names::SCRIPT => &["binding"],
        _ => &[],
    }
}

fn methods_for(name: &str) -> Vec<NativeMethod> {
    let mut methods = match name {
        names::OBJECT => {
            let mut methods = OBJECT_METHODS.to_vec();
            methods.extend(default_methods::object_methods());
            methods
        }
        names::INTEGER => default_methods::integer_methods(),
        classpath::CLASS => CLASS_METHODS.to_vec(),
        names::STRING | names::GSTRING => STRING_METHODS.to_vec(),
        classpath::NUMBER => NUMBER_METHODS.to_vec(),
        names::CLOSURE => CLOSURE_METHODS.to_vec(),
        names::SCRIPT => SCRIPT_METHODS.to_vec(),
        names::ENUM => ENUM_METHODS.to_vec(),
        names::THROWABLE => THROWABLE_METHODS.to_vec(),
        classpath::INVOKER_HELPER => INVOKER_HELPER_METHODS.to_vec(),
        classpath::ITERATOR => ITERATOR_METHODS.to_vec(),
        classpath::ARRAY_LIST => LIST_METHODS.to_vec(),
        classpath::LINKED_HASH_MAP => MAP_METHODS.to_vec(),
        names::META_CLASS => META_CLASS_METHODS.to_vec(),
        _ => Vec::new(),
    };
    // constructors are never inherited, so every throwable declares its own
    if is_throwable(name) {
        methods.extend_from_slice(THROWABLE_CONSTRUCTORS);
    }
    methods
}

fn is_throwable(name: &str) -> bool {
    let mut current = classpath::catalogue_class(name);
    while let Some(class) = current {
        if class.name == names::THROWABLE {
            return true;
        }
        current = class.super_class.as_deref().and_then(classpath::catalogue_class);
    }
    false
}

const OBJECT_METHODS: &[NativeMethod] = &[
    NativeMethod::instance(names::CONSTRUCTOR, &[], no_op),
    NativeMethod::instance("getMetaClass", &[], get_meta_class),
    NativeMethod::instance("setMetaClass", &[names::META_CLASS], set_meta_class),
    NativeMethod::instance("invokeMethod", &[names::STRING, names::OBJECT], invoke_method),
    NativeMethod::instance("getProperty", &[names::STRING], get_property),
    NativeMethod::instance("setProperty", &[names::STRING, names::OBJECT], set_property),
];

const CLASS_METHODS: &[NativeMethod] = &[
    NativeMethod::instance("getName", &[], class_name),
    NativeMethod::instance("getSimpleName", &[], class_simple_name),
    NativeMethod::instance("isInstance", &[names::OBJECT], class_is_instance),
    NativeMethod::instance("newInstance", &[], class_new_instance),
];

const STRING_METHODS: &[NativeMethod] = &[
    NativeMethod::instance("size", &[], string_length),
    NativeMethod::instance("length", &[], string_length),
    NativeMethod::instance("toUpperCase", &[], string_upper),
    NativeMethod::instance("toLowerCase", &[], string_lower),
    NativeMethod::instance("trim", &[], string_trim),
    NativeMethod::instance("compareTo", &[names::OBJECT], string_compare),
    NativeMethod::instance("plus", &[names::OBJECT], string_plus),
    NativeMethod::instance("multiply", &[names::INT], string_multiply),
    NativeMethod::instance("getAt", &[names::INT], string_get_at),
    NativeMethod::instance("isEmpty", &[], string_is_empty),
    NativeMethod::instance("contains", &[names::OBJECT], string_contains),
    NativeMethod::instance("startsWith", &[names::STRING], string_starts_with),
    NativeMethod::instance("endsWith", &[names::STRING], string_ends_with),
    NativeMethod::instance("toString", &[], string_to_string),
];

const NUMBER_METHODS: &[NativeMethod] = &[
    NativeMethod::instance("plus", &[names::OBJECT], number_plus),
    NativeMethod::instance("minus", &[names::OBJECT], number_minus),
    NativeMethod::instance("multiply", &[names::OBJECT], number_multiply),
    NativeMethod::instance("div", &[names::OBJECT], number_div),
    NativeMethod::instance("mod", &[names::OBJECT], number_mod),
    NativeMethod::instance("negative", &[], number_negative),
    NativeMethod::instance("compareTo", &[names::OBJECT], number_compare),
    NativeMethod::instance("intValue", &[], number_int_value),
    NativeMethod::instance("doubleValue", &[], number_double_value),
    NativeMethod::instance("abs", &[], number_abs),
];

const CLOSURE_METHODS: &[NativeMethod] = &[
    NativeMethod::varargs("call", closure_call),
    NativeMethod::instance("run", &[], closure_run),
    NativeMethod::instance("getOwner", &[], closure_owner),
    NativeMethod::instance("getMaximumNumberOfParameters", &[], closure_parameter_count),
];

const SCRIPT_METHODS: &[NativeMethod] = &[
    NativeMethod::instance(names::CONSTRUCTOR, &[], script_init),
    NativeMethod::instance(names::CONSTRUCTOR, &[names::MAP], script_init_with_binding),
    NativeMethod::instance("getBinding", &[], script_binding),
];

const ENUM_METHODS: &[NativeMethod] = &[
    NativeMethod::instance(names::CONSTRUCTOR, &[], no_op),
    NativeMethod::instance("compareTo", &[names::OBJECT], enum_compare),
];

const THROWABLE_METHODS: &[NativeMethod] = &[
    NativeMethod::instance("getMessage", &[], throwable_message),
    NativeMethod::instance("getCause", &[], throwable_cause),
    NativeMethod::instance("toString", &[], throwable_to_string),
];

const THROWABLE_CONSTRUCTORS: &[NativeMethod] = &[
    NativeMethod::instance(names::CONSTRUCTOR, &[], no_op),
    NativeMethod::instance(names::CONSTRUCTOR, &[names::STRING], throwable_init_message),
    NativeMethod::instance(
        names::CONSTRUCTOR,
        &[names::STRING, names::THROWABLE],
        throwable_init_message_cause,
    ),
    NativeMethod::instance(names::CONSTRUCTOR, &[names::THROWABLE], throwable_init_cause),
];

const INVOKER_HELPER_METHODS: &[NativeMethod] = &[
    NativeMethod::class_method("getMetaClass", &[names::OBJECT], helper_get_meta_class),
    NativeMethod::class_method(
        "setMetaClass",
        &[names::OBJECT, names::META_CLASS],
        helper_set_meta_class,
    ),
    NativeMethod::class_method(
        "invokeMethod",
        &[names::OBJECT, names::STRING, names::OBJECT],
        helper_invoke_method,
    ),
    NativeMethod::class_method("getProperty", &[names::OBJECT, names::STRING], helper_get_property),
    NativeMethod::class_method(
        "setProperty",
        &[names::OBJECT, names::STRING, names::OBJECT],
        helper_set_property,
    ),
    NativeMethod::class_method("getClassInfo", &[classpath::CLASS], helper_class_info),
    NativeMethod::class_method("getStaticMetaClass", &[names::OBJECT], helper_static_meta_class),
];

const ITERATOR_METHODS: &[NativeMethod] = &[
    NativeMethod::instance("hasNext", &[], iterator_has_next),
    NativeMethod::instance("next", &[], iterator_next),
];

const LIST_METHODS: &[NativeMethod] = &[
    NativeMethod::instance(names::CONSTRUCTOR, &[], list_new),
    NativeMethod::instance(names::CONSTRUCTOR, &[names::LIST], list_copy),
    NativeMethod::instance("size", &[], list_size),
    NativeMethod::instance("get", &[names::INT], list_get),
    NativeMethod::instance("add", &[names::OBJECT], list_add),
    NativeMethod::instance("getAt", &[names::INT], list_get_at),
    NativeMethod::instance("putAt", &[names::INT, names::OBJECT], list_put_at),
    NativeMethod::instance("iterator", &[], list_iterator),
    NativeMethod::instance("plus", &[names::OBJECT], list_plus),
    NativeMethod::instance("contains", &[names::OBJECT], list_contains),
    NativeMethod::instance("isEmpty", &[], list_is_empty),
    NativeMethod::instance("join", &[names::STRING], list_join),
    NativeMethod::instance("first", &[], list_first),
    NativeMethod::instance("last", &[], list_last),
    NativeMethod::instance("leftShift", &[names::OBJECT], list_left_shift),
];

const MAP_METHODS: &[NativeMethod] = &[
    NativeMethod::instance(names::CONSTRUCTOR, &[], map_new),
    NativeMethod::instance(names::CONSTRUCTOR, &[names::MAP], map_copy),
    NativeMethod::instance("size", &[], map_size),
    NativeMethod::instance("get", &[names::OBJECT], map_get),
    NativeMethod::instance("put", &[names::OBJECT, names::OBJECT], map_put),
    NativeMethod::instance("getAt", &[names::OBJECT], map_get),
    NativeMethod::instance("putAt", &[names::OBJECT, names::OBJECT], map_put),
    NativeMethod::instance("containsKey", &[names::OBJECT], map_contains_key),
    NativeMethod::instance("isEmpty", &[], map_is_empty),
    NativeMethod::instance("keySet", &[], map_keys),
    NativeMethod::instance("values", &[], map_values),
    NativeMethod::instance("remove", &[names::OBJECT], map_remove),
];

const META_CLASS_METHODS: &[NativeMethod] = &[
    NativeMethod::instance("respondsTo", &[names::OBJECT, names::STRING], meta_responds_to),
    NativeMethod::instance("hasProperty", &[names::OBJECT, names::STRING], meta_has_property),
    NativeMethod::instance("getTheClass", &[], meta_the_class),
];

// argument and receiver helpers

pub(crate) fn argument(arguments: &[Value], index: usize) -> Value {
    arguments.get(index).cloned().unwrap_or_default()
}

pub(crate) fn text(value: &Value) -> RuntimeResult<&str> {
    value.as_str().ok_or_else(|| cast_error(value, names::STRING))
}

pub(crate) fn int(value: &Value) -> RuntimeResult<i64> {
    value.as_int().ok_or_else(|| cast_error(value, names::INT))
}

pub(crate) fn class(value: &Value) -> RuntimeResult<&ClassRef> {
    value.as_class().ok_or_else(|| cast_error(value, classpath::CLASS))
}

pub(crate) fn closure(value: &Value) -> RuntimeResult<&Arc<Closure>> {
    match value {
        Value::Closure(closure) => Ok(closure),
        other => Err(cast_error(other, names::CLOSURE)),
    }
}

fn object(value: &Value) -> RuntimeResult<&ObjectRef> {
    value.as_object().ok_or_else(|| cast_error(value, names::OBJECT))
}

pub(crate) fn cast_error(value: &Value, to: &str) -> RuntimeError {
    RuntimeError::ClassCast {
        value: value.to_plain_string(),
        from: value.class_name(),
        to: to.to_string(),
    }
}

/// `invokeMethod` argument: a list spreads, null means none
fn spread(arguments: Value) -> Vec<Value> {
    match arguments {
        Value::List(items) => read(&items).clone(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// GString keys are stored as plain strings
fn map_key(key: Value) -> MapKey {
    if let Value::GString(gstring) = &key {
        return MapKey::string(&gstring.text);
    }
    MapKey(key)
}

fn no_op(_: &Runtime, _: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Null)
}

// Object

fn get_meta_class(rt: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::MetaClass(rt.meta_class_handle(this)))
}

fn set_meta_class(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    match argument(arguments, 0) {
        Value::MetaClass(handle) => rt.set_meta_class(this, Some(handle.meta))?,
        Value::Null => rt.set_meta_class(this, None)?,
        other => return Err(cast_error(&other, names::META_CLASS)),
    }
    Ok(Value::Null)
}

fn invoke_method(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let name = text(&argument(arguments, 0))?.to_string();
    rt.invoke_method(this, &name, spread(argument(arguments, 1)))
}

fn get_property(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    rt.get_property(this, text(&argument(arguments, 0))?)
}

fn set_property(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    rt.set_property(this, text(&argument(arguments, 0))?, argument(arguments, 1))?;
    Ok(Value::Null)
}

// Class

fn class_name(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::string(&class(this)?.name))
}

fn class_simple_name(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::string(class(this)?.simple_name()))
}

fn class_is_instance(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let class = class(this)?;
    Ok(Value::Bool(rt.is_instance(&argument(arguments, 0), &class.name)))
}

fn class_new_instance(rt: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    rt.instantiate(class(this)?, Vec::new())
}

// String and GString

fn string_length(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Int(text(this)?.chars().count() as i64))
}

fn string_upper(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::string(text(this)?.to_uppercase()))
}

fn string_lower(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::string(text(this)?.to_lowercase()))
}

fn string_trim(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::string(text(this)?.trim()))
}

fn string_compare(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let other = argument(arguments, 0);
    Ok(ordering(text(this)?.cmp(text(&other)?)))
}

fn string_plus(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let suffix = rt.to_display_string(&argument(arguments, 0))?;
    Ok(Value::string(format!("{}{suffix}", text(this)?)))
}

fn string_multiply(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let count = int(&argument(arguments, 0))?;
    if count < 0 {
        return Err(RuntimeError::illegal_argument(format!(
            "Cannot repeat a string a negative number of times: {count}"
        )));
    }
    Ok(Value::string(text(this)?.repeat(count as usize)))
}

fn string_get_at(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let index = int(&argument(arguments, 0))?;
    let chars: Vec<char> = text(this)?.chars().collect();
    normalize_index(index, chars.len())
        .and_then(|i| chars.get(i))
        .map(|c| Value::string(c.to_string()))
        .ok_or_else(|| RuntimeError::illegal_argument(format!("String index out of range: {index}")))
}

fn string_is_empty(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Bool(text(this)?.is_empty()))
}

fn string_contains(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let needle = rt.to_display_string(&argument(arguments, 0))?;
    Ok(Value::Bool(text(this)?.contains(needle.as_str())))
}

fn string_starts_with(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let prefix = argument(arguments, 0);
    Ok(Value::Bool(text(this)?.starts_with(text(&prefix)?)))
}

fn string_ends_with(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let suffix = argument(arguments, 0);
    Ok(Value::Bool(text(this)?.ends_with(text(&suffix)?)))
}

fn string_to_string(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::string(text(this)?))
}

/// Negative indexes count from the end
fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let index = if index < 0 { index + len as i64 } else { index };
    usize::try_from(index).ok().filter(|i| *i < len)
}

fn ordering(ordering: Ordering) -> Value {
    Value::Int(ordering as i64)
}

// Numbers

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arithmetic {
    Plus,
    Minus,
    Multiply,
    Div,
    Mod,
}

impl Arithmetic {
    fn method(self) -> &'static str {
        match self {
            Arithmetic::Plus => "plus",
            Arithmetic::Minus => "minus",
            Arithmetic::Multiply => "multiply",
            Arithmetic::Div => "div",
            Arithmetic::Mod => "mod",
        }
    }
}

fn arithmetic(rt: &Runtime, this: &Value, other: &Value, operation: Arithmetic) -> RuntimeResult<Value> {
    match (this, other) {
        (Value::Int(a), Value::Int(b)) => integer_arithmetic(*a, *b, operation),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (this.as_float().unwrap_or_default(), other.as_float().unwrap_or_default());
            Ok(Value::Float(match operation {
                Arithmetic::Plus => a + b,
                Arithmetic::Minus => a - b,
                Arithmetic::Multiply => a * b,
                Arithmetic::Div => a / b,
                Arithmetic::Mod => a % b,
            }))
        }
        (_, Value::Str(_) | Value::GString(_)) if operation == Arithmetic::Plus => Ok(Value::string(
            format!("{}{}", rt.to_display_string(this)?, text(other)?),
        )),
        _ => Err(RuntimeError::missing_method(
            &this.class_name(),
            operation.method(),
            vec![other.class_name()],
        )),
    }
}

fn integer_arithmetic(a: i64, b: i64, operation: Arithmetic) -> RuntimeResult<Value> {
    let division_by_zero = || RuntimeError::arithmetic("Division by zero");
    Ok(match operation {
        Arithmetic::Plus => Value::Int(a.wrapping_add(b)),
        Arithmetic::Minus => Value::Int(a.wrapping_sub(b)),
        Arithmetic::Multiply => Value::Int(a.wrapping_mul(b)),
        Arithmetic::Div if b == 0 => return Err(division_by_zero()),
        Arithmetic::Div if a.wrapping_rem(b) == 0 => Value::Int(a.wrapping_div(b)),
        Arithmetic::Div => Value::Float(a as f64 / b as f64),
        Arithmetic::Mod if b == 0 => return Err(division_by_zero()),
        Arithmetic::Mod => Value::Int(a.wrapping_rem(b)),
    })
}

fn number_plus(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    arithmetic(rt, this, &argument(arguments, 0), Arithmetic::Plus)
}

fn number_minus(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    arithmetic(rt, this, &argument(arguments, 0), Arithmetic::Minus)
}

fn number_multiply(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    arithmetic(rt, this, &argument(arguments, 0), Arithmetic::Multiply)
}

fn number_div(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    arithmetic(rt, this, &argument(arguments, 0), Arithmetic::Div)
}

fn number_mod(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    arithmetic(rt, this, &argument(arguments, 0), Arithmetic::Mod)
}

fn number_negative(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    match this {
        Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
        Value::Float(x) => Ok(Value::Float(-x)),
        other => Err(cast_error(other, classpath::NUMBER)),
    }
}

fn number_compare(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let other = argument(arguments, 0);
    match (this, &other) {
        (Value::Int(a), Value::Int(b)) => Ok(ordering(a.cmp(b))),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (this.as_float().unwrap_or_default(), other.as_float().unwrap_or_default());
            Ok(ordering(a.partial_cmp(&b).unwrap_or(Ordering::Equal)))
        }
        _ => Err(cast_error(&other, classpath::NUMBER)),
    }
}

fn number_int_value(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    match this {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(x) => Ok(Value::Int(x.trunc() as i64)),
        other => Err(cast_error(other, classpath::NUMBER)),
    }
}

fn number_double_value(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    this.as_float()
        .map(Value::Float)
        .ok_or_else(|| cast_error(this, classpath::NUMBER))
}

fn number_abs(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    match this {
        Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        other => Err(cast_error(other, classpath::NUMBER)),
    }
}

// Closure

fn closure_call(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    rt.call_closure(closure(this)?, arguments.to_vec())
}

fn closure_run(rt: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    rt.call_closure(closure(this)?, Vec::new())?;
    Ok(Value::Null)
}

fn closure_owner(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(closure(this)?.owner.clone())
}

fn closure_parameter_count(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Int(closure(this)?.parameter_count() as i64))
}

// Script

fn script_init(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    object(this)?.set_field("binding", Value::map(Vec::new()));
    Ok(Value::Null)
}

fn script_init_with_binding(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let binding = match argument(arguments, 0) {
        binding @ Value::Map(_) => binding,
        _ => Value::map(Vec::new()),
    };
    object(this)?.set_field("binding", binding);
    Ok(Value::Null)
}

fn script_binding(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(object(this)?.field("binding"))
}

// Enum

fn enum_compare(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let other = argument(arguments, 0);
    let this = object(this)?;
    let other_object = object(&other)?;
    if !Arc::ptr_eq(&this.class, &other_object.class) {
        return Err(cast_error(&other, &this.class.name));
    }
    let (a, b) = (this.field("$ordinal"), other_object.field("$ordinal"));
    Ok(ordering(int(&a)?.cmp(&int(&b)?)))
}

// Throwable

fn throwable_message(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(object(this)?.field("message"))
}

fn throwable_cause(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(object(this)?.field("cause"))
}

fn throwable_to_string(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let exception = object(this)?;
    Ok(Value::string(match exception.field("message").as_str() {
        Some(message) => format!("{}: {message}", exception.class.name),
        None => exception.class.name.clone(),
    }))
}

fn throwable_init_message(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    object(this)?.set_field("message", argument(arguments, 0));
    Ok(Value::Null)
}

fn throwable_init_message_cause(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let exception = object(this)?;
    exception.set_field("message", argument(arguments, 0));
    exception.set_field("cause", argument(arguments, 1));
    Ok(Value::Null)
}

/// The message of a wrapping exception is its cause's description
fn throwable_init_cause(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let exception = object(this)?;
    let cause = argument(arguments, 0);
    if !cause.is_null() {
        exception.set_field("message", Value::string(rt.to_display_string(&cause)?));
    }
    exception.set_field("cause", cause);
    Ok(Value::Null)
}

// InvokerHelper: the statics synthesized accessors delegate to

fn helper_get_meta_class(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::MetaClass(rt.meta_class_handle(&argument(arguments, 0))))
}

fn helper_set_meta_class(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    set_meta_class(rt, &argument(arguments, 0), arguments.get(1..).unwrap_or_default())
}

fn helper_invoke_method(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let name = text(&argument(arguments, 1))?.to_string();
    rt.invoke_method(&argument(arguments, 0), &name, spread(argument(arguments, 2)))
}

fn helper_get_property(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    rt.get_property(&argument(arguments, 0), text(&argument(arguments, 1))?)
}

fn helper_set_property(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    rt.set_property(
        &argument(arguments, 0),
        text(&argument(arguments, 1))?,
        argument(arguments, 2),
    )?;
    Ok(Value::Null)
}

fn helper_class_info(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let class = class(&argument(arguments, 0))?.clone();
    Ok(Value::ClassInfo(rt.registry().class_info(&class)))
}

/// Meta class behind a cached class-info record
fn helper_static_meta_class(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    match argument(arguments, 0) {
        Value::ClassInfo(info) => Ok(Value::MetaClass(MetaClassHandle {
            class: Arc::clone(info.class()),
            instance: None,
            meta: rt.registry().meta_class_of(&info),
        })),
        other => Ok(Value::MetaClass(rt.meta_class_handle(&other))),
    }
}

// Iterator

fn iterator(this: &Value) -> RuntimeResult<&Arc<std::sync::Mutex<ValueIterator>>> {
    match this {
        Value::Iterator(iterator) => Ok(iterator),
        other => Err(cast_error(other, classpath::ITERATOR)),
    }
}

fn iterator_has_next(rt: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    let source = {
        let state = lock(iterator(this)?);
        match &*state {
            ValueIterator::Object(source) => Arc::clone(source),
            items => return Ok(Value::Bool(items.has_next())),
        }
    };
    rt.invoke_method(&Value::Object(source), "hasNext", Vec::new())
}

fn iterator_next(rt: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    rt.next_item(iterator(this)?)?
        .ok_or_else(|| RuntimeError::illegal_state("Iterator is exhausted"))
}

// ArrayList

fn list(value: &Value) -> RuntimeResult<&crate::value::ListRef> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(cast_error(other, names::LIST)),
    }
}

fn list_new(_: &Runtime, _: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::list(Vec::new()))
}

fn list_copy(_: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let source = argument(arguments, 0);
    let items = read(list(&source)?).clone();
    Ok(Value::list(items))
}

fn list_size(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Int(read(list(this)?).len() as i64))
}

fn list_get(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let index = int(&argument(arguments, 0))?;
    let items = read(list(this)?);
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .cloned()
        .ok_or_else(|| {
            RuntimeError::illegal_argument(format!("Index: {index}, Size: {}", items.len()))
        })
}

fn list_add(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    write(list(this)?).push(argument(arguments, 0));
    Ok(Value::Bool(true))
}

fn list_get_at(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let index = int(&argument(arguments, 0))?;
    let items = read(list(this)?);
    Ok(normalize_index(index, items.len())
        .and_then(|i| items.get(i))
        .cloned()
        .unwrap_or_default())
}

/// Writing past the end pads the list with nulls
fn list_put_at(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let index = int(&argument(arguments, 0))?;
    let mut items = write(list(this)?);
    let position = if index < 0 {
        normalize_index(index, items.len()).ok_or_else(|| {
            RuntimeError::illegal_argument(format!("Index: {index}, Size: {}", items.len()))
        })?
    } else {
        index as usize
    };
    if position >= items.len() {
        items.resize(position + 1, Value::Null);
    }
    items[position] = argument(arguments, 1);
    Ok(Value::Null)
}

fn list_iterator(rt: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Iterator(rt.iterator_of(this)?))
}

fn list_plus(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let mut items = read(list(this)?).clone();
    match argument(arguments, 0) {
        Value::List(other) => items.extend(read(&other).iter().cloned()),
        other => items.push(other),
    }
    Ok(Value::list(items))
}

fn list_contains(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let needle = argument(arguments, 0);
    let items = read(list(this)?).clone();
    for item in &items {
        if rt.values_equal(item, &needle)? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn list_is_empty(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Bool(read(list(this)?).is_empty()))
}

fn list_join(rt: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let separator = argument(arguments, 0);
    let items = read(list(this)?).clone();
    let rendered = items
        .iter()
        .map(|item| rt.to_display_string(item))
        .collect::<RuntimeResult<Vec<_>>>()?;
    Ok(Value::string(rendered.join(text(&separator)?)))
}

fn list_first(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    read(list(this)?)
        .first()
        .cloned()
        .ok_or_else(|| RuntimeError::illegal_state("Cannot access first() element from an empty List"))
}

fn list_last(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    read(list(this)?)
        .last()
        .cloned()
        .ok_or_else(|| RuntimeError::illegal_state("Cannot access last() element from an empty List"))
}

fn list_left_shift(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    write(list(this)?).push(argument(arguments, 0));
    Ok(this.clone())
}

// LinkedHashMap

fn map(value: &Value) -> RuntimeResult<&crate::value::MapRef> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(cast_error(other, names::MAP)),
    }
}

fn map_new(_: &Runtime, _: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::map(Vec::new()))
}

fn map_copy(_: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let source = argument(arguments, 0);
    let entries = read(map(&source)?).clone();
    Ok(Value::Map(Arc::new(std::sync::RwLock::new(entries))))
}

fn map_size(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Int(read(map(this)?).len() as i64))
}

fn map_get(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let key = map_key(argument(arguments, 0));
    Ok(read(map(this)?).get(&key).cloned().unwrap_or_default())
}

/// Returns the previous value
fn map_put(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let key = map_key(argument(arguments, 0));
    Ok(write(map(this)?)
        .insert(key, argument(arguments, 1))
        .unwrap_or_default())
}

fn map_contains_key(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let key = map_key(argument(arguments, 0));
    Ok(Value::Bool(read(map(this)?).contains_key(&key)))
}

fn map_is_empty(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Bool(read(map(this)?).is_empty()))
}

fn map_keys(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::list(read(map(this)?).keys().map(|key| key.0.clone()).collect()))
}

fn map_values(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::list(read(map(this)?).values().cloned().collect()))
}

fn map_remove(_: &Runtime, this: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let key = map_key(argument(arguments, 0));
    Ok(write(map(this)?).shift_remove(&key).unwrap_or_default())
}

// MetaClass

fn meta_handle(value: &Value) -> RuntimeResult<&MetaClassHandle> {
    match value {
        Value::MetaClass(handle) => Ok(handle),
        other => Err(cast_error(other, names::META_CLASS)),
    }
}

fn meta_responds_to(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let name = argument(arguments, 1);
    let meta = rt.meta_class_of(&argument(arguments, 0));
    Ok(Value::Bool(meta.has_method(text(&name)?)))
}

fn meta_has_property(rt: &Runtime, _: &Value, arguments: &[Value]) -> RuntimeResult<Value> {
    let name = argument(arguments, 1);
    let meta = rt.meta_class_of(&argument(arguments, 0));
    Ok(Value::Bool(meta.property(text(&name)?).is_some()))
}

fn meta_the_class(_: &Runtime, this: &Value, _: &[Value]) -> RuntimeResult<Value> {
    Ok(Value::Class(Arc::clone(&meta_handle(this)?.class)))
}
