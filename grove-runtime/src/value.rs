//! Runtime values
//!
//! Scalars are held inline; lists, maps, objects and closures are shared
//! references so that every copy observes mutation, as Grove code expects.
//! All shared state is behind `Arc` and `RwLock`/`Mutex`, so values move
//! freely between threads.

use crate::class::ClassRef;
use crate::meta::MetaClassHandle;
use crate::object::ObjectRef;
use crate::registry::ClassInfo;
use grove_compiler::classpath;
use grove_parser::names;
use indexmap::IndexMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, RwLock};

pub type ListRef = Arc<RwLock<Vec<Value>>>;
pub type MapRef = Arc<RwLock<IndexMap<MapKey, Value>>>;
/// Shared cell backing a closure-captured variable
pub type Reference = Arc<RwLock<Value>>;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    GString(Arc<GStringValue>),
    List(ListRef),
    Map(MapRef),
    Object(ObjectRef),
    Class(ClassRef),
    Closure(Arc<Closure>),
    MetaClass(MetaClassHandle),
    Iterator(Arc<Mutex<ValueIterator>>),
    Ref(Reference),
    ClassInfo(Arc<ClassInfo>),
}

impl Value {
    pub fn string(text: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(text.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(RwLock::new(items)))
    }

    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(key, value)| (MapKey(key), value))
            .collect();
        Value::Map(Arc::new(RwLock::new(map)))
    }

    pub fn reference(value: Value) -> Self {
        Value::Ref(Arc::new(RwLock::new(value)))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Qualified name of the value's runtime class
    pub fn class_name(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(_) => names::BOOLEAN.to_string(),
            Value::Int(_) => names::INTEGER.to_string(),
            Value::Float(_) => names::FLOAT.to_string(),
            Value::Str(_) => names::STRING.to_string(),
            Value::GString(_) => names::GSTRING.to_string(),
            Value::List(_) => classpath::ARRAY_LIST.to_string(),
            Value::Map(_) => classpath::LINKED_HASH_MAP.to_string(),
            Value::Object(object) => object.class.name.clone(),
            Value::Class(_) => classpath::CLASS.to_string(),
            Value::Closure(closure) => closure.class.name.clone(),
            Value::MetaClass(_) => names::META_CLASS.to_string(),
            Value::Iterator(_) => classpath::ITERATOR.to_string(),
            Value::Ref(cell) => read(cell).class_name(),
            Value::ClassInfo(_) => names::OBJECT.to_string(),
        }
    }

    /// Grove truth: null, false, zero and empty things are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::GString(g) => !g.text.is_empty(),
            Value::List(items) => !read(items).is_empty(),
            Value::Map(map) => !read(map).is_empty(),
            Value::Iterator(iterator) => match iterator.lock() {
                Ok(iterator) => iterator.has_next(),
                Err(poisoned) => poisoned.into_inner().has_next(),
            },
            Value::Ref(cell) => read(cell).is_truthy(),
            Value::Object(_)
            | Value::Class(_)
            | Value::Closure(_)
            | Value::MetaClass(_)
            | Value::ClassInfo(_) => true,
        }
    }

    /// Text of a string or GString
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::GString(g) => Some(&g.text),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Address of the shared allocation for reference values
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(Arc::as_ptr(items) as *const () as usize),
            Value::Map(map) => Some(Arc::as_ptr(map) as *const () as usize),
            Value::Object(object) => Some(Arc::as_ptr(object) as *const () as usize),
            Value::Class(class) => Some(Arc::as_ptr(class) as *const () as usize),
            Value::Closure(closure) => Some(Arc::as_ptr(closure) as *const () as usize),
            Value::Iterator(iterator) => Some(Arc::as_ptr(iterator) as *const () as usize),
            Value::Ref(cell) => Some(Arc::as_ptr(cell) as *const () as usize),
            Value::ClassInfo(info) => Some(Arc::as_ptr(info) as *const () as usize),
            _ => None,
        }
    }

    /// Rendering that needs no dispatch; objects show their identity
    pub fn to_plain_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(x) => format_float(*x),
            Value::Str(s) => s.to_string(),
            Value::GString(g) => g.text.to_string(),
            Value::List(items) => {
                let items: Vec<String> = read(items).iter().map(Value::to_plain_string).collect();
                format!("[{}]", items.join(", "))
            }
            Value::Map(map) => format_map(&read(map), Value::to_plain_string),
            Value::Class(class) => format!("class {}", class.name),
            Value::MetaClass(handle) => format!("MetaClass[{}]", handle.class.name),
            Value::Ref(cell) => read(cell).to_plain_string(),
            Value::Object(_)
            | Value::Closure(_)
            | Value::Iterator(_)
            | Value::ClassInfo(_) => {
                format!("{}@{:x}", self.class_name(), self.identity().unwrap_or_default())
            }
        }
    }
}

/// Structural equality for scalars, collections compared element-wise,
/// identity for everything else
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_float() == other.as_float()
            }
            (
                Value::Str(_) | Value::GString(_),
                Value::Str(_) | Value::GString(_),
            ) => self.as_str() == other.as_str(),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b) || *read(a) == *read(b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || *read(a) == *read(b),
            (Value::MetaClass(a), Value::MetaClass(b)) => Arc::ptr_eq(&a.class, &b.class),
            (Value::Ref(a), _) => *read(a) == *other,
            (_, Value::Ref(b)) => *self == *read(b),
            _ => match (self.identity(), other.identity()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

/// `1.0` prints with its fraction, like the rest of the Grove world
pub fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{x:.1}")
    } else {
        x.to_string()
    }
}

pub fn format_map(map: &IndexMap<MapKey, Value>, render: impl Fn(&Value) -> String) -> String {
    if map.is_empty() {
        return "[:]".to_string();
    }
    let entries: Vec<String> = map
        .iter()
        .map(|(key, value)| format!("{}:{}", render(&key.0), render(value)))
        .collect();
    format!("[{}]", entries.join(", "))
}

/// Reads a lock, recovering the data if a panicking thread poisoned it
pub fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An interpolated string, rendered when it is created
#[derive(Debug)]
pub struct GStringValue {
    pub strings: Vec<String>,
    pub values: Vec<Value>,
    pub text: String,
}

/// Map key: strings and GStrings with the same text are the same key,
/// reference values are keyed by identity
#[derive(Debug, Clone)]
pub struct MapKey(pub Value);

impl MapKey {
    pub fn string(text: &str) -> Self {
        MapKey(Value::string(text))
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => false,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (a, b) => a == b,
        }
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(x) => x.to_bits().hash(state),
            Value::Str(_) | Value::GString(_) => self.0.as_str().hash(state),
            Value::MetaClass(handle) => handle.class.name.hash(state),
            Value::Ref(cell) => MapKey(read(cell).clone()).hash(state),
            other => other.identity().hash(state),
        }
    }
}

/// Instance of a compiled closure class
pub struct Closure {
    pub class: ClassRef,
    /// `this` of the code that created the closure
    pub owner: Value,
    /// Reference cells, in the order of the class's captured names
    pub captured: Vec<Value>,
}

impl Closure {
    /// Parameters of the closure's widest `doCall`
    pub fn parameter_count(&self) -> usize {
        self.class
            .file()
            .map(|file| {
                file.methods
                    .iter()
                    .filter(|m| m.name == crate::interpreter::DO_CALL)
                    .map(|m| m.parameter_types.len())
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("class", &self.class.name)
            .field("captured", &self.captured.len())
            .finish()
    }
}

/// State of a `for` loop or an iterator handed to Grove code
#[derive(Debug)]
pub enum ValueIterator {
    Items { items: Vec<Value>, next: usize },
    /// An object answering `hasNext()` and `next()`
    Object(ObjectRef),
}

impl ValueIterator {
    pub fn items(items: Vec<Value>) -> Self {
        ValueIterator::Items { items, next: 0 }
    }

    /// Only meaningful for item iterators; object iterators need dispatch
    pub fn has_next(&self) -> bool {
        match self {
            ValueIterator::Items { items, next } => *next < items.len(),
            ValueIterator::Object(_) => true,
        }
    }
}
