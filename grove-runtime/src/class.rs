//! Runtime classes
//!
//! A class is either compiled, carrying its decoded [`ClassFile`] and the
//! call-site array wired when it was defined, or native, carrying Rust
//! implementations of its methods. Both kinds share the hierarchy, static
//! storage and the lazy initialisation state.

use crate::callsite::CallSite;
use crate::error::{RuntimeError, RuntimeResult};
use crate::object::Monitor;
use crate::runtime::Runtime;
use crate::value::{lock, read, write, Value};
use grove_compiler::bytecode::{ClassFile, MethodInfo};
use grove_parser::names;
use grove_parser::{ClassKind, Modifiers};
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::{self, ThreadId};

pub type ClassRef = Arc<RuntimeClass>;

/// Receiver first; for static methods the receiver is the class value
pub type NativeFn = fn(&Runtime, &Value, &[Value]) -> RuntimeResult<Value>;

#[derive(Clone, Copy)]
pub struct NativeMethod {
    pub name: &'static str,
    pub parameter_types: &'static [&'static str],
    pub is_static: bool,
    /// Accepts any number of arguments
    pub varargs: bool,
    pub function: NativeFn,
}

impl NativeMethod {
    pub const fn instance(
        name: &'static str,
        parameter_types: &'static [&'static str],
        function: NativeFn,
    ) -> Self {
        Self {
            name,
            parameter_types,
            is_static: false,
            varargs: false,
            function,
        }
    }

    pub const fn class_method(
        name: &'static str,
        parameter_types: &'static [&'static str],
        function: NativeFn,
    ) -> Self {
        Self {
            name,
            parameter_types,
            is_static: true,
            varargs: false,
            function,
        }
    }

    pub const fn varargs(name: &'static str, function: NativeFn) -> Self {
        Self {
            name,
            parameter_types: &[],
            is_static: false,
            varargs: true,
            function,
        }
    }
}

impl fmt::Debug for NativeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameter_types.join(", "))
    }
}

pub enum ClassBody {
    Compiled {
        file: ClassFile,
        sites: Vec<CallSite>,
    },
    Native {
        methods: Vec<NativeMethod>,
        /// Instance fields every object of the class carries
        fields: &'static [&'static str],
        /// Instances are plain values (lists, strings, ...) rather than objects
        value_backed: bool,
    },
}

pub struct RuntimeClass {
    pub name: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub super_class: Option<ClassRef>,
    pub interfaces: Vec<ClassRef>,
    body: ClassBody,
    statics: RwLock<IndexMap<String, Value>>,
    pub(crate) init: InitCell,
    pub(crate) monitor: Monitor,
}

impl RuntimeClass {
    pub fn compiled(file: ClassFile, super_class: Option<ClassRef>, interfaces: Vec<ClassRef>) -> Self {
        let sites = file
            .call_sites
            .iter()
            .map(|site| CallSite::new(site.kind, &site.name, &file.name))
            .collect();
        let statics = file
            .fields
            .iter()
            .filter(|field| field.is_static())
            .map(|field| (field.name.clone(), default_value(&field.type_name)))
            .collect();
        let has_initializer = file.method(names::STATIC_INIT, 0).is_some();
        Self {
            name: file.name.clone(),
            kind: file.kind,
            modifiers: file.modifiers(),
            super_class,
            interfaces,
            body: ClassBody::Compiled { file, sites },
            statics: RwLock::new(statics),
            init: InitCell::new(has_initializer),
            monitor: Monitor::default(),
        }
    }

    pub fn native(
        name: &str,
        kind: ClassKind,
        modifiers: Modifiers,
        super_class: Option<ClassRef>,
        interfaces: Vec<ClassRef>,
        body: ClassBody,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
            modifiers,
            super_class,
            interfaces,
            body,
            statics: RwLock::new(IndexMap::new()),
            init: InitCell::new(false),
            monitor: Monitor::default(),
        }
    }

    pub fn simple_name(&self) -> &str {
        names::simple_name(&self.name)
    }

    pub fn file(&self) -> Option<&ClassFile> {
        match &self.body {
            ClassBody::Compiled { file, .. } => Some(file),
            ClassBody::Native { .. } => None,
        }
    }

    pub fn sites(&self) -> &[CallSite] {
        match &self.body {
            ClassBody::Compiled { sites, .. } => sites,
            ClassBody::Native { .. } => &[],
        }
    }

    pub fn natives(&self) -> &[NativeMethod] {
        match &self.body {
            ClassBody::Native { methods, .. } => methods,
            ClassBody::Compiled { .. } => &[],
        }
    }

    pub fn method_at(&self, index: usize) -> Option<&MethodInfo> {
        self.file().and_then(|file| file.methods.get(index))
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, ClassBody::Native { .. })
    }

    pub fn is_value_backed(&self) -> bool {
        matches!(self.body, ClassBody::Native { value_backed: true, .. })
    }

    pub fn is_interface(&self) -> bool {
        self.kind.is_interface()
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.is_abstract() || self.is_interface()
    }

    /// Steps from this class up to `target`, through superclasses and interfaces
    pub fn distance_to(&self, target: &str) -> Option<u32> {
        if self.name == target {
            return Some(0);
        }
        let via_super = self
            .super_class
            .as_ref()
            .and_then(|parent| parent.distance_to(target));
        let via_interfaces = self
            .interfaces
            .iter()
            .filter_map(|interface| interface.distance_to(target))
            .min();
        match (via_super, via_interfaces) {
            (Some(a), Some(b)) => Some(a.min(b) + 1),
            (Some(d), None) | (None, Some(d)) => Some(d + 1),
            (None, None) => None,
        }
    }

    pub fn is_assignable_to(&self, target: &str) -> bool {
        target == names::OBJECT || target == names::DYNAMIC || self.distance_to(target).is_some()
    }

    /// Superclass chain ending in this class, root first
    pub fn lineage(self: &Arc<Self>) -> Vec<ClassRef> {
        let mut chain = vec![Arc::clone(self)];
        let mut current = self.super_class.clone();
        while let Some(class) = current {
            current = class.super_class.clone();
            chain.push(class);
        }
        chain.reverse();
        chain
    }

    /// Fresh instance fields for every class in the lineage
    pub fn field_defaults(self: &Arc<Self>) -> IndexMap<String, Value> {
        let mut fields = IndexMap::new();
        for class in self.lineage() {
            match &class.body {
                ClassBody::Compiled { file, .. } => {
                    for field in file.fields.iter().filter(|f| !f.is_static()) {
                        fields.insert(field.name.clone(), default_value(&field.type_name));
                    }
                }
                ClassBody::Native { fields: names, .. } => {
                    for name in names.iter() {
                        fields.insert(name.to_string(), Value::Null);
                    }
                }
            }
        }
        fields
    }

    pub fn has_static(&self, name: &str) -> bool {
        read(&self.statics).contains_key(name)
    }

    pub fn static_value(&self, name: &str) -> Option<Value> {
        read(&self.statics).get(name).cloned()
    }

    pub fn set_static(&self, name: &str, value: Value) {
        write(&self.statics).insert(name.to_string(), value);
    }

    pub fn is_initialized(&self) -> bool {
        self.init.is_done()
    }
}

impl fmt::Debug for RuntimeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeClass")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("native", &self.is_native())
            .finish()
    }
}

/// Zero value of a field of the given type
pub fn default_value(type_name: &str) -> Value {
    match type_name {
        names::INT => Value::Int(0),
        names::PRIMITIVE_BOOLEAN => Value::Bool(false),
        names::DOUBLE => Value::Float(0.0),
        _ => Value::Null,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum InitState {
    Pending,
    Running(ThreadId),
    Done,
    Failed(String),
}

/// Progress of a class's static initializer
///
/// The thread running the initializer may re-enter freely; other threads
/// block until it finishes.
pub(crate) struct InitCell {
    state: Mutex<InitState>,
    changed: Condvar,
}

impl InitCell {
    fn new(has_initializer: bool) -> Self {
        let state = if has_initializer {
            InitState::Pending
        } else {
            InitState::Done
        };
        Self {
            state: Mutex::new(state),
            changed: Condvar::new(),
        }
    }

    /// Whether the caller has to run the initializer now
    pub(crate) fn claim(&self, class: &str) -> RuntimeResult<bool> {
        let me = thread::current().id();
        let mut state = lock(&self.state);
        loop {
            let current = state.clone();
            match current {
                InitState::Done => return Ok(false),
                InitState::Running(thread) if thread == me => return Ok(false),
                InitState::Failed(reason) => {
                    return Err(RuntimeError::Initialization {
                        class: class.to_string(),
                        reason,
                    });
                }
                InitState::Pending => {
                    *state = InitState::Running(me);
                    return Ok(true);
                }
                InitState::Running(_) => {
                    state = self
                        .changed
                        .wait(state)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }

    pub(crate) fn finish(&self, outcome: Result<(), String>) {
        *lock(&self.state) = match outcome {
            Ok(()) => InitState::Done,
            Err(reason) => InitState::Failed(reason),
        };
        self.changed.notify_all();
    }

    fn is_done(&self) -> bool {
        *lock(&self.state) == InitState::Done
    }
}
