//! Meta classes, meta methods and meta properties
//!
//! A [`MetaClass`] is the dispatch table of one runtime class: every method
//! reachable on its instances (own, inherited, default methods, mixed-in and
//! expando methods), its constructors and its properties. It is immutable;
//! adding an expando method or a mixin builds a new meta class with a new
//! version, which is how call sites notice the change.

use crate::class::{ClassRef, NativeFn, NativeMethod};
use crate::object::ObjectRef;
use crate::value::Closure;
use grove_compiler::bytecode::MethodInfo;
use grove_parser::names;
use indexmap::IndexMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone)]
pub struct MetaMethod {
    pub name: String,
    pub declaring_class: ClassRef,
    pub parameter_types: Vec<String>,
    pub is_static: bool,
    pub varargs: bool,
    pub kind: MetaMethodKind,
}

#[derive(Clone)]
pub enum MetaMethodKind {
    /// Index into the declaring class's method table
    Compiled(usize),
    Native(NativeFn),
    /// Expando method; the closure runs with the receiver as its owner
    Closure(Arc<Closure>),
    /// Runs `target` on the receiver's instance of the mixin class
    Mixin { mixin: ClassRef, target: Box<MetaMethod> },
    /// Static category method taking the receiver as its first argument
    Category {
        self_type: String,
        target: Box<MetaMethod>,
    },
}

impl MetaMethod {
    pub fn compiled(class: &ClassRef, index: usize, info: &MethodInfo) -> Self {
        Self {
            name: info.name.clone(),
            declaring_class: Arc::clone(class),
            parameter_types: info.parameter_types.clone(),
            is_static: info.is_static(),
            varargs: false,
            kind: MetaMethodKind::Compiled(index),
        }
    }

    pub fn native(class: &ClassRef, native: &NativeMethod) -> Self {
        Self {
            name: native.name.to_string(),
            declaring_class: Arc::clone(class),
            parameter_types: native.parameter_types.iter().map(|p| p.to_string()).collect(),
            is_static: native.is_static,
            varargs: native.varargs,
            kind: MetaMethodKind::Native(native.function),
        }
    }

    /// Method backed by a closure assigned through a meta class
    pub fn expando(class: &ClassRef, name: &str, closure: Arc<Closure>) -> Self {
        let arity = closure.parameter_count();
        Self {
            name: name.to_string(),
            declaring_class: Arc::clone(class),
            parameter_types: vec![names::OBJECT.to_string(); arity],
            is_static: false,
            varargs: false,
            kind: MetaMethodKind::Closure(closure),
        }
    }

    pub fn mixin(mixin: &ClassRef, target: MetaMethod) -> Self {
        Self {
            name: target.name.clone(),
            declaring_class: Arc::clone(mixin),
            parameter_types: target.parameter_types.clone(),
            is_static: false,
            varargs: target.varargs,
            kind: MetaMethodKind::Mixin {
                mixin: Arc::clone(mixin),
                target: Box::new(target),
            },
        }
    }

    /// Category view of a static method; `None` when it takes no receiver
    pub fn category(target: MetaMethod) -> Option<Self> {
        let (self_type, rest) = target.parameter_types.split_first()?;
        Some(Self {
            name: target.name.clone(),
            declaring_class: Arc::clone(&target.declaring_class),
            parameter_types: rest.to_vec(),
            is_static: false,
            varargs: false,
            kind: MetaMethodKind::Category {
                self_type: self_type.clone(),
                target: Box::new(target.clone()),
            },
        })
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    pub fn same_signature(&self, other: &MetaMethod) -> bool {
        self.name == other.name && self.parameter_types == other.parameter_types
    }

    /// `String, int`, as shown in selection errors
    pub fn describe_parameters(&self) -> String {
        if self.varargs {
            return "Object...".to_string();
        }
        self.parameter_types
            .iter()
            .map(|p| names::simple_name(p))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Debug for MetaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            MetaMethodKind::Compiled(_) => "compiled",
            MetaMethodKind::Native(_) => "native",
            MetaMethodKind::Closure(_) => "expando",
            MetaMethodKind::Mixin { .. } => "mixin",
            MetaMethodKind::Category { .. } => "category",
        };
        write!(
            f,
            "{}.{}({}) [{kind}]",
            self.declaring_class.name,
            self.name,
            self.describe_parameters()
        )
    }
}

#[derive(Debug, Clone)]
pub struct FieldSlot {
    pub owner: ClassRef,
    pub is_static: bool,
    pub is_final: bool,
}

#[derive(Debug, Clone)]
pub struct MetaProperty {
    pub name: String,
    pub getter: Option<MetaMethod>,
    pub setter: Option<MetaMethod>,
    pub field: Option<FieldSlot>,
}

impl MetaProperty {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            getter: None,
            setter: None,
            field: None,
        }
    }

    pub fn is_static(&self) -> bool {
        match (&self.getter, &self.field) {
            (Some(getter), _) => getter.is_static,
            (None, Some(field)) => field.is_static,
            (None, None) => self.setter.as_ref().is_some_and(|s| s.is_static),
        }
    }
}

/// Per-class additions layered over the compiled and native members
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    pub mixins: Vec<ClassRef>,
    pub methods: Vec<(String, Arc<Closure>)>,
}

impl Extensions {
    pub fn is_empty(&self) -> bool {
        self.mixins.is_empty() && self.methods.is_empty()
    }
}

#[derive(Clone)]
pub struct MetaClass {
    class: ClassRef,
    version: u64,
    methods: IndexMap<String, Vec<MetaMethod>>,
    constructors: Vec<MetaMethod>,
    properties: IndexMap<String, MetaProperty>,
    mixins: Vec<ClassRef>,
}

impl MetaClass {
    /// Members of `class` and its superclasses, each class's extensions
    /// applied right after its own members
    pub fn build(class: &ClassRef, extensions: impl Fn(&ClassRef) -> Extensions) -> Self {
        let mut meta = Self {
            class: Arc::clone(class),
            version: next_version(),
            methods: IndexMap::new(),
            constructors: Vec::new(),
            properties: IndexMap::new(),
            mixins: Vec::new(),
        };
        for ancestor in class.lineage() {
            meta.add_class_members(&ancestor);
            meta.apply(&ancestor, &extensions(&ancestor));
        }
        meta.constructors = constructors_of(class);
        meta.index_accessors();
        tracing::trace!(class = %class.name, version = meta.version, "built meta class");
        meta
    }

    /// Copy with more mixins or expando methods, under a new version
    pub fn extended(&self, extensions: &Extensions) -> Self {
        let mut meta = self.clone();
        meta.version = next_version();
        let class = Arc::clone(&meta.class);
        meta.apply(&class, extensions);
        meta.index_accessors();
        meta
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn methods(&self, name: &str) -> &[MetaMethod] {
        self.methods.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_method(&self, name: &str) -> bool {
        !self.methods(name).is_empty()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn constructors(&self) -> &[MetaMethod] {
        &self.constructors
    }

    pub fn property(&self, name: &str) -> Option<&MetaProperty> {
        self.properties.get(name)
    }

    pub fn mixins(&self) -> &[ClassRef] {
        &self.mixins
    }

    fn add_class_members(&mut self, class: &ClassRef) {
        for native in class.natives().iter().filter(|n| n.name != names::CONSTRUCTOR) {
            self.insert_method(MetaMethod::native(class, native));
        }
        let Some(file) = class.file() else {
            return;
        };
        for (index, info) in file.methods.iter().enumerate() {
            if info.name == names::CONSTRUCTOR || info.name == names::STATIC_INIT || info.is_abstract() {
                continue;
            }
            self.insert_method(MetaMethod::compiled(class, index, info));
        }
        for field in &file.fields {
            let property = self
                .properties
                .entry(field.name.clone())
                .or_insert_with(|| MetaProperty::new(&field.name));
            property.field = Some(FieldSlot {
                owner: Arc::clone(class),
                is_static: field.is_static(),
                is_final: grove_parser::Modifiers::from_bits(field.flags & 0xff).is_final(),
            });
        }
    }

    fn apply(&mut self, class: &ClassRef, extensions: &Extensions) {
        for mixin in &extensions.mixins {
            for method in mixin_methods(mixin) {
                self.insert_method(method);
            }
            if !self.mixins.iter().any(|m| Arc::ptr_eq(m, mixin)) {
                self.mixins.push(Arc::clone(mixin));
            }
        }
        for (name, closure) in &extensions.methods {
            self.insert_method(MetaMethod::expando(class, name, Arc::clone(closure)));
        }
    }

    /// Adds `method`, replacing one with the same signature
    fn insert_method(&mut self, method: MetaMethod) {
        let overloads = self.methods.entry(method.name.clone()).or_default();
        match overloads.iter_mut().find(|m| m.same_signature(&method)) {
            Some(existing) => *existing = method,
            None => overloads.push(method),
        }
    }

    /// Getters and setters become properties, next to the fields
    fn index_accessors(&mut self) {
        for property in self.properties.values_mut() {
            property.getter = None;
            property.setter = None;
        }
        let accessors: Vec<(String, bool, MetaMethod)> = self
            .methods
            .values()
            .flatten()
            .filter(|m| !m.varargs)
            .filter_map(|method| {
                accessor_property(&method.name, method.arity())
                    .map(|(property, is_getter)| (property, is_getter, method.clone()))
            })
            .collect();
        for (name, is_getter, method) in accessors {
            let property = self
                .properties
                .entry(name.clone())
                .or_insert_with(|| MetaProperty::new(&name));
            if is_getter {
                // getX wins over isX
                let keep = property
                    .getter
                    .as_ref()
                    .is_some_and(|g| g.name.starts_with("get") && method.name.starts_with("is"));
                if !keep {
                    property.getter = Some(method);
                }
            } else {
                property.setter = Some(method);
            }
        }
    }
}

impl fmt::Debug for MetaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaClass")
            .field("class", &self.class.name)
            .field("version", &self.version)
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// `getName`/`isName` with no parameters, `setName` with one
fn accessor_property(method: &str, arity: usize) -> Option<(String, bool)> {
    let (rest, is_getter) = if arity == 0 {
        if let Some(rest) = method.strip_prefix("get") {
            (rest, true)
        } else {
            (method.strip_prefix("is")?, true)
        }
    } else if arity == 1 {
        (method.strip_prefix("set")?, false)
    } else {
        return None;
    };
    if !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    Some((decapitalize(rest), is_getter))
}

/// `Name` -> `name`, but `URL` stays `URL`
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => {
            name.to_string()
        }
        (Some(first), _) => first.to_lowercase().chain(name.chars().skip(1)).collect(),
        (None, _) => String::new(),
    }
}

fn constructors_of(class: &ClassRef) -> Vec<MetaMethod> {
    let natives = class
        .natives()
        .iter()
        .filter(|n| n.name == names::CONSTRUCTOR)
        .map(|n| MetaMethod::native(class, n));
    let compiled = class.file().into_iter().flat_map(|file| {
        file.methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == names::CONSTRUCTOR)
            .map(|(index, info)| MetaMethod::compiled(class, index, info))
    });
    natives.chain(compiled).collect()
}

/// Instance methods a mixin contributes: its own and its superclasses',
/// short of `grove.lang.Object`
fn mixin_methods(mixin: &ClassRef) -> Vec<MetaMethod> {
    let mut methods: Vec<MetaMethod> = Vec::new();
    for class in mixin.lineage().iter().filter(|c| c.name != names::OBJECT) {
        let Some(file) = class.file() else {
            continue;
        };
        for (index, info) in file.methods.iter().enumerate() {
            if info.is_static()
                || info.is_abstract()
                || info.is_synthetic()
                || info.name == names::CONSTRUCTOR
                || info.name == names::STATIC_INIT
            {
                continue;
            }
            let method = MetaMethod::mixin(mixin, MetaMethod::compiled(class, index, info));
            match methods.iter_mut().find(|m| m.same_signature(&method)) {
                Some(existing) => *existing = method,
                None => methods.push(method),
            }
        }
    }
    methods
}

/// A meta class as a Grove value: `Foo.metaClass` or `foo.metaClass`
#[derive(Clone)]
pub struct MetaClassHandle {
    pub class: ClassRef,
    /// Set when the handle stands for one object's meta class
    pub instance: Option<ObjectRef>,
    pub meta: Arc<MetaClass>,
}

impl fmt::Debug for MetaClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetaClassHandle")
            .field("class", &self.class.name)
            .field("per_instance", &self.instance.is_some())
            .finish()
    }
}
