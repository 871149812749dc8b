//! Class path: the catalogue of built-in classes and source lookup on disk
//!
//! Built-in classes are described by [`ExternalClass`] records; the runtime
//! supplies their behaviour. Classes that nothing else defines are looked up
//! as sources under the configured roots.

use grove_parser::names;
use grove_parser::{ClassKind, ClassTable, ExternalClass, ExternalMethod, Modifier, Modifiers};
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};

pub const INVOKER_HELPER: &str = "grove.lang.InvokerHelper";
pub const CLASS: &str = "grove.lang.Class";
pub const NUMBER: &str = "grove.lang.Number";
pub const COMPARABLE: &str = "grove.lang.Comparable";
pub const RUNNABLE: &str = "grove.lang.Runnable";
pub const ILLEGAL_ARGUMENT: &str = "grove.lang.IllegalArgumentException";
pub const ILLEGAL_STATE: &str = "grove.lang.IllegalStateException";
pub const MISSING_METHOD: &str = "grove.lang.MissingMethodException";
pub const MISSING_PROPERTY: &str = "grove.lang.MissingPropertyException";
pub const NULL_POINTER: &str = "grove.lang.NullPointerException";
pub const ARITHMETIC: &str = "grove.lang.ArithmeticException";
pub const CLASS_CAST: &str = "grove.lang.ClassCastException";
pub const ARRAY_LIST: &str = "grove.util.ArrayList";
pub const LINKED_HASH_MAP: &str = "grove.util.LinkedHashMap";
pub const ITERATOR: &str = "grove.util.Iterator";

lazy_static! {
    static ref CATALOGUE: Vec<ExternalClass> = build_catalogue();
}

/// Every built-in class, supertypes before subtypes
pub fn catalogue() -> &'static [ExternalClass] {
    &CATALOGUE
}

pub fn catalogue_class(name: &str) -> Option<&'static ExternalClass> {
    CATALOGUE.iter().find(|c| c.name == name)
}

/// Registers the whole catalogue with a class table
pub fn install(table: &mut ClassTable) {
    for class in catalogue() {
        table.add_external(class.clone());
    }
}

/// Source file that should define `qualified_name` under one of `roots`
pub fn find_source(roots: &[PathBuf], qualified_name: &str, extension: &str) -> Option<PathBuf> {
    let relative = source_path(qualified_name, extension);
    roots
        .iter()
        .map(|root| root.join(&relative))
        .find(|candidate| candidate.is_file())
}

/// `a.b.C` -> `a/b/C.<extension>`
pub fn source_path(qualified_name: &str, extension: &str) -> PathBuf {
    let mut path: PathBuf = qualified_name.split('.').collect();
    path.set_extension(extension);
    path
}

/// Whether `path` names a file with the script extension
pub fn is_source_file(path: &Path, extension: &str) -> bool {
    path.extension().is_some_and(|e| e == extension)
}

struct Builder {
    class: ExternalClass,
}

impl Builder {
    fn class(name: &str, super_class: Option<&str>) -> Self {
        Self {
            class: ExternalClass {
                name: name.to_string(),
                kind: ClassKind::Class,
                modifiers: Modifiers::of(&[Modifier::Public]),
                super_class: super_class.map(str::to_string),
                interfaces: Vec::new(),
                generics: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    fn interface(name: &str) -> Self {
        let mut builder = Self::class(name, None);
        builder.class.kind = ClassKind::Interface;
        builder.class.modifiers.insert(Modifier::Abstract);
        builder
    }

    fn modifier(mut self, modifier: Modifier) -> Self {
        self.class.modifiers.insert(modifier);
        self
    }

    fn implements(mut self, interface: &str) -> Self {
        self.class.interfaces.push(interface.to_string());
        self
    }

    fn generics(mut self, names: &[&str]) -> Self {
        self.class.generics = names.iter().map(|n| n.to_string()).collect();
        self
    }

    fn method(self, name: &str, parameters: &[&str], return_type: &str) -> Self {
        self.method_with(name, parameters, return_type, &[Modifier::Public])
    }

    fn abstract_method(self, name: &str, parameters: &[&str], return_type: &str) -> Self {
        self.method_with(name, parameters, return_type, &[Modifier::Public, Modifier::Abstract])
    }

    fn static_method(self, name: &str, parameters: &[&str], return_type: &str) -> Self {
        self.method_with(name, parameters, return_type, &[Modifier::Public, Modifier::Static])
    }

    fn method_with(
        mut self,
        name: &str,
        parameters: &[&str],
        return_type: &str,
        modifiers: &[Modifier],
    ) -> Self {
        self.class.methods.push(ExternalMethod {
            name: name.to_string(),
            parameter_types: parameters.iter().map(|p| p.to_string()).collect(),
            return_type: return_type.to_string(),
            modifiers: Modifiers::of(modifiers),
        });
        self
    }

    fn build(self) -> ExternalClass {
        self.class
    }
}

fn build_catalogue() -> Vec<ExternalClass> {
    use names::*;

    let primitives = [INT, PRIMITIVE_BOOLEAN, DOUBLE, VOID]
        .into_iter()
        .map(|p| Builder::class(p, None).modifier(Modifier::Final).build());

    let throwable = |name: &str, parent: &str| Builder::class(name, Some(parent)).build();

    let mut classes: Vec<ExternalClass> = primitives.collect();
    classes.extend([
        Builder::class(OBJECT, None)
            .method("toString", &[], STRING)
            .method("equals", &[OBJECT], PRIMITIVE_BOOLEAN)
            .method("hashCode", &[], INT)
            .method("getClass", &[], CLASS)
            .build(),
        Builder::interface(GROVE_OBJECT)
            .abstract_method("getMetaClass", &[], META_CLASS)
            .abstract_method("setMetaClass", &[META_CLASS], VOID)
            .abstract_method("invokeMethod", &[STRING, OBJECT], OBJECT)
            .abstract_method("getProperty", &[STRING], OBJECT)
            .abstract_method("setProperty", &[STRING, OBJECT], VOID)
            .build(),
        Builder::interface(META_CLASS).build(),
        Builder::interface(COMPARABLE)
            .generics(&["T"])
            .abstract_method("compareTo", &["T"], INT)
            .build(),
        Builder::interface(RUNNABLE)
            .abstract_method("run", &[], VOID)
            .build(),
        Builder::class(CLASS, Some(OBJECT))
            .modifier(Modifier::Final)
            .method("getName", &[], STRING)
            .method("getSimpleName", &[], STRING)
            .build(),
        Builder::class(STRING, Some(OBJECT))
            .modifier(Modifier::Final)
            .implements(COMPARABLE)
            .method("size", &[], INT)
            .method("length", &[], INT)
            .method("toUpperCase", &[], STRING)
            .method("toLowerCase", &[], STRING)
            .method("compareTo", &[OBJECT], INT)
            .build(),
        Builder::class(GSTRING, Some(OBJECT))
            .method("toString", &[], STRING)
            .build(),
        Builder::class(NUMBER, Some(OBJECT))
            .modifier(Modifier::Abstract)
            .implements(COMPARABLE)
            .method("compareTo", &[OBJECT], INT)
            .build(),
        Builder::class(INTEGER, Some(NUMBER))
            .modifier(Modifier::Final)
            .build(),
        Builder::class(FLOAT, Some(NUMBER)).modifier(Modifier::Final).build(),
        Builder::class(BOOLEAN, Some(OBJECT))
            .modifier(Modifier::Final)
            .build(),
        Builder::class(CLOSURE, Some(OBJECT))
            .modifier(Modifier::Abstract)
            .implements(RUNNABLE)
            .method("call", &[], OBJECT)
            .method("run", &[], VOID)
            .method("getOwner", &[], OBJECT)
            .build(),
        Builder::class(SCRIPT, Some(OBJECT))
            .modifier(Modifier::Abstract)
            .abstract_method("run", &[], OBJECT)
            .method("getBinding", &[], MAP)
            .build(),
        Builder::class(ENUM, Some(OBJECT))
            .modifier(Modifier::Abstract)
            .implements(COMPARABLE)
            .method("compareTo", &[OBJECT], INT)
            .build(),
        Builder::class(THROWABLE, Some(OBJECT))
            .method("getMessage", &[], STRING)
            .method("getCause", &[], THROWABLE)
            .build(),
        throwable(EXCEPTION, THROWABLE),
        throwable(RUNTIME_EXCEPTION, EXCEPTION),
        throwable(ILLEGAL_ARGUMENT, RUNTIME_EXCEPTION),
        throwable(ILLEGAL_STATE, RUNTIME_EXCEPTION),
        throwable(NULL_POINTER, RUNTIME_EXCEPTION),
        throwable(ARITHMETIC, RUNTIME_EXCEPTION),
        throwable(CLASS_CAST, RUNTIME_EXCEPTION),
        throwable(MISSING_METHOD, RUNTIME_EXCEPTION),
        throwable(MISSING_PROPERTY, RUNTIME_EXCEPTION),
        Builder::class(INVOKER_HELPER, Some(OBJECT))
            .modifier(Modifier::Final)
            .static_method("getMetaClass", &[OBJECT], META_CLASS)
            .static_method("setMetaClass", &[OBJECT, META_CLASS], VOID)
            .static_method("invokeMethod", &[OBJECT, STRING, OBJECT], OBJECT)
            .static_method("getProperty", &[OBJECT, STRING], OBJECT)
            .static_method("setProperty", &[OBJECT, STRING, OBJECT], VOID)
            .static_method("getClassInfo", &[CLASS], OBJECT)
            .static_method("getStaticMetaClass", &[OBJECT], META_CLASS)
            .build(),
        Builder::interface(ITERATOR)
            .abstract_method("hasNext", &[], PRIMITIVE_BOOLEAN)
            .abstract_method("next", &[], OBJECT)
            .build(),
        Builder::interface(LIST)
            .generics(&["E"])
            .abstract_method("size", &[], INT)
            .abstract_method("get", &[INT], "E")
            .abstract_method("add", &["E"], PRIMITIVE_BOOLEAN)
            .abstract_method("iterator", &[], ITERATOR)
            .build(),
        Builder::class(ARRAY_LIST, Some(OBJECT))
            .generics(&["E"])
            .implements(LIST)
            .method("size", &[], INT)
            .method("get", &[INT], "E")
            .method("add", &["E"], PRIMITIVE_BOOLEAN)
            .method("iterator", &[], ITERATOR)
            .build(),
        Builder::interface(MAP)
            .generics(&["K", "V"])
            .abstract_method("size", &[], INT)
            .abstract_method("get", &[OBJECT], "V")
            .abstract_method("put", &["K", "V"], "V")
            .build(),
        Builder::class(LINKED_HASH_MAP, Some(OBJECT))
            .generics(&["K", "V"])
            .implements(MAP)
            .method("size", &[], INT)
            .method("get", &[OBJECT], "V")
            .method("put", &["K", "V"], "V")
            .build(),
    ]);
    classes
}
