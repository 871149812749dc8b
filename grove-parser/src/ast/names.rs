//! Fully qualified names the toolchain refers to directly.

pub const OBJECT: &str = "grove.lang.Object";
pub const STRING: &str = "grove.lang.String";
pub const GSTRING: &str = "grove.lang.GString";
pub const INTEGER: &str = "grove.lang.Integer";
pub const FLOAT: &str = "grove.lang.Float";
pub const BOOLEAN: &str = "grove.lang.Boolean";
pub const CLOSURE: &str = "grove.lang.Closure";
pub const SCRIPT: &str = "grove.lang.Script";
pub const ENUM: &str = "grove.lang.Enum";
pub const GROVE_OBJECT: &str = "grove.lang.GroveObject";
pub const META_CLASS: &str = "grove.lang.MetaClass";
pub const THROWABLE: &str = "grove.lang.Throwable";
pub const EXCEPTION: &str = "grove.lang.Exception";
pub const RUNTIME_EXCEPTION: &str = "grove.lang.RuntimeException";
pub const LIST: &str = "grove.util.List";
pub const MAP: &str = "grove.util.Map";

pub const INT: &str = "int";
pub const PRIMITIVE_BOOLEAN: &str = "boolean";
pub const DOUBLE: &str = "double";
pub const VOID: &str = "void";

/// The `def` keyword as a written type name
pub const DYNAMIC: &str = "def";

pub const CONSTRUCTOR: &str = "<init>";
pub const STATIC_INIT: &str = "<clinit>";

pub const DEFAULT_IMPORT_PACKAGES: [&str; 2] = ["grove.lang", "grove.util"];

pub fn is_primitive(name: &str) -> bool {
    matches!(name, INT | PRIMITIVE_BOOLEAN | DOUBLE | VOID)
}

/// Simple name of a qualified name (`grove.lang.String` -> `String`)
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// Package part of a qualified name, empty for the default package
pub fn package_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => "",
    }
}
