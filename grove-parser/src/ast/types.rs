use super::names;
use super::Span;
use std::fmt;

/// Index of a slot in the [`ClassTable`](super::ClassTable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A mention of a type in source code
///
/// The written name is kept as-is; resolution fills in `resolved` and
/// rewrites `name` to the fully qualified form.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassType {
    pub name: String,
    pub generics: Vec<ClassType>,
    pub array_dimensions: usize,
    pub span: Span,
    pub resolved: Option<ClassId>,
    /// Set when the name refers to a generics parameter of the enclosing class
    pub type_variable: bool,
}

impl ClassType {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
            array_dimensions: 0,
            span,
            resolved: None,
            type_variable: false,
        }
    }

    /// The dynamic type written as `def`
    pub fn dynamic() -> Self {
        Self::new(names::DYNAMIC, Span::default())
    }

    pub fn object() -> Self {
        Self::new(names::OBJECT, Span::default())
    }

    pub fn void() -> Self {
        Self::new(names::VOID, Span::default())
    }

    pub fn is_dynamic(&self) -> bool {
        self.name == names::DYNAMIC
    }

    pub fn is_void(&self) -> bool {
        self.name == names::VOID && self.array_dimensions == 0
    }

    pub fn is_primitive(&self) -> bool {
        self.array_dimensions == 0 && names::is_primitive(&self.name)
    }

    pub fn is_boolean(&self) -> bool {
        self.array_dimensions == 0
            && (self.name == names::PRIMITIVE_BOOLEAN || self.name == names::BOOLEAN)
    }

    /// Name used in method signatures once generics are erased
    pub fn erasure_name(&self) -> &str {
        if self.array_dimensions > 0 {
            names::LIST
        } else if self.is_dynamic() || self.type_variable {
            names::OBJECT
        } else {
            &self.name
        }
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.generics.is_empty() {
            let args: Vec<String> = self.generics.iter().map(|g| g.to_string()).collect();
            write!(f, "<{}>", args.join(", "))?;
        }
        for _ in 0..self.array_dimensions {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

/// A generics parameter declared on a class, e.g. `T extends Comparable`
#[derive(Debug, Clone, PartialEq)]
pub struct GenericsType {
    pub name: String,
    pub upper_bound: Option<ClassType>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Script,
    Closure,
}

impl ClassKind {
    pub fn is_interface(self) -> bool {
        self == ClassKind::Interface
    }
}
