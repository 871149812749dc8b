use super::{names, ClassKind, ClassType, Expression, GenericsType, Modifier, Modifiers, Span, Statement};

/// An AST-backed class that this compilation will emit
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNode {
    pub name: String,
    pub modifiers: Modifiers,
    pub kind: ClassKind,
    pub super_class: Option<ClassType>,
    pub interfaces: Vec<ClassType>,
    pub generics: Vec<GenericsType>,
    pub fields: Vec<FieldNode>,
    pub properties: Vec<PropertyNode>,
    pub methods: Vec<MethodNode>,
    pub constructors: Vec<ConstructorNode>,
    pub enum_constants: Vec<EnumConstant>,
    /// Static initializer statements collected by the verifier
    pub static_init: Vec<Statement>,
    pub source_name: String,
    pub synthetic: bool,
    pub span: Span,
}

impl ClassNode {
    pub fn new(name: impl Into<String>, kind: ClassKind, source_name: impl Into<String>) -> Self {
        let super_class = match kind {
            ClassKind::Interface => None,
            ClassKind::Enum => Some(ClassType::new(names::ENUM, Span::default())),
            ClassKind::Script => Some(ClassType::new(names::SCRIPT, Span::default())),
            ClassKind::Closure => Some(ClassType::new(names::CLOSURE, Span::default())),
            ClassKind::Class => Some(ClassType::object()),
        };
        Self {
            name: name.into(),
            modifiers: Modifiers::empty().with(Modifier::Public),
            kind,
            super_class,
            interfaces: Vec::new(),
            generics: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            enum_constants: Vec::new(),
            static_init: Vec::new(),
            source_name: source_name.into(),
            synthetic: false,
            span: Span::default(),
        }
    }

    pub fn simple_name(&self) -> &str {
        names::simple_name(&self.name)
    }

    pub fn package_name(&self) -> &str {
        names::package_of(&self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.kind.is_interface()
    }

    pub fn is_enum(&self) -> bool {
        self.kind == ClassKind::Enum
    }

    pub fn is_abstract(&self) -> bool {
        self.is_interface() || self.modifiers.is_abstract()
    }

    pub fn field(&self, name: &str) -> Option<&FieldNode> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldNode> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyNode> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodNode> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// Declared method with the given name and erased parameter types
    pub fn declared_method(&self, name: &str, parameter_types: &[&str]) -> Option<&MethodNode> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.erased_parameter_types() == parameter_types)
    }

    pub fn has_declared_method(&self, name: &str, arity: usize) -> bool {
        self.methods
            .iter()
            .any(|m| m.name == name && m.parameters.len() == arity)
    }

    pub fn add_field(&mut self, field: FieldNode) {
        self.fields.push(field);
    }

    pub fn add_method(&mut self, method: MethodNode) {
        self.methods.push(method);
    }

    pub fn add_constructor(&mut self, constructor: ConstructorNode) {
        self.constructors.push(constructor);
    }

    /// Adds `name` to the interfaces unless it is already listed
    pub fn add_interface(&mut self, interface: ClassType) {
        if !self.interfaces.iter().any(|i| i.name == interface.name) {
            self.interfaces.push(interface);
        }
    }

    pub fn generics_parameter(&self, name: &str) -> Option<&GenericsType> {
        self.generics.iter().find(|g| g.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodNode {
    pub name: String,
    pub modifiers: Modifiers,
    pub return_type: ClassType,
    pub parameters: Vec<Parameter>,
    /// `None` for abstract and interface methods
    pub body: Option<Statement>,
    pub synthetic: bool,
    /// Set on bridge methods generated for covariant overrides
    pub bridge: bool,
    pub span: Span,
}

/// Constructors are methods named `<init>`
pub type ConstructorNode = MethodNode;

impl MethodNode {
    pub fn new(
        name: impl Into<String>,
        modifiers: Modifiers,
        return_type: ClassType,
        parameters: Vec<Parameter>,
        body: Option<Statement>,
    ) -> Self {
        Self {
            name: name.into(),
            modifiers,
            return_type,
            parameters,
            body,
            synthetic: false,
            bridge: false,
            span: Span::default(),
        }
    }

    pub fn constructor(modifiers: Modifiers, parameters: Vec<Parameter>, body: Statement) -> Self {
        Self::new(names::CONSTRUCTOR, modifiers, ClassType::void(), parameters, Some(body))
    }

    pub fn synthetic(mut self) -> Self {
        self.synthetic = true;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == names::CONSTRUCTOR
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    pub fn is_void(&self) -> bool {
        self.return_type.is_void()
    }

    pub fn erased_parameter_types(&self) -> Vec<&str> {
        self.parameters
            .iter()
            .map(|p| p.param_type.erasure_name())
            .collect()
    }

    pub fn has_default_arguments(&self) -> bool {
        self.parameters.iter().any(|p| p.initial_expression.is_some())
    }

    /// `name(type, type)` with erased parameter types
    pub fn type_descriptor(&self) -> String {
        format!("{}({})", self.name, self.erased_parameter_types().join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: ClassType,
    pub initial_expression: Option<Expression>,
    pub closure_shared: bool,
    pub span: Span,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: ClassType) -> Self {
        Self {
            name: name.into(),
            param_type,
            initial_expression: None,
            closure_shared: false,
            span: Span::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    pub name: String,
    pub modifiers: Modifiers,
    pub field_type: ClassType,
    pub initial_value: Option<Expression>,
    pub synthetic: bool,
    pub span: Span,
}

impl FieldNode {
    pub fn new(name: impl Into<String>, modifiers: Modifiers, field_type: ClassType) -> Self {
        Self {
            name: name.into(),
            modifiers,
            field_type,
            initial_value: None,
            synthetic: false,
            span: Span::default(),
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.is_static()
    }
}

/// A field declared without visibility: accessors are generated for it
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyNode {
    pub name: String,
    pub modifiers: Modifiers,
    pub property_type: ClassType,
    pub span: Span,
}

impl PropertyNode {
    pub fn getter_name(&self) -> String {
        format!("get{}", capitalize(&self.name))
    }

    pub fn boolean_getter_name(&self) -> String {
        format!("is{}", capitalize(&self.name))
    }

    pub fn setter_name(&self) -> String {
        format!("set{}", capitalize(&self.name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub name: String,
    pub arguments: Vec<Expression>,
    pub span: Span,
}

/// Upper-cases the first character, as in accessor names
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
