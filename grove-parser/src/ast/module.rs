use super::{
    names, ClassId, ClassKind, ClassNode, ClassType, Expression, ExpressionKind, MethodNode,
    Modifier, Modifiers, Parameter, Span, Statement,
};

/// The AST produced from one source unit
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleNode {
    pub source_name: String,
    pub package: Option<String>,
    pub imports: Vec<ImportNode>,
    pub classes: Vec<ClassNode>,
    /// Loose top-level statements, turned into a script `run()` body
    pub statements: Vec<Statement>,
    /// Top-level methods, moved onto the script class
    pub methods: Vec<MethodNode>,
    /// Slots of this module's classes once registered with a compile unit
    pub class_ids: Vec<ClassId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportKind {
    /// `import a.b.C`
    Single,
    /// `import a.b.*`
    Star,
    /// `import a.b.C as D`
    Alias(String),
    /// `import static a.b.C.member`
    Static,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub name: String,
    pub kind: ImportKind,
    pub span: Span,
}

impl ImportNode {
    /// Name this import makes visible, if it introduces one
    pub fn visible_name(&self) -> Option<&str> {
        match &self.kind {
            ImportKind::Single => Some(names::simple_name(&self.name)),
            ImportKind::Alias(alias) => Some(alias),
            ImportKind::Star | ImportKind::Static => None,
        }
    }
}

impl ModuleNode {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            package: None,
            imports: Vec::new(),
            classes: Vec::new(),
            statements: Vec::new(),
            methods: Vec::new(),
            class_ids: Vec::new(),
        }
    }

    pub fn is_script(&self) -> bool {
        !self.statements.is_empty() || !self.methods.is_empty()
    }

    /// Prefixes a simple name with this module's package
    pub fn qualify(&self, simple: &str) -> String {
        match &self.package {
            Some(pkg) if !pkg.is_empty() => format!("{pkg}.{simple}"),
            _ => simple.to_string(),
        }
    }

    /// Class name a script in this module gets, derived from the source name
    pub fn script_class_name(&self) -> String {
        let file = self
            .source_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.source_name);
        let stem = file.split('.').next().unwrap_or(file);
        let mut simple: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
            .collect();
        if simple.is_empty() || simple.starts_with(|c: char| c.is_ascii_digit()) {
            simple.insert(0, '_');
        }
        self.qualify(&simple)
    }

    /// Moves loose statements and methods into a script class
    ///
    /// The class extends `base_class` and gets a `run()` method with the
    /// statements plus a static `main(args)` entry point. Does nothing for
    /// modules without top-level code.
    pub fn create_script_class(&mut self, base_class: &str) -> Option<&ClassNode> {
        if !self.is_script() {
            return None;
        }
        let name = self.script_class_name();
        let mut script = ClassNode::new(name.clone(), ClassKind::Script, self.source_name.clone());
        script.super_class = Some(ClassType::new(base_class, Span::default()));

        let statements = std::mem::take(&mut self.statements);
        let span = match (statements.first(), statements.last()) {
            (Some(first), Some(last)) => first.span.merge(&last.span),
            _ => Span::default(),
        };
        let run = MethodNode::new(
            "run",
            Modifiers::of(&[Modifier::Public]),
            ClassType::dynamic(),
            Vec::new(),
            Some(Statement::block(statements, span)),
        );
        script.add_method(run);

        // main(args) { new Script().run() }
        let mut args_type = ClassType::new("String", Span::default());
        args_type.array_dimensions = 1;
        let instance = Expression::new(
            ExpressionKind::ConstructorCall(super::ConstructorCallExpression {
                class_type: ClassType::new(name, Span::default()),
                arguments: Vec::new(),
                kind: super::ConstructorCallKind::New,
            }),
            Span::default(),
        );
        let main_body = Statement::block(
            vec![Statement::expression(Expression::call(instance, "run", Vec::new()))],
            Span::default(),
        );
        let main = MethodNode::new(
            "main",
            Modifiers::of(&[Modifier::Public, Modifier::Static]),
            ClassType::void(),
            vec![Parameter::new("args", args_type)],
            Some(main_body),
        )
        .synthetic();
        script.add_method(main);

        for method in std::mem::take(&mut self.methods) {
            script.add_method(method);
        }

        self.classes.insert(0, script);
        self.classes.first()
    }
}
