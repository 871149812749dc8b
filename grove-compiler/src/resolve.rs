//! Class resolution
//!
//! Every type mention in a class gets a class table slot. Names are looked up
//! in this order: primitives and `def`, the classes of the compile unit,
//! single and aliased imports, the module's package, star imports, the
//! default imports, the built-in catalogue and finally the class path. A
//! class path hit queues the defining source.
//!
//! Variables that name a class become class expressions, and a variable in a
//! static method that is neither local, a static member nor a class is
//! reported.

use crate::classpath;
use crate::compile_unit::CompileUnit;
use crate::config::CompilerConfiguration;
use crate::error::{CompileMessage, CompileResult, CompilerError, ErrorCollector};
use crate::operation::{ClassContext, PrimaryClassNodeOperation};
use crate::source_unit::SourceUnit;
use crate::visitor::{walk_class_body, walk_expression, walk_field, walk_method, Visitor, VisitorResult};
use grove_parser::names;
use grove_parser::{
    ClassEntry, ClassId, ClassNode, ClassType, ConstructorCallKind, Expression, ExpressionKind,
    FieldNode, ImportKind, MethodNode, ModuleNode, Span, VariableBinding,
};
use std::collections::HashSet;

pub struct ResolveOperation;

impl PrimaryClassNodeOperation for ResolveOperation {
    fn name(&self) -> &str {
        "resolve"
    }

    fn call(&mut self, ctx: &mut ClassContext<'_>) -> CompileResult<()> {
        let mut resolver = ResolveVisitor {
            compile_unit: &mut *ctx.compile_unit,
            errors: &mut *ctx.errors,
            config: ctx.config,
            source: ctx.source,
            module: ctx.source.module(),
            generics: Vec::new(),
            member_names: HashSet::new(),
            static_names: HashSet::new(),
            static_context: false,
            is_script: false,
        };
        resolver.visit_class(ctx.class)
    }
}

struct ResolveVisitor<'a> {
    compile_unit: &'a mut CompileUnit,
    errors: &'a mut ErrorCollector,
    config: &'a CompilerConfiguration,
    source: &'a SourceUnit,
    module: Option<&'a ModuleNode>,
    generics: Vec<String>,
    /// Fields and properties of the class and its compiled supertypes
    member_names: HashSet<String>,
    static_names: HashSet<String>,
    static_context: bool,
    is_script: bool,
}

impl ResolveVisitor<'_> {
    fn error(&mut self, span: &Span, message: impl Into<String>) -> CompileResult<()> {
        let message =
            CompileMessage::semantic(self.source.name(), self.source.text(), span, message);
        self.errors.add_error(message)
    }

    fn resolve_type(&mut self, class_type: &mut ClassType) -> CompileResult<()> {
        for argument in &mut class_type.generics {
            self.resolve_type(argument)?;
        }
        if class_type.resolved.is_some() {
            return Ok(());
        }
        if class_type.is_dynamic() {
            class_type.resolved = self.compile_unit.classes.lookup(names::OBJECT);
            return Ok(());
        }
        if self.generics.contains(&class_type.name) {
            class_type.type_variable = true;
            class_type.resolved = self.compile_unit.classes.lookup(names::OBJECT);
            return Ok(());
        }
        match self.find_class(&class_type.name)? {
            Some((id, qualified)) => {
                class_type.resolved = Some(id);
                class_type.name = qualified;
                Ok(())
            }
            None => {
                let message = format!("unable to resolve class {}", class_type.name);
                self.error(&class_type.span, message)
            }
        }
    }

    /// Slot and fully qualified name for a written class name
    fn find_class(&mut self, name: &str) -> CompileResult<Option<(ClassId, String)>> {
        if names::is_primitive(name) {
            let id = self.compile_unit.classes.lookup(name);
            return Ok(id.map(|id| (id, name.to_string())));
        }
        if name.contains('.') {
            return Ok(self.find_qualified(name).map(|id| (id, name.to_string())));
        }

        // classes of the compile unit in the default package
        let table = &self.compile_unit.classes;
        if let Some(id) = table.lookup(name) {
            if !matches!(table.entry(id), Some(ClassEntry::External(_))) {
                return Ok(Some((id, name.to_string())));
            }
        }

        let module = self.module;
        if let Some(module) = module {
            for import in &module.imports {
                match &import.kind {
                    ImportKind::Single if names::simple_name(&import.name) == name => {
                        if let Some(id) = self.find_qualified(&import.name) {
                            return Ok(Some((id, import.name.clone())));
                        }
                    }
                    ImportKind::Alias(alias) if alias == name => {
                        let Some(target) = self.find_qualified(&import.name) else {
                            continue;
                        };
                        let placeholder = self
                            .compile_unit
                            .alias_slot(self.source.name(), alias, target)
                            .map_err(|e| CompilerError::bug(e.to_string()))?;
                        return Ok(Some((placeholder, import.name.clone())));
                    }
                    _ => {}
                }
            }

            if let Some(package) = module.package.as_deref().filter(|p| !p.is_empty()) {
                let qualified = format!("{package}.{name}");
                if let Some(id) = self.compile_unit.classes.lookup(&qualified) {
                    return Ok(Some((id, qualified)));
                }
            }

            for import in module.imports.iter().filter(|i| i.kind == ImportKind::Star) {
                let qualified = format!("{}.{name}", import.name);
                if let Some(id) = self.compile_unit.classes.lookup(&qualified) {
                    return Ok(Some((id, qualified)));
                }
            }
        }

        for package in names::DEFAULT_IMPORT_PACKAGES {
            let qualified = format!("{package}.{name}");
            if let Some(id) = self.compile_unit.classes.lookup(&qualified) {
                return Ok(Some((id, qualified)));
            }
        }

        if let Some(id) = self.compile_unit.classes.lookup(name) {
            return Ok(Some((id, name.to_string())));
        }

        let mut candidates = Vec::new();
        if let Some(module) = module {
            candidates.push(module.qualify(name));
            for import in module.imports.iter().filter(|i| i.kind == ImportKind::Star) {
                candidates.push(format!("{}.{name}", import.name));
            }
        } else {
            candidates.push(name.to_string());
        }
        for candidate in candidates {
            if let Some(id) = self.from_classpath(&candidate) {
                return Ok(Some((id, candidate)));
            }
        }
        Ok(None)
    }

    fn find_qualified(&mut self, qualified: &str) -> Option<ClassId> {
        self.compile_unit
            .classes
            .lookup(qualified)
            .or_else(|| self.from_classpath(qualified))
    }

    /// Queues the source defining `qualified` if one exists on the class path
    fn from_classpath(&mut self, qualified: &str) -> Option<ClassId> {
        let path = classpath::find_source(
            &self.config.classpath,
            qualified,
            &self.config.default_script_extension,
        )?;
        let unit = SourceUnit::from_file(&path);
        let source = self.compile_unit.queue_source(unit);
        tracing::debug!(class = qualified, source = %source, "found class on the class path");
        Some(self.compile_unit.expect_class(qualified, &source))
    }

    /// Collects field and property names of `class` and its compiled supertypes
    fn collect_members(&mut self, class: &ClassNode) {
        let own = class
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.is_static()))
            .chain(
                class
                    .properties
                    .iter()
                    .map(|p| (p.name.clone(), p.modifiers.is_static())),
            );
        let mut members: Vec<(String, bool)> = own.collect();

        let table = &self.compile_unit.classes;
        let mut seen = HashSet::new();
        let mut pending: Vec<ClassId> = class
            .super_class
            .iter()
            .chain(class.interfaces.iter())
            .filter_map(|t| t.resolved)
            .collect();
        while let Some(id) = pending.pop() {
            let id = table.redirect(id);
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = table.primary(id) {
                members.extend(node.fields.iter().map(|f| (f.name.clone(), f.is_static())));
                members.extend(
                    node.properties
                        .iter()
                        .map(|p| (p.name.clone(), p.modifiers.is_static())),
                );
            }
            pending.extend(table.direct_supertypes(id));
        }

        for (name, is_static) in members {
            if is_static {
                self.static_names.insert(name.clone());
            }
            self.member_names.insert(name);
        }
    }

    /// Turns a variable naming a class into a class expression
    fn resolve_variable(&mut self, expression: &mut Expression) -> CompileResult<()> {
        let ExpressionKind::Variable(variable) = &expression.kind else {
            return Ok(());
        };
        if variable.binding == VariableBinding::Local || self.member_names.contains(&variable.name)
        {
            return Ok(());
        }
        let name = variable.name.clone();
        let looks_like_class = name.starts_with(|c: char| c.is_ascii_uppercase());
        if looks_like_class {
            if let Some((id, qualified)) = self.find_class(&name)? {
                let mut class_type = ClassType::new(qualified, expression.span.clone());
                class_type.resolved = Some(id);
                expression.kind = ExpressionKind::Class(class_type);
                return Ok(());
            }
        }
        if self.static_context && !self.is_script && !self.static_names.contains(&name) {
            let message = format!(
                "Apparent variable '{name}' was found in a static scope but doesn't refer to a local variable, static field or class. Possible causes:\nYou attempted to reference a variable in the binding or an instance variable from a static context.\nYou misspelled a classname or statically imported field. Please check the spelling.\nYou attempted to use a method '{name}' but left out brackets in a place not allowed by the grammar."
            );
            self.error(&expression.span.clone(), message)?;
        }
        Ok(())
    }

    fn check_instantiation(&mut self, expression: &Expression) -> CompileResult<()> {
        let ExpressionKind::ConstructorCall(call) = &expression.kind else {
            return Ok(());
        };
        if call.kind != ConstructorCallKind::New {
            return Ok(());
        }
        let Some(id) = call.class_type.resolved else {
            return Ok(());
        };
        let table = &self.compile_unit.classes;
        let what = if table.is_interface(id) {
            "interface"
        } else if table.modifiers(id).is_abstract() {
            "class"
        } else {
            return Ok(());
        };
        let message = format!(
            "You cannot create an instance from the abstract {what} '{}'.",
            call.class_type.name
        );
        self.error(&expression.span, message)
    }
}

impl Visitor for ResolveVisitor<'_> {
    fn visit_class(&mut self, class: &mut ClassNode) -> VisitorResult {
        self.generics = class.generics.iter().map(|g| g.name.clone()).collect();
        self.is_script = class.kind == grove_parser::ClassKind::Script;
        if let Some(super_class) = class.super_class.as_mut() {
            self.resolve_type(super_class)?;
        }
        for interface in &mut class.interfaces {
            self.resolve_type(interface)?;
        }
        self.collect_members(class);
        walk_class_body(self, class)
    }

    fn visit_field(&mut self, field: &mut FieldNode) -> VisitorResult {
        self.static_context = field.is_static();
        let result = walk_field(self, field);
        self.static_context = false;
        result
    }

    fn visit_method(&mut self, method: &mut MethodNode) -> VisitorResult {
        self.static_context = method.is_static();
        let result = walk_method(self, method);
        self.static_context = false;
        result
    }

    fn visit_expression(&mut self, expression: &mut Expression) -> VisitorResult {
        walk_expression(self, expression)?;
        self.resolve_variable(expression)?;
        self.check_instantiation(expression)
    }

    fn visit_class_type(&mut self, class_type: &mut ClassType) -> VisitorResult {
        self.resolve_type(class_type)
    }
}
