// Declaration conversion
// Package, imports, classes, interfaces, enums and their members

use crate::ast::*;
use crate::cst::CstNode;
use crate::error::ParseResult;
use crate::parser::{AstBuilder, Rule};

impl AstBuilder<'_> {
    pub(crate) fn build_compilation_unit(&mut self, root: &CstNode) -> ParseResult<()> {
        for child in &root.children {
            match child.rule {
                Rule::package_declaration => {
                    let name = self.expect_child(child, Rule::qualified_name)?;
                    self.module.package = Some(self.text(name).to_string());
                }
                Rule::import_declaration => {
                    let import = self.build_import(child)?;
                    self.module.imports.push(import);
                }
                Rule::type_declaration => {
                    let class = self.build_type_declaration(child)?;
                    self.module.classes.push(class);
                }
                Rule::method_declaration => {
                    let method = self.build_method(child, false)?;
                    self.module.methods.push(method);
                }
                Rule::statement => {
                    let statement = self.build_statement(child)?;
                    self.module.statements.push(statement);
                }
                Rule::EOI => {}
                _ => return Err(self.bug("top-level declaration or statement", child)),
            }
        }
        Ok(())
    }

    fn build_import(&mut self, node: &CstNode) -> ParseResult<ImportNode> {
        let name = self.text(self.expect_child(node, Rule::qualified_name)?).to_string();
        let kind = if node.has_child(Rule::static_marker) {
            ImportKind::Static
        } else if node.has_child(Rule::star_suffix) {
            ImportKind::Star
        } else if let Some(alias) = node.child(Rule::import_alias) {
            let alias = self.expect_child(alias, Rule::identifier)?;
            ImportKind::Alias(self.text(alias).to_string())
        } else {
            ImportKind::Single
        };
        Ok(ImportNode {
            name,
            kind,
            span: self.span(node),
        })
    }

    /// Converts `modifiers`, reporting duplicates and illegal combinations
    pub(crate) fn build_modifiers(&mut self, node: &CstNode, subject: &str) -> ParseResult<Modifiers> {
        let mut modifiers = Modifiers::empty();
        for modifier_node in node.children_of(Rule::modifier) {
            let keyword = self.first_child(modifier_node)?;
            let text = self.text(keyword);
            let modifier = Modifier::from_keyword(text)
                .ok_or_else(|| self.bug("modifier keyword", keyword))?;
            let span = self.span(modifier_node);
            if modifiers.contains(modifier) {
                self.error(
                    &span,
                    format!("The modifier '{text}' appears more than once in the {subject} declaration"),
                );
                continue;
            }
            let is_visibility = matches!(
                modifier,
                Modifier::Public | Modifier::Protected | Modifier::Private
            );
            if is_visibility && !modifiers.has_no_visibility() {
                self.error(
                    &span,
                    format!("Cannot declare more than one visibility modifier for the {subject}"),
                );
                continue;
            }
            modifiers.insert(modifier);
        }
        if modifiers.is_abstract() && modifiers.is_final() {
            self.error(
                &self.span(node),
                format!("The {subject} cannot be both abstract and final"),
            );
        }
        Ok(modifiers)
    }

    fn build_type_declaration(&mut self, node: &CstNode) -> ParseResult<ClassNode> {
        let modifiers_node = self.expect_child(node, Rule::modifiers)?;
        let declaration = node
            .children
            .iter()
            .find(|c| c.rule != Rule::modifiers)
            .ok_or_else(|| self.bug("class, interface or enum", node))?;
        let name_node = self.expect_child(declaration, Rule::identifier)?;
        let simple_name = self.text(name_node).to_string();
        let subject = match declaration.rule {
            Rule::interface_declaration => "interface",
            Rule::enum_declaration => "enum",
            _ => "class",
        };
        let mut modifiers = self.build_modifiers(modifiers_node, subject)?;
        if modifiers.has_no_visibility() {
            modifiers.insert(Modifier::Public);
        }

        let kind = match declaration.rule {
            Rule::class_declaration => ClassKind::Class,
            Rule::interface_declaration => ClassKind::Interface,
            Rule::enum_declaration => ClassKind::Enum,
            _ => return Err(self.bug("class, interface or enum", declaration)),
        };
        match kind {
            ClassKind::Interface => modifiers.insert(Modifier::Abstract),
            ClassKind::Enum => modifiers.insert(Modifier::Final),
            _ => {}
        }

        let name = self.module.qualify(&simple_name);
        let mut class = ClassNode::new(name, kind, self.module.source_name.clone());
        class.modifiers = modifiers;
        class.span = self.span(node);

        if let Some(generics) = declaration.child(Rule::generics_declaration) {
            class.generics = self.build_generics_declaration(generics)?;
        }
        if let Some(extends) = declaration.child(Rule::extends_clause) {
            let super_type = self.expect_child(extends, Rule::class_type)?;
            class.super_class = Some(self.build_class_type(super_type)?);
        }
        if let Some(extends) = declaration.child(Rule::interface_extends) {
            class.interfaces = self.build_type_list(self.expect_child(extends, Rule::class_type_list)?)?;
        }
        if let Some(implements) = declaration.child(Rule::implements_clause) {
            class.interfaces =
                self.build_type_list(self.expect_child(implements, Rule::class_type_list)?)?;
        }

        let previous = self.current_class.replace(simple_name);
        let body_result = match kind {
            ClassKind::Enum => {
                let body = self.expect_child(declaration, Rule::enum_body)?;
                self.build_enum_body(body, &mut class)
            }
            _ => {
                let body = self.expect_child(declaration, Rule::class_body)?;
                self.build_class_members(body, &mut class)
            }
        };
        self.current_class = previous;
        body_result?;
        Ok(class)
    }

    fn build_type_list(&mut self, node: &CstNode) -> ParseResult<Vec<ClassType>> {
        node.children_of(Rule::class_type)
            .map(|t| self.build_class_type(t))
            .collect()
    }

    fn build_generics_declaration(&mut self, node: &CstNode) -> ParseResult<Vec<GenericsType>> {
        let mut generics = Vec::new();
        for parameter in node.children_of(Rule::generics_parameter) {
            let name = self.expect_child(parameter, Rule::identifier)?;
            let upper_bound = match parameter.child(Rule::class_type) {
                Some(bound) => Some(self.build_class_type(bound)?),
                None => None,
            };
            generics.push(GenericsType {
                name: self.text(name).to_string(),
                upper_bound,
                span: self.span(parameter),
            });
        }
        Ok(generics)
    }

    pub(crate) fn build_class_type(&mut self, node: &CstNode) -> ParseResult<ClassType> {
        let name = self.expect_child(node, Rule::qualified_name)?;
        let mut class_type = ClassType::new(self.text(name), self.span(node));
        if let Some(arguments) = node.child(Rule::generics_arguments) {
            class_type.generics = arguments
                .children_of(Rule::class_type)
                .map(|t| self.build_class_type(t))
                .collect::<ParseResult<_>>()?;
        }
        class_type.array_dimensions = node.children_of(Rule::array_suffix).count();
        Ok(class_type)
    }

    /// `def`, `void` or a written type
    fn build_declared_type(&mut self, node: &CstNode) -> ParseResult<ClassType> {
        let inner = self.first_child(node)?;
        match inner.rule {
            Rule::kw_def | Rule::kw_final => Ok(ClassType::new(names::DYNAMIC, self.span(inner))),
            Rule::kw_void => Ok(ClassType::new(names::VOID, self.span(inner))),
            Rule::class_type => self.build_class_type(inner),
            _ => Err(self.bug("type", inner)),
        }
    }

    fn build_enum_body(&mut self, node: &CstNode, class: &mut ClassNode) -> ParseResult<()> {
        if let Some(constants) = node.child(Rule::enum_constants) {
            for constant in constants.children_of(Rule::enum_constant) {
                let name = self.expect_child(constant, Rule::identifier)?;
                let arguments = match constant.child(Rule::arguments) {
                    Some(args) => self.build_arguments(args)?,
                    None => Vec::new(),
                };
                let name = self.text(name).to_string();
                if class.enum_constants.iter().any(|c| c.name == name) {
                    self.error(&self.span(constant), format!("Duplicate enum constant '{name}'"));
                    continue;
                }
                class.enum_constants.push(EnumConstant {
                    name,
                    arguments,
                    span: self.span(constant),
                });
            }
        }
        self.build_class_members(node, class)
    }

    fn build_class_members(&mut self, body: &CstNode, class: &mut ClassNode) -> ParseResult<()> {
        for member in &body.children {
            match member.rule {
                Rule::constructor_declaration => {
                    if let Some(method) = self.build_constructor_or_method(member)? {
                        if method.is_constructor() {
                            class.add_constructor(method);
                        } else {
                            self.add_method_checked(class, method);
                        }
                    }
                }
                Rule::method_declaration => {
                    let method = self.build_method(member, class.is_interface())?;
                    self.add_method_checked(class, method);
                }
                Rule::field_declaration => self.build_field_declaration(member, class)?,
                Rule::enum_constants => {}
                _ => return Err(self.bug("class member", member)),
            }
        }
        Ok(())
    }

    fn add_method_checked(&mut self, class: &mut ClassNode, method: MethodNode) {
        if !class.is_abstract() && method.modifiers.is_abstract() {
            self.error(
                &method.span,
                format!(
                    "Can't have an abstract method in a non-abstract class. The class '{}' must be declared abstract or the method '{}' must be implemented.",
                    class.name,
                    method.type_descriptor()
                ),
            );
        }
        class.add_method(method);
    }

    /// `Name(params) { ... }` is a constructor when it names the class
    ///
    /// Anything else is a method with an implicit `def` return type, which is
    /// only allowed when at least one modifier was written.
    fn build_constructor_or_method(&mut self, node: &CstNode) -> ParseResult<Option<MethodNode>> {
        let modifiers_node = self.expect_child(node, Rule::modifiers)?;
        let name_node = self.expect_child(node, Rule::identifier)?;
        let name = self.text(name_node);
        let span = self.span(node);
        let is_constructor = self.current_class.as_deref() == Some(name);
        let modifiers = self.build_modifiers(
            modifiers_node,
            if is_constructor { "constructor" } else { "method" },
        )?;
        let parameters = self.build_parameters(self.expect_child(node, Rule::parameters)?)?;
        let body = self.build_block(self.expect_child(node, Rule::block)?)?;

        if is_constructor {
            if modifiers.is_static() {
                self.error(&span, "Constructors cannot be static");
            }
            let mut modifiers = modifiers;
            if modifiers.has_no_visibility() {
                modifiers.insert(Modifier::Public);
            }
            let mut constructor = MethodNode::constructor(modifiers, parameters, body);
            constructor.span = span;
            return Ok(Some(constructor));
        }
        if modifiers.bits() == 0 {
            self.error(&span, "Invalid method declaration: return type required");
            return Ok(None);
        }
        let mut modifiers = modifiers;
        if modifiers.has_no_visibility() {
            modifiers.insert(Modifier::Public);
        }
        let mut method = MethodNode::new(name, modifiers, ClassType::dynamic(), parameters, Some(body));
        method.span = span;
        Ok(Some(method))
    }

    pub(crate) fn build_method(&mut self, node: &CstNode, in_interface: bool) -> ParseResult<MethodNode> {
        let modifiers_node = self.expect_child(node, Rule::modifiers)?;
        let mut modifiers = self.build_modifiers(modifiers_node, "method")?;
        let return_type = self.build_declared_type(self.expect_child(node, Rule::method_return)?)?;
        let name = self.text(self.expect_child(node, Rule::identifier)?).to_string();
        let parameters = self.build_parameters(self.expect_child(node, Rule::parameters)?)?;
        let span = self.span(node);
        let body = match node.child(Rule::block) {
            Some(block) => Some(self.build_block(block)?),
            None => None,
        };

        if modifiers.has_no_visibility() {
            modifiers.insert(Modifier::Public);
        }
        match (&body, in_interface) {
            (Some(_), true) => {
                self.error(&span, format!("Method '{name}' of an interface must not have a body"));
            }
            (None, true) => modifiers.insert(Modifier::Abstract),
            (Some(_), false) if modifiers.is_abstract() => {
                self.error(&span, format!("Abstract method '{name}' must not define a body"));
            }
            (None, false) if !modifiers.is_abstract() => {
                self.error(
                    &span,
                    format!("You defined a method '{name}' without a body. Try adding a body, or declare it abstract."),
                );
            }
            _ => {}
        }

        let mut method = MethodNode::new(name, modifiers, return_type, parameters, body);
        method.span = span;
        Ok(method)
    }

    fn build_field_declaration(&mut self, node: &CstNode, class: &mut ClassNode) -> ParseResult<()> {
        let modifiers_node = self.expect_child(node, Rule::modifiers)?;
        let modifiers = self.build_modifiers(modifiers_node, "field")?;
        let field_type = self.build_declared_type(self.expect_child(node, Rule::field_type)?)?;

        for declarator in node.children_of(Rule::variable_declarator) {
            let name = self.text(self.expect_child(declarator, Rule::identifier)?).to_string();
            let span = self.span(declarator);
            let initial_value = match declarator.child(Rule::expression) {
                Some(expression) => Some(self.build_expression(expression)?),
                None => None,
            };
            if class.field(&name).is_some() {
                self.error(
                    &span,
                    format!("The field '{name}' is declared multiple times in class '{}'", class.name),
                );
                continue;
            }

            if class.is_interface() {
                let constant_modifiers =
                    Modifiers::of(&[Modifier::Public, Modifier::Static, Modifier::Final]);
                let mut field = FieldNode::new(name, constant_modifiers, field_type.clone());
                field.initial_value = initial_value;
                field.span = span;
                class.add_field(field);
                continue;
            }

            if modifiers.has_no_visibility() {
                let mut field_modifiers = modifiers;
                field_modifiers.insert(Modifier::Private);
                let mut field = FieldNode::new(name.clone(), field_modifiers, field_type.clone());
                field.initial_value = initial_value;
                field.span = span.clone();
                class.add_field(field);

                let mut property_modifiers = modifiers;
                property_modifiers.insert(Modifier::Public);
                class.properties.push(PropertyNode {
                    name,
                    modifiers: property_modifiers,
                    property_type: field_type.clone(),
                    span,
                });
            } else {
                let mut field = FieldNode::new(name, modifiers, field_type.clone());
                field.initial_value = initial_value;
                field.span = span;
                class.add_field(field);
            }
        }
        Ok(())
    }

    pub(crate) fn build_parameters(&mut self, node: &CstNode) -> ParseResult<Vec<Parameter>> {
        let mut parameters: Vec<Parameter> = Vec::new();
        for parameter_node in node.children_of(Rule::parameter) {
            let parameter = self.build_parameter(parameter_node)?;
            if parameters.iter().any(|p| p.name == parameter.name) {
                self.error(
                    &parameter.span,
                    format!("The parameter name '{}' is used more than once", parameter.name),
                );
                continue;
            }
            parameters.push(parameter);
        }
        Ok(parameters)
    }

    pub(crate) fn build_parameter(&mut self, node: &CstNode) -> ParseResult<Parameter> {
        let param_type = match node.child(Rule::parameter_type) {
            Some(t) => self.build_declared_type(t)?,
            None => ClassType::dynamic(),
        };
        let name = self.text(self.expect_child(node, Rule::identifier)?);
        let mut parameter = Parameter::new(name, param_type);
        parameter.span = self.span(node);
        if let Some(default) = node.child(Rule::expression) {
            parameter.initial_expression = Some(self.build_expression(default)?);
        }
        Ok(parameter)
    }
}
