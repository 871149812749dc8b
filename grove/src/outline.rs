// S-expression outline of a parsed Grove module
// Shows the declarations and leaves statement bodies out

use grove_parser::*;

pub fn format_module(module: &ModuleNode) -> String {
    let mut items = Vec::new();
    if let Some(package) = &module.package {
        items.push(format!("(package {package})"));
    }
    for import in &module.imports {
        items.push(match &import.kind {
            ImportKind::Single => format!("(import {})", import.name),
            ImportKind::Star => format!("(import {}.*)", import.name),
            ImportKind::Alias(alias) => format!("(import {} as {alias})", import.name),
            ImportKind::Static => format!("(import static {})", import.name),
        });
    }
    items.extend(module.classes.iter().map(format_class));
    items.extend(module.methods.iter().map(|method| format_method("method", method)));
    if !module.statements.is_empty() {
        items.push(format!("(statements {})", module.statements.len()));
    }

    if items.is_empty() {
        format!("(module {:?})", module.source_name)
    } else {
        format!(
            "(module {:?}\n  {})",
            module.source_name,
            items.join("\n").replace('\n', "\n  ")
        )
    }
}

fn format_class(class: &ClassNode) -> String {
    let mut header = format!("({} {}", kind_keyword(class.kind), class.name);
    if class.modifiers != Modifiers::empty() {
        header.push_str(&format!(" [{}]", class.modifiers));
    }
    if let Some(super_class) = &class.super_class {
        header.push_str(&format!(" (extends {super_class})"));
    }
    if !class.interfaces.is_empty() {
        let interfaces: Vec<String> = class.interfaces.iter().map(|i| i.to_string()).collect();
        header.push_str(&format!(" (implements {})", interfaces.join(" ")));
    }

    let mut members: Vec<String> = Vec::new();
    members.extend(class.enum_constants.iter().map(|c| format!("(constant {})", c.name)));
    members.extend(
        class
            .fields
            .iter()
            .map(|field| format!("(field {} {})", field.field_type, field.name)),
    );
    members.extend(
        class
            .constructors
            .iter()
            .map(|constructor| format_method("constructor", constructor)),
    );
    members.extend(class.methods.iter().map(|method| format_method("method", method)));

    if members.is_empty() {
        format!("{header})")
    } else {
        format!("{header}\n  {})", members.join("\n  "))
    }
}

fn format_method(keyword: &str, method: &MethodNode) -> String {
    let parameters: Vec<String> = method
        .parameters
        .iter()
        .map(|p| format!("{} {}", p.param_type, p.name))
        .collect();
    let mut text = format!("({keyword} {} ({})", method.name, parameters.join(", "));
    if keyword == "method" {
        text.push_str(&format!(" -> {}", method.return_type));
    }
    if method.modifiers.is_static() {
        text.push_str(" static");
    }
    if method.body.is_none() {
        text.push_str(" abstract");
    }
    text.push(')');
    text
}

fn kind_keyword(kind: ClassKind) -> &'static str {
    match kind {
        ClassKind::Class => "class",
        ClassKind::Interface => "interface",
        ClassKind::Enum => "enum",
        ClassKind::Script => "script",
        ClassKind::Closure => "closure",
    }
}
