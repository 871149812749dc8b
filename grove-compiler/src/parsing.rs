//! Parsing and conversion: source text -> CST -> registered class nodes

use crate::error::{CompileMessage, CompileResult, CompilerError};
use crate::operation::{SourceContext, SourceUnitOperation};
use grove_parser::ClassTableError;

/// Reads the source and builds its concrete syntax tree
pub struct ParseOperation;

impl SourceUnitOperation for ParseOperation {
    fn name(&self) -> &str {
        "parse"
    }

    fn call(&mut self, ctx: &mut SourceContext<'_>) -> CompileResult<()> {
        let name = ctx.unit.name().to_string();
        let text = match ctx.unit.load() {
            Ok(text) => text.to_string(),
            Err(e) => {
                return ctx
                    .errors
                    .add_error(CompileMessage::general(format!("{name}: cannot read source: {e}")));
            }
        };
        match ctx.plugin.parse_cst(&text, &name) {
            Ok(cst) => {
                tracing::debug!(source = %name, "parsed");
                ctx.unit.cst = Some(cst);
                Ok(())
            }
            Err(error) if error.is_fatal() => Err(CompilerError::ParserBug { unit: name, error }),
            Err(error) => ctx.errors.add_error(CompileMessage::syntax(&name, error)),
        }
    }
}

/// Converts the CST into a module and registers its classes
///
/// Loose statements become a script class first.
pub struct ConvertOperation;

impl SourceUnitOperation for ConvertOperation {
    fn name(&self) -> &str {
        "convert"
    }

    fn call(&mut self, ctx: &mut SourceContext<'_>) -> CompileResult<()> {
        let Some(cst) = ctx.unit.cst.as_ref() else {
            // parsing already reported why there is nothing to convert
            return Ok(());
        };
        let name = ctx.unit.name().to_string();
        let output = ctx
            .plugin
            .build_ast(cst, ctx.unit.text(), &name)
            .map_err(|error| CompilerError::ParserBug {
                unit: name.clone(),
                error,
            })?;
        for error in output.errors {
            ctx.errors.add_error(CompileMessage::syntax(&name, error))?;
        }

        let mut module = output.module;
        module.create_script_class(&ctx.config.script_base_class);
        for class in std::mem::take(&mut module.classes) {
            let class_name = class.name.clone();
            let span = class.span.clone();
            match ctx.compile_unit.add_class(class) {
                Ok(id) => module.class_ids.push(id),
                Err(ClassTableError::DuplicateClass { .. }) => {
                    let message = duplicate_class_message(ctx, &class_name, &name);
                    ctx.error(&span, message)?;
                }
                Err(e) => return Err(CompilerError::bug(e.to_string())),
            }
        }
        tracing::debug!(source = %name, classes = module.class_ids.len(), "converted");
        ctx.unit.ast = Some(module);
        Ok(())
    }
}

fn duplicate_class_message(ctx: &SourceContext<'_>, class_name: &str, source: &str) -> String {
    let table = &ctx.compile_unit.classes;
    let other = table
        .lookup(class_name)
        .and_then(|id| ctx.compile_unit.owner_of(id))
        .unwrap_or("the class path");
    if other == source {
        format!("The source {source} contains at least two definitions of the class {class_name}.")
    } else {
        format!(
            "Invalid duplicate class definition of class {class_name} : The sources {other} and {source} each contain a class with the name {class_name}."
        )
    }
}
