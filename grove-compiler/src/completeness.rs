//! Reports classes a queued source was expected to define but did not

use crate::error::{CompileMessage, CompileResult};
use crate::operation::{SourceContext, SourceUnitOperation};

pub struct CompileCompleteCheck;

impl SourceUnitOperation for CompileCompleteCheck {
    fn name(&self) -> &str {
        "compile complete check"
    }

    fn call(&mut self, ctx: &mut SourceContext<'_>) -> CompileResult<()> {
        let source = ctx.unit.name();
        let missing: Vec<String> = ctx
            .compile_unit
            .classes_to_compile()
            .filter(|(_, expected)| *expected == source)
            .map(|(name, _)| name.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        let table = &ctx.compile_unit.classes;
        let defined: Vec<&str> = ctx
            .compile_unit
            .classes_of(source)
            .iter()
            .map(|&id| table.name_of(id))
            .collect();
        let messages: Vec<String> = missing
            .iter()
            .map(|name| incomplete_message(name, source, &defined))
            .collect();
        for message in messages {
            ctx.errors.add_error(CompileMessage::general(message))?;
        }
        Ok(())
    }
}

pub fn incomplete_message(class: &str, source: &str, defined: &[&str]) -> String {
    let found = if defined.is_empty() {
        "the file seems not to contain any classes".to_string()
    } else {
        format!("the file contains the classes: {}", defined.join(", "))
    };
    format!("Compilation incomplete: expected to find the class {class} in {source}, but {found}")
}
