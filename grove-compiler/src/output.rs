//! Generated class records and writing them to the target directory

use crate::bytecode::{encode, ClassFile};
use crate::error::{CompileResult, CompilerError};
use crate::operation::{SourceContext, SourceUnitOperation};
use grove_parser::names;
use std::path::{Path, PathBuf};

/// A class produced by the compilation: qualified name and encoded bytes
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedClass {
    pub name: String,
    /// Source unit the class came from
    pub source: String,
    pub bytes: Vec<u8>,
}

impl GeneratedClass {
    pub fn new(file: &ClassFile, source: &str) -> Self {
        Self {
            name: file.name.clone(),
            source: source.to_string(),
            bytes: encode(file),
        }
    }

    /// `<root>/<package path>/<Name>.class`
    pub fn path_in(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        let package = names::package_of(&self.name);
        if !package.is_empty() {
            path.extend(package.split('.'));
        }
        path.push(format!("{}.class", names::simple_name(&self.name)));
        path
    }
}

/// Writes the unit's classes when a target directory is configured
pub struct OutputOperation;

impl SourceUnitOperation for OutputOperation {
    fn name(&self) -> &str {
        "output"
    }

    fn call(&mut self, ctx: &mut SourceContext<'_>) -> CompileResult<()> {
        let Some(target) = ctx.config.target_directory.as_ref() else {
            return Ok(());
        };
        let source = ctx.unit.name();
        for class in ctx.generated.iter().filter(|c| c.source == source) {
            let path = class.path_in(target);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CompilerError::io(parent.display(), &e))?;
            }
            std::fs::write(&path, &class.bytes).map_err(|e| CompilerError::io(path.display(), &e))?;
            tracing::debug!(class = %class.name, path = %path.display(), "wrote class");
        }
        Ok(())
    }
}
