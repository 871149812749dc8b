//! One input source and how far it has progressed through the phases

use crate::error::{CompileResult, CompilerError};
use crate::phases::Phase;
use grove_parser::{Cst, ModuleNode};
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum SourceOrigin {
    File(PathBuf),
    /// Text supplied directly, including drained reader streams
    Memory(String),
    /// A `file:` URL, read like a file
    Url(String),
}

#[derive(Debug, Clone)]
pub struct SourceUnit {
    name: String,
    origin: SourceOrigin,
    text: Option<String>,
    completed: Option<Phase>,
    pub cst: Option<Cst>,
    pub ast: Option<ModuleNode>,
}

impl SourceUnit {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(path.display().to_string(), SourceOrigin::File(path))
    }

    pub fn from_string(name: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut unit = Self::new(name.into(), SourceOrigin::Memory(text.clone()));
        unit.text = Some(text);
        unit
    }

    /// Drains `reader` now; the stream is not kept
    pub fn from_reader(name: impl Into<String>, reader: &mut dyn Read) -> CompileResult<Self> {
        let name = name.into();
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| CompilerError::io(&name, &e))?;
        Ok(Self::from_string(name, text))
    }

    /// Accepts `file:` URLs only
    pub fn from_url(url: &str) -> CompileResult<Self> {
        if url.strip_prefix("file:").is_none() {
            return Err(CompilerError::Io {
                path: url.to_string(),
                message: "only file: URLs can be compiled".to_string(),
            });
        }
        Ok(Self::new(url.to_string(), SourceOrigin::Url(url.to_string())))
    }

    fn new(name: String, origin: SourceOrigin) -> Self {
        Self {
            name,
            origin,
            text: None,
            completed: None,
            cst: None,
            ast: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &SourceOrigin {
        &self.origin
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.origin {
            SourceOrigin::File(path) => Some(path),
            _ => None,
        }
    }

    /// Source text, empty until it has been read
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Reads the source text if it is not loaded yet
    pub fn load(&mut self) -> std::io::Result<&str> {
        if self.text.is_none() {
            let text = match &self.origin {
                SourceOrigin::Memory(text) => text.clone(),
                SourceOrigin::File(path) => std::fs::read_to_string(path)?,
                SourceOrigin::Url(url) => {
                    let path = url.trim_start_matches("file:").trim_start_matches("//");
                    std::fs::read_to_string(path)?
                }
            };
            self.text = Some(text);
        }
        Ok(self.text())
    }

    pub fn completed_phase(&self) -> Option<Phase> {
        self.completed
    }

    pub fn has_completed(&self, phase: Phase) -> bool {
        self.completed.is_some_and(|done| done >= phase)
    }

    pub(crate) fn mark_complete(&mut self, phase: Phase) {
        if !self.has_completed(phase) {
            self.completed = Some(phase);
        }
    }

    pub fn module(&self) -> Option<&ModuleNode> {
        self.ast.as_ref()
    }
}
