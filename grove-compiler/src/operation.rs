//! Phase operations and the context each one runs in

use crate::bytecode::ClassFile;
use crate::compile_unit::CompileUnit;
use crate::config::CompilerConfiguration;
use crate::error::{CompileMessage, CompileResult, ErrorCollector};
use crate::output::GeneratedClass;
use crate::source_unit::SourceUnit;
use grove_parser::{ClassId, ClassNode, ModuleNode, ParserPlugin, Span};

/// Hook invoked for every generated class before it is encoded
pub type ClassgenCallback = Box<dyn FnMut(&mut ClassFile, &ClassNode)>;

/// Hook invoked once per source unit per phase
pub type ProgressCallback = Box<dyn FnMut(&SourceUnit, crate::Phase)>;

/// Runs once for every source unit that has not completed the phase
pub trait SourceUnitOperation {
    fn name(&self) -> &str;

    fn call(&mut self, ctx: &mut SourceContext<'_>) -> CompileResult<()>;
}

/// Runs once for every primary class whose source has not completed the phase
pub trait PrimaryClassNodeOperation {
    fn name(&self) -> &str;

    fn call(&mut self, ctx: &mut ClassContext<'_>) -> CompileResult<()>;
}

pub enum Operation {
    Source(Box<dyn SourceUnitOperation>),
    Class(Box<dyn PrimaryClassNodeOperation>),
}

impl Operation {
    pub fn name(&self) -> &str {
        match self {
            Operation::Source(op) => op.name(),
            Operation::Class(op) => op.name(),
        }
    }
}

pub struct SourceContext<'a> {
    pub unit: &'a mut SourceUnit,
    pub compile_unit: &'a mut CompileUnit,
    pub errors: &'a mut ErrorCollector,
    pub config: &'a CompilerConfiguration,
    pub plugin: &'a dyn ParserPlugin,
    pub generated: &'a mut Vec<GeneratedClass>,
}

impl SourceContext<'_> {
    pub fn error(&mut self, span: &Span, message: impl Into<String>) -> CompileResult<()> {
        let message = CompileMessage::semantic(self.unit.name(), self.unit.text(), span, message);
        self.errors.add_error(message)
    }
}

pub struct ClassContext<'a> {
    /// Detached from the class table for the duration of the call
    pub class: &'a mut ClassNode,
    pub id: ClassId,
    pub source: &'a SourceUnit,
    pub compile_unit: &'a mut CompileUnit,
    pub errors: &'a mut ErrorCollector,
    pub config: &'a CompilerConfiguration,
    pub generated: &'a mut Vec<GeneratedClass>,
    pub classgen_callback: Option<&'a mut ClassgenCallback>,
}

impl ClassContext<'_> {
    pub fn module(&self) -> Option<&ModuleNode> {
        self.source.module()
    }

    pub fn error(&mut self, span: &Span, message: impl Into<String>) -> CompileResult<()> {
        let message =
            CompileMessage::semantic(self.source.name(), self.source.text(), span, message);
        self.errors.add_error(message)
    }
}

/// A source operation from a closure, for callers plugging in their own steps
pub struct FnSourceOperation<F> {
    name: String,
    f: F,
}

impl<F> FnSourceOperation<F>
where
    F: FnMut(&mut SourceContext<'_>) -> CompileResult<()>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> SourceUnitOperation for FnSourceOperation<F>
where
    F: FnMut(&mut SourceContext<'_>) -> CompileResult<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&mut self, ctx: &mut SourceContext<'_>) -> CompileResult<()> {
        (self.f)(ctx)
    }
}

/// A class operation from a closure
pub struct FnClassOperation<F> {
    name: String,
    f: F,
}

impl<F> FnClassOperation<F>
where
    F: FnMut(&mut ClassContext<'_>) -> CompileResult<()>,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> PrimaryClassNodeOperation for FnClassOperation<F>
where
    F: FnMut(&mut ClassContext<'_>) -> CompileResult<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&mut self, ctx: &mut ClassContext<'_>) -> CompileResult<()> {
        (self.f)(ctx)
    }
}
