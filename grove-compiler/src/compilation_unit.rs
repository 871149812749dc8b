//! The phase driver
//!
//! A [`CompilationUnit`] owns the sources of one compilation and walks them
//! through the [`Phase`]s in lock step: every operation of a phase runs over
//! every unit that has not completed the phase before the next operation
//! starts. Sources queued while a phase runs (class path hits) restart the
//! walk at initialization; units already past a phase skip it.

use crate::bytecode::ClassFile;
use crate::codegen::ClassGenOperation;
use crate::compile_unit::CompileUnit;
use crate::completeness::CompileCompleteCheck;
use crate::completion_check::ClassCompletionOperation;
use crate::config::CompilerConfiguration;
use crate::enums::EnumCompletionOperation;
use crate::error::{CompileMessage, CompileResult, CompilerError, ErrorCollector};
use crate::hierarchy::{cycle_message, sort_classes, InheritanceGraph};
use crate::operation::{
    ClassContext, ClassgenCallback, Operation, PrimaryClassNodeOperation, ProgressCallback,
    SourceContext, SourceUnitOperation,
};
use crate::output::{GeneratedClass, OutputOperation};
use crate::parsing::{ConvertOperation, ParseOperation};
use crate::phases::Phase;
use crate::resolve::ResolveOperation;
use crate::scope::ScopeOperation;
use crate::source_unit::SourceUnit;
use crate::verifier::VerifierOperation;
use grove_parser::{ClassId, ClassNode, GroveParserPlugin, ParserPlugin};
use indexmap::IndexMap;
use std::any::Any;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

pub struct CompilationUnit {
    config: CompilerConfiguration,
    plugin: Box<dyn ParserPlugin>,
    sources: IndexMap<String, SourceUnit>,
    compile_unit: CompileUnit,
    errors: ErrorCollector,
    phase: Phase,
    /// Operations per phase, indexed by [`Phase::index`]
    operations: Vec<Vec<Operation>>,
    progress_callback: Option<ProgressCallback>,
    classgen_callback: Option<ClassgenCallback>,
    generated: Vec<GeneratedClass>,
    /// Primary classes in generation order, set when class generation starts
    sorted: Option<Vec<ClassId>>,
}

impl std::fmt::Debug for CompilationUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationUnit")
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl CompilationUnit {
    pub fn new(config: CompilerConfiguration) -> Self {
        Self::with_plugin(config, Box::new(GroveParserPlugin))
    }

    pub fn with_plugin(config: CompilerConfiguration, plugin: Box<dyn ParserPlugin>) -> Self {
        let errors = ErrorCollector::new(config.tolerance, config.warning_level);
        let compile_unit = CompileUnit::new(config.duplicate_source_policy);
        let mut unit = Self {
            config,
            plugin,
            sources: IndexMap::new(),
            compile_unit,
            errors,
            phase: Phase::Initialization,
            operations: Phase::ALL.iter().map(|_| Vec::new()).collect(),
            progress_callback: None,
            classgen_callback: None,
            generated: Vec::new(),
            sorted: None,
        };
        unit.add_default_operations();
        unit
    }

    fn add_default_operations(&mut self) {
        self.add_source_operation(ParseOperation, Phase::Parsing);
        self.add_source_operation(ConvertOperation, Phase::Conversion);
        self.add_class_operation(ScopeOperation, Phase::SemanticAnalysis);
        self.add_class_operation(ResolveOperation, Phase::SemanticAnalysis);
        self.add_class_operation(EnumCompletionOperation, Phase::Canonicalization);
        self.add_source_operation(CompileCompleteCheck, Phase::Canonicalization);
        self.add_class_operation(VerifierOperation, Phase::ClassGeneration);
        self.add_class_operation(ClassCompletionOperation, Phase::ClassGeneration);
        self.add_class_operation(ClassGenOperation, Phase::ClassGeneration);
        self.add_source_operation(OutputOperation, Phase::Output);
    }

    /// Appends an operation to a phase; it runs after those already there
    pub fn add_phase_operation(&mut self, operation: Operation, phase: Phase) {
        self.operations[phase.index()].push(operation);
    }

    pub fn add_source_operation(&mut self, operation: impl SourceUnitOperation + 'static, phase: Phase) {
        self.add_phase_operation(Operation::Source(Box::new(operation)), phase);
    }

    pub fn add_class_operation(
        &mut self,
        operation: impl PrimaryClassNodeOperation + 'static,
        phase: Phase,
    ) {
        self.add_phase_operation(Operation::Class(Box::new(operation)), phase);
    }

    pub fn set_progress_callback(&mut self, callback: impl FnMut(&SourceUnit, Phase) + 'static) {
        self.progress_callback = Some(Box::new(callback));
    }

    pub fn set_classgen_callback(
        &mut self,
        callback: impl FnMut(&mut ClassFile, &ClassNode) + 'static,
    ) {
        self.classgen_callback = Some(Box::new(callback));
    }

    /// Queues a source; returns the name it is known by
    ///
    /// A source whose name matches one already added is not added again.
    pub fn add_source(&mut self, unit: SourceUnit) -> String {
        self.compile_unit.queue_source(unit)
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> String {
        self.add_source(SourceUnit::from_file(path))
    }

    pub fn add_string(&mut self, name: impl Into<String>, text: impl Into<String>) -> String {
        self.add_source(SourceUnit::from_string(name, text))
    }

    pub fn add_reader(&mut self, name: impl Into<String>, reader: &mut dyn Read) -> CompileResult<String> {
        Ok(self.add_source(SourceUnit::from_reader(name, reader)?))
    }

    pub fn add_url(&mut self, url: &str) -> CompileResult<String> {
        Ok(self.add_source(SourceUnit::from_url(url)?))
    }

    pub fn config(&self) -> &CompilerConfiguration {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn errors(&self) -> &ErrorCollector {
        &self.errors
    }

    pub fn compile_unit(&self) -> &CompileUnit {
        &self.compile_unit
    }

    pub fn source(&self, name: &str) -> Option<&SourceUnit> {
        self.sources.get(name)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceUnit> {
        self.sources.values()
    }

    /// A primary class by qualified name
    pub fn class_node(&self, name: &str) -> Option<&ClassNode> {
        let table = &self.compile_unit.classes;
        table.lookup(name).and_then(|id| table.primary(id))
    }

    /// Classes generated so far, main classes before their closures
    pub fn generated_classes(&self) -> &[GeneratedClass] {
        &self.generated
    }

    /// Runs every phase up to and including `through`
    ///
    /// Continuable errors are collected per phase and returned together once
    /// the phase's operations have all run.
    pub fn compile(&mut self, through: Phase) -> CompileResult<()> {
        self.goto_phase(Phase::Initialization);
        self.dequeued();
        while self.phase <= through {
            self.enter_phase()?;
            self.process_phase()?;
            self.complete_phase();
            if self.dequeued() {
                continue;
            }
            match self.phase.next() {
                Some(next) => self.goto_phase(next),
                None => break,
            }
        }
        self.errors.fail_if_errors()
    }

    fn goto_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "phase transition");
        }
        self.phase = phase;
        self.errors.set_phase(phase);
    }

    /// Moves queued sources into the compilation, restarting at initialization
    fn dequeued(&mut self) -> bool {
        let queued = self.compile_unit.take_queued();
        if queued.is_empty() {
            return false;
        }
        for unit in queued {
            tracing::debug!(source = unit.name(), "dequeued source");
            self.sources.insert(unit.name().to_string(), unit);
        }
        self.goto_phase(Phase::Initialization);
        true
    }

    fn pending_units(&self) -> bool {
        self.sources.values().any(|unit| !unit.has_completed(self.phase))
    }

    fn enter_phase(&mut self) -> CompileResult<()> {
        match self.phase {
            Phase::Canonicalization => self.compile_unit.classes.canonicalize(),
            Phase::ClassGeneration if self.pending_units() => {
                let ids = self.compile_unit.classes_in_order(self.sources.keys().map(String::as_str));
                let table = &self.compile_unit.classes;
                let cycles = InheritanceGraph::build(table, &ids).cycles();
                for cycle in &cycles {
                    let message = cycle_message(table, cycle);
                    self.errors.add_error(CompileMessage::general(message))?;
                }
                self.errors.fail_if_errors()?;
                self.sorted = Some(sort_classes(&self.compile_unit.classes, &ids));
            }
            _ => {}
        }
        Ok(())
    }

    fn process_phase(&mut self) -> CompileResult<()> {
        let mut operations = std::mem::take(&mut self.operations[self.phase.index()]);
        let result = operations.iter_mut().try_for_each(|operation| {
            tracing::trace!(phase = %self.phase, operation = operation.name(), "running operation");
            match operation {
                Operation::Source(op) => self.apply_source_operation(op.as_mut())?,
                Operation::Class(op) => self.apply_class_operation(op.as_mut())?,
            }
            self.errors.fail_if_errors()
        });
        let index = self.phase.index();
        operations.append(&mut self.operations[index]);
        self.operations[index] = operations;
        result
    }

    fn apply_source_operation(&mut self, op: &mut dyn SourceUnitOperation) -> CompileResult<()> {
        let phase = self.phase;
        let names: Vec<String> = self
            .sources
            .values()
            .filter(|unit| !unit.has_completed(phase))
            .map(|unit| unit.name().to_string())
            .collect();
        for name in names {
            let Some(unit) = self.sources.get_mut(&name) else {
                continue;
            };
            let mut ctx = SourceContext {
                unit,
                compile_unit: &mut self.compile_unit,
                errors: &mut self.errors,
                config: &self.config,
                plugin: self.plugin.as_ref(),
                generated: &mut self.generated,
            };
            guarded(phase, &name, || op.call(&mut ctx))?;
        }
        Ok(())
    }

    fn apply_class_operation(&mut self, op: &mut dyn PrimaryClassNodeOperation) -> CompileResult<()> {
        let phase = self.phase;
        let ids = match (&self.sorted, phase) {
            (Some(sorted), Phase::ClassGeneration) => sorted.clone(),
            _ => self
                .compile_unit
                .classes_in_order(self.sources.keys().map(String::as_str)),
        };
        for id in ids {
            let Some(owner) = self.compile_unit.owner_of(id).map(str::to_string) else {
                continue;
            };
            let Some(source) = self.sources.get(&owner) else {
                continue;
            };
            if source.has_completed(phase) {
                continue;
            }
            let Some(mut class) = self.compile_unit.classes.take_primary(id) else {
                continue;
            };
            let result = {
                let mut ctx = ClassContext {
                    class: &mut class,
                    id,
                    source,
                    compile_unit: &mut self.compile_unit,
                    errors: &mut self.errors,
                    config: &self.config,
                    generated: &mut self.generated,
                    classgen_callback: self.classgen_callback.as_mut(),
                };
                guarded(phase, &owner, || op.call(&mut ctx))
            };
            self.compile_unit
                .classes
                .restore_primary(id, class)
                .map_err(|e| internal_bug(phase, &owner, e.to_string()))?;
            result?;
        }
        Ok(())
    }

    fn complete_phase(&mut self) {
        let phase = self.phase;
        for unit in self.sources.values_mut() {
            if unit.has_completed(phase) {
                continue;
            }
            if let Some(callback) = self.progress_callback.as_mut() {
                callback(unit, phase);
            }
            unit.mark_complete(phase);
        }
    }
}

/// Runs an operation, turning bugs and panics into [`CompilerError::InternalBug`]
fn guarded(
    phase: Phase,
    unit: &str,
    f: impl FnOnce() -> CompileResult<()>,
) -> CompileResult<()> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(CompilerError::Bug { message })) => Err(internal_bug(phase, unit, message)),
        Ok(Err(error)) => Err(error),
        Err(payload) => Err(internal_bug(phase, unit, panic_message(payload.as_ref()))),
    }
}

fn internal_bug(phase: Phase, unit: &str, message: String) -> CompilerError {
    tracing::warn!(%phase, unit, "{message}");
    CompilerError::InternalBug {
        phase,
        unit: unit.to_string(),
        message,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
