//! Per-method code buffer, local slots and control-flow bookkeeping

use super::GenerationState;
use crate::bytecode::{CallSiteKind, ClassFile, ExceptionEntry, Instruction};
use grove_parser::{ClassTable, Span, Statement};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Local {
    pub slot: u16,
    /// The slot holds a reference cell shared with closures
    pub shared: bool,
}

/// Slots of the method's locals, scoped like the source
pub(super) struct Frame {
    scopes: Vec<(IndexMap<String, Local>, u16)>,
    next_slot: u16,
    pub max_locals: u16,
}

impl Frame {
    /// `reserved` slots (receiver, captured cells) are never reused
    pub fn new(reserved: u16) -> Self {
        Self {
            scopes: vec![(IndexMap::new(), reserved)],
            next_slot: reserved,
            max_locals: reserved,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push((IndexMap::new(), self.next_slot));
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            if let Some((_, start)) = self.scopes.pop() {
                self.next_slot = start;
            }
        }
    }

    pub fn declare(&mut self, name: &str, shared: bool) -> Local {
        let local = Local {
            slot: self.allocate(),
            shared,
        };
        if let Some((scope, _)) = self.scopes.last_mut() {
            scope.insert(name.to_string(), local);
        }
        local
    }

    /// Binds a name to a slot allocated elsewhere (captured cells)
    pub fn bind(&mut self, name: &str, local: Local) {
        if let Some((scope, _)) = self.scopes.last_mut() {
            scope.insert(name.to_string(), local);
        }
    }

    /// An anonymous slot, freed with the current scope
    pub fn temp(&mut self) -> u16 {
        self.allocate()
    }

    fn allocate(&mut self) -> u16 {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.max_locals = self.max_locals.max(self.next_slot);
        slot
    }

    pub fn lookup(&self, name: &str) -> Option<Local> {
        self.scopes
            .iter()
            .rev()
            .find_map(|(scope, _)| scope.get(name).copied())
    }
}

/// Work owed on every exit from a protected region
#[derive(Debug, Clone)]
pub(super) enum Cleanup {
    Finally(Statement),
    /// Monitor object kept in a slot
    Monitor(u16),
}

pub(super) struct LoopLabels {
    pub continue_target: usize,
    pub breaks: Vec<usize>,
    /// Cleanups entered before the loop; exits inline only the newer ones
    pub cleanup_depth: usize,
}

pub(super) struct MethodCompiler<'g> {
    pub file: &'g mut ClassFile,
    pub state: &'g mut GenerationState,
    pub table: &'g ClassTable,
    /// Name used for closure classes created in this method
    pub method_name: String,
    pub code: Vec<Instruction>,
    pub exception_table: Vec<ExceptionEntry>,
    pub frame: Frame,
    pub loops: Vec<LoopLabels>,
    pub cleanups: Vec<Cleanup>,
    /// Inlined cleanup code as (cleanup position, start, end)
    pub inlined: Vec<(usize, usize, usize)>,
}

impl<'g> MethodCompiler<'g> {
    pub fn new(
        file: &'g mut ClassFile,
        state: &'g mut GenerationState,
        table: &'g ClassTable,
        method_name: &str,
        reserved: u16,
    ) -> Self {
        Self {
            file,
            state,
            table,
            method_name: method_name.to_string(),
            code: Vec::new(),
            exception_table: Vec::new(),
            frame: Frame::new(reserved),
            loops: Vec::new(),
            cleanups: Vec::new(),
            inlined: Vec::new(),
        }
    }

    pub fn emit(&mut self, instruction: Instruction) -> usize {
        self.code.push(instruction);
        self.code.len() - 1
    }

    pub fn here(&self) -> usize {
        self.code.len()
    }

    /// Points the jump at `at` to `target`
    pub fn patch(&mut self, at: usize, target: usize) {
        let target = target as u32;
        if let Some(instruction) = self.code.get_mut(at) {
            match instruction {
                Instruction::Jump(t)
                | Instruction::JumpIfFalse(t)
                | Instruction::JumpIfTrue(t)
                | Instruction::JumpIfNull(t)
                | Instruction::JumpIfNonNull(t)
                | Instruction::IterNext(t) => *t = target,
                _ => {}
            }
        }
    }

    pub fn patch_here(&mut self, at: usize) {
        let target = self.here();
        self.patch(at, target);
    }

    pub fn constant(&mut self, value: &str) -> u16 {
        self.file.constant(value)
    }

    pub fn call(&mut self, kind: CallSiteKind, name: &str, argc: usize) {
        let site = self.file.call_site(kind, name);
        self.emit(Instruction::Call {
            site,
            argc: argc as u8,
        });
    }

    pub fn load(&mut self, local: Local) {
        if local.shared {
            self.emit(Instruction::LoadRef(local.slot));
        } else {
            self.emit(Instruction::Load(local.slot));
        }
    }

    /// Pops the top of the stack into the local
    pub fn store(&mut self, local: Local) {
        if local.shared {
            self.emit(Instruction::StoreRef(local.slot));
        } else {
            self.emit(Instruction::Store(local.slot));
        }
    }

    /// Declares a local and pops its initial value from the stack
    pub fn define(&mut self, name: &str, shared: bool) -> Local {
        if shared {
            self.emit(Instruction::NewRef);
        }
        let local = self.frame.declare(name, shared);
        self.emit(Instruction::Store(local.slot));
        local
    }

    /// Ends the method unless control cannot reach its end
    pub fn finish(&mut self) {
        if !self.code.last().is_some_and(Instruction::is_terminal) || self.has_jump_to_end() {
            self.emit(Instruction::PushNull);
            self.emit(Instruction::Return);
        }
    }

    fn has_jump_to_end(&self) -> bool {
        let end = self.code.len() as u32;
        self.code.iter().any(|instruction| {
            matches!(
                instruction,
                Instruction::Jump(t)
                    | Instruction::JumpIfFalse(t)
                    | Instruction::JumpIfTrue(t)
                    | Instruction::JumpIfNull(t)
                    | Instruction::JumpIfNonNull(t)
                    | Instruction::IterNext(t) if *t == end
            )
        }) || self.exception_table.iter().any(|e| e.handler == end)
    }

    pub fn problem(&mut self, span: &Span, message: impl Into<String>) {
        self.state.problem(span, message);
    }
}
