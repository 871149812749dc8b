//! Statement code; a statement leaves the stack as it found it
//!
//! `finally` blocks and monitor exits are inlined on every normal exit from
//! their region (fall through, `return`, `break`, `continue`). Exceptional
//! exits go through a catch-all handler whose ranges skip the inlined copies.

use super::frame::{Cleanup, LoopLabels, MethodCompiler};
use crate::bytecode::{ExceptionEntry, Instruction};
use crate::error::CompileResult;
use grove_parser::names;
use grove_parser::{
    ForInStatement, IfStatement, Statement, StatementKind, SynchronizedStatement, TryStatement,
    WhileStatement,
};

impl MethodCompiler<'_> {
    pub(super) fn compile_statement(&mut self, statement: &Statement) -> CompileResult<()> {
        match &statement.kind {
            StatementKind::Block(statements) => {
                self.frame.push_scope();
                let result = statements
                    .iter()
                    .try_for_each(|statement| self.compile_statement(statement));
                self.frame.pop_scope();
                result?;
            }
            StatementKind::Expression(expression) => {
                self.compile_expression(expression)?;
                self.emit(Instruction::Pop);
            }
            StatementKind::Declaration(declaration) => {
                match declaration.initial.as_ref() {
                    Some(initial) => self.compile_expression(initial)?,
                    None => {
                        self.emit(Instruction::PushNull);
                    }
                }
                self.define(&declaration.name, declaration.closure_shared);
            }
            StatementKind::If(if_statement) => self.compile_if(if_statement)?,
            StatementKind::While(while_statement) => self.compile_while(while_statement)?,
            StatementKind::ForIn(for_statement) => self.compile_for_in(for_statement)?,
            StatementKind::Return(value) => {
                match value {
                    Some(value) => self.compile_expression(value)?,
                    None => {
                        self.emit(Instruction::PushNull);
                    }
                }
                if !self.cleanups.is_empty() {
                    let result = self.frame.temp();
                    self.emit(Instruction::Store(result));
                    self.inline_cleanups(0)?;
                    self.emit(Instruction::Load(result));
                }
                self.emit(Instruction::Return);
            }
            StatementKind::Throw(exception) => {
                self.compile_expression(exception)?;
                self.emit(Instruction::Throw);
            }
            StatementKind::Break => {
                let Some(depth) = self.loops.last().map(|l| l.cleanup_depth) else {
                    self.problem(&statement.span, "the break statement is only allowed inside loops");
                    return Ok(());
                };
                self.inline_cleanups(depth)?;
                let jump = self.emit(Instruction::Jump(0));
                if let Some(labels) = self.loops.last_mut() {
                    labels.breaks.push(jump);
                }
            }
            StatementKind::Continue => {
                let Some((depth, target)) = self
                    .loops
                    .last()
                    .map(|l| (l.cleanup_depth, l.continue_target))
                else {
                    self.problem(
                        &statement.span,
                        "the continue statement is only allowed inside loops",
                    );
                    return Ok(());
                };
                self.inline_cleanups(depth)?;
                self.emit(Instruction::Jump(target as u32));
            }
            StatementKind::Try(try_statement) => self.compile_try(try_statement)?,
            StatementKind::Synchronized(synchronized) => self.compile_synchronized(synchronized)?,
            StatementKind::Empty => {}
        }
        Ok(())
    }

    fn compile_if(&mut self, if_statement: &IfStatement) -> CompileResult<()> {
        self.compile_expression(&if_statement.condition)?;
        let to_else = self.emit(Instruction::JumpIfFalse(0));
        self.compile_statement(&if_statement.then_branch)?;
        match if_statement.else_branch.as_deref() {
            Some(else_branch) => {
                let to_end = self.emit(Instruction::Jump(0));
                self.patch_here(to_else);
                self.compile_statement(else_branch)?;
                self.patch_here(to_end);
            }
            None => self.patch_here(to_else),
        }
        Ok(())
    }

    fn compile_while(&mut self, while_statement: &WhileStatement) -> CompileResult<()> {
        let start = self.here();
        self.compile_expression(&while_statement.condition)?;
        let exit = self.emit(Instruction::JumpIfFalse(0));
        self.enter_loop(start);
        let result = self.compile_statement(&while_statement.body);
        self.emit(Instruction::Jump(start as u32));
        self.patch_here(exit);
        self.leave_loop();
        result
    }

    fn compile_for_in(&mut self, for_statement: &ForInStatement) -> CompileResult<()> {
        self.frame.push_scope();
        self.compile_expression(&for_statement.collection)?;
        self.emit(Instruction::GetIterator);
        let iterator = self.frame.temp();
        self.emit(Instruction::Store(iterator));

        let start = self.here();
        self.emit(Instruction::Load(iterator));
        let exit = self.emit(Instruction::IterNext(0));
        self.enter_loop(start);
        self.frame.push_scope();
        let variable = &for_statement.variable;
        self.define(&variable.name, variable.closure_shared);
        let result = self.compile_statement(&for_statement.body);
        self.frame.pop_scope();
        self.emit(Instruction::Jump(start as u32));
        self.patch_here(exit);
        self.leave_loop();
        self.frame.pop_scope();
        result
    }

    fn enter_loop(&mut self, continue_target: usize) {
        self.loops.push(LoopLabels {
            continue_target,
            breaks: Vec::new(),
            cleanup_depth: self.cleanups.len(),
        });
    }

    /// Points the loop's breaks at the current position
    fn leave_loop(&mut self) {
        if let Some(labels) = self.loops.pop() {
            for jump in labels.breaks {
                self.patch_here(jump);
            }
        }
    }

    /// Emits the cleanups above `depth`, innermost first
    ///
    /// While one cleanup is compiled only the cleanups outside it are
    /// active, so a `return` inside a `finally` does not run it again.
    fn inline_cleanups(&mut self, depth: usize) -> CompileResult<()> {
        let pending = self.cleanups.split_off(depth);
        let mut result = Ok(());
        for (index, cleanup) in pending.iter().enumerate().rev() {
            self.cleanups.truncate(depth);
            self.cleanups.extend(pending[..index].iter().cloned());
            let start = self.here();
            match cleanup {
                Cleanup::Monitor(slot) => {
                    self.emit(Instruction::Load(*slot));
                    self.emit(Instruction::MonitorExit);
                }
                Cleanup::Finally(block) => result = self.compile_statement(block),
            }
            let end = self.here();
            self.inlined.push((depth + index, start, end));
            if result.is_err() {
                break;
            }
        }
        self.cleanups.truncate(depth);
        self.cleanups.extend(pending);
        result
    }

    /// `[start, end)` without the cleanups inlined for regions at or outside `position`
    fn protected_ranges(
        &self,
        start: usize,
        end: usize,
        position: usize,
        since: usize,
    ) -> Vec<(usize, usize)> {
        let mut holes: Vec<(usize, usize)> = self.inlined[since..]
            .iter()
            .filter(|(at, from, to)| *at <= position && *from >= start && *to <= end)
            .map(|(_, from, to)| (*from, *to))
            .collect();
        holes.sort();
        let mut ranges = Vec::new();
        let mut cursor = start;
        for (from, to) in holes {
            if from > cursor {
                ranges.push((cursor, from));
            }
            cursor = cursor.max(to);
        }
        if end > cursor {
            ranges.push((cursor, end));
        }
        ranges
    }

    fn protect(&mut self, ranges: &[(usize, usize)], handler: usize, catch_type: Option<u16>) {
        for &(start, end) in ranges {
            self.exception_table.push(ExceptionEntry {
                start: start as u32,
                end: end as u32,
                handler: handler as u32,
                catch_type,
            });
        }
    }

    fn compile_try(&mut self, try_statement: &TryStatement) -> CompileResult<()> {
        let position = self.cleanups.len();
        let since = self.inlined.len();
        if let Some(finally) = try_statement.finally.as_deref() {
            self.cleanups.push(Cleanup::Finally(finally.clone()));
        }

        let body_start = self.here();
        self.compile_statement(&try_statement.body)?;
        let body_ranges = self.protected_ranges(body_start, self.here(), position, since);
        let mut exits = vec![self.emit(Instruction::Jump(0))];

        let mut catch_ranges = Vec::new();
        for catch in &try_statement.catches {
            let parameter = &catch.parameter;
            let caught = if parameter.param_type.is_dynamic()
                || parameter.param_type.erasure_name() == names::OBJECT
            {
                names::THROWABLE
            } else {
                parameter.param_type.erasure_name()
            };
            let caught = self.constant(caught);
            let handler = self.here();
            self.protect(&body_ranges, handler, Some(caught));

            self.frame.push_scope();
            self.define(&parameter.name, parameter.closure_shared);
            let result = self.compile_statement(&catch.body);
            self.frame.pop_scope();
            result?;
            catch_ranges.extend(self.protected_ranges(handler, self.here(), position, since));
            exits.push(self.emit(Instruction::Jump(0)));
        }

        let Some(finally) = try_statement.finally.as_deref() else {
            for exit in exits {
                self.patch_here(exit);
            }
            return Ok(());
        };
        self.cleanups.truncate(position);

        let handler = self.here();
        let ranges: Vec<(usize, usize)> = body_ranges.into_iter().chain(catch_ranges).collect();
        self.protect(&ranges, handler, None);
        let exception = self.frame.temp();
        self.emit(Instruction::Store(exception));
        self.compile_statement(finally)?;
        self.emit(Instruction::Load(exception));
        self.emit(Instruction::Throw);

        for exit in exits {
            self.patch_here(exit);
        }
        self.compile_statement(finally)
    }

    fn compile_synchronized(&mut self, synchronized: &SynchronizedStatement) -> CompileResult<()> {
        self.compile_expression(&synchronized.monitor)?;
        self.emit(Instruction::Dup);
        let monitor = self.frame.temp();
        self.emit(Instruction::Store(monitor));
        self.emit(Instruction::MonitorEnter);

        let position = self.cleanups.len();
        let since = self.inlined.len();
        self.cleanups.push(Cleanup::Monitor(monitor));
        let start = self.here();
        let result = self.compile_statement(&synchronized.body);
        let ranges = self.protected_ranges(start, self.here(), position, since);
        self.cleanups.truncate(position);
        result?;

        self.emit(Instruction::Load(monitor));
        self.emit(Instruction::MonitorExit);
        let to_end = self.emit(Instruction::Jump(0));

        let handler = self.here();
        self.protect(&ranges, handler, None);
        let exception = self.frame.temp();
        self.emit(Instruction::Store(exception));
        self.emit(Instruction::Load(monitor));
        self.emit(Instruction::MonitorExit);
        self.emit(Instruction::Load(exception));
        self.emit(Instruction::Throw);
        self.patch_here(to_end);
        Ok(())
    }
}
