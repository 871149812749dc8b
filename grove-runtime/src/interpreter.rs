//! The bytecode interpreter
//!
//! One [`Frame`] per invocation: slot 0 holds the receiver (the class value
//! for static methods, the owner for closures), the arguments follow. Every
//! call goes through the class's call sites; the interpreter itself only
//! handles the structural instructions.
//!
//! A failing instruction is first turned into a Grove exception where
//! possible, then matched against the method's exception table. The first
//! matching entry wins; its handler starts with the exception alone on the
//! stack.

use crate::class::ClassRef;
use crate::error::{RuntimeError, RuntimeResult};
use crate::object::ObjectRef;
use crate::runtime::Runtime;
use crate::value::{read, write, GStringValue, Value};
use grove_compiler::bytecode::{CallSiteKind, ClassFile, Instruction, MethodInfo};
use grove_parser::names;
use std::cell::Cell;
use std::sync::Arc;

/// Name of the method every closure class implements
pub const DO_CALL: &str = "doCall";

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts one level of nesting on this thread while alive
struct DepthGuard;

impl DepthGuard {
    fn enter(max_depth: usize) -> RuntimeResult<Self> {
        DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > max_depth {
                return Err(RuntimeError::StackOverflow { max_depth });
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Runs method `index` of `class`
pub fn execute(
    rt: &Runtime,
    class: &ClassRef,
    index: usize,
    receiver: Value,
    arguments: Vec<Value>,
) -> RuntimeResult<Value> {
    let (Some(file), Some(method)) = (class.file(), class.method_at(index)) else {
        return Err(RuntimeError::InvalidCode {
            class: class.name.clone(),
            method: format!("#{index}"),
            pc: 0,
            message: "no such method".to_string(),
        });
    };
    let _depth = DepthGuard::enter(rt.config().max_call_depth)?;
    let mut frame = Frame::new(rt, class, file, method, receiver, arguments);
    frame.run()
}

enum Flow {
    Next,
    Jump(usize),
    Return(Value),
}

struct Frame<'a> {
    rt: &'a Runtime,
    class: &'a ClassRef,
    file: &'a ClassFile,
    method: &'a MethodInfo,
    locals: Vec<Value>,
    stack: Vec<Value>,
    pc: usize,
}

impl<'a> Frame<'a> {
    fn new(
        rt: &'a Runtime,
        class: &'a ClassRef,
        file: &'a ClassFile,
        method: &'a MethodInfo,
        receiver: Value,
        arguments: Vec<Value>,
    ) -> Self {
        let size = (method.max_locals as usize).max(arguments.len() + 1);
        let mut locals = Vec::with_capacity(size);
        locals.push(receiver);
        locals.extend(arguments);
        locals.resize(size, Value::Null);
        Self {
            rt,
            class,
            file,
            method,
            locals,
            stack: Vec::new(),
            pc: 0,
        }
    }

    fn run(&mut self) -> RuntimeResult<Value> {
        loop {
            let Some(instruction) = self.method.instructions.get(self.pc) else {
                return Err(self.invalid("ran past the last instruction"));
            };
            match self.step(instruction) {
                Ok(Flow::Next) => self.pc += 1,
                Ok(Flow::Jump(target)) => self.pc = target,
                Ok(Flow::Return(value)) => return Ok(value),
                Err(error) => {
                    let error = self.rt.unwrap(error);
                    let handler = error
                        .thrown()
                        .and_then(|exception| Some((self.handler_for(exception)?, Arc::clone(exception))));
                    let Some((handler, exception)) = handler else {
                        return Err(error);
                    };
                    tracing::trace!(
                        class = %self.class.name,
                        method = %self.method.name,
                        exception = %exception.class.name,
                        handler,
                        "caught exception"
                    );
                    self.stack.clear();
                    self.stack.push(Value::Object(exception));
                    self.pc = handler;
                }
            }
        }
    }

    fn handler_for(&self, exception: &ObjectRef) -> Option<usize> {
        let pc = self.pc as u32;
        self.method
            .exception_table
            .iter()
            .find(|entry| {
                entry.start <= pc
                    && pc < entry.end
                    && entry.catch_type.is_none_or(|index| {
                        self.file
                            .constant_at(index)
                            .is_some_and(|caught| exception.class.is_assignable_to(caught))
                    })
            })
            .map(|entry| entry.handler as usize)
    }

    fn step(&mut self, instruction: &Instruction) -> RuntimeResult<Flow> {
        match instruction {
            Instruction::Nop => {}
            Instruction::PushNull => self.push(Value::Null),
            Instruction::PushTrue => self.push(Value::Bool(true)),
            Instruction::PushFalse => self.push(Value::Bool(false)),
            Instruction::PushInt(i) => self.push(Value::Int(*i)),
            Instruction::PushFloat(x) => self.push(Value::Float(*x)),
            Instruction::PushConst(index) => {
                let text = Value::string(self.constant(*index)?);
                self.push(text);
            }
            Instruction::PushClass(index) => {
                let class = self.rt.load_class(self.constant(*index)?)?;
                self.push(Value::Class(class));
            }
            Instruction::Pop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let top = self.stack.last().cloned().ok_or_else(|| self.invalid("stack underflow"))?;
                self.push(top);
            }
            Instruction::Swap => {
                let top = self.pop()?;
                let below = self.pop()?;
                self.push(top);
                self.push(below);
            }
            Instruction::Load(slot) => {
                let value = self.local(*slot)?.clone();
                self.push(value);
            }
            Instruction::Store(slot) => {
                let value = self.pop()?;
                *self.local_mut(*slot)? = value;
            }
            Instruction::NewRef => {
                let value = self.pop()?;
                self.push(Value::reference(value));
            }
            Instruction::LoadRef(slot) => {
                let value = match self.local(*slot)? {
                    Value::Ref(cell) => read(cell).clone(),
                    other => other.clone(),
                };
                self.push(value);
            }
            Instruction::StoreRef(slot) => {
                let value = self.pop()?;
                let local = self.local_mut(*slot)?;
                match local {
                    Value::Ref(cell) => *write(cell) = value,
                    other => *other = Value::reference(value),
                }
            }
            Instruction::GetField(index) => {
                let name = self.constant(*index)?;
                let object = self.pop()?;
                let value = self.get_field(&object, name)?;
                self.push(value);
            }
            Instruction::SetField(index) => {
                let name = self.constant(*index)?;
                let value = self.pop()?;
                let object = self.pop()?;
                self.set_field(&object, name, value.clone())?;
                self.push(value);
            }
            Instruction::GetStatic { class, name } => {
                let class = self.rt.load_class(self.constant(*class)?)?;
                let value = self.rt.static_field(&class, self.constant(*name)?)?;
                self.push(value);
            }
            Instruction::SetStatic { class, name } => {
                let class = self.rt.load_class(self.constant(*class)?)?;
                let value = self.pop()?;
                self.rt.set_static_field(&class, self.constant(*name)?, value.clone())?;
                self.push(value);
            }
            Instruction::Call { site, argc } => {
                let site = self
                    .class
                    .sites()
                    .get(*site as usize)
                    .ok_or_else(|| self.invalid(format!("no call site {site}")))?;
                let arguments = self.pop_n(*argc as usize)?;
                let receiver = match site.kind() {
                    CallSiteKind::Constructor => Value::Null,
                    _ => self.pop()?,
                };
                let result = site.call(self.rt, receiver, arguments)?;
                self.push(result);
            }
            Instruction::CmpZero(comparison) => {
                let ordering = self.pop()?;
                let ordering = match ordering {
                    Value::Int(i) => i,
                    Value::Float(x) if x < 0.0 => -1,
                    Value::Float(x) if x > 0.0 => 1,
                    Value::Float(_) => 0,
                    other => {
                        return Err(RuntimeError::illegal_state(format!(
                            "compareTo returned {} instead of a number",
                            other.class_name()
                        )));
                    }
                };
                self.push(Value::Bool(comparison.holds(ordering)));
            }
            Instruction::Eq | Instruction::Ne => {
                let right = self.pop()?;
                let left = self.pop()?;
                let equal = self.rt.values_equal(&left, &right)?;
                self.push(Value::Bool(equal == matches!(instruction, Instruction::Eq)));
            }
            Instruction::Not => {
                let value = self.pop()?;
                self.push(Value::Bool(!value.is_truthy()));
            }
            Instruction::Jump(target) => return Ok(Flow::Jump(*target as usize)),
            Instruction::JumpIfFalse(target) => {
                if !self.pop()?.is_truthy() {
                    return Ok(Flow::Jump(*target as usize));
                }
            }
            Instruction::JumpIfTrue(target) => {
                if self.pop()?.is_truthy() {
                    return Ok(Flow::Jump(*target as usize));
                }
            }
            Instruction::JumpIfNull(target) => {
                if self.pop()?.is_null() {
                    return Ok(Flow::Jump(*target as usize));
                }
            }
            Instruction::JumpIfNonNull(target) => {
                if !self.pop()?.is_null() {
                    return Ok(Flow::Jump(*target as usize));
                }
            }
            Instruction::NewList(count) => {
                let items = self.pop_n(*count as usize)?;
                self.push(Value::list(items));
            }
            Instruction::NewMap(count) => {
                let flat = self.pop_n(*count as usize * 2)?;
                let mut entries = Vec::with_capacity(*count as usize);
                let mut values = flat.into_iter();
                while let (Some(key), Some(value)) = (values.next(), values.next()) {
                    entries.push((map_key(key), value));
                }
                self.push(Value::map(entries));
            }
            Instruction::NewGString { strings, values } => {
                let values = self.pop_n(*values as usize)?;
                let strings = strings
                    .iter()
                    .map(|index| self.constant(*index).map(str::to_string))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                let mut text = String::new();
                for (index, literal) in strings.iter().enumerate() {
                    text.push_str(literal);
                    if let Some(value) = values.get(index) {
                        text.push_str(&self.rt.to_display_string(value)?);
                    }
                }
                for value in values.iter().skip(strings.len()) {
                    text.push_str(&self.rt.to_display_string(value)?);
                }
                self.push(Value::GString(Arc::new(GStringValue {
                    strings,
                    values,
                    text,
                })));
            }
            Instruction::MakeClosure { class, captured } => {
                let class = self.rt.load_class(self.constant(*class)?)?;
                let captured = self.pop_n(*captured as usize)?;
                let owner = self.pop()?;
                self.push(Value::Closure(Arc::new(crate::value::Closure {
                    class,
                    owner,
                    captured,
                })));
            }
            Instruction::Cast(index) => {
                let value = self.pop()?;
                let cast = self.rt.cast(value, self.constant(*index)?)?;
                self.push(cast);
            }
            Instruction::InstanceOf(index) => {
                let value = self.pop()?;
                let is = self.rt.is_instance(&value, self.constant(*index)?);
                self.push(Value::Bool(is));
            }
            Instruction::Throw => {
                let value = self.pop()?;
                return Err(match value {
                    Value::Object(object) if object.class.distance_to(names::THROWABLE).is_some() => {
                        RuntimeError::Thrown(object)
                    }
                    Value::Null => RuntimeError::null_pointer("Cannot throw null"),
                    other => RuntimeError::ClassCast {
                        value: other.to_plain_string(),
                        from: other.class_name(),
                        to: names::THROWABLE.to_string(),
                    },
                });
            }
            Instruction::MonitorEnter => {
                let value = self.pop()?;
                self.rt.monitor_of(&value)?.enter();
            }
            Instruction::MonitorExit => {
                let value = self.pop()?;
                self.rt.monitor_of(&value)?.exit()?;
            }
            Instruction::GetIterator => {
                let value = self.pop()?;
                let iterator = self.rt.iterator_of(&value)?;
                self.push(Value::Iterator(iterator));
            }
            Instruction::IterNext(target) => {
                let Value::Iterator(iterator) = self.pop()? else {
                    return Err(self.invalid("iterating over a value that is not an iterator"));
                };
                match self.rt.next_item(&iterator)? {
                    Some(value) => self.push(value),
                    None => return Ok(Flow::Jump(*target as usize)),
                }
            }
            Instruction::Return => {
                let value = self.stack.pop().unwrap_or_default();
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn get_field(&self, object: &Value, name: &str) -> RuntimeResult<Value> {
        match object {
            Value::Object(instance) => instance
                .try_field(name)
                .ok_or_else(|| RuntimeError::missing_property(&instance.class.name, name)),
            Value::Class(class) => self.rt.static_field(class, name),
            Value::Null => Err(RuntimeError::null_pointer(format!(
                "Cannot get field '{name}' on null object"
            ))),
            other => Err(RuntimeError::missing_property(&other.class_name(), name)),
        }
    }

    fn set_field(&self, object: &Value, name: &str, value: Value) -> RuntimeResult<()> {
        match object {
            Value::Object(instance) if instance.has_field(name) => {
                instance.set_field(name, value);
                Ok(())
            }
            Value::Object(instance) => Err(RuntimeError::missing_property(&instance.class.name, name)),
            Value::Class(class) => self.rt.set_static_field(class, name, value),
            Value::Null => Err(RuntimeError::null_pointer(format!(
                "Cannot set field '{name}' on null object"
            ))),
            other => Err(RuntimeError::missing_property(&other.class_name(), name)),
        }
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> RuntimeResult<Value> {
        self.stack.pop().ok_or_else(|| self.invalid("stack underflow"))
    }

    /// The top `count` values, deepest first
    fn pop_n(&mut self, count: usize) -> RuntimeResult<Vec<Value>> {
        let Some(start) = self.stack.len().checked_sub(count) else {
            return Err(self.invalid("stack underflow"));
        };
        Ok(self.stack.split_off(start))
    }

    fn local(&self, slot: u16) -> RuntimeResult<&Value> {
        self.locals
            .get(slot as usize)
            .ok_or_else(|| self.invalid(format!("no local slot {slot}")))
    }

    fn local_mut(&mut self, slot: u16) -> RuntimeResult<&mut Value> {
        if slot as usize >= self.locals.len() {
            return Err(self.invalid(format!("no local slot {slot}")));
        }
        Ok(&mut self.locals[slot as usize])
    }

    fn constant(&self, index: u16) -> RuntimeResult<&'a str> {
        self.file
            .constant_at(index)
            .ok_or_else(|| self.invalid(format!("no constant {index}")))
    }

    fn invalid(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::InvalidCode {
            class: self.class.name.clone(),
            method: self.method.name.clone(),
            pc: self.pc,
            message: message.into(),
        }
    }
}

/// GString keys are stored as plain strings
fn map_key(key: Value) -> Value {
    if let Value::GString(gstring) = &key {
        return Value::string(&gstring.text);
    }
    key
}
