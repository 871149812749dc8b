//! Expression code
//!
//! Every expression leaves exactly one value on the stack. Calls, property
//! access and arithmetic become call sites; only equality, negation and the
//! structural instructions are resolved here.

use super::frame::{Local, MethodCompiler};
use crate::bytecode::{
    CallSiteKind, ClassFile, Comparison, Instruction, MethodInfo, ACC_SYNTHETIC,
};
use crate::error::CompileResult;
use crate::verifier::add_value_return;
use grove_parser::names;
use grove_parser::{
    AssignmentExpression, BinaryExpression, BinaryOperator, ClassKind, ClassNode, ClassType,
    ClosureExpression, ConstantValue, ConstructorCallExpression, ConstructorCallKind, Expression,
    ExpressionKind, MethodCallExpression, MethodNode, Modifier, Modifiers, Parameter, Span,
    UnaryExpression, UnaryOperator, VariableBinding, VariableExpression,
};

/// Name of the method every closure class implements
pub const DO_CALL: &str = "doCall";

impl MethodCompiler<'_> {
    pub(super) fn compile_expression(&mut self, expression: &Expression) -> CompileResult<()> {
        match &expression.kind {
            ExpressionKind::Constant(value) => self.push_constant(value),
            ExpressionKind::GString(gstring) => {
                for value in &gstring.values {
                    self.compile_expression(value)?;
                }
                let strings = gstring.strings.iter().map(|s| self.constant(s)).collect();
                self.emit(Instruction::NewGString {
                    strings,
                    values: gstring.values.len() as u16,
                });
            }
            ExpressionKind::List(items) => {
                for item in items {
                    self.compile_expression(item)?;
                }
                self.emit(Instruction::NewList(items.len() as u16));
            }
            ExpressionKind::Map(entries) => {
                for entry in entries {
                    self.compile_expression(&entry.key)?;
                    self.compile_expression(&entry.value)?;
                }
                self.emit(Instruction::NewMap(entries.len() as u16));
            }
            ExpressionKind::Variable(variable) => self.compile_variable(variable),
            ExpressionKind::Class(class_type) => {
                let class = self.constant(class_type.erasure_name());
                self.emit(Instruction::PushClass(class));
            }
            ExpressionKind::This | ExpressionKind::Super => {
                self.emit(Instruction::Load(0));
            }
            ExpressionKind::Property(property) => {
                self.compile_expression(&property.object)?;
                let kind = if property.safe {
                    CallSiteKind::SafeGetProperty
                } else {
                    CallSiteKind::GetProperty
                };
                self.call(kind, &property.property, 0);
            }
            ExpressionKind::Field(field) => match &field.object.kind {
                ExpressionKind::Class(owner) => {
                    let class = self.constant(owner.erasure_name());
                    let name = self.constant(&field.name);
                    self.emit(Instruction::GetStatic { class, name });
                }
                _ => {
                    self.compile_expression(&field.object)?;
                    let name = self.constant(&field.name);
                    self.emit(Instruction::GetField(name));
                }
            },
            ExpressionKind::MethodCall(call) => self.compile_method_call(call, &expression.span)?,
            ExpressionKind::ConstructorCall(call) => {
                self.compile_constructor_call(call, &expression.span)?
            }
            ExpressionKind::Closure(closure) => self.compile_closure(closure)?,
            ExpressionKind::Binary(binary) => self.compile_binary(binary)?,
            ExpressionKind::Unary(unary) => self.compile_unary(unary)?,
            ExpressionKind::Ternary(ternary) => {
                self.compile_expression(&ternary.condition)?;
                let to_else = self.emit(Instruction::JumpIfFalse(0));
                self.compile_expression(&ternary.then_branch)?;
                let to_end = self.emit(Instruction::Jump(0));
                self.patch_here(to_else);
                self.compile_expression(&ternary.else_branch)?;
                self.patch_here(to_end);
            }
            ExpressionKind::Elvis(elvis) => {
                self.compile_expression(&elvis.value)?;
                self.emit(Instruction::Dup);
                let to_end = self.emit(Instruction::JumpIfTrue(0));
                self.emit(Instruction::Pop);
                self.compile_expression(&elvis.fallback)?;
                self.patch_here(to_end);
            }
            ExpressionKind::Assignment(assignment) => {
                self.compile_assignment(assignment, &expression.span)?
            }
            ExpressionKind::Index(index) => {
                self.compile_expression(&index.object)?;
                self.compile_expression(&index.index)?;
                self.call(CallSiteKind::Method, "getAt", 1);
            }
            ExpressionKind::InstanceOf(instance_of) => {
                self.compile_expression(&instance_of.expression)?;
                let class = self.constant(instance_of.class_type.erasure_name());
                self.emit(Instruction::InstanceOf(class));
            }
            ExpressionKind::Cast(cast) => {
                self.compile_expression(&cast.expression)?;
                let class = self.constant(cast.class_type.erasure_name());
                self.emit(Instruction::Cast(class));
            }
        }
        Ok(())
    }

    fn push_constant(&mut self, value: &ConstantValue) {
        let instruction = match value {
            ConstantValue::Null => Instruction::PushNull,
            ConstantValue::Boolean(true) => Instruction::PushTrue,
            ConstantValue::Boolean(false) => Instruction::PushFalse,
            ConstantValue::Integer(i) => Instruction::PushInt(*i),
            ConstantValue::Float(x) => Instruction::PushFloat(*x),
            ConstantValue::String(s) => Instruction::PushConst(self.constant(s)),
        };
        self.emit(instruction);
    }

    /// Slot of a variable bound to a local, if the frame knows it
    fn local_slot(&self, variable: &VariableExpression) -> Option<Local> {
        match variable.binding {
            VariableBinding::Local => self.frame.lookup(&variable.name),
            VariableBinding::DynamicProperty | VariableBinding::Unresolved => None,
        }
    }

    fn compile_variable(&mut self, variable: &VariableExpression) {
        match self.local_slot(variable) {
            Some(local) => self.load(local),
            None => {
                self.emit(Instruction::Load(0));
                self.call(CallSiteKind::GetProperty, &variable.name, 0);
            }
        }
    }

    fn compile_arguments(&mut self, arguments: &[Expression], name: &str, span: &Span) -> CompileResult<()> {
        if arguments.len() > u8::MAX as usize {
            self.problem(
                span,
                format!("The call to {name} has {} arguments, at most 255 are allowed", arguments.len()),
            );
        }
        for argument in arguments {
            self.compile_expression(argument)?;
        }
        Ok(())
    }

    fn compile_method_call(&mut self, call: &MethodCallExpression, span: &Span) -> CompileResult<()> {
        let kind = if matches!(call.object.kind, ExpressionKind::Super) {
            CallSiteKind::SuperMethod
        } else if call.safe {
            CallSiteKind::SafeMethod
        } else {
            CallSiteKind::Method
        };
        self.compile_expression(&call.object)?;
        self.compile_arguments(&call.arguments, &call.method, span)?;
        self.call(kind, &call.method, call.arguments.len());
        Ok(())
    }

    fn compile_constructor_call(
        &mut self,
        call: &ConstructorCallExpression,
        span: &Span,
    ) -> CompileResult<()> {
        let (kind, name) = match call.kind {
            ConstructorCallKind::New => {
                (CallSiteKind::Constructor, call.class_type.erasure_name().to_string())
            }
            ConstructorCallKind::Super => {
                self.emit(Instruction::Load(0));
                let name = self
                    .file
                    .super_name
                    .clone()
                    .unwrap_or_else(|| names::OBJECT.to_string());
                (CallSiteKind::SuperInit, name)
            }
            ConstructorCallKind::This => {
                self.emit(Instruction::Load(0));
                (CallSiteKind::ThisInit, self.file.name.clone())
            }
        };
        self.compile_arguments(&call.arguments, &name, span)?;
        self.call(kind, &name, call.arguments.len());
        Ok(())
    }

    fn compile_binary(&mut self, binary: &BinaryExpression) -> CompileResult<()> {
        match binary.operator {
            BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => {
                let and = binary.operator == BinaryOperator::LogicalAnd;
                let short = |target| {
                    if and {
                        Instruction::JumpIfFalse(target)
                    } else {
                        Instruction::JumpIfTrue(target)
                    }
                };
                self.compile_expression(&binary.left)?;
                let first = self.emit(short(0));
                self.compile_expression(&binary.right)?;
                let second = self.emit(short(0));
                self.emit(if and { Instruction::PushTrue } else { Instruction::PushFalse });
                let to_end = self.emit(Instruction::Jump(0));
                self.patch_here(first);
                self.patch_here(second);
                self.emit(if and { Instruction::PushFalse } else { Instruction::PushTrue });
                self.patch_here(to_end);
            }
            operator => {
                self.compile_expression(&binary.left)?;
                self.compile_expression(&binary.right)?;
                self.apply_operator(operator);
            }
        }
        Ok(())
    }

    /// Both operands are on the stack
    fn apply_operator(&mut self, operator: BinaryOperator) {
        let comparison = match operator {
            BinaryOperator::Equal => {
                self.emit(Instruction::Eq);
                return;
            }
            BinaryOperator::NotEqual => {
                self.emit(Instruction::Ne);
                return;
            }
            BinaryOperator::Less => Comparison::Less,
            BinaryOperator::LessEqual => Comparison::LessEqual,
            BinaryOperator::Greater => Comparison::Greater,
            BinaryOperator::GreaterEqual => Comparison::GreaterEqual,
            other => {
                if let Some(method) = other.method_name() {
                    self.call(CallSiteKind::Method, method, 1);
                }
                return;
            }
        };
        self.call(CallSiteKind::Method, "compareTo", 1);
        self.emit(Instruction::CmpZero(comparison));
    }

    fn compile_unary(&mut self, unary: &UnaryExpression) -> CompileResult<()> {
        match unary.operator {
            UnaryOperator::Not => {
                self.compile_expression(&unary.operand)?;
                self.emit(Instruction::Not);
            }
            UnaryOperator::Negate => match &unary.operand.kind {
                ExpressionKind::Constant(ConstantValue::Integer(i)) => {
                    self.emit(Instruction::PushInt(i.wrapping_neg()));
                }
                ExpressionKind::Constant(ConstantValue::Float(x)) => {
                    self.emit(Instruction::PushFloat(-x));
                }
                _ => {
                    self.compile_expression(&unary.operand)?;
                    self.call(CallSiteKind::Method, "negative", 0);
                }
            },
        }
        Ok(())
    }

    /// Leaves the assigned value on the stack
    fn compile_assignment(&mut self, assignment: &AssignmentExpression, span: &Span) -> CompileResult<()> {
        let operator = assignment.operator.binary();
        match &assignment.target.kind {
            ExpressionKind::Variable(variable) => match self.local_slot(variable) {
                Some(local) => {
                    if let Some(operator) = operator {
                        self.load(local);
                        self.compile_expression(&assignment.value)?;
                        self.apply_operator(operator);
                    } else {
                        self.compile_expression(&assignment.value)?;
                    }
                    self.emit(Instruction::Dup);
                    self.store(local);
                }
                None => {
                    self.emit(Instruction::Load(0));
                    if let Some(operator) = operator {
                        self.emit(Instruction::Load(0));
                        self.call(CallSiteKind::GetProperty, &variable.name, 0);
                        self.compile_expression(&assignment.value)?;
                        self.apply_operator(operator);
                    } else {
                        self.compile_expression(&assignment.value)?;
                    }
                    self.call(CallSiteKind::SetProperty, &variable.name, 1);
                }
            },
            ExpressionKind::Property(property) => {
                self.compile_expression(&property.object)?;
                if let Some(operator) = operator {
                    self.emit(Instruction::Dup);
                    self.call(CallSiteKind::GetProperty, &property.property, 0);
                    self.compile_expression(&assignment.value)?;
                    self.apply_operator(operator);
                } else {
                    self.compile_expression(&assignment.value)?;
                }
                self.call(CallSiteKind::SetProperty, &property.property, 1);
            }
            ExpressionKind::Field(field) => match &field.object.kind {
                ExpressionKind::Class(owner) => {
                    let class = self.constant(owner.erasure_name());
                    let name = self.constant(&field.name);
                    if let Some(operator) = operator {
                        self.emit(Instruction::GetStatic { class, name });
                        self.compile_expression(&assignment.value)?;
                        self.apply_operator(operator);
                    } else {
                        self.compile_expression(&assignment.value)?;
                    }
                    self.emit(Instruction::SetStatic { class, name });
                }
                _ => {
                    let name = self.constant(&field.name);
                    self.compile_expression(&field.object)?;
                    if let Some(operator) = operator {
                        self.emit(Instruction::Dup);
                        self.emit(Instruction::GetField(name));
                        self.compile_expression(&assignment.value)?;
                        self.apply_operator(operator);
                    } else {
                        self.compile_expression(&assignment.value)?;
                    }
                    self.emit(Instruction::SetField(name));
                }
            },
            ExpressionKind::Index(index) => {
                let object = self.frame.temp();
                let key = self.frame.temp();
                let value = self.frame.temp();
                self.compile_expression(&index.object)?;
                self.emit(Instruction::Store(object));
                self.compile_expression(&index.index)?;
                self.emit(Instruction::Store(key));
                self.emit(Instruction::Load(object));
                self.emit(Instruction::Load(key));
                if let Some(operator) = operator {
                    self.emit(Instruction::Load(object));
                    self.emit(Instruction::Load(key));
                    self.call(CallSiteKind::Method, "getAt", 1);
                    self.compile_expression(&assignment.value)?;
                    self.apply_operator(operator);
                } else {
                    self.compile_expression(&assignment.value)?;
                }
                self.emit(Instruction::Dup);
                self.emit(Instruction::Store(value));
                self.call(CallSiteKind::Method, "putAt", 2);
                self.emit(Instruction::Pop);
                self.emit(Instruction::Load(value));
            }
            _ => {
                self.problem(span, "Invalid assignment target");
                self.compile_expression(&assignment.value)?;
            }
        }
        Ok(())
    }

    /// Generates the closure's class and leaves a new closure instance
    fn compile_closure(&mut self, closure: &ClosureExpression) -> CompileResult<()> {
        let name = self.state.next_closure_name(&self.method_name);
        let source = self.state.source.clone();
        let parameters = closure
            .parameters
            .clone()
            .unwrap_or_else(|| vec![Parameter::new("it", ClassType::object())]);
        let mut body = (*closure.body).clone();
        add_value_return(&mut body);

        let mut file = ClassFile::new(&name, ClassKind::Closure);
        file.super_name = Some(names::CLOSURE.to_string());
        file.flags = Modifiers::of(&[Modifier::Public]).bits() | ACC_SYNTHETIC;
        file.source_file = Some(source.clone());
        file.captured = closure.captured.clone();

        let captured = closure.captured.len() as u16;
        let mut do_call = MethodNode::new(
            DO_CALL,
            Modifiers::of(&[Modifier::Public]),
            ClassType::object(),
            parameters,
            Some(body),
        );
        do_call.synthetic = true;

        let info = {
            let method_name = self.method_name.clone();
            let mut nested =
                MethodCompiler::new(&mut file, &mut *self.state, self.table, &method_name, 1 + captured);
            for (index, captured_name) in closure.captured.iter().enumerate() {
                let local = Local {
                    slot: 1 + index as u16,
                    shared: true,
                };
                nested.frame.bind(captured_name, local);
            }
            nested.declare_parameters(&do_call.parameters);
            if let Some(body) = do_call.body.as_ref() {
                nested.compile_statement(body)?;
            }
            nested.finish();
            MethodInfo {
                name: DO_CALL.to_string(),
                parameter_types: do_call
                    .erased_parameter_types()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
                return_type: names::OBJECT.to_string(),
                flags: do_call.modifiers.bits() | ACC_SYNTHETIC,
                max_locals: nested.frame.max_locals,
                instructions: nested.code,
                exception_table: nested.exception_table,
            }
        };
        file.methods.push(info);

        let mut node = ClassNode::new(&name, ClassKind::Closure, source);
        node.modifiers = Modifiers::of(&[Modifier::Public]);
        node.synthetic = true;
        node.add_method(do_call);
        self.state.closures.push((file, node));

        self.emit(Instruction::Load(0));
        for captured_name in &closure.captured {
            match self.frame.lookup(captured_name) {
                Some(local) if local.shared => {
                    self.emit(Instruction::Load(local.slot));
                }
                Some(local) => {
                    self.emit(Instruction::Load(local.slot));
                    self.emit(Instruction::NewRef);
                }
                None => {
                    self.emit(Instruction::PushNull);
                    self.emit(Instruction::NewRef);
                }
            }
        }
        let class = self.constant(&name);
        self.emit(Instruction::MakeClosure { class, captured });
        Ok(())
    }
}
