//! Class generation: verified class nodes -> [`ClassFile`]s
//!
//! Every method compiles to stack code where calls, property access and
//! arithmetic go through call sites, so dispatch happens at run time. Each
//! closure expression becomes its own class, `Outer$_method_closureN`,
//! extending `grove.lang.Closure` with a `doCall` method. The closure's
//! frame holds the owner in slot 0, then the captured reference cells, then
//! the parameters.

mod expressions;
mod frame;
mod statements;

use crate::bytecode::{ClassFile, FieldInfo, Instruction, MethodInfo, ACC_BRIDGE, ACC_SYNTHETIC};
use crate::error::CompileResult;
use crate::operation::{ClassContext, PrimaryClassNodeOperation};
use crate::output::GeneratedClass;
use crate::verifier::Problem;
use frame::{Local, MethodCompiler};
use grove_parser::names;
use grove_parser::{ClassNode, ClassTable, MethodNode, Modifier, Modifiers, Parameter, Span};

pub struct ClassGenOperation;

impl PrimaryClassNodeOperation for ClassGenOperation {
    fn name(&self) -> &str {
        "class generation"
    }

    fn call(&mut self, ctx: &mut ClassContext<'_>) -> CompileResult<()> {
        let generation = generate_class(ctx.class, &ctx.compile_unit.classes)?;
        for problem in generation.problems {
            ctx.error(&problem.span, problem.message)?;
        }

        let mut main = generation.class;
        if let Some(callback) = ctx.classgen_callback.as_mut() {
            callback(&mut main, ctx.class);
        }
        tracing::debug!(class = %main.name, methods = main.methods.len(), "generated class");
        ctx.generated.push(GeneratedClass::new(&main, ctx.source.name()));

        for (mut closure, node) in generation.closures {
            if let Some(callback) = ctx.classgen_callback.as_mut() {
                callback(&mut closure, &node);
            }
            tracing::debug!(class = %closure.name, "generated closure class");
            ctx.generated.push(GeneratedClass::new(&closure, ctx.source.name()));
        }
        Ok(())
    }
}

/// Output of generating one primary class
pub struct Generation {
    pub class: ClassFile,
    /// Closure classes with the synthetic nodes describing them
    pub closures: Vec<(ClassFile, ClassNode)>,
    pub problems: Vec<Problem>,
}

/// Shared by every method compiled for one primary class
pub(crate) struct GenerationState {
    outer: String,
    source: String,
    closure_count: usize,
    closures: Vec<(ClassFile, ClassNode)>,
    problems: Vec<Problem>,
}

impl GenerationState {
    fn next_closure_name(&mut self, method: &str) -> String {
        self.closure_count += 1;
        let method: String = method
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
            .collect();
        format!("{}$_{method}_closure{}", self.outer, self.closure_count)
    }

    fn problem(&mut self, span: &Span, message: impl Into<String>) {
        self.problems.push(Problem {
            span: span.clone(),
            message: message.into(),
        });
    }
}

pub fn generate_class(class: &ClassNode, table: &ClassTable) -> CompileResult<Generation> {
    let mut file = ClassFile::new(&class.name, class.kind);
    file.super_name = class
        .super_class
        .as_ref()
        .map(|s| s.erasure_name().to_string())
        .or_else(|| (!class.is_interface()).then(|| names::OBJECT.to_string()));
    file.interfaces = class
        .interfaces
        .iter()
        .map(|i| i.erasure_name().to_string())
        .collect();
    file.flags = class.modifiers.bits() | if class.synthetic { ACC_SYNTHETIC } else { 0 };
    file.source_file = Some(class.source_name.clone());
    file.fields = class
        .fields
        .iter()
        .map(|field| FieldInfo {
            name: field.name.clone(),
            type_name: field.field_type.erasure_name().to_string(),
            flags: field.modifiers.bits() | if field.synthetic { ACC_SYNTHETIC } else { 0 },
        })
        .collect();

    let mut state = GenerationState {
        outer: class.name.clone(),
        source: class.source_name.clone(),
        closure_count: 0,
        closures: Vec::new(),
        problems: Vec::new(),
    };
    for method in class.constructors.iter().chain(class.methods.iter()) {
        let info = compile_method(&mut file, &mut state, table, method)?;
        file.methods.push(info);
    }

    Ok(Generation {
        class: file,
        closures: state.closures,
        problems: state.problems,
    })
}

fn method_flags(method: &MethodNode) -> u16 {
    let mut flags = method.modifiers.bits();
    if method.is_abstract() {
        flags |= Modifiers::empty().with(Modifier::Abstract).bits();
    }
    if method.synthetic {
        flags |= ACC_SYNTHETIC;
    }
    if method.bridge {
        flags |= ACC_BRIDGE;
    }
    flags
}

fn compile_method(
    file: &mut ClassFile,
    state: &mut GenerationState,
    table: &ClassTable,
    method: &MethodNode,
) -> CompileResult<MethodInfo> {
    let mut info = MethodInfo {
        name: method.name.clone(),
        parameter_types: method
            .erased_parameter_types()
            .into_iter()
            .map(str::to_string)
            .collect(),
        return_type: method.return_type.erasure_name().to_string(),
        flags: method_flags(method),
        max_locals: 1 + method.parameters.len() as u16,
        instructions: Vec::new(),
        exception_table: Vec::new(),
    };
    let Some(body) = method.body.as_ref() else {
        return Ok(info);
    };

    let mut compiler = MethodCompiler::new(file, state, table, &method.name, 1);
    compiler.declare_parameters(&method.parameters);
    compiler.compile_statement(body)?;
    compiler.finish();

    info.max_locals = compiler.frame.max_locals;
    info.instructions = compiler.code;
    info.exception_table = compiler.exception_table;
    Ok(info)
}

impl MethodCompiler<'_> {
    /// Binds parameters to the slots after the reserved ones, boxing shared ones
    fn declare_parameters(&mut self, parameters: &[Parameter]) {
        let locals: Vec<(Local, bool)> = parameters
            .iter()
            .map(|p| (self.frame.declare(&p.name, false), p.closure_shared))
            .collect();
        for (parameter, (local, shared)) in parameters.iter().zip(locals) {
            if shared {
                self.emit(Instruction::Load(local.slot));
                self.emit(Instruction::NewRef);
                self.emit(Instruction::Store(local.slot));
                self.frame.bind(
                    &parameter.name,
                    Local {
                        slot: local.slot,
                        shared: true,
                    },
                );
            }
        }
    }
}
