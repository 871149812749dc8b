//! Grove compiler
//!
//! Drives Grove sources through a fixed sequence of phases and produces one
//! encoded class record per class.
//!
//! ## Architecture
//!
//! - **Compilation unit**: queues sources, walks them through the phases in
//!   lock step and collects continuable errors per phase
//! - **Semantic analysis**: variable scoping and class resolution over the
//!   mutable AST, with the class table's redirect model standing in for
//!   classes not yet compiled
//! - **Canonicalization**: enum completion and the incomplete-compilation check
//! - **Verifier**: adds everything the source leaves implicit (accessors,
//!   default constructors, default-argument overloads, returns, bridges)
//! - **Class generation**: stack code where every call goes through a call
//!   site, encoded for the runtime

pub mod bytecode;
pub mod classpath;
pub mod codegen;
pub mod compilation_unit;
pub mod compile_unit;
pub mod completeness;
pub mod completion_check;
pub mod config;
pub mod enums;
pub mod error;
pub mod hierarchy;
pub mod operation;
pub mod output;
pub mod parsing;
pub mod phases;
pub mod resolve;
pub mod scope;
pub mod source_unit;
mod synthetic;
pub mod verifier;
pub mod visitor;

pub use bytecode::{
    decode, encode, CallSiteInfo, CallSiteKind, ClassFile, Comparison, DecodeError,
    ExceptionEntry, FieldInfo, Instruction, MethodInfo,
};
pub use compilation_unit::CompilationUnit;
pub use compile_unit::CompileUnit;
pub use config::{
    CompilerConfiguration, DuplicateSourcePolicy, JointCompilationOptions, WarningLevel,
};
pub use error::{
    CompilationFailed, CompileMessage, CompileResult, CompileWarning, CompilerError, ConfigError,
    ErrorCollector,
};
pub use operation::{
    ClassContext, FnClassOperation, FnSourceOperation, Operation, PrimaryClassNodeOperation,
    SourceContext, SourceUnitOperation,
};
pub use output::GeneratedClass;
pub use phases::Phase;
pub use source_unit::{SourceOrigin, SourceUnit};

/// Compiles in-memory sources through output and returns the generated classes
pub fn compile_sources<'a>(
    config: CompilerConfiguration,
    sources: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> CompileResult<Vec<GeneratedClass>> {
    let mut unit = CompilationUnit::new(config);
    for (name, text) in sources {
        unit.add_string(name, text);
    }
    unit.compile(Phase::Output)?;
    Ok(unit.generated_classes().to_vec())
}

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
