use crate::*;
use grove_compiler::bytecode::CallSiteKind;
use grove_compiler::{compile_sources, CompilerConfiguration};
use std::sync::{Arc, Mutex};

mod test_callsites;
mod test_classes;
mod test_exceptions;
mod test_metaclass;
mod test_monitor;
mod test_scripts;

pub(crate) type Output = Arc<Mutex<String>>;

/// A runtime writing into a buffer, with `source` compiled and loaded
///
/// The entry point is `None` when the source only declares classes.
pub(crate) fn load_with(config: RuntimeConfig, source: &str) -> (Runtime, Output, Option<ClassRef>) {
    let (sink, output) = OutputSink::buffer();
    let rt = Runtime::new(config.with_output(sink)).unwrap();
    let generated = compile_sources(CompilerConfiguration::default(), [("Main.grove", source)]).unwrap();
    let classes = rt.define_classes(&generated).unwrap();
    let entry = rt.entry_point(&classes);
    (rt, output, entry)
}

pub(crate) fn load(source: &str) -> (Runtime, Output, Option<ClassRef>) {
    load_with(RuntimeConfig::default(), source)
}

/// Like [`load_with`], for sources that have something to run
pub(crate) fn load_script_with(config: RuntimeConfig, source: &str) -> (Runtime, Output, ClassRef) {
    let (rt, output, entry) = load_with(config, source);
    let entry = entry.unwrap_or_else(|| panic!("nothing to run in:\n{source}"));
    (rt, output, entry)
}

pub(crate) fn load_script(source: &str) -> (Runtime, Output, ClassRef) {
    load_script_with(RuntimeConfig::default(), source)
}

pub(crate) fn run_on(rt: &Runtime, entry: &ClassRef) -> RuntimeResult<Value> {
    rt.run_main(&entry.name, &[])
}

/// Runs the script and returns what it printed
pub(crate) fn run(source: &str) -> String {
    let (rt, output, entry) = load_script(source);
    run_on(&rt, &entry).unwrap();
    let printed = output.lock().unwrap().clone();
    printed
}

/// Runs the script, expecting it to fail
pub(crate) fn run_error(source: &str) -> RuntimeError {
    let (rt, _, entry) = load_script(source);
    run_on(&rt, &entry).unwrap_err()
}

/// Class name of the Grove exception behind `error`
pub(crate) fn thrown_class(error: &RuntimeError) -> String {
    error
        .thrown()
        .map(|exception| exception.class.name.clone())
        .unwrap_or_else(|| panic!("not a Grove exception: {error:?}"))
}

pub(crate) fn site<'a>(class: &'a ClassRef, kind: CallSiteKind, name: &str) -> &'a CallSite {
    class
        .sites()
        .iter()
        .find(|site| site.kind() == kind && site.name() == name)
        .unwrap_or_else(|| panic!("no {kind:?} call site {name} in {}", class.name))
}
