//! Grove runtime
//!
//! Loads the class records the compiler produces and runs them on a
//! meta-object protocol.
//!
//! ## Architecture
//!
//! - **Classes**: compiled classes carry their decoded record and one call
//!   site per call expression; native classes carry Rust method tables
//! - **Meta classes**: immutable dispatch tables per class, rebuilt and
//!   swapped when expando methods or mixins are added
//! - **Call sites**: cache the last resolution per receiver shape, give up
//!   when megamorphic, and step aside while a category is active
//! - **Interpreter**: a stack machine over the compiled instructions, with
//!   exception tables, monitors and a call depth limit

#![allow(clippy::result_large_err)]

pub mod callsite;
pub mod category;
pub mod class;
pub mod config;
pub mod default_methods;
pub mod dispatch;
pub mod error;
pub mod interpreter;
pub mod loader;
pub mod meta;
pub mod mixin;
pub mod natives;
pub mod object;
pub mod registry;
pub mod runtime;
pub mod selection;
pub mod striped;
pub mod value;

pub use callsite::{CallSite, SiteState};
pub use class::{ClassRef, NativeMethod, RuntimeClass};
pub use config::{OutputSink, RuntimeConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use loader::ClassLoader;
pub use meta::{MetaClass, MetaClassHandle, MetaMethod, MetaProperty};
pub use object::{Instance, ObjectRef};
pub use registry::MetaClassRegistry;
pub use runtime::Runtime;
pub use value::{Closure, GStringValue, MapKey, Value};

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
