//! Class loading
//!
//! Classes are linked when defined: a compiled class is only registered once
//! its superclass and interfaces are, so every [`ClassRef`] holds a complete
//! hierarchy. A batch of class files may arrive in any order.

use crate::class::{ClassRef, RuntimeClass};
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{read, write};
use grove_compiler::bytecode::ClassFile;
use grove_parser::{names, ClassKind};
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct ClassLoader {
    classes: RwLock<IndexMap<String, ClassRef>>,
}

impl ClassLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<ClassRef> {
        read(&self.classes).get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        read(&self.classes).keys().cloned().collect()
    }

    pub fn classes(&self) -> Vec<ClassRef> {
        read(&self.classes).values().cloned().collect()
    }

    pub(crate) fn register(&self, class: RuntimeClass) -> RuntimeResult<ClassRef> {
        let mut classes = write(&self.classes);
        if classes.contains_key(&class.name) {
            return Err(RuntimeError::load(&class.name, "class is already defined"));
        }
        let class = Arc::new(class);
        classes.insert(class.name.clone(), Arc::clone(&class));
        Ok(class)
    }

    /// Links and registers a batch of compiled classes
    pub fn define(&self, files: Vec<ClassFile>) -> RuntimeResult<Vec<ClassRef>> {
        let mut pending: IndexMap<String, ClassFile> =
            files.into_iter().map(|file| (file.name.clone(), file)).collect();
        let mut defined = Vec::new();
        while let Some(name) = pending.keys().next().cloned() {
            self.define_one(&name, &mut pending, &mut Vec::new(), &mut defined)?;
        }
        Ok(defined)
    }

    fn define_one(
        &self,
        name: &str,
        pending: &mut IndexMap<String, ClassFile>,
        visiting: &mut Vec<String>,
        defined: &mut Vec<ClassRef>,
    ) -> RuntimeResult<ClassRef> {
        if let Some(class) = self.find(name) {
            if !pending.contains_key(name) {
                return Ok(class);
            }
        }
        if visiting.iter().any(|v| v == name) {
            return Err(RuntimeError::load(name, "cyclic inheritance"));
        }
        let Some(file) = pending.shift_remove(name) else {
            return Err(RuntimeError::ClassNotFound {
                name: name.to_string(),
            });
        };
        visiting.push(name.to_string());

        let super_name = match (&file.super_name, file.kind) {
            (Some(parent), _) => Some(parent.clone()),
            (None, ClassKind::Interface) => None,
            (None, _) => Some(names::OBJECT.to_string()),
        };
        let super_class = match super_name {
            Some(parent) => Some(self.define_one(&parent, pending, visiting, defined)?),
            None => None,
        };
        if let Some(parent) = &super_class {
            let closure_of_closure = file.kind == ClassKind::Closure && parent.name == names::CLOSURE;
            if parent.is_value_backed() && !closure_of_closure {
                return Err(RuntimeError::load(
                    &file.name,
                    format!("cannot extend built-in class {}", parent.name),
                ));
            }
        }
        let interfaces = file
            .interfaces
            .iter()
            .map(|interface| self.define_one(interface, pending, visiting, defined))
            .collect::<RuntimeResult<Vec<_>>>()?;
        visiting.pop();

        let class = self.register(RuntimeClass::compiled(file, super_class, interfaces))?;
        tracing::debug!(
            class = %class.name,
            kind = ?class.kind,
            sites = class.sites().len(),
            "defined class"
        );
        defined.push(Arc::clone(&class));
        Ok(class)
    }
}
