//! Instances of Grove classes and their monitors

use crate::class::ClassRef;
use crate::error::{RuntimeError, RuntimeResult};
use crate::meta::MetaClass;
use crate::value::{lock, read, write, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::{self, ThreadId};

pub type ObjectRef = Arc<Instance>;

pub struct Instance {
    pub class: ClassRef,
    fields: RwLock<IndexMap<String, Value>>,
    /// Set through `setMetaClass` or a per-instance mixin
    meta_class: RwLock<Option<Arc<MetaClass>>>,
    pub(crate) monitor: Monitor,
}

impl Instance {
    pub fn new(class: ClassRef, fields: IndexMap<String, Value>) -> ObjectRef {
        Arc::new(Self {
            class,
            fields: RwLock::new(fields),
            meta_class: RwLock::new(None),
            monitor: Monitor::default(),
        })
    }

    /// Field value, null when the field does not exist
    pub fn field(&self, name: &str) -> Value {
        read(&self.fields).get(name).cloned().unwrap_or_default()
    }

    pub fn has_field(&self, name: &str) -> bool {
        read(&self.fields).contains_key(name)
    }

    pub fn try_field(&self, name: &str) -> Option<Value> {
        read(&self.fields).get(name).cloned()
    }

    pub fn set_field(&self, name: &str, value: Value) {
        write(&self.fields).insert(name.to_string(), value);
    }

    pub fn field_names(&self) -> Vec<String> {
        read(&self.fields).keys().cloned().collect()
    }

    pub fn meta_class(&self) -> Option<Arc<MetaClass>> {
        read(&self.meta_class).clone()
    }

    pub fn set_meta_class(&self, meta_class: Option<Arc<MetaClass>>) {
        *write(&self.meta_class) = meta_class;
    }

    pub fn identity(self: &Arc<Self>) -> usize {
        Arc::as_ptr(self) as *const () as usize
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("fields", &read(&self.fields).keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Re-entrant lock behind `synchronized`
///
/// Enter and exit come from separate instructions, so the owner is tracked
/// explicitly instead of holding a guard.
#[derive(Debug, Default)]
pub struct Monitor {
    owner: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

impl Monitor {
    pub fn enter(&self) {
        let me = thread::current().id();
        let mut owner = lock(&self.owner);
        loop {
            let state = *owner;
            match state {
                None => {
                    *owner = Some((me, 1));
                    return;
                }
                Some((thread, count)) if thread == me => {
                    *owner = Some((me, count + 1));
                    return;
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                }
            }
        }
    }

    pub fn exit(&self) -> RuntimeResult<()> {
        let me = thread::current().id();
        let mut owner = lock(&self.owner);
        let state = *owner;
        match state {
            Some((thread, count)) if thread == me => {
                if count == 1 {
                    *owner = None;
                    self.released.notify_one();
                } else {
                    *owner = Some((me, count - 1));
                }
                Ok(())
            }
            _ => Err(RuntimeError::illegal_state(
                "current thread is not owner of the monitor",
            )),
        }
    }

    pub fn is_held(&self) -> bool {
        lock(&self.owner).is_some()
    }
}
