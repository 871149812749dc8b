//! The meta-class registry
//!
//! One [`ClassInfo`] per class holds the class's current meta class, built
//! on first use, together with the expando methods and mixins registered for
//! it. Registering either rebuilds the meta class of the class and of every
//! loaded subclass and publishes the result with a single pointer swap, so a
//! reader sees the old meta class or the new one, never a mix.
//!
//! Registrations and first builds are serialized by one update lock, so a
//! meta class built from an older set of extensions is never published over
//! a newer one. Readers of an already built meta class never take it.

use crate::class::ClassRef;
use crate::meta::{Extensions, MetaClass};
use crate::striped::StripedMap;
use crate::value::{lock, read, write, Closure};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

pub struct ClassInfo {
    class: ClassRef,
    current: OnceCell<RwLock<Arc<MetaClass>>>,
    extensions: Mutex<Extensions>,
}

impl ClassInfo {
    fn new(class: &ClassRef) -> Self {
        Self {
            class: Arc::clone(class),
            current: OnceCell::new(),
            extensions: Mutex::new(Extensions::default()),
        }
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn extensions(&self) -> Extensions {
        lock(&self.extensions).clone()
    }

    /// Current meta class, if one was built yet
    pub fn built(&self) -> Option<Arc<MetaClass>> {
        self.current.get().map(|cell| Arc::clone(&read(cell)))
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("class", &self.class.name)
            .field("built", &self.current.get().is_some())
            .finish()
    }
}

#[derive(Default)]
pub struct MetaClassRegistry {
    infos: StripedMap<String, Arc<ClassInfo>>,
    /// Held from changing extensions until the rebuilt meta classes are published
    updates: Mutex<()>,
}

impl MetaClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class_info(&self, class: &ClassRef) -> Arc<ClassInfo> {
        self.infos
            .get_or_insert_with(class.name.clone(), || Arc::new(ClassInfo::new(class)))
    }

    pub fn meta_class(&self, class: &ClassRef) -> Arc<MetaClass> {
        let info = self.class_info(class);
        self.meta_class_of(&info)
    }

    /// Meta class held by `info`, building it on first use
    pub fn meta_class_of(&self, info: &ClassInfo) -> Arc<MetaClass> {
        if let Some(cell) = info.current.get() {
            return Arc::clone(&read(cell));
        }
        let _updates = lock(&self.updates);
        let cell = info
            .current
            .get_or_init(|| RwLock::new(Arc::new(self.build(&info.class))));
        Arc::clone(&read(cell))
    }

    fn build(&self, class: &ClassRef) -> MetaClass {
        MetaClass::build(class, |ancestor| {
            self.infos
                .get(&ancestor.name)
                .map(|info| info.extensions())
                .unwrap_or_default()
        })
    }

    /// `Foo.metaClass.name = { ... }`
    pub fn add_method(&self, class: &ClassRef, name: &str, closure: Arc<Closure>) {
        let info = self.class_info(class);
        let _updates = lock(&self.updates);
        {
            let mut extensions = lock(&info.extensions);
            extensions.methods.retain(|(existing, _)| existing != name);
            extensions.methods.push((name.to_string(), closure));
        }
        tracing::debug!(class = %class.name, method = name, "added expando method");
        self.refresh(class);
    }

    /// `Foo.mixin(Bar)`
    pub fn add_mixin(&self, class: &ClassRef, mixin: &ClassRef) {
        let info = self.class_info(class);
        let _updates = lock(&self.updates);
        {
            let mut extensions = lock(&info.extensions);
            if !extensions.mixins.iter().any(|m| Arc::ptr_eq(m, mixin)) {
                extensions.mixins.push(Arc::clone(mixin));
            }
        }
        tracing::debug!(class = %class.name, mixin = %mixin.name, "added class mixin");
        self.refresh(class);
    }

    /// Rebuilds the built meta classes of `changed` and its subclasses
    ///
    /// Callers hold the update lock.
    fn refresh(&self, changed: &ClassRef) {
        for info in self.infos.values() {
            if info.class.distance_to(&changed.name).is_none() {
                continue;
            }
            if let Some(cell) = info.current.get() {
                let rebuilt = Arc::new(self.build(&info.class));
                *write(cell) = rebuilt;
            }
        }
    }
}
