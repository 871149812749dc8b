//! Per-object mixin state
//!
//! Each object that has mixins (through its class or its own `mixin` call)
//! gets one instance of every mixin class, created on first use. The map is
//! keyed by object identity and holds the object weakly, so mixin state never
//! keeps an object alive; entries of dropped objects are pruned as the map
//! is written.

use crate::class::ClassRef;
use crate::error::RuntimeResult;
use crate::object::{Instance, ObjectRef};
use crate::striped::StripedMap;
use std::sync::{Arc, Weak};

#[derive(Clone)]
struct Entry {
    owner: Weak<Instance>,
    /// Mixin classes added to this object alone
    classes: Vec<ClassRef>,
    instances: Vec<(ClassRef, ObjectRef)>,
}

impl Entry {
    fn new(owner: &ObjectRef) -> Self {
        Self {
            owner: Arc::downgrade(owner),
            classes: Vec::new(),
            instances: Vec::new(),
        }
    }

    fn belongs_to(&self, owner: &ObjectRef) -> bool {
        self.owner.upgrade().is_some_and(|live| Arc::ptr_eq(&live, owner))
    }
}

#[derive(Default)]
pub struct InstanceMixins {
    entries: StripedMap<usize, Entry>,
}

impl InstanceMixins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mixin added to `owner` alone
    pub fn add_class(&self, owner: &ObjectRef, mixin: &ClassRef) {
        self.prune();
        self.entries.update(
            owner.identity(),
            || Entry::new(owner),
            |entry| {
                if !entry.belongs_to(owner) {
                    *entry = Entry::new(owner);
                }
                if !entry.classes.iter().any(|c| Arc::ptr_eq(c, mixin)) {
                    entry.classes.push(Arc::clone(mixin));
                }
            },
        );
    }

    /// Mixin classes added to `owner` alone
    pub fn classes_of(&self, owner: &ObjectRef) -> Vec<ClassRef> {
        self.entries
            .get(&owner.identity())
            .filter(|entry| entry.belongs_to(owner))
            .map(|entry| entry.classes)
            .unwrap_or_default()
    }

    /// `owner`'s instance of `mixin`, created with `create` the first time
    pub fn instance_for(
        &self,
        owner: &ObjectRef,
        mixin: &ClassRef,
        create: impl FnOnce() -> RuntimeResult<ObjectRef>,
    ) -> RuntimeResult<ObjectRef> {
        if let Some(entry) = self.entries.get(&owner.identity()).filter(|e| e.belongs_to(owner)) {
            if let Some((_, instance)) = entry.instances.iter().find(|(c, _)| Arc::ptr_eq(c, mixin)) {
                return Ok(Arc::clone(instance));
            }
        }
        let created = create()?;
        let mut result = Arc::clone(&created);
        self.prune();
        self.entries.update(
            owner.identity(),
            || Entry::new(owner),
            |entry| {
                if !entry.belongs_to(owner) {
                    *entry = Entry::new(owner);
                }
                match entry.instances.iter().find(|(c, _)| Arc::ptr_eq(c, mixin)) {
                    // another thread got there first
                    Some((_, existing)) => result = Arc::clone(existing),
                    None => entry.instances.push((Arc::clone(mixin), created)),
                }
            },
        );
        Ok(result)
    }

    /// Drops the entries of objects that no longer exist
    pub fn prune(&self) -> usize {
        let dropped = self.entries.retain(|_, entry| entry.owner.strong_count() > 0);
        if dropped > 0 {
            tracing::trace!(dropped, "pruned mixin entries");
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
