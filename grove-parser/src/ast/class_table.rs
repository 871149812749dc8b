// Class table
// Arena of every class a compile unit knows about, with placeholder redirects

use super::{ClassKind, ClassNode, Modifiers};
use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;

use super::ClassId;

/// Descriptor of a class that is not compiled here (the class path catalogue)
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalClass {
    pub name: String,
    pub kind: ClassKind,
    pub modifiers: Modifiers,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    /// Generics parameter names, e.g. `["T"]` for `Comparable<T>`
    pub generics: Vec<String>,
    pub methods: Vec<ExternalMethod>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalMethod {
    pub name: String,
    pub parameter_types: Vec<String>,
    pub return_type: String,
    pub modifiers: Modifiers,
}

/// One slot of the class table
#[derive(Debug, Clone, PartialEq)]
pub enum ClassEntry {
    Primary(ClassNode),
    External(ExternalClass),
    /// Expected to be defined by `source`, which was queued from the class path
    Pending { name: String, source: String },
    /// Redirect to another slot
    Placeholder { name: String, target: ClassId },
}

impl ClassEntry {
    pub fn name(&self) -> &str {
        match self {
            ClassEntry::Primary(node) => &node.name,
            ClassEntry::External(ext) => &ext.name,
            ClassEntry::Pending { name, .. } | ClassEntry::Placeholder { name, .. } => name,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClassEntry::Placeholder { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassTableError {
    #[error("class slot {id} does not exist")]
    UnknownSlot { id: ClassId },

    #[error("redirecting {name} to {target} would make it refer to itself")]
    SelfRedirect { name: String, target: ClassId },

    #[error("duplicate class definition: {name}")]
    DuplicateClass { name: String },

    #[error("class {name} is not pending and cannot be redirected")]
    NotPending { name: String },
}

#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    entries: Vec<ClassEntry>,
    by_name: IndexMap<String, ClassId>,
    canonical: Option<Vec<ClassId>>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: ClassEntry) -> ClassId {
        let id = ClassId(self.entries.len() as u32);
        self.entries.push(entry);
        self.canonical = None;
        id
    }

    fn check(&self, id: ClassId) -> Result<(), ClassTableError> {
        if id.index() < self.entries.len() {
            Ok(())
        } else {
            Err(ClassTableError::UnknownSlot { id })
        }
    }

    /// Registers a primary class. A pending slot of the same name becomes a
    /// placeholder for the new slot.
    pub fn add_primary(&mut self, node: ClassNode) -> Result<ClassId, ClassTableError> {
        let name = node.name.clone();
        match self.by_name.get(&name).copied() {
            Some(existing) => {
                if !matches!(self.entries[existing.index()], ClassEntry::Pending { .. }) {
                    return Err(ClassTableError::DuplicateClass { name });
                }
                let id = self.push(ClassEntry::Primary(node));
                self.entries[existing.index()] = ClassEntry::Placeholder {
                    name: name.clone(),
                    target: id,
                };
                self.by_name.insert(name, id);
                Ok(id)
            }
            None => {
                let id = self.push(ClassEntry::Primary(node));
                self.by_name.insert(name, id);
                Ok(id)
            }
        }
    }

    pub fn add_external(&mut self, class: ExternalClass) -> ClassId {
        if let Some(id) = self.by_name.get(&class.name) {
            return *id;
        }
        let name = class.name.clone();
        let id = self.push(ClassEntry::External(class));
        self.by_name.insert(name, id);
        id
    }

    /// Records that `source` is expected to define `name`
    pub fn add_pending(&mut self, name: impl Into<String>, source: impl Into<String>) -> ClassId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = self.push(ClassEntry::Pending {
            name: name.clone(),
            source: source.into(),
        });
        self.by_name.insert(name, id);
        id
    }

    /// Creates a placeholder slot (an import alias, for example) redirecting to `target`
    pub fn add_placeholder(
        &mut self,
        name: impl Into<String>,
        target: ClassId,
    ) -> Result<ClassId, ClassTableError> {
        self.check(target)?;
        Ok(self.push(ClassEntry::Placeholder {
            name: name.into(),
            target,
        }))
    }

    /// Points an existing placeholder or pending slot at `target`
    pub fn set_redirect(&mut self, id: ClassId, target: ClassId) -> Result<(), ClassTableError> {
        self.check(id)?;
        self.check(target)?;
        let name = self.entries[id.index()].name().to_string();
        match &self.entries[id.index()] {
            ClassEntry::Pending { .. } | ClassEntry::Placeholder { .. } => {}
            _ => return Err(ClassTableError::NotPending { name }),
        }
        if self.chain_reaches(target, id) {
            return Err(ClassTableError::SelfRedirect { name, target });
        }
        self.entries[id.index()] = ClassEntry::Placeholder { name, target };
        self.canonical = None;
        Ok(())
    }

    /// Whether following placeholders from `from` passes through `id`
    fn chain_reaches(&self, from: ClassId, id: ClassId) -> bool {
        let mut current = from;
        for _ in 0..=self.entries.len() {
            if current == id {
                return true;
            }
            match &self.entries[current.index()] {
                ClassEntry::Placeholder { target, .. } => current = *target,
                _ => return false,
            }
        }
        true
    }

    fn walk(&self, id: ClassId) -> ClassId {
        let mut current = id;
        let mut steps = 0;
        while let ClassEntry::Placeholder { target, .. } = &self.entries[current.index()] {
            current = *target;
            steps += 1;
            // Placeholders only ever point at slots that already existed, so a
            // chain cannot be longer than the table.
            if steps > self.entries.len() {
                break;
            }
        }
        current
    }

    /// Terminal slot reached by following placeholders from `id`
    pub fn redirect(&self, id: ClassId) -> ClassId {
        if let Some(canonical) = &self.canonical {
            if let Some(terminal) = canonical.get(id.index()) {
                return *terminal;
            }
        }
        if id.index() >= self.entries.len() {
            return id;
        }
        self.walk(id)
    }

    /// Computes and caches the terminal of every slot
    pub fn canonicalize(&mut self) {
        let canonical = (0..self.entries.len())
            .map(|idx| self.walk(ClassId(idx as u32)))
            .collect();
        self.canonical = Some(canonical);
    }

    pub fn is_canonical(&self) -> bool {
        self.canonical.is_some()
    }

    pub fn entry(&self, id: ClassId) -> Option<&ClassEntry> {
        self.entries.get(id.index())
    }

    /// Terminal entry for `id`
    pub fn resolve(&self, id: ClassId) -> Option<&ClassEntry> {
        self.entries.get(self.redirect(id).index())
    }

    /// Slot registered under a fully qualified name, not redirected
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Terminal slot for a fully qualified name
    pub fn lookup_terminal(&self, name: &str) -> Option<ClassId> {
        self.lookup(name).map(|id| self.redirect(id))
    }

    pub fn name_of(&self, id: ClassId) -> &str {
        self.resolve(id).map(ClassEntry::name).unwrap_or("<unknown>")
    }

    pub fn primary(&self, id: ClassId) -> Option<&ClassNode> {
        match self.resolve(id) {
            Some(ClassEntry::Primary(node)) => Some(node),
            _ => None,
        }
    }

    pub fn primary_mut(&mut self, id: ClassId) -> Option<&mut ClassNode> {
        let terminal = self.redirect(id);
        // Member edits do not change the slot structure, so the cache stays valid.
        match self.entries.get_mut(terminal.index()) {
            Some(ClassEntry::Primary(node)) => Some(node),
            _ => None,
        }
    }

    /// Detaches a primary class so it can be edited while the table is consulted
    ///
    /// The slot keeps a copy of the class header (name, kind, modifiers and
    /// supertypes) without members until [`restore_primary`](Self::restore_primary).
    pub fn take_primary(&mut self, id: ClassId) -> Option<ClassNode> {
        let terminal = self.redirect(id);
        let slot = self.entries.get_mut(terminal.index())?;
        let ClassEntry::Primary(node) = slot else {
            return None;
        };
        let mut header = ClassNode::new(node.name.clone(), node.kind, node.source_name.clone());
        header.modifiers = node.modifiers;
        header.super_class = node.super_class.clone();
        header.interfaces = node.interfaces.clone();
        header.generics = node.generics.clone();
        header.span = node.span.clone();
        Some(std::mem::replace(node, header))
    }

    pub fn restore_primary(&mut self, id: ClassId, node: ClassNode) -> Result<(), ClassTableError> {
        let terminal = self.redirect(id);
        match self.entries.get_mut(terminal.index()) {
            Some(ClassEntry::Primary(slot)) => {
                *slot = node;
                Ok(())
            }
            _ => Err(ClassTableError::UnknownSlot { id }),
        }
    }

    pub fn external(&self, id: ClassId) -> Option<&ExternalClass> {
        match self.resolve(id) {
            Some(ClassEntry::External(ext)) => Some(ext),
            _ => None,
        }
    }

    pub fn is_primary(&self, id: ClassId) -> bool {
        self.primary(id).is_some()
    }

    /// Primary slots in registration order
    pub fn primary_ids(&self) -> Vec<ClassId> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| matches!(e, ClassEntry::Primary(_)))
            .map(|(idx, _)| ClassId(idx as u32))
            .collect()
    }

    /// Pending slots with the source expected to define them
    pub fn pending(&self) -> Vec<(ClassId, &str, &str)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| match e {
                ClassEntry::Pending { name, source } => {
                    Some((ClassId(idx as u32), name.as_str(), source.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    pub fn kind(&self, id: ClassId) -> Option<ClassKind> {
        match self.resolve(id)? {
            ClassEntry::Primary(node) => Some(node.kind),
            ClassEntry::External(ext) => Some(ext.kind),
            _ => None,
        }
    }

    pub fn is_interface(&self, id: ClassId) -> bool {
        self.kind(id).is_some_and(ClassKind::is_interface)
    }

    pub fn modifiers(&self, id: ClassId) -> Modifiers {
        match self.resolve(id) {
            Some(ClassEntry::Primary(node)) => node.modifiers,
            Some(ClassEntry::External(ext)) => ext.modifiers,
            _ => Modifiers::empty(),
        }
    }

    /// Direct superclass, following resolved references where present
    pub fn super_class_of(&self, id: ClassId) -> Option<ClassId> {
        match self.resolve(id)? {
            ClassEntry::Primary(node) => {
                let super_type = node.super_class.as_ref()?;
                super_type
                    .resolved
                    .map(|s| self.redirect(s))
                    .or_else(|| self.lookup_terminal(&super_type.name))
            }
            ClassEntry::External(ext) => ext
                .super_class
                .as_deref()
                .and_then(|name| self.lookup_terminal(name)),
            _ => None,
        }
    }

    pub fn interfaces_of(&self, id: ClassId) -> Vec<ClassId> {
        match self.resolve(id) {
            Some(ClassEntry::Primary(node)) => node
                .interfaces
                .iter()
                .filter_map(|i| {
                    i.resolved
                        .map(|r| self.redirect(r))
                        .or_else(|| self.lookup_terminal(&i.name))
                })
                .collect(),
            Some(ClassEntry::External(ext)) => ext
                .interfaces
                .iter()
                .filter_map(|name| self.lookup_terminal(name))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Direct supertypes: superclass first, then interfaces
    pub fn direct_supertypes(&self, id: ClassId) -> Vec<ClassId> {
        let mut supers: Vec<ClassId> = self.super_class_of(id).into_iter().collect();
        supers.extend(self.interfaces_of(id));
        supers
    }

    /// True when a value of `from` can be used where `to` is expected
    pub fn is_assignable(&self, from: ClassId, to: ClassId) -> bool {
        let target = self.redirect(to);
        let mut seen = HashSet::new();
        let mut stack = vec![self.redirect(from)];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.extend(self.direct_supertypes(current));
        }
        false
    }
}
