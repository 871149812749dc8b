//! The AST side of a compilation: every class known to it, which source owns
//! each primary class, and the classes still expected from queued sources.

use crate::classpath;
use crate::config::DuplicateSourcePolicy;
use crate::source_unit::SourceUnit;
use grove_parser::{ClassId, ClassNode, ClassTable, ClassTableError};
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug)]
pub struct CompileUnit {
    pub classes: ClassTable,
    /// Class name -> source expected to define it
    classes_to_compile: IndexMap<String, String>,
    /// Primary classes per source, in declaration order
    module_classes: IndexMap<String, Vec<ClassId>>,
    owners: HashMap<ClassId, String>,
    /// `import a.B as C` placeholder slots, keyed by (source, alias)
    aliases: HashMap<(String, String), ClassId>,
    queued: Vec<SourceUnit>,
    known_sources: Vec<String>,
    policy: DuplicateSourcePolicy,
}

impl CompileUnit {
    pub fn new(policy: DuplicateSourcePolicy) -> Self {
        let mut classes = ClassTable::new();
        classpath::install(&mut classes);
        Self {
            classes,
            classes_to_compile: IndexMap::new(),
            module_classes: IndexMap::new(),
            owners: HashMap::new(),
            aliases: HashMap::new(),
            queued: Vec::new(),
            known_sources: Vec::new(),
            policy,
        }
    }

    /// Registers a class parsed from `source`
    ///
    /// Defining a class that was expected from the class path removes it from
    /// the incomplete list.
    pub fn add_class(&mut self, node: ClassNode) -> Result<ClassId, ClassTableError> {
        let name = node.name.clone();
        let source = node.source_name.clone();
        let id = self.classes.add_primary(node)?;
        self.classes_to_compile.shift_remove(&name);
        self.module_classes.entry(source.clone()).or_default().push(id);
        self.owners.insert(id, source);
        Ok(id)
    }

    /// Primary classes defined by `source`
    pub fn classes_of(&self, source: &str) -> &[ClassId] {
        self.module_classes
            .get(source)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Source that defines a primary class
    pub fn owner_of(&self, id: ClassId) -> Option<&str> {
        let terminal = self.classes.redirect(id);
        self.owners.get(&terminal).map(String::as_str)
    }

    /// Primary classes of every source, sources in the given order
    pub fn classes_in_order<'a>(&self, sources: impl Iterator<Item = &'a str>) -> Vec<ClassId> {
        sources
            .flat_map(|source| self.classes_of(source).iter().copied())
            .collect()
    }

    /// Records that `source` should define `name`, returning its pending slot
    pub fn expect_class(&mut self, name: &str, source: &str) -> ClassId {
        self.classes_to_compile
            .entry(name.to_string())
            .or_insert_with(|| source.to_string());
        self.classes.add_pending(name, source)
    }

    pub fn classes_to_compile(&self) -> impl Iterator<Item = (&str, &str)> {
        self.classes_to_compile
            .iter()
            .map(|(name, source)| (name.as_str(), source.as_str()))
    }

    /// Placeholder slot standing for `alias` in `source`
    pub fn alias_slot(
        &mut self,
        source: &str,
        alias: &str,
        target: ClassId,
    ) -> Result<ClassId, ClassTableError> {
        let key = (source.to_string(), alias.to_string());
        if let Some(id) = self.aliases.get(&key) {
            return Ok(*id);
        }
        let id = self
            .classes
            .add_placeholder(format!("{source}#{alias}"), target)?;
        self.aliases.insert(key, id);
        Ok(id)
    }

    /// Queues a source unless one with the same name is already known
    ///
    /// Returns the name under which the source is known.
    pub fn queue_source(&mut self, unit: SourceUnit) -> String {
        if let Some(existing) = self.known_source(unit.name()) {
            tracing::trace!(source = unit.name(), existing, "source already queued");
            return existing.to_string();
        }
        let name = unit.name().to_string();
        tracing::debug!(source = %name, "queued source");
        self.known_sources.push(name.clone());
        self.queued.push(unit);
        name
    }

    pub fn known_source(&self, name: &str) -> Option<&str> {
        self.known_sources
            .iter()
            .find(|known| self.policy.same_source(known, name))
            .map(String::as_str)
    }

    pub fn has_queued(&self) -> bool {
        !self.queued.is_empty()
    }

    pub(crate) fn take_queued(&mut self) -> Vec<SourceUnit> {
        std::mem::take(&mut self.queued)
    }
}
