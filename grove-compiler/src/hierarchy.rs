//! Inheritance graph of the primary classes using petgraph
//!
//! Cycle detection runs on the strongly connected components of the
//! superclass and interface edges between primary classes. Sorting puts
//! interfaces before classes and supertypes before their subtypes.

use grove_parser::{ClassId, ClassTable};
use petgraph::graph::NodeIndex;
use petgraph::{algo, Graph as PetGraph};
use std::collections::{HashMap, HashSet};

/// Directed "extends or implements" graph over the primary classes
pub struct InheritanceGraph {
    graph: PetGraph<ClassId, ()>,
}

impl InheritanceGraph {
    pub fn build(table: &ClassTable, classes: &[ClassId]) -> Self {
        let mut graph = PetGraph::new();
        let mut class_to_node: HashMap<ClassId, NodeIndex> = HashMap::new();
        for &id in classes {
            let id = table.redirect(id);
            class_to_node
                .entry(id)
                .or_insert_with(|| graph.add_node(id));
        }
        for (&id, &node) in &class_to_node {
            for super_type in table.direct_supertypes(id) {
                if let Some(&target) = class_to_node.get(&super_type) {
                    graph.add_edge(node, target, ());
                }
            }
        }
        Self { graph }
    }

    /// Every inheritance cycle, each listed once in registration order
    pub fn cycles(&self) -> Vec<Vec<ClassId>> {
        let mut cycles: Vec<Vec<ClassId>> = algo::tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| {
                component.len() > 1
                    || component
                        .first()
                        .is_some_and(|&node| self.graph.contains_edge(node, node))
            })
            .map(|component| {
                let mut members: Vec<ClassId> =
                    component.into_iter().map(|node| self.graph[node]).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }
}

/// Message for one inheritance cycle
pub fn cycle_message(table: &ClassTable, cycle: &[ClassId]) -> String {
    let names: Vec<&str> = cycle.iter().map(|&id| table.name_of(id)).collect();
    format!("Cyclic inheritance involving {}", names.join(", "))
}

/// Interfaces first, then classes, each group by increasing depth
///
/// A selection sort over the depth index: of equal depths the one registered
/// first is taken first, so declaration order survives.
pub fn sort_classes(table: &ClassTable, classes: &[ClassId]) -> Vec<ClassId> {
    let mut remaining: Vec<(ClassId, bool, usize)> = classes
        .iter()
        .map(|&id| {
            let interface = table.is_interface(id);
            let depth = if interface {
                interface_depth(table, id, &mut HashSet::new())
            } else {
                superclass_depth(table, id)
            };
            (id, interface, depth)
        })
        .collect();

    let mut sorted = Vec::with_capacity(remaining.len());
    for interfaces in [true, false] {
        loop {
            let next = remaining
                .iter()
                .enumerate()
                .filter(|(_, (_, interface, _))| *interface == interfaces)
                .min_by_key(|(index, (_, _, depth))| (*depth, *index))
                .map(|(index, _)| index);
            let Some(index) = next else {
                break;
            };
            sorted.push(remaining.remove(index).0);
        }
    }
    sorted
}

fn superclass_depth(table: &ClassTable, id: ClassId) -> usize {
    let mut depth = 0;
    let mut seen = HashSet::new();
    let mut current = table.redirect(id);
    while let Some(parent) = table.super_class_of(current) {
        if !seen.insert(parent) {
            break;
        }
        depth += 1;
        current = parent;
    }
    depth
}

fn interface_depth(table: &ClassTable, id: ClassId, seen: &mut HashSet<ClassId>) -> usize {
    if !seen.insert(table.redirect(id)) {
        return 0;
    }
    table
        .interfaces_of(id)
        .into_iter()
        .map(|parent| 1 + interface_depth(table, parent, seen))
        .max()
        .unwrap_or(0)
}
