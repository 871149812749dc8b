//! Thread-scoped categories
//!
//! `use(Category) { ... }` makes the category's static methods callable as
//! instance methods on their first parameter's type, for the calling thread
//! only and only while the block runs. Activations nest; the innermost wins.

use crate::class::ClassRef;
use crate::meta::MetaMethod;
use grove_parser::names;
use std::cell::RefCell;

struct Activation {
    categories: Vec<ClassRef>,
    methods: Vec<MetaMethod>,
}

thread_local! {
    static ACTIVE: RefCell<Vec<Activation>> = const { RefCell::new(Vec::new()) };
}

/// Deactivates its categories when dropped, on every way out of the block
pub struct CategoryGuard {
    depth: usize,
}

impl Drop for CategoryGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.borrow_mut().truncate(self.depth));
    }
}

pub fn activate(categories: Vec<ClassRef>) -> CategoryGuard {
    let methods = categories.iter().flat_map(category_methods).collect();
    ACTIVE.with(|active| {
        let mut active = active.borrow_mut();
        let depth = active.len();
        tracing::trace!(
            categories = ?categories.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            depth,
            "activated categories"
        );
        active.push(Activation { categories, methods });
        CategoryGuard { depth }
    })
}

/// Whether any category is active on this thread
pub fn is_active() -> bool {
    ACTIVE.with(|active| !active.borrow().is_empty())
}

/// Category methods named `name`, innermost activation first
pub fn methods_named(name: &str) -> Vec<Vec<MetaMethod>> {
    ACTIVE.with(|active| {
        active
            .borrow()
            .iter()
            .rev()
            .map(|activation| {
                activation
                    .methods
                    .iter()
                    .filter(|m| m.name == name)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|methods| !methods.is_empty())
            .collect()
    })
}

/// Names of the active categories, innermost last
pub fn active_categories() -> Vec<String> {
    ACTIVE.with(|active| {
        active
            .borrow()
            .iter()
            .flat_map(|activation| activation.categories.iter().map(|c| c.name.clone()))
            .collect()
    })
}

/// Static methods with at least one parameter, seen as instance methods
fn category_methods(category: &ClassRef) -> Vec<MetaMethod> {
    let Some(file) = category.file() else {
        return Vec::new();
    };
    file.methods
        .iter()
        .enumerate()
        .filter(|(_, info)| info.is_static() && info.name != names::STATIC_INIT && !info.is_synthetic())
        .filter_map(|(index, info)| MetaMethod::category(MetaMethod::compiled(category, index, info)))
        .collect()
}
