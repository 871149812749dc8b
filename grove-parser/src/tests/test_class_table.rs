use crate::*;

fn class(name: &str) -> ClassNode {
    ClassNode::new(name, ClassKind::Class, "Test.grove")
}

fn external(name: &str, super_class: Option<&str>) -> ExternalClass {
    ExternalClass {
        name: name.to_string(),
        kind: ClassKind::Class,
        modifiers: Modifiers::of(&[Modifier::Public]),
        super_class: super_class.map(str::to_string),
        interfaces: Vec::new(),
        generics: Vec::new(),
        methods: Vec::new(),
    }
}

#[test]
fn test_primary_redirects_to_itself() {
    let mut table = ClassTable::new();
    let id = table.add_primary(class("A")).unwrap();
    assert_eq!(table.redirect(id), id);
    assert!(table.is_primary(id));
}

#[test]
fn test_placeholder_chain_terminates() {
    let mut table = ClassTable::new();
    let a = table.add_primary(class("A")).unwrap();
    let p1 = table.add_placeholder("Alias1", a).unwrap();
    let p2 = table.add_placeholder("Alias2", p1).unwrap();
    assert_eq!(table.redirect(p2), a);
    assert_eq!(table.primary(p2).unwrap().name, "A");
}

#[test]
fn test_placeholder_to_missing_slot_is_rejected() {
    let mut table = ClassTable::new();
    let result = table.add_placeholder("Ghost", ClassId(7));
    assert_eq!(result, Err(ClassTableError::UnknownSlot { id: ClassId(7) }));
}

#[test]
fn test_redirect_cycle_is_rejected() {
    let mut table = ClassTable::new();
    let pending = table.add_pending("demo.B", "demo/B.grove");
    let alias = table.add_placeholder("B", pending).unwrap();
    let result = table.set_redirect(pending, alias);
    assert!(matches!(result, Err(ClassTableError::SelfRedirect { .. })));
    assert_eq!(table.redirect(alias), pending);
}

#[test]
fn test_redirect_through_an_intermediate_placeholder_is_rejected() {
    let mut table = ClassTable::new();
    let a = table.add_pending("A", "A.grove");
    let p1 = table.add_placeholder("Alias1", a).unwrap();
    let p2 = table.add_placeholder("Alias2", p1).unwrap();
    let result = table.set_redirect(p1, p2);
    assert!(matches!(result, Err(ClassTableError::SelfRedirect { .. })));
    assert_eq!(table.redirect(p1), a);
    assert_eq!(table.redirect(p2), a);
}

#[test]
fn test_pending_slot_becomes_placeholder_when_defined() {
    let mut table = ClassTable::new();
    let pending = table.add_pending("demo.B", "demo/B.grove");
    assert_eq!(table.pending().len(), 1);

    let defined = table.add_primary(class("demo.B")).unwrap();
    assert_ne!(pending, defined);
    assert_eq!(table.redirect(pending), defined);
    assert!(matches!(table.entry(pending), Some(ClassEntry::Placeholder { .. })));
    assert!(table.pending().is_empty());
    assert_eq!(table.lookup("demo.B"), Some(defined));
}

#[test]
fn test_duplicate_primary_is_rejected() {
    let mut table = ClassTable::new();
    table.add_primary(class("A")).unwrap();
    assert_eq!(
        table.add_primary(class("A")),
        Err(ClassTableError::DuplicateClass { name: "A".to_string() })
    );
}

#[test]
fn test_canonicalize_caches_and_mutation_invalidates() {
    let mut table = ClassTable::new();
    let pending = table.add_pending("C", "C.grove");
    let alias = table.add_placeholder("AliasC", pending).unwrap();
    table.canonicalize();
    assert!(table.is_canonical());
    assert_eq!(table.redirect(alias), pending);

    let defined = table.add_primary(class("C")).unwrap();
    assert!(!table.is_canonical());
    assert_eq!(table.redirect(alias), defined);
}

#[test]
fn test_assignability_follows_supertypes() {
    let mut table = ClassTable::new();
    let object = table.add_external(external(names::OBJECT, None));
    let base = table.add_external(external("demo.Base", Some(names::OBJECT)));
    let mut node = class("demo.Child");
    node.super_class = Some(ClassType::new("demo.Base", Span::default()));
    let child = table.add_primary(node).unwrap();

    assert_eq!(table.super_class_of(child), Some(base));
    assert!(table.is_assignable(child, object));
    assert!(table.is_assignable(child, base));
    assert!(!table.is_assignable(base, child));
}

#[test]
fn test_take_primary_leaves_header_until_restored() {
    let mut table = ClassTable::new();
    let mut node = class("A");
    node.add_field(FieldNode::new("x", Modifiers::empty(), ClassType::dynamic()));
    let id = table.add_primary(node).unwrap();

    let taken = table.take_primary(id).unwrap();
    assert_eq!(taken.fields.len(), 1);
    let header = table.primary(id).unwrap();
    assert_eq!(header.name, "A");
    assert!(header.fields.is_empty());
    assert!(header.super_class.is_some());

    table.restore_primary(id, taken).unwrap();
    assert_eq!(table.primary(id).unwrap().fields.len(), 1);
}
