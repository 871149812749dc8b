use crate::*;
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn unit_with(sources: &[(&str, &str)]) -> CompilationUnit {
    let mut unit = CompilationUnit::new(CompilerConfiguration::default());
    for (name, text) in sources {
        unit.add_string(*name, *text);
    }
    unit
}

fn failure_messages(error: &CompilerError) -> Vec<String> {
    error.messages().iter().map(CompileMessage::message).collect()
}

#[test]
fn test_compile_generates_every_class() {
    let mut unit = unit_with(&[
        ("Point.grove", "class Point {\n  int x\n  int y\n}"),
        ("Main.grove", "def p = new Point()\nprintln(p)"),
    ]);
    unit.compile(Phase::Output).unwrap();

    let mut names: Vec<&str> = unit
        .generated_classes()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Main", "Point"]);
    for class in unit.generated_classes() {
        assert!(!class.bytes.is_empty());
    }
    let point = unit
        .generated_classes()
        .iter()
        .find(|c| c.name == "Point")
        .unwrap();
    assert_eq!(point.source, "Point.grove");
}

#[test]
fn test_progress_callback_runs_once_per_unit_and_phase() {
    let seen: Rc<RefCell<Vec<(String, Phase)>>> = Rc::default();
    let mut unit = unit_with(&[("A.grove", "class A {}"), ("B.grove", "class B {}")]);
    let log = Rc::clone(&seen);
    unit.set_progress_callback(move |source, phase| {
        log.borrow_mut().push((source.name().to_string(), phase));
    });

    unit.compile(Phase::Conversion).unwrap();
    let expected: Vec<(String, Phase)> = [Phase::Initialization, Phase::Parsing, Phase::Conversion]
        .into_iter()
        .flat_map(|phase| {
            ["A.grove", "B.grove"]
                .into_iter()
                .map(move |name| (name.to_string(), phase))
        })
        .collect();
    assert_eq!(*seen.borrow(), expected);

    // nothing new to do
    unit.compile(Phase::Conversion).unwrap();
    assert_eq!(seen.borrow().len(), 6);

    unit.compile(Phase::SemanticAnalysis).unwrap();
    assert_eq!(seen.borrow().len(), 8);
}

#[test]
fn test_sources_added_later_are_compiled_alone() {
    let mut unit = unit_with(&[("A.grove", "class A {}")]);
    unit.compile(Phase::Output).unwrap();
    assert_eq!(unit.generated_classes().len(), 1);

    unit.add_string("B.grove", "class B extends A {}");
    unit.compile(Phase::Output).unwrap();
    let names: Vec<&str> = unit
        .generated_classes()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B"]);
}

#[test]
fn test_duplicate_sources_are_added_once() {
    let mut unit = CompilationUnit::new(CompilerConfiguration::default());
    assert_eq!(unit.add_string("A.grove", "class A {}"), "A.grove");
    assert_eq!(unit.add_string("A.grove", "class A {}"), "A.grove");
    unit.compile(Phase::Conversion).unwrap();
    assert_eq!(unit.sources().count(), 1);
}

#[test]
fn test_case_insensitive_duplicate_policy() {
    let config = CompilerConfiguration {
        duplicate_source_policy: DuplicateSourcePolicy::CaseInsensitive,
        ..CompilerConfiguration::default()
    };
    let mut unit = CompilationUnit::new(config);
    unit.add_string("A.grove", "class A {}");
    assert_eq!(unit.add_string("a.GROVE", "class A {}"), "A.grove");
    unit.compile(Phase::Conversion).unwrap();
    assert_eq!(unit.sources().count(), 1);
}

#[test]
fn test_syntax_errors_fail_parsing() {
    let mut unit = unit_with(&[("Broken.grove", "class {")]);
    let error = unit.compile(Phase::Output).unwrap_err();
    match &error {
        CompilerError::Failed(failed) => {
            assert_eq!(failed.phase, Phase::Parsing);
            assert_eq!(failed.messages.len(), 1);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(unit.generated_classes().is_empty());
}

#[test]
fn test_duplicate_class_in_two_sources() {
    let mut unit = unit_with(&[("A.grove", "class A {}"), ("B.grove", "class A {}")]);
    let error = unit.compile(Phase::Output).unwrap_err();
    assert_eq!(
        failure_messages(&error),
        vec![
            "Invalid duplicate class definition of class A : The sources A.grove and B.grove each contain a class with the name A."
                .to_string()
        ]
    );
}

#[test]
fn test_errors_of_one_phase_are_reported_together() {
    let mut unit = unit_with(&[
        ("A.grove", "class A {\n  private Foo foo\n}"),
        ("B.grove", "class B {\n  private Bar bar\n}"),
    ]);
    let error = unit.compile(Phase::Output).unwrap_err();
    let CompilerError::Failed(failed) = &error else {
        panic!("unexpected error {error:?}");
    };
    assert_eq!(failed.phase, Phase::SemanticAnalysis);
    assert_eq!(
        failure_messages(&error),
        vec![
            "unable to resolve class Foo".to_string(),
            "unable to resolve class Bar".to_string()
        ]
    );
}

#[test]
fn test_tolerance_stops_at_once() {
    let config = CompilerConfiguration {
        tolerance: 1,
        ..CompilerConfiguration::default()
    };
    let mut unit = CompilationUnit::new(config);
    unit.add_string("A.grove", "class A {\n  private Foo foo\n  private Bar bar\n}");
    let error = unit.compile(Phase::Output).unwrap_err();
    assert_eq!(
        failure_messages(&error),
        vec!["unable to resolve class Foo".to_string()]
    );
}

#[test]
fn test_cyclic_inheritance_is_one_error() {
    let mut unit = unit_with(&[("Cycle.grove", "class A extends B {}\nclass B extends A {}")]);
    let error = unit.compile(Phase::Output).unwrap_err();
    let CompilerError::Failed(failed) = &error else {
        panic!("unexpected error {error:?}");
    };
    assert_eq!(failed.phase, Phase::ClassGeneration);
    assert_eq!(
        failure_messages(&error),
        vec!["Cyclic inheritance involving A, B".to_string()]
    );
}

#[test]
fn test_panicking_operation_is_an_internal_bug() {
    let mut unit = unit_with(&[("A.grove", "class A {}")]);
    unit.add_class_operation(
        FnClassOperation::new("explode", |_ctx: &mut ClassContext<'_>| -> CompileResult<()> {
            panic!("boom")
        }),
        Phase::SemanticAnalysis,
    );
    match unit.compile(Phase::Output) {
        Err(CompilerError::InternalBug {
            phase,
            unit: source,
            message,
        }) => {
            assert_eq!(phase, Phase::SemanticAnalysis);
            assert_eq!(source, "A.grove");
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn test_bug_errors_name_phase_and_unit() {
    let mut unit = unit_with(&[("A.grove", "class A {}")]);
    unit.add_source_operation(
        FnSourceOperation::new("broken", |_ctx: &mut SourceContext<'_>| {
            Err(CompilerError::bug("lost the module"))
        }),
        Phase::Conversion,
    );
    let error = unit.compile(Phase::Output).unwrap_err();
    assert_eq!(
        error.to_string(),
        "BUG! exception in phase 'conversion' in source unit 'A.grove' lost the module"
    );
}

#[test]
fn test_custom_operations_run_in_registration_order() {
    let order: Rc<RefCell<Vec<String>>> = Rc::default();
    let mut unit = unit_with(&[("A.grove", "class A {}")]);
    for name in ["first", "second"] {
        let order = Rc::clone(&order);
        unit.add_class_operation(
            FnClassOperation::new(name, move |ctx: &mut ClassContext<'_>| {
                order.borrow_mut().push(format!("{name} {}", ctx.class.name));
                Ok(())
            }),
            Phase::Canonicalization,
        );
    }
    unit.compile(Phase::Canonicalization).unwrap();
    assert_eq!(*order.borrow(), vec!["first A".to_string(), "second A".to_string()]);
}

#[test]
fn test_classgen_callback_sees_every_class() {
    let seen: Rc<RefCell<Vec<String>>> = Rc::default();
    let mut unit = unit_with(&[("Each.grove", "[1, 2].each { println(it) }")]);
    let log = Rc::clone(&seen);
    unit.set_classgen_callback(move |file, node| {
        assert_eq!(file.name, node.name);
        log.borrow_mut().push(file.name.clone());
    });
    unit.compile(Phase::Output).unwrap();
    assert_eq!(
        *seen.borrow(),
        vec!["Each".to_string(), "Each$_run_closure1".to_string()]
    );
}

#[test]
fn test_output_writes_class_files() {
    let dir = std::env::temp_dir().join(format!("grove-output-{}", std::process::id()));
    let config = CompilerConfiguration::default().with_target_directory(&dir);
    let mut unit = CompilationUnit::new(config);
    unit.add_string("Shape.grove", "package geo.shapes\nclass Shape {}");
    unit.compile(Phase::Output).unwrap();

    let path = dir.join("geo").join("shapes").join("Shape.class");
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(decode(&bytes).unwrap().name, "geo.shapes.Shape");
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_incomplete_message() {
    assert_eq!(
        completeness::incomplete_message("a.B", "a/B.grove", &[]),
        "Compilation incomplete: expected to find the class a.B in a/B.grove, but the file seems not to contain any classes"
    );
    assert_eq!(
        completeness::incomplete_message("a.B", "a/B.grove", &["a.C", "a.D"]),
        "Compilation incomplete: expected to find the class a.B in a/B.grove, but the file contains the classes: a.C, a.D"
    );
}

#[test]
fn test_class_path_sources_are_pulled_in() {
    let root = std::env::temp_dir().join(format!("grove-classpath-{}", std::process::id()));
    std::fs::create_dir_all(root.join("lib")).unwrap();
    std::fs::write(root.join("lib").join("Helper.grove"), "package lib\nclass Helper {}").unwrap();
    std::fs::write(root.join("lib").join("Missing.grove"), "package lib\nclass Other {}").unwrap();

    let config = CompilerConfiguration::default().with_classpath([root.clone()]);
    let mut unit = CompilationUnit::new(config);
    unit.add_string("Main.grove", "import lib.Helper\nclass Main {\n  private Helper helper\n}");
    unit.compile(Phase::Output).unwrap();
    let mut names: Vec<&str> = unit
        .generated_classes()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Main", "lib.Helper"]);

    let mut unit = CompilationUnit::new(CompilerConfiguration::default().with_classpath([root.clone()]));
    unit.add_string("Main.grove", "import lib.Missing\nclass Main {\n  private Missing missing\n}");
    let error = unit.compile(Phase::Output).unwrap_err();
    let source = root.join("lib").join("Missing.grove").display().to_string();
    assert_eq!(
        failure_messages(&error),
        vec![format!(
            "Compilation incomplete: expected to find the class lib.Missing in {source}, but the file contains the classes: lib.Other"
        )]
    );
    std::fs::remove_dir_all(&root).unwrap();
}
