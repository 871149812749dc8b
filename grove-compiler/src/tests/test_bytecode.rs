use crate::bytecode::{ACC_BRIDGE, ACC_SYNTHETIC, MAGIC, VERSION};
use crate::*;
use grove_parser::ClassKind;
use pretty_assertions::assert_eq;

fn sample_class() -> ClassFile {
    let mut class = ClassFile::new("geo.Point", ClassKind::Class);
    class.super_name = Some("grove.lang.Object".to_string());
    class.interfaces = vec!["grove.lang.GroveObject".to_string()];
    class.flags = 1;
    class.source_file = Some("geo/Point.grove".to_string());
    class.fields.push(FieldInfo {
        name: "x".to_string(),
        type_name: "int".to_string(),
        flags: ACC_SYNTHETIC,
    });
    let greeting = class.constant("hello");
    let site = class.call_site(CallSiteKind::Method, "println");
    class.methods.push(MethodInfo {
        name: "greet".to_string(),
        parameter_types: vec!["grove.lang.String".to_string()],
        return_type: "void".to_string(),
        flags: ACC_BRIDGE,
        max_locals: 3,
        instructions: vec![
            Instruction::Load(0),
            Instruction::PushConst(greeting),
            Instruction::Call { site, argc: 1 },
            Instruction::Pop,
            Instruction::PushFloat(1.5),
            Instruction::CmpZero(Comparison::GreaterEqual),
            Instruction::JumpIfFalse(8),
            Instruction::NewGString {
                strings: vec![greeting, greeting],
                values: 1,
            },
            Instruction::MakeClosure {
                class: greeting,
                captured: 2,
            },
            Instruction::PushNull,
            Instruction::Return,
        ],
        exception_table: vec![ExceptionEntry {
            start: 0,
            end: 4,
            handler: 9,
            catch_type: None,
        }],
    });
    class
}

#[test]
fn test_encoded_class_decodes_to_itself() {
    let class = sample_class();
    let bytes = encode(&class);
    assert_eq!(&bytes[..4], &MAGIC.to_be_bytes());
    assert_eq!(decode(&bytes).unwrap(), class);
}

#[test]
fn test_constants_are_pooled() {
    let mut class = ClassFile::new("A", ClassKind::Class);
    let first = class.constant("x");
    let second = class.constant("y");
    assert_eq!(class.constant("x"), first);
    assert_eq!(second, 1);
    assert_eq!(class.constant_at(second), Some("y"));
    assert_eq!(class.constant_at(7), None);
}

#[test]
fn test_every_call_gets_its_own_site() {
    let mut class = ClassFile::new("A", ClassKind::Class);
    assert_eq!(class.call_site(CallSiteKind::Method, "plus"), 0);
    assert_eq!(class.call_site(CallSiteKind::Method, "plus"), 1);
    assert_eq!(class.call_sites.len(), 2);
}

#[test]
fn test_call_site_kind_tags() {
    for kind in CallSiteKind::ALL {
        assert_eq!(CallSiteKind::from_tag(kind.tag()), Some(kind));
    }
    assert_eq!(CallSiteKind::from_tag(42), None);
    assert!(CallSiteKind::SafeGetProperty.is_safe());
    assert!(!CallSiteKind::Method.is_safe());
}

#[test]
fn test_comparison_holds() {
    assert!(Comparison::Less.holds(-1));
    assert!(!Comparison::Less.holds(0));
    assert!(Comparison::LessEqual.holds(0));
    assert!(Comparison::Greater.holds(3));
    assert!(Comparison::GreaterEqual.holds(0));
    assert!(!Comparison::GreaterEqual.holds(-2));
}

#[test]
fn test_method_flags() {
    let class = decode(&encode(&sample_class())).unwrap();
    let method = class.method("greet", 1).unwrap();
    assert!(method.is_bridge());
    assert!(!method.is_synthetic());
    assert!(class.method("greet", 0).is_none());
    assert!(!class.field("x").unwrap().is_static());
}

#[test]
fn test_bad_magic() {
    assert_eq!(
        decode(&[0, 0, 0, 0, 0, 1]),
        Err(DecodeError::BadMagic { found: 0 })
    );
}

#[test]
fn test_unsupported_version() {
    let mut bytes = MAGIC.to_be_bytes().to_vec();
    bytes.extend((VERSION + 1).to_be_bytes());
    assert_eq!(
        decode(&bytes),
        Err(DecodeError::UnsupportedVersion { found: VERSION + 1 })
    );
}

#[test]
fn test_truncated_input() {
    let bytes = encode(&sample_class());
    let result = decode(&bytes[..bytes.len() - 1]);
    assert!(matches!(result, Err(DecodeError::Truncated { .. })), "{result:?}");
}
