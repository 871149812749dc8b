use crate::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

#[test]
fn test_defaults() {
    let config = CompilerConfiguration::default();
    assert_eq!(config.tolerance, 10);
    assert_eq!(config.source_encoding(), "UTF-8");
    assert_eq!(config.script_base_class, "grove.lang.Script");
    assert_eq!(config.default_script_extension, "grove");
    assert_eq!(config.warning_level, WarningLevel::LikelyErrors);
    assert_eq!(config.duplicate_source_policy, DuplicateSourcePolicy::ExactName);
    assert!(config.target_directory.is_none());
    assert!(config.joint_compilation.is_none());
}

#[test]
fn test_from_properties() {
    let config = CompilerConfiguration::from_properties([
        ("grove.target.directory", "build/classes"),
        ("grove.errors.tolerance", "3"),
        ("grove.warnings", "3"),
        ("grove.script.base", "tools.BaseScript"),
        ("grove.script.extension", ".gvy"),
        ("grove.debug", "true"),
        ("grove.verbose", "no"),
        ("grove.source.encoding", "utf_8"),
        ("something.else", "ignored"),
    ])
    .unwrap();
    assert_eq!(config.target_directory, Some(PathBuf::from("build/classes")));
    assert_eq!(config.tolerance, 3);
    assert_eq!(config.warning_level, WarningLevel::Paranoia);
    assert_eq!(config.script_base_class, "tools.BaseScript");
    assert_eq!(config.default_script_extension, "gvy");
    assert!(config.debug);
    assert!(!config.verbose);
}

#[test]
fn test_unsupported_encoding() {
    let error = CompilerConfiguration::from_properties([("grove.source.encoding", "latin1")])
        .unwrap_err();
    assert_eq!(
        error,
        ConfigError::UnsupportedEncoding {
            encoding: "latin1".to_string()
        }
    );
    assert_eq!(error.to_string(), "Unsupported source encoding 'latin1'");
}

#[test]
fn test_invalid_values() {
    for (key, value) in [
        ("grove.errors.tolerance", "many"),
        ("grove.warnings", "7"),
        ("grove.debug", "maybe"),
    ] {
        let error = CompilerConfiguration::from_properties([(key, value)]).unwrap_err();
        assert_eq!(
            error,
            ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string()
            }
        );
    }
}

#[test]
fn test_duplicate_source_policy() {
    assert!(DuplicateSourcePolicy::ExactName.same_source("A.grove", "A.grove"));
    assert!(!DuplicateSourcePolicy::ExactName.same_source("A.grove", "a.grove"));
    assert!(DuplicateSourcePolicy::CaseInsensitive.same_source("A.grove", "a.GROVE"));
}

#[test]
fn test_phase_order() {
    assert_eq!(Phase::Initialization.next(), Some(Phase::Parsing));
    assert_eq!(Phase::Output.next(), Some(Phase::Finalization));
    assert_eq!(Phase::Finalization.next(), None);
    assert!(Phase::SemanticAnalysis < Phase::ClassGeneration);
    assert_eq!(Phase::InstructionSelection.to_string(), "instruction selection");
}
