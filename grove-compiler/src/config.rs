//! Compiler configuration
//!
//! Settings can be built in code or read from a string map using the
//! `grove.*` keys understood by [`CompilerConfiguration::from_properties`].

use crate::error::ConfigError;
use grove_parser::names;
use indexmap::IndexMap;
use std::path::PathBuf;

pub const DEFAULT_TOLERANCE: usize = 10;
pub const DEFAULT_SCRIPT_EXTENSION: &str = "grove";
pub const DEFAULT_ENCODING: &str = "UTF-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WarningLevel {
    None,
    #[default]
    LikelyErrors,
    PossibleErrors,
    Paranoia,
}

impl WarningLevel {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(WarningLevel::None),
            1 => Some(WarningLevel::LikelyErrors),
            2 => Some(WarningLevel::PossibleErrors),
            3 => Some(WarningLevel::Paranoia),
            _ => None,
        }
    }
}

/// How queued sources with the same name are detected as duplicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateSourcePolicy {
    /// Plain string equality of source names
    #[default]
    ExactName,
    /// Names that differ only in case are the same source
    CaseInsensitive,
}

impl DuplicateSourcePolicy {
    pub fn same_source(self, a: &str, b: &str) -> bool {
        match self {
            DuplicateSourcePolicy::ExactName => a == b,
            DuplicateSourcePolicy::CaseInsensitive => a.eq_ignore_ascii_case(b),
        }
    }
}

/// Options passed through to a joint compilation with another compiler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointCompilationOptions {
    pub named_values: IndexMap<String, String>,
    pub flags: Vec<String>,
    pub stub_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilerConfiguration {
    pub target_directory: Option<PathBuf>,
    /// Source roots searched for classes nothing else defines
    pub classpath: Vec<PathBuf>,
    pub(crate) source_encoding: String,
    /// Continuable errors after which compilation stops at once; 0 disables the limit
    pub tolerance: usize,
    pub warning_level: WarningLevel,
    pub script_base_class: String,
    pub default_script_extension: String,
    pub debug: bool,
    pub verbose: bool,
    pub joint_compilation: Option<JointCompilationOptions>,
    pub duplicate_source_policy: DuplicateSourcePolicy,
}

impl Default for CompilerConfiguration {
    fn default() -> Self {
        Self {
            target_directory: None,
            classpath: Vec::new(),
            source_encoding: DEFAULT_ENCODING.to_string(),
            tolerance: DEFAULT_TOLERANCE,
            warning_level: WarningLevel::default(),
            script_base_class: names::SCRIPT.to_string(),
            default_script_extension: DEFAULT_SCRIPT_EXTENSION.to_string(),
            debug: false,
            verbose: false,
            joint_compilation: None,
            duplicate_source_policy: DuplicateSourcePolicy::default(),
        }
    }
}

impl CompilerConfiguration {
    pub fn source_encoding(&self) -> &str {
        &self.source_encoding
    }

    pub fn set_source_encoding(&mut self, encoding: &str) -> Result<(), ConfigError> {
        let normalized = encoding.trim().to_ascii_uppercase().replace('_', "-");
        if normalized != "UTF-8" && normalized != "UTF8" {
            return Err(ConfigError::UnsupportedEncoding {
                encoding: encoding.to_string(),
            });
        }
        self.source_encoding = DEFAULT_ENCODING.to_string();
        Ok(())
    }

    pub fn with_classpath(mut self, roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.classpath = roots.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.target_directory = Some(dir.into());
        self
    }

    /// Reads settings from `grove.*` keys; unknown keys are ignored
    pub fn from_properties<'a, I>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (key, value) in properties {
            match key {
                "grove.target.directory" => config.target_directory = Some(PathBuf::from(value)),
                "grove.classpath" => {
                    config.classpath = std::env::split_paths(value)
                        .filter(|p| !p.as_os_str().is_empty())
                        .collect();
                }
                "grove.source.encoding" => config.set_source_encoding(value)?,
                "grove.errors.tolerance" => config.tolerance = parse_value(key, value)?,
                "grove.warnings" => {
                    let level: u8 = parse_value(key, value)?;
                    config.warning_level =
                        WarningLevel::from_level(level).ok_or_else(|| invalid(key, value))?;
                }
                "grove.script.base" => config.script_base_class = value.to_string(),
                "grove.script.extension" => {
                    config.default_script_extension = value.trim_start_matches('.').to_string()
                }
                "grove.debug" => config.debug = parse_flag(key, value)?,
                "grove.verbose" => config.verbose = parse_flag(key, value)?,
                _ => tracing::trace!(key, "ignoring unknown configuration key"),
            }
        }
        Ok(config)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
