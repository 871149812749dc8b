//! Error types for the Grove compiler
//!
//! Continuable problems are collected as [`CompileMessage`]s by the
//! [`ErrorCollector`]; anything that stops a compilation is a
//! [`CompilerError`].

use crate::config::WarningLevel;
use crate::phases::Phase;
use grove_parser::{ParseError, Span};
use miette::{Diagnostic, SourceSpan};
use std::fmt;
use thiserror::Error;

/// A continuable compile error, reported once the current phase ends
#[derive(Error, Diagnostic, Debug, Clone)]
pub enum CompileMessage {
    #[error("{source_name}: {error}")]
    #[diagnostic(code(grove::compile::syntax))]
    Syntax {
        source_name: String,
        #[diagnostic_source]
        error: ParseError,
    },

    #[error("{source_name}: {line}: {message} @ line {line}, column {column}.")]
    #[diagnostic(code(grove::compile::semantic))]
    Semantic {
        source_name: String,
        message: String,
        line: usize,
        column: usize,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },

    /// A message not tied to a source position
    #[error("{message}")]
    #[diagnostic(code(grove::compile::general))]
    General { message: String },
}

impl CompileMessage {
    pub fn semantic(source_name: &str, src: &str, span: &Span, message: impl Into<String>) -> Self {
        CompileMessage::Semantic {
            source_name: source_name.to_string(),
            message: message.into(),
            line: span.line(),
            column: span.column(),
            src: src.to_string(),
            span: span.to_source_span(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        CompileMessage::General {
            message: message.into(),
        }
    }

    pub fn syntax(source_name: &str, error: ParseError) -> Self {
        CompileMessage::Syntax {
            source_name: source_name.to_string(),
            error,
        }
    }

    /// The message text without the source prefix
    pub fn message(&self) -> String {
        match self {
            CompileMessage::Syntax { error, .. } => error.to_string(),
            CompileMessage::Semantic { message, .. } | CompileMessage::General { message } => {
                message.clone()
            }
        }
    }
}

/// A warning, kept only when its level is enabled
#[derive(Debug, Clone, PartialEq)]
pub struct CompileWarning {
    pub level: WarningLevel,
    pub source_name: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: warning: {}", self.source_name, self.line, self.message)
    }
}

/// Every continuable error collected up to the phase that failed
#[derive(Error, Diagnostic, Debug)]
#[error("Compilation failed during {phase} with {} error(s)", .messages.len())]
#[diagnostic(code(grove::compile::failed))]
pub struct CompilationFailed {
    pub phase: Phase,
    #[related]
    pub messages: Vec<CompileMessage>,
}

#[derive(Error, Diagnostic, Debug)]
#[allow(clippy::result_large_err)]
pub enum CompilerError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Failed(#[from] CompilationFailed),

    /// Unexpected failure inside a phase operation
    #[error("BUG! exception in phase '{phase}' in source unit '{unit}' {message}")]
    #[diagnostic(
        code(grove::compile::internal),
        help("This is a defect in the Grove compiler, not in your program")
    )]
    InternalBug {
        phase: Phase,
        unit: String,
        message: String,
    },

    /// Raised by an operation; the driver attaches phase and unit
    #[error("{message}")]
    #[diagnostic(code(grove::compile::bug))]
    Bug { message: String },

    #[error("fatal parser error in {unit}")]
    #[diagnostic(code(grove::compile::parser_bug))]
    ParserBug {
        unit: String,
        #[diagnostic_source]
        error: ParseError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error on {path}: {message}")]
    #[diagnostic(code(grove::compile::io))]
    Io { path: String, message: String },
}

impl CompilerError {
    pub fn bug(message: impl Into<String>) -> Self {
        CompilerError::Bug {
            message: message.into(),
        }
    }

    pub fn io(path: impl fmt::Display, error: &std::io::Error) -> Self {
        CompilerError::Io {
            path: path.to_string(),
            message: error.to_string(),
        }
    }

    /// Continuable messages carried by a failed compilation
    pub fn messages(&self) -> &[CompileMessage] {
        match self {
            CompilerError::Failed(failed) => &failed.messages,
            _ => &[],
        }
    }
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported source encoding '{encoding}'")]
    #[diagnostic(
        code(grove::config::encoding),
        help("Grove sources are read as UTF-8")
    )]
    UnsupportedEncoding { encoding: String },

    #[error("Invalid value '{value}' for configuration key '{key}'")]
    #[diagnostic(code(grove::config::invalid_value))]
    InvalidValue { key: String, value: String },
}

pub type CompileResult<T> = Result<T, CompilerError>;

/// Accumulates continuable errors and warnings across a compilation
#[derive(Debug, Clone)]
pub struct ErrorCollector {
    errors: Vec<CompileMessage>,
    warnings: Vec<CompileWarning>,
    /// Errors after which the compilation stops at once; 0 means unlimited
    tolerance: usize,
    warning_level: WarningLevel,
    phase: Phase,
}

impl ErrorCollector {
    pub fn new(tolerance: usize, warning_level: WarningLevel) -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            tolerance,
            warning_level,
            phase: Phase::Initialization,
        }
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Records a continuable error, failing once the tolerance is reached
    pub fn add_error(&mut self, message: CompileMessage) -> CompileResult<()> {
        tracing::debug!(phase = %self.phase, "{message}");
        self.errors.push(message);
        if self.tolerance > 0 && self.errors.len() >= self.tolerance {
            return Err(self.failure());
        }
        Ok(())
    }

    /// Records an error and fails immediately
    pub fn add_fatal(&mut self, message: CompileMessage) -> CompilerError {
        self.errors.push(message);
        self.failure()
    }

    pub fn add_warning(&mut self, warning: CompileWarning) {
        if warning.level <= self.warning_level && warning.level != WarningLevel::None {
            tracing::debug!("{warning}");
            self.warnings.push(warning);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[CompileMessage] {
        &self.errors
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    pub fn fail_if_errors(&self) -> CompileResult<()> {
        if self.has_errors() {
            Err(self.failure())
        } else {
            Ok(())
        }
    }

    fn failure(&self) -> CompilerError {
        CompilerError::Failed(CompilationFailed {
            phase: self.phase,
            messages: self.errors.clone(),
        })
    }
}
