//! Runtime errors
//!
//! [`RuntimeError::Thrown`] carries a Grove exception object and is the only
//! variant exception tables can catch. The dispatch failures (missing
//! method, ambiguous overloads and friends) are turned into Grove exceptions
//! by [`Runtime::unwrap`](crate::Runtime::unwrap) before they reach Grove
//! code; the remaining variants describe a broken runtime or class file and
//! always propagate to the host.

use crate::object::ObjectRef;
use grove_compiler::classpath;
use grove_parser::names;
use miette::Diagnostic;
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Error, Diagnostic, Debug, Clone)]
pub enum RuntimeError {
    #[error("{}", describe_thrown(.0))]
    #[diagnostic(code(grove::runtime::thrown))]
    Thrown(ObjectRef),

    #[error("No signature of method: {class}.{method}() is applicable for argument types: ({})", .arguments.join(", "))]
    #[diagnostic(
        code(grove::runtime::missing_method),
        help("Check the method name and the classes of the arguments")
    )]
    MissingMethod {
        class: String,
        method: String,
        arguments: Vec<String>,
    },

    #[error("Could not find matching constructor for: {class}({})", .arguments.join(", "))]
    #[diagnostic(code(grove::runtime::missing_constructor))]
    MissingConstructor { class: String, arguments: Vec<String> },

    #[error("No such property: {property} for class: {class}")]
    #[diagnostic(code(grove::runtime::missing_property))]
    MissingProperty { class: String, property: String },

    #[error("Cannot set readonly property: {property} for class: {class}")]
    #[diagnostic(code(grove::runtime::readonly_property))]
    ReadOnlyProperty { class: String, property: String },

    #[error(
        "Ambiguous method overloading for method {class}#{method}. Cannot resolve which method to invoke for [{}] due to overlapping prototypes between: {}",
        .arguments.join(", "),
        .candidates.iter().map(|c| format!("[{c}]")).collect::<Vec<_>>().join(", ")
    )]
    #[diagnostic(
        code(grove::runtime::ambiguous_method),
        help("Cast the arguments to select one of the candidates")
    )]
    AmbiguousMethod {
        class: String,
        method: String,
        arguments: Vec<String>,
        candidates: Vec<String>,
    },

    #[error("{message}")]
    #[diagnostic(code(grove::runtime::null_pointer))]
    NullPointer { message: String },

    #[error("Cannot cast object '{value}' with class '{from}' to class '{to}'")]
    #[diagnostic(code(grove::runtime::class_cast))]
    ClassCast {
        value: String,
        from: String,
        to: String,
    },

    #[error("{message}")]
    #[diagnostic(code(grove::runtime::arithmetic))]
    Arithmetic { message: String },

    #[error("{message}")]
    #[diagnostic(code(grove::runtime::illegal_argument))]
    IllegalArgument { message: String },

    #[error("{message}")]
    #[diagnostic(code(grove::runtime::illegal_state))]
    IllegalState { message: String },

    #[error("Class not found: {name}")]
    #[diagnostic(code(grove::runtime::class_not_found))]
    ClassNotFound { name: String },

    #[error("Could not initialize class {class}: {reason}")]
    #[diagnostic(code(grove::runtime::initialization))]
    Initialization { class: String, reason: String },

    #[error("Stack overflow: maximum call depth of {max_depth} exceeded")]
    #[diagnostic(
        code(grove::runtime::stack_overflow),
        help("Look for unbounded recursion or raise the configured call depth")
    )]
    StackOverflow { max_depth: usize },

    #[error("Unable to load class {class}: {message}")]
    #[diagnostic(code(grove::runtime::load))]
    Load { class: String, message: String },

    #[error("Invalid code in {class}.{method} at {pc}: {message}")]
    #[diagnostic(code(grove::runtime::invalid_code))]
    InvalidCode {
        class: String,
        method: String,
        pc: usize,
        message: String,
    },
}

impl RuntimeError {
    pub fn missing_method(class: &str, method: &str, arguments: Vec<String>) -> Self {
        Self::MissingMethod {
            class: class.to_string(),
            method: method.to_string(),
            arguments,
        }
    }

    pub fn missing_property(class: &str, property: &str) -> Self {
        Self::MissingProperty {
            class: class.to_string(),
            property: property.to_string(),
        }
    }

    pub fn null_pointer(message: impl Into<String>) -> Self {
        Self::NullPointer {
            message: message.into(),
        }
    }

    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument {
            message: message.into(),
        }
    }

    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    pub fn arithmetic(message: impl Into<String>) -> Self {
        Self::Arithmetic {
            message: message.into(),
        }
    }

    pub fn load(class: &str, message: impl Into<String>) -> Self {
        Self::Load {
            class: class.to_string(),
            message: message.into(),
        }
    }

    /// Grove exception class a dispatch failure is reported as
    ///
    /// `None` for errors that never become Grove exceptions.
    pub fn exception_class(&self) -> Option<&'static str> {
        match self {
            Self::MissingMethod { .. } => Some(classpath::MISSING_METHOD),
            Self::MissingProperty { .. } | Self::ReadOnlyProperty { .. } => {
                Some(classpath::MISSING_PROPERTY)
            }
            Self::AmbiguousMethod { .. } | Self::MissingConstructor { .. } => {
                Some(names::RUNTIME_EXCEPTION)
            }
            Self::NullPointer { .. } => Some(classpath::NULL_POINTER),
            Self::ClassCast { .. } => Some(classpath::CLASS_CAST),
            Self::Arithmetic { .. } => Some(classpath::ARITHMETIC),
            Self::IllegalArgument { .. } => Some(classpath::ILLEGAL_ARGUMENT),
            Self::IllegalState { .. } => Some(classpath::ILLEGAL_STATE),
            Self::Thrown(_)
            | Self::ClassNotFound { .. }
            | Self::Initialization { .. }
            | Self::StackOverflow { .. }
            | Self::Load { .. }
            | Self::InvalidCode { .. } => None,
        }
    }

    /// The thrown Grove exception, if this is one
    pub fn thrown(&self) -> Option<&ObjectRef> {
        match self {
            Self::Thrown(exception) => Some(exception),
            _ => None,
        }
    }
}

fn describe_thrown(exception: &ObjectRef) -> String {
    match exception.field("message").as_str() {
        Some(message) => format!("{}: {message}", exception.class.name),
        None => exception.class.name.clone(),
    }
}
