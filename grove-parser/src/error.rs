// Grove Parser Error Handling
// Syntax errors, builder diagnostics and fatal parser bugs

use crate::ast::Span;
use crate::parser::Rule;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Diagnostic, Debug, Clone)]
pub enum ParseError {
    #[error("{message} @ line {line}, column {column}")]
    #[diagnostic(
        code(grove::parse::syntax),
        help("Check the syntax near the highlighted location")
    )]
    Syntax {
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("{message} @ line {line}, column {column}")]
    #[diagnostic(code(grove::parse::semantic))]
    Semantic {
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Invalid {kind} literal '{found}'")]
    #[diagnostic(code(grove::parse::invalid_literal))]
    InvalidLiteral {
        #[source_code]
        src: String,
        #[label("invalid {kind}")]
        span: SourceSpan,
        kind: String,
        found: String,
    },

    /// The syntax tree had a shape the grammar cannot produce
    #[error("Parser bug: expected {expected}, found {found:?} @ {line}:{column}")]
    #[diagnostic(
        code(grove::parse::bug),
        help("This is a defect in the Grove parser, not in your program")
    )]
    Bug {
        expected: String,
        found: Option<Rule>,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    pub fn from_pest_error(error: pest::error::Error<Rule>, src: &str) -> Self {
        let span = match error.location {
            pest::error::InputLocation::Pos(pos) => SourceSpan::new(pos.into(), 0),
            pest::error::InputLocation::Span((start, end)) => {
                SourceSpan::new(start.into(), end - start)
            }
        };
        let (line, column) = match error.line_col {
            pest::error::LineColLocation::Pos(pos) => pos,
            pest::error::LineColLocation::Span(start, _) => start,
        };
        let message = match &error.variant {
            pest::error::ErrorVariant::ParsingError { positives, .. } if !positives.is_empty() => {
                let mut expected: Vec<&str> = Vec::new();
                for description in positives.iter().map(describe_rule) {
                    if !expected.contains(&description) {
                        expected.push(description);
                    }
                }
                format!("unexpected input, expected {}", join_alternatives(&expected))
            }
            pest::error::ErrorVariant::ParsingError { .. } => "unexpected input".to_string(),
            pest::error::ErrorVariant::CustomError { message } => message.clone(),
        };
        ParseError::Syntax {
            src: src.to_string(),
            span,
            message,
            line,
            column,
        }
    }

    pub fn semantic(src: &str, span: &Span, message: impl Into<String>) -> Self {
        ParseError::Semantic {
            src: src.to_string(),
            span: span.to_source_span(),
            message: message.into(),
            line: span.line(),
            column: span.column(),
        }
    }

    pub fn invalid_literal(src: &str, span: &Span, kind: &str, found: &str) -> Self {
        ParseError::InvalidLiteral {
            src: src.to_string(),
            span: span.to_source_span(),
            kind: kind.to_string(),
            found: found.to_string(),
        }
    }

    pub fn bug(expected: impl Into<String>, found: Option<Rule>, span: &Span) -> Self {
        ParseError::Bug {
            expected: expected.into(),
            found,
            line: span.line(),
            column: span.column(),
        }
    }

    /// Fatal errors abort the unit; everything else is collected
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::Bug { .. })
    }

    /// One-based line and column of the error
    pub fn position(&self) -> (usize, usize) {
        match self {
            ParseError::Syntax { line, column, .. }
            | ParseError::Semantic { line, column, .. }
            | ParseError::Bug { line, column, .. } => (*line, *column),
            ParseError::InvalidLiteral { .. } => (0, 0),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

fn join_alternatives(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [one] => one.to_string(),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

fn describe_rule(rule: &Rule) -> &'static str {
    match rule {
        Rule::identifier | Rule::qualified_name => "an identifier",
        Rule::class_type => "a type",
        Rule::expression | Rule::assignment | Rule::conditional | Rule::operand => {
            "an expression"
        }
        Rule::statement => "a statement",
        Rule::block => "a block",
        Rule::class_body | Rule::enum_body => "a class body",
        Rule::parameters | Rule::parameter => "a parameter list",
        Rule::arguments => "an argument list",
        Rule::binary_op => "an operator",
        Rule::assign_op => "an assignment",
        Rule::string_literal | Rule::gstring => "a string",
        Rule::integer_literal | Rule::float_literal => "a number",
        Rule::modifier | Rule::modifiers => "a modifier",
        Rule::type_declaration | Rule::method_declaration => "a declaration",
        Rule::EOI => "end of input",
        _ => "a token",
    }
}
