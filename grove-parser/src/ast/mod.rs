// Grove AST Definitions
// Mutable syntax tree shared by the parser plugin and the compiler phases

mod class;
mod class_table;
mod expression;
mod module;
pub mod names;
mod statement;
mod types;

pub use class::*;
pub use class_table::*;
pub use expression::*;
pub use module::*;
pub use statement::*;
pub use types::*;

use std::fmt;

/// Source position information for AST nodes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_line_col: Option<(usize, usize)>,
    pub end_line_col: Option<(usize, usize)>,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            start_line_col: None,
            end_line_col: None,
        }
    }

    pub fn with_line_col(
        start: usize,
        end: usize,
        start_line_col: (usize, usize),
        end_line_col: (usize, usize),
    ) -> Self {
        Self {
            start,
            end,
            start_line_col: Some(start_line_col),
            end_line_col: Some(end_line_col),
        }
    }

    /// Span covering both `self` and `other`
    pub fn merge(&self, other: &Span) -> Span {
        let (start, start_line_col) = if self.start <= other.start {
            (self.start, self.start_line_col)
        } else {
            (other.start, other.start_line_col)
        };
        let (end, end_line_col) = if self.end >= other.end {
            (self.end, self.end_line_col)
        } else {
            (other.end, other.end_line_col)
        };
        Span {
            start,
            end,
            start_line_col,
            end_line_col,
        }
    }

    /// One-based line of the span start, or 0 when unknown
    pub fn line(&self) -> usize {
        self.start_line_col.map(|(line, _)| line).unwrap_or(0)
    }

    /// One-based column of the span start, or 0 when unknown
    pub fn column(&self) -> usize {
        self.start_line_col.map(|(_, col)| col).unwrap_or(0)
    }

    pub fn to_source_span(&self) -> miette::SourceSpan {
        miette::SourceSpan::new(self.start.into(), self.end.saturating_sub(self.start))
    }
}

/// Declaration modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Final,
    Abstract,
    Synchronized,
    Transient,
}

impl Modifier {
    const fn bit(self) -> u16 {
        match self {
            Modifier::Public => 1 << 0,
            Modifier::Protected => 1 << 1,
            Modifier::Private => 1 << 2,
            Modifier::Static => 1 << 3,
            Modifier::Final => 1 << 4,
            Modifier::Abstract => 1 << 5,
            Modifier::Synchronized => 1 << 6,
            Modifier::Transient => 1 << 7,
        }
    }

    pub const ALL: [Modifier; 8] = [
        Modifier::Public,
        Modifier::Protected,
        Modifier::Private,
        Modifier::Static,
        Modifier::Final,
        Modifier::Abstract,
        Modifier::Synchronized,
        Modifier::Transient,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Static => "static",
            Modifier::Final => "final",
            Modifier::Abstract => "abstract",
            Modifier::Synchronized => "synchronized",
            Modifier::Transient => "transient",
        }
    }

    pub fn from_keyword(text: &str) -> Option<Modifier> {
        Modifier::ALL.into_iter().find(|m| m.keyword() == text)
    }
}

/// Set of modifiers attached to a declaration
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const fn empty() -> Self {
        Modifiers(0)
    }

    pub fn of(modifiers: &[Modifier]) -> Self {
        modifiers
            .iter()
            .fold(Modifiers::empty(), |acc, m| acc.with(*m))
    }

    pub const fn with(self, modifier: Modifier) -> Self {
        Modifiers(self.0 | modifier.bit())
    }

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub fn remove(&mut self, modifier: Modifier) {
        self.0 &= !modifier.bit();
    }

    pub const fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn is_static(self) -> bool {
        self.contains(Modifier::Static)
    }

    pub fn is_final(self) -> bool {
        self.contains(Modifier::Final)
    }

    pub fn is_abstract(self) -> bool {
        self.contains(Modifier::Abstract)
    }

    pub fn is_private(self) -> bool {
        self.contains(Modifier::Private)
    }

    /// True when no visibility keyword was written
    pub fn has_no_visibility(self) -> bool {
        !self.contains(Modifier::Public)
            && !self.contains(Modifier::Protected)
            && !self.contains(Modifier::Private)
    }

    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn from_bits(bits: u16) -> Self {
        Modifiers(bits)
    }
}

impl fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Modifier::keyword)).finish()
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<&str> = self.iter().map(Modifier::keyword).collect();
        write!(f, "{}", words.join(" "))
    }
}
