//! Compilation phases, in the order the driver advances through them.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Initialization,
    Parsing,
    Conversion,
    SemanticAnalysis,
    Canonicalization,
    InstructionSelection,
    ClassGeneration,
    Output,
    Finalization,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Phase::Initialization,
        Phase::Parsing,
        Phase::Conversion,
        Phase::SemanticAnalysis,
        Phase::Canonicalization,
        Phase::InstructionSelection,
        Phase::ClassGeneration,
        Phase::Output,
        Phase::Finalization,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The following phase, `None` after finalization
    pub fn next(self) -> Option<Phase> {
        Phase::ALL.get(self.index() + 1).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Initialization => "initialization",
            Phase::Parsing => "parsing",
            Phase::Conversion => "conversion",
            Phase::SemanticAnalysis => "semantic analysis",
            Phase::Canonicalization => "canonicalization",
            Phase::InstructionSelection => "instruction selection",
            Phase::ClassGeneration => "class generation",
            Phase::Output => "output",
            Phase::Finalization => "finalization",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
