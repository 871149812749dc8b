// Grove Parser Library
// Pest-based parser and mutable AST for the Grove language

pub mod ast;
pub mod cst;
pub mod error;
pub mod parser;

pub use ast::*;
pub use cst::{Cst, CstNode, LineIndex};
pub use error::*;
pub use parser::{BuildOutput, GroveParserPlugin, ParserPlugin, Rule};

/// Parses and converts a whole source with the default plugin
///
/// Continuable errors are returned alongside the module; the first syntax or
/// fatal error is returned as `Err`.
pub fn parse_module(source: &str, source_name: &str) -> ParseResult<BuildOutput> {
    let plugin = GroveParserPlugin;
    let cst = plugin.parse_cst(source, source_name)?;
    plugin.build_ast(&cst, source, source_name)
}

pub fn parse_expression(source: &str) -> ParseResult<Expression> {
    GroveParserPlugin.parse_expression(source)
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
#[path = "tests/mod.rs"]
mod tests;
