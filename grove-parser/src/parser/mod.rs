// Grove Parser
// Pest grammar driver and the CST -> AST conversion plugin

mod declarations;
mod expressions;
mod literals;
mod statements;

use crate::ast::*;
use crate::cst::{Cst, CstNode, LineIndex};
use crate::error::{ParseError, ParseResult};
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grove.pest"]
pub struct GroveParser;

/// Result of converting a CST: the module plus continuable diagnostics
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub module: ModuleNode,
    pub errors: Vec<ParseError>,
}

/// Parsing happens in two steps so callers can stop after the first one
///
/// `parse_cst` fails with a syntax error when the source does not match the
/// grammar. `build_ast` returns continuable problems in
/// [`BuildOutput::errors`] and fails only on fatal parser bugs.
pub trait ParserPlugin: Send + Sync {
    fn parse_cst(&self, source: &str, source_name: &str) -> ParseResult<Cst>;

    fn build_ast(&self, cst: &Cst, source: &str, source_name: &str) -> ParseResult<BuildOutput>;
}

/// The pest-backed parser plugin
#[derive(Debug, Clone, Copy, Default)]
pub struct GroveParserPlugin;

impl ParserPlugin for GroveParserPlugin {
    fn parse_cst(&self, source: &str, source_name: &str) -> ParseResult<Cst> {
        let mut pairs = GroveParser::parse(Rule::compilation_unit, source)
            .map_err(|e| ParseError::from_pest_error(e, source))?;
        let root = pairs
            .next()
            .map(CstNode::from_pair)
            .ok_or_else(|| ParseError::bug("compilation unit", None, &Span::default()))?;
        tracing::trace!(source = source_name, nodes = root.size(), "parsed CST");
        Ok(Cst {
            root,
            lines: LineIndex::new(source),
            source_name: source_name.to_string(),
        })
    }

    fn build_ast(&self, cst: &Cst, source: &str, source_name: &str) -> ParseResult<BuildOutput> {
        let mut builder = AstBuilder::new(source, cst, source_name);
        builder.build_compilation_unit(&cst.root)?;
        Ok(BuildOutput {
            module: builder.module,
            errors: builder.errors,
        })
    }
}

impl GroveParserPlugin {
    /// Parses a single expression, for tests and tooling
    pub fn parse_expression(&self, source: &str) -> ParseResult<Expression> {
        let mut pairs = GroveParser::parse(Rule::expression_input, source)
            .map_err(|e| ParseError::from_pest_error(e, source))?;
        let root = pairs
            .next()
            .map(CstNode::from_pair)
            .ok_or_else(|| ParseError::bug("expression", None, &Span::default()))?;
        let cst = Cst {
            root,
            lines: LineIndex::new(source),
            source_name: "<expression>".to_string(),
        };
        let mut builder = AstBuilder::new(source, &cst, "<expression>");
        let expression = builder.expect_child(&cst.root, Rule::expression)?;
        let result = builder.build_expression(expression)?;
        match builder.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(result),
        }
    }
}

/// Walks the CST and produces the AST for one module
pub(crate) struct AstBuilder<'a> {
    pub(crate) source: &'a str,
    pub(crate) cst: &'a Cst,
    pub(crate) module: ModuleNode,
    pub(crate) errors: Vec<ParseError>,
    /// Simple name of the class whose body is being converted
    pub(crate) current_class: Option<String>,
}

impl<'a> AstBuilder<'a> {
    pub(crate) fn new(source: &'a str, cst: &'a Cst, source_name: &str) -> Self {
        Self {
            source,
            cst,
            module: ModuleNode::new(source_name),
            errors: Vec::new(),
            current_class: None,
        }
    }

    pub(crate) fn span(&self, node: &CstNode) -> Span {
        self.cst.span_of(node)
    }

    pub(crate) fn text(&self, node: &CstNode) -> &'a str {
        node.text(self.source)
    }

    /// Fatal error for a CST shape the grammar cannot produce
    pub(crate) fn bug(&self, expected: &str, node: &CstNode) -> ParseError {
        ParseError::bug(expected, Some(node.rule), &self.span(node))
    }

    pub(crate) fn expect_child<'n>(&self, node: &'n CstNode, rule: Rule) -> ParseResult<&'n CstNode> {
        node.child(rule)
            .ok_or_else(|| self.bug(&format!("{rule:?} inside {:?}", node.rule), node))
    }

    pub(crate) fn first_child<'n>(&self, node: &'n CstNode) -> ParseResult<&'n CstNode> {
        node.children
            .first()
            .ok_or_else(|| self.bug(&format!("content inside {:?}", node.rule), node))
    }

    /// Records a continuable error
    pub(crate) fn error(&mut self, span: &Span, message: impl Into<String>) {
        let error = ParseError::semantic(self.source, span, message);
        tracing::debug!(%error, "continuable parse error");
        self.errors.push(error);
    }
}
