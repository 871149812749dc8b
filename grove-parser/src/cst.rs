// Concrete syntax tree
// Owned copy of the pest parse tree, so conversion can run after parsing returns

use crate::ast::Span;
use crate::parser::Rule;
use pest::iterators::Pair;

/// One node of the concrete syntax tree
#[derive(Debug, Clone, PartialEq)]
pub struct CstNode {
    pub rule: Rule,
    pub start: usize,
    pub end: usize,
    pub children: Vec<CstNode>,
}

impl CstNode {
    pub(crate) fn from_pair(pair: Pair<'_, Rule>) -> Self {
        let rule = pair.as_rule();
        let span = pair.as_span();
        let children = pair.into_inner().map(CstNode::from_pair).collect();
        Self {
            rule,
            start: span.start(),
            end: span.end(),
            children,
        }
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        source.get(self.start..self.end).unwrap_or("")
    }

    pub fn child(&self, rule: Rule) -> Option<&CstNode> {
        self.children.iter().find(|c| c.rule == rule)
    }

    pub fn children_of(&self, rule: Rule) -> impl Iterator<Item = &CstNode> {
        self.children.iter().filter(move |c| c.rule == rule)
    }

    pub fn has_child(&self, rule: Rule) -> bool {
        self.child(rule).is_some()
    }

    /// Number of nodes in this subtree
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(CstNode::size).sum::<usize>()
    }
}

/// Byte offset to one-based line/column translation
#[derive(Debug, Clone, PartialEq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .char_indices()
                .filter(|(_, c)| *c == '\n')
                .map(|(idx, _)| idx + 1),
        );
        Self { line_starts }
    }

    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::with_line_col(start, end, self.line_col(start), self.line_col(end))
    }
}

/// Parsed source: the root `compilation_unit` node plus position data
#[derive(Debug, Clone, PartialEq)]
pub struct Cst {
    pub root: CstNode,
    pub lines: LineIndex,
    pub source_name: String,
}

impl Cst {
    pub fn span_of(&self, node: &CstNode) -> Span {
        self.lines.span(node.start, node.end)
    }
}
