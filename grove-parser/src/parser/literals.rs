// Literal conversion
// Numbers, single-quoted strings and interpolated GStrings

use crate::ast::*;
use crate::cst::CstNode;
use crate::error::{ParseError, ParseResult};
use crate::parser::{AstBuilder, Rule};

impl AstBuilder<'_> {
    pub(crate) fn build_integer(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let text = self.text(node);
        let span = self.span(node);
        match text.parse::<i64>() {
            Ok(value) => Ok(Expression::constant(ConstantValue::Integer(value), span)),
            Err(_) => {
                self.errors
                    .push(ParseError::invalid_literal(self.source, &span, "integer", text));
                Ok(Expression::constant(ConstantValue::Integer(0), span))
            }
        }
    }

    pub(crate) fn build_float(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let text = self.text(node);
        let span = self.span(node);
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => {
                Ok(Expression::constant(ConstantValue::Float(value), span))
            }
            _ => {
                self.errors
                    .push(ParseError::invalid_literal(self.source, &span, "float", text));
                Ok(Expression::constant(ConstantValue::Float(0.0), span))
            }
        }
    }

    pub(crate) fn build_string(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let span = self.span(node);
        let inner = self.expect_child(node, Rule::string_inner)?;
        let value = self.unescape(inner)?;
        Ok(Expression::constant(ConstantValue::String(value), span))
    }

    /// `"a ${b} $c"`; without interpolation the result is a plain string constant
    pub(crate) fn build_gstring(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let span = self.span(node);
        let mut strings = Vec::new();
        let mut values = Vec::new();
        let mut current = String::new();
        for part in &node.children {
            match part.rule {
                Rule::gstring_text => current.push_str(&self.unescape(part)?),
                Rule::gstring_dollar => current.push('$'),
                Rule::gstring_reference => {
                    let name = self.expect_child(part, Rule::identifier)?;
                    strings.push(std::mem::take(&mut current));
                    values.push(Expression::variable(self.text(name), self.span(name)));
                }
                Rule::gstring_interpolation => {
                    let expression = self.expect_child(part, Rule::expression)?;
                    strings.push(std::mem::take(&mut current));
                    values.push(self.build_expression(expression)?);
                }
                _ => return Err(self.bug("GString part", part)),
            }
        }
        strings.push(current);

        if values.is_empty() {
            let text = strings.pop().unwrap_or_default();
            return Ok(Expression::constant(ConstantValue::String(text), span));
        }
        Ok(Expression::new(
            ExpressionKind::GString(GStringExpression { strings, values }),
            span,
        ))
    }

    /// Decodes escape sequences in the raw text of `node`
    fn unescape(&mut self, node: &CstNode) -> ParseResult<String> {
        let raw = self.text(node);
        let mut result = String::with_capacity(raw.len());
        let mut chars = raw.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                result.push(c);
                continue;
            }
            let decoded = match chars.next() {
                Some('n') => '\n',
                Some('t') => '\t',
                Some('r') => '\r',
                Some('b') => '\u{8}',
                Some('f') => '\u{c}',
                Some('0') => '\0',
                Some('\\') => '\\',
                Some('\'') => '\'',
                Some('"') => '"',
                Some('$') => '$',
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(decoded) => decoded,
                        None => {
                            let span = self.span(node);
                            self.errors.push(ParseError::invalid_literal(
                                self.source,
                                &span,
                                "unicode escape",
                                &format!("\\u{hex}"),
                            ));
                            continue;
                        }
                    }
                }
                _ => return Err(self.bug("escape sequence", node)),
            };
            result.push(decoded);
        }
        Ok(result)
    }
}
