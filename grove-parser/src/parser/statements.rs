// Statement conversion

use crate::ast::*;
use crate::cst::CstNode;
use crate::error::ParseResult;
use crate::parser::{AstBuilder, Rule};

impl AstBuilder<'_> {
    pub(crate) fn build_statement(&mut self, node: &CstNode) -> ParseResult<Statement> {
        let inner = match node.rule {
            Rule::statement => self.first_child(node)?,
            _ => node,
        };
        let span = self.span(inner);
        let kind = match inner.rule {
            Rule::block => return self.build_block(inner),
            Rule::if_statement => self.build_if(inner)?,
            Rule::while_statement => {
                let condition = self.build_expression(self.expect_child(inner, Rule::expression)?)?;
                let body = self.build_statement(self.expect_child(inner, Rule::statement)?)?;
                StatementKind::While(WhileStatement {
                    condition,
                    body: Box::new(body),
                })
            }
            Rule::for_statement => self.build_for(inner)?,
            Rule::try_statement => self.build_try(inner)?,
            Rule::synchronized_statement => {
                let monitor = self.build_expression(self.expect_child(inner, Rule::expression)?)?;
                let body = self.build_block(self.expect_child(inner, Rule::block)?)?;
                StatementKind::Synchronized(SynchronizedStatement {
                    monitor,
                    body: Box::new(body),
                })
            }
            Rule::return_statement => {
                let value = match inner.child(Rule::expression) {
                    Some(expression) => Some(self.build_expression(expression)?),
                    None => None,
                };
                StatementKind::Return(value)
            }
            Rule::throw_statement => {
                StatementKind::Throw(self.build_expression(self.expect_child(inner, Rule::expression)?)?)
            }
            Rule::break_statement => StatementKind::Break,
            Rule::continue_statement => StatementKind::Continue,
            Rule::declaration_statement => self.build_declaration(inner)?,
            Rule::expression_statement => {
                StatementKind::Expression(self.build_expression(self.expect_child(inner, Rule::expression)?)?)
            }
            Rule::empty_statement => StatementKind::Empty,
            _ => return Err(self.bug("statement", inner)),
        };
        Ok(Statement::new(kind, span))
    }

    pub(crate) fn build_block(&mut self, node: &CstNode) -> ParseResult<Statement> {
        let statements = node
            .children_of(Rule::statement)
            .map(|s| self.build_statement(s))
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(Statement::block(statements, self.span(node)))
    }

    fn build_if(&mut self, node: &CstNode) -> ParseResult<StatementKind> {
        let condition = self.build_expression(self.expect_child(node, Rule::expression)?)?;
        let mut branches = node.children_of(Rule::statement);
        let then_node = branches
            .next()
            .ok_or_else(|| self.bug("if branch", node))?;
        let then_branch = self.build_statement(then_node)?;
        let else_branch = match branches.next() {
            Some(else_node) => Some(Box::new(self.build_statement(else_node)?)),
            None => None,
        };
        Ok(StatementKind::If(IfStatement {
            condition,
            then_branch: Box::new(then_branch),
            else_branch,
        }))
    }

    fn build_for(&mut self, node: &CstNode) -> ParseResult<StatementKind> {
        let variable_type = match node.child(Rule::parameter_type) {
            Some(t) => {
                let inner = self.first_child(t)?;
                match inner.rule {
                    Rule::class_type => self.build_class_type(inner)?,
                    _ => ClassType::dynamic(),
                }
            }
            None => ClassType::dynamic(),
        };
        let name = self.text(self.expect_child(node, Rule::identifier)?);
        let mut variable = Parameter::new(name, variable_type);
        variable.span = self.span(node);
        let collection = self.build_expression(self.expect_child(node, Rule::expression)?)?;
        let body = self.build_statement(self.expect_child(node, Rule::statement)?)?;
        Ok(StatementKind::ForIn(ForInStatement {
            variable,
            collection,
            body: Box::new(body),
        }))
    }

    fn build_try(&mut self, node: &CstNode) -> ParseResult<StatementKind> {
        let body = self.build_block(self.expect_child(node, Rule::block)?)?;
        let mut catches = Vec::new();
        for clause in node.children_of(Rule::catch_clause) {
            let exception_type = match clause.child(Rule::class_type) {
                Some(t) => self.build_class_type(t)?,
                None => ClassType::new(names::EXCEPTION, self.span(clause)),
            };
            let name = self.text(self.expect_child(clause, Rule::identifier)?);
            let mut parameter = Parameter::new(name, exception_type);
            parameter.span = self.span(clause);
            let body = self.build_block(self.expect_child(clause, Rule::block)?)?;
            catches.push(CatchClause {
                parameter,
                body: Box::new(body),
            });
        }
        let finally = match node.child(Rule::finally_clause) {
            Some(clause) => Some(Box::new(self.build_block(self.expect_child(clause, Rule::block)?)?)),
            None => None,
        };
        if catches.is_empty() && finally.is_none() {
            self.error(
                &self.span(node),
                "You defined a try statement without catch or finally",
            );
        }
        Ok(StatementKind::Try(TryStatement {
            body: Box::new(body),
            catches,
            finally,
        }))
    }

    fn build_declaration(&mut self, node: &CstNode) -> ParseResult<StatementKind> {
        let type_node = self.expect_child(node, Rule::declaration_type)?;
        let type_inner = self.first_child(type_node)?;
        let (declared_type, is_final) = match type_inner.rule {
            Rule::kw_def => (ClassType::dynamic(), false),
            Rule::kw_final => (ClassType::dynamic(), true),
            Rule::class_type => (self.build_class_type(type_inner)?, false),
            _ => return Err(self.bug("declaration type", type_inner)),
        };
        let name = self.text(self.expect_child(node, Rule::identifier)?).to_string();
        let initial = match node.child(Rule::expression) {
            Some(expression) => Some(self.build_expression(expression)?),
            None => None,
        };
        if is_final && initial.is_none() {
            self.error(
                &self.span(node),
                format!("The final variable '{name}' must be initialised"),
            );
        }
        Ok(StatementKind::Declaration(DeclarationStatement {
            name,
            declared_type,
            initial,
            is_final,
            closure_shared: false,
        }))
    }
}
