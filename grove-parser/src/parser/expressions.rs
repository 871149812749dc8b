// Expression conversion
// Handles operator precedence, postfix chains and primary expressions

use crate::ast::*;
use crate::cst::CstNode;
use crate::error::ParseResult;
use crate::parser::{AstBuilder, Rule};

/// Binary operators as written, including elvis which builds its own node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfixOperator {
    Elvis,
    Binary(BinaryOperator),
}

impl InfixOperator {
    /// Binding power, higher binds tighter
    fn precedence(self) -> u8 {
        match self {
            InfixOperator::Elvis => 1,
            InfixOperator::Binary(op) => match op {
                BinaryOperator::LogicalOr => 2,
                BinaryOperator::LogicalAnd => 3,
                BinaryOperator::Equal | BinaryOperator::NotEqual => 4,
                BinaryOperator::Less
                | BinaryOperator::LessEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual => 5,
                BinaryOperator::Add | BinaryOperator::Subtract => 6,
                BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 7,
            },
        }
    }

    fn right_associative(self) -> bool {
        self == InfixOperator::Elvis
    }

    fn from_rule(rule: Rule) -> Option<Self> {
        let op = match rule {
            Rule::op_elvis => return Some(InfixOperator::Elvis),
            Rule::op_or => BinaryOperator::LogicalOr,
            Rule::op_and => BinaryOperator::LogicalAnd,
            Rule::op_eq => BinaryOperator::Equal,
            Rule::op_ne => BinaryOperator::NotEqual,
            Rule::op_le => BinaryOperator::LessEqual,
            Rule::op_ge => BinaryOperator::GreaterEqual,
            Rule::op_lt => BinaryOperator::Less,
            Rule::op_gt => BinaryOperator::Greater,
            Rule::op_add => BinaryOperator::Add,
            Rule::op_sub => BinaryOperator::Subtract,
            Rule::op_mul => BinaryOperator::Multiply,
            Rule::op_div => BinaryOperator::Divide,
            Rule::op_mod => BinaryOperator::Modulo,
            _ => return None,
        };
        Some(InfixOperator::Binary(op))
    }

    fn combine(self, left: Expression, right: Expression) -> Expression {
        let span = left.span.merge(&right.span);
        let kind = match self {
            InfixOperator::Elvis => ExpressionKind::Elvis(ElvisExpression {
                value: Box::new(left),
                fallback: Box::new(right),
            }),
            InfixOperator::Binary(operator) => ExpressionKind::Binary(BinaryExpression {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            }),
        };
        Expression::new(kind, span)
    }
}

impl AstBuilder<'_> {
    pub(crate) fn build_expression(&mut self, node: &CstNode) -> ParseResult<Expression> {
        match node.rule {
            Rule::expression => self.build_expression(self.first_child(node)?),
            Rule::assignment => self.build_assignment(node),
            Rule::conditional => self.build_conditional(node),
            Rule::binary => self.build_binary(node),
            Rule::operand => self.build_operand(node),
            Rule::postfix_expression => self.build_postfix(node),
            Rule::primary => self.build_primary(node),
            _ => Err(self.bug("expression", node)),
        }
    }

    fn build_assignment(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let target_node = self.expect_child(node, Rule::conditional)?;
        let target = self.build_conditional(target_node)?;
        let Some(op_node) = node.child(Rule::assign_op) else {
            return Ok(target);
        };
        let value = self.build_expression(self.expect_child(node, Rule::expression)?)?;
        let operator = match self.text(op_node) {
            "=" => AssignmentOperator::Assign,
            "+=" => AssignmentOperator::AddAssign,
            "-=" => AssignmentOperator::SubtractAssign,
            "*=" => AssignmentOperator::MultiplyAssign,
            "/=" => AssignmentOperator::DivideAssign,
            "%=" => AssignmentOperator::ModuloAssign,
            _ => return Err(self.bug("assignment operator", op_node)),
        };
        let assignable = matches!(
            target.kind,
            ExpressionKind::Variable(_)
                | ExpressionKind::Property(_)
                | ExpressionKind::Field(_)
                | ExpressionKind::Index(_)
        );
        if !assignable {
            self.error(&target.span, "Invalid left-hand side of assignment");
        }
        let span = target.span.merge(&value.span);
        Ok(Expression::new(
            ExpressionKind::Assignment(AssignmentExpression {
                target: Box::new(target),
                operator,
                value: Box::new(value),
            }),
            span,
        ))
    }

    fn build_conditional(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let condition = self.build_binary(self.expect_child(node, Rule::binary)?)?;
        let Some(tail) = node.child(Rule::ternary_tail) else {
            return Ok(condition);
        };
        let mut branches = tail.children_of(Rule::expression);
        let (Some(then_node), Some(else_node)) = (branches.next(), branches.next()) else {
            return Err(self.bug("two ternary branches", tail));
        };
        let then_branch = self.build_expression(then_node)?;
        let else_branch = self.build_expression(else_node)?;
        let span = condition.span.merge(&else_branch.span);
        Ok(Expression::new(
            ExpressionKind::Ternary(TernaryExpression {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }),
            span,
        ))
    }

    /// Applies precedence to the flat `operand (op operand)*` sequence
    fn build_binary(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let mut operands = Vec::new();
        let mut operators = Vec::new();
        for child in &node.children {
            match child.rule {
                Rule::operand => operands.push(self.build_operand(child)?),
                Rule::binary_op => {
                    let op_node = self.first_child(child)?;
                    let op = InfixOperator::from_rule(op_node.rule)
                        .ok_or_else(|| self.bug("binary operator", op_node))?;
                    operators.push(op);
                }
                _ => return Err(self.bug("operand or operator", child)),
            }
        }
        if operands.len() != operators.len() + 1 {
            return Err(self.bug("alternating operands and operators", node));
        }
        let mut operands = operands.into_iter();
        let mut operators = operators.into_iter().peekable();
        let first = operands
            .next()
            .ok_or_else(|| self.bug("operand", node))?;
        Ok(climb(first, 0, &mut operands, &mut operators))
    }

    fn build_operand(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let postfix = self.expect_child(node, Rule::postfix_expression)?;
        let mut expression = self.build_postfix(postfix)?;

        for type_op in node.children_of(Rule::type_operator) {
            let keyword = self.first_child(type_op)?;
            let class_type = self.build_class_type(self.expect_child(type_op, Rule::class_type)?)?;
            let span = expression.span.merge(&self.span(type_op));
            let kind = match keyword.rule {
                Rule::kw_as => ExpressionKind::Cast(CastExpression {
                    expression: Box::new(expression),
                    class_type,
                }),
                Rule::kw_instanceof => ExpressionKind::InstanceOf(InstanceOfExpression {
                    expression: Box::new(expression),
                    class_type,
                }),
                _ => return Err(self.bug("as or instanceof", keyword)),
            };
            expression = Expression::new(kind, span);
        }

        let prefixes: Vec<&CstNode> = node.children_of(Rule::prefix_op).collect();
        for prefix in prefixes.into_iter().rev() {
            let op = self.first_child(prefix)?;
            let span = self.span(prefix).merge(&expression.span);
            expression = match (op.rule, expression.kind) {
                (Rule::op_negate, ExpressionKind::Constant(ConstantValue::Integer(i))) => {
                    Expression::constant(ConstantValue::Integer(-i), span)
                }
                (Rule::op_negate, ExpressionKind::Constant(ConstantValue::Float(x))) => {
                    Expression::constant(ConstantValue::Float(-x), span)
                }
                (rule, kind) => {
                    let operator = match rule {
                        Rule::op_not => UnaryOperator::Not,
                        Rule::op_negate => UnaryOperator::Negate,
                        _ => return Err(self.bug("prefix operator", op)),
                    };
                    let operand = Expression::new(kind, expression.span);
                    Expression::new(
                        ExpressionKind::Unary(UnaryExpression {
                            operator,
                            operand: Box::new(operand),
                        }),
                        span,
                    )
                }
            };
        }
        Ok(expression)
    }

    fn build_postfix(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let mut children = node.children.iter();
        let primary = children
            .next()
            .ok_or_else(|| self.bug("primary expression", node))?;
        let mut expression = self.build_primary(primary)?;

        for suffix in children {
            let span = expression.span.merge(&self.span(suffix));
            expression = match suffix.rule {
                Rule::method_suffix => {
                    let dot = self.text(self.expect_child(suffix, Rule::member_dot)?);
                    let method = self.text(self.expect_child(suffix, Rule::identifier)?).to_string();
                    let arguments = self.build_call_arguments(suffix)?;
                    if dot == ".@" {
                        self.error(&span, format!("Cannot call method '{method}' through direct field access"));
                    }
                    Expression::new(
                        ExpressionKind::MethodCall(MethodCallExpression {
                            object: Box::new(expression),
                            method,
                            arguments,
                            safe: dot == "?.",
                            implicit_this: false,
                        }),
                        span,
                    )
                }
                Rule::property_suffix => {
                    let dot = self.text(self.expect_child(suffix, Rule::member_dot)?);
                    let name = self.text(self.expect_child(suffix, Rule::identifier)?).to_string();
                    let kind = match dot {
                        ".@" => ExpressionKind::Field(FieldExpression {
                            object: Box::new(expression),
                            name,
                        }),
                        _ => ExpressionKind::Property(PropertyExpression {
                            object: Box::new(expression),
                            property: name,
                            safe: dot == "?.",
                        }),
                    };
                    Expression::new(kind, span)
                }
                Rule::call_suffix => {
                    let arguments = self.build_call_arguments(suffix)?;
                    self.build_call(expression, arguments, span)
                }
                Rule::index_suffix => {
                    let index = self.build_expression(self.expect_child(suffix, Rule::expression)?)?;
                    Expression::new(
                        ExpressionKind::Index(IndexExpression {
                            object: Box::new(expression),
                            index: Box::new(index),
                        }),
                        span,
                    )
                }
                _ => return Err(self.bug("postfix operator", suffix)),
            };
        }
        Ok(expression)
    }

    /// `callee(args)`: a method on `this`, a constructor delegation, or a closure call
    fn build_call(&mut self, callee: Expression, arguments: Vec<Expression>, span: Span) -> Expression {
        let kind = match callee.kind {
            ExpressionKind::Variable(variable) => ExpressionKind::MethodCall(MethodCallExpression {
                object: Box::new(Expression::this(callee.span)),
                method: variable.name,
                arguments,
                safe: false,
                implicit_this: true,
            }),
            delegate @ (ExpressionKind::This | ExpressionKind::Super) => {
                let delegation = if delegate == ExpressionKind::This {
                    ConstructorCallKind::This
                } else {
                    ConstructorCallKind::Super
                };
                ExpressionKind::ConstructorCall(ConstructorCallExpression {
                    class_type: ClassType::new(
                        self.current_class.clone().unwrap_or_default(),
                        callee.span.clone(),
                    ),
                    arguments,
                    kind: delegation,
                })
            }
            kind => ExpressionKind::MethodCall(MethodCallExpression {
                object: Box::new(Expression::new(kind, callee.span)),
                method: "call".to_string(),
                arguments,
                safe: false,
                implicit_this: false,
            }),
        };
        Expression::new(kind, span)
    }

    /// Arguments plus an optional trailing closure, which becomes the last argument
    fn build_call_arguments(&mut self, node: &CstNode) -> ParseResult<Vec<Expression>> {
        let mut arguments = match node.child(Rule::arguments) {
            Some(args) => self.build_arguments(args)?,
            None => Vec::new(),
        };
        if let Some(closure) = node.child(Rule::closure_literal) {
            arguments.push(self.build_closure(closure)?);
        }
        Ok(arguments)
    }

    pub(crate) fn build_arguments(&mut self, node: &CstNode) -> ParseResult<Vec<Expression>> {
        node.children_of(Rule::expression)
            .map(|e| self.build_expression(e))
            .collect()
    }

    fn build_primary(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let inner = match node.rule {
            Rule::primary => self.first_child(node)?,
            _ => node,
        };
        let span = self.span(inner);
        match inner.rule {
            Rule::integer_literal => self.build_integer(inner),
            Rule::float_literal => self.build_float(inner),
            Rule::string_literal => self.build_string(inner),
            Rule::gstring => self.build_gstring(inner),
            Rule::boolean_literal => {
                let keyword = self.first_child(inner)?;
                let value = keyword.rule == Rule::kw_true;
                Ok(Expression::constant(ConstantValue::Boolean(value), span))
            }
            Rule::null_literal => Ok(Expression::constant(ConstantValue::Null, span)),
            Rule::empty_map => Ok(Expression::new(ExpressionKind::Map(Vec::new()), span)),
            Rule::map_literal => {
                let mut entries = Vec::new();
                for entry in inner.children_of(Rule::map_entry) {
                    let key = self.build_map_key(self.expect_child(entry, Rule::map_key)?)?;
                    let value = self.build_expression(self.expect_child(entry, Rule::expression)?)?;
                    entries.push(MapEntry { key, value });
                }
                Ok(Expression::new(ExpressionKind::Map(entries), span))
            }
            Rule::list_literal => {
                let elements = self.build_arguments(inner)?;
                Ok(Expression::new(ExpressionKind::List(elements), span))
            }
            Rule::new_expression => {
                let class_type = self.build_class_type(self.expect_child(inner, Rule::class_type)?)?;
                let arguments = self.build_call_arguments(inner)?;
                Ok(Expression::new(
                    ExpressionKind::ConstructorCall(ConstructorCallExpression {
                        class_type,
                        arguments,
                        kind: ConstructorCallKind::New,
                    }),
                    span,
                ))
            }
            Rule::closure_literal => self.build_closure(inner),
            Rule::this_expression => Ok(Expression::this(span)),
            Rule::super_expression => Ok(Expression::new(ExpressionKind::Super, span)),
            Rule::parenthesized => self.build_expression(self.expect_child(inner, Rule::expression)?),
            Rule::identifier => Ok(Expression::variable(self.text(inner), span)),
            _ => Err(self.bug("primary expression", inner)),
        }
    }

    fn build_map_key(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let inner = self.first_child(node)?;
        match inner.rule {
            Rule::identifier => Ok(Expression::constant(
                ConstantValue::String(self.text(inner).to_string()),
                self.span(inner),
            )),
            _ => self.build_primary(inner),
        }
    }

    fn build_closure(&mut self, node: &CstNode) -> ParseResult<Expression> {
        let parameters = match node.child(Rule::closure_parameters) {
            Some(params) => Some(self.build_parameters(params)?),
            None => None,
        };
        let statements = node
            .children_of(Rule::statement)
            .map(|s| self.build_statement(s))
            .collect::<ParseResult<Vec<_>>>()?;
        let span = self.span(node);
        Ok(Expression::new(
            ExpressionKind::Closure(ClosureExpression {
                parameters,
                body: Box::new(Statement::block(statements, span.clone())),
                captured: Vec::new(),
            }),
            span,
        ))
    }
}

/// Precedence climbing over already-converted operands
fn climb<O, P>(mut left: Expression, min_precedence: u8, operands: &mut O, operators: &mut std::iter::Peekable<P>) -> Expression
where
    O: Iterator<Item = Expression>,
    P: Iterator<Item = InfixOperator>,
{
    while let Some(&op) = operators.peek() {
        if op.precedence() < min_precedence {
            break;
        }
        operators.next();
        let Some(mut right) = operands.next() else {
            break;
        };
        while let Some(&next) = operators.peek() {
            let tighter = next.precedence() > op.precedence()
                || (next.right_associative() && next.precedence() == op.precedence());
            if !tighter {
                break;
            }
            let next_min = if next.precedence() > op.precedence() {
                op.precedence() + 1
            } else {
                op.precedence()
            };
            right = climb(right, next_min, operands, operators);
        }
        left = op.combine(left, right);
    }
    left
}
