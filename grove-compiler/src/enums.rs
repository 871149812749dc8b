//! Enum completion
//!
//! Each constant becomes a `public static final` field initialised in the
//! static initializer, ahead of any other static state. Instances carry their
//! name and ordinal in synthetic fields set through two extra constructor
//! parameters.

use crate::classpath;
use crate::error::CompileResult;
use crate::operation::{ClassContext, PrimaryClassNodeOperation};
use crate::synthetic::*;
use grove_parser::names;
use grove_parser::{
    BinaryExpression, BinaryOperator, ClassId, ClassNode, ClassTable, ClassType,
    ConstructorCallKind, Expression, ExpressionKind, FieldNode, ForInStatement, IfStatement,
    MethodNode, Modifier, Modifiers, Parameter, Span, Statement, StatementKind,
};

pub const NAME_FIELD: &str = "$name";
pub const ORDINAL_FIELD: &str = "$ordinal";
pub const VALUES_FIELD: &str = "$VALUES";

pub struct EnumCompletionOperation;

impl PrimaryClassNodeOperation for EnumCompletionOperation {
    fn name(&self) -> &str {
        "enum completion"
    }

    fn call(&mut self, ctx: &mut ClassContext<'_>) -> CompileResult<()> {
        if ctx.class.is_enum() {
            complete_enum(ctx.class, ctx.id, &ctx.compile_unit.classes);
        }
        Ok(())
    }
}

pub fn complete_enum(class: &mut ClassNode, id: ClassId, table: &ClassTable) {
    if class.field(VALUES_FIELD).is_some() {
        return;
    }
    let self_type = resolved_type(&class.name, Some(id));
    let string_type = known_type(table, names::STRING);
    let int_type = known_type(table, names::INT);

    let private_final = Modifiers::of(&[Modifier::Private, Modifier::Final]);
    for (name, field_type) in [(NAME_FIELD, &string_type), (ORDINAL_FIELD, &int_type)] {
        let mut field = FieldNode::new(name, private_final, field_type.clone());
        field.synthetic = true;
        class.add_field(field);
    }

    let mut initializers = Vec::new();
    let constant_modifiers = Modifiers::of(&[Modifier::Public, Modifier::Static, Modifier::Final]);
    for (ordinal, constant) in class.enum_constants.iter().enumerate() {
        let mut field = FieldNode::new(&constant.name, constant_modifiers, self_type.clone());
        field.span = constant.span.clone();
        class.fields.push(field);

        let mut arguments = vec![string(&constant.name), int(ordinal as i64)];
        arguments.extend(constant.arguments.iter().cloned());
        initializers.push(assign(
            static_field(&class.name, Some(id), &constant.name),
            new_instance(self_type.clone(), arguments),
        ));
    }

    let mut values_field = FieldNode::new(
        VALUES_FIELD,
        Modifiers::of(&[Modifier::Private, Modifier::Static]),
        known_type(table, names::LIST),
    );
    values_field.synthetic = true;
    class.add_field(values_field);
    let all_constants = class
        .enum_constants
        .iter()
        .map(|c| static_field(&class.name, Some(id), &c.name))
        .collect();
    initializers.push(assign(
        static_field(&class.name, Some(id), VALUES_FIELD),
        Expression::new(ExpressionKind::List(all_constants), Span::default()),
    ));
    initializers.append(&mut class.static_init);
    class.static_init = initializers;

    complete_constructors(class, &string_type, &int_type);
    add_enum_methods(class, id, table, &self_type, &string_type, &int_type);
}

fn complete_constructors(class: &mut ClassNode, string_type: &ClassType, int_type: &ClassType) {
    if class.constructors.is_empty() {
        class.add_constructor(MethodNode::constructor(
            Modifiers::of(&[Modifier::Private]),
            Vec::new(),
            block(Vec::new()),
        ));
    }
    for constructor in &mut class.constructors {
        constructor.modifiers.remove(Modifier::Public);
        constructor.modifiers.remove(Modifier::Protected);
        constructor.modifiers.insert(Modifier::Private);

        let mut leading = vec![
            Parameter::new(NAME_FIELD, string_type.clone()),
            Parameter::new(ORDINAL_FIELD, int_type.clone()),
        ];
        leading.append(&mut constructor.parameters);
        constructor.parameters = leading;

        let body = constructor.body.get_or_insert_with(|| block(Vec::new()));
        let statements = body.statements_mut();
        if leading_constructor_call(statements) == Some(ConstructorCallKind::This) {
            if let Some(call) = leading_constructor_call_mut(statements) {
                let mut arguments = vec![local(NAME_FIELD), local(ORDINAL_FIELD)];
                arguments.append(&mut call.arguments);
                call.arguments = arguments;
            }
        } else {
            let mut assignments = vec![
                assign(this_field(NAME_FIELD), local(NAME_FIELD)),
                assign(this_field(ORDINAL_FIELD), local(ORDINAL_FIELD)),
            ];
            assignments.append(statements);
            *statements = assignments;
        }
    }
}

fn add_enum_methods(
    class: &mut ClassNode,
    id: ClassId,
    table: &ClassTable,
    self_type: &ClassType,
    string_type: &ClassType,
    int_type: &ClassType,
) {
    let public = Modifiers::of(&[Modifier::Public]);
    let public_static = Modifiers::of(&[Modifier::Public, Modifier::Static]);
    let values = static_field(&class.name, Some(id), VALUES_FIELD);

    let mut methods = vec![
        MethodNode::new(
            "values",
            public_static,
            known_type(table, names::LIST),
            Vec::new(),
            Some(block(vec![ret(values.clone())])),
        ),
        MethodNode::new(
            "name",
            public,
            string_type.clone(),
            Vec::new(),
            Some(block(vec![ret(this_field(NAME_FIELD))])),
        ),
        MethodNode::new(
            "ordinal",
            public,
            int_type.clone(),
            Vec::new(),
            Some(block(vec![ret(this_field(ORDINAL_FIELD))])),
        ),
        MethodNode::new(
            "toString",
            public,
            string_type.clone(),
            Vec::new(),
            Some(block(vec![ret(this_field(NAME_FIELD))])),
        ),
    ];

    // for (constant in E.$VALUES) { if (constant.@$name == name) return constant }
    // throw new IllegalArgumentException("No enum constant E." + name)
    let matches = Expression::new(
        ExpressionKind::Binary(BinaryExpression {
            left: Box::new(Expression::field(local("constant"), NAME_FIELD)),
            operator: BinaryOperator::Equal,
            right: Box::new(local("name")),
        }),
        Span::default(),
    );
    let search = Statement::new(
        StatementKind::ForIn(ForInStatement {
            variable: Parameter::new("constant", self_type.clone()),
            collection: values,
            body: Box::new(block(vec![Statement::new(
                StatementKind::If(IfStatement {
                    condition: matches,
                    then_branch: Box::new(ret(local("constant"))),
                    else_branch: None,
                }),
                Span::default(),
            )])),
        }),
        Span::default(),
    );
    let message = Expression::new(
        ExpressionKind::Binary(BinaryExpression {
            left: Box::new(string(&format!("No enum constant {}.", class.name))),
            operator: BinaryOperator::Add,
            right: Box::new(local("name")),
        }),
        Span::default(),
    );
    let failure = Statement::new(
        StatementKind::Throw(new_instance(
            known_type(table, classpath::ILLEGAL_ARGUMENT),
            vec![message],
        )),
        Span::default(),
    );
    methods.push(MethodNode::new(
        "valueOf",
        public_static,
        self_type.clone(),
        vec![Parameter::new("name", string_type.clone())],
        Some(block(vec![search, failure])),
    ));

    for method in methods {
        if !class.has_declared_method(&method.name, method.parameters.len()) {
            class.add_method(method.synthetic());
        }
    }
}
