use grove_parser::*;

const BANK: &str = r#"
package bank

import grove.util.List

interface Account {
    BigDecimal balance()
}

abstract class BaseAccount implements Account {
    String owner
    protected List history = []

    BaseAccount(String owner) {
        this.owner = owner
    }

    def deposit(amount, String note = 'deposit') {
        if (amount <= 0) {
            throw new IllegalArgumentException("Invalid amount: $amount")
        }
        history.add([amount: amount, note: note])
        return this
    }

    abstract String kind()
}

class Savings extends BaseAccount {
    double rate = 0.5

    Savings(String owner) { super(owner) }

    String kind() { 'savings' }

    def total() {
        def sum = 0
        for (entry in history) {
            sum += entry.amount
        }
        sum * (1 + rate)
    }
}

enum Level { LOW, HIGH }
"#;

#[test]
fn parses_a_multi_class_module() {
    let output = parse_module(BANK, "bank/Accounts.grove").expect("module should parse");
    assert!(output.errors.is_empty(), "{:?}", output.errors);
    let module = output.module;
    assert!(!module.is_script());

    let names: Vec<&str> = module.classes.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["bank.Account", "bank.BaseAccount", "bank.Savings", "bank.Level"]
    );

    let base = &module.classes[1];
    assert!(base.modifiers.is_abstract());
    assert_eq!(base.properties.len(), 1);
    assert_eq!(base.fields.len(), 2);
    let deposit = base.methods_named("deposit").next().unwrap();
    assert_eq!(deposit.parameters.len(), 2);
    assert!(deposit.parameters[1].initial_expression.is_some());

    let savings = &module.classes[2];
    let constructor = &savings.constructors[0];
    let body = constructor.body.as_ref().unwrap();
    let StatementKind::Expression(first) = &body.statements()[0].kind else {
        panic!("expected super call");
    };
    let ExpressionKind::ConstructorCall(call) = &first.kind else {
        panic!("expected constructor call, got {:?}", first.kind);
    };
    assert_eq!(call.kind, ConstructorCallKind::Super);
}

#[test]
fn cst_is_owned_and_positioned() {
    let plugin = GroveParserPlugin;
    let cst = plugin.parse_cst("x = 1\ny = 2", "t.grove").unwrap();
    assert_eq!(cst.root.rule, Rule::compilation_unit);
    let statements: Vec<&CstNode> = cst.root.children_of(Rule::statement).collect();
    assert_eq!(statements.len(), 2);
    assert_eq!(cst.lines.line_col(statements[1].start), (2, 1));
    assert_eq!(statements[1].text("x = 1\ny = 2"), "y = 2");
}

#[test]
fn syntax_errors_stop_before_conversion() {
    let plugin = GroveParserPlugin;
    let error = plugin.parse_cst("class {", "bad.grove").unwrap_err();
    assert!(matches!(error, ParseError::Syntax { .. }));
}
