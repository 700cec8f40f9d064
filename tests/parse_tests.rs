use urq::ast::*;
use urq::{
    parse, parse_with_options, reconstruct_text, tokenize, DiagnosticKind, ParseOptions, ParseOutput,
    SubstitutionPolicy, Token,
};

fn parse_ok(source: &str) -> ParseOutput {
    parse(source).expect("no fatal error")
}

#[test]
fn test_small_quest() {
    let source = "\
:start
; the entrance
cls
pln You stand at a door, #name$.
btn cellar, Go down
btn quit_game, Leave
end

:cellar
p It is dark. [[Light a match|matches = matches - 1 & goto lit]]
if matches > 0 then pln You have #matches$ matches. else pln No matches left.
end
";
    let output = parse_ok(source);
    assert!(!output.has_errors(), "{:?}", output.diagnostics);
    assert_eq!(output.program.label_line("start"), Some(1));
    assert_eq!(output.program.label_line("Cellar"), Some(9));
    assert_eq!(output.program.label_line("missing"), None);

    let buttons: Vec<&str> = output
        .program
        .statements()
        .filter_map(|s| match s {
            Statement::Button { label, .. } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(buttons, vec!["Go down", "Leave"]);
}

#[test]
fn test_link_with_goto_action() {
    let output = parse_ok("p [[Go north|goto north]]");
    assert_eq!(
        output.program.groups[0].statements[0],
        Statement::Print {
            segments: vec![TextSegment::Link {
                label: "Go north".into(),
                action: StatementGroup::goto("north", 1),
            }],
            newline: false,
        }
    );
}

#[test]
fn test_broken_branch_never_runs_unconditionally() {
    let output = parse_ok("if a then x = = 1 & goto b");
    assert_eq!(output.diagnostics.len(), 1);
    assert!(output.program.groups.is_empty());

    let output = parse_ok("p [[Go|if a then x = = 1 & goto b]]\nend");
    assert!(output.has_errors());
    assert_eq!(output.program.groups.len(), 1);
    assert_eq!(output.program.groups[0].statements, vec![Statement::End]);
}

#[test]
fn test_inv_is_a_variable_inside_expressions() {
    let output = parse_ok("x = inv-1");
    assert!(!output.has_errors(), "{:?}", output.diagnostics);
    assert_eq!(
        output.program.groups[0].statements[0],
        Statement::Assign {
            name: "x".into(),
            value: Expr::Number(NumberExpr::Binary {
                op: ArithmeticOperator::Subtract,
                left: Box::new(NumberExpr::Var("inv".into())),
                right: Box::new(NumberExpr::Const(1.0)),
            }),
        }
    );
}

#[test]
fn test_link_with_conditional_action() {
    let output = parse_ok("p [[Go|if a=1 then goto b else goto c]]");
    assert!(!output.has_errors(), "{:?}", output.diagnostics);
    let action = match &output.program.groups[0].statements[0] {
        Statement::Print { segments, .. } => match &segments[0] {
            TextSegment::Link { action, .. } => action.clone(),
            other => panic!("Expected Link, got {:?}", other),
        },
        other => panic!("Expected Print, got {:?}", other),
    };
    assert_eq!(
        action.statements,
        vec![Statement::If {
            condition: BoolExpr::CompareNumbers {
                op: CompareOperator::Equal,
                left: NumberExpr::Var("a".into()),
                right: NumberExpr::Const(1.0),
            },
            then_group: StatementGroup::goto("b", 1),
            else_group: Some(StatementGroup::goto("c", 1)),
        }]
    );
}

#[test]
fn test_print_stops_at_ampersand_outside_links() {
    let output = parse_ok("pln Take [[it & run|goto out]] now & end");
    let statements = &output.program.groups[0].statements;
    assert_eq!(statements.len(), 2);
    match &statements[0] {
        Statement::Print { segments, newline: true } => {
            assert_eq!(segments.len(), 3);
            assert_eq!(segments[2], TextSegment::Literal(" now".into()));
        }
        other => panic!("Expected Print, got {:?}", other),
    }
    assert_eq!(statements[1], Statement::End);
}

#[test]
fn test_substitutions_in_print() {
    let output = parse_ok("pln Hi #name$##38$#$#/$");
    assert_eq!(
        output.program.groups[0].statements[0],
        Statement::Print {
            segments: vec![
                TextSegment::Literal("Hi ".into()),
                TextSegment::Variable("name".into()),
                TextSegment::Literal("& \n".into()),
            ],
            newline: true,
        }
    );
}

#[test]
fn test_bad_char_code_aborts() {
    let abort = parse("pln ok\npln ##abc$\npln after").unwrap_err();
    assert_eq!(abort.cause.kind, DiagnosticKind::SubstitutionError);
    assert_eq!((abort.cause.line, abort.cause.column), (2, 5));
    assert!(abort.diagnostics.is_empty());
}

#[test]
fn test_bad_char_code_drops_statement() {
    let options = ParseOptions::new().with_substitution_policy(SubstitutionPolicy::DropStatement);
    let output = parse_with_options("pln ##abc$ & goto a\npln after", &options).unwrap();
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].kind, DiagnosticKind::SubstitutionError);
    let statements: Vec<&Statement> = output.program.statements().collect();
    assert_eq!(statements.len(), 2);
    assert_eq!(*statements[0], Statement::Goto { target: "a".into() });
}

#[test]
fn test_diagnostics_are_ordered_by_position() {
    let output = parse_ok("x = ?\ny = = 1\nz = 1 @");
    let positions: Vec<(usize, DiagnosticKind)> =
        output.diagnostics.iter().map(|d| (d.line, d.kind)).collect();
    assert_eq!(
        positions,
        vec![
            (1, DiagnosticKind::LexError),
            (1, DiagnosticKind::SyntaxError),
            (2, DiagnosticKind::SyntaxError),
            (3, DiagnosticKind::LexError),
        ]
    );
}

#[test]
fn test_tokenize_reports_positions() {
    let (tokens, errors) = tokenize("a = 1\n  goto b");
    assert!(errors.is_empty());
    let goto = tokens.iter().find(|t| matches!(t.token, Token::Goto(_))).unwrap();
    assert_eq!((goto.line, goto.column), (2, 3));
    assert_eq!(goto.lexeme, "goto b");
}

#[test]
fn test_reconstructed_text_parses_to_same_segments() {
    let source = "pln Gold: #gold$ ##38$ more ##35$1 [[Shop|shop_2]] [[Back]]";
    let segments = match &parse_ok(source).program.groups[0].statements[0] {
        Statement::Print { segments, .. } => segments.clone(),
        other => panic!("Expected Print, got {:?}", other),
    };
    let text = reconstruct_text(&segments).expect("reconstructible");
    match &parse_ok(&format!("pln {}", text)).program.groups[0].statements[0] {
        Statement::Print { segments: again, .. } => assert_eq!(again, &segments),
        other => panic!("Expected Print, got {:?}", other),
    }
}

#[test]
fn test_serializes_to_json() {
    let output = parse_ok("goto north");
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["program"]["groups"][0]["line"], 1);
    assert_eq!(
        json["program"]["groups"][0]["statements"][0]["Goto"]["target"],
        "north"
    );
    assert_eq!(json["diagnostics"], serde_json::json!([]));
}
