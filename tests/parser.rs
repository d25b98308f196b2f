use luna::{
    ast::{BinaryOp, DeclKind, Expr, ExprKind, Literal, Program, Property, StmtKind, UnaryOp},
    diagnostics::DiagnosticKind,
    parser::parse_source,
};

fn parse(source: &str) -> Program {
    parse_source(source).expect("parse should succeed")
}

fn single_expr(source: &str) -> Expr {
    let program = parse(source);
    assert_eq!(program.body.len(), 1, "expected exactly one statement");
    match &program.body[0].kind {
        StmtKind::Expr(expr) => expr.clone(),
        other => panic!("expected expression statement, found {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = single_expr("1 + 2 * 3");
    let ExprKind::Binary { op, left, right } = expr.kind else {
        panic!("expected binary expression");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(left.kind, ExprKind::Literal(Literal::Number(n)) if n == 1.0));
    assert!(matches!(
        right.kind,
        ExprKind::Binary {
            op: BinaryOp::Mul,
            ..
        }
    ));
}

#[test]
fn ternary_is_right_associative() {
    let expr = single_expr("true ? 1 : false ? 2 : 3");
    let ExprKind::Ternary { alternate, .. } = expr.kind else {
        panic!("expected ternary");
    };
    assert!(matches!(alternate.kind, ExprKind::Ternary { .. }));
}

#[test]
fn declaration_forms_carry_their_kind() {
    for (source, expected) in [
        ("x: const = 1", DeclKind::Const),
        ("x: var = (1)", DeclKind::Var),
        ("x: out = 1", DeclKind::Out),
    ] {
        match single_expr(source).kind {
            ExprKind::Declare { kind, name, .. } => {
                assert_eq!(kind, expected);
                assert_eq!(name, "x");
            }
            other => panic!("expected declaration for {source}, found {other:?}"),
        }
    }
}

#[test]
fn compound_assignment_desugars_to_binary() {
    let expr = single_expr("total += 2");
    let ExprKind::Assign { target, value } = expr.kind else {
        panic!("expected assignment");
    };
    assert!(matches!(&target.kind, ExprKind::Identifier(name) if name == "total"));
    assert!(matches!(
        value.kind,
        ExprKind::Binary {
            op: BinaryOp::Add,
            ..
        }
    ));
}

#[test]
fn postfix_update_wraps_identifier() {
    let expr = single_expr("count++");
    assert!(matches!(
        expr.kind,
        ExprKind::Unary {
            op: UnaryOp::PostIncrement,
            ..
        }
    ));
}

#[test]
fn member_chains_mix_dots_and_brackets() {
    let expr = single_expr("data.items[0].name");
    let ExprKind::Member { object, property } = expr.kind else {
        panic!("expected member access");
    };
    assert!(matches!(&property, Property::Named(name) if name == "name"));
    let ExprKind::Member { property, .. } = &object.kind else {
        panic!("expected computed member");
    };
    assert!(matches!(property, Property::Computed(_)));
}

#[test]
fn named_function_with_bare_default_parameter() {
    let expr = single_expr("fn f a b=(10) { return a + b }");
    let ExprKind::Function(decl) = expr.kind else {
        panic!("expected function");
    };
    assert_eq!(decl.name.as_deref(), Some("f"));
    assert_eq!(decl.params.len(), 2);
    assert!(decl.params[0].default.is_none());
    assert!(decl.params[1].default.is_some());
    assert_eq!(decl.body.len(), 1);
    assert!(!decl.exported);
}

#[test]
fn parenthesized_parameters_are_accepted() {
    let expr = single_expr("fn f(a, b = 2) { return a * b }");
    let ExprKind::Function(decl) = expr.kind else {
        panic!("expected function");
    };
    let names: Vec<&str> = decl.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(decl.params[1].default.is_some());
}

#[test]
fn arrow_body_becomes_return() {
    let expr = single_expr("lambda x : x * 2");
    let ExprKind::Function(decl) = expr.kind else {
        panic!("expected function");
    };
    assert!(decl.name.is_none());
    assert!(matches!(decl.body[0].kind, StmtKind::Return(Some(_))));
}

#[test]
fn immediately_invoked_form_is_a_call() {
    let expr = single_expr("fn:: 40 + 2");
    let ExprKind::Call { callee, args } = expr.kind else {
        panic!("expected call");
    };
    assert!(args.is_empty());
    assert!(matches!(callee.kind, ExprKind::Function(_)));
}

#[test]
fn exported_function_statement() {
    let expr = single_expr("out fn greet { return 1 }");
    let ExprKind::Function(decl) = expr.kind else {
        panic!("expected function");
    };
    assert!(decl.exported);
}

#[test]
fn object_literal_supports_shorthand_and_newlines() {
    let expr = single_expr("{\n  x,\n  \"y\": 2,\n}");
    let ExprKind::Object(properties) = expr.kind else {
        panic!("expected object literal");
    };
    assert_eq!(properties.len(), 2);
    assert_eq!(properties[0].0, "x");
    assert!(matches!(&properties[0].1.kind, ExprKind::Identifier(name) if name == "x"));
    assert_eq!(properties[1].0, "y");
}

#[test]
fn else_may_follow_a_newline_and_chain() {
    let program = parse("if a {\n  1\n}\nelse if b {\n  2\n} else: 3");
    assert_eq!(program.body.len(), 1);
    let StmtKind::If { alternate, .. } = &program.body[0].kind else {
        panic!("expected if statement");
    };
    let StmtKind::If { alternate, .. } = &alternate[0].kind else {
        panic!("expected else-if");
    };
    assert_eq!(alternate.len(), 1);
}

#[test]
fn colon_bodies_for_if_and_while() {
    let program = parse("if ready: go()\nwhile busy: wait()");
    assert_eq!(program.body.len(), 2);
    assert!(matches!(program.body[0].kind, StmtKind::If { .. }));
    assert!(matches!(program.body[1].kind, StmtKind::While { .. }));
}

#[test]
fn for_loop_has_three_clauses() {
    let program = parse("for i: var = 0; i < 3; i++ { debug i }");
    let StmtKind::For { init, body, .. } = &program.body[0].kind else {
        panic!("expected for loop");
    };
    assert!(matches!(init.kind, ExprKind::Declare { .. }));
    assert!(matches!(body[0].kind, StmtKind::Debug(ref values) if values.len() == 1));
}

#[test]
fn statements_split_on_newlines_and_semicolons() {
    let program = parse("a; b\n\nc;");
    assert_eq!(program.body.len(), 3);
}

#[test]
fn debug_and_use_statements() {
    let program = parse("debug {1, two}\nuse \"lib/math\"");
    assert!(matches!(&program.body[0].kind, StmtKind::Debug(values) if values.len() == 2));
    assert!(matches!(&program.body[1].kind, StmtKind::Use(path) if path == "lib/math"));
}

#[test]
fn missing_for_separator_reports_position_and_caret() {
    let err = parse_source("for i: var = 0; i < 3 { }").expect_err("should fail");
    assert_eq!(err.kind, DiagnosticKind::Parser);
    assert!(err.message.contains("expected `;` after for condition"));
    let position = err.position.expect("position recorded");
    assert_eq!(position.column, 22);
    let snippet = err.snippet.expect("snippet rendered");
    assert!(snippet.ends_with(&format!("{}^", " ".repeat(22))));
}

#[test]
fn unclosed_group_reports_end_of_input() {
    let err = parse_source("(1 + 2").expect_err("should fail");
    assert_eq!(err.kind, DiagnosticKind::Parser);
    assert!(err.message.contains("end of input"));
}

#[test]
fn declaring_a_member_is_rejected() {
    let err = parse_source("a.b: var = 1").expect_err("should fail");
    assert!(err.message.contains("invalid declaration target"));
    assert_eq!(err.notes.len(), 1);
    assert!(err.to_string().contains("note: only a plain name can be declared"));
}
