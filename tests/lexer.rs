use luna::{
    diagnostics::DiagnosticKind,
    lexer::{tokenize, Keyword, Token, TokenKind},
};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
        .expect("tokenize should succeed")
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

fn lexemes(tokens: &[Token]) -> Vec<&str> {
    tokens.iter().map(|token| token.lexeme.as_str()).collect()
}

#[test]
fn stream_ends_with_single_eof_at_end_of_input() {
    let source = "x: var = 1\ny";
    let tokens = tokenize(source).expect("tokenize should succeed");
    let eof_count = tokens
        .iter()
        .filter(|token| token.kind == TokenKind::Eof)
        .count();
    assert_eq!(eof_count, 1);
    let last = tokens.last().expect("at least one token");
    assert_eq!(last.kind, TokenKind::Eof);
    assert_eq!(last.position.offset, source.len());
    assert_eq!(last.position.line, 1);
    assert_eq!(last.position.column, 1);
}

#[test]
fn empty_source_is_just_eof() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
}

#[test]
fn second_dot_ends_number_literal() {
    let tokens = tokenize("1.2.3").expect("tokenize should succeed");
    assert_eq!(tokens[0].kind, TokenKind::Float);
    assert_eq!(tokens[0].lexeme, "1.2");
    assert_eq!(tokens[1].kind, TokenKind::Dot);
    assert_eq!(tokens[2].kind, TokenKind::Int);
    assert_eq!(tokens[2].lexeme, "3");
    assert_eq!(tokens[3].kind, TokenKind::Eof);
}

#[test]
fn operators_are_maximal_munch() {
    assert_eq!(
        kinds("1<=2"),
        vec![
            TokenKind::Int,
            TokenKind::LessEqual,
            TokenKind::Int,
            TokenKind::Eof
        ]
    );
    let tokens = tokenize("a ** b ^ c").expect("tokenize should succeed");
    assert_eq!(lexemes(&tokens), vec!["a", "**", "b", "^", "c", ""]);
    assert_eq!(tokens[1].kind, TokenKind::BinaryOperator);
    assert_eq!(tokens[3].kind, TokenKind::BinaryOperator);
}

#[test]
fn compound_and_update_operators() {
    assert_eq!(
        kinds("x += 1; y--"),
        vec![
            TokenKind::Identifier,
            TokenKind::PlusAssign,
            TokenKind::Int,
            TokenKind::Semicolon,
            TokenKind::Identifier,
            TokenKind::Decrement,
            TokenKind::Eof
        ]
    );
    assert_eq!(
        kinds("a && b || !c"),
        vec![
            TokenKind::Identifier,
            TokenKind::DoubleAmpersand,
            TokenKind::Identifier,
            TokenKind::DoublePipe,
            TokenKind::Bang,
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );
}

#[test]
fn keywords_are_reclassified() {
    assert_eq!(
        kinds("fn lambda typeof undef out value"),
        vec![
            TokenKind::Keyword(Keyword::Fn),
            TokenKind::Keyword(Keyword::Lambda),
            TokenKind::Keyword(Keyword::Typeof),
            TokenKind::Keyword(Keyword::Undef),
            TokenKind::Keyword(Keyword::Out),
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );
}

#[test]
fn strings_process_escapes_with_either_quote() {
    let tokens = tokenize(r#""a\tb\n" 'it\'s' "\q""#).expect("tokenize should succeed");
    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].lexeme, "a\tb\n");
    assert_eq!(tokens[1].lexeme, "it's");
    assert_eq!(tokens[2].lexeme, "q");
}

#[test]
fn unterminated_string_is_a_lexer_error() {
    let err = tokenize("x = \"open").expect_err("should fail");
    assert_eq!(err.kind, DiagnosticKind::Lexer);
    assert_eq!(err.message, "unterminated string");
    let position = err.position.expect("position recorded");
    assert_eq!(position.column, 4);
}

#[test]
fn unexpected_character_reports_position() {
    let err = tokenize("x\n  @").expect_err("should fail");
    assert_eq!(err.kind, DiagnosticKind::Lexer);
    assert!(err.message.contains('@'));
    let position = err.position.expect("position recorded");
    assert_eq!((position.line, position.column), (1, 2));
}

#[test]
fn comments_are_skipped_but_newlines_kept() {
    assert_eq!(
        kinds("a # trailing words\nb"),
        vec![
            TokenKind::Identifier,
            TokenKind::Newline,
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );
}

#[test]
fn positions_track_lines_and_offsets() {
    let tokens = tokenize("one\n  two").expect("tokenize should succeed");
    let two = &tokens[2];
    assert_eq!(two.lexeme, "two");
    assert_eq!(two.position.line, 1);
    assert_eq!(two.position.column, 2);
    assert_eq!(two.position.offset, 6);
}
