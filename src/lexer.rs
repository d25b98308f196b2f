use std::{iter::Peekable, str::CharIndices};

use crate::diagnostics::{Diagnostic, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Fn,
    Lambda,
    If,
    Else,
    Return,
    Typeof,
    For,
    While,
    Debug,
    Use,
    Out,
    True,
    False,
    Undef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    String,
    Int,
    Float,
    Keyword(Keyword),
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Question,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    EqualEqual,
    BangEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    DoubleAmpersand,
    DoublePipe,
    Bang,
    Increment,
    Decrement,
    /// Any other operator string (`+ - * / % ** ^` ...); the lexeme carries the raw text.
    BinaryOperator,
    Newline,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
        }
    }

    /// Width of the token in characters, used for caret rendering.
    pub fn width(&self) -> usize {
        self.lexeme.chars().count().max(1)
    }

    /// True for a `BinaryOperator` token whose raw text is `op`.
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::BinaryOperator && self.lexeme == op
    }
}

const OPERATOR_CHARS: &str = "+-*/%=<>!&|^";

const TWO_CHAR_OPERATORS: [&str; 13] = [
    "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=", "**",
];

/// Tokenizes `source` into a stream terminated by exactly one `Eof` token.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Diagnostic> {
    Lexer::new(source).tokenize()
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 0,
            column: 0,
        }
    }

    fn position(&mut self) -> Position {
        let offset = self
            .chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.source.len());
        Position::new(self.line, self.column, offset)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn collect_while<F>(&mut self, mut predicate: F) -> String
    where
        F: FnMut(char) -> bool,
    {
        let mut collected = String::new();
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            collected.push(ch);
            self.bump();
        }
        collected
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn identifier_or_keyword(&mut self, position: Position) -> Token {
        let lexeme = self.collect_while(|ch| ch.is_alphanumeric() || ch == '_');
        let kind = keyword_for(&lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, lexeme, position)
    }

    fn number_literal(&mut self, position: Position) -> Token {
        let mut seen_dot = false;
        let lexeme = self.collect_while(|ch| match ch {
            '0'..='9' => true,
            '.' if !seen_dot => {
                seen_dot = true;
                true
            }
            _ => false,
        });
        let kind = if seen_dot {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        Token::new(kind, lexeme, position)
    }

    fn string_literal(&mut self, quote: char, position: Position) -> Result<Token, Diagnostic> {
        self.bump();
        let mut value = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                '\\' => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(other) => value.push(other),
                    None => break,
                },
                c if c == quote => return Ok(Token::new(TokenKind::String, value, position)),
                c => value.push(c),
            }
        }
        Err(Diagnostic::lexer("unterminated string").with_position(position))
    }

    fn operator(&mut self, position: Position) -> Token {
        let mut op = String::new();
        while let Some(ch) = self.peek() {
            if !OPERATOR_CHARS.contains(ch) {
                break;
            }
            self.bump();
            op.push(ch);
            if op.len() >= 2 && TWO_CHAR_OPERATORS.contains(&op.as_str()) {
                break;
            }
        }
        Token::new(operator_kind(&op), op, position)
    }

    fn simple_token(&mut self, kind: TokenKind, position: Position) -> Token {
        let lexeme = self.bump().map(String::from).unwrap_or_default();
        Token::new(kind, lexeme, position)
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Diagnostic> {
        let mut tokens = Vec::new();
        loop {
            let position = self.position();
            let Some(ch) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", position));
                break;
            };

            let token = match ch {
                '\n' => self.simple_token(TokenKind::Newline, position),
                c if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                '#' => {
                    self.skip_comment();
                    continue;
                }
                '"' | '\'' => self.string_literal(ch, position)?,
                c if c.is_ascii_digit() => self.number_literal(position),
                c if c.is_alphabetic() || c == '_' => self.identifier_or_keyword(position),
                '(' => self.simple_token(TokenKind::LParen, position),
                ')' => self.simple_token(TokenKind::RParen, position),
                '{' => self.simple_token(TokenKind::LBrace, position),
                '}' => self.simple_token(TokenKind::RBrace, position),
                '[' => self.simple_token(TokenKind::LBracket, position),
                ']' => self.simple_token(TokenKind::RBracket, position),
                ',' => self.simple_token(TokenKind::Comma, position),
                '.' => self.simple_token(TokenKind::Dot, position),
                ':' => self.simple_token(TokenKind::Colon, position),
                ';' => self.simple_token(TokenKind::Semicolon, position),
                '?' => self.simple_token(TokenKind::Question, position),
                c if OPERATOR_CHARS.contains(c) => self.operator(position),
                other => {
                    return Err(
                        Diagnostic::lexer(format!("unexpected character `{other}`"))
                            .with_position(position),
                    );
                }
            };
            tokens.push(token);
        }
        Ok(tokens)
    }
}

fn operator_kind(op: &str) -> TokenKind {
    match op {
        "=" => TokenKind::Assign,
        "==" => TokenKind::EqualEqual,
        "!=" => TokenKind::BangEqual,
        "<" => TokenKind::Less,
        ">" => TokenKind::Greater,
        "<=" => TokenKind::LessEqual,
        ">=" => TokenKind::GreaterEqual,
        "&&" => TokenKind::DoubleAmpersand,
        "||" => TokenKind::DoublePipe,
        "!" => TokenKind::Bang,
        "++" => TokenKind::Increment,
        "--" => TokenKind::Decrement,
        "+=" => TokenKind::PlusAssign,
        "-=" => TokenKind::MinusAssign,
        "*=" => TokenKind::StarAssign,
        "/=" => TokenKind::SlashAssign,
        _ => TokenKind::BinaryOperator,
    }
}

fn keyword_for(ident: &str) -> Option<TokenKind> {
    use self::Keyword as Kw;
    let keyword = match ident {
        "fn" => Kw::Fn,
        "lambda" => Kw::Lambda,
        "if" => Kw::If,
        "else" => Kw::Else,
        "return" => Kw::Return,
        "typeof" => Kw::Typeof,
        "for" => Kw::For,
        "while" => Kw::While,
        "debug" => Kw::Debug,
        "use" => Kw::Use,
        "out" => Kw::Out,
        "true" => Kw::True,
        "false" => Kw::False,
        "undef" => Kw::Undef,
        _ => return None,
    };
    Some(TokenKind::Keyword(keyword))
}
