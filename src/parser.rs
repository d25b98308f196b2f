use std::rc::Rc;

use crate::{
    ast::{
        BinaryOp, ComparisonOp, DeclKind, EqualityOp, Expr, ExprKind, FunctionDecl, Literal,
        LogicalOp, Param, Program, Property, Stmt, StmtKind, UnaryOp,
    },
    diagnostics::{Diagnostic, Position},
    lexer::{tokenize, Keyword, Token, TokenKind},
};

/// Parses a token stream produced by [`tokenize`].
pub fn parse(tokens: Vec<Token>) -> Result<Program, Diagnostic> {
    Parser::new(tokens).parse_program()
}

/// Tokenizes and parses `source`, attaching a caret snippet to any error.
pub fn parse_source(source: &str) -> Result<Program, Diagnostic> {
    let tokens = tokenize(source).map_err(|diag| diag.with_source(source))?;
    parse(tokens).map_err(|diag| diag.with_source(source))
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", position));
        }
        Self { tokens, current: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, Diagnostic> {
        let mut body = Vec::new();
        self.skip_separators();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
            self.skip_separators();
        }
        Ok(Program { body })
    }

    fn parse_statement(&mut self) -> Result<Stmt, Diagnostic> {
        let stmt = match self.peek().kind {
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Return) => self.parse_return()?,
            TokenKind::Keyword(Keyword::Debug) => self.parse_debug()?,
            TokenKind::Keyword(Keyword::Use) => self.parse_use()?,
            TokenKind::Keyword(Keyword::Out) => self.parse_exported_function()?,
            _ => {
                let expr = self.parse_expression()?;
                let position = expr.position;
                Stmt::new(StmtKind::Expr(expr), position)
            }
        };
        let _ = self.matches(TokenKind::Semicolon);
        Ok(stmt)
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, Diagnostic> {
        self.consume(TokenKind::LBrace, "expected `{` to start block")?;
        let mut items = Vec::new();
        self.skip_separators();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            items.push(self.parse_statement()?);
            self.skip_separators();
        }
        self.consume(TokenKind::RBrace, "expected `}` to close block")?;
        Ok(items)
    }

    /// `{ ... }` or the single-statement `: stmt` form.
    fn parse_body(&mut self, context: &str) -> Result<Vec<Stmt>, Diagnostic> {
        if self.check(TokenKind::LBrace) {
            return self.parse_block();
        }
        if self.matches(TokenKind::Colon) {
            return Ok(vec![self.parse_statement()?]);
        }
        Err(self.error(
            self.peek(),
            format!("expected `{{` or `:` after {context}"),
        ))
    }

    fn parse_if(&mut self) -> Result<Stmt, Diagnostic> {
        let keyword = self.advance();
        let test = self.parse_expression()?;
        let consequent = self.parse_body("if condition")?;
        let alternate = if self.matches_else() {
            if self.check(TokenKind::Keyword(Keyword::If)) {
                vec![self.parse_if()?]
            } else if self.check(TokenKind::LBrace) {
                self.parse_block()?
            } else {
                let _ = self.matches(TokenKind::Colon);
                vec![self.parse_statement()?]
            }
        } else {
            Vec::new()
        };
        Ok(Stmt::new(
            StmtKind::If {
                test,
                consequent,
                alternate,
            },
            keyword.position,
        ))
    }

    fn parse_while(&mut self) -> Result<Stmt, Diagnostic> {
        let keyword = self.advance();
        let test = self.parse_expression()?;
        let body = self.parse_body("while condition")?;
        Ok(Stmt::new(StmtKind::While { test, body }, keyword.position))
    }

    fn parse_for(&mut self) -> Result<Stmt, Diagnostic> {
        let keyword = self.advance();
        let init = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "expected `;` after for initializer")?;
        let test = self.parse_expression()?;
        self.consume(TokenKind::Semicolon, "expected `;` after for condition")?;
        let update = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::new(
            StmtKind::For {
                init,
                test,
                update,
                body,
            },
            keyword.position,
        ))
    }

    fn parse_return(&mut self) -> Result<Stmt, Diagnostic> {
        let keyword = self.advance();
        let value = match self.peek().kind {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => None,
            _ => Some(self.parse_expression()?),
        };
        Ok(Stmt::new(StmtKind::Return(value), keyword.position))
    }

    fn parse_debug(&mut self) -> Result<Stmt, Diagnostic> {
        let keyword = self.advance();
        let values = if self.matches(TokenKind::LBrace) {
            let values = self.parse_list(TokenKind::RBrace)?;
            self.consume(TokenKind::RBrace, "expected `}` after debug values")?;
            values
        } else {
            vec![self.parse_expression()?]
        };
        Ok(Stmt::new(StmtKind::Debug(values), keyword.position))
    }

    fn parse_use(&mut self) -> Result<Stmt, Diagnostic> {
        let keyword = self.advance();
        let path = self.consume(TokenKind::String, "expected string path after `use`")?;
        Ok(Stmt::new(StmtKind::Use(path.lexeme), keyword.position))
    }

    fn parse_exported_function(&mut self) -> Result<Stmt, Diagnostic> {
        let keyword = self.advance();
        if !self.check(TokenKind::Keyword(Keyword::Fn)) {
            return Err(self.error(self.peek(), "expected `fn` after `out`"));
        }
        let function = self.parse_function(true)?;
        Ok(Stmt::new(StmtKind::Expr(function), keyword.position))
    }

    pub fn parse_expression(&mut self) -> Result<Expr, Diagnostic> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, Diagnostic> {
        let target = self.parse_ternary()?;
        let position = target.position;

        if self.matches(TokenKind::Assign) {
            let value = self.parse_assignment()?;
            return Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(value),
                },
                position,
            ));
        }

        if let Some(op) = self.compound_operator() {
            self.advance();
            let value = self.parse_assignment()?;
            let combined = Expr::new(
                ExprKind::Binary {
                    op,
                    left: Box::new(target.clone()),
                    right: Box::new(value),
                },
                position,
            );
            return Ok(Expr::new(
                ExprKind::Assign {
                    target: Box::new(target),
                    value: Box::new(combined),
                },
                position,
            ));
        }

        if let Some(kind) = self.declaration_ahead() {
            let ExprKind::Identifier(name) = &target.kind else {
                return Err(Diagnostic::parser("invalid declaration target")
                    .with_position(position)
                    .with_note("only a plain name can be declared, e.g. `x: var = 1`"));
            };
            let name = name.clone();
            // `:`, the declaration kind, `=`
            self.advance();
            self.advance();
            self.advance();
            let value = self.parse_assignment()?;
            return Ok(Expr::new(
                ExprKind::Declare {
                    kind,
                    name,
                    value: Box::new(value),
                },
                position,
            ));
        }

        Ok(target)
    }

    fn compound_operator(&self) -> Option<BinaryOp> {
        match self.peek().kind {
            TokenKind::PlusAssign => Some(BinaryOp::Add),
            TokenKind::MinusAssign => Some(BinaryOp::Sub),
            TokenKind::StarAssign => Some(BinaryOp::Mul),
            TokenKind::SlashAssign => Some(BinaryOp::Div),
            _ => None,
        }
    }

    /// Recognises `: const =`, `: var =` and `: out =` without consuming them.
    fn declaration_ahead(&self) -> Option<DeclKind> {
        if !self.check(TokenKind::Colon) {
            return None;
        }
        let action = self.tokens.get(self.current + 1)?;
        let assign = self.tokens.get(self.current + 2)?;
        if assign.kind != TokenKind::Assign {
            return None;
        }
        match (&action.kind, action.lexeme.as_str()) {
            (TokenKind::Identifier, "const") => Some(DeclKind::Const),
            (TokenKind::Identifier, "var") => Some(DeclKind::Var),
            (TokenKind::Keyword(Keyword::Out), _) => Some(DeclKind::Out),
            _ => None,
        }
    }

    fn parse_ternary(&mut self) -> Result<Expr, Diagnostic> {
        let condition = self.parse_logical()?;
        if !self.matches(TokenKind::Question) {
            return Ok(condition);
        }
        // The consequent stops at logical level so it cannot swallow the `:`.
        let consequent = self.parse_logical()?;
        self.consume(TokenKind::Colon, "expected `:` in ternary expression")?;
        let alternate = self.parse_ternary()?;
        let position = condition.position;
        Ok(Expr::new(
            ExprKind::Ternary {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            position,
        ))
    }

    fn parse_logical(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_equality()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::DoubleAmpersand => LogicalOp::And,
                TokenKind::DoublePipe => LogicalOp::Or,
                _ => break,
            };
            self.advance();
            let right = self.parse_equality()?;
            let position = expr.position;
            expr = Expr::new(
                ExprKind::Logical {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                position,
            );
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_comparison()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqualEqual => EqualityOp::Equal,
                TokenKind::BangEqual => EqualityOp::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            let position = expr.position;
            expr = Expr::new(
                ExprKind::Equality {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                position,
            );
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Less => ComparisonOp::Less,
                TokenKind::LessEqual => ComparisonOp::LessEqual,
                TokenKind::Greater => ComparisonOp::Greater,
                TokenKind::GreaterEqual => ComparisonOp::GreaterEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            let position = expr.position;
            expr = Expr::new(
                ExprKind::Comparison {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                },
                position,
            );
        }
        Ok(expr)
    }

    fn parse_additive(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_multiplicative()?;
        loop {
            let op = if self.peek().is_operator("+") {
                BinaryOp::Add
            } else if self.peek().is_operator("-") {
                BinaryOp::Sub
            } else {
                break;
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                token if token.is_operator("*") => BinaryOp::Mul,
                token if token.is_operator("/") => BinaryOp::Div,
                token if token.is_operator("%") => BinaryOp::Mod,
                token if token.is_operator("**") => BinaryOp::Pow,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            expr = binary(op, expr, right);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek();
        let prefix = match token.kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Increment => Some(UnaryOp::PreIncrement),
            TokenKind::Decrement => Some(UnaryOp::PreDecrement),
            _ if token.is_operator("+") => Some(UnaryOp::Plus),
            _ if token.is_operator("-") => Some(UnaryOp::Minus),
            _ => None,
        };
        if let Some(op) = prefix {
            let token = self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::new(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                token.position,
            ));
        }

        let expr = self.parse_call_member()?;
        let postfix = match self.peek().kind {
            TokenKind::Increment => UnaryOp::PostIncrement,
            TokenKind::Decrement => UnaryOp::PostDecrement,
            _ => return Ok(expr),
        };
        self.advance();
        let position = expr.position;
        Ok(Expr::new(
            ExprKind::Unary {
                op: postfix,
                operand: Box::new(expr),
            },
            position,
        ))
    }

    fn parse_call_member(&mut self) -> Result<Expr, Diagnostic> {
        let mut expr = self.parse_primary()?;
        loop {
            let position = expr.position;
            if self.matches(TokenKind::LParen) {
                let args = self.parse_list(TokenKind::RParen)?;
                self.consume(TokenKind::RParen, "expected `)` after arguments")?;
                expr = Expr::new(
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    position,
                );
            } else if self.matches(TokenKind::Dot) {
                let name = self.consume_property_name()?;
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        property: Property::Named(name),
                    },
                    position,
                );
            } else if self.matches(TokenKind::LBracket) {
                self.skip_newlines();
                let index = self.parse_expression()?;
                self.skip_newlines();
                self.consume(TokenKind::RBracket, "expected `]` after computed member")?;
                expr = Expr::new(
                    ExprKind::Member {
                        object: Box::new(expr),
                        property: Property::Computed(Box::new(index)),
                    },
                    position,
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, Diagnostic> {
        let token = self.peek().clone();
        let position = token.position;
        let kind = match &token.kind {
            TokenKind::Identifier => {
                self.advance();
                ExprKind::Identifier(token.lexeme)
            }
            TokenKind::Int | TokenKind::Float => {
                let value = token
                    .lexeme
                    .parse::<f64>()
                    .map_err(|_| self.error(&token, "invalid number literal"))?;
                self.advance();
                ExprKind::Literal(Literal::Number(value))
            }
            TokenKind::String => {
                self.advance();
                ExprKind::Literal(Literal::String(token.lexeme))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                ExprKind::Literal(Literal::Bool(true))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                ExprKind::Literal(Literal::Bool(false))
            }
            TokenKind::Keyword(Keyword::Undef) => {
                self.advance();
                ExprKind::Literal(Literal::Undefined)
            }
            TokenKind::Keyword(Keyword::Typeof) => {
                self.advance();
                let operand = self.parse_unary()?;
                ExprKind::Typeof(Box::new(operand))
            }
            TokenKind::Keyword(Keyword::Fn) | TokenKind::Keyword(Keyword::Lambda) => {
                return self.parse_function(false);
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let expr = self.parse_expression()?;
                self.skip_newlines();
                self.consume(TokenKind::RParen, "expected `)` after expression")?;
                return Ok(expr);
            }
            TokenKind::LBracket => {
                self.advance();
                let elements = self.parse_list(TokenKind::RBracket)?;
                self.consume(TokenKind::RBracket, "expected `]` after array elements")?;
                ExprKind::Array(elements)
            }
            TokenKind::LBrace => {
                self.advance();
                ExprKind::Object(self.parse_object_properties()?)
            }
            _ => return Err(self.unexpected(&token)),
        };
        Ok(Expr::new(kind, position))
    }

    fn parse_object_properties(&mut self) -> Result<Vec<(String, Expr)>, Diagnostic> {
        let mut properties = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::RBrace) {
            let key = match self.peek().kind {
                TokenKind::Identifier | TokenKind::String => self.advance(),
                _ => return Err(self.error(self.peek(), "expected property name")),
            };
            self.skip_newlines();
            let value = if self.matches(TokenKind::Colon) {
                self.skip_newlines();
                self.parse_expression()?
            } else if self.check(TokenKind::Comma) || self.check(TokenKind::RBrace) {
                Expr::new(ExprKind::Identifier(key.lexeme.clone()), key.position)
            } else {
                return Err(self.error(self.peek(), "expected `:` after property name"));
            };
            properties.push((key.lexeme, value));
            self.skip_newlines();
            if !self.matches(TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.consume(TokenKind::RBrace, "expected `}` after object properties")?;
        Ok(properties)
    }

    /// Comma separated expressions up to (not including) `terminator`.
    fn parse_list(&mut self, terminator: TokenKind) -> Result<Vec<Expr>, Diagnostic> {
        let mut items = Vec::new();
        self.skip_newlines();
        while !self.check(terminator.clone()) {
            items.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.matches(TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        Ok(items)
    }

    fn parse_function(&mut self, exported: bool) -> Result<Expr, Diagnostic> {
        let keyword = self.advance();
        let position = keyword.position;

        if self.matches(TokenKind::Colon) {
            if self.matches(TokenKind::Colon) {
                // `fn:: expr` is called on the spot.
                let expr = self.parse_expression()?;
                let function = function_expr(None, Vec::new(), return_body(expr), exported, position);
                return Ok(Expr::new(
                    ExprKind::Call {
                        callee: Box::new(function),
                        args: Vec::new(),
                    },
                    position,
                ));
            }
            let params = self.parse_params()?;
            self.consume(
                TokenKind::Colon,
                "expected `:` after anonymous function parameters",
            )?;
            let expr = self.parse_ternary()?;
            return Ok(function_expr(None, params, return_body(expr), exported, position));
        }

        let name = if keyword.kind == TokenKind::Keyword(Keyword::Fn)
            && self.check(TokenKind::Identifier)
        {
            Some(self.advance().lexeme)
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = if self.check(TokenKind::LBrace) {
            self.parse_block()?
        } else if self.matches(TokenKind::Colon) {
            return_body(self.parse_ternary()?)
        } else {
            return Err(self.error(
                self.peek(),
                "expected `{` or `:` after function parameters",
            ));
        };
        Ok(function_expr(name, params, body, exported, position))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, Diagnostic> {
        if self.matches(TokenKind::LParen) {
            return self.parse_parenthesized_params();
        }
        let mut params = Vec::new();
        while self.check(TokenKind::Identifier) {
            let name = self.advance().lexeme;
            let default = if self.matches(TokenKind::Assign) {
                self.consume(TokenKind::LParen, "expected `(` after `=` in default parameter")?;
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RParen, "expected `)` after default parameter value")?;
                Some(expr)
            } else {
                None
            };
            params.push(Param { name, default });
        }
        Ok(params)
    }

    fn parse_parenthesized_params(&mut self) -> Result<Vec<Param>, Diagnostic> {
        let mut params = Vec::new();
        self.skip_newlines();
        while !self.check(TokenKind::RParen) {
            let name = self
                .consume(TokenKind::Identifier, "expected parameter name")?
                .lexeme;
            let default = if self.matches(TokenKind::Assign) {
                Some(self.parse_ternary()?)
            } else {
                None
            };
            params.push(Param { name, default });
            self.skip_newlines();
            if !self.matches(TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.consume(TokenKind::RParen, "expected `)` after parameters")?;
        Ok(params)
    }

    fn consume_property_name(&mut self) -> Result<String, Diagnostic> {
        match self.peek().kind {
            TokenKind::Identifier | TokenKind::Keyword(_) => Ok(self.advance().lexeme),
            _ => Err(self.error(self.peek(), "expected property name after `.`")),
        }
    }

    /// Consumes `else`, looking past newlines; leaves the stream untouched otherwise.
    fn matches_else(&mut self) -> bool {
        let checkpoint = self.current;
        self.skip_newlines();
        if self.matches(TokenKind::Keyword(Keyword::Else)) {
            true
        } else {
            self.current = checkpoint;
            false
        }
    }

    fn skip_newlines(&mut self) {
        while self.matches(TokenKind::Newline) {}
    }

    fn skip_separators(&mut self) {
        while self.matches(TokenKind::Newline) || self.matches(TokenKind::Semicolon) {}
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(self.error(token, format!("{message}, found {}", describe(token))))
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.current.min(last)]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn error(&self, token: &Token, message: impl Into<String>) -> Diagnostic {
        Diagnostic::parser(message)
            .with_position(token.position)
            .with_width(token.width())
    }

    fn unexpected(&self, token: &Token) -> Diagnostic {
        match token.kind {
            TokenKind::Eof => self.error(token, "unexpected end of input"),
            _ => self.error(token, format!("unexpected {}", describe(token))),
        }
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Newline => "newline".to_string(),
        TokenKind::String => format!("string \"{}\"", token.lexeme),
        _ => format!("token `{}`", token.lexeme),
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let position = left.position;
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        position,
    )
}

fn return_body(expr: Expr) -> Vec<Stmt> {
    let position = expr.position;
    vec![Stmt::new(StmtKind::Return(Some(expr)), position)]
}

fn function_expr(
    name: Option<String>,
    params: Vec<Param>,
    body: Vec<Stmt>,
    exported: bool,
    position: Position,
) -> Expr {
    Expr::new(
        ExprKind::Function(Rc::new(FunctionDecl {
            name,
            params,
            body,
            exported,
        })),
        position,
    )
}
