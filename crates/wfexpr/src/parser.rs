use crate::ast::*;
use crate::error::{ExprError, Result};
use crate::lexer::{tokenize, TemplatePiece, Token, TokenKind};
use crate::value;
use serde_json::Value;
use std::rc::Rc;

/// Deepest nesting of expressions and blocks a source may use
const MAX_NESTING: usize = 128;

/// Parse a single expression; trailing tokens are an error
pub fn parse_expression(source: &str) -> Result<Expr> {
    parse_nested_expression(source, 0)
}

fn parse_nested_expression(source: &str, depth: usize) -> Result<Expr> {
    let mut parser = Parser::new(tokenize(source)?);
    parser.depth = depth;
    let expr = parser.expression()?;
    parser.expect(&TokenKind::Eof, "end of expression")?;
    Ok(expr)
}

/// Parse a statement list, as found in a function body
pub fn parse_program(source: &str) -> Result<Vec<Stmt>> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut body = Vec::new();
    while !parser.check(&TokenKind::Eof) {
        body.push(parser.statement()?);
    }
    Ok(body)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// One level deeper into the tree being built
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ExprError::Parse {
                position: self.position(),
                message: "Expression nested too deeply".to_string(),
            });
        }
        Ok(())
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let entry = self.depth;
        self.descend()?;
        let result = parse(self);
        self.depth = entry;
        result
    }

    fn peek(&self) -> &TokenKind {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        // the token stream always ends with Eof
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn position(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].position
    }

    fn advance(&mut self) -> TokenKind {
        let kind = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.error(format!("Expected {}", what)))
        }
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        let message = message.into();
        let found = match self.peek() {
            TokenKind::Eof => "end of input".to_string(),
            other => format!("{:?}", other),
        };
        ExprError::Parse {
            position: self.position(),
            message: format!("{}, found {}", message, found),
        }
    }

    // ---------------------------------------------------------------
    // statements
    // ---------------------------------------------------------------

    fn statement(&mut self) -> Result<Stmt> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> Result<Stmt> {
        let stmt = match self.peek() {
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let kind = self.decl_kind()?;
                let pattern = self.pattern()?;
                let init = if self.eat(&TokenKind::Assign) {
                    Some(self.expression()?)
                } else {
                    None
                };
                if kind == DeclKind::Const && init.is_none() {
                    return Err(self.error("Missing initializer in const declaration"));
                }
                Stmt::Declare {
                    kind,
                    pattern,
                    init,
                }
            }
            TokenKind::Return => {
                self.advance();
                let value = match self.peek() {
                    TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => None,
                    _ => Some(self.expression()?),
                };
                Stmt::Return(value)
            }
            TokenKind::If => {
                self.advance();
                self.expect(&TokenKind::LParen, "'(' after if")?;
                let test = self.expression()?;
                self.expect(&TokenKind::RParen, "')' after condition")?;
                let consequent = self.body()?;
                let alternate = if self.eat(&TokenKind::Else) {
                    Some(self.body()?)
                } else {
                    None
                };
                return Ok(Stmt::If {
                    test,
                    consequent,
                    alternate,
                });
            }
            TokenKind::For => {
                self.advance();
                self.expect(&TokenKind::LParen, "'(' after for")?;
                let kind = self.decl_kind()?;
                let pattern = self.pattern()?;
                self.expect(&TokenKind::Of, "'of' (only for...of loops are supported)")?;
                let iterable = self.expression()?;
                self.expect(&TokenKind::RParen, "')' after for...of header")?;
                let body = self.body()?;
                return Ok(Stmt::ForOf {
                    kind,
                    pattern,
                    iterable,
                    body,
                });
            }
            TokenKind::Break => {
                self.advance();
                Stmt::Break
            }
            TokenKind::Continue => {
                self.advance();
                Stmt::Continue
            }
            TokenKind::LBrace => return Ok(Stmt::Block(self.block()?)),
            TokenKind::Semicolon => {
                self.advance();
                return Ok(Stmt::Block(Vec::new()));
            }
            _ => {
                let expr = self.expression()?;
                let op = match self.peek() {
                    TokenKind::Assign => Some(AssignOp::Assign),
                    TokenKind::PlusAssign => Some(AssignOp::Add),
                    TokenKind::MinusAssign => Some(AssignOp::Sub),
                    TokenKind::StarAssign => Some(AssignOp::Mul),
                    TokenKind::SlashAssign => Some(AssignOp::Div),
                    _ => None,
                };
                match op {
                    Some(op) => {
                        if !expr.is_place() {
                            return Err(self.error("Invalid assignment target"));
                        }
                        self.advance();
                        let value = self.expression()?;
                        Stmt::Assign {
                            target: expr,
                            op,
                            value,
                        }
                    }
                    None => Stmt::Expr(expr),
                }
            }
        };
        self.eat(&TokenKind::Semicolon);
        Ok(stmt)
    }

    fn decl_kind(&mut self) -> Result<DeclKind> {
        match self.advance() {
            TokenKind::Const => Ok(DeclKind::Const),
            TokenKind::Let => Ok(DeclKind::Let),
            TokenKind::Var => Ok(DeclKind::Var),
            _ => Err(self.error("Expected const, let or var")),
        }
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error("Expected '}'"));
            }
            stmts.push(self.statement()?);
        }
        self.advance();
        Ok(stmts)
    }

    /// Braced block or a single statement, as allowed after if/else/for
    fn body(&mut self) -> Result<Vec<Stmt>> {
        if self.check(&TokenKind::LBrace) {
            self.block()
        } else {
            Ok(vec![self.statement()?])
        }
    }

    fn identifier(&mut self) -> Result<String> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("Expected identifier")),
        }
    }

    fn pattern(&mut self) -> Result<Pattern> {
        match self.peek() {
            TokenKind::LBracket => {
                self.advance();
                let mut names = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    if self.check(&TokenKind::Comma) {
                        self.advance();
                        names.push(None);
                        continue;
                    }
                    names.push(Some(self.identifier()?));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBracket, "']' after array pattern")?;
                Ok(Pattern::Array(names))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut names = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    names.push(self.identifier()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(&TokenKind::RBrace, "'}' after object pattern")?;
                Ok(Pattern::Object(names))
            }
            _ => Ok(Pattern::Ident(self.identifier()?)),
        }
    }

    // ---------------------------------------------------------------
    // expressions, lowest precedence first
    // ---------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Expr> {
        let test = self.nullish()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.expression()?;
        self.expect(&TokenKind::Colon, "':' in conditional expression")?;
        let alternate = self.conditional()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn nullish(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.or()?;
        while self.eat(&TokenKind::QuestionQuestion) {
            self.descend()?;
            let right = self.or()?;
            left = logical(LogicalOp::Nullish, left, right);
        }
        self.depth = entry;
        Ok(left)
    }

    fn or(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.and()?;
        while self.eat(&TokenKind::OrOr) {
            self.descend()?;
            let right = self.and()?;
            left = logical(LogicalOp::Or, left, right);
        }
        self.depth = entry;
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.equality()?;
        while self.eat(&TokenKind::AndAnd) {
            self.descend()?;
            let right = self.equality()?;
            left = logical(LogicalOp::And, left, right);
        }
        self.depth = entry;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::EqEqEq => BinaryOp::StrictEq,
                TokenKind::NotEqEq => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.relational()?;
            left = binary(op, left, right);
        }
        self.depth = entry;
        Ok(left)
    }

    fn relational(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.additive()?;
            left = binary(op, left, right);
        }
        self.depth = entry;
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
        self.depth = entry;
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
        self.depth = entry;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Typeof => UnaryOp::Typeof,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.nested(Self::unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr> {
        let entry = self.depth;
        let mut expr = self.primary()?;
        loop {
            if !matches!(
                self.peek(),
                TokenKind::Dot | TokenKind::QuestionDot | TokenKind::LBracket | TokenKind::LParen
            ) {
                self.depth = entry;
                return Ok(expr);
            }
            self.descend()?;
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.property_name()?;
                    expr = member(expr, MemberKey::Named(name), false);
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    if self.eat(&TokenKind::LBracket) {
                        let key = self.expression()?;
                        self.expect(&TokenKind::RBracket, "']'")?;
                        expr = member(expr, MemberKey::Computed(Box::new(key)), true);
                    } else {
                        let name = self.property_name()?;
                        expr = member(expr, MemberKey::Named(name), true);
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.expression()?;
                    self.expect(&TokenKind::RBracket, "']'")?;
                    expr = member(expr, MemberKey::Computed(Box::new(key)), false);
                }
                _ => {
                    let args = self.arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
            }
        }
    }

    fn property_name(&mut self) -> Result<String> {
        let kind = self.peek().clone();
        if let TokenKind::Ident(name) = kind {
            self.advance();
            return Ok(name);
        }
        if let Some(word) = kind.keyword_text() {
            self.advance();
            return Ok(word.to_string());
        }
        Err(self.error("Expected property name"))
    }

    fn element(&mut self) -> Result<Element> {
        if self.eat(&TokenKind::Ellipsis) {
            Ok(Element::Spread(self.expression()?))
        } else {
            Ok(Element::Item(self.expression()?))
        }
    }

    /// Comma-separated elements up to `close`; trailing comma allowed
    fn elements(&mut self, close: &TokenKind, what: &str) -> Result<Vec<Element>> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.element()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(close, what)?;
        Ok(items)
    }

    fn arguments(&mut self) -> Result<Vec<Element>> {
        self.expect(&TokenKind::LParen, "'('")?;
        self.elements(&TokenKind::RParen, "')' after arguments")
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Literal(value::number(n)))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            TokenKind::Template(pieces) => {
                self.advance();
                let parts = pieces
                    .into_iter()
                    .map(|piece| match piece {
                        TemplatePiece::Text(text) => Ok(TemplatePart::Text(text)),
                        TemplatePiece::Code(code, offset) => parse_nested_expression(&code, self.depth)
                            .map(TemplatePart::Expr)
                            .map_err(|e| shift_position(e, offset)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::Template(parts))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Bool(false)))
            }
            TokenKind::Null | TokenKind::Undefined => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            TokenKind::Ident(name) => {
                if self.peek_at(1) == &TokenKind::Arrow {
                    self.advance();
                    self.advance();
                    let body = self.arrow_body()?;
                    return Ok(Expr::Arrow(Rc::new(ArrowFn {
                        params: vec![Pattern::Ident(name)],
                        body,
                    })));
                }
                self.advance();
                Ok(Expr::Ident(name))
            }
            TokenKind::LParen => {
                if self.is_arrow_params() {
                    return self.arrow();
                }
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.elements(&TokenKind::RBracket, "']' after array elements")?;
                Ok(Expr::Array(items))
            }
            TokenKind::LBrace => self.object(),
            _ => Err(self.error("Unexpected token")),
        }
    }

    /// Looks past the balanced parenthesis group for `=>`
    fn is_arrow_params(&self) -> bool {
        let mut depth = 0usize;
        for (i, token) in self.tokens[self.pos..].iter().enumerate() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek_at(i + 1) == &TokenKind::Arrow;
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn arrow(&mut self) -> Result<Expr> {
        self.expect(&TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            params.push(self.pattern()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')' after parameters")?;
        self.expect(&TokenKind::Arrow, "'=>'")?;
        let body = self.arrow_body()?;
        Ok(Expr::Arrow(Rc::new(ArrowFn { params, body })))
    }

    fn arrow_body(&mut self) -> Result<ArrowBody> {
        if self.check(&TokenKind::LBrace) {
            Ok(ArrowBody::Block(self.block()?))
        } else {
            Ok(ArrowBody::Expr(self.expression()?))
        }
    }

    fn object(&mut self) -> Result<Expr> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut props = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let prop = match self.peek().clone() {
                TokenKind::Ellipsis => {
                    self.advance();
                    Property::Spread(self.expression()?)
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.expression()?;
                    self.expect(&TokenKind::RBracket, "']' after computed key")?;
                    self.expect(&TokenKind::Colon, "':' after property key")?;
                    Property::Computed(key, self.expression()?)
                }
                TokenKind::Str(key) => {
                    self.advance();
                    self.expect(&TokenKind::Colon, "':' after property key")?;
                    Property::KeyValue(key, self.expression()?)
                }
                TokenKind::Number(n) => {
                    self.advance();
                    self.expect(&TokenKind::Colon, "':' after property key")?;
                    Property::KeyValue(value::number_to_string(n), self.expression()?)
                }
                _ => {
                    let shorthand = matches!(self.peek(), TokenKind::Ident(_));
                    let key = self.property_name()?;
                    if self.eat(&TokenKind::Colon) {
                        Property::KeyValue(key, self.expression()?)
                    } else if shorthand
                        && matches!(self.peek(), TokenKind::Comma | TokenKind::RBrace)
                    {
                        Property::KeyValue(key.clone(), Expr::Ident(key))
                    } else {
                        return Err(self.error("Expected ':' after property key"));
                    }
                }
            };
            props.push(prop);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}' after object properties")?;
        Ok(Expr::Object(props))
    }
}

fn member(object: Expr, key: MemberKey, optional: bool) -> Expr {
    Expr::Member {
        object: Box::new(object),
        key,
        optional,
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn shift_position(error: ExprError, offset: usize) -> ExprError {
    match error {
        ExprError::Lex { position, message } => ExprError::Lex {
            position: position + offset,
            message,
        },
        ExprError::Parse { position, message } => ExprError::Parse {
            position: position + offset,
            message,
        },
        other => other,
    }
}
