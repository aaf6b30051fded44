use crate::error::{ExprError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Template(Vec<TemplatePiece>),
    Ident(String),

    // keywords
    True,
    False,
    Null,
    Undefined,
    Let,
    Const,
    Var,
    Return,
    If,
    Else,
    For,
    Of,
    Break,
    Continue,
    Typeof,

    // punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Semicolon,
    Colon,
    Question,
    QuestionDot,
    QuestionQuestion,
    Ellipsis,
    Arrow,

    // operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    EqEq,
    EqEqEq,
    NotEq,
    NotEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,

    Eof,
}

impl TokenKind {
    /// Source text of a keyword, so keywords can still be used as property names
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::Of => "of",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Typeof => "typeof",
            _ => return None,
        })
    }
}

/// A piece of a backtick template literal
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePiece {
    Text(String),
    /// Raw source of a `${...}` substitution and its offset in the input
    Code(String, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, position: usize, message: impl Into<String>) -> ExprError {
        ExprError::Lex {
            position,
            message: message.into(),
        }
    }

    fn push(&mut self, kind: TokenKind, position: usize) {
        self.tokens.push(Token { kind, position });
    }

    fn run(mut self) -> Result<Vec<Token>> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                c if c.is_whitespace() => self.pos += 1,
                '/' if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.pos += 2;
                    loop {
                        match self.peek() {
                            None => return Err(self.error(start, "Unterminated comment")),
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(_) => self.pos += 1,
                        }
                    }
                }
                '0'..='9' => self.number()?,
                '.' if matches!(self.peek_at(1), Some('0'..='9')) => self.number()?,
                '\'' | '"' => {
                    let s = self.string(c)?;
                    self.push(TokenKind::Str(s), start);
                }
                '`' => self.template()?,
                c if is_ident_start(c) => self.ident(),
                _ => self.punct()?,
            }
        }
        let end = self.pos;
        self.push(TokenKind::Eof, end);
        Ok(self.tokens)
    }

    fn number(&mut self) -> Result<()> {
        let start = self.pos;
        while matches!(self.peek(), Some('0'..='9' | '_')) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some('0'..='9')) {
            self.pos += 1;
            while matches!(self.peek(), Some('0'..='9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if matches!(self.peek_at(digit_at), Some('0'..='9')) {
                self.pos += digit_at;
                while matches!(self.peek(), Some('0'..='9')) {
                    self.pos += 1;
                }
            }
        }
        let text: String = self.chars[start..self.pos]
            .iter()
            .filter(|c| **c != '_')
            .collect();
        let value = text
            .parse::<f64>()
            .map_err(|_| self.error(start, format!("Invalid number '{}'", text)))?;
        self.push(TokenKind::Number(value), start);
        Ok(())
    }

    fn escape(&mut self, start: usize) -> Result<char> {
        let c = self
            .peek()
            .ok_or_else(|| self.error(start, "Unterminated string"))?;
        self.pos += 1;
        Ok(match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'u' => {
                let digits: String = self.chars.iter().skip(self.pos).take(4).collect();
                let code = u32::from_str_radix(&digits, 16)
                    .ok()
                    .filter(|_| digits.len() == 4)
                    .ok_or_else(|| self.error(self.pos, "Invalid unicode escape"))?;
                self.pos += 4;
                char::from_u32(code).unwrap_or('\u{fffd}')
            }
            other => other,
        })
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(self.error(start, "Unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    out.push(self.escape(start)?);
                }
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(c) => {
                    out.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn template(&mut self) -> Result<()> {
        let start = self.pos;
        self.pos += 1;
        let mut pieces = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error(start, "Unterminated template literal")),
                Some('`') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    text.push(self.escape(start)?);
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    if !text.is_empty() {
                        pieces.push(TemplatePiece::Text(std::mem::take(&mut text)));
                    }
                    self.pos += 2;
                    let code_start = self.pos;
                    let mut depth = 0usize;
                    loop {
                        match self.peek() {
                            None => {
                                return Err(self.error(code_start, "Unterminated template substitution"))
                            }
                            Some('{') => depth += 1,
                            Some('}') if depth == 0 => break,
                            Some('}') => depth -= 1,
                            Some(q @ ('\'' | '"')) => {
                                self.string(q)?;
                                continue;
                            }
                            Some(_) => {}
                        }
                        self.pos += 1;
                    }
                    let code: String = self.chars[code_start..self.pos].iter().collect();
                    self.pos += 1;
                    pieces.push(TemplatePiece::Code(code, code_start));
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
        if !text.is_empty() {
            pieces.push(TemplatePiece::Text(text));
        }
        self.push(TokenKind::Template(pieces), start);
        Ok(())
    }

    fn ident(&mut self) {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let kind = match word.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "let" => TokenKind::Let,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            "return" => TokenKind::Return,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "of" => TokenKind::Of,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "typeof" => TokenKind::Typeof,
            _ => TokenKind::Ident(word),
        };
        self.push(kind, start);
    }

    fn punct(&mut self) -> Result<()> {
        let start = self.pos;
        let c0 = self.chars[self.pos];
        let c1 = self.peek_at(1);
        let c2 = self.peek_at(2);

        // longest match first
        let (kind, len) = match (c0, c1, c2) {
            ('=', Some('='), Some('=')) => (TokenKind::EqEqEq, 3),
            ('!', Some('='), Some('=')) => (TokenKind::NotEqEq, 3),
            ('.', Some('.'), Some('.')) => (TokenKind::Ellipsis, 3),
            // `?.` followed by a digit is a ternary, not optional chaining
            ('?', Some('.'), c) if !matches!(c, Some('0'..='9')) => (TokenKind::QuestionDot, 2),
            ('=', Some('='), _) => (TokenKind::EqEq, 2),
            ('!', Some('='), _) => (TokenKind::NotEq, 2),
            ('<', Some('='), _) => (TokenKind::LtEq, 2),
            ('>', Some('='), _) => (TokenKind::GtEq, 2),
            ('&', Some('&'), _) => (TokenKind::AndAnd, 2),
            ('|', Some('|'), _) => (TokenKind::OrOr, 2),
            ('?', Some('?'), _) => (TokenKind::QuestionQuestion, 2),
            ('=', Some('>'), _) => (TokenKind::Arrow, 2),
            ('+', Some('='), _) => (TokenKind::PlusAssign, 2),
            ('-', Some('='), _) => (TokenKind::MinusAssign, 2),
            ('*', Some('='), _) => (TokenKind::StarAssign, 2),
            ('/', Some('='), _) => (TokenKind::SlashAssign, 2),
            ('(', _, _) => (TokenKind::LParen, 1),
            (')', _, _) => (TokenKind::RParen, 1),
            ('[', _, _) => (TokenKind::LBracket, 1),
            (']', _, _) => (TokenKind::RBracket, 1),
            ('{', _, _) => (TokenKind::LBrace, 1),
            ('}', _, _) => (TokenKind::RBrace, 1),
            (',', _, _) => (TokenKind::Comma, 1),
            ('.', _, _) => (TokenKind::Dot, 1),
            (';', _, _) => (TokenKind::Semicolon, 1),
            (':', _, _) => (TokenKind::Colon, 1),
            ('?', _, _) => (TokenKind::Question, 1),
            ('+', _, _) => (TokenKind::Plus, 1),
            ('-', _, _) => (TokenKind::Minus, 1),
            ('*', _, _) => (TokenKind::Star, 1),
            ('/', _, _) => (TokenKind::Slash, 1),
            ('%', _, _) => (TokenKind::Percent, 1),
            ('!', _, _) => (TokenKind::Bang, 1),
            ('=', _, _) => (TokenKind::Assign, 1),
            ('<', _, _) => (TokenKind::Lt, 1),
            ('>', _, _) => (TokenKind::Gt, 1),
            (other, _, _) => {
                return Err(self.error(start, format!("Unexpected character '{}'", other)))
            }
        };

        self.pos += len;
        self.push(kind, start);
        Ok(())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_dollar_identifiers_and_members() {
        assert_eq!(
            kinds("$json.user"),
            vec![
                TokenKind::Ident("$json".into()),
                TokenKind::Dot,
                TokenKind::Ident("user".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("a === b !== c => ..."),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::EqEqEq,
                TokenKind::Ident("b".into()),
                TokenKind::NotEqEq,
                TokenKind::Ident("c".into()),
                TokenKind::Arrow,
                TokenKind::Ellipsis,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_optional_chain_vs_ternary_decimal() {
        assert!(kinds("a?.b").contains(&TokenKind::QuestionDot));
        assert!(!kinds("a?.5:1").contains(&TokenKind::QuestionDot));
    }

    #[test]
    fn test_strings_and_comments() {
        assert_eq!(
            kinds("'it\\'s' // trailing\n\"x\\ny\" /* block */"),
            vec![
                TokenKind::Str("it's".into()),
                TokenKind::Str("x\ny".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_template_pieces() {
        let tokens = kinds("`Hi ${user.name}!`");
        assert_eq!(
            tokens[0],
            TokenKind::Template(vec![
                TemplatePiece::Text("Hi ".into()),
                TemplatePiece::Code("user.name".into(), 6),
                TemplatePiece::Text("!".into()),
            ])
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(matches!(tokenize("'abc"), Err(ExprError::Lex { .. })));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 2.5 1e3 .5"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.5),
                TokenKind::Number(1000.0),
                TokenKind::Number(0.5),
                TokenKind::Eof,
            ]
        );
    }
}
