//! Lexer and recursive-descent parser for rule conditions.
//!
//! Produces a typed [`Expr`] tree; nothing here evaluates anything. Both the
//! symbol forms (`&&`, `||`, `!`) and the word forms (`and`, `or`, `not`) of
//! the boolean operators are accepted, and `=`/`==` are synonyms, so rule
//! text written in either style parses.

use super::ExprError;

/// Typed expression tree for rule conditions
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Dotted field reference resolved against the evaluation context
    Field(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// All dotted field paths referenced anywhere in the tree
    pub fn references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references(&self, refs: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Field(path) => {
                if !refs.contains(path) {
                    refs.push(path.clone());
                }
            }
            Expr::Unary { operand, .. } => operand.collect_references(refs),
            Expr::Binary { left, right, .. } => {
                left.collect_references(refs);
                right.collect_references(refs);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    String(String),
    Ident(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

struct Spanned {
    token: Token,
    pos: usize,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> ExprError {
        ExprError::Parse {
            position: pos,
            message: message.into(),
        }
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, ExprError> {
        self.skip_whitespace();
        let start = self.pos;
        let c = match self.next_char() {
            Some(c) => c,
            None => return Ok(None),
        };

        let token = match c {
            '(' => Token::LParen,
            ')' => Token::RParen,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '=' => {
                // '=', '==' and '===' all mean equality
                while self.peek_char() == Some('=') {
                    self.pos += 1;
                }
                Token::Eq
            }
            '!' => {
                if self.peek_char() == Some('=') {
                    self.pos += 1;
                    if self.peek_char() == Some('=') {
                        self.pos += 1;
                    }
                    Token::Ne
                } else {
                    Token::Not
                }
            }
            '<' => match self.peek_char() {
                Some('=') => {
                    self.pos += 1;
                    Token::Le
                }
                Some('>') => {
                    self.pos += 1;
                    Token::Ne
                }
                _ => Token::Lt,
            },
            '>' => {
                if self.peek_char() == Some('=') {
                    self.pos += 1;
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if self.peek_char() == Some('&') {
                    self.pos += 1;
                    Token::And
                } else {
                    return Err(self.error(start, "expected '&&'"));
                }
            }
            '|' => {
                if self.peek_char() == Some('|') {
                    self.pos += 1;
                    Token::Or
                } else {
                    return Err(self.error(start, "expected '||'"));
                }
            }
            '\'' | '"' => self.read_string(c, start)?,
            c if c.is_ascii_digit() => {
                self.pos = start;
                self.read_number(start)?
            }
            c if c.is_alphabetic() || c == '_' => {
                self.pos = start;
                self.read_identifier(start)?
            }
            other => return Err(self.error(start, format!("unexpected character '{other}'"))),
        };

        Ok(Some(Spanned { token, pos: start }))
    }

    fn read_string(&mut self, quote: char, start: usize) -> Result<Token, ExprError> {
        let mut value = String::new();
        loop {
            match self.next_char() {
                Some('\\') => match self.next_char() {
                    Some(c) if c == quote || c == '\\' => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                    None => return Err(self.error(start, "unterminated string")),
                },
                Some(c) if c == quote => return Ok(Token::String(value)),
                Some(c) => value.push(c),
                None => return Err(self.error(start, "unterminated string")),
            }
        }
    }

    fn read_number(&mut self, start: usize) -> Result<Token, ExprError> {
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                text.push(c);
                self.pos += 1;
            } else if c == '.' && !seen_dot {
                // distinguish "1.5" from a dotted path after a number
                let next = self.chars.get(self.pos + 1).copied();
                if matches!(next, Some(d) if d.is_ascii_digit()) {
                    seen_dot = true;
                    text.push(c);
                    self.pos += 1;
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| self.error(start, format!("invalid number '{text}'")))
    }

    fn read_identifier(&mut self, start: usize) -> Result<Token, ExprError> {
        let mut text = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        if text.split('.').any(|segment| segment.is_empty()) {
            return Err(self.error(start, format!("malformed field path '{text}'")));
        }

        Ok(match text.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Ident(text),
        })
    }
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, ExprError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(spanned) = lexer.next_token()? {
        tokens.push(spanned);
    }
    Ok(tokens)
}

/// Parse a condition string into an expression tree
pub fn parse(input: &str) -> Result<Expr, ExprError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ExprError::Parse {
            position: 0,
            message: "empty expression".into(),
        });
    }
    let end = input.chars().count();
    let mut parser = Parser {
        tokens,
        index: 0,
        end,
    };
    let expr = parser.parse_or()?;
    if let Some(spanned) = parser.peek() {
        return Err(ExprError::Parse {
            position: spanned.pos,
            message: "unexpected trailing input".into(),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    index: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Option<&Spanned> {
        let spanned = self.tokens.get(self.index);
        if spanned.is_some() {
            self.index += 1;
        }
        spanned
    }

    fn current_pos(&self) -> usize {
        self.peek().map(|s| s.pos).unwrap_or(self.end)
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::Parse {
            position: self.current_pos(),
            message: message.into(),
        }
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if matches!(self.peek(), Some(s) if s.token == *expected) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExprError> {
        let left = self.parse_additive()?;
        let op = match self.peek().map(|s| &s.token) {
            Some(Token::Eq) => BinaryOp::Eq,
            Some(Token::Ne) => BinaryOp::Ne,
            Some(Token::Lt) => BinaryOp::Lt,
            Some(Token::Le) => BinaryOp::Le,
            Some(Token::Gt) => BinaryOp::Gt,
            Some(Token::Ge) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.index += 1;
        let right = self.parse_additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.index += 1;
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|s| &s.token) {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => return Ok(left),
            };
            self.index += 1;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Token::Minus) {
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let (token, pos) = match self.advance() {
            Some(s) => (s.token.clone(), s.pos),
            None => return Err(self.error("unexpected end of expression")),
        };
        match token {
            Token::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            Token::String(s) => Ok(Expr::Literal(Literal::String(s))),
            Token::True => Ok(Expr::Literal(Literal::Bool(true))),
            Token::False => Ok(Expr::Literal(Literal::Bool(false))),
            Token::Null => Ok(Expr::Literal(Literal::Null)),
            Token::Ident(path) => Ok(Expr::Field(path)),
            Token::LParen => {
                let inner = self.parse_or()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            other => Err(ExprError::Parse {
                position: pos,
                message: format!("unexpected token {other:?}"),
            }),
        }
    }
}
