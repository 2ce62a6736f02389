// SPDX-FileCopyrightText: 2026 Gridbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formula tokenizer and recursive-descent parser.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! compare := concat (("=" | "<>" | "<" | "<=" | ">" | ">=") concat)*
//! concat  := additive ("&" additive)*
//! additive:= term (("+" | "-") term)*
//! term    := power (("*" | "/") power)*
//! power   := unary ("^" unary)*
//! unary   := ("-" | "+") unary | postfix
//! postfix := primary "%"*
//! primary := NUMBER | STRING | TRUE | FALSE | reference | NAME "(" args ")" | "(" compare ")"
//! ```

use crate::coord::{MAX_COLUMN, MAX_ROW, column_to_index};

use super::{EvalError, MAX_DEPTH, MAX_FORMULA_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Zero-based `(row, column)`.
pub type Position = (u32, u32);

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Bool(bool),
    /// `None` means the sheet holding the formula.
    Cell {
        sheet: Option<String>,
        at: Position,
    },
    Range {
        sheet: Option<String>,
        start: Position,
        end: Position,
    },
    Negate(Box<Expr>),
    Percent(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    QuotedSheet(String),
    Op(BinaryOp),
    Plus,
    Minus,
    Percent,
    LParen,
    RParen,
    Comma,
    Colon,
    Bang,
}

/// Parses formula text, with or without the leading `=`.
pub fn parse_formula(input: &str) -> Result<Expr, EvalError> {
    let body = input.trim();
    let body = body.strip_prefix('=').unwrap_or(body);
    if body.chars().count() > MAX_FORMULA_LEN {
        return Err(EvalError::TooLong);
    }
    let tokens = tokenize(body)?;
    if tokens.is_empty() {
        return Err(EvalError::Parse("formula is empty".into()));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.compare()?;
    match parser.peek() {
        None => Ok(expr),
        Some(tok) => Err(EvalError::Parse(format!("unexpected {tok:?} in `{body}`"))),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '"' || ch == '\'' {
            chars.next();
            let mut buf = String::new();
            let mut closed = false;
            while let Some(c) = chars.next() {
                if c == ch {
                    // A doubled quote is an escaped quote.
                    if chars.peek() == Some(&ch) {
                        chars.next();
                        buf.push(ch);
                        continue;
                    }
                    closed = true;
                    break;
                }
                buf.push(c);
            }
            if !closed {
                return Err(EvalError::Parse(format!("unterminated {ch} quote")));
            }
            tokens.push(if ch == '"' {
                Token::Str(buf)
            } else {
                Token::QuotedSheet(buf)
            });
            continue;
        }

        if ch.is_ascii_digit() || ch == '.' {
            let mut buf = String::new();
            while let Some(&c) = chars.peek() {
                let exponent_sign =
                    (c == '+' || c == '-') && buf.ends_with(['e', 'E']);
                if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                    buf.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let n = buf
                .parse::<f64>()
                .map_err(|_| EvalError::Parse(format!("bad number `{buf}`")))?;
            tokens.push(Token::Number(n));
            continue;
        }

        if ch.is_alphabetic() || ch == '_' || ch == '$' {
            let mut buf = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || matches!(c, '_' | '.' | '$') {
                    buf.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(buf));
            continue;
        }

        chars.next();
        let token = match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Op(BinaryOp::Mul),
            '/' => Token::Op(BinaryOp::Div),
            '^' => Token::Op(BinaryOp::Pow),
            '&' => Token::Op(BinaryOp::Concat),
            '%' => Token::Percent,
            '=' => Token::Op(BinaryOp::Eq),
            '<' => match chars.peek() {
                Some('=') => {
                    chars.next();
                    Token::Op(BinaryOp::Le)
                }
                Some('>') => {
                    chars.next();
                    Token::Op(BinaryOp::Ne)
                }
                _ => Token::Op(BinaryOp::Lt),
            },
            '>' => match chars.peek() {
                Some('=') => {
                    chars.next();
                    Token::Op(BinaryOp::Ge)
                }
                _ => Token::Op(BinaryOp::Gt),
            },
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' | ';' => Token::Comma,
            ':' => Token::Colon,
            '!' => Token::Bang,
            other => return Err(EvalError::Parse(format!("unexpected character `{other}`"))),
        };
        tokens.push(token);
    }

    Ok(tokens)
}

/// Parses `A1`, `$A$1`, `a$1` into a zero-based position.
pub(crate) fn parse_cell_token(token: &str) -> Option<Position> {
    let rest = token.strip_prefix('$').unwrap_or(token);
    let split = rest.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, rest) = rest.split_at(split);
    let digits = rest.strip_prefix('$').unwrap_or(rest);
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let col = column_to_index(letters)?;
    let row = digits.parse::<u32>().ok()?;
    if row == 0 || row > MAX_ROW || col > MAX_COLUMN {
        return None;
    }
    Some((row - 1, col - 1))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), EvalError> {
        match self.advance() {
            Some(tok) if tok == want => Ok(()),
            Some(tok) => Err(EvalError::Parse(format!("expected {want:?}, found {tok:?}"))),
            None => Err(EvalError::Parse(format!("expected {want:?}, found end of formula"))),
        }
    }

    fn binary_level(
        &mut self,
        ops: &[BinaryOp],
        next: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let mut left = next(self)?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(op)) if ops.contains(op) => *op,
                Some(Token::Plus) if ops.contains(&BinaryOp::Add) => BinaryOp::Add,
                Some(Token::Minus) if ops.contains(&BinaryOp::Sub) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = next(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn compare(&mut self) -> Result<Expr, EvalError> {
        const OPS: [BinaryOp; 6] = [
            BinaryOp::Eq,
            BinaryOp::Ne,
            BinaryOp::Lt,
            BinaryOp::Le,
            BinaryOp::Gt,
            BinaryOp::Ge,
        ];
        self.binary_level(&OPS, Self::concat)
    }

    fn concat(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::Concat], Self::additive)
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::Add, BinaryOp::Sub], Self::term)
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::Mul, BinaryOp::Div], Self::power)
    }

    fn power(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::Pow], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let inner = self.nested(Self::unary)?;
                Ok(Expr::Negate(Box::new(inner)))
            }
            Some(Token::Plus) => {
                self.advance();
                self.nested(Self::unary)
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        let mut wraps = 0;
        while self.peek() == Some(&Token::Percent) {
            self.advance();
            wraps += 1;
            if self.depth + wraps > MAX_DEPTH {
                return Err(EvalError::TooDeep);
            }
            expr = Expr::Percent(Box::new(expr));
        }
        Ok(expr)
    }

    /// Runs `f` one nesting level deeper.
    fn nested(&mut self, f: fn(&mut Self) -> Result<Expr, EvalError>) -> Result<Expr, EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep);
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Text(s)),
            Some(Token::LParen) => {
                let inner = self.nested(Self::compare)?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::QuotedSheet(sheet)) => {
                self.expect(Token::Bang)?;
                self.reference(Some(sheet))
            }
            Some(Token::Ident(name)) => match self.peek() {
                Some(Token::Bang) => {
                    self.advance();
                    self.reference(Some(name))
                }
                Some(Token::LParen) => {
                    self.advance();
                    self.call(name)
                }
                _ if name.eq_ignore_ascii_case("TRUE") => Ok(Expr::Bool(true)),
                _ if name.eq_ignore_ascii_case("FALSE") => Ok(Expr::Bool(false)),
                _ => {
                    self.pos -= 1;
                    self.reference(None)
                }
            },
            Some(tok) => Err(EvalError::Parse(format!("unexpected {tok:?}"))),
            None => Err(EvalError::Parse("formula ends unexpectedly".into())),
        }
    }

    fn reference(&mut self, sheet: Option<String>) -> Result<Expr, EvalError> {
        let start = self.cell_position()?;
        if self.peek() != Some(&Token::Colon) {
            return Ok(Expr::Cell { sheet, at: start });
        }
        self.advance();
        let end = self.cell_position()?;
        Ok(Expr::Range {
            sheet,
            start: (start.0.min(end.0), start.1.min(end.1)),
            end: (start.0.max(end.0), start.1.max(end.1)),
        })
    }

    fn cell_position(&mut self) -> Result<Position, EvalError> {
        match self.advance() {
            Some(Token::Ident(text)) => parse_cell_token(&text)
                .ok_or_else(|| EvalError::Parse(format!("unrecognised name `{text}`"))),
            Some(tok) => Err(EvalError::Parse(format!("expected a cell reference, found {tok:?}"))),
            None => Err(EvalError::Parse("expected a cell reference".into())),
        }
    }

    fn call(&mut self, name: String) -> Result<Expr, EvalError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.advance();
        } else {
            loop {
                args.push(self.nested(Self::compare)?);
                match self.advance() {
                    Some(Token::Comma) => continue,
                    Some(Token::RParen) => break,
                    Some(tok) => {
                        return Err(EvalError::Parse(format!(
                            "expected `,` or `)` in {name}(), found {tok:?}"
                        )));
                    }
                    None => return Err(EvalError::Parse(format!("unclosed {name}("))),
                }
            }
        }
        // Newer functions are stored with an `_xlfn.` prefix.
        let name = name
            .strip_prefix("_xlfn.")
            .unwrap_or(&name)
            .to_ascii_uppercase();
        Ok(Expr::Call { name, args })
    }
}
