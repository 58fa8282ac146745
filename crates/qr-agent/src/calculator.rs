//! Arithmetic evaluation for CALCULATION queries
//!
//! Supports `+ - * /`, unary minus, parentheses and decimal literals. Input
//! containing anything else is rejected before any evaluation happens, so a
//! query like `5+3; rm -rf /` is an error rather than a partial result.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Deepest parenthesis / unary nesting accepted
pub const MAX_NESTING: usize = 64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("no expression to evaluate")]
    Empty,

    #[error("unsupported character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("malformed expression: {0}")]
    Malformed(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression nested deeper than {MAX_NESTING} levels")]
    TooDeep,

    #[error("result is not a finite number")]
    NonFinite,
}

static LEADING_COMMAND: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(please\s+)?(calculate|compute|solve|evaluate|what\s+is|what's)\s*:?\s*").ok()
});

/// Remove command words and trailing `=`/`?` around the arithmetic
pub fn extract_expression(query: &str) -> String {
    let stripped = match LEADING_COMMAND.as_ref() {
        Some(re) => re.replace(query, "").into_owned(),
        None => query.to_string(),
    };
    stripped
        .trim()
        .trim_end_matches(|c: char| c == '?' || c == '=' || c.is_whitespace())
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => {
                i += 1;
                continue;
            }
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' => tokens.push(Token::Star),
            '/' => tokens.push(Token::Slash),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
                continue;
            }
            other => {
                return Err(CalcError::UnexpectedCharacter {
                    ch: other,
                    position: i,
                });
            }
        }
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn descend(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(CalcError::TooDeep);
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == Token::Star {
                value * rhs
            } else {
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value / rhs
            };
        }
        Ok(value)
    }

    // factor := number | '-' factor | '+' factor | '(' expr ')'
    fn factor(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::Minus) => {
                self.descend()?;
                let value = self.factor()?;
                self.depth -= 1;
                Ok(-value)
            }
            Some(Token::Plus) => {
                self.descend()?;
                let value = self.factor()?;
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => {
                        self.depth -= 1;
                        Ok(value)
                    }
                    _ => Err(CalcError::Malformed("missing closing parenthesis".to_string())),
                }
            }
            Some(Token::RParen) => Err(CalcError::Malformed("unexpected ')'".to_string())),
            Some(_) => Err(CalcError::Malformed("operator without operand".to_string())),
            None => Err(CalcError::Malformed("expression ends unexpectedly".to_string())),
        }
    }
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    if expression.trim().is_empty() {
        return Err(CalcError::Empty);
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };

    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(CalcError::Malformed("unexpected trailing input".to_string()));
    }
    if !value.is_finite() {
        return Err(CalcError::NonFinite);
    }

    Ok(value)
}

/// Render a result without float noise: `8`, `2.5`, `0.3333333333`
pub fn format_number(value: f64) -> String {
    if value.abs() >= 1e15 {
        return format!("{}", value);
    }
    let rounded = (value * 1e10).round() / 1e10;
    if rounded == rounded.trunc() {
        return format!("{}", rounded as i64);
    }
    let text = format!("{:.10}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
