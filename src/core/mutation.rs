//! # Mutation Expressions
//!
//! A small, closed expression language applied to a flag's inbound value
//! before template substitution. There is exactly one bound variable,
//! `value`, and a fixed set of operators and string methods:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := '-' unary | postfix
//! postfix := primary ('.' IDENT '(' [expr (',' expr)*] ')')*
//! primary := NUMBER | STRING | 'value' | '(' expr ')'
//! ```
//!
//! `+` adds when both operands are numeric (numeric strings count), and
//! concatenates otherwise. The other arithmetic operators require numbers.

use std::fmt;
use thiserror::Error;

/// Why a mutation expression could not be parsed or evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Unexpected character '{0}' at offset {1}.")]
    Lex(char, usize),
    #[error("Unterminated string literal starting at offset {0}.")]
    UnterminatedString(usize),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Operator '{op}' needs numbers, got '{left}' and '{right}'.")]
    Type {
        op: char,
        left: String,
        right: String,
    },
    #[error("Division by zero.")]
    DivideByZero,
    #[error("pad() width {width} exceeds the limit of {max}.")]
    WidthTooLarge { width: String, max: usize },
    #[error("Unknown method '{0}()'.")]
    UnknownMethod(String),
    #[error("Method '{method}()' takes {expected} argument(s), got {got}.")]
    Arity {
        method: String,
        expected: &'static str,
        got: usize,
    },
}

type MutationResult<T> = Result<T, MutationError>;

/// Widest string `pad()` will produce.
pub const MAX_PAD_WIDTH: usize = 4096;

// --- LEXER ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Comma,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> MutationResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' => {
                let mut literal = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        literal.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal
                    .parse::<f64>()
                    .map_err(|_| MutationError::Parse(format!("invalid number '{}'", literal)))?;
                tokens.push(Token::Number(number));
            }
            '\'' | '"' => {
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some((_, escaped)) = chars.next() {
                                literal.push(escaped);
                            }
                        }
                        c if c == ch => {
                            closed = true;
                            break;
                        }
                        c => literal.push(c),
                    }
                }
                if !closed {
                    return Err(MutationError::UnterminatedString(offset));
                }
                tokens.push(Token::Str(literal));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => {
                let token = match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '.' => Token::Dot,
                    ',' => Token::Comma,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    other => return Err(MutationError::Lex(other, offset)),
                };
                tokens.push(token);
                chars.next();
            }
        }
    }
    Ok(tokens)
}

// --- AST & PARSER ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
            Self::Rem => '%',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Str(String),
    Value,
    Negate(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Method {
        receiver: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, wanted: &Token) -> MutationResult<()> {
        match self.advance() {
            Some(ref t) if t == wanted => Ok(()),
            Some(t) => Err(MutationError::Parse(format!(
                "expected {:?}, found {:?}",
                wanted, t
            ))),
            None => Err(MutationError::Parse(format!(
                "expected {:?}, found end of expression",
                wanted
            ))),
        }
    }

    fn parse_expr(&mut self) -> MutationResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_term(&mut self) -> MutationResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> MutationResult<Expr> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            return Ok(Expr::Negate(Box::new(self.parse_unary()?)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> MutationResult<Expr> {
        let mut expr = self.parse_primary()?;
        while self.peek() == Some(&Token::Dot) {
            self.advance();
            let name = match self.advance() {
                Some(Token::Ident(name)) => name,
                other => {
                    return Err(MutationError::Parse(format!(
                        "expected a method name after '.', found {:?}",
                        other
                    )));
                }
            };
            self.expect(&Token::LParen)?;
            let mut args = Vec::new();
            if self.peek() != Some(&Token::RParen) {
                args.push(self.parse_expr()?);
                while self.peek() == Some(&Token::Comma) {
                    self.advance();
                    args.push(self.parse_expr()?);
                }
            }
            self.expect(&Token::RParen)?;
            expr = Expr::Method {
                receiver: Box::new(expr),
                name,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> MutationResult<Expr> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::Ident(ident)) if ident == "value" => Ok(Expr::Value),
            Some(Token::Ident(ident)) => Err(MutationError::Parse(format!(
                "unknown identifier '{}' (only `value` is bound)",
                ident
            ))),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(other) => Err(MutationError::Parse(format!("unexpected {:?}", other))),
            None => Err(MutationError::Parse("unexpected end of expression".to_string())),
        }
    }
}

// --- EVALUATION ---

#[derive(Debug, Clone, PartialEq)]
enum Val {
    Num(f64),
    Str(String),
}

impl Val {
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            Self::Str(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display already drops a zero fraction (5200.0 -> "5200").
            Self::Num(n) => write!(f, "{}", n),
            Self::Str(s) => f.write_str(s),
        }
    }
}

/// A parsed mutation expression, ready to be applied to inbound values.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    source: String,
    expr: Expr,
}

impl Mutation {
    /// Parses an expression.
    ///
    /// # Errors
    /// Returns a lex or parse error describing the first problem found.
    pub fn parse(source: &str) -> MutationResult<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_expr()?;
        if let Some(extra) = parser.peek() {
            return Err(MutationError::Parse(format!(
                "unexpected trailing {:?}",
                extra
            )));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression text this mutation was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression with `value` bound to `input`.
    ///
    /// # Errors
    /// Type errors, division by zero and unknown methods.
    pub fn apply(&self, input: &str) -> MutationResult<String> {
        eval(&self.expr, input).map(|v| v.to_string())
    }
}

/// Parses and applies `source` in one step.
///
/// # Errors
/// Any lex, parse or evaluation error.
pub fn evaluate(source: &str, input: &str) -> MutationResult<String> {
    Mutation::parse(source)?.apply(input)
}

fn eval(expr: &Expr, input: &str) -> MutationResult<Val> {
    match expr {
        Expr::Number(n) => Ok(Val::Num(*n)),
        Expr::Str(s) => Ok(Val::Str(s.clone())),
        Expr::Value => Ok(Val::Str(input.to_string())),
        Expr::Negate(inner) => {
            let value = eval(inner, input)?;
            value.as_number().map(|n| Val::Num(-n)).ok_or_else(|| MutationError::Type {
                op: '-',
                left: String::new(),
                right: value.to_string(),
            })
        }
        Expr::Binary(op, left, right) => {
            let left = eval(left, input)?;
            let right = eval(right, input)?;
            binary(*op, left, right)
        }
        Expr::Method {
            receiver,
            name,
            args,
        } => {
            let receiver = eval(receiver, input)?.to_string();
            let args = args
                .iter()
                .map(|a| eval(a, input))
                .collect::<MutationResult<Vec<_>>>()?;
            call_method(&receiver, name, &args)
        }
    }
}

fn binary(op: BinaryOp, left: Val, right: Val) -> MutationResult<Val> {
    let numbers = left.as_number().zip(right.as_number());
    match (op, numbers) {
        (BinaryOp::Add, Some((l, r))) => Ok(Val::Num(l + r)),
        (BinaryOp::Add, None) => Ok(Val::Str(format!("{}{}", left, right))),
        (BinaryOp::Sub, Some((l, r))) => Ok(Val::Num(l - r)),
        (BinaryOp::Mul, Some((l, r))) => Ok(Val::Num(l * r)),
        (BinaryOp::Div | BinaryOp::Rem, Some((_, r))) if r == 0.0 => {
            Err(MutationError::DivideByZero)
        }
        (BinaryOp::Div, Some((l, r))) => Ok(Val::Num(l / r)),
        (BinaryOp::Rem, Some((l, r))) => Ok(Val::Num(l % r)),
        (op, None) => Err(MutationError::Type {
            op: op.symbol(),
            left: left.to_string(),
            right: right.to_string(),
        }),
    }
}

fn call_method(receiver: &str, name: &str, args: &[Val]) -> MutationResult<Val> {
    let arity = |expected: &'static str| MutationError::Arity {
        method: name.to_string(),
        expected,
        got: args.len(),
    };

    match (name, args) {
        ("upper", []) => Ok(Val::Str(receiver.to_uppercase())),
        ("lower", []) => Ok(Val::Str(receiver.to_lowercase())),
        ("trim", []) => Ok(Val::Str(receiver.trim().to_string())),
        ("len", []) => Ok(Val::Num(receiver.chars().count() as f64)),
        ("replace", [from, to]) => Ok(Val::Str(
            receiver.replace(&from.to_string(), &to.to_string()),
        )),
        ("slice", [start]) => {
            let start = index_arg(name, start)?;
            Ok(Val::Str(receiver.chars().skip(start).collect()))
        }
        ("slice", [start, end]) => {
            let start = index_arg(name, start)?;
            let end = index_arg(name, end)?;
            Ok(Val::Str(
                receiver
                    .chars()
                    .skip(start)
                    .take(end.saturating_sub(start))
                    .collect(),
            ))
        }
        ("pad", [width_arg, fill]) => {
            let width = index_arg(name, width_arg)?;
            if width > MAX_PAD_WIDTH {
                return Err(MutationError::WidthTooLarge {
                    width: width_arg.to_string(),
                    max: MAX_PAD_WIDTH,
                });
            }
            let fill = fill.to_string();
            let Some(fill_char) = fill.chars().next() else {
                return Ok(Val::Str(receiver.to_string()));
            };
            let missing = width.saturating_sub(receiver.chars().count());
            let mut padded: String = std::iter::repeat_n(fill_char, missing).collect();
            padded.push_str(receiver);
            Ok(Val::Str(padded))
        }
        ("upper" | "lower" | "trim" | "len", _) => Err(arity("0")),
        ("replace" | "pad", _) => Err(arity("2")),
        ("slice", _) => Err(arity("1 or 2")),
        _ => Err(MutationError::UnknownMethod(name.to_string())),
    }
}

/// Converts a numeric argument into a non-negative char index.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn index_arg(method: &str, value: &Val) -> MutationResult<usize> {
    match value.as_number() {
        Some(n) if n >= 0.0 => Ok(n.floor() as usize),
        _ => Err(MutationError::Parse(format!(
            "{}() expects a non-negative number, got '{}'",
            method, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_addition_on_numeric_value() {
        assert_eq!(evaluate("value + 1000", "4200").unwrap(), "5200");
    }

    #[test]
    fn test_concatenation_when_not_numeric() {
        assert_eq!(evaluate("'--env=' + value", "prod").unwrap(), "--env=prod");
        assert_eq!(evaluate("value + '-ci'", "12").unwrap(), "12-ci");
    }

    #[test]
    fn test_precedence_and_grouping() {
        assert_eq!(evaluate("value * 2 + 1", "3").unwrap(), "7");
        assert_eq!(evaluate("value * (2 + 1)", "3").unwrap(), "9");
        assert_eq!(evaluate("-value + 10", "3").unwrap(), "7");
        assert_eq!(evaluate("value / 4", "10").unwrap(), "2.5");
        assert_eq!(evaluate("value % 4", "10").unwrap(), "2");
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(evaluate("value.upper()", "dev").unwrap(), "DEV");
        assert_eq!(evaluate("value.trim().lower()", "  Prod ").unwrap(), "prod");
        assert_eq!(evaluate("value.replace('_', '-')", "a_b_c").unwrap(), "a-b-c");
        assert_eq!(evaluate("value.slice(1, 3)", "abcdef").unwrap(), "bc");
        assert_eq!(evaluate("value.slice(4)", "abcdef").unwrap(), "ef");
        assert_eq!(evaluate("value.pad(4, '0')", "7").unwrap(), "0007");
        assert_eq!(evaluate("value.len() + 1", "abc").unwrap(), "4");
    }

    #[test]
    fn test_evaluation_errors() {
        assert_eq!(
            evaluate("value / 0", "1").unwrap_err(),
            MutationError::DivideByZero
        );
        assert!(matches!(
            evaluate("value * 2", "abc").unwrap_err(),
            MutationError::Type { op: '*', .. }
        ));
        assert!(matches!(
            evaluate("value.explode()", "x").unwrap_err(),
            MutationError::UnknownMethod(m) if m == "explode"
        ));
        assert!(matches!(
            evaluate("value.upper(1)", "x").unwrap_err(),
            MutationError::Arity { .. }
        ));
    }

    #[test]
    fn test_pad_width_is_bounded() {
        for huge in ["100000000000000000000000", "1e24", "4097"] {
            assert!(matches!(
                evaluate("value.pad(value, '0')", huge).unwrap_err(),
                MutationError::WidthTooLarge { max: MAX_PAD_WIDTH, .. }
            ));
        }
        assert_eq!(evaluate("value.pad(6, '0')", "4096").unwrap(), "004096");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Mutation::parse("value +").unwrap_err(),
            MutationError::Parse(_)
        ));
        assert!(matches!(
            Mutation::parse("process.exit()").unwrap_err(),
            MutationError::Parse(_)
        ));
        assert!(matches!(
            Mutation::parse("value; 1").unwrap_err(),
            MutationError::Lex(';', 5)
        ));
        assert!(matches!(
            Mutation::parse("'open").unwrap_err(),
            MutationError::UnterminatedString(0)
        ));
        assert!(matches!(
            Mutation::parse("value 1").unwrap_err(),
            MutationError::Parse(_)
        ));
    }

    #[test]
    fn test_parsed_mutation_is_deterministic() {
        let mutation = Mutation::parse("value + 1").unwrap();
        assert_eq!(mutation.source(), "value + 1");
        assert_eq!(mutation.apply("41").unwrap(), mutation.apply("41").unwrap());
    }
}
