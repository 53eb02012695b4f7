//! Test expressions for `<if>`, `<when>`, `<bind>` and `<foreach collection>`.
//!
//! A small expression language over bound parameters:
//!
//! - literals: `null`, `true`, `false`, numbers, `'single'` / `"double"` strings
//! - property paths: `title`, `author.name`, `ids.0`
//! - methods on paths: `.size()`, `.length()`, `.isEmpty()`, `.trim()`
//! - comparisons: `==` `!=` `<` `<=` `>` `>=` (also `eq` `neq` `lt` `lte` `gt` `gte`)
//! - boolean: `and` / `&&`, `or` / `||`, `not` / `!`, parentheses
//! - `+` concatenates when either side is a string, adds numbers otherwise
//!
//! Expressions are parsed once when a script is assembled and evaluated per
//! render.

use crate::error::{BuildError, BuildResult};
use crate::param::{Value, is_truthy, to_text};
use std::cmp::Ordering;
use std::fmt;

/// Resolves property paths during evaluation.
pub trait Scope {
    /// Value at `path`, or `None` when unbound.
    fn resolve(&self, path: &[String]) -> Option<Value>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Size,
    IsEmpty,
    Trim,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Path(Vec<String>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Method),
}

/// An expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct TestExpr {
    source: String,
    expr: Expr,
}

impl TestExpr {
    /// Parse an expression.
    pub fn parse(source: &str) -> BuildResult<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            source,
        };
        let expr = parser.parse_or()?;
        if let Some(tok) = parser.peek() {
            return Err(parser.error(format!("unexpected token {tok}")));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The original expression text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate to a value.
    pub fn evaluate(&self, scope: &dyn Scope) -> BuildResult<Value> {
        eval(&self.expr, scope)
    }

    /// Evaluate and apply truthiness.
    pub fn evaluate_bool(&self, scope: &dyn Scope) -> BuildResult<bool> {
        Ok(is_truthy(&self.evaluate(scope)?))
    }
}

impl fmt::Display for TestExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

// ==================== Tokenizer ====================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(Value),
    Str(String),
    Op(&'static str),
    LParen,
    RParen,
    Dot,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "`{s}`"),
            Token::Number(n) => write!(f, "`{n}`"),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Op(op) => write!(f, "`{op}`"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::Dot => f.write_str("`.`"),
        }
    }
}

fn tokenize(source: &str) -> BuildResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => s.push(escaped),
                            None => break,
                        },
                        Some(ch) if ch == quote => {
                            tokens.push(Token::Str(s));
                            break;
                        }
                        Some(ch) => s.push(ch),
                        None => {
                            return Err(BuildError::configuration(format!(
                                "Unterminated string literal in expression `{source}`"
                            )));
                        }
                    }
                }
            }
            c if c.is_ascii_digit() => {
                let mut s = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = if s.contains('.') {
                    s.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(Value::Number)
                } else {
                    s.parse::<i64>().ok().map(Value::from)
                };
                match number {
                    Some(n) => tokens.push(Token::Number(n)),
                    None => {
                        return Err(BuildError::configuration(format!(
                            "Invalid number `{s}` in expression `{source}`"
                        )));
                    }
                }
            }
            c if c == '_' || c.is_alphabetic() => {
                let mut s = String::new();
                while let Some(&d) = chars.peek() {
                    if d == '_' || d.is_alphanumeric() {
                        s.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(s));
            }
            _ => {
                chars.next();
                let next = chars.peek().copied();
                let op = match (c, next) {
                    ('=', Some('=')) => Some("=="),
                    ('!', Some('=')) => Some("!="),
                    ('<', Some('=')) => Some("<="),
                    ('>', Some('=')) => Some(">="),
                    ('&', Some('&')) => Some("&&"),
                    ('|', Some('|')) => Some("||"),
                    _ => None,
                };
                match op {
                    Some(op) => {
                        chars.next();
                        tokens.push(Token::Op(op));
                    }
                    None => {
                        let single = match c {
                            '<' => "<",
                            '>' => ">",
                            '!' => "!",
                            '+' => "+",
                            '-' => "-",
                            '=' => "==",
                            _ => {
                                return Err(BuildError::configuration(format!(
                                    "Unexpected character '{c}' in expression `{source}`"
                                )));
                            }
                        };
                        tokens.push(Token::Op(single));
                    }
                }
            }
        }
    }
    Ok(tokens)
}

// ==================== Parser ====================

struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'s str,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error(&self, message: String) -> BuildError {
        BuildError::configuration(format!("{message} in expression `{}`", self.source))
    }

    /// Consume the next token if it is one of the given operator spellings.
    fn eat_op(&mut self, ops: &[&str]) -> Option<&'static str> {
        let found = match self.peek()? {
            Token::Op(op) if ops.contains(op) => *op,
            Token::Ident(word) => {
                let word = word.to_ascii_lowercase();
                match (word.as_str(), ops) {
                    ("and", o) if o.contains(&"&&") => "&&",
                    ("or", o) if o.contains(&"||") => "||",
                    ("not", o) if o.contains(&"!") => "!",
                    ("eq", o) if o.contains(&"==") => "==",
                    ("neq", o) if o.contains(&"!=") => "!=",
                    ("lt", o) if o.contains(&"<") => "<",
                    ("lte", o) if o.contains(&"<=") => "<=",
                    ("gt", o) if o.contains(&">") => ">",
                    ("gte", o) if o.contains(&">=") => ">=",
                    _ => return None,
                }
            }
            _ => return None,
        };
        self.pos += 1;
        Some(found)
    }

    fn parse_or(&mut self) -> BuildResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_op(&["||"]).is_some() {
            let right = self.parse_and()?;
            left = Expr::Binary(BinaryOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> BuildResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_op(&["&&"]).is_some() {
            let right = self.parse_not()?;
            left = Expr::Binary(BinaryOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> BuildResult<Expr> {
        if self.eat_op(&["!"]).is_some() {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> BuildResult<Expr> {
        let left = self.parse_additive()?;
        let Some(op) = self.eat_op(&["==", "!=", "<", "<=", ">", ">="]) else {
            return Ok(left);
        };
        let op = match op {
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            _ => BinaryOp::Ge,
        };
        let right = self.parse_additive()?;
        Ok(Expr::Binary(op, Box::new(left), Box::new(right)))
    }

    fn parse_additive(&mut self) -> BuildResult<Expr> {
        let mut left = self.parse_unary()?;
        while let Some(op) = self.eat_op(&["+", "-"]) {
            let op = if op == "+" { BinaryOp::Add } else { BinaryOp::Sub };
            let right = self.parse_unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> BuildResult<Expr> {
        if self.eat_op(&["-"]).is_some() {
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> BuildResult<Expr> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => self.parse_postfix(inner),
                    _ => Err(self.error("expected `)`".to_string())),
                }
            }
            Some(Token::Number(n)) => Ok(Expr::Literal(n)),
            Some(Token::Str(s)) => self.parse_postfix(Expr::Literal(Value::String(s))),
            Some(Token::Ident(word)) => match word.as_str() {
                "null" => Ok(Expr::Literal(Value::Null)),
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                _ => self.parse_path(word),
            },
            Some(tok) => Err(self.error(format!("unexpected token {tok}"))),
            None => Err(self.error("unexpected end".to_string())),
        }
    }

    fn parse_path(&mut self, first: String) -> BuildResult<Expr> {
        let mut segments = vec![first];
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            let segment = match self.next() {
                Some(Token::Ident(s)) => s,
                Some(Token::Number(Value::Number(n))) if n.is_u64() => n.to_string(),
                _ => return Err(self.error("expected property name after `.`".to_string())),
            };
            if self.peek() == Some(&Token::LParen) {
                let method = self.parse_call(&segment)?;
                return self.parse_postfix(Expr::Call(Box::new(Expr::Path(segments)), method));
            }
            segments.push(segment);
        }
        Ok(Expr::Path(segments))
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> BuildResult<Expr> {
        while self.peek() == Some(&Token::Dot) {
            self.pos += 1;
            let Some(Token::Ident(name)) = self.next() else {
                return Err(self.error("expected method name after `.`".to_string()));
            };
            let method = self.parse_call(&name)?;
            expr = Expr::Call(Box::new(expr), method);
        }
        Ok(expr)
    }

    fn parse_call(&mut self, name: &str) -> BuildResult<Method> {
        if self.next() != Some(Token::LParen) || self.next() != Some(Token::RParen) {
            return Err(self.error(format!("expected `{name}()`")));
        }
        match name {
            "size" | "length" => Ok(Method::Size),
            "isEmpty" => Ok(Method::IsEmpty),
            "trim" => Ok(Method::Trim),
            _ => Err(self.error(format!("unknown method `{name}`"))),
        }
    }
}

// ==================== Evaluation ====================

fn eval(expr: &Expr, scope: &dyn Scope) -> BuildResult<Value> {
    Ok(match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Path(path) => scope.resolve(path).unwrap_or(Value::Null),
        Expr::Not(inner) => Value::Bool(!is_truthy(&eval(inner, scope)?)),
        Expr::Neg(inner) => match as_f64(&eval(inner, scope)?) {
            Some(n) => number(-n),
            None => Value::Null,
        },
        Expr::Call(target, method) => call(eval(target, scope)?, *method),
        Expr::Binary(BinaryOp::And, l, r) => {
            Value::Bool(is_truthy(&eval(l, scope)?) && is_truthy(&eval(r, scope)?))
        }
        Expr::Binary(BinaryOp::Or, l, r) => {
            Value::Bool(is_truthy(&eval(l, scope)?) || is_truthy(&eval(r, scope)?))
        }
        Expr::Binary(op, l, r) => {
            let (l, r) = (eval(l, scope)?, eval(r, scope)?);
            match op {
                BinaryOp::Eq => Value::Bool(loose_eq(&l, &r)),
                BinaryOp::Ne => Value::Bool(!loose_eq(&l, &r)),
                BinaryOp::Add => add(&l, &r),
                BinaryOp::Sub => match (as_f64(&l), as_f64(&r)) {
                    (Some(a), Some(b)) => number(a - b),
                    _ => Value::Null,
                },
                _ => {
                    let ordering = compare(&l, &r);
                    Value::Bool(match (op, ordering) {
                        (_, None) => false,
                        (BinaryOp::Lt, Some(o)) => o == Ordering::Less,
                        (BinaryOp::Le, Some(o)) => o != Ordering::Greater,
                        (BinaryOp::Gt, Some(o)) => o == Ordering::Greater,
                        (_, Some(o)) => o != Ordering::Less,
                    })
                }
            }
        }
    })
}

fn call(target: Value, method: Method) -> Value {
    match (method, target) {
        (Method::Size, Value::Array(a)) => Value::from(a.len()),
        (Method::Size, Value::Object(o)) => Value::from(o.len()),
        (Method::Size, Value::String(s)) => Value::from(s.chars().count()),
        (Method::IsEmpty, Value::Array(a)) => Value::Bool(a.is_empty()),
        (Method::IsEmpty, Value::Object(o)) => Value::Bool(o.is_empty()),
        (Method::IsEmpty, Value::String(s)) => Value::Bool(s.is_empty()),
        (Method::IsEmpty, Value::Null) => Value::Bool(true),
        (Method::Trim, Value::String(s)) => Value::String(s.trim().to_string()),
        _ => Value::Null,
    }
}

fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn add(l: &Value, r: &Value) -> Value {
    if l.is_string() || r.is_string() {
        return Value::String(format!("{}{}", to_text(l), to_text(r)));
    }
    match (as_f64(l), as_f64(r)) {
        (Some(a), Some(b)) => number(a + b),
        _ => Value::Null,
    }
}

fn loose_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), _) | (_, Value::Number(_)) => match (as_f64(l), as_f64(r)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => l == r,
    }
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => as_f64(l)?.partial_cmp(&as_f64(r)?),
    }
}
