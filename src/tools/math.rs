//! Arithmetic expression evaluation for the `calculate` tool.
//!
//! Expressions are parsed with a small recursive-descent parser over a fixed
//! grammar, so nothing but arithmetic can ever be evaluated:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' unary)?
//! primary := number | ident | ident '(' expr ')' | '(' expr ')'
//! ```

use serde_json::json;
use thiserror::Error;

use crate::mcp::{handler_fn, ToolDefinition};
use crate::models::{ParamSpec, ParamType};

const MAX_EXPRESSION_LEN: usize = 1024;
const MAX_DEPTH: usize = 64;

#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("expression is empty")]
    Empty,

    #[error("expression longer than 1024 characters")]
    TooLong,

    #[error("expression nested too deeply")]
    TooDeep,

    #[error("unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {0}")]
    UnexpectedToken(String),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition::new(
        "calculate",
        "Evaluate an arithmetic expression. Supports + - * / % ^, parentheses, \
         pi, e and sqrt, abs, sin, cos, tan, ln, log10, floor, ceil, round.",
        handler_fn(|args| {
            let expression = args.str("expression")?;
            let result = evaluate(expression)?;
            Ok(json!({ "expression": expression, "result": result }))
        }),
    )
    .param(
        ParamSpec::required("expression", ParamType::String)
            .describe("Expression to evaluate, e.g. '2 * (3 + 4) ^ 2'"),
    )]
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    if expression.chars().count() > MAX_EXPRESSION_LEN {
        return Err(EvalError::TooLong);
    }

    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(EvalError::UnexpectedToken(token.describe()));
    }

    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::NotFinite)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Op(c) => format!("operator '{}'", c),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // scientific notation: 1e-3
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| EvalError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(EvalError::UnexpectedChar(other, i)),
        }
    }

    Ok(tokens)
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

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(c)) if ops.contains(c) => {
                let c = *c;
                self.pos += 1;
                Some(c)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), EvalError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(EvalError::UnexpectedToken(token.describe())),
            None => Err(EvalError::UnexpectedToken("end of expression".to_string())),
        }
    }

    fn descend(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(EvalError::TooDeep)
        } else {
            Ok(())
        }
    }

    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(EvalError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, EvalError> {
        self.descend()?;
        let result = match self.eat_op(&['-', '+']) {
            Some('-') => self.unary().map(|v| -v),
            Some(_) => self.unary(),
            None => self.power(),
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            let exponent = self.unary()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn primary(&mut self) -> Result<f64, EvalError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.descend()?;
                    let arg = self.expr()?;
                    self.depth -= 1;
                    self.expect(Token::RParen)?;
                    apply_function(&name, arg)
                } else {
                    constant(&name)
                }
            }
            Some(token) => Err(EvalError::UnexpectedToken(token.describe())),
            None => Err(EvalError::UnexpectedToken("end of expression".to_string())),
        }
    }
}

fn constant(name: &str) -> Result<f64, EvalError> {
    match name {
        "pi" => Ok(std::f64::consts::PI),
        "e" => Ok(std::f64::consts::E),
        "tau" => Ok(std::f64::consts::TAU),
        _ => Err(EvalError::UnknownIdentifier(name.to_string())),
    }
}

fn apply_function(name: &str, arg: f64) -> Result<f64, EvalError> {
    let value = match name {
        "sqrt" => arg.sqrt(),
        "abs" => arg.abs(),
        "sin" => arg.sin(),
        "cos" => arg.cos(),
        "tan" => arg.tan(),
        "ln" => arg.ln(),
        "log10" => arg.log10(),
        "floor" => arg.floor(),
        "ceil" => arg.ceil(),
        "round" => arg.round(),
        _ => return Err(EvalError::UnknownIdentifier(name.to_string())),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("2 ^ -1").unwrap(), 0.5);
        assert_eq!(evaluate("7 % 4").unwrap(), 3.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert_eq!(evaluate("sqrt(16) + abs(-2)").unwrap(), 6.0);
        assert!(approx(evaluate("cos(pi)").unwrap(), -1.0));
        assert!(approx(evaluate("ln(e)").unwrap(), 1.0));
        assert_eq!(evaluate("round(2.5) + floor(1.9)").unwrap(), 4.0);
        assert_eq!(evaluate("1.5e2").unwrap(), 150.0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate(""), Err(EvalError::Empty));
        assert_eq!(evaluate("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("5 % 0"), Err(EvalError::DivisionByZero));
        assert_eq!(evaluate("sqrt(-1)"), Err(EvalError::NotFinite));
        assert_eq!(
            evaluate("import os"),
            Err(EvalError::UnknownIdentifier("import".to_string()))
        );
        assert!(matches!(evaluate("1 +"), Err(EvalError::UnexpectedToken(_))));
        assert!(matches!(evaluate("(1"), Err(EvalError::UnexpectedToken(_))));
        assert!(matches!(evaluate("1 2"), Err(EvalError::UnexpectedToken(_))));
        assert!(matches!(evaluate("1; 2"), Err(EvalError::UnexpectedChar(';', 1))));
        assert!(matches!(evaluate("1..2"), Err(EvalError::InvalidNumber(_))));
    }

    #[test]
    fn test_depth_limit() {
        let nested = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(evaluate(&nested), Err(EvalError::TooDeep));
        assert_eq!(evaluate(&"-".repeat(100)), Err(EvalError::TooDeep));
    }

    #[test]
    fn test_length_limit_counts_characters() {
        // 1004 characters but over 3000 bytes
        let wide = format!("1 +{}2", "\u{3000}".repeat(1000));
        assert_eq!(evaluate(&wide), Ok(3.0));

        let long = format!("{}1", "1+".repeat(MAX_EXPRESSION_LEN / 2));
        assert_eq!(evaluate(&long), Err(EvalError::TooLong));
    }
}
