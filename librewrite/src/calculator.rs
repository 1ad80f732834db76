// librewrite/src/calculator.rs
//
// Arithmetic evaluation of conversion keys such as "1+2=" or "=(3+4)*2".
//
// The key must carry exactly one "=" at its start or end, and at least one
// binary operator. Full-width characters and the kana spellings produced by
// romaji input ("ー" for minus, "・" for slash) are accepted.

use librewrite_core::utils;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Evaluates expression text; `None` means "not an expression".
pub trait Calculator: Send + Sync {
    fn calculate(&self, key: &str) -> Option<String>;
}

static EXPRESSION_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9.+\-*/%^()]+$").expect("valid expression regex"));

/// Spellings folded onto ASCII operators after NFKC normalization.
static OPERATOR_ALIASES: Lazy<HashMap<char, char>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert('ー', '-');
    m.insert('−', '-');
    m.insert('・', '/');
    m.insert('÷', '/');
    m.insert('×', '*');
    m
});

/// Deepest nesting of parentheses, unary signs and exponents accepted in
/// one key.
pub const MAX_NESTING: usize = 64;

/// Recursive-descent evaluator over `f64`.
///
/// Precedence, loosest first: `+ -`, `* / %`, unary sign, `^`
/// (right-associative). `%` is the remainder. Keys nested deeper than
/// `MAX_NESTING` are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticCalculator;

impl ArithmeticCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Strip the "=" marker and fold operator spellings; `None` if the key
    /// cannot be an expression.
    fn normalize(key: &str) -> Option<String> {
        let folded: String = utils::normalize(key)
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| OPERATOR_ALIASES.get(&c).copied().unwrap_or(c))
            .collect();

        if folded.matches('=').count() != 1 {
            return None;
        }
        let body = if let Some(rest) = folded.strip_prefix('=') {
            rest
        } else {
            folded.strip_suffix('=')?
        };
        if body.is_empty() || !EXPRESSION_CHARS.is_match(body) {
            return None;
        }
        Some(body.to_string())
    }
}

impl Calculator for ArithmeticCalculator {
    fn calculate(&self, key: &str) -> Option<String> {
        let body = Self::normalize(key)?;
        let mut parser = Parser::new(&body);
        let value = parser.expression()?;
        if !parser.at_end() || parser.binary_ops == 0 || !value.is_finite() {
            return None;
        }
        Some(format_number(value))
    }
}

struct Parser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    binary_ops: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            binary_ops: 0,
            depth: 0,
        }
    }

    /// Run `f` one nesting level deeper; `None` past `MAX_NESTING`.
    fn nested<F>(&mut self, f: F) -> Option<f64>
    where
        F: FnOnce(&mut Self) -> Option<f64>,
    {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let value = f(self);
        self.depth -= 1;
        value
    }

    fn at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn expression(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Some(value);
            }
            self.binary_ops += 1;
        }
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.unary()?;
        loop {
            if self.eat('*') {
                value *= self.unary()?;
            } else if self.eat('/') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return None;
                }
                value /= rhs;
            } else if self.eat('%') {
                let rhs = self.unary()?;
                if rhs == 0.0 {
                    return None;
                }
                value %= rhs;
            } else {
                return Some(value);
            }
            self.binary_ops += 1;
        }
    }

    fn unary(&mut self) -> Option<f64> {
        if self.eat('-') {
            return self.nested(|p| p.unary()).map(|v| -v);
        }
        if self.eat('+') {
            return self.nested(|p| p.unary());
        }
        self.power()
    }

    fn power(&mut self) -> Option<f64> {
        let base = self.primary()?;
        if self.eat('^') {
            self.binary_ops += 1;
            let exponent = self.nested(|p| p.unary())?;
            return Some(base.powf(exponent));
        }
        Some(base)
    }

    fn primary(&mut self) -> Option<f64> {
        if self.eat('(') {
            let value = self.nested(|p| p.expression())?;
            return if self.eat(')') { Some(value) } else { None };
        }
        self.number()
    }

    fn number(&mut self) -> Option<f64> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '.' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if !text.chars().any(|c| c.is_ascii_digit()) || text.matches('.').count() > 1 {
            return None;
        }
        text.parse().ok()
    }
}

/// Integers print without a fraction; other values keep up to ten decimals.
fn format_number(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    if value.abs() >= 1e15 || value.abs() < 1e-6 {
        return format!("{:e}", value);
    }
    let fixed = format!("{:.10}", value);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}
