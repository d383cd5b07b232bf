// src/parser.rs
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use thiserror::Error;

use crate::node::Node;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{0}")]
    InvalidSyntax(String),
}

impl From<String> for ParseError {
    fn from(msg: String) -> Self {
        ParseError::InvalidSyntax(msg)
    }
}

/// Anything that turns expression text into a syntax tree.
pub trait ExpressionParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Node, ParseError>;
}

impl<F> ExpressionParser for F
where
    F: Fn(&str) -> Result<Node, ParseError> + Send + Sync,
{
    fn parse(&self, text: &str) -> Result<Node, ParseError> {
        self(text)
    }
}

const DEFAULT_BINARY_OPS: &[(&str, u8)] = &[
    ("||", 1),
    ("&&", 2),
    ("|", 3),
    ("^", 4),
    ("&", 5),
    ("==", 6),
    ("!=", 6),
    ("===", 6),
    ("!==", 6),
    ("<", 7),
    (">", 7),
    ("<=", 7),
    (">=", 7),
    ("<<", 8),
    (">>", 8),
    (">>>", 8),
    ("+", 9),
    ("-", 9),
    ("*", 10),
    ("/", 10),
    ("%", 10),
];

const DEFAULT_UNARY_OPS: &[&str] = &["-", "!", "~", "+"];

/// Precedence-climbing parser for JavaScript-like expressions.
///
/// The operator sets only decide which trees can be produced; how an operator
/// behaves is decided by the evaluator's operator registry.
#[derive(Debug, Clone)]
pub struct DefaultParser {
    binary_ops: BTreeMap<String, u8>,
    unary_ops: BTreeSet<String>,
}

impl Default for DefaultParser {
    fn default() -> Self {
        Self {
            binary_ops: DEFAULT_BINARY_OPS
                .iter()
                .map(|(op, prec)| ((*op).to_string(), *prec))
                .collect(),
            unary_ops: DEFAULT_UNARY_OPS.iter().map(|op| (*op).to_string()).collect(),
        }
    }
}

impl DefaultParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recognize `op` as a binary operator. Higher precedence binds tighter.
    pub fn with_binary_op(mut self, op: impl Into<String>, precedence: u8) -> Self {
        self.binary_ops.insert(op.into(), precedence);
        self
    }

    pub fn without_binary_op(mut self, op: &str) -> Self {
        self.binary_ops.remove(op);
        self
    }

    pub fn with_unary_op(mut self, op: impl Into<String>) -> Self {
        self.unary_ops.insert(op.into());
        self
    }

    pub fn without_unary_op(mut self, op: &str) -> Self {
        self.unary_ops.remove(op);
        self
    }
}

impl ExpressionParser for DefaultParser {
    fn parse(&self, text: &str) -> Result<Node, ParseError> {
        let mut p = ExprParser { cursor: Parser::new(text), grammar: self };
        p.parse_program()
    }
}

/// Parse with the default grammar.
pub fn parse(text: &str) -> Result<Node, ParseError> {
    DefaultParser::default().parse(text)
}

struct ExprParser<'a, 'g> {
    cursor: Parser<'a>,
    grammar: &'g DefaultParser,
}

impl<'a, 'g> ExprParser<'a, 'g> {
    fn error(&self, msg: impl std::fmt::Display) -> ParseError {
        ParseError::InvalidSyntax(format!("{msg} at character {}", self.cursor.i))
    }

    /// Top level: expressions separated by `,` or `;`. More than one becomes a Compound.
    fn parse_program(&mut self) -> Result<Node, ParseError> {
        let mut nodes = Vec::new();
        loop {
            self.cursor.skip_ws();
            let Some(c) = self.cursor.peek_char() else { break };
            if c == ',' || c == ';' {
                self.cursor.bump(c);
                continue;
            }
            match self.parse_expression()? {
                Some(node) => nodes.push(node),
                None => return Err(self.error(format!("Unexpected \"{c}\""))),
            }
        }
        if nodes.len() == 1 {
            Ok(nodes.remove(0))
        } else {
            Ok(Node::Compound { body: nodes })
        }
    }

    fn require_expression(&mut self, context: &str) -> Result<Node, ParseError> {
        match self.parse_expression()? {
            Some(node) => Ok(node),
            None => Err(self.error(format!("Expected expression {context}"))),
        }
    }

    fn parse_expression(&mut self) -> Result<Option<Node>, ParseError> {
        let Some(test) = self.parse_binary_expression()? else {
            return Ok(None);
        };
        self.cursor.skip_ws();
        if !self.cursor.consume_char('?') {
            return Ok(Some(test));
        }
        let consequent = self.require_expression("after '?'")?;
        self.cursor.skip_ws();
        if !self.cursor.consume_char(':') {
            return Err(self.error("Expected ':'"));
        }
        let alternate = self.require_expression("after ':'")?;
        Ok(Some(Node::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }))
    }

    fn parse_binary_op(&mut self) -> Option<(String, u8)> {
        self.cursor.skip_ws();
        let rest = self.cursor.rest();
        let op = self
            .grammar
            .binary_ops
            .iter()
            .filter(|(op, _)| rest.starts_with(op.as_str()))
            .filter(|(op, _)| !self.splits_identifier(op))
            .max_by_key(|(op, _)| op.len())
            .map(|(op, prec)| (op.clone(), *prec))?;
        // `=>` belongs to arrow functions, not to a `=` operator a host may have added.
        if rest[op.0.len()..].starts_with('>') && op.0 == "=" {
            return None;
        }
        self.cursor.i += op.0.len();
        Some(op)
    }

    /// Word operators such as `in` must not match the start of an identifier.
    fn splits_identifier(&self, op: &str) -> bool {
        let ends_in_word = op.chars().last().is_some_and(is_identifier_part);
        ends_in_word
            && self.cursor.rest()[op.len()..]
                .chars()
                .next()
                .is_some_and(is_identifier_part)
    }

    fn parse_binary_expression(&mut self) -> Result<Option<Node>, ParseError> {
        let Some(left) = self.parse_token()? else {
            return Ok(None);
        };
        let mut operands = vec![left];
        let mut operators: Vec<(String, u8)> = Vec::new();

        while let Some((op, prec)) = self.parse_binary_op() {
            while operators.last().is_some_and(|(_, top)| prec <= *top) {
                reduce(&mut operands, &mut operators);
            }
            let Some(right) = self.parse_token()? else {
                return Err(self.error(format!("Expected expression after {op}")));
            };
            operators.push((op, prec));
            operands.push(right);
        }
        while !operators.is_empty() {
            reduce(&mut operands, &mut operators);
        }
        Ok(operands.pop())
    }

    fn parse_token(&mut self) -> Result<Option<Node>, ParseError> {
        ensure_sufficient_stack(|| self.parse_token_inner())
    }

    fn parse_token_inner(&mut self) -> Result<Option<Node>, ParseError> {
        self.cursor.skip_ws();
        let Some(c) = self.cursor.peek_char() else {
            return Ok(None);
        };

        let node = if c.is_ascii_digit() || (c == '.' && self.next_is_digit()) {
            self.parse_number()?
        } else if c == '"' || c == '\'' {
            let value = self.cursor.parse_quoted_string().map_err(|e| self.error(e))?;
            Node::Literal { raw: format!("{c}{value}{c}"), value: Value::String(value) }
        } else if c == '[' {
            self.cursor.bump(c);
            Node::Array { elements: self.parse_arguments(']')? }
        } else if let Some(op) = self.match_unary_op() {
            self.cursor.i += op.len();
            let Some(argument) = self.parse_token()? else {
                return Err(self.error("missing unary operator argument"));
            };
            return Ok(Some(Node::Unary { operator: op, argument: Box::new(argument), prefix: true }));
        } else if is_identifier_start(c) {
            let name = self.cursor.parse_identifier()?;
            match name.as_str() {
                "true" => Node::Literal { value: Value::Bool(true), raw: name },
                "false" => Node::Literal { value: Value::Bool(false), raw: name },
                "null" => Node::Literal { value: Value::Null, raw: name },
                "this" => Node::This {},
                _ => {
                    let ident = Node::Identifier { name };
                    if self.consume_arrow() {
                        return self.parse_arrow_body(vec![ident]).map(Some);
                    }
                    ident
                }
            }
        } else if c == '(' {
            self.cursor.bump(c);
            let mut nodes = self.parse_group()?;
            if self.consume_arrow() {
                return self.parse_arrow_body(nodes).map(Some);
            }
            match nodes.len() {
                0 => return Err(self.error("Empty group expression")),
                1 => nodes.remove(0),
                _ => Node::Compound { body: nodes },
            }
        } else {
            return Ok(None);
        };

        self.parse_suffixes(node).map(Some)
    }

    fn next_is_digit(&self) -> bool {
        self.cursor.rest().chars().nth(1).is_some_and(|c| c.is_ascii_digit())
    }

    fn match_unary_op(&self) -> Option<String> {
        let rest = self.cursor.rest();
        self.grammar
            .unary_ops
            .iter()
            .filter(|op| rest.starts_with(op.as_str()))
            .filter(|op| !self.splits_identifier(op))
            .max_by_key(|op| op.len())
            .cloned()
    }

    /// Member access and call suffixes: `.name`, `[expr]`, `(args)`.
    fn parse_suffixes(&mut self, mut node: Node) -> Result<Node, ParseError> {
        loop {
            self.cursor.skip_ws();
            match self.cursor.peek_char() {
                Some('.') => {
                    self.cursor.bump('.');
                    self.cursor.skip_ws();
                    let name = self
                        .cursor
                        .parse_identifier()
                        .map_err(|_| self.error("Expected identifier after '.'"))?;
                    node = Node::member(node, Node::Identifier { name }, false);
                }
                Some('[') => {
                    self.cursor.bump('[');
                    let property = self.require_expression("inside '[]'")?;
                    self.cursor.skip_ws();
                    if !self.cursor.consume_char(']') {
                        return Err(self.error("Unclosed ["));
                    }
                    node = Node::member(node, property, true);
                }
                Some('(') => {
                    self.cursor.bump('(');
                    let arguments = self.parse_arguments(')')?;
                    node = Node::call(node, arguments);
                }
                _ => return Ok(node),
            }
        }
    }

    /// Comma separated expressions up to `end`, which is consumed.
    fn parse_arguments(&mut self, end: char) -> Result<Vec<Node>, ParseError> {
        let mut out = Vec::new();
        self.cursor.skip_ws();
        if self.cursor.consume_char(end) {
            return Ok(out);
        }
        loop {
            out.push(self.require_expression("in list")?);
            self.cursor.skip_ws();
            if self.cursor.consume_char(',') {
                continue;
            }
            if self.cursor.consume_char(end) {
                return Ok(out);
            }
            return Err(self.error(format!("Expected ',' or '{end}'")));
        }
    }

    /// Contents of a parenthesized group, after the opening `(`.
    fn parse_group(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            self.cursor.skip_ws();
            match self.cursor.peek_char() {
                None => return Err(self.error("Unclosed (")),
                Some(')') => {
                    self.cursor.bump(')');
                    return Ok(nodes);
                }
                Some(c @ (',' | ';')) => self.cursor.bump(c),
                Some(c) => match self.parse_expression()? {
                    Some(node) => nodes.push(node),
                    None => return Err(self.error(format!("Unexpected \"{c}\""))),
                },
            }
        }
    }

    fn consume_arrow(&mut self) -> bool {
        self.cursor.skip_ws();
        if self.cursor.peek_str("=>") {
            self.cursor.i += 2;
            true
        } else {
            false
        }
    }

    fn parse_arrow_body(&mut self, params: Vec<Node>) -> Result<Node, ParseError> {
        if let Some(bad) = params.iter().find(|p| !matches!(p, Node::Identifier { .. })) {
            return Err(self.error(format!("Invalid arrow parameter: {}", bad.tag())));
        }
        let body = self.require_expression("after '=>'")?;
        Ok(Node::Arrow { params, body: Arc::new(body) })
    }

    fn parse_number(&mut self) -> Result<Node, ParseError> {
        let start = self.cursor.i;
        self.cursor.skip_digits();
        if self.cursor.consume_char('.') {
            self.cursor.skip_digits();
        }
        if matches!(self.cursor.peek_char(), Some('e' | 'E')) {
            self.cursor.i += 1;
            if matches!(self.cursor.peek_char(), Some('+' | '-')) {
                self.cursor.i += 1;
            }
            let exp_start = self.cursor.i;
            self.cursor.skip_digits();
            if self.cursor.i == exp_start {
                return Err(self.error("Expected exponent"));
            }
        }
        let raw = &self.cursor.s[start..self.cursor.i];
        if let Some(c) = self.cursor.peek_char() {
            if is_identifier_start(c) {
                return Err(self.error("Variable names cannot start with a number"));
            }
            if c == '.' {
                return Err(self.error("Unexpected period"));
            }
        }
        let value: f64 = raw.parse().map_err(|_| self.error(format!("bad number {raw}")))?;
        Ok(Node::Literal { value: Value::Number(value), raw: raw.to_string() })
    }
}

fn reduce(operands: &mut Vec<Node>, operators: &mut Vec<(String, u8)>) {
    if let (Some((op, _)), Some(right), Some(left)) = (operators.pop(), operands.pop(), operands.pop()) {
        operands.push(Node::binary(op, left, right));
    }
}

fn is_identifier_start(c: char) -> bool {
    c == '$' || c == '_' || c.is_alphabetic()
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

/// Character cursor over the input text.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        if let Some(c) = self.peek_char().filter(|c| is_identifier_start(*c)) {
            self.bump(c);
            while let Some(c) = self.peek_char().filter(|c| is_identifier_part(*c)) {
                self.bump(c);
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax("identifier expected".into()));
        }
        Ok(self.s[start..self.i].to_string())
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let quote = self
            .peek_char()
            .ok_or_else(|| ParseError::InvalidSyntax("string".into()))?;
        if quote != '\'' && quote != '"' {
            return Err(ParseError::InvalidSyntax("expected quoted string".into()));
        }
        self.bump(quote);
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.bump(c);
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                let Some(nc) = self.peek_char() else { break };
                self.bump(nc);
                match nc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'v' => out.push('\u{b}'),
                    other => out.push(other),
                }
            } else {
                out.push(c);
            }
        }
        Err(ParseError::InvalidSyntax("unterminated string".into()))
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.bump(c);
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.rest().starts_with(lit)
    }

    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }

    fn bump(&mut self, c: char) {
        self.i += c.len_utf8();
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.i += 1;
        }
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.bump(c);
            } else {
                break;
            }
        }
    }

}
