use super::ast::{Expression, PathRoot};
use crate::error::ExprError;
use serde_json::Value;

/// Parses a rule condition into an [`Expression`].
///
/// The grammar is deliberately small: boolean connectives, comparisons,
/// literals and dotted member access rooted at `data`, `itemData`,
/// `ctx` or `user`. Anything else is a parse error, which the rule
/// layer treats as an always-false rule.
pub fn parse(source: &str) -> Result<Expression, ExprError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.peek() {
        Some(token) => Err(ExprError::TrailingInput(token.offset)),
        None => Ok(expr),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Number(f64),
    Str(String),
    LParen,
    RParen,
    Dot,
    Bang,
    AndAnd,
    OrOr,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

impl Token {
    fn describe(&self) -> String {
        match &self.kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Str(s) => format!("'{}'", s),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Dot => ".".to_string(),
            TokenKind::Bang => "!".to_string(),
            TokenKind::AndAnd => "&&".to_string(),
            TokenKind::OrOr => "||".to_string(),
            TokenKind::EqEq => "==".to_string(),
            TokenKind::NotEq => "!=".to_string(),
            TokenKind::Lt => "<".to_string(),
            TokenKind::LtEq => "<=".to_string(),
            TokenKind::Gt => ">".to_string(),
            TokenKind::GtEq => ">=".to_string(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let offset = i;
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
            }
            '(' => {
                tokens.push(Token { kind: TokenKind::LParen, offset });
                i += 1;
            }
            ')' => {
                tokens.push(Token { kind: TokenKind::RParen, offset });
                i += 1;
            }
            '.' => {
                tokens.push(Token { kind: TokenKind::Dot, offset });
                i += 1;
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token { kind: TokenKind::AndAnd, offset });
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar(c, offset));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token { kind: TokenKind::OrOr, offset });
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar(c, offset));
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::EqEq, offset });
                    i += 2;
                } else {
                    return Err(ExprError::UnexpectedChar(c, offset));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::NotEq, offset });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Bang, offset });
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::LtEq, offset });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Lt, offset });
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token { kind: TokenKind::GtEq, offset });
                    i += 2;
                } else {
                    tokens.push(Token { kind: TokenKind::Gt, offset });
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            value.push(ch);
                            i += 1;
                        }
                        None => return Err(ExprError::UnterminatedString(offset)),
                    }
                }
                tokens.push(Token { kind: TokenKind::Str(value), offset });
            }
            '0'..='9' => {
                let mut end = i;
                while end < chars.len() && (chars[end].is_ascii_digit() || chars[end] == '.') {
                    // A dot only continues the number when a digit follows,
                    // so `data.0` style input still errors cleanly.
                    if chars[end] == '.'
                        && !chars.get(end + 1).is_some_and(|c| c.is_ascii_digit())
                    {
                        break;
                    }
                    end += 1;
                }
                let text: String = chars[i..end].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| ExprError::UnexpectedChar(c, offset))?;
                tokens.push(Token { kind: TokenKind::Number(number), offset });
                i = end;
            }
            _ if c.is_alphabetic() || c == '_' => {
                let mut end = i;
                while end < chars.len()
                    && (chars[end].is_alphanumeric() || chars[end] == '_' || chars[end] == '-')
                {
                    end += 1;
                }
                let name: String = chars[i..end].iter().collect();
                tokens.push(Token { kind: TokenKind::Ident(name), offset });
                i = end;
            }
            _ => return Err(ExprError::UnexpectedChar(c, offset)),
        }
    }

    Ok(tokens)
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

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<(), ExprError> {
        match self.advance() {
            Some(token) if token.kind == *kind => Ok(()),
            Some(token) => Err(ExprError::UnexpectedToken {
                found: token.describe(),
                expected: expected.to_string(),
                offset: token.offset,
            }),
            None => Err(ExprError::UnexpectedEnd(expected.to_string())),
        }
    }

    fn or_expr(&mut self) -> Result<Expression, ExprError> {
        let mut left = self.and_expr()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::OrOr)) {
            self.advance();
            let right = self.and_expr()?;
            left = Expression::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expression, ExprError> {
        let mut left = self.unary_expr()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::AndAnd)) {
            self.advance();
            let right = self.unary_expr()?;
            left = Expression::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary_expr(&mut self) -> Result<Expression, ExprError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Bang)) {
            self.advance();
            let inner = self.unary_expr()?;
            return Ok(Expression::Not(Box::new(inner)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expression, ExprError> {
        let left = self.term()?;
        let op = match self.peek().map(|t| t.kind.clone()) {
            Some(TokenKind::EqEq) => Expression::Equal,
            Some(TokenKind::NotEq) => Expression::NotEqual,
            Some(TokenKind::Gt) => Expression::GreaterThan,
            Some(TokenKind::GtEq) => Expression::GreaterThanOrEqual,
            Some(TokenKind::Lt) => Expression::SmallerThan,
            Some(TokenKind::LtEq) => Expression::SmallerThanOrEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.term()?;
        Ok(op(Box::new(left), Box::new(right)))
    }

    fn term(&mut self) -> Result<Expression, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd("a value".to_string()));
        };

        match token.kind {
            TokenKind::Number(n) => {
                let number = serde_json::Number::from_f64(n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
                Ok(Expression::Literal(number))
            }
            TokenKind::Str(s) => Ok(Expression::Literal(Value::String(s))),
            TokenKind::LParen => {
                let inner = self.or_expr()?;
                self.expect(&TokenKind::RParen, ")")?;
                Ok(inner)
            }
            TokenKind::Ident(name) => match name.as_str() {
                "true" => Ok(Expression::Literal(Value::Bool(true))),
                "false" => Ok(Expression::Literal(Value::Bool(false))),
                "null" => Ok(Expression::Literal(Value::Null)),
                _ => {
                    let root =
                        PathRoot::parse(&name).ok_or(ExprError::UnknownRoot(name.clone()))?;
                    let mut segments = Vec::new();
                    while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Dot)) {
                        self.advance();
                        match self.advance() {
                            Some(Token { kind: TokenKind::Ident(segment), .. }) => {
                                segments.push(segment);
                            }
                            Some(token) => {
                                return Err(ExprError::UnexpectedToken {
                                    found: token.describe(),
                                    expected: "a member name".to_string(),
                                    offset: token.offset,
                                });
                            }
                            None => {
                                return Err(ExprError::UnexpectedEnd(
                                    "a member name".to_string(),
                                ));
                            }
                        }
                    }
                    Ok(Expression::Path(root, segments))
                }
            },
            _ => Err(ExprError::UnexpectedToken {
                found: token.describe(),
                expected: "a value".to_string(),
                offset: token.offset,
            }),
        }
    }
}
