//! Parser for the media library's collection query language.
//!
//! Queries are parsed locally so that malformed input is rejected before
//! anything is sent over the bus. A parsed [`Collection`] renders back to a
//! canonical query string via `Display`.
//!
//! ```text
//! artist:"Daft Punk" AND NOT genre~live
//! (album:Discovery OR #12,40-45) +tracknr
//! ```

use std::fmt;
use std::ops::RangeInclusive;

use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MatchOp {
    /// `field:value`, `*` acts as a wildcard.
    Equals,
    /// `field~value`, case-insensitive substring.
    Contains,
    /// `field<number`
    Smaller,
    /// `field>number`
    Greater,
}

impl MatchOp {
    fn from_char(c: char) -> Option<Self> {
        match c {
            ':' => Some(Self::Equals),
            '~' => Some(Self::Contains),
            '<' => Some(Self::Smaller),
            '>' => Some(Self::Greater),
            _ => None,
        }
    }

    fn symbol(self) -> char {
        match self {
            Self::Equals => ':',
            Self::Contains => '~',
            Self::Smaller => '<',
            Self::Greater => '>',
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Self::Smaller | Self::Greater)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    /// `*`, every track in the library.
    Universe,
    /// `#1,3-5`
    Ids(Vec<RangeInclusive<i32>>),
    /// `+field`, tracks that have the property at all.
    Has(String),
    Match {
        field: String,
        op: MatchOp,
        value: String,
    },
    /// A bare word, matched against artist, title and album.
    Any(String),
    /// `in:name`, members of a named playlist or saved collection.
    Member(String),
    And(Vec<Collection>),
    Or(Vec<Collection>),
    Not(Box<Collection>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty query")]
    Empty,
    #[error("query ends unexpectedly")]
    UnexpectedEnd,
    #[error("unterminated quote at position {0}")]
    UnterminatedQuote(usize),
    #[error("unexpected ')' at position {0}")]
    UnexpectedClose(usize),
    #[error("'(' at position {0} is never closed")]
    UnclosedGroup(usize),
    #[error("'{0}' is missing an operand")]
    MissingOperand(&'static str),
    #[error("missing value for '{0}'")]
    EmptyValue(String),
    #[error("invalid property name '{0}'")]
    InvalidField(String),
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("invalid id list '{0}'")]
    InvalidIds(String),
}

/// Parse a query string into a [`Collection`].
pub fn parse(input: &str) -> Result<Collection, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let collection = parser.parse_or()?;
    match parser.next() {
        None => Ok(collection),
        Some(token) => Err(ParseError::UnexpectedClose(token.position)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Open,
    Close,
    /// `plain` is the byte length of the leading part of `text` that was
    /// not quoted. Operators and keywords are only recognised there.
    Word { text: String, plain: usize },
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '(' || c == ')' {
            chars.next();
            let kind = if c == '(' {
                TokenKind::Open
            } else {
                TokenKind::Close
            };
            tokens.push(Token { kind, position });
            continue;
        }

        let mut text = String::new();
        let mut plain: Option<usize> = None;
        while let Some(&(quote_at, c)) = chars.peek() {
            if c.is_whitespace() || c == '(' || c == ')' {
                break;
            }
            chars.next();
            if c != '"' {
                text.push(c);
                continue;
            }
            plain.get_or_insert(text.len());
            loop {
                match chars.next() {
                    None => return Err(ParseError::UnterminatedQuote(quote_at)),
                    Some((_, '"')) => break,
                    Some((_, '\\')) => match chars.next() {
                        Some((_, escaped)) => text.push(escaped),
                        None => return Err(ParseError::UnterminatedQuote(quote_at)),
                    },
                    Some((_, c)) => text.push(c),
                }
            }
        }

        let plain = plain.unwrap_or(text.len());
        tokens.push(Token {
            kind: TokenKind::Word { text, plain },
            position,
        });
    }

    Ok(tokens)
}

const KEYWORDS: [&str; 3] = ["AND", "OR", "NOT"];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
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

    fn keyword(token: &Token) -> Option<&'static str> {
        match &token.kind {
            TokenKind::Word { text, plain } if *plain == text.len() => {
                KEYWORDS.into_iter().find(|k| *k == text.as_str())
            }
            _ => None,
        }
    }

    fn peek_keyword(&self) -> Option<&'static str> {
        self.peek().and_then(Self::keyword)
    }

    /// True when no operand can start at the current token.
    fn operand_missing(&self) -> bool {
        match self.peek() {
            None => true,
            Some(token) => {
                token.kind == TokenKind::Close
                    || matches!(Self::keyword(token), Some("AND") | Some("OR"))
            }
        }
    }

    fn parse_or(&mut self) -> Result<Collection, ParseError> {
        let mut operands = vec![self.parse_and()?];
        while self.peek_keyword() == Some("OR") {
            self.pos += 1;
            if self.operand_missing() {
                return Err(ParseError::MissingOperand("OR"));
            }
            operands.push(self.parse_and()?);
        }
        Ok(combine(operands, Collection::Or))
    }

    fn parse_and(&mut self) -> Result<Collection, ParseError> {
        let mut operands = vec![self.parse_unary()?];
        loop {
            let Some(token) = self.peek() else { break };
            if token.kind == TokenKind::Close {
                break;
            }
            match Self::keyword(token) {
                Some("OR") => break,
                Some("AND") => {
                    self.pos += 1;
                    if self.operand_missing() {
                        return Err(ParseError::MissingOperand("AND"));
                    }
                }
                _ => {}
            }
            operands.push(self.parse_unary()?);
        }
        Ok(combine(operands, Collection::And))
    }

    fn parse_unary(&mut self) -> Result<Collection, ParseError> {
        let Some(token) = self.next() else {
            return Err(ParseError::UnexpectedEnd);
        };

        if let Some(keyword) = Self::keyword(&token) {
            if keyword != "NOT" || self.operand_missing() {
                return Err(ParseError::MissingOperand(keyword));
            }
            return Ok(Collection::Not(Box::new(self.parse_unary()?)));
        }

        match token.kind {
            TokenKind::Open => {
                if self.peek().is_none() {
                    return Err(ParseError::UnclosedGroup(token.position));
                }
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::Close,
                        ..
                    }) => Ok(inner),
                    _ => Err(ParseError::UnclosedGroup(token.position)),
                }
            }
            TokenKind::Close => Err(ParseError::UnexpectedClose(token.position)),
            TokenKind::Word { text, plain } => parse_filter(&text, plain),
        }
    }
}

fn combine(mut operands: Vec<Collection>, wrap: fn(Vec<Collection>) -> Collection) -> Collection {
    if operands.len() == 1 {
        operands.remove(0)
    } else {
        wrap(operands)
    }
}

fn is_field_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn parse_filter(text: &str, plain: usize) -> Result<Collection, ParseError> {
    if text.is_empty() {
        return Err(ParseError::EmptyValue(String::new()));
    }
    let head = &text[..plain];
    let fully_plain = plain == text.len();

    if fully_plain && text == "*" {
        return Ok(Collection::Universe);
    }
    if fully_plain {
        if let Some(ids) = text.strip_prefix('#') {
            return parse_ids(ids);
        }
        if let Some(field) = text.strip_prefix('+') {
            if !is_field_name(field) {
                return Err(ParseError::InvalidField(field.to_string()));
            }
            return Ok(Collection::Has(field.to_string()));
        }
    }

    let Some((at, op)) = head
        .char_indices()
        .find_map(|(i, c)| MatchOp::from_char(c).map(|op| (i, op)))
    else {
        return Ok(Collection::Any(text.to_string()));
    };

    let field = &text[..at];
    let value = &text[at + 1..];
    if !is_field_name(field) {
        return Err(ParseError::InvalidField(field.to_string()));
    }
    if value.is_empty() {
        return Err(ParseError::EmptyValue(field.to_string()));
    }
    if field == "in" && op == MatchOp::Equals {
        return Ok(Collection::Member(value.to_string()));
    }
    if op.is_numeric() && value.parse::<i64>().is_err() {
        return Err(ParseError::NotANumber(value.to_string()));
    }

    Ok(Collection::Match {
        field: field.to_string(),
        op,
        value: value.to_string(),
    })
}

fn parse_ids(list: &str) -> Result<Collection, ParseError> {
    let invalid = || ParseError::InvalidIds(list.to_string());
    let parse_id = |s: &str| s.parse::<i32>().ok().filter(|id| *id > 0);

    let mut ranges = Vec::new();
    for part in list.split(',') {
        let range = match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (parse_id(start), parse_id(end));
                match (start, end) {
                    (Some(start), Some(end)) if start <= end => start..=end,
                    _ => return Err(invalid()),
                }
            }
            None => {
                let id = parse_id(part).ok_or_else(invalid)?;
                id..=id
            }
        };
        ranges.push(range);
    }
    Ok(Collection::Ids(ranges))
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || KEYWORDS.contains(&value)
        || value == "*"
        || value.starts_with(['#', '+'])
        || value.chars().any(|c| {
            c.is_whitespace() || matches!(c, '"' | '\\' | '(' | ')') || MatchOp::from_char(c).is_some()
        })
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if !needs_quotes(value) {
        return f.write_str(value);
    }
    f.write_str("\"")?;
    for c in value.chars() {
        if c == '"' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    f.write_str("\"")
}

fn write_joined(f: &mut fmt::Formatter<'_>, operands: &[Collection], sep: &str) -> fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        // AND binds tighter than OR, so only OR needs grouping here.
        if sep == " AND " && matches!(operand, Collection::Or(_)) {
            write!(f, "({operand})")?;
        } else {
            write!(f, "{operand}")?;
        }
    }
    Ok(())
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Universe => f.write_str("*"),
            Collection::Ids(ranges) => {
                f.write_str("#")?;
                for (i, range) in ranges.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    if range.start() == range.end() {
                        write!(f, "{}", range.start())?;
                    } else {
                        write!(f, "{}-{}", range.start(), range.end())?;
                    }
                }
                Ok(())
            }
            Collection::Has(field) => write!(f, "+{field}"),
            Collection::Match { field, op, value } => {
                write!(f, "{field}{}", op.symbol())?;
                write_value(f, value)
            }
            Collection::Any(value) => write_value(f, value),
            Collection::Member(name) => {
                f.write_str("in:")?;
                write_value(f, name)
            }
            Collection::And(operands) => write_joined(f, operands, " AND "),
            Collection::Or(operands) => write_joined(f, operands, " OR "),
            Collection::Not(inner) => match inner.as_ref() {
                Collection::And(_) | Collection::Or(_) => write!(f, "NOT ({inner})"),
                _ => write!(f, "NOT {inner}"),
            },
        }
    }
}
