//! Parser for the textual fact/rule syntax.
//!
//! Syntax:
//! - `(pred arg ...)` - statement; arguments are constants or variables
//! - `?name` - variable
//! - `name` - constant (alphanumeric plus `_` and `-`)
//! - `fact: (on A B)` - fact item
//! - `rule: ((parent ?x ?y) (parent ?y ?z)) -> (grandparent ?x ?z)` - rule
//! - `;` - comment to end of line
//!
//! Items intern their names into the caller's stores, so parsed statements
//! compare structurally against statements built through the API.

use crate::kb::Item;
use crate::symbol::SymbolStore;
use crate::term::{Statement, TermId, TermStore};
use smallvec::SmallVec;

/// Parse error: what went wrong and the byte offset where it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "parse error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse a single statement, requiring the whole input to be consumed.
pub fn parse_statement(
    input: &str,
    symbols: &SymbolStore,
    terms: &TermStore,
) -> Result<Statement, ParseError> {
    let mut pos = 0;
    let stmt = parse_statement_inner(input, &mut pos, symbols, terms)?;
    skip_trivia(input, &mut pos);
    if pos < input.len() {
        return Err(ParseError::new("unexpected characters after statement", pos));
    }
    Ok(stmt)
}

/// Parse a single `fact:`/`rule:` item, requiring the whole input to be
/// consumed.
pub fn parse_item(
    input: &str,
    symbols: &SymbolStore,
    terms: &TermStore,
) -> Result<Item, ParseError> {
    let mut pos = 0;
    let item = parse_item_inner(input, &mut pos, symbols, terms)?;
    skip_trivia(input, &mut pos);
    if pos < input.len() {
        return Err(ParseError::new("unexpected characters after item", pos));
    }
    Ok(item)
}

/// Parse a whole knowledge listing: any number of items separated by
/// whitespace, with `;` comments skipped.
pub fn parse_items(
    input: &str,
    symbols: &SymbolStore,
    terms: &TermStore,
) -> Result<Vec<Item>, ParseError> {
    let mut pos = 0;
    let mut items = Vec::new();
    loop {
        skip_trivia(input, &mut pos);
        if pos >= input.len() {
            break;
        }
        items.push(parse_item_inner(input, &mut pos, symbols, terms)?);
    }
    Ok(items)
}

fn parse_item_inner(
    input: &str,
    pos: &mut usize,
    symbols: &SymbolStore,
    terms: &TermStore,
) -> Result<Item, ParseError> {
    skip_trivia(input, pos);
    let keyword_pos = *pos;
    let keyword = parse_ident(input, pos)?;
    expect(input, pos, ':')?;
    match keyword.as_str() {
        "fact" => {
            let stmt = parse_statement_inner(input, pos, symbols, terms)?;
            Ok(Item::Fact(stmt))
        }
        "rule" => {
            skip_trivia(input, pos);
            expect(input, pos, '(')?;
            let mut lhs = Vec::new();
            loop {
                skip_trivia(input, pos);
                match peek(input, *pos) {
                    Some(')') => {
                        *pos += 1;
                        break;
                    }
                    Some('(') => lhs.push(parse_statement_inner(input, pos, symbols, terms)?),
                    Some(ch) => {
                        return Err(ParseError::new(
                            format!("expected premise or ')', found '{ch}'"),
                            *pos,
                        ))
                    }
                    None => return Err(ParseError::new("unclosed premise list", *pos)),
                }
            }
            if lhs.is_empty() {
                return Err(ParseError::new("rule needs at least one premise", *pos));
            }
            skip_trivia(input, pos);
            expect(input, pos, '-')?;
            expect(input, pos, '>')?;
            let rhs = parse_statement_inner(input, pos, symbols, terms)?;
            Ok(Item::Rule { lhs, rhs })
        }
        other => Err(ParseError::new(
            format!("expected `fact:` or `rule:`, found `{other}:`"),
            keyword_pos,
        )),
    }
}

fn parse_statement_inner(
    input: &str,
    pos: &mut usize,
    symbols: &SymbolStore,
    terms: &TermStore,
) -> Result<Statement, ParseError> {
    skip_trivia(input, pos);
    expect(input, pos, '(')?;
    skip_trivia(input, pos);
    let pred = parse_ident(input, pos)?;
    let pred = symbols.intern(&pred);

    let mut args: SmallVec<[TermId; 4]> = SmallVec::new();
    loop {
        skip_trivia(input, pos);
        match peek(input, *pos) {
            Some(')') => {
                *pos += 1;
                break;
            }
            Some('?') => {
                *pos += 1;
                let name = parse_ident(input, pos)?;
                args.push(terms.variable(symbols.intern(&name)));
            }
            Some(ch) if is_ident_char(ch) => {
                let name = parse_ident(input, pos)?;
                args.push(terms.constant(symbols.intern(&name)));
            }
            Some(ch) => {
                return Err(ParseError::new(
                    format!("unexpected character in statement: '{ch}'"),
                    *pos,
                ))
            }
            None => return Err(ParseError::new("unclosed statement", *pos)),
        }
    }

    Ok(Statement::new(pred, args))
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

fn peek(input: &str, pos: usize) -> Option<char> {
    input[pos..].chars().next()
}

fn skip_trivia(input: &str, pos: &mut usize) {
    let bytes = input.as_bytes();
    while *pos < bytes.len() {
        match bytes[*pos] {
            b' ' | b'\t' | b'\r' | b'\n' => *pos += 1,
            b';' => {
                while *pos < bytes.len() && bytes[*pos] != b'\n' {
                    *pos += 1;
                }
            }
            _ => break,
        }
    }
}

fn parse_ident(input: &str, pos: &mut usize) -> Result<String, ParseError> {
    skip_trivia(input, pos);
    let start = *pos;
    while let Some(ch) = peek(input, *pos) {
        if is_ident_char(ch) {
            *pos += ch.len_utf8();
        } else {
            break;
        }
    }
    if *pos == start {
        return Err(ParseError::new("expected identifier", start));
    }
    Ok(input[start..*pos].to_string())
}

fn expect(input: &str, pos: &mut usize, expected: char) -> Result<(), ParseError> {
    skip_trivia(input, pos);
    match peek(input, *pos) {
        Some(ch) if ch == expected => {
            *pos += ch.len_utf8();
            Ok(())
        }
        Some(ch) => Err(ParseError::new(
            format!("expected '{expected}', found '{ch}'"),
            *pos,
        )),
        None => Err(ParseError::new(
            format!("expected '{expected}', found end of input"),
            *pos,
        )),
    }
}
