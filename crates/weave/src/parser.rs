//! Turns the lexer's flat token stream into a root [`Block`], recursively
//! building nested blocks from matched bracket pairs.

use crate::{
    block::{Block, BlockKind},
    error::{Error, SourcePos, WeaveResult},
    lexer::{BracketKind, Lexer, PositionedToken, Token},
    value::Value,
};

pub struct Parser {
    tokens: Vec<PositionedToken>,
    pos: usize,
}

/// Parses a full source string into its root block.
pub fn parse(source: &str) -> WeaveResult<Block> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let items = parser.parse_items_until(None)?;
    if parser.pos < parser.tokens.len() {
        let pos = parser.tokens[parser.pos].pos;
        return Err(Error::parse("unexpected closing bracket", pos));
    }
    Ok(Block::new(items))
}

impl Parser {
    fn peek(&self) -> Option<&PositionedToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<PositionedToken> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    /// Parses a run of items until a matching close bracket of `expected`
    /// kind is seen (consuming it), or end of input if `expected` is
    /// `None` (top-level program).
    fn parse_items_until(&mut self, expected: Option<BracketKind>) -> WeaveResult<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => {
                    if expected.is_some() {
                        return Err(Error::parse("unterminated block", SourcePos::default()));
                    }
                    return Ok(items);
                }
                Some(pt) if matches!(pt.token, Token::Close(_)) => {
                    let Token::Close(kind) = pt.token else { unreachable!() };
                    if Some(kind) == expected {
                        self.advance();
                        return Ok(items);
                    }
                    return Err(Error::parse("mismatched closing bracket", pt.pos));
                }
                _ => {
                    items.push(self.parse_one()?);
                }
            }
        }
    }

    fn parse_one(&mut self) -> WeaveResult<Value> {
        let pt = self.advance().expect("caller checked peek().is_some()");
        match pt.token {
            Token::Leaf(v) => Ok(v),
            Token::Open(BracketKind::Square) => {
                let items = self.parse_items_until(Some(BracketKind::Square))?;
                Ok(Value::Block(Block::with_kind(items, BlockKind::Plain)))
            }
            Token::Open(BracketKind::Paren) => {
                let items = self.parse_items_until(Some(BracketKind::Paren))?;
                Ok(Value::Inline(Block::with_kind(items, BlockKind::Plain)))
            }
            Token::Open(BracketKind::DictSquare) => {
                let items = self.parse_items_until(Some(BracketKind::Square))?;
                Ok(Value::Block(Block::with_kind(items, BlockKind::Dictionary)))
            }
            Token::Open(BracketKind::ArraySquare) => {
                let items = self.parse_items_until(Some(BracketKind::Square))?;
                Ok(Value::Block(Block::with_kind(items, BlockKind::Array)))
            }
            Token::Open(BracketKind::FuncSquare) => {
                let items = self.parse_items_until(Some(BracketKind::Square))?;
                Ok(Value::Block(Block::with_kind(items, BlockKind::Function)))
            }
            Token::Close(_) => Err(Error::parse("unexpected closing bracket", pt.pos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn parses_flat_call() {
        let block = parse("print \"hi\"").unwrap();
        let items = block.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Value::Word(Rc::from("print")));
    }

    #[test]
    fn parses_nested_plain_block() {
        let block = parse("[1 2 3]").unwrap();
        let items = block.items();
        let Value::Block(inner) = &items[0] else { panic!("expected block") };
        assert_eq!(inner.kind(), BlockKind::Plain);
        assert_eq!(inner.len(), 3);
    }

    #[test]
    fn parses_function_literal_two_blocks() {
        let block = parse("$[x][x]").unwrap();
        let items = block.items();
        let Value::Block(params) = &items[0] else { panic!("expected block") };
        assert_eq!(params.kind(), BlockKind::Function);
    }

    #[test]
    fn unterminated_block_is_a_parse_error() {
        let err = parse("[1 2").unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    #[test]
    fn mismatched_bracket_is_a_parse_error() {
        let err = parse("[1 2)").unwrap_err();
        assert!(matches!(err, Error::ParseError { .. }));
    }

    /// `parse(codify(parse(source))) == parse(source)`, for sources that
    /// parse cleanly in the first place.
    #[test]
    fn codify_then_reparsing_is_idempotent() {
        for source in ["1 + 2", "print \"hi\"", "x: 10\nx + 1", "[1 2 3]", "$[x][x + 1]"] {
            let first = parse(source).unwrap();
            let codified = Value::Block(first.clone()).codify(false);
            let second = parse(&codified).unwrap();
            let recodified = Value::Block(second).codify(false);
            assert_eq!(codified, recodified, "round-trip mismatch for {source:?}");
        }
    }
}
