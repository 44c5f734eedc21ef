//! [`Code`]: a translated block — a constants pool plus the bytecode stream
//! that indexes into it. This is the exchange unit described by the
//! `Bytecode` value tag: `Code::to_dictionary`/`Code::from_dictionary` give
//! the round-trippable `{data: [...], code: [...]}` form.

use std::rc::Rc;

use crate::{
    dict::Dictionary,
    error::{Error, WeaveResult},
    value::Value,
};

/// Maps a byte offset in `bytecode` to a 1-based source line, for error
/// reporting. Built lazily by the translator from `Eol` markers rather than
/// stored per-instruction.
#[derive(Debug, Clone, Copy)]
pub struct LocationEntry {
    pub offset: u32,
    pub line: u32,
}

/// The compiled form of a [`crate::block::Block`]. Produced once by the
/// translator and cached on the `Function`/`Block` it came from; the VM
/// never re-translates a block it has already compiled.
#[derive(Debug, Default)]
pub struct Code {
    pub constants: Vec<Value>,
    pub bytecode: Vec<u8>,
    pub locations: Vec<LocationEntry>,
}

impl Code {
    #[must_use]
    pub fn new(constants: Vec<Value>, bytecode: Vec<u8>, locations: Vec<LocationEntry>) -> Self {
        Self { constants, bytecode, locations }
    }

    /// Line number for a bytecode offset, found via the last location entry
    /// at or before it. Falls back to line 0 when no entry was recorded
    /// (e.g. an empty block).
    #[must_use]
    pub fn line_for_offset(&self, offset: u32) -> u32 {
        self.locations.iter().rev().find(|e| e.offset <= offset).map_or(0, |e| e.line)
    }

    /// Serializes to the `{data: [...], code: [...]}` exchange dictionary
    /// used by `to :bytecode` and by printing a `Bytecode` value.
    #[must_use]
    pub fn to_dictionary(&self) -> Dictionary {
        let data = Value::array(self.constants.clone());
        let code: Vec<Value> = self.bytecode.iter().map(|b| Value::integer_small(i64::from(*b))).collect();
        Dictionary::from_pairs(vec![(Rc::from("data"), data), (Rc::from("code"), Value::array(code))])
    }

    /// Deserializes from the exchange dictionary form, rejecting anything
    /// that isn't shaped like `{data: [...], code: [...]}` with an in-range
    /// byte array.
    pub fn from_dictionary(dict: &Dictionary) -> WeaveResult<Self> {
        let data = dict
            .get("data")
            .and_then(|v| v.as_block().cloned())
            .ok_or_else(|| Error::conversion_failed("bytecode dictionary missing array `data`"))?;
        let code = dict
            .get("code")
            .and_then(|v| v.as_block().cloned())
            .ok_or_else(|| Error::conversion_failed("bytecode dictionary missing array `code`"))?;
        let constants = data.items().clone();
        let mut bytecode = Vec::with_capacity(code.len());
        for item in code.items().iter() {
            let n = item
                .as_integer_i64()
                .ok_or_else(|| Error::conversion_failed("bytecode `code` array must contain integers"))?;
            if !(0..=255).contains(&n) {
                bytecode.push(
                    u8::try_from(n).map_err(|_| Error::conversion_failed("bytecode byte out of range"))?,
                );
            } else {
                bytecode.push(n as u8);
            }
        }
        Ok(Self { constants, bytecode, locations: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_dictionary() {
        let code = Code::new(vec![Value::integer_small(42)], vec![0x74, 0xD2], Vec::new());
        let dict = code.to_dictionary();
        let back = Code::from_dictionary(&dict).unwrap();
        assert_eq!(back.bytecode, code.bytecode);
        assert_eq!(back.constants.len(), code.constants.len());
    }

    #[test]
    fn line_lookup_finds_last_entry_at_or_before_offset() {
        let code = Code::new(Vec::new(), vec![0; 10], vec![LocationEntry { offset: 0, line: 1 }, LocationEntry { offset: 5, line: 2 }]);
        assert_eq!(code.line_for_offset(0), 1);
        assert_eq!(code.line_for_offset(4), 1);
        assert_eq!(code.line_for_offset(5), 2);
        assert_eq!(code.line_for_offset(9), 2);
    }
}
