//! [`CodeBuilder`]: emits opcodes and operands into a [`Code`], handling
//! constant-pool interning (picking short/long/extended index form), the
//! small-constant fast path, forward-jump patching, and the line table.

use std::rc::Rc;

use super::{
    code::{Code, LocationEntry},
    opcode::{self, Opcode},
};
use crate::value::Value;

/// A forward jump whose offset operand isn't known until the target is
/// reached. Returned by `emit_jump`/`emit_jump_long`; pass to `patch_jump`.
#[derive(Debug, Clone, Copy)]
pub struct JumpPatch {
    operand_offset: usize,
    wide: bool,
}

#[derive(Debug, Default)]
pub struct CodeBuilder {
    bytecode: Vec<u8>,
    constants: Vec<Value>,
    locations: Vec<LocationEntry>,
    current_line: u32,
}

impl CodeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the source line for instructions emitted from this point on.
    /// A no-op when the line hasn't changed since the last call, so the
    /// table stays compact.
    pub fn set_line(&mut self, line: u32) {
        if self.locations.last().is_none_or(|e| e.line != line) {
            self.locations.push(LocationEntry { offset: self.bytecode.len() as u32, line });
        }
        self.current_line = line;
    }

    #[must_use]
    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.bytecode.len()
    }

    pub fn emit(&mut self, op: Opcode) {
        self.bytecode.push(op as u8);
    }

    pub fn emit_u8(&mut self, op: Opcode, operand: u8) {
        self.bytecode.push(op as u8);
        self.bytecode.push(operand);
    }

    pub fn emit_u16(&mut self, op: Opcode, operand: u16) {
        self.bytecode.push(op as u8);
        self.bytecode.extend_from_slice(&operand.to_le_bytes());
    }

    pub fn emit_i8(&mut self, op: Opcode, operand: i8) {
        self.bytecode.push(op as u8);
        self.bytecode.push(operand.to_le_bytes()[0]);
    }

    pub fn emit_i16(&mut self, op: Opcode, operand: i16) {
        self.bytecode.push(op as u8);
        self.bytecode.extend_from_slice(&operand.to_le_bytes());
    }

    /// Interns a value into the constants pool, returning its index. The
    /// `constants` array may hold at most 65,536 entries (the two-byte
    /// index is the widest encoding); exceeding that is a translator bug,
    /// not a user-reachable error, since no single block can plausibly
    /// reference that many distinct constants.
    pub fn intern(&mut self, value: Value) -> u32 {
        let idx = self.constants.len();
        assert!(idx < usize::from(u16::MAX) + 1, "constants pool exceeded 65,536 entries");
        self.constants.push(value);
        idx as u32
    }

    /// Emits the indexed-family opcode appropriate for `index`: short form
    /// (embedded operand) for `0..=13`, long form (`u8`) for `< 256`,
    /// extended form (`u16`) for `< 65,536`.
    fn emit_indexed(&mut self, index: u32, short_base: u8, long_op: u8, extended_op: u8) {
        if index <= opcode::SHORT_FORM_MAX {
            self.bytecode.push(short_base + index as u8);
        } else if index <= opcode::LONG_FORM_MAX {
            self.bytecode.push(long_op);
            self.bytecode.push(index as u8);
        } else {
            self.bytecode.push(extended_op);
            self.bytecode.extend_from_slice(&(index as u16).to_le_bytes());
        }
    }

    /// Pushes a constant, using the dedicated small-integer/float opcodes
    /// when the value matches one exactly, otherwise interning it and
    /// emitting the indexed `Push` family.
    pub fn emit_push_value(&mut self, value: Value) {
        if let Value::Integer(crate::numeric::IntegerValue::Small(n)) = &value {
            if (-1..=15).contains(n) {
                self.bytecode.push((Opcode::PushIntNeg1 as u8) + (n + 1) as u8);
                return;
            }
        }
        if let Value::Floating(f) = &value {
            let dedicated = match *f {
                x if x == -1.0 => Some(Opcode::PushFloatNeg1),
                x if x == 0.0 => Some(Opcode::PushFloat0),
                x if x == 1.0 => Some(Opcode::PushFloat1),
                x if x == 2.0 => Some(Opcode::PushFloat2),
                _ => None,
            };
            if let Some(op) = dedicated {
                self.emit(op);
                return;
            }
        }
        if matches!(value, Value::Null) {
            self.emit(Opcode::PushNull);
            return;
        }
        if let Value::Logical(b) = value {
            self.emit(if b { Opcode::PushTrue } else { Opcode::PushFalse });
            return;
        }
        let idx = self.intern(value);
        self.emit_indexed(idx, opcode::base::PUSH, opcode::base::PUSH_L, opcode::base::PUSH_X);
    }

    fn emit_named(&mut self, name: &Rc<str>, short_base: u8, long_op: u8, extended_op: u8) {
        let idx = self.intern(Value::String(Rc::clone(name)));
        self.emit_indexed(idx, short_base, long_op, extended_op);
    }

    pub fn emit_load(&mut self, name: &Rc<str>) {
        self.emit_named(name, opcode::base::LOAD, opcode::base::LOAD_L, opcode::base::LOAD_X);
    }

    pub fn emit_store(&mut self, name: &Rc<str>) {
        self.emit_named(name, opcode::base::STORE, opcode::base::STORE_L, opcode::base::STORE_X);
    }

    pub fn emit_store_keep(&mut self, name: &Rc<str>) {
        self.emit_named(name, opcode::base::STORE_KEEP, opcode::base::STORE_KEEP_L, opcode::base::STORE_KEEP_X);
    }

    pub fn emit_call(&mut self, name: &Rc<str>) {
        self.emit_named(name, opcode::base::CALL, opcode::base::CALL_L, opcode::base::CALL_X);
    }

    pub fn emit_attr_set(&mut self, name: &Rc<str>) {
        self.emit_named(name, opcode::base::ATTR_SET, opcode::base::ATTR_SET_L, opcode::base::ATTR_SET_X);
    }

    pub fn emit_dict_key(&mut self, name: &Rc<str>) {
        self.emit_named(name, opcode::base::DICT_KEY, opcode::base::DICT_KEY_L, opcode::base::DICT_KEY_X);
    }

    /// Emits a conditional jump with a placeholder operand, returning a
    /// patch handle. `short` selects the `i8`-offset opcode family over the
    /// `i16` one; the translator picks based on an estimate of branch
    /// distance and the builder never needs to widen after the fact because
    /// control-flow bodies in practice stay well under 127 bytes, but when
    /// they don't, callers should request the long form up front.
    pub fn emit_jump(&mut self, op: Opcode, short: bool) -> JumpPatch {
        self.bytecode.push(op as u8);
        let operand_offset = self.bytecode.len();
        if short {
            self.bytecode.push(0);
        } else {
            self.bytecode.extend_from_slice(&0i16.to_le_bytes());
        }
        JumpPatch { operand_offset, wide: !short }
    }

    /// Backpatches a previously emitted jump so its offset lands on the
    /// current position (the jump target).
    pub fn patch_jump(&mut self, patch: JumpPatch) {
        let target = self.bytecode.len();
        if patch.wide {
            let offset = (target as i64 - (patch.operand_offset + 2) as i64) as i16;
            self.bytecode[patch.operand_offset..patch.operand_offset + 2].copy_from_slice(&offset.to_le_bytes());
        } else {
            let offset = (target as i64 - (patch.operand_offset + 1) as i64) as i8;
            self.bytecode[patch.operand_offset] = offset.to_le_bytes()[0];
        }
    }

    #[must_use]
    pub fn build(self) -> Code {
        Code::new(self.constants, self.bytecode, self.locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_integers_bypass_constants_pool() {
        let mut b = CodeBuilder::new();
        b.emit_push_value(Value::integer_small(5));
        let code = b.build();
        assert!(code.constants.is_empty());
        assert_eq!(code.bytecode, vec![Opcode::PushInt5 as u8]);
    }

    #[test]
    fn large_integer_goes_through_short_push() {
        let mut b = CodeBuilder::new();
        b.emit_push_value(Value::integer_small(1000));
        let code = b.build();
        assert_eq!(code.constants.len(), 1);
        assert_eq!(code.bytecode[0], opcode::base::PUSH);
    }

    #[test]
    fn jump_patch_computes_forward_offset() {
        let mut b = CodeBuilder::new();
        let patch = b.emit_jump(Opcode::JmpIfNotS, true);
        b.emit(Opcode::Nop);
        b.patch_jump(patch);
        let code = b.build();
        assert_eq!(code.bytecode[1] as i8, 1);
    }

    #[test]
    fn long_form_used_past_short_range() {
        let mut b = CodeBuilder::new();
        for i in 0..20 {
            b.intern(Value::integer_small(i));
        }
        b.emit_load(&Rc::from("x"));
        let code = b.build();
        assert_eq!(code.bytecode[0], opcode::base::LOAD_L);
    }
}
