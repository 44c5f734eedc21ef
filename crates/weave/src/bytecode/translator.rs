//! Walks a [`Block`] and emits a [`Code`].
//!
//! A bare [`crate::value::Value::Word`] always compiles to the indexed
//! `Call` family (the VM resolves, at runtime, whether the looked-up value
//! is actually called or just loaded — see [`crate::vm`]'s call step). To
//! know how many of the following items are that call's arguments, the
//! translator tracks each name's declared arity: builtins' arities are
//! supplied by the caller (the builtin registry), and a user function's
//! arity is learned the first time the translator sees `name: $[...][...]`.
//! A call to a name with no known arity compiles as a zero-argument call —
//! a single-pass limitation documented rather than hidden.

use std::rc::Rc;

use super::{
    builder::CodeBuilder,
    code::Code,
    opcode::Opcode,
};
use crate::{
    block::{Block, BlockKind},
    function::Param,
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Sequence,
    Dictionary,
    Array,
}

struct Translator<'a> {
    builder: CodeBuilder,
    known_arity: std::collections::HashMap<Rc<str>, usize>,
    builtin_arity: &'a dyn Fn(&str) -> Option<usize>,
    context: Vec<Context>,
}

/// Compiles a block's contents to [`Code`]. `builtin_arity` supplies the
/// declared arity for names the builtin registry knows about; anything
/// else falls back to arity learned from an in-source `name: $[...][...]`
/// definition, or zero.
#[must_use]
pub fn translate(block: &Block, builtin_arity: &dyn Fn(&str) -> Option<usize>) -> Code {
    let mut t = Translator {
        builder: CodeBuilder::new(),
        known_arity: std::collections::HashMap::new(),
        builtin_arity,
        context: vec![Context::Sequence],
    };
    let items = block.items().clone();
    t.translate_sequence_keep_last(&items);
    t.builder.build()
}

/// Compiles a block's contents the way [`translate`] does, except no `Pop`
/// is ever emitted between statements: every expression's value stays on
/// the stack. Used for the construction conversions (`to :dictionary`,
/// `to :someType`) that execute an argument block "unscoped" and read off
/// whatever values it left behind, per the conversion engine's block rules.
#[must_use]
pub fn translate_collecting(block: &Block, builtin_arity: &dyn Fn(&str) -> Option<usize>) -> Code {
    let mut t = Translator {
        builder: CodeBuilder::new(),
        known_arity: std::collections::HashMap::new(),
        builtin_arity,
        context: vec![Context::Sequence],
    };
    let items = block.items().clone();
    let mut i = 0;
    while i < items.len() {
        i = t.translate_stmt(&items, i);
    }
    t.builder.build()
}

impl Translator<'_> {
    fn arity_of(&self, name: &str) -> usize {
        (self.builtin_arity)(name).or_else(|| self.known_arity.get(name).copied()).unwrap_or(0)
    }

    /// Translates a run of items as a sequence of statements: every
    /// statement's result is discarded with `Pop` except the last, which is
    /// left on the stack as the sequence's value (used for the root
    /// program, inline `(...)` groups, and function bodies).
    fn translate_sequence_keep_last(&mut self, items: &[Value]) {
        if items.is_empty() {
            self.builder.emit(Opcode::PushNull);
            return;
        }
        let mut i = 0;
        while i < items.len() {
            let leaves_value = Self::leaves_value(&items[i]);
            let next = self.translate_stmt(items, i);
            let is_last = next >= items.len();
            if leaves_value && !is_last {
                self.builder.emit(Opcode::Pop);
            }
            i = next;
        }
    }

    fn leaves_value(item: &Value) -> bool {
        !matches!(item, Value::Label(_) | Value::Attribute(_) | Value::AttributeLabel(_))
    }

    /// Translates one value-producing expression: a primary, then any
    /// trailing infix-operator chain (`x - 1`, `x < 2 + 1`) the lexer split
    /// out of a whitespace-free run. Operators bind strictly left to right
    /// with no precedence climbing — `a+b*c` compiles as `(a+b)*c`.
    fn translate_expr(&mut self, items: &[Value], i: usize) -> usize {
        let mut j = self.translate_primary(items, i);
        while let Some(Value::Symbol(op)) = items.get(j) {
            let op = Rc::clone(op);
            j = self.translate_primary(items, j + 1);
            self.emit_infix(&op);
        }
        j
    }

    /// Translates one full statement: an expression, plus the `else`
    /// continuation that may trail an `if?`/`unless?` call. This must sit
    /// above [`Self::translate_expr`] rather than inside it — `if?`'s own
    /// arity-driven argument collection calls `translate_expr` too, and an
    /// `else` found while still consuming `if?`'s *second* argument would
    /// emit `else`'s call before `if?`'s own call, seeing neither value
    /// `if?` actually produced.
    ///
    /// `else` always takes the value already on the stack (the prior
    /// statement's result) as its first argument and the following block as
    /// its second.
    fn translate_stmt(&mut self, items: &[Value], i: usize) -> usize {
        let mut j = self.translate_expr(items, i);
        if let Some(Value::Word(w)) = items.get(j) {
            if w.as_ref() == "else" {
                let w = Rc::clone(w);
                j = self.translate_primary(items, j + 1);
                self.builder.emit_call(&w);
            }
        }
        j
    }

    fn emit_infix(&mut self, op: &Rc<str>) {
        match symbol_opcode(op) {
            Some(opcode) => self.builder.emit(opcode),
            // Unknown operator symbol: treat as a two-argument call by name,
            // consistent with every other name-based call.
            None => self.builder.emit_call(op),
        }
    }

    /// Translates one logical item, which may consume more than one raw
    /// slot of `items` (a labeled value, an attribute, a function literal's
    /// two blocks, or a call's arguments). Returns the index just past
    /// whatever it consumed. Does not itself look for a trailing infix
    /// operator — callers that want that go through [`Self::translate_expr`].
    fn translate_primary(&mut self, items: &[Value], i: usize) -> usize {
        match &items[i] {
            Value::Label(name) => self.translate_label(items, i, Rc::clone(name)),
            // A bare `.flag` carries no value of its own — it deposits
            // `true` and leaves whatever follows it for the call itself
            // (`as.binary 11`: `11` is `as`'s argument, not `.binary`'s).
            Value::Attribute(name) => {
                self.builder.emit_push_value(Value::Logical(true));
                self.builder.emit_attr_set(name);
                i + 1
            }
            // `.name: value` consumes the following expression as the
            // attribute's value (`range 1 10 .step:0`).
            Value::AttributeLabel(name) => {
                let next = self.translate_expr(items, i + 1);
                self.builder.emit_attr_set(name);
                next
            }
            Value::Word(name) => {
                let arity = self.arity_of(name);
                let mut j = i + 1;
                let mut consumed = 0;
                loop {
                    while matches!(items.get(j), Some(Value::Attribute(_) | Value::AttributeLabel(_))) {
                        j = self.translate_primary(items, j);
                    }
                    if consumed >= arity || j >= items.len() {
                        break;
                    }
                    j = self.translate_expr(items, j);
                    consumed += 1;
                }
                self.builder.emit_call(name);
                j
            }
            Value::Inline(b) => {
                let inner = b.items().clone();
                self.translate_sequence_keep_last(&inner);
                i + 1
            }
            Value::Block(b) => self.translate_block_item(items, i, b),
            other => {
                self.builder.emit_push_value(other.clone());
                i + 1
            }
        }
    }

    fn translate_label(&mut self, items: &[Value], i: usize, name: Rc<str>) -> usize {
        // `name: $[params][body]` — a function literal immediately bound to
        // a label. Special-cased so its arity is known to later calls.
        if let Some(Value::Block(params_block)) = items.get(i + 1) {
            if params_block.kind() == BlockKind::Function {
                if let Some(Value::Block(body)) = items.get(i + 2) {
                    let params = extract_params(params_block);
                    self.known_arity.insert(Rc::clone(&name), params.len());
                    self.builder.emit_push_value(Value::Block(params_block.clone()));
                    self.builder.emit_push_value(Value::Block(body.clone()));
                    self.builder.emit(Opcode::Func);
                    self.store(&name);
                    return i + 3;
                }
            }
        }
        let next = self.translate_expr(items, i + 1);
        self.store(&name);
        next
    }

    fn store(&mut self, name: &Rc<str>) {
        match self.context.last() {
            Some(Context::Dictionary) => self.builder.emit_dict_key(name),
            _ => self.builder.emit_store(name),
        }
    }

    fn translate_block_item(&mut self, items: &[Value], i: usize, b: &Block) -> usize {
        match b.kind() {
            BlockKind::Plain => {
                self.builder.emit_push_value(Value::Block(b.clone()));
                i + 1
            }
            BlockKind::Function => {
                // A bare (unlabeled) function literal: arity isn't learned
                // since there's no name to associate it with.
                if let Some(Value::Block(body)) = items.get(i + 1) {
                    self.builder.emit_push_value(Value::Block(b.clone()));
                    self.builder.emit_push_value(Value::Block(body.clone()));
                    self.builder.emit(Opcode::Func);
                    i + 2
                } else {
                    self.builder.emit_push_value(Value::Block(b.clone()));
                    i + 1
                }
            }
            BlockKind::Dictionary => {
                self.builder.emit(Opcode::DictBegin);
                self.context.push(Context::Dictionary);
                let inner = b.items().clone();
                let mut j = 0;
                while j < inner.len() {
                    j = self.translate_expr(&inner, j);
                }
                self.context.pop();
                self.builder.emit(Opcode::Dict);
                i + 1
            }
            BlockKind::Array => {
                self.builder.emit(Opcode::ArrayBegin);
                self.context.push(Context::Array);
                let inner = b.items().clone();
                let mut j = 0;
                while j < inner.len() {
                    let leaves_value = Self::leaves_value(&inner[j]);
                    let next = self.translate_expr(&inner, j);
                    if leaves_value {
                        self.builder.emit(Opcode::ArrayPush);
                    }
                    j = next;
                }
                self.context.pop();
                self.builder.emit(Opcode::Array);
                i + 1
            }
        }
    }
}

/// Maps a lexed infix-operator symbol to the dedicated opcode it compiles
/// to. Symbols the translator doesn't recognize fall back to a named call
/// (see [`Translator::emit_infix`]), so user-defined infix words keep working.
fn symbol_opcode(op: &str) -> Option<Opcode> {
    Some(match op {
        "+" => Opcode::Add,
        "-" => Opcode::Sub,
        "*" => Opcode::Mul,
        "/" => Opcode::Div,
        "<" => Opcode::Lt,
        ">" => Opcode::Gt,
        "<=" => Opcode::Le,
        ">=" => Opcode::Ge,
        "=" => Opcode::Eq,
        "<>" => Opcode::Ne,
        _ => return None,
    })
}

pub fn extract_params(params_block: &Block) -> Vec<Param> {
    params_block
        .items()
        .iter()
        .filter_map(|v| match v {
            Value::Word(n) => Some(Param::unconstrained(Rc::clone(n))),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::opcode::base;

    fn no_builtins(_: &str) -> Option<usize> {
        None
    }

    #[test]
    fn bare_literal_translates_to_a_push() {
        let block = Block::new(vec![Value::integer_small(5)]);
        let code = translate(&block, &no_builtins);
        assert_eq!(code.bytecode, vec![Opcode::PushInt5 as u8]);
    }

    #[test]
    fn label_then_value_emits_store() {
        let block = Block::new(vec![Value::Label(Rc::from("x")), Value::integer_small(5)]);
        let code = translate(&block, &no_builtins);
        assert_eq!(code.bytecode[0], Opcode::PushInt5 as u8);
        assert_eq!(code.bytecode[1], base::STORE);
    }

    #[test]
    fn call_with_known_arity_consumes_two_arguments() {
        let block = Block::new(vec![
            Value::Word(Rc::from("add")),
            Value::integer_small(1),
            Value::integer_small(2),
        ]);
        let code = translate(&block, &|name| if name == "add" { Some(2) } else { None });
        assert_eq!(code.bytecode, vec![Opcode::PushInt1 as u8, Opcode::PushInt2 as u8, base::CALL]);
    }

    #[test]
    fn sequence_pops_all_but_the_last_value() {
        let block = Block::new(vec![Value::integer_small(1), Value::integer_small(2)]);
        let code = translate(&block, &no_builtins);
        assert_eq!(code.bytecode, vec![Opcode::PushInt1 as u8, Opcode::Pop as u8, Opcode::PushInt2 as u8]);
    }

    #[test]
    fn infix_operator_compiles_to_its_dedicated_opcode() {
        let block = Block::new(vec![
            Value::Word(Rc::from("x")),
            Value::Symbol(Rc::from("-")),
            Value::integer_small(1),
        ]);
        let code = translate(&block, &no_builtins);
        assert_eq!(code.bytecode, vec![base::CALL, Opcode::PushInt1 as u8, Opcode::Sub as u8]);
    }

    #[test]
    fn unknown_infix_symbol_falls_back_to_a_named_call() {
        let block = Block::new(vec![
            Value::integer_small(1),
            Value::Symbol(Rc::from("=>")),
            Value::integer_small(2),
        ]);
        let code = translate(&block, &no_builtins);
        assert_eq!(code.bytecode, vec![Opcode::PushInt1 as u8, Opcode::PushInt2 as u8, base::CALL]);
    }
}
