//! The native function registry: every name the translator and VM resolve
//! that isn't a user-defined `Function`. Each entry pairs a declared arity
//! (so the translator knows how many following items to consume) with the
//! native implementation (so the VM's `Call` opcode has something to run).
//!
//! Control flow (`if`, `loop`, `map`...) lives here rather than as VM
//! opcodes — see `bytecode::translator`'s module doc for why.

pub mod arith;
mod collections;
mod control;
mod convert;
mod define;
mod print;

use std::rc::Rc;

use ahash::AHashMap;
use indexmap::IndexMap;

use crate::{bytecode::vm::Vm, error::WeaveResult, value::Value};

pub type BuiltinFn = fn(&mut Vm, Vec<Value>, &AHashMap<Rc<str>, Value>) -> WeaveResult<Value>;

pub struct BuiltinEntry {
    pub arity: usize,
    pub func: BuiltinFn,
}

/// The full set of native names, keyed by the word that calls them.
#[derive(Default)]
pub struct BuiltinRegistry {
    entries: IndexMap<&'static str, BuiltinEntry>,
}

impl BuiltinRegistry {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BuiltinEntry> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn arity(&self, name: &str) -> Option<usize> {
        self.entries.get(name).map(|e| e.arity)
    }

    fn register(&mut self, name: &'static str, arity: usize, func: BuiltinFn) {
        self.entries.insert(name, BuiltinEntry { arity, func });
    }
}

/// Builds the registry every fresh [`Vm`] starts with.
#[must_use]
pub fn registry() -> BuiltinRegistry {
    let mut r = BuiltinRegistry::default();
    r.register("print", 1, print::print);
    r.register("type", 1, print::type_of);

    r.register("if", 2, control::if_);
    r.register("if?", 2, control::if_);
    r.register("unless", 2, control::unless);
    r.register("unless?", 2, control::unless);
    r.register("else", 2, control::else_);
    r.register("while", 2, control::while_);
    r.register("loop", 3, control::loop_);
    r.register("map", 3, control::map);
    r.register("select", 3, control::select);
    r.register("return", 1, control::return_);
    r.register("break", 0, control::break_);
    r.register("continue", 0, control::continue_);

    r.register("size", 1, collections::size);
    r.register("reverse", 1, collections::reverse);
    r.register("append", 2, collections::append);
    r.register("join", 2, collections::join);
    r.register("split", 2, collections::split);
    r.register("replace", 3, collections::replace);
    r.register("range", 2, collections::range);

    r.register("to", 2, convert::to);
    r.register("as", 1, convert::as_);

    r.register("define", 3, define::define);
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_reports_declared_arity() {
        let r = registry();
        assert_eq!(r.arity("if"), Some(2));
        assert_eq!(r.arity("print"), Some(1));
        assert_eq!(r.arity("totallyUnknown"), None);
    }
}
