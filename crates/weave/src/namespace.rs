//! [`Scope`]: an insertion-ordered name → value table with fallback to a
//! shared global table, plus the snapshot/diff machinery block-execution
//! semantics need (`loop`, `if`, `map`, `select`, dictionary-producing
//! blocks all run a block against a scope and then look at what changed).

use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

#[derive(Debug, Default, Clone)]
pub struct Scope {
    names: IndexMap<Rc<str>, Value>,
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names.get(name)
    }

    pub fn set(&mut self, name: Rc<str>, value: Value) {
        self.names.insert(name, value);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// A snapshot of this scope's current name set, used to diff against
    /// after running a block per the block-execution semantics.
    #[must_use]
    pub fn snapshot_names(&self) -> Vec<Rc<str>> {
        self.names.keys().cloned().collect()
    }

    /// Names present now but absent from `before`, or present in both but
    /// bound to a different value — i.e. symbols "newly introduced or
    /// changed" relative to an earlier snapshot.
    #[must_use]
    pub fn diff_since(&self, before: &Scope) -> Vec<(Rc<str>, Value)> {
        self.names
            .iter()
            .filter(|(name, value)| before.names.get(name.as_ref()).is_none_or(|old| old != *value))
            .map(|(n, v)| (Rc::clone(n), v.clone()))
            .collect()
    }
}

/// The VM's symbol table: a stack of local [`Scope`]s (one per active call
/// frame/block) plus a single global scope every lookup falls back to.
#[derive(Debug)]
pub struct SymbolTable {
    global: Scope,
    locals: Vec<Scope>,
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self { global: Scope::new(), locals: Vec::new() }
    }

    pub fn push_scope(&mut self) {
        self.locals.push(Scope::new());
    }

    #[must_use]
    pub fn pop_scope(&mut self) -> Option<Scope> {
        self.locals.pop()
    }

    /// Looks up by name in the topmost active scope, falling back to the
    /// global table when not found locally, per the symbol resolution rule.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.locals.last().and_then(|s| s.get(name)).or_else(|| self.global.get(name))
    }

    /// Binds `name` in the topmost local scope, or the global scope when no
    /// local scope is active (top level).
    pub fn bind(&mut self, name: Rc<str>, value: Value) {
        match self.locals.last_mut() {
            Some(scope) => scope.set(name, value),
            None => self.global.set(name, value),
        }
    }

    #[must_use]
    pub fn global(&self) -> &Scope {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut Scope {
        &mut self.global
    }

    #[must_use]
    pub fn current(&self) -> Option<&Scope> {
        self.locals.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Scope> {
        self.locals.last_mut()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_back_to_global() {
        let mut table = SymbolTable::new();
        table.bind(Rc::from("x"), Value::integer_small(1));
        table.push_scope();
        assert_eq!(table.lookup("x"), Some(&Value::integer_small(1)));
    }

    #[test]
    fn local_shadows_global() {
        let mut table = SymbolTable::new();
        table.bind(Rc::from("x"), Value::integer_small(1));
        table.push_scope();
        table.bind(Rc::from("x"), Value::integer_small(2));
        assert_eq!(table.lookup("x"), Some(&Value::integer_small(2)));
        table.pop_scope();
        assert_eq!(table.lookup("x"), Some(&Value::integer_small(1)));
    }

    #[test]
    fn diff_reports_new_and_changed_bindings() {
        let mut before = Scope::new();
        before.set(Rc::from("a"), Value::integer_small(1));
        let mut after = before.clone();
        after.set(Rc::from("a"), Value::integer_small(2));
        after.set(Rc::from("b"), Value::integer_small(3));
        let diff = after.diff_since(&before);
        assert_eq!(diff.len(), 2);
    }
}
