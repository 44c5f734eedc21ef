//! [`Dictionary`]: an insertion-ordered mapping from text key to value.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Dictionary(pub Rc<RefCell<IndexMap<Rc<str>, Value>>>);

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(IndexMap::new())))
    }

    #[must_use]
    pub fn from_pairs(pairs: Vec<(Rc<str>, Value)>) -> Self {
        Self(Rc::new(RefCell::new(pairs.into_iter().collect())))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: Rc<str>, value: Value) -> Option<Value> {
        self.0.borrow_mut().insert(key, value)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Snapshots the current keys, used by block-execution-as-dictionary
    /// semantics to diff a scope before/after running a block.
    #[must_use]
    pub fn keys_snapshot(&self) -> Vec<Rc<str>> {
        self.0.borrow().keys().cloned().collect()
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Display for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#[")?;
        for (i, (k, v)) in self.0.borrow().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "]")
    }
}
