//! [`Function`]: a user-defined callable — its parameter list, body block,
//! captured imports, and the lazily-compiled [`Code`] cache.

use std::{cell::RefCell, fmt, rc::Rc};

use ahash::AHashMap;

use crate::{block::Block, bytecode::code::Code, dict::Dictionary, value::Value};

/// A single formal parameter, optionally constrained to a set of type tags
/// (`x :integer :floating`). An empty `types` means unconstrained.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Rc<str>,
    pub types: Vec<Rc<str>>,
}

impl Param {
    #[must_use]
    pub fn unconstrained(name: Rc<str>) -> Self {
        Self { name, types: Vec::new() }
    }
}

/// The documentation/signature record a function may carry when declared
/// with `.info` attributes (description, per-parameter docs, example).
#[derive(Debug, Clone, Default)]
pub struct FunctionInfo {
    pub description: Option<Rc<str>>,
    pub param_docs: AHashMap<Rc<str>, Rc<str>>,
    pub example: Option<Rc<str>>,
}

#[derive(Debug)]
pub struct FunctionData {
    pub params: Vec<Param>,
    pub body: Block,
    pub imports: Dictionary,
    pub exports: Vec<Rc<str>>,
    pub memoize: bool,
    pub inline: bool,
    pub info: Option<FunctionInfo>,
    /// Filled in by the translator on first call and reused thereafter.
    pub compiled: RefCell<Option<Rc<Code>>>,
    /// Populated only when `memoize` is set: argument tuple (printed form)
    /// to result, per the memoization rule in the call semantics.
    pub memo: RefCell<Option<AHashMap<String, Value>>>,
}

#[derive(Debug, Clone)]
pub struct Function(pub Rc<FunctionData>);

impl Function {
    #[must_use]
    pub fn new(params: Vec<Param>, body: Block, imports: Dictionary, exports: Vec<Rc<str>>, memoize: bool, inline: bool, info: Option<FunctionInfo>) -> Self {
        let memo = if memoize { Some(AHashMap::new()) } else { None };
        Self(Rc::new(FunctionData {
            params,
            body,
            imports,
            exports,
            memoize,
            inline,
            info,
            compiled: RefCell::new(None),
            memo: RefCell::new(memo),
        }))
    }

    #[must_use]
    pub fn arity(&self) -> usize {
        self.0.params.len()
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Returns the cached compiled form, if the body has already been
    /// translated by an earlier call.
    #[must_use]
    pub fn cached_code(&self) -> Option<Rc<Code>> {
        self.0.compiled.borrow().clone()
    }

    pub fn set_cached_code(&self, code: Rc<Code>) {
        *self.0.compiled.borrow_mut() = Some(code);
    }

    /// Looks up a memoized result for an argument tuple's printed key, when
    /// this function was declared `.memoize`.
    #[must_use]
    pub fn memo_get(&self, key: &str) -> Option<Value> {
        self.0.memo.borrow().as_ref().and_then(|m| m.get(key).cloned())
    }

    pub fn memo_put(&self, key: String, value: Value) {
        if let Some(m) = self.0.memo.borrow_mut().as_mut() {
            m.insert(key, value);
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function(")?;
        for (i, p) in self.0.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p.name)?;
        }
        write!(f, ")>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_memoized_function_never_caches() {
        let f = Function::new(vec![Param::unconstrained(Rc::from("x"))], Block::empty(), Dictionary::new(), Vec::new(), false, false, None);
        f.memo_put("1".to_string(), Value::Null);
        assert!(f.memo_get("1").is_none());
    }

    #[test]
    fn memoized_function_caches_by_key() {
        let f = Function::new(Vec::new(), Block::empty(), Dictionary::new(), Vec::new(), true, false, None);
        f.memo_put("(1 2)".to_string(), Value::integer_small(3));
        assert_eq!(f.memo_get("(1 2)"), Some(Value::integer_small(3)));
    }

    #[test]
    fn code_cache_starts_empty() {
        let f = Function::new(Vec::new(), Block::empty(), Dictionary::new(), Vec::new(), false, false, None);
        assert!(f.cached_code().is_none());
    }
}
