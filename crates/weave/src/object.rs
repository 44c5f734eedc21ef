//! User-defined types: [`Prototype`] (the `define`d type itself) and
//! [`ObjectInstance`] (an instance of one), plus the [`TypeRegistry`] that
//! owns every prototype for the lifetime of a [`crate::vm::Vm`].
//!
//! Grounded in the data model's note that `Prototype.inherits` is a
//! "non-owning back-reference": the registry is the sole owner of every
//! `PrototypeData`, and `inherits` holds only a [`Weak`] pointer into it, per
//! the design notes' resolution of the cyclic-reference open question.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;

use crate::value::Value;

/// The three "magic methods" a prototype may define, each automatically
/// transformed to receive `this` as its first parameter when installed.
#[derive(Debug, Clone, Default)]
pub struct MagicHooks {
    pub do_init: Option<Value>,
    pub do_print: Option<Value>,
    pub do_compare: Option<Value>,
}

#[derive(Debug)]
pub struct PrototypeData {
    pub name: Rc<str>,
    pub fields: RefCell<Vec<Rc<str>>>,
    pub methods: RefCell<IndexMap<Rc<str>, Value>>,
    pub inherits: RefCell<Option<Weak<PrototypeData>>>,
    pub hooks: RefCell<MagicHooks>,
}

#[derive(Debug, Clone)]
pub struct Prototype(pub Rc<PrototypeData>);

impl Prototype {
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn name(&self) -> Rc<str> {
        Rc::clone(&self.0.name)
    }

    /// Looks up a method on this prototype, falling through to the
    /// inherited prototype (if the back-reference is still alive) when not
    /// found locally.
    pub fn lookup_method(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.0.methods.borrow().get(name) {
            return Some(v.clone());
        }
        self.0.inherits.borrow().as_ref().and_then(Weak::upgrade).and_then(|parent| Prototype(parent).lookup_method(name))
    }
}

impl PartialEq for Prototype {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0.name)
    }
}

/// Owns every `define`d prototype for the lifetime of a VM, so that
/// `Prototype.inherits` can be a non-owning [`Weak`] reference instead of a
/// reference-counting cycle.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    prototypes: RefCell<IndexMap<Rc<str>, Rc<PrototypeData>>>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares (or redeclares) a type, per the `define` construction rule:
    /// fields and methods are reset, then repopulated from the prototype
    /// block's resulting dictionary.
    pub fn declare(&self, name: Rc<str>) -> Prototype {
        let mut table = self.prototypes.borrow_mut();
        if let Some(existing) = table.get(&name) {
            *existing.fields.borrow_mut() = Vec::new();
            *existing.methods.borrow_mut() = IndexMap::new();
            *existing.inherits.borrow_mut() = None;
            *existing.hooks.borrow_mut() = MagicHooks::default();
            return Prototype(Rc::clone(existing));
        }
        let data = Rc::new(PrototypeData {
            name: Rc::clone(&name),
            fields: RefCell::new(Vec::new()),
            methods: RefCell::new(IndexMap::new()),
            inherits: RefCell::new(None),
            hooks: RefCell::new(MagicHooks::default()),
        });
        table.insert(name, Rc::clone(&data));
        Prototype(data)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Prototype> {
        self.prototypes.borrow().get(name).cloned().map(Prototype)
    }
}

/// An instance of a user-defined type: a field/method map plus the
/// prototype it was constructed from.
#[derive(Debug)]
pub struct ObjectData {
    pub prototype: Prototype,
    pub fields: RefCell<IndexMap<Rc<str>, Value>>,
}

#[derive(Debug, Clone)]
pub struct ObjectInstance(pub Rc<ObjectData>);

impl ObjectInstance {
    #[must_use]
    pub fn new(prototype: Prototype, fields: IndexMap<Rc<str>, Value>) -> Self {
        Self(Rc::new(ObjectData { prototype, fields: RefCell::new(fields) }))
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.0.fields.borrow().get(name) {
            return Some(v.clone());
        }
        self.0.prototype.lookup_method(name)
    }

    pub fn set(&self, name: Rc<str>, value: Value) {
        self.0.fields.borrow_mut().insert(name, value);
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ObjectInstance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Display for ObjectInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (k, v)) in self.0.fields.borrow().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inheritance_falls_through_to_parent_methods() {
        let registry = TypeRegistry::new();
        let base = registry.declare(Rc::from("base"));
        base.0.methods.borrow_mut().insert(Rc::from("greet"), Value::Null);
        let child = registry.declare(Rc::from("child"));
        *child.0.inherits.borrow_mut() = Some(Rc::downgrade(&base.0));

        assert!(child.lookup_method("greet").is_some());
        assert!(child.lookup_method("nope").is_none());
    }

    #[test]
    fn redeclare_resets_fields_and_methods() {
        let registry = TypeRegistry::new();
        let p = registry.declare(Rc::from("p"));
        p.0.methods.borrow_mut().insert(Rc::from("m"), Value::Null);
        let p2 = registry.declare(Rc::from("p"));
        assert!(p2.0.methods.borrow().is_empty());
        assert!(p.ptr_eq(&p2));
    }
}
