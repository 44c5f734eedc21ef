//! `define :name [fields...] [methods...]`: declares (or redeclares) a
//! user type in the VM's [`crate::object::TypeRegistry`].
//!
//! `.as :parent` inherits the parent's methods (shallow copy, overridden by
//! this type's own); `.having [fields...]` adds further field names beyond
//! the positional fields block. Three method names are magic: `init`,
//! `print`, and `compare` are pulled out of the regular method table, given
//! `this` as their first parameter, and installed as the prototype's
//! `doInit`/`doPrint`/`doCompare` hooks instead of being callable directly.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{bytecode::vm::Vm, error::{Error, WeaveResult}, function::{Function, Param}, value::Value};

pub fn define(vm: &mut Vm, mut args: Vec<Value>, attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    if args.len() != 3 {
        return Err(Error::ArityMismatch { expected: "3".into(), got: args.len(), pos: None });
    }
    let methods_block = args.pop().unwrap();
    let fields_block = args.pop().unwrap();
    let tag = args.pop().unwrap();
    let Value::Type(name) = tag else {
        return Err(Error::type_mismatch("`define` expects a type tag (`:name`) as its first argument"));
    };
    let fields = fields_block.as_block().ok_or_else(|| Error::type_mismatch("`define` expects a field-name block"))?;
    let mut field_names = field_names_of(fields);
    if let Some(having) = attrs.get("having").and_then(Value::as_block) {
        field_names.extend(field_names_of(having));
    }

    let proto = vm.types.declare(Rc::clone(&name));
    *proto.0.fields.borrow_mut() = field_names;

    if let Some(Value::Type(parent_name)) = attrs.get("as") {
        let parent = vm.types.get(parent_name).ok_or_else(|| Error::symbol_not_found(parent_name.as_ref()))?;
        *proto.0.methods.borrow_mut() = parent.0.methods.borrow().clone();
        *proto.0.hooks.borrow_mut() = parent.0.hooks.borrow().clone();
        *proto.0.inherits.borrow_mut() = Some(Rc::downgrade(&parent.0));
    }

    // Methods are declared `name: $[params][body]` inside the methods
    // block; executing it binds each one as a `Function` in the pushed
    // scope, then the bindings are copied onto the prototype by name —
    // except the three magic names, which become hooks instead.
    if let Some(methods) = methods_block.as_block() {
        vm.symbols.push_scope();
        let run = vm.execute_value(methods);
        let names: Vec<Rc<str>> = methods
            .items()
            .iter()
            .filter_map(|v| match v {
                Value::Label(n) => Some(Rc::clone(n)),
                _ => None,
            })
            .collect();
        for method_name in names {
            let Some(Value::Function(f)) = vm.symbols.lookup(&method_name).cloned() else { continue };
            match method_name.as_ref() {
                "init" => proto.0.hooks.borrow_mut().do_init = Some(Value::Function(with_this_prepended(&f))),
                "print" => proto.0.hooks.borrow_mut().do_print = Some(Value::Function(with_this_prepended(&f))),
                "compare" => proto.0.hooks.borrow_mut().do_compare = Some(Value::Function(with_this_prepended(&f))),
                _ => {
                    proto.0.methods.borrow_mut().insert(method_name, Value::Function(f));
                }
            }
        }
        vm.symbols.pop_scope();
        run?;
    }

    Ok(Value::Type(name))
}

fn field_names_of(block: &crate::block::Block) -> Vec<Rc<str>> {
    block
        .items()
        .iter()
        .filter_map(|v| match v {
            Value::Word(n) => Some(Rc::clone(n)),
            _ => None,
        })
        .collect()
}

/// Magic methods are declared without `this` (`print: $[][...]`); the
/// installed hook always receives the instance as its first argument.
fn with_this_prepended(f: &Function) -> Function {
    let mut params = vec![Param::unconstrained(Rc::from("this"))];
    params.extend(f.0.params.iter().cloned());
    Function::new(params, f.0.body.clone(), f.0.imports.clone(), f.0.exports.clone(), f.0.memoize, f.0.inline, f.0.info.clone())
}
