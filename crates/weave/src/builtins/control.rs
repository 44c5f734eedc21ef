//! Control-flow and iteration builtins. These compile as ordinary `Call`
//! opcodes (see `bytecode::translator`'s module doc) — `if`, `while`,
//! `loop`... are native functions here, not VM opcodes, so there is exactly
//! one implementation of "run this block, see what it produced" regardless
//! of whether the caller wrote `if` or hand-assembled the `If` opcode.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    block::Block,
    bytecode::vm::Vm,
    error::{ControlFlow, Error, WeaveResult},
    value::Value,
};

fn require_block(v: &Value, who: &str) -> WeaveResult<Block> {
    v.as_block().cloned().ok_or_else(|| Error::type_mismatch(format!("`{who}` expects a block argument")))
}

pub fn if_(vm: &mut Vm, args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let [cond, then] = take2(args)?;
    if cond.truthy() { vm.execute_value(&require_block(&then, "if")?) } else { Ok(Value::Null) }
}

pub fn unless(vm: &mut Vm, args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let [cond, then] = take2(args)?;
    if !cond.truthy() { vm.execute_value(&require_block(&then, "unless")?) } else { Ok(Value::Null) }
}

/// `else` always follows an `if?`/`unless?` in source (see the translator's
/// trailing-chain handling); its first argument is the value the prior
/// expression produced and its second is the arm to run when that value was
/// never taken — i.e. was `Null` because the condition was falsy.
pub fn else_(vm: &mut Vm, args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let [prior, otherwise] = take2(args)?;
    if prior == Value::Null { vm.execute_value(&require_block(&otherwise, "else")?) } else { Ok(prior) }
}

pub fn while_(vm: &mut Vm, args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let [cond, body] = take2(args)?;
    let cond_block = require_block(&cond, "while")?;
    let body_block = require_block(&body, "while")?;
    loop {
        if vm.stop_requested() {
            return Err(Error::Internal("execution was stopped".into()));
        }
        if !vm.execute_value(&cond_block)?.truthy() {
            return Ok(Value::Null);
        }
        match vm.execute_value(&body_block) {
            Ok(_) => {}
            Err(Error::Control(ControlFlow::Break)) => return Ok(Value::Null),
            Err(Error::Control(ControlFlow::Continue)) => {}
            Err(e) => return Err(e),
        }
    }
}

/// `loop <iterable> 'name [body]`: binds each element to `name` in a fresh
/// scope and runs `body`, discarding its value. Accepts a `Range` or a
/// `Block`/array.
pub fn loop_(vm: &mut Vm, args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let (iterable, name, body) = take3(args)?;
    let name = param_name(&name, "loop")?;
    let body_block = require_block(&body, "loop")?;
    for item in iterate(&iterable)? {
        if vm.stop_requested() {
            return Err(Error::Internal("execution was stopped".into()));
        }
        vm.symbols.push_scope();
        vm.symbols.bind(Rc::clone(&name), item);
        let result = vm.execute_value(&body_block);
        vm.symbols.pop_scope();
        match result {
            Ok(_) => {}
            Err(Error::Control(ControlFlow::Break)) => break,
            Err(Error::Control(ControlFlow::Continue)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Value::Null)
}

pub fn map(vm: &mut Vm, args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let (iterable, name, body) = take3(args)?;
    let name = param_name(&name, "map")?;
    let body_block = require_block(&body, "map")?;
    let mut out = Vec::new();
    for item in iterate(&iterable)? {
        vm.symbols.push_scope();
        vm.symbols.bind(Rc::clone(&name), item);
        let result = vm.execute_value(&body_block);
        vm.symbols.pop_scope();
        match result {
            Ok(v) => out.push(v),
            Err(Error::Control(ControlFlow::Break)) => break,
            Err(Error::Control(ControlFlow::Continue)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Value::array(out))
}

pub fn select(vm: &mut Vm, args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let (iterable, name, body) = take3(args)?;
    let name = param_name(&name, "select")?;
    let body_block = require_block(&body, "select")?;
    let mut out = Vec::new();
    for item in iterate(&iterable)? {
        vm.symbols.push_scope();
        vm.symbols.bind(Rc::clone(&name), item.clone());
        let result = vm.execute_value(&body_block);
        vm.symbols.pop_scope();
        match result {
            Ok(v) if v.truthy() => out.push(item),
            Ok(_) => {}
            Err(Error::Control(ControlFlow::Break)) => break,
            Err(Error::Control(ControlFlow::Continue)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Value::array(out))
}

pub fn return_(_vm: &mut Vm, args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    Err(Error::Control(ControlFlow::Return(args.into_iter().next().unwrap_or(Value::Null))))
}

pub fn break_(_vm: &mut Vm, _args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    Err(Error::Control(ControlFlow::Break))
}

pub fn continue_(_vm: &mut Vm, _args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    Err(Error::Control(ControlFlow::Continue))
}

fn take2(mut args: Vec<Value>) -> WeaveResult<[Value; 2]> {
    if args.len() != 2 {
        return Err(Error::ArityMismatch { expected: "2".into(), got: args.len(), pos: None });
    }
    let b = args.pop().unwrap();
    let a = args.pop().unwrap();
    Ok([a, b])
}

fn take3(mut args: Vec<Value>) -> WeaveResult<(Value, Value, Value)> {
    if args.len() != 3 {
        return Err(Error::ArityMismatch { expected: "3".into(), got: args.len(), pos: None });
    }
    let c = args.pop().unwrap();
    let b = args.pop().unwrap();
    let a = args.pop().unwrap();
    Ok((a, b, c))
}

fn param_name(v: &Value, who: &str) -> WeaveResult<Rc<str>> {
    match v {
        Value::Literal(s) | Value::Word(s) => Ok(Rc::clone(s)),
        _ => Err(Error::type_mismatch(format!("`{who}` expects a literal parameter name ('x)"))),
    }
}

fn iterate(v: &Value) -> WeaveResult<Vec<Value>> {
    match v {
        Value::Range(r) => Ok(r.iter().map(Value::integer_small).collect()),
        Value::Block(b) | Value::Inline(b) => Ok(b.items().clone()),
        _ => Err(Error::type_mismatch(format!("{} is not iterable", v.type_name()))),
    }
}
