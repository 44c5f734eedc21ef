//! Collection operations (`size`, `reverse`, `append`, `join`, `split`,
//! `replace`) and the `range` generator.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{
    block::Range,
    bytecode::vm::Vm,
    error::{Error, WeaveResult},
    value::Value,
};

pub fn size(_vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let v = one(&mut args)?;
    let n = match &v {
        Value::String(s) => s.chars().count(),
        Value::Block(b) | Value::Inline(b) => b.len(),
        Value::Dictionary(d) => d.len(),
        Value::Binary(b) => b.len(),
        _ => return Err(Error::type_mismatch(format!("`size` is not defined for {}", v.type_name()))),
    };
    Ok(Value::integer_small(n as i64))
}

pub fn reverse(_vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let v = one(&mut args)?;
    match v {
        Value::String(s) => Ok(Value::string(s.chars().rev().collect::<String>())),
        Value::Block(b) | Value::Inline(b) => {
            let mut items = b.items().clone();
            items.reverse();
            Ok(Value::array(items))
        }
        other => Err(Error::type_mismatch(format!("`reverse` is not defined for {}", other.type_name()))),
    }
}

pub fn append(_vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let (a, b) = two(&mut args)?;
    match a {
        Value::String(s) => Ok(Value::string(format!("{s}{}", b.codify(false)))),
        Value::Block(block) | Value::Inline(block) => {
            let mut items = block.items().clone();
            items.push(b);
            Ok(Value::array(items))
        }
        other => Err(Error::type_mismatch(format!("`append` is not defined for {}", other.type_name()))),
    }
}

pub fn join(_vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let (a, sep) = two(&mut args)?;
    let Value::Block(b) | Value::Inline(b) = a else {
        return Err(Error::type_mismatch("`join` expects a block as its first argument"));
    };
    let sep = sep.as_string().map(ToString::to_string).unwrap_or_else(|| sep.codify(false));
    let joined = b.items().iter().map(|v| v.to_string()).collect::<Vec<_>>().join(&sep);
    Ok(Value::string(joined))
}

pub fn split(_vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let (a, sep) = two(&mut args)?;
    let Value::String(s) = a else {
        return Err(Error::type_mismatch("`split` expects a string as its first argument"));
    };
    let Value::String(sep) = sep else {
        return Err(Error::type_mismatch("`split` expects a string separator"));
    };
    let parts = if sep.is_empty() {
        s.chars().map(|c| Value::string(c.to_string())).collect()
    } else {
        s.split(sep.as_ref()).map(Value::string).collect()
    };
    Ok(Value::array(parts))
}

pub fn replace(_vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    if args.len() != 3 {
        return Err(Error::ArityMismatch { expected: "3".into(), got: args.len(), pos: None });
    }
    let to = args.pop().unwrap();
    let from = args.pop().unwrap();
    let source = args.pop().unwrap();
    let Value::String(s) = source else {
        return Err(Error::type_mismatch("`replace` expects a string as its first argument"));
    };
    let from = from.as_string().map(ToString::to_string).unwrap_or_else(|| from.codify(false));
    let to = to.as_string().map(ToString::to_string).unwrap_or_else(|| to.codify(false));
    Ok(Value::string(s.replace(&from, &to)))
}

/// `range start stop`, with an optional `.step` attribute (default `1`).
pub fn range(_vm: &mut Vm, mut args: Vec<Value>, attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let (start, stop) = two(&mut args)?;
    let start = start.as_integer_i64().ok_or_else(|| Error::type_mismatch("`range` expects integer bounds"))?;
    let stop = stop.as_integer_i64().ok_or_else(|| Error::type_mismatch("`range` expects integer bounds"))?;
    let step = attrs.get("step").and_then(Value::as_integer_i64).unwrap_or(1);
    Range::new(start, Some(stop), step, true).map(Value::Range).ok_or(Error::RangeWithZeroStep)
}

fn one(args: &mut Vec<Value>) -> WeaveResult<Value> {
    if args.len() != 1 {
        return Err(Error::ArityMismatch { expected: "1".into(), got: args.len(), pos: None });
    }
    Ok(args.pop().unwrap())
}

fn two(args: &mut Vec<Value>) -> WeaveResult<(Value, Value)> {
    if args.len() != 2 {
        return Err(Error::ArityMismatch { expected: "2".into(), got: args.len(), pos: None });
    }
    let b = args.pop().unwrap();
    let a = args.pop().unwrap();
    Ok((a, b))
}
