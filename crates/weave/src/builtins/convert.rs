//! `to`/`as`: the builtin faces of the conversion engine in [`crate::convert`].
//! `to` takes an explicit target tag; `as` reads the target from its own
//! name's attribute (`as.binary`, `as.hex`, ...) instead of a second argument.

use std::rc::Rc;

use ahash::AHashMap;

use crate::{bytecode::vm::Vm, error::{Error, WeaveResult}, value::Value};

pub fn to(vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    if args.len() != 2 {
        return Err(Error::ArityMismatch { expected: "2".into(), got: args.len(), pos: None });
    }
    let source = args.pop().unwrap();
    let target = args.pop().unwrap();
    let target_name = match &target {
        Value::Type(t) => t.to_string(),
        other => other.as_string().map(ToString::to_string).unwrap_or_else(|| other.codify(false)),
    };
    vm.convert_value(&source, &target_name, None)
}

/// `as.binary x`, `as.hex x`, ...: the format name rides in on the attached
/// attribute rather than a positional argument. With no recognized format
/// attribute, `as` falls back to stringifying (`as` with no attribute is
/// `to :string`).
pub fn as_(vm: &mut Vm, mut args: Vec<Value>, attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let source = args.pop().ok_or_else(|| Error::ArityMismatch { expected: "1".into(), got: 0, pos: None })?;
    let format = ["binary", "hex", "octal"].into_iter().find(|f| attrs.contains_key(*f));
    vm.convert_value(&source, "string", format)
}
