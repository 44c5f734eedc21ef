//! `print`: writes a value's display form as one line through the VM's
//! [`crate::io::PrintWriter`].

use std::rc::Rc;

use ahash::AHashMap;

use crate::{bytecode::vm::Vm, error::WeaveResult, value::Value};

pub fn print(vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let v = args.pop().unwrap_or(Value::Null);
    let text = vm.display_value(&v)?;
    vm.print_writer.write_line(&text);
    Ok(Value::Null)
}

pub fn type_of(_vm: &mut Vm, mut args: Vec<Value>, _attrs: &AHashMap<Rc<str>, Value>) -> WeaveResult<Value> {
    let v = args.pop().unwrap_or(Value::Null);
    Ok(Value::Type(Rc::from(v.type_name())))
}
