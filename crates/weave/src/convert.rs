//! The conversion engine: `to`/`as` target-tag conversions per the data
//! model's conversion matrix. `convert` is total over every `(source, target)`
//! pair it's handed — unreachable pairs raise [`Error::CannotConvert`],
//! validation failures on a reachable pair raise [`Error::ConversionFailed`].

use std::rc::Rc;

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    block::Block,
    bytecode::{code::Code, translator},
    color::Color,
    dict::Dictionary,
    error::{Error, WeaveResult},
    numeric::IntegerValue,
    object::{ObjectInstance, Prototype},
    value::Value,
};

/// The `Vm` operations the conversion engine needs without depending on
/// `Vm` directly: running a block "unscoped" for the dictionary/object
/// constructions, and invoking a function value for their magic hooks.
pub trait ConvertHost {
    fn run_block(&mut self, block: &Block) -> WeaveResult<Vec<Value>>;
    fn invoke_function(&mut self, f: &Value, args: Vec<Value>) -> WeaveResult<Value>;
}

/// Converts `source` to the tag named `target`, using `format` for the
/// conversions that take one (currently only `binary`'s base).
pub fn convert(source: &Value, target: &str, format: Option<&str>, types: &crate::object::TypeRegistry, host: &mut dyn ConvertHost) -> WeaveResult<Value> {
    if source.type_name() == target {
        return Ok(source.clone());
    }
    match target {
        "logical" => to_logical(source),
        "integer" => to_integer(source),
        "floating" => to_floating(source),
        "char" => to_char(source),
        "string" => Ok(Value::string(to_string_form(source, format)?)),
        "date" => to_date(source),
        "block" => to_block(source),
        "dictionary" => to_dictionary(source, host),
        "bytecode" => to_bytecode(source),
        "color" => to_color(source),
        _ => {
            if let Some(proto) = types.get(target) {
                return to_object(source, proto, host);
            }
            Err(Error::CannotConvert { from: source.type_name(), to: leak(target) })
        }
    }
}

/// Leaks a runtime type-tag string into `'static` so it can ride in
/// [`Error::CannotConvert`] alongside the `Value::type_name()` constants.
/// Only reached on the (rare, non-hot) conversion-failure path.
fn leak(s: &str) -> &'static str {
    Box::leak(s.to_string().into_boxed_str())
}

fn to_logical(source: &Value) -> WeaveResult<Value> {
    match source {
        Value::Null => Ok(Value::Logical(false)),
        Value::Integer(v) => Ok(Value::Logical(!v.is_zero())),
        _ => Err(Error::CannotConvert { from: source.type_name(), to: "logical" }),
    }
}

fn to_integer(source: &Value) -> WeaveResult<Value> {
    match source {
        Value::Logical(b) => Ok(Value::integer_small(i64::from(*b))),
        Value::Floating(f) => Ok(Value::integer_small(*f as i64)),
        Value::Char(c) => Ok(Value::integer_small(i64::from(*c as u32))),
        Value::Date(d) => Ok(Value::integer_small(d.timestamp())),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::integer_small)
            .or_else(|_| s.trim().parse::<num_bigint::BigInt>().map(Value::integer_big))
            .map_err(|_| Error::conversion_failed(format!("'{s}' is not a valid integer"))),
        _ => Err(Error::CannotConvert { from: source.type_name(), to: "integer" }),
    }
}

fn to_floating(source: &Value) -> WeaveResult<Value> {
    match source {
        Value::Integer(v) => Ok(Value::Floating(v.to_f64())),
        Value::Rational(v) => Ok(Value::Floating(v.to_f64())),
        Value::String(s) => {
            s.trim().parse::<f64>().map(Value::Floating).map_err(|_| Error::conversion_failed(format!("'{s}' is not a valid floating-point number")))
        }
        _ => Err(Error::CannotConvert { from: source.type_name(), to: "floating" }),
    }
}

fn to_char(source: &Value) -> WeaveResult<Value> {
    match source {
        Value::Integer(IntegerValue::Small(v)) => {
            u32::try_from(*v).ok().and_then(char::from_u32).map(Value::Char).ok_or_else(|| Error::conversion_failed(format!("{v} is not a valid code point")))
        }
        _ => Err(Error::CannotConvert { from: source.type_name(), to: "char" }),
    }
}

fn to_string_form(source: &Value, format: Option<&str>) -> WeaveResult<String> {
    if format == Some("binary") {
        let n = source.as_integer_i64().ok_or_else(|| Error::type_mismatch("`as.binary` requires an integer"))?;
        return Ok(to_binary_string(n));
    }
    Ok(source.codify(false))
}

fn to_binary_string(n: i64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut bits = String::new();
    let mut v = n.unsigned_abs();
    while v > 0 {
        bits.push(if v & 1 == 1 { '1' } else { '0' });
        v >>= 1;
    }
    if n < 0 {
        bits.push('-');
    }
    bits.chars().rev().collect()
}

fn to_date(source: &Value) -> WeaveResult<Value> {
    match source {
        Value::Integer(v) => {
            let secs = i64::try_from(v.to_big()).map_err(|_| Error::conversion_failed("integer out of range for a date"))?;
            Utc.timestamp_opt(secs, 0).single().map(Value::Date).ok_or_else(|| Error::conversion_failed(format!("{secs} is not a valid Unix timestamp")))
        }
        Value::String(s) => {
            DateTime::parse_from_rfc3339(s).map(|d| Value::Date(d.with_timezone(&Utc))).map_err(|_| Error::conversion_failed(format!("'{s}' is not a valid date")))
        }
        _ => Err(Error::CannotConvert { from: source.type_name(), to: "date" }),
    }
}

fn to_color(source: &Value) -> WeaveResult<Value> {
    match source {
        Value::String(s) => Color::parse_hex(s).map(Value::Color).ok_or_else(|| Error::conversion_failed(format!("'{s}' is not a valid hex color"))),
        _ => Err(Error::CannotConvert { from: source.type_name(), to: "color" }),
    }
}

fn to_block(source: &Value) -> WeaveResult<Value> {
    match source {
        Value::String(s) => crate::parser::parse(s).map(Value::Block).map_err(|e| Error::conversion_failed(e.to_string())),
        _ => Err(Error::CannotConvert { from: source.type_name(), to: "block" }),
    }
}

/// `Block → Dictionary`: execute the block unscoped and pair adjacent
/// values left on the stack as `(key, value)`; the key is stringified via
/// `codify` so any leaf tag (word, string, integer...) can serve as a key.
fn to_dictionary(source: &Value, host: &mut dyn ConvertHost) -> WeaveResult<Value> {
    let block = source.as_block().ok_or_else(|| Error::CannotConvert { from: source.type_name(), to: "dictionary" })?;
    let values = host.run_block(block)?;
    let dict = Dictionary::new();
    let mut it = values.into_iter();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        dict.insert(Rc::from(k.codify(false)), v);
    }
    Ok(Value::Dictionary(dict))
}

/// `Block → <user type>`: execute the block unscoped and bind the values it
/// leaves, positionally, to the prototype's declared fields, then invoke
/// `doInit` with the instance and the same argument tuple if the type
/// declares one.
fn to_object(source: &Value, proto: Prototype, host: &mut dyn ConvertHost) -> WeaveResult<Value> {
    let block = source.as_block().ok_or_else(|| Error::CannotConvert { from: source.type_name(), to: "object" })?;
    let values = host.run_block(block)?;
    let fields = proto.0.fields.borrow().clone();
    let mut map = indexmap::IndexMap::new();
    for (name, value) in fields.into_iter().zip(values.iter().cloned()) {
        map.insert(name, value);
    }
    let do_init = proto.0.hooks.borrow().do_init.clone();
    let instance = Value::Object(ObjectInstance::new(proto, map));
    if let Some(init) = do_init {
        let mut init_args = vec![instance.clone()];
        init_args.extend(values);
        host.invoke_function(&init, init_args)?;
    }
    Ok(instance)
}

/// `Block → Bytecode`: translate the block, returning the resulting
/// `Translation`. `Dictionary → Bytecode`: expect keys `data` (constants)
/// and `code` (opcode bytes); reconstruct directly without re-translating.
fn to_bytecode(source: &Value) -> WeaveResult<Value> {
    match source {
        Value::Block(b) | Value::Inline(b) => {
            let code = translator::translate(b, &|_| None);
            Ok(Value::Bytecode(Rc::new(code)))
        }
        Value::Dictionary(d) => {
            let code = Code::from_dictionary(d)?;
            Ok(Value::Bytecode(Rc::new(code)))
        }
        _ => Err(Error::CannotConvert { from: source.type_name(), to: "bytecode" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::TypeRegistry;

    /// A `ConvertHost` stand-in that "executes" a block by returning a
    /// canned value tuple and records the last `invoke_function` call it
    /// was given, instead of running any real bytecode.
    #[derive(Default)]
    struct FakeHost {
        block_result: Vec<Value>,
        last_call: Option<(Value, Vec<Value>)>,
    }

    impl ConvertHost for FakeHost {
        fn run_block(&mut self, _block: &Block) -> WeaveResult<Vec<Value>> {
            Ok(self.block_result.clone())
        }

        fn invoke_function(&mut self, f: &Value, args: Vec<Value>) -> WeaveResult<Value> {
            self.last_call = Some((f.clone(), args));
            Ok(Value::Null)
        }
    }

    #[test]
    fn string_to_integer_parses() {
        let types = TypeRegistry::new();
        let mut host = FakeHost::default();
        let v = convert(&Value::string("2020"), "integer", None, &types, &mut host).unwrap();
        assert_eq!(v, Value::integer_small(2020));
    }

    #[test]
    fn non_numeric_string_to_integer_fails_conversion() {
        let types = TypeRegistry::new();
        let mut host = FakeHost::default();
        let err = convert(&Value::string("nope"), "integer", None, &types, &mut host).unwrap_err();
        assert!(matches!(err, Error::ConversionFailed { .. }));
    }

    #[test]
    fn unreachable_pair_is_cannot_convert() {
        let types = TypeRegistry::new();
        let mut host = FakeHost::default();
        let err = convert(&Value::Null, "char", None, &types, &mut host).unwrap_err();
        assert!(matches!(err, Error::CannotConvert { .. }));
    }

    #[test]
    fn integer_to_binary_string_matches_as_dot_binary() {
        let types = TypeRegistry::new();
        let mut host = FakeHost::default();
        let v = convert(&Value::integer_small(11), "string", Some("binary"), &types, &mut host).unwrap();
        assert_eq!(v, Value::string("1011"));
    }

    #[test]
    fn block_to_dictionary_pairs_adjacent_values() {
        let types = TypeRegistry::new();
        let mut host = FakeHost { block_result: vec![Value::string("name"), Value::string("John")], last_call: None };
        let v = convert(&Value::array(Vec::new()), "dictionary", None, &types, &mut host).unwrap();
        let Value::Dictionary(d) = v else { panic!("expected dictionary") };
        assert_eq!(d.get("name"), Some(Value::string("John")));
    }

    #[test]
    fn object_construction_invokes_do_init_with_the_instance_and_arguments() {
        let types = TypeRegistry::new();
        let proto = types.declare(Rc::from("p"));
        *proto.0.fields.borrow_mut() = vec![Rc::from("name")];
        let init_fn = crate::function::Function::new(Vec::new(), Block::empty(), crate::dict::Dictionary::new(), Vec::new(), false, false, None);
        proto.0.hooks.borrow_mut().do_init = Some(Value::Function(init_fn));
        let mut host = FakeHost { block_result: vec![Value::string("John")], last_call: None };

        let v = convert(&Value::array(Vec::new()), "p", None, &types, &mut host).unwrap();
        assert!(matches!(v, Value::Object(_)));
        let (_, args) = host.last_call.expect("doInit should have been invoked");
        assert_eq!(args.len(), 2, "doInit receives `this` plus the constructor argument tuple");
        assert_eq!(args[1], Value::string("John"));
    }
}
