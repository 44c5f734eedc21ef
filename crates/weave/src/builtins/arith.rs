//! Scalar arithmetic shared by the `Add`/`Sub`/.../`Neg` opcodes and the
//! infix-operator translation (`x - 1`) — both paths funnel through here so
//! there's one definition of numeric promotion and overflow handling.

use crate::{
    error::{Error, WeaveResult},
    numeric::IntegerValue,
    value::Value,
};

fn type_error(op: &str, a: &Value, b: &Value) -> Error {
    Error::type_mismatch(format!("`{op}` is not defined between {} and {}", a.type_name(), b.type_name()))
}

pub fn add(a: &Value, b: &Value) -> WeaveResult<Value> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x.checked_add(y))),
        (Value::String(x), Value::String(y)) => Ok(Value::string(format!("{x}{y}"))),
        _ if a.type_name() == "floating" || b.type_name() == "floating" => numeric_f64(a, b, "+", |x, y| x + y),
        _ => Err(type_error("+", a, b)),
    }
}

pub fn sub(a: &Value, b: &Value) -> WeaveResult<Value> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x.checked_sub(y))),
        _ if a.type_name() == "floating" || b.type_name() == "floating" => numeric_f64(a, b, "-", |x, y| x - y),
        _ => Err(type_error("-", a, b)),
    }
}

pub fn mul(a: &Value, b: &Value) -> WeaveResult<Value> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok(Value::Integer(x.checked_mul(y))),
        _ if a.type_name() == "floating" || b.type_name() == "floating" => numeric_f64(a, b, "*", |x, y| x * y),
        _ => Err(type_error("*", a, b)),
    }
}

pub fn div(a: &Value, b: &Value) -> WeaveResult<Value> {
    numeric_f64(a, b, "/", |x, y| x / y)
}

pub fn fdiv(a: &Value, b: &Value) -> WeaveResult<Value> {
    match (a.as_integer_i64(), b.as_integer_i64()) {
        (Some(_), Some(0)) => Err(Error::type_mismatch("`//` cannot divide by zero")),
        (Some(x), Some(y)) => Ok(Value::integer_small(x.div_euclid(y))),
        _ => numeric_f64(a, b, "//", |x, y| (x / y).floor()),
    }
}

pub fn modulo(a: &Value, b: &Value) -> WeaveResult<Value> {
    match (a.as_integer_i64(), b.as_integer_i64()) {
        (Some(_), Some(0)) => Err(Error::type_mismatch("`%` cannot divide by zero")),
        (Some(x), Some(y)) => Ok(Value::integer_small(x.rem_euclid(y))),
        _ => numeric_f64(a, b, "%", |x, y| x.rem_euclid(y)),
    }
}

pub fn pow(a: &Value, b: &Value) -> WeaveResult<Value> {
    if let (Some(x), Some(y)) = (a.as_integer_i64(), b.as_integer_i64()) {
        if y >= 0 {
            if let Ok(exp) = u32::try_from(y) {
                return Ok(Value::Integer(IntegerValue::big(num_bigint::BigInt::from(x).pow(exp))));
            }
        }
    }
    numeric_f64(a, b, "^", f64::powf)
}

pub fn negate(a: &Value) -> WeaveResult<Value> {
    match a {
        Value::Integer(v) => Ok(Value::Integer(v.negate())),
        Value::Floating(v) => Ok(Value::Floating(-v)),
        _ => Err(Error::type_mismatch(format!("`-` is not defined for {}", a.type_name()))),
    }
}

fn numeric_f64(a: &Value, b: &Value, op: &str, f: impl Fn(f64, f64) -> f64) -> WeaveResult<Value> {
    let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) else {
        return Err(type_error(op, a, b));
    };
    Ok(Value::Floating(f(x, y)))
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(i) => Some(i.to_f64()),
        Value::Floating(f) => Some(*f),
        Value::Rational(r) => Some(r.to_f64()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_add_stays_small_when_it_fits() {
        let v = add(&Value::integer_small(1), &Value::integer_small(2)).unwrap();
        assert_eq!(v, Value::integer_small(3));
    }

    #[test]
    fn integer_overflow_promotes_to_big() {
        let v = add(&Value::integer_small(i64::MAX), &Value::integer_small(1)).unwrap();
        let Value::Integer(IntegerValue::Big(_)) = v else { panic!("expected promotion") };
    }

    #[test]
    fn mixed_integer_float_promotes_to_floating() {
        let v = add(&Value::integer_small(1), &Value::Floating(0.5)).unwrap();
        assert_eq!(v, Value::Floating(1.5));
    }

    #[test]
    fn division_by_zero_integer_is_a_type_mismatch() {
        let err = fdiv(&Value::integer_small(1), &Value::integer_small(0)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
