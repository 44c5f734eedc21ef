//! The concrete scenarios and universal invariants, run end to end through
//! [`Runner`] rather than against any single internal module.

use weave::{Error, Runner, SharedBufferPrint, Value};

fn run_capturing(source: &str) -> (Result<Value, Error>, String) {
    let runner = Runner::new();
    let print = SharedBufferPrint::new();
    let handle = print.handle();
    let result = runner.run_str_with_writer(source, Some(Box::new(print))).map(|r| r.value);
    let out = handle.borrow().clone();
    (result, out)
}

#[test]
fn scenario_1_print_hello_world() {
    let (result, out) = run_capturing(r#"print "Hello world!""#);
    assert!(result.is_ok());
    assert_eq!(out, "Hello world!\n");
}

#[test]
fn scenario_2_loop_over_a_range_literal() {
    let (result, out) = run_capturing("loop 1..3 'x [print x]");
    assert!(result.is_ok());
    assert_eq!(out, "1\n2\n3\n");
}

#[test]
fn scenario_3_recursive_fibonacci() {
    let (result, out) = run_capturing(
        "fib: $[x][if? x<2 [1] else [(fib x-1)+(fib x-2)]]\nprint fib 10",
    );
    assert!(result.is_ok());
    assert_eq!(out, "89\n");
}

#[test]
fn scenario_4_to_integer_from_string() {
    let runner = Runner::new();
    let result = runner.run_str(r#"to :integer "2020""#).unwrap();
    assert_eq!(result.value, Value::integer_small(2020));
}

#[test]
fn scenario_5_construct_an_object_from_a_block() {
    let (result, out) = run_capturing(
        "define :p [name age][]\nprint to :p [\"John\" 35]",
    );
    assert!(result.is_ok());
    assert!(out.contains("name:"), "expected a `name:` field in {out:?}");
    assert!(out.contains("John"), "expected the value `John` in {out:?}");
    assert!(out.contains("age:"), "expected an `age:` field in {out:?}");
    assert!(out.contains("35"), "expected the value `35` in {out:?}");
}

#[test]
fn scenario_6_to_integer_from_unparseable_string_fails() {
    let runner = Runner::new();
    let err = runner.run_str(r#"to :integer "nope""#).unwrap_err();
    assert!(matches!(err, Error::ConversionFailed { .. }), "got {err:?}");
}

#[test]
fn scenario_7_range_with_zero_step_is_rejected() {
    let runner = Runner::new();
    let err = runner.run_str("range 1 10 .step:0").unwrap_err();
    assert!(matches!(err, Error::RangeWithZeroStep), "got {err:?}");
}

#[test]
fn scenario_8_as_binary_formats_an_integer() {
    let runner = Runner::new();
    let result = runner.run_str("as.binary 11").unwrap();
    assert_eq!(result.value, Value::string("1011"));
}

// --- Properties that should hold across the language generally ---

#[test]
fn conversion_round_trips_through_its_own_inverse() {
    let runner = Runner::new();
    let result = runner.run_str(r#"to :string to :integer "2020""#).unwrap();
    assert_eq!(result.value, Value::string("2020"));
}

#[test]
fn stack_underflow_is_reported_not_a_host_crash() {
    // Hand-assembled rather than parsed from source: the translator never
    // emits `Add` without two operands already pushed, so the only way to
    // exercise the dispatch loop's own bounds-checking is to feed it a
    // malformed instruction stream directly.
    let code = std::rc::Rc::new(weave::Code::new(Vec::new(), vec![weave::Opcode::Add as u8, weave::Opcode::Ret as u8], Vec::new()));
    let mut vm = weave::Vm::new();
    let err = vm.run_value(&code).unwrap_err();
    assert!(matches!(err, Error::StackUnderflow), "got {err:?}");
}

#[test]
fn stack_depth_is_unchanged_when_a_builtin_errors() {
    // The builtin-registry calling convention hands a builtin its arguments
    // as a `Vec`, not the live evaluation stack — so a failing builtin
    // (`to` given a string it can't parse) should never touch `vm.stack`
    // at all, success or failure.
    let mut vm = weave::Vm::new();
    vm.stack.push(Value::integer_small(7));
    let depth_before = vm.stack.len();
    let err = vm.invoke("to", vec![Value::Type(std::rc::Rc::from("integer")), Value::string("nope")]);
    assert!(err.is_err());
    assert_eq!(vm.stack.len(), depth_before);
}

#[test]
fn memoized_function_runs_its_body_once_per_distinct_argument_tuple() {
    // The side effect lives in `print` output (routed through the `Vm`
    // directly) rather than a mutated counter variable, since a function
    // call's assignments land in its own pushed scope and never reach back
    // into an enclosing one.
    let (result, out) = run_capturing(".memoize counted: $[x][print x x * 2]\n(counted 5) + (counted 5)");
    assert_eq!(result.unwrap(), Value::integer_small(20));
    assert_eq!(out, "5\n", "second call with the same argument must not re-run the body");
}
