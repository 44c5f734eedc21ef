//! Public, non-interactive entry point: parse a source string and run it to
//! completion against a fresh [`Vm`].
//!
//! `Runner` is cheap to construct and does not persist state across calls —
//! each [`Runner::run_str`] call gets its own [`Vm`] (and thus its own global
//! scope, type registry, and builtin registry). Use [`crate::repl::ReplSession`]
//! instead when bindings need to survive across multiple snippets.

use crate::{bytecode::vm::Vm, error::WeaveResult, io::PrintWriter, resource::ResourceLimits, tracer::StderrTracer, value::Value};

/// The outcome of running one piece of source text.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub value: Value,
}

/// Runs isolated snippets of source text, one [`Vm`] per call.
#[derive(Debug, Default)]
pub struct Runner {
    limits: ResourceLimits,
    trace: bool,
}

impl Runner {
    #[must_use]
    pub fn new() -> Self {
        Self { limits: ResourceLimits::default(), trace: false }
    }

    #[must_use]
    pub fn with_limits(limits: ResourceLimits) -> Self {
        Self { limits, trace: false }
    }

    /// Enables [`StderrTracer`] on every `Vm` this runner constructs —
    /// the CLI flips this on via `WEAVE_TRACE=1` or `--trace`.
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Parses and runs `source` to completion, returning the last value
    /// produced at the top level (`Null` if the source produced nothing).
    pub fn run_str(&self, source: &str) -> WeaveResult<RunResult> {
        self.run_str_with_writer(source, None)
    }

    /// Like [`Self::run_str`], but routes `print` output through `writer`
    /// instead of the process's real stdout — used by hosts that need to
    /// capture or suppress it.
    pub fn run_str_with_writer(&self, source: &str, writer: Option<Box<dyn PrintWriter>>) -> WeaveResult<RunResult> {
        let mut vm = Vm::new();
        vm.limits = self.limits;
        if self.trace {
            vm.set_tracer(Box::new(StderrTracer::new()));
        }
        if let Some(writer) = writer {
            vm.set_print_writer(writer);
        }
        let value = vm.eval_source(source)?;
        Ok(RunResult { value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_a_simple_expression() {
        let runner = Runner::new();
        let result = runner.run_str("1 + 2").unwrap();
        assert_eq!(result.value, Value::integer_small(3));
    }

    #[test]
    fn each_call_starts_with_a_fresh_scope() {
        let runner = Runner::new();
        runner.run_str("x: 10").unwrap();
        // `x` from the previous call does not leak into this one.
        assert!(runner.run_str("x").is_err());
    }
}
