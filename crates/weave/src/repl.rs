//! Persistent REPL session support: keeps one [`Vm`] alive across
//! `execute()` calls so bindings, functions, and user types accumulate the
//! way they would pasting one line at a time into an interactive prompt.

use crate::{
    bytecode::vm::Vm,
    error::WeaveResult,
    lexer::{Lexer, Token},
    tracer::VmTracer,
    value::Value,
};

/// Whether a line of input completes a parseable unit or needs more lines
/// appended before it can be evaluated (an open `[`/`(` with no matching
/// close yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStatus {
    Complete,
    Continuation,
}

/// Tracks bracket depth across lines typed at an interactive prompt.
///
/// Lexing each line independently (rather than re-lexing the whole buffer)
/// is enough here because the lexer has no multi-line string or comment
/// state that would make a line's tokens depend on what came before it.
#[derive(Default)]
pub struct ReplSession {
    vm: Vm,
    pending: String,
    depth: i32,
}

impl ReplSession {
    #[must_use]
    pub fn new() -> Self {
        Self { vm: Vm::new(), pending: String::new(), depth: 0 }
    }

    /// Feeds one line of input. Returns `Continuation` (and buffers the
    /// line) until enough brackets have closed to attempt a parse.
    pub fn feed_line(&mut self, line: &str) -> WeaveResult<LineStatus> {
        if !self.pending.is_empty() {
            self.pending.push('\n');
        }
        self.pending.push_str(line);

        let tokens = Lexer::new(line).tokenize()?;
        for pt in &tokens {
            match pt.token {
                Token::Open(_) => self.depth += 1,
                Token::Close(_) => self.depth -= 1,
                Token::Leaf(_) => {}
            }
        }

        if self.depth > 0 { Ok(LineStatus::Continuation) } else { Ok(LineStatus::Complete) }
    }

    /// Evaluates the buffered source accumulated since the last call and
    /// clears the buffer, regardless of whether evaluation succeeds — a
    /// failed snippet shouldn't haunt the next prompt.
    pub fn execute(&mut self) -> WeaveResult<Value> {
        let source = std::mem::take(&mut self.pending);
        self.depth = 0;
        self.vm.eval_source(&source)
    }

    #[must_use]
    pub fn is_mid_statement(&self) -> bool {
        self.depth > 0
    }

    /// Installs a tracer on the session's underlying `Vm` — the CLI wires
    /// this to `WEAVE_TRACE=1`/`--trace`.
    pub fn set_tracer(&mut self, tracer: Box<dyn VmTracer>) {
        self.vm.set_tracer(tracer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_completes_immediately() {
        let mut repl = ReplSession::new();
        assert_eq!(repl.feed_line("1 + 1").unwrap(), LineStatus::Complete);
        assert_eq!(repl.execute().unwrap(), Value::integer_small(2));
    }

    #[test]
    fn open_bracket_requests_continuation() {
        let mut repl = ReplSession::new();
        assert_eq!(repl.feed_line("loop 1..3 'x [").unwrap(), LineStatus::Continuation);
        assert_eq!(repl.feed_line("print x").unwrap(), LineStatus::Continuation);
        assert_eq!(repl.feed_line("]").unwrap(), LineStatus::Complete);
    }

    #[test]
    fn bindings_persist_across_executions() {
        let mut repl = ReplSession::new();
        repl.feed_line("x: 41").unwrap();
        repl.execute().unwrap();
        repl.feed_line("x + 1").unwrap();
        assert_eq!(repl.execute().unwrap(), Value::integer_small(42));
    }
}
