//! The crate's single error type and the taxonomy it encodes.
//!
//! Every failure mode in the parser, translator, and VM funnels through
//! [`Error`]. There is one variant per error *kind*; each variant carries a
//! human-readable message and, where the failure happened against source
//! text, a [`SourcePos`]. Errors are never swallowed: a builtin either
//! recovers locally with a documented fallback or returns one of these.

use std::fmt;

use crate::value::Value;

/// Non-error control transfer (`break`/`continue`/`return`), threaded
/// through the same `Result` the real error taxonomy uses so the iterator
/// and call builtins don't need a second return channel. Caught by the
/// nearest `loop`/`while`/`map`/`select` (for `Break`/`Continue`) or by
/// [`crate::bytecode::vm::Vm::call_function`] (for `Return`); anything that
/// escapes a top-level program is reported like any other error.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    Break,
    Continue,
    Return(Value),
}

/// A position in source text, used to annotate parse and runtime errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Result alias used throughout the crate, mirroring the taxonomy in the
/// error handling design.
pub type WeaveResult<T> = Result<T, Error>;

/// The complete error taxonomy.
///
/// Each kind's `Display` impl renders the "human name" used in the
/// user-visible diagnostic: a red prefix, the kind's name, the message, and
/// the position when available (see [`Error::report`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError { message: String, pos: SourcePos },
    SymbolNotFound { name: String, pos: Option<SourcePos> },
    ArityMismatch { expected: String, got: usize, pos: Option<SourcePos> },
    TypeMismatch { message: String, pos: Option<SourcePos> },
    CannotConvert { from: &'static str, to: &'static str },
    ConversionFailed { message: String },
    RangeWithZeroStep,
    IndexOutOfBounds { index: i64, len: usize },
    StackOverflow,
    StackUnderflow,
    PackageError { message: String },
    /// Not part of the formal taxonomy: a condition that should be
    /// unreachable given a well-formed `Translation`. Kept distinct from the
    /// taxonomy above so it is never accidentally caught by user code.
    Internal(String),
    /// Not a failure — see [`ControlFlow`].
    Control(ControlFlow),
}

impl Error {
    #[must_use]
    pub fn parse(message: impl Into<String>, pos: SourcePos) -> Self {
        Self::ParseError { message: message.into(), pos }
    }

    #[must_use]
    pub fn symbol_not_found(name: impl Into<String>) -> Self {
        Self::SymbolNotFound { name: name.into(), pos: None }
    }

    #[must_use]
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch { message: message.into(), pos: None }
    }

    #[must_use]
    pub fn conversion_failed(message: impl Into<String>) -> Self {
        Self::ConversionFailed { message: message.into() }
    }

    /// The human name of this error's kind, as used in diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::ParseError { .. } => "Parse Error",
            Self::SymbolNotFound { .. } => "Symbol Not Found",
            Self::ArityMismatch { .. } => "Arity Mismatch",
            Self::TypeMismatch { .. } => "Type Mismatch",
            Self::CannotConvert { .. } => "Cannot Convert",
            Self::ConversionFailed { .. } => "Conversion Failed",
            Self::RangeWithZeroStep => "Range With Zero Step",
            Self::IndexOutOfBounds { .. } => "Index Out Of Bounds",
            Self::StackOverflow => "Stack Overflow",
            Self::StackUnderflow => "Stack Underflow",
            Self::PackageError { .. } => "Package Error",
            Self::Internal(_) => "Internal Error",
            Self::Control(_) => "Control Flow",
        }
    }

    /// The source position carried by this error, if any.
    #[must_use]
    pub fn position(&self) -> Option<SourcePos> {
        match self {
            Self::ParseError { pos, .. } => Some(*pos),
            Self::SymbolNotFound { pos, .. } | Self::ArityMismatch { pos, .. } | Self::TypeMismatch { pos, .. } => {
                *pos
            }
            _ => None,
        }
    }

    /// Renders the user-visible failure line described in the error
    /// handling design: a red prefix, the kind's human name, the message,
    /// and the position when available.
    #[must_use]
    pub fn report(&self) -> String {
        let pos = self.position().map(|p| format!(" (at {p})")).unwrap_or_default();
        format!("\u{1b}[31merror\u{1b}[0m: {}: {self}{pos}", self.kind_name())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError { message, .. } => write!(f, "{message}"),
            Self::SymbolNotFound { name, .. } => write!(f, "'{name}' is not defined"),
            Self::ArityMismatch { expected, got, .. } => {
                write!(f, "expected {expected} argument(s), got {got}")
            }
            Self::TypeMismatch { message, .. } => write!(f, "{message}"),
            Self::CannotConvert { from, to } => write!(f, "cannot convert {from} to {to}"),
            Self::ConversionFailed { message } => write!(f, "{message}"),
            Self::RangeWithZeroStep => write!(f, "range step cannot be zero"),
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {index} out of bounds for length {len}")
            }
            Self::StackOverflow => write!(f, "evaluation stack exceeded its maximum depth"),
            Self::StackUnderflow => write!(f, "instruction required an operand but the stack was empty"),
            Self::PackageError { message } => write!(f, "{message}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
            Self::Control(_) => write!(f, "control-flow transfer escaped its enclosing construct"),
        }
    }
}

impl std::error::Error for Error {}
