#![doc = include_str!("../../../README.md")]

mod block;
mod builtins;
mod bytecode;
mod color;
mod convert;
mod dict;
mod error;
mod function;
mod io;
mod lexer;
mod namespace;
mod numeric;
mod object;
mod parser;
mod quantity;
mod repl;
mod resource;
mod run;
pub mod tracer;
mod value;

pub use crate::{
    block::{Block, BlockKind, Range},
    bytecode::{Code, Opcode, Vm},
    color::Color,
    dict::Dictionary,
    error::{ControlFlow, Error, SourcePos, WeaveResult},
    function::Function,
    io::{CollectStringPrint, NoPrint, PrintWriter, SharedBufferPrint, StdPrint},
    object::{Prototype, TypeRegistry},
    quantity::{Quantity, Unit},
    repl::{LineStatus, ReplSession},
    resource::ResourceLimits,
    run::{RunResult, Runner},
    value::Value,
};
