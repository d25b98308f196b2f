//! Core library for the Luna scripting language: lexing, parsing, a
//! tree-walking evaluator, the runtime value model, and REPL utilities.

pub mod ast;
pub mod diagnostics;
pub mod environment;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod prototype;
pub mod repl;
pub mod runtime;
pub mod stdlib;
pub mod value;

pub use diagnostics::{Diagnostic, DiagnosticKind, LunaError, Position, Result};
pub use environment::{Environment, EnvironmentRef};
pub use host::{HostContext, OutputSink};
pub use lexer::tokenize;
pub use parser::{parse, parse_source};
pub use repl::Repl;
pub use runtime::{evaluate, Interpreter};
pub use value::{Value, ValueKind};
