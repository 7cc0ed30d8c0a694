//! Sandboxed evaluation of user-supplied map functions.
//!
//! Map functions are written in a small JavaScript subset. They see exactly
//! two things: the document passed as their single argument and the
//! `emit(key, value)` primitive. There is no host I/O, and every run is
//! bounded by a [`ScriptBudget`].

mod interp;
mod lexer;
pub mod parser;
pub mod value;

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use interp::Interpreter;
use parser::{Function, parse_function};
use value::Value;

/// Errors raised while compiling or running a map function.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: u32,
        column: u32,
        message: String,
    },

    #[error("ReferenceError: {0}")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("uncaught exception: {0}")]
    Thrown(String),

    #[error("script exceeded its budget of {0} steps")]
    FuelExhausted(u64),

    #[error("script exceeded its time limit of {0} ms")]
    Timeout(u64),

    #[error("script exceeded its memory limit of {0} bytes")]
    MemoryExceeded(u64),

    #[error("script emitted more than {0} rows")]
    TooManyEmits(usize),

    #[error("script nesting exceeds {0} levels")]
    NestingTooDeep(usize),

    #[error("design document has no views")]
    MissingViews,

    #[error("view {view} is invalid: {reason}")]
    InvalidView { view: String, reason: String },
}

/// Resource limits applied to a single map-function run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBudget {
    /// Maximum number of evaluation steps.
    pub fuel: u64,
    /// Wall-clock limit, checked periodically and after every large copy.
    pub timeout: Duration,
    /// Maximum number of `emit` calls.
    pub max_emits: usize,
    /// Maximum bytes of script values a run may copy or build, counted
    /// over the whole run.
    pub max_value_bytes: u64,
}

impl Default for ScriptBudget {
    fn default() -> Self {
        Self {
            fuel: 100_000,
            timeout: Duration::from_millis(250),
            max_emits: 10_000,
            max_value_bytes: 16 * 1024 * 1024,
        }
    }
}

/// One `emit(key, value)` call, already converted to JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emitted {
    pub key: serde_json::Value,
    pub value: serde_json::Value,
}

/// A compiled map function.
///
/// Compilation happens once per design version; every [`MapFunction::run`]
/// starts from a fresh scope.
#[derive(Debug, Clone)]
pub struct MapFunction {
    function: Function,
}

impl MapFunction {
    pub fn compile(source: &str) -> Result<Self, ScriptError> {
        Ok(Self {
            function: parse_function(source)?,
        })
    }

    /// Runs the function against one document and returns its emits in order.
    pub fn run(
        &self,
        doc: &serde_json::Value,
        budget: &ScriptBudget,
    ) -> Result<Vec<Emitted>, ScriptError> {
        Interpreter::new(budget).call(&self.function, Value::from_json(doc))
    }
}
