//! Engine error taxonomy
//!
//! Every layer owns its error enum (parse, check, evaluate, module,
//! execute); they converge here into the top-level [`Error`] returned by
//! the engine facade. No layer recovers locally: the first error aborts
//! the run and is printed to stderr by the binary.

use thiserror::Error;

use crate::executor::{CheckError, ExecError};
use crate::parser::ParseError;

/// Errors raised while evaluating values: backtick expansion, conditional
/// function lookup and invocation.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("failed to launch shell for `{command}`: {source}")]
    Shell {
        command: String,
        source: std::io::Error,
    },

    #[error("function '{0}' is not available")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("function '{name}': '{value}' is not an integer")]
    NotAnInteger { name: String, value: String },

    #[error("function 'rand': empty range {low}..{high}")]
    EmptyRange { low: i64, high: i64 },

    #[error("function 'matches': invalid regular expression '{pattern}': {reason}")]
    BadRegex { pattern: String, reason: String },

    #[error("function '{name}': cannot stat '{path}': {source}")]
    Stat {
        name: String,
        path: String,
        source: std::io::Error,
    },

    #[error("prompt: failed to read from stdin: {0}")]
    Prompt(String),

    #[error("lists cannot be evaluated to a single value")]
    ListValue,
}

/// The top-level error type: everything the engine can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
}
