//! Executor Types
//!
//! Errors for the two executor passes, and the run-wide state shared
//! between a top-level executor and the child executors it spawns for
//! include files.

use std::collections::HashSet;

use thiserror::Error;

use crate::errors::EvalError;
use crate::modules::ModuleError;
use crate::parser::ParseError;

/// Failures from the pre-flight check pass. Nothing has executed when one
/// of these is raised.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("rule names must be unique: '{0}' is defined more than once")]
    DuplicateRule(String),

    #[error("rule '{rule}' has reference to '{target}' which doesn't exist")]
    DanglingReference { rule: String, target: String },

    #[error("rule '{rule}': unknown module type '{module}'")]
    UnknownModule { rule: String, module: String },

    #[error("rule '{rule}': {source}")]
    Params { rule: String, source: ModuleError },

    #[error("{context}: {source}")]
    Condition { context: String, source: EvalError },
}

/// Failures from the execute pass. Rules that already reported changed are
/// not rolled back.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("rule '{rule}' ({module}): {source}")]
    Module {
        rule: String,
        module: String,
        source: ModuleError,
    },

    #[error("rule '{rule}': unknown module type '{module}'")]
    UnknownModule { rule: String, module: String },

    #[error("include '{path}': {source}")]
    Include {
        path: String,
        source: std::io::Error,
    },

    #[error("include '{path}': {source}")]
    IncludeParse { path: String, source: ParseError },

    #[error(transparent)]
    Check(#[from] Box<CheckError>),
}

impl From<CheckError> for ExecError {
    fn from(e: CheckError) -> Self {
        ExecError::Check(Box::new(e))
    }
}

/// State threaded through one top-level run: the set of already-included
/// paths and the set of rule names registered so far. Child executors for
/// include files receive the same state, so a path is included at most
/// once and rule names stay unique across the whole run.
#[derive(Debug, Default)]
pub struct RunState {
    pub included: HashSet<String>,
    pub names: HashSet<String>,
}
