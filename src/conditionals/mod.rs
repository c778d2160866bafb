//! Conditional / built-in function registry
//!
//! A single process-wide table maps function names (and their aliases) to
//! implementations. The table is built once at first use and read-only
//! thereafter; adding a function means adding a `register` line to
//! [`build_registry`].
//!
//! Functions receive already-stringified arguments: the executor
//! interpolates and evaluates every argument before the call. Arity is
//! validated before dispatch so a mismatch is reported the same way at
//! check time and at evaluation time.

pub mod builtins;

use std::collections::HashMap;

use crate::errors::EvalError;

/// The result of a built-in function call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult {
    Bool(bool),
    Str(String),
    Number(i64),
}

impl CallResult {
    /// Truthiness for `if`/`unless` gates.
    pub fn truthy(&self) -> bool {
        match self {
            CallResult::Bool(b) => *b,
            CallResult::Number(n) => *n != 0,
            CallResult::Str(s) => !s.is_empty() && s != "false",
        }
    }

    /// Stringified form, for assignment right-hand sides.
    pub fn into_string(self) -> String {
        match self {
            CallResult::Bool(b) => b.to_string(),
            CallResult::Number(n) => n.to_string(),
            CallResult::Str(s) => s,
        }
    }
}

/// How many arguments a builtin accepts.
#[derive(Debug, Clone, Copy)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match self {
            Arity::Exact(want) => n == *want,
            Arity::Range(lo, hi) => n >= *lo && n <= *hi,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Arity::Exact(n) => n.to_string(),
            Arity::Range(lo, hi) => format!("{} to {}", lo, hi),
        }
    }
}

pub type BuiltinFn = fn(&[String]) -> Result<CallResult, EvalError>;

/// One registered function: its canonical name, arity and implementation.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub arity: Arity,
    pub func: BuiltinFn,
}

fn register(
    table: &mut HashMap<&'static str, Builtin>,
    names: &[&'static str],
    arity: Arity,
    func: BuiltinFn,
) {
    for alias in names {
        table.insert(
            alias,
            Builtin {
                name: names[0],
                arity,
                func,
            },
        );
    }
}

fn build_registry() -> HashMap<&'static str, Builtin> {
    use builtins::*;

    let mut t = HashMap::new();
    register(&mut t, &["contains"], Arity::Exact(2), contains);
    register(&mut t, &["empty", "unset"], Arity::Exact(1), empty);
    register(&mut t, &["equal", "equals"], Arity::Exact(2), equal);
    register(&mut t, &["exists"], Arity::Exact(1), exists);
    register(&mut t, &["failure"], Arity::Exact(1), failure);
    register(&mut t, &["field"], Arity::Exact(2), field);
    register(&mut t, &["gt"], Arity::Exact(2), gt);
    register(&mut t, &["gte"], Arity::Exact(2), gte);
    register(&mut t, &["lt"], Arity::Exact(2), lt);
    register(&mut t, &["lte"], Arity::Exact(2), lte);
    register(&mut t, &["len"], Arity::Exact(1), len);
    register(&mut t, &["lower"], Arity::Exact(1), lower);
    register(&mut t, &["upper"], Arity::Exact(1), upper);
    register(&mut t, &["matches"], Arity::Exact(2), matches);
    register(&mut t, &["md5", "md5sum"], Arity::Exact(1), md5_digest);
    register(&mut t, &["nonempty", "set", "true"], Arity::Exact(1), nonempty);
    register(&mut t, &["on_path"], Arity::Exact(1), on_path);
    register(&mut t, &["prompt"], Arity::Exact(1), prompt);
    register(&mut t, &["rand"], Arity::Range(2, 3), rand_range);
    register(&mut t, &["sha1", "sha1sum"], Arity::Exact(1), sha1_digest);
    register(&mut t, &["success"], Arity::Exact(1), success);
    register(&mut t, &["newer"], Arity::Exact(2), newer);
    register(&mut t, &["older"], Arity::Exact(2), older);
    t
}

lazy_static::lazy_static! {
    static ref REGISTRY: HashMap<&'static str, Builtin> = build_registry();
}

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    REGISTRY.get(name)
}

/// Validate that `name` exists and accepts `argc` arguments.
pub fn check_arity(name: &str, argc: usize) -> Result<(), EvalError> {
    let builtin = lookup(name).ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
    if builtin.arity.accepts(argc) {
        Ok(())
    } else {
        Err(EvalError::Arity {
            name: name.to_string(),
            expected: builtin.arity.describe(),
            got: argc,
        })
    }
}

/// Invoke a builtin with stringified arguments.
pub fn call(name: &str, args: &[String]) -> Result<CallResult, EvalError> {
    check_arity(name, args.len())?;
    let builtin = lookup(name).ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
    (builtin.func)(args)
}
