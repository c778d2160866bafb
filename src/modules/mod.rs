//! Module system
//!
//! Modules are the action implementations a rule dispatches to: each one
//! inspects current host state, drives it toward the requested state, and
//! reports whether anything actually changed. The executor hands a module
//! fully-interpolated parameters; `check` runs earlier, against the raw
//! parsed values, and validates shape only.
//!
//! Modules self-register in a process-wide table under one or more names.
//! Lookup returns a fresh boxed instance per rule.

pub mod directory;
pub mod docker;
pub mod edit;
pub mod fail;
pub mod file;
pub mod git;
pub mod group;
pub mod http;
pub mod link;
pub mod log;
pub mod package;
pub mod shell;
pub mod sql;
pub mod user;

use std::collections::HashMap;
use std::process::{Command, Output};

use indexmap::IndexMap;
use thiserror::Error;

use crate::ast::Value;
use crate::env::Environment;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}")]
    ActionFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ModuleResult<T> = Result<T, ModuleError>;

/// A fully-interpolated parameter value as dispatched to `execute`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(s) => Some(s),
            ParamValue::List(_) => None,
        }
    }

    /// A scalar becomes a one-element list.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            ParamValue::Str(s) => vec![s.clone()],
            ParamValue::List(items) => items.clone(),
        }
    }
}

/// The capability set every action implementation provides.
pub trait Module {
    fn name(&self) -> &'static str;

    /// Validate parameter shape before any rule executes. Values are still
    /// uninterpolated here, so only structure (presence, scalar vs list,
    /// mutual exclusion) may be judged.
    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()>;

    /// Drive the host toward the requested state. Returns whether host
    /// state was actually modified.
    fn execute(
        &mut self,
        env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool>;

    /// Key/value pairs published as `${rulename.key}` after a changed
    /// execution.
    fn outputs(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }
}

type Constructor = fn() -> Box<dyn Module>;

/// Name → constructor table. Built once at startup and frozen.
pub struct ModuleRegistry {
    constructors: HashMap<&'static str, Constructor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, names: &[&'static str], constructor: Constructor) {
        for name in names {
            self.constructors.insert(name, constructor);
        }
    }

    /// A fresh instance of the named module.
    pub fn lookup(&self, name: &str) -> Option<Box<dyn Module>> {
        self.constructors.get(name).map(|ctor| ctor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    /// The standard module set, keyed by every registered alias.
    pub static ref MODULES: ModuleRegistry = {
        let mut r = ModuleRegistry::new();
        r.register(&["shell", "cmd"], || Box::new(shell::ShellModule));
        r.register(&["file"], || Box::<file::FileModule>::default());
        r.register(&["directory", "dir"], || Box::new(directory::DirectoryModule));
        r.register(&["link", "symlink"], || Box::new(link::LinkModule));
        r.register(&["git"], || Box::new(git::GitModule));
        r.register(&["package", "pkg"], || Box::new(package::PackageModule));
        r.register(&["docker"], || Box::new(docker::DockerModule));
        r.register(&["http"], || Box::<http::HttpModule>::default());
        r.register(&["sql"], || Box::new(sql::SqlModule));
        r.register(&["edit"], || Box::new(edit::EditModule));
        r.register(&["fail"], || Box::new(fail::FailModule));
        r.register(&["log"], || Box::new(log::LogModule));
        r.register(&["group"], || Box::new(group::GroupModule));
        r.register(&["user"], || Box::new(user::UserModule));
        r
    };
}

// ---------------------------------------------------------------------------
// Shared parameter helpers
// ---------------------------------------------------------------------------

/// Check-time: the key must be present.
pub(crate) fn check_present(params: &IndexMap<String, Value>, key: &str) -> ModuleResult<()> {
    if params.contains_key(key) {
        Ok(())
    } else {
        Err(ModuleError::MissingParameter(key.to_string()))
    }
}

/// Check-time: the key, when present, must be a scalar.
pub(crate) fn check_scalar(params: &IndexMap<String, Value>, key: &str) -> ModuleResult<()> {
    match params.get(key) {
        Some(Value::List(_)) => Err(ModuleError::InvalidParameter(format!(
            "'{}' must be a single value, not a list",
            key
        ))),
        _ => Ok(()),
    }
}

/// Check-time: at most one of `keys` may be present; with `required`,
/// exactly one must be.
pub(crate) fn check_exclusive(
    params: &IndexMap<String, Value>,
    keys: &[&str],
    required: bool,
) -> ModuleResult<()> {
    let present: Vec<&str> = keys
        .iter()
        .copied()
        .filter(|k| params.contains_key(*k))
        .collect();
    if present.len() > 1 {
        return Err(ModuleError::InvalidParameter(format!(
            "parameters {} are mutually exclusive",
            present.join(", ")
        )));
    }
    if required && present.is_empty() {
        return Err(ModuleError::MissingParameter(keys.join("|")));
    }
    Ok(())
}

/// Execute-time: the key must be present as a string.
pub(crate) fn required_str<'a>(
    params: &'a IndexMap<String, ParamValue>,
    key: &str,
) -> ModuleResult<&'a str> {
    match params.get(key) {
        Some(ParamValue::Str(s)) => Ok(s),
        Some(ParamValue::List(_)) => Err(ModuleError::InvalidParameter(format!(
            "'{}' must be a single value, not a list",
            key
        ))),
        None => Err(ModuleError::MissingParameter(key.to_string())),
    }
}

/// Execute-time: the key's string value, when present.
pub(crate) fn optional_str<'a>(
    params: &'a IndexMap<String, ParamValue>,
    key: &str,
) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

// ---------------------------------------------------------------------------
// Shared process helpers
// ---------------------------------------------------------------------------

/// Run a command, capturing output. Spawn failures become Io errors.
pub(crate) fn output_of(command: &mut Command) -> ModuleResult<Output> {
    Ok(command.output()?)
}

/// Run a command and fail with its stderr when it exits non-zero.
pub(crate) fn check_status(what: &str, command: &mut Command) -> ModuleResult<Output> {
    let output = output_of(command)?;
    if output.status.success() {
        Ok(output)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ModuleError::ActionFailed(format!(
            "{} failed ({}): {}",
            what,
            output.status,
            stderr.trim()
        )))
    }
}
