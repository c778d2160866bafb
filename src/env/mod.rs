//! The shared variable store
//!
//! One `Environment` is threaded through the whole run: assignments write
//! to it, rules read their parameters through it, modules publish outputs
//! into it, and include-file sub-executors receive the same store so a
//! child recipe sees its parent's variables.
//!
//! Interpolation is purely textual: every `${NAME}` occurrence is replaced
//! immediately before a string is consumed, preferring store values over
//! process environment variables, with unknown names expanding to the
//! empty string.

use std::collections::HashMap;
use std::process::Command;

use crate::errors::EvalError;

lazy_static::lazy_static! {
    static ref PLACEHOLDER: regex_lite::Regex =
        regex_lite::Regex::new(r"\$\{([^}]+)\}").expect("placeholder regex");
}

/// True when shell execution is disabled for fuzzing: backticks return the
/// interpolated command verbatim and `success`/`failure` report benign
/// results without running anything.
pub fn fuzzing() -> bool {
    std::env::var("FUZZ").map(|v| v == "FUZZ").unwrap_or(false)
}

/// The variable store shared by parser, executor, and modules.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Create a store pre-populated with host facts: ARCH, OS, HOSTNAME,
    /// USERNAME, HOMEDIR. Lookups are best-effort; failures leave empty
    /// strings, except HOSTNAME which falls back to "unknown".
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        vars.insert("ARCH".to_string(), std::env::consts::ARCH.to_string());
        vars.insert("OS".to_string(), std::env::consts::OS.to_string());

        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        vars.insert("HOSTNAME".to_string(), host);

        let user = std::env::var("USER")
            .or_else(|_| std::env::var("LOGNAME"))
            .unwrap_or_default();
        vars.insert("USERNAME".to_string(), user);
        vars.insert("HOMEDIR".to_string(), std::env::var("HOME").unwrap_or_default());

        Self { vars }
    }

    /// An empty store with no host facts. Used by tests that need
    /// deterministic contents.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|s| s.as_str())
    }

    /// A snapshot of the current variables.
    pub fn variables(&self) -> HashMap<String, String> {
        self.vars.clone()
    }

    /// Replace every `${NAME}` with the store value, falling back to the
    /// process environment, then to the empty string.
    pub fn interpolate(&self, input: &str) -> String {
        PLACEHOLDER
            .replace_all(input, |caps: &regex_lite::Captures| {
                let name = &caps[1];
                match self.vars.get(name) {
                    Some(v) => v.clone(),
                    None => std::env::var(name).unwrap_or_default(),
                }
            })
            .into_owned()
    }

    /// Interpolate a command string, then run it through `sh -c`, capturing
    /// stdout followed by stderr with one trailing newline stripped.
    ///
    /// Under FUZZ=FUZZ the command is not executed and the interpolated
    /// string is returned verbatim.
    pub fn expand_backtick(&self, command: &str) -> Result<String, EvalError> {
        let command = self.interpolate(command);
        if fuzzing() {
            return Ok(command);
        }

        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .map_err(|source| EvalError::Shell {
                command: command.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if combined.ends_with('\n') {
            combined.pop();
            if combined.ends_with('\r') {
                combined.pop();
            }
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut env = Environment::empty();
        assert_eq!(env.get("x"), None);
        env.set("x", "1");
        assert_eq!(env.get("x"), Some("1"));
        env.set("x", "2");
        assert_eq!(env.get("x"), Some("2"));
    }

    #[test]
    fn test_facts_present() {
        let env = Environment::new();
        assert!(!env.get("ARCH").unwrap().is_empty());
        assert!(!env.get("OS").unwrap().is_empty());
        assert!(!env.get("HOSTNAME").unwrap().is_empty());
        assert!(env.get("USERNAME").is_some());
        assert!(env.get("HOMEDIR").is_some());
    }

    #[test]
    fn test_interpolate_basic() {
        let mut env = Environment::empty();
        env.set("name", "world");
        assert_eq!(env.interpolate("hello ${name}!"), "hello world!");
    }

    #[test]
    fn test_interpolate_unknown_is_empty() {
        let env = Environment::empty();
        assert_eq!(env.interpolate("[${missing_for_sure_xyz}]"), "[]");
    }

    #[test]
    fn test_interpolate_prefers_store_over_process_env() {
        let mut env = Environment::empty();
        env.set("PATH", "overridden");
        assert_eq!(env.interpolate("${PATH}"), "overridden");
    }

    #[test]
    fn test_interpolate_falls_back_to_process_env() {
        let env = Environment::empty();
        // PATH is always present in a test process.
        assert!(!env.interpolate("${PATH}").is_empty());
    }

    #[test]
    fn test_interpolate_multiple() {
        let mut env = Environment::empty();
        env.set("a", "1");
        env.set("b", "2");
        assert_eq!(env.interpolate("${a}${b}${a}"), "121");
    }

    #[test]
    fn test_interpolate_dotted_names() {
        let mut env = Environment::empty();
        env.set("rule.size", "42");
        assert_eq!(env.interpolate("${rule.size}"), "42");
    }

    #[test]
    fn test_expand_backtick_strips_trailing_newline() {
        let env = Environment::empty();
        assert_eq!(env.expand_backtick("echo hi").unwrap(), "hi");
    }

    #[test]
    fn test_expand_backtick_interpolates_first() {
        let mut env = Environment::empty();
        env.set("word", "marker");
        assert_eq!(env.expand_backtick("echo ${word}").unwrap(), "marker");
    }

    #[test]
    fn test_expand_backtick_captures_stderr() {
        let env = Environment::empty();
        assert_eq!(env.expand_backtick("echo oops 1>&2").unwrap(), "oops");
    }

    #[test]
    fn test_variables_snapshot() {
        let mut env = Environment::empty();
        env.set("k", "v");
        let snap = env.variables();
        env.set("k", "changed");
        assert_eq!(snap.get("k").map(|s| s.as_str()), Some("v"));
    }
}
