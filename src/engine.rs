//! Engine facade
//!
//! Main entry point for running recipes. Ties together the parser,
//! executor and environment: one `Engine` holds the variable store and the
//! run-wide state, so several files (and their includes) execute against
//! the same world.

use std::path::Path;

use crate::env::Environment;
use crate::errors::Error;
use crate::executor::{publish_include_vars, Executor, RunState};
use crate::parser::parse;

/// The main recipe engine.
pub struct Engine {
    env: Environment,
    state: RunState,
}

impl Engine {
    /// An engine with the default host-fact environment.
    pub fn new() -> Self {
        Self::with_env(Environment::new())
    }

    /// An engine over a caller-supplied environment.
    pub fn with_env(env: Environment) -> Self {
        Self {
            env,
            state: RunState::default(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Parse, check, and execute one recipe file.
    pub fn run_file(&mut self, path: &Path) -> Result<(), Error> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.display().to_string(),
            source,
        })?;

        let canonical = std::fs::canonicalize(path)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| path.display().to_string());
        publish_include_vars(&mut self.env, &canonical);

        self.run_source(&source)
    }

    /// Parse, check, and execute recipe source text.
    pub fn run_source(&mut self, source: &str) -> Result<(), Error> {
        let program = parse(source)?;
        let mut executor = Executor::new(program);
        executor.check(&mut self.state)?;
        executor.execute(&mut self.env, &mut self.state)?;
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
