// src/modules/shell.rs
// Run an arbitrary shell command. Never idempotent: a shell rule that runs
// always reports changed.
use indexmap::IndexMap;
use std::process::Command;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{check_present, Module, ModuleError, ModuleResult, ParamValue};

pub struct ShellModule;

impl Module for ShellModule {
    fn name(&self) -> &'static str {
        "shell"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "command")
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let command = match params.get("command") {
            Some(ParamValue::Str(s)) => s.clone(),
            Some(ParamValue::List(parts)) => parts.join(" "),
            None => return Err(ModuleError::MissingParameter("command".to_string())),
        };

        log::debug!("shell: running `{}`", command);
        let output = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .output()
            .map_err(ModuleError::Io)?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            log::info!("shell: {}", stdout.trim_end());
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ModuleError::ActionFailed(format!(
                "command `{}` failed ({}): {}",
                command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(true)
    }
}
