// src/modules/git.rs
// Clone a repository, or fast-forward an existing checkout. Changed iff
// HEAD moved.
use indexmap::IndexMap;
use std::path::Path;
use std::process::Command;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, check_status, optional_str, required_str, Module, ModuleResult,
    ParamValue,
};

pub struct GitModule;

fn head_revision(path: &str) -> ModuleResult<String> {
    let output = check_status(
        "git rev-parse",
        Command::new("git").args(["-C", path, "rev-parse", "HEAD"]),
    )?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl Module for GitModule {
    fn name(&self) -> &'static str {
        "git"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "repository")?;
        check_scalar(params, "repository")?;
        check_present(params, "path")?;
        check_scalar(params, "path")?;
        check_scalar(params, "branch")
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let repository = required_str(params, "repository")?;
        let path = required_str(params, "path")?;
        let branch = optional_str(params, "branch");

        if !Path::new(path).join(".git").exists() {
            let mut command = Command::new("git");
            command.arg("clone");
            if let Some(branch) = branch {
                command.args(["--branch", branch]);
            }
            command.args([repository, path]);
            log::info!("git: cloning {} into {}", repository, path);
            check_status("git clone", &mut command)?;
            return Ok(true);
        }

        let before = head_revision(path)?;
        check_status(
            "git pull",
            Command::new("git").args(["-C", path, "pull", "--ff-only"]),
        )?;
        let after = head_revision(path)?;
        if before != after {
            log::info!("git: {} advanced {} -> {}", path, &before[..8.min(before.len())], &after[..8.min(after.len())]);
        }
        Ok(before != after)
    }
}
