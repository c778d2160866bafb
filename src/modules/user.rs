// src/modules/user.rs
// Ensure a local user account exists or is absent, probing with id first.
use indexmap::IndexMap;
use std::process::Command;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, check_status, optional_str, output_of, required_str, Module,
    ModuleError, ModuleResult, ParamValue,
};

pub struct UserModule;

fn user_exists(login: &str) -> ModuleResult<bool> {
    Ok(output_of(Command::new("id").args(["-u", login]))?
        .status
        .success())
}

impl Module for UserModule {
    fn name(&self) -> &'static str {
        "user"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "login")?;
        for key in ["login", "state", "shell", "home"] {
            check_scalar(params, key)?;
        }
        Ok(())
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let login = required_str(params, "login")?;
        let state = optional_str(params, "state").unwrap_or("present");
        let exists = user_exists(login)?;

        match state {
            "present" => {
                if exists {
                    return Ok(false);
                }
                let mut command = Command::new("useradd");
                command.arg("-m");
                if let Some(shell) = optional_str(params, "shell") {
                    command.args(["-s", shell]);
                }
                if let Some(home) = optional_str(params, "home") {
                    command.args(["-d", home]);
                }
                command.arg(login);
                log::info!("user: creating {}", login);
                check_status("useradd", &mut command)?;
                Ok(true)
            }
            "absent" => {
                if !exists {
                    return Ok(false);
                }
                log::info!("user: removing {}", login);
                check_status("userdel", Command::new("userdel").arg(login))?;
                Ok(true)
            }
            other => Err(ModuleError::InvalidParameter(format!(
                "state must be 'present' or 'absent', not '{}'",
                other
            ))),
        }
    }
}
