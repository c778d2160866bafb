// src/modules/group.rs
// Ensure a local group exists or is absent, probing with getent first.
use indexmap::IndexMap;
use std::process::Command;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, check_status, optional_str, output_of, required_str, Module,
    ModuleError, ModuleResult, ParamValue,
};

pub struct GroupModule;

fn group_exists(name: &str) -> ModuleResult<bool> {
    Ok(output_of(Command::new("getent").args(["group", name]))?
        .status
        .success())
}

impl Module for GroupModule {
    fn name(&self) -> &'static str {
        "group"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "group")?;
        check_scalar(params, "group")?;
        check_scalar(params, "state")
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let group = required_str(params, "group")?;
        let state = optional_str(params, "state").unwrap_or("present");
        let exists = group_exists(group)?;

        match state {
            "present" => {
                if exists {
                    return Ok(false);
                }
                log::info!("group: creating {}", group);
                check_status("groupadd", Command::new("groupadd").arg(group))?;
                Ok(true)
            }
            "absent" => {
                if !exists {
                    return Ok(false);
                }
                log::info!("group: removing {}", group);
                check_status("groupdel", Command::new("groupdel").arg(group))?;
                Ok(true)
            }
            other => Err(ModuleError::InvalidParameter(format!(
                "state must be 'present' or 'absent', not '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_requires_group() {
        assert!(GroupModule.check(&IndexMap::new()).is_err());
        let mut p = IndexMap::new();
        p.insert("group".to_string(), Value::Str("wheel".into()));
        assert!(GroupModule.check(&p).is_ok());
    }

    #[test]
    fn test_existing_group_is_no_change() {
        if which::which("getent").is_err() || !group_exists("root").unwrap_or(false) {
            return;
        }
        let mut module = GroupModule;
        let mut env = Environment::empty();
        let mut p = IndexMap::new();
        p.insert("group".to_string(), ParamValue::Str("root".into()));
        assert!(!module.execute(&mut env, &p).unwrap());
    }

    #[test]
    fn test_bad_state_rejected() {
        let mut module = GroupModule;
        let mut env = Environment::empty();
        let mut p = IndexMap::new();
        p.insert("group".to_string(), ParamValue::Str("g".into()));
        p.insert("state".to_string(), ParamValue::Str("sideways".into()));
        assert!(module.execute(&mut env, &p).is_err());
    }
}
