// src/modules/directory.rs
// Ensure a directory exists (with parents) or is absent, with an optional
// permission mode.
use indexmap::IndexMap;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, optional_str, required_str, Module, ModuleError, ModuleResult,
    ParamValue,
};

pub struct DirectoryModule;

/// Parse an octal mode string like "0755".
pub(crate) fn parse_mode(mode: &str) -> ModuleResult<u32> {
    u32::from_str_radix(mode, 8)
        .map_err(|_| ModuleError::InvalidParameter(format!("'{}' is not an octal mode", mode)))
}

/// Apply a mode when it differs from the current one.
pub(crate) fn ensure_mode(path: &Path, mode: u32) -> ModuleResult<bool> {
    let metadata = std::fs::metadata(path)?;
    let current = metadata.permissions().mode() & 0o7777;
    if current == mode {
        return Ok(false);
    }
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(true)
}

impl Module for DirectoryModule {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "target")?;
        check_scalar(params, "target")?;
        check_scalar(params, "state")?;
        check_scalar(params, "mode")
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let target = required_str(params, "target")?;
        let state = optional_str(params, "state").unwrap_or("present");
        let path = Path::new(target);

        match state {
            "absent" => {
                if path.exists() {
                    std::fs::remove_dir_all(path)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            "present" => {
                let mut changed = false;
                if !path.is_dir() {
                    std::fs::create_dir_all(path)?;
                    changed = true;
                }
                if let Some(mode) = optional_str(params, "mode") {
                    changed |= ensure_mode(path, parse_mode(mode)?)?;
                }
                Ok(changed)
            }
            other => Err(ModuleError::InvalidParameter(format!(
                "state must be 'present' or 'absent', not '{}'",
                other
            ))),
        }
    }
}
