// src/modules/link.rs
// Ensure a symbolic link at `target` points to `source`, replacing a link
// with the wrong destination.
use indexmap::IndexMap;
use std::path::Path;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, required_str, Module, ModuleError, ModuleResult, ParamValue,
};

pub struct LinkModule;

impl Module for LinkModule {
    fn name(&self) -> &'static str {
        "link"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "source")?;
        check_scalar(params, "source")?;
        check_present(params, "target")?;
        check_scalar(params, "target")
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let source = required_str(params, "source")?;
        let target = required_str(params, "target")?;
        let target_path = Path::new(target);

        match std::fs::symlink_metadata(target_path) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                let current = std::fs::read_link(target_path)?;
                if current == Path::new(source) {
                    return Ok(false);
                }
                std::fs::remove_file(target_path)?;
            }
            Ok(metadata) if metadata.is_dir() => {
                return Err(ModuleError::ActionFailed(format!(
                    "'{}' exists and is a directory, refusing to replace it with a link",
                    target
                )));
            }
            Ok(_) => {
                std::fs::remove_file(target_path)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ModuleError::Io(e)),
        }

        std::os::unix::fs::symlink(source, target_path)?;
        Ok(true)
    }
}
