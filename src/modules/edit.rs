// src/modules/edit.rs
// In-place text edits: regex search/replace and append-line-if-missing.
use indexmap::IndexMap;
use std::path::Path;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, optional_str, required_str, Module, ModuleError, ModuleResult,
    ParamValue,
};

pub struct EditModule;

impl Module for EditModule {
    fn name(&self) -> &'static str {
        "edit"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "target")?;
        check_scalar(params, "target")?;
        if !params.contains_key("search") && !params.contains_key("append") {
            return Err(ModuleError::InvalidParameter(
                "edit needs 'search'/'replace' and/or 'append'".to_string(),
            ));
        }
        if params.contains_key("search") && !params.contains_key("replace") {
            return Err(ModuleError::MissingParameter("replace".to_string()));
        }
        Ok(())
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let target = required_str(params, "target")?;
        let search = optional_str(params, "search");
        let append = optional_str(params, "append");

        let original = match std::fs::read_to_string(target) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if search.is_some() {
                    return Err(ModuleError::ActionFailed(format!(
                        "cannot search '{}': file does not exist",
                        target
                    )));
                }
                String::new()
            }
            Err(e) => return Err(ModuleError::Io(e)),
        };

        let mut edited = original.clone();

        if let Some(pattern) = search {
            let replace = required_str(params, "replace")?;
            let re = regex_lite::Regex::new(pattern).map_err(|e| {
                ModuleError::InvalidParameter(format!("bad search pattern '{}': {}", pattern, e))
            })?;
            edited = re.replace_all(&edited, replace).into_owned();
        }

        if let Some(line) = append {
            if !edited.lines().any(|l| l == line) {
                if !edited.is_empty() && !edited.ends_with('\n') {
                    edited.push('\n');
                }
                edited.push_str(line);
                edited.push('\n');
            }
        }

        if edited == original && Path::new(target).exists() {
            return Ok(false);
        }
        std::fs::write(target, edited)?;
        Ok(true)
    }
}
