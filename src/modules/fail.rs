// src/modules/fail.rs
// Abort the run with a message. Only useful behind if/unless.
use indexmap::IndexMap;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{optional_str, Module, ModuleError, ModuleResult, ParamValue};

pub struct FailModule;

impl Module for FailModule {
    fn name(&self) -> &'static str {
        "fail"
    }

    fn check(&self, _params: &IndexMap<String, Value>) -> ModuleResult<()> {
        Ok(())
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let message = optional_str(params, "message").unwrap_or("explicit failure");
        Err(ModuleError::ActionFailed(message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_fails() {
        let mut module = FailModule;
        let mut env = Environment::empty();
        let err = module.execute(&mut env, &IndexMap::new()).unwrap_err();
        assert!(err.to_string().contains("explicit failure"));
    }

    #[test]
    fn test_fails_with_message() {
        let mut module = FailModule;
        let mut env = Environment::empty();
        let mut params = IndexMap::new();
        params.insert(
            "message".to_string(),
            ParamValue::Str("unsupported platform".into()),
        );
        let err = module.execute(&mut env, &params).unwrap_err();
        assert_eq!(err.to_string(), "unsupported platform");
    }
}
