// src/modules/log.rs
// Emit a message through the logging facade. Never reports changed.
use indexmap::IndexMap;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{check_present, required_str, Module, ModuleResult, ParamValue};

pub struct LogModule;

impl Module for LogModule {
    fn name(&self) -> &'static str {
        "log"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "message")
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let message = required_str(params, "message")?;
        ::log::info!("{}", message);
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_requires_message() {
        assert!(LogModule.check(&IndexMap::new()).is_err());
    }

    #[test]
    fn test_never_changed() {
        let mut module = LogModule;
        let mut env = Environment::empty();
        let mut params = IndexMap::new();
        params.insert("message".to_string(), ParamValue::Str("hello".into()));
        assert!(!module.execute(&mut env, &params).unwrap());
    }
}
