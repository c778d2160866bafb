// src/modules/sql.rs
// Execute SQL through the database's own client binary. Passwords travel
// via the client's environment variable, never the command line.
use indexmap::IndexMap;
use std::process::Command;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_exclusive, check_present, check_scalar, check_status, optional_str, required_str,
    Module, ModuleError, ModuleResult, ParamValue,
};

pub struct SqlModule;

impl Module for SqlModule {
    fn name(&self) -> &'static str {
        "sql"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "database")?;
        for key in ["database", "driver", "sql", "sql_file", "host", "user", "password"] {
            check_scalar(params, key)?;
        }
        check_exclusive(params, &["sql", "sql_file"], true)
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let database = required_str(params, "database")?;
        let driver = optional_str(params, "driver").unwrap_or("sqlite");

        let statement = match optional_str(params, "sql") {
            Some(sql) => sql.to_string(),
            None => {
                let path = required_str(params, "sql_file")?;
                std::fs::read_to_string(path)?
            }
        };

        let mut command = match driver {
            "sqlite" => {
                let mut c = Command::new("sqlite3");
                c.arg(database).arg(&statement);
                c
            }
            "postgres" => {
                let mut c = Command::new("psql");
                if let Some(host) = optional_str(params, "host") {
                    c.args(["-h", host]);
                }
                if let Some(user) = optional_str(params, "user") {
                    c.args(["-U", user]);
                }
                if let Some(password) = optional_str(params, "password") {
                    c.env("PGPASSWORD", password);
                }
                c.args(["-d", database, "-v", "ON_ERROR_STOP=1", "-c", &statement]);
                c
            }
            "mysql" => {
                let mut c = Command::new("mysql");
                if let Some(host) = optional_str(params, "host") {
                    c.args(["-h", host]);
                }
                if let Some(user) = optional_str(params, "user") {
                    c.args(["-u", user]);
                }
                if let Some(password) = optional_str(params, "password") {
                    c.env("MYSQL_PWD", password);
                }
                c.args(["-D", database, "-e", &statement]);
                c
            }
            other => {
                return Err(ModuleError::InvalidParameter(format!(
                    "driver must be sqlite, postgres or mysql, not '{}'",
                    other
                )));
            }
        };

        log::debug!("sql: running statement against {} via {}", database, driver);
        check_status("sql", &mut command)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> IndexMap<String, Value> {
        let mut p = IndexMap::new();
        p.insert("database".to_string(), Value::Str("app".into()));
        p
    }

    #[test]
    fn test_check_requires_database_and_statement() {
        assert!(SqlModule.check(&IndexMap::new()).is_err());
        // Database alone is not enough.
        assert!(SqlModule.check(&base_params()).is_err());

        let mut p = base_params();
        p.insert("sql".to_string(), Value::Str("select 1".into()));
        assert!(SqlModule.check(&p).is_ok());
    }

    #[test]
    fn test_check_rejects_both_sql_and_sql_file() {
        let mut p = base_params();
        p.insert("sql".to_string(), Value::Str("select 1".into()));
        p.insert("sql_file".to_string(), Value::Str("/tmp/x.sql".into()));
        assert!(SqlModule.check(&p).is_err());
    }

    #[test]
    fn test_unknown_driver_rejected() {
        let mut module = SqlModule;
        let mut env = Environment::empty();
        let mut p = IndexMap::new();
        p.insert("database".to_string(), ParamValue::Str("app".into()));
        p.insert("sql".to_string(), ParamValue::Str("select 1".into()));
        p.insert("driver".to_string(), ParamValue::Str("oracle".into()));
        let err = module.execute(&mut env, &p).unwrap_err();
        assert!(err.to_string().contains("driver"));
    }

    #[test]
    fn test_sqlite_roundtrip() {
        if which::which("sqlite3").is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("t.db");
        let mut module = SqlModule;
        let mut env = Environment::empty();
        let mut p = IndexMap::new();
        p.insert(
            "database".to_string(),
            ParamValue::Str(db.to_string_lossy().to_string()),
        );
        p.insert(
            "sql".to_string(),
            ParamValue::Str("create table t (x integer);".into()),
        );
        assert!(module.execute(&mut env, &p).unwrap());
        assert!(db.exists());
    }
}
