// src/modules/package.rs
// Install or remove packages through whichever supported package manager
// the host carries. Each package is queried before acting, so a rule whose
// packages are already in the requested state reports no change.
use indexmap::IndexMap;
use std::process::Command;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, check_status, optional_str, output_of, Module, ModuleError,
    ModuleResult, ParamValue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Manager {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Apk,
}

impl Manager {
    fn detect() -> ModuleResult<Self> {
        const CANDIDATES: &[(&str, Manager)] = &[
            ("apt-get", Manager::Apt),
            ("dnf", Manager::Dnf),
            ("yum", Manager::Yum),
            ("pacman", Manager::Pacman),
            ("apk", Manager::Apk),
        ];
        for (binary, manager) in CANDIDATES {
            if which::which(binary).is_ok() {
                return Ok(*manager);
            }
        }
        Err(ModuleError::ActionFailed(
            "no supported package manager found on PATH".to_string(),
        ))
    }

    fn installed(&self, package: &str) -> ModuleResult<bool> {
        let mut command = match self {
            Manager::Apt => {
                let mut c = Command::new("dpkg");
                c.args(["-s", package]);
                c
            }
            Manager::Dnf | Manager::Yum => {
                let mut c = Command::new("rpm");
                c.args(["-q", package]);
                c
            }
            Manager::Pacman => {
                let mut c = Command::new("pacman");
                c.args(["-Qi", package]);
                c
            }
            Manager::Apk => {
                let mut c = Command::new("apk");
                c.args(["info", "-e", package]);
                c
            }
        };
        Ok(output_of(&mut command)?.status.success())
    }

    fn install(&self, packages: &[String]) -> ModuleResult<()> {
        let mut command = match self {
            Manager::Apt => {
                let mut c = Command::new("apt-get");
                c.env("DEBIAN_FRONTEND", "noninteractive");
                c.args(["install", "--yes"]);
                c
            }
            Manager::Dnf => {
                let mut c = Command::new("dnf");
                c.args(["install", "-y"]);
                c
            }
            Manager::Yum => {
                let mut c = Command::new("yum");
                c.args(["install", "-y"]);
                c
            }
            Manager::Pacman => {
                let mut c = Command::new("pacman");
                c.args(["-S", "--noconfirm"]);
                c
            }
            Manager::Apk => {
                let mut c = Command::new("apk");
                c.arg("add");
                c
            }
        };
        command.args(packages);
        check_status("package install", &mut command)?;
        Ok(())
    }

    fn remove(&self, packages: &[String]) -> ModuleResult<()> {
        let mut command = match self {
            Manager::Apt => {
                let mut c = Command::new("apt-get");
                c.env("DEBIAN_FRONTEND", "noninteractive");
                c.args(["remove", "--yes"]);
                c
            }
            Manager::Dnf => {
                let mut c = Command::new("dnf");
                c.args(["remove", "-y"]);
                c
            }
            Manager::Yum => {
                let mut c = Command::new("yum");
                c.args(["remove", "-y"]);
                c
            }
            Manager::Pacman => {
                let mut c = Command::new("pacman");
                c.args(["-R", "--noconfirm"]);
                c
            }
            Manager::Apk => {
                let mut c = Command::new("apk");
                c.arg("del");
                c
            }
        };
        command.args(packages);
        check_status("package remove", &mut command)?;
        Ok(())
    }
}

pub struct PackageModule;

impl Module for PackageModule {
    fn name(&self) -> &'static str {
        "package"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "package")?;
        check_scalar(params, "state")
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let packages = params
            .get("package")
            .map(|v| v.to_list())
            .ok_or_else(|| ModuleError::MissingParameter("package".to_string()))?;
        let state = optional_str(params, "state").unwrap_or("installed");
        let installing = match state {
            "installed" | "present" => true,
            "absent" | "removed" => false,
            other => {
                return Err(ModuleError::InvalidParameter(format!(
                    "state must be installed/present or absent/removed, not '{}'",
                    other
                )));
            }
        };

        let manager = Manager::detect()?;
        let mut pending = Vec::new();
        for package in &packages {
            if manager.installed(package)? != installing {
                pending.push(package.clone());
            }
        }
        if pending.is_empty() {
            return Ok(false);
        }

        if installing {
            log::info!("package: installing {}", pending.join(", "));
            manager.install(&pending)?;
        } else {
            log::info!("package: removing {}", pending.join(", "));
            manager.remove(&pending)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_requires_package() {
        assert!(PackageModule.check(&IndexMap::new()).is_err());
        let mut p = IndexMap::new();
        p.insert("package".to_string(), Value::Str("git".into()));
        assert!(PackageModule.check(&p).is_ok());
        // Lists of packages are fine too.
        let mut p = IndexMap::new();
        p.insert(
            "package".to_string(),
            Value::List(vec![Value::Str("git".into()), Value::Str("curl".into())]),
        );
        assert!(PackageModule.check(&p).is_ok());
    }

    #[test]
    fn test_bad_state_rejected() {
        let mut module = PackageModule;
        let mut env = Environment::empty();
        let mut p = IndexMap::new();
        p.insert("package".to_string(), ParamValue::Str("git".into()));
        p.insert("state".to_string(), ParamValue::Str("sideways".into()));
        let err = module.execute(&mut env, &p).unwrap_err();
        assert!(err.to_string().contains("state must be"));
    }
}
