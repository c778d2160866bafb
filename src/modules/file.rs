// src/modules/file.rs
// Ensure a file exists with the requested content, mode and ownership, or
// is absent. Content can come from a literal, a local file, or an HTTP
// download; replacement is decided by md5 comparison.
use indexmap::IndexMap;
use std::io::Read;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::process::Command;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::directory::{ensure_mode, parse_mode};
use crate::modules::{
    check_exclusive, check_present, check_scalar, check_status, optional_str, required_str,
    Module, ModuleError, ModuleResult, ParamValue,
};

#[derive(Default)]
pub struct FileModule {
    outputs: IndexMap<String, String>,
}

fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

fn fetch_url(url: &str) -> ModuleResult<Vec<u8>> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| ModuleError::ActionFailed(format!("GET {} failed: {}", url, e)))?;
    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Resolve a user name to its uid via `id -u`.
fn lookup_uid(user: &str) -> ModuleResult<u32> {
    let output = check_status("id", Command::new("id").args(["-u", user]))?;
    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<u32>()
        .map_err(|_| ModuleError::ActionFailed(format!("cannot resolve user '{}'", user)))
}

/// Resolve a group name to its gid via `getent group`.
fn lookup_gid(group: &str) -> ModuleResult<u32> {
    let output = check_status("getent", Command::new("getent").args(["group", group]))?;
    let line = String::from_utf8_lossy(&output.stdout).into_owned();
    line.trim()
        .split(':')
        .nth(2)
        .and_then(|gid| gid.parse::<u32>().ok())
        .ok_or_else(|| ModuleError::ActionFailed(format!("cannot resolve group '{}'", group)))
}

impl FileModule {
    fn desired_content(&self, params: &IndexMap<String, ParamValue>) -> ModuleResult<Option<Vec<u8>>> {
        if let Some(content) = optional_str(params, "content") {
            return Ok(Some(content.as_bytes().to_vec()));
        }
        if let Some(source) = optional_str(params, "source") {
            return Ok(Some(std::fs::read(source)?));
        }
        if let Some(url) = optional_str(params, "source_url") {
            return Ok(Some(fetch_url(url)?));
        }
        Ok(None)
    }
}

impl Module for FileModule {
    fn name(&self) -> &'static str {
        "file"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "target")?;
        for key in ["target", "content", "source", "source_url", "state", "mode", "owner", "group"]
        {
            check_scalar(params, key)?;
        }
        check_exclusive(params, &["content", "source", "source_url"], false)
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let target = required_str(params, "target")?;
        let state = optional_str(params, "state").unwrap_or("present");
        let path = Path::new(target);

        if state == "absent" {
            if path.exists() {
                std::fs::remove_file(path)?;
                return Ok(true);
            }
            return Ok(false);
        }
        if state != "present" {
            return Err(ModuleError::InvalidParameter(format!(
                "state must be 'present' or 'absent', not '{}'",
                state
            )));
        }

        let desired = self.desired_content(params)?;
        let mut changed = false;

        if !path.exists() {
            std::fs::write(path, desired.as_deref().unwrap_or_default())?;
            changed = true;
        } else if let Some(ref bytes) = desired {
            let current = std::fs::read(path)?;
            if md5_hex(&current) != md5_hex(bytes) {
                std::fs::write(path, bytes)?;
                changed = true;
            }
        }

        if let Some(mode) = optional_str(params, "mode") {
            changed |= ensure_mode(path, parse_mode(mode)?)?;
        }

        let metadata = std::fs::metadata(path)?;
        if let Some(owner) = optional_str(params, "owner") {
            if metadata.uid() != lookup_uid(owner)? {
                check_status("chown", Command::new("chown").args([owner, target]))?;
                changed = true;
            }
        }
        if let Some(group) = optional_str(params, "group") {
            if metadata.gid() != lookup_gid(group)? {
                check_status("chgrp", Command::new("chgrp").args([group, target]))?;
                changed = true;
            }
        }

        let final_bytes = std::fs::read(path)?;
        self.outputs.insert("size".to_string(), final_bytes.len().to_string());
        self.outputs.insert("md5".to_string(), md5_hex(&final_bytes));
        Ok(changed)
    }

    fn outputs(&self) -> IndexMap<String, String> {
        self.outputs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> IndexMap<String, ParamValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ParamValue::Str(v.to_string())))
            .collect()
    }

    #[test]
    fn test_check_rejects_competing_sources() {
        let mut p = IndexMap::new();
        p.insert("target".to_string(), Value::Str("/tmp/f".into()));
        p.insert("content".to_string(), Value::Str("x".into()));
        assert!(FileModule::default().check(&p).is_ok());
        p.insert("source".to_string(), Value::Str("/etc/hosts".into()));
        assert!(FileModule::default().check(&p).is_err());
    }

    #[test]
    fn test_create_with_content_then_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("greeting");
        let target_s = target.to_string_lossy().to_string();
        let mut env = Environment::empty();

        let p = params(&[("target", &target_s), ("content", "hello\n")]);
        let mut module = FileModule::default();
        assert!(module.execute(&mut env, &p).unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello\n");

        let mut second = FileModule::default();
        assert!(!second.execute(&mut env, &p).unwrap());
    }

    #[test]
    fn test_content_replaced_when_different() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("f");
        std::fs::write(&target, "old").unwrap();
        let target_s = target.to_string_lossy().to_string();
        let mut env = Environment::empty();

        let mut module = FileModule::default();
        let p = params(&[("target", &target_s), ("content", "new")]);
        assert!(module.execute(&mut env, &p).unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_bare_target_touches_but_preserves() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("f");
        std::fs::write(&target, "keep me").unwrap();
        let target_s = target.to_string_lossy().to_string();
        let mut env = Environment::empty();

        // No content source: an existing file is left alone.
        let mut module = FileModule::default();
        assert!(!module.execute(&mut env, &params(&[("target", &target_s)])).unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "keep me");
    }

    #[test]
    fn test_copy_from_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::write(&source, "payload").unwrap();
        let target = dir.path().join("dst");
        let mut env = Environment::empty();

        let mut module = FileModule::default();
        let p = params(&[
            ("target", &target.to_string_lossy()),
            ("source", &source.to_string_lossy()),
        ]);
        assert!(module.execute(&mut env, &p).unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "payload");
    }

    #[test]
    fn test_absent_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("f");
        std::fs::write(&target, "x").unwrap();
        let target_s = target.to_string_lossy().to_string();
        let mut env = Environment::empty();

        let p = params(&[("target", &target_s), ("state", "absent")]);
        let mut module = FileModule::default();
        assert!(module.execute(&mut env, &p).unwrap());
        assert!(!target.exists());
        assert!(!module.execute(&mut env, &p).unwrap());
    }

    #[test]
    fn test_outputs_size_and_md5() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("f");
        let target_s = target.to_string_lossy().to_string();
        let mut env = Environment::empty();

        let mut module = FileModule::default();
        let p = params(&[("target", &target_s), ("content", "hello")]);
        module.execute(&mut env, &p).unwrap();
        let outputs = module.outputs();
        assert_eq!(outputs.get("size").map(|s| s.as_str()), Some("5"));
        assert_eq!(
            outputs.get("md5").map(|s| s.as_str()),
            Some("5d41402abc4b2a76b9719d911017c592")
        );
    }
}
