// src/modules/docker.rs
// Ensure a docker image tag is available locally. The local tag list is
// fetched once per run and cached across rules.
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use std::process::Command;
use std::sync::Mutex;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, check_status, optional_str, required_str, Module, ModuleResult,
    ParamValue,
};

lazy_static::lazy_static! {
    static ref IMAGE_CACHE: Mutex<Option<HashSet<String>>> = Mutex::new(None);
}

/// One line of `docker images --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct ImageRecord {
    #[serde(rename = "Repository")]
    repository: String,
    #[serde(rename = "Tag")]
    tag: String,
}

fn local_images() -> ModuleResult<HashSet<String>> {
    let mut cache = match IMAGE_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(ref images) = *cache {
        return Ok(images.clone());
    }

    let output = check_status(
        "docker images",
        Command::new("docker").args(["images", "--format", "{{json .}}"]),
    )?;
    let mut images = HashSet::new();
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        if let Ok(record) = serde_json::from_str::<ImageRecord>(line) {
            images.insert(format!("{}:{}", record.repository, record.tag));
        }
    }
    *cache = Some(images.clone());
    Ok(images)
}

fn remember_image(image: &str) {
    let mut cache = match IMAGE_CACHE.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(ref mut images) = *cache {
        images.insert(image.to_string());
    }
}

pub struct DockerModule;

impl Module for DockerModule {
    fn name(&self) -> &'static str {
        "docker"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "image")?;
        check_scalar(params, "image")?;
        check_scalar(params, "force")
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let image = required_str(params, "image")?;
        let force = optional_str(params, "force") == Some("true");

        if !force && local_images()?.contains(image) {
            return Ok(false);
        }

        log::info!("docker: pulling {}", image);
        check_status("docker pull", Command::new("docker").args(["pull", image]))?;
        remember_image(image);
        Ok(true)
    }
}
