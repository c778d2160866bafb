// src/modules/http.rs
// Issue an HTTP request and require the expected status. With `download`
// the body is written to a path, changed only when the content differs.
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use indexmap::IndexMap;
use std::io::Read;
use std::path::Path;

use crate::ast::Value;
use crate::env::Environment;
use crate::modules::{
    check_present, check_scalar, optional_str, required_str, Module, ModuleError, ModuleResult,
    ParamValue,
};

#[derive(Default)]
pub struct HttpModule {
    outputs: IndexMap<String, String>,
}

fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

impl Module for HttpModule {
    fn name(&self) -> &'static str {
        "http"
    }

    fn check(&self, params: &IndexMap<String, Value>) -> ModuleResult<()> {
        check_present(params, "url")?;
        for key in ["url", "method", "body", "basic_auth", "expect", "download"] {
            check_scalar(params, key)?;
        }
        Ok(())
    }

    fn execute(
        &mut self,
        _env: &mut Environment,
        params: &IndexMap<String, ParamValue>,
    ) -> ModuleResult<bool> {
        let url = required_str(params, "url")?;
        let method = optional_str(params, "method")
            .unwrap_or("GET")
            .to_uppercase();
        let expect: u16 = match optional_str(params, "expect") {
            Some(raw) => raw.parse().map_err(|_| {
                ModuleError::InvalidParameter(format!("expect must be a status code, not '{}'", raw))
            })?,
            None => 200,
        };

        let mut request = ureq::request(&method, url);
        if let Some(headers) = params.get("headers") {
            for header in headers.to_list() {
                let (name, value) = header.split_once(':').ok_or_else(|| {
                    ModuleError::InvalidParameter(format!(
                        "header '{}' is not in 'Name: value' form",
                        header
                    ))
                })?;
                request = request.set(name.trim(), value.trim());
            }
        }
        if let Some(credentials) = optional_str(params, "basic_auth") {
            request = request.set(
                "Authorization",
                &format!("Basic {}", BASE64.encode(credentials)),
            );
        }

        log::debug!("http: {} {}", method, url);
        let result = match optional_str(params, "body") {
            Some(body) => request.send_string(body),
            None => request.call(),
        };
        let response = match result {
            Ok(response) => response,
            // A non-2xx status still carries a response we may have been
            // told to expect.
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(t)) => {
                return Err(ModuleError::ActionFailed(format!(
                    "{} {} failed: {}",
                    method, url, t
                )));
            }
        };

        let status = response.status();
        if status != expect {
            return Err(ModuleError::ActionFailed(format!(
                "{} {} returned {} (expected {})",
                method, url, status, expect
            )));
        }
        self.outputs.insert("status".to_string(), status.to_string());

        if let Some(download) = optional_str(params, "download") {
            let mut body = Vec::new();
            response.into_reader().read_to_end(&mut body)?;
            let path = Path::new(download);
            if path.exists() && md5_hex(&std::fs::read(path)?) == md5_hex(&body) {
                return Ok(false);
            }
            std::fs::write(path, body)?;
            return Ok(true);
        }

        Ok(true)
    }

    fn outputs(&self) -> IndexMap<String, String> {
        self.outputs.clone()
    }
}
