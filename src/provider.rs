//! Provider bridge
//!
//! Charts and autofill tables get their content from providers: named
//! programs that receive resolved parameters plus the data source and answer
//! with either an image (as a `data:image/...;base64,` URL) or a table
//! payload `{ "column_headers": [...], "rows": [{...}, ...] }`.
//!
//! How a name maps to code is up to the [`ProviderRegistry`] in use:
//! compiled-in closures ([`FnRegistry`]), executables on disk
//! ([`ScriptRegistry`]), or several of them tried in order ([`ChainRegistry`]).

use std::collections::HashMap;
use std::io::Write;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, warn};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::image_utils::decode_base64_payload;
use crate::json_helpers::value_to_text;

const STDERR_EXCERPT_CHARS: usize = 200;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("provider not found: {0}")]
    NotFound(String),

    #[error("provider '{provider}' failed: {detail}")]
    Failed { provider: String, detail: String },
}

impl ProviderError {
    fn failed(provider: &str, detail: impl Into<String>) -> Self {
        ProviderError::Failed {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    pub fn provider(&self) -> &str {
        match self {
            ProviderError::NotFound(name) => name,
            ProviderError::Failed { provider, .. } => provider,
        }
    }
}

/// Image bytes returned by a chart provider
#[derive(Debug, Clone, PartialEq)]
pub struct ChartImage {
    pub mime: Option<String>,
    pub data: Vec<u8>,
}

/// Records returned by a table provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TablePayload {
    pub column_headers: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    Chart(ChartImage),
    Table(TablePayload),
}

/// Resolves a provider by name and runs it
pub trait ProviderRegistry {
    fn invoke(&self, name: &str, params: &Value, data_source: &Value) -> Result<ProviderPayload, ProviderError>;
}

/// Classify what a provider returned
pub fn interpret_output(provider: &str, output: Value) -> Result<ProviderPayload, ProviderError> {
    match output {
        Value::String(s) if s.trim_start().starts_with("data:image") => {
            let (mime, data) = decode_base64_payload(&s).map_err(|e| ProviderError::failed(provider, e.to_string()))?;
            Ok(ProviderPayload::Chart(ChartImage { mime, data }))
        }
        Value::Object(mut map) if map.contains_key("rows") => {
            let rows = match map.remove("rows") {
                Some(Value::Array(rows)) => rows,
                Some(Value::Null) | None => Vec::new(),
                Some(_) => return Err(ProviderError::failed(provider, "'rows' is not an array")),
            };
            let rows = rows
                .into_iter()
                .map(|row| match row {
                    Value::Object(record) => Ok(record),
                    other => Err(ProviderError::failed(provider, format!("row is not an object: {}", other))),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let column_headers = match map.remove("column_headers") {
                Some(Value::Array(headers)) => headers.iter().map(value_to_text).collect(),
                _ => Vec::new(),
            };
            Ok(ProviderPayload::Table(TablePayload { column_headers, rows }))
        }
        other => {
            let mut shown = other.to_string();
            if shown.len() > 80 {
                shown = shown.chars().take(80).collect::<String>() + "...";
            }
            Err(ProviderError::failed(provider, format!("unrecognised output: {}", shown)))
        }
    }
}

type ProviderFn = Box<dyn Fn(&Value, &Value) -> anyhow::Result<Value> + Send + Sync>;

/// Compiled-in providers registered by name
#[derive(Default)]
pub struct FnRegistry {
    providers: HashMap<String, ProviderFn>,
}

impl FnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `name`, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, provider: F) -> &mut Self
    where
        F: Fn(&Value, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.providers.insert(name.into(), Box::new(provider));
        self
    }

    pub fn with<F>(mut self, name: impl Into<String>, provider: F) -> Self
    where
        F: Fn(&Value, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(name, provider);
        self
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked".to_string()
    }
}

impl ProviderRegistry for FnRegistry {
    fn invoke(&self, name: &str, params: &Value, data_source: &Value) -> Result<ProviderPayload, ProviderError> {
        let provider = self
            .providers
            .get(name)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        debug!("Invoking compiled-in provider '{}'", name);
        let output = catch_unwind(AssertUnwindSafe(|| provider(params, data_source)))
            .map_err(|panic| ProviderError::failed(name, format!("panicked: {}", panic_message(panic.as_ref()))))?
            .map_err(|e| ProviderError::failed(name, format!("{:#}", e)))?;
        interpret_output(name, output)
    }
}

/// Providers as executables laid out as `<root>/<name>/<name>`
///
/// Each call writes a JSON request file `{data_source, params, output_path}`
/// and runs the executable with its path as the only argument. The provider
/// answers on stdout (JSON, or a bare data URL). A provider that prints
/// nothing may instead write image bytes to `output_path`.
#[derive(Debug, Clone)]
pub struct ScriptRegistry {
    root: PathBuf,
}

impl ScriptRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Locate the executable for `name`. Looked up on every call.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return None;
        }
        let dir = self.root.join(name);
        ["", ".exe"]
            .iter()
            .map(|ext| dir.join(format!("{}{}", name, ext)))
            .find(|candidate| candidate.is_file())
    }

    fn write_request(&self, name: &str, params: &Value, data_source: &Value, output_path: &Path) -> Result<tempfile::NamedTempFile, ProviderError> {
        let request = json!({
            "data_source": data_source,
            "params": params,
            "output_path": output_path.to_string_lossy(),
        });
        let mut file = tempfile::Builder::new()
            .prefix("provider-request-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| ProviderError::failed(name, format!("cannot create request file: {}", e)))?;
        let body = serde_json::to_vec(&request).map_err(|e| ProviderError::failed(name, e.to_string()))?;
        file.write_all(&body)
            .and_then(|_| file.flush())
            .map_err(|e| ProviderError::failed(name, format!("cannot write request file: {}", e)))?;
        Ok(file)
    }
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_EXCERPT_CHARS {
        text.to_string()
    } else {
        text.chars().skip(count - STDERR_EXCERPT_CHARS).collect()
    }
}

impl ProviderRegistry for ScriptRegistry {
    fn invoke(&self, name: &str, params: &Value, data_source: &Value) -> Result<ProviderPayload, ProviderError> {
        let executable = self
            .resolve(name)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;

        // both files are removed when they go out of scope
        let output_file = tempfile::Builder::new()
            .prefix("provider-output-")
            .tempfile()
            .map_err(|e| ProviderError::failed(name, format!("cannot create output file: {}", e)))?;
        let request = self.write_request(name, params, data_source, output_file.path())?;

        debug!("Running provider {} with request {}", executable.display(), request.path().display());
        let output = Command::new(&executable)
            .arg(request.path())
            .output()
            .map_err(|e| ProviderError::failed(name, format!("cannot start {}: {}", executable.display(), e)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ProviderError::failed(name, format!("exit status {}: {}", status, excerpt(&stderr))));
        }
        if !stderr.trim().is_empty() {
            warn!("Provider '{}' wrote to stderr: {}", name, excerpt(&stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            let data = std::fs::read(output_file.path())
                .map_err(|e| ProviderError::failed(name, format!("cannot read output file: {}", e)))?;
            if data.is_empty() {
                return Err(ProviderError::failed(name, "no output"));
            }
            return Ok(ProviderPayload::Chart(ChartImage { mime: None, data }));
        }
        if stdout.starts_with("data:") {
            return interpret_output(name, Value::String(stdout.to_string()));
        }
        let value: Value = serde_json::from_str(stdout)
            .map_err(|e| ProviderError::failed(name, format!("invalid JSON on stdout: {}", e)))?;
        interpret_output(name, value)
    }
}

/// Tries each registry in turn; the first answer other than NotFound wins
#[derive(Default)]
pub struct ChainRegistry {
    registries: Vec<Box<dyn ProviderRegistry>>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, registry: impl ProviderRegistry + 'static) -> Self {
        self.registries.push(Box::new(registry));
        self
    }
}

impl ProviderRegistry for ChainRegistry {
    fn invoke(&self, name: &str, params: &Value, data_source: &Value) -> Result<ProviderPayload, ProviderError> {
        for registry in &self.registries {
            match registry.invoke(name, params, data_source) {
                Err(ProviderError::NotFound(_)) => continue,
                other => return other,
            }
        }
        Err(ProviderError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    #[test]
    fn data_url_is_a_chart() {
        let payload = interpret_output("c", json!("data:image/png;base64,AAEC")).unwrap();
        assert_eq!(
            payload,
            ProviderPayload::Chart(ChartImage { mime: Some("image/png".to_string()), data: vec![0, 1, 2] })
        );
    }

    #[test]
    fn rows_object_is_a_table() {
        let payload = interpret_output("t", json!({"column_headers": ["a", 2], "rows": [{"a": 1}]})).unwrap();
        let ProviderPayload::Table(table) = payload else {
            panic!("expected a table");
        };
        assert_eq!(table.column_headers, vec!["a", "2"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn anything_else_fails_with_provider_name() {
        for output in [json!(42), json!({"data": []}), json!("plain text"), json!({"rows": [1]})] {
            let err = interpret_output("my_chart", output).unwrap_err();
            assert!(matches!(err, ProviderError::Failed { .. }));
            assert!(err.to_string().contains("my_chart"));
        }
    }

    #[test]
    fn fn_registry_reports_errors_and_panics() {
        let registry = FnRegistry::new()
            .with("ok", |params, _| Ok(json!({"rows": [params.clone()]})))
            .with("err", |_, _| bail!("no data for sensor"))
            .with("boom", |_, _| panic!("index out of range"));

        assert!(matches!(
            registry.invoke("ok", &json!({"x": 1}), &Value::Null),
            Ok(ProviderPayload::Table(_))
        ));
        let err = registry.invoke("err", &Value::Null, &Value::Null).unwrap_err();
        assert!(err.to_string().contains("no data for sensor"));
        let err = registry.invoke("boom", &Value::Null, &Value::Null).unwrap_err();
        assert!(err.to_string().contains("index out of range"));
        assert_eq!(
            registry.invoke("missing", &Value::Null, &Value::Null).unwrap_err(),
            ProviderError::NotFound("missing".to_string())
        );
    }

    #[test]
    fn fn_registry_passes_data_source() {
        let registry = FnRegistry::new().with("echo", |_, data| Ok(json!({"rows": [data.clone()]})));
        let payload = registry.invoke("echo", &Value::Null, &json!({"db": "site.sqlite"})).unwrap();
        let ProviderPayload::Table(table) = payload else {
            panic!("expected a table");
        };
        assert_eq!(table.rows[0]["db"], "site.sqlite");
    }

    #[test]
    fn chain_falls_through_not_found_only() {
        let first = FnRegistry::new().with("fails", |_, _| bail!("first"));
        let second = FnRegistry::new()
            .with("fails", |_, _| Ok(json!({"rows": []})))
            .with("only_second", |_, _| Ok(json!({"rows": []})));
        let chain = ChainRegistry::new().with(first).with(second);

        assert!(chain.invoke("only_second", &Value::Null, &Value::Null).is_ok());
        assert!(chain.invoke("fails", &Value::Null, &Value::Null).unwrap_err().to_string().contains("first"));
        assert!(matches!(
            chain.invoke("nowhere", &Value::Null, &Value::Null),
            Err(ProviderError::NotFound(_))
        ));
    }

    #[test]
    fn script_names_cannot_escape_the_root() {
        let registry = ScriptRegistry::new(std::env::temp_dir());
        for name in ["", "../etc", "a/b", "a\\b", ".."] {
            assert_eq!(registry.resolve(name), None);
            assert!(matches!(
                registry.invoke(name, &Value::Null, &Value::Null),
                Err(ProviderError::NotFound(_))
            ));
        }
    }
}
