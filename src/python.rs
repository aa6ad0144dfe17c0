//! Python bindings
//!
//! The report service hands over JSON strings and gets PDF bytes back.
//! Providers are executables under `provider_root`, one directory each.

use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3::types::PyBytes;
use serde_json::Value;

use crate::document::Document;
use crate::options::RenderOptions;
use crate::placeholder::PlaceholderContext;
use crate::provider::{FnRegistry, ProviderRegistry, ScriptRegistry};
use crate::renderer::{render_document, RenderOutput};
use crate::validate::check_widths;

fn json_arg(name: &str, json: &str) -> PyResult<Value> {
    serde_json::from_str(json).map_err(|e| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Invalid JSON for {}: {}", name, e))
    })
}

fn to_json_string<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()))
}

fn build_options(asset_paths: Vec<String>, document_dir: Option<String>) -> RenderOptions {
    let mut options = RenderOptions::default();
    if let Some(dir) = document_dir {
        options = options.with_document_dir(dir);
    }
    for path in asset_paths {
        options = options.with_asset_path(path);
    }
    options
}

fn run(
    document_json: &str,
    data_source_json: &str,
    context_json: &str,
    provider_root: Option<String>,
    options: RenderOptions,
) -> PyResult<RenderOutput> {
    let document = Document::from_json(document_json)?;
    let data_source = json_arg("data_source", data_source_json)?;
    let placeholders: PlaceholderContext = serde_json::from_value(json_arg("context", context_json)?)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Invalid context: {}", e)))?;

    let scripts = provider_root.map(|root| ScriptRegistry::new(PathBuf::from(root)));
    let none = FnRegistry::new();
    let providers: &dyn ProviderRegistry = match &scripts {
        Some(registry) => registry,
        None => &none,
    };

    Ok(render_document(&document, &data_source, &placeholders, providers, &options)?)
}

/// Render a template document and return the PDF bytes
#[pyfunction]
#[pyo3(signature = (document_json, data_source_json = "null", context_json = "{}", provider_root = None, asset_paths = Vec::new(), document_dir = None))]
fn render_document_json<'py>(
    py: Python<'py>,
    document_json: &str,
    data_source_json: &str,
    context_json: &str,
    provider_root: Option<String>,
    asset_paths: Vec<String>,
    document_dir: Option<String>,
) -> PyResult<&'py PyBytes> {
    let options = build_options(asset_paths, document_dir);
    let output = run(document_json, data_source_json, context_json, provider_root, options)?;
    Ok(PyBytes::new(py, &output.pdf))
}

/// Same as `render_document_json`, plus the diagnostics as a JSON array
#[pyfunction]
#[pyo3(signature = (document_json, data_source_json = "null", context_json = "{}", provider_root = None, asset_paths = Vec::new(), document_dir = None))]
fn render_document_with_diagnostics<'py>(
    py: Python<'py>,
    document_json: &str,
    data_source_json: &str,
    context_json: &str,
    provider_root: Option<String>,
    asset_paths: Vec<String>,
    document_dir: Option<String>,
) -> PyResult<(&'py PyBytes, String)> {
    let options = build_options(asset_paths, document_dir);
    let output = run(document_json, data_source_json, context_json, provider_root, options)?;
    let diagnostics = to_json_string(&output.diagnostics)?;
    Ok((PyBytes::new(py, &output.pdf), diagnostics))
}

/// Table levels wider than their element or the page, as a JSON array
#[pyfunction]
fn check_widths_json(document_json: &str) -> PyResult<String> {
    let document = Document::from_json(document_json)?;
    let overflows = check_widths(&document, &RenderOptions::default())?;
    to_json_string(&overflows)
}

#[pymodule]
fn template_pdf_renderer(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(render_document_json, m)?)?;
    m.add_function(wrap_pyfunction!(render_document_with_diagnostics, m)?)?;
    m.add_function(wrap_pyfunction!(check_widths_json, m)?)?;
    Ok(())
}
