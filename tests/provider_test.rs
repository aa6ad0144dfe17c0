use serde_json::{json, Value};
use template_pdf_renderer::{
    ChainRegistry, ChartImage, FnRegistry, ProviderError, ProviderPayload, ProviderRegistry, ScriptRegistry,
};

#[test]
fn chain_falls_through_only_on_not_found() {
    let first = FnRegistry::new().with("broken", |_, _| anyhow::bail!("boom"));
    let second = FnRegistry::new()
        .with("broken", |_, _| Ok(json!({"rows": []})))
        .with("rows", |_, _| Ok(json!({"rows": [{"a": 1}]})));
    let chain = ChainRegistry::new().with(first).with(second);

    assert!(matches!(chain.invoke("rows", &json!({}), &Value::Null), Ok(ProviderPayload::Table(_))));
    assert!(matches!(
        chain.invoke("broken", &json!({}), &Value::Null),
        Err(ProviderError::Failed { .. })
    ));
    assert_eq!(
        chain.invoke("nope", &json!({}), &Value::Null),
        Err(ProviderError::NotFound("nope".to_string()))
    );
}

#[test]
fn script_names_cannot_escape_root() {
    let registry = ScriptRegistry::new("/tmp/providers");
    assert!(registry.resolve("../etc").is_none());
    assert!(registry.resolve("a/b").is_none());
    assert!(registry.resolve("").is_none());
}

#[cfg(unix)]
mod scripts {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use template_pdf_renderer::{render_document, Document, DrawOp, PlaceholderContext, RenderOptions};

    fn install(root: &Path, name: &str, body: &str) {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    // Spawning executables that were just written races with other threads'
    // open handles (ETXTBSY), so every script case lives in this one test.
    #[test]
    fn script_providers() {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = tempfile::tempdir().unwrap();
        install(
            root.path(),
            "readings",
            r#"if grep -q '"sensor":"INC-2"' "$1"; then
  echo '{"column_headers": ["depth"], "rows": [{"depth": 1}, {"depth": 2}]}'
else
  echo "unexpected request" >&2
  exit 3
fi"#,
        );
        install(
            root.path(),
            "plot",
            r#"out=$(sed -e 's/.*"output_path":"\([^"]*\)".*/\1/' "$1")
printf 'IMAGEDATA' > "$out""#,
        );
        install(root.path(), "failing", "echo 'database is locked' >&2\nexit 2");
        install(root.path(), "chatty", "echo 'not json at all'");
        install(root.path(), "silent", "exit 0");
        let trace = tempfile::tempdir().unwrap();
        install(
            root.path(),
            "traced",
            &format!(
                r#"echo "$1" > "{trace}/request"
sed -e 's/.*"output_path":"\([^"]*\)".*/\1/' "$1" > "{trace}/output"
if grep -q '"fail":true' "$1"; then
  echo 'asked to fail' >&2
  exit 4
fi
echo '{{"rows": []}}'"#,
                trace = trace.path().display()
            ),
        );

        let registry = ScriptRegistry::new(root.path());
        let params = json!({"sensor": "INC-2"});

        match registry.invoke("readings", &params, &json!({"db": "x"})) {
            Ok(ProviderPayload::Table(table)) => {
                assert_eq!(table.column_headers, vec!["depth"]);
                assert_eq!(table.rows.len(), 2);
            }
            other => panic!("expected rows, got {:?}", other),
        }

        let err = registry.invoke("readings", &json!({"sensor": "other"}), &Value::Null).unwrap_err();
        assert!(err.to_string().contains("exit status 3: unexpected request"), "{}", err);

        assert_eq!(
            registry.invoke("plot", &params, &Value::Null),
            Ok(ProviderPayload::Chart(ChartImage { mime: None, data: b"IMAGEDATA".to_vec() }))
        );

        let err = registry.invoke("failing", &params, &Value::Null).unwrap_err();
        assert!(err.to_string().contains("database is locked"));

        let err = registry.invoke("chatty", &params, &Value::Null).unwrap_err();
        assert!(err.to_string().contains("invalid JSON"));

        let err = registry.invoke("silent", &params, &Value::Null).unwrap_err();
        assert!(err.to_string().contains("no output"));

        // request and output files are gone whether the provider succeeds or fails
        for (fail, succeeded) in [(false, true), (true, false)] {
            let result = registry.invoke("traced", &json!({"fail": fail}), &Value::Null);
            assert_eq!(result.is_ok(), succeeded, "{:?}", result);
            for side in ["request", "output"] {
                let recorded = std::fs::read_to_string(trace.path().join(side)).unwrap();
                let recorded = recorded.trim();
                assert!(!recorded.is_empty());
                assert!(!Path::new(recorded).exists(), "{} left behind: {}", side, recorded);
            }
        }

        assert_eq!(
            registry.invoke("absent", &params, &Value::Null),
            Err(ProviderError::NotFound("absent".to_string()))
        );

        // end to end: an autofill table fed by a script
        let document = Document::from_value(json!({
            "pages": {"1": {"elementos": {
                "grid": {
                    "tipo": "tabla",
                    "geometria": {"x": 1, "y": 1, "ancho": 3, "alto": 5},
                    "configuracion": {"script": "readings", "parametros": {"sensor": "$CURRENT_sensor"}},
                    "cuadricula": {"niveles": [{"tipo": "autofill", "columnas": [{"ancho": 3, "contenido": "[depth]"}]}]}
                }
            }}}
        }))
        .unwrap();
        let context = PlaceholderContext::new().with_field("sensor", json!("INC-2"));
        let options = RenderOptions::default().with_compression(false);
        let output = render_document(&document, &Value::Null, &context, &registry, &options).unwrap();
        assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
        let cells: Vec<&str> = output.pages[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(cells, vec!["1", "2"]);
    }
}
