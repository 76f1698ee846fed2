//! Agent inputs from the command line

use anyhow::{bail, Context};
use qf_model::AgentInputs;
use serde_json::Value;
use std::path::Path;

/// Parse one `KEY=VALUE` assignment
///
/// `VALUE` is JSON when it parses as JSON, the contents of a file when
/// written `@path`, and a plain string otherwise.
///
/// # Errors
/// No `=`, an empty key, or an unreadable `@path`.
pub fn parse_assignment(raw: &str) -> anyhow::Result<(String, Value)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("input '{raw}' is not of the form KEY=VALUE");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("input '{raw}' has an empty key");
    }
    let value = if let Some(path) = value.strip_prefix('@') {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input '{key}' from {path}"))?;
        Value::String(text)
    } else {
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
    };
    Ok((key.to_string(), value))
}

/// Inputs file first, then assignments in order; later keys win
///
/// # Errors
/// Unreadable inputs file, a file that is not a JSON object, or a bad assignment.
pub fn collect_inputs<'a>(
    file: Option<&Path>,
    assignments: impl IntoIterator<Item = &'a str>,
) -> anyhow::Result<AgentInputs> {
    let mut inputs = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read inputs file {}", path.display()))?;
            serde_json::from_str::<AgentInputs>(&text)
                .with_context(|| format!("inputs file {} must hold a JSON object", path.display()))?
        }
        None => AgentInputs::new(),
    };
    for raw in assignments {
        let (key, value) = parse_assignment(raw)?;
        inputs.insert(key, value);
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn json_values_and_plain_strings() {
        assert_eq!(
            parse_assignment(r#"endpoints=["/a","/b"]"#).unwrap(),
            ("endpoints".to_string(), json!(["/a", "/b"]))
        );
        assert_eq!(
            parse_assignment("requirements_doc=REQ-1 login = works").unwrap(),
            ("requirements_doc".to_string(), json!("REQ-1 login = works"))
        );
        assert!(parse_assignment("no_separator").is_err());
        assert!(parse_assignment("=value").is_err());
    }

    #[test]
    fn file_then_assignments() {
        let mut source = tempfile::NamedTempFile::new().unwrap();
        write!(source, "def f():\n    return 1\n").unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"endpoints": "/old", "config": {{"test_framework": "pytest"}}}}"#).unwrap();

        let at_source = format!("source_code=@{}", source.path().display());
        let inputs = collect_inputs(Some(file.path()), ["endpoints=/new", at_source.as_str()]).unwrap();

        assert_eq!(inputs.get_str("endpoints"), Some("/new"));
        assert_eq!(inputs.get_str("source_code"), Some("def f():\n    return 1\n"));
        assert!(inputs.get_object("config").is_some());
    }

    #[test]
    fn inputs_file_must_be_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(collect_inputs(Some(file.path()), []).is_err());
    }
}
