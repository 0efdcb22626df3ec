//! Swagger document loading (JSON or YAML)

use std::path::Path;

use serde_json::Value;

/// Read and parse the document at `path`.
///
/// # Errors
///
/// Unreadable file or unparsable content.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| LoadError::Io(format!("{}: {e}", path.display())))?;
    parse_document(path, &content)
}

/// Parse `content`; the format follows the extension of `path`, otherwise
/// the content is sniffed.
///
/// # Errors
///
/// Content that is not valid JSON or YAML.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => parse_yaml(content),
        "json" => parse_json(content),
        _ => {
            // Content sniffing: trimmed first char
            if content.trim_start().starts_with('{') {
                parse_json(content)
            } else {
                parse_yaml(content)
            }
        }
    }
}

fn parse_json(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|e| LoadError::Parse(format!("Invalid JSON: {e}")))
}

fn parse_yaml(content: &str) -> Result<Value, LoadError> {
    serde_yml::from_str(content).map_err(|e| LoadError::Parse(format!("Invalid YAML: {e}")))
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
