//! Case result dump to JSONL files
//!
//! Writes every case result (passed or not) to per-operation JSONL files
//! for post-hoc analysis and audit trails.
//!
//! ```text
//! .swaggest/dumps/
//! ├── GET__pets.jsonl
//! ├── DELETE__pets__id_.jsonl
//! └── index.json
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::report::CaseResult;

/// Headers that should be masked in dumps for security.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "x-auth-token",
    "cookie",
    "set-cookie",
    "proxy-authorization",
];

/// Mask value for redacted headers.
const MASK: &str = "***";

/// Summary of a dump operation, written as `index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpIndex {
    /// Total case results dumped
    pub total: u64,
    /// Per-operation file listing
    pub operations: Vec<DumpOperationEntry>,
    /// Directory where files were written
    pub dump_dir: PathBuf,
}

/// An entry in the dump index for one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpOperationEntry {
    /// Operation label, e.g. "DELETE /pets/{id}"
    pub operation: String,
    /// Filename within dump directory
    pub file: String,
    /// Number of case results in this file
    pub count: u64,
}

/// Write all case results to per-operation JSONL files.
///
/// # Errors
///
/// Returns error if dump directory cannot be created or files cannot be written.
pub fn write_dump(
    results: &[CaseResult],
    dump_dir: &Path,
    mask_headers: bool,
) -> Result<DumpIndex, DumpError> {
    std::fs::create_dir_all(dump_dir)
        .map_err(|e| DumpError::Io(format!("create {}: {e}", dump_dir.display())))?;

    // BTreeMap keeps the file order deterministic
    let mut groups: BTreeMap<&str, Vec<&CaseResult>> = BTreeMap::new();
    for result in results {
        groups.entry(result.operation.as_str()).or_default().push(result);
    }

    let mut entries = Vec::new();
    let mut total: u64 = 0;

    for (operation, results) in groups {
        let filename = sanitize_filename(operation);
        let filepath = dump_dir.join(&filename);

        let file = std::fs::File::create(&filepath)
            .map_err(|e| DumpError::Io(format!("create {}: {e}", filepath.display())))?;
        let mut writer = std::io::BufWriter::new(file);

        let count = u64::try_from(results.len()).unwrap_or(u64::MAX);
        total += count;

        for result in results {
            let line = if mask_headers {
                serde_json::to_string(&mask_result(result))
            } else {
                serde_json::to_string(result)
            }
            .map_err(|e| DumpError::Serialize(e.to_string()))?;
            writeln!(writer, "{line}")
                .map_err(|e| DumpError::Io(format!("write {}: {e}", filepath.display())))?;
        }

        writer
            .flush()
            .map_err(|e| DumpError::Io(format!("flush {}: {e}", filepath.display())))?;

        entries.push(DumpOperationEntry {
            operation: operation.to_string(),
            file: filename,
            count,
        });
    }

    let index = DumpIndex {
        total,
        operations: entries,
        dump_dir: dump_dir.to_path_buf(),
    };

    let index_path = dump_dir.join("index.json");
    let index_json =
        serde_json::to_string_pretty(&index).map_err(|e| DumpError::Serialize(e.to_string()))?;
    std::fs::write(&index_path, index_json)
        .map_err(|e| DumpError::Io(format!("write {}: {e}", index_path.display())))?;

    Ok(index)
}

/// Maximum characters kept from the operation label in the filename.
const MAX_FILENAME_LEN: usize = 200;

/// Convert an operation label to a safe filename.
///
/// "DELETE /pets/{id}" → "DELETE__pets__id_.jsonl"
fn sanitize_filename(operation: &str) -> String {
    let sanitized: String = operation
        .chars()
        .take(MAX_FILENAME_LEN)
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' => c,
            _ => '_',
        })
        .collect();
    format!("{sanitized}.jsonl")
}

/// Returns true if the header name matches a known sensitive header (case-insensitive).
fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_HEADERS
        .iter()
        .any(|&h| name.eq_ignore_ascii_case(h))
}

fn mask_result(result: &CaseResult) -> CaseResult {
    let mut masked = result.clone();
    if let Some(headers) = masked.request.headers.as_mut() {
        for (key, value) in headers.iter_mut() {
            if is_sensitive_header(key) {
                *value = Value::String(MASK.to_string());
            }
        }
    }
    masked
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RequestDescriptor;
    use crate::validate::ValidationReport;
    use serde_json::json;

    fn result(operation: &str) -> CaseResult {
        CaseResult::validated(
            operation.into(),
            "case".into(),
            RequestDescriptor {
                method: "post".into(),
                uri: "http://localhost/test".into(),
                path: Some(serde_json::Map::new()),
                query: None,
                body: Some(json!({"key": "value"})),
                headers: json!({
                    "Authorization": "Bearer secret-token",
                    "content-type": "application/json"
                })
                .as_object()
                .cloned(),
            },
            ValidationReport::default(),
        )
    }

    #[test]
    fn sanitize_complex_path() {
        assert_eq!(
            sanitize_filename("DELETE /pets/{id}"),
            "DELETE__pets__id_.jsonl"
        );
    }

    #[test]
    fn mask_authorization_header() {
        let masked = mask_result(&result("POST /test"));
        let headers = masked.request.headers.unwrap();
        assert_eq!(headers["Authorization"], "***");
        assert_eq!(headers["content-type"], "application/json");
    }

    #[test]
    fn write_dump_groups_by_operation() {
        let dir = tempfile::tempdir().unwrap();
        let results = vec![
            result("POST /pets"),
            result("POST /pets"),
            result("GET /health"),
        ];

        let index = write_dump(&results, dir.path(), true).unwrap();

        assert_eq!(index.total, 3);
        assert_eq!(index.operations.len(), 2);
        assert_eq!(index.operations[0].operation, "GET /health");
        assert_eq!(index.operations[0].count, 1);
        assert_eq!(index.operations[1].operation, "POST /pets");
        assert_eq!(index.operations[1].count, 2);

        for entry in &index.operations {
            let content = std::fs::read_to_string(dir.path().join(&entry.file)).unwrap();
            let lines: Vec<_> = content.lines().collect();
            assert_eq!(lines.len() as u64, entry.count);
            for line in lines {
                let parsed: CaseResult = serde_json::from_str(line).unwrap();
                assert_eq!(parsed.request.headers.unwrap()["Authorization"], "***");
            }
        }

        let index_content = std::fs::read_to_string(dir.path().join("index.json")).unwrap();
        let parsed: DumpIndex = serde_json::from_str(&index_content).unwrap();
        assert_eq!(parsed.total, 3);
    }

    #[test]
    fn no_mask_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let index = write_dump(&[result("POST /test")], dir.path(), false).unwrap();
        let content = std::fs::read_to_string(dir.path().join(&index.operations[0].file)).unwrap();
        let parsed: CaseResult = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(
            parsed.request.headers.unwrap()["Authorization"],
            "Bearer secret-token"
        );
    }

    #[test]
    fn write_dump_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let index = write_dump(&[], dir.path(), true).unwrap();
        assert_eq!(index.total, 0);
        assert!(dir.path().join("index.json").exists());
    }
}
