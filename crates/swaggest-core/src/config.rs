//! Project configuration for running x-test suites

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::variables::Variables;

/// Project configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Swagger document path (local file)
    #[serde(default = "default_spec")]
    pub spec: PathBuf,

    /// Host (and port) to test, replacing the document's `host`
    #[serde(default)]
    pub host: Option<String>,

    /// URL scheme, replacing the document's first `schemes` entry
    #[serde(default)]
    pub scheme: Option<String>,

    /// Values for `$name` fixture literals
    #[serde(default)]
    pub variables: HashMap<String, String>,

    /// Also resolve `$name` from the process environment.
    /// Explicit `variables` win over the environment.
    #[serde(default = "default_true")]
    pub env: bool,

    /// Headers sent with every request (auth, api keys); fixture headers win
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Dump every case result to JSONL files
    #[serde(default)]
    pub dump: bool,

    /// Directory for dump files (default: ".swaggest/dumps")
    #[serde(default)]
    pub dump_dir: Option<PathBuf>,
}

fn default_spec() -> PathBuf {
    PathBuf::from("swagger.json")
}

const fn default_true() -> bool {
    true
}

const fn default_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spec: default_spec(),
            host: None,
            scheme: None,
            variables: HashMap::new(),
            env: true,
            headers: HashMap::new(),
            timeout_secs: default_timeout(),
            dump: false,
            dump_dir: None,
        }
    }
}

impl Config {
    /// Load config from file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
        }
    }

    /// Load from default location (.swaggest.toml)
    ///
    /// # Errors
    ///
    /// Returns error if a candidate file exists but cannot be read or parsed
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load_from_dir(Path::new("."))
    }

    /// Load the first candidate config found in `dir`, or defaults.
    ///
    /// # Errors
    ///
    /// Returns error if a candidate file exists but cannot be read or parsed
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let candidates = [".swaggest.toml", ".swaggest.json", "swaggest.toml"];

        for name in candidates {
            let path = dir.join(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // No config file, return default
        Ok(Self::default())
    }

    /// The substitution mapping: environment (when enabled) overlaid with
    /// the configured variables.
    #[must_use]
    pub fn variables(&self) -> Variables {
        let explicit = Variables::from(self.variables.clone());
        if self.env {
            Variables::from_env().merged(explicit)
        } else {
            explicit
        }
    }

    /// Configured headers as a JSON map.
    #[must_use]
    pub fn default_headers(&self) -> Map<String, Value> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }

    /// Create example config file
    #[must_use]
    pub fn example() -> &'static str {
        r#"# swaggest configuration

# Swagger document with x-test fixtures (JSON or YAML)
spec = "swagger.json"

# Server to test (replaces the document's host)
# host = "localhost:8080"
# scheme = "http"

# Resolve "$name" fixture values from the environment (default: true)
env = true

# Values for "$name" fixture values (win over the environment)
[variables]
# token = "your-token-here"

# Headers sent with every request
[headers]
# Authorization = "Bearer your-token-here"

# Per-request timeout in seconds
# timeout_secs = 10

# Dump every case result to JSONL files (default: false)
# dump = true
# dump_dir = ".swaggest/dumps"
"#
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Parse error: {0}")]
    Parse(String),
}
