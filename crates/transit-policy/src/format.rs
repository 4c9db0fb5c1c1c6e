//! Document loading by file extension.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{RoutingError, RoutingResult};

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Picks the format from the file extension (`.yaml`, `.yml` or `.json`).
    pub fn from_path(path: &Path) -> RoutingResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            Some("json") => Ok(DocumentFormat::Json),
            other => Err(RoutingError::config(
                path,
                format!("unsupported document extension {:?}", other.unwrap_or("")),
            )),
        }
    }

    pub fn parse<T: DeserializeOwned>(self, path: &Path, content: &str) -> RoutingResult<T> {
        match self {
            DocumentFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| RoutingError::config(path, e.to_string()))
            }
            DocumentFormat::Json => {
                serde_json::from_str(content).map_err(|e| RoutingError::config(path, e.to_string()))
            }
        }
    }

    pub fn render<T: Serialize>(self, path: &Path, value: &T) -> RoutingResult<String> {
        match self {
            DocumentFormat::Yaml => {
                serde_yaml::to_string(value).map_err(|e| RoutingError::config(path, e.to_string()))
            }
            DocumentFormat::Json => serde_json::to_string_pretty(value)
                .map_err(|e| RoutingError::config(path, e.to_string())),
        }
    }
}

/// Reads and parses a document, picking the format from its extension.
pub fn load_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> RoutingResult<T> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|e| RoutingError::io(path, &e))?;
    debug!("Loading {:?} document {}", format, path.display());
    format.parse(path, &content)
}

/// Serializes a document and writes it, picking the format from the extension.
pub fn save_document<T: Serialize>(path: impl AsRef<Path>, value: &T) -> RoutingResult<()> {
    let path = path.as_ref();
    let content = DocumentFormat::from_path(path)?.render(path, value)?;
    fs::write(path, content).map_err(|e| RoutingError::io(path, &e))
}
