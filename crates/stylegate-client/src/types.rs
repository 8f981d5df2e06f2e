//! Request and response types for the remote inference protocol

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker the remote side uses to recognise file arguments
pub const FILE_DATA_TYPE: &str = "gradio.FileData";

// =============================================================================
// App Config
// =============================================================================

/// App config document served at `<base>/config`.
///
/// Only the fields the client needs are modelled; the rest is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    /// Path prefix for API routes (e.g., "/gradio_api"), empty when absent
    #[serde(default)]
    pub api_prefix: String,
}

// =============================================================================
// Predict
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub data: Vec<Value>,
    #[serde(default)]
    pub duration: Option<f64>,
}

// =============================================================================
// Files
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(rename = "_type")]
    pub file_type: String,
}

impl Default for FileMeta {
    fn default() -> Self {
        Self {
            file_type: FILE_DATA_TYPE.to_string(),
        }
    }
}

/// File reference as passed to and returned from predict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    /// Path on the remote server
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_name: Option<String>,
    #[serde(default)]
    pub meta: FileMeta,
}

impl FileData {
    /// Reference to a file already uploaded to the remote server
    pub fn remote(path: impl Into<String>, orig_name: Option<String>) -> Self {
        Self {
            path: path.into(),
            url: None,
            orig_name,
            meta: FileMeta::default(),
        }
    }

    /// Interpret a predict output as a file reference.
    ///
    /// Older services return a bare path string instead of an object.
    pub fn from_output(value: &Value) -> Option<Self> {
        match value {
            Value::String(path) => Some(Self::remote(path.clone(), None)),
            Value::Object(_) => serde_json::from_value(value.clone()).ok(),
            _ => None,
        }
    }

    /// Name to save the downloaded file under.
    ///
    /// Only the last path component is kept, so a remote-supplied name can
    /// never point outside the download directory.
    pub fn file_name(&self) -> String {
        let last_component = |name: &str| {
            name.rsplit(|c: char| c == '/' || c == '\\')
                .next()
                .filter(|n| !n.is_empty() && *n != "." && *n != "..")
                .map(str::to_string)
        };

        self.orig_name
            .as_deref()
            .and_then(last_component)
            .or_else(|| last_component(&self.path))
            .unwrap_or_else(|| "output".to_string())
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error body returned by the remote service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn message(self) -> Option<String> {
        self.error.or(self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_data_serializes_meta_type() {
        let data = FileData::remote("/tmp/gradio/abc/upload.png", None);
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(
            value,
            json!({"path": "/tmp/gradio/abc/upload.png", "meta": {"_type": "gradio.FileData"}})
        );
    }

    #[test]
    fn file_data_from_bare_path() {
        let data = FileData::from_output(&json!("/tmp/gradio/x/result.webp")).unwrap();
        assert_eq!(data.path, "/tmp/gradio/x/result.webp");
        assert_eq!(data.file_name(), "result.webp");
    }

    #[test]
    fn file_data_from_object_prefers_orig_name() {
        let data = FileData::from_output(&json!({
            "path": "/tmp/gradio/x/image.png",
            "url": "http://host/file=/tmp/gradio/x/image.png",
            "orig_name": "dress.png"
        }))
        .unwrap();
        assert_eq!(data.file_name(), "dress.png");
        assert!(data.url.is_some());
    }

    #[test]
    fn file_name_drops_directories() {
        let data = FileData::remote("/tmp/x/..", Some("../../etc/passwd".to_string()));
        assert_eq!(data.file_name(), "passwd");

        let data = FileData::remote("/tmp/x/..", None);
        assert_eq!(data.file_name(), "output");
    }

    #[test]
    fn file_data_rejects_numbers() {
        assert!(FileData::from_output(&json!(42)).is_none());
    }

    #[test]
    fn app_config_defaults() {
        let config: AppConfig = serde_json::from_value(json!({"version": "4.44.0"})).unwrap();
        assert_eq!(config.api_prefix, "");
        assert_eq!(config.version.as_deref(), Some("4.44.0"));
    }

    #[test]
    fn error_response_falls_back_to_detail() {
        let err: ErrorResponse = serde_json::from_value(json!({"detail": "Not Found"})).unwrap();
        assert_eq!(err.message().as_deref(), Some("Not Found"));
    }
}
