//! Shared types for upload bookkeeping.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier for one file in the upload pipeline.
///
/// Issued by a per-handler counter starting at 1. An id is never
/// reused within a handler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a single upload.
///
/// Transitions are strictly `Loading -> Success` or `Loading -> Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// Accepted and not yet resolved.
    Loading,
    /// The server answered with the configured success marker.
    Success,
    /// Validation, transport, or server-side failure.
    Error,
}

impl UploadStatus {
    /// Lowercase name, also used as the list entry's CSS class.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a file (or a whole batch) was not uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// The file's extension is not in the allow-list.
    ExtensionError,
    /// No file was selected.
    NoFile,
    /// The response status did not match the success marker.
    Failure,
    /// Transport-level failure.
    Exception,
    /// Too many files were offered in one batch.
    MaxFilesDropped,
}

impl ErrorKind {
    /// The camelCase key used by the message table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtensionError => "extensionError",
            Self::NoFile => "noFile",
            Self::Failure => "failure",
            Self::Exception => "exception",
            Self::MaxFilesDropped => "maxFilesDropped",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed response body of an upload.
///
/// Servers are expected to answer with a JSON object carrying a
/// `status` field. Anything unparsable is tolerated as an empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadResponse(Value);

impl UploadResponse {
    /// An empty JSON object, used when no body is available.
    #[must_use]
    pub fn empty() -> Self {
        Self(Value::Object(serde_json::Map::new()))
    }

    /// Wrap an already-parsed JSON value.
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Parse a response body, falling back to [`empty`](Self::empty).
    #[must_use]
    pub fn parse_lenient(body: &str) -> Self {
        Self::parse_strict(body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "unparsable response body, using empty result");
            Self::empty()
        })
    }

    /// Parse a response body.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when `body` is not valid JSON.
    pub fn parse_strict(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body).map(Self)
    }

    /// The `status` field rendered as text.
    ///
    /// Strings are returned verbatim; numbers and booleans are rendered.
    /// Returns `None` when the field is absent or `null`, or when the
    /// body is not an object.
    #[must_use]
    pub fn status(&self) -> Option<String> {
        match self.0.get("status")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Whether the body is an empty JSON object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.as_object().is_some_and(serde_json::Map::is_empty)
    }

    /// The underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }
}

impl Default for UploadResponse {
    fn default() -> Self {
        Self::empty()
    }
}

/// Byte-level progress of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Bytes sent so far.
    pub loaded: u64,
    /// Total bytes to send.
    pub total: u64,
}

/// Anything that can be handed to an upload transport.
pub trait UploadFile {
    /// The file's name, if the browser reports one.
    fn name(&self) -> Option<String>;

    /// Size in bytes.
    fn size(&self) -> u64;
}

/// A plain description of a candidate file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// File name without directories.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
}

impl FileInfo {
    /// Create a new file description.
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Snapshot any [`UploadFile`].
    #[must_use]
    pub fn of(file: &impl UploadFile) -> Self {
        Self {
            name: file.name().unwrap_or_default(),
            size: file.size(),
        }
    }
}

impl UploadFile for FileInfo {
    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// A request tracked while in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Unique id within the owning handler.
    pub id: RequestId,
    /// File name without directories.
    pub file_name: String,
    /// Current lifecycle status.
    pub status: UploadStatus,
}

/// An error accumulated during a batch.
///
/// Batch-level errors (`MaxFilesDropped`) carry no id or file name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// The failing request, if the error concerns a single file.
    pub id: Option<RequestId>,
    /// The failing file's name, if any.
    pub file_name: Option<String>,
    /// Raw response payload, if one was received.
    pub result: Option<UploadResponse>,
    /// What went wrong.
    #[serde(rename = "errorType")]
    pub kind: ErrorKind,
}

/// A request whose transport (or early rejection) has resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedRequest {
    /// The request's id.
    pub id: RequestId,
    /// File name without directories.
    pub file_name: String,
    /// Parsed response, or an empty object if the request never left.
    pub result: UploadResponse,
}

/// Strip directories from a path reported by a file input.
///
/// Legacy inputs report values such as `C:\fakepath\photo.png`.
#[must_use]
pub fn base_name(path: &str) -> &str {
    path.rfind(['/', '\\']).map_or(path, |i| &path[i + 1..])
}
