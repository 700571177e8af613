//! Handler and widget configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::messages::Messages;

/// Errors raised while reading widget options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The options document is not valid JSON or has the wrong shape.
    #[error("invalid widget options: {0}")]
    Json(#[from] serde_json::Error),

    /// The XHR strategy needs somewhere to send files.
    #[error("no upload action configured")]
    MissingAction,
}

/// Upper bound on how many files one batch may contain.
#[derive(Clone)]
pub enum MaxFiles {
    /// A fixed limit.
    Fixed(usize),
    /// A limit computed from the number of candidate files.
    Computed(Rc<dyn Fn(usize) -> usize>),
}

impl MaxFiles {
    /// Build a computed limit.
    pub fn computed(f: impl Fn(usize) -> usize + 'static) -> Self {
        Self::Computed(Rc::new(f))
    }

    /// The limit that applies to a batch of `candidates` files.
    #[must_use]
    pub fn limit(&self, candidates: usize) -> usize {
        match self {
            Self::Fixed(n) => *n,
            Self::Computed(f) => f(candidates),
        }
    }
}

impl Default for MaxFiles {
    fn default() -> Self {
        Self::Fixed(3)
    }
}

impl fmt::Debug for MaxFiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => f.debug_tuple("Fixed").field(n).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Configuration shared by both upload strategies.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Field (and query parameter) name carrying the file name.
    pub input_name: String,
    /// Extra query parameters sent with every upload.
    pub params: BTreeMap<String, String>,
    /// Target URL.
    pub action: String,
    /// Value of the response's `status` field that marks success.
    ///
    /// `None` accepts responses whose `status` is absent or `null`.
    pub success_status: Option<String>,
    /// Allowed extensions, compared case-insensitively. Empty allows all.
    pub allowed_extensions: Vec<String>,
    /// Batch size limit.
    pub max_files: MaxFiles,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            input_name: String::from("file"),
            params: BTreeMap::new(),
            action: String::new(),
            success_status: None,
            allowed_extensions: Vec::new(),
            max_files: MaxFiles::default(),
        }
    }
}

/// Options recognized by [`UploadWidget`](crate::UploadWidget).
///
/// Deserializes from camelCase JSON; every field is optional.
///
/// ```
/// # use fileuploader_core::WidgetOptions;
/// let options = WidgetOptions::from_json(r#"{"action": "/upload", "maxFilesDropped": 5}"#)?;
/// assert_eq!(options.max_files_dropped, 5);
/// assert_eq!(options.success_status.as_deref(), Some("ok"));
/// # Ok::<(), fileuploader_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetOptions {
    /// Write lifecycle messages to the browser console.
    pub debug: bool,
    /// Target URL.
    pub action: Option<String>,
    /// Selector of the element that receives the file list.
    pub list_element: Option<String>,
    /// Extra query parameters.
    pub params: BTreeMap<String, String>,
    /// Fixed batch size limit.
    ///
    /// Replaced by [`with_max_files`](Self::with_max_files) when a
    /// computed limit is installed.
    pub max_files_dropped: usize,
    /// Success marker expected in the response's `status` field.
    pub success_status: Option<String>,
    /// Allowed extensions. Empty allows all.
    pub allowed_extensions: Vec<String>,
    /// Field name carrying the file name.
    pub input_name: String,
    /// Maximum file size in bytes (only used in messages).
    pub size_limit: u64,
    /// Minimum file size in bytes (only used in messages).
    pub min_size_limit: u64,
    /// Fall back to form posts when XHR uploads are unavailable.
    pub legacy_enabled: bool,
    /// Always use form posts.
    pub use_only_legacy: bool,
    /// Error message templates.
    pub messages: Messages,
    /// Computed batch size limit; overrides `max_files_dropped` when set.
    #[serde(skip)]
    pub max_files: Option<MaxFiles>,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            debug: true,
            action: None,
            list_element: Some(String::from(".ui-fileUpload-list")),
            params: BTreeMap::new(),
            max_files_dropped: 3,
            success_status: Some(String::from("ok")),
            allowed_extensions: Vec::new(),
            input_name: String::from("file"),
            size_limit: 0,
            min_size_limit: 0,
            legacy_enabled: true,
            use_only_legacy: false,
            messages: Messages::default(),
            max_files: None,
        }
    }
}

impl WidgetOptions {
    /// Parse options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] if `json` is malformed or a field
    /// has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Install a batch size limit, possibly computed.
    #[must_use]
    pub fn with_max_files(mut self, max_files: MaxFiles) -> Self {
        if let MaxFiles::Fixed(n) = max_files {
            self.max_files_dropped = n;
        }
        self.max_files = Some(max_files);
        self
    }

    /// The effective batch size limit.
    #[must_use]
    pub fn max_files(&self) -> MaxFiles {
        self.max_files
            .clone()
            .unwrap_or(MaxFiles::Fixed(self.max_files_dropped))
    }

    /// The handler-level subset of these options.
    #[must_use]
    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            input_name: self.input_name.clone(),
            params: self.params.clone(),
            action: self.action.clone().unwrap_or_default(),
            success_status: self.success_status.clone(),
            allowed_extensions: self.allowed_extensions.clone(),
            max_files: self.max_files(),
        }
    }
}
