use fileuploader_core::ConfigError;
use wasm_bindgen::JsValue;

/// Errors that can occur while attaching the widget to the page.
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),

    /// Markup the selected strategy depends on is missing.
    #[error("element not found: {0}")]
    MissingElement(&'static str),

    /// The options were rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<JsValue> for WebError {
    fn from(value: JsValue) -> Self {
        Self::JsError(format!("{value:?}"))
    }
}

pub(crate) fn window() -> Result<web_sys::Window, WebError> {
    web_sys::window().ok_or_else(|| WebError::JsError("no global window".into()))
}

pub(crate) fn document() -> Result<web_sys::Document, WebError> {
    window()?
        .document()
        .ok_or_else(|| WebError::JsError("no document".into()))
}
