//! `fileuploader: ` prefixed console output.

use wasm_bindgen::JsValue;

const PREFIX: &str = "fileuploader: ";

/// Log `message` when the widget runs with `debug` on.
pub(crate) fn log(enabled: bool, message: &str) {
    if enabled {
        web_sys::console::log_1(&JsValue::from_str(&format!("{PREFIX}{message}")));
    }
}

/// Warnings print regardless of `debug`.
pub(crate) fn warn(message: &str) {
    web_sys::console::warn_1(&JsValue::from_str(&format!("{PREFIX}{message}")));
}
