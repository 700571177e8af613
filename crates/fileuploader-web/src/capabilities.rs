//! Feature detection for strategy selection.

use fileuploader_core::{Capabilities, DropPolicy};
use wasm_bindgen::JsValue;

fn has_property(target: &JsValue, name: &str) -> bool {
    js_sys::Reflect::has(target, &JsValue::from_str(name)).unwrap_or(false)
}

/// Probe the running browser.
///
/// Outside a window context every capability reads `false`, which makes
/// the widget fall back to the legacy strategy (or stay inert).
#[must_use]
pub fn detect() -> Capabilities {
    let Some(window) = web_sys::window() else {
        return Capabilities::default();
    };

    let multiple_file_input = window
        .document()
        .and_then(|d| d.create_element("input").ok())
        .is_some_and(|input| {
            let _ = input.set_attribute("type", "file");
            has_property(&input, "multiple")
        });
    let file_api = has_property(&window, "File");
    let upload_progress = web_sys::XmlHttpRequest::new()
        .ok()
        .is_some_and(|xhr| has_property(&xhr, "upload"));

    Capabilities {
        multiple_file_input,
        file_api,
        upload_progress,
    }
}

/// Resolve how this browser announces file drags.
#[must_use]
pub fn drop_policy() -> DropPolicy {
    web_sys::window()
        .and_then(|w| w.navigator().user_agent().ok())
        .map_or(DropPolicy::TypeList, |ua| DropPolicy::detect(&ua))
}
