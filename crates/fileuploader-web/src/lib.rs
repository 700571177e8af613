//! Browser bindings for `fileuploader-core`.
//!
//! [`attach`] turns a container element holding the widget markup into a
//! live uploader: it detects what the browser supports, picks a strategy,
//! and binds the DOM events that drive the core handlers. Everything the
//! widget needs from the page is looked up by class name:
//!
//! - `.ui-fileUpload-button`: the modern "choose files" button. A hidden
//!   multi-select file input is laid over it.
//! - `.ui-fileUpload-dropArea`: the drag-and-drop target.
//! - `form.ui-fileUpload-form`: the legacy single-file form.
//! - `.ui-fileUpload-legacy` / `.ui-fileUpload-new`: the legacy and modern
//!   sections; the one not in use is hidden.
//! - the `listElement` selector from the options (`.ui-fileUpload-list` by
//!   default): where file entries are rendered.
//!
//! All functions in this crate require a browser environment
//! (`wasm32-unknown-unknown` target).

pub mod capabilities;
mod console;
pub mod drop_zone;
mod error;
pub mod file_list;
pub mod leave_guard;
pub mod legacy;
mod listener;
pub mod uploader;
pub mod xhr;

pub use error::WebError;
pub use uploader::{UploaderHandle, attach, attach_json};
