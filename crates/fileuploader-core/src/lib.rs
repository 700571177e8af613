//! fileuploader-core: Upload handler state machines (sans-IO).
//!
//! Tracks files from the moment they enter the upload pipeline (form
//! submit, file picker, or drag-and-drop) until their completion is
//! folded into a batch report:
//!
//! before-submit -> progress -> success | error -> complete
//!
//! Two strategies share one contract ([`UploadHandler`]):
//! [`LegacyUploadHandler`] posts a single file through a form, and
//! [`XhrUploadHandler`] sends each file as its own request with
//! byte-level progress. [`UploadWidget`] picks a strategy from the
//! browser's [`Capabilities`] and relays the handler's callbacks to the
//! integrator, keeping the file list and in-flight count.
//!
//! This crate has **no browser dependencies** -- forms, transports and
//! list views are traits. All DOM interaction lives in
//! `fileuploader-web`.

pub mod config;
pub mod drag;
pub mod format;
pub mod handler;
pub mod hooks;
pub mod legacy;
pub mod messages;
pub mod types;
pub mod widget;
pub mod xhr;

pub use config::{ConfigError, HandlerConfig, MaxFiles, WidgetOptions};
pub use drag::{DragDecision, DragEventKind, DragPayload, DropEffect, DropPolicy};
pub use format::{format_file_name, format_size};
pub use handler::{HandlerCore, HandlerKind, UploadHandler};
pub use hooks::HandlerHooks;
pub use legacy::{FormControls, LegacyState, LegacyUploadHandler, SubmitDecision};
pub use messages::Messages;
pub use types::{
    CompletedRequest, ErrorKind, ErrorRecord, FileInfo, Progress, RequestId, UploadFile,
    UploadRequest, UploadResponse, UploadStatus,
};
pub use widget::{
    Capabilities, FileList, FileListEntry, FileListView, Strategy, UploadWidget, WidgetError,
    WidgetHooks,
};
pub use xhr::{OutgoingRequest, Transport, TransportOutcome, XhrUploadHandler};
