//! The outer coordinator integrators talk to.
//!
//! [`UploadWidget`] chooses a strategy from the browser's
//! [`Capabilities`], then hands out the [`HandlerHooks`] the chosen
//! handler must raise. Those hooks keep the widget's file list and
//! in-flight count current, render error messages, and forward
//! simplified callbacks to the integrator's [`WidgetHooks`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::config::{ConfigError, HandlerConfig, WidgetOptions};
use crate::format::format_file_name;
use crate::hooks::HandlerHooks;
use crate::messages::MessageContext;
use crate::types::{
    CompletedRequest, ErrorRecord, FileInfo, Progress, RequestId, UploadResponse, UploadStatus,
};

/// Message shown before leaving the page when no `on_leave` hook is set.
pub const DEFAULT_LEAVE_MESSAGE: &str = "Files are still uploading. Leaving now will cancel them.";

/// Browser features that decide which strategy can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// File inputs accept the `multiple` attribute.
    pub multiple_file_input: bool,
    /// The `File` type exists.
    pub file_api: bool,
    /// `XMLHttpRequest` exposes `upload` progress events.
    pub upload_progress: bool,
}

impl Capabilities {
    /// Everything a modern browser offers.
    #[must_use]
    pub const fn modern() -> Self {
        Self {
            multiple_file_input: true,
            file_api: true,
            upload_progress: true,
        }
    }

    /// Whether per-file XHR uploads are possible.
    #[must_use]
    pub const fn supports_xhr(self) -> bool {
        self.multiple_file_input && self.file_api && self.upload_progress
    }
}

/// The upload strategy a widget runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// [`XhrUploadHandler`](crate::XhrUploadHandler).
    Xhr,
    /// [`LegacyUploadHandler`](crate::LegacyUploadHandler).
    Legacy,
}

impl Strategy {
    /// Pick a strategy, or `None` if nothing can run.
    #[must_use]
    pub const fn select(caps: Capabilities, options: &WidgetOptions) -> Option<Self> {
        if caps.supports_xhr() && !options.use_only_legacy {
            Some(Self::Xhr)
        } else if options.legacy_enabled {
            Some(Self::Legacy)
        } else {
            None
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Xhr => "xhr",
            Self::Legacy => "legacy",
        })
    }
}

/// Renders the visible file list.
pub trait FileListView {
    /// Add an entry for a new upload, in the `loading` state.
    fn append(&mut self, id: RequestId, display_name: &str);

    /// Reflect a status change.
    fn set_status(&mut self, id: RequestId, status: UploadStatus);

    /// Remove every entry.
    fn clear(&mut self) {}
}

/// One tracked upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListEntry {
    /// File name as submitted.
    pub name: String,
    /// Current status.
    pub status: UploadStatus,
}

/// Every upload the widget has seen, keyed by request id.
#[derive(Default)]
pub struct FileList {
    entries: BTreeMap<RequestId, FileListEntry>,
    view: Option<Box<dyn FileListView>>,
}

impl FileList {
    /// Track a new upload.
    pub fn add(&mut self, id: RequestId, name: &str) {
        self.entries.insert(
            id,
            FileListEntry {
                name: name.to_owned(),
                status: UploadStatus::Loading,
            },
        );
        if let Some(view) = self.view.as_mut() {
            view.append(id, &format_file_name(name));
        }
    }

    /// The entry for `id`.
    #[must_use]
    pub fn get(&self, id: RequestId) -> Option<&FileListEntry> {
        self.entries.get(&id)
    }

    /// Move a loading entry to `status`.
    ///
    /// Returns `true` only when the entry was still loading, so each
    /// entry resolves once.
    pub fn resolve(&mut self, id: RequestId, status: UploadStatus) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        if entry.status != UploadStatus::Loading {
            return false;
        }
        entry.status = status;
        if let Some(view) = self.view.as_mut() {
            view.set_status(id, status);
        }
        true
    }

    /// Number of tracked uploads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no upload was tracked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        if let Some(view) = self.view.as_mut() {
            view.clear();
        }
    }
}

/// An error as reported to the integrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetError {
    #[serde(flatten)]
    pub record: ErrorRecord,
    /// Rendered message for display.
    pub message: String,
}

type LeaveHook = Box<dyn Fn() -> String>;

/// Callbacks the integrator receives.
#[derive(Default)]
pub struct WidgetHooks {
    on_before_submit: Option<Box<dyn FnMut(&str) -> bool>>,
    on_progress: Option<Box<dyn FnMut(&str, Option<Progress>)>>,
    on_drop: Option<Box<dyn FnMut(&[FileInfo]) -> bool>>,
    on_success: Option<Box<dyn FnMut(&str, &UploadResponse)>>,
    on_complete: Option<Box<dyn FnMut(&[CompletedRequest])>>,
    on_error: Option<Box<dyn FnMut(&[WidgetError])>>,
    on_cancel: Option<Box<dyn FnMut(&str)>>,
    on_leave: Option<LeaveHook>,
}

impl WidgetHooks {
    /// No hooks installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called before a file is sent. Returning `false` cancels it.
    #[must_use]
    pub fn on_before_submit(mut self, f: impl FnMut(&str) -> bool + 'static) -> Self {
        self.on_before_submit = Some(Box::new(f));
        self
    }

    /// Called when a file starts sending and on every progress report.
    #[must_use]
    pub fn on_progress(mut self, f: impl FnMut(&str, Option<Progress>) + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Called with a picked or dropped selection. Returning `false`
    /// discards the whole selection.
    #[must_use]
    pub fn on_drop(mut self, f: impl FnMut(&[FileInfo]) -> bool + 'static) -> Self {
        self.on_drop = Some(Box::new(f));
        self
    }

    /// Called when the server reports success for a file.
    #[must_use]
    pub fn on_success(mut self, f: impl FnMut(&str, &UploadResponse) + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Called once per batch, after its last request resolves.
    #[must_use]
    pub fn on_complete(mut self, f: impl FnMut(&[CompletedRequest]) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called with the batch's errors and their rendered messages.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&[WidgetError]) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Called when a file was turned away before sending.
    #[must_use]
    pub fn on_cancel(mut self, f: impl FnMut(&str) + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }

    /// Produces the warning shown when leaving the page mid-upload.
    #[must_use]
    pub fn on_leave(mut self, f: impl Fn() -> String + 'static) -> Self {
        self.on_leave = Some(Box::new(f));
        self
    }
}

struct WidgetState {
    in_flight: usize,
    files: FileList,
}

impl WidgetState {
    /// Resolve an entry, decrementing the in-flight count on the
    /// transition out of `loading`.
    fn resolve(&mut self, id: RequestId, status: UploadStatus) {
        if self.files.resolve(id, status) {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
    }
}

/// Coordinates one upload handler and the integrator's callbacks.
pub struct UploadWidget {
    options: Rc<WidgetOptions>,
    strategy: Option<Strategy>,
    state: Rc<RefCell<WidgetState>>,
    hooks: Rc<RefCell<WidgetHooks>>,
    // Kept out of `hooks` so other integrator hooks may ask for it.
    on_leave: Option<LeaveHook>,
}

impl UploadWidget {
    /// Create a widget and pick its strategy.
    ///
    /// A widget without a usable strategy is still returned; it stays
    /// inert and [`strategy`](Self::strategy) is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAction`] when the XHR strategy is
    /// selected but no `action` URL is configured.
    pub fn new(
        options: WidgetOptions,
        caps: Capabilities,
        mut hooks: WidgetHooks,
    ) -> Result<Self, ConfigError> {
        tracing::debug!("starting upload widget");
        let strategy = Strategy::select(caps, &options);
        match strategy {
            Some(Strategy::Xhr) if options.action.is_none() => {
                return Err(ConfigError::MissingAction);
            }
            Some(s) => tracing::debug!(strategy = %s, "upload strategy selected"),
            None => tracing::warn!(?caps, "no upload strategy available, widget inactive"),
        }
        Ok(Self {
            options: Rc::new(options),
            strategy,
            state: Rc::new(RefCell::new(WidgetState {
                in_flight: 0,
                files: FileList::default(),
            })),
            on_leave: hooks.on_leave.take(),
            hooks: Rc::new(RefCell::new(hooks)),
        })
    }

    /// Render the file list through `view`.
    #[must_use]
    pub fn with_file_list(self, view: impl FileListView + 'static) -> Self {
        self.state.borrow_mut().files.view = Some(Box::new(view));
        self
    }

    /// The selected strategy, or `None` if the widget is inert.
    #[must_use]
    pub const fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    /// The widget's options.
    #[must_use]
    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    /// Configuration for the handler this widget drives.
    #[must_use]
    pub fn handler_config(&self) -> HandlerConfig {
        self.options.handler_config()
    }

    /// Files accepted and not yet resolved.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.borrow().in_flight
    }

    /// Status of a tracked upload.
    #[must_use]
    pub fn file_status(&self, id: RequestId) -> Option<UploadStatus> {
        self.state.borrow().files.get(id).map(|e| e.status)
    }

    /// Number of uploads in the file list.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.state.borrow().files.len()
    }

    /// Forget every file list entry.
    pub fn clear_file_list(&self) {
        self.state.borrow_mut().files.clear();
    }

    /// The warning to show when the page is about to unload, if any
    /// upload is still in flight.
    #[must_use]
    pub fn leave_warning(&self) -> Option<String> {
        if self.in_flight() == 0 {
            return None;
        }
        Some(
            self.on_leave
                .as_ref()
                .map_or_else(|| DEFAULT_LEAVE_MESSAGE.to_owned(), |f| f()),
        )
    }

    /// Attach a rendered message to each error record.
    #[must_use]
    pub fn describe_errors(&self, errors: &[ErrorRecord]) -> Vec<WidgetError> {
        describe(&self.options, errors)
    }

    /// The callbacks the handler must raise.
    ///
    /// Each relay updates the widget's bookkeeping before calling the
    /// integrator, and never holds the bookkeeping borrowed while an
    /// integrator hook runs.
    #[must_use]
    pub fn handler_hooks(&self) -> HandlerHooks {
        let before_submit = {
            let (state, hooks) = (Rc::clone(&self.state), Rc::clone(&self.hooks));
            move |id: RequestId, file_name: &str| {
                {
                    let mut state = state.borrow_mut();
                    state.in_flight += 1;
                    state.files.add(id, file_name);
                }
                hooks
                    .borrow_mut()
                    .on_before_submit
                    .as_mut()
                    .is_none_or(|f| f(file_name))
            }
        };

        let progress = {
            let hooks = Rc::clone(&self.hooks);
            move |_: RequestId, file_name: &str, progress: Option<Progress>| {
                if let Some(f) = hooks.borrow_mut().on_progress.as_mut() {
                    f(file_name, progress);
                }
            }
        };

        let dropped = {
            let hooks = Rc::clone(&self.hooks);
            move |files: &[FileInfo]| hooks.borrow_mut().on_drop.as_mut().is_none_or(|f| f(files))
        };

        let success = {
            let (state, hooks) = (Rc::clone(&self.state), Rc::clone(&self.hooks));
            move |id: RequestId, file_name: &str, result: &UploadResponse| {
                state.borrow_mut().resolve(id, UploadStatus::Success);
                if let Some(f) = hooks.borrow_mut().on_success.as_mut() {
                    f(file_name, result);
                }
            }
        };

        let complete = {
            let hooks = Rc::clone(&self.hooks);
            move |batch: &[CompletedRequest]| {
                if let Some(f) = hooks.borrow_mut().on_complete.as_mut() {
                    f(batch);
                }
            }
        };

        let error = {
            let (state, hooks) = (Rc::clone(&self.state), Rc::clone(&self.hooks));
            let options = Rc::clone(&self.options);
            move |errors: &[ErrorRecord]| {
                {
                    let mut state = state.borrow_mut();
                    for id in errors.iter().filter_map(|e| e.id) {
                        state.resolve(id, UploadStatus::Error);
                    }
                }
                let described = describe(&options, errors);
                if let Some(f) = hooks.borrow_mut().on_error.as_mut() {
                    f(&described);
                }
            }
        };

        let cancel = {
            let (state, hooks) = (Rc::clone(&self.state), Rc::clone(&self.hooks));
            move |id: RequestId, file_name: &str| {
                state.borrow_mut().resolve(id, UploadStatus::Error);
                if let Some(f) = hooks.borrow_mut().on_cancel.as_mut() {
                    f(file_name);
                }
            }
        };

        HandlerHooks::new()
            .on_before_submit(before_submit)
            .on_progress(progress)
            .on_drop(dropped)
            .on_success(success)
            .on_complete(complete)
            .on_error(error)
            .on_cancel(cancel)
    }
}

fn describe(options: &WidgetOptions, errors: &[ErrorRecord]) -> Vec<WidgetError> {
    let ctx = MessageContext {
        allowed_extensions: &options.allowed_extensions,
        size_limit: options.size_limit,
        min_size_limit: options.min_size_limit,
        max_files_dropped: options.max_files_dropped,
    };
    errors
        .iter()
        .map(|record| WidgetError {
            message: options
                .messages
                .render(record.kind, record.file_name.as_deref(), &ctx),
            record: record.clone(),
        })
        .collect()
}
