//! Lifecycle callbacks raised by upload handlers.
//!
//! Every hook is optional. A missing hook is a no-op; missing predicate
//! hooks (`on_before_submit`, `on_drop`) let the upload continue.

use crate::types::{CompletedRequest, ErrorRecord, FileInfo, Progress, RequestId, UploadResponse};

type InitHook = Box<dyn FnMut()>;
type BeforeSubmitHook = Box<dyn FnMut(RequestId, &str) -> bool>;
type ProgressHook = Box<dyn FnMut(RequestId, &str, Option<Progress>)>;
type SuccessHook = Box<dyn FnMut(RequestId, &str, &UploadResponse)>;
type CompleteHook = Box<dyn FnMut(&[CompletedRequest])>;
type ErrorHook = Box<dyn FnMut(&[ErrorRecord])>;
type DropHook = Box<dyn FnMut(&[FileInfo]) -> bool>;
type CancelHook = Box<dyn FnMut(RequestId, &str)>;

/// The callback set a handler raises.
#[derive(Default)]
pub struct HandlerHooks {
    on_init: Option<InitHook>,
    on_before_submit: Option<BeforeSubmitHook>,
    on_progress: Option<ProgressHook>,
    on_success: Option<SuccessHook>,
    on_complete: Option<CompleteHook>,
    on_error: Option<ErrorHook>,
    on_drop: Option<DropHook>,
    on_cancel: Option<CancelHook>,
}

impl HandlerHooks {
    /// No hooks installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once when the handler initializes.
    #[must_use]
    pub fn on_init(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_init = Some(Box::new(f));
        self
    }

    /// Called before a file is sent. Returning `false` cancels it.
    #[must_use]
    pub fn on_before_submit(mut self, f: impl FnMut(RequestId, &str) -> bool + 'static) -> Self {
        self.on_before_submit = Some(Box::new(f));
        self
    }

    /// Called when a file starts sending and on every progress report.
    ///
    /// Form posts report `None`: they cannot measure bytes sent.
    #[must_use]
    pub fn on_progress(
        mut self,
        f: impl FnMut(RequestId, &str, Option<Progress>) + 'static,
    ) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Called when a response carries the success marker.
    #[must_use]
    pub fn on_success(mut self, f: impl FnMut(RequestId, &str, &UploadResponse) + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Called once per batch, after every request in it resolved.
    #[must_use]
    pub fn on_complete(mut self, f: impl FnMut(&[CompletedRequest]) + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called with the errors accumulated during a batch.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&[ErrorRecord]) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Called with the files of a drop or picker selection. Returning
    /// `false` discards the whole selection.
    #[must_use]
    pub fn on_drop(mut self, f: impl FnMut(&[FileInfo]) -> bool + 'static) -> Self {
        self.on_drop = Some(Box::new(f));
        self
    }

    /// Called when a request is completed early because a before-submit
    /// check rejected it.
    #[must_use]
    pub fn on_cancel(mut self, f: impl FnMut(RequestId, &str) + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }

    pub(crate) fn init(&mut self) {
        if let Some(f) = self.on_init.as_mut() {
            f();
        }
    }

    pub(crate) fn before_submit(&mut self, id: RequestId, file_name: &str) -> bool {
        self.on_before_submit
            .as_mut()
            .is_none_or(|f| f(id, file_name))
    }

    pub(crate) fn progress(&mut self, id: RequestId, file_name: &str, progress: Option<Progress>) {
        if let Some(f) = self.on_progress.as_mut() {
            f(id, file_name, progress);
        }
    }

    pub(crate) fn success(&mut self, id: RequestId, file_name: &str, result: &UploadResponse) {
        if let Some(f) = self.on_success.as_mut() {
            f(id, file_name, result);
        }
    }

    pub(crate) fn complete(&mut self, batch: &[CompletedRequest]) {
        if let Some(f) = self.on_complete.as_mut() {
            f(batch);
        }
    }

    pub(crate) fn error(&mut self, errors: &[ErrorRecord]) {
        if let Some(f) = self.on_error.as_mut() {
            f(errors);
        }
    }

    pub(crate) fn dropped(&mut self, files: &[FileInfo]) -> bool {
        self.on_drop.as_mut().is_none_or(|f| f(files))
    }

    pub(crate) fn cancel(&mut self, id: RequestId, file_name: &str) {
        if let Some(f) = self.on_cancel.as_mut() {
            f(id, file_name);
        }
    }
}
