//! Bookkeeping shared by both upload strategies.
//!
//! [`HandlerCore`] owns the id counter, the table of in-flight
//! requests, and the error/completed lists of the current batch. A batch
//! is flushed to `on_complete` and `on_error` exactly when the last
//! in-flight request reports completion.
//!
//! # Strategy pattern
//!
//! The form-post and XHR strategies differ only in how they ingest and
//! transmit files. Each embeds a [`HandlerCore`] and implements
//! [`UploadHandler`], so the widget can drive either one through the
//! same contract.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::HandlerConfig;
use crate::hooks::HandlerHooks;
use crate::types::{
    CompletedRequest, ErrorKind, ErrorRecord, FileInfo, Progress, RequestId, UploadRequest, UploadResponse,
    UploadStatus,
};

/// Which transmission strategy a handler implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Single-file form post.
    Legacy,
    /// One asynchronous request per file.
    Xhr,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Legacy => "legacy",
            Self::Xhr => "xhr",
        })
    }
}

/// The contract both strategies implement.
pub trait UploadHandler {
    /// Which strategy this is.
    fn kind(&self) -> HandlerKind;

    /// Shared bookkeeping.
    fn core(&self) -> &HandlerCore;

    /// Shared bookkeeping, mutably.
    fn core_mut(&mut self) -> &mut HandlerCore;

    /// Bind the handler. Returns `false` if the handler cannot work in
    /// its container.
    ///
    /// Implementations must call [`HandlerCore::initialize`] first.
    fn initialize(&mut self) -> bool {
        self.core_mut().initialize();
        true
    }

    /// Number of requests currently in flight.
    fn in_flight(&self) -> usize {
        self.core().in_flight()
    }
}

/// Shared state and callback chain of an upload handler.
pub struct HandlerCore {
    config: HandlerConfig,
    hooks: HandlerHooks,
    last_id: u64,
    pending: BTreeMap<RequestId, UploadRequest>,
    errors: Vec<ErrorRecord>,
    completed: Vec<CompletedRequest>,
}

impl HandlerCore {
    /// Create the bookkeeping for a handler.
    #[must_use]
    pub fn new(config: HandlerConfig, hooks: HandlerHooks) -> Self {
        Self {
            config,
            hooks,
            last_id: 0,
            pending: BTreeMap::new(),
            errors: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// The handler's configuration.
    #[must_use]
    pub const fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Raise `on_init`.
    pub fn initialize(&mut self) {
        self.hooks.init();
    }

    /// Issue the next request id.
    pub fn next_id(&mut self) -> RequestId {
        self.last_id += 1;
        RequestId::new(self.last_id)
    }

    /// Whether `file_name` passes the extension allow-list.
    ///
    /// The extension is whatever follows the last `.` (empty if there is
    /// none) and is compared after Unicode lowercasing. An empty
    /// allow-list accepts every name.
    #[must_use]
    pub fn is_extension_allowed(&self, file_name: &str) -> bool {
        let allowed = &self.config.allowed_extensions;
        if allowed.is_empty() {
            return true;
        }
        let ext = file_name
            .rsplit_once('.')
            .map_or_else(String::new, |(_, ext)| ext.to_lowercase());
        allowed.iter().any(|a| a.to_lowercase() == ext)
    }

    /// Check a batch of `candidates` files against the configured limit.
    ///
    /// On rejection a `MaxFilesDropped` error is recorded and the error
    /// list is flushed immediately, since no request of the batch will
    /// ever complete.
    pub fn enforce_max_files(&mut self, candidates: usize) -> bool {
        let limit = self.config.max_files.limit(candidates);
        if candidates <= limit {
            return true;
        }
        tracing::debug!(candidates, limit, "batch rejected: too many files");
        self.record_error(None, None, None, ErrorKind::MaxFilesDropped);
        self.flush_errors();
        false
    }

    /// Start tracking a request as in flight.
    pub fn begin(&mut self, id: RequestId, file_name: &str) {
        self.pending.insert(
            id,
            UploadRequest {
                id,
                file_name: file_name.to_owned(),
                status: UploadStatus::Loading,
            },
        );
    }

    /// Stop tracking a request. Returns it if it was in flight.
    pub fn settle(&mut self, id: RequestId) -> Option<UploadRequest> {
        self.pending.remove(&id)
    }

    /// The in-flight request with `id`, if any.
    #[must_use]
    pub fn request(&self, id: RequestId) -> Option<&UploadRequest> {
        self.pending.get(&id)
    }

    /// Number of requests currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Validate a file about to be sent and ask `on_before_submit`.
    ///
    /// Validation errors are recorded even when the integrator's hook
    /// is still consulted; the result is the logical AND of every check.
    pub fn handle_before_submit(&mut self, id: RequestId, file_name: &str) -> bool {
        let mut ok = true;

        if file_name.is_empty() {
            self.record_error(Some(id), Some(file_name), None, ErrorKind::NoFile);
            ok = false;
        } else if !self.is_extension_allowed(file_name) {
            self.record_error(Some(id), Some(file_name), None, ErrorKind::ExtensionError);
            ok = false;
        }

        if !self.hooks.before_submit(id, file_name) {
            ok = false;
        }

        ok
    }

    /// Ask `on_drop` whether a selection of files may be uploaded.
    pub fn handle_drop(&mut self, files: &[FileInfo]) -> bool {
        self.hooks.dropped(files)
    }

    /// Complete a request that a before-submit check rejected.
    pub fn handle_rejected(&mut self, id: RequestId, file_name: &str) {
        self.settle(id);
        self.hooks.cancel(id, file_name);
        self.handle_complete(id, file_name, UploadResponse::empty());
    }

    /// Forward a progress report.
    pub fn handle_progress(&mut self, id: RequestId, file_name: &str, progress: Option<Progress>) {
        self.hooks.progress(id, file_name, progress);
    }

    /// Check a response against the success marker.
    ///
    /// Raises `on_success` when the response's `status` equals the
    /// marker, and records a `Failure` otherwise. Never both.
    pub fn handle_success(
        &mut self,
        id: RequestId,
        file_name: &str,
        result: &UploadResponse,
    ) -> UploadStatus {
        if result.status() == self.config.success_status {
            self.hooks.success(id, file_name, result);
            UploadStatus::Success
        } else {
            self.record_error(Some(id), Some(file_name), Some(result.clone()), ErrorKind::Failure);
            UploadStatus::Error
        }
    }

    /// Fold a resolved request into the current batch.
    ///
    /// Flushes the batch once no request remains in flight.
    pub fn handle_complete(&mut self, id: RequestId, file_name: &str, result: UploadResponse) {
        self.completed.push(CompletedRequest {
            id,
            file_name: file_name.to_owned(),
            result,
        });

        let remaining = self.in_flight();
        if remaining > 0 {
            tracing::trace!(%id, remaining, "request complete, batch still open");
            return;
        }

        let batch = std::mem::take(&mut self.completed);
        tracing::debug!(requests = batch.len(), errors = self.errors.len(), "batch complete");
        self.hooks.complete(&batch);
        self.flush_errors();
    }

    /// Append to the current batch's error list.
    pub fn record_error(
        &mut self,
        id: Option<RequestId>,
        file_name: Option<&str>,
        result: Option<UploadResponse>,
        kind: ErrorKind,
    ) {
        self.errors.push(ErrorRecord {
            id,
            file_name: file_name.map(str::to_owned),
            result,
            kind,
        });
    }

    /// Errors accumulated since the last flush.
    #[must_use]
    pub fn pending_errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    fn flush_errors(&mut self) {
        let errors = std::mem::take(&mut self.errors);
        if !errors.is_empty() {
            self.hooks.error(&errors);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::config::MaxFiles;

    #[derive(Default)]
    struct Log {
        successes: Vec<RequestId>,
        batches: Vec<Vec<CompletedRequest>>,
        errors: Vec<Vec<ErrorRecord>>,
        cancels: Vec<RequestId>,
    }

    fn recording_core(config: HandlerConfig) -> (HandlerCore, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let (a, b, c, d) = (
            Rc::clone(&log),
            Rc::clone(&log),
            Rc::clone(&log),
            Rc::clone(&log),
        );
        let hooks = HandlerHooks::new()
            .on_success(move |id, _, _| a.borrow_mut().successes.push(id))
            .on_complete(move |batch| b.borrow_mut().batches.push(batch.to_vec()))
            .on_error(move |errors| c.borrow_mut().errors.push(errors.to_vec()))
            .on_cancel(move |id, _| d.borrow_mut().cancels.push(id));
        (HandlerCore::new(config, hooks), log)
    }

    fn with_extensions(extensions: &[&str]) -> HandlerCore {
        let config = HandlerConfig {
            allowed_extensions: extensions.iter().map(|&e| e.to_owned()).collect(),
            ..HandlerConfig::default()
        };
        HandlerCore::new(config, HandlerHooks::new())
    }

    #[test]
    fn empty_allow_list_accepts_everything() {
        let core = with_extensions(&[]);
        assert!(core.is_extension_allowed("photo.png"));
        assert!(core.is_extension_allowed("README"));
        assert!(core.is_extension_allowed(""));
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        let core = with_extensions(&["JPG", "png"]);
        assert!(core.is_extension_allowed("photo.jpg"));
        assert!(core.is_extension_allowed("PHOTO.PNG"));
        assert!(core.is_extension_allowed("archive.tar.Jpg"));
        assert!(!core.is_extension_allowed("photo.gif"));
        assert!(!core.is_extension_allowed("jpg"));
    }

    #[test]
    fn extension_check_folds_non_ascii_case() {
        let core = with_extensions(&["éps"]);
        assert!(core.is_extension_allowed("X.ÉPS"));
        assert!(core.is_extension_allowed("x.Éps"));
        assert!(!core.is_extension_allowed("x.eps"));
    }

    #[test]
    fn name_without_dot_matches_empty_extension() {
        let core = with_extensions(&[""]);
        assert!(core.is_extension_allowed("Makefile"));
        assert!(!core.is_extension_allowed("photo.png"));
    }

    #[test]
    fn ids_are_sequential_from_one() {
        let mut core = with_extensions(&[]);
        assert_eq!(core.next_id(), RequestId::new(1));
        assert_eq!(core.next_id(), RequestId::new(2));
        assert_eq!(core.next_id(), RequestId::new(3));
    }

    #[test]
    fn max_files_rejection_flushes_one_error() {
        let config = HandlerConfig {
            max_files: MaxFiles::Fixed(3),
            ..HandlerConfig::default()
        };
        let (mut core, log) = recording_core(config);
        assert!(core.enforce_max_files(3));
        assert!(!core.enforce_max_files(4));

        let log = log.borrow();
        assert_eq!(log.errors.len(), 1);
        assert_eq!(log.errors[0].len(), 1);
        assert_eq!(log.errors[0][0].kind, ErrorKind::MaxFilesDropped);
        assert_eq!(log.errors[0][0].id, None);
        assert!(log.batches.is_empty());
    }

    #[test]
    fn computed_limit_receives_candidate_count() {
        let config = HandlerConfig {
            max_files: MaxFiles::computed(|n| if n > 10 { 0 } else { n }),
            ..HandlerConfig::default()
        };
        let (mut core, _) = recording_core(config);
        assert!(core.enforce_max_files(10));
        assert!(!core.enforce_max_files(11));
    }

    #[test]
    fn before_submit_records_no_file() {
        let mut core = with_extensions(&["png"]);
        let id = core.next_id();
        assert!(!core.handle_before_submit(id, ""));
        assert_eq!(core.pending_errors().len(), 1);
        assert_eq!(core.pending_errors()[0].kind, ErrorKind::NoFile);
    }

    #[test]
    fn before_submit_records_extension_error() {
        let mut core = with_extensions(&["png"]);
        let id = core.next_id();
        assert!(!core.handle_before_submit(id, "notes.txt"));
        assert_eq!(core.pending_errors()[0].kind, ErrorKind::ExtensionError);
        assert_eq!(core.pending_errors()[0].file_name.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn before_submit_consults_hook_even_after_validation_error() {
        let asked = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&asked);
        let config = HandlerConfig {
            allowed_extensions: vec![String::from("png")],
            ..HandlerConfig::default()
        };
        let hooks = HandlerHooks::new().on_before_submit(move |_, _| {
            *counter.borrow_mut() += 1;
            true
        });
        let mut core = HandlerCore::new(config, hooks);
        let id = core.next_id();
        assert!(!core.handle_before_submit(id, "notes.txt"));
        assert_eq!(*asked.borrow(), 1);
    }

    #[test]
    fn before_submit_hook_can_veto() {
        let hooks = HandlerHooks::new().on_before_submit(|_, name| name != "secret.png");
        let mut core = HandlerCore::new(HandlerConfig::default(), hooks);
        let id = core.next_id();
        assert!(core.handle_before_submit(id, "photo.png"));
        assert!(!core.handle_before_submit(id, "secret.png"));
        assert!(core.pending_errors().is_empty());
    }

    #[test]
    fn success_or_failure_never_both() {
        let config = HandlerConfig {
            success_status: Some(String::from("ok")),
            ..HandlerConfig::default()
        };
        let (mut core, log) = recording_core(config);
        let id = core.next_id();

        let ok = UploadResponse::parse_lenient(r#"{"status":"ok"}"#);
        assert_eq!(core.handle_success(id, "a.png", &ok), UploadStatus::Success);
        assert!(core.pending_errors().is_empty());

        let bad = UploadResponse::parse_lenient(r#"{"status":"quota"}"#);
        assert_eq!(core.handle_success(id, "a.png", &bad), UploadStatus::Error);

        let missing = UploadResponse::empty();
        assert_eq!(core.handle_success(id, "a.png", &missing), UploadStatus::Error);

        assert_eq!(log.borrow().successes.len(), 1);
        assert_eq!(core.pending_errors().len(), 2);
        assert!(core.pending_errors().iter().all(|e| e.kind == ErrorKind::Failure));
    }

    #[test]
    fn unset_marker_accepts_missing_status() {
        let (mut core, _) = recording_core(HandlerConfig::default());
        let id = core.next_id();
        let result = UploadResponse::empty();
        assert_eq!(core.handle_success(id, "a.png", &result), UploadStatus::Success);
    }

    #[test]
    fn batch_flushes_when_last_request_completes() {
        let (mut core, log) = recording_core(HandlerConfig::default());
        let ids: Vec<_> = (0..3).map(|_| core.next_id()).collect();
        for id in &ids {
            core.begin(*id, "f.png");
        }
        core.record_error(Some(ids[1]), Some("f.png"), None, ErrorKind::Exception);

        for (n, id) in ids.iter().rev().enumerate() {
            core.settle(*id);
            core.handle_complete(*id, "f.png", UploadResponse::empty());
            if n < 2 {
                assert!(log.borrow().batches.is_empty());
            }
        }

        let log = log.borrow();
        assert_eq!(log.batches.len(), 1);
        assert_eq!(log.batches[0].len(), 3);
        assert_eq!(log.errors.len(), 1);
        assert_eq!(log.errors[0][0].id, Some(ids[1]));
        assert!(core.pending_errors().is_empty());
    }

    #[test]
    fn batch_without_errors_skips_error_hook() {
        let (mut core, log) = recording_core(HandlerConfig::default());
        let id = core.next_id();
        core.begin(id, "a.png");
        core.settle(id);
        core.handle_complete(id, "a.png", UploadResponse::empty());

        assert_eq!(log.borrow().batches.len(), 1);
        assert!(log.borrow().errors.is_empty());
    }

    #[test]
    fn rejected_request_is_cancelled_and_completed() {
        let (mut core, log) = recording_core(HandlerConfig::default());
        let id = core.next_id();
        core.begin(id, "a.png");
        core.handle_rejected(id, "a.png");

        assert_eq!(core.in_flight(), 0);
        let log = log.borrow();
        assert_eq!(log.cancels, vec![id]);
        assert_eq!(log.batches[0][0].result, UploadResponse::empty());
    }
}
