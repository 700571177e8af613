//! Per-file asynchronous upload strategy.
//!
//! Every file of a drop (or picker selection) becomes its own POST
//! request whose body is the raw file content. Requests run
//! concurrently and may finish in any order; the batch is flushed when
//! the last one reports back.
//!
//! Per file:
//!
//! ```text
//! Queued --accepted--> Uploading --on_upload_finished--> Success | Error
//!        \--rejected--> Error
//! ```

use std::collections::BTreeMap;
use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::config::HandlerConfig;
use crate::drag::{DragDecision, DragEventKind, DragPayload, DropPolicy};
use crate::handler::{HandlerCore, HandlerKind, UploadHandler};
use crate::hooks::HandlerHooks;
use crate::types::{ErrorKind, FileInfo, Progress, RequestId, UploadFile, UploadResponse, UploadStatus};

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A fully described upload request, ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingRequest {
    /// Always `POST`.
    pub method: &'static str,
    /// Action URL with the query string appended.
    pub url: String,
    /// Request headers, in the order they are set.
    pub headers: Vec<(&'static str, String)>,
}

impl OutgoingRequest {
    /// Build the request for one file.
    ///
    /// The file name is added to the configured params under
    /// `input_name`, and the query is joined to `action` with `?` or
    /// `&` depending on whether the action already carries a query.
    #[must_use]
    pub fn build(config: &HandlerConfig, file_name: &str, file_size: u64) -> Self {
        let mut params = config.params.clone();
        params.insert(config.input_name.clone(), file_name.to_owned());
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", form_component(k), form_component(v)))
            .collect::<Vec<_>>()
            .join("&");

        let action = &config.action;
        let separator = match action.find('?') {
            Some(_) if action.ends_with('?') => "",
            Some(_) => "&",
            None => "?",
        };

        Self {
            method: "POST",
            url: format!("{action}{separator}{query}"),
            headers: vec![
                ("Cache-Control", String::from("no-cache")),
                ("X-Requested-With", String::from("XMLHttpRequest")),
                ("X-File-Name", uri_component(file_name)),
                ("X-File-Size", file_size.to_string()),
                ("Content-Type", String::from("application/octet-stream")),
            ],
        }
    }

    /// Value of the header `name`, if set.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Percent-encode like `encodeURIComponent`.
fn uri_component(s: &str) -> String {
    utf8_percent_encode(s, URI_COMPONENT).to_string()
}

/// Encode a query component, with `+` for spaces.
fn form_component(s: &str) -> String {
    uri_component(s).replace("%20", "+")
}

/// How a transport finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOutcome {
    /// The server answered (with any HTTP status).
    Loaded {
        /// Response text.
        body: String,
    },
    /// The request never produced a response (network error, abort).
    Failed {
        /// Whatever text the transport captured.
        body: Option<String>,
    },
}

/// Sends upload requests and reports back through
/// [`XhrUploadHandler::on_upload_progress`] and
/// [`XhrUploadHandler::on_upload_finished`].
pub trait Transport {
    /// The transport's native file type.
    type File: UploadFile;

    /// Why a request could not be started.
    type Error: fmt::Display;

    /// Start sending `file` as `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be started at all; the
    /// file is then reported as a transport failure.
    fn send(&mut self, id: RequestId, request: &OutgoingRequest, file: &Self::File) -> Result<(), Self::Error>;
}

/// Whether an accepted file is waiting or on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePhase {
    /// Registered with its batch, not yet handed to the transport.
    Queued,
    /// Handed to the transport.
    Uploading,
}

#[derive(Debug, Clone, Copy)]
struct Transfer {
    phase: FilePhase,
    loaded: u64,
    total: Option<u64>,
}

/// Uploads each dropped or picked file as its own request.
pub struct XhrUploadHandler<T> {
    core: HandlerCore,
    transport: T,
    policy: DropPolicy,
    transfers: BTreeMap<RequestId, Transfer>,
}

impl<T: Transport> XhrUploadHandler<T> {
    /// Create a handler.
    ///
    /// `policy` is resolved once by the caller from the user agent.
    pub fn new(config: HandlerConfig, hooks: HandlerHooks, transport: T, policy: DropPolicy) -> Self {
        Self {
            core: HandlerCore::new(config, hooks),
            transport,
            policy,
            transfers: BTreeMap::new(),
        }
    }

    /// The transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Answer a drag event on the drop area.
    #[must_use]
    pub fn drag_event(
        &self,
        kind: DragEventKind,
        payload: Option<&DragPayload>,
        left_area: bool,
    ) -> DragDecision {
        self.policy.decide(kind, payload, left_area)
    }

    /// Phase of an accepted, unfinished file.
    #[must_use]
    pub fn phase(&self, id: RequestId) -> Option<FilePhase> {
        self.transfers.get(&id).map(|t| t.phase)
    }

    /// Latest progress of an unfinished file, if its size is known.
    #[must_use]
    pub fn progress(&self, id: RequestId) -> Option<Progress> {
        let t = self.transfers.get(&id)?;
        t.total.map(|total| Progress {
            loaded: t.loaded,
            total,
        })
    }

    /// Bytes sent so far across every unfinished file.
    #[must_use]
    pub fn bytes_loaded(&self) -> u64 {
        self.transfers.values().map(|t| t.loaded).sum()
    }

    /// Ingest a drop or picker selection.
    ///
    /// Enforces the batch limit, asks `on_drop`, then validates and sends
    /// each file. Every file is registered as in flight before any of
    /// them is validated, so early rejections cannot flush the batch
    /// while siblings are still pending.
    ///
    /// Returns the number of requests handed to the transport.
    pub fn drop_files(&mut self, files: Vec<T::File>) -> usize {
        if !self.core.enforce_max_files(files.len()) {
            return 0;
        }

        let infos: Vec<FileInfo> = files.iter().map(FileInfo::of).collect();
        if !self.core.handle_drop(&infos) {
            tracing::debug!(files = files.len(), "selection discarded by on_drop");
            return 0;
        }

        let queued: Vec<(RequestId, FileInfo, T::File)> = infos
            .into_iter()
            .zip(files)
            .map(|(info, file)| {
                let id = self.core.next_id();
                self.core.begin(id, &info.name);
                self.transfers.insert(
                    id,
                    Transfer {
                        phase: FilePhase::Queued,
                        loaded: 0,
                        total: None,
                    },
                );
                (id, info, file)
            })
            .collect();

        let mut started = 0;
        for (id, info, file) in queued {
            if !self.core.handle_before_submit(id, &info.name) {
                self.transfers.remove(&id);
                self.core.handle_rejected(id, &info.name);
                continue;
            }

            let request = OutgoingRequest::build(self.core.config(), &info.name, info.size);
            if let Some(t) = self.transfers.get_mut(&id) {
                t.phase = FilePhase::Uploading;
            }
            tracing::debug!(%id, url = %request.url, "sending file");
            if let Err(e) = self.transport.send(id, &request, &file) {
                tracing::warn!(%id, error = %e, "transport could not start request");
                self.on_upload_finished(id, TransportOutcome::Failed { body: None });
                continue;
            }
            started += 1;
        }
        started
    }

    /// Record an upload-progress report.
    ///
    /// Reports whose length is not computable are ignored.
    pub fn on_upload_progress(&mut self, id: RequestId, loaded: u64, total: u64, length_computable: bool) {
        if !length_computable {
            return;
        }
        let Some(t) = self.transfers.get_mut(&id) else {
            return;
        };
        t.loaded = loaded;
        t.total = Some(total);
        let file_name = self
            .core
            .request(id)
            .map(|r| r.file_name.clone())
            .unwrap_or_default();
        self.core
            .handle_progress(id, &file_name, Some(Progress { loaded, total }));
    }

    /// Handle the end of a transfer.
    ///
    /// Returns the file's final status, or `None` for an unknown id.
    pub fn on_upload_finished(&mut self, id: RequestId, outcome: TransportOutcome) -> Option<UploadStatus> {
        if self.transfers.remove(&id).is_none() {
            tracing::warn!(%id, "transfer finished for an unknown request");
            return None;
        }
        let request = self.core.settle(id)?;
        let file_name = request.file_name;

        let (status, result) = match outcome {
            TransportOutcome::Loaded { body } => {
                let result = UploadResponse::parse_lenient(&body);
                (self.core.handle_success(id, &file_name, &result), result)
            }
            TransportOutcome::Failed { body } => {
                let result = body
                    .as_deref()
                    .map_or_else(UploadResponse::empty, UploadResponse::parse_lenient);
                self.core.record_error(
                    Some(id),
                    Some(&file_name),
                    Some(result.clone()),
                    ErrorKind::Exception,
                );
                (UploadStatus::Error, result)
            }
        };
        self.core.handle_complete(id, &file_name, result);
        Some(status)
    }
}

impl<T: Transport> UploadHandler for XhrUploadHandler<T> {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Xhr
    }

    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::config::MaxFiles;
    use crate::types::{CompletedRequest, ErrorRecord};

    #[derive(Default)]
    struct RecordingTransport {
        sent: Vec<(RequestId, OutgoingRequest)>,
    }

    impl Transport for RecordingTransport {
        type File = FileInfo;
        type Error = String;

        fn send(&mut self, id: RequestId, request: &OutgoingRequest, file: &FileInfo) -> Result<(), String> {
            if file.name.starts_with("offline") {
                return Err(String::from("network unreachable"));
            }
            self.sent.push((id, request.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Log {
        progress: Vec<Option<Progress>>,
        batches: Vec<Vec<CompletedRequest>>,
        errors: Vec<Vec<ErrorRecord>>,
    }

    fn config() -> HandlerConfig {
        HandlerConfig {
            action: String::from("/upload"),
            success_status: Some(String::from("ok")),
            allowed_extensions: vec![String::from("png"), String::from("jpg")],
            max_files: MaxFiles::Fixed(3),
            ..HandlerConfig::default()
        }
    }

    fn handler_with(
        config: HandlerConfig,
        hooks: HandlerHooks,
    ) -> (XhrUploadHandler<RecordingTransport>, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let (a, b, c) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let hooks = hooks
            .on_progress(move |_, _, p| a.borrow_mut().progress.push(p))
            .on_complete(move |batch| b.borrow_mut().batches.push(batch.to_vec()))
            .on_error(move |errors| c.borrow_mut().errors.push(errors.to_vec()));
        let handler = XhrUploadHandler::new(
            config,
            hooks,
            RecordingTransport::default(),
            DropPolicy::WebKit,
        );
        (handler, log)
    }

    fn handler() -> (XhrUploadHandler<RecordingTransport>, Rc<RefCell<Log>>) {
        handler_with(config(), HandlerHooks::new())
    }

    fn files(names: &[&str]) -> Vec<FileInfo> {
        names.iter().map(|&n| FileInfo::new(n, 2048)).collect()
    }

    fn ok() -> TransportOutcome {
        TransportOutcome::Loaded {
            body: String::from(r#"{"status":"ok"}"#),
        }
    }

    #[test]
    fn request_carries_query_and_headers() {
        let request = OutgoingRequest::build(&config(), "my photo.png", 2048);
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "/upload?file=my+photo.png");
        assert_eq!(request.header("x-requested-with"), Some("XMLHttpRequest"));
        assert_eq!(request.header("X-File-Size"), Some("2048"));
        assert_eq!(request.header("Content-Type"), Some("application/octet-stream"));
        assert_eq!(request.header("Cache-Control"), Some("no-cache"));
    }

    #[test]
    fn file_name_header_uses_the_uploaded_name() {
        // Carries the resolved file name, percent-encoded the way
        // encodeURIComponent would encode it.
        let request = OutgoingRequest::build(&config(), "été (1).png", 1);
        assert_eq!(request.header("X-File-Name"), Some("%C3%A9t%C3%A9%20(1).png"));
    }

    #[test]
    fn query_separator_respects_existing_query() {
        let mut cfg = config();
        cfg.params.insert(String::from("album"), String::from("7"));

        cfg.action = String::from("/upload?token=abc");
        let url = OutgoingRequest::build(&cfg, "a.png", 1).url;
        assert_eq!(url, "/upload?token=abc&album=7&file=a.png");

        cfg.action = String::from("/upload?");
        let url = OutgoingRequest::build(&cfg, "a.png", 1).url;
        assert_eq!(url, "/upload?album=7&file=a.png");
    }

    #[test]
    fn too_many_files_start_nothing() {
        let (mut handler, log) = handler();
        let started = handler.drop_files(files(&["a.png", "b.png", "c.png", "d.png"]));

        assert_eq!(started, 0);
        assert!(handler.transport().sent.is_empty());
        let log = log.borrow();
        assert_eq!(log.errors.len(), 1);
        assert_eq!(log.errors[0].len(), 1);
        assert_eq!(log.errors[0][0].kind, ErrorKind::MaxFilesDropped);
        assert!(log.batches.is_empty());
    }

    #[test]
    fn on_drop_can_discard_selection() {
        let hooks = HandlerHooks::new().on_drop(|files| files.len() == 1);
        let (mut handler, _) = handler_with(config(), hooks);
        assert_eq!(handler.drop_files(files(&["a.png", "b.png"])), 0);
        assert_eq!(handler.in_flight(), 0);
    }

    #[test]
    fn batch_flushes_once_in_any_completion_order() {
        let (mut handler, log) = handler();
        assert_eq!(handler.drop_files(files(&["a.png", "b.png", "c.png"])), 3);
        assert_eq!(handler.in_flight(), 3);
        let ids: Vec<_> = handler.transport().sent.iter().map(|(id, _)| *id).collect();
        assert_eq!(handler.phase(ids[0]), Some(FilePhase::Uploading));

        handler.on_upload_finished(ids[2], ok());
        handler.on_upload_finished(ids[0], TransportOutcome::Failed { body: None });
        assert!(log.borrow().batches.is_empty());
        handler.on_upload_finished(ids[1], ok());

        let log = log.borrow();
        assert_eq!(log.batches.len(), 1);
        assert_eq!(log.batches[0].len(), 3);
        assert_eq!(log.errors.len(), 1);
        assert_eq!(log.errors[0][0].kind, ErrorKind::Exception);
        assert_eq!(log.errors[0][0].id, Some(ids[0]));
    }

    #[test]
    fn early_rejection_waits_for_siblings() {
        let (mut handler, log) = handler();
        assert_eq!(handler.drop_files(files(&["notes.txt", "b.png"])), 1);
        assert!(log.borrow().batches.is_empty());

        let (id, _) = handler.transport().sent[0].clone();
        handler.on_upload_finished(id, ok());

        let log = log.borrow();
        assert_eq!(log.batches.len(), 1);
        assert_eq!(log.batches[0].len(), 2);
        assert_eq!(log.errors[0][0].kind, ErrorKind::ExtensionError);
    }

    #[test]
    fn all_rejected_still_flushes_once() {
        let (mut handler, log) = handler();
        assert_eq!(handler.drop_files(files(&["a.txt", "b.txt"])), 0);
        let log = log.borrow();
        assert_eq!(log.batches.len(), 1);
        assert_eq!(log.batches[0].len(), 2);
        assert_eq!(log.errors[0].len(), 2);
    }

    #[test]
    fn progress_is_forwarded_when_computable() {
        let (mut handler, log) = handler();
        handler.drop_files(files(&["a.png"]));
        let id = handler.transport().sent[0].0;

        handler.on_upload_progress(id, 10, 2048, false);
        handler.on_upload_progress(id, 1024, 2048, true);

        assert_eq!(
            log.borrow().progress,
            vec![Some(Progress {
                loaded: 1024,
                total: 2048
            })]
        );
        assert_eq!(handler.bytes_loaded(), 1024);
        assert_eq!(handler.progress(id).map(|p| p.loaded), Some(1024));
    }

    #[test]
    fn unparsable_body_is_a_failure_with_empty_result() {
        let (mut handler, log) = handler();
        handler.drop_files(files(&["a.png"]));
        let id = handler.transport().sent[0].0;
        let status = handler.on_upload_finished(
            id,
            TransportOutcome::Loaded {
                body: String::from("Internal Server Error"),
            },
        );

        assert_eq!(status, Some(UploadStatus::Error));
        let log = log.borrow();
        assert_eq!(log.errors[0][0].kind, ErrorKind::Failure);
        assert!(log.batches[0][0].result.is_empty());
    }

    #[test]
    fn unknown_or_repeated_completion_is_ignored() {
        let (mut handler, log) = handler();
        handler.drop_files(files(&["a.png"]));
        let id = handler.transport().sent[0].0;

        assert_eq!(handler.on_upload_finished(id, ok()), Some(UploadStatus::Success));
        assert_eq!(handler.on_upload_finished(id, ok()), None);
        assert_eq!(handler.on_upload_finished(RequestId::new(99), ok()), None);
        assert_eq!(log.borrow().batches.len(), 1);
    }

    #[test]
    fn transport_refusal_is_an_exception() {
        let (mut handler, log) = handler();
        assert_eq!(handler.drop_files(files(&["offline.png", "b.png"])), 1);
        assert!(log.borrow().batches.is_empty());
        assert_eq!(handler.in_flight(), 1);

        let id = handler.transport().sent[0].0;
        handler.on_upload_finished(id, ok());

        let log = log.borrow();
        assert_eq!(log.batches[0].len(), 2);
        assert_eq!(log.errors[0][0].kind, ErrorKind::Exception);
        assert_eq!(log.errors[0][0].file_name.as_deref(), Some("offline.png"));
    }

    #[test]
    fn ids_continue_across_batches() {
        let (mut handler, _) = handler();
        handler.drop_files(files(&["a.png", "b.png"]));
        handler.drop_files(files(&["c.png"]));
        let ids: Vec<u64> = handler
            .transport()
            .sent
            .iter()
            .map(|(id, _)| id.get())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
