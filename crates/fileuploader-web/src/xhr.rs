//! `XMLHttpRequest` transport for the XHR strategy.
//!
//! The transport lives inside the handler it reports to, so it holds a
//! weak reference back to the shared handler and re-borrows it from the
//! request callbacks.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use fileuploader_core::{
    DropPolicy, HandlerConfig, HandlerHooks, OutgoingRequest, RequestId, Transport,
    TransportOutcome, UploadFile, XhrUploadHandler,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{ProgressEvent, XmlHttpRequest};

use crate::{WebError, console};

/// The XHR handler as driven by the browser.
pub type BrowserXhrHandler = XhrUploadHandler<XhrTransport>;

/// Shared ownership of the handler between DOM listeners and requests.
pub type SharedXhrHandler = Rc<RefCell<BrowserXhrHandler>>;

/// A picked or dropped browser file.
#[derive(Debug, Clone)]
pub struct BrowserFile(pub web_sys::File);

impl BrowserFile {
    /// Every file in `list`, in order.
    #[must_use]
    pub fn from_list(list: &web_sys::FileList) -> Vec<Self> {
        (0..list.length()).filter_map(|i| list.get(i)).map(Self).collect()
    }
}

impl UploadFile for BrowserFile {
    fn name(&self) -> Option<String> {
        let name = self.0.name();
        (!name.is_empty()).then_some(name)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Blob sizes are whole, non-negative
    fn size(&self) -> u64 {
        self.0.size() as u64
    }
}

type ProgressCallback = Closure<dyn FnMut(ProgressEvent)>;

struct ActiveRequest {
    xhr: XmlHttpRequest,
    _on_progress: ProgressCallback,
    _on_loadend: ProgressCallback,
}

impl ActiveRequest {
    fn detach(&self) {
        if let Ok(upload) = self.xhr.upload() {
            upload.set_onprogress(None);
        }
        self.xhr.set_onloadend(None);
    }
}

/// Sends each file as the raw body of its own `POST`.
pub struct XhrTransport {
    handler: Weak<RefCell<BrowserXhrHandler>>,
    debug: bool,
    active: BTreeMap<RequestId, ActiveRequest>,
    // Callbacks of finished requests. A callback cannot be freed while it
    // runs, so they are dropped on the next send.
    retired: Vec<ActiveRequest>,
}

impl XhrTransport {
    /// Requests currently on the wire.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.len()
    }

    fn retire(&mut self, id: RequestId) {
        if let Some(request) = self.active.remove(&id) {
            request.detach();
            self.retired.push(request);
        }
    }

    /// Abort every running request without reporting back.
    pub fn abort_all(&mut self) {
        for (id, request) in std::mem::take(&mut self.active) {
            request.detach();
            if request.xhr.abort().is_err() {
                console::warn(&format!("could not abort upload {id}"));
            }
        }
        self.retired.clear();
    }
}

/// Build the XHR handler with its transport wired back to it.
pub fn shared_handler(
    config: HandlerConfig,
    hooks: HandlerHooks,
    policy: DropPolicy,
    debug: bool,
) -> SharedXhrHandler {
    Rc::new_cyclic(|weak| {
        let transport = XhrTransport {
            handler: weak.clone(),
            debug,
            active: BTreeMap::new(),
            retired: Vec::new(),
        };
        RefCell::new(XhrUploadHandler::new(config, hooks, transport, policy))
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // byte counts
fn bytes(value: f64) -> u64 {
    value as u64
}

fn outcome_of(xhr: &XmlHttpRequest) -> TransportOutcome {
    let body = xhr.response_text().ok().flatten();
    match xhr.status() {
        Ok(0) | Err(_) => TransportOutcome::Failed { body },
        Ok(_) => TransportOutcome::Loaded {
            body: body.unwrap_or_default(),
        },
    }
}

impl Transport for XhrTransport {
    type File = BrowserFile;
    type Error = WebError;

    fn send(
        &mut self,
        id: RequestId,
        request: &OutgoingRequest,
        file: &BrowserFile,
    ) -> Result<(), WebError> {
        self.retired.clear();

        let xhr = XmlHttpRequest::new()?;
        xhr.open_with_async(request.method, &request.url, true)?;
        for (name, value) in &request.headers {
            xhr.set_request_header(name, value)?;
        }

        let handler = self.handler.clone();
        let on_progress = ProgressCallback::new(move |event: ProgressEvent| {
            let Some(handler) = handler.upgrade() else {
                return;
            };
            let Ok(mut handler) = handler.try_borrow_mut() else {
                return;
            };
            handler.on_upload_progress(
                id,
                bytes(event.loaded()),
                bytes(event.total()),
                event.length_computable(),
            );
        });

        let handler = self.handler.clone();
        let finished = xhr.clone();
        let debug = self.debug;
        let on_loadend = ProgressCallback::new(move |_: ProgressEvent| {
            let outcome = outcome_of(&finished);
            let Some(handler) = handler.upgrade() else {
                return;
            };
            let Ok(mut handler) = handler.try_borrow_mut() else {
                console::warn(&format!("upload {id} finished while the uploader was busy"));
                return;
            };
            handler.transport_mut().retire(id);
            let status = handler.on_upload_finished(id, outcome);
            if let Some(status) = status {
                console::log(debug, &format!("upload {id} finished: {status}"));
            }
        });

        xhr.upload()?
            .set_onprogress(Some(on_progress.as_ref().unchecked_ref()));
        xhr.set_onloadend(Some(on_loadend.as_ref().unchecked_ref()));

        self.active.insert(
            id,
            ActiveRequest {
                xhr: xhr.clone(),
                _on_progress: on_progress,
                _on_loadend: on_loadend,
            },
        );

        let blob: &web_sys::Blob = &file.0;
        if let Err(e) = xhr.send_with_opt_blob(Some(blob)) {
            self.retire(id);
            return Err(e.into());
        }
        console::log(self.debug, &format!("upload {id} sent to {}", request.url));
        Ok(())
    }
}
