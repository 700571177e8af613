//! Single-file form posts into a hidden iframe.
//!
//! Used where the browser cannot send files through `XMLHttpRequest`.
//! The bound form is retargeted at a hidden iframe; when the iframe
//! loads, its body text is the server's response.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use fileuploader_core::{FormControls, LegacyState, LegacyUploadHandler, SubmitDecision};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlFormElement, HtmlIFrameElement, HtmlInputElement};

use crate::listener::Listener;
use crate::{WebError, console};

const FORM: &str = "form.ui-fileUpload-form";

static FRAME_COUNTER: AtomicU32 = AtomicU32::new(0);

/// The legacy handler as driven by the browser.
pub type SharedLegacyHandler = Rc<RefCell<LegacyUploadHandler<IframeForm>>>;

/// The form, file input and submit control of the legacy markup.
pub struct IframeForm {
    form: Option<HtmlFormElement>,
    input: Option<HtmlInputElement>,
    submit: Option<Element>,
}

impl IframeForm {
    /// Find the legacy form inside `container`.
    ///
    /// Missing pieces are not an error here; the handler refuses to
    /// initialize when the form is incomplete.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::JsError`] if a selector query fails.
    pub fn locate(container: &Element) -> Result<Self, WebError> {
        let form = container
            .query_selector(FORM)?
            .and_then(|e| e.dyn_into::<HtmlFormElement>().ok());
        let (input, submit) = match &form {
            Some(form) => (
                form.query_selector("input[type=file]")?
                    .and_then(|e| e.dyn_into::<HtmlInputElement>().ok()),
                form.query_selector("[type=submit], button:not([type])")?,
            ),
            None => (None, None),
        };
        Ok(Self {
            form,
            input,
            submit,
        })
    }

    /// The bound form element.
    #[must_use]
    pub const fn form(&self) -> Option<&HtmlFormElement> {
        self.form.as_ref()
    }
}

impl FormControls for IframeForm {
    fn is_complete(&self) -> bool {
        self.form.is_some() && self.input.is_some() && self.submit.is_some()
    }

    fn selected_path(&self) -> String {
        self.input.as_ref().map(HtmlInputElement::value).unwrap_or_default()
    }

    fn set_submit_enabled(&mut self, enabled: bool) {
        let Some(submit) = &self.submit else {
            return;
        };
        let result = if enabled {
            submit.remove_attribute("disabled")
        } else {
            submit.set_attribute("disabled", "disabled")
        };
        if result.is_err() {
            console::warn("could not toggle the submit control");
        }
    }
}

/// Listeners and elements added for the legacy strategy.
pub(crate) struct LegacyBinding {
    listeners: Vec<Listener>,
    frame: HtmlIFrameElement,
    extras: Vec<Element>,
}

impl LegacyBinding {
    pub(crate) fn unbind(self) {
        for listener in self.listeners {
            listener.unbind();
        }
        for extra in &self.extras {
            extra.remove();
        }
        self.frame.remove();
    }
}

fn frame_body(frame: &HtmlIFrameElement) -> Option<String> {
    frame.content_document()?.body()?.text_content()
}

/// Retarget the handler's form at a new hidden iframe and bind submit
/// and load.
pub(crate) fn bind(
    handler: &SharedLegacyHandler,
    document: &Document,
    params: &BTreeMap<String, String>,
    debug: bool,
) -> Result<LegacyBinding, WebError> {
    let form = handler
        .borrow()
        .controls()
        .form()
        .cloned()
        .ok_or(WebError::MissingElement(FORM))?;

    let name = format!(
        "fileuploader-frame-{}",
        FRAME_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let frame: HtmlIFrameElement = document
        .create_element("iframe")?
        .dyn_into()
        .map_err(|e| WebError::JsError(format!("failed to cast element: {e:?}")))?;
    frame.set_name(&name);
    frame.style().set_property("display", "none")?;
    document
        .body()
        .ok_or_else(|| WebError::JsError("no document body".into()))?
        .append_child(&frame)?;

    form.set_target(&name);
    form.set_method("post");
    form.set_enctype("multipart/form-data");

    let mut extras = Vec::new();
    for (key, value) in params {
        let hidden = document.create_element("input")?;
        hidden.set_attribute("type", "hidden")?;
        hidden.set_attribute("name", key)?;
        hidden.set_attribute("value", value)?;
        form.append_child(&hidden)?;
        extras.push(hidden);
    }

    let on_submit = {
        let handler = Rc::clone(handler);
        Listener::bind(&form, "submit", move |event| {
            let decision = handler
                .try_borrow_mut()
                .map_or(SubmitDecision::Cancel, |mut h| h.before_submit());
            if decision == SubmitDecision::Cancel {
                event.prevent_default();
            }
            console::log(debug, &format!("form submit: {decision:?}"));
        })?
    };

    let on_load = {
        let handler = Rc::clone(handler);
        let loaded = frame.clone();
        Listener::bind(&frame, "load", move |_| {
            let Ok(mut handler) = handler.try_borrow_mut() else {
                return;
            };
            // The blank document loaded on insertion is not a response.
            if !matches!(handler.state(), LegacyState::Submitting { .. }) {
                return;
            }
            match frame_body(&loaded) {
                Some(body) => handler.on_response(&body),
                None => handler.on_transport_error(None),
            }
            console::log(
                debug,
                &format!("form response handled: {:?}", handler.last_outcome()),
            );
        })?
    };

    Ok(LegacyBinding {
        listeners: vec![on_submit, on_load],
        frame,
        extras,
    })
}
