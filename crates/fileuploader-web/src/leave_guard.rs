//! Warn before leaving the page while uploads are running.

use std::rc::Rc;

use fileuploader_core::UploadWidget;
use wasm_bindgen::JsCast;
use web_sys::BeforeUnloadEvent;

use crate::WebError;
use crate::listener::Listener;

/// Bind `beforeunload` on the window.
///
/// While the widget has uploads in flight the event is cancelled through
/// both `preventDefault()` and the older `returnValue` channel, so every
/// browser shows its leave prompt.
pub(crate) fn bind(widget: &Rc<UploadWidget>) -> Result<Listener, WebError> {
    let window = crate::error::window()?;
    let widget = Rc::clone(widget);
    Listener::bind(&window, "beforeunload", move |event| {
        let Some(message) = widget.leave_warning() else {
            return;
        };
        event.prevent_default();
        if let Some(event) = event.dyn_ref::<BeforeUnloadEvent>() {
            event.set_return_value(&message);
        }
    })
}
