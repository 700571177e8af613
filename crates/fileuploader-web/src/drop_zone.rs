//! Drop area and file-picker overlay for the XHR strategy.

use fileuploader_core::{DragEventKind, DragPayload};
use wasm_bindgen::JsCast;
use web_sys::{DataTransfer, Document, DragEvent, Element, HtmlElement, HtmlInputElement, Node};

use crate::listener::Listener;
use crate::xhr::{BrowserFile, SharedXhrHandler};
use crate::{WebError, console};

const BUTTON: &str = ".ui-fileUpload-button";
const DROP_AREA: &str = ".ui-fileUpload-dropArea";
const HOVER_CLASS: &str = "ui-fileUpload-dropArea-hover";

/// Listeners and elements added for the XHR strategy.
pub(crate) struct DropZone {
    listeners: Vec<Listener>,
    overlay: Option<HtmlInputElement>,
}

impl DropZone {
    pub(crate) fn unbind(self) {
        for listener in self.listeners {
            listener.unbind();
        }
        if let Some(overlay) = self.overlay {
            overlay.remove();
        }
    }
}

/// Bind the picker overlay and the drop area found in `container`.
///
/// Either element may be absent; the other still works.
pub(crate) fn bind(
    container: &Element,
    document: &Document,
    handler: &SharedXhrHandler,
    input_name: &str,
) -> Result<DropZone, WebError> {
    let mut listeners = Vec::new();

    let overlay = match container.query_selector(BUTTON)? {
        Some(button) => {
            let input = overlay_input(document, &button, input_name)?;
            listeners.push(bind_picker(&input, handler)?);
            Some(input)
        }
        None => None,
    };

    if let Some(area) = container.query_selector(DROP_AREA)? {
        for (event, kind) in [
            ("dragenter", DragEventKind::Enter),
            ("dragover", DragEventKind::Over),
            ("dragleave", DragEventKind::Leave),
            ("drop", DragEventKind::Drop),
        ] {
            listeners.push(bind_drag(&area, event, kind, handler)?);
        }
    }

    if overlay.is_none() && listeners.is_empty() {
        console::warn("neither a choose-files button nor a drop area was found");
    }

    Ok(DropZone { listeners, overlay })
}

/// Lay an invisible multi-select file input over `button`.
fn overlay_input(
    document: &Document,
    button: &Element,
    input_name: &str,
) -> Result<HtmlInputElement, WebError> {
    if let Some(button) = button.dyn_ref::<HtmlElement>() {
        let style = button.style();
        style.set_property("position", "relative")?;
        style.set_property("overflow", "hidden")?;
    }

    let input: HtmlInputElement = document
        .create_element("input")?
        .dyn_into()
        .map_err(|e| WebError::JsError(format!("failed to cast element: {e:?}")))?;
    input.set_type("file");
    input.set_multiple(true);
    input.set_name(input_name);

    let style = input.style();
    for (property, value) in [
        ("position", "absolute"),
        ("top", "0"),
        ("right", "0"),
        ("margin", "0"),
        ("padding", "0"),
        ("font-size", "118px"),
        ("cursor", "pointer"),
        ("opacity", "0"),
    ] {
        style.set_property(property, value)?;
    }

    button.append_child(&input)?;
    Ok(input)
}

fn bind_picker(input: &HtmlInputElement, handler: &SharedXhrHandler) -> Result<Listener, WebError> {
    let picker = input.clone();
    let handler = handler.clone();
    Listener::bind(input, "change", move |_| {
        let Some(list) = picker.files() else {
            return;
        };
        let files = BrowserFile::from_list(&list);
        if let Ok(mut handler) = handler.try_borrow_mut() {
            handler.drop_files(files);
        }
        // Let the same file be picked again.
        picker.set_value("");
    })
}

fn payload_of(transfer: &DataTransfer) -> DragPayload {
    DragPayload {
        effect_allowed: transfer.effect_allowed(),
        has_files: transfer.files().is_some(),
        types: transfer
            .types()
            .iter()
            .filter_map(|t| t.as_string())
            .collect(),
    }
}

fn bind_drag(
    area: &Element,
    event: &'static str,
    kind: DragEventKind,
    handler: &SharedXhrHandler,
) -> Result<Listener, WebError> {
    let zone = area.clone();
    let handler = handler.clone();
    Listener::bind(area, event, move |event| {
        let Some(event) = event.dyn_ref::<DragEvent>() else {
            return;
        };
        let transfer = event.data_transfer();
        let payload = transfer.as_ref().map(payload_of);
        let left_area = kind == DragEventKind::Leave && {
            let related = event.related_target();
            !zone.contains(related.as_ref().and_then(|t| t.dyn_ref::<Node>()))
        };

        let decision = match handler.try_borrow() {
            Ok(handler) => handler.drag_event(kind, payload.as_ref(), left_area),
            Err(_) => return,
        };

        if decision.prevent_default {
            event.prevent_default();
        }
        if decision.stop_propagation {
            event.stop_propagation();
        }
        if let (Some(effect), Some(transfer)) = (decision.drop_effect, &transfer) {
            transfer.set_drop_effect(effect.as_str());
        }
        match decision.hover {
            Some(true) => {
                let _ = zone.class_list().add_1(HOVER_CLASS);
            }
            Some(false) => {
                let _ = zone.class_list().remove_1(HOVER_CLASS);
            }
            None => {}
        }

        if decision.accept_files {
            let files = transfer
                .and_then(|t| t.files())
                .map(|list| BrowserFile::from_list(&list))
                .unwrap_or_default();
            if let Ok(mut handler) = handler.try_borrow_mut() {
                handler.drop_files(files);
            }
        }
    })
}
