use std::cell::RefCell;
use std::rc::Rc;

use dioxus::prelude::*;
use fileuploader_core::{Progress, WidgetHooks, WidgetOptions, format_file_name, format_size};
use fileuploader_web::{UploaderHandle, WebError};

const CONTAINER_ID: &str = "uploader";

const OPTIONS: &str = r#"{
    "action": "/upload",
    "params": {"album": "demo"},
    "allowedExtensions": ["jpg", "jpeg", "png", "gif"],
    "maxFilesDropped": 5,
    "sizeLimit": 10485760
}"#;

const STYLE: &str = "
.uploader { max-width: 32rem; margin: 2rem auto; font-family: sans-serif; }
.ui-fileUpload-button { display: inline-block; padding: 0.5rem 1rem; border: 1px solid #888; }
.ui-fileUpload-dropArea { margin-top: 1rem; padding: 2rem; border: 2px dashed #aaa; text-align: center; }
.ui-fileUpload-dropArea-hover { border-color: #2a7; background: #efe; }
.ui-fileUpload-list li.loading { color: #777; }
.ui-fileUpload-list li.success { color: #2a7; }
.ui-fileUpload-list li.error { color: #c33; }
.events { font-size: 0.85rem; color: #444; }
";

fn main() {
    dioxus::launch(app);
}

fn push(mut events: Signal<Vec<String>>, line: String) {
    events.write().push(line);
}

fn describe_progress(name: &str, progress: Option<Progress>) -> String {
    let name = format_file_name(name);
    match progress {
        Some(p) => format!(
            "{name}: {} of {}",
            format_size(p.loaded),
            format_size(p.total)
        ),
        None => format!("{name}: uploading"),
    }
}

/// Attach the widget to the rendered markup, reporting into `events`.
fn attach_uploader(events: Signal<Vec<String>>) -> Result<UploaderHandle, WebError> {
    let container = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CONTAINER_ID))
        .ok_or(WebError::MissingElement("#uploader"))?;

    let options = WidgetOptions::from_json(OPTIONS)?;
    let hooks = WidgetHooks::new()
        .on_progress(move |name, progress| push(events, describe_progress(name, progress)))
        .on_success(move |name, _| push(events, format!("{}: uploaded", format_file_name(name))))
        .on_cancel(move |name| push(events, format!("{}: skipped", format_file_name(name))))
        .on_error(move |errors| {
            for e in errors {
                push(events, e.message.replace("<b>", "").replace("</b>", ""));
            }
        })
        .on_complete(move |batch| push(events, format!("batch of {} finished", batch.len())))
        .on_leave(|| String::from("Your photos are still uploading."));

    fileuploader_web::attach(&container, options, hooks)
}

/// Root component: the widget markup plus a log of upload events.
fn app() -> Element {
    let events = use_signal(Vec::<String>::new);
    let mut attach_error = use_signal(|| Option::<String>::None);
    let handle = use_hook(|| Rc::new(RefCell::new(Option::<UploaderHandle>::None)));

    // Attach once the markup is in the DOM.
    use_effect({
        let handle = Rc::clone(&handle);
        move || {
            if handle.borrow().is_some() {
                return;
            }
            match attach_uploader(events) {
                Ok(h) => *handle.borrow_mut() = Some(h),
                Err(e) => attach_error.set(Some(e.to_string())),
            }
        }
    });

    use_drop({
        let handle = Rc::clone(&handle);
        move || {
            if let Some(h) = handle.borrow_mut().take() {
                h.destroy();
            }
        }
    });

    rsx! {
        style { dangerous_inner_html: STYLE }

        div { id: CONTAINER_ID, class: "uploader",
            h1 { "Upload photos" }

            div { class: "ui-fileUpload-new",
                div { class: "ui-fileUpload-button", "Choose files" }
                div { class: "ui-fileUpload-dropArea", "Drop files here" }
            }

            div { class: "ui-fileUpload-legacy",
                form {
                    class: "ui-fileUpload-form",
                    action: "/upload",
                    method: "post",
                    enctype: "multipart/form-data",
                    input { r#type: "file", name: "file" }
                    button { r#type: "submit", "Upload" }
                }
            }

            // Entries are rendered by the widget, not by Dioxus.
            ul { class: "ui-fileUpload-list" }
        }

        if let Some(e) = attach_error() {
            p { class: "error", "Uploader unavailable: {e}" }
        }

        ol { class: "events",
            for (i, line) in events.read().iter().enumerate() {
                li { key: "{i}", "{line}" }
            }
        }
    }
}
