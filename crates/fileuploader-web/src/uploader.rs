//! Attaching the widget to a page and tearing it down again.

use std::cell::RefCell;
use std::rc::Rc;

use fileuploader_core::{
    LegacyUploadHandler, Strategy, UploadHandler, UploadWidget, WidgetHooks, WidgetOptions,
};
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement};

use crate::drop_zone::{self, DropZone};
use crate::error::document;
use crate::file_list::DomFileList;
use crate::legacy::{self, IframeForm, LegacyBinding};
use crate::listener::Listener;
use crate::xhr::{self, SharedXhrHandler};
use crate::{WebError, capabilities, console, leave_guard};

const LEGACY_SECTION: &str = ".ui-fileUpload-legacy";
const MODERN_SECTION: &str = ".ui-fileUpload-new";

enum Active {
    Xhr {
        handler: SharedXhrHandler,
        zone: DropZone,
    },
    Legacy(LegacyBinding),
    Inert,
}

/// A widget bound to the page.
///
/// Listeners stay registered until [`destroy`](Self::destroy) is called
/// or the handle is dropped. The legacy handler is owned by its
/// listeners.
pub struct UploaderHandle {
    widget: Rc<UploadWidget>,
    active: Active,
    leave_guard: Option<Listener>,
}

impl UploaderHandle {
    /// The coordinating widget.
    #[must_use]
    pub fn widget(&self) -> &UploadWidget {
        &self.widget
    }

    /// The strategy in use, or `None` if the widget is inert.
    #[must_use]
    pub fn strategy(&self) -> Option<Strategy> {
        self.widget.strategy()
    }

    /// Files accepted and not yet resolved.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.widget.in_flight()
    }

    /// Detach every listener, abort running uploads and remove the
    /// elements the widget added to the page.
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(listener) = self.leave_guard.take() {
            listener.unbind();
        }
        match std::mem::replace(&mut self.active, Active::Inert) {
            Active::Xhr { handler, zone } => {
                zone.unbind();
                if let Ok(mut handler) = handler.try_borrow_mut() {
                    handler.transport_mut().abort_all();
                }
            }
            Active::Legacy(binding) => binding.unbind(),
            Active::Inert => {}
        }
    }
}

impl Drop for UploaderHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn show_section(container: &Element, selector: &str, visible: bool) -> Result<(), WebError> {
    let Some(section) = container.query_selector(selector)? else {
        return Ok(());
    };
    if let Some(section) = section.dyn_ref::<HtmlElement>() {
        section
            .style()
            .set_property("display", if visible { "" } else { "none" })?;
    }
    Ok(())
}

/// Attach an upload widget to the markup inside `container`.
///
/// # Errors
///
/// Returns [`WebError::Config`] when the XHR strategy is selected
/// without an `action`, and [`WebError::JsError`] if a browser API call
/// fails while binding.
pub fn attach(
    container: &Element,
    options: WidgetOptions,
    hooks: WidgetHooks,
) -> Result<UploaderHandle, WebError> {
    let debug = options.debug;
    let document = document()?;

    let list = match options.list_element.as_deref() {
        Some(selector) => DomFileList::locate(&document, selector)?,
        None => None,
    };

    let caps = capabilities::detect();
    console::log(debug, &format!("browser capabilities: {caps:?}"));
    let mut widget = UploadWidget::new(options, caps, hooks)?;
    if let Some(list) = list {
        widget = widget.with_file_list(list);
    } else {
        console::log(debug, "no list element found; file entries are not rendered");
    }
    let widget = Rc::new(widget);

    let active = match widget.strategy() {
        Some(Strategy::Xhr) => {
            show_section(container, LEGACY_SECTION, false)?;
            show_section(container, MODERN_SECTION, true)?;
            let handler = xhr::shared_handler(
                widget.handler_config(),
                widget.handler_hooks(),
                capabilities::drop_policy(),
                debug,
            );
            handler.borrow_mut().initialize();
            let zone = drop_zone::bind(
                container,
                &document,
                &handler,
                &widget.options().input_name,
            )?;
            Active::Xhr { handler, zone }
        }
        Some(Strategy::Legacy) => {
            show_section(container, MODERN_SECTION, false)?;
            show_section(container, LEGACY_SECTION, true)?;
            let form = IframeForm::locate(container)?;
            let handler = Rc::new(RefCell::new(LegacyUploadHandler::new(
                widget.handler_config(),
                widget.handler_hooks(),
                form,
            )));
            let ready = handler.borrow_mut().initialize();
            if ready {
                let binding = legacy::bind(&handler, &document, &widget.options().params, debug)?;
                Active::Legacy(binding)
            } else {
                console::warn("legacy upload form is incomplete; uploads are disabled");
                Active::Inert
            }
        }
        None => {
            show_section(container, MODERN_SECTION, false)?;
            show_section(container, LEGACY_SECTION, false)?;
            console::log(debug, "no upload strategy available");
            Active::Inert
        }
    };
    if let Some(strategy) = widget.strategy() {
        console::log(debug, &format!("attached with the {strategy} strategy"));
    }

    let leave_guard = Some(leave_guard::bind(&widget)?);

    Ok(UploaderHandle {
        widget,
        active,
        leave_guard,
    })
}

/// [`attach`] with options given as a JSON document.
///
/// # Errors
///
/// Returns [`WebError::Config`] if `options` does not parse, and
/// anything [`attach`] returns.
pub fn attach_json(
    container: &Element,
    options: &str,
    hooks: WidgetHooks,
) -> Result<UploaderHandle, WebError> {
    attach(container, WidgetOptions::from_json(options)?, hooks)
}
