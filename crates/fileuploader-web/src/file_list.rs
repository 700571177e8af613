//! File entries rendered into the page.

use std::collections::BTreeMap;

use fileuploader_core::{FileListView, RequestId, UploadStatus};
use web_sys::{Document, Element};

use crate::{WebError, console};

/// Renders each file as `<li id="fileId-N" class="loading">`, switching
/// the class to `success` or `error` when the file settles.
pub struct DomFileList {
    document: Document,
    list: Element,
    items: BTreeMap<RequestId, Element>,
}

impl DomFileList {
    /// Render into `list`.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::JsError`] if `list` is detached from any
    /// document.
    pub fn new(list: Element) -> Result<Self, WebError> {
        let document = list
            .owner_document()
            .ok_or_else(|| WebError::JsError("list element has no document".into()))?;
        Ok(Self {
            document,
            list,
            items: BTreeMap::new(),
        })
    }

    /// Find the list by CSS selector; `Ok(None)` if nothing matches.
    ///
    /// # Errors
    ///
    /// Returns [`WebError::JsError`] if `selector` is not valid CSS.
    pub fn locate(document: &Document, selector: &str) -> Result<Option<Self>, WebError> {
        document.query_selector(selector)?.map(Self::new).transpose()
    }

    fn render(&self, id: RequestId, display_name: &str) -> Result<Element, WebError> {
        let item = self.document.create_element("li")?;
        item.set_id(&format!("fileId-{id}"));
        item.set_class_name(UploadStatus::Loading.as_str());

        let name = self.document.create_element("span")?;
        name.set_class_name("name");
        name.set_text_content(Some(display_name));
        item.append_child(&name)?;

        self.list.append_child(&item)?;
        Ok(item)
    }
}

impl FileListView for DomFileList {
    fn append(&mut self, id: RequestId, display_name: &str) {
        match self.render(id, display_name) {
            Ok(item) => {
                self.items.insert(id, item);
            }
            Err(e) => console::warn(&format!("could not render file entry {id}: {e}")),
        }
    }

    fn set_status(&mut self, id: RequestId, status: UploadStatus) {
        if let Some(item) = self.items.get(&id) {
            item.set_class_name(status.as_str());
        }
    }

    fn clear(&mut self) {
        for item in self.items.values() {
            item.remove();
        }
        self.items.clear();
    }
}
