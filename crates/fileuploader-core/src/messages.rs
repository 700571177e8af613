//! User-facing error message templates.
//!
//! Templates may contain the placeholders `{file}`, `{extensions}`,
//! `{sizeLimit}`, `{minSizeLimit}` and `{maxFilesDropped}`.

use serde::{Deserialize, Serialize};

use crate::format::{format_file_name, format_size};
use crate::types::ErrorKind;

/// One template per [`ErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Messages {
    /// The file's extension is not in the allow-list.
    pub extension_error: String,
    /// The transport failed before a usable response arrived.
    pub exception: String,
    /// The server answered without the success marker.
    pub failure: String,
    /// Submitted without choosing a file.
    pub no_file: String,
    /// Too many files in one selection.
    pub max_files_dropped: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            extension_error: String::from(
                "<b>{file}</b> has invalid extension. Only {extensions} are allowed.",
            ),
            exception: String::from("<b>{file}</b> could not be uploaded"),
            failure: String::from("<b>{file}</b> could not be uploaded"),
            no_file: String::from("No file selected"),
            max_files_dropped: String::from("You can upload maximum <b>{maxFilesDropped}</b> files"),
        }
    }
}

/// Live values substituted into a template.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    /// Fills `{extensions}`, joined with `, `.
    pub allowed_extensions: &'a [String],
    /// Fills `{sizeLimit}`, in bytes.
    pub size_limit: u64,
    /// Fills `{minSizeLimit}`, in bytes.
    pub min_size_limit: u64,
    /// Fills `{maxFilesDropped}`.
    pub max_files_dropped: usize,
}

impl Messages {
    /// The raw template for `kind`.
    #[must_use]
    pub fn template(&self, kind: ErrorKind) -> &str {
        match kind {
            ErrorKind::ExtensionError => &self.extension_error,
            ErrorKind::Exception => &self.exception,
            ErrorKind::Failure => &self.failure,
            ErrorKind::NoFile => &self.no_file,
            ErrorKind::MaxFilesDropped => &self.max_files_dropped,
        }
    }

    /// Render the message for `kind`.
    ///
    /// `{file}` is left untouched when `file_name` is `None`; long names
    /// are shortened with [`format_file_name`].
    #[must_use]
    pub fn render(&self, kind: ErrorKind, file_name: Option<&str>, ctx: &MessageContext<'_>) -> String {
        let mut message = self.template(kind).to_owned();
        if let Some(name) = file_name {
            message = message.replace("{file}", &format_file_name(name));
        }
        message
            .replace("{extensions}", &ctx.allowed_extensions.join(", "))
            .replace("{sizeLimit}", &format_size(ctx.size_limit))
            .replace("{minSizeLimit}", &format_size(ctx.min_size_limit))
            .replace("{maxFilesDropped}", &ctx.max_files_dropped.to_string())
    }
}
