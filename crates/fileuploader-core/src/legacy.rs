//! Form-post strategy for browsers without XHR uploads.
//!
//! One file at a time travels through the bound form:
//!
//! ```text
//! Idle --before_submit--> Submitting --on_response--------> Idle
//!                                    \--on_transport_error-/
//! ```
//!
//! The form post cannot measure bytes sent, so a single progress report
//! without byte counts is raised when the submission starts.

use crate::config::HandlerConfig;
use crate::handler::{HandlerCore, HandlerKind, UploadHandler};
use crate::hooks::HandlerHooks;
use crate::types::{ErrorKind, RequestId, UploadResponse, UploadStatus, base_name};

/// The DOM controls a form-post handler needs.
pub trait FormControls {
    /// Whether the container holds the upload form, a file input and a
    /// submit button.
    fn is_complete(&self) -> bool;

    /// The file input's current value (may include a fake path).
    fn selected_path(&self) -> String;

    /// Enable or disable the submit button.
    fn set_submit_enabled(&mut self, enabled: bool);
}

/// Whether the physical form submission should go ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitDecision {
    /// Let the form submit.
    Proceed,
    /// Cancel the submission.
    Cancel,
}

/// Where the form currently is in its submit cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyState {
    /// Waiting for the user to submit.
    Idle,
    /// A submission is on the wire.
    Submitting {
        /// The request being sent.
        id: RequestId,
        /// Its file name.
        file_name: String,
    },
}

/// Uploads a single file by posting the bound form.
pub struct LegacyUploadHandler<C> {
    core: HandlerCore,
    controls: C,
    state: LegacyState,
    last_outcome: Option<UploadStatus>,
}

impl<C: FormControls> LegacyUploadHandler<C> {
    /// Create a handler around the form's controls.
    pub fn new(config: HandlerConfig, hooks: HandlerHooks, controls: C) -> Self {
        Self {
            core: HandlerCore::new(config, hooks),
            controls,
            state: LegacyState::Idle,
            last_outcome: None,
        }
    }

    /// Current submit state.
    #[must_use]
    pub const fn state(&self) -> &LegacyState {
        &self.state
    }

    /// Outcome of the most recent submission, if any finished.
    #[must_use]
    pub const fn last_outcome(&self) -> Option<UploadStatus> {
        self.last_outcome
    }

    /// The bound controls.
    #[must_use]
    pub const fn controls(&self) -> &C {
        &self.controls
    }

    /// Run the checks that precede a physical form submission.
    ///
    /// On [`SubmitDecision::Proceed`] the submit control is disabled and
    /// a byte-less progress report is raised. On rejection the request
    /// is completed immediately with an empty result.
    pub fn before_submit(&mut self) -> SubmitDecision {
        if matches!(self.state, LegacyState::Submitting { .. }) {
            tracing::warn!("form submitted while a previous submission is still in flight");
            return SubmitDecision::Cancel;
        }
        if !self.core.enforce_max_files(1) {
            return SubmitDecision::Cancel;
        }

        let id = self.core.next_id();
        let path = self.controls.selected_path();
        let file_name = base_name(&path).to_owned();
        self.core.begin(id, &file_name);

        if !self.core.handle_before_submit(id, &file_name) {
            tracing::debug!(%id, %file_name, "form submission rejected");
            self.core.handle_rejected(id, &file_name);
            return SubmitDecision::Cancel;
        }

        self.controls.set_submit_enabled(false);
        self.core.handle_progress(id, &file_name, None);
        self.state = LegacyState::Submitting { id, file_name };
        SubmitDecision::Proceed
    }

    /// Handle the body of a finished submission.
    ///
    /// Responses are expected to be JSON; an unparsable body is routed
    /// to [`on_transport_error`](Self::on_transport_error).
    pub fn on_response(&mut self, body: &str) {
        match UploadResponse::parse_strict(body) {
            Ok(result) => {
                let Some((id, file_name)) = self.finish() else {
                    return;
                };
                let status = self.core.handle_success(id, &file_name, &result);
                self.last_outcome = Some(status);
                self.core.handle_complete(id, &file_name, result);
            }
            Err(e) => {
                tracing::debug!(error = %e, "form response is not JSON");
                self.on_transport_error(Some(body));
            }
        }
    }

    /// Handle a failed submission.
    ///
    /// A JSON error body is kept as the error's result; anything else
    /// becomes an empty object.
    pub fn on_transport_error(&mut self, body: Option<&str>) {
        let Some((id, file_name)) = self.finish() else {
            return;
        };
        let result = body.map_or_else(UploadResponse::empty, UploadResponse::parse_lenient);
        self.core
            .record_error(Some(id), Some(&file_name), Some(result.clone()), ErrorKind::Exception);
        self.last_outcome = Some(UploadStatus::Error);
        self.core.handle_complete(id, &file_name, result);
    }

    /// Leave `Submitting`: re-enable the form and clear the in-flight
    /// marker.
    fn finish(&mut self) -> Option<(RequestId, String)> {
        let LegacyState::Submitting { id, file_name } =
            std::mem::replace(&mut self.state, LegacyState::Idle)
        else {
            tracing::warn!("form response received with no submission in flight");
            return None;
        };
        self.controls.set_submit_enabled(true);
        self.core.settle(id);
        Some((id, file_name))
    }
}

impl<C: FormControls> UploadHandler for LegacyUploadHandler<C> {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Legacy
    }

    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HandlerCore {
        &mut self.core
    }

    /// Fails without side effects beyond `on_init` when the form, its
    /// file input or its submit button is missing.
    fn initialize(&mut self) -> bool {
        self.core.initialize();
        if !self.controls.is_complete() {
            tracing::debug!("upload form incomplete, legacy handler inactive");
            return false;
        }
        true
    }
}
