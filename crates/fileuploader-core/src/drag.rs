//! Drag-and-drop decisions for the drop area.
//!
//! Browsers disagree on how a file drag announces itself. WebKit exposes
//! the `files` list during the whole drag, while other engines only list
//! `"Files"` among the payload's types. [`DropPolicy`] resolves that
//! difference once, from the user agent, so event handlers only ask
//! [`DropPolicy::decide`].

/// Snapshot of a drag event's `dataTransfer`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragPayload {
    /// `dataTransfer.effectAllowed`.
    pub effect_allowed: String,
    /// Whether `dataTransfer.files` is available.
    pub has_files: bool,
    /// `dataTransfer.types`.
    pub types: Vec<String>,
}

/// The four drag events bound on the drop area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEventKind {
    Enter,
    Over,
    Leave,
    Drop,
}

/// Value to assign to `dataTransfer.dropEffect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Copy,
    Move,
}

impl DropEffect {
    /// The DOM string for this effect.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }

    /// Pick the effect the source allows: `move` when only moving is
    /// permitted, `copy` otherwise.
    #[must_use]
    pub fn for_allowed(effect_allowed: &str) -> Self {
        match effect_allowed {
            "move" | "linkMove" => Self::Move,
            _ => Self::Copy,
        }
    }
}

/// What an event handler should do with a drag event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DragDecision {
    /// Call `preventDefault()`.
    pub prevent_default: bool,
    /// Call `stopPropagation()`.
    pub stop_propagation: bool,
    /// Assign `dataTransfer.dropEffect`.
    pub drop_effect: Option<DropEffect>,
    /// Show (`Some(true)`) or clear (`Some(false)`) the hover state.
    pub hover: Option<bool>,
    /// Hand the payload's files to the upload handler.
    pub accept_files: bool,
}

/// How the current browser exposes file drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    /// `files` is populated throughout the drag.
    WebKit,
    /// `"Files"` appears in `types`.
    TypeList,
}

impl DropPolicy {
    /// Resolve the policy from a `navigator.userAgent` string.
    #[must_use]
    pub fn detect(user_agent: &str) -> Self {
        if user_agent.contains("AppleWebKit") {
            Self::WebKit
        } else {
            Self::TypeList
        }
    }

    /// Whether `payload` describes a drag of files that may be dropped.
    #[must_use]
    pub fn is_valid_file_drag(self, payload: Option<&DragPayload>) -> bool {
        let Some(payload) = payload else {
            return false;
        };
        if payload.effect_allowed == "none" {
            return false;
        }
        payload.has_files
            || (self == Self::TypeList && payload.types.iter().any(|t| t == "Files"))
    }

    /// Decide how to answer a drag event on the drop area.
    ///
    /// `left_area` is only meaningful for [`DragEventKind::Leave`]: it
    /// is `false` when the pointer merely moved onto a child of the area.
    #[must_use]
    pub fn decide(
        self,
        kind: DragEventKind,
        payload: Option<&DragPayload>,
        left_area: bool,
    ) -> DragDecision {
        let valid = self.is_valid_file_drag(payload);
        match kind {
            DragEventKind::Enter => DragDecision {
                hover: valid.then_some(true),
                ..DragDecision::default()
            },
            DragEventKind::Over if valid => DragDecision {
                prevent_default: true,
                stop_propagation: true,
                drop_effect: payload.map(|p| DropEffect::for_allowed(&p.effect_allowed)),
                ..DragDecision::default()
            },
            DragEventKind::Over => DragDecision {
                prevent_default: true,
                stop_propagation: true,
                ..DragDecision::default()
            },
            DragEventKind::Leave => {
                let swallow = !valid || !left_area;
                DragDecision {
                    prevent_default: swallow,
                    stop_propagation: swallow,
                    hover: Some(false),
                    ..DragDecision::default()
                }
            }
            DragEventKind::Drop if valid => DragDecision {
                prevent_default: true,
                hover: Some(false),
                accept_files: true,
                ..DragDecision::default()
            },
            DragEventKind::Drop => DragDecision::default(),
        }
    }
}
