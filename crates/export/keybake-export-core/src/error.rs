//! Errors surfaced by the export pipeline.
//!
//! Only genuinely fatal conditions live here. Unsupported source data is
//! excluded with a warning, missing curves mean "nothing to export", and
//! invariant violations (duplicate resource names, key collisions) panic.

use thiserror::Error;

use crate::source::ActionId;

#[derive(Debug, Error)]
pub enum ExportError {
    /// The authoring collaborator could not evaluate the resolved pose;
    /// aborts the whole export call.
    #[error("constraint baking failed for object '{object}': {reason}")]
    Bake { object: String, reason: String },

    /// An action id resolved to nothing in the action store.
    #[error("unknown action id {0:?}")]
    MissingAction(ActionId),
}
