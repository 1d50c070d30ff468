//! Listing lifecycle
//!
//! ```text
//!            approve                 delist
//!  pending ----------> approved -------------> delisted
//!     |  ^                ^  ^                    |
//!     |  | owner edit     |  +------ approve ----+
//!     |  |                |
//!     v  |   approve      |
//!  rejected --------------+
//!     ^
//!     +---- reject (pending only, reason required)
//! ```
//!
//! There is no terminal state. Deletion is handled outside the machine.

use crate::data::{AdminActionKind, ListingStatus};
use crate::error::AppError;

/// An admin moderation action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationAction {
    Approve,
    Reject { reason: String },
    Delist,
}

impl ModerationAction {
    /// Build a reject action, trimming the reason.
    ///
    /// # Errors
    /// `Validation` when the reason is missing or blank
    pub fn reject(reason: Option<&str>) -> Result<Self, AppError> {
        let reason = reason.map(str::trim).unwrap_or_default();
        if reason.is_empty() {
            return Err(AppError::Validation(
                "Rejection reason is required".to_string(),
            ));
        }
        Ok(ModerationAction::Reject {
            reason: reason.to_string(),
        })
    }

    pub fn kind(&self) -> AdminActionKind {
        match self {
            ModerationAction::Approve => AdminActionKind::Approve,
            ModerationAction::Reject { .. } => AdminActionKind::Reject,
            ModerationAction::Delist => AdminActionKind::Delist,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ModerationAction::Reject { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Result of a valid transition: the new status and its rejection reason.
///
/// `rejection_reason` is `Some` exactly when `status` is `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: ListingStatus,
    pub rejection_reason: Option<String>,
}

impl Transition {
    fn to(status: ListingStatus) -> Self {
        Self {
            status,
            rejection_reason: None,
        }
    }
}

/// Apply a moderation action to a listing in status `from`.
///
/// # Errors
/// `Validation` for transitions the machine does not allow
pub fn moderate(from: ListingStatus, action: &ModerationAction) -> Result<Transition, AppError> {
    use ListingStatus::*;

    match (from, action) {
        (Pending | Rejected | Delisted, ModerationAction::Approve) => Ok(Transition::to(Approved)),
        (Pending, ModerationAction::Reject { reason }) => Ok(Transition {
            status: Rejected,
            rejection_reason: Some(reason.clone()),
        }),
        (Approved, ModerationAction::Delist) => Ok(Transition::to(Delisted)),
        (from, action) => Err(AppError::Validation(format!(
            "Cannot {} a listing that is {}",
            action.kind(),
            from
        ))),
    }
}

/// Status after a content edit.
///
/// Admin edits leave status and reason untouched. Owner edits are only
/// allowed on pending or rejected listings; a rejected listing goes back
/// to pending with its reason cleared.
///
/// # Errors
/// `ForbiddenWithReason` for owner edits on approved or delisted listings
pub fn after_edit(
    from: ListingStatus,
    rejection_reason: Option<&str>,
    is_admin: bool,
) -> Result<Transition, AppError> {
    if is_admin {
        return Ok(Transition {
            status: from,
            rejection_reason: rejection_reason.map(str::to_string),
        });
    }

    match from {
        ListingStatus::Pending | ListingStatus::Rejected => {
            Ok(Transition::to(ListingStatus::Pending))
        }
        ListingStatus::Approved => Err(AppError::ForbiddenWithReason(
            "Cannot edit approved listings. Contact admin for changes.".to_string(),
        )),
        ListingStatus::Delisted => Err(AppError::ForbiddenWithReason(
            "Cannot edit delisted listings. Contact admin for changes.".to_string(),
        )),
    }
}
