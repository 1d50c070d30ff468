//! Moderation service
//!
//! Admin approve/reject/delist transitions. Each status change and its
//! audit entry are written in one transaction.

use std::sync::Arc;

use chrono::Utc;

use super::lifecycle::{self, ModerationAction};
use super::policy;
use crate::auth::ActorContext;
use crate::data::{AdminAction, Database, EntityId, Listing};
use crate::error::AppError;
use crate::metrics::MODERATION_ACTIONS_TOTAL;

/// Moderation service
pub struct ModerationService {
    db: Arc<Database>,
}

impl ModerationService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Apply a moderation action to a listing.
    ///
    /// # Errors
    /// - `Forbidden` if `actor` cannot moderate
    /// - `NotFound` if the listing does not exist
    /// - `Validation` if the transition is not allowed from the current
    ///   status, including when another admin changed it concurrently
    pub async fn moderate(
        &self,
        listing_id: &str,
        action: ModerationAction,
        actor: &ActorContext,
    ) -> Result<Listing, AppError> {
        actor.ensure_active()?;
        if !policy::can_moderate(actor.role) {
            return Err(AppError::Forbidden);
        }
        let admin_id = actor.actor_id().ok_or(AppError::Unauthorized)?;

        let listing = self
            .db
            .get_listing(listing_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let transition = lifecycle::moderate(listing.status, &action)?;

        let now = Utc::now();
        let kind = action.kind();
        let entry = AdminAction {
            id: EntityId::new().0,
            listing_id: listing.id.clone(),
            admin_id: admin_id.to_string(),
            action: kind,
            reason: action.reason().map(str::to_string),
            created_at: now,
        };

        let updated = self
            .db
            .transition_listing_status(
                &listing.id,
                listing.status,
                transition.status,
                transition.rejection_reason.as_deref(),
                Some(&entry),
                now,
            )
            .await?;

        let Some(updated) = updated else {
            if self.db.get_listing(listing_id).await?.is_none() {
                return Err(AppError::NotFound);
            }
            return Err(AppError::Validation(
                "Listing status changed concurrently; reload and retry".to_string(),
            ));
        };

        MODERATION_ACTIONS_TOTAL
            .with_label_values(&[kind.as_str()])
            .inc();
        tracing::info!(
            listing_id,
            admin_id,
            action = %kind,
            from = %listing.status,
            to = %updated.status,
            "Listing moderated"
        );

        Ok(updated)
    }

    /// Audit trail of a listing, oldest first
    pub async fn audit_trail(&self, listing_id: &str) -> Result<Vec<AdminAction>, AppError> {
        self.db.get_admin_actions_for_listing(listing_id).await
    }
}
