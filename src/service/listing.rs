//! Listing service
//!
//! Submission, retrieval, editing and deletion of listings. Status
//! changes caused by edits follow [`super::lifecycle::after_edit`];
//! moderation transitions live in [`super::ModerationService`].

use std::sync::Arc;

use chrono::Utc;

use super::{lifecycle, policy};
use crate::auth::ActorContext;
use crate::data::{
    AdminAction, AdminActionKind, Database, EntityId, Listing, ListingFilter, ListingPatch,
    ListingStatus, NewListing,
};
use crate::error::AppError;
use crate::metrics::{LISTINGS_CREATED_TOTAL, MODERATION_ACTIONS_TOTAL};

/// Pick the thumbnail for a listing.
///
/// An explicit non-blank value wins. A current thumbnail is kept unless it
/// pointed at an entry of `previous_media` that is no longer among the
/// listing's images or videos; in that case, or when there is none, the
/// first image is used.
pub fn resolve_thumbnail(
    explicit: Option<&str>,
    current: Option<&str>,
    previous_media: &[String],
    images: &[String],
    videos: &[String],
) -> Option<String> {
    if let Some(explicit) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(explicit.to_string());
    }

    if let Some(current) = current {
        let still_present = images.iter().chain(videos).any(|media| media == current);
        let was_media = previous_media.iter().any(|media| media == current);
        if still_present || !was_media {
            return Some(current.to_string());
        }
    }

    images.first().cloned()
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.chars().any(char::is_whitespace)
}

fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn contact_email(value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if !trimmed.is_empty() && !looks_like_email(trimmed) {
        return Err(AppError::Validation(
            "contact_email is not a valid email address".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Merge a patch onto `listing`, validating every provided field.
///
/// Status and rejection reason are not touched here.
fn apply_patch(listing: &mut Listing, patch: ListingPatch) -> Result<(), AppError> {
    if let Some(listing_type) = patch.listing_type {
        listing.listing_type = listing_type;
    }
    if let Some(title) = patch.title {
        listing.title = required_text(&title, "title")?;
    }
    if let Some(description) = patch.description {
        listing.description = required_text(&description, "description")?;
    }
    if let Some(location) = patch.location {
        listing.location = required_text(&location, "location")?;
    }
    if let Some(city) = patch.city {
        listing.city = required_text(&city, "city")?;
    }
    if let Some(region) = patch.region {
        listing.region = required_text(&region, "region")?;
    }
    if let Some(full_address) = patch.full_address {
        listing.full_address = full_address.trim().to_string();
    }
    if let Some(price_range) = patch.price_range {
        listing.price_range = price_range;
    }
    if let Some(contact_phone) = patch.contact_phone {
        listing.contact_phone = contact_phone.trim().to_string();
    }
    if let Some(email) = patch.contact_email {
        listing.contact_email = contact_email(&email)?;
    }
    if let Some(external_link) = patch.external_link {
        listing.external_link = external_link.trim().to_string();
    }
    if let Some(amenities) = patch.amenities {
        listing.amenities = clean_list(amenities);
    }

    let media_changed = patch.images.is_some() || patch.videos.is_some();
    let previous_media: Vec<String> = if media_changed {
        listing.images.iter().chain(&listing.videos).cloned().collect()
    } else {
        Vec::new()
    };
    if let Some(images) = patch.images {
        listing.images = clean_list(images);
    }
    if let Some(videos) = patch.videos {
        listing.videos = clean_list(videos);
    }
    if media_changed || patch.thumbnail.is_some() {
        listing.thumbnail = resolve_thumbnail(
            patch.thumbnail.as_deref(),
            listing.thumbnail.as_deref(),
            &previous_media,
            &listing.images,
            &listing.videos,
        );
    }

    Ok(())
}

/// Listing service
pub struct ListingService {
    db: Arc<Database>,
    public_limit: usize,
}

impl ListingService {
    /// Create new listing service
    ///
    /// # Arguments
    /// * `public_limit` - Cap on results of the public approved-listing query
    pub fn new(db: Arc<Database>, public_limit: usize) -> Self {
        Self { db, public_limit }
    }

    /// Submit a new listing owned by `actor`.
    ///
    /// The listing always starts `pending` with no rejection reason.
    pub async fn create(&self, actor: &ActorContext, input: NewListing) -> Result<Listing, AppError> {
        actor.ensure_active()?;
        let host_id = actor.actor_id().ok_or(AppError::Unauthorized)?;
        if !policy::can_create_listing(actor.role) {
            return Err(AppError::ForbiddenWithReason(
                "Only hosts can create listings".to_string(),
            ));
        }

        let images = clean_list(input.images);
        let videos = clean_list(input.videos);
        let thumbnail = resolve_thumbnail(input.thumbnail.as_deref(), None, &[], &images, &videos);
        let now = Utc::now();

        let listing = Listing {
            id: EntityId::new().0,
            host_id: host_id.to_string(),
            listing_type: input.listing_type,
            title: required_text(&input.title, "title")?,
            description: required_text(&input.description, "description")?,
            location: required_text(&input.location, "location")?,
            city: required_text(&input.city, "city")?,
            region: required_text(&input.region, "region")?,
            full_address: input.full_address.trim().to_string(),
            price_range: input.price_range,
            contact_phone: input.contact_phone.trim().to_string(),
            contact_email: contact_email(&input.contact_email)?,
            external_link: input.external_link.trim().to_string(),
            images,
            videos,
            thumbnail,
            amenities: clean_list(input.amenities),
            status: ListingStatus::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_listing(&listing).await?;

        LISTINGS_CREATED_TOTAL.inc();
        tracing::info!(
            listing_id = %listing.id,
            host_id = %listing.host_id,
            listing_type = %listing.listing_type,
            "Listing submitted"
        );

        Ok(listing)
    }

    /// Get a listing by id, regardless of status
    pub async fn get_by_id(&self, id: &str) -> Result<Listing, AppError> {
        self.db.get_listing(id).await?.ok_or(AppError::NotFound)
    }

    /// A host's own listings, newest first
    pub async fn get_by_host(&self, host_id: &str) -> Result<Vec<Listing>, AppError> {
        self.db.get_listings_by_host(host_id).await
    }

    /// Approved listings matching the filter, newest first, capped
    pub async fn get_approved(&self, filter: &ListingFilter) -> Result<Vec<Listing>, AppError> {
        self.db.get_approved_listings(filter, self.public_limit).await
    }

    /// Moderation queue, oldest first
    pub async fn get_pending(&self) -> Result<Vec<Listing>, AppError> {
        self.db.get_pending_listings().await
    }

    /// Every listing, newest first
    pub async fn get_all(&self) -> Result<Vec<Listing>, AppError> {
        self.db.get_all_listings().await
    }

    /// Edit a listing's content.
    ///
    /// Owners may edit pending or rejected listings; editing a rejected
    /// listing resubmits it. Admin edits keep the current status and are
    /// recorded in the audit trail.
    ///
    /// # Errors
    /// `Validation` if the status changed between reading and writing the
    /// listing, e.g. an admin approved it mid-edit.
    pub async fn update(
        &self,
        id: &str,
        patch: ListingPatch,
        actor: &ActorContext,
    ) -> Result<Listing, AppError> {
        actor.ensure_active()?;
        let actor_id = actor.actor_id().ok_or(AppError::Unauthorized)?;
        let mut listing = self.get_by_id(id).await?;
        let is_owner = listing.is_owned_by(actor_id);
        let is_admin = actor.is_admin();

        if !policy::can_edit_listing(actor.role, is_owner, listing.status) {
            tracing::warn!(listing_id = id, actor_id, status = %listing.status, "Edit refused");
            if !is_owner && !is_admin {
                return Err(AppError::Forbidden);
            }
        }

        let transition =
            lifecycle::after_edit(listing.status, listing.rejection_reason.as_deref(), is_admin)?;

        apply_patch(&mut listing, patch)?;
        let previous_status = listing.status;
        listing.status = transition.status;
        listing.rejection_reason = transition.rejection_reason;
        listing.updated_at = Utc::now();

        let audit = is_admin.then(|| AdminAction {
            id: EntityId::new().0,
            listing_id: listing.id.clone(),
            admin_id: actor_id.to_string(),
            action: AdminActionKind::Edit,
            reason: None,
            created_at: listing.updated_at,
        });

        if !self
            .db
            .update_listing(&listing, previous_status, audit.as_ref())
            .await?
        {
            if self.db.get_listing(id).await?.is_none() {
                return Err(AppError::NotFound);
            }
            return Err(AppError::Validation(
                "Listing status changed concurrently; reload and retry".to_string(),
            ));
        }

        if audit.is_some() {
            MODERATION_ACTIONS_TOTAL
                .with_label_values(&[AdminActionKind::Edit.as_str()])
                .inc();
        }
        if previous_status != listing.status {
            tracing::info!(listing_id = id, from = %previous_status, to = %listing.status, "Listing resubmitted");
        } else {
            tracing::info!(listing_id = id, actor_id, "Listing updated");
        }

        Ok(listing)
    }

    /// Permanently delete a listing.
    ///
    /// Admin deletions leave an audit entry that outlives the listing.
    pub async fn delete(&self, id: &str, actor: &ActorContext) -> Result<(), AppError> {
        actor.ensure_active()?;
        let actor_id = actor.actor_id().ok_or(AppError::Unauthorized)?;
        let listing = self.get_by_id(id).await?;

        if !policy::can_delete_listing(actor.role, listing.is_owned_by(actor_id)) {
            return Err(AppError::Forbidden);
        }

        let audit = actor.is_admin().then(|| AdminAction {
            id: EntityId::new().0,
            listing_id: listing.id.clone(),
            admin_id: actor_id.to_string(),
            action: AdminActionKind::Delete,
            reason: None,
            created_at: Utc::now(),
        });

        if !self.db.delete_listing(id, audit.as_ref()).await? {
            return Err(AppError::NotFound);
        }

        if audit.is_some() {
            MODERATION_ACTIONS_TOTAL
                .with_label_values(&[AdminActionKind::Delete.as_str()])
                .inc();
        }
        tracing::info!(listing_id = id, actor_id, "Listing deleted");

        Ok(())
    }
}
