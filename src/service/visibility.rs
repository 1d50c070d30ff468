//! Listing visibility and redaction
//!
//! Non-approved listings are only visible to their owner and to admins;
//! everyone else gets "not found". Anonymous callers see a reduced set of
//! fields without contact details, exact address, owner or price tier.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::policy;
use crate::auth::ActorContext;
use crate::data::{Listing, ListingStatus, ListingType};

/// Fields of a listing safe to show anonymous callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicListing {
    pub id: String,
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub region: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub amenities: Vec<String>,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Listing> for PublicListing {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            listing_type: listing.listing_type,
            title: listing.title,
            description: listing.description,
            location: listing.location,
            city: listing.city,
            region: listing.region,
            images: listing.images,
            videos: listing.videos,
            amenities: listing.amenities,
            status: listing.status,
            created_at: listing.created_at,
        }
    }
}

/// A listing as returned to a particular caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListingView {
    Full(Listing),
    Public(PublicListing),
}

/// Whether the listing's existence may be revealed to `actor`
pub fn is_visible_to(listing: &Listing, actor: &ActorContext) -> bool {
    listing.status == ListingStatus::Approved || actor.is_admin() || actor.owns(listing)
}

/// Render `listing` for `actor`, or `None` when it must appear not to exist
pub fn view_for(listing: Listing, actor: &ActorContext) -> Option<ListingView> {
    if !is_visible_to(&listing, actor) {
        return None;
    }

    if policy::can_view_full_listing(actor.is_authenticated()) {
        Some(ListingView::Full(listing))
    } else {
        Some(ListingView::Public(listing.into()))
    }
}

/// Render a batch of listings for `actor`, dropping invisible ones
pub fn views_for(listings: Vec<Listing>, actor: &ActorContext) -> Vec<ListingView> {
    listings
        .into_iter()
        .filter_map(|listing| view_for(listing, actor))
        .collect()
}
