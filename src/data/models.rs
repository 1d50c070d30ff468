//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.
//!
//! Closed vocabularies (roles, listing types, price tiers, statuses) are
//! enums; they are stored as lowercase TEXT and parsed when rows are read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares a string-backed enum with `as_str`, `FromStr`, `Display` and
/// lowercase serde names.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$variant_meta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($(#[$variant_meta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::Validation(format!(
                        "unknown {}: {}",
                        $label, other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// =============================================================================
// Roles
// =============================================================================

text_enum! {
    /// Authorization role of a user
    #[derive(Default)]
    Role, "role" {
        #[default]
        User => "user",
        Host => "host",
        Admin => "admin",
    }
}

/// Role record for an identity-provider user
///
/// Exactly one record per `user_id`. A missing record means role `user`.
#[derive(Debug, Clone, Serialize)]
pub struct UserRoleRecord {
    pub user_id: String,
    pub role: Role,
    pub is_suspended: bool,
    /// Cached copy of the provider's primary email
    pub email: Option<String>,
    /// Cached copy of the provider's display name
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRoleRow {
    pub user_id: String,
    pub role: String,
    pub is_suspended: bool,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRoleRow> for UserRoleRecord {
    type Error = AppError;

    fn try_from(row: UserRoleRow) -> Result<Self, Self::Error> {
        Ok(Self {
            role: parse_column(&row.role, "user_roles.role")?,
            user_id: row.user_id,
            is_suspended: row.is_suspended,
            email: row.email,
            display_name: row.display_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Listings
// =============================================================================

text_enum! {
    /// Listing category
    ListingType, "listing type" {
        Accommodation => "accommodation",
        Attraction => "attraction",
        Tour => "tour",
        Party => "party",
        Festival => "festival",
        Restaurant => "restaurant",
        Event => "event",
        LiveMusic => "live_music",
        ArtCulture => "art_culture",
        Sport => "sport",
        Shopping => "shopping",
        Nightlife => "nightlife",
        Beach => "beach",
        Mountain => "mountain",
        Nature => "nature",
    }
}

text_enum! {
    /// Price tier shown to travelers
    #[derive(Default)]
    PriceRange, "price range" {
        Free => "free",
        Budget => "budget",
        #[default]
        Moderate => "moderate",
        Premium => "premium",
        Luxury => "luxury",
    }
}

text_enum! {
    /// Moderation status of a listing
    ListingStatus, "listing status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Delisted => "delisted",
    }
}

/// A host-submitted listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub id: String,
    pub host_id: String,
    #[serde(rename = "type")]
    pub listing_type: ListingType,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub region: String,
    pub full_address: String,
    pub price_range: PriceRange,
    pub contact_phone: String,
    pub contact_email: String,
    pub external_link: String,
    /// Ordered image URLs
    pub images: Vec<String>,
    /// Ordered video URLs
    pub videos: Vec<String>,
    pub thumbnail: Option<String>,
    pub amenities: Vec<String>,
    pub status: ListingStatus,
    /// Set only while `status == rejected`
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    /// Substring match over title, description, city, region and location.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_search(&self, needle: &str) -> bool {
        [
            &self.title,
            &self.description,
            &self.city,
            &self.region,
            &self.location,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ListingRow {
    pub id: String,
    pub host_id: String,
    #[sqlx(rename = "type")]
    pub listing_type: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub region: String,
    pub full_address: String,
    pub price_range: String,
    pub contact_phone: String,
    pub contact_email: String,
    pub external_link: String,
    pub images: String,
    pub videos: String,
    pub thumbnail: Option<String>,
    pub amenities: String,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = AppError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Self {
            listing_type: parse_column(&row.listing_type, "listings.type")?,
            price_range: parse_column(&row.price_range, "listings.price_range")?,
            status: parse_column(&row.status, "listings.status")?,
            images: parse_string_list(&row.images, "listings.images")?,
            videos: parse_string_list(&row.videos, "listings.videos")?,
            amenities: parse_string_list(&row.amenities, "listings.amenities")?,
            id: row.id,
            host_id: row.host_id,
            title: row.title,
            description: row.description,
            location: row.location,
            city: row.city,
            region: row.region,
            full_address: row.full_address,
            contact_phone: row.contact_phone,
            contact_email: row.contact_email,
            external_link: row.external_link,
            thumbnail: row.thumbnail,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Fields a host supplies when submitting a listing
///
/// Owner, status, rejection reason, id and timestamps are never
/// caller-supplied.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub listing_type: ListingType,
    pub title: String,
    pub description: String,
    pub location: String,
    pub city: String,
    pub region: String,
    pub full_address: String,
    pub price_range: PriceRange,
    pub contact_phone: String,
    pub contact_email: String,
    pub external_link: String,
    pub images: Vec<String>,
    pub videos: Vec<String>,
    pub thumbnail: Option<String>,
    pub amenities: Vec<String>,
}

/// Partial update of a listing's content
///
/// `None` leaves a field unchanged. Status changes are not expressible
/// here; they go through moderation or the resubmission rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPatch {
    pub listing_type: Option<ListingType>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub full_address: Option<String>,
    pub price_range: Option<PriceRange>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub external_link: Option<String>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub amenities: Option<Vec<String>>,
}

impl ListingPatch {
    pub fn is_empty(&self) -> bool {
        self == &ListingPatch::default()
    }
}

/// Conjunctive filter for the public listing query
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub listing_type: Option<ListingType>,
    pub city: Option<String>,
    /// Case-insensitive substring over title, description, city, region, location
    pub search: Option<String>,
}

// =============================================================================
// Admin action log
// =============================================================================

text_enum! {
    /// Kind of moderation action recorded in the audit trail
    AdminActionKind, "admin action" {
        Approve => "approve",
        Reject => "reject",
        Delist => "delist",
        Delete => "delete",
        Edit => "edit",
    }
}

/// Append-only audit entry written for every admin moderation action
#[derive(Debug, Clone, Serialize)]
pub struct AdminAction {
    pub id: String,
    pub listing_id: String,
    pub admin_id: String,
    pub action: AdminActionKind,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AdminActionRow {
    pub id: String,
    pub listing_id: String,
    pub admin_id: String,
    pub action: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AdminActionRow> for AdminAction {
    type Error = AppError;

    fn try_from(row: AdminActionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            action: parse_column(&row.action, "admin_actions.action")?,
            id: row.id,
            listing_id: row.listing_id,
            admin_id: row.admin_id,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Identity directory mirror
// =============================================================================

/// Row of the identity provider's synced user directory
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncedIdentity {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    /// Raw provider payload; may carry `primaryEmail` / `displayName`
    pub raw_json: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Helpers
// =============================================================================

/// Stored enum values are written by this crate only; an unknown value is
/// data corruption, not a client error.
fn parse_column<T: FromStr>(value: &str, column: &str) -> Result<T, AppError> {
    value.parse().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "unexpected value {value:?} in column {column}"
        ))
    })
}

fn parse_string_list(raw: &str, column: &str) -> Result<Vec<String>, AppError> {
    serde_json::from_str(raw).map_err(|error| {
        AppError::Internal(anyhow::anyhow!("malformed JSON list in {column}: {error}"))
    })
}

pub(crate) fn encode_string_list(values: &[String]) -> Result<String, AppError> {
    serde_json::to_string(values).map_err(|e| AppError::Internal(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_type_round_trips_through_text() {
        for listing_type in ListingType::ALL {
            assert_eq!(
                listing_type.as_str().parse::<ListingType>().unwrap(),
                *listing_type
            );
        }
        assert_eq!(ListingType::ALL.len(), 15);
    }

    #[test]
    fn role_parsing_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(" Host ".parse::<Role>().unwrap(), Role::Host);
        let error = "superuser".parse::<Role>().unwrap_err();
        assert!(matches!(error, AppError::Validation(msg) if msg.contains("superuser")));
    }

    #[test]
    fn defaults_match_submission_rules() {
        assert_eq!(Role::default(), Role::User);
        assert_eq!(PriceRange::default(), PriceRange::Moderate);
    }

    fn oud_night() -> Listing {
        let now = Utc::now();
        Listing {
            id: "l1".to_string(),
            host_id: "h1".to_string(),
            listing_type: ListingType::LiveMusic,
            title: "Oud night".to_string(),
            description: "Live oud".to_string(),
            location: "Mutanabbi Street".to_string(),
            city: "Baghdad".to_string(),
            region: "Baghdad".to_string(),
            full_address: String::new(),
            price_range: PriceRange::Free,
            contact_phone: String::new(),
            contact_email: String::new(),
            external_link: String::new(),
            images: vec![],
            videos: vec![],
            thumbnail: None,
            amenities: vec![],
            status: ListingStatus::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn listing_serializes_kind_under_type_key() {
        let listing = oud_night();

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["type"], "live_music");
        assert_eq!(json["price_range"], "free");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn search_folds_case_across_text_fields() {
        let mut listing = oud_night();
        listing.title = "Café Oud Night".to_string();

        assert!(listing.matches_search(&"CAFÉ".to_lowercase()));
        assert!(listing.matches_search("mutanabbi"));
        assert!(!listing.matches_search("erbil"));
    }

    #[test]
    fn malformed_list_column_is_internal_error() {
        let error = parse_string_list("not json", "listings.images").unwrap_err();
        assert!(matches!(error, AppError::Internal(_)));
    }
}
