//! API request and response DTOs
//!
//! Request bodies reject unknown fields. Conversion into domain types
//! parses the closed vocabularies and checks required fields.

use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::data::{ListingFilter, ListingPatch, ListingType, NewListing, Role, UserRoleRecord};
use crate::error::AppError;
use crate::service::{DirectoryEntry, ListingView};

/// Shown when no email could be resolved for a user
pub const NO_EMAIL: &str = "No email";

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_optional<T>(value: Option<String>) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr<Err = AppError>,
{
    non_blank(value).map(|v| v.parse()).transpose()
}

// =============================================================================
// Listings
// =============================================================================

/// Query for `GET /api/listings`
#[derive(Debug, Default, Deserialize)]
pub struct ListingsQuery {
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
    /// `true` lets admins see every listing
    pub all: Option<String>,
}

impl ListingsQuery {
    pub fn wants_all(&self) -> bool {
        self.all.as_deref() == Some("true")
    }

    /// Build the conjunctive filter; blank parameters are ignored.
    pub fn filter(&self) -> Result<ListingFilter, AppError> {
        Ok(ListingFilter {
            listing_type: parse_optional::<ListingType>(self.listing_type.clone())?,
            city: non_blank(self.city.clone()).map(|c| c.trim().to_string()),
            search: non_blank(self.search.clone()).map(|s| s.trim().to_string()),
        })
    }
}

/// Body of `POST /api/listings`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateListingRequest {
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub full_address: Option<String>,
    pub price_range: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub external_link: Option<String>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub amenities: Option<Vec<String>>,
}

impl TryFrom<CreateListingRequest> for NewListing {
    type Error = AppError;

    fn try_from(req: CreateListingRequest) -> Result<Self, Self::Error> {
        let missing = [
            ("type", &req.listing_type),
            ("title", &req.title),
            ("description", &req.description),
            ("location", &req.location),
            ("city", &req.city),
            ("region", &req.region),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(NewListing {
            listing_type: parse_optional(req.listing_type)?
                .ok_or_else(|| AppError::Validation("type is required".to_string()))?,
            title: req.title.unwrap_or_default(),
            description: req.description.unwrap_or_default(),
            location: req.location.unwrap_or_default(),
            city: req.city.unwrap_or_default(),
            region: req.region.unwrap_or_default(),
            full_address: req.full_address.unwrap_or_default(),
            price_range: parse_optional(req.price_range)?.unwrap_or_default(),
            contact_phone: req.contact_phone.unwrap_or_default(),
            contact_email: req.contact_email.unwrap_or_default(),
            external_link: req.external_link.unwrap_or_default(),
            images: req.images.unwrap_or_default(),
            videos: req.videos.unwrap_or_default(),
            thumbnail: req.thumbnail,
            amenities: req.amenities.unwrap_or_default(),
        })
    }
}

/// Body of `PATCH /api/listings/:id`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateListingRequest {
    #[serde(rename = "type")]
    pub listing_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub full_address: Option<String>,
    pub price_range: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub external_link: Option<String>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub thumbnail: Option<String>,
    pub amenities: Option<Vec<String>>,
    /// Accepted for client compatibility and ignored: status only changes
    /// through moderation or resubmission.
    #[serde(default, rename = "status")]
    pub _status: Option<IgnoredAny>,
    #[serde(default, rename = "rejection_reason")]
    pub _rejection_reason: Option<IgnoredAny>,
}

impl TryFrom<UpdateListingRequest> for ListingPatch {
    type Error = AppError;

    fn try_from(req: UpdateListingRequest) -> Result<Self, Self::Error> {
        Ok(ListingPatch {
            listing_type: req.listing_type.map(|t| t.parse()).transpose()?,
            title: req.title,
            description: req.description,
            location: req.location,
            city: req.city,
            region: req.region,
            full_address: req.full_address,
            price_range: req.price_range.map(|p| p.parse()).transpose()?,
            contact_phone: req.contact_phone,
            contact_email: req.contact_email,
            external_link: req.external_link,
            images: req.images,
            videos: req.videos,
            thumbnail: req.thumbnail,
            amenities: req.amenities,
        })
    }
}

/// Many listings, rendered for the caller
#[derive(Debug, Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<ListingView>,
}

/// One listing, rendered for the caller
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub listing: ListingView,
    pub is_authenticated: bool,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// =============================================================================
// Moderation
// =============================================================================

/// Query for `GET /api/admin/listings`
#[derive(Debug, Default, Deserialize)]
pub struct AdminListingsQuery {
    pub pending: Option<String>,
}

/// Body of `POST /api/admin/listings/:id/reject`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

// =============================================================================
// Users
// =============================================================================

/// Query for `GET /api/admin/users`
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub role: Option<String>,
}

impl UsersQuery {
    pub fn role(&self) -> Result<Option<Role>, AppError> {
        parse_optional(self.role.clone())
    }
}

/// Body of `PATCH /api/admin/users/:id`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub role: Option<String>,
    pub is_suspended: Option<bool>,
}

impl UpdateUserRequest {
    /// Parsed role and suspension flag; at least one must be present.
    pub fn into_parts(self) -> Result<(Option<Role>, Option<bool>), AppError> {
        if self.role.is_none() && self.is_suspended.is_none() {
            return Err(AppError::Validation(
                "Provide role and/or is_suspended".to_string(),
            ));
        }
        let role = self.role.map(|r| r.parse::<Role>()).transpose()?;
        Ok((role, self.is_suspended))
    }
}

/// A user as shown to admins
#[derive(Debug, Serialize)]
pub struct AdminUserResponse {
    pub user_id: String,
    pub role: Role,
    pub is_suspended: bool,
    pub email: String,
    pub display_name: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl AdminUserResponse {
    /// Combine a role record (if any) with resolved directory data.
    pub fn new(user_id: &str, record: Option<&UserRoleRecord>, entry: DirectoryEntry) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: record.map(|r| r.role).unwrap_or_default(),
            is_suspended: record.is_some_and(|r| r.is_suspended),
            email: entry.email.unwrap_or_else(|| NO_EMAIL.to_string()),
            display_name: entry.display_name,
            created_at: record.map(|r| r.created_at),
            updated_at: record.map(|r| r.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<AdminUserResponse>,
}

/// Body of `POST /api/user/role`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleRequest {
    pub requested_role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initialized: Option<bool>,
}
