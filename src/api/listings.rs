//! Listing endpoints
//!
//! Public browsing with redaction, plus host submission and editing.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::Serialize;

use super::dto::{
    CreateListingRequest, ListingResponse, ListingsQuery, ListingsResponse, SuccessResponse,
    UpdateListingRequest,
};
use super::extract::ApiJson;
use crate::AppState;
use crate::auth::{Actor, RequireAuth};
use crate::data::{Listing, ListingPatch, NewListing};
use crate::error::AppError;
use crate::service::{ListingService, ListingView, policy, visibility};

/// Create listings router
///
/// Routes:
/// - GET /listings - Approved listings (filtered), or all for admins with `all=true`
/// - POST /listings - Submit a listing (host/admin)
/// - GET /listings/host - Caller's own listings (host/admin)
/// - GET /listings/:id - One listing, redacted per caller
/// - PATCH /listings/:id - Edit (owner/admin)
/// - DELETE /listings/:id - Delete (owner/admin)
pub fn listings_router() -> Router<AppState> {
    Router::new()
        .route("/listings", get(list_listings).post(create_listing))
        .route("/listings/host", get(host_listings))
        .route(
            "/listings/:id",
            get(get_listing).patch(update_listing).delete(delete_listing),
        )
}

pub(super) fn build_listing_service(state: &AppState) -> ListingService {
    ListingService::new(state.db.clone(), state.config.listings.public_limit)
}

/// A full listing record
#[derive(Debug, Serialize)]
pub struct ListingRecordResponse {
    pub listing: Listing,
}

/// GET /api/listings
async fn list_listings(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ListingsResponse>, AppError> {
    let service = build_listing_service(&state);

    if query.wants_all() && actor.is_admin() {
        let listings = service.get_all().await?;
        return Ok(Json(ListingsResponse {
            listings: listings.into_iter().map(ListingView::Full).collect(),
        }));
    }

    let filter = query.filter()?;
    let listings = service.get_approved(&filter).await?;

    Ok(Json(ListingsResponse {
        listings: visibility::views_for(listings, &actor),
    }))
}

/// GET /api/listings/:id
///
/// Listings the caller may not see are reported as missing.
async fn get_listing(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<ListingResponse>, AppError> {
    let listing = build_listing_service(&state).get_by_id(&id).await?;
    let view = visibility::view_for(listing, &actor).ok_or(AppError::NotFound)?;

    Ok(Json(ListingResponse {
        listing: view,
        is_authenticated: actor.is_authenticated(),
    }))
}

/// POST /api/listings
async fn create_listing(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    ApiJson(request): ApiJson<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingRecordResponse>), AppError> {
    let input = NewListing::try_from(request)?;
    let listing = build_listing_service(&state).create(&actor, input).await?;

    Ok((StatusCode::CREATED, Json(ListingRecordResponse { listing })))
}

/// GET /api/listings/host
async fn host_listings(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
) -> Result<Json<ListingsResponse>, AppError> {
    if !policy::can_create_listing(actor.role) {
        return Err(AppError::ForbiddenWithReason(
            "Only hosts can manage listings".to_string(),
        ));
    }
    let host_id = actor.actor_id().ok_or(AppError::Unauthorized)?;
    let listings = build_listing_service(&state).get_by_host(host_id).await?;

    Ok(Json(ListingsResponse {
        listings: listings.into_iter().map(ListingView::Full).collect(),
    }))
}

/// PATCH /api/listings/:id
async fn update_listing(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateListingRequest>,
) -> Result<Json<ListingRecordResponse>, AppError> {
    let patch = ListingPatch::try_from(request)?;
    let listing = build_listing_service(&state)
        .update(&id, patch, &actor)
        .await?;

    Ok(Json(ListingRecordResponse { listing }))
}

/// DELETE /api/listings/:id
async fn delete_listing(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    build_listing_service(&state).delete(&id, &actor).await?;
    Ok(Json(SuccessResponse::ok()))
}
