//! Admin API endpoints
//!
//! Listing moderation and user management.
//! All routes require an admin: operator session or stored `admin` role.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;

use super::dto::{
    AdminListingsQuery, AdminUserResponse, RejectRequest, UpdateUserRequest, UsersQuery,
    UsersResponse,
};
use super::extract::ApiJson;
use super::listings::{ListingRecordResponse, build_listing_service};
use crate::AppState;
use crate::auth::RequireAdmin;
use crate::data::{AdminAction, Listing};
use crate::error::AppError;
use crate::service::{ModerationAction, ModerationService, RoleService, UserDirectory};

/// Create admin router
///
/// Routes:
/// - GET /admin/listings - All listings, or the pending queue with `pending=true`
/// - POST /admin/listings/:id/approve - Approve
/// - POST /admin/listings/:id/reject - Reject (body: `reason`)
/// - POST /admin/listings/:id/delist - Delist
/// - GET /admin/listings/:id/actions - Audit trail
/// - GET /admin/users - Users, optionally by `role`
/// - GET /admin/users/:id - One user
/// - PATCH /admin/users/:id - Change role and/or suspension
pub fn admin_router() -> Router<AppState> {
    Router::new()
        // Moderation
        .route("/admin/listings", get(list_listings))
        .route("/admin/listings/:id/approve", post(approve_listing))
        .route("/admin/listings/:id/reject", post(reject_listing))
        .route("/admin/listings/:id/delist", post(delist_listing))
        .route("/admin/listings/:id/actions", get(listing_actions))
        // Users
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id", get(get_user).patch(update_user))
}

fn build_moderation_service(state: &AppState) -> ModerationService {
    ModerationService::new(state.db.clone())
}

fn build_user_directory(state: &AppState) -> UserDirectory {
    UserDirectory::new(state.db.clone(), state.identity.clone())
}

// =============================================================================
// Moderation
// =============================================================================

#[derive(Debug, Serialize)]
pub struct AdminListingsResponse {
    pub listings: Vec<Listing>,
}

#[derive(Debug, Serialize)]
pub struct AdminActionsResponse {
    pub actions: Vec<AdminAction>,
}

/// GET /api/admin/listings
async fn list_listings(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<AdminListingsQuery>,
) -> Result<Json<AdminListingsResponse>, AppError> {
    let service = build_listing_service(&state);
    let listings = if query.pending.as_deref() == Some("true") {
        service.get_pending().await?
    } else {
        service.get_all().await?
    };

    Ok(Json(AdminListingsResponse { listings }))
}

/// POST /api/admin/listings/:id/approve
async fn approve_listing(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<ListingRecordResponse>, AppError> {
    let listing = build_moderation_service(&state)
        .moderate(&id, ModerationAction::Approve, &admin)
        .await?;
    Ok(Json(ListingRecordResponse { listing }))
}

/// POST /api/admin/listings/:id/reject
async fn reject_listing(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<RejectRequest>,
) -> Result<Json<ListingRecordResponse>, AppError> {
    let action = ModerationAction::reject(request.reason.as_deref())?;
    let listing = build_moderation_service(&state)
        .moderate(&id, action, &admin)
        .await?;
    Ok(Json(ListingRecordResponse { listing }))
}

/// POST /api/admin/listings/:id/delist
async fn delist_listing(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<ListingRecordResponse>, AppError> {
    let listing = build_moderation_service(&state)
        .moderate(&id, ModerationAction::Delist, &admin)
        .await?;
    Ok(Json(ListingRecordResponse { listing }))
}

/// GET /api/admin/listings/:id/actions
///
/// Entries survive deletion of the listing itself.
async fn listing_actions(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<AdminActionsResponse>, AppError> {
    let actions = build_moderation_service(&state).audit_trail(&id).await?;
    Ok(Json(AdminActionsResponse { actions }))
}

// =============================================================================
// Users
// =============================================================================

/// GET /api/admin/users
async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<UsersQuery>,
) -> Result<Json<UsersResponse>, AppError> {
    let records = RoleService::new(state.db.clone())
        .list(query.role()?)
        .await?;
    let directory = build_user_directory(&state);

    let mut users = Vec::with_capacity(records.len());
    for record in &records {
        let entry = directory.resolve(&record.user_id, Some(record)).await?;
        users.push(AdminUserResponse::new(&record.user_id, Some(record), entry));
    }

    Ok(Json(UsersResponse { users }))
}

async fn load_user(state: &AppState, user_id: &str) -> Result<AdminUserResponse, AppError> {
    let record = RoleService::new(state.db.clone()).get_record(user_id).await?;
    let entry = build_user_directory(state)
        .resolve(user_id, record.as_ref())
        .await?;

    if record.is_none() && entry.is_empty() {
        return Err(AppError::NotFound);
    }

    Ok(AdminUserResponse::new(user_id, record.as_ref(), entry))
}

/// GET /api/admin/users/:id
async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<AdminUserResponse>, AppError> {
    Ok(Json(load_user(&state, &id).await?))
}

/// PATCH /api/admin/users/:id
async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<AdminUserResponse>, AppError> {
    admin.ensure_active()?;
    let (role, suspended) = request.into_parts()?;
    let roles = RoleService::new(state.db.clone());

    if let Some(role) = role {
        roles.set_role(&id, role, None, None).await?;
    }
    if let Some(suspended) = suspended {
        roles.suspend(&id, suspended).await?;
    }

    tracing::info!(
        user_id = %id,
        admin_id = admin.actor_id().unwrap_or_default(),
        role = ?role,
        suspended = ?suspended,
        "User updated by admin"
    );

    Ok(Json(load_user(&state, &id).await?))
}
