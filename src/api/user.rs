//! Current-user endpoints
//!
//! Role initialization on first login and the self-service host upgrade.

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::{get, post},
};

use super::dto::{RoleRequest, RoleResponse};
use super::extract::ApiJson;
use crate::AppState;
use crate::auth::RequireAuth;
use crate::data::Role;
use crate::error::AppError;
use crate::service::RoleService;

/// Create user router
///
/// Routes:
/// - POST /user/init - Ensure a role record exists
/// - GET /user/role - Current role
/// - POST /user/role - Request the `host` role
pub fn user_router() -> Router<AppState> {
    Router::new()
        .route("/user/init", post(init_user))
        .route("/user/role", get(get_role).post(request_role))
}

/// POST /api/user/init
///
/// Actor resolution already created the record; this reports it.
async fn init_user(RequireAuth(actor): RequireAuth) -> Json<RoleResponse> {
    Json(RoleResponse {
        role: actor.role,
        initialized: Some(true),
    })
}

/// GET /api/user/role
async fn get_role(RequireAuth(actor): RequireAuth) -> Json<RoleResponse> {
    Json(RoleResponse {
        role: actor.role,
        initialized: None,
    })
}

/// POST /api/user/role
async fn request_role(
    State(state): State<AppState>,
    RequireAuth(actor): RequireAuth,
    ApiJson(request): ApiJson<RoleRequest>,
) -> Result<Json<RoleResponse>, AppError> {
    if request.requested_role.as_deref().map(str::trim) != Some(Role::Host.as_str()) {
        return Err(AppError::Validation("Invalid role request".to_string()));
    }
    actor.ensure_active()?;

    let Some(identity) = actor.identity.as_ref() else {
        return Err(AppError::ForbiddenWithReason(
            "Cannot change admin role".to_string(),
        ));
    };

    let role = RoleService::new(state.db.clone())
        .request_host(identity)
        .await?;

    Ok(Json(RoleResponse {
        role,
        initialized: None,
    }))
}
