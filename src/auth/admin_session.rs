//! Operator login
//!
//! A single static credential pair from configuration, independent of the
//! federated identity provider. A successful login sets a signed,
//! HTTP-only `admin-session` cookie valid for 24 hours.

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use serde::Deserialize;

use super::middleware::ADMIN_SESSION_COOKIE;
use super::session::{AdminSession, create_token};
use crate::AppState;
use crate::api::ApiJson;
use crate::error::AppError;
use crate::metrics::ADMIN_LOGINS_TOTAL;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Operator login/logout routes
pub fn admin_login_router() -> Router<AppState> {
    Router::new().route("/admin/login", post(login).delete(logout))
}

fn session_cookie(token: String, secure: bool) -> Result<Cookie<'static>, AppError> {
    let mut cookie = Cookie::parse(format!(
        "{ADMIN_SESSION_COOKIE}={token}; Max-Age={}",
        AdminSession::MAX_AGE_SECONDS
    ))
    .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid session cookie: {e}")))?;
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(secure);
    cookie.set_path("/");
    Ok(cookie)
}

/// POST /api/admin/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin = &state.config.admin;
    let Some(expected_email) = admin.normalized_email().filter(|_| admin.is_configured()) else {
        ADMIN_LOGINS_TOTAL.with_label_values(&["unconfigured"]).inc();
        tracing::error!("Operator login attempted but credentials are not configured");
        return Err(AppError::Config(
            "Admin credentials not configured".to_string(),
        ));
    };

    let email = request.email.trim().to_lowercase();
    if email != expected_email || request.password != admin.password {
        ADMIN_LOGINS_TOTAL.with_label_values(&["failure"]).inc();
        tracing::warn!(email = %email, "Operator login failed");
        return Err(AppError::Unauthorized);
    }

    let token = create_token(&AdminSession::new(expected_email), &admin.session_secret)?;
    let cookie = session_cookie(token, state.config.should_use_secure_cookies())?;

    ADMIN_LOGINS_TOTAL.with_label_values(&["success"]).inc();
    tracing::info!("Operator logged in");

    Ok((jar.add(cookie), Json(serde_json::json!({ "success": true }))))
}

/// DELETE /api/admin/login
async fn logout(jar: CookieJar) -> impl IntoResponse {
    let removal = Cookie::build((ADMIN_SESSION_COOKIE, "")).path("/");
    tracing::info!("Operator logged out");
    (jar.remove(removal), Json(serde_json::json!({ "success": true })))
}
