//! Request actor resolution
//!
//! Resolves who is calling exactly once per request and caches the
//! result in request extensions. Handlers receive it through the
//! [`Actor`], [`RequireAuth`] and [`RequireAdmin`] extractors.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;

use super::identity::Identity;
use super::session::{AdminSession, verify_token};
use crate::AppState;
use crate::data::{Listing, Role};
use crate::error::AppError;
use crate::service::RoleService;

/// Cookie carrying the federated identity token
pub const IDENTITY_COOKIE: &str = "session";
/// Cookie carrying the signed operator session
pub const ADMIN_SESSION_COOKIE: &str = "admin-session";
/// Actor id recorded for operator-session actions
pub const OPERATOR_ACTOR_ID: &str = "admin";

fn extract_identity_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(IDENTITY_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
}

fn extract_admin_session(headers: &HeaderMap, secret: &str) -> Option<AdminSession> {
    let jar = CookieJar::from_headers(headers);
    let token = jar.get(ADMIN_SESSION_COOKIE)?.value().to_owned();
    match verify_token::<AdminSession>(&token, secret) {
        Ok(session) => Some(session),
        Err(error) => {
            tracing::debug!(%error, "Ignoring invalid admin session cookie");
            None
        }
    }
}

/// Who is calling, resolved once per request
#[derive(Debug, Clone, PartialEq)]
pub struct ActorContext {
    /// Federated identity, if any
    pub identity: Option<Identity>,
    pub role: Role,
    /// Authenticated through the operator credential
    pub is_admin_session: bool,
    pub is_suspended: bool,
}

impl ActorContext {
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            role: Role::User,
            is_admin_session: false,
            is_suspended: false,
        }
    }

    /// Operator session. Operators are never suspended.
    pub fn operator() -> Self {
        Self {
            identity: None,
            role: Role::Admin,
            is_admin_session: true,
            is_suspended: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.is_admin_session || self.identity.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin_session || self.role == Role::Admin
    }

    /// Id recorded as owner or audit actor
    pub fn actor_id(&self) -> Option<&str> {
        if self.is_admin_session {
            Some(OPERATOR_ACTOR_ID)
        } else {
            self.identity.as_ref().map(|identity| identity.id.as_str())
        }
    }

    pub fn owns(&self, listing: &Listing) -> bool {
        self.actor_id().is_some_and(|id| listing.is_owned_by(id))
    }

    /// Suspended identities keep read access but may not mutate anything.
    pub fn ensure_active(&self) -> Result<(), AppError> {
        if self.is_suspended {
            return Err(AppError::ForbiddenWithReason(
                "Account suspended".to_string(),
            ));
        }
        Ok(())
    }
}

async fn resolve_actor(parts: &Parts, state: &AppState) -> Result<ActorContext, AppError> {
    if extract_admin_session(&parts.headers, &state.config.admin.session_secret).is_some() {
        return Ok(ActorContext::operator());
    }

    let Some(token) = extract_identity_token(&parts.headers) else {
        return Ok(ActorContext::anonymous());
    };

    let Some(identity) = state.identity.authenticate(&token).await? else {
        return Ok(ActorContext::anonymous());
    };

    let record = RoleService::new(state.db.clone())
        .ensure_record(&identity.id, Role::User, Some(&identity))
        .await?;

    Ok(ActorContext {
        role: record.role,
        is_suspended: record.is_suspended,
        identity: Some(identity),
        is_admin_session: false,
    })
}

async fn actor_from_parts<S>(parts: &mut Parts, state: &S) -> Result<ActorContext, AppError>
where
    AppState: FromRef<S>,
{
    if let Some(actor) = parts.extensions.get::<ActorContext>() {
        return Ok(actor.clone());
    }

    let app_state = AppState::from_ref(state);
    let actor = resolve_actor(parts, &app_state).await?;
    parts.extensions.insert(actor.clone());
    Ok(actor)
}

/// Any caller, authenticated or not
///
/// # Usage
/// ```ignore
/// async fn handler(Actor(actor): Actor) -> impl IntoResponse {
///     format!("authenticated: {}", actor.is_authenticated())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Actor(pub ActorContext);

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        actor_from_parts(parts, state).await.map(Actor)
    }
}

/// Authenticated caller; anonymous requests are rejected with 401
#[derive(Debug, Clone)]
pub struct RequireAuth(pub ActorContext);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = actor_from_parts(parts, state).await?;
        if !actor.is_authenticated() {
            return Err(AppError::Unauthorized);
        }
        Ok(RequireAuth(actor))
    }
}

/// Admin caller, through either the operator session or a stored `admin` role
///
/// Anonymous requests get 401, everyone else 403.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub ActorContext);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let actor = actor_from_parts(parts, state).await?;
        if !actor.is_authenticated() {
            return Err(AppError::Unauthorized);
        }
        if !actor.is_admin() {
            return Err(AppError::ForbiddenWithReason(
                "Admin access required".to_string(),
            ));
        }
        Ok(RequireAdmin(actor))
    }
}
