//! Authentication
//!
//! Handles:
//! - Federated identity tokens (identity provider adapter)
//! - Operator login with a static credential pair
//! - Per-request actor resolution

mod admin_session;
mod identity;
mod middleware;
pub mod session;

pub use admin_session::admin_login_router;
#[cfg(test)]
pub use identity::MockIdentityProvider;
pub use identity::{Identity, IdentityProvider, SignedTokenProvider};
pub use middleware::{
    ADMIN_SESSION_COOKIE, Actor, ActorContext, IDENTITY_COOKIE, OPERATOR_ACTOR_ID, RequireAdmin,
    RequireAuth,
};
pub use session::{AdminSession, IdentityClaims, create_token, verify_token};
