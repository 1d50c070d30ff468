//! API layer
//!
//! HTTP handlers for:
//! - Listings (public browsing, host submission)
//! - Admin API (moderation, user management)
//! - Current user (role initialization and upgrade)
//! - Metrics (Prometheus)

mod admin;
mod dto;
mod extract;
mod listings;
pub mod metrics;
mod user;

pub use dto::*;
pub use extract::ApiJson;

pub use admin::admin_router;
pub use listings::listings_router;
pub use metrics::metrics_router;
pub use user::user_router;
