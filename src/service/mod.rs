//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services orchestrate database access, authorization policy and the
//! listing lifecycle.

mod directory;
pub mod lifecycle;
mod listing;
mod moderation;
pub mod policy;
mod role;
pub mod visibility;

pub use directory::{DirectoryEntry, UserDirectory};
pub use lifecycle::ModerationAction;
pub use listing::{ListingService, resolve_thumbnail};
pub use moderation::ModerationService;
pub use role::RoleService;
pub use visibility::{ListingView, PublicListing};
