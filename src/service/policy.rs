//! Authorization policy
//!
//! Pure decisions over already-resolved facts (role, ownership, status).
//! No I/O happens here.

use crate::data::{ListingStatus, Role};

pub fn can_create_listing(role: Role) -> bool {
    matches!(role, Role::Host | Role::Admin)
}

/// Owners may edit while the listing is pending or rejected; admins always.
pub fn can_edit_listing(role: Role, is_owner: bool, status: ListingStatus) -> bool {
    let is_admin = role == Role::Admin;
    (is_owner || is_admin)
        && (is_admin || matches!(status, ListingStatus::Pending | ListingStatus::Rejected))
}

pub fn can_delete_listing(role: Role, is_owner: bool) -> bool {
    is_owner || role == Role::Admin
}

/// Contact details and exact address require any authenticated caller.
pub fn can_view_full_listing(is_authenticated: bool) -> bool {
    is_authenticated
}

pub fn can_moderate(role: Role) -> bool {
    role == Role::Admin
}
