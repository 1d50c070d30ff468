//! Role service
//!
//! Authorization roles and suspension flags for identity-provider users.
//! Every call reads or writes durable state; nothing is cached in memory.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::Identity;
use crate::data::{Database, Role, UserRoleRecord};
use crate::error::AppError;
use crate::metrics::ROLE_CHANGES_TOTAL;

/// Role service
pub struct RoleService {
    db: Arc<Database>,
}

impl RoleService {
    /// Create new role service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stored role, or `user` when no record exists
    pub async fn get_role(&self, user_id: &str) -> Result<Role, AppError> {
        Ok(self
            .db
            .get_user_role(user_id)
            .await?
            .map(|record| record.role)
            .unwrap_or_default())
    }

    /// Full role record, if one exists
    pub async fn get_record(&self, user_id: &str) -> Result<Option<UserRoleRecord>, AppError> {
        self.db.get_user_role(user_id).await
    }

    /// Assign a role.
    ///
    /// Cached email/display name are only replaced by provided values;
    /// `None` never erases what is already stored.
    pub async fn set_role(
        &self,
        user_id: &str,
        role: Role,
        email: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<(), AppError> {
        self.db
            .upsert_user_role(user_id, role, email, display_name, Utc::now())
            .await?;

        ROLE_CHANGES_TOTAL.with_label_values(&[role.as_str()]).inc();
        tracing::info!(user_id, role = %role, "Role assigned");
        Ok(())
    }

    /// Create the record with `default` if absent; otherwise return what is stored.
    ///
    /// When a profile is supplied, missing cached email/display name are
    /// backfilled from it.
    pub async fn ensure_role(
        &self,
        user_id: &str,
        default: Role,
        profile: Option<&Identity>,
    ) -> Result<Role, AppError> {
        Ok(self.ensure_record(user_id, default, profile).await?.role)
    }

    /// Same as [`RoleService::ensure_role`], returning the whole record.
    pub async fn ensure_record(
        &self,
        user_id: &str,
        default: Role,
        profile: Option<&Identity>,
    ) -> Result<UserRoleRecord, AppError> {
        let email = profile.and_then(|p| p.email.as_deref());
        let display_name = profile.and_then(|p| p.display_name.as_deref());
        let now = Utc::now();

        let inserted = self
            .db
            .insert_user_role_if_absent(user_id, default, email, display_name, now)
            .await?;

        if inserted {
            tracing::info!(user_id, role = %default, "Role record initialized");
        } else if email.is_some() || display_name.is_some() {
            self.db
                .backfill_user_profile(user_id, email, display_name, now)
                .await?;
        }

        self.db.get_user_role(user_id).await?.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("role record for {user_id} vanished"))
        })
    }

    pub async fn is_suspended(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(self
            .db
            .get_user_role(user_id)
            .await?
            .is_some_and(|record| record.is_suspended))
    }

    /// Set or clear the suspension flag
    pub async fn suspend(&self, user_id: &str, suspended: bool) -> Result<(), AppError> {
        self.db
            .set_user_suspended(user_id, suspended, Utc::now())
            .await?;
        tracing::info!(user_id, suspended, "Suspension updated");
        Ok(())
    }

    /// Self-service upgrade to `host`.
    ///
    /// Admins cannot downgrade themselves through this path.
    pub async fn request_host(&self, identity: &Identity) -> Result<Role, AppError> {
        let current = self.get_role(&identity.id).await?;
        if current == Role::Admin {
            return Err(AppError::ForbiddenWithReason(
                "Cannot change admin role".to_string(),
            ));
        }

        if current != Role::Host {
            self.set_role(
                &identity.id,
                Role::Host,
                identity.email.as_deref(),
                identity.display_name.as_deref(),
            )
            .await?;
        }

        Ok(Role::Host)
    }

    /// All role records, newest first, optionally restricted to one role
    pub async fn list(&self, role: Option<Role>) -> Result<Vec<UserRoleRecord>, AppError> {
        self.db.list_user_roles(role).await
    }
}
