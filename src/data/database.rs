//! SQLite database operations
//!
//! All database access goes through this module.
//! Multi-statement writes (status change plus audit entry) run in a
//! single transaction; everything else is one statement per call.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;
use crate::metrics::record_query;

const LISTING_COLUMNS: &str = r#"
    id, host_id, type, title, description, location, city, region,
    full_address, price_range, contact_phone, contact_email, external_link,
    images, videos, thumbnail, amenities, status, rejection_reason,
    created_at, updated_at
"#;

fn rows_to_listings(rows: Vec<ListingRow>) -> Result<Vec<Listing>, AppError> {
    rows.into_iter().map(Listing::try_from).collect()
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // User roles
    // =========================================================================

    /// Get the role record for a user, if one exists
    pub async fn get_user_role(&self, user_id: &str) -> Result<Option<UserRoleRecord>, AppError> {
        record_query("SELECT", "user_roles");
        let row = sqlx::query_as::<_, UserRoleRow>("SELECT * FROM user_roles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRoleRecord::try_from).transpose()
    }

    /// Insert or update a role record in one atomic statement.
    ///
    /// On conflict the role is overwritten while cached email/display name
    /// are only replaced by non-null values.
    pub async fn upsert_user_role(
        &self,
        user_id: &str,
        role: Role,
        email: Option<&str>,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        record_query("UPSERT", "user_roles");
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role, is_suspended, email, display_name, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                role = excluded.role,
                email = COALESCE(excluded.email, user_roles.email),
                display_name = COALESCE(excluded.display_name, user_roles.display_name),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .bind(email)
        .bind(display_name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a role record only when none exists for the user.
    ///
    /// # Returns
    /// `true` if inserted, `false` if a record already existed.
    pub async fn insert_user_role_if_absent(
        &self,
        user_id: &str,
        role: Role,
        email: Option<&str>,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        record_query("INSERT", "user_roles");
        let result = sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role, is_suspended, email, display_name, created_at, updated_at)
            VALUES (?, ?, 0, ?, ?, ?, ?)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(role.as_str())
        .bind(email)
        .bind(display_name)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Fill missing cached profile values without touching present ones.
    ///
    /// # Returns
    /// `true` if a row changed.
    pub async fn backfill_user_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
        display_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        record_query("UPDATE", "user_roles");
        let result = sqlx::query(
            r#"
            UPDATE user_roles
            SET email = COALESCE(email, ?),
                display_name = COALESCE(display_name, ?),
                updated_at = ?
            WHERE user_id = ?
              AND ((email IS NULL AND ? IS NOT NULL)
                OR (display_name IS NULL AND ? IS NOT NULL))
            "#,
        )
        .bind(email)
        .bind(display_name)
        .bind(now)
        .bind(user_id)
        .bind(email)
        .bind(display_name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Set the suspension flag, creating a `user` record when none exists.
    pub async fn set_user_suspended(
        &self,
        user_id: &str,
        suspended: bool,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        record_query("UPSERT", "user_roles");
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role, is_suspended, created_at, updated_at)
            VALUES (?, 'user', ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                is_suspended = excluded.is_suspended,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(suspended)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List role records, newest first, optionally restricted to one role
    pub async fn list_user_roles(&self, role: Option<Role>) -> Result<Vec<UserRoleRecord>, AppError> {
        record_query("SELECT", "user_roles");
        let rows = match role {
            Some(role) => {
                sqlx::query_as::<_, UserRoleRow>(
                    "SELECT * FROM user_roles WHERE role = ? ORDER BY created_at DESC, user_id DESC",
                )
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, UserRoleRow>(
                    "SELECT * FROM user_roles ORDER BY created_at DESC, user_id DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(UserRoleRecord::try_from).collect()
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Insert a fully-formed listing
    pub async fn insert_listing(&self, listing: &Listing) -> Result<(), AppError> {
        record_query("INSERT", "listings");
        let images = encode_string_list(&listing.images)?;
        let videos = encode_string_list(&listing.videos)?;
        let amenities = encode_string_list(&listing.amenities)?;

        sqlx::query(&format!(
            "INSERT INTO listings ({LISTING_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&listing.id)
        .bind(&listing.host_id)
        .bind(listing.listing_type.as_str())
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(&listing.location)
        .bind(&listing.city)
        .bind(&listing.region)
        .bind(&listing.full_address)
        .bind(listing.price_range.as_str())
        .bind(&listing.contact_phone)
        .bind(&listing.contact_email)
        .bind(&listing.external_link)
        .bind(images)
        .bind(videos)
        .bind(&listing.thumbnail)
        .bind(amenities)
        .bind(listing.status.as_str())
        .bind(&listing.rejection_reason)
        .bind(listing.created_at)
        .bind(listing.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get listing by ID
    pub async fn get_listing(&self, id: &str) -> Result<Option<Listing>, AppError> {
        record_query("SELECT", "listings");
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Listing::try_from).transpose()
    }

    /// Get a host's listings, newest first
    pub async fn get_listings_by_host(&self, host_id: &str) -> Result<Vec<Listing>, AppError> {
        record_query("SELECT", "listings");
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE host_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(host_id)
        .fetch_all(&self.pool)
        .await?;

        rows_to_listings(rows)
    }

    /// Get approved listings matching every provided filter, newest first
    ///
    /// # Arguments
    /// * `filter` - Conjunctive type/city/free-text filter
    /// * `limit` - Maximum number of results
    pub async fn get_approved_listings(
        &self,
        filter: &ListingFilter,
        limit: usize,
    ) -> Result<Vec<Listing>, AppError> {
        record_query("SELECT", "listings");
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE status = 'approved'"
        ));

        if let Some(listing_type) = filter.listing_type {
            builder.push(" AND type = ").push_bind(listing_type.as_str());
        }

        if let Some(city) = filter.city.as_deref() {
            builder.push(" AND city = ").push_bind(city.to_string());
        }

        builder.push(" ORDER BY created_at DESC, id DESC");

        // SQLite only folds ASCII case, so search runs here with Unicode folding
        // and the limit applies after matching.
        let needle = filter.search.as_deref().map(str::to_lowercase);
        if needle.is_none() {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder
            .build_query_as::<ListingRow>()
            .fetch_all(&self.pool)
            .await?;
        let listings = rows_to_listings(rows)?;

        Ok(match needle {
            Some(needle) => listings
                .into_iter()
                .filter(|listing| listing.matches_search(&needle))
                .take(limit)
                .collect(),
            None => listings,
        })
    }

    /// Get listings awaiting moderation, oldest first
    pub async fn get_pending_listings(&self) -> Result<Vec<Listing>, AppError> {
        record_query("SELECT", "listings");
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE status = 'pending' \
             ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows_to_listings(rows)
    }

    /// Get every listing regardless of status, newest first
    pub async fn get_all_listings(&self) -> Result<Vec<Listing>, AppError> {
        record_query("SELECT", "listings");
        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows_to_listings(rows)
    }

    /// Overwrite a listing row with the given record, optionally appending an
    /// audit entry in the same transaction.
    ///
    /// The row is only written while its stored status is still `expected`.
    ///
    /// # Returns
    /// `true` if a row matched id and expected status and was updated.
    pub async fn update_listing(
        &self,
        listing: &Listing,
        expected: ListingStatus,
        action: Option<&AdminAction>,
    ) -> Result<bool, AppError> {
        record_query("UPDATE", "listings");
        let images = encode_string_list(&listing.images)?;
        let videos = encode_string_list(&listing.videos)?;
        let amenities = encode_string_list(&listing.amenities)?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE listings SET
                type = ?, title = ?, description = ?, location = ?, city = ?,
                region = ?, full_address = ?, price_range = ?, contact_phone = ?,
                contact_email = ?, external_link = ?, images = ?, videos = ?,
                thumbnail = ?, amenities = ?, status = ?, rejection_reason = ?,
                updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(listing.listing_type.as_str())
        .bind(&listing.title)
        .bind(&listing.description)
        .bind(&listing.location)
        .bind(&listing.city)
        .bind(&listing.region)
        .bind(&listing.full_address)
        .bind(listing.price_range.as_str())
        .bind(&listing.contact_phone)
        .bind(&listing.contact_email)
        .bind(&listing.external_link)
        .bind(images)
        .bind(videos)
        .bind(&listing.thumbnail)
        .bind(amenities)
        .bind(listing.status.as_str())
        .bind(&listing.rejection_reason)
        .bind(listing.updated_at)
        .bind(&listing.id)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(action) = action {
            insert_admin_action(&mut tx, action).await?;
        }
        tx.commit().await?;

        Ok(true)
    }

    /// Move a listing from `expected` to `status`, appending the audit entry
    /// in the same transaction.
    ///
    /// The status guard makes concurrent moderation of the same listing
    /// fail instead of silently applying a stale transition.
    ///
    /// # Returns
    /// The updated listing, or `None` if no row matched id and expected status.
    pub async fn transition_listing_status(
        &self,
        id: &str,
        expected: ListingStatus,
        status: ListingStatus,
        rejection_reason: Option<&str>,
        action: Option<&AdminAction>,
        now: DateTime<Utc>,
    ) -> Result<Option<Listing>, AppError> {
        record_query("UPDATE", "listings");
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE listings
            SET status = ?, rejection_reason = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(status.as_str())
        .bind(rejection_reason)
        .bind(now)
        .bind(id)
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(action) = action {
            insert_admin_action(&mut tx, action).await?;
        }

        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Listing::try_from(row).map(Some)
    }

    /// Delete a listing permanently, optionally appending an audit entry.
    ///
    /// # Returns
    /// `true` if a row was removed.
    pub async fn delete_listing(
        &self,
        id: &str,
        action: Option<&AdminAction>,
    ) -> Result<bool, AppError> {
        record_query("DELETE", "listings");
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM listings WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(action) = action {
            insert_admin_action(&mut tx, action).await?;
        }
        tx.commit().await?;

        Ok(true)
    }

    // =========================================================================
    // Admin actions
    // =========================================================================

    /// Get the audit trail of a listing, oldest first
    ///
    /// Entries remain after the listing itself is deleted.
    pub async fn get_admin_actions_for_listing(
        &self,
        listing_id: &str,
    ) -> Result<Vec<AdminAction>, AppError> {
        record_query("SELECT", "admin_actions");
        let rows = sqlx::query_as::<_, AdminActionRow>(
            "SELECT * FROM admin_actions WHERE listing_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(listing_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AdminAction::try_from).collect()
    }

    // =========================================================================
    // Identity directory mirror
    // =========================================================================

    /// Get a live (not deleted) directory entry
    pub async fn get_synced_identity(&self, id: &str) -> Result<Option<SyncedIdentity>, AppError> {
        record_query("SELECT", "identity_users");
        let identity = sqlx::query_as::<_, SyncedIdentity>(
            "SELECT * FROM identity_users WHERE id = ? AND deleted_at IS NULL LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(identity)
    }

    /// Create or replace a directory entry
    pub async fn upsert_synced_identity(&self, identity: &SyncedIdentity) -> Result<(), AppError> {
        record_query("UPSERT", "identity_users");
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO identity_users (
                id, email, display_name, raw_json, deleted_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&identity.id)
        .bind(&identity.email)
        .bind(&identity.display_name)
        .bind(&identity.raw_json)
        .bind(identity.deleted_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

async fn insert_admin_action(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    action: &AdminAction,
) -> Result<(), AppError> {
    record_query("INSERT", "admin_actions");
    sqlx::query(
        r#"
        INSERT INTO admin_actions (id, listing_id, admin_id, action, reason, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&action.id)
    .bind(&action.listing_id)
    .bind(&action.admin_id)
    .bind(action.action.as_str())
    .bind(&action.reason)
    .bind(action.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
