//! User directory resolver
//!
//! Resolves display data (email, display name) for a user id from, in
//! priority order:
//! 1. the synced identity mirror table
//! 2. the values cached on the role record
//! 3. the identity provider's lookup API
//!
//! A field is taken from the first source that has it. When the answer
//! fills a gap in the role record's cache, the record is refreshed.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::auth::IdentityProvider;
use crate::data::{Database, SyncedIdentity, UserRoleRecord};
use crate::error::AppError;

/// Resolved directory data for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl DirectoryEntry {
    fn is_complete(&self) -> bool {
        self.email.is_some() && self.display_name.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.display_name.is_none()
    }

    fn fill(&mut self, email: Option<String>, display_name: Option<String>) {
        if self.email.is_none() {
            self.email = email.filter(|v| !v.trim().is_empty());
        }
        if self.display_name.is_none() {
            self.display_name = display_name.filter(|v| !v.trim().is_empty());
        }
    }
}

fn json_str(raw: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| raw.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Extract email/display name from a mirror row.
///
/// The raw provider payload wins over the flattened columns.
fn from_synced(row: SyncedIdentity) -> (Option<String>, Option<String>) {
    let raw = row
        .raw_json
        .as_deref()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .unwrap_or(serde_json::Value::Null);

    let email = json_str(&raw, &["primaryEmail", "primary_email"])
        .or(row.email)
        .or_else(|| json_str(&raw, &["email"]));
    let display_name = json_str(&raw, &["displayName", "display_name"])
        .or(row.display_name)
        .or_else(|| json_str(&raw, &["name"]));

    (email, display_name)
}

/// User directory resolver
pub struct UserDirectory {
    db: Arc<Database>,
    identity: Arc<dyn IdentityProvider>,
}

impl UserDirectory {
    pub fn new(db: Arc<Database>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { db, identity }
    }

    /// Resolve directory data for `user_id`.
    ///
    /// # Arguments
    /// * `record` - The user's role record, when the caller already loaded it
    pub async fn resolve(
        &self,
        user_id: &str,
        record: Option<&UserRoleRecord>,
    ) -> Result<DirectoryEntry, AppError> {
        let mut entry = DirectoryEntry::default();

        if let Some(row) = self.db.get_synced_identity(user_id).await? {
            let (email, display_name) = from_synced(row);
            entry.fill(email, display_name);
        }

        if !entry.is_complete() {
            if let Some(record) = record {
                entry.fill(record.email.clone(), record.display_name.clone());
            }
        }

        if !entry.is_complete() {
            if let Some(identity) = self.identity.lookup(user_id).await? {
                entry.fill(identity.email, identity.display_name);
            }
        }

        if let Some(record) = record {
            let fills_email = record.email.is_none() && entry.email.is_some();
            let fills_name = record.display_name.is_none() && entry.display_name.is_some();
            if fills_email || fills_name {
                self.db
                    .backfill_user_profile(
                        user_id,
                        entry.email.as_deref(),
                        entry.display_name.as_deref(),
                        Utc::now(),
                    )
                    .await?;
                tracing::debug!(user_id, "Refreshed cached directory data");
            }
        }

        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Identity, MockIdentityProvider};
    use crate::data::Role;
    use tempfile::TempDir;

    async fn database() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("directory.db"))
            .await
            .unwrap();
        (Arc::new(db), temp_dir)
    }

    fn synced(id: &str, email: Option<&str>, raw_json: Option<&str>) -> SyncedIdentity {
        SyncedIdentity {
            id: id.to_string(),
            email: email.map(str::to_string),
            display_name: None,
            raw_json: raw_json.map(str::to_string),
            deleted_at: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn mirror_table_takes_priority() {
        let (db, _dir) = database().await;
        db.upsert_synced_identity(&synced(
            "u1",
            Some("column@x.com"),
            Some(r#"{"primaryEmail":"raw@x.com","displayName":"Raw Name"}"#),
        ))
        .await
        .unwrap();

        let mut provider = MockIdentityProvider::new();
        provider.expect_lookup().never();

        let directory = UserDirectory::new(db, Arc::new(provider));
        let entry = directory.resolve("u1", None).await.unwrap();
        assert_eq!(entry.email.as_deref(), Some("raw@x.com"));
        assert_eq!(entry.display_name.as_deref(), Some("Raw Name"));
    }

    #[tokio::test]
    async fn falls_back_to_provider_and_refreshes_cache() {
        let (db, _dir) = database().await;
        db.upsert_user_role("u2", Role::Host, None, None, Utc::now())
            .await
            .unwrap();
        let record = db.get_user_role("u2").await.unwrap().unwrap();

        let mut provider = MockIdentityProvider::new();
        provider
            .expect_lookup()
            .withf(|id| id == "u2")
            .times(1)
            .returning(|id| {
                Ok(Some(Identity {
                    id: id.to_string(),
                    email: Some("looked-up@x.com".to_string()),
                    display_name: Some("Omar".to_string()),
                }))
            });

        let directory = UserDirectory::new(db.clone(), Arc::new(provider));
        let entry = directory.resolve("u2", Some(&record)).await.unwrap();
        assert_eq!(entry.email.as_deref(), Some("looked-up@x.com"));

        let refreshed = db.get_user_role("u2").await.unwrap().unwrap();
        assert_eq!(refreshed.email.as_deref(), Some("looked-up@x.com"));
        assert_eq!(refreshed.display_name.as_deref(), Some("Omar"));
        assert_eq!(refreshed.role, Role::Host);
    }

    #[tokio::test]
    async fn cached_values_skip_provider() {
        let (db, _dir) = database().await;
        db.upsert_user_role("u3", Role::User, Some("c@x.com"), Some("Cached"), Utc::now())
            .await
            .unwrap();
        let record = db.get_user_role("u3").await.unwrap().unwrap();

        let mut provider = MockIdentityProvider::new();
        provider.expect_lookup().never();

        let directory = UserDirectory::new(db, Arc::new(provider));
        let entry = directory.resolve("u3", Some(&record)).await.unwrap();
        assert_eq!(entry.email.as_deref(), Some("c@x.com"));
        assert_eq!(entry.display_name.as_deref(), Some("Cached"));
    }

    #[tokio::test]
    async fn provider_failure_is_surfaced() {
        let (db, _dir) = database().await;

        let mut provider = MockIdentityProvider::new();
        provider
            .expect_lookup()
            .returning(|_| Err(AppError::Internal(anyhow::anyhow!("provider down"))));

        let directory = UserDirectory::new(db, Arc::new(provider));
        let error = directory.resolve("u4", None).await.unwrap_err();
        assert!(matches!(error, AppError::Internal(_)));
    }

    #[test]
    fn raw_payload_aliases() {
        let (email, name) = from_synced(synced(
            "u",
            None,
            Some(r#"{"primary_email":"p@x.com","name":"Fallback"}"#),
        ));
        assert_eq!(email.as_deref(), Some("p@x.com"));
        assert_eq!(name.as_deref(), Some("Fallback"));
    }
}
