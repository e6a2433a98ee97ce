//! Admin profile repository.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use backend_client::{Filter, Table, TableApi};
use common::{AppError, AppResult};
use domain::{Profile, ProfileUpdate};

use super::{first_row, require_id};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Profile repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Profile keyed by auth identity id
    async fn fetch_by_id(&self, id: &str) -> AppResult<Profile>;

    /// Apply the present fields and stamp `updated_at`
    async fn update(&self, id: &str, changes: ProfileUpdate) -> AppResult<Profile>;
}

/// Concrete implementation of ProfileRepository over the `profiles` table
pub struct ProfileStore {
    tables: Arc<dyn TableApi>,
}

impl ProfileStore {
    /// Create new repository instance
    pub fn new(tables: Arc<dyn TableApi>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl ProfileRepository for ProfileStore {
    async fn fetch_by_id(&self, id: &str) -> AppResult<Profile> {
        let id = require_id(id, "Profile")?;
        let rows = self.tables.select(Table::Profiles, &Filter::by_id(id)).await?;
        first_row(rows)
    }

    async fn update(&self, id: &str, changes: ProfileUpdate) -> AppResult<Profile> {
        let id = require_id(id, "Profile")?;
        if changes.is_empty() {
            return Err(AppError::validation("Nothing to update"));
        }

        let mut patch = serde_json::to_value(&changes)?;
        if let Value::Object(map) = &mut patch {
            map.insert("updated_at".into(), serde_json::json!(Utc::now()));
        }

        let rows = self.tables.update(Table::Profiles, &Filter::by_id(id), patch).await?;
        first_row(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_client::MockTableApi;
    use domain::UserRole;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_profile_maps_role() {
        let mut tables = MockTableApi::new();
        tables
            .expect_select()
            .returning(|_, _| Ok(vec![json!({ "id": "u1", "full_name": "Ada", "role": "admin" })]));

        let store = ProfileStore::new(Arc::new(tables));
        let profile = store.fetch_by_id("u1").await.unwrap();
        assert_eq!(profile.role, UserRole::Admin);
        assert_eq!(profile.display_name(), "Ada");
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at_and_skips_absent_fields() {
        let mut tables = MockTableApi::new();
        tables
            .expect_update()
            .withf(|table, _, patch| {
                *table == Table::Profiles
                    && patch["bio"] == "Moderator"
                    && patch.get("updated_at").is_some()
                    && patch.get("username").is_none()
            })
            .times(1)
            .returning(|_, _, patch| {
                let mut row = json!({ "id": "u1" });
                row.as_object_mut().unwrap().extend(patch.as_object().unwrap().clone());
                Ok(vec![row])
            });

        let store = ProfileStore::new(Arc::new(tables));
        let changes = ProfileUpdate {
            bio: Some("Moderator".into()),
            ..Default::default()
        };
        let profile = store.update("u1", changes).await.unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Moderator"));
        assert!(profile.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let store = ProfileStore::new(Arc::new(MockTableApi::new()));
        let err = store.update("u1", ProfileUpdate::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
