//! Category create, edit and delete with notifications and invalidation.

use std::sync::Arc;

use tracing::warn;

use common::{AppError, AppResult};
use data_access::{keys, Queries};
use domain::category::validate_parent;
use domain::{CategoryUpdate, NewCategory, ProductCategory};

use crate::actor::{Actor, ActorSource};
use crate::audit::{AuditEntity, AuditRecord, AuditTrail};
use crate::notify::ToastQueue;

/// Edits the category tree.
#[derive(Clone)]
pub struct CategoryEditor {
    queries: Queries,
    actors: Arc<dyn ActorSource>,
    toasts: ToastQueue,
    audit: AuditTrail,
}

impl CategoryEditor {
    pub fn new(
        queries: Queries,
        actors: Arc<dyn ActorSource>,
        toasts: ToastQueue,
        audit: AuditTrail,
    ) -> Self {
        Self {
            queries,
            actors,
            toasts,
            audit,
        }
    }

    fn actor(&self) -> AppResult<Actor> {
        self.actors.current_admin().ok_or(AppError::Unauthorized)
    }

    /// Create a category; the slug is derived from the name unless given
    pub async fn create(&self, input: NewCategory) -> AppResult<ProductCategory> {
        let actor = self.actor()?;
        let result = self.try_create(input).await;
        self.finish(&actor, "create", result)
    }

    async fn try_create(&self, input: NewCategory) -> AppResult<ProductCategory> {
        if let Some(parent) = input.parent_id.as_deref().filter(|p| !p.trim().is_empty()) {
            let categories = self.queries.category_list().await?;
            validate_parent(None, parent, &categories)?;
        }

        let repo = self.queries.repositories().categories.clone();
        self.queries
            .cache()
            .mutate(async move { repo.create(input).await }, keys::category_change(None))
            .await
    }

    /// Apply an edit; the stored slug only changes when one is given
    pub async fn update(&self, id: &str, changes: CategoryUpdate) -> AppResult<ProductCategory> {
        let actor = self.actor()?;
        let result = self.try_update(id, changes).await;
        self.finish(&actor, "update", result)
    }

    async fn try_update(&self, id: &str, changes: CategoryUpdate) -> AppResult<ProductCategory> {
        if changes.is_empty() {
            return Err(AppError::validation("Nothing to update"));
        }
        if let Some(Some(parent)) = &changes.parent_id {
            let categories = self.queries.category_list().await?;
            validate_parent(Some(id), parent, &categories)?;
        }

        let repo = self.queries.repositories().categories.clone();
        let target = id.to_string();
        self.queries
            .cache()
            .mutate(
                async move { repo.update(&target, changes).await },
                keys::category_change(Some(id)),
            )
            .await
    }

    /// Delete a category. `confirmed` must reflect an explicit confirmation.
    pub async fn delete(&self, id: &str, confirmed: bool) -> AppResult<()> {
        let actor = self.actor()?;
        let result = self.try_delete(id, confirmed).await;
        self.finish(&actor, "delete", result).map(|_| ())
    }

    async fn try_delete(&self, id: &str, confirmed: bool) -> AppResult<ProductCategory> {
        if !confirmed {
            return Err(AppError::validation("Deleting a category must be confirmed"));
        }

        let categories = self.queries.category_list().await?;
        let category = categories
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(AppError::NotFound)?;
        if categories.iter().any(|c| c.parent_id.as_deref() == Some(id)) {
            return Err(AppError::validation(format!(
                "{} still has subcategories",
                category.name
            )));
        }

        let repo = self.queries.repositories().categories.clone();
        let target = id.to_string();
        self.queries
            .cache()
            .mutate(
                async move { repo.delete(&target).await },
                keys::category_change(Some(id)),
            )
            .await?;
        Ok(category)
    }

    /// Notify and audit a finished change
    fn finish(
        &self,
        actor: &Actor,
        action: &str,
        result: AppResult<ProductCategory>,
    ) -> AppResult<ProductCategory> {
        match result {
            Ok(category) => {
                self.toasts.success(
                    format!("Category {}d", action),
                    format!("{} was {}d", category.name, action),
                );
                self.audit.record(
                    actor,
                    AuditRecord {
                        entity: AuditEntity::Category,
                        subject_id: category.id.clone(),
                        subject_label: category.name.clone(),
                        action: action.to_string(),
                        from_status: None,
                        to_status: None,
                        remarks: None,
                    },
                );
                Ok(category)
            }
            Err(err) => {
                warn!(action, code = err.code(), "Category change failed");
                self.toasts
                    .error(format!("Could not {} category", action), err.user_message());
                self.actors.report_error(&err);
                Err(err)
            }
        }
    }
}
