//! Query state exposed to views.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use common::AppError;

/// Type-erased cached value
pub(crate) type AnyData = Arc<dyn Any + Send + Sync>;

/// Lifecycle of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    /// Nothing fetched yet
    Idle,
    /// First fetch in progress
    Loading,
    Success,
    Error,
}

/// Untyped snapshot broadcast to subscribers.
#[derive(Clone)]
pub(crate) struct Snapshot {
    pub status: QueryStatus,
    pub data: Option<AnyData>,
    pub error: Option<AppError>,
    pub is_fetching: bool,
    pub updated_at: Option<DateTime<Utc>>,
    /// Generation of the last applied result
    pub generation: u64,
}

impl Snapshot {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            updated_at: None,
            generation: 0,
        }
    }

    pub fn typed<T: Send + Sync + 'static>(&self) -> QueryState<T> {
        let data = match self.data.clone().map(|d| d.downcast::<T>()) {
            Some(Ok(data)) => Some(data),
            Some(Err(_)) => {
                warn!(type_name = std::any::type_name::<T>(), "Cached value has a different type");
                None
            }
            None => None,
        };

        QueryState {
            status: self.status,
            data,
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
        }
    }
}

/// Typed view of a cached query.
pub struct QueryState<T> {
    pub status: QueryStatus,
    /// Last successful value; kept while a refetch runs or after it fails
    pub data: Option<Arc<T>>,
    pub error: Option<AppError>,
    pub is_fetching: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            updated_at: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, QueryStatus::Idle | QueryStatus::Loading)
    }

    /// Data when the last fetch succeeded, error otherwise
    pub fn result(&self) -> Result<Arc<T>, AppError> {
        match (&self.status, &self.data, &self.error) {
            (QueryStatus::Success, Some(data), _) => Ok(data.clone()),
            (_, _, Some(err)) => Err(err.clone()),
            _ => Err(AppError::internal("Query has not resolved")),
        }
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.is_fetching,
            updated_at: self.updated_at,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for QueryState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryState")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("error", &self.error)
            .field("is_fetching", &self.is_fetching)
            .finish()
    }
}
