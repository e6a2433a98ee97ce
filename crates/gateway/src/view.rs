//! Route view models.
//!
//! Every protected page renders as a [`View`]: `loading` while a dependent
//! query has not resolved within the view loading timeout, `error` with a
//! retry link when one failed, `not_found` with a link back to the list
//! when the subject does not exist, otherwise `ready` with the page data.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use common::AppError;
use query_cache::QueryState;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum View<T> {
    Loading {
        /// Path to request again once the data has arrived
        retry: String,
    },
    Error {
        code: String,
        message: String,
        retry: String,
        #[serde(skip)]
        status: StatusCode,
    },
    NotFound {
        message: String,
        back: String,
    },
    Ready {
        data: T,
    },
}

/// Why a page could not render its data
#[derive(Debug, Clone, PartialEq)]
pub enum Unresolved {
    Loading,
    Failed(AppError),
}

impl From<AppError> for Unresolved {
    fn from(err: AppError) -> Self {
        Unresolved::Failed(err)
    }
}

/// Wait for a query up to the view loading timeout.
///
/// A timed-out query keeps running in the cache; the next render picks up
/// its result.
pub async fn resolve<T, Fut>(timeout: Duration, query: Fut) -> Result<Arc<T>, Unresolved>
where
    Fut: Future<Output = QueryState<T>>,
{
    match tokio::time::timeout(timeout, query).await {
        Ok(state) => state.result().map_err(Unresolved::Failed),
        Err(_) => Err(Unresolved::Loading),
    }
}

/// Combine two dependent queries; loading wins over failure
pub fn both<A, B>(
    a: Result<A, Unresolved>,
    b: Result<B, Unresolved>,
) -> Result<(A, B), Unresolved> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(Unresolved::Loading), _) | (_, Err(Unresolved::Loading)) => Err(Unresolved::Loading),
        (Err(err), _) | (_, Err(err)) => Err(err),
    }
}

impl<T> View<T> {
    /// Render a page result. `path` is the retry target, `back` the list to
    /// return to when the subject is missing.
    pub fn render(result: Result<T, Unresolved>, path: &str, back: &str) -> Self {
        match result {
            Ok(data) => View::Ready { data },
            Err(Unresolved::Loading) => View::Loading {
                retry: path.to_string(),
            },
            Err(Unresolved::Failed(AppError::NotFound)) => View::NotFound {
                message: "Nothing was found at this address".to_string(),
                back: back.to_string(),
            },
            Err(Unresolved::Failed(err)) => View::Error {
                code: err.code().to_string(),
                message: err.user_message(),
                retry: path.to_string(),
                status: err.status(),
            },
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            View::Ready { data } => Some(data),
            _ => None,
        }
    }
}

impl<T: Serialize> IntoResponse for View<T> {
    fn into_response(self) -> Response {
        let status = match &self {
            View::Ready { .. } => StatusCode::OK,
            View::Loading { .. } => StatusCode::ACCEPTED,
            View::NotFound { .. } => StatusCode::NOT_FOUND,
            View::Error { status, .. } => *status,
        };
        (status, Json(self)).into_response()
    }
}
