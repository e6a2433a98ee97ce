//! Contracts of the hosted backend: auth service and table service.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use common::AppResult;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

// =============================================================================
// Auth
// =============================================================================

/// Identity as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Value,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Token pair and identity of a signed-in account.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Unix timestamp in seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub refresh_token: String,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Whether the access token has passed its expiry time
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .map(|at| at <= now.timestamp())
            .unwrap_or(false)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user.id)
            .finish_non_exhaustive()
    }
}

/// Outcome of a sign-up. `session` is absent while email confirmation is pending.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpResponse {
    pub user: AuthUser,
    pub session: Option<Session>,
}

/// Which sessions a sign-out revokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutScope {
    Global,
    Local,
    Others,
}

impl SignOutScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignOutScope::Global => "global",
            SignOutScope::Local => "local",
            SignOutScope::Others => "others",
        }
    }
}

/// Hosted authentication service.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Create an identity; `metadata` is stored as user metadata
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> AppResult<SignUpResponse>;

    /// Exchange email and password for a session
    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session>;

    /// Revoke the session behind `access_token`
    async fn sign_out(&self, access_token: &str, scope: SignOutScope) -> AppResult<()>;

    /// Resolve the identity behind `access_token`
    async fn get_user(&self, access_token: &str) -> AppResult<AuthUser>;

    /// Exchange a refresh token for a new session
    async fn refresh_session(&self, refresh_token: &str) -> AppResult<Session>;
}

// =============================================================================
// Tables
// =============================================================================

/// Remote tables used by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Profiles,
    SellerVerifications,
    Products,
    Categories,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::SellerVerifications => "seller_verifications",
            Table::Products => "products",
            Table::Categories => "categories",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Conjunction of equality constraints on a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    constraints: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `column = value`
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.constraints.push((column.into(), value.to_string()));
        self
    }

    /// Shorthand for a filter on `id`
    pub fn by_id(id: impl ToString) -> Self {
        Self::new().eq("id", id)
    }

    pub fn constraints(&self) -> &[(String, String)] {
        &self.constraints
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Whether a JSON row satisfies every constraint
    pub fn matches(&self, row: &Value) -> bool {
        self.constraints.iter().all(|(column, expected)| {
            match row.get(column) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Null) | None => expected == "null",
                Some(other) => other.to_string() == *expected,
            }
        })
    }
}

/// Hosted table service. Rows travel as JSON objects.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait TableApi: Send + Sync {
    /// Rows matching the filter
    async fn select(&self, table: Table, filter: &Filter) -> AppResult<Vec<Value>>;

    /// Insert one row and return it as stored
    async fn insert(&self, table: Table, row: Value) -> AppResult<Value>;

    /// Patch matching rows and return them as stored
    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> AppResult<Vec<Value>>;

    /// Delete matching rows and return them
    async fn delete(&self, table: Table, filter: &Filter) -> AppResult<Vec<Value>>;

    /// Token used for row-level access; `None` falls back to the public key
    fn set_access_token(&self, token: Option<String>);
}
