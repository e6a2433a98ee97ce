//! In-process backend used by tests and demo mode.
//!
//! Implements both contracts over JSON rows held in memory. Every call is
//! counted per operation and table, failures can be injected one call at a
//! time, and an artificial latency can be set so that concurrent callers
//! overlap.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::ROLE_ADMIN;

use crate::api::{AuthApi, AuthUser, Filter, Session, SignOutScope, SignUpResponse, Table, TableApi};

/// Access token lifetime handed out by the memory backend
const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Remote operation, used for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SignUp,
    SignIn,
    SignOut,
    GetUser,
    RefreshSession,
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    password: String,
    confirmed: bool,
}

#[derive(Debug, Clone)]
struct IssuedToken {
    user_id: String,
    expired: bool,
}

#[derive(Default)]
struct State {
    tables: HashMap<Table, Vec<Value>>,
    /// Keyed by email
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, IssuedToken>,
    refresh_tokens: HashMap<String, String>,
}

/// In-memory implementation of [`AuthApi`] and [`TableApi`].
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    calls: Mutex<HashMap<(Operation, Option<Table>), usize>>,
    failures: Mutex<HashMap<Operation, VecDeque<AppError>>>,
    latency: Mutex<Option<Duration>>,
    require_confirmation: AtomicBool,
    require_auth: AtomicBool,
    access_token: RwLock<Option<String>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Test controls
    // =========================================================================

    /// Make the next call of `op` fail with `err`
    pub fn fail_next(&self, op: Operation, err: AppError) {
        let mut failures = self.failures.lock().unwrap_or_else(|p| p.into_inner());
        failures.entry(op).or_default().push_back(err);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(|p| p.into_inner()) = latency;
    }

    /// Withhold sessions on sign-up until the email is confirmed
    pub fn set_require_confirmation(&self, required: bool) {
        self.require_confirmation.store(required, Ordering::SeqCst);
    }

    /// Refuse table calls that do not carry a valid access token
    pub fn set_require_auth(&self, required: bool) {
        self.require_auth.store(required, Ordering::SeqCst);
    }

    /// Confirm a pending sign-up
    pub fn confirm_email(&self, email: &str) -> bool {
        let mut state = self.state();
        match state.accounts.get_mut(email) {
            Some(account) => {
                account.confirmed = true;
                account.user.email_confirmed_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Expire every issued access token
    pub fn expire_sessions(&self) {
        for token in self.state().access_tokens.values_mut() {
            token.expired = true;
        }
    }

    /// Number of calls of `op` across all tables
    pub fn call_count(&self, op: Operation) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .filter(|((o, _), _)| *o == op)
            .map(|(_, n)| *n)
            .sum()
    }

    /// Number of calls of `op` against `table`
    pub fn table_call_count(&self, op: Operation, table: Table) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(&(op, Some(table)))
            .copied()
            .unwrap_or(0)
    }

    pub fn reset_call_counts(&self) {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Replace the rows of a table
    pub fn seed_table(&self, table: Table, rows: Vec<Value>) {
        self.state().tables.insert(table, rows);
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.state().tables.get(&table).cloned().unwrap_or_default()
    }

    /// Register a confirmed account with a profile row
    pub fn seed_account(&self, email: &str, password: &str, metadata: Value) -> AuthUser {
        self.create_account(email, password, metadata, true)
    }

    fn create_account(&self, email: &str, password: &str, metadata: Value, confirmed: bool) -> AuthUser {
        let now = Utc::now();
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            user_metadata: metadata.clone(),
            email_confirmed_at: confirmed.then_some(now),
            created_at: Some(now),
        };

        let profile = json!({
            "id": user.id,
            "email": email,
            "full_name": metadata.get("full_name").cloned().unwrap_or(Value::Null),
            "role": metadata.get("role").cloned().unwrap_or_else(|| json!(ROLE_ADMIN)),
            "store_name": metadata.get("store_name").cloned().unwrap_or(Value::Null),
            "status": "active",
            "created_at": now,
            "updated_at": now,
        });

        let mut state = self.state();
        state.accounts.insert(
            email.to_string(),
            Account {
                user: user.clone(),
                password: password.to_string(),
                confirmed,
            },
        );
        state.tables.entry(Table::Profiles).or_default().push(profile);
        user
    }

    // =========================================================================
    // Call plumbing
    // =========================================================================

    /// Count the call, apply latency, then pop an injected failure
    async fn enter(&self, op: Operation, table: Option<Table>) -> AppResult<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .entry((op, table))
            .or_default() += 1;

        let latency = *self.latency.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let injected = self
            .failures
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        match injected {
            Some(err) => {
                debug!(?op, "Injected failure");
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn check_table_access(&self) -> AppResult<()> {
        if !self.require_auth.load(Ordering::SeqCst) {
            return Ok(());
        }
        let token = self
            .access_token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .ok_or(AppError::Unauthorized)?;
        self.resolve_token(&token).map(|_| ())
    }

    fn resolve_token(&self, access_token: &str) -> AppResult<AuthUser> {
        let state = self.state();
        let issued = state
            .access_tokens
            .get(access_token)
            .ok_or(AppError::Unauthorized)?;
        if issued.expired {
            return Err(AppError::SessionExpired);
        }
        state
            .accounts
            .values()
            .find(|a| a.user.id == issued.user_id)
            .map(|a| a.user.clone())
            .ok_or(AppError::Unauthorized)
    }

    fn issue_session(state: &mut State, user: &AuthUser) -> Session {
        let access_token = Uuid::new_v4().to_string();
        let refresh_token = Uuid::new_v4().to_string();
        state.access_tokens.insert(
            access_token.clone(),
            IssuedToken {
                user_id: user.id.clone(),
                expired: false,
            },
        );
        state.refresh_tokens.insert(refresh_token.clone(), user.id.clone());

        Session {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: TOKEN_LIFETIME_SECS,
            expires_at: Some(Utc::now().timestamp() + TOKEN_LIFETIME_SECS),
            refresh_token,
            user: user.clone(),
        }
    }
}

/// Columns that must stay unique per table
fn unique_columns(table: Table) -> &'static [&'static str] {
    match table {
        Table::Categories => &["slug"],
        _ => &[],
    }
}

fn conflicts(rows: &[Value], candidate: &Value, table: Table, skip_id: Option<&Value>) -> Option<String> {
    unique_columns(table).iter().find_map(|column| {
        let value = candidate.get(*column).filter(|v| !v.is_null())?;
        rows.iter()
            .filter(|row| skip_id.map_or(true, |id| row.get("id") != Some(id)))
            .any(|row| row.get(*column) == Some(value))
            .then(|| format!("{} with {} {}", table, column, value))
    })
}

// =============================================================================
// Auth Service
// =============================================================================

#[async_trait]
impl AuthApi for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> AppResult<SignUpResponse> {
        self.enter(Operation::SignUp, None).await?;

        if self.state().accounts.contains_key(email) {
            return Err(AppError::validation("User already registered"));
        }

        let confirmed = !self.require_confirmation.load(Ordering::SeqCst);
        let user = self.create_account(email, password, metadata, confirmed);
        let session = confirmed.then(|| Self::issue_session(&mut self.state(), &user));

        Ok(SignUpResponse { user, session })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> AppResult<Session> {
        self.enter(Operation::SignIn, None).await?;

        let mut state = self.state();
        let account = state
            .accounts
            .get(email)
            .filter(|a| a.password == password)
            .cloned()
            .ok_or(AppError::InvalidCredentials)?;

        if !account.confirmed {
            return Err(AppError::bad_request("Email not confirmed"));
        }

        Ok(Self::issue_session(&mut state, &account.user))
    }

    async fn sign_out(&self, access_token: &str, scope: SignOutScope) -> AppResult<()> {
        self.enter(Operation::SignOut, None).await?;

        let mut state = self.state();
        let Some(user_id) = state.access_tokens.get(access_token).map(|t| t.user_id.clone()) else {
            return Ok(());
        };

        match scope {
            SignOutScope::Local => {
                state.access_tokens.remove(access_token);
            }
            SignOutScope::Global => {
                state.access_tokens.retain(|_, t| t.user_id != user_id);
                state.refresh_tokens.retain(|_, id| *id != user_id);
            }
            SignOutScope::Others => {
                state
                    .access_tokens
                    .retain(|token, t| t.user_id != user_id || token == access_token);
            }
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> AppResult<AuthUser> {
        self.enter(Operation::GetUser, None).await?;
        self.resolve_token(access_token)
    }

    async fn refresh_session(&self, refresh_token: &str) -> AppResult<Session> {
        self.enter(Operation::RefreshSession, None).await?;

        let mut state = self.state();
        let user_id = state
            .refresh_tokens
            .remove(refresh_token)
            .ok_or(AppError::SessionExpired)?;
        let user = state
            .accounts
            .values()
            .find(|a| a.user.id == user_id)
            .map(|a| a.user.clone())
            .ok_or(AppError::SessionExpired)?;

        Ok(Self::issue_session(&mut state, &user))
    }
}

// =============================================================================
// Table Service
// =============================================================================

#[async_trait]
impl TableApi for MemoryBackend {
    async fn select(&self, table: Table, filter: &Filter) -> AppResult<Vec<Value>> {
        self.enter(Operation::Select, Some(table)).await?;
        self.check_table_access()?;

        Ok(self
            .state()
            .tables
            .get(&table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(&self, table: Table, row: Value) -> AppResult<Value> {
        self.enter(Operation::Insert, Some(table)).await?;
        self.check_table_access()?;

        let Value::Object(mut fields) = row else {
            return Err(AppError::bad_request("Row must be a JSON object"));
        };
        let now = json!(Utc::now());
        fields
            .entry("id")
            .or_insert_with(|| json!(Uuid::new_v4().to_string()));
        fields.entry("created_at").or_insert_with(|| now.clone());
        fields.entry("updated_at").or_insert(now);
        let row = Value::Object(fields);

        let mut state = self.state();
        let rows = state.tables.entry(table).or_default();
        if let Some(conflict) = conflicts(rows, &row, table, None) {
            return Err(AppError::conflict(conflict));
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> AppResult<Vec<Value>> {
        self.enter(Operation::Update, Some(table)).await?;
        self.check_table_access()?;

        let Value::Object(patch) = patch else {
            return Err(AppError::bad_request("Patch must be a JSON object"));
        };

        let mut state = self.state();
        let rows = state.tables.entry(table).or_default();

        let mut updated: Vec<(usize, Value)> = Vec::new();
        for (index, row) in rows.iter().enumerate().filter(|(_, r)| filter.matches(r)) {
            let mut merged: Map<String, Value> = row.as_object().cloned().unwrap_or_default();
            for (key, value) in &patch {
                merged.insert(key.clone(), value.clone());
            }
            let merged = Value::Object(merged);
            if let Some(conflict) = conflicts(rows, &merged, table, row.get("id")) {
                return Err(AppError::conflict(conflict));
            }
            updated.push((index, merged));
        }

        for (index, row) in &updated {
            rows[*index] = row.clone();
        }
        Ok(updated.into_iter().map(|(_, row)| row).collect())
    }

    async fn delete(&self, table: Table, filter: &Filter) -> AppResult<Vec<Value>> {
        self.enter(Operation::Delete, Some(table)).await?;
        self.check_table_access()?;

        let mut state = self.state();
        let rows = state.tables.entry(table).or_default();
        let (removed, kept): (Vec<Value>, Vec<Value>) =
            rows.drain(..).partition(|row| filter.matches(row));
        *rows = kept;
        Ok(removed)
    }

    fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }
}
