//! Session store - Current session, auth events and the "current user" query.
//!
//! Every session change is announced on a broadcast channel. The cache
//! subscriber started by [`SessionStore::watch_events`] turns those events
//! into a refresh of the `["user"]` query.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use backend_client::{AuthApi, AuthUser, Session, SignOutScope, TableApi};
use common::{AppError, AppResult};
use data_access::{keys, ProfileRepository};
use domain::Profile;
use query_cache::{QueryCache, QueryState};

use crate::credentials::{validate_input, SignInCredentials, SignUpCredentials, SignUpOutcome};

const EVENT_CAPACITY: usize = 32;

/// Session change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// Signed-in identity with its profile row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentUser {
    pub user: AuthUser,
    /// `None` when the profile could not be read
    pub profile: Option<Profile>,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }

    /// Name for the header: profile name, then email
    pub fn display_name(&self) -> String {
        match &self.profile {
            Some(profile) => profile.display_name().to_string(),
            None => self.user.email.clone().unwrap_or_else(|| "Admin".to_string()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().map(Profile::is_admin).unwrap_or(false)
    }
}

struct Inner {
    auth: Arc<dyn AuthApi>,
    tables: Arc<dyn TableApi>,
    profiles: Arc<dyn ProfileRepository>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

/// Holds the admin's session. Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Create new session store with no session
    pub fn new(
        auth: Arc<dyn AuthApi>,
        tables: Arc<dyn TableApi>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                auth,
                tables,
                profiles,
                session: RwLock::new(None),
                events,
            }),
        }
    }

    // =========================================================================
    // Local state
    // =========================================================================

    /// Current session, if any
    pub fn current_session(&self) -> Option<Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_session().is_some()
    }

    /// Id of the signed-in admin
    pub fn current_user_id(&self) -> Option<String> {
        self.current_session().map(|s| s.user.id)
    }

    /// Subscribe to session changes
    pub fn events(&self) -> broadcast::Receiver<AuthEvent> {
        self.inner.events.subscribe()
    }

    fn set_session(&self, session: Option<Session>) {
        self.inner
            .tables
            .set_access_token(session.as_ref().map(|s| s.access_token.clone()));
        *self.inner.session.write().unwrap_or_else(|p| p.into_inner()) = session;
    }

    fn emit(&self, event: AuthEvent) {
        // No receivers is fine
        let _ = self.inner.events.send(event);
    }

    /// Drop the session locally after the backend reported it expired
    pub fn handle_error(&self, err: &AppError) {
        if *err == AppError::SessionExpired && self.is_authenticated() {
            warn!("Session expired, signing out locally");
            self.set_session(None);
            self.emit(AuthEvent::SignedOut);
        }
    }

    // =========================================================================
    // Remote operations
    // =========================================================================

    /// Sign in with email and password
    pub async fn sign_in(&self, credentials: SignInCredentials) -> AppResult<AuthUser> {
        validate_input(&credentials)?;

        let session = self
            .inner
            .auth
            .sign_in_with_password(credentials.email.trim(), &credentials.password)
            .await?;
        let user = session.user.clone();

        self.set_session(Some(session));
        info!(user_id = %user.id, "Signed in");
        self.emit(AuthEvent::SignedIn);
        Ok(user)
    }

    /// Register an admin account. A session starts only when the backend
    /// does not require email confirmation.
    pub async fn sign_up(&self, credentials: SignUpCredentials) -> AppResult<SignUpOutcome> {
        validate_input(&credentials)?;

        let response = self
            .inner
            .auth
            .sign_up(credentials.email.trim(), &credentials.password, credentials.metadata())
            .await?;

        let outcome = SignUpOutcome {
            user_id: response.user.id.clone(),
            confirmation_required: response.session.is_none(),
        };

        match response.session {
            Some(session) => {
                self.set_session(Some(session));
                info!(user_id = %outcome.user_id, "Signed up and signed in");
                self.emit(AuthEvent::SignedIn);
            }
            None => info!(user_id = %outcome.user_id, "Signed up, email confirmation pending"),
        }
        Ok(outcome)
    }

    /// Revoke every session of the account and clear local state.
    ///
    /// Signing out without a session succeeds and emits nothing. Local state
    /// is cleared even when the remote call fails.
    pub async fn sign_out(&self) -> AppResult<()> {
        let Some(session) = self.current_session() else {
            debug!("Sign-out without a session");
            return Ok(());
        };

        let remote = self
            .inner
            .auth
            .sign_out(&session.access_token, SignOutScope::Global)
            .await;

        self.set_session(None);
        info!(user_id = %session.user.id, "Signed out");
        self.emit(AuthEvent::SignedOut);

        match remote {
            Ok(()) => Ok(()),
            Err(err) if err.is_auth() => Ok(()),
            Err(err) => {
                warn!(code = err.code(), "Remote sign-out failed");
                Err(err)
            }
        }
    }

    /// Exchange the refresh token for a new session
    pub async fn refresh(&self) -> AppResult<Session> {
        let current = self.current_session().ok_or(AppError::Unauthorized)?;

        match self.inner.auth.refresh_session(&current.refresh_token).await {
            Ok(session) => {
                self.set_session(Some(session.clone()));
                debug!(user_id = %session.user.id, "Token refreshed");
                self.emit(AuthEvent::TokenRefreshed);
                Ok(session)
            }
            Err(err) => {
                self.handle_error(&err);
                Err(err)
            }
        }
    }

    /// Refresh the session when its access token has expired
    pub async fn ensure_fresh(&self) -> AppResult<Option<Session>> {
        match self.current_session() {
            Some(session) if session.is_expired_at(Utc::now()) => self.refresh().await.map(Some),
            other => Ok(other),
        }
    }

    /// Signed-in identity and profile, `None` without a session.
    ///
    /// An expired session signs out locally and yields `None`. A failing
    /// profile read yields `profile = None`.
    pub async fn current_user(&self) -> AppResult<Option<CurrentUser>> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };

        let user = match self.inner.auth.get_user(&session.access_token).await {
            Ok(user) => user,
            Err(AppError::SessionExpired) => {
                self.handle_error(&AppError::SessionExpired);
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let profile = match self.inner.profiles.fetch_by_id(&user.id).await {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!(user_id = %user.id, code = err.code(), "Profile unavailable");
                None
            }
        };

        Ok(Some(CurrentUser { user, profile }))
    }

    // =========================================================================
    // Cache integration
    // =========================================================================

    /// Read the `["user"]` query through the cache
    pub async fn current_user_query(&self, cache: &QueryCache) -> QueryState<Option<CurrentUser>> {
        let store = self.clone();
        cache
            .fetch(keys::user(), move || {
                let store = store.clone();
                async move { store.current_user().await }
            })
            .await
    }

    /// Spawn the subscriber that keeps `["user"]` in step with the session.
    ///
    /// Sign-in and token refresh refetch the query; sign-out sets it to
    /// `None`. The task ends when the store is dropped.
    pub fn watch_events(&self, cache: QueryCache) -> JoinHandle<()> {
        let mut events = self.events();
        let store = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => Some(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Auth events lagged, refreshing current user");
                        None
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = store.upgrade() else { break };
                let store = SessionStore { inner };

                match event {
                    Some(AuthEvent::SignedOut) => {
                        cache.set_query_data(keys::user(), None::<CurrentUser>);
                        cache.invalidate_prefix(query_cache::QueryKey::from([keys::PROFILE]));
                    }
                    _ => {
                        cache.invalidate(keys::user());
                        store.current_user_query(&cache).await;
                    }
                }
                debug!(?event, "Current user refreshed");
            }
        })
    }
}
