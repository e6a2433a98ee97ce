//! Session store against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use backend_client::fixtures::{self, DEMO_ADMIN_EMAIL, DEMO_ADMIN_PASSWORD};
use backend_client::{MemoryBackend, Operation, Table, TableApi, Filter};
use common::{AppError, QueryCacheConfig};
use data_access::{keys, Repositories};
use query_cache::QueryCache;
use session::{AuthEvent, CurrentUser, SessionStore, SignInCredentials, SignUpCredentials};
use tokio_test::assert_ok;

fn create_test_store() -> (SessionStore, Arc<MemoryBackend>) {
    let backend = Arc::new(fixtures::seeded_backend());
    let repos = Repositories::new(backend.clone());
    let store = SessionStore::new(backend.clone(), backend.clone(), repos.profiles.clone());
    (store, backend)
}

fn admin_credentials() -> SignInCredentials {
    SignInCredentials {
        email: DEMO_ADMIN_EMAIL.into(),
        password: DEMO_ADMIN_PASSWORD.into(),
    }
}

#[tokio::test]
async fn test_sign_in_establishes_session_and_notifies() {
    let (store, backend) = create_test_store();
    let mut events = store.events();
    backend.set_require_auth(true);

    let user = assert_ok!(store.sign_in(admin_credentials()).await);
    assert_eq!(user.email.as_deref(), Some(DEMO_ADMIN_EMAIL));
    assert!(store.is_authenticated());
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn);

    // Table calls now carry the session token
    assert_ok!(backend.select(Table::Products, &Filter::new()).await);
}

#[tokio::test]
async fn test_wrong_password_is_typed_error() {
    let (store, _backend) = create_test_store();

    let err = store
        .sign_in(SignInCredentials {
            email: DEMO_ADMIN_EMAIL.into(),
            password: "wrong-password".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err, AppError::InvalidCredentials);
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn test_invalid_input_makes_no_remote_call() {
    let (store, backend) = create_test_store();

    let err = store
        .sign_in(SignInCredentials {
            email: "admin".into(),
            password: "admin-password".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(backend.call_count(Operation::SignIn), 0);
}

#[tokio::test]
async fn test_sign_out_is_idempotent() {
    let (store, backend) = create_test_store();

    assert_ok!(store.sign_out().await);
    assert_eq!(backend.call_count(Operation::SignOut), 0);

    store.sign_in(admin_credentials()).await.unwrap();
    assert_ok!(store.sign_out().await);
    assert_ok!(store.sign_out().await);

    assert!(!store.is_authenticated());
    assert_eq!(backend.call_count(Operation::SignOut), 1);
}

#[tokio::test]
async fn test_sign_out_clears_local_state_when_remote_fails() {
    let (store, backend) = create_test_store();
    store.sign_in(admin_credentials()).await.unwrap();

    backend.fail_next(Operation::SignOut, AppError::network("offline"));
    let err = store.sign_out().await.unwrap_err();

    assert!(matches!(err, AppError::Network(_)));
    assert!(!store.is_authenticated());
}

#[tokio::test]
async fn test_sign_up_waits_for_confirmation() {
    let (store, backend) = create_test_store();
    backend.set_require_confirmation(true);

    let outcome = store
        .sign_up(SignUpCredentials {
            email: "ada@example.com".into(),
            password: "password123".into(),
            full_name: "Ada Lovelace".into(),
            store_name: Some("Analytical Goods".into()),
        })
        .await
        .unwrap();

    assert!(outcome.confirmation_required);
    assert!(!store.is_authenticated());

    let profile = backend
        .rows(Table::Profiles)
        .into_iter()
        .find(|row| row["id"] == outcome.user_id.as_str())
        .unwrap();
    assert_eq!(profile["role"], "admin");
}

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let (store, _backend) = create_test_store();
    store.sign_in(admin_credentials()).await.unwrap();
    let before = store.current_session().unwrap();
    let mut events = store.events();

    let after = store.refresh().await.unwrap();
    assert_ne!(after.access_token, before.access_token);
    assert_eq!(events.recv().await.unwrap(), AuthEvent::TokenRefreshed);
}

#[tokio::test]
async fn test_expired_session_signs_out_locally() {
    let (store, backend) = create_test_store();
    store.sign_in(admin_credentials()).await.unwrap();
    let mut events = store.events();

    backend.expire_sessions();
    let current = store.current_user().await.unwrap();

    assert!(current.is_none());
    assert!(!store.is_authenticated());
    assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
}

#[tokio::test]
async fn test_auth_events_refresh_cached_current_user() {
    let (store, _backend) = create_test_store();
    let cache = QueryCache::new(QueryCacheConfig::default());
    let watcher = store.watch_events(cache.clone());
    let mut user = cache.subscribe::<Option<CurrentUser>>(keys::user());

    store.sign_in(admin_credentials()).await.unwrap();
    let signed_in = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let state = user.changed().await.unwrap();
            if let Some(Some(current)) = state.data.as_deref() {
                if !state.is_fetching {
                    return current.clone();
                }
            }
        }
    })
    .await
    .unwrap();
    assert!(signed_in.is_admin());
    assert_eq!(signed_in.display_name(), "Demo Admin");

    store.sign_out().await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let state = user.changed().await.unwrap();
            if matches!(state.data.as_deref(), Some(None)) {
                break;
            }
        }
    })
    .await
    .unwrap();

    watcher.abort();
}
