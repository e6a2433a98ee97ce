//! Application context: every long-lived client and store of the console,
//! built once at startup and torn down explicitly.

use std::sync::{Arc, Mutex, RwLock};

use tokio::task::JoinHandle;
use tracing::{info, warn};

use backend_client::{AuthApi, RestBackend, TableApi};
use common::{AppError, AppResult};
use data_access::{Queries, Repositories};
use query_cache::QueryCache;
use session::SessionStore;
use workflow::{
    ActorSource, AuditTrail, CategoryEditor, ProductController, ProductModeration,
    SellerController, SellerModeration, ToastQueue,
};

use crate::config::{BackendMode, GatewayConfig};
use crate::preferences::Preferences;

pub struct AppContext {
    pub config: GatewayConfig,
    pub cache: QueryCache,
    pub queries: Queries,
    pub session: SessionStore,
    pub toasts: ToastQueue,
    pub audit: AuditTrail,
    pub sellers: SellerController,
    pub products: ProductController,
    pub categories: CategoryEditor,
    pub preferences: RwLock<Preferences>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl AppContext {
    /// Build the context for the configured backend and start the auth-event subscriber
    pub async fn init(config: GatewayConfig) -> AppResult<Self> {
        let context = match &config.backend {
            BackendMode::Remote(backend) => {
                let rest = Arc::new(RestBackend::new(backend)?);
                info!(url = %backend.url, "Using hosted backend");
                Self::with_backend(config.clone(), rest.clone(), rest)
            }
            BackendMode::Provided => {
                return Err(AppError::config(
                    "No backend configured; pass one to AppContext::with_backend",
                ))
            }
            #[cfg(feature = "demo")]
            BackendMode::Demo => {
                let memory = Arc::new(demo_backend(&config));
                info!("Using in-memory demo backend");
                Self::with_backend(config.clone(), memory.clone(), memory)
            }
        };
        Ok(context)
    }

    /// Wire every store onto the given backend.
    ///
    /// Must run inside a tokio runtime.
    pub fn with_backend(
        config: GatewayConfig,
        auth: Arc<dyn AuthApi>,
        tables: Arc<dyn TableApi>,
    ) -> Self {
        let repos = Repositories::new(tables.clone());
        let cache = QueryCache::new(config.cache.clone());
        let queries = Queries::new(cache.clone(), repos.clone());
        let session = SessionStore::new(auth, tables, repos.profiles.clone());
        let actors: Arc<dyn ActorSource> = Arc::new(session.clone());
        let toasts = ToastQueue::new();
        let audit = AuditTrail::new();

        let sellers = SellerController::new(
            SellerModeration::new(repos.sellers.clone()),
            cache.clone(),
            actors.clone(),
            toasts.clone(),
            audit.clone(),
        );
        let products = ProductController::new(
            ProductModeration::new(repos.products.clone()),
            cache.clone(),
            actors.clone(),
            toasts.clone(),
            audit.clone(),
        );
        let categories = CategoryEditor::new(queries.clone(), actors, toasts.clone(), audit.clone());
        let watcher = session.watch_events(cache.clone());

        Self {
            config,
            cache,
            queries,
            session,
            toasts,
            audit,
            sellers,
            products,
            categories,
            preferences: RwLock::new(Preferences::default()),
            watcher: Mutex::new(Some(watcher)),
        }
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn set_preferences(&self, preferences: Preferences) {
        *self.preferences.write().unwrap_or_else(|p| p.into_inner()) = preferences;
    }

    /// Stop the subscriber, end the session and drop cached data
    pub async fn dispose(&self) {
        let watcher = self.watcher.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        if let Err(err) = self.session.sign_out().await {
            warn!(code = err.code(), "Sign-out during shutdown failed");
        }
        self.cache.clear();
        self.toasts.clear();
        info!("Application context disposed");
    }
}

/// Seeded in-memory backend, plus the configured demo login
#[cfg(feature = "demo")]
fn demo_backend(config: &GatewayConfig) -> backend_client::MemoryBackend {
    let memory = backend_client::fixtures::seeded_backend();
    if let (Some(email), Some(password)) = (&config.demo_admin_email, &config.demo_admin_password) {
        memory.seed_account(
            email,
            password,
            serde_json::json!({ "full_name": "Demo Admin", "role": domain::ROLE_ADMIN }),
        );
    }
    memory
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_without_backend_is_config_error() {
        let err = AppContext::init(GatewayConfig::provided()).await.err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
    }
}
