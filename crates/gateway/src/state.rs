//! Application state for dependency injection.

use std::ops::Deref;
use std::sync::Arc;

use crate::context::AppContext;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub context: Arc<AppContext>,
}

impl AppState {
    /// Create new app state.
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &AppContext {
        &self.context
    }
}
