//! Appearance and notification preferences.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use tracing::debug;

use crate::extractors::ValidatedJson;
use crate::preferences::Preferences;
use crate::state::AppState;

/// Create settings routes
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings).put(update_settings))
        .route("/theme/toggle", post(toggle_theme))
}

/// Current preferences
#[utoipa::path(
    get,
    path = "/settings",
    tag = "Settings",
    responses((status = 200, description = "Current preferences", body = Preferences))
)]
pub async fn get_settings(State(state): State<AppState>) -> Json<Preferences> {
    Json(state.preferences())
}

/// Replace the preferences
#[utoipa::path(
    put,
    path = "/settings",
    tag = "Settings",
    request_body = Preferences,
    responses(
        (status = 200, description = "Preferences saved", body = Preferences),
        (status = 400, description = "Invalid preferences")
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    ValidatedJson(preferences): ValidatedJson<Preferences>,
) -> Json<Preferences> {
    state.set_preferences(preferences.clone());
    state
        .toasts
        .success("Settings saved", "Your preferences have been updated");
    Json(preferences)
}

/// Switch between light and dark
#[utoipa::path(
    post,
    path = "/settings/theme/toggle",
    tag = "Settings",
    responses((status = 200, description = "Theme switched", body = Preferences))
)]
pub async fn toggle_theme(State(state): State<AppState>) -> Json<Preferences> {
    let mut preferences = state.preferences();
    preferences.theme = preferences.theme.toggled();
    debug!(theme = ?preferences.theme, "Theme toggled");
    state.set_preferences(preferences.clone());
    Json(preferences)
}
