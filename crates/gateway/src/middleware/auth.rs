//! Private-route guard.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use domain::ROUTE_SIGN_IN;
use workflow::Actor;

use crate::state::AppState;

/// See-other redirect to the sign-in page
pub fn sign_in_redirect() -> Response {
    Redirect::to(ROUTE_SIGN_IN).into_response()
}

/// Guard for protected routes.
///
/// Refreshes an expired access token first. Without a usable session the
/// request is redirected to the sign-in page; otherwise the signed-in admin
/// is inserted into the request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let session = match state.session.ensure_fresh().await {
        Ok(session) => session,
        Err(err) => {
            debug!(code = err.code(), "Session refresh failed");
            None
        }
    };

    let Some(session) = session else {
        debug!(path = %request.uri().path(), "Redirecting to sign-in");
        return sign_in_redirect();
    };

    request.extensions_mut().insert(Actor {
        id: session.user.id,
        email: session.user.email,
    });
    next.run(request).await
}
