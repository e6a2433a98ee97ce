//! Landing, sign-in, sign-up and sign-out.

use axum::{
    extract::State,
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use common::AppResult;
use domain::{ROUTE_DASHBOARD, ROUTE_SIGN_IN, ROUTE_SIGN_UP};
use session::{SignInCredentials, SignUpCredentials};

use crate::extractors::ValidatedJson;
use crate::handlers::Link;
use crate::middleware::sign_in_redirect;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct LandingView {
    pub title: String,
    pub tagline: String,
    pub authenticated: bool,
    pub links: Vec<Link>,
}

/// Empty auth form description
#[derive(Debug, Serialize, ToSchema)]
pub struct FormView {
    pub title: String,
    pub action: String,
    pub fields: Vec<String>,
    pub alternate: Link,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: String,
    pub email: Option<String>,
    pub redirect_to: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignUpResponse {
    pub user_id: String,
    pub confirmation_required: bool,
    pub message: String,
    pub redirect_to: String,
}

/// Create public auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/signin", get(sign_in_page).post(sign_in))
        .route("/signup", get(sign_up_page).post(sign_up))
        .route("/signout", post(sign_out))
}

/// Public landing page
#[utoipa::path(
    get,
    path = "/",
    tag = "Authentication",
    responses((status = 200, description = "Landing page", body = LandingView))
)]
pub async fn landing(State(state): State<AppState>) -> Json<LandingView> {
    let authenticated = state.session.is_authenticated();
    let links = if authenticated {
        vec![Link::new("Go to dashboard", ROUTE_DASHBOARD)]
    } else {
        vec![
            Link::new("Sign in", ROUTE_SIGN_IN),
            Link::new("Create an admin account", ROUTE_SIGN_UP),
        ]
    };

    Json(LandingView {
        title: "Marketplace Admin".to_string(),
        tagline: "Verify sellers, moderate products and keep the catalogue tidy".to_string(),
        authenticated,
        links,
    })
}

pub async fn sign_in_page(State(state): State<AppState>) -> Response {
    if state.session.is_authenticated() {
        return Redirect::to(ROUTE_DASHBOARD).into_response();
    }
    Json(FormView {
        title: "Sign in".to_string(),
        action: ROUTE_SIGN_IN.to_string(),
        fields: vec!["email".to_string(), "password".to_string()],
        alternate: Link::new("Need an account? Sign up", ROUTE_SIGN_UP),
    })
    .into_response()
}

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/signin",
    tag = "Authentication",
    request_body = SignInCredentials,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    ValidatedJson(credentials): ValidatedJson<SignInCredentials>,
) -> AppResult<Json<AuthResponse>> {
    let user = state.session.sign_in(credentials).await?;
    Ok(Json(AuthResponse {
        user_id: user.id,
        email: user.email,
        redirect_to: ROUTE_DASHBOARD.to_string(),
    }))
}

pub async fn sign_up_page(State(state): State<AppState>) -> Response {
    if state.session.is_authenticated() {
        return Redirect::to(ROUTE_DASHBOARD).into_response();
    }
    Json(FormView {
        title: "Create an admin account".to_string(),
        action: ROUTE_SIGN_UP.to_string(),
        fields: ["email", "password", "full_name", "store_name"]
            .into_iter()
            .map(String::from)
            .collect(),
        alternate: Link::new("Already registered? Sign in", ROUTE_SIGN_IN),
    })
    .into_response()
}

/// Register an admin account
#[utoipa::path(
    post,
    path = "/signup",
    tag = "Authentication",
    request_body = SignUpCredentials,
    responses(
        (status = 200, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(credentials): ValidatedJson<SignUpCredentials>,
) -> AppResult<Json<SignUpResponse>> {
    let outcome = state.session.sign_up(credentials).await?;

    let (message, redirect_to) = if outcome.confirmation_required {
        ("Check your email to confirm the account, then sign in", ROUTE_SIGN_IN)
    } else {
        ("Account created", ROUTE_DASHBOARD)
    };
    Ok(Json(SignUpResponse {
        user_id: outcome.user_id,
        confirmation_required: outcome.confirmation_required,
        message: message.to_string(),
        redirect_to: redirect_to.to_string(),
    }))
}

/// Sign out everywhere and return to the sign-in page
#[utoipa::path(
    post,
    path = "/signout",
    tag = "Authentication",
    responses((status = 303, description = "Signed out, redirected to sign-in"))
)]
pub async fn sign_out(State(state): State<AppState>) -> Response {
    if let Err(err) = state.session.sign_out().await {
        warn!(code = err.code(), "Remote sign-out failed; signed out locally");
        state
            .toasts
            .error("Signed out on this device only", err.user_message());
    }
    sign_in_redirect()
}
