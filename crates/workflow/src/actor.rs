//! Who is performing an admin action.

use serde::Serialize;

use common::AppError;
use session::SessionStore;

/// The signed-in admin stamped onto reviews and audit entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Actor {
    pub id: String,
    pub email: Option<String>,
}

/// Source of the current admin identity.
pub trait ActorSource: Send + Sync {
    /// `None` when nobody is signed in
    fn current_admin(&self) -> Option<Actor>;

    /// Hook for errors raised while acting, e.g. an expired session
    fn report_error(&self, _err: &AppError) {}
}

impl ActorSource for SessionStore {
    fn current_admin(&self) -> Option<Actor> {
        self.current_session().map(|session| Actor {
            id: session.user.id,
            email: session.user.email,
        })
    }

    fn report_error(&self, err: &AppError) {
        self.handle_error(err);
    }
}
