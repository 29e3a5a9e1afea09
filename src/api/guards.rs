//! Access control for protected routes.
//!
//! The checks themselves are plain predicates over the session identity;
//! the middleware below only turns their verdict into a response.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, AppState, session};
use crate::models::user::{Identity, Role};

pub const LOGIN_PATH: &str = "/login";

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    /// No live session: send the browser to the login form.
    LoginRequired,

    /// Signed in, but without the required role.
    Forbidden,
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            Self::LoginRequired => Redirect::to(LOGIN_PATH).into_response(),
            Self::Forbidden => ApiError::Forbidden.into_response(),
        }
    }
}

pub const fn require_authenticated(
    identity: Option<&Identity>,
) -> Result<&Identity, GateRejection> {
    match identity {
        Some(identity) => Ok(identity),
        None => Err(GateRejection::LoginRequired),
    }
}

/// Always runs [`require_authenticated`] first, so a missing session is a
/// redirect and never a 403.
pub fn require_role(identity: Option<&Identity>, role: Role) -> Result<&Identity, GateRejection> {
    let identity = require_authenticated(identity)?;
    if identity.role == role {
        Ok(identity)
    } else {
        Err(GateRejection::Forbidden)
    }
}

pub fn require_admin(identity: Option<&Identity>) -> Result<&Identity, GateRejection> {
    require_role(identity, Role::Admin)
}

type Check = for<'a> fn(Option<&'a Identity>) -> Result<&'a Identity, GateRejection>;

/// Identity for this request, re-read from the users table when
/// `session.live_identity` is on.
pub(super) async fn resolve_identity(
    state: &AppState,
    session: &Session,
) -> Result<Option<Identity>, ApiError> {
    let Some(snapshot) = session::current_identity(session).await? else {
        return Ok(None);
    };

    if !state.config.session.live_identity {
        return Ok(Some(snapshot));
    }

    match state.auth.current_identity(&snapshot.email).await? {
        Some(fresh) => {
            if fresh != snapshot {
                session::replace_identity(session, fresh.clone()).await?;
            }
            Ok(Some(fresh))
        }
        None => {
            tracing::warn!(email = %snapshot.email, "Session user no longer exists");
            session.flush().await?;
            Ok(None)
        }
    }
}

async fn gate(
    state: &AppState,
    session: &Session,
    mut request: Request,
    next: Next,
    check: Check,
) -> Response {
    let identity = match resolve_identity(state, session).await {
        Ok(identity) => identity,
        Err(e) => return e.into_response(),
    };

    match check(identity.as_ref()) {
        Ok(identity) => {
            tracing::Span::current().record("user", identity.email.as_str());
            request.extensions_mut().insert(identity.clone());
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Middleware for routes that need any signed-in user.
pub async fn authenticated(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    gate(&state, &session, request, next, require_authenticated).await
}

/// Middleware for admin-only routes.
pub async fn admin(
    State(state): State<Arc<AppState>>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    gate(&state, &session, request, next, require_admin).await
}
