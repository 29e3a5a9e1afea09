use axum::{
    Form,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::{Session, cookie::Cookie};

use super::{ApiError, AppState, session, views};
use crate::services::Registration;

pub const MEMBERS_PATH: &str = "/members";

// ============================================================================
// Request Types
// ============================================================================

// Missing fields deserialize as empty strings so they fail validation
// instead of being rejected by the extractor.
#[derive(Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /signup
pub async fn signup_form() -> Html<String> {
    Html(views::signup_form())
}

/// POST /signup
/// Create a `user` account and sign it in
pub async fn signup(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Redirect, ApiError> {
    let identity = state
        .auth
        .register(Registration {
            name: form.name,
            email: form.email,
            password: form.password,
        })
        .await
        .map_err(|e| ApiError::auth(e, "/signup"))?;

    session::establish(&session, &identity, &state.config.session).await?;

    Ok(Redirect::to(MEMBERS_PATH))
}

/// GET /login
pub async fn login_form() -> Html<String> {
    Html(views::login_form())
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect, ApiError> {
    let identity = state
        .auth
        .authenticate(&form.email, &form.password)
        .await
        .map_err(|e| ApiError::auth(e, "/login"))?;

    session::establish(&session, &identity, &state.config.session).await?;

    Ok(Redirect::to(MEMBERS_PATH))
}

/// GET /logout
/// Destroy the session. If the store refuses, the browser is still told to
/// drop its cookie.
pub async fn logout(State(state): State<Arc<AppState>>, session: Session) -> Response {
    match session.flush().await {
        Ok(()) => {
            tracing::info!(event = "logout", "Session destroyed");
            Redirect::to("/").into_response()
        }
        Err(e) => {
            tracing::error!("Failed to destroy session: {e}");
            let removal = removal_cookie(&state.config.session.cookie_name);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::SET_COOKIE, removal)],
                Html(views::message(
                    "Error logging out",
                    "Your session could not be closed on the server.",
                    ("/", "Home"),
                )),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn removal_cookie(name: &str) -> String {
    let mut cookie = Cookie::new(name.to_string(), "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let cookie = removal_cookie("members.sid");
        assert!(cookie.starts_with("members.sid=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Path=/"));
    }
}
