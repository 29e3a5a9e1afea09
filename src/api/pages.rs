use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, AppState, guards, views};
use crate::models::user::Identity;

/// GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Html<String>, ApiError> {
    let identity = guards::resolve_identity(&state, &session).await?;
    Ok(Html(views::index(identity.as_ref())))
}

/// GET /members
pub async fn members(Extension(identity): Extension<Identity>) -> Html<String> {
    Html(views::members(&identity))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(e) => {
            tracing::error!("Health check failed: {e:#}");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    }
}

pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Html(views::not_found()))
}
