use axum::{
    Extension, Form,
    extract::State,
    response::{Html, Redirect},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, AppState, views};
use crate::models::user::Identity;

pub const ADMIN_PATH: &str = "/admin";

#[derive(Deserialize)]
pub struct RoleChangeForm {
    #[serde(default)]
    pub email: String,
}

/// GET /admin
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Html<String>, ApiError> {
    let users = state
        .auth
        .list_users(&identity)
        .await
        .map_err(|e| ApiError::auth(e, ADMIN_PATH))?;

    Ok(Html(views::admin(&identity, &users)))
}

/// POST /promote
pub async fn promote(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<RoleChangeForm>,
) -> Result<Redirect, ApiError> {
    state
        .auth
        .promote(&identity, &form.email)
        .await
        .map_err(|e| ApiError::auth(e, ADMIN_PATH))?;

    Ok(Redirect::to(ADMIN_PATH))
}

/// POST /demote
pub async fn demote(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<RoleChangeForm>,
) -> Result<Redirect, ApiError> {
    state
        .auth
        .demote(&identity, &form.email)
        .await
        .map_err(|e| ApiError::auth(e, ADMIN_PATH))?;

    Ok(Redirect::to(ADMIN_PATH))
}
