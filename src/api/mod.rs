use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore, cookie::Key, cookie::SameSite,
};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::warn;

use crate::config::{Config, SessionConfig};
use crate::db::Store;
use crate::services::{AuthService, SeaOrmAuthService};

mod admin;
mod assets;
pub mod auth;
mod error;
pub mod guards;
mod observability;
mod pages;
pub mod session;
mod views;

pub use error::ApiError;

use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub auth: Arc<dyn AuthService>,

    pub sessions: SqliteStore,

    pub session_key: Key,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }
}

/// Cookie signing key from `session.secret`, or a throwaway one.
fn session_key(config: &SessionConfig) -> anyhow::Result<Key> {
    match &config.secret {
        Some(secret) => Key::try_from(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid session secret: {e}")),
        None => {
            warn!("No session secret configured; sessions will not survive a restart");
            Ok(Key::generate())
        }
    }
}

pub async fn create_app_state(
    config: Config,
    store: Store,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let sessions = store.session_store().await?;
    let session_key = session_key(&config.session)?;

    let auth = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        config.security.clone(),
    )) as Arc<dyn AuthService>;

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        auth,
        sessions,
        session_key,
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    create_app_state(config, store, prometheus_handle).await
}

pub fn router(state: Arc<AppState>) -> Router {
    let sessions = state.sessions.clone();
    router_with_session_store(state, sessions)
}

/// Builds the app over any session backend; [`router`] uses the `SQLite` one.
pub fn router_with_session_store<S>(state: Arc<AppState>, sessions: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_config = &state.config.session;

    let session_layer = SessionManagerLayer::new(sessions)
        .with_name(session_config.cookie_name.clone())
        .with_secure(state.config.server.secure_cookies)
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_config.expiry_minutes,
        )))
        // Rolling sessions are re-saved on every request so the expiry moves.
        .with_always_save(session_config.rolling)
        .with_signed(state.session_key.clone());

    let member_routes = Router::new()
        .route("/members", get(pages::members))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guards::authenticated,
        ));

    let admin_routes = Router::new()
        .route("/admin", get(admin::list_users))
        .route("/promote", post(admin::promote))
        .route("/demote", post(admin::demote))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), guards::admin));

    Router::new()
        .route("/", get(pages::index))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/health", get(pages::health))
        .route("/static/{*path}", get(assets::serve_asset))
        .merge(member_routes)
        .merge(admin_routes)
        .fallback(pages::not_found)
        .layer(session_layer)
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
