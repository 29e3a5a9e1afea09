#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use members::api::AppState;
use members::config::Config;
use members::models::user::Role;
use std::sync::Arc;
use tower::ServiceExt;
use tower_sessions::cookie::Cookie;
use tower_sessions_sqlx_store::sqlx;

pub fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("members-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.observability.metrics_enabled = false;
    config.session.secret = Some("k".repeat(64));
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub async fn spawn_app_with_config(config: Config) -> (Arc<AppState>, Router) {
    let state = members::api::create_app_state_from_config(config, None)
        .await
        .expect("failed to create app state");
    let router = members::api::router(state.clone());
    (state, router)
}

pub async fn spawn_app() -> (Arc<AppState>, Router) {
    spawn_app_with_config(test_config()).await
}

/// A browser stand-in: remembers the session cookie between requests.
pub struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    pub fn new(app: &Router) -> Self {
        Self {
            app: app.clone(),
            cookie: None,
        }
    }

    pub fn with_cookie(app: &Router, cookie: &str) -> Self {
        Self {
            app: app.clone(),
            cookie: Some(cookie.to_string()),
        }
    }

    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    async fn send(&mut self, request: Request<Body>) -> Response<Body> {
        let response = self.app.clone().oneshot(request).await.unwrap();

        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(set_cookie.to_str().unwrap()).unwrap();
            if is_removal(&cookie) {
                self.cookie = None;
            } else {
                self.cookie = Some(format!("{}={}", cookie.name(), cookie.value()));
            }
        }

        response
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn signup(&mut self, name: &str, email: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/signup",
            &[("name", name), ("email", email), ("password", password)],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Response<Body> {
        self.post_form("/login", &[("email", email), ("password", password)])
            .await
    }
}

/// A `Set-Cookie` that tells the browser to drop the cookie.
pub fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.value().is_empty() || cookie.max_age().is_some_and(|age| age.is_zero())
}

/// Expiry of the only stored session row.
pub async fn stored_session_expiry(state: &AppState) -> time::OffsetDateTime {
    sqlx::query_scalar("SELECT expiry_date FROM sessions")
        .fetch_one(state.store().conn.get_sqlite_connection_pool())
        .await
        .unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert!(
        response.status().is_redirection(),
        "expected redirect, got {}",
        response.status()
    );
    assert_eq!(location(response), Some(to));
}

pub fn assert_status(response: &Response<Body>, status: StatusCode) {
    assert_eq!(response.status(), status);
}

/// Signs up an account and makes it an admin directly in the store.
pub async fn admin_client(state: &AppState, app: &Router, email: &str) -> Client {
    let mut client = Client::new(app);
    client.signup("Admin", email, "adminpass").await;
    state
        .store()
        .set_user_role(email, Role::Admin)
        .await
        .unwrap()
        .unwrap();

    // the signup session still carries the `user` snapshot
    let mut client = Client::new(app);
    let response = client.login(email, "adminpass").await;
    assert_redirect(&response, "/members");
    client
}
