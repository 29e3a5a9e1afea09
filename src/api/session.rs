//! Identity snapshot kept in the server-side session.
//!
//! The session cookie only carries the opaque id; everything below lives in
//! the `sessions` table.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tower_sessions::{Expiry, Session};

use super::ApiError;
use crate::config::SessionConfig;
use crate::models::user::Identity;

/// Session key under which the signed-in user is stored.
pub const SESSION_USER_KEY: &str = "user";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionUser {
    identity: Identity,

    /// Absolute expiry (unix seconds) for non-rolling sessions.
    #[serde(default)]
    expires_at: Option<i64>,
}

/// Starts a fresh session for `identity`.
///
/// The session id is rotated first so an id planted before login is never
/// promoted to an authenticated one.
pub async fn establish(
    session: &Session,
    identity: &Identity,
    config: &SessionConfig,
) -> Result<(), ApiError> {
    session.cycle_id().await?;

    let expires_at = if config.rolling {
        session.set_expiry(Some(Expiry::OnInactivity(Duration::minutes(
            config.expiry_minutes,
        ))));
        None
    } else {
        let at = OffsetDateTime::now_utc() + Duration::minutes(config.expiry_minutes);
        session.set_expiry(Some(Expiry::AtDateTime(at)));
        Some(at.unix_timestamp())
    };

    session
        .insert(
            SESSION_USER_KEY,
            SessionUser {
                identity: identity.clone(),
                expires_at,
            },
        )
        .await?;

    Ok(())
}

/// The identity stored in this session, or `None` for anonymous callers.
pub async fn current_identity(session: &Session) -> Result<Option<Identity>, ApiError> {
    let Some(user) = session.get::<SessionUser>(SESSION_USER_KEY).await? else {
        return Ok(None);
    };

    if let Some(expires_at) = user.expires_at
        && expires_at <= OffsetDateTime::now_utc().unix_timestamp()
    {
        session.flush().await?;
        return Ok(None);
    }

    Ok(Some(user.identity))
}

/// Replaces the snapshot, keeping the original expiry.
pub async fn replace_identity(session: &Session, identity: Identity) -> Result<(), ApiError> {
    let expires_at = session
        .get::<SessionUser>(SESSION_USER_KEY)
        .await?
        .and_then(|user| user.expires_at);

    session
        .insert(
            SESSION_USER_KEY,
            SessionUser {
                identity,
                expires_at,
            },
        )
        .await?;

    Ok(())
}
