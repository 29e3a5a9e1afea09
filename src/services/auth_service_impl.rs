//! `SeaORM` implementation of the `AuthService` trait.

use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tokio::task;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::{NewUser, Store};
use crate::db::repositories::user::{hash_password, verify_password};
use crate::models::user::{Identity, Role, User};
use crate::services::auth_service::{AuthError, AuthService, Registration};
use crate::services::validation::{
    validate_email, validate_login_password, validate_name, validate_new_password,
};

/// Verified against when the email is unknown, so that a miss costs the same
/// hash computation as a wrong password.
const DUMMY_PASSWORD: &str = "members-dummy-password";

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    dummy_hash: OnceCell<String>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self {
            store,
            security,
            dummy_hash: OnceCell::const_new(),
        }
    }

    async fn dummy_hash(&self) -> Result<String, AuthError> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| async {
                let security = self.security.clone();
                task::spawn_blocking(move || hash_password(DUMMY_PASSWORD, &security))
                    .await
                    .context("Password hashing task panicked")?
            })
            .await?;

        Ok(hash.clone())
    }

    fn require_admin(caller: &Identity) -> Result<(), AuthError> {
        if caller.is_admin() {
            Ok(())
        } else {
            warn!(caller = %caller.email, "Rejected admin operation from non-admin");
            Err(AuthError::Forbidden)
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: Registration) -> Result<Identity, AuthError> {
        let name = validate_name(&registration.name)?.to_string();
        let email = validate_email(&registration.email)?.to_string();
        validate_new_password(&registration.password, self.security.min_password_length)?;

        let password = registration.password;
        let security = self.security.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .context("Password hashing task panicked")??;

        let created = self
            .store
            .create_user(NewUser {
                email,
                name,
                password_hash,
                role: Role::User,
            })
            .await?;

        let Some(user) = created else {
            metrics::counter!("auth_events_total", "event" => "signup_conflict").increment(1);
            return Err(AuthError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        };

        metrics::counter!("auth_events_total", "event" => "signup").increment(1);
        info!(event = "signup", user_id = user.id, email = %user.email, "User registered");

        Ok(Identity::from(&user))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = validate_email(email)?;
        validate_login_password(password)?;

        let (user, password_hash) = match self.store.get_user_by_email_with_password(email).await? {
            Some((user, hash)) => (Some(user), hash),
            None => (None, self.dummy_hash().await?),
        };

        let password = password.to_string();
        let is_valid = task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        match user {
            Some(user) if is_valid => {
                metrics::counter!("auth_events_total", "event" => "login").increment(1);
                info!(event = "login", user_id = user.id, "User authenticated");
                Ok(Identity::from(&user))
            }
            _ => {
                metrics::counter!("auth_events_total", "event" => "login_failed").increment(1);
                info!(event = "login_failed", "Authentication failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    async fn current_identity(&self, email: &str) -> Result<Option<Identity>, AuthError> {
        let user = self.store.get_user_by_email(email).await?;
        Ok(user.as_ref().map(Identity::from))
    }

    async fn list_users(&self, caller: &Identity) -> Result<Vec<User>, AuthError> {
        Self::require_admin(caller)?;
        Ok(self.store.list_users().await?)
    }

    async fn set_role(
        &self,
        caller: &Identity,
        email: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        Self::require_admin(caller)?;

        let user = self
            .store
            .set_user_role(email, role)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("No user with email {email}")))?;

        if caller.email == user.email && role != Role::Admin {
            warn!(admin = %caller.email, "Admin removed their own admin role");
        }

        metrics::counter!("auth_events_total", "event" => "role_changed").increment(1);
        info!(
            event = "role_changed",
            by = %caller.email,
            target = %user.email,
            role = %role,
            "User role updated"
        );

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> SeaOrmAuthService {
        let db_path =
            std::env::temp_dir().join(format!("members-auth-test-{}.db", uuid::Uuid::new_v4()));
        let store = Store::connect(&format!("sqlite:{}", db_path.display()))
            .await
            .unwrap();

        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        };
        SeaOrmAuthService::new(store, security)
    }

    fn alice() -> Registration {
        Registration {
            name: "Alice".to_string(),
            email: "alice@x.com".to_string(),
            password: "secret1".to_string(),
        }
    }

    fn admin() -> Identity {
        Identity {
            email: "root@x.com".to_string(),
            name: "Root".to_string(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let auth = service().await;

        let identity = auth.register(alice()).await.unwrap();
        assert_eq!(identity.name, "Alice");
        assert_eq!(identity.role, Role::User);

        let identity = auth.authenticate("alice@x.com", "secret1").await.unwrap();
        assert_eq!(identity.name, "Alice");
        assert_eq!(identity.role, Role::User);
    }

    #[tokio::test]
    async fn test_password_is_stored_hashed() {
        let auth = service().await;
        auth.register(alice()).await.unwrap();

        let (_, hash) = auth
            .store
            .get_user_by_email_with_password("alice@x.com")
            .await
            .unwrap()
            .unwrap();
        assert!(!hash.is_empty());
        assert_ne!(hash, "secret1");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let auth = service().await;
        auth.register(alice()).await.unwrap();

        let mut again = alice();
        again.name = "Impostor".to_string();
        let err = auth.register(again).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));

        let users = auth.list_users(&admin()).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Alice");
    }

    #[tokio::test]
    async fn test_email_is_case_sensitive() {
        let auth = service().await;
        auth.register(alice()).await.unwrap();

        let err = auth.authenticate("Alice@x.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let auth = service().await;

        let mut short = alice();
        short.password = "12345".to_string();
        assert!(matches!(
            auth.register(short).await.unwrap_err(),
            AuthError::Validation(_)
        ));

        let mut blank = alice();
        blank.name = "  ".to_string();
        assert!(matches!(
            auth.register(blank).await.unwrap_err(),
            AuthError::Validation(_)
        ));

        let mut bad_email = alice();
        bad_email.email = "alice".to_string();
        assert!(matches!(
            auth.register(bad_email).await.unwrap_err(),
            AuthError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
        let auth = service().await;
        auth.register(alice()).await.unwrap();

        let wrong = auth.authenticate("alice@x.com", "wrong!!").await.unwrap_err();
        let unknown = auth.authenticate("bob@x.com", "secret1").await.unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_promote_then_demote_restores_role() {
        let auth = service().await;
        auth.register(alice()).await.unwrap();

        let promoted = auth.promote(&admin(), "alice@x.com").await.unwrap();
        assert_eq!(promoted.role, Role::Admin);

        let demoted = auth.demote(&admin(), "alice@x.com").await.unwrap();
        assert_eq!(demoted.role, Role::User);

        let identity = auth.authenticate("alice@x.com", "secret1").await.unwrap();
        assert_eq!(identity.role, Role::User);
    }

    #[tokio::test]
    async fn test_promote_by_non_admin_is_forbidden() {
        let auth = service().await;
        let alice = auth.register(alice()).await.unwrap();

        let err = auth.promote(&alice, "alice@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::Forbidden));

        let user = auth.store.get_user_by_email("alice@x.com").await.unwrap().unwrap();
        assert_eq!(user.role, Role::User);
    }

    #[tokio::test]
    async fn test_promote_unknown_email_is_not_found() {
        let auth = service().await;
        let err = auth.promote(&admin(), "ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_current_identity_reflects_store() {
        let auth = service().await;
        auth.register(alice()).await.unwrap();
        auth.promote(&admin(), "alice@x.com").await.unwrap();

        let identity = auth.current_identity("alice@x.com").await.unwrap().unwrap();
        assert_eq!(identity.role, Role::Admin);
        assert!(auth.current_identity("ghost@x.com").await.unwrap().is_none());
    }
}
