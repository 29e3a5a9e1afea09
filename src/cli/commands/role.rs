//! Promote/demote command handler
//!
//! Runs with direct database access, so it is not subject to the admin gate.
//! This is how the first admin gets created.

use crate::config::Config;
use crate::db::Store;
use crate::models::user::Role;

pub async fn cmd_set_role(config: &Config, email: &str, role: Role) -> anyhow::Result<()> {
    let store = Store::connect(&config.general.database_path).await?;

    let result = store.set_user_role(email, role).await;
    store.close().await?;

    match result? {
        Some(user) => {
            println!("✓ {} is now {}", user.email, user.role);
            tracing::info!(event = "role_changed", by = "cli", target = %user.email, role = %role, "User role updated");
            Ok(())
        }
        None => anyhow::bail!("No user with email {email}"),
    }
}
