//! List users command handler

use crate::config::Config;
use crate::db::Store;

pub async fn cmd_list_users(config: &Config) -> anyhow::Result<()> {
    let store = Store::connect(&config.general.database_path).await?;
    let users = store.list_users().await?;

    if users.is_empty() {
        println!("No users registered.");
    } else {
        println!("Users ({} total)", users.len());
        println!("{:-<70}", "");

        for user in &users {
            println!("{:<6} {:<40} {}", user.role, user.email, user.name);
        }
    }

    store.close().await
}
