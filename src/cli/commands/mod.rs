mod init;
mod role;
mod users;

pub use init::cmd_init_config;
pub use role::cmd_set_role;
pub use users::cmd_list_users;
