use sea_orm::entity::prelude::*;

use crate::models::user::Role;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Identity key. Uniqueness is enforced by the table, not by callers.
    #[sea_orm(unique)]
    pub email: String,

    pub name: String,

    /// Argon2id PHC string
    pub password_hash: String,

    pub role: Role,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
