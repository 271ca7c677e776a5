//! Identities table (credential issuer side).
//!
//! The engine never authenticates against this table; it only reads the
//! metadata (email, display name, role hint) when provisioning a profile on
//! first resolve. Credential checks live at the HTTP boundary.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "identities")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub name: String,
    /// Optional role hint ("ayah"/"ibu") used as the provisioning default.
    pub role: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
