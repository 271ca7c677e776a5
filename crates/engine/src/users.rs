//! Application-level user profiles.
//!
//! A `User` is keyed by its identity id and carries the household role plus
//! the optional family link. The family link is a weak reference: joining and
//! leaving a family only ever touch `family_id`.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// Household role of a profile.
///
/// The two roles are mutually exclusive within a family: a family holds at
/// most one `ayah` and one `ibu`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Ayah,
    Ibu,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ayah => "ayah",
            Self::Ibu => "ibu",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "ayah" => Ok(Self::Ayah),
            "ibu" => Ok(Self::Ibu),
            other => Err(EngineError::InvalidRole(format!("invalid role: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub family_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub family_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::families::Entity",
        from = "Column::FamilyId",
        to = "super::families::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Families,
}

impl Related<super::families::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Families.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&User> for ActiveModel {
    fn from(user: &User) -> Self {
        Self {
            id: ActiveValue::Set(user.id),
            email: ActiveValue::Set(user.email.clone()),
            name: ActiveValue::Set(user.name.clone()),
            role: ActiveValue::Set(user.role.as_str().to_string()),
            family_id: ActiveValue::Set(user.family_id),
            created_at: ActiveValue::Set(user.created_at),
            updated_at: ActiveValue::Set(user.updated_at),
        }
    }
}

impl TryFrom<Model> for User {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            email: model.email,
            name: model.name,
            role: Role::try_from(model.role.as_str())?,
            family_id: model.family_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        assert_eq!(Role::try_from("ayah").unwrap(), Role::Ayah);
        assert_eq!(Role::try_from("ibu").unwrap(), Role::Ibu);
        assert_eq!(Role::Ayah.as_str(), "ayah");
        assert_eq!(Role::Ibu.as_str(), "ibu");
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(
            Role::try_from("anak"),
            Err(EngineError::InvalidRole("invalid role: anak".to_string()))
        );
    }
}
