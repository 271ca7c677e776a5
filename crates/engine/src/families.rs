//! Families group at most two profiles (one `ayah`, one `ibu`).
//!
//! The member list is derived by querying `users` on `family_id`; it is never
//! stored on the family row, so there is exactly one source of truth for
//! membership.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::{Role, User};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Derived member set, at most one user per role.
    pub members: Vec<User>,
}

impl Family {
    /// Returns the member occupying `role`, if any.
    pub fn member_with_role(&self, role: Role) -> Option<&User> {
        self.members.iter().find(|member| member.role == role)
    }

    pub fn role_taken(&self, role: Role) -> bool {
        self.member_with_role(role).is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "families")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::users::Entity")]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Family> for ActiveModel {
    fn from(family: &Family) -> Self {
        Self {
            id: ActiveValue::Set(family.id),
            name: ActiveValue::Set(family.name.clone()),
            created_at: ActiveValue::Set(family.created_at),
            updated_at: ActiveValue::Set(family.updated_at),
        }
    }
}

impl From<Model> for Family {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            created_at: model.created_at,
            updated_at: model.updated_at,
            members: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: format!("{role}@example.com"),
            name: role.as_str().to_string(),
            role,
            family_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn role_slots() {
        let now = Utc::now();
        let mut family = Family {
            id: Uuid::new_v4(),
            name: "Keluarga Test".to_string(),
            created_at: now,
            updated_at: now,
            members: vec![user(Role::Ayah)],
        };

        assert!(family.role_taken(Role::Ayah));
        assert!(!family.role_taken(Role::Ibu));

        family.members.push(user(Role::Ibu));
        assert!(family.role_taken(Role::Ibu));
        assert_eq!(family.member_with_role(Role::Ibu).unwrap().role, Role::Ibu);
    }
}
