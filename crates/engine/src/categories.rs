//! Household category registry.
//!
//! Defaults are global (`is_default = true`, no owner) and read-only; custom
//! categories are scoped to the user who created them.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdCategory {
    pub id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub user_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "household_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub name_norm: String,
    pub is_default: bool,
    pub user_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::household::Entity")]
    HouseholdTransactions,
}

impl Related<super::household::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HouseholdTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for HouseholdCategory {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            is_default: model.is_default,
            user_id: model.user_id,
        }
    }
}

impl From<&HouseholdCategory> for ActiveModel {
    fn from(category: &HouseholdCategory) -> Self {
        Self {
            id: ActiveValue::Set(category.id),
            name: ActiveValue::Set(category.name.clone()),
            name_norm: ActiveValue::Set(crate::util::normalize_name_key(&category.name)),
            is_default: ActiveValue::Set(category.is_default),
            user_id: ActiveValue::Set(category.user_id),
        }
    }
}
