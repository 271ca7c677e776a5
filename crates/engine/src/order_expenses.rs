//! Per-order expense rows.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpense {
    pub id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    pub amount_minor: i64,
    pub spent_at: DateTime<Utc>,
}

impl OrderExpense {
    pub fn new(
        order_id: Uuid,
        name: String,
        amount_minor: i64,
        spent_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            name,
            amount_minor,
            spent_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    pub amount_minor: i64,
    pub spent_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Orders,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&OrderExpense> for ActiveModel {
    fn from(expense: &OrderExpense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id),
            order_id: ActiveValue::Set(expense.order_id),
            name: ActiveValue::Set(expense.name.clone()),
            amount_minor: ActiveValue::Set(expense.amount_minor),
            spent_at: ActiveValue::Set(expense.spent_at),
        }
    }
}

impl From<Model> for OrderExpense {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            name: model.name,
            amount_minor: model.amount_minor,
            spent_at: model.spent_at,
        }
    }
}
