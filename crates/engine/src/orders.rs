//! Business order ledger primitives.
//!
//! `total_income_minor` and `profit_minor` are functions of stored fields
//! (quantity, unit price, expenses) and are computed at read time. They are
//! never persisted, so they cannot drift from their inputs.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, order_expenses::OrderExpense};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Done,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }
}

impl TryFrom<&str> for OrderStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid order status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Option<Uuid>,
    pub customer: String,
    pub note: Option<String>,
    pub quantity: i64,
    pub unit_price_minor: i64,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        user_id: Uuid,
        family_id: Option<Uuid>,
        customer: String,
        note: Option<String>,
        quantity: i64,
        unit_price_minor: i64,
        ordered_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if quantity <= 0 {
            return Err(EngineError::InvalidAmount(
                "quantity must be > 0".to_string(),
            ));
        }
        if unit_price_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "unit_price_minor must be > 0".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            family_id,
            customer,
            note,
            quantity,
            unit_price_minor,
            status: OrderStatus::Pending,
            ordered_at,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn total_income_minor(&self) -> i64 {
        self.quantity * self.unit_price_minor
    }
}

/// An order together with its read-time derived totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithTotals {
    pub order: Order,
    pub expenses_minor: i64,
}

impl OrderWithTotals {
    pub fn from_expenses(order: Order, expenses: &[OrderExpense]) -> Self {
        let expenses_minor = expenses.iter().map(|e| e.amount_minor).sum();
        Self {
            order,
            expenses_minor,
        }
    }

    pub fn total_income_minor(&self) -> i64 {
        self.order.total_income_minor()
    }

    pub fn profit_minor(&self) -> i64 {
        self.order.total_income_minor() - self.expenses_minor
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Option<Uuid>,
    pub customer: String,
    pub note: Option<String>,
    pub quantity: i64,
    pub unit_price_minor: i64,
    pub status: String,
    pub ordered_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_expenses::Entity")]
    OrderExpenses,
}

impl Related<super::order_expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderExpenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Order> for ActiveModel {
    fn from(order: &Order) -> Self {
        Self {
            id: ActiveValue::Set(order.id),
            user_id: ActiveValue::Set(order.user_id),
            family_id: ActiveValue::Set(order.family_id),
            customer: ActiveValue::Set(order.customer.clone()),
            note: ActiveValue::Set(order.note.clone()),
            quantity: ActiveValue::Set(order.quantity),
            unit_price_minor: ActiveValue::Set(order.unit_price_minor),
            status: ActiveValue::Set(order.status.as_str().to_string()),
            ordered_at: ActiveValue::Set(order.ordered_at),
            created_at: ActiveValue::Set(order.created_at),
            updated_at: ActiveValue::Set(order.updated_at),
        }
    }
}

impl TryFrom<Model> for Order {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            family_id: model.family_id,
            customer: model.customer,
            note: model.note,
            quantity: model.quantity,
            unit_price_minor: model.unit_price_minor,
            status: OrderStatus::try_from(model.status.as_str())?,
            ordered_at: model.ordered_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(quantity: i64, unit_price_minor: i64) -> Order {
        Order::new(
            Uuid::new_v4(),
            None,
            "Bu Sari".to_string(),
            None,
            quantity,
            unit_price_minor,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn total_income_is_quantity_times_unit_price() {
        assert_eq!(order(10, 5000).total_income_minor(), 50_000);
    }

    #[test]
    fn profit_follows_expenses() {
        let order = order(10, 5000);
        let expense = OrderExpense::new(order.id, "bahan".to_string(), 12_000, Utc::now()).unwrap();

        let with_expense = OrderWithTotals::from_expenses(order.clone(), &[expense]);
        assert_eq!(with_expense.profit_minor(), 38_000);

        // Deleting the expense restores the raw margin.
        let without = OrderWithTotals::from_expenses(order, &[]);
        assert_eq!(without.profit_minor(), 50_000);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let err = Order::new(
            Uuid::new_v4(),
            None,
            "x".to_string(),
            None,
            0,
            100,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidAmount("quantity must be > 0".to_string())
        );
    }
}
