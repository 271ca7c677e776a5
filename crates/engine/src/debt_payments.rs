//! Repayment rows attached to a debt.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtPayment {
    pub id: Uuid,
    pub debt_id: Uuid,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl DebtPayment {
    pub fn new(
        debt_id: Uuid,
        amount_minor: i64,
        note: Option<String>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            debt_id,
            amount_minor,
            note,
            paid_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debt_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub debt_id: Uuid,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub paid_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::debts::Entity",
        from = "Column::DebtId",
        to = "super::debts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Debts,
}

impl Related<super::debts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Debts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&DebtPayment> for ActiveModel {
    fn from(payment: &DebtPayment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id),
            debt_id: ActiveValue::Set(payment.debt_id),
            amount_minor: ActiveValue::Set(payment.amount_minor),
            note: ActiveValue::Set(payment.note.clone()),
            paid_at: ActiveValue::Set(payment.paid_at),
        }
    }
}

impl From<Model> for DebtPayment {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            debt_id: model.debt_id,
            amount_minor: model.amount_minor,
            note: model.note,
            paid_at: model.paid_at,
        }
    }
}
