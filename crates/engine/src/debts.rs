//! Debt and receivable primitives.
//!
//! The paid amount is derived from the payment rows at read time;
//! `remaining_minor` and `settled` follow from it. Nothing about settlement
//! is stored on the debt row itself.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, debt_payments::DebtPayment};

/// Direction of a debt from the household's point of view.
///
/// `Owed` is money the household must pay back; `Receivable` is money owed
/// to the household.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtDirection {
    Owed,
    Receivable,
}

impl DebtDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owed => "owed",
            Self::Receivable => "receivable",
        }
    }
}

impl TryFrom<&str> for DebtDirection {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "owed" => Ok(Self::Owed),
            "receivable" => Ok(Self::Receivable),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid debt direction: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Option<Uuid>,
    pub counterparty: String,
    pub direction: DebtDirection,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Debt {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        family_id: Option<Uuid>,
        counterparty: String,
        direction: DebtDirection,
        amount_minor: i64,
        note: Option<String>,
        due_date: Option<DateTime<Utc>>,
        occurred_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            family_id,
            counterparty,
            direction,
            amount_minor,
            note,
            due_date,
            occurred_at,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A debt together with its read-time repayment status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtWithStatus {
    pub debt: Debt,
    pub paid_minor: i64,
}

impl DebtWithStatus {
    pub fn from_payments(debt: Debt, payments: &[DebtPayment]) -> Self {
        let paid_minor = payments.iter().map(|p| p.amount_minor).sum();
        Self { debt, paid_minor }
    }

    pub fn remaining_minor(&self) -> i64 {
        self.debt.amount_minor - self.paid_minor
    }

    pub fn settled(&self) -> bool {
        self.remaining_minor() <= 0
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Option<Uuid>,
    pub counterparty: String,
    pub direction: String,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub due_date: Option<DateTimeUtc>,
    pub occurred_at: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::debt_payments::Entity")]
    DebtPayments,
}

impl Related<super::debt_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DebtPayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Debt> for ActiveModel {
    fn from(debt: &Debt) -> Self {
        Self {
            id: ActiveValue::Set(debt.id),
            user_id: ActiveValue::Set(debt.user_id),
            family_id: ActiveValue::Set(debt.family_id),
            counterparty: ActiveValue::Set(debt.counterparty.clone()),
            direction: ActiveValue::Set(debt.direction.as_str().to_string()),
            amount_minor: ActiveValue::Set(debt.amount_minor),
            note: ActiveValue::Set(debt.note.clone()),
            due_date: ActiveValue::Set(debt.due_date),
            occurred_at: ActiveValue::Set(debt.occurred_at),
            created_at: ActiveValue::Set(debt.created_at),
            updated_at: ActiveValue::Set(debt.updated_at),
        }
    }
}

impl TryFrom<Model> for Debt {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            family_id: model.family_id,
            counterparty: model.counterparty,
            direction: DebtDirection::try_from(model.direction.as_str())?,
            amount_minor: model.amount_minor,
            note: model.note,
            due_date: model.due_date,
            occurred_at: model.occurred_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debt(amount_minor: i64) -> Debt {
        Debt::new(
            Uuid::new_v4(),
            None,
            "Pak Budi".to_string(),
            DebtDirection::Receivable,
            amount_minor,
            None,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn remaining_follows_payments() {
        let debt = debt(100_000);
        let payment = DebtPayment::new(debt.id, 40_000, None, Utc::now()).unwrap();

        let status = DebtWithStatus::from_payments(debt.clone(), &[payment.clone()]);
        assert_eq!(status.remaining_minor(), 60_000);
        assert!(!status.settled());

        let second = DebtPayment::new(debt.id, 60_000, None, Utc::now()).unwrap();
        let status = DebtWithStatus::from_payments(debt, &[payment, second]);
        assert_eq!(status.remaining_minor(), 0);
        assert!(status.settled());
    }
}
