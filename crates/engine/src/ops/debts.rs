//! Debt and receivable ledger operations.
//!
//! Repayment state is derived: the paid amount is the sum of payment rows,
//! recomputed on every read. A payment may never exceed the remaining
//! balance, which keeps settlement monotonic under the derived model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*};
use uuid::Uuid;

use crate::{
    Debt, DebtDirection, DebtPayment, DebtWithStatus, EditAction, EditEntry, EngineError,
    ResultEngine, debt_payments, debts,
    util::{normalize_optional_text, normalize_required_name},
    watch::{ChangeEvent, ChangeKind, Collection},
};

use super::{Engine, PageCursor, access::LedgerScope, history::record_edit, with_tx};

#[derive(Clone, Debug)]
pub struct NewDebt {
    pub counterparty: String,
    pub direction: DebtDirection,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

/// Replacement values for the editable fields of a debt.
#[derive(Clone, Debug)]
pub struct DebtPatch {
    pub counterparty: String,
    pub direction: DebtDirection,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
}

impl Engine {
    /// Lists debts visible to the actor with repayment status, newest first,
    /// cursor-paginated.
    pub async fn list_debts(
        &self,
        actor_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<DebtWithStatus>, Option<String>)> {
        with_tx!(self, |db_tx| {
            let actor = self.require_user(&db_tx, actor_id).await?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = debts::Entity::find();
            query = match LedgerScope::for_user(&actor) {
                LedgerScope::Family(family_id) => {
                    query.filter(debts::Column::FamilyId.eq(Some(family_id)))
                }
                LedgerScope::Solo(user_id) => query.filter(debts::Column::UserId.eq(user_id)),
            };
            query = query
                .order_by_desc(debts::Column::OccurredAt)
                .order_by_desc(debts::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = PageCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(debts::Column::OccurredAt.lt(cursor.at))
                        .add(
                            Condition::all()
                                .add(debts::Column::OccurredAt.eq(cursor.at))
                                .add(debts::Column::Id.lt(cursor.id)),
                        ),
                );
            }

            let rows = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut page: Vec<Debt> = Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                page.push(Debt::try_from(model)?);
            }

            let ids: Vec<Uuid> = page.iter().map(|debt| debt.id).collect();
            let mut paid_totals: HashMap<Uuid, i64> = HashMap::new();
            if !ids.is_empty() {
                let payment_models = debt_payments::Entity::find()
                    .filter(debt_payments::Column::DebtId.is_in(ids))
                    .all(&db_tx)
                    .await?;
                for model in payment_models {
                    *paid_totals.entry(model.debt_id).or_insert(0) += model.amount_minor;
                }
            }

            let next_cursor = if has_more {
                page.last()
                    .map(|debt| {
                        PageCursor {
                            at: debt.occurred_at,
                            id: debt.id,
                        }
                        .encode()
                    })
                    .transpose()?
            } else {
                None
            };

            let out = page
                .into_iter()
                .map(|debt| {
                    let paid_minor = paid_totals.get(&debt.id).copied().unwrap_or(0);
                    DebtWithStatus { debt, paid_minor }
                })
                .collect();
            Ok((out, next_cursor))
        })
    }

    /// A single debt with its status and full payment list.
    pub async fn debt_detail(
        &self,
        debt_id: Uuid,
        actor_id: Uuid,
    ) -> ResultEngine<(DebtWithStatus, Vec<DebtPayment>)> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, actor_id).await?;
            let model = debts::Entity::find_by_id(debt_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("debt {debt_id}")))?;
            let debt = Debt::try_from(model)?;

            let payments: Vec<DebtPayment> = debt_payments::Entity::find()
                .filter(debt_payments::Column::DebtId.eq(debt_id))
                .order_by_desc(debt_payments::Column::PaidAt)
                .order_by_desc(debt_payments::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(DebtPayment::from)
                .collect();

            let with_status = DebtWithStatus::from_payments(debt, &payments);
            Ok((with_status, payments))
        })
    }

    /// Creates a debt owned by the actor.
    pub async fn create_debt(&self, actor_id: Uuid, data: NewDebt) -> ResultEngine<Debt> {
        let (debt, event) = with_tx!(self, |db_tx| {
            let actor = self.require_user(&db_tx, actor_id).await?;
            let family_id = actor.family_id;

            let debt = Debt::new(
                actor_id,
                family_id,
                normalize_required_name(&data.counterparty, "counterparty")?,
                data.direction,
                data.amount_minor,
                normalize_optional_text(data.note.as_deref()),
                data.due_date,
                data.occurred_at,
            )?;
            debts::ActiveModel::from(&debt).insert(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::Debts,
                    debt.id,
                    EditAction::Created,
                    actor_id,
                    family_id,
                ),
            )
            .await?;

            let event = ChangeEvent {
                collection: Collection::Debts,
                kind: ChangeKind::Insert,
                record_id: debt.id,
                family_id,
                user_id: Some(actor_id),
            };
            Ok((debt, event))
        })?;

        self.publish(event);
        Ok(debt)
    }

    /// Replaces the editable fields of a debt, unconditionally by id.
    ///
    /// The principal may not drop below what has already been repaid.
    pub async fn update_debt(
        &self,
        debt_id: Uuid,
        editor_id: Uuid,
        patch: DebtPatch,
    ) -> ResultEngine<Debt> {
        if patch.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }

        let (debt, event) = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, editor_id).await?;
            let model = debts::Entity::find_by_id(debt_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("debt {debt_id}")))?;

            let paid_minor = self.paid_total(&db_tx, debt_id).await?;
            if patch.amount_minor < paid_minor {
                return Err(EngineError::InvalidAmount(
                    "amount_minor is below the recorded payments".to_string(),
                ));
            }

            let family_id = model.family_id;
            let owner_id = model.user_id;
            let mut active: debts::ActiveModel = model.into();
            active.counterparty =
                ActiveValue::Set(normalize_required_name(&patch.counterparty, "counterparty")?);
            active.direction = ActiveValue::Set(patch.direction.as_str().to_string());
            active.amount_minor = ActiveValue::Set(patch.amount_minor);
            active.note = ActiveValue::Set(normalize_optional_text(patch.note.as_deref()));
            active.due_date = ActiveValue::Set(patch.due_date);
            active.occurred_at = ActiveValue::Set(patch.occurred_at);
            active.updated_at = ActiveValue::Set(Utc::now());
            let updated = active.update(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::Debts,
                    debt_id,
                    EditAction::Updated,
                    editor_id,
                    family_id,
                ),
            )
            .await?;

            let event = ChangeEvent {
                collection: Collection::Debts,
                kind: ChangeKind::Update,
                record_id: debt_id,
                family_id,
                user_id: Some(owner_id),
            };
            Ok((Debt::try_from(updated)?, event))
        })?;

        self.publish(event);
        Ok(debt)
    }

    /// Physically deletes a debt; its payment rows cascade.
    pub async fn delete_debt(&self, debt_id: Uuid, editor_id: Uuid) -> ResultEngine<()> {
        let event = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, editor_id).await?;
            let model = debts::Entity::find_by_id(debt_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("debt {debt_id}")))?;

            let family_id = model.family_id;
            let owner_id = model.user_id;
            debts::Entity::delete_by_id(debt_id).exec(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::Debts,
                    debt_id,
                    EditAction::Deleted,
                    editor_id,
                    family_id,
                ),
            )
            .await?;

            Ok(ChangeEvent {
                collection: Collection::Debts,
                kind: ChangeKind::Delete,
                record_id: debt_id,
                family_id,
                user_id: Some(owner_id),
            })
        })?;

        self.publish(event);
        Ok(())
    }

    /// Records a repayment. Rejects payments exceeding the remaining
    /// balance.
    pub async fn record_payment(
        &self,
        debt_id: Uuid,
        editor_id: Uuid,
        amount_minor: i64,
        note: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<DebtPayment> {
        let (payment, event) = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, editor_id).await?;
            let debt = debts::Entity::find_by_id(debt_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("debt {debt_id}")))?;

            let paid_minor = self.paid_total(&db_tx, debt_id).await?;
            let remaining = debt.amount_minor - paid_minor;
            if amount_minor > remaining {
                return Err(EngineError::InvalidAmount(format!(
                    "payment of {amount_minor} exceeds the remaining balance of {remaining}"
                )));
            }

            let payment = DebtPayment::new(
                debt_id,
                amount_minor,
                normalize_optional_text(note),
                paid_at,
            )?;
            debt_payments::ActiveModel::from(&payment)
                .insert(&db_tx)
                .await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::DebtPayments,
                    payment.id,
                    EditAction::Created,
                    editor_id,
                    debt.family_id,
                ),
            )
            .await?;

            let event = ChangeEvent {
                collection: Collection::DebtPayments,
                kind: ChangeKind::Insert,
                record_id: payment.id,
                family_id: debt.family_id,
                user_id: Some(debt.user_id),
            };
            Ok((payment, event))
        })?;

        self.publish(event);
        Ok(payment)
    }

    /// Deletes a payment row; the debt un-settles accordingly.
    pub async fn delete_payment(
        &self,
        debt_id: Uuid,
        payment_id: Uuid,
        editor_id: Uuid,
    ) -> ResultEngine<()> {
        let event = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, editor_id).await?;
            let debt = debts::Entity::find_by_id(debt_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("debt {debt_id}")))?;

            let payment = debt_payments::Entity::find_by_id(payment_id)
                .filter(debt_payments::Column::DebtId.eq(debt_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("debt payment {payment_id}")))?;

            debt_payments::Entity::delete_by_id(payment.id)
                .exec(&db_tx)
                .await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::DebtPayments,
                    payment_id,
                    EditAction::Deleted,
                    editor_id,
                    debt.family_id,
                ),
            )
            .await?;

            Ok(ChangeEvent {
                collection: Collection::DebtPayments,
                kind: ChangeKind::Delete,
                record_id: payment_id,
                family_id: debt.family_id,
                user_id: Some(debt.user_id),
            })
        })?;

        self.publish(event);
        Ok(())
    }

    async fn paid_total<C: sea_orm::ConnectionTrait>(
        &self,
        db: &C,
        debt_id: Uuid,
    ) -> ResultEngine<i64> {
        let payments = debt_payments::Entity::find()
            .filter(debt_payments::Column::DebtId.eq(debt_id))
            .all(db)
            .await?;
        Ok(payments.into_iter().map(|p| p.amount_minor).sum())
    }
}
