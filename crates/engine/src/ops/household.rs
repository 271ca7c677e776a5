//! Household ledger operations.
//!
//! The visibility rule shared by all three ledgers: family-wide when the
//! actor belongs to a family, solo otherwise. `family_id` is stamped from
//! the owner's user row re-read inside the write transaction, so it always
//! reflects membership at write time. Updates and deletes are unconditional
//! by id: shared-household bookkeeping deliberately lets either member edit
//! the other's entries.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*};
use uuid::Uuid;

use crate::{
    EditAction, EditEntry, EngineError, FlowKind, HouseholdTransaction, ResultEngine, household,
    util::normalize_optional_text,
    watch::{ChangeEvent, ChangeKind, Collection},
};

use super::{Engine, PageCursor, access::LedgerScope, history::record_edit, with_tx};

#[derive(Clone, Debug)]
pub struct NewHouseholdTransaction {
    pub kind: FlowKind,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Replacement values for the editable fields of an entry.
#[derive(Clone, Debug)]
pub struct HouseholdPatch {
    pub kind: FlowKind,
    pub category_id: Option<Uuid>,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Read-only aggregate consumed by the reporting layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HouseholdSummary {
    pub income_minor: i64,
    pub expense_minor: i64,
}

impl HouseholdSummary {
    pub fn net_minor(&self) -> i64 {
        self.income_minor - self.expense_minor
    }
}

impl Engine {
    /// Lists household entries visible to the actor, newest first, with
    /// cursor-based pagination (newest → older by `(occurred_at DESC, id
    /// DESC)`).
    pub async fn list_household(
        &self,
        actor_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<HouseholdTransaction>, Option<String>)> {
        with_tx!(self, |db_tx| {
            let actor = self.require_user(&db_tx, actor_id).await?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = household::Entity::find();
            query = match LedgerScope::for_user(&actor) {
                LedgerScope::Family(family_id) => {
                    query.filter(household::Column::FamilyId.eq(Some(family_id)))
                }
                LedgerScope::Solo(user_id) => {
                    query.filter(household::Column::UserId.eq(user_id))
                }
            };
            query = query
                .order_by_desc(household::Column::OccurredAt)
                .order_by_desc(household::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = PageCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(household::Column::OccurredAt.lt(cursor.at))
                        .add(
                            Condition::all()
                                .add(household::Column::OccurredAt.eq(cursor.at))
                                .add(household::Column::Id.lt(cursor.id)),
                        ),
                );
            }

            let rows = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<HouseholdTransaction> =
                Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                out.push(HouseholdTransaction::try_from(model)?);
            }

            let next_cursor = if has_more {
                out.last()
                    .map(|tx| {
                        PageCursor {
                            at: tx.occurred_at,
                            id: tx.id,
                        }
                        .encode()
                    })
                    .transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Creates a household entry owned by the actor.
    pub async fn create_household(
        &self,
        actor_id: Uuid,
        data: NewHouseholdTransaction,
    ) -> ResultEngine<HouseholdTransaction> {
        let (record, event) = with_tx!(self, |db_tx| {
            let actor = self.require_user(&db_tx, actor_id).await?;
            // Server-side truth: the family tag is whatever the owner's row
            // says right now, inside this transaction.
            let family_id = actor.family_id;

            if let Some(category_id) = data.category_id {
                self.require_category_visible(&db_tx, category_id, actor_id)
                    .await?;
            }

            let record = HouseholdTransaction::new(
                actor_id,
                family_id,
                data.kind,
                data.category_id,
                data.amount_minor,
                normalize_optional_text(data.note.as_deref()),
                data.occurred_at,
            )?;
            household::ActiveModel::from(&record).insert(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::HouseholdTransactions,
                    record.id,
                    EditAction::Created,
                    actor_id,
                    family_id,
                ),
            )
            .await?;

            let event = ChangeEvent {
                collection: Collection::HouseholdTransactions,
                kind: ChangeKind::Insert,
                record_id: record.id,
                family_id,
                user_id: Some(actor_id),
            };
            Ok((record, event))
        })?;

        self.publish(event);
        Ok(record)
    }

    /// Replaces the editable fields of an entry, unconditionally by id.
    pub async fn update_household(
        &self,
        record_id: Uuid,
        editor_id: Uuid,
        patch: HouseholdPatch,
    ) -> ResultEngine<HouseholdTransaction> {
        if patch.amount_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "amount_minor must be > 0".to_string(),
            ));
        }

        let (record, event) = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, editor_id).await?;
            let model = household::Entity::find_by_id(record_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::NotFound(format!("household transaction {record_id}"))
                })?;

            if let Some(category_id) = patch.category_id {
                self.require_category_visible(&db_tx, category_id, editor_id)
                    .await?;
            }

            let family_id = model.family_id;
            let owner_id = model.user_id;
            let mut active: household::ActiveModel = model.into();
            active.kind = ActiveValue::Set(patch.kind.as_str().to_string());
            active.category_id = ActiveValue::Set(patch.category_id);
            active.amount_minor = ActiveValue::Set(patch.amount_minor);
            active.note = ActiveValue::Set(normalize_optional_text(patch.note.as_deref()));
            active.occurred_at = ActiveValue::Set(patch.occurred_at);
            active.updated_at = ActiveValue::Set(Utc::now());
            let updated = active.update(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::HouseholdTransactions,
                    record_id,
                    EditAction::Updated,
                    editor_id,
                    family_id,
                ),
            )
            .await?;

            let event = ChangeEvent {
                collection: Collection::HouseholdTransactions,
                kind: ChangeKind::Update,
                record_id,
                family_id,
                user_id: Some(owner_id),
            };
            Ok((HouseholdTransaction::try_from(updated)?, event))
        })?;

        self.publish(event);
        Ok(record)
    }

    /// Physically deletes an entry, unconditionally by id.
    pub async fn delete_household(&self, record_id: Uuid, editor_id: Uuid) -> ResultEngine<()> {
        let event = with_tx!(self, |db_tx| {
            self.require_user(&db_tx, editor_id).await?;
            let model = household::Entity::find_by_id(record_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| {
                    EngineError::NotFound(format!("household transaction {record_id}"))
                })?;

            let family_id = model.family_id;
            let owner_id = model.user_id;
            household::Entity::delete_by_id(record_id).exec(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::HouseholdTransactions,
                    record_id,
                    EditAction::Deleted,
                    editor_id,
                    family_id,
                ),
            )
            .await?;

            Ok(ChangeEvent {
                collection: Collection::HouseholdTransactions,
                kind: ChangeKind::Delete,
                record_id,
                family_id,
                user_id: Some(owner_id),
            })
        })?;

        self.publish(event);
        Ok(())
    }

    /// Income/expense totals over the actor's visible entries, optionally
    /// bounded to `[from, to)`.
    pub async fn household_summary(
        &self,
        actor_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<HouseholdSummary> {
        if let (Some(from), Some(to)) = (from, to)
            && from >= to
        {
            return Err(EngineError::InvalidAmount(
                "invalid range: from must be < to".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let actor = self.require_user(&db_tx, actor_id).await?;

            let mut query = household::Entity::find();
            query = match LedgerScope::for_user(&actor) {
                LedgerScope::Family(family_id) => {
                    query.filter(household::Column::FamilyId.eq(Some(family_id)))
                }
                LedgerScope::Solo(user_id) => {
                    query.filter(household::Column::UserId.eq(user_id))
                }
            };
            if let Some(from) = from {
                query = query.filter(household::Column::OccurredAt.gte(from));
            }
            if let Some(to) = to {
                query = query.filter(household::Column::OccurredAt.lt(to));
            }

            let mut summary = HouseholdSummary::default();
            for model in query.all(&db_tx).await? {
                match FlowKind::try_from(model.kind.as_str())? {
                    FlowKind::Income => summary.income_minor += model.amount_minor,
                    FlowKind::Expense => summary.expense_minor += model.amount_minor,
                }
            }
            Ok(summary)
        })
    }
}
