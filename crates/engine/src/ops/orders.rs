//! Business order ledger operations.
//!
//! Same visibility pattern as the household ledger, with one extra rule:
//! every order operation is gated to the `ayah` role.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*};
use uuid::Uuid;

use crate::{
    EditAction, EditEntry, EngineError, Order, OrderExpense, OrderStatus, OrderWithTotals,
    ResultEngine, order_expenses, orders,
    util::{normalize_optional_text, normalize_required_name},
    watch::{ChangeEvent, ChangeKind, Collection},
};

use super::{Engine, PageCursor, access::LedgerScope, history::record_edit, with_tx};

#[derive(Clone, Debug)]
pub struct NewOrder {
    pub customer: String,
    pub note: Option<String>,
    pub quantity: i64,
    pub unit_price_minor: i64,
    pub ordered_at: DateTime<Utc>,
}

/// Replacement values for the editable fields of an order.
#[derive(Clone, Debug)]
pub struct OrderPatch {
    pub customer: String,
    pub note: Option<String>,
    pub quantity: i64,
    pub unit_price_minor: i64,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}

impl Engine {
    /// Lists orders visible to the actor with their derived totals, newest
    /// first, cursor-paginated.
    pub async fn list_orders(
        &self,
        actor_id: Uuid,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<OrderWithTotals>, Option<String>)> {
        with_tx!(self, |db_tx| {
            let actor = self.require_ayah(&db_tx, actor_id).await?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = orders::Entity::find();
            query = match LedgerScope::for_user(&actor) {
                LedgerScope::Family(family_id) => {
                    query.filter(orders::Column::FamilyId.eq(Some(family_id)))
                }
                LedgerScope::Solo(user_id) => query.filter(orders::Column::UserId.eq(user_id)),
            };
            query = query
                .order_by_desc(orders::Column::OrderedAt)
                .order_by_desc(orders::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = PageCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(orders::Column::OrderedAt.lt(cursor.at))
                        .add(
                            Condition::all()
                                .add(orders::Column::OrderedAt.eq(cursor.at))
                                .add(orders::Column::Id.lt(cursor.id)),
                        ),
                );
            }

            let rows = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut page: Vec<Order> = Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                page.push(Order::try_from(model)?);
            }

            // One query for the whole page's expenses.
            let ids: Vec<Uuid> = page.iter().map(|order| order.id).collect();
            let mut expense_totals: HashMap<Uuid, i64> = HashMap::new();
            if !ids.is_empty() {
                let expense_models = order_expenses::Entity::find()
                    .filter(order_expenses::Column::OrderId.is_in(ids))
                    .all(&db_tx)
                    .await?;
                for model in expense_models {
                    *expense_totals.entry(model.order_id).or_insert(0) += model.amount_minor;
                }
            }

            let next_cursor = if has_more {
                page.last()
                    .map(|order| {
                        PageCursor {
                            at: order.ordered_at,
                            id: order.id,
                        }
                        .encode()
                    })
                    .transpose()?
            } else {
                None
            };

            let out = page
                .into_iter()
                .map(|order| {
                    let expenses_minor = expense_totals.get(&order.id).copied().unwrap_or(0);
                    OrderWithTotals {
                        order,
                        expenses_minor,
                    }
                })
                .collect();
            Ok((out, next_cursor))
        })
    }

    /// A single order with its totals and full expense list.
    pub async fn order_detail(
        &self,
        order_id: Uuid,
        actor_id: Uuid,
    ) -> ResultEngine<(OrderWithTotals, Vec<OrderExpense>)> {
        with_tx!(self, |db_tx| {
            self.require_ayah(&db_tx, actor_id).await?;
            let model = orders::Entity::find_by_id(order_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;
            let order = Order::try_from(model)?;

            let expenses: Vec<OrderExpense> = order_expenses::Entity::find()
                .filter(order_expenses::Column::OrderId.eq(order_id))
                .order_by_desc(order_expenses::Column::SpentAt)
                .order_by_desc(order_expenses::Column::Id)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(OrderExpense::from)
                .collect();

            let with_totals = OrderWithTotals::from_expenses(order, &expenses);
            Ok((with_totals, expenses))
        })
    }

    /// Creates an order owned by the actor.
    pub async fn create_order(&self, actor_id: Uuid, data: NewOrder) -> ResultEngine<Order> {
        let (order, event) = with_tx!(self, |db_tx| {
            let actor = self.require_ayah(&db_tx, actor_id).await?;
            let family_id = actor.family_id;

            let order = Order::new(
                actor_id,
                family_id,
                normalize_required_name(&data.customer, "customer")?,
                normalize_optional_text(data.note.as_deref()),
                data.quantity,
                data.unit_price_minor,
                data.ordered_at,
            )?;
            orders::ActiveModel::from(&order).insert(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::Orders,
                    order.id,
                    EditAction::Created,
                    actor_id,
                    family_id,
                ),
            )
            .await?;

            let event = ChangeEvent {
                collection: Collection::Orders,
                kind: ChangeKind::Insert,
                record_id: order.id,
                family_id,
                user_id: Some(actor_id),
            };
            Ok((order, event))
        })?;

        self.publish(event);
        Ok(order)
    }

    /// Replaces the editable fields of an order, unconditionally by id.
    pub async fn update_order(
        &self,
        order_id: Uuid,
        editor_id: Uuid,
        patch: OrderPatch,
    ) -> ResultEngine<Order> {
        if patch.quantity <= 0 {
            return Err(EngineError::InvalidAmount(
                "quantity must be > 0".to_string(),
            ));
        }
        if patch.unit_price_minor <= 0 {
            return Err(EngineError::InvalidAmount(
                "unit_price_minor must be > 0".to_string(),
            ));
        }

        let (order, event) = with_tx!(self, |db_tx| {
            self.require_ayah(&db_tx, editor_id).await?;
            let model = orders::Entity::find_by_id(order_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;

            let family_id = model.family_id;
            let owner_id = model.user_id;
            let mut active: orders::ActiveModel = model.into();
            active.customer =
                ActiveValue::Set(normalize_required_name(&patch.customer, "customer")?);
            active.note = ActiveValue::Set(normalize_optional_text(patch.note.as_deref()));
            active.quantity = ActiveValue::Set(patch.quantity);
            active.unit_price_minor = ActiveValue::Set(patch.unit_price_minor);
            active.status = ActiveValue::Set(patch.status.as_str().to_string());
            active.ordered_at = ActiveValue::Set(patch.ordered_at);
            active.updated_at = ActiveValue::Set(Utc::now());
            let updated = active.update(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::Orders,
                    order_id,
                    EditAction::Updated,
                    editor_id,
                    family_id,
                ),
            )
            .await?;

            let event = ChangeEvent {
                collection: Collection::Orders,
                kind: ChangeKind::Update,
                record_id: order_id,
                family_id,
                user_id: Some(owner_id),
            };
            Ok((Order::try_from(updated)?, event))
        })?;

        self.publish(event);
        Ok(order)
    }

    /// Physically deletes an order; its expense rows cascade.
    pub async fn delete_order(&self, order_id: Uuid, editor_id: Uuid) -> ResultEngine<()> {
        let event = with_tx!(self, |db_tx| {
            self.require_ayah(&db_tx, editor_id).await?;
            let model = orders::Entity::find_by_id(order_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;

            let family_id = model.family_id;
            let owner_id = model.user_id;
            orders::Entity::delete_by_id(order_id).exec(&db_tx).await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::Orders,
                    order_id,
                    EditAction::Deleted,
                    editor_id,
                    family_id,
                ),
            )
            .await?;

            Ok(ChangeEvent {
                collection: Collection::Orders,
                kind: ChangeKind::Delete,
                record_id: order_id,
                family_id,
                user_id: Some(owner_id),
            })
        })?;

        self.publish(event);
        Ok(())
    }

    /// Adds an expense row to an order.
    pub async fn add_order_expense(
        &self,
        order_id: Uuid,
        editor_id: Uuid,
        name: &str,
        amount_minor: i64,
        spent_at: DateTime<Utc>,
    ) -> ResultEngine<OrderExpense> {
        let (expense, event) = with_tx!(self, |db_tx| {
            self.require_ayah(&db_tx, editor_id).await?;
            let order = orders::Entity::find_by_id(order_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;

            let expense = OrderExpense::new(
                order_id,
                normalize_required_name(name, "expense")?,
                amount_minor,
                spent_at,
            )?;
            order_expenses::ActiveModel::from(&expense)
                .insert(&db_tx)
                .await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::OrderExpenses,
                    expense.id,
                    EditAction::Created,
                    editor_id,
                    order.family_id,
                ),
            )
            .await?;

            let event = ChangeEvent {
                collection: Collection::OrderExpenses,
                kind: ChangeKind::Insert,
                record_id: expense.id,
                family_id: order.family_id,
                user_id: Some(order.user_id),
            };
            Ok((expense, event))
        })?;

        self.publish(event);
        Ok(expense)
    }

    /// Deletes an expense row; the order's profit recovers accordingly.
    pub async fn delete_order_expense(
        &self,
        order_id: Uuid,
        expense_id: Uuid,
        editor_id: Uuid,
    ) -> ResultEngine<()> {
        let event = with_tx!(self, |db_tx| {
            self.require_ayah(&db_tx, editor_id).await?;
            let order = orders::Entity::find_by_id(order_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("order {order_id}")))?;

            let expense = order_expenses::Entity::find_by_id(expense_id)
                .filter(order_expenses::Column::OrderId.eq(order_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("order expense {expense_id}")))?;

            order_expenses::Entity::delete_by_id(expense.id)
                .exec(&db_tx)
                .await?;

            record_edit(
                &db_tx,
                &EditEntry::new(
                    Collection::OrderExpenses,
                    expense_id,
                    EditAction::Deleted,
                    editor_id,
                    order.family_id,
                ),
            )
            .await?;

            Ok(ChangeEvent {
                collection: Collection::OrderExpenses,
                kind: ChangeKind::Delete,
                record_id: expense_id,
                family_id: order.family_id,
                user_id: Some(order.user_id),
            })
        })?;

        self.publish(event);
        Ok(())
    }
}
