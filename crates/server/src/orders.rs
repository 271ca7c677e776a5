//! Business order ledger endpoints (ayah-only; the engine enforces the
//! role gate).

use api_types::household::ListQuery;
use api_types::order::{
    ExpenseNew, ExpenseView, OrderDetailResponse, OrderListResponse, OrderNew, OrderStatus,
    OrderUpdate, OrderView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use engine::{NewOrder, OrderExpense, OrderPatch, OrderWithTotals, Profile};

use crate::{ServerError, server::ServerState};

const DEFAULT_PAGE_SIZE: u64 = 50;

fn status_from_api(status: OrderStatus) -> engine::OrderStatus {
    match status {
        OrderStatus::Pending => engine::OrderStatus::Pending,
        OrderStatus::InProgress => engine::OrderStatus::InProgress,
        OrderStatus::Done => engine::OrderStatus::Done,
    }
}

fn status_view(status: engine::OrderStatus) -> OrderStatus {
    match status {
        engine::OrderStatus::Pending => OrderStatus::Pending,
        engine::OrderStatus::InProgress => OrderStatus::InProgress,
        engine::OrderStatus::Done => OrderStatus::Done,
    }
}

fn view(with_totals: &OrderWithTotals) -> OrderView {
    let order = &with_totals.order;
    OrderView {
        id: order.id,
        user_id: order.user_id,
        family_id: order.family_id,
        customer: order.customer.clone(),
        note: order.note.clone(),
        quantity: order.quantity,
        unit_price_minor: order.unit_price_minor,
        status: status_view(order.status),
        ordered_at: order.ordered_at,
        total_income_minor: with_totals.total_income_minor(),
        expenses_minor: with_totals.expenses_minor,
        profit_minor: with_totals.profit_minor(),
    }
}

fn expense_view(expense: &OrderExpense) -> ExpenseView {
    ExpenseView {
        id: expense.id,
        order_id: expense.order_id,
        name: expense.name.clone(),
        amount_minor: expense.amount_minor,
        spent_at: expense.spent_at,
    }
}

pub async fn list(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<OrderListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let (orders, next_cursor) = state
        .engine
        .list_orders(profile.user.id, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(OrderListResponse {
        orders: orders.iter().map(view).collect(),
        next_cursor,
    }))
}

pub async fn detail(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderDetailResponse>, ServerError> {
    let (with_totals, expenses) = state
        .engine
        .order_detail(order_id, profile.user.id)
        .await?;

    Ok(Json(OrderDetailResponse {
        order: view(&with_totals),
        expenses: expenses.iter().map(expense_view).collect(),
    }))
}

pub async fn create(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<OrderNew>,
) -> Result<(StatusCode, Json<OrderView>), ServerError> {
    let order = state
        .engine
        .create_order(
            profile.user.id,
            NewOrder {
                customer: payload.customer,
                note: payload.note,
                quantity: payload.quantity,
                unit_price_minor: payload.unit_price_minor,
                ordered_at: payload.ordered_at,
            },
        )
        .await?;

    let with_totals = OrderWithTotals {
        order,
        expenses_minor: 0,
    };
    Ok((StatusCode::CREATED, Json(view(&with_totals))))
}

pub async fn update(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<OrderUpdate>,
) -> Result<Json<OrderDetailResponse>, ServerError> {
    state
        .engine
        .update_order(
            order_id,
            profile.user.id,
            OrderPatch {
                customer: payload.customer,
                note: payload.note,
                quantity: payload.quantity,
                unit_price_minor: payload.unit_price_minor,
                status: status_from_api(payload.status),
                ordered_at: payload.ordered_at,
            },
        )
        .await?;

    // Re-read so the response carries fresh derived totals.
    let (with_totals, expenses) = state
        .engine
        .order_detail(order_id, profile.user.id)
        .await?;
    Ok(Json(OrderDetailResponse {
        order: view(&with_totals),
        expenses: expenses.iter().map(expense_view).collect(),
    }))
}

pub async fn delete(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_order(order_id, profile.user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_expense(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseView>), ServerError> {
    let expense = state
        .engine
        .add_order_expense(
            order_id,
            profile.user.id,
            &payload.name,
            payload.amount_minor,
            payload.spent_at,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(expense_view(&expense))))
}

pub async fn delete_expense(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path((order_id, expense_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_order_expense(order_id, expense_id, profile.user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
