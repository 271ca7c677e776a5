//! Household ledger endpoints.

use api_types::household::{
    FlowKind, HouseholdListResponse, HouseholdTransactionNew, HouseholdTransactionUpdate,
    HouseholdTransactionView, ListQuery, SummaryQuery, SummaryView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use engine::{HouseholdPatch, HouseholdTransaction, NewHouseholdTransaction, Profile};

use crate::{ServerError, server::ServerState};

const DEFAULT_PAGE_SIZE: u64 = 50;

fn kind_from_api(kind: FlowKind) -> engine::FlowKind {
    match kind {
        FlowKind::Income => engine::FlowKind::Income,
        FlowKind::Expense => engine::FlowKind::Expense,
    }
}

fn kind_view(kind: engine::FlowKind) -> FlowKind {
    match kind {
        engine::FlowKind::Income => FlowKind::Income,
        engine::FlowKind::Expense => FlowKind::Expense,
    }
}

fn view(tx: &HouseholdTransaction) -> HouseholdTransactionView {
    HouseholdTransactionView {
        id: tx.id,
        user_id: tx.user_id,
        family_id: tx.family_id,
        kind: kind_view(tx.kind),
        category_id: tx.category_id,
        amount_minor: tx.amount_minor,
        note: tx.note.clone(),
        occurred_at: tx.occurred_at,
    }
}

pub async fn list(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<HouseholdListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let (transactions, next_cursor) = state
        .engine
        .list_household(profile.user.id, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(HouseholdListResponse {
        transactions: transactions.iter().map(view).collect(),
        next_cursor,
    }))
}

pub async fn create(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<HouseholdTransactionNew>,
) -> Result<(StatusCode, Json<HouseholdTransactionView>), ServerError> {
    let record = state
        .engine
        .create_household(
            profile.user.id,
            NewHouseholdTransaction {
                kind: kind_from_api(payload.kind),
                category_id: payload.category_id,
                amount_minor: payload.amount_minor,
                note: payload.note,
                occurred_at: payload.occurred_at,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(view(&record))))
}

pub async fn update(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(record_id): Path<Uuid>,
    Json(payload): Json<HouseholdTransactionUpdate>,
) -> Result<Json<HouseholdTransactionView>, ServerError> {
    let record = state
        .engine
        .update_household(
            record_id,
            profile.user.id,
            HouseholdPatch {
                kind: kind_from_api(payload.kind),
                category_id: payload.category_id,
                amount_minor: payload.amount_minor,
                note: payload.note,
                occurred_at: payload.occurred_at,
            },
        )
        .await?;

    Ok(Json(view(&record)))
}

pub async fn delete(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(record_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_household(record_id, profile.user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn summary(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryView>, ServerError> {
    let summary = state
        .engine
        .household_summary(profile.user.id, query.from, query.to)
        .await?;

    Ok(Json(SummaryView {
        income_minor: summary.income_minor,
        expense_minor: summary.expense_minor,
        net_minor: summary.net_minor(),
    }))
}
