//! Debt and receivable ledger endpoints.

use api_types::debt::{
    DebtDetailResponse, DebtDirection, DebtListResponse, DebtNew, DebtUpdate, DebtView,
    PaymentNew, PaymentView,
};
use api_types::household::ListQuery;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use engine::{DebtPatch, DebtPayment, DebtWithStatus, NewDebt, Profile};

use crate::{ServerError, server::ServerState};

const DEFAULT_PAGE_SIZE: u64 = 50;

fn direction_from_api(direction: DebtDirection) -> engine::DebtDirection {
    match direction {
        DebtDirection::Owed => engine::DebtDirection::Owed,
        DebtDirection::Receivable => engine::DebtDirection::Receivable,
    }
}

fn direction_view(direction: engine::DebtDirection) -> DebtDirection {
    match direction {
        engine::DebtDirection::Owed => DebtDirection::Owed,
        engine::DebtDirection::Receivable => DebtDirection::Receivable,
    }
}

fn view(with_status: &DebtWithStatus) -> DebtView {
    let debt = &with_status.debt;
    DebtView {
        id: debt.id,
        user_id: debt.user_id,
        family_id: debt.family_id,
        counterparty: debt.counterparty.clone(),
        direction: direction_view(debt.direction),
        amount_minor: debt.amount_minor,
        note: debt.note.clone(),
        due_date: debt.due_date,
        occurred_at: debt.occurred_at,
        paid_minor: with_status.paid_minor,
        remaining_minor: with_status.remaining_minor(),
        settled: with_status.settled(),
    }
}

fn payment_view(payment: &DebtPayment) -> PaymentView {
    PaymentView {
        id: payment.id,
        debt_id: payment.debt_id,
        amount_minor: payment.amount_minor,
        note: payment.note.clone(),
        paid_at: payment.paid_at,
    }
}

pub async fn list(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<DebtListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let (debts, next_cursor) = state
        .engine
        .list_debts(profile.user.id, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(DebtListResponse {
        debts: debts.iter().map(view).collect(),
        next_cursor,
    }))
}

pub async fn detail(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(debt_id): Path<Uuid>,
) -> Result<Json<DebtDetailResponse>, ServerError> {
    let (with_status, payments) = state.engine.debt_detail(debt_id, profile.user.id).await?;

    Ok(Json(DebtDetailResponse {
        debt: view(&with_status),
        payments: payments.iter().map(payment_view).collect(),
    }))
}

pub async fn create(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<DebtNew>,
) -> Result<(StatusCode, Json<DebtView>), ServerError> {
    let debt = state
        .engine
        .create_debt(
            profile.user.id,
            NewDebt {
                counterparty: payload.counterparty,
                direction: direction_from_api(payload.direction),
                amount_minor: payload.amount_minor,
                note: payload.note,
                due_date: payload.due_date,
                occurred_at: payload.occurred_at,
            },
        )
        .await?;

    let with_status = DebtWithStatus {
        debt,
        paid_minor: 0,
    };
    Ok((StatusCode::CREATED, Json(view(&with_status))))
}

pub async fn update(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(debt_id): Path<Uuid>,
    Json(payload): Json<DebtUpdate>,
) -> Result<Json<DebtDetailResponse>, ServerError> {
    state
        .engine
        .update_debt(
            debt_id,
            profile.user.id,
            DebtPatch {
                counterparty: payload.counterparty,
                direction: direction_from_api(payload.direction),
                amount_minor: payload.amount_minor,
                note: payload.note,
                due_date: payload.due_date,
                occurred_at: payload.occurred_at,
            },
        )
        .await?;

    let (with_status, payments) = state.engine.debt_detail(debt_id, profile.user.id).await?;
    Ok(Json(DebtDetailResponse {
        debt: view(&with_status),
        payments: payments.iter().map(payment_view).collect(),
    }))
}

pub async fn delete(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(debt_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_debt(debt_id, profile.user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_payment(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(debt_id): Path<Uuid>,
    Json(payload): Json<PaymentNew>,
) -> Result<(StatusCode, Json<PaymentView>), ServerError> {
    let payment = state
        .engine
        .record_payment(
            debt_id,
            profile.user.id,
            payload.amount_minor,
            payload.note.as_deref(),
            payload.paid_at,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(payment_view(&payment))))
}

pub async fn delete_payment(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path((debt_id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_payment(debt_id, payment_id, profile.user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
