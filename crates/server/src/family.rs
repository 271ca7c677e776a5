//! Family directory endpoints.

use api_types::family::{FamilyJoin, FamilyNew, FamilyView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use engine::{Family, Profile};

use crate::{ServerError, profile::user_view, server::ServerState};

pub(crate) fn family_view(family: &Family) -> FamilyView {
    FamilyView {
        id: family.id,
        name: family.name.clone(),
        members: family.members.iter().map(user_view).collect(),
    }
}

pub async fn create(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<FamilyNew>,
) -> Result<(StatusCode, Json<FamilyView>), ServerError> {
    let family = state
        .engine
        .create_family(&payload.name, profile.user.id)
        .await?;
    Ok((StatusCode::CREATED, Json(family_view(&family))))
}

/// The acting user's own family, when linked.
pub async fn get_own(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
) -> Result<Json<FamilyView>, ServerError> {
    let family_id = profile
        .user
        .family_id
        .ok_or_else(|| ServerError::Engine(engine::EngineError::FamilyNotFound("none".to_string())))?;
    let family = state.engine.family_by_id(family_id).await?;
    Ok(Json(family_view(&family)))
}

pub async fn get_by_id(
    Extension(_profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(family_id): Path<Uuid>,
) -> Result<Json<FamilyView>, ServerError> {
    let family = state.engine.family_by_id(family_id).await?;
    Ok(Json(family_view(&family)))
}

pub async fn join(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<FamilyJoin>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .join_family(profile.user.id, payload.family_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn leave(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.leave_family(profile.user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
