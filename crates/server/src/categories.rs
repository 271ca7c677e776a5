//! Household category endpoints.

use api_types::category::{CategoriesResponse, CategoryNew, CategoryUpdate, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use engine::{HouseholdCategory, Profile};

use crate::{ServerError, server::ServerState};

fn view(category: &HouseholdCategory) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name.clone(),
        is_default: category.is_default,
    }
}

pub async fn list(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
) -> Result<Json<CategoriesResponse>, ServerError> {
    let categories = state.engine.list_categories(profile.user.id).await?;
    Ok(Json(CategoriesResponse {
        categories: categories.iter().map(view).collect(),
    }))
}

pub async fn create(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(profile.user.id, &payload.name)
        .await?;
    Ok((StatusCode::CREATED, Json(view(&category))))
}

pub async fn update(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state
        .engine
        .rename_category(category_id, profile.user.id, &payload.name)
        .await?;
    Ok(Json(view(&category)))
}

pub async fn delete(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Path(category_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_category(category_id, profile.user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
