//! Edit-history endpoints.

use api_types::history::{EditAction, HistoryQuery, HistoryResponse, HistoryView};
use axum::{
    Extension, Json,
    extract::{Query, State},
};

use engine::Profile;

use crate::{ServerError, server::ServerState};

const DEFAULT_LIMIT: u64 = 100;

fn action_view(action: engine::EditAction) -> EditAction {
    match action {
        engine::EditAction::Created => EditAction::Created,
        engine::EditAction::Updated => EditAction::Updated,
        engine::EditAction::Deleted => EditAction::Deleted,
    }
}

pub async fn list(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let entries = state.engine.list_history(profile.user.id, limit).await?;

    Ok(Json(HistoryResponse {
        entries: entries
            .into_iter()
            .map(|entry| HistoryView {
                id: entry.id,
                collection: entry.collection.as_str().to_string(),
                record_id: entry.record_id,
                action: action_view(entry.action),
                editor_id: entry.editor_id,
                at: entry.at,
            })
            .collect(),
    }))
}
