//! Profile API endpoints.

use api_types::user::{ProfileUpdate, ProfileView, UserView};
use axum::{Extension, Json, extract::State};

use engine::{Profile, ProfilePatch};

use crate::{ServerError, family::family_view, server::ServerState};

pub(crate) fn role_view(role: engine::Role) -> api_types::Role {
    match role {
        engine::Role::Ayah => api_types::Role::Ayah,
        engine::Role::Ibu => api_types::Role::Ibu,
    }
}

pub(crate) fn role_from_api(role: api_types::Role) -> engine::Role {
    match role {
        api_types::Role::Ayah => engine::Role::Ayah,
        api_types::Role::Ibu => engine::Role::Ibu,
    }
}

pub(crate) fn user_view(user: &engine::User) -> UserView {
    UserView {
        id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
        role: role_view(user.role),
        family_id: user.family_id,
    }
}

pub(crate) fn profile_view(profile: &Profile) -> ProfileView {
    ProfileView {
        user: user_view(&profile.user),
        family: profile.family.as_ref().map(family_view),
    }
}

/// The profile resolved by the auth layer for this request.
pub async fn get(Extension(profile): Extension<Profile>) -> Json<ProfileView> {
    Json(profile_view(&profile))
}

pub async fn update(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .update_profile(
            profile.user.id,
            ProfilePatch {
                name: payload.name,
                role: payload.role.map(role_from_api),
            },
        )
        .await?;

    Ok(Json(user_view(&user)))
}

/// Re-resolves against current store state, picking up membership changes
/// made from other devices.
pub async fn refresh(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
) -> Result<Json<ProfileView>, ServerError> {
    let refreshed = state.engine.refresh_profile(profile.user.id).await?;
    Ok(Json(profile_view(&refreshed)))
}
