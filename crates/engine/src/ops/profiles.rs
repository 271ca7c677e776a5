//! Profile resolution and provisioning.
//!
//! `resolve_profile` is the application's entry point after authentication:
//! it loads (or, on first sign-in, creates) the `User` row for an identity
//! and enriches it with the full family. Enrichment is best-effort; a
//! resolution never fails solely because the family fetch did.

use chrono::Utc;
use sea_orm::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Family, ResultEngine, Role, User, identities, users,
    util::normalize_required_name,
    watch::{ChangeEvent, ChangeKind, Collection},
};

use super::Engine;

/// A resolved profile: the user plus, when linked, the family with its
/// derived member list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub user: User,
    pub family: Option<Family>,
}

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub role: Option<Role>,
}

impl Engine {
    /// Resolves the profile for `identity_id`, provisioning it on first
    /// sign-in.
    ///
    /// The primary read is bounded by the configured timeout and surfaces
    /// [`EngineError::Timeout`] — distinct from a missing row — so callers
    /// can retry with backoff instead of provisioning twice.
    pub async fn resolve_profile(&self, identity_id: Uuid) -> ResultEngine<Profile> {
        let read = users::Entity::find_by_id(identity_id).one(&self.database);
        let model = match tokio::time::timeout(self.profile_timeout, read).await {
            Err(_) => {
                return Err(EngineError::Timeout(format!(
                    "profile read for {identity_id} timed out"
                )));
            }
            Ok(result) => result?,
        };

        let user = match model {
            Some(model) => User::try_from(model)?,
            None => self.provision_profile(identity_id).await?,
        };

        let family = match user.family_id {
            None => None,
            Some(family_id) => match self.family_by_id(family_id).await {
                Ok(family) => Some(family),
                // Degraded result: the profile stands on its own.
                Err(err) => {
                    tracing::warn!(%family_id, "family enrichment failed: {err}");
                    None
                }
            },
        };

        Ok(Profile { user, family })
    }

    /// Re-runs resolution against current store state, retrying transient
    /// failures with bounded exponential backoff.
    ///
    /// After exhausting the retry budget the error is surfaced as
    /// [`EngineError::RefreshFailed`]; callers are expected to keep the
    /// previously-resolved profile.
    pub async fn refresh_profile(&self, identity_id: Uuid) -> ResultEngine<Profile> {
        let mut last_error: Option<EngineError> = None;

        for attempt in 0..self.retry.attempts {
            match self.resolve_profile(identity_id).await {
                Ok(profile) => return Ok(profile),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(attempt, "profile refresh attempt failed: {err}");
                    last_error = Some(err);
                    if attempt + 1 < self.retry.attempts {
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    }
                }
                Err(err) => return Err(EngineError::RefreshFailed(err.to_string())),
            }
        }

        Err(EngineError::RefreshFailed(
            last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "retries exhausted".to_string()),
        ))
    }

    /// Updates name and/or role.
    ///
    /// A role change while in a family must not violate the one-per-role
    /// invariant; the occupied slot is reported by name.
    pub async fn update_profile(&self, user_id: Uuid, patch: ProfilePatch) -> ResultEngine<User> {
        let model = self.require_user(&self.database, user_id).await?;
        let current_role = Role::try_from(model.role.as_str())?;
        let target_role = patch.role.unwrap_or(current_role);

        if target_role != current_role
            && let Some(family_id) = model.family_id
        {
            let members = self
                .family_member_models(&self.database, family_id)
                .await?;
            if members
                .iter()
                .any(|member| member.id != user_id && member.role == target_role.as_str())
            {
                return Err(EngineError::RoleSlotTaken(target_role));
            }
        }

        let family_id = model.family_id;
        let mut active: users::ActiveModel = model.into();
        if let Some(name) = patch.name {
            active.name = ActiveValue::Set(normalize_required_name(&name, "profile")?);
        }
        active.role = ActiveValue::Set(target_role.as_str().to_string());
        active.updated_at = ActiveValue::Set(Utc::now());
        let updated = active.update(&self.database).await?;

        self.publish(ChangeEvent {
            collection: Collection::Users,
            kind: ChangeKind::Update,
            record_id: user_id,
            family_id,
            user_id: Some(user_id),
        });

        User::try_from(updated)
    }

    /// First-sign-in provisioning from identity-provider metadata.
    ///
    /// The role hint defaults to `ibu` when absent or unparseable.
    async fn provision_profile(&self, identity_id: Uuid) -> ResultEngine<User> {
        let identity = identities::Entity::find_by_id(identity_id)
            .one(&self.database)
            .await
            .map_err(|err| {
                EngineError::ProfileProvisioningFailed(format!("identity read failed: {err}"))
            })?
            .ok_or_else(|| {
                EngineError::ProfileProvisioningFailed(format!(
                    "identity {identity_id} not found"
                ))
            })?;

        let role = identity
            .role
            .as_deref()
            .and_then(|hint| Role::try_from(hint).ok())
            .unwrap_or(Role::Ibu);
        let name = if identity.name.trim().is_empty() {
            identity
                .email
                .split('@')
                .next()
                .unwrap_or("keluarga")
                .to_string()
        } else {
            identity.name.clone()
        };

        let now = Utc::now();
        let user = User {
            id: identity.id,
            email: identity.email,
            name,
            role,
            family_id: None,
            created_at: now,
            updated_at: now,
        };
        users::ActiveModel::from(&user)
            .insert(&self.database)
            .await
            .map_err(|err| {
                EngineError::ProfileProvisioningFailed(format!("profile insert failed: {err}"))
            })?;

        tracing::info!(user_id = %user.id, role = role.as_str(), "provisioned profile");
        self.publish(ChangeEvent {
            collection: Collection::Users,
            kind: ChangeKind::Insert,
            record_id: user.id,
            family_id: None,
            user_id: Some(user.id),
        });

        Ok(user)
    }
}
