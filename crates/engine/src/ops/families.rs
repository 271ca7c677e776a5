//! Family directory: creation, joining, leaving, lookup.
//!
//! A family holds at most one member per role. Membership lives entirely on
//! `users.family_id`; the directory never stores a member list.

use chrono::Utc;
use sea_orm::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Family, ResultEngine, Role, User, families, users,
    util::normalize_required_name,
    watch::{ChangeEvent, ChangeKind, Collection},
};

use super::Engine;

impl Engine {
    /// Creates a family and makes `creator_id` its first member.
    ///
    /// The two writes are ordered compensating steps: the family row is
    /// inserted first, then the creator is linked to it. The link re-checks
    /// the no-existing-family precondition, and any failure there deletes
    /// the just-inserted row so an orphaned, memberless family never
    /// survives.
    pub async fn create_family(&self, name: &str, creator_id: Uuid) -> ResultEngine<Family> {
        let name = normalize_required_name(name, "family")?;

        let now = Utc::now();
        let mut family = Family {
            id: Uuid::new_v4(),
            name,
            created_at: now,
            updated_at: now,
            members: Vec::new(),
        };
        families::ActiveModel::from(&family)
            .insert(&self.database)
            .await?;

        let member = match self.assign_family(creator_id, Some(family.id)).await {
            Ok(member) => member,
            Err(err) => {
                if let Err(cleanup) = families::Entity::delete_by_id(family.id)
                    .exec(&self.database)
                    .await
                {
                    tracing::error!(family_id = %family.id, "failed to roll back family row: {cleanup}");
                }
                return Err(err);
            }
        };

        self.publish(ChangeEvent {
            collection: Collection::Families,
            kind: ChangeKind::Insert,
            record_id: family.id,
            family_id: Some(family.id),
            user_id: Some(creator_id),
        });
        self.publish(member_event(&member, Some(family.id)));

        family.members = vec![User::try_from(member)?];
        Ok(family)
    }

    /// Adds `user_id` to an existing family.
    ///
    /// Fails with [`EngineError::FamilyNotFound`] when the family is absent,
    /// [`EngineError::AlreadyInFamily`] when the joiner already has one, and
    /// [`EngineError::RoleSlotTaken`] naming the occupied role when the
    /// family already holds a member with the joiner's role.
    pub async fn join_family(&self, user_id: Uuid, family_id: Uuid) -> ResultEngine<()> {
        self.require_family(&self.database, family_id).await?;

        let user = self.require_user(&self.database, user_id).await?;
        if user.family_id.is_some() {
            return Err(EngineError::AlreadyInFamily(user_id.to_string()));
        }
        let role = Role::try_from(user.role.as_str())?;

        let members = self.family_member_models(&self.database, family_id).await?;
        if members.iter().any(|member| member.role == role.as_str()) {
            return Err(EngineError::RoleSlotTaken(role));
        }

        // Single-row write; no compensating action needed.
        let member = self.assign_family(user_id, Some(family_id)).await?;
        self.publish(member_event(&member, Some(family_id)));
        Ok(())
    }

    /// Removes `user_id` from its family.
    ///
    /// Idempotent: leaving with no family is a no-op success. The family row
    /// is retained even when its last member leaves.
    pub async fn leave_family(&self, user_id: Uuid) -> ResultEngine<()> {
        let user = self.require_user(&self.database, user_id).await?;
        let Some(old_family_id) = user.family_id else {
            return Ok(());
        };

        let mut active: users::ActiveModel = user.into();
        active.family_id = ActiveValue::Set(None);
        active.updated_at = ActiveValue::Set(Utc::now());
        let member = active.update(&self.database).await?;

        // Tag the event with the family that was left so its remaining
        // member refetches.
        self.publish(member_event(&member, Some(old_family_id)));
        Ok(())
    }

    /// Resolves a family together with its derived member list.
    ///
    /// Attempts a single joined read first and falls back to two separate
    /// reads (family row, then members) when the join fails; both forms
    /// produce identical results.
    pub async fn family_by_id(&self, family_id: Uuid) -> ResultEngine<Family> {
        match families::Entity::find_by_id(family_id)
            .find_with_related(users::Entity)
            .all(&self.database)
            .await
        {
            Ok(rows) => {
                let (model, member_models) = rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| EngineError::FamilyNotFound(family_id.to_string()))?;
                build_family(model, member_models)
            }
            Err(err) => {
                tracing::warn!(%family_id, "joined member read failed, falling back: {err}");
                self.family_by_id_two_step(family_id).await
            }
        }
    }

    async fn family_by_id_two_step(&self, family_id: Uuid) -> ResultEngine<Family> {
        let model = self.require_family(&self.database, family_id).await?;
        let member_models = self
            .family_member_models(&self.database, family_id)
            .await?;
        build_family(model, member_models)
    }

    /// Conditionally links a user to a family (or clears the link).
    ///
    /// Setting a family on a user that already has one fails with
    /// [`EngineError::AlreadyInFamily`]; this is the precondition check the
    /// directory relies on.
    async fn assign_family(
        &self,
        user_id: Uuid,
        family_id: Option<Uuid>,
    ) -> ResultEngine<users::Model> {
        let user = self.require_user(&self.database, user_id).await?;
        if family_id.is_some() && user.family_id.is_some() {
            return Err(EngineError::AlreadyInFamily(user_id.to_string()));
        }

        let mut active: users::ActiveModel = user.into();
        active.family_id = ActiveValue::Set(family_id);
        active.updated_at = ActiveValue::Set(Utc::now());
        Ok(active.update(&self.database).await?)
    }
}

fn member_event(member: &users::Model, family_id: Option<Uuid>) -> ChangeEvent {
    ChangeEvent {
        collection: Collection::Users,
        kind: ChangeKind::Update,
        record_id: member.id,
        family_id,
        user_id: Some(member.id),
    }
}

fn build_family(model: families::Model, member_models: Vec<users::Model>) -> ResultEngine<Family> {
    let mut member_models = member_models;
    member_models.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

    let mut family = Family::from(model);
    family.members = member_models
        .into_iter()
        .map(User::try_from)
        .collect::<Result<_, _>>()?;
    Ok(family)
}
