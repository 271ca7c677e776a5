use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, families, users};

use super::Engine;

/// How a ledger query is scoped for an acting user.
///
/// Family-wide when the actor belongs to a family, otherwise restricted to
/// the actor's own rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LedgerScope {
    Family(Uuid),
    Solo(Uuid),
}

impl LedgerScope {
    pub(super) fn for_user(user: &users::Model) -> Self {
        match user.family_id {
            Some(family_id) => Self::Family(family_id),
            None => Self::Solo(user.id),
        }
    }
}

impl Engine {
    pub(super) async fn require_user<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("user {user_id}")))
    }

    pub(super) async fn require_family<C: ConnectionTrait>(
        &self,
        db: &C,
        family_id: Uuid,
    ) -> ResultEngine<families::Model> {
        families::Entity::find_by_id(family_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::FamilyNotFound(family_id.to_string()))
    }

    /// Live-queried member list, ordered for deterministic results.
    pub(super) async fn family_member_models<C: ConnectionTrait>(
        &self,
        db: &C,
        family_id: Uuid,
    ) -> ResultEngine<Vec<users::Model>> {
        users::Entity::find()
            .filter(users::Column::FamilyId.eq(Some(family_id)))
            .order_by_asc(users::Column::CreatedAt)
            .order_by_asc(users::Column::Id)
            .all(db)
            .await
            .map_err(Into::into)
    }

    /// The business/order ledger is visible to the `ayah` role only.
    pub(super) async fn require_ayah<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: Uuid,
    ) -> ResultEngine<users::Model> {
        let user = self.require_user(db, user_id).await?;
        if user.role != crate::Role::Ayah.as_str() {
            return Err(EngineError::PermissionDenied(
                "the order ledger is restricted to the ayah role".to_string(),
            ));
        }
        Ok(user)
    }
}
