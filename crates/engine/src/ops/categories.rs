//! Household category operations.
//!
//! Defaults are read-only and visible to everyone; custom categories belong
//! to the user who created them.

use sea_orm::{ActiveValue, ConnectionTrait, Condition, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, HouseholdCategory, ResultEngine, categories,
    util::{normalize_name_key, normalize_required_name},
    watch::{ChangeEvent, ChangeKind, Collection},
};

use super::Engine;

impl Engine {
    /// Lists the categories usable by the actor: the global defaults plus
    /// the actor's own custom ones.
    pub async fn list_categories(&self, actor_id: Uuid) -> ResultEngine<Vec<HouseholdCategory>> {
        self.require_user(&self.database, actor_id).await?;

        let models = categories::Entity::find()
            .filter(
                Condition::any()
                    .add(categories::Column::IsDefault.eq(true))
                    .add(categories::Column::UserId.eq(Some(actor_id))),
            )
            .order_by_desc(categories::Column::IsDefault)
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?;

        Ok(models.into_iter().map(HouseholdCategory::from).collect())
    }

    /// Creates a custom category owned by the actor.
    pub async fn create_category(
        &self,
        actor_id: Uuid,
        name: &str,
    ) -> ResultEngine<HouseholdCategory> {
        self.require_user(&self.database, actor_id).await?;
        let name = normalize_required_name(name, "category")?;
        let name_norm = normalize_name_key(&name);

        let clash = categories::Entity::find()
            .filter(categories::Column::NameNorm.eq(name_norm.clone()))
            .filter(
                Condition::any()
                    .add(categories::Column::IsDefault.eq(true))
                    .add(categories::Column::UserId.eq(Some(actor_id))),
            )
            .one(&self.database)
            .await?;
        if clash.is_some() {
            return Err(EngineError::ExistingKey(name));
        }

        let category = HouseholdCategory {
            id: Uuid::new_v4(),
            name,
            is_default: false,
            user_id: Some(actor_id),
        };
        categories::ActiveModel::from(&category)
            .insert(&self.database)
            .await?;

        self.publish(ChangeEvent {
            collection: Collection::HouseholdCategories,
            kind: ChangeKind::Insert,
            record_id: category.id,
            family_id: None,
            user_id: Some(actor_id),
        });
        Ok(category)
    }

    /// Renames one of the actor's custom categories. Defaults are read-only.
    pub async fn rename_category(
        &self,
        category_id: Uuid,
        actor_id: Uuid,
        name: &str,
    ) -> ResultEngine<HouseholdCategory> {
        self.require_user(&self.database, actor_id).await?;
        let model = self.require_own_category(category_id, actor_id).await?;

        let name = normalize_required_name(name, "category")?;
        let mut active: categories::ActiveModel = model.into();
        active.name = ActiveValue::Set(name.clone());
        active.name_norm = ActiveValue::Set(normalize_name_key(&name));
        let updated = active.update(&self.database).await?;

        self.publish(ChangeEvent {
            collection: Collection::HouseholdCategories,
            kind: ChangeKind::Update,
            record_id: category_id,
            family_id: None,
            user_id: Some(actor_id),
        });
        Ok(HouseholdCategory::from(updated))
    }

    /// Deletes one of the actor's custom categories. Transactions referencing
    /// it keep working; the foreign key nulls out on delete.
    pub async fn delete_category(&self, category_id: Uuid, actor_id: Uuid) -> ResultEngine<()> {
        self.require_user(&self.database, actor_id).await?;
        self.require_own_category(category_id, actor_id).await?;

        categories::Entity::delete_by_id(category_id)
            .exec(&self.database)
            .await?;

        self.publish(ChangeEvent {
            collection: Collection::HouseholdCategories,
            kind: ChangeKind::Delete,
            record_id: category_id,
            family_id: None,
            user_id: Some(actor_id),
        });
        Ok(())
    }

    async fn require_own_category(
        &self,
        category_id: Uuid,
        actor_id: Uuid,
    ) -> ResultEngine<categories::Model> {
        let model = categories::Entity::find_by_id(category_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("category {category_id}")))?;

        if model.is_default {
            return Err(EngineError::PermissionDenied(
                "default categories are read-only".to_string(),
            ));
        }
        if model.user_id != Some(actor_id) {
            return Err(EngineError::PermissionDenied(
                "category belongs to another user".to_string(),
            ));
        }
        Ok(model)
    }

    /// A transaction may reference a category that is a global default or
    /// one of the acting user's own.
    pub(super) async fn require_category_visible<C: ConnectionTrait>(
        &self,
        db: &C,
        category_id: Uuid,
        actor_id: Uuid,
    ) -> ResultEngine<()> {
        let model = categories::Entity::find_by_id(category_id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("category {category_id}")))?;

        if !model.is_default && model.user_id != Some(actor_id) {
            return Err(EngineError::PermissionDenied(
                "category belongs to another user".to_string(),
            ));
        }
        Ok(())
    }
}
