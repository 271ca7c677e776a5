//! Append-only edit log for ledger records.
//!
//! History entries are written in the same database transaction as the
//! mutation they describe, but through an independent recorder so the audit
//! concern stays separately testable from the ledger logic.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, watch::Collection};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Created,
    Updated,
    Deleted,
}

impl EditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl TryFrom<&str> for EditAction {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid edit action: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditEntry {
    pub id: Uuid,
    pub collection: Collection,
    pub record_id: Uuid,
    pub action: EditAction,
    pub editor_id: Uuid,
    pub family_id: Option<Uuid>,
    pub at: DateTime<Utc>,
}

impl EditEntry {
    pub fn new(
        collection: Collection,
        record_id: Uuid,
        action: EditAction,
        editor_id: Uuid,
        family_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            collection,
            record_id,
            action,
            editor_id,
            family_id,
            at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "edit_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub collection: String,
    pub record_id: Uuid,
    pub action: String,
    pub editor_id: Uuid,
    pub family_id: Option<Uuid>,
    pub at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&EditEntry> for ActiveModel {
    fn from(entry: &EditEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id),
            collection: ActiveValue::Set(entry.collection.as_str().to_string()),
            record_id: ActiveValue::Set(entry.record_id),
            action: ActiveValue::Set(entry.action.as_str().to_string()),
            editor_id: ActiveValue::Set(entry.editor_id),
            family_id: ActiveValue::Set(entry.family_id),
            at: ActiveValue::Set(entry.at),
        }
    }
}

impl TryFrom<Model> for EditEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            collection: Collection::try_from(model.collection.as_str())?,
            record_id: model.record_id,
            action: EditAction::try_from(model.action.as_str())?,
            editor_id: model.editor_id,
            family_id: model.family_id,
            at: model.at,
        })
    }
}
