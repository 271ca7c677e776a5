//! Edit-history recording and listing.
//!
//! Recording is a free function over any connection so the audit concern is
//! testable without the rest of the ledger machinery; the ledger ops call it
//! inside their own transactions.

use sea_orm::{ConnectionTrait, DbErr, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*};
use uuid::Uuid;

use crate::{EditEntry, ResultEngine, edit_history};

use super::{Engine, access::LedgerScope, with_tx};

/// Appends one history entry. Called inside the same transaction as the
/// mutation it describes.
pub(crate) async fn record_edit<C: ConnectionTrait>(db: &C, entry: &EditEntry) -> Result<(), DbErr> {
    edit_history::ActiveModel::from(entry).insert(db).await?;
    Ok(())
}

impl Engine {
    /// Lists recent edits visible to the actor, newest first.
    pub async fn list_history(&self, actor_id: Uuid, limit: u64) -> ResultEngine<Vec<EditEntry>> {
        with_tx!(self, |db_tx| {
            let actor = self.require_user(&db_tx, actor_id).await?;

            let mut query = edit_history::Entity::find();
            query = match LedgerScope::for_user(&actor) {
                LedgerScope::Family(family_id) => {
                    query.filter(edit_history::Column::FamilyId.eq(Some(family_id)))
                }
                LedgerScope::Solo(user_id) => {
                    query.filter(edit_history::Column::EditorId.eq(user_id))
                }
            };

            let models = query
                .order_by_desc(edit_history::Column::At)
                .order_by_desc(edit_history::Column::Id)
                .limit(limit)
                .all(&db_tx)
                .await?;

            models.into_iter().map(EditEntry::try_from).collect()
        })
    }
}
