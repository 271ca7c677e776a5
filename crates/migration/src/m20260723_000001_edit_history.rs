use sea_orm_migration::prelude::*;

use crate::m20260720_000003_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum EditHistory {
    Table,
    Id,
    Collection,
    RecordId,
    Action,
    EditorId,
    FamilyId,
    At,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EditHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EditHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(EditHistory::Collection).string().not_null())
                    .col(ColumnDef::new(EditHistory::RecordId).uuid().not_null())
                    .col(ColumnDef::new(EditHistory::Action).string().not_null())
                    .col(ColumnDef::new(EditHistory::EditorId).uuid().not_null())
                    .col(ColumnDef::new(EditHistory::FamilyId).uuid())
                    .col(
                        ColumnDef::new(EditHistory::At)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-edit_history-editor_id")
                            .from(EditHistory::Table, EditHistory::EditorId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-edit_history-family_id")
                    .table(EditHistory::Table)
                    .col(EditHistory::FamilyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-edit_history-editor_id")
                    .table(EditHistory::Table)
                    .col(EditHistory::EditorId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(EditHistory::Table).to_owned())
            .await?;
        Ok(())
    }
}
