use sea_orm_migration::prelude::*;

use crate::{m20260720_000002_families::Families, m20260720_000003_users::Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Debts {
    Table,
    Id,
    UserId,
    FamilyId,
    Counterparty,
    Direction,
    AmountMinor,
    Note,
    DueDate,
    OccurredAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum DebtPayments {
    Table,
    Id,
    DebtId,
    AmountMinor,
    Note,
    PaidAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Debts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Debts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Debts::UserId).uuid().not_null())
                    .col(ColumnDef::new(Debts::FamilyId).uuid())
                    .col(ColumnDef::new(Debts::Counterparty).string().not_null())
                    .col(ColumnDef::new(Debts::Direction).string().not_null())
                    .col(ColumnDef::new(Debts::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Debts::Note).string())
                    .col(ColumnDef::new(Debts::DueDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Debts::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Debts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Debts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-user_id")
                            .from(Debts::Table, Debts::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debts-family_id")
                            .from(Debts::Table, Debts::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debts-family_id")
                    .table(Debts::Table)
                    .col(Debts::FamilyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DebtPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DebtPayments::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DebtPayments::DebtId).uuid().not_null())
                    .col(
                        ColumnDef::new(DebtPayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DebtPayments::Note).string())
                    .col(
                        ColumnDef::new(DebtPayments::PaidAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-debt_payments-debt_id")
                            .from(DebtPayments::Table, DebtPayments::DebtId)
                            .to(Debts::Table, Debts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-debt_payments-debt_id")
                    .table(DebtPayments::Table)
                    .col(DebtPayments::DebtId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DebtPayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Debts::Table).to_owned())
            .await?;
        Ok(())
    }
}
