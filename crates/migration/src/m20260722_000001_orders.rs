use sea_orm_migration::prelude::*;

use crate::{m20260720_000002_families::Families, m20260720_000003_users::Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Orders {
    Table,
    Id,
    UserId,
    FamilyId,
    Customer,
    Note,
    Quantity,
    UnitPriceMinor,
    Status,
    OrderedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum OrderExpenses {
    Table,
    Id,
    OrderId,
    Name,
    AmountMinor,
    SpentAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(ColumnDef::new(Orders::FamilyId).uuid())
                    .col(ColumnDef::new(Orders::Customer).string().not_null())
                    .col(ColumnDef::new(Orders::Note).string())
                    .col(ColumnDef::new(Orders::Quantity).big_integer().not_null())
                    .col(
                        ColumnDef::new(Orders::UnitPriceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::Status).string().not_null())
                    .col(
                        ColumnDef::new(Orders::OrderedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-orders-user_id")
                            .from(Orders::Table, Orders::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-orders-family_id")
                            .from(Orders::Table, Orders::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-orders-family_id")
                    .table(Orders::Table)
                    .col(Orders::FamilyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderExpenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderExpenses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderExpenses::OrderId).uuid().not_null())
                    .col(ColumnDef::new(OrderExpenses::Name).string().not_null())
                    .col(
                        ColumnDef::new(OrderExpenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrderExpenses::SpentAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-order_expenses-order_id")
                            .from(OrderExpenses::Table, OrderExpenses::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-order_expenses-order_id")
                    .table(OrderExpenses::Table)
                    .col(OrderExpenses::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderExpenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        Ok(())
    }
}
