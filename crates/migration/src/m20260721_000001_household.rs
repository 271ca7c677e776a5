//! Household ledger tables: categories (with seeded defaults) and
//! transactions.

use sea_orm::{ConnectionTrait, Statement, Value};
use sea_orm_migration::prelude::*;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{m20260720_000002_families::Families, m20260720_000003_users::Users};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum HouseholdCategories {
    Table,
    Id,
    Name,
    NameNorm,
    IsDefault,
    UserId,
}

#[derive(Iden)]
pub enum HouseholdTransactions {
    Table,
    Id,
    UserId,
    FamilyId,
    Kind,
    CategoryId,
    AmountMinor,
    Note,
    OccurredAt,
    CreatedAt,
    UpdatedAt,
}

/// Categories every household starts with.
const DEFAULT_CATEGORIES: &[&str] = &[
    "Makanan",
    "Transportasi",
    "Tagihan",
    "Pendidikan",
    "Kesehatan",
    "Hiburan",
    "Lainnya",
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HouseholdCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HouseholdCategories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HouseholdCategories::Name).string().not_null())
                    .col(
                        ColumnDef::new(HouseholdCategories::NameNorm)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HouseholdCategories::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(HouseholdCategories::UserId).uuid())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-household_categories-user_id")
                            .from(HouseholdCategories::Table, HouseholdCategories::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-household_categories-user_id-name_norm")
                    .table(HouseholdCategories::Table)
                    .col(HouseholdCategories::UserId)
                    .col(HouseholdCategories::NameNorm)
                    .to_owned(),
            )
            .await?;

        seed_default_categories(manager).await?;

        manager
            .create_table(
                Table::create()
                    .table(HouseholdTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HouseholdTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(HouseholdTransactions::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HouseholdTransactions::FamilyId).uuid())
                    .col(ColumnDef::new(HouseholdTransactions::Kind).string().not_null())
                    .col(ColumnDef::new(HouseholdTransactions::CategoryId).uuid())
                    .col(
                        ColumnDef::new(HouseholdTransactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(HouseholdTransactions::Note).string())
                    .col(
                        ColumnDef::new(HouseholdTransactions::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HouseholdTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(HouseholdTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-household_transactions-user_id")
                            .from(HouseholdTransactions::Table, HouseholdTransactions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-household_transactions-family_id")
                            .from(
                                HouseholdTransactions::Table,
                                HouseholdTransactions::FamilyId,
                            )
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-household_transactions-category_id")
                            .from(
                                HouseholdTransactions::Table,
                                HouseholdTransactions::CategoryId,
                            )
                            .to(HouseholdCategories::Table, HouseholdCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-household_transactions-family_id")
                    .table(HouseholdTransactions::Table)
                    .col(HouseholdTransactions::FamilyId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-household_transactions-user_id")
                    .table(HouseholdTransactions::Table)
                    .col(HouseholdTransactions::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(HouseholdTransactions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(HouseholdCategories::Table).to_owned())
            .await?;
        Ok(())
    }
}

async fn seed_default_categories(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    let db = manager.get_connection();
    let backend = db.get_database_backend();

    for name in DEFAULT_CATEGORIES {
        let norm: String = name.trim().nfc().collect::<String>().to_lowercase();
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO household_categories (id, name, name_norm, is_default, user_id) \
             VALUES (?, ?, ?, TRUE, NULL)",
            vec![
                Value::from(Uuid::new_v4()),
                Value::from(*name),
                Value::from(norm),
            ],
        ))
        .await?;
    }

    Ok(())
}
