pub use sea_orm_migration::prelude::*;

mod m20260720_000001_identities;
mod m20260720_000002_families;
mod m20260720_000003_users;
mod m20260721_000001_household;
mod m20260722_000001_orders;
mod m20260722_000002_debts;
mod m20260723_000001_edit_history;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260720_000001_identities::Migration),
            Box::new(m20260720_000002_families::Migration),
            Box::new(m20260720_000003_users::Migration),
            Box::new(m20260721_000001_household::Migration),
            Box::new(m20260722_000001_orders::Migration),
            Box::new(m20260722_000002_debts::Migration),
            Box::new(m20260723_000001_edit_history::Migration),
        ]
    }
}
