use chrono::{Duration, Utc};
use sea_orm::{ActiveValue, Database, DatabaseConnection, EntityTrait};
use uuid::Uuid;

use engine::{
    DebtDirection, EditAction, Engine, EngineError, FlowKind, HouseholdPatch, NewDebt,
    NewHouseholdTransaction, NewOrder, OrderPatch, OrderStatus, identities,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

async fn seed_user(engine: &Engine, db: &DatabaseConnection, email: &str, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    let identity = identities::ActiveModel {
        id: ActiveValue::Set(id),
        email: ActiveValue::Set(email.to_string()),
        password: ActiveValue::Set("password".to_string()),
        name: ActiveValue::Set(email.split('@').next().unwrap_or(email).to_string()),
        role: ActiveValue::Set(Some(role.to_string())),
        created_at: ActiveValue::Set(Utc::now()),
    };
    identities::Entity::insert(identity).exec(db).await.unwrap();
    engine.resolve_profile(id).await.unwrap();
    id
}

fn expense_entry(amount_minor: i64) -> NewHouseholdTransaction {
    NewHouseholdTransaction {
        kind: FlowKind::Expense,
        category_id: None,
        amount_minor,
        note: None,
        occurred_at: Utc::now(),
    }
}

#[tokio::test]
async fn solo_entries_are_invisible_to_strangers() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let stranger = seed_user(&engine, &db, "other@example.com", "ibu").await;

    let record = engine
        .create_household(ayah, expense_entry(25_000))
        .await
        .unwrap();
    assert_eq!(record.family_id, None);

    let (mine, _) = engine.list_household(ayah, 50, None).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, record.id);

    let (theirs, _) = engine.list_household(stranger, 50, None).await.unwrap();
    assert!(theirs.is_empty());
}

#[tokio::test]
async fn family_members_see_and_edit_each_others_entries() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();
    engine.join_family(ibu, family.id).await.unwrap();

    let record = engine
        .create_household(ayah, expense_entry(25_000))
        .await
        .unwrap();
    assert_eq!(record.family_id, Some(family.id));

    // Family-wide visibility.
    let (seen_by_ibu, _) = engine.list_household(ibu, 50, None).await.unwrap();
    assert_eq!(seen_by_ibu.len(), 1);

    // Any family member may edit any record.
    engine
        .update_household(
            record.id,
            ibu,
            HouseholdPatch {
                kind: FlowKind::Expense,
                category_id: None,
                amount_minor: 30_000,
                note: Some("revised".to_string()),
                occurred_at: record.occurred_at,
            },
        )
        .await
        .unwrap();

    let (seen_by_ayah, _) = engine.list_household(ayah, 50, None).await.unwrap();
    assert_eq!(seen_by_ayah[0].amount_minor, 30_000);
    assert_eq!(seen_by_ayah[0].note.as_deref(), Some("revised"));
}

#[tokio::test]
async fn family_tag_reflects_membership_at_write_time() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;

    // Created while solo: no family tag, forever.
    let solo_record = engine
        .create_household(ayah, expense_entry(10_000))
        .await
        .unwrap();
    assert_eq!(solo_record.family_id, None);

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();
    let family_record = engine
        .create_household(ayah, expense_entry(20_000))
        .await
        .unwrap();
    assert_eq!(family_record.family_id, Some(family.id));

    // In family mode only the tagged record is visible; the solo record's
    // tag is not rewritten retroactively.
    let (visible, _) = engine.list_household(ayah, 50, None).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, family_record.id);
}

#[tokio::test]
async fn stale_family_tags_survive_leaving() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();
    engine.join_family(ibu, family.id).await.unwrap();

    let record = engine
        .create_household(ayah, expense_entry(25_000))
        .await
        .unwrap();

    engine.leave_family(ayah).await.unwrap();

    // No cascading update: the record keeps its family tag and stays
    // visible to the remaining member.
    let (seen_by_ibu, _) = engine.list_household(ibu, 50, None).await.unwrap();
    assert_eq!(seen_by_ibu.len(), 1);
    assert_eq!(seen_by_ibu[0].id, record.id);
    assert_eq!(seen_by_ibu[0].family_id, Some(family.id));
}

#[tokio::test]
async fn list_paginates_newest_first() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;

    let base = Utc::now();
    for day in 0..3 {
        engine
            .create_household(
                ayah,
                NewHouseholdTransaction {
                    kind: FlowKind::Expense,
                    category_id: None,
                    amount_minor: 1_000 + day,
                    note: None,
                    occurred_at: base - Duration::days(day),
                },
            )
            .await
            .unwrap();
    }

    let (first_page, cursor) = engine.list_household(ayah, 2, None).await.unwrap();
    assert_eq!(first_page.len(), 2);
    assert!(first_page[0].occurred_at > first_page[1].occurred_at);
    let cursor = cursor.expect("a third row remains");

    let (second_page, end) = engine
        .list_household(ayah, 2, Some(cursor.as_str()))
        .await
        .unwrap();
    assert_eq!(second_page.len(), 1);
    assert!(end.is_none());
    assert!(second_page[0].occurred_at < first_page[1].occurred_at);
}

#[tokio::test]
async fn summary_totals_follow_the_entries() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;

    engine
        .create_household(
            ayah,
            NewHouseholdTransaction {
                kind: FlowKind::Income,
                category_id: None,
                amount_minor: 1_000_000,
                note: Some("gaji".to_string()),
                occurred_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    engine
        .create_household(ayah, expense_entry(250_000))
        .await
        .unwrap();

    let summary = engine.household_summary(ayah, None, None).await.unwrap();
    assert_eq!(summary.income_minor, 1_000_000);
    assert_eq!(summary.expense_minor, 250_000);
    assert_eq!(summary.net_minor(), 750_000);
}

#[tokio::test]
async fn default_categories_are_seeded_and_read_only() {
    let (engine, db) = engine_with_db().await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let categories = engine.list_categories(ibu).await.unwrap();
    assert!(categories.iter().any(|c| c.name == "Makanan" && c.is_default));

    let default = categories.iter().find(|c| c.is_default).unwrap();
    let err = engine
        .rename_category(default.id, ibu, "Jajan")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine.delete_category(default.id, ibu).await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
}

#[tokio::test]
async fn custom_categories_are_user_scoped() {
    let (engine, db) = engine_with_db().await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;
    let other = seed_user(&engine, &db, "other@example.com", "ayah").await;

    let custom = engine.create_category(ibu, "Arisan").await.unwrap();

    // Duplicate (case-insensitive) within the same scope is rejected.
    let err = engine.create_category(ibu, " arisan ").await.unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));

    // Another user cannot reference it.
    let err = engine
        .create_household(
            other,
            NewHouseholdTransaction {
                kind: FlowKind::Expense,
                category_id: Some(custom.id),
                amount_minor: 5_000,
                note: None,
                occurred_at: Utc::now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    // The owner can.
    engine
        .create_household(
            ibu,
            NewHouseholdTransaction {
                kind: FlowKind::Expense,
                category_id: Some(custom.id),
                amount_minor: 5_000,
                note: None,
                occurred_at: Utc::now(),
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn order_totals_are_recomputed_from_inputs() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;

    let order = engine
        .create_order(
            ayah,
            NewOrder {
                customer: "Bu Sari".to_string(),
                note: None,
                quantity: 10,
                unit_price_minor: 5_000,
                ordered_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    let (with_totals, _) = engine.order_detail(order.id, ayah).await.unwrap();
    assert_eq!(with_totals.total_income_minor(), 50_000);
    assert_eq!(with_totals.profit_minor(), 50_000);

    let expense = engine
        .add_order_expense(order.id, ayah, "bahan", 12_000, Utc::now())
        .await
        .unwrap();

    let (with_totals, expenses) = engine.order_detail(order.id, ayah).await.unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(with_totals.profit_minor(), 38_000);

    // Deleting the expense restores the raw margin.
    engine
        .delete_order_expense(order.id, expense.id, ayah)
        .await
        .unwrap();
    let (with_totals, expenses) = engine.order_detail(order.id, ayah).await.unwrap();
    assert!(expenses.is_empty());
    assert_eq!(with_totals.profit_minor(), 50_000);
}

#[tokio::test]
async fn orders_are_gated_to_the_ayah_role() {
    let (engine, db) = engine_with_db().await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let err = engine.list_orders(ibu, 50, None).await.unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));

    let err = engine
        .create_order(
            ibu,
            NewOrder {
                customer: "Bu Sari".to_string(),
                note: None,
                quantity: 1,
                unit_price_minor: 1_000,
                ordered_at: Utc::now(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PermissionDenied(_)));
}

#[tokio::test]
async fn order_status_updates_replace_editable_fields() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;

    let order = engine
        .create_order(
            ayah,
            NewOrder {
                customer: "Bu Sari".to_string(),
                note: None,
                quantity: 10,
                unit_price_minor: 5_000,
                ordered_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);

    let updated = engine
        .update_order(
            order.id,
            ayah,
            OrderPatch {
                customer: "Bu Sari".to_string(),
                note: Some("diantar".to_string()),
                quantity: 12,
                unit_price_minor: 5_000,
                status: OrderStatus::Done,
                ordered_at: order.ordered_at,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Done);
    assert_eq!(updated.quantity, 12);
    assert_eq!(updated.total_income_minor(), 60_000);
}

#[tokio::test]
async fn debt_settlement_follows_payments() {
    let (engine, db) = engine_with_db().await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let debt = engine
        .create_debt(
            ibu,
            NewDebt {
                counterparty: "Pak Budi".to_string(),
                direction: DebtDirection::Receivable,
                amount_minor: 100_000,
                note: None,
                due_date: None,
                occurred_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    engine
        .record_payment(debt.id, ibu, 40_000, None, Utc::now())
        .await
        .unwrap();

    let (status, payments) = engine.debt_detail(debt.id, ibu).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(status.paid_minor, 40_000);
    assert_eq!(status.remaining_minor(), 60_000);
    assert!(!status.settled());

    let second = engine
        .record_payment(debt.id, ibu, 60_000, None, Utc::now())
        .await
        .unwrap();
    let (status, _) = engine.debt_detail(debt.id, ibu).await.unwrap();
    assert_eq!(status.remaining_minor(), 0);
    assert!(status.settled());

    // Removing a payment un-settles the debt.
    engine.delete_payment(debt.id, second.id, ibu).await.unwrap();
    let (status, _) = engine.debt_detail(debt.id, ibu).await.unwrap();
    assert_eq!(status.remaining_minor(), 60_000);
    assert!(!status.settled());
}

#[tokio::test]
async fn overpayments_are_rejected() {
    let (engine, db) = engine_with_db().await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let debt = engine
        .create_debt(
            ibu,
            NewDebt {
                counterparty: "Pak Budi".to_string(),
                direction: DebtDirection::Owed,
                amount_minor: 50_000,
                note: None,
                due_date: None,
                occurred_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    let err = engine
        .record_payment(debt.id, ibu, 60_000, None, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn debt_principal_cannot_drop_below_payments() {
    let (engine, db) = engine_with_db().await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let debt = engine
        .create_debt(
            ibu,
            NewDebt {
                counterparty: "Pak Budi".to_string(),
                direction: DebtDirection::Owed,
                amount_minor: 50_000,
                note: None,
                due_date: None,
                occurred_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    engine
        .record_payment(debt.id, ibu, 30_000, None, Utc::now())
        .await
        .unwrap();

    let err = engine
        .update_debt(
            debt.id,
            ibu,
            engine::DebtPatch {
                counterparty: "Pak Budi".to_string(),
                direction: DebtDirection::Owed,
                amount_minor: 20_000,
                note: None,
                due_date: None,
                occurred_at: debt.occurred_at,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn mutations_are_recorded_in_the_edit_history() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();
    engine.join_family(ibu, family.id).await.unwrap();

    let record = engine
        .create_household(ayah, expense_entry(25_000))
        .await
        .unwrap();
    engine
        .update_household(
            record.id,
            ibu,
            HouseholdPatch {
                kind: FlowKind::Expense,
                category_id: None,
                amount_minor: 30_000,
                note: None,
                occurred_at: record.occurred_at,
            },
        )
        .await
        .unwrap();
    engine.delete_household(record.id, ibu).await.unwrap();

    // Both members see the full family trail, newest first.
    let entries = engine.list_history(ayah, 10).await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].action, EditAction::Deleted);
    assert_eq!(entries[1].action, EditAction::Updated);
    assert_eq!(entries[2].action, EditAction::Created);
    // The audit log names who edited, not just who owns.
    assert_eq!(entries[0].editor_id, ibu);
    assert_eq!(entries[2].editor_id, ayah);
}

#[tokio::test]
async fn failed_creates_leave_no_trace() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;

    let err = engine
        .create_household(ayah, expense_entry(0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let (records, _) = engine.list_household(ayah, 50, None).await.unwrap();
    assert!(records.is_empty());
    let entries = engine.list_history(ayah, 10).await.unwrap();
    assert!(entries.is_empty());
}
