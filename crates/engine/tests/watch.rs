use std::time::Duration;

use chrono::Utc;
use sea_orm::{ActiveValue, Database, DatabaseConnection, EntityTrait};
use uuid::Uuid;

use engine::{
    ChangeKind, Collection, Engine, FlowKind, NewHouseholdTransaction, WatchMessage, identities,
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

fn entry(amount_minor: i64) -> NewHouseholdTransaction {
    NewHouseholdTransaction {
        kind: FlowKind::Expense,
        category_id: None,
        amount_minor,
        note: None,
        occurred_at: Utc::now(),
    }
}

#[tokio::test]
async fn family_watchers_receive_ledger_changes() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();

    let mut watcher = engine.subscribe_family(family.id);

    let record = engine.create_household(ayah, entry(25_000)).await.unwrap();

    let message = watcher.recv().await.expect("feed is open");
    let WatchMessage::Event(event) = message else {
        panic!("expected an event, got {message:?}");
    };
    assert_eq!(event.collection, Collection::HouseholdTransactions);
    assert_eq!(event.kind, ChangeKind::Insert);
    assert_eq!(event.record_id, record.id);
    assert_eq!(event.family_id, Some(family.id));
}

#[tokio::test]
async fn solo_watchers_match_on_the_owner() {
    let (engine, db) = engine_with_db().await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let mut watcher = engine.subscribe_user(ibu);

    let record = engine.create_household(ibu, entry(5_000)).await.unwrap();

    let message = watcher.recv().await.expect("feed is open");
    assert!(matches!(
        message,
        WatchMessage::Event(event) if event.record_id == record.id
    ));
}

#[tokio::test]
async fn other_families_see_nothing() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let other = seed_user(&engine, &db, "other@example.com", "ibu").await;

    let _family_a = engine.create_family("Keluarga A", ayah).await.unwrap();
    let family_b = engine.create_family("Keluarga B", other).await.unwrap();

    let mut watcher = engine.subscribe_family(family_b.id);

    engine.create_household(ayah, entry(25_000)).await.unwrap();

    // Nothing in scope arrives for family B.
    let outcome = tokio::time::timeout(Duration::from_millis(200), watcher.recv()).await;
    assert!(outcome.is_err(), "expected no event for family B");
}

#[tokio::test]
async fn membership_changes_notify_the_family_left_behind() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();
    engine.join_family(ibu, family.id).await.unwrap();

    let mut watcher = engine.subscribe_family(family.id);

    engine.leave_family(ibu).await.unwrap();

    let message = watcher.recv().await.expect("feed is open");
    let WatchMessage::Event(event) = message else {
        panic!("expected an event, got {message:?}");
    };
    assert_eq!(event.collection, Collection::Users);
    assert_eq!(event.kind, ChangeKind::Update);
    assert_eq!(event.record_id, ibu);
    // Tagged with the family that was left so its members refetch.
    assert_eq!(event.family_id, Some(family.id));
}

#[tokio::test]
async fn watchers_coalesce_bursts_via_drain() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();

    let mut watcher = engine.subscribe_family(family.id);

    for amount in 1..=4 {
        engine
            .create_household(ayah, entry(amount * 1_000))
            .await
            .unwrap();
    }

    // First event wakes the consumer; the rest of the burst is drained and
    // answered by a single refetch.
    assert!(watcher.recv().await.is_some());
    assert_eq!(watcher.drain(), 3);

    let (records, _) = engine.list_household(ayah, 50, None).await.unwrap();
    assert_eq!(records.len(), 4);
}
