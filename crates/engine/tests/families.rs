use chrono::Utc;
use sea_orm::{ActiveValue, Database, DatabaseConnection, EntityTrait};
use uuid::Uuid;

use engine::{Engine, EngineError, Role, families, identities};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    (engine, db)
}

async fn seed_identity(db: &DatabaseConnection, email: &str, role: Option<&str>) -> Uuid {
    let id = Uuid::new_v4();
    let identity = identities::ActiveModel {
        id: ActiveValue::Set(id),
        email: ActiveValue::Set(email.to_string()),
        password: ActiveValue::Set("password".to_string()),
        name: ActiveValue::Set(email.split('@').next().unwrap_or(email).to_string()),
        role: ActiveValue::Set(role.map(|r| r.to_string())),
        created_at: ActiveValue::Set(Utc::now()),
    };
    identities::Entity::insert(identity).exec(db).await.unwrap();
    id
}

/// Seeds an identity and provisions its profile.
async fn seed_user(engine: &Engine, db: &DatabaseConnection, email: &str, role: &str) -> Uuid {
    let id = seed_identity(db, email, Some(role)).await;
    engine.resolve_profile(id).await.unwrap();
    id
}

#[tokio::test]
async fn create_family_links_the_creator() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();

    assert_eq!(family.members.len(), 1);
    assert_eq!(family.members[0].id, ayah);
    assert_eq!(family.members[0].family_id, Some(family.id));

    let profile = engine.resolve_profile(ayah).await.unwrap();
    assert_eq!(profile.user.family_id, Some(family.id));
}

#[tokio::test]
async fn join_family_fills_the_other_role_slot() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();
    engine.join_family(ibu, family.id).await.unwrap();

    let family = engine.family_by_id(family.id).await.unwrap();
    let mut ids: Vec<Uuid> = family.members.iter().map(|m| m.id).collect();
    ids.sort();
    let mut expected = vec![ayah, ibu];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn join_family_rejects_a_taken_role_slot() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let other_ayah = seed_user(&engine, &db, "ayah2@example.com", "ayah").await;

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();

    let err = engine.join_family(other_ayah, family.id).await.unwrap_err();
    assert_eq!(err, EngineError::RoleSlotTaken(Role::Ayah));
    // The message names the occupied role.
    assert!(err.to_string().contains("ayah"));

    let family = engine.family_by_id(family.id).await.unwrap();
    assert_eq!(family.members.len(), 1);
}

#[tokio::test]
async fn join_family_requires_an_existing_family() {
    let (engine, db) = engine_with_db().await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    let missing = Uuid::new_v4();
    let err = engine.join_family(ibu, missing).await.unwrap_err();
    assert_eq!(err, EngineError::FamilyNotFound(missing.to_string()));
}

#[tokio::test]
async fn join_family_rejects_a_second_membership() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;

    engine.create_family("Keluarga A", ayah).await.unwrap();
    let family_b = engine.create_family("Keluarga B", ibu).await.unwrap();

    let err = engine.join_family(ayah, family_b.id).await.unwrap_err();
    assert_eq!(err, EngineError::AlreadyInFamily(ayah.to_string()));
}

#[tokio::test]
async fn leave_family_is_idempotent_and_keeps_the_row() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();

    engine.leave_family(ayah).await.unwrap();
    // Second leave is a no-op success, not an error.
    engine.leave_family(ayah).await.unwrap();

    let profile = engine.resolve_profile(ayah).await.unwrap();
    assert_eq!(profile.user.family_id, None);

    // The family row survives with no members.
    let family = engine.family_by_id(family.id).await.unwrap();
    assert!(family.members.is_empty());
}

#[tokio::test]
async fn create_family_rolls_back_when_the_creator_is_already_linked() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    engine.create_family("Keluarga A", ayah).await.unwrap();

    let err = engine.create_family("Keluarga B", ayah).await.unwrap_err();
    assert_eq!(err, EngineError::AlreadyInFamily(ayah.to_string()));

    // The failed attempt's family row was deleted again.
    let families = families::Entity::find().all(&db).await.unwrap();
    assert_eq!(families.len(), 1);
    assert_eq!(families[0].name, "Keluarga A");
}

#[tokio::test]
async fn create_family_rolls_back_for_an_unknown_creator() {
    let (engine, db) = engine_with_db().await;

    let ghost = Uuid::new_v4();
    let err = engine.create_family("Keluarga Test", ghost).await.unwrap_err();
    assert_eq!(err, EngineError::NotFound(format!("user {ghost}")));

    assert!(families::Entity::find().all(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn role_slot_reopens_after_a_member_leaves() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;
    let ibu = seed_user(&engine, &db, "ibu@example.com", "ibu").await;
    let other_ibu = seed_user(&engine, &db, "ibu2@example.com", "ibu").await;

    let family = engine.create_family("Keluarga Test", ayah).await.unwrap();
    engine.join_family(ibu, family.id).await.unwrap();

    engine.leave_family(ibu).await.unwrap();
    engine.join_family(other_ibu, family.id).await.unwrap();

    let family = engine.family_by_id(family.id).await.unwrap();
    assert_eq!(family.members.len(), 2);
    assert!(family.members.iter().any(|m| m.id == other_ibu));
    assert!(family.members.iter().all(|m| m.id != ibu));

    // At most one member per role, still.
    let ibu_members = family
        .members
        .iter()
        .filter(|m| m.role == Role::Ibu)
        .count();
    assert_eq!(ibu_members, 1);
}

#[tokio::test]
async fn empty_name_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let ayah = seed_user(&engine, &db, "ayah@example.com", "ayah").await;

    let err = engine.create_family("   ", ayah).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidAmount("family name must not be empty".to_string())
    );
}
