use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use chrono::Utc;
use sea_orm::{ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use std::sync::Arc;

use api_types::user::{Signup, SignupCreated};
use engine::{Engine, EngineError, identities};

use crate::{
    ServerError, categories, debts, events, family, history, household, orders, profile,
};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Credential check plus profile resolution.
///
/// The resolved [`engine::Profile`] is attached as a request extension; it
/// is the explicit session context every handler works from. There is no
/// ambient current-user state anywhere else.
async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let identity: Option<identities::Model> = identities::Entity::find()
        .filter(identities::Column::Email.eq(auth_header.username()))
        .filter(identities::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(identity) = identity else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let profile = state
        .engine
        .resolve_profile(identity.id)
        .await
        .map_err(|err| {
            tracing::error!("profile resolution failed: {err}");
            StatusCode::UNAUTHORIZED
        })?;

    request.extensions_mut().insert(profile);
    Ok(next.run(request).await)
}

/// Identity creation. The only route outside the auth layer.
async fn signup(
    State(state): State<ServerState>,
    Json(payload): Json<Signup>,
) -> Result<(StatusCode, Json<SignupCreated>), ServerError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServerError::Generic("a valid email is required".to_string()));
    }
    if payload.password.is_empty() {
        return Err(ServerError::Generic("password must not be empty".to_string()));
    }

    let existing = identities::Entity::find()
        .filter(identities::Column::Email.eq(email.clone()))
        .one(&state.db)
        .await
        .map_err(EngineError::from)?;
    if existing.is_some() {
        return Err(ServerError::Engine(EngineError::ExistingKey(email)));
    }

    let identity = identities::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        email: ActiveValue::Set(email),
        password: ActiveValue::Set(payload.password),
        name: ActiveValue::Set(payload.name.trim().to_string()),
        role: ActiveValue::Set(payload.role.map(|role| role.as_str().to_string())),
        created_at: ActiveValue::Set(Utc::now()),
    };
    let inserted = identities::Entity::insert(identity)
        .exec(&state.db)
        .await
        .map_err(EngineError::from)?;

    Ok((
        StatusCode::CREATED,
        Json(SignupCreated {
            identity_id: inserted.last_insert_id,
        }),
    ))
}

fn router(state: ServerState) -> Router {
    let authed = Router::new()
        .route("/profile", get(profile::get).patch(profile::update))
        .route("/profile/refresh", post(profile::refresh))
        .route("/family", post(family::create).get(family::get_own))
        .route("/family/join", post(family::join))
        .route("/family/leave", post(family::leave))
        .route("/family/{id}", get(family::get_by_id))
        .route(
            "/household",
            get(household::list).post(household::create),
        )
        .route(
            "/household/{id}",
            axum::routing::patch(household::update).delete(household::delete),
        )
        .route("/household/summary", get(household::summary))
        .route(
            "/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/categories/{id}",
            axum::routing::patch(categories::update).delete(categories::delete),
        )
        .route("/orders", get(orders::list).post(orders::create))
        .route(
            "/orders/{id}",
            get(orders::detail)
                .patch(orders::update)
                .delete(orders::delete),
        )
        .route("/orders/{id}/expenses", post(orders::add_expense))
        .route(
            "/orders/{id}/expenses/{expense_id}",
            axum::routing::delete(orders::delete_expense),
        )
        .route("/debts", get(debts::list).post(debts::create))
        .route(
            "/debts/{id}",
            get(debts::detail).patch(debts::update).delete(debts::delete),
        )
        .route("/debts/{id}/payments", post(debts::add_payment))
        .route(
            "/debts/{id}/payments/{payment_id}",
            axum::routing::delete(debts::delete_payment),
        )
        .route("/history", get(history::list))
        .route("/events", get(events::stream))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/signup", post(signup))
        .merge(authed)
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::Database;
    use tower::ServiceExt;

    async fn test_router() -> (Router, DatabaseConnection) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db.clone()).build().await.unwrap();
        let state = ServerState {
            engine: Arc::new(engine),
            db: db.clone(),
        };
        (router(state), db)
    }

    async fn seed_identity(db: &DatabaseConnection, email: &str, role: &str) -> Uuid {
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
        id
    }

    fn basic_auth(email: &str, password: &str) -> String {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{email}:{password}"));
        format!("Basic {encoded}")
    }

    fn authed_request(method: &str, uri: &str, email: &str, body: Option<serde_json::Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, basic_auth(email, "password"));
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn signup_creates_an_identity() {
        let (app, _db) = test_router().await;

        let request = Request::builder()
            .method("POST")
            .uri("/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({
                    "email": "ayah@example.com",
                    "password": "password",
                    "name": "Pak Budi",
                    "role": "ayah"
                })
                .to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_conflict() {
        let (app, db) = test_router().await;
        seed_identity(&db, "ayah@example.com", "ayah").await;

        let request = Request::builder()
            .method("POST")
            .uri("/signup")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({
                    "email": "ayah@example.com",
                    "password": "password",
                    "name": "Pak Budi",
                    "role": null
                })
                .to_string(),
            ))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn bad_credentials_are_unauthorized() {
        let (app, db) = test_router().await;
        seed_identity(&db, "ayah@example.com", "ayah").await;

        let request = Request::builder()
            .method("GET")
            .uri("/profile")
            .header(header::AUTHORIZATION, basic_auth("ayah@example.com", "wrong"))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn profile_is_provisioned_on_first_request() {
        let (app, db) = test_router().await;
        seed_identity(&db, "ayah@example.com", "ayah").await;

        let response = app
            .oneshot(authed_request("GET", "/profile", "ayah@example.com", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["user"]["email"], "ayah@example.com");
        assert_eq!(body["user"]["role"], "ayah");
        assert!(body["family"].is_null());
    }

    #[tokio::test]
    async fn family_round_trip_over_http() {
        let (app, db) = test_router().await;
        seed_identity(&db, "ayah@example.com", "ayah").await;
        seed_identity(&db, "ibu@example.com", "ibu").await;

        let response = app
            .clone()
            .oneshot(authed_request(
                "POST",
                "/family",
                "ayah@example.com",
                Some(serde_json::json!({ "name": "Keluarga Budi" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let family = json_body(response).await;
        let family_id = family["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(authed_request(
                "POST",
                "/family/join",
                "ibu@example.com",
                Some(serde_json::json!({ "family_id": family_id })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(authed_request("GET", "/family", "ayah@example.com", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let family = json_body(response).await;
        assert_eq!(family["members"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn taken_role_slot_maps_to_conflict() {
        let (app, db) = test_router().await;
        seed_identity(&db, "ayah@example.com", "ayah").await;
        seed_identity(&db, "ayah2@example.com", "ayah").await;

        let response = app
            .clone()
            .oneshot(authed_request(
                "POST",
                "/family",
                "ayah@example.com",
                Some(serde_json::json!({ "name": "Keluarga Budi" })),
            ))
            .await
            .unwrap();
        let family = json_body(response).await;
        let family_id = family["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(authed_request(
                "POST",
                "/family/join",
                "ayah2@example.com",
                Some(serde_json::json!({ "family_id": family_id })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("ayah"));
    }

    #[tokio::test]
    async fn order_ledger_is_forbidden_for_ibu() {
        let (app, db) = test_router().await;
        seed_identity(&db, "ibu@example.com", "ibu").await;

        let response = app
            .oneshot(authed_request("GET", "/orders", "ibu@example.com", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn household_create_and_list_over_http() {
        let (app, db) = test_router().await;
        seed_identity(&db, "ibu@example.com", "ibu").await;

        let response = app
            .clone()
            .oneshot(authed_request(
                "POST",
                "/household",
                "ibu@example.com",
                Some(serde_json::json!({
                    "kind": "expense",
                    "category_id": null,
                    "amount_minor": 25000,
                    "note": "belanja",
                    "occurred_at": "2026-08-01T10:00:00Z"
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(authed_request("GET", "/household", "ibu@example.com", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let transactions = body["transactions"].as_array().unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0]["amount_minor"], 25000);
    }
}
