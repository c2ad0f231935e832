#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use foodcart_api::{
    auth::{hash_password, AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{user, Role},
    services::{meals::MealView, meals::NewMeal, AppServices},
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "Xq7vN2pL9wR4tY6uK8mB3cF5hJ1gD0sZaQeWrTyUiOpLkJhGfDsAzXcVbNm24680";
pub const TEST_PASSWORD: &str = "password123";

/// Argon2 is slow in debug builds; hash the shared password once per test binary.
fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(TEST_PASSWORD).expect("hash test password"))
}

/// A user inserted by the harness together with a valid bearer token.
#[derive(Debug, Clone)]
pub struct SeededUser {
    pub id: i32,
    pub username: String,
    pub token: String,
}

/// Helper harness for spinning up an application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub admin: SeededUser,
    pub alice: SeededUser,
    pub bob: SeededUser,
    pub carol: SeededUser,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        // Every connection to sqlite::memory: is its own database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let auth = Arc::new(AuthService::new(AuthConfig::from(&cfg), db.clone()));
        let services = AppServices::new(db.clone(), auth);
        let state = AppState::new(db, Arc::new(cfg), services);

        let admin = seed_user(&state, "admin", Role::Admin).await;
        let alice = seed_user(&state, "alice", Role::Customer).await;
        let bob = seed_user(&state, "bob", Role::Customer).await;
        let carol = seed_user(&state, "carol", Role::Customer).await;

        let router = foodcart_api::app_router(state.clone()).expect("failed to build router");

        Self {
            router,
            state,
            admin,
            alice,
            bob,
            carol,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    /// Insert a meal straight through the service layer.
    pub async fn create_meal(&self, title: &str, price: Decimal) -> MealView {
        self.state
            .services
            .meals
            .create_meal(NewMeal {
                title: title.to_string(),
                price,
                imageurl: format!(
                    "https://cdn.example.com/{}.jpg",
                    title.to_lowercase().replace(' ', "-")
                ),
            })
            .await
            .expect("seed meal for tests")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests made by a seeded user.
    pub async fn request_as(
        &self,
        user: &SeededUser,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(&user.token)).await
    }

    /// Send a bodyless request with a raw `Authorization` header value.
    pub async fn request_authorization(
        &self,
        method: Method,
        uri: &str,
        authorization: &str,
    ) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", authorization)
            .body(Body::empty())
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

async fn seed_user(state: &AppState, username: &str, role: Role) -> SeededUser {
    let now = Utc::now();
    let model = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(Some(format!("{}@example.com", username))),
        password_hash: Set(password_hash().to_string()),
        role: Set(role),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&*state.db)
    .await
    .expect("seed user for tests");

    let token = state
        .services
        .auth
        .issue_token(&model)
        .expect("issue token for seeded user");

    SeededUser {
        id: model.id,
        username: model.username,
        token: token.access_token,
    }
}

/// Collect a response body as JSON; empty bodies become `Value::Null`.
pub async fn read_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is not JSON")
}
