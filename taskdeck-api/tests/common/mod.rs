//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory store seeded with two tenants:
//!
//! - tenant A (`acme`): `admin` (ADMIN) and `member` (MEMBER)
//! - tenant B (`globex`): `other_admin` (ADMIN)
//!
//! Seeded users cannot log in; their access tokens are minted directly.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use taskdeck_api::app::{build_router, AppState};
use taskdeck_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use taskdeck_shared::auth::jwt::{create_token, Claims, TokenType};
use taskdeck_shared::models::tenant::Tenant;
use taskdeck_shared::models::user::{User, UserRole};
use taskdeck_shared::store::memory::MemoryStore;
use taskdeck_shared::store::Store;
use tower::Service as _;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
    pub config: Config,
    pub tenant_a: Tenant,
    pub admin: User,
    pub member: User,
    pub tenant_b: Tenant,
    pub other_admin: User,
}

/// Response status and parsed JSON body (`Value::Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub headers: axum::http::HeaderMap,
}

impl TestContext {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());

        let acme = store
            .seed_tenant("Acme", "acme", "admin@acme.test")
            .await
            .unwrap();
        let member = store
            .seed_user(&acme.scope(), "Mia Member", "member@acme.test", UserRole::Member)
            .await
            .unwrap();
        let globex = store
            .seed_tenant("Globex", "globex", "admin@globex.test")
            .await
            .unwrap();

        let config = test_config();
        let shared: Arc<dyn Store> = store.clone();
        let app = build_router(AppState::new(shared, config.clone()));

        TestContext {
            store,
            app,
            config,
            tenant_a: acme.tenant,
            admin: acme.user,
            member,
            tenant_b: globex.tenant,
            other_admin: globex.user,
        }
    }

    /// Access token for a user, as issued at login
    pub fn token_for(&self, user: &User) -> String {
        let claims = Claims::new(user.id, user.tenant_id, TokenType::Access);
        create_token(&claims, JWT_SECRET).unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            body,
            headers,
        }
    }

    pub async fn get(&self, uri: &str, user: &User) -> TestResponse {
        let token = self.token_for(user);
        self.request(Method::GET, uri, Some(&token), None).await
    }

    pub async fn post(&self, uri: &str, user: &User, body: Value) -> TestResponse {
        let token = self.token_for(user);
        self.request(Method::POST, uri, Some(&token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &User, body: Value) -> TestResponse {
        let token = self.token_for(user);
        self.request(Method::PUT, uri, Some(&token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &User) -> TestResponse {
        let token = self.token_for(user);
        self.request(Method::DELETE, uri, Some(&token), None).await
    }

    /// Creates a project as `user` and returns its ID
    pub async fn create_project(&self, user: &User, name: &str) -> String {
        let res = self
            .post("/api/projects", user, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_str().unwrap().to_string()
    }

    /// Creates a task as `user` and returns its JSON representation
    pub async fn create_task(&self, user: &User, body: Value) -> Value {
        let res = self.post("/api/tasks", user, body).await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 1,
            run_migrations: false,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
    }
}
