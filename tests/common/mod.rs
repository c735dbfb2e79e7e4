//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use vista::api::{self, AppState, RateLimiter};
use vista::auth::TokenService;
use vista::config::*;
use vista::cursor::CursorSigner;
use vista::media::{ImageHost, MediaError};
use vista::models::{NewUser, User};
use vista::storage::{SqliteStorage, Storage};
use vista::views::{ManualClock, ViewService};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Records uploads instead of talking to a real image host
#[derive(Default)]
pub struct FakeImageHost {
    pub uploads: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl ImageHost for FakeImageHost {
    async fn upload(&self, image: Vec<u8>, public_id: &str) -> Result<String, MediaError> {
        self.uploads
            .lock()
            .unwrap()
            .push((public_id.to_string(), image.len()));
        Ok(format!("https://images.test/{public_id}.png"))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub images: Arc<FakeImageHost>,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Insert a user directly, skipping password hashing, and return a
    /// bearer token for it.
    pub async fn seed_user(&self, handle: &str) -> (User, String) {
        let user = self
            .state
            .storage
            .create_user(&NewUser {
                handle: handle.to_string(),
                name: format!("{handle} name"),
                email: format!("{handle}@example.com"),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .unwrap();
        let token = self.state.tokens.issue(user.id).unwrap();
        (user, token)
    }
}

pub fn test_config() -> Config {
    Config {
        database: DatabaseConfig {
            backend: DatabaseBackend::Sqlite,
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        },
        api_server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 4000,
        },
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            token_ttl_days: 1,
        },
        cors: CorsConfig::default(),
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        client_ip: ClientIpConfig::default(),
        media: MediaConfig {
            cloudinary: None,
            max_upload_bytes: 1024,
        },
        pagination: PaginationConfig {
            cursor_hmac_secret: Some("cursor-test-secret".to_string()),
        },
    }
}

pub async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let storage = create_test_storage().await;
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    let images = Arc::new(FakeImageHost::default());
    let config = Arc::new(config);

    let state = Arc::new(AppState {
        views: ViewService::new(Arc::clone(&storage), clock.clone()),
        tokens: TokenService::new(&config.auth),
        cursors: CursorSigner::new(config.pagination.cursor_hmac_secret.as_deref()),
        rate_limiter: RateLimiter::new(&config.rate_limit),
        media: images.clone(),
        storage,
        config,
    });

    TestApp {
        router: api::create_api_router(Arc::clone(&state)),
        state,
        clock,
        images,
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// View request as sent by a browser at `ip`
pub fn view_request(handle: &str, ip: &str, user_agent: &str) -> Request<Body> {
    let addr: SocketAddr = format!("{ip}:40000").parse().unwrap();
    Request::builder()
        .method("POST")
        .uri(format!("/{handle}/view"))
        .header(header::USER_AGENT, user_agent)
        .extension(ConnectInfo(addr))
        .body(Body::empty())
        .unwrap()
}
