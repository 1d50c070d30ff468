//! Common test utilities for E2E tests

#![allow(dead_code)]

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use visit_iraq::auth::{AdminSession, IdentityClaims, create_token};
use visit_iraq::data::Role;
use visit_iraq::service::RoleService;
use visit_iraq::{AppState, config};

pub const ADMIN_EMAIL: &str = "ops@visitiraq.test";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// Build the configuration used by every test server
pub fn test_config(db_path: std::path::PathBuf) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        database: config::DatabaseConfig { path: db_path },
        auth: config::AuthConfig {
            identity_secret: "test-identity-secret-32-bytes-long!!".to_string(),
            session_max_age: 604800,
        },
        admin: config::AdminConfig {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            session_secret: "test-admin-session-secret-32-bytes!!".to_string(),
        },
        listings: config::ListingsConfig { public_limit: 100 },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path().join("test.db"));
        adjust(&mut config);

        visit_iraq::metrics::init_metrics();

        // Initialize app state
        let state = AppState::new(config).await.unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = visit_iraq::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Mint an identity token as the identity provider would
    pub fn identity_token(&self, user_id: &str, email: &str, name: &str) -> String {
        let claims = IdentityClaims::new(
            user_id,
            Some(email.to_string()),
            Some(name.to_string()),
            self.state.config.auth.session_max_age,
        );
        create_token(&claims, &self.state.config.auth.identity_secret)
            .expect("Failed to create identity token")
    }

    /// Bearer token for a user holding `role`
    pub async fn user_with_role(&self, user_id: &str, role: Role) -> String {
        let email = format!("{user_id}@example.com");
        RoleService::new(self.state.db.clone())
            .set_role(user_id, role, Some(&email), Some(user_id))
            .await
            .unwrap();
        self.identity_token(user_id, &email, user_id)
    }

    /// Bearer token for a host
    pub async fn host(&self, user_id: &str) -> String {
        self.user_with_role(user_id, Role::Host).await
    }

    /// `Cookie` header value carrying a valid operator session
    pub fn admin_cookie(&self) -> String {
        let token = create_token(
            &AdminSession::new(ADMIN_EMAIL),
            &self.state.config.admin.session_secret,
        )
        .expect("Failed to create admin session");
        format!("admin-session={token}")
    }

    /// Submit a listing as `token`; returns the created record
    pub async fn create_listing(&self, token: &str, overrides: Value) -> Value {
        let mut body = listing_body();
        if let (Some(body), Some(overrides)) = (body.as_object_mut(), overrides.as_object()) {
            for (key, value) in overrides {
                body.insert(key.clone(), value.clone());
            }
        }

        let response = self
            .client
            .post(self.url("/api/listings"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);

        let body: Value = response.json().await.unwrap();
        body["listing"].clone()
    }

    /// Run a moderation action as the operator
    pub async fn moderate(&self, id: &str, action: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/admin/listings/{id}/{action}")))
            .header("Cookie", self.admin_cookie())
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// Submit a listing and approve it; returns the listing id
    pub async fn approved_listing(&self, token: &str, overrides: Value) -> String {
        let listing = self.create_listing(token, overrides).await;
        let id = listing["id"].as_str().unwrap().to_string();
        let response = self.moderate(&id, "approve", json!({})).await;
        assert_eq!(response.status(), 200);
        id
    }
}

/// A complete, valid listing submission
pub fn listing_body() -> Value {
    json!({
        "type": "accommodation",
        "title": "Tigris Riverside Guesthouse",
        "description": "Quiet rooms overlooking the river",
        "location": "Al-Rasheed Street",
        "city": "Baghdad",
        "region": "Baghdad Governorate",
        "full_address": "12 Al-Rasheed Street, Baghdad",
        "price_range": "budget",
        "contact_phone": "+964 770 000 0000",
        "contact_email": "stay@tigris.example",
        "external_link": "https://tigris.example",
        "images": ["a.jpg", "b.jpg"],
        "amenities": ["wifi", "breakfast"]
    })
}
