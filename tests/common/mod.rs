//! Common test utilities for E2E tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use socialgraph::{
    AppState, config,
    auth::session::{Session, create_session_token},
    data::{FollowStatus, ProfileCategory, User},
};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: config::DatabaseConfig { path: db_path },
            auth: config::AuthConfig {
                session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
                session_max_age: 604800,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = socialgraph::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

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

    /// Create a user directly in the database
    pub async fn create_user(&self, id: &str, category: ProfileCategory) -> User {
        let now = Utc::now();
        let user = User {
            id: id.to_string(),
            firstname: format!("First {id}"),
            lastname: format!("Last {id}"),
            email: format!("{id}@test.example.com"),
            avatar: None,
            status: "active".to_string(),
            profile_category: category,
            role: "user".to_string(),
            created_at: now,
            updated_at: now,
        };
        self.state.db.insert_user(&user).await.unwrap();
        user
    }

    /// Store a follow edge directly
    pub async fn create_follow(&self, follower_id: &str, following_id: &str, status: FollowStatus) {
        self.state
            .db
            .insert_follow(follower_id, following_id, status)
            .await
            .unwrap();
    }

    /// Create a session token for `user_id`
    pub fn token_for(&self, user_id: &str, role: &str) -> String {
        let session = Session {
            user_id: user_id.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::days(7),
        };

        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }

    /// POST with a bearer token for `user_id`
    pub async fn post_as(&self, user_id: &str, path: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", self.token_for(user_id, "user")))
            .send()
            .await
            .unwrap()
    }

    /// GET with a bearer token for `user_id`
    pub async fn get_as(&self, user_id: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", self.token_for(user_id, "user")))
            .send()
            .await
            .unwrap()
    }

    /// DELETE with a bearer token for `user_id`
    pub async fn delete_as(&self, user_id: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {}", self.token_for(user_id, "user")))
            .send()
            .await
            .unwrap()
    }
}
