//! Integration tests for Emporium.
//!
//! The tests drive a running server over HTTP. They are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! emporium migrate && emporium seed
//! cargo run -p emporium-server &
//! cargo test -p emporium-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `EMPORIUM_BASE_URL` - Server under test (default `http://localhost:3000`)
//! - `DATABASE_URL` - The server's database, for promoting test admins and
//!   seeding rows the API cannot create without Stripe
//!   (default `postgres://localhost/emporium`)

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

/// Password used for every account the tests register.
pub const TEST_PASSWORD: &str = "integration-password-1";

const MAX_ATTEMPTS: u32 = 10;

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("EMPORIUM_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// An HTTP client with its own cookie jar, so each one is a separate session.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh, unused email address.
#[must_use]
pub fn unique_email() -> String {
    format!("integration-{}@example.com", Uuid::new_v4())
}

/// A signed-in customer session.
pub struct TestUser {
    pub client: Client,
    pub email: String,
    pub user: Value,
}

impl TestUser {
    /// Register a new account. The returned client carries its session cookie.
    ///
    /// # Panics
    ///
    /// Panics if the request fails or registration is rejected.
    pub async fn register() -> Self {
        let client = session_client();
        let email = unique_email();

        let body = json!({
            "email": email,
            "name": "Integration Test",
            "password": TEST_PASSWORD,
        });

        // Auth routes are rate limited per client IP and tests run in parallel.
        let mut attempts = 0;
        let resp = loop {
            let resp = client
                .post(url("/api/auth/register"))
                .json(&body)
                .send()
                .await
                .expect("Failed to register");
            attempts += 1;
            if resp.status() != StatusCode::TOO_MANY_REQUESTS || attempts >= MAX_ATTEMPTS {
                break resp;
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
        };
        assert_eq!(resp.status(), StatusCode::CREATED);

        let user = json_body(resp).await;
        Self {
            client,
            email,
            user,
        }
    }

    /// Register a new account and give it the admin role.
    ///
    /// The server reloads the role on every request, so the existing session
    /// is an admin session from here on.
    ///
    /// # Panics
    ///
    /// Panics if registration or the database update fails.
    pub async fn register_admin(pool: &PgPool) -> Self {
        let admin = Self::register().await;
        set_role(pool, admin.user_id(), "admin").await;
        admin
    }

    /// The user's ID as a string, for building paths.
    #[must_use]
    pub fn id(&self) -> String {
        self.user["id"].to_string()
    }

    /// The user's ID as stored in the database.
    ///
    /// # Panics
    ///
    /// Panics if the registration response had no numeric ID.
    #[must_use]
    pub fn user_id(&self) -> i32 {
        self.user["id"]
            .as_i64()
            .and_then(|id| i32::try_from(id).ok())
            .expect("User ID was not an integer")
    }
}

/// Connect to the server's database.
///
/// # Panics
///
/// Panics if the database is unreachable.
pub async fn db() -> PgPool {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/emporium".to_string());
    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

/// Set a user's role directly in the database.
///
/// # Panics
///
/// Panics if the update fails.
pub async fn set_role(pool: &PgPool, user_id: i32, role: &str) {
    sqlx::query("UPDATE users SET role = $2::user_role WHERE id = $1")
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await
        .expect("Failed to set role");
}

/// Absolute URL for `path` on the server under test.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// Status and JSON body of a response. Empty or non-JSON bodies become `null`.
///
/// # Panics
///
/// Panics if the body cannot be read.
pub async fn status_and_json(resp: Response) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = resp.bytes().await.expect("Failed to read response body");
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

/// Parse a JSON response body.
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(resp: Response) -> Value {
    resp.json().await.expect("Response body was not JSON")
}

/// The first visible product with stock, if the catalog has one.
///
/// # Panics
///
/// Panics if the product listing request fails.
pub async fn product_in_stock(client: &Client) -> Option<Value> {
    let resp = client
        .get(url("/api/products?per_page=100"))
        .send()
        .await
        .expect("Failed to list products");
    assert_eq!(resp.status(), StatusCode::OK);

    let page = json_body(resp).await;
    page["items"]
        .as_array()?
        .iter()
        .find(|p| p["stock"].as_i64().is_some_and(|stock| stock > 0))
        .cloned()
}
