//! Storefront flows against a running server.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database (`emporium migrate && emporium seed`)
//! - The server running (`cargo run -p emporium-server`)

use emporium_core::UserRole;
use emporium_integration_tests::{
    TEST_PASSWORD, TestUser, json_body, product_in_stock, session_client, url,
};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Health & Content
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_health_ready() {
    let client = session_client();

    let resp = client.get(url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_public_content() {
    let client = session_client();

    let resp = client.get(url("/api/hero-slides")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(json_body(resp).await.is_array());

    let resp = client.get(url("/api/main-message")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_contact_rejects_invalid_email() {
    let client = session_client();

    let resp = client
        .post(url("/api/contact"))
        .json(&json!({
            "name": "Someone",
            "email": "not-an-email",
            "message": "Hello",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_login_logout() {
    let user = TestUser::register().await;
    assert_eq!(user.user["role"], UserRole::Customer.to_string());
    assert!(user.user.get("password_hash").is_none());

    let resp = user.client.get(url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["email"], user.email.as_str());

    let resp = user
        .client
        .post(url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = user.client.get(url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Email lookup is case-insensitive.
    let resp = user
        .client
        .post(url("/api/auth/login"))
        .json(&json!({
            "email": user.email.to_uppercase(),
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_login_wrong_password() {
    let user = TestUser::register().await;
    let client = session_client();

    let resp = client
        .post(url("/api/auth/login"))
        .json(&json!({ "email": user.email, "password": "wrong-password-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_register_duplicate_email() {
    let user = TestUser::register().await;

    let resp = session_client()
        .post(url("/api/auth/register"))
        .json(&json!({
            "email": user.email,
            "name": "Duplicate",
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_profile_of_other_user_is_forbidden() {
    let alice = TestUser::register().await;
    let bob = TestUser::register().await;

    let resp = alice
        .client
        .get(url(&format!("/api/users/{}", bob.id())))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and seeded catalog"]
async fn test_anonymous_cart_lifecycle() {
    let client = session_client();
    let Some(product) = product_in_stock(&client).await else {
        return; // Nothing to buy in this catalog
    };
    let product_id = &product["id"];

    let resp = client
        .post(url("/api/cart/items"))
        .json(&json!({ "product_id": product_id, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cart = json_body(resp).await;
    assert_eq!(cart["item_count"], 1);

    // Adding the same product again merges into one line.
    let resp = client
        .post(url("/api/cart/items"))
        .json(&json!({ "product_id": product_id }))
        .send()
        .await
        .unwrap();
    let cart = json_body(resp).await;
    assert_eq!(cart["lines"].as_array().map(Vec::len), Some(1));
    assert_eq!(cart["item_count"], 2);

    let resp = client
        .delete(url(&format!("/api/cart/items/{product_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["item_count"], 0);
}

#[tokio::test]
#[ignore = "Requires running server and seeded catalog"]
async fn test_cart_rejects_quantity_beyond_stock() {
    let client = session_client();
    let Some(product) = product_in_stock(&client).await else {
        return;
    };
    let beyond = product["stock"].as_i64().unwrap_or(0) + 1;
    if beyond > 99 {
        return; // Per-line cap applies first
    }

    let resp = client
        .post(url("/api/cart/items"))
        .json(&json!({ "product_id": product["id"], "quantity": beyond }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_orders_require_auth() {
    let client = session_client();

    let resp = client.get(url("/api/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(url("/api/checkout/review"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_new_user_has_no_orders() {
    let user = TestUser::register().await;

    let resp = user.client.get(url("/api/orders")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["total"], 0);
}
