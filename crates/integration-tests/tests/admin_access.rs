//! Back-office access control against a running server.
//!
//! These cover the rejections anonymous and customer sessions see. Flows with
//! an admin session live in `back_office.rs`.

use emporium_integration_tests::{TestUser, session_client, url};
use reqwest::StatusCode;
use serde_json::json;

const ADMIN_PATHS: &[&str] = &[
    "/api/admin/users",
    "/api/admin/categories",
    "/api/admin/products",
    "/api/admin/orders",
    "/api/admin/contact-messages",
    "/api/admin/main-messages",
    "/api/admin/hero-slides",
    "/api/admin/dashboard/summary",
    "/api/admin/dashboard/sales?days=7",
];

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_routes_reject_anonymous() {
    let client = session_client();

    for path in ADMIN_PATHS {
        let resp = client.get(url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_routes_reject_customers() {
    let customer = TestUser::register().await;

    for path in ADMIN_PATHS {
        let resp = customer.client.get(url(path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_customer_cannot_create_category() {
    let customer = TestUser::register().await;

    let resp = customer
        .client
        .post(url("/api/admin/categories"))
        .json(&json!({ "name": "Not Allowed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
