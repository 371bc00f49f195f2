//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database)
//!
//! # Auth (strict rate limit)
//! POST /api/auth/register                   - Create account and sign in
//! POST /api/auth/login                      - Sign in
//! POST /api/auth/logout                     - Sign out
//! GET  /api/auth/me                         - Current user
//!
//! # Users
//! GET  /api/users/{id}                      - Profile (self or admin)
//! POST /api/users/{id}                      - Update profile
//! POST /api/users/{id}/password             - Change password (self)
//!
//! # Catalog
//! GET  /api/categories                      - Active categories
//! GET  /api/categories/{slug}               - Category with products
//! GET  /api/products                        - Product listing
//! GET  /api/products/{slug}                 - Product detail
//!
//! # Cart
//! GET    /api/cart                          - Priced cart
//! DELETE /api/cart                          - Empty the cart
//! POST   /api/cart/items                    - Add product
//! PATCH  /api/cart/items/{product_id}       - Set quantity
//! DELETE /api/cart/items/{product_id}       - Remove product
//!
//! # Account (requires auth)
//! GET/POST   /api/account/addresses
//! PUT/DELETE /api/account/addresses/{id}
//! POST       /api/account/addresses/{id}/default
//! GET/POST   /api/account/payment-methods
//! DELETE     /api/account/payment-methods/{id}
//! POST       /api/account/payment-methods/{id}/default
//!
//! # Checkout and orders (requires auth)
//! POST /api/checkout/review
//! POST /api/checkout/confirm
//! GET  /api/orders
//! GET  /api/orders/{id}
//! POST /api/orders/{id}/cancel
//! GET  /api/invoices/{order_id}/download
//!
//! # Sealing (requires auth)
//! POST /api/secure/address/encrypt|decrypt
//! POST /api/secure/payment/encrypt|decrypt
//!
//! # Content
//! POST /api/contact
//! GET  /api/main-message
//! GET  /api/hero-slides
//!
//! # Back office (requires admin)
//! /api/admin/...                            - See `admin`
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod content;
pub mod health;
pub mod orders;
pub mod secure;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Health check routes.
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new().nest(
        "/api/auth",
        Router::new()
            .route("/register", post(auth::register))
            .route("/login", post(auth::login))
            .route("/logout", post(auth::logout))
            .route("/me", get(auth::me)),
    )
}

/// Create the user profile routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(users::show).post(users::update))
        .route("/{id}/password", post(users::change_password))
}

/// Create the public catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/categories/{slug}", get(catalog::category))
        .route("/products", get(catalog::products))
        .route("/products/{slug}", get(catalog::product))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            axum::routing::patch(cart::update).delete(cart::remove),
        )
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    use axum::routing::put;

    Router::new()
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            put(account::update_address).delete(account::delete_address),
        )
        .route("/addresses/{id}/default", post(account::default_address))
        .route(
            "/payment-methods",
            get(account::payment_methods).post(account::add_payment_method),
        )
        .route(
            "/payment-methods/{id}",
            axum::routing::delete(account::delete_payment_method),
        )
        .route(
            "/payment-methods/{id}/default",
            post(account::default_payment_method),
        )
}

/// Create the checkout, order and invoice routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/review", post(checkout::review))
        .route("/checkout/confirm", post(checkout::confirm))
        .route("/orders", get(orders::index))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/cancel", post(orders::cancel))
        .route("/invoices/{id}/download", get(orders::download_invoice))
}

/// Create the sealing routes router.
pub fn secure_routes() -> Router<AppState> {
    Router::new()
        .route("/address/encrypt", post(secure::encrypt_address))
        .route("/address/decrypt", post(secure::decrypt_address))
        .route("/payment/encrypt", post(secure::encrypt_payment))
        .route("/payment/decrypt", post(secure::decrypt_payment))
}

/// Create the public content routes router.
pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/contact", post(content::submit_contact))
        .route("/main-message", get(content::main_message))
        .route("/hero-slides", get(content::hero_slides))
}

/// Every `/api` route except authentication.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest(
        "/api",
        Router::new()
            .nest("/users", user_routes())
            .merge(catalog_routes())
            .nest("/cart", cart_routes())
            .nest("/account", account_routes())
            .merge(order_routes())
            .nest("/secure", secure_routes())
            .merge(content_routes())
            .nest("/admin", admin::routes()),
    )
}

/// Create all routes, without rate limiting.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(api_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    //! Router test helpers: a lazily connected pool and an in-memory session store.

    use std::net::{IpAddr, Ipv4Addr};

    use axum::body::Body;
    use axum::http::{Request, Response, header};
    use secrecy::{SecretBox, SecretString};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, SessionManagerLayer};

    use crate::config::{CommerceConfig, ServerConfig, StoreConfig, StripeConfig};
    use crate::state::AppState;

    pub fn state() -> AppState {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/emporium_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k3J9xQ2mZ7vB4nR8tW1yL6pA5sD0fG3h"),
            encryption_key: SecretBox::new(Box::new([7_u8; 32])),
            stripe: StripeConfig {
                secret_key: SecretString::from("sk_test_unused"),
                api_base: "http://127.0.0.1:9".to_string(),
            },
            commerce: CommerceConfig::default(),
            store: StoreConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/emporium_test")
            .unwrap();
        AppState::new(config, pool).unwrap()
    }

    pub async fn send(request: Request<Body>) -> Response<Body> {
        super::routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(state())
            .oneshot(request)
            .await
            .unwrap()
    }

    pub fn json(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
