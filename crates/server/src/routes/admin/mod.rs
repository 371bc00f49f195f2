//! Back-office route handlers. Every handler requires `RequireAdmin`.
//!
//! ```text
//! GET    /api/admin/users                         - Search users
//! PATCH  /api/admin/users/{id}                    - Role / active flag
//! DELETE /api/admin/users/{id}                    - Delete or deactivate
//!
//! GET/POST          /api/admin/categories
//! GET/PUT/DELETE    /api/admin/categories/{id}
//! POST              /api/admin/categories/{id}/status
//! GET/POST          /api/admin/products
//! GET/PUT/DELETE    /api/admin/products/{id}
//! POST              /api/admin/products/{id}/status
//! POST              /api/admin/products/{id}/stock
//!
//! GET  /api/admin/orders                          - Filter by status
//! GET  /api/admin/orders/{id}
//! POST /api/admin/orders/{id}/status
//! GET  /api/admin/invoices/{order_id}             - Inline PDF
//!
//! GET    /api/admin/contact-messages
//! POST   /api/admin/contact-messages/{id}/read
//! DELETE /api/admin/contact-messages/{id}
//! GET/POST   /api/admin/main-messages
//! PUT/DELETE /api/admin/main-messages/{id}
//! POST       /api/admin/main-messages/{id}/activate|deactivate
//! GET/POST   /api/admin/hero-slides
//! POST       /api/admin/hero-slides/reorder
//! PUT/DELETE /api/admin/hero-slides/{id}
//!
//! GET /api/admin/dashboard/summary
//! GET /api/admin/dashboard/sales?days=30
//! GET /api/admin/dashboard/top-products?limit=5
//! GET /api/admin/dashboard/orders-by-status
//! GET /api/admin/dashboard/sales-by-category
//! GET /api/admin/dashboard/recent-orders?limit=10
//! ```

pub mod catalog;
pub mod content;
pub mod dashboard;
pub mod orders;
pub mod users;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::state::AppState;

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index))
        .route("/{id}", patch(users::update).delete(users::destroy))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::categories).post(catalog::create_category))
        .route(
            "/{id}",
            get(catalog::category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route("/{id}/status", post(catalog::category_status))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::products).post(catalog::create_product))
        .route(
            "/{id}",
            get(catalog::product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/{id}/status", post(catalog::product_status))
        .route("/{id}/stock", post(catalog::adjust_stock))
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/status", post(orders::set_status))
}

fn content_routes() -> Router<AppState> {
    Router::new()
        .route("/contact-messages", get(content::contact_messages))
        .route("/contact-messages/{id}/read", post(content::mark_read))
        .route(
            "/contact-messages/{id}",
            axum::routing::delete(content::delete_contact_message),
        )
        .route(
            "/main-messages",
            get(content::banners).post(content::create_banner),
        )
        .route(
            "/main-messages/{id}",
            put(content::update_banner).delete(content::delete_banner),
        )
        .route("/main-messages/{id}/activate", post(content::activate_banner))
        .route(
            "/main-messages/{id}/deactivate",
            post(content::deactivate_banner),
        )
        .route(
            "/hero-slides",
            get(content::slides).post(content::create_slide),
        )
        .route("/hero-slides/reorder", post(content::reorder_slides))
        .route(
            "/hero-slides/{id}",
            put(content::update_slide).delete(content::delete_slide),
        )
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(dashboard::summary))
        .route("/sales", get(dashboard::sales))
        .route("/top-products", get(dashboard::top_products))
        .route("/orders-by-status", get(dashboard::orders_by_status))
        .route("/sales-by-category", get(dashboard::sales_by_category))
        .route("/recent-orders", get(dashboard::recent_orders))
}

/// All back-office routes, relative to `/api/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/categories", category_routes())
        .nest("/products", product_routes())
        .nest("/orders", order_routes())
        .route("/invoices/{id}", get(orders::invoice))
        .merge(content_routes())
        .nest("/dashboard", dashboard_routes())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::super::test_support::{get, send};

    #[tokio::test]
    async fn test_admin_routes_reject_anonymous() {
        for uri in [
            "/api/admin/users",
            "/api/admin/products",
            "/api/admin/orders",
            "/api/admin/invoices/1",
            "/api/admin/contact-messages",
            "/api/admin/dashboard/summary",
        ] {
            let response = send(get(uri)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
