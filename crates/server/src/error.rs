//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Responses carry a JSON body `{"error": "<message>"}`. Server-side failures
//! get a generic message; their details only go to the logs and Sentry.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::crypto::CryptoError;
use crate::db::RepositoryError;
use crate::models::cart::CartLineError;
use crate::services::account::AccountError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::checkout::CheckoutError;
use crate::services::content::ContentError;
use crate::services::dashboard::DashboardError;
use crate::services::orders::OrderError;
use crate::stripe::StripeError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error(transparent)]
    Database(#[from] RepositoryError),

    /// Authentication or user management failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Dashboard(#[from] DashboardError),

    /// Stripe API operation failed.
    #[error(transparent)]
    Stripe(#[from] StripeError),

    /// A client-supplied token could not be opened.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("{0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("too many requests")]
    RateLimited,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Auth(err) => auth_status(err),
            Self::Catalog(err) => catalog_status(err),
            Self::Cart(err) => cart_status(err),
            Self::Account(err) => account_status(err),
            Self::Checkout(err) => checkout_status(err),
            Self::Order(err) => order_status(err),
            Self::Content(err) => match err {
                ContentError::Validation(_) => StatusCode::BAD_REQUEST,
                ContentError::NotFound(_) => StatusCode::NOT_FOUND,
                ContentError::Repository(err) => repository_status(err),
            },
            Self::Dashboard(err) => match err {
                DashboardError::Validation(_) => StatusCode::BAD_REQUEST,
                DashboardError::Repository(err) => repository_status(err),
            },
            Self::Stripe(err) => stripe_status(err),
            Self::Crypto(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self, status: StatusCode) -> String {
        match self {
            _ if status == StatusCode::BAD_GATEWAY => "Payment provider error".to_string(),
            _ if status.is_server_error() => "Internal server error".to_string(),
            Self::Crypto(_) => "invalid token".to_string(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_string()
            }
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let message = self.public_message(status);

        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn stripe_status(err: &StripeError) -> StatusCode {
    match err {
        StripeError::Card(_) => StatusCode::PAYMENT_REQUIRED,
        StripeError::NotFound(_) => StatusCode::BAD_REQUEST,
        StripeError::Http(_) | StripeError::Api { .. } | StripeError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidEmail(_)
        | AuthError::WeakPassword(_)
        | AuthError::InvalidName(_)
        | AuthError::SelfModification(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::Repository(err) => repository_status(err),
        AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::Validation(_) | CatalogError::CategoryInactive => StatusCode::BAD_REQUEST,
        CatalogError::CategoryNotFound | CatalogError::ProductNotFound => StatusCode::NOT_FOUND,
        CatalogError::CategoryNotEmpty | CatalogError::SlugTaken(_) => StatusCode::CONFLICT,
        CatalogError::Repository(err) => repository_status(err),
    }
}

fn cart_status(err: &CartError) -> StatusCode {
    match err {
        CartError::ProductUnavailable | CartError::NotInCart => StatusCode::NOT_FOUND,
        CartError::Line(CartLineError::ZeroQuantity | CartLineError::InsufficientStock { .. }) => {
            StatusCode::BAD_REQUEST
        }
        CartError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CartError::Repository(err) => repository_status(err),
    }
}

fn account_status(err: &AccountError) -> StatusCode {
    match err {
        AccountError::Validation(_) => StatusCode::BAD_REQUEST,
        AccountError::AddressNotFound
        | AccountError::PaymentMethodNotFound
        | AccountError::UserNotFound => StatusCode::NOT_FOUND,
        AccountError::AddressInUse | AccountError::AlreadySaved => StatusCode::CONFLICT,
        AccountError::Sealing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AccountError::Stripe(err) => stripe_status(err),
        AccountError::Repository(err) => repository_status(err),
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::EmptyCart | CheckoutError::InvalidAmount => StatusCode::BAD_REQUEST,
        CheckoutError::AddressNotFound | CheckoutError::PaymentMethodNotFound => {
            StatusCode::NOT_FOUND
        }
        CheckoutError::ProductsUnavailable(_)
        | CheckoutError::OutOfStock(_)
        | CheckoutError::StockConflict(_) => StatusCode::CONFLICT,
        CheckoutError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
        CheckoutError::Cart(err) => cart_status(err),
        CheckoutError::Account(err) => account_status(err),
        CheckoutError::Sealing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        CheckoutError::Stripe(err) => stripe_status(err),
        CheckoutError::Repository(err) => repository_status(err),
    }
}

fn order_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::NotFound => StatusCode::NOT_FOUND,
        OrderError::Forbidden => StatusCode::FORBIDDEN,
        OrderError::InvalidTransition { .. } | OrderError::NotCancellable(_) => {
            StatusCode::BAD_REQUEST
        }
        OrderError::Conflict(_) => StatusCode::CONFLICT,
        OrderError::Stripe(err) => stripe_status(err),
        OrderError::Invoice(_) => StatusCode::INTERNAL_SERVER_ERROR,
        OrderError::Repository(err) => repository_status(err),
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use emporium_core::OrderStatus;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product not found".to_string());
        assert_eq!(err.to_string(), "product not found");

        let err = AppError::from(CatalogError::CategoryNotEmpty);
        assert_eq!(err.to_string(), "category still has products");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_domain_error_status_codes() {
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::SelfModification("no").into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CatalogError::CategoryInactive.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::Line(CartLineError::InsufficientStock { available: 1 }).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::ProductUnavailable.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AccountError::AddressInUse.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(CheckoutError::PaymentDeclined("declined".to_string()).into()),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(CheckoutError::StockConflict("sold out".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(
                OrderError::InvalidTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Paid,
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OrderError::Forbidden.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(CryptoError::Malformed.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_nested_errors_use_inner_status() {
        let err = CheckoutError::Cart(CartError::NotInCart);
        assert_eq!(get_status(err.into()), StatusCode::NOT_FOUND);

        let err = AccountError::Stripe(StripeError::Api {
            status: 500,
            message: "boom".to_string(),
        });
        assert_eq!(get_status(err.into()), StatusCode::BAD_GATEWAY);

        let err = OrderError::Repository(RepositoryError::Conflict("changed".to_string()));
        assert_eq!(get_status(err.into()), StatusCode::CONFLICT);
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection string leaked".to_string());
        let status = err.status();
        assert_eq!(err.public_message(status), "Internal server error");

        let err = AppError::Stripe(StripeError::Parse("bad json".to_string()));
        let status = err.status();
        assert_eq!(err.public_message(status), "Payment provider error");

        let err = AppError::Crypto(CryptoError::Authentication);
        let status = err.status();
        assert_eq!(err.public_message(status), "invalid token");
    }
}
