//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! # Register through the storefront first, then:
//! emporium admin promote -e admin@example.com
//! ```

use emporium_server::services::auth::AuthService;

use super::{CommandError, connect};

/// Grant the admin role to the account registered under `email`.
///
/// Existing sessions pick up the role on their next request.
///
/// # Errors
///
/// Returns an error if the email is invalid, no account uses it, or the
/// database is unreachable.
pub async fn promote(email: &str) -> Result<(), CommandError> {
    let pool = connect().await?;

    let user = AuthService::new(&pool).promote_to_admin(email).await?;

    tracing::info!(
        user_id = %user.id,
        email = %user.email,
        "User promoted to admin"
    );
    Ok(())
}
