//! Account service: sealed shipping addresses and saved cards.

use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use emporium_core::{AddressId, PaymentInfoId, UserId};

use super::{MAX_NAME_LENGTH, optional_text};
use crate::crypto::{CryptoError, Sealer};
use crate::db::payment_methods::NewPaymentMethod;
use crate::db::{AddressRepository, PaymentMethodRepository, RepositoryError, UserRepository};
use crate::models::account::AddressRecord;
use crate::models::{Address, AddressDetails, PaymentMethod};
use crate::stripe::{StripeClient, StripeError};

const DEFAULT_ADDRESS_LABEL: &str = "Address";

/// Errors from account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("address not found")]
    AddressNotFound,

    #[error("payment method not found")]
    PaymentMethodNotFound,

    /// Orders were shipped to the address.
    #[error("address is used by existing orders")]
    AddressInUse,

    #[error("payment method already saved")]
    AlreadySaved,

    #[error("user not found")]
    UserNotFound,

    /// A stored address could not be sealed or opened.
    #[error("sealing error: {0}")]
    Sealing(#[from] CryptoError),

    #[error("payment provider error: {0}")]
    Stripe(#[from] StripeError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Address as submitted by the shopper.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressInput {
    pub label: Option<String>,
    #[serde(flatten)]
    pub details: AddressDetails,
}

impl AddressInput {
    fn validate(&self) -> Result<(String, AddressDetails), AccountError> {
        let label = optional_text("label", self.label.as_deref(), MAX_NAME_LENGTH)
            .map_err(AccountError::Validation)?
            .unwrap_or_else(|| DEFAULT_ADDRESS_LABEL.to_string());
        self.details.validate().map_err(AccountError::Validation)?;

        let mut details = self.details.clone();
        details.country = details.country.trim().to_ascii_uppercase();

        Ok((label, details))
    }
}

/// Open a stored address.
///
/// # Errors
///
/// Returns `CryptoError` if the sealed payload cannot be opened.
pub fn open_address(sealer: &Sealer, record: AddressRecord) -> Result<Address, CryptoError> {
    let details = sealer.open::<AddressDetails>(&record.sealed)?;
    Ok(Address {
        id: record.id,
        label: record.label,
        is_default: record.is_default,
        details,
        created_at: record.created_at,
    })
}

/// Account service.
pub struct AccountService<'a> {
    addresses: AddressRepository<'a>,
    payment_methods: PaymentMethodRepository<'a>,
    users: UserRepository<'a>,
    sealer: &'a Sealer,
    stripe: &'a StripeClient,
}

impl<'a> AccountService<'a> {
    /// Create a new account service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, sealer: &'a Sealer, stripe: &'a StripeClient) -> Self {
        Self {
            addresses: AddressRepository::new(pool),
            payment_methods: PaymentMethodRepository::new(pool),
            users: UserRepository::new(pool),
            sealer,
            stripe,
        }
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    /// A user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Sealing` if a stored address cannot be opened.
    pub async fn addresses(&self, user_id: UserId) -> Result<Vec<Address>, AccountError> {
        self.addresses
            .list_for_user(user_id)
            .await?
            .into_iter()
            .map(|record| open_address(self.sealer, record).map_err(AccountError::from))
            .collect()
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Validation` for missing or malformed fields.
    pub async fn create_address(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, AccountError> {
        let (label, details) = input.validate()?;
        let sealed = self.sealer.seal(&details)?;

        let record = self.addresses.create(user_id, &label, &sealed).await?;
        tracing::info!(user_id = %user_id, address_id = %record.id, "Address saved");

        Ok(open_address(self.sealer, record)?)
    }

    /// Replace an address.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::AddressNotFound` if the user has no such address.
    pub async fn update_address(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, AccountError> {
        let (label, details) = input.validate()?;
        let sealed = self.sealer.seal(&details)?;

        let record = self
            .addresses
            .update(id, user_id, &label, &sealed)
            .await
            .map_err(address_not_found)?;

        Ok(open_address(self.sealer, record)?)
    }

    /// Make an address the default.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::AddressNotFound` if the user has no such address.
    pub async fn set_default_address(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Address, AccountError> {
        let record = self
            .addresses
            .set_default(id, user_id)
            .await
            .map_err(address_not_found)?;

        Ok(open_address(self.sealer, record)?)
    }

    /// Delete an address no order refers to.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::AddressInUse` if orders were shipped to it.
    pub async fn delete_address(&self, user_id: UserId, id: AddressId) -> Result<(), AccountError> {
        let record = self
            .addresses
            .get_for_user(id, user_id)
            .await?
            .ok_or(AccountError::AddressNotFound)?;

        if self.addresses.is_referenced(record.id).await? {
            return Err(AccountError::AddressInUse);
        }

        let deleted = self.addresses.delete(id, user_id).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AccountError::AddressInUse,
            other => AccountError::Repository(other),
        })?;
        if !deleted {
            return Err(AccountError::AddressNotFound);
        }

        tracing::info!(user_id = %user_id, address_id = %id, "Address deleted");

        Ok(())
    }

    // =========================================================================
    // Payment methods
    // =========================================================================

    /// A user's saved cards, default first.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Repository` if the query fails.
    pub async fn payment_methods(&self, user_id: UserId) -> Result<Vec<PaymentMethod>, AccountError> {
        Ok(self.payment_methods.list_for_user(user_id).await?)
    }

    /// Attach a Stripe payment method to the user's Stripe customer and save
    /// its display fields.
    ///
    /// The Stripe customer is created on the first saved card.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Stripe` if Stripe rejects the card and
    /// `AccountError::AlreadySaved` if it is saved already.
    pub async fn add_payment_method(
        &self,
        user_id: UserId,
        stripe_payment_method_id: &str,
    ) -> Result<PaymentMethod, AccountError> {
        let stripe_payment_method_id = stripe_payment_method_id.trim();
        if !stripe_payment_method_id.starts_with("pm_") {
            return Err(AccountError::Validation(
                "payment_method_id must be a Stripe payment method id".to_string(),
            ));
        }

        let customer_id = self.stripe_customer(user_id).await?;
        let attached = self
            .stripe
            .attach_payment_method(stripe_payment_method_id, &customer_id)
            .await?;
        let card = attached.card.ok_or_else(|| {
            AccountError::Validation("only card payment methods are supported".to_string())
        })?;

        let saved = self
            .payment_methods
            .create(
                user_id,
                &NewPaymentMethod {
                    stripe_payment_method_id: &attached.id,
                    brand: &card.brand,
                    last4: &card.last4,
                    exp_month: card.exp_month,
                    exp_year: card.exp_year,
                },
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AccountError::AlreadySaved,
                other => AccountError::Repository(other),
            })?;

        tracing::info!(user_id = %user_id, payment_info_id = %saved.id, "Payment method saved");

        Ok(saved)
    }

    /// Make a card the default.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::PaymentMethodNotFound` if the user has no such card.
    pub async fn set_default_payment_method(
        &self,
        user_id: UserId,
        id: PaymentInfoId,
    ) -> Result<PaymentMethod, AccountError> {
        self.payment_methods
            .set_default(id, user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AccountError::PaymentMethodNotFound,
                other => AccountError::Repository(other),
            })
    }

    /// Detach a card in Stripe, then forget it.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::PaymentMethodNotFound` if the user has no such card.
    pub async fn delete_payment_method(
        &self,
        user_id: UserId,
        id: PaymentInfoId,
    ) -> Result<(), AccountError> {
        let method = self
            .payment_methods
            .get_for_user(id, user_id)
            .await?
            .ok_or(AccountError::PaymentMethodNotFound)?;

        match self
            .stripe
            .detach_payment_method(&method.stripe_payment_method_id)
            .await
        {
            Ok(_) => {}
            Err(StripeError::NotFound(message)) => {
                tracing::warn!(payment_info_id = %id, %message, "Card already gone in Stripe");
            }
            Err(e) => return Err(e.into()),
        }

        if !self.payment_methods.delete(id, user_id).await? {
            return Err(AccountError::PaymentMethodNotFound);
        }

        tracing::info!(user_id = %user_id, payment_info_id = %id, "Payment method deleted");

        Ok(())
    }

    /// The user's Stripe customer id, creating the customer if needed.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Stripe` if the customer cannot be created.
    pub async fn stripe_customer(&self, user_id: UserId) -> Result<String, AccountError> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;

        if let Some(customer_id) = user.stripe_customer_id {
            return Ok(customer_id);
        }

        let customer = self
            .stripe
            .create_customer(user.email.as_str(), &user.name, user.id.as_i32())
            .await?;
        self.users
            .set_stripe_customer_id(user.id, &customer.id)
            .await?;

        tracing::info!(user_id = %user.id, "Stripe customer created");

        Ok(customer.id)
    }
}

fn address_not_found(err: RepositoryError) -> AccountError {
    match err {
        RepositoryError::NotFound => AccountError::AddressNotFound,
        other => AccountError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use secrecy::SecretBox;

    use super::*;

    fn details() -> AddressDetails {
        AddressDetails {
            full_name: "Grace Hopper".to_string(),
            line1: "1 Navy Way".to_string(),
            line2: None,
            city: "Arlington".to_string(),
            state: Some("VA".to_string()),
            postal_code: "22201".to_string(),
            country: " us ".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_input_defaults_label_and_uppercases_country() {
        let input = AddressInput {
            label: Some("  ".to_string()),
            details: details(),
        };
        let (label, details) = input.validate().unwrap();
        assert_eq!(label, DEFAULT_ADDRESS_LABEL);
        assert_eq!(details.country, "US");
    }

    #[test]
    fn test_input_rejects_missing_city() {
        let mut details = details();
        details.city = String::new();
        let input = AddressInput {
            label: None,
            details,
        };
        assert!(matches!(input.validate(), Err(AccountError::Validation(_))));
    }

    #[test]
    fn test_input_flattens_details() {
        let json = r#"{"label":"Work","full_name":"Ada","line1":"1 Main","city":"X","postal_code":"1","country":"GB"}"#;
        let input: AddressInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.label.as_deref(), Some("Work"));
        assert_eq!(input.details.full_name, "Ada");
    }

    #[test]
    fn test_open_address() {
        let sealer = Sealer::new(&SecretBox::new(Box::new([9_u8; 32])));
        let record = AddressRecord {
            id: AddressId::new(4),
            user_id: UserId::new(1),
            label: "Home".to_string(),
            sealed: sealer.seal(&details()).unwrap(),
            is_default: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let address = open_address(&sealer, record).unwrap();
        assert_eq!(address.details, details());
        assert!(address.is_default);
    }
}
