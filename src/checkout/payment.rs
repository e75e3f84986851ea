//! Payment Gateway
//!
//! Contract for the hosted payment sheet. The gateway is handed the exact amount in
//! minor units that will later be recorded on the order.

use std::fmt::{Display, Formatter, Result as FmtResult};

use async_trait::async_trait;
use mockall::automock;
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    delivery::DeliveryAddress,
    money::{MoneyError, to_minor_units},
    session::UserUuid,
};

/// Gateway confirmation handle for a captured payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentHandle(String);

impl PaymentHandle {
    /// Wrap a gateway payment id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The gateway payment id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PaymentHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// What the payment sheet is opened for.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    /// Paying user
    pub user: UserUuid,

    /// Amount to capture
    pub amount: Money<'static, Currency>,

    /// Where the order will be delivered
    pub delivery: DeliveryAddress,
}

impl PaymentRequest {
    /// Build a request for a decimal total.
    ///
    /// # Errors
    ///
    /// Returns a [`MoneyError`] when the total cannot be expressed in minor units.
    pub fn new(
        user: UserUuid,
        total: Decimal,
        currency: &'static Currency,
        delivery: DeliveryAddress,
    ) -> Result<Self, MoneyError> {
        Ok(Self {
            user,
            amount: to_minor_units(total, currency)?,
            delivery,
        })
    }

    /// Amount in minor units (e.g. paise), as the gateway expects it.
    pub fn amount_minor_units(&self) -> i64 {
        self.amount.to_minor_units()
    }
}

/// How the payment sheet was closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Payment captured.
    Confirmed(PaymentHandle),

    /// The customer closed the sheet without paying.
    Dismissed,
}

/// Payment gateway errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
    /// The payment method was declined.
    #[error("your payment was declined: {0}")]
    Declined(String),

    /// The gateway could not be reached.
    #[error("the payment service is unavailable, please try again")]
    Unavailable(String),
}

/// Hosted payment gateway contract.
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open the payment sheet and wait for it to close.
    async fn open_checkout(&self, request: PaymentRequest) -> Result<PaymentOutcome, PaymentError>;
}
