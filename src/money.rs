//! Money
//!
//! Amounts are carried as [`Decimal`] while a cart is being priced and only become
//! [`rusty_money::Money`] in minor units at the payment boundary, so the value sent
//! to the gateway and the value recorded on the order come from the same conversion.

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

/// Decimal places kept on every customer-facing amount.
pub const MONEY_DP: u32 = 2;

/// Errors raised while converting amounts or resolving currencies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// The ISO code is not a known currency.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// The amount cannot be represented in minor units.
    #[error("amount {0} cannot be represented in minor units")]
    Overflow(Decimal),

    /// Negative amounts are never charged.
    #[error("amount {0} is negative")]
    Negative(Decimal),
}

/// Round an amount to [`MONEY_DP`] places, midpoint away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Resolve an ISO 4217 alpha code (case-insensitive) to a currency.
///
/// # Errors
///
/// Returns [`MoneyError::UnknownCurrency`] when the code is not recognised.
pub fn parse_currency(code: &str) -> Result<&'static Currency, MoneyError> {
    let normalised = code.trim().to_uppercase();

    rusty_money::iso::find(&normalised).ok_or(MoneyError::UnknownCurrency(normalised))
}

/// Count of minor units (e.g. paise) in an amount, rounding midpoint away from zero.
///
/// # Errors
///
/// - [`MoneyError::Negative`]: the amount is below zero.
/// - [`MoneyError::Overflow`]: the amount does not fit in `i64` minor units.
pub fn minor_unit_count(amount: Decimal, currency: &Currency) -> Result<i64, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative(amount));
    }

    let scale = 10_i64
        .checked_pow(currency.exponent)
        .ok_or(MoneyError::Overflow(amount))?;

    amount
        .checked_mul(Decimal::from(scale))
        .map(|value| value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|value| value.to_i64())
        .ok_or(MoneyError::Overflow(amount))
}

/// Convert a decimal amount into money in the currency's minor units
/// (e.g. rupees into paise).
///
/// # Errors
///
/// See [`minor_unit_count`].
pub fn to_minor_units(
    amount: Decimal,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, MoneyError> {
    Ok(Money::from_minor(minor_unit_count(amount, currency)?, currency))
}
