//! Orders
//!
//! An order is created exactly once per successful checkout and never mutated here
//! afterwards.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    cart::models::LineItem,
    checkout::payment::PaymentHandle,
    coupons::models::CouponCode,
    delivery::DeliveryAddress,
    session::UserUuid,
    store::StoreError,
    totals::Totals,
    uuids::TypedUuid,
};

/// Marker for order identifiers.
#[derive(Debug)]
pub struct Order;

/// Order UUID
pub type OrderUuid = TypedUuid<Order>;

/// Required fields missing from an order.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum OrderValidationError {
    /// No user identifier.
    #[error("order has no customer")]
    MissingUser,

    /// No line items.
    #[error("order has no items")]
    NoItems,

    /// No delivery address.
    #[error("order has no delivery address")]
    MissingDeliveryAddress,
}

/// Order fields as assembled by checkout, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    /// Customer
    pub user: Option<UserUuid>,

    /// Line items as charged
    pub items: Vec<LineItem>,

    /// Totals as charged
    pub totals: Totals,

    /// Applied coupon
    pub coupon: Option<CouponCode>,

    /// Exact amount sent to the payment gateway
    pub charged: Money<'static, Currency>,

    /// Delivery target
    pub delivery: Option<DeliveryAddress>,

    /// Payment confirmation
    pub payment: PaymentHandle,

    /// When payment was confirmed
    pub placed_at: Timestamp,
}

/// Immutable order snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    user: UserUuid,
    items: Vec<LineItem>,
    totals: Totals,
    coupon: Option<CouponCode>,
    charged: Money<'static, Currency>,
    delivery: DeliveryAddress,
    payment: PaymentHandle,
    placed_at: Timestamp,
}

impl TryFrom<NewOrder> for OrderRecord {
    type Error = OrderValidationError;

    fn try_from(order: NewOrder) -> Result<Self, Self::Error> {
        let user = order.user.ok_or(OrderValidationError::MissingUser)?;

        if order.items.is_empty() {
            return Err(OrderValidationError::NoItems);
        }

        let delivery = order
            .delivery
            .ok_or(OrderValidationError::MissingDeliveryAddress)?;

        Ok(Self {
            user,
            items: order.items,
            totals: order.totals,
            coupon: order.coupon,
            charged: order.charged,
            delivery,
            payment: order.payment,
            placed_at: order.placed_at,
        })
    }
}

impl OrderRecord {
    /// Customer
    pub const fn user(&self) -> UserUuid {
        self.user
    }

    /// Line items as charged
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Totals as charged
    pub const fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Applied coupon
    pub const fn coupon(&self) -> Option<&CouponCode> {
        self.coupon.as_ref()
    }

    /// Exact amount captured, in the same minor units sent to the gateway
    pub const fn charged(&self) -> &Money<'static, Currency> {
        &self.charged
    }

    /// Delivery target
    pub const fn delivery(&self) -> &DeliveryAddress {
        &self.delivery
    }

    /// Payment confirmation
    pub const fn payment(&self) -> &PaymentHandle {
        &self.payment
    }

    /// When payment was confirmed
    pub const fn placed_at(&self) -> Timestamp {
        self.placed_at
    }
}

/// Orders collection contract.
#[automock]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist a new order, returning its id.
    async fn create(&self, order: &OrderRecord) -> Result<OrderUuid, StoreError>;
}
