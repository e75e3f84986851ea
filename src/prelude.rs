//! Smoothie Cart prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{
        CartError, CartStore,
        events::{CartEvent, CartSubscription},
        models::{AddOn, CartSnapshot, DroppedCoupon, LineItem, LineItemUuid, Mutation, ProductDraft},
        repository::CartRepository,
    },
    checkout::{
        CheckoutError, CheckoutOrchestrator, CheckoutReceipt, CheckoutServices, CheckoutState,
        hours::{Closed, ServiceHours, ServiceWindow},
        orders::{OrderRecord, OrderRepository, OrderUuid},
        payment::{PaymentError, PaymentGateway, PaymentHandle, PaymentOutcome, PaymentRequest},
    },
    clock::{Clock, SystemClock},
    config::{ConfigError, StorefrontConfig},
    coupons::{
        CouponError, CouponEvaluator, CouponStore,
        models::{AppliedCoupon, Coupon, CouponCode, CouponKind, CouponRequirements},
    },
    delivery::{Coordinates, DeliveryAddress, DeliveryError, DeliveryZone, Geocoder, locate},
    inventory::{InventoryError, InventoryReader, ProductRef, ProductUuid, StockLevel},
    reconcile::{
        ItemOutcome, ReconcileSchedule, ReconciliationReport, ShortfallNotice, StockReconciler,
    },
    retry::RetryPolicy,
    session::{AuthProvider, Session, SessionError, UserUuid},
    store::StoreError,
    totals::{TAX_RATE, Totals},
};
