//! In-memory collaborators shared by the integration tests.

#![expect(dead_code, reason = "each test binary uses a different subset")]

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use smallvec::smallvec;

use smoothie_cart::prelude::*;

/// Cart collection keyed by user.
#[derive(Debug, Default)]
pub struct MemoryCarts {
    carts: Mutex<FxHashMap<UserUuid, Vec<LineItem>>>,
    writes: Mutex<usize>,
}

impl MemoryCarts {
    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, user: UserUuid, apply: impl FnOnce(&mut Vec<LineItem>)) {
        let mut carts = self.carts.lock().unwrap_or_else(PoisonError::into_inner);
        apply(carts.entry(user).or_default());

        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }
}

#[async_trait]
impl CartRepository for MemoryCarts {
    async fn load(&self, user: UserUuid) -> Result<Vec<LineItem>, StoreError> {
        Ok(self
            .carts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_item(&self, user: UserUuid, item: &LineItem) -> Result<(), StoreError> {
        self.save_items(user, std::slice::from_ref(item)).await
    }

    async fn save_items(&self, user: UserUuid, items: &[LineItem]) -> Result<(), StoreError> {
        self.write(user, |cart| {
            for item in items {
                match cart.iter_mut().find(|line| line.uuid == item.uuid) {
                    Some(line) => *line = item.clone(),
                    None => cart.push(item.clone()),
                }
            }
        });

        Ok(())
    }

    async fn delete_item(&self, user: UserUuid, item: LineItemUuid) -> Result<(), StoreError> {
        self.write(user, |cart| cart.retain(|line| line.uuid != item));

        Ok(())
    }

    async fn clear(&self, user: UserUuid) -> Result<(), StoreError> {
        self.write(user, Vec::clear);

        Ok(())
    }
}

/// Catalog with mutable stock.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    levels: Mutex<FxHashMap<ProductUuid, StockLevel>>,
}

impl MemoryCatalog {
    pub fn product(&self, category: &str, stock: u32, unit_price: Decimal) -> ProductRef {
        let product = ProductRef::new(category, ProductUuid::new());

        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.product, StockLevel { stock, unit_price });

        product
    }

    pub fn set_stock(&self, product: &ProductRef, stock: u32) {
        if let Some(level) = self
            .levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&product.product)
        {
            level.stock = stock;
        }
    }
}

#[async_trait]
impl InventoryReader for MemoryCatalog {
    async fn get_stock(&self, product: &ProductRef) -> Result<StockLevel, InventoryError> {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&product.product)
            .copied()
            .ok_or(InventoryError::NotFound(product.product))
    }
}

/// Coupon collection.
#[derive(Debug, Default)]
pub struct MemoryCoupons {
    coupons: Mutex<FxHashMap<CouponCode, Coupon>>,
}

impl MemoryCoupons {
    pub fn insert(&self, coupon: Coupon) {
        self.coupons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(coupon.code.clone(), coupon);
    }
}

#[async_trait]
impl CouponStore for MemoryCoupons {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError> {
        Ok(self
            .coupons
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned())
    }
}

/// Clock that reads a settable instant.
#[derive(Debug)]
pub struct TestClock(Mutex<Timestamp>);

impl TestClock {
    pub fn at(now: Timestamp) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: Timestamp) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl Clock for TestClock {
    fn now(&self) -> Timestamp {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A storefront for one signed-in customer.
#[derive(Debug)]
pub struct Storefront {
    pub session: Session,
    pub clock: Arc<TestClock>,
    pub carts: Arc<MemoryCarts>,
    pub catalog: Arc<MemoryCatalog>,
    pub coupons: Arc<MemoryCoupons>,
    pub cart: Arc<CartStore>,
}

impl Storefront {
    /// Opens on Tuesday 2026-10-13 at 10:00 in Kolkata.
    pub fn new() -> Self {
        let session = Session::new(UserUuid::new());
        let clock = Arc::new(TestClock::at(local("2026-10-13T10:00:00")));
        let carts = Arc::new(MemoryCarts::default());
        let catalog = Arc::new(MemoryCatalog::default());
        let coupons = Arc::new(MemoryCoupons::default());

        let cart = Arc::new(CartStore::new(
            session,
            carts.clone(),
            catalog.clone(),
            clock.clone(),
            StorefrontConfig::default().max_item_quantity,
        ));

        Self {
            session,
            clock,
            carts,
            catalog,
            coupons,
            cart,
        }
    }

    pub fn evaluator(&self) -> CouponEvaluator {
        CouponEvaluator::new(self.coupons.clone(), self.clock.clone())
    }

    pub fn reconciler(&self) -> StockReconciler {
        StockReconciler::new(self.catalog.clone(), self.clock.clone())
    }

    pub fn checkout(
        &self,
        payments: impl PaymentGateway + 'static,
        orders: impl OrderRepository + 'static,
    ) -> CheckoutOrchestrator {
        self.checkout_with(payments, orders, StorefrontConfig::default())
    }

    pub fn checkout_with(
        &self,
        payments: impl PaymentGateway + 'static,
        orders: impl OrderRepository + 'static,
        config: StorefrontConfig,
    ) -> CheckoutOrchestrator {
        CheckoutOrchestrator::new(
            self.cart.clone(),
            self.reconciler(),
            CheckoutServices {
                payments: Arc::new(payments),
                orders: Arc::new(orders),
                clock: self.clock.clone(),
            },
            config,
        )
    }
}

/// An instant given as Kolkata wall-clock time, or the epoch if it doesn't parse.
pub fn local(datetime: &str) -> Timestamp {
    format!("{datetime}+05:30[Asia/Kolkata]")
        .parse::<jiff::Zoned>()
        .map_or(Timestamp::UNIX_EPOCH, |zoned| zoned.timestamp())
}

pub fn draft(product: &ProductRef, name: &str, quantity: u32) -> ProductDraft {
    ProductDraft {
        product: product.clone(),
        name: name.to_string(),
        quantity,
        toppings: smallvec![],
        boosters: smallvec![],
        special_instructions: None,
    }
}

pub fn home() -> DeliveryAddress {
    DeliveryAddress {
        label: "Home".to_string(),
        line1: "4 Brigade Road".to_string(),
        city: "Bengaluru".to_string(),
        postal_code: "560001".to_string(),
        coordinates: Some(Coordinates {
            latitude: 12.9719,
            longitude: 77.6070,
        }),
    }
}
