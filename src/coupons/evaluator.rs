//! Coupon Evaluator

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::{
    cart::models::CartSnapshot,
    clock::Clock,
    coupons::{
        errors::CouponError,
        models::{AppliedCoupon, Coupon, CouponCode, CouponKind, CouponRequirements},
    },
    money::round_money,
    store::StoreError,
};

/// Coupon collection contract.
#[automock]
#[async_trait]
pub trait CouponStore: Send + Sync {
    /// Look up a coupon by its normalised code.
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, StoreError>;
}

/// Validates coupon codes against a cart and resolves their discount.
#[derive(Clone)]
pub struct CouponEvaluator {
    store: Arc<dyn CouponStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for CouponEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CouponEvaluator").finish_non_exhaustive()
    }
}

impl CouponEvaluator {
    /// Create an evaluator over a coupon store.
    pub fn new(store: Arc<dyn CouponStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Look up `code` and evaluate it against the cart.
    ///
    /// # Errors
    ///
    /// Returns [`CouponError::InvalidCode`] for unknown codes, the first failed
    /// eligibility requirement otherwise, or [`CouponError::Store`] when the lookup fails.
    #[tracing::instrument(
        name = "coupons.evaluator.evaluate",
        skip(self, snapshot),
        fields(items = snapshot.item_count()),
        err
    )]
    pub async fn evaluate(
        &self,
        code: &str,
        snapshot: CartSnapshot<'_>,
    ) -> Result<AppliedCoupon, CouponError> {
        let code = CouponCode::new(code);

        if code.is_empty() {
            return Err(CouponError::InvalidCode(code));
        }

        let coupon = self
            .store
            .find_by_code(&code)
            .await?
            .ok_or_else(|| CouponError::InvalidCode(code.clone()))?;

        let applied = evaluate_coupon(&coupon, snapshot, self.clock.now())?;

        info!(
            code = %applied.code,
            discount = %applied.resolved_discount,
            "coupon evaluated"
        );

        Ok(applied)
    }
}

/// Evaluate a fetched coupon against a cart.
///
/// # Errors
///
/// Returns the first eligibility requirement the cart fails.
pub fn evaluate_coupon(
    coupon: &Coupon,
    snapshot: CartSnapshot<'_>,
    now: Timestamp,
) -> Result<AppliedCoupon, CouponError> {
    if !coupon.is_active {
        return Err(CouponError::Inactive(coupon.code.clone()));
    }

    check_requirements(&coupon.code, &coupon.requirements, snapshot, now)?;

    Ok(AppliedCoupon {
        code: coupon.code.clone(),
        kind: coupon.kind,
        resolved_discount: resolve_discount(
            coupon.kind,
            coupon.discount_value,
            coupon.max_discount,
            snapshot.pre_discount_amount(),
        ),
        original_value: coupon.discount_value,
        max_discount: coupon.max_discount,
        requirements: coupon.requirements.clone(),
    })
}

/// Re-run eligibility and discount resolution for an already applied coupon
/// against the cart's new contents. Uses only the cached rule.
///
/// # Errors
///
/// Returns the first eligibility requirement the new cart fails.
pub fn revalidate(
    applied: &AppliedCoupon,
    snapshot: CartSnapshot<'_>,
    now: Timestamp,
) -> Result<AppliedCoupon, CouponError> {
    check_requirements(&applied.code, &applied.requirements, snapshot, now)?;

    let resolved_discount = resolve_discount(
        applied.kind,
        applied.original_value,
        applied.max_discount,
        snapshot.pre_discount_amount(),
    );

    debug!(code = %applied.code, discount = %resolved_discount, "coupon revalidated");

    Ok(AppliedCoupon {
        resolved_discount,
        ..applied.clone()
    })
}

/// Resolve the discount amount for a coupon rule against a pre-discount amount.
///
/// Percentages are capped at `max_discount`. Fixed amounts are returned as-is;
/// bounding by the cart amount happens in [`crate::totals::compute`].
pub fn resolve_discount(
    kind: CouponKind,
    value: Decimal,
    max_discount: Option<Decimal>,
    pre_discount: Decimal,
) -> Decimal {
    match kind {
        CouponKind::Percentage => {
            let discount = round_money(pre_discount * value / Decimal::ONE_HUNDRED);

            max_discount.map_or(discount, |cap| discount.min(cap))
        }
        CouponKind::Fixed => value,
    }
}

fn check_requirements(
    code: &CouponCode,
    requirements: &CouponRequirements,
    snapshot: CartSnapshot<'_>,
    now: Timestamp,
) -> Result<(), CouponError> {
    if let Some(valid_from) = requirements.valid_from
        && now < valid_from
    {
        return Err(CouponError::NotYetValid {
            code: code.clone(),
            valid_from,
        });
    }

    if let Some(valid_until) = requirements.valid_until
        && now > valid_until
    {
        return Err(CouponError::Expired {
            code: code.clone(),
            valid_until,
        });
    }

    if snapshot.is_empty() {
        return Err(CouponError::EmptyCart(code.clone()));
    }

    let current = snapshot.pre_discount_amount();

    if let Some(required) = requirements.min_purchase
        && current < required
    {
        return Err(CouponError::MinPurchaseNotMet {
            code: code.clone(),
            required,
            current,
        });
    }

    let count = snapshot.item_count();

    if let Some(required) = requirements.min_items
        && count < required
    {
        return Err(CouponError::MinItemsNotMet {
            code: code.clone(),
            required,
            current: count,
        });
    }

    if let Some(allowed) = requirements.max_items
        && count > allowed
    {
        return Err(CouponError::MaxItemsExceeded {
            code: code.clone(),
            allowed,
            current: count,
        });
    }

    if !requirements.eligible_categories.is_empty()
        && let Some(item) = snapshot
            .items()
            .iter()
            .find(|item| !requirements.eligible_categories.contains(&item.product.category))
    {
        return Err(CouponError::IneligibleCategory {
            code: code.clone(),
            category: item.product.category.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use jiff::{Timestamp, ToSpan};
    use rustc_hash::FxHashSet;
    use smallvec::smallvec;
    use testresult::TestResult;

    use crate::{
        cart::models::{LineItem, ProductDraft},
        clock::FixedClock,
        inventory::{ProductRef, ProductUuid},
    };

    use super::*;

    fn item(category: &str, unit: i64, quantity: u32) -> LineItem {
        LineItem::from_draft(
            ProductDraft {
                product: ProductRef::new(category, ProductUuid::new()),
                name: format!("{category} item"),
                quantity,
                toppings: smallvec![],
                boosters: smallvec![],
                special_instructions: None,
            },
            Decimal::new(unit, 0),
            10,
            Timestamp::UNIX_EPOCH,
        )
    }

    fn save10() -> Coupon {
        Coupon {
            code: CouponCode::new("SAVE10"),
            kind: CouponKind::Percentage,
            discount_value: Decimal::new(10, 0),
            max_discount: Some(Decimal::new(50, 0)),
            is_active: true,
            requirements: CouponRequirements {
                min_purchase: Some(Decimal::new(200, 0)),
                ..CouponRequirements::default()
            },
        }
    }

    fn evaluator(coupon: Option<Coupon>) -> CouponEvaluator {
        let mut store = MockCouponStore::new();
        store
            .expect_find_by_code()
            .returning(move |_| Ok(coupon.clone()));

        CouponEvaluator::new(Arc::new(store), Arc::new(FixedClock(Timestamp::UNIX_EPOCH)))
    }

    #[tokio::test]
    async fn percentage_discount_is_capped_at_max_discount() -> TestResult {
        let items = [item("smoothies", 500, 2)];

        let applied = evaluator(Some(save10()))
            .evaluate("save10", CartSnapshot::new(&items))
            .await?;

        assert_eq!(applied.code.as_str(), "SAVE10");
        assert_eq!(applied.resolved_discount, Decimal::new(50, 0));
        assert_eq!(applied.original_value, Decimal::new(10, 0));

        Ok(())
    }

    #[tokio::test]
    async fn unknown_code_is_invalid() {
        let items = [item("smoothies", 500, 1)];

        let result = evaluator(None)
            .evaluate("nope", CartSnapshot::new(&items))
            .await;

        assert!(matches!(result, Err(CouponError::InvalidCode(code)) if code.as_str() == "NOPE"));
    }

    #[tokio::test]
    async fn store_failure_is_surfaced() {
        let mut store = MockCouponStore::new();
        store
            .expect_find_by_code()
            .returning(|_| Err(StoreError::Unavailable("offline".into())));
        let evaluator =
            CouponEvaluator::new(Arc::new(store), Arc::new(FixedClock(Timestamp::UNIX_EPOCH)));
        let items = [item("smoothies", 500, 1)];

        let result = evaluator.evaluate("SAVE10", CartSnapshot::new(&items)).await;

        assert!(matches!(result, Err(CouponError::Store(_))));
    }

    #[test]
    fn inactive_coupon_is_rejected() {
        let coupon = Coupon {
            is_active: false,
            ..save10()
        };
        let items = [item("smoothies", 500, 1)];

        let result = evaluate_coupon(&coupon, CartSnapshot::new(&items), Timestamp::UNIX_EPOCH);

        assert!(matches!(result, Err(CouponError::Inactive(_))));
    }

    #[test]
    fn validity_window_is_enforced() -> TestResult {
        let now: Timestamp = "2026-10-13T10:00:00Z".parse()?;
        let items = [item("smoothies", 500, 1)];
        let mut coupon = save10();

        coupon.requirements.valid_from = Some(now + 1.hour());
        let early = evaluate_coupon(&coupon, CartSnapshot::new(&items), now);
        assert!(matches!(early, Err(CouponError::NotYetValid { .. })));

        coupon.requirements.valid_from = Some(now - 2.hours());
        coupon.requirements.valid_until = Some(now - 1.hour());
        let late = evaluate_coupon(&coupon, CartSnapshot::new(&items), now);
        assert!(matches!(late, Err(CouponError::Expired { .. })));

        coupon.requirements.valid_until = Some(now);
        assert!(evaluate_coupon(&coupon, CartSnapshot::new(&items), now).is_ok());

        Ok(())
    }

    #[test]
    fn minimum_purchase_includes_add_ons() {
        let items = [item("smoothies", 150, 1)];

        let result = evaluate_coupon(&save10(), CartSnapshot::new(&items), Timestamp::UNIX_EPOCH);

        assert!(matches!(
            result,
            Err(CouponError::MinPurchaseNotMet { required, current, .. })
                if required == Decimal::new(200, 0) && current == Decimal::new(150, 0)
        ));
    }

    #[test]
    fn item_count_bounds_are_enforced() {
        let mut coupon = save10();
        coupon.requirements = CouponRequirements {
            min_items: Some(2),
            max_items: Some(3),
            ..CouponRequirements::default()
        };

        let one = [item("smoothies", 100, 1)];
        let four = [
            item("smoothies", 100, 1),
            item("smoothies", 100, 1),
            item("smoothies", 100, 1),
            item("smoothies", 100, 1),
        ];

        assert!(matches!(
            evaluate_coupon(&coupon, CartSnapshot::new(&one), Timestamp::UNIX_EPOCH),
            Err(CouponError::MinItemsNotMet { required: 2, current: 1, .. })
        ));
        assert!(matches!(
            evaluate_coupon(&coupon, CartSnapshot::new(&four), Timestamp::UNIX_EPOCH),
            Err(CouponError::MaxItemsExceeded { allowed: 3, current: 4, .. })
        ));
    }

    #[test]
    fn every_item_must_be_in_an_eligible_category() {
        let mut coupon = save10();
        coupon.code = CouponCode::new("VEGANONLY");
        coupon.requirements = CouponRequirements {
            eligible_categories: FxHashSet::from_iter(["smoothies".to_string()]),
            ..CouponRequirements::default()
        };

        let pure = [item("smoothies", 300, 1)];
        let mixed = [item("smoothies", 300, 1), item("bowls", 250, 1)];

        assert!(evaluate_coupon(&coupon, CartSnapshot::new(&pure), Timestamp::UNIX_EPOCH).is_ok());
        assert!(matches!(
            evaluate_coupon(&coupon, CartSnapshot::new(&mixed), Timestamp::UNIX_EPOCH),
            Err(CouponError::IneligibleCategory { category, .. }) if category == "bowls"
        ));
    }

    #[test]
    fn empty_cart_cannot_hold_a_coupon() {
        let result = evaluate_coupon(&save10(), CartSnapshot::new(&[]), Timestamp::UNIX_EPOCH);

        assert!(matches!(result, Err(CouponError::EmptyCart(_))));
    }

    #[test]
    fn fixed_discount_is_not_capped_here() {
        assert_eq!(
            resolve_discount(CouponKind::Fixed, Decimal::new(500, 0), None, Decimal::new(100, 0)),
            Decimal::new(500, 0)
        );
    }

    #[test]
    fn revalidate_re_resolves_discount_for_new_cart() -> TestResult {
        let before = [item("smoothies", 250, 1)];
        let applied =
            evaluate_coupon(&save10(), CartSnapshot::new(&before), Timestamp::UNIX_EPOCH)?;
        assert_eq!(applied.resolved_discount, Decimal::new(25, 0));

        let after = [item("smoothies", 250, 1), item("smoothies", 100, 1)];
        let revalidated = revalidate(&applied, CartSnapshot::new(&after), Timestamp::UNIX_EPOCH)?;

        assert_eq!(revalidated.resolved_discount, Decimal::new(35, 0));
        assert_eq!(revalidated.code, applied.code);

        Ok(())
    }
}
