//! Background reconciliation.
//!
//! A pass runs as soon as the cart's item count changes and then on a fixed
//! interval while the cart holds items. The interval is dropped while the cart is
//! empty and the task ends when the user signs out, the cart store is dropped, or
//! the handle is stopped.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use tokio::{
    sync::{Notify, watch},
    task::JoinHandle,
    time::{self, Interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    cart::{CartStore, events::CartSubscription},
    reconcile::{models::ReconciliationReport, reconciler::StockReconciler},
    session::UserUuid,
};

/// Handle to a running reconciliation task.
#[derive(Debug)]
pub struct ReconcileSchedule {
    stop: Arc<Notify>,
    reports: watch::Receiver<Option<ReconciliationReport>>,
    task: JoinHandle<()>,
}

impl ReconcileSchedule {
    /// Start reconciling `cart` every `period`, for as long as `auth` reports the
    /// cart's owner as signed in.
    pub fn spawn(
        cart: &Arc<CartStore>,
        reconciler: StockReconciler,
        auth: watch::Receiver<Option<UserUuid>>,
        period: Duration,
    ) -> Self {
        let stop = Arc::new(Notify::new());
        let (reports_tx, reports) = watch::channel(None);

        let task = Task {
            cart: Arc::downgrade(cart),
            user: cart.session().user(),
            events: cart.subscribe(),
            reconciler,
            auth,
            period,
            stop: stop.clone(),
            reports: reports_tx,
        };

        Self {
            stop,
            reports,
            task: tokio::spawn(task.run()),
        }
    }

    /// Reports from completed passes; holds `None` until the first pass finishes.
    pub fn reports(&self) -> watch::Receiver<Option<ReconciliationReport>> {
        self.reports.clone()
    }

    /// Whether the task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task and wait for it to end.
    pub async fn stop(self) {
        self.stop.notify_one();
        self.join().await;
    }

    /// Wait for the task to end on its own.
    pub async fn join(self) {
        if let Err(error) = self.task.await {
            warn!(%error, "reconciliation task failed");
        }
    }
}

struct Task {
    cart: Weak<CartStore>,
    user: UserUuid,
    events: CartSubscription,
    reconciler: StockReconciler,
    auth: watch::Receiver<Option<UserUuid>>,
    period: Duration,
    stop: Arc<Notify>,
    reports: watch::Sender<Option<ReconciliationReport>>,
}

impl Task {
    async fn run(mut self) {
        let Some(mut item_count) = self.item_count().await else {
            return;
        };

        let mut ticker = self.ticker(item_count);

        loop {
            tokio::select! {
                biased;

                () = self.stop.notified() => {
                    debug!("reconciliation stopped");
                    break;
                }

                changed = self.auth.changed() => {
                    let signed_in = changed.is_ok() && *self.auth.borrow_and_update() == Some(self.user);

                    if !signed_in {
                        info!(user = %self.user, "session ended, reconciliation stopped");
                        break;
                    }
                }

                event = self.events.recv() => {
                    let Some(event) = event else {
                        break;
                    };

                    if !event.changes_item_count() {
                        continue;
                    }

                    let Some(count) = self.item_count().await else {
                        break;
                    };

                    if count != item_count {
                        item_count = count;
                        ticker = self.ticker(count);
                    }
                }

                () = tick(&mut ticker) => {
                    if !self.pass().await {
                        break;
                    }
                }
            }
        }
    }

    /// A fresh interval whose first tick fires immediately, or none for an empty cart.
    fn ticker(&self, item_count: usize) -> Option<Interval> {
        (item_count > 0).then(|| {
            let mut interval = time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        })
    }

    async fn item_count(&self) -> Option<usize> {
        let cart = self.cart.upgrade()?;

        Some(cart.len().await)
    }

    /// Run one pass. Returns `false` once the cart store is gone.
    async fn pass(&self) -> bool {
        let Some(cart) = self.cart.upgrade() else {
            return false;
        };

        match self.reconciler.run(&cart).await {
            Ok(report) => {
                self.reports.send_replace(Some(report));
            }
            Err(error) => warn!(%error, "reconciliation pass failed"),
        }

        true
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::test::{TestContext, draft};

    use super::*;

    const PERIOD: Duration = Duration::from_secs(15 * 60);

    async fn next_report(
        reports: &mut watch::Receiver<Option<ReconciliationReport>>,
    ) -> Result<ReconciliationReport, Box<dyn std::error::Error>> {
        reports.changed().await?;

        reports
            .borrow_and_update()
            .clone()
            .ok_or_else(|| "no report".into())
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_on_the_interval() -> TestResult {
        let ctx = TestContext::new();
        let product = ctx.stock("smoothies", 10, Decimal::new(100, 0));
        ctx.cart.add_item(draft(&product, 4)).await?;
        let (_auth_tx, auth) = watch::channel(Some(ctx.session.user()));

        let schedule = ReconcileSchedule::spawn(&ctx.cart, ctx.reconciler(), auth, PERIOD);
        let mut reports = schedule.reports();

        let first = next_report(&mut reports).await?;
        assert!(first.notices.is_empty());

        ctx.inventory.set_stock(&product, 3);
        let started = time::Instant::now();
        let second = next_report(&mut reports).await?;

        assert!(started.elapsed() >= PERIOD - Duration::from_secs(1));
        assert_eq!(second.notices.len(), 1);
        assert_eq!(ctx.cart.items().await.first().map(|item| item.quantity()), Some(3));

        schedule.stop().await;

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn item_count_change_triggers_a_pass() -> TestResult {
        let ctx = TestContext::new();
        let product = ctx.stock("smoothies", 10, Decimal::new(100, 0));
        let (_auth_tx, auth) = watch::channel(Some(ctx.session.user()));

        let schedule = ReconcileSchedule::spawn(&ctx.cart, ctx.reconciler(), auth, PERIOD);
        let mut reports = schedule.reports();
        tokio::task::yield_now().await;
        assert_eq!(ctx.inventory.reads(), 0, "empty cart is not reconciled");

        ctx.cart.add_item(draft(&product, 2)).await?;
        let started = time::Instant::now();
        let report = next_report(&mut reports).await?;

        assert!(started.elapsed() < PERIOD);
        assert_eq!(report.outcomes.len(), 1);

        schedule.stop().await;

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn emptying_the_cart_cancels_the_interval() -> TestResult {
        let ctx = TestContext::new();
        let product = ctx.stock("smoothies", 10, Decimal::new(100, 0));
        ctx.cart.add_item(draft(&product, 2)).await?;
        let (_auth_tx, auth) = watch::channel(Some(ctx.session.user()));

        let schedule = ReconcileSchedule::spawn(&ctx.cart, ctx.reconciler(), auth, PERIOD);
        let mut reports = schedule.reports();
        next_report(&mut reports).await?;
        let reads = ctx.inventory.reads();

        ctx.cart.clear().await?;
        time::sleep(PERIOD * 2 + Duration::from_secs(1)).await;

        assert_eq!(ctx.inventory.reads(), reads, "no passes over an empty cart");
        assert!(!reports.has_changed()?);
        assert!(!schedule.is_finished(), "still waiting for items");

        ctx.cart.add_item(draft(&product, 1)).await?;
        let report = next_report(&mut reports).await?;
        assert_eq!(report.outcomes.len(), 1);

        schedule.stop().await;

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_ends_the_task() -> TestResult {
        let ctx = TestContext::new();
        let product = ctx.stock("smoothies", 10, Decimal::new(100, 0));
        ctx.cart.add_item(draft(&product, 1)).await?;
        let (auth_tx, auth) = watch::channel(Some(ctx.session.user()));

        let schedule = ReconcileSchedule::spawn(&ctx.cart, ctx.reconciler(), auth, PERIOD);
        auth_tx.send(None)?;

        time::timeout(Duration::from_secs(1), schedule.join()).await?;

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_cart_ends_the_task() -> TestResult {
        let TestContext { cart, .. } = TestContext::new();
        let (_auth_tx, auth) = watch::channel(None);
        let reconciler = StockReconciler::new(
            Arc::new(crate::test::InMemoryInventory::default()),
            Arc::new(crate::clock::SystemClock),
        );

        let schedule = ReconcileSchedule::spawn(&cart, reconciler, auth, PERIOD);
        drop(cart);

        time::timeout(Duration::from_secs(1), schedule.join()).await?;

        Ok(())
    }
}
