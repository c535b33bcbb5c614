//! Redeem Coupon Use Case
//!
//! The redemption ledger: decides coupon eligibility and counts each
//! successful redemption exactly once.
//!
//! The capacity check that authorises a redemption is repeated by the store
//! inside the conditioned increment, so two concurrent requests can never
//! both take the last slot. A request whose increment loses that race
//! re-evaluates once against fresh state; by then the coupon either has
//! capacity again (its limit was raised) or is genuinely exhausted.
//!
//! Losing the race and a transient read failure share one retry budget, so a
//! request is evaluated at most twice. A failure reported by the increment
//! itself is never retried: the write may have committed, and replaying it
//! could count one redemption twice.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::domain::entities::Coupon;
use crate::domain::repository::{CouponRepository, UsageIncrement};
use crate::domain::services::{check_coupon_eligibility, compute_discount};
use crate::domain::value_objects::{CouponCode, PurchaseAmount};
use crate::error::{PromotionError, PromotionResult};

/// Re-evaluations allowed per request, whether after a lost race or a
/// transient read failure
const MAX_INTERNAL_RETRIES: u8 = 1;

/// Input DTO for coupon redemption
#[derive(Debug, Clone)]
pub struct RedeemCouponInput {
    pub code: String,
    pub purchase_amount: f64,
}

/// Output DTO for coupon redemption
#[derive(Debug, Clone)]
pub struct RedeemCouponOutput {
    /// The coupon as counted, with `used_count` reflecting this redemption
    pub coupon: Coupon,
    pub discount: f64,
}

enum Attempt {
    Redeemed(RedeemCouponOutput),
    LostRace,
    /// The increment failed and may or may not have been applied
    Unconfirmed(PromotionError),
}

/// Redeem Coupon Use Case
pub struct RedeemCouponUseCase<C>
where
    C: CouponRepository,
{
    coupon_repo: Arc<C>,
}

impl<C> RedeemCouponUseCase<C>
where
    C: CouponRepository,
{
    pub fn new(coupon_repo: Arc<C>) -> Self {
        Self { coupon_repo }
    }

    pub async fn execute(
        &self,
        input: RedeemCouponInput,
        now: DateTime<Utc>,
    ) -> PromotionResult<RedeemCouponOutput> {
        let code = CouponCode::new(&input.code)?;
        let amount = PurchaseAmount::new(input.purchase_amount)?;

        let mut retries = 0u8;

        loop {
            match self.attempt(&code, amount, now).await {
                Ok(Attempt::Redeemed(output)) => return Ok(output),
                Ok(Attempt::LostRace) if retries < MAX_INTERNAL_RETRIES => {
                    retries += 1;
                    tracing::debug!(coupon_code = %code, "Lost usage increment race, re-evaluating");
                }
                Ok(Attempt::LostRace) => {
                    tracing::info!(coupon_code = %code, "Coupon capacity exhausted by concurrent redemptions");
                    return Err(PromotionError::LimitReached);
                }
                Ok(Attempt::Unconfirmed(err)) => {
                    tracing::warn!(coupon_code = %code, error = %err, "Usage increment unconfirmed, not retrying");
                    return Err(err);
                }
                Err(err) if err.is_retryable() && retries < MAX_INTERNAL_RETRIES => {
                    retries += 1;
                    tracing::warn!(coupon_code = %code, error = %err, "Retrying coupon redemption");
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One full read-check-increment pass
    async fn attempt(
        &self,
        code: &CouponCode,
        amount: PurchaseAmount,
        now: DateTime<Utc>,
    ) -> PromotionResult<Attempt> {
        let mut coupon = self
            .coupon_repo
            .find_by_code(code)
            .await?
            .ok_or(PromotionError::CouponNotFound)?;

        check_coupon_eligibility(&coupon, amount, now)?;
        let discount = compute_discount(&coupon, amount);

        let increment = match self
            .coupon_repo
            .conditional_increment_usage(coupon.id, coupon.usage_limit)
            .await
        {
            Ok(increment) => increment,
            Err(err) => return Ok(Attempt::Unconfirmed(err)),
        };

        match increment {
            UsageIncrement::Incremented { used_count } => {
                coupon.used_count = used_count;

                tracing::info!(
                    coupon_id = %coupon.id,
                    coupon_code = %coupon.code,
                    discount = discount,
                    used_count = used_count,
                    usage_limit = coupon.usage_limit,
                    "Coupon redeemed"
                );

                Ok(Attempt::Redeemed(RedeemCouponOutput { coupon, discount }))
            }
            UsageIncrement::CapacityExceeded => Ok(Attempt::LostRace),
            UsageIncrement::NotFound => Err(PromotionError::CouponNotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{CouponTerms, DiscountKind};
    use crate::infra::memory::InMemoryPromotionRepository;
    use chrono::{Duration, TimeZone};
    use kernel::id::CouponId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    fn terms(kind: DiscountKind, discount: f64, usage_limit: u32) -> CouponTerms {
        CouponTerms {
            description: "test coupon".to_string(),
            discount,
            kind,
            min_purchase: 20.0,
            max_discount: 15.0,
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(1),
            usage_limit,
            is_active: true,
        }
    }

    async fn seed(repo: &InMemoryPromotionRepository, code: &str, terms: CouponTerms) -> Coupon {
        let coupon = Coupon::new(CouponCode::new(code).unwrap(), terms, now());
        CouponRepository::insert_coupon(repo, &coupon).await.unwrap();
        coupon
    }

    fn input(code: &str, purchase_amount: f64) -> RedeemCouponInput {
        RedeemCouponInput {
            code: code.to_string(),
            purchase_amount,
        }
    }

    #[tokio::test]
    async fn test_redeem_percentage_coupon_counts_usage() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        seed(&repo, "SAVE20", terms(DiscountKind::Percentage, 20.0, 10)).await;
        let use_case = RedeemCouponUseCase::new(repo.clone());

        let output = use_case.execute(input("SAVE20", 100.0), now()).await.unwrap();

        assert_eq!(output.discount, 15.0);
        assert_eq!(output.coupon.used_count, 1);
    }

    #[tokio::test]
    async fn test_redeem_fixed_coupon() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        seed(&repo, "TENOFF", terms(DiscountKind::Fixed, 10.0, 0)).await;
        let use_case = RedeemCouponUseCase::new(repo);

        for amount in [20.0, 75.5, 1_000.0] {
            let output = use_case.execute(input("TENOFF", amount), now()).await.unwrap();
            assert_eq!(output.discount, 10.0);
        }
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        let use_case = RedeemCouponUseCase::new(repo);

        let err = use_case.execute(input("NOPE", 50.0), now()).await.unwrap_err();
        assert!(matches!(err, PromotionError::CouponNotFound));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_lookup() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        let use_case = RedeemCouponUseCase::new(repo);

        assert!(matches!(
            use_case.execute(input("  ", 50.0), now()).await,
            Err(PromotionError::Validation(_))
        ));
        assert!(matches!(
            use_case.execute(input("SAVE", -1.0), now()).await,
            Err(PromotionError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_rejection_never_mutates_usage() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        let coupon = seed(&repo, "MIN20", terms(DiscountKind::Fixed, 5.0, 3)).await;
        let use_case = RedeemCouponUseCase::new(repo.clone());

        for _ in 0..5 {
            let err = use_case.execute(input("MIN20", 19.99), now()).await.unwrap_err();
            assert!(matches!(err, PromotionError::MinPurchaseNotMet { .. }));
        }

        let stored = CouponRepository::find_coupon(repo.as_ref(), coupon.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.used_count, 0);
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        let coupon = seed(&repo, "EDGE", terms(DiscountKind::Fixed, 5.0, 0)).await;
        let use_case = RedeemCouponUseCase::new(repo);
        let end = coupon.end_date;

        assert!(use_case.execute(input("EDGE", 50.0), end - Duration::seconds(1)).await.is_ok());
        assert!(matches!(
            use_case.execute(input("EDGE", 50.0), end).await,
            Err(PromotionError::Expired)
        ));
        assert!(matches!(
            use_case.execute(input("EDGE", 50.0), end + Duration::seconds(1)).await,
            Err(PromotionError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_sequential_redemptions_stop_at_limit() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        seed(&repo, "TWICE", terms(DiscountKind::Fixed, 5.0, 2)).await;
        let use_case = RedeemCouponUseCase::new(repo);

        assert!(use_case.execute(input("TWICE", 50.0), now()).await.is_ok());
        assert!(use_case.execute(input("TWICE", 50.0), now()).await.is_ok());
        assert!(matches!(
            use_case.execute(input("TWICE", 50.0), now()).await,
            Err(PromotionError::LimitReached)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_redemptions_never_exceed_limit() {
        const LIMIT: u32 = 7;
        const REQUESTS: usize = 64;

        let repo = Arc::new(InMemoryPromotionRepository::new());
        let coupon = seed(&repo, "RUSH", terms(DiscountKind::Fixed, 5.0, LIMIT)).await;
        let use_case = Arc::new(RedeemCouponUseCase::new(repo.clone()));

        let tasks: Vec<_> = (0..REQUESTS)
            .map(|_| {
                let use_case = use_case.clone();
                tokio::spawn(async move { use_case.execute(input("RUSH", 50.0), now()).await })
            })
            .collect();

        let mut successes = 0;
        let mut limit_reached = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => successes += 1,
                Err(PromotionError::LimitReached) => limit_reached += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(successes, LIMIT as usize);
        assert_eq!(limit_reached, REQUESTS - LIMIT as usize);

        let stored = CouponRepository::find_coupon(repo.as_ref(), coupon.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.used_count, LIMIT);
    }

    /// Store double that injects one failure mode in front of the in-memory store.
    struct ScriptedRepository {
        inner: InMemoryPromotionRepository,
        /// Lookups that fail with `StoreUnavailable` before the store recovers
        unavailable_lookups: AtomicUsize,
        /// Increments whose slot is stolen by a "concurrent" redemption
        stolen_increments: AtomicUsize,
        /// Increments that commit but report `StoreUnavailable` to the caller
        unconfirmed_increments: AtomicUsize,
        /// One-based index of a single lookup that fails, zero for none
        failing_lookup: AtomicUsize,
        lookups: AtomicUsize,
    }

    impl ScriptedRepository {
        fn new(inner: InMemoryPromotionRepository) -> Self {
            Self {
                inner,
                unavailable_lookups: AtomicUsize::new(0),
                stolen_increments: AtomicUsize::new(0),
                unconfirmed_increments: AtomicUsize::new(0),
                failing_lookup: AtomicUsize::new(0),
                lookups: AtomicUsize::new(0),
            }
        }
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    impl CouponRepository for ScriptedRepository {
        async fn find_by_code(&self, code: &CouponCode) -> PromotionResult<Option<Coupon>> {
            let lookup = self.lookups.fetch_add(1, Ordering::SeqCst) + 1;
            if take(&self.unavailable_lookups) || lookup == self.failing_lookup.load(Ordering::SeqCst) {
                return Err(PromotionError::StoreUnavailable("connection reset".to_string()));
            }
            CouponRepository::find_by_code(&self.inner, code).await
        }

        async fn find_coupon(&self, id: CouponId) -> PromotionResult<Option<Coupon>> {
            CouponRepository::find_coupon(&self.inner, id).await
        }

        async fn conditional_increment_usage(
            &self,
            id: CouponId,
            expected_limit: u32,
        ) -> PromotionResult<UsageIncrement> {
            if take(&self.stolen_increments) {
                // Someone else redeems between our check and our increment.
                CouponRepository::conditional_increment_usage(&self.inner, id, expected_limit)
                    .await?;
            }
            let increment =
                CouponRepository::conditional_increment_usage(&self.inner, id, expected_limit)
                    .await?;
            if take(&self.unconfirmed_increments) {
                // The write landed but the acknowledgement was lost.
                return Err(PromotionError::StoreUnavailable("connection reset".to_string()));
            }
            Ok(increment)
        }

        async fn insert_coupon(&self, coupon: &Coupon) -> PromotionResult<()> {
            CouponRepository::insert_coupon(&self.inner, coupon).await
        }

        async fn update_coupon(
            &self,
            id: CouponId,
            terms: &CouponTerms,
            now: DateTime<Utc>,
        ) -> PromotionResult<Option<Coupon>> {
            CouponRepository::update_coupon(&self.inner, id, terms, now).await
        }

        async fn soft_delete_coupon(&self, id: CouponId, now: DateTime<Utc>) -> PromotionResult<bool> {
            CouponRepository::soft_delete_coupon(&self.inner, id, now).await
        }

        async fn list_active_coupons(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Coupon>> {
            CouponRepository::list_active_coupons(&self.inner, now).await
        }
    }

    #[tokio::test]
    async fn test_lost_race_on_last_slot_resolves_to_limit_reached() {
        let inner = InMemoryPromotionRepository::new();
        let coupon = seed(&inner, "LAST", terms(DiscountKind::Fixed, 5.0, 1)).await;
        let repo = Arc::new(ScriptedRepository::new(inner));
        repo.stolen_increments.store(1, Ordering::SeqCst);
        let use_case = RedeemCouponUseCase::new(repo.clone());

        let err = use_case.execute(input("LAST", 50.0), now()).await.unwrap_err();

        assert!(matches!(err, PromotionError::LimitReached));
        // Initial evaluation plus exactly one re-evaluation.
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 2);
        let stored = CouponRepository::find_coupon(&repo.inner, coupon.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.used_count, 1);
    }

    #[tokio::test]
    async fn test_lost_race_with_capacity_left_succeeds_on_reevaluation() {
        let inner = InMemoryPromotionRepository::new();
        seed(&inner, "PAIR", terms(DiscountKind::Fixed, 5.0, 2)).await;
        let repo = Arc::new(ScriptedRepository::new(inner));
        repo.stolen_increments.store(1, Ordering::SeqCst);
        let use_case = RedeemCouponUseCase::new(repo.clone());

        // The stolen increment consumes one slot; ours takes the other directly.
        let output = use_case.execute(input("PAIR", 50.0), now()).await.unwrap();
        assert_eq!(output.coupon.used_count, 2);
    }

    #[tokio::test]
    async fn test_store_unavailable_is_retried_once() {
        let inner = InMemoryPromotionRepository::new();
        seed(&inner, "FLAKY", terms(DiscountKind::Fixed, 5.0, 0)).await;
        let repo = Arc::new(ScriptedRepository::new(inner));
        repo.unavailable_lookups.store(1, Ordering::SeqCst);
        let use_case = RedeemCouponUseCase::new(repo.clone());

        let output = use_case.execute(input("FLAKY", 50.0), now()).await.unwrap();
        assert_eq!(output.discount, 5.0);
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_unavailable_twice_is_surfaced() {
        let inner = InMemoryPromotionRepository::new();
        let coupon = seed(&inner, "DOWN", terms(DiscountKind::Fixed, 5.0, 0)).await;
        let repo = Arc::new(ScriptedRepository::new(inner));
        repo.unavailable_lookups.store(2, Ordering::SeqCst);
        let use_case = RedeemCouponUseCase::new(repo.clone());

        let err = use_case.execute(input("DOWN", 50.0), now()).await.unwrap_err();
        assert!(matches!(err, PromotionError::StoreUnavailable(_)));
        assert!(err.is_retryable());

        let stored = CouponRepository::find_coupon(&repo.inner, coupon.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.used_count, 0);
    }

    #[tokio::test]
    async fn test_unconfirmed_increment_is_not_replayed() {
        let inner = InMemoryPromotionRepository::new();
        let coupon = seed(&inner, "ONCEONLY", terms(DiscountKind::Fixed, 5.0, 0)).await;
        let repo = Arc::new(ScriptedRepository::new(inner));
        repo.unconfirmed_increments.store(1, Ordering::SeqCst);
        let use_case = RedeemCouponUseCase::new(repo.clone());

        let err = use_case.execute(input("ONCEONLY", 50.0), now()).await.unwrap_err();
        assert!(matches!(err, PromotionError::StoreUnavailable(_)));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 1);

        let stored = CouponRepository::find_coupon(&repo.inner, coupon.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.used_count, 1);
    }

    #[tokio::test]
    async fn test_lost_race_then_unavailable_store_is_surfaced() {
        let inner = InMemoryPromotionRepository::new();
        let coupon = seed(&inner, "BUSY", terms(DiscountKind::Fixed, 5.0, 1)).await;
        let repo = Arc::new(ScriptedRepository::new(inner));
        repo.stolen_increments.store(1, Ordering::SeqCst);

        // The re-evaluation after the lost race hits a failing lookup.
        repo.failing_lookup.store(2, Ordering::SeqCst);
        let use_case = RedeemCouponUseCase::new(repo.clone());

        let err = use_case.execute(input("BUSY", 50.0), now()).await.unwrap_err();
        assert!(matches!(err, PromotionError::StoreUnavailable(_)));
        assert_eq!(repo.lookups.load(Ordering::SeqCst), 2);

        let stored = CouponRepository::find_coupon(&repo.inner, coupon.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.used_count, 1);
    }
}
