//! Coupon Administration Use Case
//!
//! Create, update, read and retire coupons. The code and the usage counter
//! belong to the ledger and are never rewritten here.

use chrono::{DateTime, Utc};
use kernel::id::CouponId;
use std::sync::Arc;

use crate::domain::entities::{Coupon, CouponTerms, DiscountKind};
use crate::domain::repository::CouponRepository;
use crate::domain::value_objects::CouponCode;
use crate::error::{PromotionError, PromotionResult};

/// Administrator-supplied coupon fields
#[derive(Debug, Clone)]
pub struct CouponInput {
    pub description: String,
    pub discount: f64,
    pub discount_type: String,
    pub min_purchase: f64,
    pub max_discount: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: u32,
    pub is_active: bool,
}

impl CouponInput {
    fn into_terms(self) -> PromotionResult<CouponTerms> {
        let kind: DiscountKind = self
            .discount_type
            .parse()
            .map_err(|t| PromotionError::Validation(format!("unknown discount type '{t}'")))?;

        if self.start_date > self.end_date {
            return Err(PromotionError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
        if !self.discount.is_finite() || self.discount <= 0.0 {
            return Err(PromotionError::Validation(
                "discount must be a positive number".to_string(),
            ));
        }
        if kind == DiscountKind::Percentage && self.discount > 100.0 {
            return Err(PromotionError::Validation(
                "percentage discount must be in (0, 100]".to_string(),
            ));
        }
        for (field, value) in [
            ("min_purchase", self.min_purchase),
            ("max_discount", self.max_discount),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PromotionError::Validation(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }

        Ok(CouponTerms {
            description: self.description,
            discount: self.discount,
            kind,
            min_purchase: self.min_purchase,
            max_discount: self.max_discount,
            start_date: self.start_date,
            end_date: self.end_date,
            usage_limit: self.usage_limit,
            is_active: self.is_active,
        })
    }
}

fn parse_id(raw: &str) -> PromotionResult<CouponId> {
    raw.trim().parse().map_err(|_| PromotionError::CouponNotFound)
}

/// Coupon Administration Use Case
pub struct CouponAdminUseCase<C>
where
    C: CouponRepository,
{
    coupon_repo: Arc<C>,
}

impl<C> CouponAdminUseCase<C>
where
    C: CouponRepository,
{
    pub fn new(coupon_repo: Arc<C>) -> Self {
        Self { coupon_repo }
    }

    pub async fn create(
        &self,
        code: &str,
        input: CouponInput,
        now: DateTime<Utc>,
    ) -> PromotionResult<Coupon> {
        let code = CouponCode::new(code)?;
        let coupon = Coupon::new(code, input.into_terms()?, now);

        self.coupon_repo.insert_coupon(&coupon).await?;

        tracing::info!(
            coupon_id = %coupon.id,
            coupon_code = %coupon.code,
            usage_limit = coupon.usage_limit,
            "Coupon created"
        );

        Ok(coupon)
    }

    pub async fn update(
        &self,
        id: &str,
        input: CouponInput,
        now: DateTime<Utc>,
    ) -> PromotionResult<Coupon> {
        let id = parse_id(id)?;
        let terms = input.into_terms()?;

        let coupon = self
            .coupon_repo
            .update_coupon(id, &terms, now)
            .await?
            .ok_or(PromotionError::CouponNotFound)?;

        tracing::info!(coupon_id = %coupon.id, "Coupon updated");

        Ok(coupon)
    }

    pub async fn get(&self, id: &str) -> PromotionResult<Coupon> {
        self.coupon_repo
            .find_coupon(parse_id(id)?)
            .await?
            .ok_or(PromotionError::CouponNotFound)
    }

    pub async fn list_active(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Coupon>> {
        self.coupon_repo.list_active_coupons(now).await
    }

    pub async fn delete(&self, id: &str, now: DateTime<Utc>) -> PromotionResult<()> {
        let id = parse_id(id)?;
        if !self.coupon_repo.soft_delete_coupon(id, now).await? {
            return Err(PromotionError::CouponNotFound);
        }

        tracing::info!(coupon_id = %id, "Coupon deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::InMemoryPromotionRepository;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    fn input() -> CouponInput {
        CouponInput {
            description: "Welcome".to_string(),
            discount: 20.0,
            discount_type: "percentage".to_string(),
            min_purchase: 0.0,
            max_discount: 0.0,
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(7),
            usage_limit: 100,
            is_active: true,
        }
    }

    fn use_case() -> CouponAdminUseCase<InMemoryPromotionRepository> {
        CouponAdminUseCase::new(Arc::new(InMemoryPromotionRepository::new()))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let admin = use_case();
        let created = admin.create(" WELCOME20 ", input(), now()).await.unwrap();

        assert_eq!(created.code.as_str(), "WELCOME20");
        assert_eq!(created.used_count, 0);

        let fetched = admin.get(&created.id.to_string()).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let admin = use_case();
        admin.create("DUP", input(), now()).await.unwrap();

        let err = admin.create("DUP", input(), now()).await.unwrap_err();
        assert!(matches!(err, PromotionError::CodeTaken));
    }

    #[tokio::test]
    async fn test_validation() {
        let admin = use_case();

        let mut inverted = input();
        inverted.start_date = now() + Duration::days(10);
        let mut too_large = input();
        too_large.discount = 150.0;
        let mut unknown_type = input();
        unknown_type.discount_type = "bogus".to_string();
        let mut negative_floor = input();
        negative_floor.min_purchase = -5.0;

        for (code, bad) in [
            ("A", inverted),
            ("B", too_large),
            ("C", unknown_type),
            ("D", negative_floor),
        ] {
            assert!(matches!(
                admin.create(code, bad, now()).await,
                Err(PromotionError::Validation(_))
            ));
        }

        let mut large_fixed = input();
        large_fixed.discount_type = "fixed".to_string();
        large_fixed.discount = 150.0;
        assert!(admin.create("E", large_fixed, now()).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_keeps_code_and_usage() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        let admin = CouponAdminUseCase::new(repo.clone());
        let created = admin.create("KEEP", input(), now()).await.unwrap();
        CouponRepository::conditional_increment_usage(repo.as_ref(), created.id, 100)
            .await
            .unwrap();

        let mut changed = input();
        changed.usage_limit = 5;
        changed.description = "Changed".to_string();
        let updated = admin
            .update(&created.id.to_string(), changed, now() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(updated.code.as_str(), "KEEP");
        assert_eq!(updated.used_count, 1);
        assert_eq!(updated.usage_limit, 5);
        assert_eq!(updated.description, "Changed");
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_update_cannot_lower_limit_below_used_count() {
        let repo = Arc::new(InMemoryPromotionRepository::new());
        let admin = CouponAdminUseCase::new(repo.clone());
        let mut limited = input();
        limited.usage_limit = 5;
        let created = admin.create("HALFWAY", limited, now()).await.unwrap();
        for _ in 0..3 {
            CouponRepository::conditional_increment_usage(repo.as_ref(), created.id, 5)
                .await
                .unwrap();
        }
        let id = created.id.to_string();

        let mut lowered = input();
        lowered.usage_limit = 1;
        assert!(matches!(
            admin.update(&id, lowered, now()).await,
            Err(PromotionError::Validation(_))
        ));

        let stored = admin.get(&id).await.unwrap();
        assert_eq!(stored.usage_limit, 5);
        assert_eq!(stored.used_count, 3);

        // Exactly the counted uses, or unlimited, are both allowed.
        let mut exact = input();
        exact.usage_limit = 3;
        assert_eq!(admin.update(&id, exact, now()).await.unwrap().usage_limit, 3);

        let mut unlimited = input();
        unlimited.usage_limit = 0;
        let updated = admin.update(&id, unlimited, now()).await.unwrap();
        assert_eq!(updated.usage_limit, 0);
        assert_eq!(updated.used_count, 3);
    }

    #[tokio::test]
    async fn test_delete_hides_coupon() {
        let admin = use_case();
        let created = admin.create("GONE", input(), now()).await.unwrap();
        let id = created.id.to_string();

        admin.delete(&id, now()).await.unwrap();

        assert!(matches!(admin.get(&id).await, Err(PromotionError::CouponNotFound)));
        assert!(matches!(admin.delete(&id, now()).await, Err(PromotionError::CouponNotFound)));
        assert!(admin.list_active(now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_active_excludes_inactive_and_ended() {
        let admin = use_case();
        admin.create("LIVE", input(), now()).await.unwrap();

        let mut paused = input();
        paused.is_active = false;
        admin.create("PAUSED", paused, now()).await.unwrap();

        let mut ended = input();
        ended.start_date = now() - Duration::days(10);
        ended.end_date = now();
        admin.create("ENDED", ended, now()).await.unwrap();

        let active = admin.list_active(now()).await.unwrap();
        let codes: Vec<_> = active.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["LIVE"]);
    }

    #[tokio::test]
    async fn test_malformed_id_is_not_found() {
        let admin = use_case();
        assert!(matches!(admin.get("not-a-uuid").await, Err(PromotionError::CouponNotFound)));
    }
}
