//! In-Memory Repository Implementation
//!
//! Backs the service when no database is configured, and the tests.
//! Every read-check-write on a single coupon runs under that coupon's
//! shard lock, which gives the same per-key atomicity the conditioned
//! `UPDATE` gives in PostgreSQL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use kernel::id::{CampaignId, CouponId};
use std::sync::Arc;

use crate::domain::entities::{Campaign, CampaignTerms, Coupon, CouponTerms};
use crate::domain::repository::{CampaignRepository, CouponRepository, UsageIncrement};
use crate::domain::value_objects::CouponCode;
use crate::error::{PromotionError, PromotionResult};

struct Stored<T> {
    value: T,
    deleted_at: Option<DateTime<Utc>>,
}

impl<T> Stored<T> {
    fn live(value: T) -> Self {
        Self {
            value,
            deleted_at: None,
        }
    }

    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Default)]
struct Inner {
    coupons: DashMap<CouponId, Stored<Coupon>>,
    /// Code index; entries outlive soft deletion so codes stay unique.
    codes: DashMap<String, CouponId>,
    campaigns: DashMap<CampaignId, Stored<Campaign>>,
}

/// In-memory promotion store
#[derive(Clone, Default)]
pub struct InMemoryPromotionRepository {
    inner: Arc<Inner>,
}

impl InMemoryPromotionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_coupon(&self, id: CouponId) -> Option<Coupon> {
        self.inner
            .coupons
            .get(&id)
            .filter(|stored| stored.is_live())
            .map(|stored| stored.value.clone())
    }
}

impl CouponRepository for InMemoryPromotionRepository {
    async fn find_by_code(&self, code: &CouponCode) -> PromotionResult<Option<Coupon>> {
        let id = self.inner.codes.get(code.as_str()).map(|id| *id);
        Ok(id.and_then(|id| self.live_coupon(id)))
    }

    async fn find_coupon(&self, id: CouponId) -> PromotionResult<Option<Coupon>> {
        Ok(self.live_coupon(id))
    }

    async fn conditional_increment_usage(
        &self,
        id: CouponId,
        expected_limit: u32,
    ) -> PromotionResult<UsageIncrement> {
        let Some(mut stored) = self.inner.coupons.get_mut(&id) else {
            return Ok(UsageIncrement::NotFound);
        };
        if !stored.is_live() {
            return Ok(UsageIncrement::NotFound);
        }

        let coupon = &mut stored.value;
        if coupon.usage_limit != expected_limit || !coupon.has_capacity() {
            return Ok(UsageIncrement::CapacityExceeded);
        }

        coupon.used_count += 1;
        coupon.updated_at = Utc::now();

        Ok(UsageIncrement::Incremented {
            used_count: coupon.used_count,
        })
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> PromotionResult<()> {
        match self.inner.codes.entry(coupon.code.as_str().to_string()) {
            Entry::Occupied(_) => Err(PromotionError::CodeTaken),
            Entry::Vacant(slot) => {
                self.inner
                    .coupons
                    .insert(coupon.id, Stored::live(coupon.clone()));
                slot.insert(coupon.id);
                Ok(())
            }
        }
    }

    async fn update_coupon(
        &self,
        id: CouponId,
        terms: &CouponTerms,
        now: DateTime<Utc>,
    ) -> PromotionResult<Option<Coupon>> {
        let Some(mut stored) = self.inner.coupons.get_mut(&id) else {
            return Ok(None);
        };
        if !stored.is_live() {
            return Ok(None);
        }
        if terms.usage_limit != 0 && terms.usage_limit < stored.value.used_count {
            return Err(PromotionError::usage_limit_below_count(
                stored.value.used_count,
            ));
        }

        stored.value.apply_terms(terms, now);
        Ok(Some(stored.value.clone()))
    }

    async fn soft_delete_coupon(&self, id: CouponId, now: DateTime<Utc>) -> PromotionResult<bool> {
        Ok(match self.inner.coupons.get_mut(&id) {
            Some(mut stored) if stored.is_live() => {
                stored.deleted_at = Some(now);
                true
            }
            _ => false,
        })
    }

    async fn list_active_coupons(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Coupon>> {
        let mut active: Vec<Coupon> = self
            .inner
            .coupons
            .iter()
            .filter(|stored| stored.is_live())
            .map(|stored| stored.value.clone())
            .filter(|coupon| coupon.is_active && coupon.end_date > now)
            .collect();
        active.sort_by_key(|coupon| coupon.created_at);
        Ok(active)
    }
}

impl CampaignRepository for InMemoryPromotionRepository {
    async fn find_campaign(&self, id: CampaignId) -> PromotionResult<Option<Campaign>> {
        Ok(self
            .inner
            .campaigns
            .get(&id)
            .filter(|stored| stored.is_live())
            .map(|stored| stored.value.clone()))
    }

    async fn insert_campaign(&self, campaign: &Campaign) -> PromotionResult<()> {
        self.inner
            .campaigns
            .insert(campaign.id, Stored::live(campaign.clone()));
        Ok(())
    }

    async fn update_campaign(
        &self,
        id: CampaignId,
        terms: &CampaignTerms,
        now: DateTime<Utc>,
    ) -> PromotionResult<Option<Campaign>> {
        Ok(self
            .inner
            .campaigns
            .get_mut(&id)
            .filter(|stored| stored.is_live())
            .map(|mut stored| {
                stored.value.apply_terms(terms, now);
                stored.value.clone()
            }))
    }

    async fn soft_delete_campaign(
        &self,
        id: CampaignId,
        now: DateTime<Utc>,
    ) -> PromotionResult<bool> {
        Ok(match self.inner.campaigns.get_mut(&id) {
            Some(mut stored) if stored.is_live() => {
                stored.deleted_at = Some(now);
                true
            }
            _ => false,
        })
    }

    async fn list_active_campaigns(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Campaign>> {
        let mut active: Vec<Campaign> = self
            .inner
            .campaigns
            .iter()
            .filter(|stored| stored.is_live())
            .map(|stored| stored.value.clone())
            .filter(|campaign| campaign.is_active && campaign.end_date > now)
            .collect();
        active.sort_by_key(|campaign| campaign.created_at);
        Ok(active)
    }

    async fn list_campaigns_by_type(&self, campaign_type: &str) -> PromotionResult<Vec<Campaign>> {
        let mut matching: Vec<Campaign> = self
            .inner
            .campaigns
            .iter()
            .filter(|stored| stored.is_live() && stored.value.campaign_type == campaign_type)
            .map(|stored| stored.value.clone())
            .collect();
        matching.sort_by_key(|campaign| campaign.created_at);
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::DiscountKind;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap()
    }

    fn coupon(code: &str, usage_limit: u32) -> Coupon {
        let terms = CouponTerms {
            description: String::new(),
            discount: 5.0,
            kind: DiscountKind::Fixed,
            min_purchase: 0.0,
            max_discount: 0.0,
            start_date: now() - Duration::days(1),
            end_date: now() + Duration::days(1),
            usage_limit,
            is_active: true,
        };
        Coupon::new(CouponCode::new(code).unwrap(), terms, now())
    }

    #[tokio::test]
    async fn test_increment_respects_limit() {
        let repo = InMemoryPromotionRepository::new();
        let c = coupon("TWO", 2);
        repo.insert_coupon(&c).await.unwrap();

        assert_eq!(
            repo.conditional_increment_usage(c.id, 2).await.unwrap(),
            UsageIncrement::Incremented { used_count: 1 }
        );
        assert_eq!(
            repo.conditional_increment_usage(c.id, 2).await.unwrap(),
            UsageIncrement::Incremented { used_count: 2 }
        );
        assert_eq!(
            repo.conditional_increment_usage(c.id, 2).await.unwrap(),
            UsageIncrement::CapacityExceeded
        );
    }

    #[tokio::test]
    async fn test_increment_unlimited() {
        let repo = InMemoryPromotionRepository::new();
        let c = coupon("FREE", 0);
        repo.insert_coupon(&c).await.unwrap();

        for expected in 1..=50 {
            assert_eq!(
                repo.conditional_increment_usage(c.id, 0).await.unwrap(),
                UsageIncrement::Incremented { used_count: expected }
            );
        }
    }

    #[tokio::test]
    async fn test_increment_rejects_changed_limit() {
        let repo = InMemoryPromotionRepository::new();
        let c = coupon("MOVED", 10);
        repo.insert_coupon(&c).await.unwrap();

        assert_eq!(
            repo.conditional_increment_usage(c.id, 5).await.unwrap(),
            UsageIncrement::CapacityExceeded
        );
    }

    #[tokio::test]
    async fn test_increment_on_deleted_coupon() {
        let repo = InMemoryPromotionRepository::new();
        let c = coupon("DEL", 10);
        repo.insert_coupon(&c).await.unwrap();
        assert!(repo.soft_delete_coupon(c.id, now()).await.unwrap());

        assert_eq!(
            repo.conditional_increment_usage(c.id, 10).await.unwrap(),
            UsageIncrement::NotFound
        );
        assert_eq!(
            repo.conditional_increment_usage(CouponId::new(), 10).await.unwrap(),
            UsageIncrement::NotFound
        );
    }

    #[tokio::test]
    async fn test_codes_stay_unique_after_delete() {
        let repo = InMemoryPromotionRepository::new();
        let c = coupon("ONCE", 1);
        repo.insert_coupon(&c).await.unwrap();
        repo.soft_delete_coupon(c.id, now()).await.unwrap();

        assert!(repo.find_by_code(&c.code).await.unwrap().is_none());
        assert!(matches!(
            repo.insert_coupon(&coupon("ONCE", 1)).await,
            Err(PromotionError::CodeTaken)
        ));
    }

    #[tokio::test]
    async fn test_update_on_deleted_returns_none() {
        let repo = InMemoryPromotionRepository::new();
        let c = coupon("UPD", 1);
        repo.insert_coupon(&c).await.unwrap();
        repo.soft_delete_coupon(c.id, now()).await.unwrap();

        let terms = CouponTerms {
            description: "x".to_string(),
            discount: 1.0,
            kind: DiscountKind::Fixed,
            min_purchase: 0.0,
            max_discount: 0.0,
            start_date: now(),
            end_date: now() + Duration::days(1),
            usage_limit: 3,
            is_active: true,
        };
        assert!(repo.update_coupon(c.id, &terms, now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_below_used_count_leaves_coupon_untouched() {
        let repo = InMemoryPromotionRepository::new();
        let c = coupon("LOWER", 4);
        repo.insert_coupon(&c).await.unwrap();
        repo.conditional_increment_usage(c.id, 4).await.unwrap();
        repo.conditional_increment_usage(c.id, 4).await.unwrap();

        let mut terms = CouponTerms {
            description: "lowered".to_string(),
            discount: 5.0,
            kind: DiscountKind::Fixed,
            min_purchase: 0.0,
            max_discount: 0.0,
            start_date: c.start_date,
            end_date: c.end_date,
            usage_limit: 1,
            is_active: true,
        };
        assert!(matches!(
            repo.update_coupon(c.id, &terms, now()).await,
            Err(PromotionError::Validation(_))
        ));

        let stored = repo.find_coupon(c.id).await.unwrap().unwrap();
        assert_eq!(stored.description, "");
        assert_eq!(stored.usage_limit, 4);

        terms.usage_limit = 2;
        let updated = repo.update_coupon(c.id, &terms, now()).await.unwrap().unwrap();
        assert_eq!(updated.usage_limit, 2);
        assert!(!updated.has_capacity());
    }
}
