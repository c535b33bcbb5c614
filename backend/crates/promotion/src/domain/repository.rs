//! Repository Traits
//!
//! The promotion store interface. Implementations live in the infra layer.

use chrono::{DateTime, Utc};
use kernel::id::{CampaignId, CouponId};

use crate::domain::entities::{Campaign, CampaignTerms, Coupon, CouponTerms};
use crate::domain::value_objects::CouponCode;
use crate::error::PromotionResult;

/// Outcome of a conditioned usage increment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageIncrement {
    /// The increment was applied; `used_count` is the new value.
    Incremented { used_count: u32 },
    /// The capacity condition no longer held (another redemption took the
    /// last slot, or the limit was changed since it was read).
    CapacityExceeded,
    /// The coupon no longer exists (deleted since it was read).
    NotFound,
}

/// Coupon repository trait
#[trait_variant::make(CouponRepository: Send)]
pub trait LocalCouponRepository {
    /// Find a live (not soft-deleted) coupon by its code
    async fn find_by_code(&self, code: &CouponCode) -> PromotionResult<Option<Coupon>>;

    /// Find a live coupon by ID
    async fn find_coupon(&self, id: CouponId) -> PromotionResult<Option<Coupon>>;

    /// Increment `used_count` by one, atomically, only if the stored
    /// `usage_limit` still equals `expected_limit` and
    /// `usage_limit == 0 || used_count < usage_limit` holds at write time.
    async fn conditional_increment_usage(
        &self,
        id: CouponId,
        expected_limit: u32,
    ) -> PromotionResult<UsageIncrement>;

    /// Insert a new coupon. Fails with `CodeTaken` on a duplicate code.
    async fn insert_coupon(&self, coupon: &Coupon) -> PromotionResult<()>;

    /// Overwrite the administrator-controlled fields, never `code` or `used_count`.
    /// Returns the updated coupon, or `None` if it does not exist.
    ///
    /// A non-zero `usage_limit` below the stored `used_count` is rejected with
    /// `Validation`; the check and the write are one atomic step.
    async fn update_coupon(
        &self,
        id: CouponId,
        terms: &CouponTerms,
        now: DateTime<Utc>,
    ) -> PromotionResult<Option<Coupon>>;

    /// Soft delete. Returns `false` if there was no live coupon.
    async fn soft_delete_coupon(&self, id: CouponId, now: DateTime<Utc>) -> PromotionResult<bool>;

    /// Active coupons whose validity window has not ended at `now`
    async fn list_active_coupons(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Coupon>>;
}

/// Campaign repository trait
#[trait_variant::make(CampaignRepository: Send)]
pub trait LocalCampaignRepository {
    /// Find a live campaign by ID. The returned value is one consistent snapshot.
    async fn find_campaign(&self, id: CampaignId) -> PromotionResult<Option<Campaign>>;

    async fn insert_campaign(&self, campaign: &Campaign) -> PromotionResult<()>;

    async fn update_campaign(
        &self,
        id: CampaignId,
        terms: &CampaignTerms,
        now: DateTime<Utc>,
    ) -> PromotionResult<Option<Campaign>>;

    async fn soft_delete_campaign(
        &self,
        id: CampaignId,
        now: DateTime<Utc>,
    ) -> PromotionResult<bool>;

    async fn list_active_campaigns(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Campaign>>;

    async fn list_campaigns_by_type(&self, campaign_type: &str) -> PromotionResult<Vec<Campaign>>;
}
