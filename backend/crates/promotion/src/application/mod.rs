//! Application Layer - Use Cases
//!
//! This layer orchestrates domain rules and the promotion store.

pub mod apply_campaign;
pub mod campaign_admin;
pub mod config;
pub mod coupon_admin;
pub mod redeem_coupon;

// Re-exports
pub use apply_campaign::{ApplyCampaignInput, ApplyCampaignOutput, ApplyCampaignUseCase};
pub use campaign_admin::{CampaignAdminUseCase, CampaignInput};
pub use config::PromotionConfig;
pub use coupon_admin::{CouponAdminUseCase, CouponInput};
pub use redeem_coupon::{RedeemCouponInput, RedeemCouponOutput, RedeemCouponUseCase};
