//! Domain Layer - Business logic and entities
//!
//! This layer contains:
//! - Domain entities (Coupon, Campaign)
//! - Domain value objects (CouponCode, PurchaseAmount, CampaignConditions)
//! - Domain services (eligibility and discount rules)
//! - Repository traits (the promotion store interface)

pub mod entities;
pub mod repository;
pub mod services;
pub mod value_objects;
