//! Promotion Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, eligibility rules, repository traits
//! - `application/` - Use cases (redemption ledger, campaign application, administration)
//! - `infra/` - PostgreSQL and in-memory store implementations
//! - `presentation/` - HTTP handlers, DTOs, admission middleware, router
//!
//! ## Consistency Model
//! - Requests pass the per-client sliding-window admission controller first
//! - Coupon usage is only ever counted through a conditioned increment, so the
//!   capacity check and the increment are one indivisible step per coupon
//! - A lost increment race triggers exactly one re-evaluation against fresh state
//! - Campaign eligibility is decided on one consistent snapshot of the campaign

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::PromotionConfig;
pub use error::{PromotionError, PromotionResult};
pub use infra::memory::InMemoryPromotionRepository;
pub use infra::postgres::PgPromotionRepository;
pub use presentation::middleware::AdmissionState;
pub use presentation::router::{promotion_router, promotion_router_generic};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

pub mod models {
    pub use crate::domain::entities::*;
    pub use crate::domain::value_objects::*;
    pub use crate::presentation::dto::*;
}
