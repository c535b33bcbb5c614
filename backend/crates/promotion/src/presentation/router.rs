//! Promotion Router

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;

use crate::domain::repository::{CampaignRepository, CouponRepository};
use crate::infra::postgres::PgPromotionRepository;
use crate::presentation::handlers::{self, PromotionAppState};
use crate::presentation::middleware::{AdmissionState, admission_control};

/// Create the promotion router with PostgreSQL repository
pub fn promotion_router(repo: PgPromotionRepository, admission: AdmissionState) -> Router {
    promotion_router_generic(repo, admission)
}

/// Create a generic promotion router for any repository implementation
pub fn promotion_router_generic<R>(repo: R, admission: AdmissionState) -> Router
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let state = PromotionAppState {
        repo: Arc::new(repo),
    };

    Router::new()
        .route("/coupons", post(handlers::create_coupon::<R>))
        .route("/coupons/active", get(handlers::list_active_coupons::<R>))
        .route("/coupons/validate", post(handlers::validate_coupon::<R>))
        .route(
            "/coupons/{id}",
            get(handlers::get_coupon::<R>)
                .put(handlers::update_coupon::<R>)
                .delete(handlers::delete_coupon::<R>),
        )
        .route("/campaigns", post(handlers::create_campaign::<R>))
        .route("/campaigns/active", get(handlers::list_active_campaigns::<R>))
        .route(
            "/campaigns/type/{campaign_type}",
            get(handlers::list_campaigns_by_type::<R>),
        )
        .route("/campaigns/apply", post(handlers::apply_campaign::<R>))
        .route(
            "/campaigns/{id}",
            get(handlers::get_campaign::<R>)
                .put(handlers::update_campaign::<R>)
                .delete(handlers::delete_campaign::<R>),
        )
        .with_state(state)
        .layer(middleware::from_fn_with_state(admission, admission_control))
}
