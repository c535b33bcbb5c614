//! HTTP Handlers

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use std::sync::Arc;

use crate::application::{
    ApplyCampaignInput, ApplyCampaignUseCase, CampaignAdminUseCase, CouponAdminUseCase,
    RedeemCouponInput, RedeemCouponUseCase,
};
use crate::domain::repository::{CampaignRepository, CouponRepository};
use crate::error::PromotionResult;
use crate::presentation::dto::{
    ApplyCampaignRequest, ApplyCampaignResponse, CampaignEnvelope, CampaignListResponse,
    CampaignRequest, CouponEnvelope, CouponListResponse, CouponTermsRequest, CreateCouponRequest,
    HealthResponse, ValidateCouponRequest, ValidateCouponResponse,
};

/// Shared state for promotion handlers
#[derive(Clone)]
pub struct PromotionAppState<R>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ============================================================================
// Redemption
// ============================================================================

/// POST /api/coupons/validate
pub async fn validate_coupon<R>(
    State(state): State<PromotionAppState<R>>,
    Json(req): Json<ValidateCouponRequest>,
) -> PromotionResult<Json<ValidateCouponResponse>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = RedeemCouponUseCase::new(state.repo.clone());

    let input = RedeemCouponInput {
        code: req.code,
        purchase_amount: req.purchase_amount,
    };

    let output = use_case.execute(input, Utc::now()).await?;

    Ok(Json(ValidateCouponResponse {
        coupon: output.coupon.into(),
        discount: output.discount,
    }))
}

/// POST /api/campaigns/apply
pub async fn apply_campaign<R>(
    State(state): State<PromotionAppState<R>>,
    Json(req): Json<ApplyCampaignRequest>,
) -> PromotionResult<Json<ApplyCampaignResponse>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = ApplyCampaignUseCase::new(state.repo.clone());

    let input = ApplyCampaignInput {
        campaign_id: req.campaign_id,
        user_id: req.user_id,
        purchase_amount: req.purchase_amount,
    };

    let output = use_case.execute(input, Utc::now()).await?;

    Ok(Json(ApplyCampaignResponse {
        campaign_id: output.campaign_id,
        campaign_type: output.campaign_type,
        result: output.result,
    }))
}

// ============================================================================
// Coupon administration
// ============================================================================

/// POST /api/coupons
pub async fn create_coupon<R>(
    State(state): State<PromotionAppState<R>>,
    Json(req): Json<CreateCouponRequest>,
) -> PromotionResult<(StatusCode, Json<CouponEnvelope>)>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CouponAdminUseCase::new(state.repo.clone());
    let coupon = use_case
        .create(&req.code, req.terms.into(), Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CouponEnvelope {
            coupon: coupon.into(),
        }),
    ))
}

/// GET /api/coupons/{id}
pub async fn get_coupon<R>(
    State(state): State<PromotionAppState<R>>,
    Path(id): Path<String>,
) -> PromotionResult<Json<CouponEnvelope>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CouponAdminUseCase::new(state.repo.clone());
    let coupon = use_case.get(&id).await?;

    Ok(Json(CouponEnvelope {
        coupon: coupon.into(),
    }))
}

/// PUT /api/coupons/{id}
pub async fn update_coupon<R>(
    State(state): State<PromotionAppState<R>>,
    Path(id): Path<String>,
    Json(req): Json<CouponTermsRequest>,
) -> PromotionResult<Json<CouponEnvelope>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CouponAdminUseCase::new(state.repo.clone());
    let coupon = use_case.update(&id, req.into(), Utc::now()).await?;

    Ok(Json(CouponEnvelope {
        coupon: coupon.into(),
    }))
}

/// DELETE /api/coupons/{id}
pub async fn delete_coupon<R>(
    State(state): State<PromotionAppState<R>>,
    Path(id): Path<String>,
) -> PromotionResult<StatusCode>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CouponAdminUseCase::new(state.repo.clone());
    use_case.delete(&id, Utc::now()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/coupons/active
pub async fn list_active_coupons<R>(
    State(state): State<PromotionAppState<R>>,
) -> PromotionResult<Json<CouponListResponse>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CouponAdminUseCase::new(state.repo.clone());
    let coupons = use_case.list_active(Utc::now()).await?;

    Ok(Json(CouponListResponse {
        coupons: coupons.into_iter().map(Into::into).collect(),
    }))
}

// ============================================================================
// Campaign administration
// ============================================================================

/// POST /api/campaigns
pub async fn create_campaign<R>(
    State(state): State<PromotionAppState<R>>,
    Json(req): Json<CampaignRequest>,
) -> PromotionResult<(StatusCode, Json<CampaignEnvelope>)>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CampaignAdminUseCase::new(state.repo.clone());
    let campaign = use_case.create(req.into(), Utc::now()).await?;

    Ok((
        StatusCode::CREATED,
        Json(CampaignEnvelope {
            campaign: campaign.into(),
        }),
    ))
}

/// GET /api/campaigns/{id}
pub async fn get_campaign<R>(
    State(state): State<PromotionAppState<R>>,
    Path(id): Path<String>,
) -> PromotionResult<Json<CampaignEnvelope>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CampaignAdminUseCase::new(state.repo.clone());
    let campaign = use_case.get(&id).await?;

    Ok(Json(CampaignEnvelope {
        campaign: campaign.into(),
    }))
}

/// PUT /api/campaigns/{id}
pub async fn update_campaign<R>(
    State(state): State<PromotionAppState<R>>,
    Path(id): Path<String>,
    Json(req): Json<CampaignRequest>,
) -> PromotionResult<Json<CampaignEnvelope>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CampaignAdminUseCase::new(state.repo.clone());
    let campaign = use_case.update(&id, req.into(), Utc::now()).await?;

    Ok(Json(CampaignEnvelope {
        campaign: campaign.into(),
    }))
}

/// DELETE /api/campaigns/{id}
pub async fn delete_campaign<R>(
    State(state): State<PromotionAppState<R>>,
    Path(id): Path<String>,
) -> PromotionResult<StatusCode>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CampaignAdminUseCase::new(state.repo.clone());
    use_case.delete(&id, Utc::now()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/campaigns/active
pub async fn list_active_campaigns<R>(
    State(state): State<PromotionAppState<R>>,
) -> PromotionResult<Json<CampaignListResponse>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CampaignAdminUseCase::new(state.repo.clone());
    let campaigns = use_case.list_active(Utc::now()).await?;

    Ok(Json(CampaignListResponse {
        campaigns: campaigns.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/campaigns/type/{type}
pub async fn list_campaigns_by_type<R>(
    State(state): State<PromotionAppState<R>>,
    Path(campaign_type): Path<String>,
) -> PromotionResult<Json<CampaignListResponse>>
where
    R: CouponRepository + CampaignRepository + Clone + Send + Sync + 'static,
{
    let use_case = CampaignAdminUseCase::new(state.repo.clone());
    let campaigns = use_case.list_by_type(&campaign_type).await?;

    Ok(Json(CampaignListResponse {
        campaigns: campaigns.into_iter().map(Into::into).collect(),
    }))
}
