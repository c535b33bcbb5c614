//! API DTOs (Data Transfer Objects)
//!
//! Field names are snake_case on the wire.

use chrono::{DateTime, Utc};
use kernel::id::{CampaignId, CouponId};
use serde::{Deserialize, Serialize};

use crate::application::{CampaignInput, CouponInput};
use crate::domain::entities::{Campaign, Coupon};

fn default_true() -> bool {
    true
}

/// Request for POST /api/coupons/validate
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub purchase_amount: f64,
}

/// Response for POST /api/coupons/validate
#[derive(Debug, Clone, Serialize)]
pub struct ValidateCouponResponse {
    pub coupon: CouponResponse,
    pub discount: f64,
}

/// Request for POST /api/campaigns/apply
#[derive(Debug, Clone, Deserialize)]
pub struct ApplyCampaignRequest {
    pub campaign_id: String,
    pub user_id: String,
    pub purchase_amount: f64,
}

/// Response for POST /api/campaigns/apply
#[derive(Debug, Clone, Serialize)]
pub struct ApplyCampaignResponse {
    pub campaign_id: CampaignId,
    pub campaign_type: String,
    pub result: f64,
}

/// Administrator-editable coupon fields, shared by create and update
#[derive(Debug, Clone, Deserialize)]
pub struct CouponTermsRequest {
    #[serde(default)]
    pub description: String,
    pub discount: f64,
    #[serde(rename = "type")]
    pub discount_type: String,
    #[serde(default)]
    pub min_purchase: f64,
    #[serde(default)]
    pub max_discount: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub usage_limit: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<CouponTermsRequest> for CouponInput {
    fn from(req: CouponTermsRequest) -> Self {
        CouponInput {
            description: req.description,
            discount: req.discount,
            discount_type: req.discount_type,
            min_purchase: req.min_purchase,
            max_discount: req.max_discount,
            start_date: req.start_date,
            end_date: req.end_date,
            usage_limit: req.usage_limit,
            is_active: req.is_active,
        }
    }
}

/// Request for POST /api/coupons
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCouponRequest {
    pub code: String,
    #[serde(flatten)]
    pub terms: CouponTermsRequest,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponResponse {
    pub id: CouponId,
    pub code: String,
    pub description: String,
    pub discount: f64,
    #[serde(rename = "type")]
    pub discount_type: String,
    pub min_purchase: f64,
    pub max_discount: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: u32,
    pub used_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Coupon> for CouponResponse {
    fn from(coupon: Coupon) -> Self {
        CouponResponse {
            id: coupon.id,
            code: coupon.code.as_str().to_string(),
            description: coupon.description,
            discount: coupon.discount,
            discount_type: coupon.kind.as_str().to_string(),
            min_purchase: coupon.min_purchase,
            max_discount: coupon.max_discount,
            start_date: coupon.start_date,
            end_date: coupon.end_date,
            usage_limit: coupon.usage_limit,
            used_count: coupon.used_count,
            is_active: coupon.is_active,
            created_at: coupon.created_at,
            updated_at: coupon.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponEnvelope {
    pub coupon: CouponResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponListResponse {
    pub coupons: Vec<CouponResponse>,
}

/// Request for POST /api/campaigns and PUT /api/campaigns/{id}
///
/// `conditions` may be sent either as a JSON object or as a string
/// holding one.
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub campaign_type: String,
    pub value: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub conditions: Option<serde_json::Value>,
}

impl From<CampaignRequest> for CampaignInput {
    fn from(req: CampaignRequest) -> Self {
        let conditions = match req.conditions {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(raw)) => Some(raw),
            Some(other) => Some(other.to_string()),
        };

        CampaignInput {
            name: req.name,
            description: req.description,
            campaign_type: req.campaign_type,
            value: req.value,
            start_date: req.start_date,
            end_date: req.end_date,
            is_active: req.is_active,
            conditions,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignResponse {
    pub id: CampaignId,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub campaign_type: String,
    pub value: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub conditions: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        // Legacy rows may hold text that is not JSON; echo it back verbatim.
        let conditions = campaign.conditions.map(|raw| {
            serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
        });

        CampaignResponse {
            id: campaign.id,
            name: campaign.name,
            description: campaign.description,
            campaign_type: campaign.campaign_type,
            value: campaign.value,
            start_date: campaign.start_date,
            end_date: campaign.end_date,
            is_active: campaign.is_active,
            conditions,
            created_at: campaign.created_at,
            updated_at: campaign.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignEnvelope {
    pub campaign: CampaignResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<CampaignResponse>,
}

/// Response for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
