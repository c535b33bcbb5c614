//! Domain Entities
//!
//! Coupons and campaigns share one lifecycle: created by an administrator,
//! read by the redemption path, soft-deleted by an administrator.

use chrono::{DateTime, Utc};
use kernel::id::{CampaignId, CouponId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::value_objects::CouponCode;

/// How a coupon's `discount` value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `discount` is a percentage of the purchase, capped by `max_discount`
    Percentage,
    /// `discount` is an absolute amount
    Fixed,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "percentage",
            DiscountKind::Fixed => "fixed",
        }
    }
}

impl FromStr for DiscountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(DiscountKind::Percentage),
            "fixed" => Ok(DiscountKind::Fixed),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrator-controlled coupon fields
#[derive(Debug, Clone, PartialEq)]
pub struct CouponTerms {
    pub description: String,
    pub discount: f64,
    pub kind: DiscountKind,
    pub min_purchase: f64,
    /// `0` means uncapped
    pub max_discount: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// `0` means unlimited
    pub usage_limit: u32,
    pub is_active: bool,
}

/// Coupon entity
#[derive(Debug, Clone, PartialEq)]
pub struct Coupon {
    pub id: CouponId,
    pub code: CouponCode,
    pub description: String,
    pub discount: f64,
    pub kind: DiscountKind,
    pub min_purchase: f64,
    pub max_discount: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit: u32,
    /// Written only by the redemption ledger
    pub used_count: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// Create a fresh, never-redeemed coupon
    pub fn new(code: CouponCode, terms: CouponTerms, now: DateTime<Utc>) -> Self {
        Self {
            id: CouponId::new(),
            code,
            description: terms.description,
            discount: terms.discount,
            kind: terms.kind,
            min_purchase: terms.min_purchase,
            max_discount: terms.max_discount,
            start_date: terms.start_date,
            end_date: terms.end_date,
            usage_limit: terms.usage_limit,
            used_count: 0,
            is_active: terms.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the administrator-controlled fields. Code and usage are untouched.
    pub fn apply_terms(&mut self, terms: &CouponTerms, now: DateTime<Utc>) {
        self.description = terms.description.clone();
        self.discount = terms.discount;
        self.kind = terms.kind;
        self.min_purchase = terms.min_purchase;
        self.max_discount = terms.max_discount;
        self.start_date = terms.start_date;
        self.end_date = terms.end_date;
        self.usage_limit = terms.usage_limit;
        self.is_active = terms.is_active;
        self.updated_at = now;
    }

    pub fn is_unlimited(&self) -> bool {
        self.usage_limit == 0
    }

    /// Whether at least one more redemption fits under the usage limit
    pub fn has_capacity(&self) -> bool {
        self.is_unlimited() || self.used_count < self.usage_limit
    }

    /// `None` for unlimited coupons
    pub fn remaining_uses(&self) -> Option<u32> {
        (!self.is_unlimited()).then(|| self.usage_limit.saturating_sub(self.used_count))
    }
}

/// Campaign types understood by the application rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    PointsMultiplier,
    SpecialOffer,
    BonusPoints,
}

impl CampaignType {
    pub const ALL: [CampaignType; 3] = [
        CampaignType::PointsMultiplier,
        CampaignType::SpecialOffer,
        CampaignType::BonusPoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignType::PointsMultiplier => "points_multiplier",
            CampaignType::SpecialOffer => "special_offer",
            CampaignType::BonusPoints => "bonus_points",
        }
    }
}

impl FromStr for CampaignType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CampaignType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for CampaignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrator-controlled campaign fields
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignTerms {
    pub name: String,
    pub description: String,
    pub campaign_type: CampaignType,
    pub value: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// Raw JSON object text, e.g. `{"min_purchase": 50}`
    pub conditions: Option<String>,
}

/// Campaign entity
///
/// `campaign_type` is kept as the stored tag: rows written by older releases
/// may carry tags this build does not know, and those must surface as
/// `UnknownPromotionType` at application time rather than fail every read.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub description: String,
    pub campaign_type: String,
    pub value: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub conditions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(terms: CampaignTerms, now: DateTime<Utc>) -> Self {
        Self {
            id: CampaignId::new(),
            name: terms.name,
            description: terms.description,
            campaign_type: terms.campaign_type.as_str().to_string(),
            value: terms.value,
            start_date: terms.start_date,
            end_date: terms.end_date,
            is_active: terms.is_active,
            conditions: terms.conditions,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply_terms(&mut self, terms: &CampaignTerms, now: DateTime<Utc>) {
        self.name = terms.name.clone();
        self.description = terms.description.clone();
        self.campaign_type = terms.campaign_type.as_str().to_string();
        self.value = terms.value;
        self.start_date = terms.start_date;
        self.end_date = terms.end_date;
        self.is_active = terms.is_active;
        self.conditions = terms.conditions.clone();
        self.updated_at = now;
    }
}
