//! Domain Services
//!
//! Pure eligibility and pricing rules. No I/O, no clock: `now` is always passed in.

use chrono::{DateTime, Utc};

use crate::domain::entities::{Campaign, CampaignType, Coupon, DiscountKind};
use crate::domain::value_objects::{CampaignConditions, PurchaseAmount};
use crate::error::{PromotionError, PromotionResult};

/// Validity windows are half-open: `start` is inside, `end` is not.
pub fn is_within_window(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    start <= now && now < end
}

/// Check a coupon snapshot, in order: active, window, capacity, minimum purchase.
pub fn check_coupon_eligibility(
    coupon: &Coupon,
    amount: PurchaseAmount,
    now: DateTime<Utc>,
) -> PromotionResult<()> {
    if !coupon.is_active {
        return Err(PromotionError::Inactive);
    }
    if !is_within_window(coupon.start_date, coupon.end_date, now) {
        return Err(PromotionError::Expired);
    }
    if !coupon.has_capacity() {
        return Err(PromotionError::LimitReached);
    }
    if amount.value() < coupon.min_purchase {
        return Err(PromotionError::MinPurchaseNotMet {
            required: coupon.min_purchase,
        });
    }
    Ok(())
}

/// Discount granted by `coupon` on `amount`
///
/// Percentage discounts are capped at `max_discount` when it is non-zero;
/// fixed discounts are never capped.
pub fn compute_discount(coupon: &Coupon, amount: PurchaseAmount) -> f64 {
    match coupon.kind {
        DiscountKind::Percentage => {
            let discount = amount.value() * (coupon.discount / 100.0);
            if coupon.max_discount > 0.0 && discount > coupon.max_discount {
                coupon.max_discount
            } else {
                discount
            }
        }
        DiscountKind::Fixed => coupon.discount,
    }
}

/// Parse the raw conditions payload. Absent or blank means "no conditions".
pub fn parse_conditions(raw: Option<&str>) -> PromotionResult<CampaignConditions> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(CampaignConditions::default());
    };

    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| PromotionError::InvalidConditions(e.to_string()))?;
    let object = value.as_object().ok_or_else(|| {
        PromotionError::InvalidConditions("conditions must be a JSON object".to_string())
    })?;

    let min_purchase = match object.get("min_purchase") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => Some(v.as_f64().ok_or_else(|| {
            PromotionError::InvalidConditions("min_purchase must be a number".to_string())
        })?),
    };

    Ok(CampaignConditions { min_purchase })
}

/// Evaluate a campaign snapshot: active, window, conditions, then type dispatch.
pub fn evaluate_campaign(
    campaign: &Campaign,
    amount: PurchaseAmount,
    now: DateTime<Utc>,
) -> PromotionResult<f64> {
    if !campaign.is_active {
        return Err(PromotionError::Inactive);
    }
    if !is_within_window(campaign.start_date, campaign.end_date, now) {
        return Err(PromotionError::Expired);
    }

    let conditions = parse_conditions(campaign.conditions.as_deref())?;
    if !conditions.is_met_by(amount) {
        return Err(PromotionError::MinPurchaseNotMet {
            required: conditions.min_purchase.unwrap_or_default(),
        });
    }

    let campaign_type: CampaignType = campaign
        .campaign_type
        .parse()
        .map_err(PromotionError::UnknownPromotionType)?;

    Ok(match campaign_type {
        CampaignType::PointsMultiplier => amount.value() * campaign.value,
        CampaignType::SpecialOffer | CampaignType::BonusPoints => campaign.value,
    })
}
