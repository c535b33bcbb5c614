//! Domain Value Objects
//!
//! Immutable, validated inputs to the redemption rules.

use std::fmt;

use crate::error::{PromotionError, PromotionResult};

/// Coupon code as entered by the customer
///
/// Codes are compared exactly (case-sensitive); surrounding whitespace is
/// stripped because it is never part of a printed code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CouponCode(String);

impl CouponCode {
    pub const MAX_LEN: usize = 64;

    pub fn new(raw: impl AsRef<str>) -> PromotionResult<Self> {
        let code = raw.as_ref().trim();
        if code.is_empty() {
            return Err(PromotionError::Validation(
                "coupon code must not be empty".to_string(),
            ));
        }
        if code.chars().count() > Self::MAX_LEN {
            return Err(PromotionError::Validation(format!(
                "coupon code must be at most {} characters",
                Self::MAX_LEN
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Purchase amount a promotion is applied against
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct PurchaseAmount(f64);

impl PurchaseAmount {
    pub fn new(amount: f64) -> PromotionResult<Self> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(PromotionError::Validation(
                "purchase amount must be a non-negative number".to_string(),
            ));
        }
        Ok(Self(amount))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Parsed campaign eligibility predicates
///
/// Keys other than the ones listed here are carried by campaigns for
/// display purposes and do not affect eligibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignConditions {
    pub min_purchase: Option<f64>,
}

impl CampaignConditions {
    pub fn is_met_by(&self, amount: PurchaseAmount) -> bool {
        self.min_purchase
            .is_none_or(|min| amount.value() >= min)
    }
}
