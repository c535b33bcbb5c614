//! Apply Campaign Use Case
//!
//! Campaigns carry no usage budget, so applying one never writes. The
//! decision is made against a single snapshot read, which keeps it
//! consistent even while an administrator is editing the campaign.

use chrono::{DateTime, Utc};
use kernel::id::CampaignId;
use std::sync::Arc;

use crate::domain::repository::CampaignRepository;
use crate::domain::services::evaluate_campaign;
use crate::domain::value_objects::PurchaseAmount;
use crate::error::{PromotionError, PromotionResult};

/// Input DTO for campaign application
#[derive(Debug, Clone)]
pub struct ApplyCampaignInput {
    pub campaign_id: String,
    pub user_id: String,
    pub purchase_amount: f64,
}

/// Output DTO for campaign application
#[derive(Debug, Clone)]
pub struct ApplyCampaignOutput {
    pub campaign_id: CampaignId,
    pub campaign_type: String,
    pub result: f64,
}

/// Apply Campaign Use Case
pub struct ApplyCampaignUseCase<R>
where
    R: CampaignRepository,
{
    campaign_repo: Arc<R>,
}

impl<R> ApplyCampaignUseCase<R>
where
    R: CampaignRepository,
{
    pub fn new(campaign_repo: Arc<R>) -> Self {
        Self { campaign_repo }
    }

    pub async fn execute(
        &self,
        input: ApplyCampaignInput,
        now: DateTime<Utc>,
    ) -> PromotionResult<ApplyCampaignOutput> {
        // A malformed id cannot name any campaign.
        let campaign_id: CampaignId = input
            .campaign_id
            .trim()
            .parse()
            .map_err(|_| PromotionError::CampaignNotFound)?;

        let user_id = input.user_id.trim();
        if user_id.is_empty() {
            return Err(PromotionError::Validation("user_id is required".to_string()));
        }

        let amount = PurchaseAmount::new(input.purchase_amount)?;

        let campaign = match self.campaign_repo.find_campaign(campaign_id).await {
            Err(err) if err.is_retryable() => {
                tracing::warn!(campaign_id = %campaign_id, error = %err, "Retrying campaign lookup");
                self.campaign_repo.find_campaign(campaign_id).await?
            }
            other => other?,
        }
        .ok_or(PromotionError::CampaignNotFound)?;

        let result = evaluate_campaign(&campaign, amount, now)?;

        tracing::info!(
            campaign_id = %campaign.id,
            campaign_type = %campaign.campaign_type,
            user_id = %user_id,
            result = result,
            "Campaign applied"
        );

        Ok(ApplyCampaignOutput {
            campaign_id: campaign.id,
            campaign_type: campaign.campaign_type,
            result,
        })
    }
}
