//! Campaign Administration Use Case

use chrono::{DateTime, Utc};
use kernel::id::CampaignId;
use std::sync::Arc;

use crate::domain::entities::{Campaign, CampaignTerms, CampaignType};
use crate::domain::repository::CampaignRepository;
use crate::domain::services::parse_conditions;
use crate::error::{PromotionError, PromotionResult};

/// Administrator-supplied campaign fields
#[derive(Debug, Clone)]
pub struct CampaignInput {
    pub name: String,
    pub description: String,
    pub campaign_type: String,
    pub value: f64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub conditions: Option<String>,
}

impl CampaignInput {
    fn into_terms(self) -> PromotionResult<CampaignTerms> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(PromotionError::Validation("name is required".to_string()));
        }

        let campaign_type: CampaignType = self
            .campaign_type
            .parse()
            .map_err(|t| PromotionError::Validation(format!("unknown campaign type '{t}'")))?;

        if self.start_date > self.end_date {
            return Err(PromotionError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
        if !self.value.is_finite() || self.value < 0.0 {
            return Err(PromotionError::Validation(
                "value must be a non-negative number".to_string(),
            ));
        }

        let conditions = self.conditions.filter(|raw| !raw.trim().is_empty());
        parse_conditions(conditions.as_deref())?;

        Ok(CampaignTerms {
            name,
            description: self.description,
            campaign_type,
            value: self.value,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            conditions,
        })
    }
}

fn parse_id(raw: &str) -> PromotionResult<CampaignId> {
    raw.trim().parse().map_err(|_| PromotionError::CampaignNotFound)
}

/// Campaign Administration Use Case
pub struct CampaignAdminUseCase<R>
where
    R: CampaignRepository,
{
    campaign_repo: Arc<R>,
}

impl<R> CampaignAdminUseCase<R>
where
    R: CampaignRepository,
{
    pub fn new(campaign_repo: Arc<R>) -> Self {
        Self { campaign_repo }
    }

    pub async fn create(&self, input: CampaignInput, now: DateTime<Utc>) -> PromotionResult<Campaign> {
        let campaign = Campaign::new(input.into_terms()?, now);

        self.campaign_repo.insert_campaign(&campaign).await?;

        tracing::info!(
            campaign_id = %campaign.id,
            campaign_type = %campaign.campaign_type,
            "Campaign created"
        );

        Ok(campaign)
    }

    pub async fn update(
        &self,
        id: &str,
        input: CampaignInput,
        now: DateTime<Utc>,
    ) -> PromotionResult<Campaign> {
        let id = parse_id(id)?;
        let terms = input.into_terms()?;

        let campaign = self
            .campaign_repo
            .update_campaign(id, &terms, now)
            .await?
            .ok_or(PromotionError::CampaignNotFound)?;

        tracing::info!(campaign_id = %campaign.id, "Campaign updated");

        Ok(campaign)
    }

    pub async fn get(&self, id: &str) -> PromotionResult<Campaign> {
        self.campaign_repo
            .find_campaign(parse_id(id)?)
            .await?
            .ok_or(PromotionError::CampaignNotFound)
    }

    pub async fn list_active(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Campaign>> {
        self.campaign_repo.list_active_campaigns(now).await
    }

    pub async fn list_by_type(&self, campaign_type: &str) -> PromotionResult<Vec<Campaign>> {
        let campaign_type: CampaignType = campaign_type
            .trim()
            .parse()
            .map_err(PromotionError::UnknownPromotionType)?;
        self.campaign_repo
            .list_campaigns_by_type(campaign_type.as_str())
            .await
    }

    pub async fn delete(&self, id: &str, now: DateTime<Utc>) -> PromotionResult<()> {
        let id = parse_id(id)?;
        if !self.campaign_repo.soft_delete_campaign(id, now).await? {
            return Err(PromotionError::CampaignNotFound);
        }

        tracing::info!(campaign_id = %id, "Campaign deleted");

        Ok(())
    }
}
