//! PostgreSQL Repository Implementations
//!
//! The usage increment is a single conditioned `UPDATE`: the row lock it
//! takes serialises concurrent redemptions of the same coupon, and the
//! `WHERE` clause re-checks capacity against the committed row.

use chrono::{DateTime, Utc};
use kernel::id::{CampaignId, CouponId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entities::{Campaign, CampaignTerms, Coupon, CouponTerms, DiscountKind};
use crate::domain::repository::{CampaignRepository, CouponRepository, UsageIncrement};
use crate::domain::value_objects::CouponCode;
use crate::error::{PromotionError, PromotionResult};

const UNIQUE_VIOLATION: &str = "23505";

const COUPON_COLUMNS: &str = r#"
    coupon_id,
    code,
    description,
    discount,
    discount_type,
    min_purchase,
    max_discount,
    start_date,
    end_date,
    usage_limit,
    used_count,
    is_active,
    created_at,
    updated_at
"#;

const CAMPAIGN_COLUMNS: &str = r#"
    campaign_id,
    name,
    description,
    campaign_type,
    value,
    start_date,
    end_date,
    is_active,
    conditions::TEXT AS conditions,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed promotion repository
#[derive(Clone)]
pub struct PgPromotionRepository {
    pool: PgPool,
}

impl PgPromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn limit_to_db(usage_limit: u32) -> PromotionResult<i32> {
    i32::try_from(usage_limit)
        .map_err(|_| PromotionError::Validation("usage_limit is too large".to_string()))
}

fn count_from_db(value: i32) -> u32 {
    u32::try_from(value).unwrap_or_default()
}

// ============================================================================
// Coupon Repository Implementation
// ============================================================================

impl CouponRepository for PgPromotionRepository {
    async fn find_by_code(&self, code: &CouponCode) -> PromotionResult<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 AND deleted_at IS NULL"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CouponRow::into_coupon).transpose()
    }

    async fn find_coupon(&self, id: CouponId) -> PromotionResult<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM coupons WHERE coupon_id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(CouponRow::into_coupon).transpose()
    }

    async fn conditional_increment_usage(
        &self,
        id: CouponId,
        expected_limit: u32,
    ) -> PromotionResult<UsageIncrement> {
        let expected_limit = limit_to_db(expected_limit)?;

        let used_count = sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1,
                updated_at = NOW()
            WHERE coupon_id = $1
              AND deleted_at IS NULL
              AND usage_limit = $2
              AND ($2 = 0 OR used_count < $2)
            RETURNING used_count
            "#,
        )
        .bind(id.into_uuid())
        .bind(expected_limit)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(used_count) = used_count {
            return Ok(UsageIncrement::Incremented {
                used_count: count_from_db(used_count),
            });
        }

        // Distinguish a lost capacity race from a concurrent delete.
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM coupons WHERE coupon_id = $1 AND deleted_at IS NULL)",
        )
        .bind(id.into_uuid())
        .fetch_one(&self.pool)
        .await?;

        if exists {
            tracing::debug!(coupon_id = %id, "Conditioned usage increment not applied");
            Ok(UsageIncrement::CapacityExceeded)
        } else {
            Ok(UsageIncrement::NotFound)
        }
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> PromotionResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO coupons (
                coupon_id,
                code,
                description,
                discount,
                discount_type,
                min_purchase,
                max_discount,
                start_date,
                end_date,
                usage_limit,
                used_count,
                is_active,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(coupon.id.into_uuid())
        .bind(coupon.code.as_str())
        .bind(&coupon.description)
        .bind(coupon.discount)
        .bind(coupon.kind.as_str())
        .bind(coupon.min_purchase)
        .bind(coupon.max_discount)
        .bind(coupon.start_date)
        .bind(coupon.end_date)
        .bind(limit_to_db(coupon.usage_limit)?)
        .bind(limit_to_db(coupon.used_count)?)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .bind(coupon.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(PromotionError::CodeTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_coupon(
        &self,
        id: CouponId,
        terms: &CouponTerms,
        now: DateTime<Utc>,
    ) -> PromotionResult<Option<Coupon>> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            r#"
            UPDATE coupons
            SET description = $2,
                discount = $3,
                discount_type = $4,
                min_purchase = $5,
                max_discount = $6,
                start_date = $7,
                end_date = $8,
                usage_limit = $9,
                is_active = $10,
                updated_at = $11
            WHERE coupon_id = $1
              AND deleted_at IS NULL
              AND ($9 = 0 OR used_count <= $9)
            RETURNING {COUPON_COLUMNS}
            "#
        ))
        .bind(id.into_uuid())
        .bind(&terms.description)
        .bind(terms.discount)
        .bind(terms.kind.as_str())
        .bind(terms.min_purchase)
        .bind(terms.max_discount)
        .bind(terms.start_date)
        .bind(terms.end_date)
        .bind(limit_to_db(terms.usage_limit)?)
        .bind(terms.is_active)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return row.into_coupon().map(Some);
        }

        // Distinguish a limit below the counted uses from a missing coupon.
        let used_count = sqlx::query_scalar::<_, i32>(
            "SELECT used_count FROM coupons WHERE coupon_id = $1 AND deleted_at IS NULL",
        )
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        match used_count {
            Some(used_count) => Err(PromotionError::usage_limit_below_count(count_from_db(
                used_count,
            ))),
            None => Ok(None),
        }
    }

    async fn soft_delete_coupon(&self, id: CouponId, now: DateTime<Utc>) -> PromotionResult<bool> {
        let affected = sqlx::query(
            "UPDATE coupons SET deleted_at = $2 WHERE coupon_id = $1 AND deleted_at IS NULL",
        )
        .bind(id.into_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn list_active_coupons(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Coupon>> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            r#"
            SELECT {COUPON_COLUMNS} FROM coupons
            WHERE deleted_at IS NULL AND is_active AND end_date > $1
            ORDER BY created_at
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CouponRow::into_coupon).collect()
    }
}

// ============================================================================
// Campaign Repository Implementation
// ============================================================================

impl CampaignRepository for PgPromotionRepository {
    async fn find_campaign(&self, id: CampaignId) -> PromotionResult<Option<Campaign>> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE campaign_id = $1 AND deleted_at IS NULL"
        ))
        .bind(id.into_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CampaignRow::into_campaign))
    }

    async fn insert_campaign(&self, campaign: &Campaign) -> PromotionResult<()> {
        sqlx::query(
            r#"
            INSERT INTO campaigns (
                campaign_id,
                name,
                description,
                campaign_type,
                value,
                start_date,
                end_date,
                is_active,
                conditions,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9::jsonb, $10, $11)
            "#,
        )
        .bind(campaign.id.into_uuid())
        .bind(&campaign.name)
        .bind(&campaign.description)
        .bind(&campaign.campaign_type)
        .bind(campaign.value)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .bind(campaign.is_active)
        .bind(campaign.conditions.as_deref())
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_campaign(
        &self,
        id: CampaignId,
        terms: &CampaignTerms,
        now: DateTime<Utc>,
    ) -> PromotionResult<Option<Campaign>> {
        let row = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            UPDATE campaigns
            SET name = $2,
                description = $3,
                campaign_type = $4,
                value = $5,
                start_date = $6,
                end_date = $7,
                is_active = $8,
                conditions = $9::jsonb,
                updated_at = $10
            WHERE campaign_id = $1 AND deleted_at IS NULL
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        ))
        .bind(id.into_uuid())
        .bind(&terms.name)
        .bind(&terms.description)
        .bind(terms.campaign_type.as_str())
        .bind(terms.value)
        .bind(terms.start_date)
        .bind(terms.end_date)
        .bind(terms.is_active)
        .bind(terms.conditions.as_deref())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CampaignRow::into_campaign))
    }

    async fn soft_delete_campaign(
        &self,
        id: CampaignId,
        now: DateTime<Utc>,
    ) -> PromotionResult<bool> {
        let affected = sqlx::query(
            "UPDATE campaigns SET deleted_at = $2 WHERE campaign_id = $1 AND deleted_at IS NULL",
        )
        .bind(id.into_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    async fn list_active_campaigns(&self, now: DateTime<Utc>) -> PromotionResult<Vec<Campaign>> {
        let rows = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS} FROM campaigns
            WHERE deleted_at IS NULL AND is_active AND end_date > $1
            ORDER BY created_at
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CampaignRow::into_campaign).collect())
    }

    async fn list_campaigns_by_type(&self, campaign_type: &str) -> PromotionResult<Vec<Campaign>> {
        let rows = sqlx::query_as::<_, CampaignRow>(&format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS} FROM campaigns
            WHERE deleted_at IS NULL AND campaign_type = $1
            ORDER BY created_at
            "#
        ))
        .bind(campaign_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CampaignRow::into_campaign).collect())
    }
}

// Internal row types for sqlx mapping
#[derive(sqlx::FromRow)]
struct CouponRow {
    coupon_id: Uuid,
    code: String,
    description: String,
    discount: f64,
    discount_type: String,
    min_purchase: f64,
    max_discount: f64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    usage_limit: i32,
    used_count: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CouponRow {
    fn into_coupon(self) -> PromotionResult<Coupon> {
        let kind: DiscountKind = self.discount_type.parse().map_err(|t| {
            PromotionError::Internal(format!("stored coupon has unknown discount type '{t}'"))
        })?;
        let code = CouponCode::new(&self.code).map_err(|_| {
            PromotionError::Internal(format!("stored coupon code '{}' is malformed", self.code))
        })?;

        Ok(Coupon {
            id: CouponId::from_uuid(self.coupon_id),
            code,
            description: self.description,
            discount: self.discount,
            kind,
            min_purchase: self.min_purchase,
            max_discount: self.max_discount,
            start_date: self.start_date,
            end_date: self.end_date,
            usage_limit: count_from_db(self.usage_limit),
            used_count: count_from_db(self.used_count),
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CampaignRow {
    campaign_id: Uuid,
    name: String,
    description: String,
    campaign_type: String,
    value: f64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    conditions: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CampaignRow {
    fn into_campaign(self) -> Campaign {
        Campaign {
            id: CampaignId::from_uuid(self.campaign_id),
            name: self.name,
            description: self.description,
            campaign_type: self.campaign_type,
            value: self.value,
            start_date: self.start_date,
            end_date: self.end_date,
            is_active: self.is_active,
            conditions: self.conditions,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
