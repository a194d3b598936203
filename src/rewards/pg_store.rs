use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use sqlx::PgPool;

use crate::database::models::grant::GrantRow;
use crate::database::models::rule::RuleRow;
use crate::database::models::{Beneficiary, GrantStatus, RewardGrant, RewardRule};

use super::criteria::RuleCriteria;
use super::error::RewardError;
use super::store::{
    DeliverOutcome, GrantedGift, GuestListContext, InsertOutcome, PromoterEventContext, RewardStore,
};

/// Postgres-backed reward store. All queries are parameterized; the
/// uniqueness invariant rides on the partial unique indexes declared in
/// `migrations/0001_rewards.sql`, with insert conflicts reported as
/// `AlreadyGranted`.
pub struct PgRewardStore {
    pool: PgPool,
    venue_tz: Tz,
}

impl PgRewardStore {
    pub fn new(pool: PgPool, venue_tz: Tz) -> Self {
        Self { pool, venue_tz }
    }
}

const GRANT_COLUMNS: &str =
    "id, guest_list_id, promoter_id, event_id, rule_id, status, checkins_count, granted_at, delivered_at";

#[derive(Debug, sqlx::FromRow)]
struct GiftRow {
    id: i64,
    rule_id: i64,
    status: String,
    checkins_count: i64,
    granted_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
    description: String,
    threshold: i32,
}

impl TryFrom<GiftRow> for GrantedGift {
    type Error = RewardError;

    fn try_from(row: GiftRow) -> Result<Self, Self::Error> {
        Ok(GrantedGift {
            id: row.id,
            rule_id: row.rule_id,
            status: GrantStatus::parse(&row.status)?,
            checkins_count: row.checkins_count,
            granted_at: row.granted_at,
            delivered_at: row.delivered_at,
            description: row.description,
            threshold: row.threshold,
        })
    }
}

#[async_trait]
impl RewardStore for PgRewardStore {
    async fn guest_list_context(
        &self,
        guest_list_id: i64,
    ) -> Result<Option<GuestListContext>, RewardError> {
        let row: Option<(Option<i64>, Option<i64>)> =
            sqlx::query_as("SELECT establishment_id, event_id FROM guest_lists WHERE id = $1")
                .bind(guest_list_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(establishment_id, event_id)| GuestListContext {
            establishment_id,
            event_id,
        }))
    }

    async fn promoter_event_context(
        &self,
        promoter_id: i64,
        event_id: i64,
    ) -> Result<Option<PromoterEventContext>, RewardError> {
        let row: Option<(Option<i64>, Option<NaiveDate>)> = sqlx::query_as(
            r#"
            SELECT e.establishment_id, e.event_date
            FROM promoter_events pe
            JOIN events e ON e.id = pe.event_id
            WHERE pe.promoter_id = $1 AND pe.event_id = $2
            "#,
        )
        .bind(promoter_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(establishment_id, event_date)| PromoterEventContext {
            establishment_id,
            event_date,
        }))
    }

    async fn count_guest_list_checkins(&self, guest_list_id: i64) -> Result<i64, RewardError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT g.id)
            FROM guests g
            WHERE g.guest_list_id = $1
              AND (g.checked_in = TRUE OR g.geo_checkin_confirmed = TRUE)
            "#,
        )
        .bind(guest_list_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn count_promoter_checkins(
        &self,
        promoter_id: i64,
        event_id: i64,
        on_date: Option<NaiveDate>,
    ) -> Result<i64, RewardError> {
        // The date filter interprets the stored instant in the venue's civil
        // time zone before taking its calendar date; a NULL date disables it.
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT g.id)
            FROM guests g
            JOIN guest_lists gl ON gl.id = g.guest_list_id
            WHERE gl.promoter_id = $1
              AND gl.event_id = $2
              AND (g.checked_in = TRUE OR g.geo_checkin_confirmed = TRUE)
              AND (
                $3::date IS NULL
                OR (g.checked_in_at AT TIME ZONE $4)::date = $3::date
              )
            "#,
        )
        .bind(promoter_id)
        .bind(event_id)
        .bind(on_date)
        .bind(self.venue_tz.name())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn active_rules(&self, criteria: &RuleCriteria) -> Result<Vec<RewardRule>, RewardError> {
        // Same predicate as RuleCriteria::matches, same order as
        // RuleCriteria::sort_for_evaluation.
        let rows: Vec<RuleRow> = sqlx::query_as(
            r#"
            SELECT id, establishment_id, event_id, promoter_id, beneficiary_kind,
                   threshold, description, status, created_at, updated_at
            FROM reward_rules
            WHERE establishment_id = $1
              AND beneficiary_kind = $2
              AND status = 'ACTIVE'
              AND (event_id IS NULL OR event_id = $3)
              AND ($4::bigint IS NULL OR promoter_id IS NULL OR promoter_id = $4)
            ORDER BY threshold ASC, (promoter_id IS NULL) ASC
            "#,
        )
        .bind(criteria.establishment_id)
        .bind(criteria.kind.as_str())
        .bind(criteria.event_id)
        .bind(criteria.promoter_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| RewardRule::try_from(row).map_err(RewardError::from))
            .collect()
    }

    async fn insert_grant(
        &self,
        beneficiary: Beneficiary,
        rule_id: i64,
        checkins_count: i64,
    ) -> Result<InsertOutcome, RewardError> {
        let row: Option<GrantRow> = match beneficiary {
            Beneficiary::AnniversaryList { guest_list_id } => {
                sqlx::query_as(&format!(
                    r#"
                    INSERT INTO reward_grants (guest_list_id, rule_id, status, checkins_count)
                    VALUES ($1, $2, 'GRANTED', $3)
                    ON CONFLICT (guest_list_id, rule_id) WHERE status <> 'VOIDED' DO NOTHING
                    RETURNING {GRANT_COLUMNS}
                    "#
                ))
                .bind(guest_list_id)
                .bind(rule_id)
                .bind(checkins_count)
                .fetch_optional(&self.pool)
                .await?
            }
            Beneficiary::Promoter {
                promoter_id,
                event_id,
            } => {
                sqlx::query_as(&format!(
                    r#"
                    INSERT INTO reward_grants (promoter_id, event_id, rule_id, status, checkins_count)
                    VALUES ($1, $2, $3, 'GRANTED', $4)
                    ON CONFLICT (promoter_id, event_id, rule_id) WHERE status <> 'VOIDED' DO NOTHING
                    RETURNING {GRANT_COLUMNS}
                    "#
                ))
                .bind(promoter_id)
                .bind(event_id)
                .bind(rule_id)
                .bind(checkins_count)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match row {
            Some(row) => Ok(InsertOutcome::Inserted(RewardGrant::try_from(row)?)),
            None => Ok(InsertOutcome::AlreadyGranted),
        }
    }

    async fn grants_for(&self, beneficiary: Beneficiary) -> Result<Vec<GrantedGift>, RewardError> {
        let rows: Vec<GiftRow> = match beneficiary {
            Beneficiary::AnniversaryList { guest_list_id } => {
                sqlx::query_as(
                    r#"
                    SELECT g.id, g.rule_id, g.status, g.checkins_count, g.granted_at,
                           g.delivered_at, r.description, r.threshold
                    FROM reward_grants g
                    JOIN reward_rules r ON r.id = g.rule_id
                    WHERE g.guest_list_id = $1 AND g.status <> 'VOIDED'
                    ORDER BY g.granted_at DESC
                    "#,
                )
                .bind(guest_list_id)
                .fetch_all(&self.pool)
                .await?
            }
            Beneficiary::Promoter {
                promoter_id,
                event_id,
            } => {
                sqlx::query_as(
                    r#"
                    SELECT g.id, g.rule_id, g.status, g.checkins_count, g.granted_at,
                           g.delivered_at, r.description, r.threshold
                    FROM reward_grants g
                    JOIN reward_rules r ON r.id = g.rule_id
                    WHERE g.promoter_id = $1 AND g.event_id = $2 AND g.status <> 'VOIDED'
                    ORDER BY g.granted_at DESC
                    "#,
                )
                .bind(promoter_id)
                .bind(event_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(GrantedGift::try_from).collect()
    }

    async fn deliver_grant(&self, grant_id: i64) -> Result<DeliverOutcome, RewardError> {
        let updated: Option<GrantRow> = sqlx::query_as(&format!(
            r#"
            UPDATE reward_grants
            SET status = 'DELIVERED', delivered_at = NOW()
            WHERE id = $1 AND status = 'GRANTED'
            RETURNING {GRANT_COLUMNS}
            "#
        ))
        .bind(grant_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(DeliverOutcome::Delivered(RewardGrant::try_from(row)?));
        }

        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM reward_grants WHERE id = $1")
                .bind(grant_id)
                .fetch_optional(&self.pool)
                .await?;

        match status {
            Some((status,)) => Ok(DeliverOutcome::NotGranted(GrantStatus::parse(&status)?)),
            None => Ok(DeliverOutcome::Missing),
        }
    }
}
