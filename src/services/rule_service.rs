use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use crate::database::models::rule::RuleRow;
use crate::database::models::{BeneficiaryKind, RewardRule, RuleStatus, UnknownValue};

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("{0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt rule row: {0}")]
    Corrupt(String),
}

impl From<UnknownValue> for RuleError {
    fn from(err: UnknownValue) -> Self {
        RuleError::Corrupt(err.to_string())
    }
}

#[derive(Debug, Deserialize)]
pub struct NewRule {
    pub establishment_id: i64,
    pub event_id: Option<i64>,
    pub promoter_id: Option<i64>,
    pub beneficiary_kind: Option<BeneficiaryKind>,
    pub threshold: i32,
    pub description: String,
    pub status: Option<RuleStatus>,
}

/// Partial update. `event_id`/`promoter_id` distinguish "absent" (leave
/// as-is) from "null" (clear the scope pin).
#[derive(Debug, Default, Deserialize)]
pub struct RuleUpdate {
    pub description: Option<String>,
    pub threshold: Option<i32>,
    pub status: Option<RuleStatus>,
    #[serde(default, deserialize_with = "present")]
    pub event_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub promoter_id: Option<Option<i64>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct RuleFilter {
    pub establishment_id: Option<i64>,
    pub event_id: Option<i64>,
}

/// How a delete request was honored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Grants reference the rule, so it was deactivated instead of removed.
    Deactivated,
}

const RULE_COLUMNS: &str = "id, establishment_id, event_id, promoter_id, beneficiary_kind, \
     threshold, description, status, created_at, updated_at";

/// Administrative CRUD over reward rules. Never touches grants: edits and
/// deactivations do not retroactively revoke anything the evaluator already
/// granted.
pub struct RuleService {
    pool: PgPool,
}

impl RuleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn validate_new(rule: &NewRule) -> Result<(), RuleError> {
        if rule.threshold < 1 {
            return Err(RuleError::Validation(
                "threshold must be a positive integer".to_string(),
            ));
        }
        if rule.description.trim().is_empty() {
            return Err(RuleError::Validation(
                "description must not be empty".to_string(),
            ));
        }
        let kind = rule
            .beneficiary_kind
            .unwrap_or(BeneficiaryKind::AnniversaryList);
        Self::validate_promoter_pin(kind, rule.promoter_id)
    }

    fn validate_promoter_pin(
        kind: BeneficiaryKind,
        promoter_id: Option<i64>,
    ) -> Result<(), RuleError> {
        if promoter_id.is_some() && kind != BeneficiaryKind::Promoter {
            return Err(RuleError::Validation(
                "promoter_id is only valid on PROMOTER rules".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, rule: NewRule) -> Result<RewardRule, RuleError> {
        Self::validate_new(&rule)?;

        let kind = rule
            .beneficiary_kind
            .unwrap_or(BeneficiaryKind::AnniversaryList);
        let status = rule.status.unwrap_or(RuleStatus::Active);

        let row: RuleRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO reward_rules
                (establishment_id, event_id, promoter_id, beneficiary_kind, threshold, description, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {RULE_COLUMNS}
            "#
        ))
        .bind(rule.establishment_id)
        .bind(rule.event_id)
        .bind(rule.promoter_id)
        .bind(kind.as_str())
        .bind(rule.threshold)
        .bind(rule.description.trim())
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(RewardRule::try_from(row)?)
    }

    /// List rules, optionally narrowed to an establishment and/or event.
    /// The event filter keeps establishment-wide (NULL event) rules in view,
    /// matching how the evaluator selects them.
    pub async fn list(&self, filter: RuleFilter) -> Result<Vec<RewardRule>, RuleError> {
        let rows: Vec<RuleRow> = sqlx::query_as(&format!(
            r#"
            SELECT {RULE_COLUMNS}
            FROM reward_rules
            WHERE ($1::bigint IS NULL OR establishment_id = $1)
              AND ($2::bigint IS NULL OR event_id = $2 OR event_id IS NULL)
            ORDER BY threshold ASC
            "#
        ))
        .bind(filter.establishment_id)
        .bind(filter.event_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| RewardRule::try_from(row).map_err(RuleError::from))
            .collect()
    }

    pub async fn get(&self, id: i64) -> Result<RewardRule, RuleError> {
        let row: Option<RuleRow> = sqlx::query_as(&format!(
            "SELECT {RULE_COLUMNS} FROM reward_rules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(RewardRule::try_from(row)?),
            None => Err(RuleError::NotFound(format!("rule {}", id))),
        }
    }

    pub async fn update(&self, id: i64, update: RuleUpdate) -> Result<RewardRule, RuleError> {
        if update.description.is_none()
            && update.threshold.is_none()
            && update.status.is_none()
            && update.event_id.is_none()
            && update.promoter_id.is_none()
        {
            return Err(RuleError::Validation("no fields to update".to_string()));
        }
        if let Some(threshold) = update.threshold {
            if threshold < 1 {
                return Err(RuleError::Validation(
                    "threshold must be a positive integer".to_string(),
                ));
            }
        }
        if let Some(description) = update.description.as_deref() {
            if description.trim().is_empty() {
                return Err(RuleError::Validation(
                    "description must not be empty".to_string(),
                ));
            }
        }
        // Pinning a promoter is subject to the same kind check as create;
        // clearing the pin (explicit null) is always allowed.
        if let Some(Some(promoter_id)) = update.promoter_id {
            let existing = self.get(id).await?;
            Self::validate_promoter_pin(existing.beneficiary_kind, Some(promoter_id))?;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE reward_rules SET ");
        let mut fields = builder.separated(", ");
        if let Some(description) = update.description {
            fields.push("description = ");
            fields.push_bind_unseparated(description.trim().to_string());
        }
        if let Some(threshold) = update.threshold {
            fields.push("threshold = ");
            fields.push_bind_unseparated(threshold);
        }
        if let Some(status) = update.status {
            fields.push("status = ");
            fields.push_bind_unseparated(status.as_str());
        }
        if let Some(event_id) = update.event_id {
            fields.push("event_id = ");
            fields.push_bind_unseparated(event_id);
        }
        if let Some(promoter_id) = update.promoter_id {
            fields.push("promoter_id = ");
            fields.push_bind_unseparated(promoter_id);
        }
        fields.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {RULE_COLUMNS}"));

        let row: Option<RuleRow> = builder
            .build_query_as()
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(RewardRule::try_from(row)?),
            None => Err(RuleError::NotFound(format!("rule {}", id))),
        }
    }

    /// Remove a rule, or deactivate it when any grant references it: grant
    /// history must keep resolving to the rule it was earned under.
    pub async fn delete(&self, id: i64) -> Result<DeleteOutcome, RuleError> {
        let (referenced,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM reward_grants WHERE rule_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if referenced {
            let updated: Option<(i64,)> = sqlx::query_as(
                "UPDATE reward_rules SET status = 'INACTIVE', updated_at = NOW() WHERE id = $1 RETURNING id",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

            return match updated {
                Some(_) => Ok(DeleteOutcome::Deactivated),
                None => Err(RuleError::NotFound(format!("rule {}", id))),
            };
        }

        let deleted: Option<(i64,)> =
            sqlx::query_as("DELETE FROM reward_rules WHERE id = $1 RETURNING id")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match deleted {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Err(RuleError::NotFound(format!("rule {}", id))),
        }
    }
}
