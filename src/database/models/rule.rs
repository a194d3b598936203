use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UnknownValue;

/// Who a reward rule applies to: the anniversary guest list itself, or the
/// promoter responsible for the lists of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeneficiaryKind {
    AnniversaryList,
    Promoter,
}

impl BeneficiaryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeneficiaryKind::AnniversaryList => "ANNIVERSARY_LIST",
            BeneficiaryKind::Promoter => "PROMOTER",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        match value {
            "ANNIVERSARY_LIST" => Ok(BeneficiaryKind::AnniversaryList),
            "PROMOTER" => Ok(BeneficiaryKind::Promoter),
            other => Err(UnknownValue {
                field: "beneficiary_kind",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    Active,
    Inactive,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Active => "ACTIVE",
            RuleStatus::Inactive => "INACTIVE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        match value {
            "ACTIVE" => Ok(RuleStatus::Active),
            "INACTIVE" => Ok(RuleStatus::Inactive),
            other => Err(UnknownValue {
                field: "rule status",
                value: other.to_string(),
            }),
        }
    }
}

/// One configured reward tier: "after N confirmed check-ins, unlock X".
///
/// `event_id = None` means the rule applies to every event at the
/// establishment. For promoter rules, `promoter_id = None` means the rule
/// applies to every promoter there.
#[derive(Debug, Clone, Serialize)]
pub struct RewardRule {
    pub id: i64,
    pub establishment_id: i64,
    pub event_id: Option<i64>,
    pub promoter_id: Option<i64>,
    pub beneficiary_kind: BeneficiaryKind,
    pub threshold: i32,
    pub description: String,
    pub status: RuleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RewardRule {
    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }
}

/// Raw database row; statuses come back as TEXT and are mapped into the
/// domain enums by `TryFrom`.
#[derive(Debug, sqlx::FromRow)]
pub struct RuleRow {
    pub id: i64,
    pub establishment_id: i64,
    pub event_id: Option<i64>,
    pub promoter_id: Option<i64>,
    pub beneficiary_kind: String,
    pub threshold: i32,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RuleRow> for RewardRule {
    type Error = UnknownValue;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        Ok(RewardRule {
            id: row.id,
            establishment_id: row.establishment_id,
            event_id: row.event_id,
            promoter_id: row.promoter_id,
            beneficiary_kind: BeneficiaryKind::parse(&row.beneficiary_kind)?,
            threshold: row.threshold,
            description: row.description,
            status: RuleStatus::parse(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
