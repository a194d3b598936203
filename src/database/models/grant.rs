use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Beneficiary, UnknownValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    Granted,
    Delivered,
    Voided,
}

impl GrantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Granted => "GRANTED",
            GrantStatus::Delivered => "DELIVERED",
            GrantStatus::Voided => "VOIDED",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownValue> {
        match value {
            "GRANTED" => Ok(GrantStatus::Granted),
            "DELIVERED" => Ok(GrantStatus::Delivered),
            "VOIDED" => Ok(GrantStatus::Voided),
            other => Err(UnknownValue {
                field: "grant status",
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ledger record that one reward tier was unlocked for one beneficiary.
///
/// At most one non-voided grant may exist per (beneficiary, rule); that
/// invariant is enforced by partial unique indexes in the store, not just by
/// the evaluator's existence check.
#[derive(Debug, Clone, Serialize)]
pub struct RewardGrant {
    pub id: i64,
    pub guest_list_id: Option<i64>,
    pub promoter_id: Option<i64>,
    pub event_id: Option<i64>,
    pub rule_id: i64,
    pub status: GrantStatus,
    pub checkins_count: i64,
    pub granted_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl RewardGrant {
    /// Reconstruct the beneficiary this grant belongs to, if the row is
    /// well formed (exactly one of the two beneficiary shapes populated).
    pub fn beneficiary(&self) -> Option<Beneficiary> {
        match (self.guest_list_id, self.promoter_id, self.event_id) {
            (Some(guest_list_id), None, _) => Some(Beneficiary::AnniversaryList { guest_list_id }),
            (None, Some(promoter_id), Some(event_id)) => Some(Beneficiary::Promoter {
                promoter_id,
                event_id,
            }),
            _ => None,
        }
    }
}

/// Raw database row for a grant.
#[derive(Debug, sqlx::FromRow)]
pub struct GrantRow {
    pub id: i64,
    pub guest_list_id: Option<i64>,
    pub promoter_id: Option<i64>,
    pub event_id: Option<i64>,
    pub rule_id: i64,
    pub status: String,
    pub checkins_count: i64,
    pub granted_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl TryFrom<GrantRow> for RewardGrant {
    type Error = UnknownValue;

    fn try_from(row: GrantRow) -> Result<Self, Self::Error> {
        Ok(RewardGrant {
            id: row.id,
            guest_list_id: row.guest_list_id,
            promoter_id: row.promoter_id,
            event_id: row.event_id,
            rule_id: row.rule_id,
            status: GrantStatus::parse(&row.status)?,
            checkins_count: row.checkins_count,
            granted_at: row.granted_at,
            delivered_at: row.delivered_at,
        })
    }
}
