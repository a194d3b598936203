use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::database::models::{Beneficiary, GrantStatus, RewardGrant, RewardRule};

use super::criteria::RuleCriteria;
use super::error::RewardError;

/// Resolution of a guest-list beneficiary. `establishment_id` can be absent
/// when the list's reservation linkage is broken; the evaluator turns that
/// into `InvalidState`.
#[derive(Debug, Clone, Copy)]
pub struct GuestListContext {
    pub establishment_id: Option<i64>,
    pub event_id: Option<i64>,
}

/// Resolution of a promoter+event beneficiary. `event_date` is the event's
/// calendar date in the venue's time zone; when the event has no date, the
/// check-in count is unfiltered.
#[derive(Debug, Clone, Copy)]
pub struct PromoterEventContext {
    pub establishment_id: Option<i64>,
    pub event_date: Option<NaiveDate>,
}

/// Result of a grant insert. The duplicate case is decided by the store's
/// uniqueness constraint, so two racing evaluations cannot both insert.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(RewardGrant),
    AlreadyGranted,
}

/// Result of the GRANTED -> DELIVERED transition.
#[derive(Debug)]
pub enum DeliverOutcome {
    Delivered(RewardGrant),
    /// The grant exists but is not in GRANTED (already delivered, or voided).
    NotGranted(GrantStatus),
    Missing,
}

/// A non-voided grant joined with its rule, as shown to staff.
#[derive(Debug, Clone, Serialize)]
pub struct GrantedGift {
    pub id: i64,
    pub rule_id: i64,
    pub status: GrantStatus,
    pub checkins_count: i64,
    pub granted_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub description: String,
    pub threshold: i32,
}

/// The engine's only view of the datastore.
///
/// Implemented by `PgRewardStore` in production and by the in-memory fake in
/// tests; the evaluator's semantics must not depend on which one it talks to.
#[async_trait]
pub trait RewardStore: Send + Sync {
    async fn guest_list_context(
        &self,
        guest_list_id: i64,
    ) -> Result<Option<GuestListContext>, RewardError>;

    async fn promoter_event_context(
        &self,
        promoter_id: i64,
        event_id: i64,
    ) -> Result<Option<PromoterEventContext>, RewardError>;

    /// Distinct guests on the list whose check-in is confirmed, either by
    /// staff or by a validated geolocation self-check-in.
    async fn count_guest_list_checkins(&self, guest_list_id: i64) -> Result<i64, RewardError>;

    /// Distinct confirmed guests across the promoter's lists for the event.
    /// With `on_date` set, only check-ins whose timestamp falls on that
    /// calendar date in the venue's time zone are counted.
    async fn count_promoter_checkins(
        &self,
        promoter_id: i64,
        event_id: i64,
        on_date: Option<NaiveDate>,
    ) -> Result<i64, RewardError>;

    /// Active rules matching the criteria, already in evaluation order.
    async fn active_rules(&self, criteria: &RuleCriteria) -> Result<Vec<RewardRule>, RewardError>;

    /// Insert a GRANTED row unless a non-voided grant for this
    /// (beneficiary, rule) already exists.
    async fn insert_grant(
        &self,
        beneficiary: Beneficiary,
        rule_id: i64,
        checkins_count: i64,
    ) -> Result<InsertOutcome, RewardError>;

    /// Non-voided grants for the beneficiary, newest first.
    async fn grants_for(&self, beneficiary: Beneficiary) -> Result<Vec<GrantedGift>, RewardError>;

    async fn deliver_grant(&self, grant_id: i64) -> Result<DeliverOutcome, RewardError>;
}
