//! Test-only fakes and fixtures. Compiled for `cargo test` only.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::database::models::{
    Beneficiary, BeneficiaryKind, GrantStatus, RewardGrant, RewardRule, RuleStatus,
};
use crate::rewards::time::venue_local_date;
use crate::rewards::{
    DeliverOutcome, GrantedGift, GuestListContext, InsertOutcome, PromoterEventContext,
    RewardError, RewardStore, RuleCriteria,
};

#[derive(Debug, Clone)]
struct GuestListFixture {
    establishment_id: Option<i64>,
    event_id: Option<i64>,
    promoter_id: Option<i64>,
}

#[derive(Debug, Clone)]
struct GuestFixture {
    id: i64,
    guest_list_id: i64,
    checked_in: bool,
    geo_checkin_confirmed: bool,
    checked_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Inner {
    guest_lists: HashMap<i64, GuestListFixture>,
    promoter_events: HashMap<(i64, i64), PromoterEventFixture>,
    guests: Vec<GuestFixture>,
    rules: Vec<RewardRule>,
    grants: Vec<RewardGrant>,
    next_guest_id: i64,
    next_rule_id: i64,
    next_grant_id: i64,
}

#[derive(Debug, Clone, Copy)]
struct PromoterEventFixture {
    establishment_id: Option<i64>,
    event_date: Option<NaiveDate>,
}

/// In-memory `RewardStore` mirroring the Postgres store's semantics,
/// including the uniqueness constraint: `insert_grant` checks and inserts
/// under a single lock, so racing evaluations see exactly one winner.
pub struct MemoryRewardStore {
    inner: Mutex<Inner>,
    venue_tz: Tz,
}

impl MemoryRewardStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            venue_tz: chrono_tz::America::Sao_Paulo,
        }
    }

    pub fn add_guest_list(
        &self,
        id: i64,
        establishment_id: Option<i64>,
        event_id: Option<i64>,
        promoter_id: Option<i64>,
    ) {
        self.inner.lock().unwrap().guest_lists.insert(
            id,
            GuestListFixture {
                establishment_id,
                event_id,
                promoter_id,
            },
        );
    }

    pub fn add_promoter_event(
        &self,
        promoter_id: i64,
        event_id: i64,
        establishment_id: Option<i64>,
        event_date: Option<NaiveDate>,
    ) {
        self.inner.lock().unwrap().promoter_events.insert(
            (promoter_id, event_id),
            PromoterEventFixture {
                establishment_id,
                event_date,
            },
        );
    }

    fn push_guest(
        &self,
        guest_list_id: i64,
        checked_in: bool,
        geo: bool,
        checked_in_at: Option<DateTime<Utc>>,
    ) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_guest_id += 1;
        let id = inner.next_guest_id;
        inner.guests.push(GuestFixture {
            id,
            guest_list_id,
            checked_in,
            geo_checkin_confirmed: geo,
            checked_in_at,
        });
        id
    }

    /// Staff-confirmed check-in.
    pub fn add_confirmed_guest(
        &self,
        guest_list_id: i64,
        checked_in_at: Option<DateTime<Utc>>,
    ) -> i64 {
        self.push_guest(guest_list_id, true, false, checked_in_at)
    }

    /// Validated geolocation self-check-in (staff flag unset).
    pub fn add_geo_confirmed_guest(
        &self,
        guest_list_id: i64,
        checked_in_at: Option<DateTime<Utc>>,
    ) -> i64 {
        self.push_guest(guest_list_id, false, true, checked_in_at)
    }

    pub fn add_unconfirmed_guest(&self, guest_list_id: i64) -> i64 {
        self.push_guest(guest_list_id, false, false, None)
    }

    pub fn unconfirm_guest(&self, guest_id: i64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(guest) = inner.guests.iter_mut().find(|g| g.id == guest_id) {
            guest.checked_in = false;
            guest.geo_checkin_confirmed = false;
        }
    }

    fn push_rule(
        &self,
        establishment_id: i64,
        kind: BeneficiaryKind,
        threshold: i32,
        description: &str,
        event_id: Option<i64>,
        promoter_id: Option<i64>,
    ) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_rule_id += 1;
        let id = inner.next_rule_id;
        inner.rules.push(RewardRule {
            id,
            establishment_id,
            event_id,
            promoter_id,
            beneficiary_kind: kind,
            threshold,
            description: description.to_string(),
            status: RuleStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    /// Establishment-wide rule (no event, no promoter pin).
    pub fn add_rule(
        &self,
        establishment_id: i64,
        kind: BeneficiaryKind,
        threshold: i32,
        description: &str,
    ) -> i64 {
        self.push_rule(establishment_id, kind, threshold, description, None, None)
    }

    pub fn add_event_rule(
        &self,
        establishment_id: i64,
        kind: BeneficiaryKind,
        threshold: i32,
        description: &str,
        event_id: i64,
    ) -> i64 {
        self.push_rule(
            establishment_id,
            kind,
            threshold,
            description,
            Some(event_id),
            None,
        )
    }

    pub fn add_promoter_rule(
        &self,
        establishment_id: i64,
        threshold: i32,
        description: &str,
        promoter_id: Option<i64>,
    ) -> i64 {
        self.push_rule(
            establishment_id,
            BeneficiaryKind::Promoter,
            threshold,
            description,
            None,
            promoter_id,
        )
    }

    pub fn void_grant(&self, grant_id: i64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(grant) = inner.grants.iter_mut().find(|g| g.id == grant_id) {
            grant.status = GrantStatus::Voided;
        }
    }

    fn grant_matches(grant: &RewardGrant, beneficiary: Beneficiary) -> bool {
        grant.status != GrantStatus::Voided && grant.beneficiary() == Some(beneficiary)
    }
}

impl Default for MemoryRewardStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RewardStore for MemoryRewardStore {
    async fn guest_list_context(
        &self,
        guest_list_id: i64,
    ) -> Result<Option<GuestListContext>, RewardError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .guest_lists
            .get(&guest_list_id)
            .map(|list| GuestListContext {
                establishment_id: list.establishment_id,
                event_id: list.event_id,
            }))
    }

    async fn promoter_event_context(
        &self,
        promoter_id: i64,
        event_id: i64,
    ) -> Result<Option<PromoterEventContext>, RewardError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .promoter_events
            .get(&(promoter_id, event_id))
            .map(|link| PromoterEventContext {
                establishment_id: link.establishment_id,
                event_date: link.event_date,
            }))
    }

    async fn count_guest_list_checkins(&self, guest_list_id: i64) -> Result<i64, RewardError> {
        let inner = self.inner.lock().unwrap();
        let distinct: HashSet<i64> = inner
            .guests
            .iter()
            .filter(|g| {
                g.guest_list_id == guest_list_id && (g.checked_in || g.geo_checkin_confirmed)
            })
            .map(|g| g.id)
            .collect();
        Ok(distinct.len() as i64)
    }

    async fn count_promoter_checkins(
        &self,
        promoter_id: i64,
        event_id: i64,
        on_date: Option<NaiveDate>,
    ) -> Result<i64, RewardError> {
        let inner = self.inner.lock().unwrap();
        let list_ids: HashSet<i64> = inner
            .guest_lists
            .iter()
            .filter(|(_, list)| {
                list.promoter_id == Some(promoter_id) && list.event_id == Some(event_id)
            })
            .map(|(id, _)| *id)
            .collect();

        let distinct: HashSet<i64> = inner
            .guests
            .iter()
            .filter(|g| list_ids.contains(&g.guest_list_id))
            .filter(|g| g.checked_in || g.geo_checkin_confirmed)
            .filter(|g| match on_date {
                None => true,
                Some(date) => g
                    .checked_in_at
                    .map(|at| venue_local_date(at, self.venue_tz) == date)
                    .unwrap_or(false),
            })
            .map(|g| g.id)
            .collect();
        Ok(distinct.len() as i64)
    }

    async fn active_rules(&self, criteria: &RuleCriteria) -> Result<Vec<RewardRule>, RewardError> {
        let inner = self.inner.lock().unwrap();
        let mut rules: Vec<RewardRule> = inner
            .rules
            .iter()
            .filter(|rule| criteria.matches(rule))
            .cloned()
            .collect();
        RuleCriteria::sort_for_evaluation(&mut rules);
        Ok(rules)
    }

    async fn insert_grant(
        &self,
        beneficiary: Beneficiary,
        rule_id: i64,
        checkins_count: i64,
    ) -> Result<InsertOutcome, RewardError> {
        // Check and insert under one lock, like the partial unique index.
        let mut inner = self.inner.lock().unwrap();
        let duplicate = inner
            .grants
            .iter()
            .any(|g| Self::grant_matches(g, beneficiary) && g.rule_id == rule_id);
        if duplicate {
            return Ok(InsertOutcome::AlreadyGranted);
        }

        inner.next_grant_id += 1;
        let (guest_list_id, promoter_id, event_id) = match beneficiary {
            Beneficiary::AnniversaryList { guest_list_id } => (Some(guest_list_id), None, None),
            Beneficiary::Promoter {
                promoter_id,
                event_id,
            } => (None, Some(promoter_id), Some(event_id)),
        };
        let grant = RewardGrant {
            id: inner.next_grant_id,
            guest_list_id,
            promoter_id,
            event_id,
            rule_id,
            status: GrantStatus::Granted,
            checkins_count,
            granted_at: Utc::now(),
            delivered_at: None,
        };
        inner.grants.push(grant.clone());
        Ok(InsertOutcome::Inserted(grant))
    }

    async fn grants_for(&self, beneficiary: Beneficiary) -> Result<Vec<GrantedGift>, RewardError> {
        let inner = self.inner.lock().unwrap();
        let mut gifts: Vec<GrantedGift> = inner
            .grants
            .iter()
            .filter(|g| Self::grant_matches(g, beneficiary))
            .map(|g| {
                let rule = inner
                    .rules
                    .iter()
                    .find(|r| r.id == g.rule_id)
                    .expect("grant references a known rule");
                GrantedGift {
                    id: g.id,
                    rule_id: g.rule_id,
                    status: g.status,
                    checkins_count: g.checkins_count,
                    granted_at: g.granted_at,
                    delivered_at: g.delivered_at,
                    description: rule.description.clone(),
                    threshold: rule.threshold,
                }
            })
            .collect();
        gifts.sort_by(|a, b| b.granted_at.cmp(&a.granted_at));
        Ok(gifts)
    }

    async fn deliver_grant(&self, grant_id: i64) -> Result<DeliverOutcome, RewardError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.grants.iter_mut().find(|g| g.id == grant_id) {
            Some(grant) if grant.status == GrantStatus::Granted => {
                grant.status = GrantStatus::Delivered;
                grant.delivered_at = Some(Utc::now());
                Ok(DeliverOutcome::Delivered(grant.clone()))
            }
            Some(grant) => Ok(DeliverOutcome::NotGranted(grant.status)),
            None => Ok(DeliverOutcome::Missing),
        }
    }
}

/// Wraps another store and lets a set number of `insert_grant` calls
/// through before every further one errors, like a connection dropping
/// mid-batch. Reads keep working so tests can inspect what landed.
pub struct FailingInsertStore<S> {
    inner: S,
    inserts_left: Mutex<usize>,
}

impl<S> FailingInsertStore<S> {
    pub fn after(inner: S, successful_inserts: usize) -> Self {
        Self {
            inner,
            inserts_left: Mutex::new(successful_inserts),
        }
    }
}

#[async_trait]
impl<S: RewardStore> RewardStore for FailingInsertStore<S> {
    async fn guest_list_context(
        &self,
        guest_list_id: i64,
    ) -> Result<Option<GuestListContext>, RewardError> {
        self.inner.guest_list_context(guest_list_id).await
    }

    async fn promoter_event_context(
        &self,
        promoter_id: i64,
        event_id: i64,
    ) -> Result<Option<PromoterEventContext>, RewardError> {
        self.inner.promoter_event_context(promoter_id, event_id).await
    }

    async fn count_guest_list_checkins(&self, guest_list_id: i64) -> Result<i64, RewardError> {
        self.inner.count_guest_list_checkins(guest_list_id).await
    }

    async fn count_promoter_checkins(
        &self,
        promoter_id: i64,
        event_id: i64,
        on_date: Option<NaiveDate>,
    ) -> Result<i64, RewardError> {
        self.inner
            .count_promoter_checkins(promoter_id, event_id, on_date)
            .await
    }

    async fn active_rules(&self, criteria: &RuleCriteria) -> Result<Vec<RewardRule>, RewardError> {
        self.inner.active_rules(criteria).await
    }

    async fn insert_grant(
        &self,
        beneficiary: Beneficiary,
        rule_id: i64,
        checkins_count: i64,
    ) -> Result<InsertOutcome, RewardError> {
        {
            let mut left = self.inserts_left.lock().unwrap();
            if *left == 0 {
                return Err(RewardError::Storage(
                    "connection reset during grant insert".to_string(),
                ));
            }
            *left -= 1;
        }
        self.inner
            .insert_grant(beneficiary, rule_id, checkins_count)
            .await
    }

    async fn grants_for(&self, beneficiary: Beneficiary) -> Result<Vec<GrantedGift>, RewardError> {
        self.inner.grants_for(beneficiary).await
    }

    async fn deliver_grant(&self, grant_id: i64) -> Result<DeliverOutcome, RewardError> {
        self.inner.deliver_grant(grant_id).await
    }
}
