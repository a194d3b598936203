use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use crate::database::models::{Beneficiary, RewardGrant, RewardRule};

use super::criteria::RuleCriteria;
use super::error::RewardError;
use super::store::{DeliverOutcome, GrantedGift, InsertOutcome, RewardStore};

/// A rule that unlocked during this evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct GrantedRule {
    pub rule_id: i64,
    pub description: String,
    pub threshold: i32,
}

impl From<&RewardRule> for GrantedRule {
    fn from(rule: &RewardRule) -> Self {
        GrantedRule {
            rule_id: rule.id,
            description: rule.description.clone(),
            threshold: rule.threshold,
        }
    }
}

/// Outcome of a guest-list evaluation.
#[derive(Debug, Serialize)]
pub struct Evaluation {
    pub count: i64,
    pub granted: Vec<GrantedRule>,
}

/// Per-rule progress shown on the promoter view.
#[derive(Debug, Serialize)]
pub struct RuleProgress {
    pub rule_id: i64,
    pub description: String,
    pub threshold: i32,
    /// min(100, count / threshold * 100)
    pub percent: u8,
    /// max(0, threshold - count)
    pub remaining: i64,
    /// Whether a non-voided grant already exists for this rule.
    pub granted: bool,
}

impl RuleProgress {
    fn new(rule: &RewardRule, count: i64, granted: bool) -> Self {
        let threshold = i64::from(rule.threshold);
        // The schema CHECKs threshold > 0, but a row written around the
        // service must not panic the progress view.
        let percent = (count.saturating_mul(100) / threshold.max(1)).min(100) as u8;
        RuleProgress {
            rule_id: rule.id,
            description: rule.description.clone(),
            threshold: rule.threshold,
            percent,
            remaining: (threshold - count).max(0),
            granted,
        }
    }
}

/// Outcome of a promoter evaluation: grants plus the display-oriented
/// progress annotation over every matching rule.
#[derive(Debug, Serialize)]
pub struct PromoterEvaluation {
    pub count: i64,
    pub granted: Vec<GrantedRule>,
    pub progress: Vec<RuleProgress>,
}

/// The eligibility engine.
///
/// Given a beneficiary, recompute its confirmed check-in count (never
/// cached), select the applicable active rules in evaluation order, and
/// grant exactly the tiers whose threshold is met and which have no
/// existing non-voided grant. Re-running with an unchanged count grants
/// nothing; a count that crossed further thresholds grants exactly those.
pub struct RewardEvaluator<S> {
    store: S,
}

impl<S: RewardStore> RewardEvaluator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Invocation A: guest-list beneficiary, triggered after a check-in is
    /// recorded.
    pub async fn evaluate_guest_list(&self, guest_list_id: i64) -> Result<Evaluation, RewardError> {
        let context = self
            .store
            .guest_list_context(guest_list_id)
            .await?
            .ok_or_else(|| RewardError::NotFound(format!("guest list {}", guest_list_id)))?;

        let establishment_id = context.establishment_id.ok_or_else(|| {
            RewardError::InvalidState(format!(
                "guest list {} has no establishment linkage",
                guest_list_id
            ))
        })?;

        let count = self.store.count_guest_list_checkins(guest_list_id).await?;
        let criteria = RuleCriteria::for_guest_list(establishment_id, context.event_id);
        let rules = self.store.active_rules(&criteria).await?;

        let beneficiary = Beneficiary::AnniversaryList { guest_list_id };
        let granted = self.grant_crossed_tiers(beneficiary, count, &rules).await?;

        Ok(Evaluation { count, granted })
    }

    /// Invocation B: promoter beneficiary, on-demand from the progress view.
    /// Also annotates every matching rule with progress for display.
    pub async fn evaluate_promoter(
        &self,
        promoter_id: i64,
        event_id: i64,
    ) -> Result<PromoterEvaluation, RewardError> {
        let context = self
            .store
            .promoter_event_context(promoter_id, event_id)
            .await?
            .ok_or_else(|| {
                RewardError::NotFound(format!(
                    "promoter {} has no link to event {}",
                    promoter_id, event_id
                ))
            })?;

        let establishment_id = context.establishment_id.ok_or_else(|| {
            RewardError::InvalidState(format!("event {} has no establishment linkage", event_id))
        })?;

        let count = self
            .store
            .count_promoter_checkins(promoter_id, event_id, context.event_date)
            .await?;
        let criteria = RuleCriteria::for_promoter(establishment_id, event_id, promoter_id);
        let rules = self.store.active_rules(&criteria).await?;

        let beneficiary = Beneficiary::Promoter {
            promoter_id,
            event_id,
        };
        let granted = self.grant_crossed_tiers(beneficiary, count, &rules).await?;

        // Existing grants decide the "granted" flag; a tier granted at a
        // higher historical count stays granted even if the count dropped.
        let granted_rule_ids: HashSet<i64> = self
            .store
            .grants_for(beneficiary)
            .await?
            .iter()
            .map(|gift| gift.rule_id)
            .collect();

        let progress = rules
            .iter()
            .map(|rule| RuleProgress::new(rule, count, granted_rule_ids.contains(&rule.id)))
            .collect();

        Ok(PromoterEvaluation {
            count,
            granted,
            progress,
        })
    }

    /// Grant every rule whose threshold is met and not yet granted. Inserts
    /// happen one at a time with no surrounding transaction: a failure
    /// mid-list propagates and leaves earlier grants in place.
    async fn grant_crossed_tiers(
        &self,
        beneficiary: Beneficiary,
        count: i64,
        rules: &[RewardRule],
    ) -> Result<Vec<GrantedRule>, RewardError> {
        let mut granted = Vec::new();

        for rule in rules {
            if count < i64::from(rule.threshold) {
                continue;
            }

            match self.store.insert_grant(beneficiary, rule.id, count).await? {
                InsertOutcome::Inserted(_) => {
                    info!(
                        rule_id = rule.id,
                        threshold = rule.threshold,
                        count,
                        "reward unlocked for {}",
                        beneficiary
                    );
                    granted.push(GrantedRule::from(rule));
                }
                InsertOutcome::AlreadyGranted => {}
            }
        }

        Ok(granted)
    }

    /// Non-voided grants for a beneficiary, for the staff gift list.
    pub async fn granted_gifts(
        &self,
        beneficiary: Beneficiary,
    ) -> Result<Vec<GrantedGift>, RewardError> {
        self.store.grants_for(beneficiary).await
    }

    /// GRANTED -> DELIVERED, stamping the delivery timestamp. Any other
    /// starting state is rejected.
    pub async fn deliver(&self, grant_id: i64) -> Result<RewardGrant, RewardError> {
        match self.store.deliver_grant(grant_id).await? {
            DeliverOutcome::Delivered(grant) => Ok(grant),
            DeliverOutcome::NotGranted(status) => Err(RewardError::InvalidState(format!(
                "gift {} is {}, only GRANTED gifts can be delivered",
                grant_id, status
            ))),
            DeliverOutcome::Missing => Err(RewardError::NotFound(format!("gift {}", grant_id))),
        }
    }
}
