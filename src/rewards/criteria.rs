use crate::database::models::{BeneficiaryKind, RewardRule};

/// Typed selection predicate for reward rules.
///
/// One criteria object drives both sides of the storage seam: the Postgres
/// store binds its fields into a parameterized query, and the in-memory
/// store (and tests) evaluate `matches` directly. Values are never spliced
/// into SQL text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleCriteria {
    pub establishment_id: i64,
    pub kind: BeneficiaryKind,
    /// The beneficiary's event. A rule with `event_id = NULL` is an
    /// establishment-wide default and matches regardless.
    pub event_id: Option<i64>,
    /// Set for promoter beneficiaries only. A rule with `promoter_id = NULL`
    /// applies to every promoter at the establishment.
    pub promoter_id: Option<i64>,
}

impl RuleCriteria {
    pub fn for_guest_list(establishment_id: i64, event_id: Option<i64>) -> Self {
        Self {
            establishment_id,
            kind: BeneficiaryKind::AnniversaryList,
            event_id,
            promoter_id: None,
        }
    }

    pub fn for_promoter(establishment_id: i64, event_id: i64, promoter_id: i64) -> Self {
        Self {
            establishment_id,
            kind: BeneficiaryKind::Promoter,
            event_id: Some(event_id),
            promoter_id: Some(promoter_id),
        }
    }

    /// Whether an individual rule applies to this beneficiary. Mirrors the
    /// SQL filter in the Postgres store exactly.
    pub fn matches(&self, rule: &RewardRule) -> bool {
        if !rule.is_active() {
            return false;
        }
        if rule.establishment_id != self.establishment_id {
            return false;
        }
        if rule.beneficiary_kind != self.kind {
            return false;
        }
        // Event scope: exact event, or establishment-wide default.
        if rule.event_id.is_some() && rule.event_id != self.event_id {
            return false;
        }
        // Promoter scope only constrains promoter rules.
        if self.kind == BeneficiaryKind::Promoter
            && rule.promoter_id.is_some()
            && rule.promoter_id != self.promoter_id
        {
            return false;
        }
        true
    }

    /// Evaluation order: ascending threshold; at equal thresholds a
    /// promoter-specific rule comes before the establishment-wide one.
    pub fn sort_for_evaluation(rules: &mut [RewardRule]) {
        rules.sort_by_key(|rule| (rule.threshold, rule.promoter_id.is_none()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::RuleStatus;
    use chrono::Utc;

    fn rule(id: i64, kind: BeneficiaryKind) -> RewardRule {
        RewardRule {
            id,
            establishment_id: 1,
            event_id: None,
            promoter_id: None,
            beneficiary_kind: kind,
            threshold: 5,
            description: format!("rule {}", id),
            status: RuleStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn inactive_rules_never_match() {
        let criteria = RuleCriteria::for_guest_list(1, None);
        let mut r = rule(1, BeneficiaryKind::AnniversaryList);
        assert!(criteria.matches(&r));
        r.status = RuleStatus::Inactive;
        assert!(!criteria.matches(&r));
    }

    #[test]
    fn kind_must_match() {
        let criteria = RuleCriteria::for_guest_list(1, Some(10));
        assert!(!criteria.matches(&rule(1, BeneficiaryKind::Promoter)));
    }

    #[test]
    fn event_scope_isolation() {
        let criteria = RuleCriteria::for_guest_list(1, Some(10));

        let mut same_event = rule(1, BeneficiaryKind::AnniversaryList);
        same_event.event_id = Some(10);
        let mut other_event = rule(2, BeneficiaryKind::AnniversaryList);
        other_event.event_id = Some(11);
        let establishment_wide = rule(3, BeneficiaryKind::AnniversaryList);

        assert!(criteria.matches(&same_event));
        assert!(!criteria.matches(&other_event));
        assert!(criteria.matches(&establishment_wide));
    }

    #[test]
    fn event_rule_does_not_match_list_without_event() {
        let criteria = RuleCriteria::for_guest_list(1, None);
        let mut event_rule = rule(1, BeneficiaryKind::AnniversaryList);
        event_rule.event_id = Some(10);
        assert!(!criteria.matches(&event_rule));
    }

    #[test]
    fn promoter_scope_isolation() {
        let criteria = RuleCriteria::for_promoter(1, 10, 7);

        let mut specific = rule(1, BeneficiaryKind::Promoter);
        specific.promoter_id = Some(7);
        let mut other_promoter = rule(2, BeneficiaryKind::Promoter);
        other_promoter.promoter_id = Some(8);
        let general = rule(3, BeneficiaryKind::Promoter);

        assert!(criteria.matches(&specific));
        assert!(!criteria.matches(&other_promoter));
        assert!(criteria.matches(&general));
    }

    #[test]
    fn specific_rule_sorts_before_general_at_equal_threshold() {
        let mut general = rule(1, BeneficiaryKind::Promoter);
        let mut specific = rule(2, BeneficiaryKind::Promoter);
        specific.promoter_id = Some(7);
        let mut lower = rule(3, BeneficiaryKind::Promoter);
        lower.threshold = 3;
        general.threshold = 5;

        let mut rules = vec![general, specific, lower];
        RuleCriteria::sort_for_evaluation(&mut rules);

        let ids: Vec<i64> = rules.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
