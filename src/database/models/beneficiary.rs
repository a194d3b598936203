use serde::Serialize;

use super::rule::BeneficiaryKind;

/// The identity whose check-in progress is measured against reward rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Beneficiary {
    AnniversaryList {
        guest_list_id: i64,
    },
    Promoter {
        promoter_id: i64,
        event_id: i64,
    },
}

impl Beneficiary {
    pub fn kind(&self) -> BeneficiaryKind {
        match self {
            Beneficiary::AnniversaryList { .. } => BeneficiaryKind::AnniversaryList,
            Beneficiary::Promoter { .. } => BeneficiaryKind::Promoter,
        }
    }
}

impl std::fmt::Display for Beneficiary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Beneficiary::AnniversaryList { guest_list_id } => {
                write!(f, "guest list {}", guest_list_id)
            }
            Beneficiary::Promoter {
                promoter_id,
                event_id,
            } => write!(f, "promoter {} / event {}", promoter_id, event_id),
        }
    }
}
