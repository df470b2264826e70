use std::collections::{BTreeSet, HashMap};

use super::views::AgreementSummary;
use crate::ratings::domain::{CriterionId, RaterId, Rating, StateCode};

/// Two ratings within this many points of each other count as agreement.
pub const AGREEMENT_TOLERANCE: u8 = 2;

/// Compares two raters over every (state, criterion) pair both of them rated.
pub fn analyze_agreement(
    ratings: &[Rating],
    rater_a: &RaterId,
    rater_b: &RaterId,
) -> AgreementSummary {
    let mut values_a: HashMap<(&StateCode, &CriterionId), u8> = HashMap::new();
    let mut values_b: HashMap<(&StateCode, &CriterionId), u8> = HashMap::new();
    let mut rated_states: BTreeSet<&StateCode> = BTreeSet::new();

    for rating in ratings {
        let target = if &rating.rater_id == rater_a {
            &mut values_a
        } else if &rating.rater_id == rater_b {
            &mut values_b
        } else {
            continue;
        };
        target.insert((&rating.state_code, &rating.criterion_id), rating.value.get());
        rated_states.insert(&rating.state_code);
    }

    let mut comparisons = 0usize;
    let mut agreements = 0usize;
    for (key, value_a) in &values_a {
        if let Some(value_b) = values_b.get(key) {
            comparisons += 1;
            if value_a.abs_diff(*value_b) <= AGREEMENT_TOLERANCE {
                agreements += 1;
            }
        }
    }

    AgreementSummary {
        rater_a: rater_a.clone(),
        rater_b: rater_b.clone(),
        agreement_rate_pct: agreement_rate(agreements, comparisons),
        comparisons,
        agreements,
        rated_state_count: rated_states.len(),
        first_rated_state: rated_states.first().map(|code| (*code).clone()),
    }
}

fn agreement_rate(agreements: usize, comparisons: usize) -> u8 {
    if comparisons == 0 {
        return 0;
    }
    ((agreements as f64 / comparisons as f64) * 100.0).round() as u8
}
