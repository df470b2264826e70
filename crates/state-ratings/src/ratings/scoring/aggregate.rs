use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::views::{
    CriterionBreakdown, CriterionFilter, RaterAverage, RaterValue, SortField, SortOrder,
    StateRow, StateScore, ViewMode,
};
use crate::ratings::domain::{Criterion, CriterionId, Rater, RaterId, Rating, StateCode};
use crate::ratings::states::StateCatalog;

/// Pure, read-only scorer over a snapshot of active criteria and ratings.
///
/// Scores are always recomputed from the snapshot; nothing is cached between calls.
pub struct ScoreEngine {
    criteria: Vec<Criterion>,
    weights: HashMap<CriterionId, f64>,
    by_state: HashMap<StateCode, Vec<Rating>>,
}

impl ScoreEngine {
    /// Inactive criteria are dropped here, so their ratings never reach a score.
    pub fn new(criteria: Vec<Criterion>, ratings: Vec<Rating>) -> Self {
        let criteria: Vec<Criterion> = criteria
            .into_iter()
            .filter(|criterion| criterion.active)
            .collect();
        let weights = criteria
            .iter()
            .map(|criterion| (criterion.id.clone(), criterion.weight))
            .collect::<HashMap<_, _>>();

        let mut by_state: HashMap<StateCode, Vec<Rating>> = HashMap::new();
        for rating in ratings {
            if weights.contains_key(&rating.criterion_id) {
                by_state
                    .entry(rating.state_code.clone())
                    .or_default()
                    .push(rating);
            }
        }

        Self {
            criteria,
            weights,
            by_state,
        }
    }

    fn selected<'a>(
        &'a self,
        state_code: &StateCode,
        view: &'a ViewMode,
        filter: &'a CriterionFilter,
    ) -> impl Iterator<Item = &'a Rating> + 'a {
        self.by_state
            .get(state_code)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .filter(move |rating| view.includes(&rating.rater_id))
            .filter(move |rating| filter.includes(&rating.criterion_id))
    }

    /// Averages each rated criterion across raters, then combines the averages by weight.
    pub fn state_score(
        &self,
        state_code: &StateCode,
        view: &ViewMode,
        filter: &CriterionFilter,
    ) -> StateScore {
        let mut groups: BTreeMap<&CriterionId, (f64, usize)> = BTreeMap::new();
        for rating in self.selected(state_code, view, filter) {
            let entry = groups.entry(&rating.criterion_id).or_insert((0.0, 0));
            entry.0 += rating.value.as_f64();
            entry.1 += 1;
        }

        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for (criterion_id, (sum, count)) in groups {
            let Some(weight) = self.weights.get(criterion_id) else {
                continue;
            };
            weighted_sum += (sum / count as f64) * weight;
            total_weight += weight;
        }

        if total_weight > 0.0 {
            StateScore::rated(state_code.clone(), weighted_sum / total_weight)
        } else {
            StateScore::unrated(state_code.clone())
        }
    }

    /// One score per catalog state, in catalog order.
    pub fn state_scores(
        &self,
        catalog: &StateCatalog,
        view: &ViewMode,
        filter: &CriterionFilter,
    ) -> Vec<StateScore> {
        catalog
            .list()
            .iter()
            .map(|state| self.state_score(&state.code, view, filter))
            .collect()
    }

    pub fn rater_average(
        &self,
        state_code: &StateCode,
        rater_id: &RaterId,
        filter: &CriterionFilter,
    ) -> RaterAverage {
        let view = ViewMode::Rater(rater_id.clone());
        let (sum, count) = self
            .selected(state_code, &view, filter)
            .fold((0.0, 0usize), |(sum, count), rating| {
                (sum + rating.value.as_f64(), count + 1)
            });

        RaterAverage {
            rater_id: rater_id.clone(),
            average: if count > 0 { sum / count as f64 } else { 0.0 },
            has_ratings: count > 0,
        }
    }

    /// List-view rows: the combined score plus each rater's own average.
    pub fn state_rows(
        &self,
        catalog: &StateCatalog,
        raters: &[Rater],
        filter: &CriterionFilter,
    ) -> Vec<StateRow> {
        catalog
            .list()
            .iter()
            .map(|state| StateRow {
                state_code: state.code.clone(),
                state_name: state.name,
                combined: self.state_score(&state.code, &ViewMode::Combined, filter),
                raters: raters
                    .iter()
                    .map(|rater| self.rater_average(&state.code, &rater.id, filter))
                    .collect(),
            })
            .collect()
    }

    /// Active criteria in registry order with each visible rater's value for the state.
    pub fn criterion_breakdown(
        &self,
        state_code: &StateCode,
        raters: &[Rater],
        view: &ViewMode,
    ) -> Vec<CriterionBreakdown> {
        let ratings = self
            .by_state
            .get(state_code)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        self.criteria
            .iter()
            .map(|criterion| {
                let values: Vec<RaterValue> = raters
                    .iter()
                    .filter(|rater| view.includes(&rater.id))
                    .map(|rater| RaterValue {
                        rater_id: rater.id.clone(),
                        value: ratings
                            .iter()
                            .find(|rating| {
                                rating.rater_id == rater.id && rating.criterion_id == criterion.id
                            })
                            .map(|rating| rating.value.get()),
                    })
                    .collect();

                let present: Vec<f64> = values
                    .iter()
                    .filter_map(|entry| entry.value.map(f64::from))
                    .collect();
                let average = if present.is_empty() {
                    None
                } else {
                    Some(present.iter().sum::<f64>() / present.len() as f64)
                };

                CriterionBreakdown {
                    criterion_id: criterion.id.clone(),
                    criterion_name: criterion.name.clone(),
                    color: criterion.color.clone(),
                    weight: criterion.weight,
                    values,
                    average,
                }
            })
            .collect()
    }

    /// Highest-scoring rated state; earlier catalog entries win ties.
    pub fn top_state(&self, catalog: &StateCatalog, view: &ViewMode) -> Option<StateScore> {
        self.state_scores(catalog, view, &CriterionFilter::All)
            .into_iter()
            .filter(|score| score.has_ratings)
            .fold(None, |best: Option<StateScore>, candidate| match best {
                Some(current) if current.score >= candidate.score => Some(current),
                _ => Some(candidate),
            })
    }
}

/// Orders list rows in place. Unrated values sort as 0; ties fall back to state name.
pub fn sort_rows(rows: &mut [StateRow], field: &SortField, order: SortOrder) {
    rows.sort_by(|a, b| {
        let primary = match field {
            SortField::Name => a.state_name.cmp(b.state_name),
            SortField::Combined => compare_scores(sort_value(&a.combined), sort_value(&b.combined)),
            SortField::Rater(rater_id) => {
                compare_scores(a.rater_average(rater_id), b.rater_average(rater_id))
            }
        };
        let primary = match order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.state_name.cmp(b.state_name))
    });
}

fn sort_value(score: &StateScore) -> f64 {
    if score.has_ratings {
        score.score
    } else {
        0.0
    }
}

fn compare_scores(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}
