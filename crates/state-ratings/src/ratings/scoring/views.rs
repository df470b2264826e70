use serde::Serialize;

use crate::ratings::domain::{CriterionId, RaterId, RatingBand, StateCode};

/// Whose ratings feed a score.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Combined,
    Rater(RaterId),
}

impl ViewMode {
    /// `combined` (or empty) selects every rater; anything else names a single rater.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" => Self::Combined,
            value if value.eq_ignore_ascii_case("combined") => Self::Combined,
            value => Self::Rater(RaterId::from(value)),
        }
    }

    pub(crate) fn includes(&self, rater_id: &RaterId) -> bool {
        match self {
            Self::Combined => true,
            Self::Rater(id) => id == rater_id,
        }
    }
}

/// Restricts scoring to every active criterion or to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CriterionFilter {
    #[default]
    All,
    Only(CriterionId),
}

impl CriterionFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::All,
            Some(value) if value.eq_ignore_ascii_case("all") => Self::All,
            Some(value) => Self::Only(CriterionId::from(value)),
        }
    }

    pub(crate) fn includes(&self, criterion_id: &CriterionId) -> bool {
        match self {
            Self::All => true,
            Self::Only(id) => id == criterion_id,
        }
    }
}

/// Weighted score for one state. `score` is 0.0 and meaningless when `has_ratings` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateScore {
    pub state_code: StateCode,
    pub score: f64,
    pub has_ratings: bool,
}

impl StateScore {
    pub fn rated(state_code: StateCode, score: f64) -> Self {
        Self {
            state_code,
            score,
            has_ratings: true,
        }
    }

    pub fn unrated(state_code: StateCode) -> Self {
        Self {
            state_code,
            score: 0.0,
            has_ratings: false,
        }
    }

    /// Nearest whole star, 0 when unrated.
    pub fn stars(&self) -> u8 {
        if !self.has_ratings {
            return 0;
        }
        self.score.round().clamp(0.0, 10.0) as u8
    }

    /// Score kept to one decimal place.
    pub fn summary(&self) -> f64 {
        round_one_decimal(self.score)
    }

    pub fn band(&self) -> RatingBand {
        RatingBand::from_stars(self.stars())
    }

    pub fn view(&self) -> StateScoreView {
        StateScoreView {
            state_code: self.state_code.clone(),
            score: self.summary(),
            has_ratings: self.has_ratings,
            stars: self.stars(),
            band: self.band(),
            band_label: self.band().label(),
        }
    }
}

/// Display-ready form of a [`StateScore`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateScoreView {
    pub state_code: StateCode,
    pub score: f64,
    pub has_ratings: bool,
    pub stars: u8,
    pub band: RatingBand,
    pub band_label: &'static str,
}

/// Plain mean of one rater's ratings for a state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaterAverage {
    pub rater_id: RaterId,
    pub average: f64,
    pub has_ratings: bool,
}

/// One row of the sortable state list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRow {
    pub state_code: StateCode,
    pub state_name: &'static str,
    pub combined: StateScore,
    pub raters: Vec<RaterAverage>,
}

impl StateRow {
    /// Average for the rater, 0.0 when the rater has not rated this state.
    pub fn rater_average(&self, rater_id: &RaterId) -> f64 {
        self.raters
            .iter()
            .find(|entry| &entry.rater_id == rater_id)
            .filter(|entry| entry.has_ratings)
            .map(|entry| entry.average)
            .unwrap_or(0.0)
    }
}

/// One rater's value for a criterion inside a state breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaterValue {
    pub rater_id: RaterId,
    pub value: Option<u8>,
}

/// Per-criterion detail for a single state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionBreakdown {
    pub criterion_id: CriterionId,
    pub criterion_name: String,
    pub color: String,
    pub weight: f64,
    pub values: Vec<RaterValue>,
    pub average: Option<f64>,
}

/// Column the state list is ordered by.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortField {
    Name,
    #[default]
    Combined,
    Rater(RaterId),
}

impl SortField {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Combined,
            Some(value) if value.eq_ignore_ascii_case("name") => Self::Name,
            Some(value)
                if value.eq_ignore_ascii_case("combined") || value.eq_ignore_ascii_case("rating") =>
            {
                Self::Combined
            }
            Some(value) => Self::Rater(RaterId::from(value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_ascii_lowercase()) {
            Some(value) if value == "asc" => Self::Asc,
            _ => Self::Desc,
        }
    }
}

/// Cross-rater agreement over shared (state, criterion) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgreementSummary {
    pub rater_a: RaterId,
    pub rater_b: RaterId,
    pub agreement_rate_pct: u8,
    pub comparisons: usize,
    pub agreements: usize,
    pub rated_state_count: usize,
    /// First rated state by state code. Not a ranking; see [`ProgressSummary::top_state`].
    pub first_rated_state: Option<StateCode>,
}

/// Household progress figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub rated_state_count: usize,
    pub total_states: usize,
    pub agreement_rate_pct: u8,
    pub top_state: Option<StateCode>,
    pub top_score: Option<f64>,
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
