//! Derived views over ratings: weighted state scores, list rows, breakdowns and agreement.

mod aggregate;
mod agreement;
pub mod views;

pub use aggregate::{sort_rows, ScoreEngine};
pub use agreement::{analyze_agreement, AGREEMENT_TOLERANCE};
pub use views::{
    AgreementSummary, CriterionBreakdown, CriterionFilter, ProgressSummary, RaterAverage,
    RaterValue, SortField, SortOrder, StateRow, StateScore, StateScoreView, ViewMode,
};
