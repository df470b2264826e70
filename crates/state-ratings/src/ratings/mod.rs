//! Household state ratings: criteria, per-rater ratings, weighted scores and agreement.
//!
//! Raters score each of the 50 states against weighted criteria on a 1-10 scale. Scores are
//! derived on demand from the stored ratings and are never persisted.

pub mod criteria;
pub mod domain;
pub mod exchange;
pub mod raters;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod states;
pub mod store;

#[cfg(test)]
mod tests;

pub use criteria::{CriterionRegistry, DEFAULT_CRITERIA};
pub use domain::{
    Criterion, CriterionDraft, CriterionId, CriterionUpdate, Rater, RaterId, Rating, RatingBand,
    RatingId, RatingKey, RatingSubmission, RatingValue, StateCode, UpsertOutcome, UsState,
    ValidationError,
};
pub use exchange::{write_rows_csv, ImportError, ImportReport};
pub use raters::RaterDirectory;
pub use repository::{
    CriterionRepository, NewCriterion, RatingRepository, RatingWrite, RepositoryError,
};
pub use router::rating_router;
pub use scoring::{
    AgreementSummary, CriterionBreakdown, CriterionFilter, ProgressSummary, SortField, SortOrder,
    StateRow, StateScore, StateScoreView, ViewMode,
};
pub use service::{RatingQuery, RatingService, RatingServiceError};
pub use states::StateCatalog;
pub use store::{ConfiguredStore, FileStore, MemoryStore};
