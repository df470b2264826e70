use std::io::Read;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use super::criteria::CriterionRegistry;
use super::domain::{
    Criterion, CriterionDraft, CriterionId, CriterionUpdate, Rater, RaterId, Rating, RatingId,
    RatingKey, RatingSubmission, RatingValue, StateCode, UpsertOutcome, UsState, ValidationError,
};
use super::exchange::{parse_rows, ImportError, ImportReport, ImportRow};
use super::raters::RaterDirectory;
use super::repository::{CriterionRepository, RatingRepository, RatingWrite, RepositoryError};
use super::scoring::{
    analyze_agreement, sort_rows, AgreementSummary, CriterionBreakdown, CriterionFilter,
    ProgressSummary, ScoreEngine, SortField, SortOrder, StateRow, StateScore, ViewMode,
};
use super::states::StateCatalog;

/// Optional filters for listing ratings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RatingQuery {
    #[serde(default)]
    pub rater_id: Option<RaterId>,
    #[serde(default)]
    pub state_code: Option<String>,
}

/// Facade composing the criterion registry, rating store, state catalog and scoring.
pub struct RatingService<C, R> {
    criteria: CriterionRegistry<C>,
    ratings: Arc<R>,
    catalog: StateCatalog,
    raters: RaterDirectory,
}

impl<C, R> RatingService<C, R>
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    pub fn new(criteria: Arc<C>, ratings: Arc<R>, raters: RaterDirectory) -> Self {
        Self {
            criteria: CriterionRegistry::new(criteria),
            ratings,
            catalog: StateCatalog::standard(),
            raters,
        }
    }

    pub fn criteria(&self) -> &CriterionRegistry<C> {
        &self.criteria
    }

    pub fn list_raters(&self) -> &[Rater] {
        self.raters.list()
    }

    pub fn rater_by_username(&self, username: &str) -> Result<Rater, RatingServiceError> {
        self.raters
            .by_username(username)
            .cloned()
            .ok_or_else(|| RatingServiceError::not_found("rater", username))
    }

    pub fn list_states(&self) -> &[UsState] {
        self.catalog.list()
    }

    pub fn get_state(&self, code: &str) -> Result<UsState, RatingServiceError> {
        let code = StateCode::parse(code)?;
        self.catalog
            .get(&code)
            .cloned()
            .ok_or_else(|| RatingServiceError::not_found("state", &code))
    }

    pub fn list_active_criteria(&self) -> Result<Vec<Criterion>, RatingServiceError> {
        self.criteria.list_active()
    }

    pub fn create_criterion(
        &self,
        draft: CriterionDraft,
    ) -> Result<Criterion, RatingServiceError> {
        if let Some(rater_id) = &draft.created_by {
            self.require_rater(rater_id)?;
        }
        self.criteria.create(draft)
    }

    pub fn update_criterion(
        &self,
        id: &CriterionId,
        update: CriterionUpdate,
    ) -> Result<Criterion, RatingServiceError> {
        self.criteria.update(id, update)
    }

    pub fn deactivate_criterion(
        &self,
        id: &CriterionId,
    ) -> Result<Criterion, RatingServiceError> {
        self.criteria.deactivate(id)
    }

    pub fn seed_default_criteria(&self) -> Result<usize, RatingServiceError> {
        let seeded = self.criteria.seed_defaults()?;
        if seeded > 0 {
            info!(seeded, "seeded default criteria");
        }
        Ok(seeded)
    }

    /// Creates or overwrites the rating for (rater, state, criterion).
    pub fn upsert_rating(
        &self,
        submission: RatingSubmission,
    ) -> Result<UpsertOutcome, RatingServiceError> {
        let (key, value) = self.validate_submission(&submission)?;
        let outcome = self.ratings.upsert(key, value, submission.notes)?;

        info!(
            rating = %outcome.rating.id,
            rater = %outcome.rating.rater_id,
            state = %outcome.rating.state_code,
            criterion = %outcome.rating.criterion_id,
            value = outcome.rating.value.get(),
            created = outcome.created,
            "rating stored"
        );
        Ok(outcome)
    }

    pub fn get_rating(&self, id: &RatingId) -> Result<Rating, RatingServiceError> {
        self.ratings
            .fetch(id)?
            .ok_or_else(|| RatingServiceError::not_found("rating", id))
    }

    /// Returns `false` when no rating had that id.
    pub fn delete_rating(&self, id: &RatingId) -> Result<bool, RatingServiceError> {
        let removed = self.ratings.delete(id)?;
        info!(rating = %id, removed, "rating delete requested");
        Ok(removed)
    }

    pub fn list_ratings(&self, query: &RatingQuery) -> Result<Vec<Rating>, RatingServiceError> {
        let state_code = query
            .state_code
            .as_deref()
            .map(StateCode::parse)
            .transpose()?;

        let ratings = match (&query.rater_id, &state_code) {
            (_, Some(state_code)) => self.ratings.list_by_state(state_code)?,
            (Some(rater_id), None) => self.ratings.list_by_rater(rater_id)?,
            (None, None) => self.ratings.list_all()?,
        };

        Ok(match &query.rater_id {
            Some(rater_id) if state_code.is_some() => ratings
                .into_iter()
                .filter(|rating| &rating.rater_id == rater_id)
                .collect(),
            _ => ratings,
        })
    }

    /// One score per state, for all 50 states in catalog order.
    pub fn compute_state_scores(
        &self,
        view: &ViewMode,
        filter: &CriterionFilter,
    ) -> Result<Vec<StateScore>, RatingServiceError> {
        self.require_view(view)?;
        let engine = self.engine()?;
        let scores = engine.state_scores(&self.catalog, view, filter);
        debug!(
            rated = scores.iter().filter(|score| score.has_ratings).count(),
            "computed state scores"
        );
        Ok(scores)
    }

    pub fn state_rows(
        &self,
        filter: &CriterionFilter,
        field: &SortField,
        order: SortOrder,
    ) -> Result<Vec<StateRow>, RatingServiceError> {
        if let SortField::Rater(rater_id) = field {
            self.require_rater(rater_id)?;
        }
        let engine = self.engine()?;
        let mut rows = engine.state_rows(&self.catalog, self.raters.list(), filter);
        sort_rows(&mut rows, field, order);
        Ok(rows)
    }

    pub fn state_breakdown(
        &self,
        code: &str,
        view: &ViewMode,
    ) -> Result<Vec<CriterionBreakdown>, RatingServiceError> {
        let state = self.get_state(code)?;
        self.require_view(view)?;
        let engine = self.engine()?;
        Ok(engine.criterion_breakdown(&state.code, self.raters.list(), view))
    }

    pub fn compute_agreement(
        &self,
        rater_a: &RaterId,
        rater_b: &RaterId,
    ) -> Result<AgreementSummary, RatingServiceError> {
        self.require_rater(rater_a)?;
        self.require_rater(rater_b)?;
        let ratings = self.ratings.list_all()?;
        Ok(analyze_agreement(&ratings, rater_a, rater_b))
    }

    /// Rated-state count, agreement of the first two raters and the true top-scoring state.
    pub fn progress_summary(&self) -> Result<ProgressSummary, RatingServiceError> {
        let engine = self.engine()?;
        let scores =
            engine.state_scores(&self.catalog, &ViewMode::Combined, &CriterionFilter::All);
        let top = engine.top_state(&self.catalog, &ViewMode::Combined);

        let agreement_rate_pct = match self.raters.default_pair() {
            Some((a, b)) => {
                let ratings = self.ratings.list_all()?;
                analyze_agreement(&ratings, &a.id, &b.id).agreement_rate_pct
            }
            None => 0,
        };

        Ok(ProgressSummary {
            rated_state_count: scores.iter().filter(|score| score.has_ratings).count(),
            total_states: self.catalog.len(),
            agreement_rate_pct,
            top_score: top.as_ref().map(StateScore::summary),
            top_state: top.map(|score| score.state_code),
        })
    }

    /// Imports `rater,state,criterion,rating,notes` rows. Every row is validated before the
    /// first write, so a bad row leaves the store untouched.
    pub fn import_ratings<Rd: Read>(
        &self,
        reader: Rd,
    ) -> Result<ImportReport, RatingServiceError> {
        let rows = parse_rows(reader)?;
        let criteria = self.criteria.list_all()?;

        let mut validated = Vec::with_capacity(rows.len());
        for row in rows {
            let line = row.line;
            let entry = self
                .validate_import_row(row, &criteria)
                .map_err(|source| ImportError::Row {
                    line,
                    source: Box::new(source),
                })?;
            validated.push(entry);
        }

        let mut report = ImportReport::default();
        for outcome in self.ratings.upsert_many(validated)? {
            if outcome.created {
                report.created += 1;
            } else {
                report.updated += 1;
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            "ratings imported"
        );
        Ok(report)
    }

    fn validate_import_row(
        &self,
        row: ImportRow,
        criteria: &[Criterion],
    ) -> Result<RatingWrite, RatingServiceError> {
        let by_name =
            |criterion: &&Criterion| criterion.name.eq_ignore_ascii_case(&row.criterion);
        // An active criterion wins a name match; an inactive one only surfaces its error.
        let criterion = criteria
            .iter()
            .find(|criterion| criterion.id.as_str() == row.criterion)
            .or_else(|| criteria.iter().filter(|c| c.active).find(by_name))
            .or_else(|| criteria.iter().find(by_name))
            .ok_or_else(|| RatingServiceError::not_found("criterion", &row.criterion))?;

        let submission = RatingSubmission {
            rater_id: RaterId(row.rater),
            state_code: row.state,
            criterion_id: criterion.id.clone(),
            value: row.rating,
            notes: row.notes.clone(),
        };
        let (key, value) = self.validate_submission(&submission)?;
        Ok(RatingWrite {
            key,
            value,
            notes: row.notes,
        })
    }

    fn validate_submission(
        &self,
        submission: &RatingSubmission,
    ) -> Result<(RatingKey, RatingValue), RatingServiceError> {
        let value = RatingValue::new(submission.value)?;
        let state_code = StateCode::parse(&submission.state_code)?;
        if !self.catalog.contains(&state_code) {
            return Err(RatingServiceError::not_found("state", &state_code));
        }
        self.require_rater(&submission.rater_id)?;

        let criterion = self.criteria.get(&submission.criterion_id)?;
        if !criterion.active {
            return Err(ValidationError::InactiveCriterion(criterion.id).into());
        }

        Ok((
            RatingKey {
                rater_id: submission.rater_id.clone(),
                state_code,
                criterion_id: criterion.id,
            },
            value,
        ))
    }

    fn require_rater(&self, rater_id: &RaterId) -> Result<(), RatingServiceError> {
        if self.raters.contains(rater_id) {
            Ok(())
        } else {
            Err(RatingServiceError::not_found("rater", rater_id))
        }
    }

    fn require_view(&self, view: &ViewMode) -> Result<(), RatingServiceError> {
        match view {
            ViewMode::Combined => Ok(()),
            ViewMode::Rater(rater_id) => self.require_rater(rater_id),
        }
    }

    fn engine(&self) -> Result<ScoreEngine, RatingServiceError> {
        let criteria = self.criteria.list_active()?;
        let ratings = self.ratings.list_all()?;
        Ok(ScoreEngine::new(criteria, ratings))
    }
}

/// Error raised by the rating service.
#[derive(Debug, thiserror::Error)]
pub enum RatingServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl RatingServiceError {
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<RepositoryError> for RatingServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict => Self::Conflict(value.to_string()),
            other => Self::Repository(other),
        }
    }
}
