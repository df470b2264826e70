use std::sync::Arc;

use tracing::info;

use super::domain::{Criterion, CriterionDraft, CriterionId, CriterionUpdate, RaterId};
use super::repository::{CriterionRepository, NewCriterion, RepositoryError};
use super::service::RatingServiceError;

/// Criteria seeded into an empty store: name, weight, color.
pub const DEFAULT_CRITERIA: [(&str, f64, &str); 4] = [
    ("Cost of Living", 1.0, "#1976D2"),
    ("Climate", 1.5, "#DC004E"),
    ("Job Market", 2.0, "#388E3C"),
    ("Culture & Entertainment", 1.0, "#F57C00"),
];

/// Validating front for the criterion repository.
pub struct CriterionRegistry<C> {
    repository: Arc<C>,
}

impl<C> CriterionRegistry<C>
where
    C: CriterionRepository + 'static,
{
    pub fn new(repository: Arc<C>) -> Self {
        Self { repository }
    }

    /// Active criteria in insertion order.
    pub fn list_active(&self) -> Result<Vec<Criterion>, RatingServiceError> {
        Ok(self
            .repository
            .list()?
            .into_iter()
            .filter(|criterion| criterion.active)
            .collect())
    }

    pub fn list_all(&self) -> Result<Vec<Criterion>, RatingServiceError> {
        Ok(self.repository.list()?)
    }

    pub fn list_by_rater(&self, rater_id: &RaterId) -> Result<Vec<Criterion>, RatingServiceError> {
        Ok(self
            .list_active()?
            .into_iter()
            .filter(|criterion| criterion.created_by.as_ref() == Some(rater_id))
            .collect())
    }

    pub fn get(&self, id: &CriterionId) -> Result<Criterion, RatingServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| RatingServiceError::not_found("criterion", id))
    }

    pub fn create(&self, draft: CriterionDraft) -> Result<Criterion, RatingServiceError> {
        let (name, weight, color) = draft.validate()?;
        let criterion = self.repository.insert(NewCriterion {
            name,
            weight,
            color,
            created_by: draft.created_by,
        })?;
        info!(criterion = %criterion.id, name = %criterion.name, weight, "criterion created");
        Ok(criterion)
    }

    pub fn update(
        &self,
        id: &CriterionId,
        update: CriterionUpdate,
    ) -> Result<Criterion, RatingServiceError> {
        update.validate()?;
        let criterion = self.repository.update(id, &update).map_err(|err| match err {
            RepositoryError::NotFound => RatingServiceError::not_found("criterion", id),
            other => other.into(),
        })?;
        info!(criterion = %criterion.id, active = criterion.active, "criterion updated");
        Ok(criterion)
    }

    /// Soft-deletes the criterion; its ratings stay in the store.
    pub fn deactivate(&self, id: &CriterionId) -> Result<Criterion, RatingServiceError> {
        self.update(id, CriterionUpdate::deactivate())
    }

    /// Inserts [`DEFAULT_CRITERIA`] when the store holds no criteria at all.
    pub fn seed_defaults(&self) -> Result<usize, RatingServiceError> {
        if !self.repository.list()?.is_empty() {
            return Ok(0);
        }

        for (name, weight, color) in DEFAULT_CRITERIA {
            self.create(CriterionDraft::new(name, weight, color))?;
        }
        Ok(DEFAULT_CRITERIA.len())
    }
}
