use super::domain::{
    Criterion, CriterionId, CriterionUpdate, RaterId, Rating, RatingId, RatingKey, RatingValue,
    StateCode, UpsertOutcome,
};

/// Validated fields for a criterion about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCriterion {
    pub name: String,
    pub weight: f64,
    pub color: String,
    pub created_by: Option<RaterId>,
}

/// Storage abstraction for weighted criteria. Criteria are never hard-deleted.
pub trait CriterionRepository: Send + Sync {
    fn insert(&self, criterion: NewCriterion) -> Result<Criterion, RepositoryError>;
    /// Applies a pre-validated update atomically, returning the stored criterion.
    fn update(
        &self,
        id: &CriterionId,
        update: &CriterionUpdate,
    ) -> Result<Criterion, RepositoryError>;
    fn fetch(&self, id: &CriterionId) -> Result<Option<Criterion>, RepositoryError>;
    /// All criteria, active or not, in insertion order.
    fn list(&self) -> Result<Vec<Criterion>, RepositoryError>;
}

/// One rating write, already validated by the service layer.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingWrite {
    pub key: RatingKey,
    pub value: RatingValue,
    pub notes: Option<String>,
}

/// Storage abstraction for ratings keyed by (rater, state, criterion).
///
/// Implementations must make `upsert` atomic: two concurrent writes to the same key end with
/// exactly one stored row.
pub trait RatingRepository: Send + Sync {
    fn upsert(
        &self,
        key: RatingKey,
        value: RatingValue,
        notes: Option<String>,
    ) -> Result<UpsertOutcome, RepositoryError>;
    /// Applies a batch of upserts. The bundled stores apply all of them or none; the default
    /// stops at the first failure and keeps the writes before it.
    fn upsert_many(
        &self,
        writes: Vec<RatingWrite>,
    ) -> Result<Vec<UpsertOutcome>, RepositoryError> {
        writes
            .into_iter()
            .map(|write| self.upsert(write.key, write.value, write.notes))
            .collect()
    }
    fn fetch(&self, id: &RatingId) -> Result<Option<Rating>, RepositoryError>;
    fn find(&self, key: &RatingKey) -> Result<Option<Rating>, RepositoryError>;
    fn list_by_rater(&self, rater_id: &RaterId) -> Result<Vec<Rating>, RepositoryError>;
    fn list_by_state(&self, state_code: &StateCode) -> Result<Vec<Rating>, RepositoryError>;
    fn list_all(&self) -> Result<Vec<Rating>, RepositoryError>;
    /// Returns `false` when no rating had that id.
    fn delete(&self, id: &RatingId) -> Result<bool, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
