//! Rating store backends.
//!
//! Both backends implement [`CriterionRepository`] and [`RatingRepository`]; the service
//! layer only sees the traits. [`ConfiguredStore`] picks one at startup from [`StoreConfig`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::{MemoryStore, StoreSnapshot};

use tracing::info;

use crate::config::{StoreBackend, StoreConfig};
use crate::ratings::domain::{
    Criterion, CriterionId, CriterionUpdate, RaterId, Rating, RatingId, RatingKey, RatingValue,
    StateCode, UpsertOutcome,
};
use crate::ratings::repository::{
    CriterionRepository, NewCriterion, RatingRepository, RatingWrite, RepositoryError,
};

/// Backend selected from configuration.
#[derive(Debug)]
pub enum ConfiguredStore {
    Memory(MemoryStore),
    File(FileStore),
}

impl ConfiguredStore {
    pub fn open(config: &StoreConfig) -> Result<Self, RepositoryError> {
        let store = match config.backend {
            StoreBackend::Memory => Self::Memory(MemoryStore::new()),
            StoreBackend::File => Self::File(FileStore::open(&config.data_path)?),
        };
        info!(backend = store.backend_name(), "rating store opened");
        Ok(store)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "file",
        }
    }

    fn criteria(&self) -> &dyn CriterionRepository {
        match self {
            Self::Memory(store) => store,
            Self::File(store) => store,
        }
    }

    fn ratings(&self) -> &dyn RatingRepository {
        match self {
            Self::Memory(store) => store,
            Self::File(store) => store,
        }
    }
}

impl CriterionRepository for ConfiguredStore {
    fn insert(&self, criterion: NewCriterion) -> Result<Criterion, RepositoryError> {
        self.criteria().insert(criterion)
    }

    fn update(
        &self,
        id: &CriterionId,
        update: &CriterionUpdate,
    ) -> Result<Criterion, RepositoryError> {
        self.criteria().update(id, update)
    }

    fn fetch(&self, id: &CriterionId) -> Result<Option<Criterion>, RepositoryError> {
        self.criteria().fetch(id)
    }

    fn list(&self) -> Result<Vec<Criterion>, RepositoryError> {
        self.criteria().list()
    }
}

impl RatingRepository for ConfiguredStore {
    fn upsert(
        &self,
        key: RatingKey,
        value: RatingValue,
        notes: Option<String>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        self.ratings().upsert(key, value, notes)
    }

    fn upsert_many(
        &self,
        writes: Vec<RatingWrite>,
    ) -> Result<Vec<UpsertOutcome>, RepositoryError> {
        self.ratings().upsert_many(writes)
    }

    fn fetch(&self, id: &RatingId) -> Result<Option<Rating>, RepositoryError> {
        self.ratings().fetch(id)
    }

    fn find(&self, key: &RatingKey) -> Result<Option<Rating>, RepositoryError> {
        self.ratings().find(key)
    }

    fn list_by_rater(&self, rater_id: &RaterId) -> Result<Vec<Rating>, RepositoryError> {
        self.ratings().list_by_rater(rater_id)
    }

    fn list_by_state(&self, state_code: &StateCode) -> Result<Vec<Rating>, RepositoryError> {
        self.ratings().list_by_state(state_code)
    }

    fn list_all(&self) -> Result<Vec<Rating>, RepositoryError> {
        self.ratings().list_all()
    }

    fn delete(&self, id: &RatingId) -> Result<bool, RepositoryError> {
        self.ratings().delete(id)
    }
}
