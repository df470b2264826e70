use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ratings::domain::{
    normalize_notes, Criterion, CriterionId, CriterionUpdate, RaterId, Rating, RatingId,
    RatingKey, RatingValue, StateCode, UpsertOutcome,
};
use crate::ratings::repository::{
    CriterionRepository, NewCriterion, RatingRepository, RatingWrite, RepositoryError,
};

/// Serializable image of a store, used by the file backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_criterion: u64,
    pub next_rating: u64,
    pub criteria: Vec<Criterion>,
    pub ratings: Vec<Rating>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct StoreState {
    next_criterion: u64,
    next_rating: u64,
    criteria: Vec<Criterion>,
    ratings: BTreeMap<RatingId, Rating>,
    index: HashMap<RatingKey, RatingId>,
}

impl StoreState {
    fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, RepositoryError> {
        let mut state = StoreState {
            next_criterion: snapshot.next_criterion,
            next_rating: snapshot.next_rating,
            criteria: snapshot.criteria,
            ..StoreState::default()
        };

        for rating in snapshot.ratings {
            if state.index.insert(rating.key(), rating.id.clone()).is_some() {
                return Err(RepositoryError::Conflict);
            }
            state.ratings.insert(rating.id.clone(), rating);
        }

        Ok(state)
    }

    fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            next_criterion: self.next_criterion,
            next_rating: self.next_rating,
            criteria: self.criteria.clone(),
            ratings: self.ratings.values().cloned().collect(),
        }
    }

    fn next_criterion_id(&mut self) -> CriterionId {
        self.next_criterion += 1;
        CriterionId(format!("criterion-{:04}", self.next_criterion))
    }

    fn next_rating_id(&mut self) -> RatingId {
        self.next_rating += 1;
        RatingId(format!("rating-{:06}", self.next_rating))
    }

    pub(super) fn insert_criterion(&mut self, criterion: NewCriterion) -> Criterion {
        let stored = Criterion {
            id: self.next_criterion_id(),
            name: criterion.name,
            weight: criterion.weight,
            color: criterion.color,
            active: true,
            created_by: criterion.created_by,
        };
        self.criteria.push(stored.clone());
        stored
    }

    pub(super) fn update_criterion(
        &mut self,
        id: &CriterionId,
        update: &CriterionUpdate,
    ) -> Result<Criterion, RepositoryError> {
        let criterion = self
            .criteria
            .iter_mut()
            .find(|criterion| &criterion.id == id)
            .ok_or(RepositoryError::NotFound)?;
        update.apply(criterion);
        Ok(criterion.clone())
    }

    pub(super) fn upsert(
        &mut self,
        write: RatingWrite,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let RatingWrite { key, value, notes } = write;
        let notes = normalize_notes(notes);

        if let Some(existing_id) = self.index.get(&key).cloned() {
            let rating = self
                .ratings
                .get_mut(&existing_id)
                .ok_or_else(|| RepositoryError::Unavailable("rating index out of sync".into()))?;
            rating.value = value;
            rating.notes = notes;
            rating.updated_at = now;
            return Ok(UpsertOutcome {
                rating: rating.clone(),
                created: false,
            });
        }

        let id = self.next_rating_id();
        let rating = Rating {
            id: id.clone(),
            rater_id: key.rater_id.clone(),
            state_code: key.state_code.clone(),
            criterion_id: key.criterion_id.clone(),
            value,
            notes,
            updated_at: now,
        };
        self.index.insert(key, id.clone());
        self.ratings.insert(id, rating.clone());

        Ok(UpsertOutcome {
            rating,
            created: true,
        })
    }

    pub(super) fn upsert_all(
        &mut self,
        writes: Vec<RatingWrite>,
        now: DateTime<Utc>,
    ) -> Result<Vec<UpsertOutcome>, RepositoryError> {
        writes
            .into_iter()
            .map(|write| self.upsert(write, now))
            .collect()
    }

    pub(super) fn delete(&mut self, id: &RatingId) -> bool {
        match self.ratings.remove(id) {
            Some(rating) => {
                self.index.remove(&rating.key());
                true
            }
            None => false,
        }
    }
}

/// In-process store holding criteria and ratings behind a single lock.
///
/// Ratings are indexed by their composite key so upserts resolve the existing row in O(1).
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self, RepositoryError> {
        Ok(Self {
            state: RwLock::new(StoreState::from_snapshot(snapshot)?),
        })
    }

    pub fn snapshot(&self) -> Result<StoreSnapshot, RepositoryError> {
        Ok(self.read()?.snapshot())
    }

    /// Applies `change` to a staged copy of the state and installs it only after `commit`
    /// accepts the staged snapshot. The write lock is held for the whole call, so a failed
    /// commit leaves the store exactly as it was.
    pub(super) fn transact<T, F, P>(&self, change: F, commit: P) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut StoreState) -> Result<T, RepositoryError>,
        P: FnOnce(&StoreSnapshot) -> Result<(), RepositoryError>,
    {
        let mut guard = self.write()?;
        let mut staged = guard.clone();
        let value = change(&mut staged)?;
        commit(&staged.snapshot())?;
        *guard = staged;
        Ok(value)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>, RepositoryError> {
        self.state
            .read()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>, RepositoryError> {
        self.state
            .write()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    fn filter_ratings<F>(&self, predicate: F) -> Result<Vec<Rating>, RepositoryError>
    where
        F: Fn(&Rating) -> bool,
    {
        let guard = self.read()?;
        Ok(guard
            .ratings
            .values()
            .filter(|rating| predicate(rating))
            .cloned()
            .collect())
    }
}

impl CriterionRepository for MemoryStore {
    fn insert(&self, criterion: NewCriterion) -> Result<Criterion, RepositoryError> {
        Ok(self.write()?.insert_criterion(criterion))
    }

    fn update(
        &self,
        id: &CriterionId,
        update: &CriterionUpdate,
    ) -> Result<Criterion, RepositoryError> {
        self.write()?.update_criterion(id, update)
    }

    fn fetch(&self, id: &CriterionId) -> Result<Option<Criterion>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .criteria
            .iter()
            .find(|criterion| &criterion.id == id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<Criterion>, RepositoryError> {
        Ok(self.read()?.criteria.clone())
    }
}

impl RatingRepository for MemoryStore {
    fn upsert(
        &self,
        key: RatingKey,
        value: RatingValue,
        notes: Option<String>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let now = Utc::now();
        self.write()?.upsert(RatingWrite { key, value, notes }, now)
    }

    fn upsert_many(
        &self,
        writes: Vec<RatingWrite>,
    ) -> Result<Vec<UpsertOutcome>, RepositoryError> {
        let now = Utc::now();
        self.transact(|state| state.upsert_all(writes, now), |_| Ok(()))
    }

    fn fetch(&self, id: &RatingId) -> Result<Option<Rating>, RepositoryError> {
        Ok(self.read()?.ratings.get(id).cloned())
    }

    fn find(&self, key: &RatingKey) -> Result<Option<Rating>, RepositoryError> {
        let guard = self.read()?;
        Ok(guard
            .index
            .get(key)
            .and_then(|id| guard.ratings.get(id))
            .cloned())
    }

    fn list_by_rater(&self, rater_id: &RaterId) -> Result<Vec<Rating>, RepositoryError> {
        self.filter_ratings(|rating| &rating.rater_id == rater_id)
    }

    fn list_by_state(&self, state_code: &StateCode) -> Result<Vec<Rating>, RepositoryError> {
        self.filter_ratings(|rating| &rating.state_code == state_code)
    }

    fn list_all(&self) -> Result<Vec<Rating>, RepositoryError> {
        self.filter_ratings(|_| true)
    }

    fn delete(&self, id: &RatingId) -> Result<bool, RepositoryError> {
        Ok(self.write()?.delete(id))
    }
}
