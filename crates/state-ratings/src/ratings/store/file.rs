use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info};

use super::memory::{MemoryStore, StoreSnapshot};
use crate::ratings::domain::{
    Criterion, CriterionId, CriterionUpdate, RaterId, Rating, RatingId, RatingKey, RatingValue,
    StateCode, UpsertOutcome,
};
use crate::ratings::repository::{
    CriterionRepository, NewCriterion, RatingRepository, RatingWrite, RepositoryError,
};

/// Memory store backed by a JSON snapshot on disk.
///
/// Every mutation is staged, written to disk, and only then made visible; a failed write
/// leaves both the file and the in-memory state unchanged.
#[derive(Debug)]
pub struct FileStore {
    inner: MemoryStore,
    path: PathBuf,
}

impl FileStore {
    /// Opens the store at `path`, loading an existing snapshot when the file is present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let inner = match fs::read(&path) {
            Ok(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes).map_err(|err| {
                    RepositoryError::Unavailable(format!(
                        "corrupt snapshot at {}: {err}",
                        path.display()
                    ))
                })?;
                info!(
                    path = %path.display(),
                    criteria = snapshot.criteria.len(),
                    ratings = snapshot.ratings.len(),
                    "loaded rating snapshot"
                );
                MemoryStore::from_snapshot(snapshot)?
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "starting empty rating snapshot");
                MemoryStore::new()
            }
            Err(err) => return Err(unavailable(&path, err)),
        };

        Ok(Self { inner, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec_pretty(snapshot)
            .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| unavailable(parent, err))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|err| unavailable(&tmp, err))?;
        fs::rename(&tmp, &self.path).map_err(|err| unavailable(&self.path, err))?;

        debug!(path = %self.path.display(), "persisted rating snapshot");
        Ok(())
    }
}

fn unavailable(path: &Path, err: io::Error) -> RepositoryError {
    RepositoryError::Unavailable(format!("{}: {err}", path.display()))
}

impl CriterionRepository for FileStore {
    fn insert(&self, criterion: NewCriterion) -> Result<Criterion, RepositoryError> {
        self.inner.transact(
            |state| Ok(state.insert_criterion(criterion)),
            |snapshot| self.write_snapshot(snapshot),
        )
    }

    fn update(
        &self,
        id: &CriterionId,
        update: &CriterionUpdate,
    ) -> Result<Criterion, RepositoryError> {
        self.inner.transact(
            |state| state.update_criterion(id, update),
            |snapshot| self.write_snapshot(snapshot),
        )
    }

    fn fetch(&self, id: &CriterionId) -> Result<Option<Criterion>, RepositoryError> {
        CriterionRepository::fetch(&self.inner, id)
    }

    fn list(&self) -> Result<Vec<Criterion>, RepositoryError> {
        CriterionRepository::list(&self.inner)
    }
}

impl RatingRepository for FileStore {
    fn upsert(
        &self,
        key: RatingKey,
        value: RatingValue,
        notes: Option<String>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let now = Utc::now();
        self.inner.transact(
            |state| state.upsert(RatingWrite { key, value, notes }, now),
            |snapshot| self.write_snapshot(snapshot),
        )
    }

    fn upsert_many(
        &self,
        writes: Vec<RatingWrite>,
    ) -> Result<Vec<UpsertOutcome>, RepositoryError> {
        let now = Utc::now();
        self.inner.transact(
            |state| state.upsert_all(writes, now),
            |snapshot| self.write_snapshot(snapshot),
        )
    }

    fn fetch(&self, id: &RatingId) -> Result<Option<Rating>, RepositoryError> {
        RatingRepository::fetch(&self.inner, id)
    }

    fn find(&self, key: &RatingKey) -> Result<Option<Rating>, RepositoryError> {
        self.inner.find(key)
    }

    fn list_by_rater(&self, rater_id: &RaterId) -> Result<Vec<Rating>, RepositoryError> {
        self.inner.list_by_rater(rater_id)
    }

    fn list_by_state(&self, state_code: &StateCode) -> Result<Vec<Rating>, RepositoryError> {
        self.inner.list_by_state(state_code)
    }

    fn list_all(&self) -> Result<Vec<Rating>, RepositoryError> {
        self.inner.list_all()
    }

    fn delete(&self, id: &RatingId) -> Result<bool, RepositoryError> {
        if RatingRepository::fetch(&self.inner, id)?.is_none() {
            return Ok(false);
        }
        self.inner.transact(
            |state| Ok(state.delete(id)),
            |snapshot| self.write_snapshot(snapshot),
        )
    }
}
