use std::sync::Arc;

use axum::response::Response;
use serde_json::Value;

use crate::ratings::domain::{
    Criterion, CriterionDraft, CriterionId, CriterionUpdate, RaterId, Rating, RatingId,
    RatingKey, RatingSubmission, RatingValue, StateCode, UpsertOutcome,
};
use crate::ratings::raters::RaterDirectory;
use crate::ratings::repository::{
    CriterionRepository, NewCriterion, RatingRepository, RepositoryError,
};
use crate::ratings::service::RatingService;
use crate::ratings::store::MemoryStore;

pub(super) type MemoryService = RatingService<MemoryStore, MemoryStore>;

pub(super) fn primary() -> RaterId {
    RaterId::from("primary")
}

pub(super) fn secondary() -> RaterId {
    RaterId::from("secondary")
}

pub(super) fn state(code: &str) -> StateCode {
    StateCode::parse(code).expect("valid state code")
}

pub(super) fn build_service() -> (MemoryService, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let service = RatingService::new(store.clone(), store.clone(), RaterDirectory::household());
    (service, store)
}

/// Criteria used by the worked examples: Cost (1.0) and Climate (2.0).
pub(super) struct Fixture {
    pub(super) service: MemoryService,
    pub(super) store: Arc<MemoryStore>,
    pub(super) cost: CriterionId,
    pub(super) climate: CriterionId,
}

pub(super) fn fixture() -> Fixture {
    let (service, store) = build_service();
    let cost = service
        .create_criterion(CriterionDraft::new("Cost", 1.0, "#1976D2"))
        .expect("cost criterion")
        .id;
    let climate = service
        .create_criterion(CriterionDraft::new("Climate", 2.0, "#DC004E"))
        .expect("climate criterion")
        .id;
    Fixture {
        service,
        store,
        cost,
        climate,
    }
}

pub(super) fn submission(
    rater_id: &RaterId,
    state_code: &str,
    criterion_id: &CriterionId,
    value: i64,
) -> RatingSubmission {
    RatingSubmission {
        rater_id: rater_id.clone(),
        state_code: state_code.to_string(),
        criterion_id: criterion_id.clone(),
        value,
        notes: None,
    }
}

pub(super) fn rate(
    service: &MemoryService,
    rater_id: &RaterId,
    state_code: &str,
    criterion_id: &CriterionId,
    value: i64,
) -> UpsertOutcome {
    service
        .upsert_rating(submission(rater_id, state_code, criterion_id, value))
        .expect("rating accepted")
}

/// CA: primary rates Cost 8 / Climate 4, secondary rates Cost 6 / Climate 6.
pub(super) fn rate_california(fixture: &Fixture) {
    rate(&fixture.service, &primary(), "CA", &fixture.cost, 8);
    rate(&fixture.service, &primary(), "CA", &fixture.climate, 4);
    rate(&fixture.service, &secondary(), "CA", &fixture.cost, 6);
    rate(&fixture.service, &secondary(), "CA", &fixture.climate, 6);
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) struct UnavailableStore;

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("store offline".to_string())
}

impl CriterionRepository for UnavailableStore {
    fn insert(&self, _criterion: NewCriterion) -> Result<Criterion, RepositoryError> {
        Err(offline())
    }

    fn update(
        &self,
        _id: &CriterionId,
        _update: &CriterionUpdate,
    ) -> Result<Criterion, RepositoryError> {
        Err(offline())
    }

    fn fetch(&self, _id: &CriterionId) -> Result<Option<Criterion>, RepositoryError> {
        Err(offline())
    }

    fn list(&self) -> Result<Vec<Criterion>, RepositoryError> {
        Err(offline())
    }
}

impl RatingRepository for UnavailableStore {
    fn upsert(
        &self,
        _key: RatingKey,
        _value: RatingValue,
        _notes: Option<String>,
    ) -> Result<UpsertOutcome, RepositoryError> {
        Err(offline())
    }

    fn fetch(&self, _id: &RatingId) -> Result<Option<Rating>, RepositoryError> {
        Err(offline())
    }

    fn find(&self, _key: &RatingKey) -> Result<Option<Rating>, RepositoryError> {
        Err(offline())
    }

    fn list_by_rater(&self, _rater_id: &RaterId) -> Result<Vec<Rating>, RepositoryError> {
        Err(offline())
    }

    fn list_by_state(&self, _state_code: &StateCode) -> Result<Vec<Rating>, RepositoryError> {
        Err(offline())
    }

    fn list_all(&self) -> Result<Vec<Rating>, RepositoryError> {
        Err(offline())
    }

    fn delete(&self, _id: &RatingId) -> Result<bool, RepositoryError> {
        Err(offline())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
