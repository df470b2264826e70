use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    CriterionDraft, CriterionId, CriterionUpdate, RaterId, RatingId, RatingSubmission,
};
use super::exchange::ImportError;
use super::repository::{CriterionRepository, RatingRepository};
use super::scoring::{CriterionFilter, SortField, SortOrder, StateScore, ViewMode};
use super::service::{RatingQuery, RatingService, RatingServiceError};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ScoreParams {
    #[serde(default)]
    pub(crate) view: Option<String>,
    #[serde(default)]
    pub(crate) criterion_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RowParams {
    #[serde(default)]
    pub(crate) criterion_id: Option<String>,
    #[serde(default)]
    pub(crate) sort: Option<String>,
    #[serde(default)]
    pub(crate) order: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AgreementParams {
    #[serde(default)]
    pub(crate) rater_a: Option<RaterId>,
    #[serde(default)]
    pub(crate) rater_b: Option<RaterId>,
}

/// Router builder exposing the rating service over HTTP.
pub fn rating_router<C, R>(service: Arc<RatingService<C, R>>) -> Router
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    Router::new()
        .route("/api/v1/raters", get(raters_handler::<C, R>))
        .route("/api/v1/states", get(states_handler::<C, R>))
        .route("/api/v1/states/:code", get(state_handler::<C, R>))
        .route(
            "/api/v1/states/:code/breakdown",
            get(breakdown_handler::<C, R>),
        )
        .route(
            "/api/v1/criteria",
            get(list_criteria_handler::<C, R>).post(create_criterion_handler::<C, R>),
        )
        .route(
            "/api/v1/criteria/:criterion_id",
            put(update_criterion_handler::<C, R>).delete(deactivate_criterion_handler::<C, R>),
        )
        .route(
            "/api/v1/ratings",
            get(list_ratings_handler::<C, R>).post(upsert_rating_handler::<C, R>),
        )
        .route(
            "/api/v1/ratings/:rating_id",
            get(get_rating_handler::<C, R>).delete(delete_rating_handler::<C, R>),
        )
        .route("/api/v1/scores", get(scores_handler::<C, R>))
        .route("/api/v1/scores/rows", get(rows_handler::<C, R>))
        .route("/api/v1/agreement", get(agreement_handler::<C, R>))
        .route("/api/v1/summary", get(summary_handler::<C, R>))
        .with_state(service)
}

/// HTTP status for a service failure.
pub(crate) fn status_for(error: &RatingServiceError) -> StatusCode {
    match error {
        RatingServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RatingServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        RatingServiceError::Conflict(_) => StatusCode::CONFLICT,
        RatingServiceError::Import(ImportError::Io(_)) | RatingServiceError::Repository(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        RatingServiceError::Import(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

pub(crate) fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Maps service failures onto HTTP status codes with a `{"error": ...}` body.
pub(crate) fn error_response(error: RatingServiceError) -> Response {
    error_body(status_for(&error), error.to_string())
}

/// Malformed or mistyped request bodies get the same payload shape as service errors.
fn rejection_response(rejection: JsonRejection) -> Response {
    error_body(rejection.status(), rejection.body_text())
}

fn respond<T, F>(result: Result<T, RatingServiceError>, on_ok: F) -> Response
where
    F: FnOnce(T) -> Response,
{
    match result {
        Ok(value) => on_ok(value),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn raters_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    Json(service.list_raters().to_vec()).into_response()
}

pub(crate) async fn states_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    Json(service.list_states().to_vec()).into_response()
}

pub(crate) async fn state_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Path(code): Path<String>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    respond(service.get_state(&code), |state| Json(state).into_response())
}

pub(crate) async fn breakdown_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Path(code): Path<String>,
    Query(params): Query<ScoreParams>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let view = ViewMode::parse(params.view.as_deref().unwrap_or_default());
    respond(service.state_breakdown(&code, &view), |breakdown| {
        Json(breakdown).into_response()
    })
}

pub(crate) async fn list_criteria_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    respond(service.list_active_criteria(), |criteria| {
        Json(criteria).into_response()
    })
}

pub(crate) async fn create_criterion_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    body: Result<Json<CriterionDraft>, JsonRejection>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let Json(draft) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    respond(service.create_criterion(draft), |criterion| {
        (StatusCode::CREATED, Json(criterion)).into_response()
    })
}

pub(crate) async fn update_criterion_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Path(criterion_id): Path<String>,
    body: Result<Json<CriterionUpdate>, JsonRejection>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let Json(update) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    let id = CriterionId(criterion_id);
    respond(service.update_criterion(&id, update), |criterion| {
        Json(criterion).into_response()
    })
}

pub(crate) async fn deactivate_criterion_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Path(criterion_id): Path<String>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let id = CriterionId(criterion_id);
    respond(service.deactivate_criterion(&id), |_| {
        StatusCode::NO_CONTENT.into_response()
    })
}

pub(crate) async fn list_ratings_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Query(query): Query<RatingQuery>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    respond(service.list_ratings(&query), |ratings| {
        Json(ratings).into_response()
    })
}

pub(crate) async fn upsert_rating_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    body: Result<Json<RatingSubmission>, JsonRejection>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let Json(submission) = match body {
        Ok(body) => body,
        Err(rejection) => return rejection_response(rejection),
    };
    respond(service.upsert_rating(submission), |outcome| {
        let status = if outcome.created {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        (status, Json(outcome.rating)).into_response()
    })
}

pub(crate) async fn get_rating_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Path(rating_id): Path<String>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let id = RatingId(rating_id);
    respond(service.get_rating(&id), |rating| Json(rating).into_response())
}

pub(crate) async fn delete_rating_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Path(rating_id): Path<String>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let id = RatingId(rating_id);
    match service.delete_rating(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_response(RatingServiceError::not_found("rating", &id)),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn scores_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Query(params): Query<ScoreParams>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let view = ViewMode::parse(params.view.as_deref().unwrap_or_default());
    let filter = CriterionFilter::parse(params.criterion_id.as_deref());
    respond(service.compute_state_scores(&view, &filter), |scores| {
        let views: Vec<_> = scores.iter().map(StateScore::view).collect();
        Json(views).into_response()
    })
}

pub(crate) async fn rows_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Query(params): Query<RowParams>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let filter = CriterionFilter::parse(params.criterion_id.as_deref());
    let field = SortField::parse(params.sort.as_deref());
    let order = SortOrder::parse(params.order.as_deref());
    respond(service.state_rows(&filter, &field, order), |rows| {
        Json(rows).into_response()
    })
}

pub(crate) async fn agreement_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
    Query(params): Query<AgreementParams>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let raters = service.list_raters();
    let rater_a = params
        .rater_a
        .or_else(|| raters.first().map(|rater| rater.id.clone()));
    let rater_b = params
        .rater_b
        .or_else(|| raters.get(1).map(|rater| rater.id.clone()));

    let (Some(rater_a), Some(rater_b)) = (rater_a, rater_b) else {
        return error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            "two raters are required to compute agreement",
        );
    };

    respond(service.compute_agreement(&rater_a, &rater_b), |summary| {
        Json(summary).into_response()
    })
}

pub(crate) async fn summary_handler<C, R>(
    State(service): State<Arc<RatingService<C, R>>>,
) -> Response
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    respond(service.progress_summary(), |summary| {
        Json(summary).into_response()
    })
}
