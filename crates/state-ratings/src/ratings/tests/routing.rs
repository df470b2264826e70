use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::ratings::raters::RaterDirectory;
use crate::ratings::repository::RatingRepository;
use crate::ratings::router::rating_router;
use crate::ratings::service::RatingService;
use crate::ratings::store::MemoryStore;

fn app(fixture: Fixture) -> Router {
    rating_router(Arc::new(fixture.service))
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::post(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn upsert_returns_created_then_ok() {
    let fixture = fixture();
    let cost = fixture.cost.clone();
    let router = app(fixture);
    let payload = json!({
        "rater_id": "primary",
        "state_code": "co",
        "criterion_id": cost,
        "value": 8,
        "notes": "mountains"
    });

    let created = router
        .clone()
        .oneshot(post_json("/api/v1/ratings", payload.clone()))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json_body(created).await;
    assert_eq!(body["state_code"], "CO");
    assert_eq!(body["value"], 8);

    let updated = router
        .oneshot(post_json("/api/v1/ratings", payload))
        .await
        .expect("response");
    assert_eq!(updated.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let fixture = fixture();
    let store = fixture.store.clone();
    let router = app(fixture);

    let broken = Request::post("/api/v1/ratings")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{ \"rater_id\": "))
        .expect("request");
    let response = router.clone().oneshot(broken).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(read_json_body(response).await["error"].is_string());

    let incomplete = router
        .clone()
        .oneshot(post_json("/api/v1/criteria", json!({ "weight": 1.0 })))
        .await
        .expect("response");
    assert_eq!(incomplete.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(read_json_body(incomplete).await["error"].is_string());

    let untyped = Request::post("/api/v1/ratings")
        .body(Body::from("{}"))
        .expect("request");
    let response = router.oneshot(untyped).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(read_json_body(response).await["error"].is_string());

    assert!(store.list_all().expect("ratings").is_empty());
}

#[tokio::test]
async fn out_of_range_rating_is_unprocessable() {
    let fixture = fixture();
    let cost = fixture.cost.clone();
    let response = app(fixture)
        .oneshot(post_json(
            "/api/v1/ratings",
            json!({
                "rater_id": "primary",
                "state_code": "CO",
                "criterion_id": cost,
                "value": 11
            }),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "rating 11 is outside the 1-10 scale");
}

#[tokio::test]
async fn unknown_state_is_not_found() {
    let response = app(fixture())
        .oneshot(get("/api/v1/states/ZZ"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app(fixture())
        .oneshot(get("/api/v1/states/nm"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await["name"], "New Mexico");
}

#[tokio::test]
async fn scores_endpoint_honours_view_and_filter() {
    let fixture = fixture();
    rate_california(&fixture);
    let cost = fixture.cost.clone();
    let router = app(fixture);

    let response = router
        .clone()
        .oneshot(get("/api/v1/scores"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let scores = body.as_array().expect("array");
    assert_eq!(scores.len(), 50);
    let california = scores
        .iter()
        .find(|entry| entry["state_code"] == "CA")
        .expect("CA");
    assert_eq!(california["score"], 5.7);
    assert_eq!(california["band"], "good");

    let filtered = router
        .clone()
        .oneshot(get(&format!("/api/v1/scores?criterion_id={cost}")))
        .await
        .expect("response");
    let body = read_json_body(filtered).await;
    let california = body
        .as_array()
        .expect("array")
        .iter()
        .find(|entry| entry["state_code"] == "CA")
        .cloned()
        .expect("CA");
    assert_eq!(california["score"], 7.0);

    let unknown_view = router
        .oneshot(get("/api/v1/scores?view=stranger"))
        .await
        .expect("response");
    assert_eq!(unknown_view.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn criteria_lifecycle_over_http() {
    let router = app(fixture());

    let created = router
        .clone()
        .oneshot(post_json(
            "/api/v1/criteria",
            json!({ "name": "Schools", "color": "#7B1FA2" }),
        ))
        .await
        .expect("response");
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = read_json_body(created).await;
    assert_eq!(body["weight"], 1.0);
    let id = body["id"].as_str().expect("id").to_string();

    let rejected = router
        .clone()
        .oneshot(
            Request::put(format!("/api/v1/criteria/{id}"))
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "weight": -2.0 }).to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(rejected.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let deactivated = router
        .clone()
        .oneshot(
            Request::delete(format!("/api/v1/criteria/{id}"))
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(deactivated.status(), StatusCode::NO_CONTENT);

    let listed = router
        .oneshot(get("/api/v1/criteria"))
        .await
        .expect("response");
    let body = read_json_body(listed).await;
    let names: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|entry| entry["name"].as_str())
        .collect();
    assert_eq!(names, ["Cost", "Climate"]);
}

#[tokio::test]
async fn deleting_a_missing_rating_is_not_found() {
    let response = app(fixture())
        .oneshot(
            Request::delete("/api/v1/ratings/rating-000404")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn agreement_defaults_to_the_household_pair() {
    let fixture = fixture();
    rate(&fixture.service, &primary(), "TX", &fixture.cost, 5);
    rate(&fixture.service, &secondary(), "TX", &fixture.cost, 7);

    let response = app(fixture)
        .oneshot(get("/api/v1/agreement"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["agreement_rate_pct"], 100);
    assert_eq!(body["rater_a"], "primary");
}

#[tokio::test]
async fn agreement_needs_two_raters() {
    let store = Arc::new(MemoryStore::new());
    let solo = RaterDirectory::new(vec![RaterDirectory::household().list()[0].clone()]);
    let service = Arc::new(RatingService::new(store.clone(), store, solo));

    let response = crate::ratings::router::agreement_handler::<MemoryStore, MemoryStore>(
        State(service),
        axum::extract::Query(Default::default()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn repository_outage_is_internal_error() {
    let store = Arc::new(UnavailableStore);
    let service = Arc::new(RatingService::new(
        store.clone(),
        store,
        RaterDirectory::household(),
    ));

    let response = crate::ratings::router::summary_handler::<UnavailableStore, UnavailableStore>(
        State(service),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("message")
        .contains("store offline"));
}
