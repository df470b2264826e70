use chrono::Utc;

use super::common::*;
use crate::ratings::domain::{CriterionId, RaterId, Rating, RatingId, RatingValue};
use crate::ratings::scoring::{analyze_agreement, AGREEMENT_TOLERANCE};

fn rating(id: u32, rater: &str, code: &str, criterion: &str, value: i64) -> Rating {
    Rating {
        id: RatingId(format!("rating-{id:06}")),
        rater_id: RaterId::from(rater),
        state_code: state(code),
        criterion_id: CriterionId::from(criterion),
        value: RatingValue::new(value).expect("valid rating"),
        notes: None,
        updated_at: Utc::now(),
    }
}

#[test]
fn difference_at_tolerance_counts_as_agreement() {
    assert_eq!(AGREEMENT_TOLERANCE, 2);
    let ratings = vec![
        rating(1, "primary", "TX", "cost", 5),
        rating(2, "secondary", "TX", "cost", 7),
    ];

    let summary = analyze_agreement(&ratings, &primary(), &secondary());
    assert_eq!(summary.comparisons, 1);
    assert_eq!(summary.agreements, 1);
    assert_eq!(summary.agreement_rate_pct, 100);
    assert_eq!(summary.rated_state_count, 1);
}

#[test]
fn wide_gap_halves_the_rate() {
    let ratings = vec![
        rating(1, "primary", "TX", "cost", 5),
        rating(2, "secondary", "TX", "cost", 7),
        rating(3, "primary", "TX", "climate", 2),
        rating(4, "secondary", "TX", "climate", 9),
    ];

    let summary = analyze_agreement(&ratings, &primary(), &secondary());
    assert_eq!(summary.comparisons, 2);
    assert_eq!(summary.agreements, 1);
    assert_eq!(summary.agreement_rate_pct, 50);
}

#[test]
fn unmatched_pairs_are_not_compared() {
    let ratings = vec![
        rating(1, "primary", "TX", "cost", 5),
        rating(2, "secondary", "OK", "cost", 5),
        rating(3, "guest", "TX", "cost", 5),
    ];

    let summary = analyze_agreement(&ratings, &primary(), &secondary());
    assert_eq!(summary.comparisons, 0);
    assert_eq!(summary.agreement_rate_pct, 0);
    assert_eq!(summary.rated_state_count, 2);
    assert_eq!(
        summary.first_rated_state.map(|code| code.to_string()),
        Some("OK".to_string())
    );
}

#[test]
fn rate_rounds_to_nearest_percent() {
    let ratings = vec![
        rating(1, "primary", "ME", "a", 1),
        rating(2, "secondary", "ME", "a", 1),
        rating(3, "primary", "ME", "b", 1),
        rating(4, "secondary", "ME", "b", 2),
        rating(5, "primary", "ME", "c", 1),
        rating(6, "secondary", "ME", "c", 10),
    ];

    // 2 of 3
    let summary = analyze_agreement(&ratings, &primary(), &secondary());
    assert_eq!(summary.agreement_rate_pct, 67);
}

#[test]
fn service_agreement_follows_upserts() {
    let fixture = fixture();
    rate(&fixture.service, &primary(), "TX", &fixture.cost, 5);
    rate(&fixture.service, &secondary(), "TX", &fixture.cost, 7);

    let summary = fixture
        .service
        .compute_agreement(&primary(), &secondary())
        .expect("agreement");
    assert_eq!(summary.agreement_rate_pct, 100);

    rate(&fixture.service, &primary(), "TX", &fixture.climate, 2);
    rate(&fixture.service, &secondary(), "TX", &fixture.climate, 9);

    let summary = fixture
        .service
        .compute_agreement(&primary(), &secondary())
        .expect("agreement");
    assert_eq!(summary.agreement_rate_pct, 50);
    assert_eq!(
        fixture
            .service
            .progress_summary()
            .expect("summary")
            .agreement_rate_pct,
        50
    );
}

#[test]
fn service_rejects_unknown_raters() {
    let fixture = fixture();
    assert!(fixture
        .service
        .compute_agreement(&primary(), &RaterId::from("ghost"))
        .is_err());
}
