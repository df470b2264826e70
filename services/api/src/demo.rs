use crate::report::{render_agreement, render_scores, score_table};
use chrono::Local;
use clap::Args;
use state_ratings::error::AppError;
use state_ratings::ratings::{
    CriterionFilter, CriterionId, MemoryStore, RaterDirectory, RaterId, RatingService,
    RatingSubmission, SortField, SortOrder, StateScore, ViewMode,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of states to show in the ranking
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
}

type DemoService = RatingService<MemoryStore, MemoryStore>;

/// (state, criterion name, primary rating, secondary rating)
const SAMPLE_RATINGS: [(&str, &str, i64, i64); 12] = [
    ("CO", "Cost of Living", 5, 4),
    ("CO", "Climate", 8, 9),
    ("CO", "Job Market", 7, 7),
    ("WA", "Cost of Living", 4, 5),
    ("WA", "Climate", 6, 3),
    ("WA", "Job Market", 9, 8),
    ("TX", "Cost of Living", 8, 7),
    ("TX", "Climate", 3, 6),
    ("TX", "Culture & Entertainment", 7, 8),
    ("VT", "Climate", 5, 8),
    ("VT", "Culture & Entertainment", 6, 4),
    ("NC", "Job Market", 6, 7),
];

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = seeded_service()?;

    println!("State ratings demo ({})", Local::now().format("%Y-%m-%d"));
    println!(
        "Raters: {}",
        service
            .list_raters()
            .iter()
            .map(|rater| format!("{} ({})", rater.label, rater.id))
            .collect::<Vec<_>>()
            .join(", ")
    );
    for criterion in service.list_active_criteria()? {
        println!("  criterion {:<24} weight {:.1}", criterion.name, criterion.weight);
    }

    let rows = service.state_rows(&CriterionFilter::All, &SortField::Combined, SortOrder::Desc)?;
    let scores = service.compute_state_scores(&ViewMode::Combined, &CriterionFilter::All)?;
    println!("\nTop {} states (combined)", args.top);
    render_scores(&score_table(&rows, &scores, None), args.top);

    let partner = partner_scores(&service)?;
    println!("\nTop {} states (Partner only)", args.top);
    render_scores(&score_table(&rows, &partner, Some(SortOrder::Desc)), args.top);

    println!();
    render_agreement(&service, None, None)?;

    let summary = service.progress_summary()?;
    println!(
        "\nProgress: {} of {} states rated",
        summary.rated_state_count, summary.total_states
    );
    Ok(())
}

fn partner_scores(service: &DemoService) -> Result<Vec<StateScore>, AppError> {
    let partner = ViewMode::Rater(RaterId::from("secondary"));
    Ok(service.compute_state_scores(&partner, &CriterionFilter::All)?)
}

fn seeded_service() -> Result<DemoService, AppError> {
    let store = Arc::new(MemoryStore::new());
    let service = RatingService::new(store.clone(), store, RaterDirectory::household());
    service.seed_default_criteria()?;

    let criteria = service.list_active_criteria()?;
    let id_for = |name: &str| -> Option<CriterionId> {
        criteria
            .iter()
            .find(|criterion| criterion.name == name)
            .map(|criterion| criterion.id.clone())
    };

    for (state, criterion, primary, secondary) in SAMPLE_RATINGS {
        let Some(criterion_id) = id_for(criterion) else {
            continue;
        };
        for (rater, value) in [("primary", primary), ("secondary", secondary)] {
            service.upsert_rating(RatingSubmission {
                rater_id: RaterId::from(rater),
                state_code: state.to_string(),
                criterion_id: criterion_id.clone(),
                value,
                notes: None,
            })?;
        }
    }

    Ok(service)
}
