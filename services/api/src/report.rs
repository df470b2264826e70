use crate::infra::build_service;
use clap::Args;
use state_ratings::config::AppConfig;
use state_ratings::error::AppError;
use state_ratings::ratings::{
    write_rows_csv, CriterionFilter, CriterionRepository, RaterId, RatingRepository,
    RatingService, RatingServiceError, SortField, SortOrder, StateRow, StateScore, ViewMode,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct ScoresArgs {
    /// `combined` or a rater id
    #[arg(long, default_value = "combined")]
    pub(crate) view: String,
    /// Restrict scoring to one criterion id
    #[arg(long)]
    pub(crate) criterion: Option<String>,
    /// `name`, `combined` or a rater id
    #[arg(long)]
    pub(crate) sort: Option<String>,
    /// `asc` or `desc`
    #[arg(long)]
    pub(crate) order: Option<String>,
    /// Only print the first N rows
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Also write the sorted list to this CSV file
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct AgreementArgs {
    /// First rater id (defaults to the first configured rater)
    #[arg(long)]
    pub(crate) rater_a: Option<String>,
    /// Second rater id (defaults to the second configured rater)
    #[arg(long)]
    pub(crate) rater_b: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    /// CSV file with a `rater,state,criterion,rating,notes` header
    #[arg(long)]
    pub(crate) csv: PathBuf,
}

pub(crate) fn run_scores(args: ScoresArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;

    let ScoresArgs {
        view,
        criterion,
        sort,
        order,
        limit,
        csv,
    } = args;
    let view = ViewMode::parse(&view);
    // A single-rater view is ranked by its own scores unless a sort was asked for.
    let rank_by_view = matches!(view, ViewMode::Rater(_)) && sort.is_none();
    let filter = CriterionFilter::parse(criterion.as_deref());
    let field = SortField::parse(sort.as_deref());
    let order = SortOrder::parse(order.as_deref());

    let rows = service.state_rows(&filter, &field, order)?;
    let scores = service.compute_state_scores(&view, &filter)?;

    if let Some(path) = csv {
        let file = File::create(&path)?;
        write_rows_csv(file, &rows, service.list_raters()).map_err(RatingServiceError::from)?;
        info!(path = %path.display(), rows = rows.len(), "exported state list");
        println!("Wrote {} rows to {}", rows.len(), path.display());
    }

    let table = score_table(&rows, &scores, rank_by_view.then_some(order));
    render_scores(&table, limit.unwrap_or(rows.len()));
    Ok(())
}

/// Pairs each list row with the score of the displayed view. Rows keep their list order
/// unless `rank` is given, in which case they are ranked by the displayed score.
pub(crate) fn score_table<'a>(
    rows: &'a [StateRow],
    scores: &'a [StateScore],
    rank: Option<SortOrder>,
) -> Vec<(&'a StateRow, &'a StateScore)> {
    let by_code: HashMap<&str, &StateScore> = scores
        .iter()
        .map(|score| (score.state_code.as_str(), score))
        .collect();

    let mut table: Vec<_> = rows
        .iter()
        .filter_map(|row| by_code.get(row.state_code.as_str()).map(|score| (row, *score)))
        .collect();

    if let Some(order) = rank {
        table.sort_by(|(a_row, a), (b_row, b)| {
            let ranked = ranking_value(a).total_cmp(&ranking_value(b));
            let ranked = match order {
                SortOrder::Asc => ranked,
                SortOrder::Desc => ranked.reverse(),
            };
            ranked.then_with(|| a_row.state_name.cmp(b_row.state_name))
        });
    }
    table
}

fn ranking_value(score: &StateScore) -> f64 {
    if score.has_ratings {
        score.score
    } else {
        0.0
    }
}

pub(crate) fn render_scores(table: &[(&StateRow, &StateScore)], limit: usize) {
    println!("{:<4} {:<16} {:>5}  {:<10}", "Code", "State", "Score", "Band");
    for (row, score) in table.iter().take(limit) {
        let view = score.view();
        let shown = if view.has_ratings {
            format!("{:.1}", view.score)
        } else {
            "-".to_string()
        };
        println!(
            "{:<4} {:<16} {:>5}  {:<10}",
            row.state_code.as_str(),
            row.state_name,
            shown,
            view.band_label
        );
    }
}

pub(crate) fn run_agreement(args: AgreementArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;
    render_agreement(&*service, args.rater_a, args.rater_b)
}

pub(crate) fn render_agreement<C, R>(
    service: &RatingService<C, R>,
    rater_a: Option<String>,
    rater_b: Option<String>,
) -> Result<(), AppError>
where
    C: CriterionRepository + 'static,
    R: RatingRepository + 'static,
{
    let raters = service.list_raters();
    let pick = |explicit: Option<String>, index: usize| -> Result<RaterId, AppError> {
        match explicit {
            Some(id) => Ok(RaterId(id)),
            None => raters
                .get(index)
                .map(|rater| rater.id.clone())
                .ok_or_else(|| {
                    RatingServiceError::not_found("rater", format!("#{}", index + 1)).into()
                }),
        }
    };
    let rater_a = pick(rater_a, 0)?;
    let rater_b = pick(rater_b, 1)?;

    let summary = service.compute_agreement(&rater_a, &rater_b)?;
    let progress = service.progress_summary()?;

    println!("Agreement between {} and {}", summary.rater_a, summary.rater_b);
    println!(
        "  {}% ({} of {} shared ratings within tolerance)",
        summary.agreement_rate_pct, summary.agreements, summary.comparisons
    );
    println!("  States rated by either: {}", summary.rated_state_count);
    match (progress.top_state, progress.top_score) {
        (Some(code), Some(score)) => println!("  Household favourite: {code} ({score:.1})"),
        _ => println!("  Household favourite: none yet"),
    }
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config)?;

    let file = File::open(&args.csv)?;
    let report = service.import_ratings(BufReader::new(file))?;
    println!(
        "Imported {} new and {} updated ratings from {}",
        report.created,
        report.updated,
        args.csv.display()
    );
    Ok(())
}
