use crate::demo::{run_demo, DemoArgs};
use crate::report::{
    run_agreement, run_import, run_scores, AgreementArgs, ImportArgs, ScoresArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use state_ratings::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "State Ratings",
    about = "Rate U.S. states against weighted criteria and compare household opinions",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print weighted state scores, optionally exporting the list as CSV
    Scores(ScoresArgs),
    /// Compare two raters over the states and criteria they both rated
    Agreement(AgreementArgs),
    /// Bulk-load ratings from a CSV file
    Import(ImportArgs),
    /// Seed an in-memory household and walk through scoring and agreement
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Scores(args) => run_scores(args),
        Command::Agreement(args) => run_agreement(args),
        Command::Import(args) => run_import(args),
        Command::Demo(args) => run_demo(args),
    }
}
