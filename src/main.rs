use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

mod backtest;
mod config;
mod data;
mod db;
mod report;

use backtest::{
    classify_all, policies_for, run_sweep, strategy_grid, ClassifierSettings, MissingCellPolicy,
    SimulatorSettings, StakeParams,
};
use config::Config;
use data::MatchFilter;
use db::{models::SweepRun, Database};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    let started_at = Utc::now();

    let policy = if config.backfill_mirror {
        MissingCellPolicy::Mirror
    } else {
        MissingCellPolicy::Zero
    };
    let matrix = data::load_matrix(&config.matrix_path, policy)?;

    let filter = MatchFilter {
        start_date: config.start_date,
        end_date: config.end_date,
        championships: config.championships.clone(),
    };
    let raws = data::load_matches(&config.matches_path, &filter)?;

    let classifier_settings = ClassifierSettings {
        qualifier_cutoff: config.qualifier_cutoff,
        roster_limit: config.roster_limit,
    };
    let classified = classify_all(&raws, &matrix, &classifier_settings);

    let params = StakeParams {
        flat_stake: config.flat_stake,
        percentage_fraction: config.percentage_fraction,
        fibonacci_units: config.fibonacci_units.clone(),
    };
    let policies = policies_for(&config.families, &params);
    let configs = strategy_grid(&policies, &config.hero_filters, &config.odds_filters);

    let sim_settings = SimulatorSettings {
        starting_bankroll: config.starting_bankroll,
        max_bet: config.max_bet,
    };
    let records: Arc<[_]> = Arc::from(classified.records);
    let thresholds: Arc<[f64]> = Arc::from(config.thresholds.clone());
    let results = run_sweep(Arc::clone(&records), configs, thresholds, sim_settings).await?;

    report::export_csv(&config.output_path, &results)?;
    report::log_summary(&results, config.top);

    if let Some(path) = &config.database_path {
        let db = Database::open(path)?;
        let discards = classified.discards;
        let run = SweepRun {
            id: None,
            matrix_path: config.matrix_path.clone(),
            matches_path: config.matches_path.clone(),
            matches_loaded: raws.len() as i64,
            matches_classified: records.len() as i64,
            discarded_unknown_hero: discards.unknown_hero as i64,
            discarded_malformed_odds: discards.malformed_odds as i64,
            discarded_tie: discards.zero_delta_tie as i64,
            discarded_roster: discards.malformed_roster as i64,
            starting_bankroll: config.starting_bankroll,
            max_bet: config.max_bet,
            qualifier_cutoff: config.qualifier_cutoff,
            roster_limit: config.roster_limit.map(|l| l as i64),
            started_at,
            finished_at: None,
        };
        let run_id = db.insert_run(&run)?;
        let stored = db.insert_results(run_id, &results)?;
        db.finish_run(run_id)?;
        info!("Stored sweep run {} with {} result row(s) in {}", run_id, stored, path);
    }

    Ok(())
}
