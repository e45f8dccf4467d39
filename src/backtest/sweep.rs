use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::classifier::MatchRecord;
use super::simulator::{simulate, SimulationResult, SimulatorSettings};
use super::strategy::StrategyConfig;

/// Run one strategy across every threshold, in threshold order.
pub fn run_strategy(
    records: &[MatchRecord],
    config: &StrategyConfig,
    thresholds: &[f64],
    settings: SimulatorSettings,
) -> Vec<SimulationResult> {
    thresholds
        .iter()
        .map(|&t| simulate(records, config, t, settings))
        .collect()
}

/// Run every config × threshold pair. Each config runs on its own blocking
/// worker; the match stream is shared read-only. Output order follows
/// `configs` then `thresholds`, independent of scheduling.
pub async fn run_sweep(
    records: Arc<[MatchRecord]>,
    configs: Vec<StrategyConfig>,
    thresholds: Arc<[f64]>,
    settings: SimulatorSettings,
) -> Result<Vec<SimulationResult>> {
    info!(
        "Sweeping {} strategy config(s) × {} threshold(s) over {} match(es)",
        configs.len(),
        thresholds.len(),
        records.len()
    );

    let handles: Vec<_> = configs
        .into_iter()
        .map(|config| {
            let records = Arc::clone(&records);
            let thresholds = Arc::clone(&thresholds);
            tokio::task::spawn_blocking(move || {
                let rows = run_strategy(&records, &config, &thresholds, settings);
                debug!("Finished {} ({} rows)", config.key, rows.len());
                rows
            })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len() * thresholds.len());
    for handle in handles {
        let rows = handle.await.context("simulation worker panicked")?;
        results.extend(rows);
    }
    Ok(results)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    Roi,
    FinalBankroll,
}

/// Best `limit` rows with at least one bet, highest first. Ties keep sweep order.
pub fn top_results(results: &[SimulationResult], by: RankBy, limit: usize) -> Vec<&SimulationResult> {
    let metric = |r: &SimulationResult| match by {
        RankBy::Roi => r.roi,
        RankBy::FinalBankroll => r.final_bankroll,
    };
    let mut ranked: Vec<&SimulationResult> = results.iter().filter(|r| r.bets > 0).collect();
    ranked.sort_by(|a, b| metric(b).partial_cmp(&metric(a)).unwrap_or(Ordering::Equal));
    ranked.truncate(limit);
    ranked
}
