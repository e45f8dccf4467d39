use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::backtest::{top_results, RankBy, SimulationResult};

pub const CSV_HEADER: &str = "strategy,staking,hero_filter,odds_filter,threshold,bets,wins,losses,win_pct,final_bank,profit,total_staked,roi,max_drawdown,max_stake,max_step,bankrupt";

/// Write the result table as CSV, one row per (strategy, threshold).
pub fn write_csv<W: Write>(mut out: W, results: &[SimulationResult]) -> Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for r in results {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{:.2},{:.2},{:.2},{:.2},{:.4},{:.2},{:.2},{},{}",
            r.strategy,
            r.staking,
            r.hero_filter,
            r.odds_filter,
            r.threshold,
            r.bets,
            r.wins,
            r.losses,
            r.win_rate * 100.0,
            r.final_bankroll,
            r.profit,
            r.total_staked,
            r.roi,
            r.max_drawdown,
            r.max_stake,
            r.max_step,
            r.bankrupt
        )?;
    }
    out.flush()?;
    Ok(())
}

pub fn export_csv(path: impl AsRef<Path>, results: &[SimulationResult]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(BufWriter::new(file), results)?;
    info!("Wrote {} result row(s) to {}", results.len(), path.display());
    Ok(())
}

fn log_ranking(title: &str, rows: &[&SimulationResult]) {
    if rows.is_empty() {
        return;
    }
    info!("{}", title);
    for (i, r) in rows.iter().enumerate() {
        info!(
            "  {:>2}. {:<28} Δ≥{:<6} bets={:<5} win={:>5.1}% bank=${:>10.2} roi={:>+7.2}% dd=${:.2}",
            i + 1,
            r.strategy,
            r.threshold,
            r.bets,
            r.win_rate * 100.0,
            r.final_bankroll,
            r.roi * 100.0,
            r.max_drawdown
        );
    }
}

/// Log the best rows by ROI and by final bankroll.
pub fn log_summary(results: &[SimulationResult], limit: usize) {
    let bankrupt = results.iter().filter(|r| r.bankrupt).count();
    info!(
        "{} result row(s), {} with bets, {} bankrupt",
        results.len(),
        results.iter().filter(|r| r.bets > 0).count(),
        bankrupt
    );
    log_ranking(
        &format!("Top {} by ROI", limit),
        &top_results(results, RankBy::Roi, limit),
    );
    log_ranking(
        &format!("Top {} by final bankroll", limit),
        &top_results(results, RankBy::FinalBankroll, limit),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SimulationResult {
        SimulationResult {
            strategy: "fib5_4of5_underdog".into(),
            staking: "fibonacci-5".into(),
            hero_filter: "4-of-5".into(),
            odds_filter: "underdog-only".into(),
            threshold: 25.0,
            bets: 8,
            wins: 3,
            losses: 5,
            win_rate: 0.375,
            starting_bankroll: 1000.0,
            final_bankroll: 1012.5,
            profit: 12.5,
            total_staked: 90.0,
            roi: 12.5 / 90.0,
            max_drawdown: 40.0,
            max_stake: 25.0,
            max_step: 4,
            bankrupt: false,
        }
    }

    #[test]
    fn csv_has_header_and_formatted_row() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[row()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some("fib5_4of5_underdog,fibonacci-5,4-of-5,underdog-only,25,8,3,5,37.50,1012.50,12.50,90.00,0.1389,40.00,25.00,4,false")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn export_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("results.csv");
        export_csv(&path, &[row(), row()]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
