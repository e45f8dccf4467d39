use chrono::NaiveDate;
use clap::Parser;

use crate::backtest::strategy::{HeroFilter, OddsFilter, StakingFamily};

/// Backtest wagering strategies against historical esports matches using a
/// hero matchup advantage matrix
#[derive(Parser, Debug, Clone)]
#[command(name = "matchup-backtester", version, about)]
pub struct Config {
    /// Matchup matrix JSON (heroes, win_rates, deltas, aliases)
    #[arg(long, env = "MATRIX_PATH")]
    pub matrix_path: String,

    /// Match table, one JSON object per line
    #[arg(long, env = "MATCHES_PATH")]
    pub matches_path: String,

    /// Result table CSV output path
    #[arg(long, env = "OUTPUT_PATH", default_value = "strategy_results.csv")]
    pub output_path: String,

    /// SQLite database path; when set, the sweep and its results are stored
    #[arg(long, env = "DATABASE_PATH")]
    pub database_path: Option<String>,

    /// Starting bankroll for every simulation run
    #[arg(long, env = "STARTING_BANKROLL", default_value = "1000.0")]
    pub starting_bankroll: f64,

    /// Maximum single stake
    #[arg(long, env = "MAX_BET", default_value = "10000.0")]
    pub max_bet: f64,

    /// Stake for the flat family
    #[arg(long, env = "FLAT_STAKE", default_value = "100.0")]
    pub flat_stake: f64,

    /// Bankroll fraction for the percentage family (0.05 = 5%)
    #[arg(long, env = "PERCENTAGE_FRACTION", default_value = "0.05")]
    pub percentage_fraction: f64,

    /// Fibonacci base units; each unit is its own strategy family
    #[arg(long, env = "FIBONACCI_UNITS", value_delimiter = ',', default_values = ["1", "5"])]
    pub fibonacci_units: Vec<f64>,

    /// Minimum |delta| thresholds to sweep
    #[arg(
        long,
        env = "THRESHOLDS",
        value_delimiter = ',',
        default_values = ["5", "10", "15", "20", "25", "30", "35", "40", "45", "50", "75", "100", "125", "150"]
    )]
    pub thresholds: Vec<f64>,

    /// Staking families to include
    #[arg(
        long,
        env = "FAMILIES",
        value_enum,
        value_delimiter = ',',
        default_values = ["flat", "percentage", "fibonacci"]
    )]
    pub families: Vec<StakingFamily>,

    /// Hero-count filters to include
    #[arg(
        long,
        env = "HERO_FILTERS",
        value_enum,
        value_delimiter = ',',
        default_values = ["none", "4-of-5", "5-of-5"]
    )]
    pub hero_filters: Vec<HeroFilter>,

    /// Odds filters to include
    #[arg(
        long,
        env = "ODDS_FILTERS",
        value_enum,
        value_delimiter = ',',
        default_values = ["any", "underdog-only", "favorite-only"]
    )]
    pub odds_filters: Vec<OddsFilter>,

    /// Per-hero contribution cutoff for the N-of-5 filters (0 = sign only)
    #[arg(long, env = "QUALIFIER_CUTOFF", default_value = "0.0")]
    pub qualifier_cutoff: f64,

    /// Use only the first N heroes of each roster (4 or 5)
    #[arg(long, env = "ROSTER_LIMIT")]
    pub roster_limit: Option<usize>,

    /// Fill missing matrix cells from the negated mirror cell instead of 0
    #[arg(long, env = "BACKFILL_MIRROR", default_value = "false")]
    pub backfill_mirror: bool,

    /// Earliest match date to include (YYYY-MM-DD)
    #[arg(long, env = "START_DATE")]
    pub start_date: Option<NaiveDate>,

    /// Latest match date to include (YYYY-MM-DD)
    #[arg(long, env = "END_DATE")]
    pub end_date: Option<NaiveDate>,

    /// Restrict to these championships (repeatable)
    #[arg(long = "championship", env = "CHAMPIONSHIPS", value_delimiter = ',')]
    pub championships: Vec<String>,

    /// Rows shown in each ranking at the end of the sweep
    #[arg(long, env = "TOP", default_value = "10")]
    pub top: usize,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_positive(self.starting_bankroll) {
            anyhow::bail!("starting_bankroll must be finite and positive");
        }
        if !is_positive(self.max_bet) {
            anyhow::bail!("max_bet must be finite and positive");
        }
        if !is_positive(self.flat_stake) {
            anyhow::bail!("flat_stake must be finite and positive");
        }
        if !(self.percentage_fraction > 0.0 && self.percentage_fraction <= 1.0) {
            anyhow::bail!("percentage_fraction must be in (0.0, 1.0]");
        }
        if !self.fibonacci_units.iter().all(|u| is_positive(*u)) {
            anyhow::bail!("fibonacci_units must all be finite and positive");
        }
        if self.families.contains(&StakingFamily::Fibonacci) && self.fibonacci_units.is_empty() {
            anyhow::bail!("fibonacci family selected but no fibonacci_units given");
        }
        if self.thresholds.is_empty() {
            anyhow::bail!("at least one threshold is required");
        }
        if self.thresholds.iter().any(|t| !t.is_finite() || *t < 0.0) {
            anyhow::bail!("thresholds must be finite and non-negative");
        }
        if self.families.is_empty() || self.hero_filters.is_empty() || self.odds_filters.is_empty() {
            anyhow::bail!("families, hero_filters and odds_filters must not be empty");
        }
        if !self.qualifier_cutoff.is_finite() || self.qualifier_cutoff < 0.0 {
            anyhow::bail!("qualifier_cutoff must be finite and non-negative");
        }
        if let Some(limit) = self.roster_limit {
            if limit != 4 && limit != 5 {
                anyhow::bail!("roster_limit must be 4 or 5");
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                anyhow::bail!("start_date {} is after end_date {}", start, end);
            }
        }
        Ok(())
    }
}

/// Finite and strictly positive (rejects NaN and infinities).
fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}
