use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One invocation of the backtester: inputs and classification outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRun {
    pub id: Option<i64>,
    pub matrix_path: String,
    pub matches_path: String,
    /// Rows loaded after date/championship filtering
    pub matches_loaded: i64,
    /// Rows that survived classification
    pub matches_classified: i64,
    pub discarded_unknown_hero: i64,
    pub discarded_malformed_odds: i64,
    pub discarded_tie: i64,
    pub discarded_roster: i64,
    pub starting_bankroll: f64,
    pub max_bet: f64,
    pub qualifier_cutoff: f64,
    pub roster_limit: Option<i64>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
