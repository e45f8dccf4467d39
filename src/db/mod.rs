use anyhow::{anyhow, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub mod models;
use models::*;

use crate::backtest::SimulationResult;

/// Thread-safe SQLite handle (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection mutex poisoned"))
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    // ── Sweep runs ────────────────────────────────────────────────────────────

    pub fn insert_run(&self, run: &SweepRun) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sweep_runs (
                matrix_path, matches_path, matches_loaded, matches_classified,
                discarded_unknown_hero, discarded_malformed_odds, discarded_tie,
                discarded_roster, starting_bankroll, max_bet, qualifier_cutoff,
                roster_limit, started_at, finished_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                run.matrix_path,
                run.matches_path,
                run.matches_loaded,
                run.matches_classified,
                run.discarded_unknown_hero,
                run.discarded_malformed_odds,
                run.discarded_tie,
                run.discarded_roster,
                run.starting_bankroll,
                run.max_bet,
                run.qualifier_cutoff,
                run.roster_limit,
                run.started_at,
                run.finished_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn finish_run(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE sweep_runs SET finished_at=?1 WHERE id=?2",
            params![Utc::now(), id],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub fn latest_run(&self) -> Result<Option<SweepRun>> {
        use rusqlite::OptionalExtension;

        let conn = self.conn()?;
        let run = conn
            .query_row(
                "SELECT id, matrix_path, matches_path, matches_loaded, matches_classified,
                        discarded_unknown_hero, discarded_malformed_odds, discarded_tie,
                        discarded_roster, starting_bankroll, max_bet, qualifier_cutoff,
                        roster_limit, started_at, finished_at
                 FROM sweep_runs ORDER BY id DESC LIMIT 1",
                [],
                map_run,
            )
            .optional()?;
        Ok(run)
    }

    // ── Results ───────────────────────────────────────────────────────────────

    /// Insert every result row for a run in one transaction.
    pub fn insert_results(&self, run_id: i64, results: &[SimulationResult]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO simulation_results (
                    run_id, strategy, staking, hero_filter, odds_filter, threshold,
                    bets, wins, losses, win_rate, starting_bankroll, final_bankroll,
                    profit, total_staked, roi, max_drawdown, max_stake, max_step, bankrupt
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)",
            )?;
            for r in results {
                stmt.execute(params![
                    run_id,
                    r.strategy,
                    r.staking,
                    r.hero_filter,
                    r.odds_filter,
                    r.threshold,
                    r.bets as i64,
                    r.wins as i64,
                    r.losses as i64,
                    r.win_rate,
                    r.starting_bankroll,
                    r.final_bankroll,
                    r.profit,
                    r.total_staked,
                    r.roi,
                    r.max_drawdown,
                    r.max_stake,
                    r.max_step as i64,
                    r.bankrupt,
                ])?;
            }
        }
        tx.commit()?;
        Ok(results.len())
    }

    /// Result rows of a run in insertion order.
    #[cfg(test)]
    pub fn list_results(&self, run_id: i64) -> Result<Vec<SimulationResult>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT strategy, staking, hero_filter, odds_filter, threshold,
                    bets, wins, losses, win_rate, starting_bankroll, final_bankroll,
                    profit, total_staked, roi, max_drawdown, max_stake, max_step, bankrupt
             FROM simulation_results WHERE run_id=?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![run_id], map_result)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

#[cfg(test)]
fn map_run(row: &rusqlite::Row) -> rusqlite::Result<SweepRun> {
    Ok(SweepRun {
        id: row.get(0)?,
        matrix_path: row.get(1)?,
        matches_path: row.get(2)?,
        matches_loaded: row.get(3)?,
        matches_classified: row.get(4)?,
        discarded_unknown_hero: row.get(5)?,
        discarded_malformed_odds: row.get(6)?,
        discarded_tie: row.get(7)?,
        discarded_roster: row.get(8)?,
        starting_bankroll: row.get(9)?,
        max_bet: row.get(10)?,
        qualifier_cutoff: row.get(11)?,
        roster_limit: row.get(12)?,
        started_at: row.get(13)?,
        finished_at: row.get(14)?,
    })
}

#[cfg(test)]
fn map_result(row: &rusqlite::Row) -> rusqlite::Result<SimulationResult> {
    Ok(SimulationResult {
        strategy: row.get(0)?,
        staking: row.get(1)?,
        hero_filter: row.get(2)?,
        odds_filter: row.get(3)?,
        threshold: row.get(4)?,
        bets: row.get::<_, i64>(5)? as usize,
        wins: row.get::<_, i64>(6)? as usize,
        losses: row.get::<_, i64>(7)? as usize,
        win_rate: row.get(8)?,
        starting_bankroll: row.get(9)?,
        final_bankroll: row.get(10)?,
        profit: row.get(11)?,
        total_staked: row.get(12)?,
        roi: row.get(13)?,
        max_drawdown: row.get(14)?,
        max_stake: row.get(15)?,
        max_step: row.get::<_, i64>(16)? as usize,
        bankrupt: row.get(17)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sweep_runs (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    matrix_path              TEXT    NOT NULL,
    matches_path             TEXT    NOT NULL,
    matches_loaded           INTEGER NOT NULL,
    matches_classified       INTEGER NOT NULL,
    discarded_unknown_hero   INTEGER NOT NULL DEFAULT 0,
    discarded_malformed_odds INTEGER NOT NULL DEFAULT 0,
    discarded_tie            INTEGER NOT NULL DEFAULT 0,
    discarded_roster         INTEGER NOT NULL DEFAULT 0,
    starting_bankroll        REAL    NOT NULL,
    max_bet                  REAL    NOT NULL,
    qualifier_cutoff         REAL    NOT NULL DEFAULT 0,
    roster_limit             INTEGER,
    started_at               TEXT    NOT NULL,
    finished_at              TEXT
);

CREATE TABLE IF NOT EXISTS simulation_results (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id            INTEGER NOT NULL,
    strategy          TEXT    NOT NULL,
    staking           TEXT    NOT NULL,
    hero_filter       TEXT    NOT NULL,
    odds_filter       TEXT    NOT NULL,
    threshold         REAL    NOT NULL,
    bets              INTEGER NOT NULL,
    wins              INTEGER NOT NULL,
    losses            INTEGER NOT NULL,
    win_rate          REAL    NOT NULL,
    starting_bankroll REAL    NOT NULL,
    final_bankroll    REAL    NOT NULL,
    profit            REAL    NOT NULL,
    total_staked      REAL    NOT NULL,
    roi               REAL    NOT NULL,
    max_drawdown      REAL    NOT NULL,
    max_stake         REAL    NOT NULL,
    max_step          INTEGER NOT NULL,
    bankrupt          INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (run_id) REFERENCES sweep_runs(id)
);

CREATE INDEX IF NOT EXISTS idx_results_run ON simulation_results(run_id);
CREATE INDEX IF NOT EXISTS idx_results_strategy ON simulation_results(strategy, threshold);
"#;
