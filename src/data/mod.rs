use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::backtest::matrix::{HeroMatchupMatrix, MissingCellPolicy};

pub mod models;
use models::*;

/// Parse the matrix JSON schema and validate it into a [`HeroMatchupMatrix`].
pub fn parse_matrix(json: &str, policy: MissingCellPolicy) -> Result<HeroMatchupMatrix> {
    let file: MatrixFile = serde_json::from_str(json).context("invalid matrix JSON")?;
    let matrix = HeroMatchupMatrix::new(file.heroes, file.win_rates, file.deltas, policy)?
        .with_aliases(file.aliases)?;
    Ok(matrix)
}

pub fn load_matrix(path: impl AsRef<Path>, policy: MissingCellPolicy) -> Result<HeroMatchupMatrix> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read matrix file {}", path.display()))?;
    let matrix =
        parse_matrix(&json, policy).with_context(|| format!("matrix file {}", path.display()))?;
    info!("Loaded matchup matrix with {} heroes from {}", matrix.hero_count(), path.display());
    Ok(matrix)
}

/// Load-time row selection: inclusive date window and championship list.
#[derive(Debug, Clone, Default)]
pub struct MatchFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Empty = every championship
    pub championships: Vec<String>,
}

impl MatchFilter {
    pub fn accepts(&self, m: &RawMatch) -> bool {
        if self.start_date.is_some_and(|start| m.date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| m.date > end) {
            return false;
        }
        if self.championships.is_empty() {
            return true;
        }
        m.championship.as_deref().is_some_and(|c| {
            self.championships
                .iter()
                .any(|wanted| wanted.eq_ignore_ascii_case(c.trim()))
        })
    }
}

/// Parse a JSON-Lines match table. Blank lines are skipped; any other line
/// that fails to parse aborts the load with its line number.
pub fn parse_matches<R: BufRead>(reader: R, filter: &MatchFilter) -> Result<Vec<RawMatch>> {
    let mut out = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", i + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let m: RawMatch =
            serde_json::from_str(&line).with_context(|| format!("invalid match on line {}", i + 1))?;
        if filter.accepts(&m) {
            out.push(m);
        }
    }
    Ok(out)
}

pub fn load_matches(path: impl AsRef<Path>, filter: &MatchFilter) -> Result<Vec<RawMatch>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("failed to open match table {}", path.display()))?;
    let matches = parse_matches(BufReader::new(file), filter)
        .with_context(|| format!("match table {}", path.display()))?;
    info!("Loaded {} match(es) from {}", matches.len(), path.display());
    Ok(matches)
}
