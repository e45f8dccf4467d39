//! Per-match classification: resolves rosters against the matchup matrix,
//! picks the favoured side, and derives the fields every strategy filter
//! reads. Records are immutable once built and are shared across every
//! simulation run.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::matrix::{HeroIndex, HeroMatchupMatrix, LookupError};
use crate::data::models::{RawMatch, RawOdds};

/// Aggregate deltas at or below this magnitude count as a tie.
pub const TIE_TOLERANCE: f64 = 1e-9;
pub const FULL_ROSTER: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Team1,
    Team2,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Team1 => write!(f, "team1"),
            Side::Team2 => write!(f, "team2"),
        }
    }
}

/// How the bookmaker prices the side the matrix favours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddsCategory {
    /// Favoured side pays less than its opponent
    Favorite,
    /// Favoured side pays more than its opponent
    Underdog,
    Even,
}

impl OddsCategory {
    pub fn from_odds(favored_odds: f64, opponent_odds: f64) -> Self {
        if favored_odds < opponent_odds {
            OddsCategory::Favorite
        } else if favored_odds > opponent_odds {
            OddsCategory::Underdog
        } else {
            OddsCategory::Even
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("match {match_id}: {source}")]
    UnknownHero {
        match_id: String,
        #[source]
        source: LookupError,
    },
    #[error("match {match_id}: malformed odds ({detail})")]
    MalformedOdds { match_id: String, detail: String },
    #[error("match {match_id}: aggregate scores are tied")]
    ZeroDeltaTie { match_id: String },
    #[error("match {match_id}: {side} roster has {len} heroes")]
    MalformedRoster {
        match_id: String,
        side: Side,
        len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierSettings {
    /// A favoured-side hero qualifies when its contribution is `>= cutoff`;
    /// an opposing hero qualifies when its contribution is `<= -cutoff`.
    /// 0.0 is the plain sign rule.
    pub qualifier_cutoff: f64,
    /// Keep only the first N heroes of each roster (partial-information mode).
    pub roster_limit: Option<usize>,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            qualifier_cutoff: 0.0,
            roster_limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: String,
    pub date: NaiveDate,
    pub series_id: u64,
    pub map_number: u32,
    pub championship: Option<String>,
    pub team1: String,
    pub team2: String,
    pub team1_heroes: Vec<HeroIndex>,
    pub team2_heroes: Vec<HeroIndex>,
    pub team1_odds: f64,
    pub team2_odds: f64,
    pub winner: String,
    /// Side named by `winner`, if it names either team.
    pub winner_side: Option<Side>,
    /// team1 aggregate minus team2 aggregate
    pub delta: f64,
    pub abs_delta: f64,
    pub favored: Side,
    pub odds_category: OddsCategory,
    pub favored_qualifying_count: usize,
    pub opponent_qualifying_count: usize,
}

impl MatchRecord {
    pub fn odds(&self, side: Side) -> f64 {
        match side {
            Side::Team1 => self.team1_odds,
            Side::Team2 => self.team2_odds,
        }
    }

    pub fn favored_odds(&self) -> f64 {
        self.odds(self.favored)
    }

    pub fn favored_won(&self) -> bool {
        self.winner_side == Some(self.favored)
    }
}

fn parse_odds(match_id: &str, side: Side, raw: Option<&RawOdds>) -> Result<f64, ClassifyError> {
    let malformed = |detail: String| ClassifyError::MalformedOdds {
        match_id: match_id.to_string(),
        detail,
    };
    let raw = raw.ok_or_else(|| malformed(format!("{} odds missing", side)))?;
    let value = raw
        .as_f64()
        .ok_or_else(|| malformed(format!("{} odds not numeric: {:?}", side, raw)))?;
    if !value.is_finite() || value <= 1.0 {
        return Err(malformed(format!("{} odds {} must exceed 1.0", side, value)));
    }
    Ok(value)
}

fn resolve_roster(
    raw: &RawMatch,
    side: Side,
    names: &[String],
    matrix: &HeroMatchupMatrix,
    roster_limit: Option<usize>,
) -> Result<Vec<HeroIndex>, ClassifyError> {
    // Both sides resolve to exactly `required` heroes, so the baseline sums
    // in the aggregate always cover the same number of picks.
    let required = roster_limit.unwrap_or(FULL_ROSTER).clamp(1, FULL_ROSTER);
    let len_ok = match roster_limit {
        None => names.len() == FULL_ROSTER,
        Some(_) => names.len() >= required && names.len() <= FULL_ROSTER,
    };
    if !len_ok {
        return Err(ClassifyError::MalformedRoster {
            match_id: raw.match_id.clone(),
            side,
            len: names.len(),
        });
    }
    names
        .iter()
        .take(required)
        .map(|name| {
            matrix
                .lookup(name)
                .map_err(|source| ClassifyError::UnknownHero {
                    match_id: raw.match_id.clone(),
                    source,
                })
        })
        .collect()
}

fn winner_side(raw: &RawMatch) -> Option<Side> {
    let winner = raw.winner.trim();
    if winner.eq_ignore_ascii_case(raw.team1.trim()) {
        Some(Side::Team1)
    } else if winner.eq_ignore_ascii_case(raw.team2.trim()) {
        Some(Side::Team2)
    } else {
        None
    }
}

/// Turn one raw match into a [`MatchRecord`], or explain why it cannot be
/// used.
pub fn classify(
    raw: &RawMatch,
    matrix: &HeroMatchupMatrix,
    settings: &ClassifierSettings,
) -> Result<MatchRecord, ClassifyError> {
    let team1_heroes = resolve_roster(
        raw,
        Side::Team1,
        &raw.team1_heroes,
        matrix,
        settings.roster_limit,
    )?;
    let team2_heroes = resolve_roster(
        raw,
        Side::Team2,
        &raw.team2_heroes,
        matrix,
        settings.roster_limit,
    )?;

    let team1_odds = parse_odds(&raw.match_id, Side::Team1, raw.team1_odds.as_ref())?;
    let team2_odds = parse_odds(&raw.match_id, Side::Team2, raw.team2_odds.as_ref())?;

    let team1_contrib: Vec<f64> = team1_heroes
        .iter()
        .map(|&h| matrix.matchup_contribution(h, &team2_heroes))
        .collect();
    let team2_contrib: Vec<f64> = team2_heroes
        .iter()
        .map(|&h| matrix.matchup_contribution(h, &team1_heroes))
        .collect();

    let aggregate = |heroes: &[HeroIndex], contrib: &[f64]| -> f64 {
        contrib.iter().sum::<f64>()
            + heroes
                .iter()
                .map(|&h| matrix.baseline_win_rate(h))
                .sum::<f64>()
    };
    let delta = aggregate(&team1_heroes, &team1_contrib) - aggregate(&team2_heroes, &team2_contrib);
    if delta.abs() <= TIE_TOLERANCE {
        return Err(ClassifyError::ZeroDeltaTie {
            match_id: raw.match_id.clone(),
        });
    }

    let favored = if delta > 0.0 { Side::Team1 } else { Side::Team2 };
    let (favored_contrib, opponent_contrib) = match favored {
        Side::Team1 => (&team1_contrib, &team2_contrib),
        Side::Team2 => (&team2_contrib, &team1_contrib),
    };
    let cutoff = settings.qualifier_cutoff;
    let favored_qualifying_count = favored_contrib.iter().filter(|&&c| c >= cutoff).count();
    let opponent_qualifying_count = opponent_contrib.iter().filter(|&&c| c <= -cutoff).count();

    let (favored_odds, opponent_odds) = match favored {
        Side::Team1 => (team1_odds, team2_odds),
        Side::Team2 => (team2_odds, team1_odds),
    };

    Ok(MatchRecord {
        match_id: raw.match_id.clone(),
        date: raw.date,
        series_id: raw.series_id,
        map_number: raw.map_number,
        championship: raw.championship.clone(),
        team1: raw.team1.clone(),
        team2: raw.team2.clone(),
        team1_heroes,
        team2_heroes,
        team1_odds,
        team2_odds,
        winner: raw.winner.clone(),
        winner_side: winner_side(raw),
        delta,
        abs_delta: delta.abs(),
        favored,
        odds_category: OddsCategory::from_odds(favored_odds, opponent_odds),
        favored_qualifying_count,
        opponent_qualifying_count,
    })
}

/// Why matches were left out of the classified stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscardCounts {
    pub unknown_hero: usize,
    pub malformed_odds: usize,
    pub zero_delta_tie: usize,
    pub malformed_roster: usize,
}

impl DiscardCounts {
    pub fn record(&mut self, err: &ClassifyError) {
        match err {
            ClassifyError::UnknownHero { .. } => self.unknown_hero += 1,
            ClassifyError::MalformedOdds { .. } => self.malformed_odds += 1,
            ClassifyError::ZeroDeltaTie { .. } => self.zero_delta_tie += 1,
            ClassifyError::MalformedRoster { .. } => self.malformed_roster += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unknown_hero + self.malformed_odds + self.zero_delta_tie + self.malformed_roster
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClassifiedMatches {
    /// Chronologically ordered
    pub records: Vec<MatchRecord>,
    pub discards: DiscardCounts,
    /// Distinct hero names the matrix could not resolve
    pub unmapped_heroes: BTreeSet<String>,
}

/// Numeric ids compare numerically so "9" sorts before "10".
fn compare_match_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

fn chronological(a: &MatchRecord, b: &MatchRecord) -> Ordering {
    a.date
        .cmp(&b.date)
        .then(a.series_id.cmp(&b.series_id))
        .then(a.map_number.cmp(&b.map_number))
        .then_with(|| compare_match_ids(&a.match_id, &b.match_id))
}

/// Classify a whole match table. Unusable rows are counted, never fatal.
pub fn classify_all<'a, I>(
    raws: I,
    matrix: &HeroMatchupMatrix,
    settings: &ClassifierSettings,
) -> ClassifiedMatches
where
    I: IntoIterator<Item = &'a RawMatch>,
{
    let mut out = ClassifiedMatches::default();
    let mut unnamed_winners = 0usize;

    for raw in raws {
        match classify(raw, matrix, settings) {
            Ok(record) => {
                if record.winner_side.is_none() {
                    unnamed_winners += 1;
                }
                out.records.push(record);
            }
            Err(err) => {
                debug!("Discarding match: {}", err);
                if let ClassifyError::UnknownHero {
                    source: LookupError::UnknownHero(name),
                    ..
                } = &err
                {
                    out.unmapped_heroes.insert(name.clone());
                }
                out.discards.record(&err);
            }
        }
    }

    out.records.sort_by(chronological);

    if unnamed_winners > 0 {
        warn!(
            "{} match(es) name a winner that matches neither team; they count as losses",
            unnamed_winners
        );
    }
    if !out.unmapped_heroes.is_empty() {
        warn!(
            "Unmapped hero names: {}",
            out.unmapped_heroes
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    info!(
        "Classified {} match(es); discarded {} (unknown hero={}, malformed odds={}, tie={}, roster={})",
        out.records.len(),
        out.discards.total(),
        out.discards.unknown_hero,
        out.discards.malformed_odds,
        out.discards.zero_delta_tie,
        out.discards.malformed_roster
    );
    out
}
