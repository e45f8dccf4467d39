//! Hero-vs-hero matchup advantage matrix.
//!
//! `delta[i][j]` is the advantage of hero `i` against hero `j` in percentage
//! points relative to an even 50% matchup. Positive values favour `i`.
//! The matrix is built once per run and is read-only afterwards.

use std::collections::HashMap;

use thiserror::Error;

/// Baseline win rate assumed for a hero the source data has no figure for.
pub const DEFAULT_WIN_RATE: f64 = 50.0;

pub type HeroIndex = usize;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LookupError {
    #[error("unknown hero name '{0}'")]
    UnknownHero(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatrixError {
    #[error("matrix has no heroes")]
    Empty,
    #[error("matrix has {found} rows but {expected} heroes")]
    RowCount { expected: usize, found: usize },
    #[error("row {row} ({hero}) has {found} columns, expected {expected}")]
    ColumnCount {
        row: usize,
        hero: String,
        expected: usize,
        found: usize,
    },
    #[error("self-matchup cell for {0} must be null")]
    DiagonalNotNull(String),
    #[error("non-finite matchup value for {hero} vs {opponent}")]
    NonFinite { hero: String, opponent: String },
    #[error("{found} win rates supplied for {expected} heroes")]
    WinRateCount { expected: usize, found: usize },
    #[error("hero names '{first}' and '{second}' normalize to the same key")]
    Ambiguous { first: String, second: String },
    #[error("alias '{alias}' points at unknown hero '{target}'")]
    AliasTarget { alias: String, target: String },
}

/// How cells with no recorded data are resolved at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingCellPolicy {
    /// Absent cells carry no signal and read as 0.0.
    #[default]
    Zero,
    /// Absent cells are backfilled with the negated mirror cell when that
    /// one is present; otherwise they stay at 0.0.
    Mirror,
}

/// Lower-case ASCII alphanumerics only, so "Nature's Prophet",
/// "natures-prophet" and "NaturesProphet" share one key.
pub fn normalize_hero_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone)]
pub struct Hero {
    pub name: String,
    pub baseline_win_rate: f64,
}

#[derive(Debug, Clone)]
pub struct HeroMatchupMatrix {
    heroes: Vec<Hero>,
    index: HashMap<String, HeroIndex>,
    deltas: Vec<Vec<Option<f64>>>,
}

impl HeroMatchupMatrix {
    /// Validate and build the matrix.
    ///
    /// * `win_rates` may be empty (every hero gets [`DEFAULT_WIN_RATE`]);
    ///   otherwise it must have one entry per hero, `None` meaning no data.
    /// * `deltas` must be square over the hero list with a null diagonal.
    pub fn new(
        names: Vec<String>,
        win_rates: Vec<Option<f64>>,
        mut deltas: Vec<Vec<Option<f64>>>,
        policy: MissingCellPolicy,
    ) -> Result<Self, MatrixError> {
        let n = names.len();
        if n == 0 {
            return Err(MatrixError::Empty);
        }
        if deltas.len() != n {
            return Err(MatrixError::RowCount {
                expected: n,
                found: deltas.len(),
            });
        }
        if !win_rates.is_empty() && win_rates.len() != n {
            return Err(MatrixError::WinRateCount {
                expected: n,
                found: win_rates.len(),
            });
        }

        for (i, row) in deltas.iter().enumerate() {
            if row.len() != n {
                return Err(MatrixError::ColumnCount {
                    row: i,
                    hero: names[i].clone(),
                    expected: n,
                    found: row.len(),
                });
            }
            if row[i].is_some() {
                return Err(MatrixError::DiagonalNotNull(names[i].clone()));
            }
            for (j, cell) in row.iter().enumerate() {
                if matches!(cell, Some(v) if !v.is_finite()) {
                    return Err(MatrixError::NonFinite {
                        hero: names[i].clone(),
                        opponent: names[j].clone(),
                    });
                }
            }
        }

        if policy == MissingCellPolicy::Mirror {
            for i in 0..n {
                for j in 0..n {
                    if i != j && deltas[i][j].is_none() {
                        deltas[i][j] = deltas[j][i].map(|v| -v);
                    }
                }
            }
        }

        let mut index: HashMap<String, HeroIndex> = HashMap::with_capacity(n);
        for (i, name) in names.iter().enumerate() {
            if let Some(&prev) = index.get(&normalize_hero_name(name)) {
                return Err(MatrixError::Ambiguous {
                    first: names[prev].clone(),
                    second: name.clone(),
                });
            }
            index.insert(normalize_hero_name(name), i);
        }

        let heroes = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Hero {
                name,
                baseline_win_rate: win_rates
                    .get(i)
                    .copied()
                    .flatten()
                    .filter(|wr| wr.is_finite())
                    .unwrap_or(DEFAULT_WIN_RATE),
            })
            .collect();

        Ok(Self {
            heroes,
            index,
            deltas,
        })
    }

    /// Register alternative spellings. Each alias must resolve to a hero
    /// already in the matrix and must not collide with another hero's key.
    pub fn with_aliases<I>(mut self, aliases: I) -> Result<Self, MatrixError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (alias, target) in aliases {
            let idx = self
                .lookup(&target)
                .map_err(|_| MatrixError::AliasTarget {
                    alias: alias.clone(),
                    target: target.clone(),
                })?;
            let key = normalize_hero_name(&alias);
            match self.index.get(&key) {
                Some(&existing) if existing != idx => {
                    return Err(MatrixError::Ambiguous {
                        first: self.heroes[existing].name.clone(),
                        second: alias,
                    });
                }
                Some(_) => {}
                None => {
                    self.index.insert(key, idx);
                }
            }
        }
        Ok(self)
    }

    pub fn hero_count(&self) -> usize {
        self.heroes.len()
    }

    pub fn lookup(&self, name: &str) -> Result<HeroIndex, LookupError> {
        self.index
            .get(&normalize_hero_name(name))
            .copied()
            .ok_or_else(|| LookupError::UnknownHero(name.to_string()))
    }

    /// Advantage of `hero` over `opponent`; 0.0 when there is no data.
    pub fn advantage(&self, hero: HeroIndex, opponent: HeroIndex) -> f64 {
        self.deltas
            .get(hero)
            .and_then(|row| row.get(opponent))
            .copied()
            .flatten()
            .unwrap_or(0.0)
    }

    pub fn baseline_win_rate(&self, hero: HeroIndex) -> f64 {
        self.heroes
            .get(hero)
            .map(|h| h.baseline_win_rate)
            .unwrap_or(DEFAULT_WIN_RATE)
    }

    /// Sum of `hero`'s advantage against every listed opponent.
    pub fn matchup_contribution(&self, hero: HeroIndex, opponents: &[HeroIndex]) -> f64 {
        opponents.iter().map(|&opp| self.advantage(hero, opp)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn three_hero_matrix(policy: MissingCellPolicy) -> HeroMatchupMatrix {
        HeroMatchupMatrix::new(
            names(&["Anti-Mage", "Nature's Prophet", "Axe"]),
            vec![Some(48.5), None, Some(52.0)],
            vec![
                vec![None, Some(2.5), None],
                vec![Some(-2.5), None, Some(1.0)],
                vec![Some(3.0), None, None],
            ],
            policy,
        )
        .expect("valid matrix")
    }

    #[test]
    fn lookup_ignores_case_and_punctuation() {
        let m = three_hero_matrix(MissingCellPolicy::Zero);
        assert_eq!(m.lookup("anti mage"), Ok(0));
        assert_eq!(m.lookup("ANTIMAGE"), Ok(0));
        assert_eq!(m.lookup("natures-prophet"), Ok(1));
        assert_eq!(
            m.lookup("Invoker"),
            Err(LookupError::UnknownHero("Invoker".into()))
        );
    }

    #[test]
    fn missing_cells_read_as_zero_without_mirror() {
        let m = three_hero_matrix(MissingCellPolicy::Zero);
        assert_relative_eq!(m.advantage(0, 1), 2.5, epsilon = 1e-12);
        assert_relative_eq!(m.advantage(0, 2), 0.0, epsilon = 1e-12);
        assert_relative_eq!(m.advantage(1, 2), 1.0, epsilon = 1e-12);
        assert_relative_eq!(m.advantage(2, 1), 0.0, epsilon = 1e-12);
        assert_relative_eq!(m.advantage(1, 1), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn mirror_policy_backfills_from_opposite_cell() {
        let m = three_hero_matrix(MissingCellPolicy::Mirror);
        assert_relative_eq!(m.advantage(0, 2), -3.0, epsilon = 1e-12);
        assert_relative_eq!(m.advantage(2, 1), -1.0, epsilon = 1e-12);
        // present cells untouched
        assert_relative_eq!(m.advantage(1, 0), -2.5, epsilon = 1e-12);
    }

    #[test]
    fn baseline_defaults_to_fifty() {
        let m = three_hero_matrix(MissingCellPolicy::Zero);
        assert_relative_eq!(m.baseline_win_rate(0), 48.5, epsilon = 1e-12);
        assert_relative_eq!(m.baseline_win_rate(1), DEFAULT_WIN_RATE, epsilon = 1e-12);

        let no_rates = HeroMatchupMatrix::new(
            names(&["A", "B"]),
            Vec::new(),
            vec![vec![None, Some(1.0)], vec![Some(-1.0), None]],
            MissingCellPolicy::Zero,
        )
        .unwrap();
        assert_relative_eq!(no_rates.baseline_win_rate(1), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_non_null_diagonal() {
        let err = HeroMatchupMatrix::new(
            names(&["A", "B"]),
            Vec::new(),
            vec![vec![Some(0.0), None], vec![None, None]],
            MissingCellPolicy::Zero,
        )
        .unwrap_err();
        assert_eq!(err, MatrixError::DiagonalNotNull("A".into()));
    }

    #[test]
    fn rejects_shape_mismatches() {
        let rows = HeroMatchupMatrix::new(
            names(&["A", "B"]),
            Vec::new(),
            vec![vec![None, None]],
            MissingCellPolicy::Zero,
        )
        .unwrap_err();
        assert_eq!(rows, MatrixError::RowCount { expected: 2, found: 1 });

        let cols = HeroMatchupMatrix::new(
            names(&["A", "B"]),
            Vec::new(),
            vec![vec![None, None], vec![None]],
            MissingCellPolicy::Zero,
        )
        .unwrap_err();
        assert!(matches!(cols, MatrixError::ColumnCount { row: 1, .. }));

        let rates = HeroMatchupMatrix::new(
            names(&["A", "B"]),
            vec![Some(50.0)],
            vec![vec![None, None], vec![None, None]],
            MissingCellPolicy::Zero,
        )
        .unwrap_err();
        assert_eq!(rates, MatrixError::WinRateCount { expected: 2, found: 1 });
    }

    #[test]
    fn rejects_names_that_collide_after_normalization() {
        let err = HeroMatchupMatrix::new(
            names(&["Queen of Pain", "queen-of-pain"]),
            Vec::new(),
            vec![vec![None, None], vec![None, None]],
            MissingCellPolicy::Zero,
        )
        .unwrap_err();
        assert!(matches!(err, MatrixError::Ambiguous { .. }));
    }

    #[test]
    fn aliases_resolve_to_canonical_hero() {
        let m = three_hero_matrix(MissingCellPolicy::Zero)
            .with_aliases(vec![("Furion".to_string(), "Nature's Prophet".to_string())])
            .unwrap();
        assert_eq!(m.lookup("furion"), Ok(1));

        let bad = three_hero_matrix(MissingCellPolicy::Zero)
            .with_aliases(vec![("Carl".to_string(), "Invoker".to_string())])
            .unwrap_err();
        assert!(matches!(bad, MatrixError::AliasTarget { .. }));
    }

    #[test]
    fn contribution_sums_over_opponents() {
        let m = three_hero_matrix(MissingCellPolicy::Zero);
        assert_relative_eq!(m.matchup_contribution(1, &[0, 2]), -1.5, epsilon = 1e-12);
    }
}
