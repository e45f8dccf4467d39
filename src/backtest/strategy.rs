use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::classifier::{MatchRecord, OddsCategory};
use super::staking::StakingPolicy;

/// Staking family selector for the CLI; Fibonacci expands once per unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum StakingFamily {
    Flat,
    Percentage,
    Fibonacci,
}

/// "N-of-5" hero-count filter. Both sides must independently reach the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum HeroFilter {
    None,
    #[value(name = "4-of-5")]
    FourOfFive,
    #[value(name = "5-of-5")]
    FiveOfFive,
}

impl HeroFilter {
    pub fn required_count(self) -> Option<usize> {
        match self {
            HeroFilter::None => None,
            HeroFilter::FourOfFive => Some(4),
            HeroFilter::FiveOfFive => Some(5),
        }
    }

    pub fn accepts(self, record: &MatchRecord) -> bool {
        match self.required_count() {
            None => true,
            Some(n) => {
                record.favored_qualifying_count >= n && record.opponent_qualifying_count >= n
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HeroFilter::None => "none",
            HeroFilter::FourOfFive => "4-of-5",
            HeroFilter::FiveOfFive => "5-of-5",
        }
    }

    fn key(self) -> &'static str {
        match self {
            HeroFilter::None => "none",
            HeroFilter::FourOfFive => "4of5",
            HeroFilter::FiveOfFive => "5of5",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OddsFilter {
    Any,
    UnderdogOnly,
    FavoriteOnly,
}

impl OddsFilter {
    /// `Even` odds pass only `Any`.
    pub fn accepts(self, record: &MatchRecord) -> bool {
        match self {
            OddsFilter::Any => true,
            OddsFilter::UnderdogOnly => record.odds_category == OddsCategory::Underdog,
            OddsFilter::FavoriteOnly => record.odds_category == OddsCategory::Favorite,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OddsFilter::Any => "any",
            OddsFilter::UnderdogOnly => "underdog-only",
            OddsFilter::FavoriteOnly => "favorite-only",
        }
    }

    fn key(self) -> &'static str {
        match self {
            OddsFilter::Any => "any",
            OddsFilter::UnderdogOnly => "underdog",
            OddsFilter::FavoriteOnly => "favorite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BelowThreshold,
    OddsFilter,
    HeroFilter,
}

/// Declarative strategy recipe. The delta threshold is supplied per run so
/// one config can be swept across many thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    /// Stable identifier, e.g. `fib5_4of5_underdog`
    pub key: String,
    pub staking: StakingPolicy,
    pub hero_filter: HeroFilter,
    pub odds_filter: OddsFilter,
}

impl StrategyConfig {
    pub fn new(staking: StakingPolicy, hero_filter: HeroFilter, odds_filter: OddsFilter) -> Self {
        let key = format!("{}_{}_{}", staking.key(), hero_filter.key(), odds_filter.key());
        Self {
            key,
            staking,
            hero_filter,
            odds_filter,
        }
    }

    /// First check a record fails, in order: threshold (inclusive), odds
    /// filter, hero filter. `None` means the record is bet on.
    pub fn skip_reason(&self, record: &MatchRecord, threshold: f64) -> Option<SkipReason> {
        if record.abs_delta < threshold {
            Some(SkipReason::BelowThreshold)
        } else if !self.odds_filter.accepts(record) {
            Some(SkipReason::OddsFilter)
        } else if !self.hero_filter.accepts(record) {
            Some(SkipReason::HeroFilter)
        } else {
            None
        }
    }
}

/// Parameters that turn family selectors into concrete staking policies.
#[derive(Debug, Clone, PartialEq)]
pub struct StakeParams {
    pub flat_stake: f64,
    pub percentage_fraction: f64,
    pub fibonacci_units: Vec<f64>,
}

impl Default for StakeParams {
    fn default() -> Self {
        Self {
            flat_stake: 100.0,
            percentage_fraction: 0.05,
            fibonacci_units: vec![1.0, 5.0],
        }
    }
}

pub fn policies_for(families: &[StakingFamily], params: &StakeParams) -> Vec<StakingPolicy> {
    let mut out = Vec::new();
    for family in families {
        match family {
            StakingFamily::Flat => out.push(StakingPolicy::Flat {
                amount: params.flat_stake,
            }),
            StakingFamily::Percentage => out.push(StakingPolicy::Percentage {
                fraction: params.percentage_fraction,
            }),
            StakingFamily::Fibonacci => out.extend(
                params
                    .fibonacci_units
                    .iter()
                    .map(|&unit| StakingPolicy::Fibonacci { unit }),
            ),
        }
    }
    out
}

/// Cartesian product staking × hero filter × odds filter, in that nesting order.
pub fn strategy_grid(
    policies: &[StakingPolicy],
    hero_filters: &[HeroFilter],
    odds_filters: &[OddsFilter],
) -> Vec<StrategyConfig> {
    let mut grid = Vec::with_capacity(policies.len() * hero_filters.len() * odds_filters.len());
    for &staking in policies {
        for &hero_filter in hero_filters {
            for &odds_filter in odds_filters {
                grid.push(StrategyConfig::new(staking, hero_filter, odds_filter));
            }
        }
    }
    grid
}
