use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// On-disk matchup matrix schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixFile {
    pub heroes: Vec<String>,
    /// Baseline win rate per hero (percentage points); null = no data
    #[serde(default)]
    pub win_rates: Vec<Option<f64>>,
    /// `deltas[i][j]` = advantage of hero i over hero j; diagonal must be null
    pub deltas: Vec<Vec<Option<f64>>>,
    /// Alternative spelling → canonical hero name
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Decimal odds as they appear in the match table. Anything that is not a
/// number or a numeric string is kept so the classifier can count it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOdds {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawOdds {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawOdds::Number(v) => Some(*v),
            RawOdds::Text(s) => s.trim().parse::<f64>().ok(),
            RawOdds::Other(_) => None,
        }
    }
}

/// One historical match as loaded from the match table, before any hero
/// resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMatch {
    #[serde(deserialize_with = "string_or_number")]
    pub match_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub series_id: u64,
    #[serde(default)]
    pub map_number: u32,
    #[serde(default)]
    pub championship: Option<String>,
    pub team1: String,
    pub team2: String,
    pub team1_heroes: Vec<String>,
    pub team2_heroes: Vec<String>,
    #[serde(default)]
    pub team1_odds: Option<RawOdds>,
    #[serde(default)]
    pub team2_odds: Option<RawOdds>,
    pub winner: String,
}

/// Match ids arrive as either JSON strings or integers depending on the
/// exporter that produced the table.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number for match_id, got {}",
            other
        ))),
    }
}
