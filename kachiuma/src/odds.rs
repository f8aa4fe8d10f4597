//! Pre-race place odds estimation.
//!
//! Place odds are only published as a bracket `"low - high"` until the race concludes. The estimate
//! interpolates within the bracket by how strongly the model's top three disagree with the market's.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::race::{HorseNumber, RaceId};

/// Win odds placeholder displayed for a scratched horse.
pub const SCRATCHED: &str = "---.-";

const TOP: usize = 3;
const BRACKET_STEPS: f64 = 9.0;

#[derive(Debug, Error, PartialEq)]
pub enum OddsError {
    #[error("race {race_id}: malformed win odds '{value}' for horse {horse_number}")]
    MalformedWinOdds {
        race_id: RaceId,
        horse_number: HorseNumber,
        value: String,
    },

    #[error("race {race_id}: malformed place odds '{value}' for horse {horse_number}")]
    MalformedPlaceOdds {
        race_id: RaceId,
        horse_number: HorseNumber,
        value: String,
    },

    #[error("race {race_id}: horse {horse_number} listed more than once")]
    DuplicateHorse {
        race_id: RaceId,
        horse_number: HorseNumber,
    },

    #[error("malformed place odds bracket '{0}'")]
    MalformedBracket(String),
}

/// Live odds for one horse as scraped before the race, together with its model score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveOddsRow {
    pub race_id: RaceId,
    pub horse_number: HorseNumber,
    pub win_odds: String,
    pub place_odds: String,
    pub score: f64,
}
impl LiveOddsRow {
    pub fn is_scratched(&self) -> bool {
        self.win_odds.trim() == SCRATCHED
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaceOddsBracket {
    pub low: f64,
    pub high: f64,
}
impl PlaceOddsBracket {
    /// `low + k * (high - low) / 9`, rounded to two decimals.
    pub fn interpolate(&self, k: usize) -> f64 {
        let estimate = self.low + k as f64 * (self.high - self.low) / BRACKET_STEPS;
        (estimate * 100.0).round() / 100.0
    }
}

impl FromStr for PlaceOddsBracket {
    type Err = OddsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || OddsError::MalformedBracket(s.into());
        let (low, high) = s.split_once('-').ok_or_else(malformed)?;
        let low: f64 = low.trim().parse().map_err(|_| malformed())?;
        let high: f64 = high.trim().parse().map_err(|_| malformed())?;
        if !low.is_finite() || !high.is_finite() || low <= 0.0 || low > high {
            return Err(malformed());
        }
        Ok(Self { low, high })
    }
}

/// A running horse with its market popularity and estimated place odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerOdds {
    pub race_id: RaceId,
    pub horse_number: HorseNumber,
    pub win_odds: f64,
    pub place_odds: f64,
    pub popularity: u32,
    pub score: f64,
}

/// Number of horses in the union of the market's and the model's top three, less three. Zero when
/// the two agree on the top three.
pub fn disagreement(market_top: &[HorseNumber], model_top: &[HorseNumber]) -> usize {
    let mut union: Vec<_> = market_top.iter().chain(model_top).copied().collect();
    union.sort();
    union.dedup();
    union.len().saturating_sub(TOP)
}

fn descending_score(a: f64, b: f64) -> Ordering {
    let key = |score: f64| if score.is_nan() { f64::NEG_INFINITY } else { score };
    key(b).total_cmp(&key(a))
}

/// Estimates place odds for the horses of a single race. Scratched horses are dropped. The output is
/// ordered by horse number.
pub fn estimate_race(rows: &[&LiveOddsRow]) -> Result<Vec<RunnerOdds>, OddsError> {
    let mut runners = Vec::with_capacity(rows.len());
    let mut brackets = Vec::with_capacity(rows.len());
    for row in rows.iter().filter(|row| !row.is_scratched()) {
        if runners
            .iter()
            .any(|runner: &RunnerOdds| runner.horse_number == row.horse_number)
        {
            return Err(OddsError::DuplicateHorse {
                race_id: row.race_id.clone(),
                horse_number: row.horse_number,
            });
        }
        let win_odds = row
            .win_odds
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|odds| odds.is_finite() && *odds > 0.0)
            .ok_or_else(|| OddsError::MalformedWinOdds {
                race_id: row.race_id.clone(),
                horse_number: row.horse_number,
                value: row.win_odds.clone(),
            })?;
        let bracket = row.place_odds.parse::<PlaceOddsBracket>().map_err(|_| {
            OddsError::MalformedPlaceOdds {
                race_id: row.race_id.clone(),
                horse_number: row.horse_number,
                value: row.place_odds.clone(),
            }
        })?;
        runners.push(RunnerOdds {
            race_id: row.race_id.clone(),
            horse_number: row.horse_number,
            win_odds,
            place_odds: f64::NAN,
            popularity: 0,
            score: row.score,
        });
        brackets.push(bracket);
    }

    let mut by_market: Vec<_> = (0..runners.len()).collect();
    by_market.sort_by(|&a, &b| {
        runners[a]
            .win_odds
            .total_cmp(&runners[b].win_odds)
            .then(runners[a].horse_number.cmp(&runners[b].horse_number))
    });
    for (rank, &index) in by_market.iter().enumerate() {
        runners[index].popularity = rank as u32 + 1;
    }

    // scratched horses are already gone, so they never count towards the model's top three
    let mut by_model: Vec<_> = (0..runners.len()).collect();
    by_model.sort_by(|&a, &b| {
        descending_score(runners[a].score, runners[b].score)
            .then(runners[a].horse_number.cmp(&runners[b].horse_number))
    });

    let top = |ranked: &[usize]| -> Vec<HorseNumber> {
        ranked
            .iter()
            .take(TOP)
            .map(|&index| runners[index].horse_number)
            .collect()
    };
    let k = disagreement(&top(&by_market), &top(&by_model));
    if let Some(runner) = runners.first() {
        debug!("race {}: market and model disagreement k={k}", runner.race_id);
    }

    for (runner, bracket) in runners.iter_mut().zip(&brackets) {
        runner.place_odds = bracket.interpolate(k);
    }
    runners.sort_by_key(|runner| runner.horse_number);
    Ok(runners)
}

/// Estimates place odds for every race in the table, in ascending race order.
pub fn estimate_place_odds(rows: &[LiveOddsRow]) -> Result<BTreeMap<RaceId, Vec<RunnerOdds>>, OddsError> {
    let mut races: BTreeMap<&RaceId, Vec<&LiveOddsRow>> = BTreeMap::new();
    for row in rows {
        races.entry(&row.race_id).or_default().push(row);
    }
    races
        .into_iter()
        .map(|(race_id, rows)| Ok((race_id.clone(), estimate_race(&rows)?)))
        .collect()
}
