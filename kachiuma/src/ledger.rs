//! The official payout ledger: normalised payout lines, indexed by race and bet type.
//!
//! Payout records arrive as text, one row per race and bet type. Place and Wide rows pack their three
//! payout lines into a single multi-valued cell; these are exploded into separate [PayoutLine]s.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum::EnumCount;
use thiserror::Error;
use tracing::debug;

use crate::bet::{BetType, Selection, SelectionError};
use crate::race::RaceId;

/// Separators between the values of a multi-valued Place or Wide cell.
const VALUE_SEPARATORS: [&str; 2] = ["br", "\n"];

/// A payout record as supplied by the scraper or the database, before normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPayoutRow {
    pub race_id: RaceId,
    #[serde(alias = "betting")]
    pub bet_type: String,
    #[serde(alias = "horse_number")]
    pub selection: String,
    #[serde(alias = "money")]
    pub amount: String,
    #[serde(alias = "popular")]
    pub popularity: String,
}

/// A single declared payout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutLine {
    pub race_id: RaceId,
    pub bet_type: BetType,
    /// Position of this line among the lines declared for the race and bet type (0-based). For
    /// [BetType::Place], this is the finishing position of the placed horse.
    pub index: usize,
    pub selection: Selection,
    /// Amount returned per 100 units staked.
    pub amount: f64,
    /// Market popularity rank of the winning selection.
    pub popularity: u32,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("race {race_id}: unknown bet type '{label}'")]
    UnknownBetType { race_id: RaceId, label: String },

    #[error("race {race_id}: malformed {bet_type} payout amount '{value}'")]
    MalformedAmount {
        race_id: RaceId,
        bet_type: BetType,
        value: String,
    },

    #[error("race {race_id}: malformed {bet_type} popularity '{value}'")]
    MalformedPopularity {
        race_id: RaceId,
        bet_type: BetType,
        value: String,
    },

    #[error("race {race_id}: {source}")]
    MalformedSelection {
        race_id: RaceId,
        #[source]
        source: SelectionError,
    },

    #[error("race {race_id}: {bet_type} row has {selections} selection(s), {amounts} amount(s) and {popularities} popularity value(s)")]
    MisalignedValues {
        race_id: RaceId,
        bet_type: BetType,
        selections: usize,
        amounts: usize,
        popularities: usize,
    },

    #[error("race {race_id}: {lines} {bet_type} payout lines exceed the multiplicity of {multiplicity}")]
    TooManyLines {
        race_id: RaceId,
        bet_type: BetType,
        lines: usize,
        multiplicity: usize,
    },
}

type RaceLines = [Vec<PayoutLine>; BetType::COUNT];

/// Read-only (once built) table of payout lines keyed by race and bet type.
#[derive(Debug, Default)]
pub struct PayoutLedger {
    races: FxHashMap<RaceId, RaceLines>,
}
impl PayoutLedger {
    /// Normalises raw payout rows into a ledger. Any malformed row fails the whole build.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a RawPayoutRow>) -> Result<Self, LedgerError> {
        let mut ledger = Self::default();
        let mut num_rows = 0;
        for row in rows {
            num_rows += 1;
            for line in normalise(row)? {
                ledger.insert(line)?;
            }
        }
        debug!(
            "built ledger of {} lines across {} races from {num_rows} rows",
            ledger.num_lines(),
            ledger.races.len()
        );
        Ok(ledger)
    }

    pub fn insert(&mut self, line: PayoutLine) -> Result<(), LedgerError> {
        if line.selection.len() != line.bet_type.arity() {
            return Err(LedgerError::MalformedSelection {
                race_id: line.race_id.clone(),
                source: SelectionError::WrongArity {
                    bet_type: line.bet_type,
                    selection: line.selection.display(line.bet_type).to_string(),
                    expected: line.bet_type.arity(),
                    actual: line.selection.len(),
                },
            });
        }
        let bet_type = line.bet_type;
        let lines = &mut self.races.entry(line.race_id.clone()).or_default()
            [bet_type.ordinal()];
        if lines.len() == bet_type.multiplicity() {
            return Err(LedgerError::TooManyLines {
                race_id: line.race_id,
                bet_type,
                lines: lines.len() + 1,
                multiplicity: bet_type.multiplicity(),
            });
        }
        lines.push(line);
        Ok(())
    }

    /// Payout lines declared for the given race and bet type. An empty slice means nothing was paid
    /// out (for example, too few finishers) or the race is unknown.
    pub fn get(&self, race_id: &RaceId, bet_type: BetType) -> &[PayoutLine] {
        match self.races.get(race_id) {
            None => &[],
            Some(lines) => &lines[bet_type.ordinal()],
        }
    }

    /// The official 1st-2nd-3rd finishing order, taken from the Trio-Exacta line.
    pub fn finishing_order(&self, race_id: &RaceId) -> Option<&Selection> {
        self.get(race_id, BetType::TrioExacta)
            .first()
            .map(|line| &line.selection)
    }

    pub fn contains_race(&self, race_id: &RaceId) -> bool {
        self.races.contains_key(race_id)
    }

    pub fn race_ids(&self) -> impl Iterator<Item = &RaceId> {
        self.races.keys()
    }

    pub fn num_races(&self) -> usize {
        self.races.len()
    }

    pub fn num_lines(&self) -> usize {
        self.races
            .values()
            .map(|lines| lines.iter().map(Vec::len).sum::<usize>())
            .sum()
    }
}

/// Splits a multi-valued cell. Single-line bet types are never split.
fn split_values(cell: &str, bet_type: BetType) -> Vec<&str> {
    if bet_type.multiplicity() == 1 {
        return vec![cell.trim()];
    }
    let mut values = vec![cell];
    for separator in VALUE_SEPARATORS {
        values = values
            .into_iter()
            .flat_map(|value| value.split(separator))
            .collect();
    }
    values
        .into_iter()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect()
}

fn parse_amount(value: &str) -> Option<f64> {
    value
        .replace(',', "")
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

fn parse_popularity(value: &str) -> Option<u32> {
    value.replace(',', "").trim().parse::<u32>().ok()
}

/// Converts one raw row into its payout lines.
pub fn normalise(row: &RawPayoutRow) -> Result<Vec<PayoutLine>, LedgerError> {
    let bet_type = row
        .bet_type
        .trim()
        .parse::<BetType>()
        .map_err(|_| LedgerError::UnknownBetType {
            race_id: row.race_id.clone(),
            label: row.bet_type.clone(),
        })?;

    let selections = split_values(&row.selection, bet_type);
    let amounts = split_values(&row.amount, bet_type);
    let popularities = split_values(&row.popularity, bet_type);
    if selections.len() != amounts.len() || selections.len() != popularities.len() {
        return Err(LedgerError::MisalignedValues {
            race_id: row.race_id.clone(),
            bet_type,
            selections: selections.len(),
            amounts: amounts.len(),
            popularities: popularities.len(),
        });
    }
    if selections.len() > bet_type.multiplicity() {
        return Err(LedgerError::TooManyLines {
            race_id: row.race_id.clone(),
            bet_type,
            lines: selections.len(),
            multiplicity: bet_type.multiplicity(),
        });
    }

    let mut lines = Vec::with_capacity(selections.len());
    for (index, ((selection, amount), popularity)) in selections
        .into_iter()
        .zip(amounts)
        .zip(popularities)
        .enumerate()
    {
        let selection = Selection::parse(selection, bet_type).map_err(|source| {
            LedgerError::MalformedSelection {
                race_id: row.race_id.clone(),
                source,
            }
        })?;
        let amount = parse_amount(amount).ok_or_else(|| LedgerError::MalformedAmount {
            race_id: row.race_id.clone(),
            bet_type,
            value: amount.into(),
        })?;
        let popularity =
            parse_popularity(popularity).ok_or_else(|| LedgerError::MalformedPopularity {
                race_id: row.race_id.clone(),
                bet_type,
                value: popularity.into(),
            })?;
        lines.push(PayoutLine {
            race_id: row.race_id.clone(),
            bet_type,
            index,
            selection,
            amount,
            popularity,
        });
    }
    Ok(lines)
}

#[cfg(test)]
mod tests;
