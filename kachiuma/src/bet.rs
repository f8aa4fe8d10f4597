//! Bet types and the [Selection]s placed on them.
//!
//! A [BetType] fixes the number of horses in a selection (its _arity_), whether the order of those
//! horses is significant, and how many independent payout lines a race declares for it.

use std::fmt::{Display, Formatter};

use ordinalizer::Ordinal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter, EnumString};
use thiserror::Error;

use crate::race::HorseNumber;

/// Whether the horses in a selection must finish in the stated order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ordered,
    Unordered,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Ordinal,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum BetType {
    #[strum(to_string = "Win", serialize = "単勝")]
    Win,
    #[strum(to_string = "Place", serialize = "複勝")]
    Place,
    #[strum(to_string = "Quinella", serialize = "馬連")]
    Quinella,
    #[strum(to_string = "Exacta", serialize = "馬単")]
    Exacta,
    #[strum(to_string = "Wide", serialize = "ワイド")]
    Wide,
    #[strum(to_string = "Trio", serialize = "三連複")]
    Trio,
    #[strum(to_string = "TrioExacta", serialize = "三連単")]
    TrioExacta,
}
impl BetType {
    pub fn arity(&self) -> usize {
        match self {
            BetType::Win | BetType::Place => 1,
            BetType::Quinella | BetType::Exacta | BetType::Wide => 2,
            BetType::Trio | BetType::TrioExacta => 3,
        }
    }

    /// Number of payout lines a race declares for this bet type when the field is large enough.
    pub fn multiplicity(&self) -> usize {
        match self {
            BetType::Place | BetType::Wide => 3,
            _ => 1,
        }
    }

    pub fn order(&self) -> Order {
        match self {
            BetType::Exacta | BetType::TrioExacta => Order::Ordered,
            _ => Order::Unordered,
        }
    }

    /// Separator between horse numbers in the textual form of a selection.
    pub fn delimiter(&self) -> &'static str {
        match self.order() {
            Order::Ordered => "→",
            Order::Unordered => "-",
        }
    }

    pub fn native_label(&self) -> &'static str {
        match self {
            BetType::Win => "単勝",
            BetType::Place => "複勝",
            BetType::Quinella => "馬連",
            BetType::Exacta => "馬単",
            BetType::Wide => "ワイド",
            BetType::Trio => "三連複",
            BetType::TrioExacta => "三連単",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("{bet_type} selection '{selection}' names {actual} horse(s), expected {expected}")]
    WrongArity {
        bet_type: BetType,
        selection: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid horse number '{fragment}' in selection '{selection}'")]
    InvalidHorseNumber { selection: String, fragment: String },

    #[error("horse {horse} appears more than once in selection '{selection}'")]
    RepeatedHorse { selection: String, horse: HorseNumber },
}

/// A combination of horses backed by a single bet. Whether two selections are equal depends on the
/// [Order] of the bet type; see [Selection::matches].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    horses: Vec<HorseNumber>,
}
impl Selection {
    pub fn new(horses: Vec<HorseNumber>) -> Self {
        Self { horses }
    }

    pub fn single(horse: HorseNumber) -> Self {
        Self {
            horses: vec![horse],
        }
    }

    pub fn horses(&self) -> &[HorseNumber] {
        &self.horses
    }

    pub fn len(&self) -> usize {
        self.horses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.horses.is_empty()
    }

    pub fn contains(&self, horse: HorseNumber) -> bool {
        self.horses.contains(&horse)
    }

    /// Compares two selections as a sequence when `order` is [Order::Ordered], or as a set otherwise.
    pub fn matches(&self, other: &Selection, order: Order) -> bool {
        if self.horses.len() != other.horses.len() {
            return false;
        }
        match order {
            Order::Ordered => self.horses == other.horses,
            Order::Unordered => self
                .horses
                .iter()
                .all(|horse| other.horses.contains(horse)),
        }
    }

    /// Parses the textual form of a selection, e.g. `"3-7"` for a [BetType::Quinella] or `"3→7→1"` for a
    /// [BetType::TrioExacta].
    pub fn parse(s: &str, bet_type: BetType) -> Result<Self, SelectionError> {
        let mut horses = Vec::with_capacity(bet_type.arity());
        for fragment in s.split(bet_type.delimiter()) {
            let horse = fragment
                .parse::<HorseNumber>()
                .map_err(|_| SelectionError::InvalidHorseNumber {
                    selection: s.into(),
                    fragment: fragment.into(),
                })?;
            if horses.contains(&horse) {
                return Err(SelectionError::RepeatedHorse {
                    selection: s.into(),
                    horse,
                });
            }
            horses.push(horse);
        }
        if horses.len() != bet_type.arity() {
            return Err(SelectionError::WrongArity {
                bet_type,
                selection: s.into(),
                expected: bet_type.arity(),
                actual: horses.len(),
            });
        }
        Ok(Self { horses })
    }

    pub fn display(&self, bet_type: BetType) -> DisplaySelection {
        DisplaySelection {
            selection: self,
            bet_type,
        }
    }
}

impl From<Vec<u8>> for Selection {
    fn from(numbers: Vec<u8>) -> Self {
        Self::new(numbers.into_iter().map(HorseNumber::new).collect())
    }
}

pub struct DisplaySelection<'a> {
    selection: &'a Selection,
    bet_type: BetType,
}

impl<'a> Display for DisplaySelection<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, horse) in self.selection.horses.iter().enumerate() {
            if index != 0 {
                write!(f, "{}", self.bet_type.delimiter())?;
            }
            write!(f, "{horse}")?;
        }
        Ok(())
    }
}
