//! Identifiers for races and the horses running in them.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Master identifier of a race, conventionally 12 digits: year, course, meeting, day and race number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceId(String);
impl RaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The course-local race label, e.g. `"11R"` for `"202305021211"` and `"9R"` for `"202305021209"`.
    pub fn race_label(&self) -> String {
        let chars = self.0.chars().count();
        let digits: String = self.0.chars().skip(chars.saturating_sub(2)).collect();
        let trimmed = digits.trim_start_matches('0');
        format!("{trimmed}R")
    }
}

impl Display for RaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RaceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The saddle-cloth number of a horse; numbering starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HorseNumber(u8);
impl HorseNumber {
    pub fn new(number: u8) -> Self {
        debug_assert!(number > 0, "horse numbers start at 1");
        Self(number)
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Display for HorseNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for HorseNumber {
    fn from(number: u8) -> Self {
        Self::new(number)
    }
}

impl FromStr for HorseNumber {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = s.trim().parse::<u8>()?;
        if number == 0 {
            bail!("invalid horse number");
        }
        Ok(Self(number))
    }
}
