//! Model scores: the seam between an external scoring model and the engine.
//!
//! The engine never trains the production model itself. It consumes a [Scorer] produced by a
//! [ScoreFitter], which may be the bundled least-squares fitter or an adapter around an external
//! library.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::race::{HorseNumber, RaceId};

/// One historical runner: its features, the date of the race and the observed outcome. A non-zero
/// `target` is a positive outcome (a hit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSample {
    pub race_id: RaceId,
    pub horse_number: HorseNumber,
    pub date: NaiveDate,
    pub features: Vec<f64>,
    pub target: f64,
}
impl HistoricalSample {
    pub fn is_hit(&self) -> bool {
        self.target != 0.0
    }
}

pub trait Scorer {
    fn score(&self, features: &[f64]) -> f64;
}

pub trait ScoreFitter {
    type Scorer: Scorer;

    fn fit(&self, samples: &[&HistoricalSample]) -> Result<Self::Scorer, anyhow::Error>;
}

/// Samples dated before `split_date` train the scorer; the rest test it.
pub fn split_by_date(
    samples: &[HistoricalSample],
    split_date: NaiveDate,
) -> (Vec<&HistoricalSample>, Vec<&HistoricalSample>) {
    samples
        .iter()
        .partition(|sample| sample.date < split_date)
}

/// Converts scores to z-scores using the population standard deviation. A zero-variance input maps
/// every score to 0.
pub fn standardise(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return vec![];
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores
        .iter()
        .map(|score| (score - mean).powi(2))
        .sum::<f64>()
        / n;
    let stdev = variance.sqrt();
    if stdev == 0.0 {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|score| (score - mean) / stdev).collect()
}
