//! Score calibration: maps a model score range to the break-even odds required for a bet on a horse
//! with that score to have non-negative expected value.
//!
//! The scan range `[lo, hi]` is partitioned into bins of a fixed width, `(lo, lo + w]`, ...,
//! `(hi - w, hi]`, flanked by two open-ended bins `(-∞, lo]` and `(hi, ∞)` that absorb the
//! out-of-range scores.

use std::io;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};
use thiserror::Error;
use tracing::debug;

use crate::csv::{CsvReader, CsvWriter};
use crate::score::{split_by_date, HistoricalSample, ScoreFitter, Scorer};

/// Odds assigned to a bin without a single hit. No realistic market price reaches it, so such a
/// bin never recommends.
pub const SENTINEL_ODDS: f64 = 9999.0;

const CSV_HEADER: [&str; 4] = ["label", "count", "hit_ratio", "odds"];
const LABEL_SEPARATOR: &str = " ~ ";

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("invalid scan range [{lo}, {hi}]")]
    InvalidRange { lo: f64, hi: f64 },

    #[error("invalid bin width {0}")]
    InvalidWidth(f64),

    #[error("no samples dated before {0}")]
    EmptyTrainingSet(NaiveDate),

    #[error("no samples dated on or after {0}")]
    EmptyTestSet(NaiveDate),

    #[error("row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("bins are not a contiguous ascending partition at bin {index}")]
    NotAPartition { index: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Fit(#[from] anyhow::Error),
}

/// A score interval `(lower, upper]`. A missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBin {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub count: usize,
    pub hit_ratio: f64,
    pub odds: f64,
}
impl CalibrationBin {
    fn tally(lower: Option<f64>, upper: Option<f64>, scored: &[(f64, bool)]) -> Self {
        let mut bin = Self {
            lower,
            upper,
            count: 0,
            hit_ratio: 0.0,
            odds: SENTINEL_ODDS,
        };
        let mut hits = 0;
        for &(score, hit) in scored {
            if bin.contains(score) {
                bin.count += 1;
                if hit {
                    hits += 1;
                }
            }
        }
        if bin.count > 0 {
            bin.hit_ratio = hits as f64 / bin.count as f64;
        }
        if hits > 0 {
            bin.odds = bin.count as f64 / hits as f64;
        }
        bin
    }

    pub fn contains(&self, score: f64) -> bool {
        self.lower.map_or(!score.is_nan(), |lower| score > lower)
            && self.upper.map_or(!score.is_nan(), |upper| score <= upper)
    }

    /// The persisted label: `"{lo} ~ {hi}"`, or `" ~ {hi}"` and `"{lo} ~ "` for the open-ended bins.
    pub fn label(&self) -> String {
        let bound = |value: Option<f64>| value.map(|value| format!("{value:?}")).unwrap_or_default();
        format!("{}{LABEL_SEPARATOR}{}", bound(self.lower), bound(self.upper))
    }

    pub fn parse_label(label: &str) -> Result<(Option<f64>, Option<f64>), String> {
        let (lower, upper) = label
            .split_once(LABEL_SEPARATOR.trim())
            .ok_or_else(|| format!("label '{label}' has no '~' separator"))?;
        let bound = |value: &str| -> Result<Option<f64>, String> {
            let value = value.trim();
            if value.is_empty() {
                Ok(None)
            } else {
                value
                    .parse()
                    .map(Some)
                    .map_err(|_| format!("malformed bound '{value}' in label '{label}'"))
            }
        };
        Ok((bound(lower)?, bound(upper)?))
    }
}

/// An ascending, gap-free partition of the real line into [CalibrationBin]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    bins: Vec<CalibrationBin>,
}
impl CalibrationTable {
    pub fn new(bins: Vec<CalibrationBin>) -> Result<Self, CalibrationError> {
        let valid_bounds = |index: usize, bin: &CalibrationBin| {
            let first = index == 0;
            let last = index == bins.len() - 1;
            first == bin.lower.is_none()
                && last == bin.upper.is_none()
                && match (bin.lower, bin.upper) {
                    (Some(lower), Some(upper)) => lower < upper,
                    _ => true,
                }
        };
        for (index, bin) in bins.iter().enumerate() {
            if !valid_bounds(index, bin) || (index > 0 && bins[index - 1].upper != bin.lower) {
                return Err(CalibrationError::NotAPartition { index });
            }
        }
        if bins.is_empty() {
            return Err(CalibrationError::NotAPartition { index: 0 });
        }
        Ok(Self { bins })
    }

    pub fn bins(&self) -> &[CalibrationBin] {
        &self.bins
    }

    /// The first bin (in ascending order) containing the score. `None` only for a NaN score.
    pub fn lookup(&self, score: f64) -> Option<&CalibrationBin> {
        self.bins.iter().find(|bin| bin.contains(score))
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), io::Error> {
        let mut writer = CsvWriter::create(path)?;
        writer.append(CSV_HEADER)?;
        for bin in &self.bins {
            writer.append([
                bin.label(),
                bin.count.to_string(),
                bin.hit_ratio.to_string(),
                bin.odds.to_string(),
            ])?;
        }
        writer.flush()
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, CalibrationError> {
        let mut bins = vec![];
        for (row, record) in CsvReader::open(path)?.enumerate() {
            let record = record?;
            if row == 0 && record == CSV_HEADER {
                continue;
            }
            bins.push(parse_record(row, &record)?);
        }
        Self::new(bins)
    }

    pub fn tabulate(&self) -> Table {
        let mut table = Table::default()
            .with_cols(vec![
                Col::new(Styles::default().with(MinWidth(16))),
                Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            ])
            .with_row(Row::new(
                Styles::default().with(Header(true)).with(Separator(true)),
                vec![
                    "Score".into(),
                    "Count".into(),
                    "Hit ratio".into(),
                    "Odds".into(),
                ],
            ));
        for bin in &self.bins {
            table.push_row(Row::new(
                Styles::default(),
                vec![
                    bin.label().into(),
                    format!("{}", bin.count).into(),
                    format!("{:.4}", bin.hit_ratio).into(),
                    format!("{:.2}", bin.odds).into(),
                ],
            ));
        }
        table
    }
}

fn parse_record(row: usize, record: &[String]) -> Result<CalibrationBin, CalibrationError> {
    let malformed = |reason: String| CalibrationError::MalformedRow { row, reason };
    if record.len() != CSV_HEADER.len() {
        return Err(malformed(format!(
            "expected {} fields, got {}",
            CSV_HEADER.len(),
            record.len()
        )));
    }
    let (lower, upper) = CalibrationBin::parse_label(&record[0]).map_err(malformed)?;
    let count = record[1]
        .trim()
        .parse()
        .map_err(|_| malformed(format!("malformed count '{}'", record[1])))?;
    let hit_ratio = record[2]
        .trim()
        .parse()
        .map_err(|_| malformed(format!("malformed hit ratio '{}'", record[2])))?;
    let odds = record[3]
        .trim()
        .parse()
        .map_err(|_| malformed(format!("malformed odds '{}'", record[3])))?;
    Ok(CalibrationBin {
        lower,
        upper,
        count,
        hit_ratio,
        odds,
    })
}

/// Decimal digits used for bin edges: the number of digits in the integer part of `1 / width`.
fn edge_digits(width: f64) -> i32 {
    ((1.0 / width) as u64).to_string().len() as i32
}

fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

/// The finite edges `lo, lo + w, ..., hi` of the partition.
pub fn bin_edges(range: [f64; 2], width: f64) -> Result<Vec<f64>, CalibrationError> {
    let [lo, hi] = range;
    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        return Err(CalibrationError::InvalidRange { lo, hi });
    }
    if !width.is_finite() || width <= 0.0 || width > hi - lo {
        return Err(CalibrationError::InvalidWidth(width));
    }
    let digits = edge_digits(width);
    let steps = ((hi - lo) / width - 1e-9).ceil() as usize;
    let mut edges: Vec<_> = (0..steps)
        .map(|step| round_to(lo + step as f64 * width, digits))
        .collect();
    edges.push(round_to(hi, digits));
    Ok(edges)
}

/// Fits a scorer on the samples dated before `split_date`, scores the remaining samples and tallies
/// their hit ratios per score bin. Returns the fitted scorer with the table.
pub fn build_calibration<F: ScoreFitter>(
    samples: &[HistoricalSample],
    split_date: NaiveDate,
    range: [f64; 2],
    width: f64,
    fitter: &F,
) -> Result<(F::Scorer, CalibrationTable), CalibrationError> {
    let edges = bin_edges(range, width)?;
    let (train, test) = split_by_date(samples, split_date);
    if train.is_empty() {
        return Err(CalibrationError::EmptyTrainingSet(split_date));
    }
    if test.is_empty() {
        return Err(CalibrationError::EmptyTestSet(split_date));
    }
    debug!(
        "fitting scorer on {} samples, testing on {}",
        train.len(),
        test.len()
    );
    let scorer = fitter.fit(&train)?;
    let scored: Vec<_> = test
        .iter()
        .map(|sample| (scorer.score(&sample.features), sample.is_hit()))
        .collect();
    Ok((scorer, calibrate_scored(&edges, &scored)))
}

/// Tallies pre-scored `(score, hit)` pairs over the partition with the given finite edges.
pub fn calibrate_scored(edges: &[f64], scored: &[(f64, bool)]) -> CalibrationTable {
    let mut bins = Vec::with_capacity(edges.len() + 1);
    bins.push(CalibrationBin::tally(None, edges.first().copied(), scored));
    for pair in edges.windows(2) {
        bins.push(CalibrationBin::tally(Some(pair[0]), Some(pair[1]), scored));
    }
    bins.push(CalibrationBin::tally(edges.last().copied(), None, scored));
    debug!("calibrated {} bins from {} scores", bins.len(), scored.len());
    CalibrationTable { bins }
}
