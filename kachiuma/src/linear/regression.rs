//! Ordinary least-squares scoring.

use anyhow::bail;
use linregress::fit_low_level_regression_model;
use serde::{Deserialize, Serialize};
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use crate::linear::matrix::Matrix;
use crate::score::{HistoricalSample, ScoreFitter, Scorer};

/// A fitted linear model: `intercept + Σ coefficient[i] * feature[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearScorer {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub r_squared: f64,
}
impl LinearScorer {
    pub fn tabulate(&self) -> Table {
        let mut table = Table::default()
            .with_cols(vec![
                Col::new(Styles::default().with(MinWidth(10))),
                Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(11)).with(HAlign::Right)),
            ])
            .with_row(Row::new(
                Styles::default().with(Header(true)),
                vec!["Regressor".into(), "Coefficient".into(), "Std. error".into()],
            ));
        let coefficients = std::iter::once(self.intercept).chain(self.coefficients.iter().copied());
        for (index, coefficient) in coefficients.enumerate() {
            let name = if index == 0 {
                "Intercept".to_string()
            } else {
                format!("x{}", index - 1)
            };
            table.push_row(Row::new(
                Styles::default(),
                vec![
                    name.into(),
                    format!("{coefficient:.8}").into(),
                    format!("{:.6}", self.std_errors.get(index).copied().unwrap_or(f64::NAN)).into(),
                ],
            ));
        }
        table
    }
}

impl Scorer for LinearScorer {
    fn score(&self, features: &[f64]) -> f64 {
        debug_assert_eq!(
            self.coefficients.len(),
            features.len(),
            "number of coefficients {} does not match number of features {}",
            self.coefficients.len(),
            features.len()
        );
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(coefficient, feature)| coefficient * feature)
                .sum::<f64>()
    }
}

/// Fits a [LinearScorer] of the sample target on all sample features, with an intercept.
#[derive(Debug, Clone, Default)]
pub struct LinearFitter;

impl ScoreFitter for LinearFitter {
    type Scorer = LinearScorer;

    fn fit(&self, samples: &[&HistoricalSample]) -> Result<Self::Scorer, anyhow::Error> {
        let Some(first) = samples.first() else {
            bail!("no samples to fit");
        };
        let features = first.features.len();
        if samples.len() <= features + 1 {
            bail!(
                "{} samples are insufficient to fit {} features with an intercept",
                samples.len(),
                features
            );
        }

        // response, intercept, features...
        let mut data = Matrix::allocate(samples.len(), 2 + features);
        for (row, sample) in samples.iter().enumerate() {
            if sample.features.len() != features {
                bail!(
                    "sample for horse {} in race {} has {} features, expected {features}",
                    sample.horse_number,
                    sample.race_id,
                    sample.features.len()
                );
            }
            let row_slice = data.row_slice_mut(row);
            row_slice[0] = sample.target;
            row_slice[1] = 1.0;
            row_slice[2..].copy_from_slice(&sample.features);
        }

        let model = fit_low_level_regression_model(data.flatten(), data.rows(), data.cols())?;
        let parameters = model.parameters();
        Ok(LinearScorer {
            intercept: parameters[0],
            coefficients: parameters[1..].to_vec(),
            std_errors: model.se().to_vec(),
            r_squared: model.rsquared(),
        })
    }
}
