//! Place-bet recommendations: a horse is recommended when its place odds reach the break-even odds
//! of its score's calibration bin.

use serde::{Deserialize, Serialize};
use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};
use tracing::debug;

use crate::calibration::CalibrationTable;
use crate::odds::{estimate_place_odds, LiveOddsRow, OddsError, RunnerOdds};
use crate::race::{HorseNumber, RaceId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub race_id: RaceId,
    pub horse_number: HorseNumber,
    pub popularity: u32,
    pub odds: f64,
    pub score: f64,
}

/// Owns a calibration table and the log of every recommendation it has made in this session.
#[derive(Debug)]
pub struct Recommender {
    calibration: CalibrationTable,
    log: Vec<Recommendation>,
}
impl Recommender {
    pub fn new(calibration: CalibrationTable) -> Self {
        Self {
            calibration,
            log: vec![],
        }
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    pub fn log(&self) -> &[Recommendation] {
        &self.log
    }

    pub fn is_recommended(&self, score: f64, odds: f64) -> bool {
        match self.calibration.lookup(score) {
            None => false,
            Some(bin) => bin.odds <= odds,
        }
    }

    /// Appends a recommendation for each qualifying runner to the log and returns the newly appended
    /// slice. Repeated calls for the same race append again.
    pub fn recommend(&mut self, runners: &[RunnerOdds]) -> &[Recommendation] {
        let start = self.log.len();
        for runner in runners {
            if self.is_recommended(runner.score, runner.place_odds) {
                debug!(
                    "recommending horse {} in race {} (score {:.3}, odds {:.2})",
                    runner.horse_number, runner.race_id, runner.score, runner.place_odds
                );
                self.log.push(Recommendation {
                    race_id: runner.race_id.clone(),
                    horse_number: runner.horse_number,
                    popularity: runner.popularity,
                    odds: runner.place_odds,
                    score: runner.score,
                });
            }
        }
        &self.log[start..]
    }

    pub fn into_log(self) -> Vec<Recommendation> {
        self.log
    }
}

/// Estimates place odds for every race in the live table and recommends against the calibration,
/// race by race in ascending race order.
pub fn recommend(
    live: &[LiveOddsRow],
    calibration: CalibrationTable,
) -> Result<Vec<Recommendation>, OddsError> {
    let races = estimate_place_odds(live)?;
    let mut recommender = Recommender::new(calibration);
    for runners in races.values() {
        recommender.recommend(runners);
    }
    Ok(recommender.into_log())
}

pub fn tabulate(recommendations: &[Recommendation]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(14))),
            Col::new(Styles::default().with(MinWidth(5)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(6)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "Race".into(),
                "No.".into(),
                "Horse".into(),
                "Popularity".into(),
                "Odds".into(),
                "Score".into(),
            ],
        ));
    for recommendation in recommendations {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                recommendation.race_id.to_string().into(),
                recommendation.race_id.race_label().into(),
                format!("{}", recommendation.horse_number).into(),
                format!("{}", recommendation.popularity).into(),
                format!("{:.2}", recommendation.odds).into(),
                format!("{:.3}", recommendation.score).into(),
            ],
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use crate::calibration::{bin_edges, calibrate_scored};

    use super::*;

    /// Bins of width 0.5 over [0, 2]. Break-even odds: 9999 up to 0, then 5.0, 2.5, 1.67 and 1.25,
    /// and 1.0 above 2.
    fn calibration() -> CalibrationTable {
        let edges = bin_edges([0.0, 2.0], 0.5).unwrap();
        let mut scored = vec![(-1.0, false)];
        for (score, hits) in [(0.25, 1), (0.75, 2), (1.25, 3), (1.75, 4)] {
            for index in 0..5 {
                scored.push((score, index < hits));
            }
        }
        scored.push((3.0, true));
        calibrate_scored(&edges, &scored)
    }

    fn runner(race_id: &str, horse: u8, score: f64, place_odds: f64) -> RunnerOdds {
        RunnerOdds {
            race_id: RaceId::from(race_id),
            horse_number: HorseNumber::new(horse),
            win_odds: place_odds * 3.0,
            place_odds,
            popularity: horse as u32,
            score,
        }
    }

    #[test]
    fn threshold_comparison() {
        let recommender = Recommender::new(calibration());
        assert!(recommender.is_recommended(0.8, 2.5));
        assert!(!recommender.is_recommended(0.8, 2.4));
        assert!(!recommender.is_recommended(0.3, 3.9));
        assert!(recommender.is_recommended(0.3, 5.0));
        assert!(recommender.is_recommended(2.5, 1.0));
        assert!(!recommender.is_recommended(-0.1, 100.0));
        assert!(!recommender.is_recommended(f64::NAN, 100.0));
    }

    #[test]
    fn boundary_scores_use_lower_bin() {
        let recommender = Recommender::new(calibration());
        // 0.5 belongs to (0, 0.5], odds 5.0 / 1 = 5.0
        assert!(!recommender.is_recommended(0.5, 4.5));
        assert!(recommender.is_recommended(0.5, 5.0));
    }

    #[test]
    fn log_accumulates() {
        let mut recommender = Recommender::new(calibration());
        let appended = recommender
            .recommend(&[
                runner("r1", 1, 0.8, 2.5),
                runner("r1", 2, 0.3, 1.2),
                runner("r1", 3, 1.9, 1.4),
            ])
            .to_vec();
        assert_eq!(
            vec![1, 3],
            appended
                .iter()
                .map(|recommendation| recommendation.horse_number.get())
                .collect::<Vec<_>>()
        );
        assert_eq!(2.5, appended[0].odds);
        assert_eq!(1, appended[0].popularity);

        let appended = recommender.recommend(&[runner("r2", 4, 1.1, 1.9)]).len();
        assert_eq!(1, appended);
        assert_eq!(3, recommender.log().len());

        // no de-duplication across calls
        recommender.recommend(&[runner("r2", 4, 1.1, 1.9)]);
        assert_eq!(4, recommender.into_log().len());
    }

    #[test]
    fn from_live_odds() {
        let live_row = |race_id: &str, horse: u8, win_odds: &str, place_odds: &str, score: f64| {
            LiveOddsRow {
                race_id: RaceId::from(race_id),
                horse_number: HorseNumber::new(horse),
                win_odds: win_odds.into(),
                place_odds: place_odds.into(),
                score,
            }
        };
        // the market and the model agree on the top three, so each estimate is the bracket low
        let live = vec![
            live_row("r2", 1, "2.1", "1.1-1.3", 1.9),
            live_row("r2", 2, "3.5", "1.3-1.9", 1.6),
            live_row("r2", 3, "6.0", "1.8-2.9", 1.1),
            live_row("r2", 4, "---.-", "", 1.95),
            live_row("r1", 5, "12.0", "2.6-3.5", 0.7),
        ];
        let recommendations = recommend(&live, calibration()).unwrap();
        assert_eq!(
            vec![("r1", 5), ("r2", 2), ("r2", 3)],
            recommendations
                .iter()
                .map(|recommendation| (
                    recommendation.race_id.as_str(),
                    recommendation.horse_number.get()
                ))
                .collect::<Vec<_>>()
        );
        assert_eq!(2, recommendations[1].popularity);
        assert_eq!(1.3, recommendations[1].odds);
    }

    #[test]
    fn nothing_recommended() {
        let mut recommender = Recommender::new(calibration());
        assert!(recommender.recommend(&[runner("r1", 1, 0.1, 1.1)]).is_empty());
        assert!(recommender.recommend(&[]).is_empty());
        assert!(recommender.log().is_empty());
    }
}
