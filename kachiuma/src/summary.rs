//! How the model's favourite fares, tallied by the confidence rank of the favourite.

use std::ops::Add;

use ordinalizer::Ordinal;
use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};
use strum::{EnumCount, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter};
use tracing::debug;

use crate::bet::BetType;
use crate::enumerate::ScoredRace;
use crate::ledger::PayoutLedger;
use crate::race::HorseNumber;
use crate::score::standardise;

/// Confidence in the model's top pick, judged from the gap between the top standardised scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ordinal, Display, EnumCount, EnumIter)]
pub enum FavouriteRank {
    A,
    B,
    C,
    X,
    #[strum(to_string = "-")]
    Unranked,
}
impl FavouriteRank {
    /// Classifies from the top three standardised scores in descending order. Missing scores are
    /// treated as NaN.
    pub fn classify(top: &[f64]) -> Self {
        let score = |index: usize| top.get(index).copied().unwrap_or(f64::NAN);
        let (s0, s1, s2) = (score(0), score(1), score(2));
        let clear_lead = s0 - s1 >= 1.0;
        let high = s0 >= 2.0;
        if clear_lead && high {
            FavouriteRank::A
        } else if clear_lead || high {
            FavouriteRank::B
        } else if s0 - s1 >= 0.4 {
            FavouriteRank::C
        } else if s0.is_nan() || s0 == s2 {
            FavouriteRank::X
        } else {
            FavouriteRank::Unranked
        }
    }

    /// Ranks the favourite of a race, returning it with its rank. `None` for an empty race.
    pub fn of_race(race: &ScoredRace) -> Option<(HorseNumber, Self)> {
        let favourite = race.runners().first()?.horse_number;
        let scores: Vec<_> = race.runners().iter().map(|runner| runner.score).collect();
        let standardised = standardise(&scores);
        Some((favourite, Self::classify(&standardised[..usize::min(3, standardised.len())])))
    }
}

/// Finishing positions of the favourite (1st, 2nd, 3rd, unplaced) and the payouts it collected.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RankTally {
    pub finishes: [usize; 4],
    pub win_payout: f64,
    pub place_payout: f64,
}
impl RankTally {
    pub fn races(&self) -> usize {
        self.finishes.iter().sum()
    }

    pub fn placed(&self) -> usize {
        self.finishes[..3].iter().sum()
    }

    pub fn win_return_ratio(&self) -> Option<f64> {
        self.return_ratio(self.win_payout)
    }

    pub fn place_return_ratio(&self) -> Option<f64> {
        self.return_ratio(self.place_payout)
    }

    fn return_ratio(&self, payout: f64) -> Option<f64> {
        match self.races() {
            0 => None,
            races => Some(payout / (100.0 * races as f64)),
        }
    }
}

impl Add for RankTally {
    type Output = RankTally;

    fn add(self, rhs: Self) -> Self::Output {
        let mut finishes = self.finishes;
        for (finish, other) in finishes.iter_mut().zip(rhs.finishes) {
            *finish += other;
        }
        RankTally {
            finishes,
            win_payout: self.win_payout + rhs.win_payout,
            place_payout: self.place_payout + rhs.place_payout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FavouriteSummary {
    tallies: [RankTally; FavouriteRank::COUNT],
}
impl FavouriteSummary {
    pub fn tally(races: &[ScoredRace], ledger: &PayoutLedger) -> Self {
        let mut summary = Self::default();
        for race in races {
            let Some((favourite, rank)) = FavouriteRank::of_race(race) else {
                continue;
            };
            let Some(finishing_order) = ledger.finishing_order(race.race_id()) else {
                debug!("race {} has no finishing order, skipping", race.race_id());
                continue;
            };
            let position = finishing_order
                .horses()
                .iter()
                .position(|&horse| horse == favourite)
                .unwrap_or(3);
            let collected = |bet_type: BetType| -> f64 {
                ledger
                    .get(race.race_id(), bet_type)
                    .iter()
                    .filter(|line| line.selection.horses() == [favourite])
                    .map(|line| line.amount)
                    .sum()
            };
            let tally = &mut summary.tallies[rank.ordinal()];
            tally.finishes[position] += 1;
            tally.win_payout += collected(BetType::Win);
            tally.place_payout += collected(BetType::Place);
        }
        summary
    }

    pub fn get(&self, rank: FavouriteRank) -> &RankTally {
        &self.tallies[rank.ordinal()]
    }

    pub fn total(&self) -> RankTally {
        self.tallies
            .iter()
            .fold(RankTally::default(), |total, &tally| total + tally)
    }

    pub fn tabulate(&self) -> Table {
        let mut table = Table::default()
            .with_cols(vec![
                Col::new(Styles::default().with(MinWidth(6))),
                Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(11)).with(HAlign::Right)),
                Col::new(Styles::default().with(MinWidth(13)).with(HAlign::Right)),
            ])
            .with_row(Row::new(
                Styles::default().with(Header(true)).with(Separator(true)),
                vec![
                    "Rank".into(),
                    "Finishes".into(),
                    "Win".into(),
                    "Place".into(),
                    "Win return".into(),
                    "Place return".into(),
                ],
            ));
        let shown = FavouriteRank::iter()
            .filter(|&rank| rank != FavouriteRank::Unranked)
            .map(|rank| (rank.to_string(), *self.get(rank)))
            .chain(std::iter::once(("Total".to_string(), self.total())));
        for (label, tally) in shown {
            let ratio = |ratio: Option<f64>| {
                ratio.map_or_else(|| "-".to_string(), |ratio| format!("{ratio:.4}"))
            };
            let [first, second, third, unplaced] = tally.finishes;
            table.push_row(Row::new(
                Styles::default(),
                vec![
                    label.into(),
                    format!("{first}-{second}-{third}-{unplaced}").into(),
                    format!("{first}/{}", tally.races()).into(),
                    format!("{}/{}", tally.placed(), tally.races()).into(),
                    ratio(tally.win_return_ratio()).into(),
                    ratio(tally.place_return_ratio()).into(),
                ],
            ));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;

    use crate::enumerate::{group_races, ScoredRunner};
    use crate::ledger::RawPayoutRow;
    use crate::race::RaceId;

    use super::*;

    #[test]
    fn classify() {
        assert_eq!(FavouriteRank::A, FavouriteRank::classify(&[2.5, 1.0, 0.5]));
        assert_eq!(FavouriteRank::B, FavouriteRank::classify(&[2.1, 1.5, 0.5]));
        assert_eq!(FavouriteRank::B, FavouriteRank::classify(&[1.5, 0.4, 0.2]));
        assert_eq!(FavouriteRank::C, FavouriteRank::classify(&[1.5, 1.0, 0.2]));
        assert_eq!(FavouriteRank::X, FavouriteRank::classify(&[0.9, 0.9, 0.9]));
        assert_eq!(FavouriteRank::X, FavouriteRank::classify(&[f64::NAN, f64::NAN, f64::NAN]));
        assert_eq!(FavouriteRank::Unranked, FavouriteRank::classify(&[1.2, 1.0, 0.7]));
        assert_eq!(FavouriteRank::X, FavouriteRank::classify(&[]));
        assert_eq!("-", FavouriteRank::Unranked.to_string());
    }

    fn runner(race_id: &str, horse: u8, score: f64) -> ScoredRunner {
        ScoredRunner {
            race_id: RaceId::from(race_id),
            horse_number: HorseNumber::new(horse),
            score,
            win_odds: None,
        }
    }

    fn row(race_id: &str, bet_type: &str, selection: &str, amount: &str) -> RawPayoutRow {
        RawPayoutRow {
            race_id: RaceId::from(race_id),
            bet_type: bet_type.into(),
            selection: selection.into(),
            amount: amount.into(),
            popularity: if bet_type == "複勝" { "1br2br3" } else { "1" }.into(),
        }
    }

    #[test]
    fn tally_by_rank() {
        let ledger = PayoutLedger::from_rows(&[
            // favourite 1 wins
            row("r1", "単勝", "1", "250"),
            row("r1", "複勝", "1br4br5", "120br300br410"),
            row("r1", "三連単", "1→4→5", "9,000"),
            // favourite 2 runs third
            row("r2", "単勝", "7", "900"),
            row("r2", "複勝", "7br3br2", "300br180br140"),
            row("r2", "三連単", "7→3→2", "30,000"),
            // favourite 6 is unplaced
            row("r3", "単勝", "1", "400"),
            row("r3", "複勝", "1br2br3", "150br160br170"),
            row("r3", "三連単", "1→2→3", "12,000"),
        ])
        .unwrap();
        let scored = vec![
            // A: a dominant favourite
            runner("r1", 1, 10.0),
            runner("r1", 2, 0.0),
            runner("r1", 3, 0.0),
            runner("r1", 4, 0.0),
            runner("r1", 5, 0.0),
            runner("r1", 6, 0.0),
            // X: a three-way tie at the top
            runner("r2", 2, 1.0),
            runner("r2", 3, 1.0),
            runner("r2", 7, 1.0),
            runner("r2", 8, 0.0),
            // A again
            runner("r3", 6, 10.0),
            runner("r3", 1, 0.0),
            runner("r3", 2, 0.0),
            runner("r3", 3, 0.0),
            runner("r3", 4, 0.0),
            runner("r3", 5, 0.0),
            // no payouts: skipped
            runner("r4", 1, 1.0),
        ];
        let races = group_races(&scored);
        let summary = FavouriteSummary::tally(&races, &ledger);

        let a = summary.get(FavouriteRank::A);
        assert_eq!([1, 0, 0, 1], a.finishes);
        assert_eq!(2, a.races());
        assert_float_absolute_eq!(250.0 / 200.0, a.win_return_ratio().unwrap());
        assert_float_absolute_eq!(120.0 / 200.0, a.place_return_ratio().unwrap());

        let x = summary.get(FavouriteRank::X);
        assert_eq!([0, 0, 1, 0], x.finishes);
        assert_eq!(Some(0.0), x.win_return_ratio());
        assert_float_absolute_eq!(1.4, x.place_return_ratio().unwrap());

        assert_eq!(None, summary.get(FavouriteRank::B).win_return_ratio());
        let total = summary.total();
        assert_eq!([1, 0, 1, 1], total.finishes);
        assert_eq!(2, total.placed());
        assert_float_absolute_eq!(260.0, total.place_payout);
    }
}
