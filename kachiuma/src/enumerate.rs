//! Bet enumeration: turns a race's scored runners into the stream of selections a strategy bets.
//!
//! A runner _passes_ when its score reaches the threshold. Under [Strategy::Box], every combination
//! (unordered bet types) or permutation (ordered bet types) of passing runners is bet. Under
//! [Strategy::Nagashi], when exactly `arity - 1` runners pass they become the anchors and each of
//! the top-scoring remaining runners completes one selection; any other number of passing runners
//! falls back to box.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::bail;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bet::{BetType, Order, Selection};
use crate::comb::{CombinationIter, Combinations, PermutationIter, Permutations};
use crate::race::{HorseNumber, RaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Box,
    Nagashi { companions: usize },
}
impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Box => write!(f, "box"),
            Strategy::Nagashi { companions } => write!(f, "nagashi({companions})"),
        }
    }
}

impl Strategy {
    /// Parses `"box"` or `"nagashi"`, the latter taking the given number of companions.
    pub fn parse(s: &str, companions: usize) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "box" => Ok(Strategy::Box),
            "nagashi" => Ok(Strategy::Nagashi { companions }),
            _ => bail!("unsupported strategy {s}"),
        }
    }
}

impl FromStr for Strategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, companions)) => Self::parse(name, companions.trim().parse()?),
            None => Self::parse(s, 0),
        }
    }
}

/// A runner's model score, and its win odds when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRunner {
    pub race_id: RaceId,
    pub horse_number: HorseNumber,
    pub score: f64,
    #[serde(default)]
    pub win_odds: Option<f64>,
}

/// The runners of one race in descending score order (ties by horse number, NaN scores last). A
/// horse listed more than once keeps only its highest-scored entry.
#[derive(Debug, Clone)]
pub struct ScoredRace<'a> {
    race_id: &'a RaceId,
    runners: Vec<&'a ScoredRunner>,
}
impl<'a> ScoredRace<'a> {
    pub fn new(race_id: &'a RaceId, mut runners: Vec<&'a ScoredRunner>) -> Self {
        runners.sort_by(|a, b| {
            descending(a.score, b.score).then(a.horse_number.cmp(&b.horse_number))
        });
        let mut seen = FxHashSet::default();
        runners.retain(|runner| {
            let first = seen.insert(runner.horse_number);
            if !first {
                warn!(
                    "race {race_id}: dropping duplicate entry for horse {} scored {}",
                    runner.horse_number, runner.score
                );
            }
            first
        });
        Self { race_id, runners }
    }

    pub fn race_id(&self) -> &'a RaceId {
        self.race_id
    }

    pub fn runners(&self) -> &[&'a ScoredRunner] {
        &self.runners
    }

    pub fn count_passing(&self, threshold: f64) -> usize {
        self.runners
            .iter()
            .take_while(|runner| runner.score >= threshold)
            .count()
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    let key = |score: f64| if score.is_nan() { f64::NEG_INFINITY } else { score };
    key(b).total_cmp(&key(a))
}

/// Groups a scored table into races, in ascending race order.
pub fn group_races(runners: &[ScoredRunner]) -> Vec<ScoredRace> {
    let mut races: BTreeMap<&RaceId, Vec<&ScoredRunner>> = BTreeMap::new();
    for runner in runners {
        races.entry(&runner.race_id).or_default().push(runner);
    }
    races
        .into_iter()
        .map(|(race_id, runners)| ScoredRace::new(race_id, runners))
        .collect()
}

/// One selection to bet, with the product of its horses' win odds when all are known.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub selection: Selection,
    pub odds: Option<f64>,
}
impl Candidate {
    fn from_runners<'r>(runners: impl IntoIterator<Item = &'r ScoredRunner>) -> Self {
        let mut horses = vec![];
        let mut odds = Some(1.0);
        for runner in runners {
            horses.push(runner.horse_number);
            odds = odds.zip(runner.win_odds).map(|(product, odds)| product * odds);
        }
        Self {
            selection: Selection::new(horses),
            odds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetEnumerator {
    pub strategy: Strategy,
    pub bet_type: BetType,
    pub threshold: f64,
}
impl BetEnumerator {
    pub fn new(strategy: Strategy, bet_type: BetType, threshold: f64) -> Self {
        Self {
            strategy,
            bet_type,
            threshold,
        }
    }

    /// The lazy selection stream for one race. Calling again restarts the stream.
    pub fn race<'a>(&self, race: &ScoredRace<'a>) -> Selections<'a> {
        let arity = self.bet_type.arity();
        let passing = race.count_passing(self.threshold);
        let anchors = arity - 1;
        if let Strategy::Nagashi { companions } = self.strategy {
            if anchors > 0 && passing == anchors {
                let pool = race
                    .runners
                    .iter()
                    .take(anchors + companions)
                    .copied()
                    .collect();
                return Selections {
                    pool,
                    source: Source::Nagashi {
                        anchors,
                        next: anchors,
                    },
                };
            }
            if anchors > 0 {
                debug!(
                    "race {}: {passing} passing runner(s) for {} anchor(s), falling back to box",
                    race.race_id,
                    anchors
                );
            }
        }
        if passing < arity {
            return Selections {
                pool: vec![],
                source: Source::Empty,
            };
        }
        let pool: Vec<_> = race.runners[..passing].to_vec();
        let source = match self.bet_type.order() {
            Order::Unordered => Source::Combinations(Combinations::new(pool.len(), arity).iter()),
            Order::Ordered => Source::Permutations(Permutations::new(pool.len(), arity).iter()),
        };
        Selections { pool, source }
    }

    /// The flat stream of `(race id, candidate)` pairs across races.
    pub fn enumerate<'a>(
        &'a self,
        races: &'a [ScoredRace<'a>],
    ) -> impl Iterator<Item = (&'a RaceId, Candidate)> + 'a {
        races.iter().flat_map(move |race| {
            let race_id = race.race_id;
            self.race(race).map(move |candidate| (race_id, candidate))
        })
    }
}

enum Source {
    Empty,
    Combinations(CombinationIter),
    Permutations(PermutationIter),
    Nagashi { anchors: usize, next: usize },
}

/// Selections bet on one race. The `pool` holds the eligible runners in descending score order.
pub struct Selections<'a> {
    pool: Vec<&'a ScoredRunner>,
    source: Source,
}
impl<'a> Selections<'a> {
    pub fn pool(&self) -> &[&'a ScoredRunner] {
        &self.pool
    }
}

impl<'a> Iterator for Selections<'a> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Self::Item> {
        let pool = &self.pool;
        match &mut self.source {
            Source::Empty => None,
            Source::Combinations(iter) => iter
                .next()
                .map(|ordinals| Candidate::from_runners(ordinals.iter().map(|&ordinal| pool[ordinal]))),
            Source::Permutations(iter) => iter
                .next()
                .map(|ordinals| Candidate::from_runners(ordinals.iter().map(|&ordinal| pool[ordinal]))),
            Source::Nagashi { anchors, next } => {
                if *next == pool.len() {
                    return None;
                }
                let companion = pool[*next];
                *next += 1;
                // anchors lead in ascending score order
                Some(Candidate::from_runners(
                    pool[..*anchors].iter().rev().copied().chain(std::iter::once(companion)),
                ))
            }
        }
    }
}
