//! Backtesting: enumerates, settles and aggregates the bets of a strategy over historical races.
//!
//! Each race reduces to a single return (the sum of its settled selections). Races contributing no
//! selections are not counted. Per-race returns are folded into a [Partial], which merges
//! associatively, so races may be reduced in any grouping and on any number of workers.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};
use thiserror::Error;
use tracing::{debug, warn};

use crate::bet::BetType;
use crate::enumerate::{group_races, BetEnumerator, ScoredRace, ScoredRunner, Strategy};
use crate::ledger::PayoutLedger;
use crate::race::RaceId;
use crate::settle::{SettlementEngine, SettlementError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stake {
    /// One unit per selection.
    #[default]
    Unit,

    /// `1 / odds` per selection, where the odds are the product of the selected horses' win odds.
    Proportional,
}

/// What to do when a race cannot be settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FaultPolicy {
    /// Drop the race from the reduction and report it in [Simulation::faults].
    #[default]
    Isolate,

    /// Fail the whole simulation.
    Abort,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("race {race_id}: {bet_type} selection '{selection}' has no valid win odds to stake on")]
    InvalidOdds {
        race_id: RaceId,
        bet_type: BetType,
        selection: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationResult {
    pub n_bets: usize,
    pub return_rate: f64,
    pub n_hits: usize,
    pub standard_error: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub result: SimulationResult,
    pub faults: Vec<SimulationError>,
}

/// Running reduction over race-level returns. Tracks the mean and the sum of squared deviations
/// for the population variance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Partial {
    pub races: usize,
    pub n_bets: usize,
    pub n_hits: usize,
    pub stake: f64,
    pub returns: f64,
    mean: f64,
    m2: f64,
}
impl Partial {
    pub fn push(&mut self, race_return: f64, bets: usize, stake: f64) {
        self.races += 1;
        self.n_bets += bets;
        self.stake += stake;
        self.returns += race_return;
        if race_return > 0.0 {
            self.n_hits += 1;
        }
        let delta = race_return - self.mean;
        self.mean += delta / self.races as f64;
        self.m2 += delta * (race_return - self.mean);
    }

    pub fn merge(self, other: Partial) -> Partial {
        if self.races == 0 {
            return other;
        }
        if other.races == 0 {
            return self;
        }
        let races = self.races + other.races;
        let delta = other.mean - self.mean;
        let (n_a, n_b, n) = (self.races as f64, other.races as f64, races as f64);
        Partial {
            races,
            n_bets: self.n_bets + other.n_bets,
            n_hits: self.n_hits + other.n_hits,
            stake: self.stake + other.stake,
            returns: self.returns + other.returns,
            mean: self.mean + delta * n_b / n,
            m2: self.m2 + other.m2 + delta * delta * n_a * n_b / n,
        }
    }

    /// Population standard deviation of the race-level returns.
    pub fn stdev(&self) -> f64 {
        if self.races == 0 {
            0.0
        } else {
            (self.m2 / self.races as f64).sqrt()
        }
    }

    pub fn result(&self) -> SimulationResult {
        if self.stake == 0.0 {
            return SimulationResult {
                n_bets: self.n_bets,
                ..SimulationResult::default()
            };
        }
        SimulationResult {
            n_bets: self.n_bets,
            return_rate: self.returns / self.stake,
            n_hits: self.n_hits,
            standard_error: self.stdev() * (self.races as f64).sqrt() / self.stake,
        }
    }
}

#[derive(Debug, Default)]
struct Outcome {
    partial: Partial,
    faults: Vec<SimulationError>,
}
impl Outcome {
    fn merge(mut self, other: Outcome) -> Outcome {
        self.partial = self.partial.merge(other.partial);
        self.faults.extend(other.faults);
        self
    }
}

/// Stake and fault-handling parameters of a backtest, bound to a read-only ledger.
#[derive(Debug, Clone, Copy)]
pub struct Backtest<'a> {
    pub ledger: &'a PayoutLedger,
    pub stake: Stake,
    pub fault_policy: FaultPolicy,
}
impl<'a> Backtest<'a> {
    pub fn new(ledger: &'a PayoutLedger) -> Self {
        Self {
            ledger,
            stake: Stake::default(),
            fault_policy: FaultPolicy::default(),
        }
    }

    pub fn with_stake(mut self, stake: Stake) -> Self {
        self.stake = stake;
        self
    }

    pub fn with_fault_policy(mut self, fault_policy: FaultPolicy) -> Self {
        self.fault_policy = fault_policy;
        self
    }

    /// Settles the selections of one race: `None` if the race contributes no selections, or the
    /// `(return, bets, stake)` triple.
    fn settle_race(
        &self,
        enumerator: &BetEnumerator,
        settlement: &SettlementEngine,
        race: &ScoredRace,
    ) -> Result<Option<(f64, usize, f64)>, SimulationError> {
        let race_id = race.race_id();
        let (mut payout, mut bets, mut staked) = (0.0, 0, 0.0);
        for candidate in enumerator.race(race) {
            let stake = match self.stake {
                Stake::Unit => 1.0,
                Stake::Proportional => match candidate.odds {
                    Some(odds) if odds.is_finite() && odds > 0.0 => 1.0 / odds,
                    _ => {
                        return Err(SimulationError::InvalidOdds {
                            race_id: race_id.clone(),
                            bet_type: enumerator.bet_type,
                            selection: candidate
                                .selection
                                .display(enumerator.bet_type)
                                .to_string(),
                        })
                    }
                },
            };
            payout += settlement.settle(race_id, &candidate.selection, stake)?;
            bets += 1;
            staked += stake;
        }
        Ok((bets > 0).then_some((payout, bets, staked)))
    }

    fn reduce(
        &self,
        enumerator: &BetEnumerator,
        races: &[ScoredRace],
    ) -> Result<Outcome, SimulationError> {
        let settlement = SettlementEngine::new(self.ledger, enumerator.bet_type);
        let mut outcome = Outcome::default();
        for race in races {
            match self.settle_race(enumerator, &settlement, race) {
                Ok(Some((payout, bets, stake))) => outcome.partial.push(payout, bets, stake),
                Ok(None) => {}
                Err(err) => match self.fault_policy {
                    FaultPolicy::Abort => return Err(err),
                    FaultPolicy::Isolate => {
                        warn!("excluding race {}: {err}", race.race_id());
                        outcome.faults.push(err);
                    }
                },
            }
        }
        Ok(outcome)
    }

    pub fn simulate(
        &self,
        enumerator: &BetEnumerator,
        races: &[ScoredRace],
    ) -> Result<Simulation, SimulationError> {
        let outcome = self.reduce(enumerator, races)?;
        debug!(
            "simulated {} {} bets at threshold {}: {} of {} races bet",
            enumerator.strategy,
            enumerator.bet_type,
            enumerator.threshold,
            outcome.partial.races,
            races.len()
        );
        Ok(Simulation {
            result: outcome.partial.result(),
            faults: outcome.faults,
        })
    }

    /// As [Backtest::simulate], reducing contiguous chunks of races on up to `workers` threads.
    pub fn simulate_parallel(
        &self,
        enumerator: &BetEnumerator,
        races: &[ScoredRace],
        workers: usize,
    ) -> Result<Simulation, SimulationError> {
        let chunk_size = usize::max(1, races.len().div_ceil(usize::max(1, workers)));
        let outcomes: Vec<_> = races
            .par_chunks(chunk_size)
            .map(|chunk| self.reduce(enumerator, chunk))
            .collect();
        let mut merged = Outcome::default();
        for outcome in outcomes {
            merged = merged.merge(outcome?);
        }
        Ok(Simulation {
            result: merged.partial.result(),
            faults: merged.faults,
        })
    }

    /// Simulates the strategy once for each threshold.
    pub fn sweep(
        &self,
        strategy: Strategy,
        bet_type: BetType,
        races: &[ScoredRace],
        thresholds: &[f64],
    ) -> Result<Vec<(f64, Simulation)>, SimulationError> {
        thresholds
            .iter()
            .map(|&threshold| {
                let enumerator = BetEnumerator::new(strategy, bet_type, threshold);
                Ok((threshold, self.simulate(&enumerator, races)?))
            })
            .collect()
    }
}

/// Simulates one strategy over a scored table with unit stakes, isolating faulty races.
pub fn simulate(
    strategy: Strategy,
    bet_type: BetType,
    scored: &[ScoredRunner],
    ledger: &PayoutLedger,
    threshold: f64,
) -> Result<SimulationResult, SimulationError> {
    let races = group_races(scored);
    let enumerator = BetEnumerator::new(strategy, bet_type, threshold);
    Backtest::new(ledger)
        .simulate(&enumerator, &races)
        .map(|simulation| simulation.result)
}

/// Thresholds `from, from + step, ...` up to and including `to`.
pub fn threshold_grid(from: f64, to: f64, step: f64) -> Vec<f64> {
    if step.is_nan() || step <= 0.0 || from > to {
        return vec![from];
    }
    let steps = ((to - from) / step + 1e-9).floor() as usize;
    (0..=steps)
        .map(|index| ((from + index as f64 * step) * 1e6).round() / 1e6)
        .collect()
}

pub fn tabulate_sweep(sweep: &[(f64, Simulation)]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(8)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(7)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "Threshold".into(),
                "Bets".into(),
                "Return rate".into(),
                "Hits".into(),
                "Std. error".into(),
                "Faults".into(),
            ],
        ));
    for (threshold, simulation) in sweep {
        let result = &simulation.result;
        table.push_row(Row::new(
            Styles::default(),
            vec![
                format!("{threshold:.3}").into(),
                format!("{}", result.n_bets).into(),
                format!("{:.4}", result.return_rate).into(),
                format!("{}", result.n_hits).into(),
                format!("{:.4}", result.standard_error).into(),
                format!("{}", simulation.faults.len()).into(),
            ],
        ));
    }
    table
}
