//! Settlement of bets against the payout ledger.

use thiserror::Error;

use crate::bet::{BetType, Selection};
use crate::ledger::PayoutLedger;
use crate::race::RaceId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SettlementError {
    #[error("race {race_id}: {bet_type} line {index} declares an invalid payout of {amount}")]
    InvalidPayout {
        race_id: RaceId,
        bet_type: BetType,
        index: usize,
        amount: f64,
    },
}

/// Settles selections of one bet type against a read-only ledger.
#[derive(Debug, Clone, Copy)]
pub struct SettlementEngine<'a> {
    ledger: &'a PayoutLedger,
    bet_type: BetType,
}
impl<'a> SettlementEngine<'a> {
    pub fn new(ledger: &'a PayoutLedger, bet_type: BetType) -> Self {
        Self { ledger, bet_type }
    }

    pub fn bet_type(&self) -> BetType {
        self.bet_type
    }

    /// The return on `stake` units bet on `selection`: the amount of every matching payout line, per
    /// unit staked. A selection that matches no line returns zero.
    pub fn settle(
        &self,
        race_id: &RaceId,
        selection: &Selection,
        stake: f64,
    ) -> Result<f64, SettlementError> {
        let order = self.bet_type.order();
        let mut payout = 0.0;
        for line in self.ledger.get(race_id, self.bet_type) {
            if !line.selection.matches(selection, order) {
                continue;
            }
            if !line.amount.is_finite() || line.amount < 0.0 {
                return Err(SettlementError::InvalidPayout {
                    race_id: race_id.clone(),
                    bet_type: self.bet_type,
                    index: line.index,
                    amount: line.amount,
                });
            }
            payout += line.amount / 100.0 * stake;
        }
        Ok(payout)
    }
}
