//! Calibrates model scores against historical outcomes, recommends live bets where the market pays
//! more than the calibrated odds, and backtests box and nagashi betting strategies against official
//! payouts.

#![allow(clippy::too_many_arguments)]

pub mod backtest;
pub mod bet;
pub mod calibration;
pub mod comb;
pub mod config;
pub mod csv;
pub mod enumerate;
pub mod file;
pub mod ledger;
pub mod linear;
pub mod odds;
pub mod race;
pub mod recommend;
pub mod score;
pub mod settle;
pub mod summary;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
