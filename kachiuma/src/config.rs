//! Run parameters for calibration and simulation, loadable from JSON. Absent fields take their
//! defaults.

use anyhow::bail;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::backtest::{FaultPolicy, Stake};
use crate::enumerate::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Samples dated before this train the scorer; the rest are used to build the table.
    pub split_date: NaiveDate,
    pub range: [f64; 2],
    pub width: f64,
}
impl CalibrationConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let [lo, hi] = self.range;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            bail!("calibration range [{lo}, {hi}] is empty");
        }
        if !self.width.is_finite() || self.width <= 0.0 {
            bail!("calibration width must be positive");
        }
        Ok(())
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            split_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            range: [0.0, 2.2],
            width: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub threshold: f64,
    /// Companions per anchor when betting nagashi.
    pub companions: usize,
    pub stake: Stake,
    pub fault_policy: FaultPolicy,
}
impl SimulationConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.threshold.is_nan() {
            bail!("threshold cannot be NaN");
        }
        if self.companions == 0 {
            bail!("at least one companion is required");
        }
        Ok(())
    }

    pub fn nagashi(&self) -> Strategy {
        Strategy::Nagashi {
            companions: self.companions,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            companions: 5,
            stake: Stake::default(),
            fault_policy: FaultPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;

    use crate::file::{ReadJsonFile, WriteJsonFile};

    use super::*;

    #[test]
    fn defaults() {
        let config = CalibrationConfig::default();
        assert_eq!(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(), config.split_date);
        assert_eq!([0.0, 2.2], config.range);
        assert_eq!(0.05, config.width);
        config.validate().unwrap();

        let config = SimulationConfig::default();
        assert_eq!(0.5, config.threshold);
        assert_eq!(Strategy::Nagashi { companions: 5 }, config.nagashi());
        assert_eq!(Stake::Unit, config.stake);
        assert_eq!(FaultPolicy::Isolate, config.fault_policy);
        config.validate().unwrap();
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: CalibrationConfig =
            serde_json::from_str(r#"{"split_date": "2021-06-30"}"#).unwrap();
        assert_eq!(NaiveDate::from_ymd_opt(2021, 6, 30).unwrap(), config.split_date);
        assert_eq!(0.05, config.width);

        let config: SimulationConfig =
            serde_json::from_str(r#"{"stake": "Proportional", "fault_policy": "Abort"}"#).unwrap();
        assert_eq!(Stake::Proportional, config.stake);
        assert_eq!(FaultPolicy::Abort, config.fault_policy);
        assert_eq!(5, config.companions);
    }

    #[test]
    fn invalid() {
        let config = CalibrationConfig {
            range: [2.0, 1.0],
            ..CalibrationConfig::default()
        };
        assert_eq!(
            "calibration range [2, 1] is empty",
            config.validate().unwrap_err().to_string()
        );
        let config = CalibrationConfig {
            width: 0.0,
            ..CalibrationConfig::default()
        };
        assert!(config.validate().is_err());
        let config = SimulationConfig {
            companions: 0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_round_trip() {
        let path = env::temp_dir().join(format!("kachiuma-config-{}.json", std::process::id()));
        let config = SimulationConfig {
            threshold: 0.8,
            ..SimulationConfig::default()
        };
        config.write_json_file(&path).unwrap();
        let read = SimulationConfig::read_json_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config, read);
    }
}
