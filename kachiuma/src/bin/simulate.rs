use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use kachiuma::backtest::{tabulate_sweep, threshold_grid, Backtest, Stake};
use kachiuma::bet::BetType;
use kachiuma::config::SimulationConfig;
use kachiuma::enumerate::{group_races, BetEnumerator, ScoredRunner, Strategy};
use kachiuma::file::ReadJsonFile;
use kachiuma::ledger::{PayoutLedger, RawPayoutRow};
use kachiuma::summary::FavouriteSummary;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// scored runners (JSON)
    scored: PathBuf,

    /// official payouts (JSON)
    payouts: PathBuf,

    /// bet type, e.g. Place or 三連複
    #[clap(short = 'b', long)]
    bet_type: BetType,

    /// betting strategy: box or nagashi
    #[clap(short = 's', long, default_value = "box")]
    strategy: String,

    /// companions per anchor when betting nagashi
    #[clap(short = 'n', long)]
    companions: Option<usize>,

    /// simulation config (JSON)
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// first threshold of the sweep
    #[clap(long)]
    from: Option<f64>,

    /// last threshold of the sweep
    #[clap(long)]
    to: Option<f64>,

    /// threshold increment
    #[clap(long, default_value = "0.1")]
    step: f64,

    /// stake inversely to the selection's win odds
    #[clap(long)]
    proportional: bool,

    /// reduce races on this many worker threads
    #[clap(short = 'w', long)]
    workers: Option<usize>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.step <= 0.0 {
            bail!("threshold step must be positive");
        }
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                bail!("threshold range {from}..{to} is empty");
            }
        }
        if self.workers == Some(0) {
            bail!("at least one worker is required");
        }
        Ok(())
    }

    fn config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            None => SimulationConfig::default(),
            Some(path) => SimulationConfig::read_json_file(path)
                .with_context(|| format!("reading config from {path:?}"))?,
        };
        if let Some(companions) = self.companions {
            config.companions = companions;
        }
        if self.proportional {
            config.stake = Stake::Proportional;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");
    let config = args.config()?;
    debug!("config: {config:?}");
    let strategy = Strategy::parse(&args.strategy, config.companions)?;

    let scored = Vec::<ScoredRunner>::read_json_file(&args.scored)
        .with_context(|| format!("reading scored runners from {:?}", args.scored))?;
    let rows = Vec::<RawPayoutRow>::read_json_file(&args.payouts)
        .with_context(|| format!("reading payouts from {:?}", args.payouts))?;
    let ledger = PayoutLedger::from_rows(&rows)?;
    let races = group_races(&scored);
    info!(
        "loaded {} scored races and {} payout lines over {} races",
        races.len(),
        ledger.num_lines(),
        ledger.num_races()
    );

    let from = args.from.unwrap_or(config.threshold);
    let to = args.to.unwrap_or(from);
    let thresholds = threshold_grid(from, to, args.step);
    let backtest = Backtest::new(&ledger)
        .with_stake(config.stake)
        .with_fault_policy(config.fault_policy);
    let sweep = match args.workers {
        None => backtest.sweep(strategy, args.bet_type, &races, &thresholds)?,
        Some(workers) => thresholds
            .iter()
            .map(|&threshold| {
                let enumerator = BetEnumerator::new(strategy, args.bet_type, threshold);
                Ok((
                    threshold,
                    backtest.simulate_parallel(&enumerator, &races, workers)?,
                ))
            })
            .collect::<anyhow::Result<Vec<_>>>()?,
    };
    info!(
        "{strategy} {} sweep:\n{}",
        args.bet_type,
        Console::default().render(&tabulate_sweep(&sweep))
    );

    let summary = FavouriteSummary::tally(&races, &ledger);
    info!(
        "favourite by rank:\n{}",
        Console::default().render(&summary.tabulate())
    );
    Ok(())
}
