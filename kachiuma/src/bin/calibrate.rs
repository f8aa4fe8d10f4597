use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use kachiuma::calibration::build_calibration;
use kachiuma::config::CalibrationConfig;
use kachiuma::file::ReadJsonFile;
use kachiuma::linear::regression::LinearFitter;
use kachiuma::score::HistoricalSample;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// historical samples (JSON)
    historical: PathBuf,

    /// calibration config (JSON)
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// samples dated before this train the scorer
    #[clap(long)]
    split_date: Option<NaiveDate>,

    /// lower bound of the scanned score range
    #[clap(long)]
    lo: Option<f64>,

    /// upper bound of the scanned score range
    #[clap(long)]
    hi: Option<f64>,

    /// width of each score bin
    #[clap(short = 'w', long)]
    width: Option<f64>,

    /// write the calibration table to this CSV file
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if let Some(width) = self.width {
            if width <= 0.0 {
                bail!("bin width must be positive");
            }
        }
        Ok(())
    }

    fn config(&self) -> anyhow::Result<CalibrationConfig> {
        let mut config = match &self.config {
            None => CalibrationConfig::default(),
            Some(path) => CalibrationConfig::read_json_file(path)
                .with_context(|| format!("reading config from {path:?}"))?,
        };
        if let Some(split_date) = self.split_date {
            config.split_date = split_date;
        }
        if let Some(lo) = self.lo {
            config.range[0] = lo;
        }
        if let Some(hi) = self.hi {
            config.range[1] = hi;
        }
        if let Some(width) = self.width {
            config.width = width;
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

    let samples = Vec::<HistoricalSample>::read_json_file(&args.historical)
        .with_context(|| format!("reading samples from {:?}", args.historical))?;
    info!("loaded {} historical samples", samples.len());

    let (scorer, table) = build_calibration(
        &samples,
        config.split_date,
        config.range,
        config.width,
        &LinearFitter,
    )?;
    info!(
        "fitted scorer (r²={:.6}):\n{}",
        scorer.r_squared,
        Console::default().render(&scorer.tabulate())
    );
    info!("calibration:\n{}", Console::default().render(&table.tabulate()));

    if let Some(out) = &args.out {
        table.write_csv(out)?;
        info!("wrote {} bins to {out:?}", table.bins().len());
    }
    Ok(())
}
