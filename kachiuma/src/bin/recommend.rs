use std::env;
use std::error::Error;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use kachiuma::calibration::CalibrationTable;
use kachiuma::file::{ReadJsonFile, WriteJsonFile};
use kachiuma::odds::{estimate_place_odds, LiveOddsRow};
use kachiuma::recommend::{tabulate, Recommender};

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// calibration table (CSV)
    calibration: PathBuf,

    /// live odds with model scores (JSON)
    live: PathBuf,

    /// write the recommendations to this JSON file
    #[clap(short = 'o', long)]
    out: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.out.as_ref() == Some(&self.live) {
            anyhow::bail!("refusing to overwrite the live odds file");
        }
        Ok(())
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

    let calibration = CalibrationTable::read_csv(&args.calibration)
        .with_context(|| format!("reading calibration from {:?}", args.calibration))?;
    let live = Vec::<LiveOddsRow>::read_json_file(&args.live)
        .with_context(|| format!("reading live odds from {:?}", args.live))?;
    let races = estimate_place_odds(&live)?;
    info!(
        "estimating {} races against {} calibration bins",
        races.len(),
        calibration.bins().len()
    );

    let mut recommender = Recommender::new(calibration);
    for (race_id, runners) in &races {
        let recommended = recommender.recommend(runners);
        debug!("race {race_id}: {} recommended", recommended.len());
    }
    info!(
        "{} recommendations:\n{}",
        recommender.log().len(),
        Console::default().render(&tabulate(recommender.log()))
    );

    if let Some(out) = &args.out {
        recommender.into_log().write_json_file(out)?;
    }
    Ok(())
}
