use clap::Parser;
use simple_logger::SimpleLogger;

use chromacam::preview::Preview;
use chromacam::vision::{ColourDefinition, ColourDetector};

/// chromacam desktop preview - local window with per-colour toggles
#[derive(Parser, Debug)]
#[command(version, about, long_about=None)]
struct Args {
    /// Capture device index or path
    #[arg(short, long, default_value = "0")]
    camera: String,
    /// Minimum region area in pixels
    #[arg(long, default_value_t = ColourDetector::DEFAULT_MIN_AREA)]
    min_area: f64,
    /// Reduce log verbosity
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();
    let log_level = if args.quiet {
        log::Level::Info.to_level_filter()
    } else {
        log::Level::Debug.to_level_filter()
    };

    if let Err(e) = SimpleLogger::new()
        .with_level(log_level)
        .with_utc_timestamps()
        .init()
    {
        eprintln!("Couldn't start logger: {}", e);
    }

    let result = Preview::new(
        ColourDetector::new(args.min_area),
        ColourDefinition::defaults(),
    )
    .and_then(|preview| preview.run(&args.camera));
    if let Err(e) = result {
        log::error!("{}", e);
    }
}
