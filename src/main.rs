use std::path::PathBuf;

use clap::Parser;
use simple_logger::SimpleLogger;

use chromacam::app::{AppError, ChromaCam, Config, FrameInput};
use chromacam::vision::ColourDetector;

/// chromacam - webcam stream with red/yellow region detection
#[derive(Parser, Debug)]
#[command(version, about, long_about=None)]
struct Args {
    /// Capture device index or path
    #[arg(short, long, default_value = "0")]
    camera: String,
    /// Stream a still image instead of a camera
    #[arg(long)]
    still: Option<PathBuf>,
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    bind: String,
    /// Directory holding index.html and assets
    #[arg(long, default_value = "./static")]
    static_dir: PathBuf,
    /// JSON file with colour definitions
    #[arg(long)]
    colours: Option<PathBuf>,
    /// Minimum region area in pixels
    #[arg(long, default_value_t = ColourDetector::DEFAULT_MIN_AREA)]
    min_area: f64,
    /// Print the config and exit without running
    #[arg(short, long, default_value_t = false)]
    print: bool,
    /// Reduce log verbosity
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

fn get_config(args: &Args) -> Result<Config, AppError> {
    let input = match &args.still {
        Some(path) => FrameInput::Still(path.clone()),
        None => FrameInput::Camera(args.camera.clone()),
    };
    let colours = match &args.colours {
        Some(path) => Config::load_colours(path)?,
        None => Config::default().colours,
    };
    Ok(Config {
        input,
        bind: args.bind.clone(),
        static_dir: args.static_dir.clone(),
        colours,
        min_area: args.min_area,
    })
}

#[tokio::main]
async fn main() {
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

    let config = match get_config(&args) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return;
        }
    };

    if args.print {
        log::info!("Selected configuration: {}", config.info());
        log::info!("  {}", config.description());
    } else {
        log::info!("Starting chromacam");

        let app = ChromaCam::new(config);

        match app.serve().await {
            Ok(_) => log::info!("chromacam done"),
            Err(e) => log::error!("{}", e),
        }

        log::info!("Shutdown");
    }
}
