use clap::Parser;
use std::path::PathBuf;

use facecount::FaceDetectConfig;
use facecount::validate::validate_image_path;

#[derive(Parser)]
#[command(name = "facecount")]
#[command(about = "Count faces in an image and mark them on a copy")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE", default_value = "the_heavy.jpg")]
    image_path: String,

    /// JSON config file; flags given on the command line override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Haar cascade XML file [default: haarcascade_frontalface_default.xml]
    #[arg(long, value_name = "FILE")]
    cascade: Option<PathBuf>,

    /// Where to write the JSON report [default: faces.json]
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Directory for the annotated copy (defaults to the image's directory)
    #[arg(long, value_name = "DIR")]
    copy_dir: Option<PathBuf>,

    /// Window growth between detection scales [default: 1.21]
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Raw hits a face needs beyond this count to be reported [default: 5]
    #[arg(long)]
    min_neighbors: Option<u32>,

    /// Smallest face size searched, in pixels [default: 30]
    #[arg(long, value_name = "PX")]
    min_size: Option<u32>,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<FaceDetectConfig> {
        let mut config = match &self.config {
            Some(path) => FaceDetectConfig::from_json_file(path)?,
            None => FaceDetectConfig::default(),
        };

        if let Some(cascade) = self.cascade {
            config.cascade_path = cascade;
        }
        if let Some(report) = self.report {
            config.report_path = report;
        }
        if self.copy_dir.is_some() {
            config.copy_dir = self.copy_dir;
        }
        if let Some(scale_factor) = self.scale_factor {
            config.detection.scale_factor = scale_factor;
        }
        if let Some(min_neighbors) = self.min_neighbors {
            config.detection.min_neighbors = min_neighbors;
        }
        if let Some(min_size) = self.min_size {
            config.detection.min_size = (min_size, min_size);
        }
        if self.debug_out.is_some() {
            config.debug_dir = self.debug_out;
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    // rejected paths are reported regardless of the log filter
    if let Err(err) = validate_image_path(&args.image_path) {
        eprintln!("{err}");
        return Ok(());
    }

    let image_path = args.image_path.clone();
    let config = args.into_config()?;

    if let Some(outcome) = facecount::run(&image_path, &config)? {
        log::info!(
            "{} faces, annotated copy at {}",
            outcome.faces.len(),
            outcome.copy_path.display()
        );
        println!("{}", outcome.report_path.display());
    }

    Ok(())
}
