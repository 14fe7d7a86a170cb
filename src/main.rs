use clap::{Parser, Subcommand};
use rayon::prelude::*;
use sendfit::batch::{self, PlannedFile};
use sendfit::config::{self, Config, DestinationProfile};
use sendfit::imaging::{Codec, JpegCodec};
use sendfit::metadata;
use sendfit::optimize::{self, OptimizationResult};
use sendfit::output::{self, BatchSummary, FailureSummary, ResultSummary};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type FileError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Parser)]
#[command(name = "sendfit")]
#[command(about = "Fit photos to the size, resolution and privacy limits of where they are sent")]
#[command(long_about = "\
Fit photos to the size, resolution and privacy limits of where they are sent

Each destination caps the file size and the long edge, and says which
metadata must go. sendfit resizes, searches for the highest JPEG quality
that fits, and strips GPS (or everything) without touching pixel data.

  sendfit destinations                      # list the catalog
  sendfit inspect IMG_0042.jpg              # what would leak?
  sendfit optimize IMG_0042.jpg --to email  # → IMG_0042-email.jpg
  sendfit optimize trip/ --to line --out-dir outbox/

Run 'sendfit gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file with [processing] and [[destinations]] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log each pipeline stage to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize JPEG files (or directories of them) for a destination
    Optimize {
        /// Files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Destination name or slug, e.g. "Email" or "x-twitter"
        #[arg(long)]
        to: String,

        /// Where to write results (default: next to each input)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show the metadata a photo carries
    Inspect {
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// List the destination catalog
    Destinations,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let app_config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Optimize {
            inputs,
            to,
            out_dir,
            json,
        } => {
            let destination = app_config.find_destination(&to).ok_or_else(|| {
                let names: Vec<&str> = app_config.destinations.iter().map(|d| d.name.as_str()).collect();
                format!("unknown destination '{}' (available: {})", to, names.join(", "))
            })?;
            if let Some(dir) = &out_dir {
                std::fs::create_dir_all(dir)?;
            }
            init_thread_pool(&app_config.processing);

            let slug = destination.slug();
            let files = batch::collect_inputs(&inputs, out_dir.as_deref(), &slug);
            if files.is_empty() {
                return Err("no JPEG files found".into());
            }
            info!("optimizing {} file(s) for {}", files.len(), destination.name);

            let plan = batch::plan_outputs(files, out_dir.as_deref(), &slug);
            let outcomes: Vec<(PathBuf, Result<(PathBuf, OptimizationResult), FileError>)> = plan
                .into_par_iter()
                .map(|PlannedFile { source, target }| {
                    let outcome = match target {
                        Ok(target) => optimize_file(&source, target, destination),
                        Err(e) => Err(e.into()),
                    };
                    (source, outcome)
                })
                .collect();

            let failed = report(destination, &outcomes, json)?;
            if failed > 0 {
                return Err(format!("{} of {} images failed", failed, outcomes.len()).into());
            }
        }
        Command::Inspect { input, json } => {
            let bytes = std::fs::read(&input)?;
            let items = metadata::read_metadata_for_display(&bytes);
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                output::print_metadata(&input, &items);
            }
        }
        Command::Destinations => {
            output::print_destinations(&app_config.destinations);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber. `--verbose` wins over `RUST_LOG`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sendfit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    debug!("using {} worker thread(s)", threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

fn optimize_file(
    source: &Path,
    target: PathBuf,
    destination: &DestinationProfile,
) -> Result<(PathBuf, OptimizationResult), FileError> {
    let bytes = std::fs::read(source)?;
    let image = JpegCodec::new().decode(&bytes)?;
    let result = optimize::optimize(&image, &bytes, destination)?;
    std::fs::write(&target, result.optimized_buffer.as_bytes())?;
    Ok((target, result))
}

/// Print every outcome and return the number of failures.
fn report(
    destination: &DestinationProfile,
    outcomes: &[(PathBuf, Result<(PathBuf, OptimizationResult), FileError>)],
    json: bool,
) -> Result<usize, serde_json::Error> {
    let mut summary = BatchSummary {
        destination: destination.name.clone(),
        ..Default::default()
    };
    for (source, outcome) in outcomes {
        match outcome {
            Ok((target, result)) => {
                if json {
                    summary.results.push(ResultSummary::new(source, target, result));
                } else {
                    output::print_result(source, target, result);
                }
            }
            Err(e) => {
                if json {
                    summary.failures.push(FailureSummary {
                        source: source.display().to_string(),
                        error: e.to_string(),
                    });
                } else {
                    eprintln!("{}", output::format_failure(source, &**e));
                }
            }
        }
    }

    let failed = outcomes.iter().filter(|(_, o)| o.is_err()).count();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", output::format_batch_footer(outcomes.len() - failed, failed));
    }
    Ok(failed)
}
