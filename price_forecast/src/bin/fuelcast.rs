use clap::{Parser, Subcommand};
use price_forecast::config::CONFIG_ENV;
use price_forecast::{BatchOrchestrator, Config, ModelVariant, Pipeline, SegmentKey};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Daily fuel price forecasting per province and product
#[derive(Debug, Parser)]
#[command(name = "fuelcast", version)]
struct Cli {
    /// TOML configuration file (defaults to $FUELCAST_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean a raw `;`-separated export and merge it into the segments
    Ingest { file: PathBuf },
    /// Pick the differencing order of a segment
    Analyze { province: String, product: String },
    /// Descriptive statistics, correlations and a suggested SARIMA order
    Profile { province: String, product: String },
    /// Train a model variant and report its hold-out accuracy
    Train {
        province: String,
        product: String,
        #[arg(long, default_value = "sarimax")]
        variant: String,
    },
    /// Forecast the next days on the price scale
    Forecast {
        province: String,
        product: String,
        days: i64,
        #[arg(long, default_value = "sarimax")]
        variant: String,
    },
    /// Analyze and train every segment
    Batch,
    /// Show the progress of the last batch run
    Progress,
    /// Reset the batch progress record
    Reset,
}

fn load_config(path: Option<PathBuf>) -> price_forecast::Result<Config> {
    match path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from)) {
        Some(path) => {
            info!("Using configuration {}", path.display());
            Config::load(path)
        }
        None => Ok(Config::default()),
    }
}

fn main() -> price_forecast::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let pipeline = Pipeline::from_config(load_config(cli.config)?);

    match cli.command {
        Command::Ingest { file } => {
            let updated = pipeline.ingest_file(&file)?;
            println!("Updated {} segments", updated.len());
            for key in updated {
                println!("  {}", key);
            }
        }
        Command::Analyze { province, product } => {
            let key = SegmentKey::new(&province, &product);
            let metadata = pipeline.analyze(&key)?;
            let result = metadata.stationarity;
            println!("{}", key);
            println!("  differencing order: {}", result.differencing_order);
            println!("  stationary:         {}", result.is_stationary);
            println!(
                "  ADF  stat {:.4}  p {:.4}",
                result.adf.statistic, result.adf.p_value
            );
            println!(
                "  KPSS stat {:.4}  p {:.4}",
                result.kpss.statistic, result.kpss.p_value
            );
        }
        Command::Profile { province, product } => {
            let key = SegmentKey::new(&province, &product);
            let profile = pipeline.profile(&key)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Command::Train {
            province,
            product,
            variant,
        } => {
            let key = SegmentKey::new(&province, &product);
            let variant: ModelVariant = variant.parse()?;
            let evaluation = pipeline.train(&key, variant)?;
            println!("{} {}: {}", key, variant, evaluation.metrics);
            println!(
                "  AIC {:.2}  BIC {:.2}  log-likelihood {:.2}",
                evaluation.diagnostics.aic,
                evaluation.diagnostics.bic,
                evaluation.diagnostics.log_likelihood
            );
            if let Some(warning) = evaluation.warning {
                println!("  warning: {}", warning);
            }
        }
        Command::Forecast {
            province,
            product,
            days,
            variant,
        } => {
            let key = SegmentKey::new(&province, &product);
            let forecast = pipeline.forecast(&key, variant.parse()?, days)?;
            println!("date,forecast,lower,upper");
            for point in &forecast.points {
                println!(
                    "{},{:.4},{:.4},{:.4}",
                    point.date, point.mean, point.lower, point.upper
                );
            }
        }
        Command::Batch => {
            let orchestrator = BatchOrchestrator::new(pipeline)?;
            let progress = orchestrator.run_blocking()?;
            println!(
                "Batch {:?}: {} completed, {} errors",
                progress.status,
                progress.completed.len(),
                progress.errors.len()
            );
            for error in &progress.errors {
                println!("  {}", error);
            }
        }
        Command::Progress => {
            let orchestrator = BatchOrchestrator::new(pipeline)?;
            println!("{}", serde_json::to_string_pretty(&orchestrator.progress())?);
        }
        Command::Reset => {
            BatchOrchestrator::new(pipeline)?.reset_progress()?;
            println!("Progress reset");
        }
    }

    Ok(())
}
