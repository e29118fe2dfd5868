use anyhow::Context;
use return_stats::{cli, config::Config, config::Settings, report};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let mut args = cli::parse_args();

    // Explicit --config must exist; otherwise fall back to the default lookup
    let config = match &args.config {
        Some(path) => Some(
            Config::from_file(path).with_context(|| format!("Failed to load config file {}", path))?,
        ),
        None => Config::load_default().context("Failed to load default config")?,
    };
    if let Some(config) = &config {
        config.merge_with_cli(&mut args);
    }

    init_logging(args.verbose);
    tracing::info!("return_stats starting");

    let settings = Settings::from_args(&args)?;

    let analysis = return_stats::analyze(&settings)
        .with_context(|| format!("Failed to analyze {}", settings.input_path.display()))?;

    if !args.quiet {
        println!("{}", report::generate_text_report(&analysis));
    }

    return_stats::write_outputs(&analysis, &settings).context("Failed to write results")?;

    if !args.quiet {
        println!("Mean returns saved to: {}", settings.mean_output.display());
        println!("Covariance matrix saved to: {}", settings.cov_output.display());
    }

    tracing::info!("return_stats finished");
    Ok(())
}
