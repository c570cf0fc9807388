use std::path::{Path, PathBuf};

use anyhow::Context;
use bibenrich_core::Config;
use bibenrich_core::config_file::{self, ConfigFile};
use clap::{Parser, Subcommand};

mod output;

use output::ColorMode;

/// Bibliographic reference enricher - Fill in authors, abstracts and landing pages for paper lists
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enrich a reference list with authors, abstracts and webpages
    Enrich {
        /// Reference list: blank-line separated blocks of `Label: value` lines
        input: PathBuf,

        /// Where to write the enriched list
        output: PathBuf,

        /// Google Custom Search API key
        #[arg(long)]
        api_key: Option<String>,

        /// Google Custom Search engine id
        #[arg(long)]
        cse_id: Option<String>,

        /// Seconds to wait after each paper
        #[arg(long)]
        delay: Option<f64>,

        /// Additional TOML config file, applied over the default ones
        #[arg(long)]
        config: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print statistics for an existing `_results.txt` log
    Analyze {
        /// Path to the results log
        log: PathBuf,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print where the platform config file is looked up
    ConfigPath,
}

/// Values given on the command line for `enrich`.
#[derive(Debug, Default)]
struct Overrides {
    api_key: Option<String>,
    cse_id: Option<String>,
    delay: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Enrich {
            input,
            output,
            api_key,
            cse_id,
            delay,
            config,
            no_color,
        } => {
            let overrides = Overrides {
                api_key,
                cse_id,
                delay,
            };
            enrich(&input, &output, overrides, config.as_deref(), no_color).await
        }
        Command::Analyze { log, no_color } => analyze(&log, no_color),
        Command::ConfigPath => {
            match config_file::config_path() {
                Some(path) => println!("{}", path.display()),
                None => anyhow::bail!("Could not determine config directory"),
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "bibenrich=info,bibenrich_core=info",
        1 => "bibenrich=debug,bibenrich_core=debug",
        _ => "bibenrich=trace,bibenrich_core=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the cascaded config files, then an explicit `--config` file on top.
fn load_config_file(explicit: Option<&Path>) -> anyhow::Result<ConfigFile> {
    let cascaded = config_file::load_config();
    match explicit {
        Some(path) => {
            let file = config_file::read_config(path)?;
            Ok(config_file::merge(cascaded, file))
        }
        None => Ok(cascaded),
    }
}

/// Resolve configuration: CLI flags > env vars > config file > defaults
fn resolve_config(
    file: &ConfigFile,
    env: impl Fn(&str) -> Option<String>,
    overrides: Overrides,
) -> anyhow::Result<Config> {
    let mut config = file.to_config();

    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    if let Some(key) = var("GOOGLE_API_KEY") {
        config.google_api_key = Some(key);
    }
    if let Some(cx) = var("GOOGLE_CSE_ID") {
        config.google_cse_id = Some(cx);
    }
    if let Some(delay) = var("BIBENRICH_DELAY").and_then(|v| v.trim().parse().ok()) {
        config.delay_secs = delay;
    }

    if overrides.api_key.is_some() {
        config.google_api_key = overrides.api_key;
    }
    if overrides.cse_id.is_some() {
        config.google_cse_id = overrides.cse_id;
    }
    if let Some(delay) = overrides.delay {
        config.delay_secs = delay;
    }

    if !config.delay_secs.is_finite() || config.delay_secs < 0.0 {
        anyhow::bail!(
            "Delay must be a non-negative number of seconds, got {}",
            config.delay_secs
        );
    }
    if config.max_candidates == 0 {
        anyhow::bail!("max_candidates must be at least 1");
    }

    Ok(config)
}

async fn enrich(
    input: &Path,
    output: &Path,
    overrides: Overrides,
    config_path: Option<&Path>,
    no_color: bool,
) -> anyhow::Result<()> {
    let color = ColorMode(!no_color);

    let file = load_config_file(config_path)?;
    let config = resolve_config(&file, |k| std::env::var(k).ok(), overrides)?;
    tracing::debug!(?config, "resolved configuration");

    if config.google_api_key.is_none() || config.google_cse_id.is_none() {
        let msg = "Google search credentials not set (GOOGLE_API_KEY / GOOGLE_CSE_ID); papers without a resolvable DOI will not be enriched";
        if color.enabled() {
            use owo_colors::OwoColorize;
            eprintln!("{} {}", "WARNING:".yellow(), msg);
        } else {
            eprintln!("WARNING: {}", msg);
        }
    }

    let report = bibenrich_core::enrich(input, output, config)
        .await
        .with_context(|| format!("Enrichment of {} failed", input.display()))?;

    let mut stdout = std::io::stdout();
    output::print_report(&mut stdout, &report, color)?;
    if let Some(ref stats) = report.stats {
        output::print_stats(&mut stdout, stats, color)?;
    }
    Ok(())
}

fn analyze(log: &Path, no_color: bool) -> anyhow::Result<()> {
    let Some(stats) = bibenrich_core::analyze_file(log) else {
        anyhow::bail!("Could not read results log {}", log.display());
    };
    output::print_stats(&mut std::io::stdout(), &stats, ColorMode(!no_color))?;
    Ok(())
}
