//! `elecsales` command-line interface.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use elecsales::analysis::{
    Analysis, AnalysisConfig, ComponentRow, ConfigOverrides, GridTable, SeriesSummary,
    SpectralTable,
};
use elecsales::core::MonthlySeries;
use elecsales::io::{write_all, write_components_csv, write_grid_csv, Layout};

#[derive(Parser)]
#[command(name = "elecsales")]
#[command(about = "STL, ARMA and spectral analysis of monthly electricity sales", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. "debug", "elecsales=trace"); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Input layout: long or wide
    #[arg(long, global = true)]
    layout: Option<Layout>,

    /// Row selector for the wide layout
    #[arg(long, global = true)]
    series_filter: Option<String>,

    /// Date column of the long layout
    #[arg(long, global = true)]
    date_column: Option<String>,

    /// Value column of the long layout
    #[arg(long, global = true)]
    value_column: Option<String>,
}

impl GlobalArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            layout: self.layout,
            series_filter: self.series_filter.clone(),
            date_column: self.date_column.clone(),
            value_column: self.value_column.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis and forecast
    Analyze {
        /// Input CSV file
        csv: PathBuf,

        /// Months to forecast
        #[arg(long)]
        horizon: Option<usize>,

        /// Trailing months withheld for evaluation
        #[arg(long)]
        holdout: Option<usize>,

        /// Directory for the CSV and JSON outputs
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the JSON report instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// STL decomposition only
    Decompose {
        /// Input CSV file
        csv: PathBuf,

        /// Write the components table to this CSV file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// ARMA order grid on the STL remainder
    Grid {
        /// Input CSV file
        csv: PathBuf,

        /// Write the score table to this CSV file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Dominant periods and Fisher's g test
    Spectrum {
        /// Input CSV file
        csv: PathBuf,

        /// Peaks reported per spectrum
        #[arg(long)]
        top: Option<usize>,
    },

    /// ADF and KPSS on the series and the STL remainder
    Stationarity {
        /// Input CSV file
        csv: PathBuf,
    },
}

impl Commands {
    /// Subcommand options that replace configuration values.
    fn overrides(&self) -> ConfigOverrides {
        match self {
            Commands::Analyze {
                horizon, holdout, ..
            } => ConfigOverrides {
                horizon: *horizon,
                holdout: *holdout,
                ..Default::default()
            },
            Commands::Spectrum { top, .. } => ConfigOverrides {
                top_k: *top,
                ..Default::default()
            },
            _ => ConfigOverrides::default(),
        }
    }
}

fn init_logging(level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{level}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut config = match &cli.global.config {
        Some(path) => AnalysisConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    let command = cli.command.overrides();
    config.apply_overrides(&ConfigOverrides {
        horizon: command.horizon,
        holdout: command.holdout,
        top_k: command.top_k,
        ..cli.global.overrides()
    });
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn load_series(analysis: &Analysis, csv: &Path) -> Result<MonthlySeries> {
    analysis
        .load(csv)
        .with_context(|| format!("failed to read series from {}", csv.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.global.log_level.as_deref())?;
    let analysis = Analysis::new(load_config(&cli)?);

    match cli.command {
        Commands::Analyze { csv, out, json, .. } => {
            let series = load_series(&analysis, &csv)?;
            let report = analysis.run(&series).context("analysis failed")?;

            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render_summary());
            }

            if let Some(dir) = out {
                let paths = write_all(&dir, &report)
                    .with_context(|| format!("failed to write outputs to {}", dir.display()))?;
                for path in paths {
                    info!(path = %path.display(), "written");
                }
            }
        }

        Commands::Decompose { csv, out } => {
            let series = load_series(&analysis, &csv)?;
            let stl = analysis.decompose(series.values())?;

            print!("{}", SeriesSummary::of(&series));
            print!("{}", analysis.decomposition_summary(&stl));

            if let Some(path) = out {
                write_components_csv(&path, &ComponentRow::table(&series, &stl))
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "written");
            }
        }

        Commands::Grid { csv, out } => {
            let series = load_series(&analysis, &csv)?;
            let stl = analysis.decompose(series.values())?;
            let grid = analysis.grid_search(&stl.remainder);

            print!("{}", GridTable(&grid));

            if let Some(path) = out {
                write_grid_csv(&path, &grid)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), "written");
            }
        }

        Commands::Spectrum { csv, .. } => {
            let series = load_series(&analysis, &csv)?;
            let stl = analysis.decompose(series.values())?;

            print!(
                "{}",
                SpectralTable(&analysis.spectrum(series.values(), &stl.remainder))
            );
        }

        Commands::Stationarity { csv } => {
            let series = load_series(&analysis, &csv)?;
            let stl = analysis.decompose(series.values())?;

            print!("{}", analysis.stationarity(series.values(), &stl.remainder)?);
        }
    }

    Ok(())
}
