//! Command-line tools for CASToR list-mode datafiles.

use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use castor_rs::error::{CastorError, Result};
use castor_rs::info::DatafileInfo;
use castor_rs::logging::{LogConfig, LogFormat, init_logging};
use castor_rs::stream::StreamSummary;
use castor_rs::tools::normalization::{NormalizationTable, add_normalization_factors};
use castor_rs::tools::random::{ModularGeometry, RandomFactorModel, add_random_factors};
use castor_rs::tools::replicate::replicate;
use castor_rs::tools::truncate::truncate;
use castor_rs::update::UpdateOptions;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "castor",
    version,
    about = "Transform CASToR list-mode datafiles (*.Cdh / *.Cdf)."
)]
struct Cli {
    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormatArg::Pretty, global = true)]
    log_format: LogFormatArg,

    /// Do not draw a progress bar.
    #[arg(long, global = true)]
    no_progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

/// Input header and output pair shared by every transforming command.
#[derive(Debug, Args)]
struct PairArgs {
    /// CASToR data header
    #[arg(long)]
    cdh: PathBuf,

    /// output Cdh file
    #[arg(long = "output-cdh")]
    output_cdh: PathBuf,

    /// output Cdf file
    #[arg(long = "output-cdf")]
    output_cdf: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Truncate a CASToR datafile, keeping only the first events.
    Truncate {
        #[command(flatten)]
        pair: PairArgs,

        /// number of rows to keep
        #[arg(short = 'n')]
        n: u64,
    },

    /// Add normalization factors to a CASToR data file (*.Cdf).
    AddNormalization {
        #[command(flatten)]
        pair: PairArgs,

        /// CSV file of normalization factors (c1,c2,n)
        #[arg(long)]
        nf: PathBuf,
    },

    /// Add random correction factors to a CASToR data file (*.Cdf).
    AddRandom {
        #[command(flatten)]
        pair: PairArgs,

        /// LUT geometry file
        #[arg(long = "lut-name")]
        lut_name: PathBuf,

        /// random correction factors matrix TXT file
        #[arg(long = "map-name")]
        map_name: PathBuf,
    },

    /// Replicate a CASToR data file using sampling with repetition.
    Replicate {
        #[command(flatten)]
        pair: PairArgs,

        /// seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print a JSON summary of a CASToR datafile.
    Info {
        /// CASToR data header
        #[arg(long)]
        cdh: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        format: match cli.log_format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        },
        with_ansi: io::stderr().is_terminal(),
        use_env_filter: !cli.verbosity.is_present(),
    };
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CastorError::FileNotFound { path }) => {
            error!("File not found: {}.", path.display());
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn progress_bar(cli: &Cli) -> ProgressBar {
    if cli.no_progress || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template(
        "{wide_bar} {pos}/{len} events [{elapsed_precise}<{eta_precise}]",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(0).with_style(style)
}

fn report(summary: &StreamSummary) {
    info!(
        read = summary.records_read,
        written = summary.records_written,
        omitted = summary.records_omitted,
        state = ?summary.final_state,
        "done"
    );
}

fn run(cli: &Cli) -> Result<()> {
    let options = UpdateOptions {
        progress: progress_bar(cli),
    };

    match &cli.command {
        Command::Truncate { pair, n } => {
            let summary = truncate(&pair.cdh, *n, &pair.output_cdh, &pair.output_cdf, &options)?;
            report(&summary);
        }
        Command::AddNormalization { pair, nf } => {
            let table = NormalizationTable::from_csv(nf)?;
            let summary = add_normalization_factors(
                &pair.cdh,
                &table,
                &pair.output_cdh,
                &pair.output_cdf,
                &options,
            )?;
            report(&summary);
        }
        Command::AddRandom { pair, lut_name, map_name } => {
            let model = RandomFactorModel::load(lut_name, map_name, ModularGeometry::default())?;
            let summary = add_random_factors(
                &pair.cdh,
                &model,
                &pair.output_cdh,
                &pair.output_cdf,
                &options,
            )?;
            report(&summary);
        }
        Command::Replicate { pair, seed } => {
            let summary =
                replicate(&pair.cdh, &pair.output_cdh, &pair.output_cdf, *seed, &options)?;
            report(&summary);
        }
        Command::Info { cdh } => {
            let info = DatafileInfo::from_header(cdh)?;
            println!("{}", info.to_json()?);
        }
    }
    Ok(())
}
