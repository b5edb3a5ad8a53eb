use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tradegym::commands::{self, Command, SimulateArgs};
use tradegym::obs;

#[derive(Parser)]
#[command(name = "tradegym")]
#[command(about = "Tradegym trading simulation CLI", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  tradegym simulate --ticker AAPL --start 2022-01-01 --end 2023-01-01\n  tradegym simulate --prices-csv data/aapl.csv --json\n  tradegym validate --config configs/sample.toml\n  tradegym serve --config configs/sample.toml --bind 0.0.0.0:5000\n"
)]
struct Cli {
    /// Log filter used when TRADEGYM_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format: text or json.
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    /// Prometheus metrics listen addr (e.g. 127.0.0.1:9898). Optional.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run one simulation and print the history and summary.
    Simulate {
        #[arg(long, env = "TRADEGYM_CONFIG")]
        config: Option<PathBuf>,
        #[arg(long)]
        ticker: Option<String>,
        /// Inclusive start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Exclusive end date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Read closes from this CSV instead of the configured source.
        #[arg(long)]
        prices_csv: Option<String>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Check the config and the configured price window.
    Validate {
        #[arg(long, env = "TRADEGYM_CONFIG")]
        config: Option<PathBuf>,
        /// Fail when any row was dropped or deduplicated.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// Serve GET /predict and GET /health.
    Serve {
        #[arg(long, env = "TRADEGYM_CONFIG")]
        config: Option<PathBuf>,
        /// Listen address; defaults to server.bind from the config.
        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Simulate {
            config,
            ticker,
            start,
            end,
            prices_csv,
            json,
        } => Command::Simulate(SimulateArgs {
            config,
            ticker,
            start,
            end,
            prices_csv,
            json,
        }),
        CliCommand::Validate { config, strict } => Command::Validate { config, strict },
        CliCommand::Serve { config, bind } => Command::Serve { config, bind },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
