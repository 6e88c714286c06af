mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::backtest::{BacktestArgs, PeriodArgs, RollingArgs};
use commands::data::AlignArgs;
use commands::hedge_ratio::{HedgeRatioArgs, SensitivityArgs};
use commands::report::ReportArgs;
use commands::stress::StressTestArgs;

/// Futures hedge ratio estimation, backtesting and stress testing
#[derive(Parser)]
#[command(
    name = "hedge",
    version,
    about = "Futures hedge ratio estimation, backtesting and stress testing",
    long_about = "A CLI for hedging a spot commodity exposure with futures. Aligns spot \
                  and futures prices, estimates the minimum-variance hedge ratio, \
                  backtests hedged vs. unhedged P&L and stress-tests the hedge on \
                  extreme-move periods."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log pipeline stages to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load spot and futures prices and align them on common dates
    Align(AlignArgs),
    /// Estimate the minimum-variance hedge ratio with regression diagnostics
    HedgeRatio(HedgeRatioArgs),
    /// Sweep hedge ratios around a base value
    Sensitivity(SensitivityArgs),
    /// Backtest hedged vs. unhedged daily P&L
    Backtest(BacktestArgs),
    /// Backtest metrics over a date sub-range
    Period(PeriodArgs),
    /// Trailing-window backtest statistics
    Rolling(RollingArgs),
    /// Stress-test the hedge on extreme-move periods
    Stress(StressTestArgs),
    /// Render a Markdown analysis report
    Report(ReportArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Align(args) => commands::data::run_align(args),
        Commands::HedgeRatio(args) => commands::hedge_ratio::run_hedge_ratio(args),
        Commands::Sensitivity(args) => commands::hedge_ratio::run_sensitivity(args),
        Commands::Backtest(args) => commands::backtest::run_backtest_cmd(args),
        Commands::Period(args) => commands::backtest::run_period(args),
        Commands::Rolling(args) => commands::backtest::run_rolling(args),
        Commands::Stress(args) => commands::stress::run_stress(args),
        Commands::Report(args) => commands::report::run_report(args),
        Commands::Version => {
            println!("hedge {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
