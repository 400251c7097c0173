use crate::commands::{
    run_backtest, run_engine, validate_document, BacktestArgs, CommandOutcome, RunArgs,
    ValidateArgs,
};
use crate::server;
use btcmi::config::AppConfig;
use btcmi::error::AppError;
use btcmi::telemetry;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "btcmi",
    about = "Score BTC market features into trading signals from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Produce a signal report from an input payload
    Run(RunArgs),
    /// Validate a JSON document against a schema
    Validate(ValidateArgs),
    /// Research tooling over historical candles
    Research {
        #[command(subcommand)]
        command: ResearchCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ResearchCommand {
    /// Backtest the fractal momentum model over candle closes
    Backtest(BacktestArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<CommandOutcome, AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match command {
        Command::Serve(args) => server::run(args, config)
            .await
            .map(|()| CommandOutcome::Success),
        Command::Run(args) => run_engine(&args, &config),
        Command::Validate(args) => validate_document(&args),
        Command::Research {
            command: ResearchCommand::Backtest(args),
        } => run_backtest(&args),
    }
}
