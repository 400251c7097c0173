mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use btcmi::error::AppError;

pub use commands::CommandOutcome;

pub async fn run() -> Result<CommandOutcome, AppError> {
    cli::run().await
}
