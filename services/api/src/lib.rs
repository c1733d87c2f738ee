mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use bingo_license::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
