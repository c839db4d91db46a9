mod cli;
mod infra;
mod inspect;
mod offers;

use settle_ai::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
