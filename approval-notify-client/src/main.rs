use approval_notify_client::{Cli, run};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), approval_notify_client::AppError> {
    run(Cli::parse()).await
}
