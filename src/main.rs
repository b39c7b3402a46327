use std::process::ExitCode;

use clap::Parser;
use spot_history::{app, cli::MaCli, logging, Config};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_tracing();

    let cli = MaCli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            app::report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: MaCli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    app::run_ma(cli, config).await?;
    Ok(())
}
