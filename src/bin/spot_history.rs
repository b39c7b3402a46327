use std::process::ExitCode;

use clap::Parser;
use spot_history::{app, cli::PlainCli, logging, Config};

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    logging::init_tracing();

    let cli = PlainCli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            app::report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: PlainCli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    app::run_plain(cli, config).await?;
    Ok(())
}
