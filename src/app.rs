use chrono::{NaiveDate, Utc};
use tracing::{error, info};

use crate::cli::{MaCli, PlainCli};
use crate::config::Config;
use crate::error::AppError;
use crate::history::{HistoryRequest, HistoryService, RecordLayout};
use crate::history::format::to_pretty_json;
use crate::indicators::IndicatorEngine;
use crate::market::BinanceClient;

/// Builds the request for the indicator binary. Input errors surface here,
/// before any client exists.
pub fn ma_request(cli: &MaCli, config: &Config, today: NaiveDate) -> Result<HistoryRequest, AppError> {
    let windows = cli.windows(config)?;
    let range = cli.query.date_range(config, today)?;
    let interval = cli.query.interval()?;

    Ok(HistoryRequest {
        symbol: cli.query.symbol(config),
        interval,
        range,
        windows,
        layout: RecordLayout::for_interval(interval),
    })
}

pub fn plain_request(cli: &PlainCli, config: &Config, today: NaiveDate) -> Result<HistoryRequest, AppError> {
    let range = cli.query.date_range(config, today)?;
    let interval = cli.query.interval()?;

    Ok(HistoryRequest {
        symbol: cli.query.symbol(config),
        interval,
        range,
        windows: Vec::new(),
        layout: RecordLayout::plain(),
    })
}

pub async fn run_ma(cli: MaCli, config: Config) -> Result<(), AppError> {
    let request = ma_request(&cli, &config, Utc::now().date_naive())?;
    execute(&request, &config).await
}

pub async fn run_plain(cli: PlainCli, config: Config) -> Result<(), AppError> {
    let request = plain_request(&cli, &config, Utc::now().date_naive())?;
    execute(&request, &config).await
}

/// Logs a terminal error. Anything that is not an [`AppError`] is reported as
/// unknown with its full cause chain.
pub fn report_error(err: &anyhow::Error) {
    match err.downcast_ref::<AppError>() {
        Some(app_err) => error!("{}", app_err),
        None => error!("Unknown error occurred: {:#}", err),
    }
}

async fn execute(request: &HistoryRequest, config: &Config) -> Result<(), AppError> {
    let client = BinanceClient::new(config)?;
    let service = HistoryService::new(Box::new(client), IndicatorEngine::from_kernel(config.sma_kernel));

    let records = service.fetch_history(request).await?;
    if records.is_empty() {
        info!("No data found in the specified date range.");
        return Ok(());
    }

    info!("--- Data fetched successfully ---");
    if !request.windows.is_empty() {
        let names: Vec<String> = request.windows.iter().map(|w| format!("MA{}", w)).collect();
        info!("Including technical indicators: {}", names.join(", "));
    }

    println!("{}", to_pretty_json(&records)?);
    Ok(())
}
