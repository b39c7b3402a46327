use chrono::NaiveDate;
use clap::{Args, Parser};
use indexmap::IndexSet;
use tracing::info;

use crate::config::{parse_ma_periods, Config};
use crate::error::AppError;
use crate::history::DateRange;
use crate::market::Interval;

/// Flags shared by both binaries.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Trading pair, defaults to DEFAULT_SYMBOL from the environment (BTCUSDT)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: Option<String>,

    /// End date (YYYY-MM-DD)
    #[arg(long)]
    pub end: Option<String>,

    /// K-line interval: 1m,3m,5m,15m,30m,1h,2h,4h,6h,8h,12h,1d,3d,1w,1M
    #[arg(long, default_value = "1d")]
    pub interval: String,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Get historical K-line data with technical indicators from Binance.")]
pub struct MaCli {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Disable moving average calculations
    #[arg(long)]
    pub no_ma: bool,

    /// Comma-separated MA periods (e.g. "7,25,99"), overrides MA_PERIODS
    #[arg(long)]
    pub ma_periods: Option<String>,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Get historical K-line data for a trading pair from Binance.")]
pub struct PlainCli {
    #[command(flatten)]
    pub query: QueryArgs,
}

impl QueryArgs {
    pub fn symbol(&self, config: &Config) -> String {
        self.symbol
            .clone()
            .unwrap_or_else(|| config.default_symbol.clone())
    }

    pub fn interval(&self) -> Result<Interval, AppError> {
        self.interval.parse()
    }

    /// The requested range, or the last `DEFAULT_DAYS_AGO` complete days when
    /// either bound is missing.
    pub fn date_range(&self, config: &Config, today: NaiveDate) -> Result<DateRange, AppError> {
        match (&self.start, &self.end) {
            (Some(start), Some(end)) => DateRange::new(parse_date(start)?, parse_date(end)?),
            _ => {
                info!(
                    "No dates specified, using default: querying past {} days of data.",
                    config.default_days_ago
                );
                let range = DateRange::last_complete_days(today, config.default_days_ago)?;
                info!("Actual query time range: {} to {}", range.start(), range.end());
                Ok(range)
            }
        }
    }
}

impl MaCli {
    /// Windows to compute: none with `--no-ma`, the `--ma-periods` override
    /// when given and non-empty, the configured defaults otherwise. Repeated
    /// windows keep their first position only.
    pub fn windows(&self, config: &Config) -> Result<Vec<usize>, AppError> {
        if self.no_ma {
            return Ok(Vec::new());
        }
        let windows = match self.ma_periods.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_ma_periods(raw)?,
            _ => config.ma_periods.clone(),
        };
        Ok(windows.into_iter().collect::<IndexSet<_>>().into_iter().collect())
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::ValidationError(format!("Invalid date '{}', expected YYYY-MM-DD", raw))
    })
}
