use std::env;

use secrecy::SecretString;
use tracing::warn;

use crate::error::AppError;
use crate::indicators::SmaKernel;

pub const DEFAULT_SYMBOL: &str = "BTCUSDT";
pub const DEFAULT_DAYS_AGO: u32 = 3;
pub const DEFAULT_MA_PERIODS: [usize; 3] = [7, 25, 99];
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

#[derive(Debug)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_secret: Option<SecretString>,
    pub base_url: String,
    pub default_symbol: String,
    pub default_days_ago: u32,
    pub ma_periods: Vec<usize>,
    pub sma_kernel: SmaKernel,
}

/// API key and secret, present and non-empty.
pub struct Credentials<'a> {
    pub api_key: &'a str,
    pub api_secret: &'a SecretString,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Credentials are only checked when a fetch is about to happen
        let api_key = lookup("BINANCE_API_KEY").filter(|v| !v.is_empty());
        let api_secret = lookup("BINANCE_API_SECRET")
            .filter(|v| !v.is_empty())
            .map(|v| SecretString::new(v.into()));

        let base_url = lookup("BINANCE_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();

        let default_symbol = lookup("DEFAULT_SYMBOL").unwrap_or_else(|| DEFAULT_SYMBOL.into());

        let default_days_ago = match lookup("DEFAULT_DAYS_AGO") {
            None => DEFAULT_DAYS_AGO,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(days) if days > 0 => days,
                _ => {
                    warn!("Invalid DEFAULT_DAYS_AGO '{}', falling back to {}", raw, DEFAULT_DAYS_AGO);
                    DEFAULT_DAYS_AGO
                }
            },
        };

        let ma_periods = match lookup("MA_PERIODS") {
            None => DEFAULT_MA_PERIODS.to_vec(),
            Some(raw) => parse_ma_periods(&raw).unwrap_or_else(|_| {
                warn!("Invalid MA_PERIODS '{}', falling back to {:?}", raw, DEFAULT_MA_PERIODS);
                DEFAULT_MA_PERIODS.to_vec()
            }),
        };

        let sma_kernel = match lookup("SMA_KERNEL") {
            None => SmaKernel::Auto,
            Some(raw) => raw
                .parse::<SmaKernel>()
                .map_err(|_| AppError::ConfigError(format!("Invalid SMA_KERNEL '{}'", raw)))?,
        };

        Ok(Self {
            api_key,
            api_secret,
            base_url,
            default_symbol,
            default_days_ago,
            ma_periods,
            sma_kernel,
        })
    }

    pub fn credentials(&self) -> Result<Credentials<'_>, AppError> {
        match (&self.api_key, &self.api_secret) {
            (Some(api_key), Some(api_secret)) => Ok(Credentials { api_key, api_secret }),
            _ => Err(AppError::ConfigError(
                "BINANCE_API_KEY and BINANCE_API_SECRET must be set".into(),
            )),
        }
    }
}

/// Parses a comma-separated list of positive window sizes such as `7,25,99`.
pub fn parse_ma_periods(raw: &str) -> Result<Vec<usize>, AppError> {
    raw.split(',')
        .map(|part| {
            let part = part.trim();
            match part.parse::<usize>() {
                Ok(period) if period > 0 => Ok(period),
                _ => Err(AppError::ValidationError(format!(
                    "Invalid MA periods format '{}'. Use comma-separated numbers like '7,25,99'",
                    raw
                ))),
            }
        })
        .collect()
}
