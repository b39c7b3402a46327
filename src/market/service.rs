use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::AppError;
use crate::market::model::{parse_kline_row, BinanceErrorBody, Interval, PricePoint};

const KLINES_PATH: &str = "/api/v3/klines";
const KLINE_PAGE_LIMIT: usize = 1000;

/// Source of historical candles.
///
/// Implementations return candles whose open time lies in `[start, end]`,
/// ascending by open time.
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, AppError>;
}

pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    /// Fails with a config error when credentials are missing. Only the key
    /// is sent; kline requests are not signed.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let credentials = config.credentials()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            "X-MBX-APIKEY",
            header::HeaderValue::from_str(credentials.api_key)
                .map_err(|_| AppError::ConfigError("BINANCE_API_KEY is not a valid header value".into()))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn fetch_page(
        &self,
        symbol: &str,
        interval: Interval,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<Vec<Value>>, AppError> {
        let url = format!("{}{}", self.base_url, KLINES_PATH);
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.as_str().to_string()),
            ("startTime", start_ms.to_string()),
            ("endTime", end_ms.to_string()),
            ("limit", KLINE_PAGE_LIMIT.to_string()),
        ];

        let response = self.client.get(&url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return Err(exchange_error(status, &body));
        }

        Ok(response.json::<Vec<Vec<Value>>>().await?)
    }
}

#[async_trait]
impl CandleSource for BinanceClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>, AppError> {
        let end_ms = end.timestamp_millis();
        let candles = collect_pages(start.timestamp_millis(), end_ms, move |page_start| {
            self.fetch_page(symbol, interval, page_start, end_ms)
        })
        .await?;
        debug!("Fetched {} klines for {}", candles.len(), symbol);
        Ok(candles)
    }
}

/// Requests pages of up to `KLINE_PAGE_LIMIT` rows until a short page arrives
/// or the next start passes `end_ms`. Each page after the first starts 1 ms
/// after the last open time seen.
pub async fn collect_pages<F, Fut>(
    start_ms: i64,
    end_ms: i64,
    mut fetch_page: F,
) -> Result<Vec<PricePoint>, AppError>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<Vec<Vec<Value>>, AppError>>,
{
    let mut start_ms = start_ms;
    let mut candles = Vec::new();

    loop {
        let rows = fetch_page(start_ms).await?;
        let page_len = rows.len();
        debug!("Fetched page of {} klines starting at {}", page_len, start_ms);

        for row in &rows {
            candles.push(parse_kline_row(row)?);
        }

        if page_len < KLINE_PAGE_LIMIT {
            break;
        }

        match candles.last() {
            Some(last) => start_ms = last.timestamp.timestamp_millis() + 1,
            None => break,
        }
        if start_ms > end_ms {
            break;
        }
    }

    Ok(candles)
}

/// Maps a non-2xx response to an exchange error, keeping Binance's own code
/// and message when the body carries them.
pub fn exchange_error(status: StatusCode, body: &str) -> AppError {
    match serde_json::from_str::<BinanceErrorBody>(body) {
        Ok(err) => AppError::ExchangeError {
            code: err.code,
            message: err.msg,
        },
        Err(_) => AppError::ExchangeError {
            code: i64::from(status.as_u16()),
            message: format!("HTTP {}: {}", status, body.trim()),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::ready;
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    const FIRST_OPEN_MS: i64 = 1704067200000;
    const MINUTE_MS: i64 = 60_000;

    /// Minute rows starting at index `first`, close = index.
    fn minute_rows(first: usize, count: usize) -> Vec<Vec<Value>> {
        (first..first + count)
            .map(|i| {
                let open_time = FIRST_OPEN_MS + i as i64 * MINUTE_MS;
                let close = i.to_string();
                json!([open_time, "1", "2", "0.5", close, "10"])
                    .as_array()
                    .cloned()
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_collect_pages_follows_full_pages() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let seen = starts.clone();
        let end_ms = FIRST_OPEN_MS + 2000 * MINUTE_MS;

        let candles = collect_pages(FIRST_OPEN_MS, end_ms, move |page_start| {
            let mut seen = seen.lock().unwrap();
            let rows = if seen.is_empty() { minute_rows(0, 1000) } else { minute_rows(1000, 5) };
            seen.push(page_start);
            ready(Ok(rows))
        })
        .await
        .unwrap();

        assert_eq!(candles.len(), 1005);
        assert_eq!(candles.first().unwrap().close, 0.0);
        assert_eq!(candles.last().unwrap().close, 1004.0);

        let starts = starts.lock().unwrap();
        assert_eq!(*starts, vec![FIRST_OPEN_MS, 1704127140001]);
    }

    #[tokio::test]
    async fn test_collect_pages_stops_past_end() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        // The last row of the full page opens exactly at the end bound
        let end_ms = FIRST_OPEN_MS + 999 * MINUTE_MS;

        let candles = collect_pages(FIRST_OPEN_MS, end_ms, move |_| {
            *counter.lock().unwrap() += 1;
            ready(Ok(minute_rows(0, 1000)))
        })
        .await
        .unwrap();

        assert_eq!(candles.len(), 1000);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_collect_pages_empty_and_errors() {
        let candles = collect_pages(0, 1, |_| ready(Ok(Vec::new()))).await.unwrap();
        assert!(candles.is_empty());

        let err = collect_pages(0, 1, |_| {
            ready(Err(AppError::ExchangeError { code: -1121, message: "Invalid symbol.".into() }))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::ExchangeError { code: -1121, .. }));
    }

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_client_requires_credentials() {
        let err = BinanceClient::new(&config_with(&[])).err().unwrap();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_client_rejects_unprintable_key() {
        let config = config_with(&[("BINANCE_API_KEY", "bad\nkey"), ("BINANCE_API_SECRET", "s")]);
        assert!(matches!(BinanceClient::new(&config), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_client_uses_configured_base_url() {
        let config = config_with(&[
            ("BINANCE_API_KEY", "key"),
            ("BINANCE_API_SECRET", "secret"),
            ("BINANCE_BASE_URL", "http://127.0.0.1:9999"),
        ]);
        let client = BinanceClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn test_exchange_error_from_binance_body() {
        let err = exchange_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":-1121,"msg":"Invalid symbol."}"#,
        );
        match err {
            AppError::ExchangeError { code, message } => {
                assert_eq!(code, -1121);
                assert_eq!(message, "Invalid symbol.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_exchange_error_from_plain_body() {
        let err = exchange_error(StatusCode::BAD_GATEWAY, "upstream down\n");
        match err {
            AppError::ExchangeError { code, message } => {
                assert_eq!(code, 502);
                assert_eq!(message, "HTTP 502 Bad Gateway: upstream down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
